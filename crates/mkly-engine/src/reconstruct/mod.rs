//! # HTML Reconstruction
//!
//! Recovers a mkly [`Document`] from HTML. The input is first classified by
//! [`detect_origin`], then handed to one of three paths:
//!
//! - **web**: HTML generated by mkly's web target. Marked root classes
//!   (`mkly-<kit>-<name>`) identify blocks exactly, and preserved payloads
//!   restore styles, defines, meta and author comments.
//! - **email**: HTML generated by mkly's email target. Comment markers delimit
//!   blocks; older and CSS-inlined layouts fall back to heuristics.
//! - **generic**: anything else. Three tiers run in order: boilerplate
//!   stripping, layout-table unwrapping, then per-segment pattern
//!   classification.
//!
//! Every path is best-effort. Ambiguity never fails the call; it degrades to
//! verbatim `core/html` blocks.

pub mod classify;
pub mod email;
pub mod generic;
pub mod origin;
pub(crate) mod preserved;
pub mod segments;
pub mod strip;
pub mod unwrap;
pub mod web;

use serde::Serialize;

use crate::{
    diagnostics::{Diagnostic, Diagnostics},
    document::{Block, Document, Properties},
    emit::emit_document,
    kit::KitRegistry,
};

pub use classify::classify_segment;
pub use origin::{Origin, detect_origin};
pub use segments::{Segment, SegmentKind, split_segments};
pub use strip::strip_boilerplate;
pub use unwrap::{MAX_UNWRAP_PASSES, unwrap_layout_tables};

/// A block recovered from markup, before it joins a [`Document`].
///
/// This is also what kit element parsers and import patterns return.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedBlock {
    pub block_type: String,
    pub label: Option<String>,
    pub properties: Properties,
    pub content: String,
    pub children: Vec<ParsedBlock>,
    pub verbatim: bool,
    /// Inline style overrides, as `(property, value)` pairs.
    pub style_entries: Vec<(String, String)>,
}

impl ParsedBlock {
    pub fn new(block_type: impl Into<String>) -> Self {
        Self {
            block_type: block_type.into(),
            ..Self::default()
        }
    }

    /// Sets `key` unless `value` is empty.
    #[must_use]
    pub fn with_property(mut self, key: &str, value: impl Into<String>) -> Self {
        let value = value.into();
        if !value.is_empty() {
            self.properties.insert(key.to_string(), value);
        }
        self
    }

    #[must_use]
    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    pub fn into_block(self) -> Block {
        let mut block = Block::new(self.block_type);
        block.label = self.label;
        block.properties = self.properties;
        block.content = self.content;
        block.verbatim = self.verbatim;
        block.children = self.children.into_iter().map(ParsedBlock::into_block).collect();
        block
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Reconstruction {
    pub origin: Origin,
    pub document: Document,
    pub diagnostics: Vec<Diagnostic>,
}

pub fn reconstruct(html: &str, registry: &KitRegistry) -> Reconstruction {
    let origin = detect_origin(html);
    log::debug!("reconstructing {} bytes of {origin:?} html", html.len());

    let mut diags = Diagnostics::new();
    let document = match origin {
        Origin::Web => web::reconstruct_web(html, registry, &mut diags),
        Origin::Email => email::reconstruct_email(html, registry, &mut diags),
        Origin::Generic => generic::reconstruct_generic(html, registry),
    };
    log::debug!(
        "recovered {} top-level blocks from {origin:?} html",
        document.blocks.len()
    );

    Reconstruction {
        origin,
        document,
        diagnostics: diags.into_vec(),
    }
}

/// Reconstructs `html` and emits it as canonical mkly source.
pub fn html_to_mkly(html: &str, registry: &KitRegistry) -> String {
    emit_document(&reconstruct(html, registry).document, registry)
}
