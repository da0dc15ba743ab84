//! # mkly Parsing
//!
//! Two-phase parsing of mkly source.
//!
//! ## Parsing Phases
//!
//! 1. **Tokenizing** (`tokenizer`): each physical line is classified into a
//!    `TokenizedLine` (blank, comment, block start/end, property, text) with no
//!    knowledge of surrounding lines
//!
//! 2. **Block Construction** (`builder`): a `BlockBuilder` keeps an explicit
//!    stack of open containers plus the current leaf, and applies each block
//!    type's content mode to decide what a line means
//!
//! ## Key Invariants
//!
//! - Parsing never fails; problems are reported as diagnostics
//! - Directives never appear in the block tree
//! - Only containers hold children
//! - Unclosed containers are closed at end of input without a diagnostic

pub mod builder;
pub mod directives;
pub mod lines;
pub mod tokenizer;


use serde::Serialize;

use crate::{diagnostics::Diagnostic, document::Document, kit::KitRegistry};

pub use builder::BlockBuilder;
pub use tokenizer::{TokenKind, TokenizedLine, tokenize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseOptions {
    /// Warn when a `mixed` block's content follows its properties without a
    /// blank line. The tree is the same either way.
    pub strict_mixed_separation: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ParseResult {
    pub document: Document,
    pub diagnostics: Vec<Diagnostic>,
}

impl ParseResult {
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }
}

pub fn parse_document(source: &str, registry: &KitRegistry) -> ParseResult {
    parse_document_with(source, registry, ParseOptions::default())
}

pub fn parse_document_with(
    source: &str,
    registry: &KitRegistry,
    options: ParseOptions,
) -> ParseResult {
    let mut builder = BlockBuilder::new(registry, options);
    for token in tokenize(source) {
        builder.push(&token);
    }
    let (document, diagnostics) = builder.finish();
    log::debug!(
        "parsed {} top-level blocks with {} diagnostics",
        document.blocks.len(),
        diagnostics.len()
    );
    ParseResult {
        document,
        diagnostics,
    }
}
