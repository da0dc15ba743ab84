//! # Document Model
//!
//! The tree shared by both directions of the pipeline. The structural parser
//! builds it from mkly source, the reconstructors build it from HTML, and the
//! source emitter turns it back into canonical mkly text.
//!
//! Directives (`use`, `theme`, `preset`, `meta`, `style`, inline defines) live
//! in their own slots on [`Document`]; the block tree only ever holds content
//! blocks.

use indexmap::IndexMap;
use serde::Serialize;

/// Ordered, case-sensitive property map. Insertion order is the emission order.
pub type Properties = IndexMap<String, String>;

/// A 1-based line/column pair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct LineCol {
    pub line: usize,
    pub column: usize,
}

/// Source extent of a block.
///
/// Blocks produced by reconstruction carry the default (all zero) position.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Position {
    pub start: LineCol,
    pub end: LineCol,
}

/// A typed, possibly nested unit of a mkly document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Block {
    /// Namespaced type, e.g. `core/card`.
    pub block_type: String,
    pub label: Option<String>,
    pub properties: Properties,
    pub content: String,
    /// Only populated for container types.
    pub children: Vec<Block>,
    pub verbatim: bool,
    pub position: Position,
}

impl Block {
    pub fn new(block_type: impl Into<String>) -> Self {
        Self {
            block_type: block_type.into(),
            ..Self::default()
        }
    }

    /// Compares everything except source positions, recursively.
    pub fn same_structure(&self, other: &Block) -> bool {
        self.block_type == other.block_type
            && self.label == other.label
            && self.properties == other.properties
            && self.content == other.content
            && self.verbatim == other.verbatim
            && self.children.len() == other.children.len()
            && self
                .children
                .iter()
                .zip(&other.children)
                .all(|(a, b)| a.same_structure(b))
    }

    /// Returns a copy with every position in the subtree reset.
    #[must_use]
    pub fn without_positions(&self) -> Block {
        Block {
            position: Position::default(),
            children: self.children.iter().map(Block::without_positions).collect(),
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DefineKind {
    Theme,
    Preset,
}

impl DefineKind {
    /// The directive keyword that introduces this kind of definition.
    pub fn directive(self) -> &'static str {
        match self {
            DefineKind::Theme => "define-theme",
            DefineKind::Preset => "define-preset",
        }
    }
}

/// An inline `define-theme` / `define-preset` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InlineDefine {
    pub kind: DefineKind,
    pub name: String,
    pub variables: IndexMap<String, String>,
    /// Raw style text following the variables, kept verbatim.
    pub raw_css: Option<String>,
}

impl InlineDefine {
    pub fn is_empty(&self) -> bool {
        self.variables.is_empty() && self.raw_css.as_deref().is_none_or(|c| c.trim().is_empty())
    }
}

/// An author comment kept for re-emission.
///
/// `before_block` is the index of the top-level block the comment precedes;
/// a value equal to `blocks.len()` places it after the last block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceComment {
    pub before_block: usize,
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Document {
    /// Activated kits, in order.
    pub uses: Vec<String>,
    pub defines: Vec<InlineDefine>,
    pub themes: Vec<String>,
    pub presets: Vec<String>,
    pub meta: IndexMap<String, String>,
    /// Raw `style` block bodies.
    pub styles: Vec<String>,
    pub comments: Vec<SourceComment>,
    pub blocks: Vec<Block>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compares two documents ignoring block positions.
    pub fn same_structure(&self, other: &Document) -> bool {
        self.uses == other.uses
            && self.defines == other.defines
            && self.themes == other.themes
            && self.presets == other.presets
            && self.meta == other.meta
            && self.styles == other.styles
            && self.blocks.len() == other.blocks.len()
            && self
                .blocks
                .iter()
                .zip(&other.blocks)
                .all(|(a, b)| a.same_structure(b))
    }

    /// Depth-first iterator over every block in the tree.
    pub fn walk(&self) -> impl Iterator<Item = &Block> {
        let mut stack: Vec<&Block> = self.blocks.iter().rev().collect();
        std::iter::from_fn(move || {
            let next = stack.pop()?;
            stack.extend(next.children.iter().rev());
            Some(next)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn card(content: &str) -> Block {
        let mut b = Block::new("core/card");
        b.properties.insert("image".into(), "x.jpg".into());
        b.content = content.into();
        b
    }

    #[test]
    fn same_structure_ignores_positions() {
        let a = card("Body");
        let mut b = card("Body");
        b.position.start = LineCol { line: 9, column: 3 };
        assert!(a.same_structure(&b));
        assert_ne!(a, b);
        assert_eq!(a, b.without_positions());
    }

    #[test]
    fn same_structure_checks_children() {
        let mut a = Block::new("core/section");
        a.children.push(card("One"));
        let mut b = Block::new("core/section");
        b.children.push(card("Two"));
        assert!(!a.same_structure(&b));
    }

    #[test]
    fn walk_is_depth_first() {
        let mut section = Block::new("core/section");
        section.children.push(Block::new("core/text"));
        let doc = Document {
            blocks: vec![section, Block::new("core/divider")],
            ..Document::default()
        };
        let order: Vec<_> = doc.walk().map(|b| b.block_type.as_str()).collect();
        assert_eq!(order, ["core/section", "core/text", "core/divider"]);
    }

    #[test]
    fn define_without_variables_or_css_is_empty() {
        let define = InlineDefine {
            kind: DefineKind::Theme,
            name: "dark".into(),
            variables: IndexMap::new(),
            raw_css: Some("  ".into()),
        };
        assert!(define.is_empty());
    }
}
