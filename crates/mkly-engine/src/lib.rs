pub mod diagnostics;
pub mod document;
pub mod emit;
pub mod html;
pub mod kit;
pub mod parsing;
pub mod reconstruct;

// Re-export key types for easier usage
pub use diagnostics::{Diagnostic, Diagnostics, Severity};
pub use document::{Block, DefineKind, Document, InlineDefine, LineCol, Position, Properties, SourceComment};
pub use emit::{emit_block_source, emit_document};
pub use kit::{
    BlockTypeDef, ClassMapping, ContentHints, ContentMode, ElementParser, ImportPattern, KitDefinition, KitError,
    KitRegistry, PropertyDef, PropertyShape, core_kit,
};
pub use parsing::{ParseOptions, ParseResult, parse_document, parse_document_with};
pub use reconstruct::{
    Origin, ParsedBlock, Reconstruction, Segment, SegmentKind, classify_segment, detect_origin, html_to_mkly,
    reconstruct, split_segments, strip_boilerplate, unwrap_layout_tables,
};
