//! # Source Emitter
//!
//! Serializes a [`Document`] into canonical mkly text. The output is stable:
//! emitting, parsing and emitting again yields the same text.
//!
//! Section order is fixed: uses, inline defines, theme activations, preset
//! activations, meta, style blocks, then content blocks. Sections and blocks
//! are separated by a single blank line.
//!
//! Body lines that would read back as a comment or a block marker are
//! escaped: markdown bodies get a backslash before the first character and
//! verbatim HTML bodies get `&#45;` for the leading dash. Both render as the
//! original text.

use crate::{
    document::{Block, Document, InlineDefine},
    kit::KitRegistry,
    parsing::tokenizer::{COMMENT_MARKER, is_structural},
};

pub fn emit_document(doc: &Document, registry: &KitRegistry) -> String {
    let mut chunks: Vec<String> = vec![];

    if !doc.uses.is_empty() {
        chunks.push(directive_lines("use", &doc.uses));
    }
    for define in &doc.defines {
        chunks.push(emit_define(define));
    }
    if !doc.themes.is_empty() {
        chunks.push(directive_lines("theme", &doc.themes));
    }
    if !doc.presets.is_empty() {
        chunks.push(directive_lines("preset", &doc.presets));
    }
    if !doc.meta.is_empty() {
        let mut lines = vec!["--- meta".to_string()];
        lines.extend(doc.meta.iter().map(|(k, v)| property_line(k, v)));
        chunks.push(lines.join("\n"));
    }
    for style in &doc.styles {
        chunks.push(format!("--- style\n{style}"));
    }

    for (i, block) in doc.blocks.iter().enumerate() {
        let mut lines = comment_lines(doc, |at| at == i);
        emit_block(block, registry, &mut lines);
        chunks.push(lines.join("\n"));
    }
    let trailing = comment_lines(doc, |at| at >= doc.blocks.len());
    if !trailing.is_empty() {
        chunks.push(trailing.join("\n"));
    }

    if chunks.is_empty() {
        return String::new();
    }
    let mut out = chunks.join("\n\n");
    out.push('\n');
    out
}

/// Serializes a single block (and its children) without a trailing newline.
pub fn emit_block_source(block: &Block, registry: &KitRegistry) -> String {
    let mut lines = vec![];
    emit_block(block, registry, &mut lines);
    lines.join("\n")
}

fn emit_block(block: &Block, registry: &KitRegistry, out: &mut Vec<String>) {
    match &block.label {
        Some(label) => out.push(format!("--- {}: {label}", block.block_type)),
        None => out.push(format!("--- {}", block.block_type)),
    }
    out.extend(block.properties.iter().map(|(k, v)| property_line(k, v)));

    if !block.content.is_empty() {
        out.push(String::new());
        out.extend(block.content.lines().map(|line| body_line(line, block.verbatim)));
    }

    for child in &block.children {
        out.push(String::new());
        emit_block(child, registry, out);
    }

    if !block.children.is_empty() || block.verbatim || registry.is_container(&block.block_type) {
        out.push(format!("--- /{}", block.block_type));
    }
}

fn body_line(line: &str, verbatim: bool) -> String {
    let body = line.trim_start();
    // verbatim bodies keep comment lines as text
    if !is_structural(line) || (verbatim && body.starts_with(COMMENT_MARKER)) {
        return line.to_string();
    }
    let indent = &line[..line.len() - body.len()];
    if verbatim {
        format!("{indent}&#45;{}", &body[1..])
    } else {
        format!("{indent}\\{body}")
    }
}

fn emit_define(define: &InlineDefine) -> String {
    let mut lines = vec![format!("--- {}: {}", define.kind.directive(), define.name)];
    lines.extend(define.variables.iter().map(|(k, v)| property_line(k, v)));
    if let Some(css) = &define.raw_css {
        lines.push(String::new());
        lines.push(css.clone());
    }
    lines.join("\n")
}

fn directive_lines(directive: &str, values: &[String]) -> String {
    values
        .iter()
        .map(|v| format!("--- {directive}: {v}"))
        .collect::<Vec<_>>()
        .join("\n")
}

fn comment_lines(doc: &Document, at: impl Fn(usize) -> bool) -> Vec<String> {
    doc.comments
        .iter()
        .filter(|c| at(c.before_block))
        .map(|c| format!("{COMMENT_MARKER} {}", c.text))
        .collect()
}

/// Formats `key: value`, quoting values that would not survive re-parsing bare.
pub(crate) fn property_line(key: &str, value: &str) -> String {
    let value = value.replace(['\r', '\n'], " ");
    let needs_quotes = value.is_empty()
        || value.trim() != value
        || (value.len() >= 2
            && ((value.starts_with('"') && value.ends_with('"'))
                || (value.starts_with('\'') && value.ends_with('\''))));
    if needs_quotes {
        format!("{key}: \"{value}\"")
    } else {
        format!("{key}: {value}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        document::{DefineKind, SourceComment},
        parsing::parse_document,
    };
    use indexmap::IndexMap;
    use pretty_assertions::assert_eq;

    fn registry() -> KitRegistry {
        KitRegistry::with_core()
    }

    #[test]
    fn empty_document_emits_nothing() {
        assert_eq!(emit_document(&Document::new(), &registry()), "");
    }

    #[test]
    fn block_with_properties_and_content() {
        let mut card = Block::new("core/card");
        card.label = Some("Lead".into());
        card.properties.insert("image".into(), "x.jpg".into());
        card.content = "## Title\n\nBody".into();
        assert_eq!(
            emit_block_source(&card, &registry()),
            "--- core/card: Lead\nimage: x.jpg\n\n## Title\n\nBody"
        );
    }

    #[test]
    fn containers_and_verbatim_blocks_get_closing_markers() {
        let mut section = Block::new("core/section");
        section.properties.insert("title".into(), "News".into());
        let mut text = Block::new("core/text");
        text.content = "Hi".into();
        section.children.push(text);

        let mut html = Block::new("core/html");
        html.verbatim = true;
        html.content = "<b>x</b>".into();

        let empty_section = Block::new("core/section");

        let doc = Document {
            blocks: vec![section, html, empty_section],
            ..Document::default()
        };
        assert_eq!(
            emit_document(&doc, &registry()),
            "--- core/section\ntitle: News\n\n--- core/text\n\nHi\n--- /core/section\n\n\
             --- core/html\n\n<b>x</b>\n--- /core/html\n\n\
             --- core/section\n--- /core/section\n"
        );
    }

    #[test]
    fn preamble_order_is_fixed() {
        let mut variables = IndexMap::new();
        variables.insert("primary".to_string(), "#000".to_string());
        let mut meta = IndexMap::new();
        meta.insert("title".to_string(), "Hello".to_string());
        let doc = Document {
            uses: vec!["core".into()],
            defines: vec![InlineDefine {
                kind: DefineKind::Theme,
                name: "dark".into(),
                variables,
                raw_css: Some(".x { color: red; }".into()),
            }],
            themes: vec!["dark".into()],
            presets: vec!["compact".into()],
            meta,
            styles: vec!["core/text\n  color: red".into()],
            ..Document::default()
        };
        assert_eq!(
            emit_document(&doc, &registry()),
            "--- use: core\n\n\
             --- define-theme: dark\nprimary: #000\n\n.x { color: red; }\n\n\
             --- theme: dark\n\n\
             --- preset: compact\n\n\
             --- meta\ntitle: Hello\n\n\
             --- style\ncore/text\n  color: red\n"
        );
    }

    #[test]
    fn comments_are_placed_before_their_block() {
        let mut text = Block::new("core/text");
        text.content = "Body".into();
        let doc = Document {
            comments: vec![
                SourceComment {
                    before_block: 0,
                    text: "first".into(),
                },
                SourceComment {
                    before_block: 1,
                    text: "last".into(),
                },
            ],
            blocks: vec![text],
            ..Document::default()
        };
        assert_eq!(
            emit_document(&doc, &registry()),
            "// first\n--- core/text\n\nBody\n\n// last\n"
        );
    }

    #[test]
    fn awkward_values_are_quoted() {
        assert_eq!(property_line("alt", ""), "alt: \"\"");
        assert_eq!(property_line("alt", " padded "), "alt: \" padded \"");
        assert_eq!(property_line("alt", "\"quoted\""), "alt: \"\"quoted\"\"");
        assert_eq!(property_line("alt", "plain words"), "alt: plain words");
    }

    #[test]
    fn marker_and_comment_shaped_lines_are_escaped() {
        let mut text = Block::new("core/text");
        text.content = "// not a comment\n  --- core/divider\n--- /core/text\nplain".into();
        let mut html = Block::new("core/html");
        html.verbatim = true;
        html.content = "<pre>\n// kept\n--- core/divider\n</pre>".into();
        let doc = Document {
            blocks: vec![text, html],
            ..Document::default()
        };

        let source = emit_document(&doc, &registry());
        assert_eq!(
            source,
            "--- core/text\n\n\\// not a comment\n  \\--- core/divider\n\\--- /core/text\nplain\n\n\
             --- core/html\n\n<pre>\n// kept\n&#45;-- core/divider\n</pre>\n--- /core/html\n"
        );

        let reparsed = parse_document(&source, &registry());
        assert!(reparsed.diagnostics.is_empty(), "{:?}", reparsed.diagnostics);
        assert!(reparsed.document.comments.is_empty());
        let types: Vec<&str> = reparsed
            .document
            .blocks
            .iter()
            .map(|b| b.block_type.as_str())
            .collect();
        assert_eq!(types, ["core/text", "core/html"]);
        assert_eq!(
            reparsed.document.blocks[1].content,
            "<pre>\n// kept\n&#45;-- core/divider\n</pre>"
        );
        assert_eq!(emit_document(&reparsed.document, &registry()), source);
    }

    #[test]
    fn emitted_source_reparses_to_the_same_tree() {
        let source = "\
--- use: core

--- meta
title: Issue 12

// opening remark
--- core/heading
level: 1

Welcome

--- core/section: Stories
title: Top stories

--- core/card
image: a.jpg
link: https://example.com/a

Story **one**

--- core/text

key: value looking line
--- /core/section

--- core/image
src: b.png
alt: \"\"

--- core/html

<table><tr><td>x</td></tr></table>
--- /core/html
";
        let registry = registry();
        let first = parse_document(source, &registry);
        assert!(first.diagnostics.is_empty(), "{:?}", first.diagnostics);
        let emitted = emit_document(&first.document, &registry);
        let second = parse_document(&emitted, &registry);
        assert!(second.diagnostics.is_empty(), "{:?}", second.diagnostics);
        assert!(first.document.same_structure(&second.document));
        assert_eq!(first.document.comments, second.document.comments);
        assert_eq!(emit_document(&second.document, &registry), emitted);
    }
}
