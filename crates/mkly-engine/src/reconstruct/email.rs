//! Email-origin reconstruction.
//!
//! The email target wraps each block in `<!-- mkly-block: <type> -->` and
//! `<!-- /mkly-block -->` comments. Older output has no markers; for that the
//! reconstructor falls back to padded layout cells, then to styled text
//! elements.

use std::collections::HashSet;

use crate::{
    diagnostics::{Diagnostic, Diagnostics},
    document::Document,
    html::{
        self, attrs,
        scan::{ElementIndex, HtmlTokenKind, Scanner, find_elements, first_element, inner_html},
    },
    kit::{ContentMode, KitRegistry},
};

use super::{
    ParsedBlock,
    preserved::{apply_preamble, page_title},
    strip::strip_boilerplate,
    web::parsers,
};

const BLOCK_MARKER: &str = "mkly-block:";
const BLOCK_END_MARKER: &str = "/mkly-block";

pub fn reconstruct_email(html: &str, registry: &KitRegistry, diags: &mut Diagnostics) -> Document {
    let mut blocks = marked_sections(html, registry, diags);
    log::debug!("found {} marked email sections", blocks.len());

    if blocks.len() <= 1 {
        let cleaned = strip_boilerplate(html);
        let mut seen = HashSet::new();
        let mut recovered = padded_cells(&cleaned, &mut seen);
        if recovered.is_empty() {
            recovered = styled_elements(&cleaned, &mut seen);
        }
        log::debug!("heuristic email scan recovered {} blocks", recovered.len());
        if recovered.len() > blocks.len() {
            blocks = recovered;
        }
    }

    let mut doc = Document::new();
    apply_preamble(html, &blocks, &mut doc, registry, diags);
    if !doc.meta.contains_key("title")
        && let Some(title) = page_title(html)
    {
        doc.meta.insert("title".to_string(), title);
    }
    doc.blocks = blocks.into_iter().map(ParsedBlock::into_block).collect();
    doc
}

/// An opening marker: block type, optional label, and where its span starts.
struct Marker {
    block_type: String,
    label: Option<String>,
    body_start: usize,
}

fn marked_sections(html: &str, registry: &KitRegistry, diags: &mut Diagnostics) -> Vec<ParsedBlock> {
    let mut blocks = vec![];
    let mut open: Option<Marker> = None;

    for tok in Scanner::new(html) {
        if tok.kind != HtmlTokenKind::Comment {
            continue;
        }
        let body = tok
            .text(html)
            .trim_start_matches("<!--")
            .trim_end_matches("-->")
            .trim();
        if body == BLOCK_END_MARKER {
            if let Some(marker) = open.take() {
                blocks.extend(section(&marker, &html[marker.body_start..tok.start], registry, diags));
            }
        } else if let Some(decl) = body.strip_prefix(BLOCK_MARKER) {
            if let Some(marker) = open.take() {
                blocks.extend(section(&marker, &html[marker.body_start..tok.start], registry, diags));
            }
            let (block_type, label) = match decl.trim().split_once(':') {
                Some((t, l)) => (t.trim(), Some(l.trim().to_string()).filter(|l| !l.is_empty())),
                None => (decl.trim(), None),
            };
            open = Some(Marker {
                block_type: block_type.to_string(),
                label,
                body_start: tok.end,
            });
        }
    }
    if let Some(marker) = open {
        blocks.extend(section(&marker, &html[marker.body_start..], registry, diags));
    }
    blocks
}

fn section(
    marker: &Marker,
    span: &str,
    registry: &KitRegistry,
    diags: &mut Diagnostics,
) -> Option<ParsedBlock> {
    let block_type = marker.block_type.as_str();
    if block_type.is_empty() {
        return None;
    }
    let mode = match registry.block_type(block_type) {
        Some(def) => def.content_mode,
        None => {
            diags.push(
                Diagnostic::warning(format!("Unknown block type \"{block_type}\""), 0)
                    .with_block_type(block_type),
            );
            ContentMode::Mixed
        }
    };

    let mut block = match (mode, parsers::core_parser(block_type)) {
        (ContentMode::Verbatim, _) => {
            let mut block = ParsedBlock::new(block_type).with_content(span.trim());
            block.verbatim = true;
            block
        }
        (_, Some(parse)) => parse(&format!("<div>{span}</div>")),
        (_, None) => ParsedBlock::new(block_type).with_content(html::html_to_markdown(span)),
    };
    block.block_type = block_type.to_string();
    block.label = marker.label.clone();
    Some(block)
}

fn is_padded(open_tag: &str) -> bool {
    attrs::style_value(open_tag, "padding")
        .is_some_and(|p| p.split_whitespace().any(|v| v.trim_end_matches("px") != "0"))
}

/// Leaf `<td>` cells with padding, as heading or text blocks.
fn padded_cells(html: &str, seen: &mut HashSet<String>) -> Vec<ParsedBlock> {
    let index = ElementIndex::new(html);
    index
        .named_with_nesting("td")
        .into_iter()
        .filter(|(cell, nested)| !nested && is_padded(cell.range.open_tag(html)))
        .filter_map(|(cell, _)| text_or_heading(cell.inner(html), seen))
        .collect()
}

/// Styled headings, paragraphs and divs of CSS-inlined output.
fn styled_elements(html: &str, seen: &mut HashSet<String>) -> Vec<ParsedBlock> {
    find_elements(html, |name, tag| {
        matches!(name, "h1" | "h2" | "h3" | "h4" | "h5" | "h6" | "p" | "div") && attrs::has_attr(tag, "style")
    })
    .into_iter()
    .filter_map(|range| text_or_heading(range.outer(html), seen))
    .collect()
}

fn text_or_heading(markup: &str, seen: &mut HashSet<String>) -> Option<ParsedBlock> {
    let heading = first_element(markup, |n, _| matches!(n, "h1" | "h2" | "h3" | "h4" | "h5" | "h6"));
    let block = match heading {
        Some(range) => {
            let outer = range.outer(markup);
            let level = outer[2..3].to_string();
            ParsedBlock::new("core/heading")
                .with_property("level", level)
                .with_content(html::html_to_markdown(inner_html(outer)))
        }
        None => ParsedBlock::new("core/text").with_content(html::html_to_markdown(markup)),
    };
    if block.content.is_empty() || !seen.insert(block.content.clone()) {
        return None;
    }
    Some(block)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn rebuild(html: &str) -> (Document, Diagnostics) {
        let mut diags = Diagnostics::new();
        let doc = reconstruct_email(html, &KitRegistry::with_core(), &mut diags);
        (doc, diags)
    }

    #[test]
    fn comment_markers_delimit_blocks() {
        let html = r#"<html><head><title>Issue 7</title>
<meta name="mkly:use" content="core"></head><body>
<!--[if mso]><table role="presentation"><![endif]-->
<!-- mkly-block: core/heading --><h1 style="font-size:28px">Hello</h1><!-- /mkly-block -->
<!-- mkly-block: core/text: Intro --><p style="margin:0">First <strong>issue</strong>.</p><!-- /mkly-block -->
<!-- mkly-block: core/button --><a href="https://e.com/go" style="padding:8px">Go</a>
</body></html>"#;
        let (doc, diags) = rebuild(html);
        assert!(diags.is_empty());
        assert_eq!(doc.uses, ["core"]);
        assert_eq!(doc.meta["title"], "Issue 7");
        assert_eq!(doc.blocks.len(), 3);
        assert_eq!(doc.blocks[0].properties["level"], "1");
        assert_eq!(doc.blocks[0].content, "Hello");
        assert_eq!(doc.blocks[1].label.as_deref(), Some("Intro"));
        assert_eq!(doc.blocks[1].content, "First **issue**.");
        assert_eq!(doc.blocks[2].properties["url"], "https://e.com/go");
        assert_eq!(doc.blocks[2].properties["label"], "Go");
    }

    #[test]
    fn unknown_marker_type_warns() {
        let html = "<!-- mkly-block: odd/thing --><p>x</p><!-- /mkly-block --><!-- mkly-block: core/text --><p>y</p>";
        let (doc, diags) = rebuild(html);
        assert_eq!(diags.len(), 1);
        assert_eq!(doc.blocks[0].block_type, "odd/thing");
        assert_eq!(doc.blocks[0].content, "x");
    }

    #[test]
    fn padded_cells_without_markers() {
        let html = r#"<table role="presentation"><tr><td>
  <table><tr><td style="padding: 20px 30px"><h2>News</h2></td></tr>
  <tr><td style="padding: 0 30px"><p>Body text</p></td></tr>
  <tr><td style="padding: 0 30px"><p>Body text</p></td></tr></table>
</td></tr></table>"#;
        let (doc, _) = rebuild(html);
        let types: Vec<&str> = doc.blocks.iter().map(|b| b.block_type.as_str()).collect();
        assert_eq!(types, ["core/heading", "core/text"]);
        assert_eq!(doc.blocks[0].properties["level"], "2");
    }

    #[test]
    fn styled_elements_when_no_cells() {
        let html = r#"<head><meta name="subject" content="Monthly"></head>
<div style="max-width:600px"><h1 style="color:#111">Monthly</h1></div><p style="margin:0">Hi</p><p>plain</p>"#;
        let (doc, _) = rebuild(html);
        assert_eq!(doc.meta["title"], "Monthly");
        let contents: Vec<&str> = doc.blocks.iter().map(|b| b.content.as_str()).collect();
        assert_eq!(contents, ["Monthly", "Hi"]);
    }
}
