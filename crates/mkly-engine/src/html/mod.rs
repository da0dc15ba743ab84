//! # HTML Utilities
//!
//! Shared helpers for every reconstruction path. [`scan`] walks tags with
//! byte offsets so callers can slice the original markup, [`attrs`] reads
//! attributes from a single open tag and [`markdown`] turns a fragment into
//! markdown content. Visible text comes from a `scraper` parse of the fragment,
//! walked without recursion so nesting depth never matters.

pub mod attrs;
pub mod markdown;
pub mod scan;

pub use attrs::{attr, class_mentions, classes, has_class, style_value};
pub use markdown::html_to_markdown;
pub use scan::{find_elements, first_element, inner_html, open_tag, remove_elements, root_name};

use ego_tree::iter::Edge;
use scraper::{Html, Node};

/// Elements that start a new line of visible text.
const BLOCK_LEVEL: &[&str] = &[
    "p", "div", "br", "li", "tr", "td", "th", "h1", "h2", "h3", "h4", "h5", "h6", "blockquote",
    "section", "article", "header", "footer", "table", "ul", "ol", "hr", "pre",
];

/// Elements whose text is never visible.
const HIDDEN: &[&str] = &["script", "style", "title", "template"];

pub fn decode_entities(s: &str) -> String {
    html_escape::decode_html_entities(s).into_owned()
}

/// Visible text of a fragment: tags removed, entities decoded, whitespace
/// collapsed to single spaces.
pub fn text_content(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    let mut raw = String::new();
    let mut hidden_depth = 0usize;
    for edge in fragment.tree.root().traverse() {
        match edge {
            Edge::Open(node) => match node.value() {
                Node::Element(el) => {
                    if HIDDEN.contains(&el.name()) {
                        hidden_depth += 1;
                    }
                    if BLOCK_LEVEL.contains(&el.name()) {
                        raw.push(' ');
                    }
                }
                Node::Text(text) if hidden_depth == 0 => raw.push_str(text),
                _ => {}
            },
            Edge::Close(node) => {
                if let Node::Element(el) = node.value() {
                    if HIDDEN.contains(&el.name()) {
                        hidden_depth = hidden_depth.saturating_sub(1);
                    }
                    if BLOCK_LEVEL.contains(&el.name()) {
                        raw.push(' ');
                    }
                }
            }
        }
    }
    collapse_whitespace(&raw)
}

/// Text of a fragment with tags removed and entities decoded, whitespace kept.
pub fn raw_text(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    fragment
        .tree
        .root()
        .descendants()
        .filter_map(|node| node.value().as_text())
        .fold(String::new(), |mut out, text| {
            out.push_str(text);
            out
        })
}

/// Deepest element nesting in a parsed fragment.
pub(crate) fn nesting_depth(fragment: &Html) -> usize {
    let mut depth = 0usize;
    let mut deepest = 0;
    for edge in fragment.tree.root().traverse() {
        match edge {
            Edge::Open(node) if node.value().is_element() => {
                depth += 1;
                deepest = deepest.max(depth);
            }
            Edge::Close(node) if node.value().is_element() => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    deepest
}

/// Joins runs of whitespace (including non-breaking spaces) into one space.
pub fn collapse_whitespace(s: &str) -> String {
    s.split(|c: char| c.is_whitespace() || c == '\u{a0}')
        .filter(|w| !w.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
