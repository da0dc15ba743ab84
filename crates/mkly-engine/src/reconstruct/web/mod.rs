//! Web-origin reconstruction.
//!
//! Blocks are found by their root class, taking the full depth-balanced outer
//! markup of each outermost marked element. Marked elements nested inside
//! another only surface as children of container types. Everything between
//! marked elements is kept, at the top level and inside containers alike:
//! meaningful markup becomes verbatim `core/html` blocks and author comments
//! go into `Document.comments`. Comments found inside a container are placed
//! just before that container, since mkly only records top-level comments.

pub mod parsers;

use std::collections::HashMap;

use crate::{
    diagnostics::Diagnostics,
    document::{Document, SourceComment},
    html::{
        attrs,
        scan::{ElementRange, find_elements, find_ci, first_element, inner_html, open_tag, remove_elements},
        text_content,
    },
    kit::{ClassMapping, ElementParser, KitRegistry},
};

use super::{
    ParsedBlock,
    preserved::{apply_preamble, author_comments},
};

pub const LABEL_ATTR: &str = "data-mkly-label";
pub const STYLE_ATTR: &str = "data-mkly-style";

/// Containers nested deeper than this keep their inner markup verbatim.
pub const MAX_CONTAINER_DEPTH: usize = 64;

/// Root class to block type, built fresh for every call.
struct ClassTable<'r> {
    registry: &'r KitRegistry,
    by_class: HashMap<String, ClassMapping>,
}

impl<'r> ClassTable<'r> {
    fn new(registry: &'r KitRegistry) -> Self {
        let mut by_class = HashMap::new();
        // later mappings override earlier ones
        for mapping in registry.class_mappings() {
            by_class.insert(mapping.class.clone(), mapping);
        }
        Self { registry, by_class }
    }

    /// The mapping for the first recognised root class on `open_tag`.
    /// BEM elements (`__`) and modifiers (`--`) are never roots.
    fn root_mapping(&self, open_tag: &str) -> Option<&ClassMapping> {
        attrs::classes(open_tag)
            .iter()
            .filter(|c| !c.contains("__") && !c.contains("--"))
            .find_map(|c| self.by_class.get(c))
    }

    fn marked_elements(&self, src: &str) -> Vec<(ElementRange, &ClassMapping)> {
        find_elements(src, |_, tag| self.root_mapping(tag).is_some())
            .into_iter()
            .filter_map(|range| {
                self.root_mapping(range.open_tag(src))
                    .map(|mapping| (range, mapping))
            })
            .collect()
    }

    /// Parses one marked element. `hoisted` collects author comments met
    /// inside containers.
    fn parse_element(
        &self,
        outer: &str,
        mapping: &ClassMapping,
        depth: usize,
        hoisted: &mut Vec<String>,
    ) -> ParsedBlock {
        let block_type = mapping.block_type.as_str();
        let parser: Option<ElementParser> = mapping.parse.or_else(|| parsers::core_parser(block_type));
        let mut block = match parser {
            Some(parse) => parse(outer),
            None => parsers::fallback(block_type, outer),
        };
        block.block_type = block_type.to_string();

        let tag = open_tag(outer);
        if block.label.is_none() {
            block.label = attrs::attr(tag, LABEL_ATTR).filter(|l| !l.is_empty());
        }
        if block.style_entries.is_empty()
            && let Some(style) = attrs::attr(tag, STYLE_ATTR)
        {
            block.style_entries = attrs::parse_declarations(&style);
        }

        if self.registry.is_container(block_type) && block.children.is_empty() {
            let inner = inner_html(outer);
            if depth >= MAX_CONTAINER_DEPTH {
                log::warn!("{block_type} is nested {depth} containers deep, keeping its markup verbatim");
                keep_markup(inner, &mut block.children);
                return block;
            }

            // the container's own BEM parts were read by its parser
            let own_part = format!("{}__", mapping.class);
            let mut cursor = 0;
            for (range, m) in self.marked_elements(inner) {
                let gap = without_parts(&inner[cursor..range.start], &own_part);
                keep_gap(&gap, &mut block.children, |_, text| hoisted.push(text));
                let child = self.parse_element(range.outer(inner), m, depth + 1, hoisted);
                block.children.push(child);
                cursor = range.end;
            }
            let gap = without_parts(&inner[cursor..], &own_part);
            keep_gap(&gap, &mut block.children, |_, text| hoisted.push(text));
            log::trace!("{block_type} container has {} children", block.children.len());
        }
        block
    }
}

pub fn reconstruct_web(html: &str, registry: &KitRegistry, diags: &mut Diagnostics) -> Document {
    let body = first_element(html, |name, _| name == "body")
        .map_or(html, |r| inner_html(r.outer(html)));

    let table = ClassTable::new(registry);
    let marked = table.marked_elements(body);
    log::debug!("found {} marked web blocks", marked.len());

    let mut doc = Document::new();
    let mut parsed: Vec<ParsedBlock> = vec![];
    let mut cursor = 0;
    let mut comments: Vec<SourceComment> = vec![];
    let mut keep_comment = |at: usize, text: String| comments.push(SourceComment { before_block: at, text });
    for (range, mapping) in &marked {
        keep_gap(&body[cursor..range.start], &mut parsed, &mut keep_comment);
        let mut hoisted = vec![];
        let block = table.parse_element(range.outer(body), mapping, 0, &mut hoisted);
        for text in hoisted {
            keep_comment(parsed.len(), text);
        }
        parsed.push(block);
        cursor = range.end;
    }
    keep_gap(&body[cursor..], &mut parsed, &mut keep_comment);
    doc.comments = comments;

    apply_preamble(html, &parsed, &mut doc, registry, diags);
    doc.blocks = parsed.into_iter().map(ParsedBlock::into_block).collect();
    doc
}

/// Interleaves author comments and leftover markup found between blocks.
/// `on_comment` gets each comment with the number of blocks before it.
fn keep_gap(gap: &str, parsed: &mut Vec<ParsedBlock>, mut on_comment: impl FnMut(usize, String)) {
    let mut from = 0;
    for (offset, text) in author_comments(gap) {
        keep_markup(&gap[from..offset], parsed);
        on_comment(parsed.len(), text);
        from = gap[offset..].find("-->").map_or(gap.len(), |end| offset + end + 3);
    }
    keep_markup(&gap[from..], parsed);
}

/// `markup` without elements carrying a class that starts with `part_prefix`.
fn without_parts(markup: &str, part_prefix: &str) -> String {
    remove_elements(markup, |_, outer| {
        attrs::classes(open_tag(outer))
            .iter()
            .any(|c| c.starts_with(part_prefix))
    })
}

fn keep_markup(markup: &str, parsed: &mut Vec<ParsedBlock>) {
    let cleaned = remove_elements(markup, |name, _| matches!(name, "script" | "style" | "noscript"));
    let cleaned = cleaned.trim();
    let meaningful = !text_content(cleaned).is_empty() || find_ci(cleaned, "<img", 0).is_some();
    if meaningful {
        let mut block = ParsedBlock::new("core/html").with_content(cleaned);
        block.verbatim = true;
        parsed.push(block);
    }
}
