//! Tier 2: layout-table unwrapping.
//!
//! Email-era HTML nests content several tables deep purely for positioning.
//! A layout table is replaced by the trimmed contents of its non-empty cells;
//! data tables (no layout signature, no nested table) are left alone.

use crate::html::{
    attrs,
    scan::{ElementIndex, HtmlToken, HtmlTokenKind, Scanner, find_ci},
    text_content,
};

/// Upper bound on rewrite passes, whatever the nesting depth of the input.
pub const MAX_UNWRAP_PASSES: usize = 10;

/// Table structure tags dropped inside a layout table.
const STRUCTURE_TAGS: &[&str] = &["tr", "tbody", "thead", "tfoot", "colgroup", "col", "caption"];

pub fn unwrap_layout_tables(html: &str) -> String {
    let mut current = html.to_string();
    for pass in 0..MAX_UNWRAP_PASSES {
        let next = unwrap_pass(&current);
        if next == current {
            log::debug!("layout tables settled after {pass} passes");
            return current;
        }
        current = next;
    }
    log::warn!("layout table unwrapping stopped after {MAX_UNWRAP_PASSES} passes");
    current
}

/// One left-to-right rewrite. Layout tables at every depth lose their table,
/// row and cell tags; cells are trimmed and empty ones dropped.
fn unwrap_pass(src: &str) -> String {
    let mut out = String::with_capacity(src.len());
    // layout flag of each open table
    let mut tables: Vec<bool> = vec![];
    // (table depth, output offset) of each open layout cell
    let mut cells: Vec<(usize, usize)> = vec![];
    let index = ElementIndex::new(src);
    let nested: Vec<bool> = index
        .named_with_nesting("table")
        .into_iter()
        .map(|(_, nested)| nested)
        .collect();
    let mut table_no = 0;

    for tok in Scanner::new(src) {
        let in_layout = tables.last().copied().unwrap_or(false);
        match &tok.kind {
            HtmlTokenKind::Open { name, .. } if name == "table" => {
                let layout = is_layout_table(src, &tok) || nested.get(table_no).copied().unwrap_or(false);
                table_no += 1;
                tables.push(layout);
                if !layout {
                    out.push_str(tok.text(src));
                }
            }
            HtmlTokenKind::Close { name } if name == "table" => {
                let Some(layout) = tables.last().copied() else {
                    out.push_str(tok.text(src));
                    continue;
                };
                close_cells(&mut out, &mut cells, tables.len());
                tables.pop();
                if !layout {
                    out.push_str(tok.text(src));
                }
            }
            HtmlTokenKind::Open { name, .. } if in_layout && (name == "td" || name == "th") => {
                close_cells(&mut out, &mut cells, tables.len());
                cells.push((tables.len(), out.len()));
            }
            HtmlTokenKind::Close { name } if in_layout && (name == "td" || name == "th") => {
                close_cells(&mut out, &mut cells, tables.len());
            }
            HtmlTokenKind::Open { name, .. } | HtmlTokenKind::Close { name }
                if in_layout && STRUCTURE_TAGS.contains(&name.as_str()) => {}
            _ => out.push_str(tok.text(src)),
        }
    }

    close_cells(&mut out, &mut cells, 0);
    out
}

/// Layout signature on the open tag itself. Tables holding another table
/// count as layout too; `unwrap_pass` reads that from the element index.
fn is_layout_table(src: &str, tok: &HtmlToken) -> bool {
    let tag = tok.text(src);
    let full_width = attrs::attr(tag, "width")
        .or_else(|| attrs::style_value(tag, "width"))
        .is_some_and(|w| w.trim() == "100%");
    let presentation = attrs::attr(tag, "role").is_some_and(|r| r.eq_ignore_ascii_case("presentation"));
    full_width || presentation || attrs::has_attr(tag, "cellpadding") || attrs::has_attr(tag, "cellspacing")
}

/// Finishes every open cell at `depth` or deeper.
fn close_cells(out: &mut String, cells: &mut Vec<(usize, usize)>, depth: usize) {
    while let Some(&(cell_depth, start)) = cells.last() {
        if cell_depth < depth {
            break;
        }
        cells.pop();
        let content = out[start..].trim().to_string();
        out.truncate(start);
        if !is_blank_cell(&content) {
            out.push_str(&content);
            out.push('\n');
        }
    }
}

fn is_blank_cell(content: &str) -> bool {
    text_content(content).is_empty() && find_ci(content, "<img", 0).is_none()
}
