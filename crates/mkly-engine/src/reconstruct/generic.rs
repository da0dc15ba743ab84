use crate::{document::Document, kit::KitRegistry};

use super::{
    classify::classify_segment, preserved::page_title, segments::split_segments,
    strip::strip_boilerplate, unwrap::unwrap_layout_tables,
};

/// Foreign HTML: strip, unwrap, split, classify.
pub fn reconstruct_generic(html: &str, registry: &KitRegistry) -> Document {
    let mut doc = Document::new();
    if let Some(title) = page_title(html) {
        doc.meta.insert("title".to_string(), title);
    }

    let stripped = strip_boilerplate(html);
    let unwrapped = unwrap_layout_tables(&stripped);
    let segments = split_segments(&unwrapped);
    log::debug!("classifying {} segments of foreign html", segments.len());

    doc.blocks = segments
        .iter()
        .filter_map(|s| classify_segment(s, registry))
        .map(|b| b.into_block())
        .collect();
    doc
}
