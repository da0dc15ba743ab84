//! Tier 1: boilerplate removal for foreign HTML.

use crate::html::{
    attrs,
    scan::{HtmlTokenKind, Scanner, element_range, first_element, inner_html},
};

/// URL fragments that identify open-tracking images.
const TRACKER_HINTS: &[&str] = &[
    "/track/open",
    "/trk",
    "/wf/open",
    "/open.gif",
    "/o.gif",
    "pixel.gif",
    "beacon",
    "list-manage.com/track",
    "mailtrack",
    "doubleclick.net",
];

/// Removes scripts, styles, comments, tracking pixels and `<link>`/`<meta>`
/// tags, then narrows to the `<body>` contents (or drops the `<html>`/`<head>`
/// wrappers when there is no body).
pub fn strip_boilerplate(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut skip_until = 0;

    for tok in Scanner::new(html) {
        if tok.start < skip_until {
            continue;
        }
        match &tok.kind {
            HtmlTokenKind::Comment | HtmlTokenKind::Declaration => {}
            HtmlTokenKind::Open { name, .. } => match name.as_str() {
                "script" | "style" | "noscript" => {
                    skip_until = element_range(html, &tok).end;
                }
                "link" | "meta" => {}
                "img" if is_tracking_pixel(tok.text(html)) => {}
                _ => out.push_str(tok.text(html)),
            },
            _ => out.push_str(tok.text(html)),
        }
    }

    if let Some(body) = first_element(&out, |name, _| name == "body") {
        return inner_html(body.outer(&out)).trim().to_string();
    }

    let mut unwrapped = String::with_capacity(out.len());
    let mut skip_until = 0;
    for tok in Scanner::new(&out) {
        if tok.start < skip_until {
            continue;
        }
        match &tok.kind {
            HtmlTokenKind::Open { name, .. } if name == "head" => {
                skip_until = element_range(&out, &tok).end;
            }
            HtmlTokenKind::Open { name, .. } | HtmlTokenKind::Close { name }
                if name == "html" || name == "head" => {}
            _ => unwrapped.push_str(tok.text(&out)),
        }
    }
    unwrapped.trim().to_string()
}

fn is_tracking_pixel(tag: &str) -> bool {
    let tiny = |attr: &str| {
        attrs::attr(tag, attr)
            .or_else(|| attrs::style_value(tag, attr))
            .is_some_and(|v| matches!(v.trim().trim_end_matches("px"), "0" | "1"))
    };
    if tiny("width") && tiny("height") {
        return true;
    }
    attrs::attr(tag, "src").is_some_and(|src| {
        let src = src.to_ascii_lowercase();
        TRACKER_HINTS.iter().any(|hint| src.contains(hint))
    })
}
