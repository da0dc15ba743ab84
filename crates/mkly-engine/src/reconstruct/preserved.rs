//! Round-trip payloads embedded in generated HTML, and the document preamble
//! recovered from them.

use std::sync::LazyLock;

use indexmap::IndexMap;
use regex::Regex;

use crate::{
    diagnostics::Diagnostics,
    document::{DefineKind, Document, InlineDefine},
    html::{
        attrs,
        scan::{HtmlTokenKind, Scanner, find_elements, inner_html},
        text_content,
    },
    kit::KitRegistry,
    parsing::parse_document,
};

use super::ParsedBlock;

pub(crate) const STYLE_SCRIPT_TYPE: &str = "text/mkly-style";
pub(crate) const DEFINES_SCRIPT_TYPE: &str = "text/mkly-defines";
/// Joins several preserved style blocks inside one script element.
pub(crate) const STYLE_BREAK: &str = "\n/* mkly:style-break */\n";
pub(crate) const COMMENT_PREFIX: &str = "mkly-c:";
const META_PREFIX: &str = "mkly:";

static CSS_VAR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"--mkly-([A-Za-z0-9_-]+)\s*:\s*([^;}]+)").expect("CSS_VAR_RE: hardcoded regex is valid")
});

/// Body of the first `<script type="...">` of the given type, untouched.
fn script_body(html: &str, script_type: &str) -> Option<String> {
    find_elements(html, |name, tag| {
        name == "script" && attrs::attr(tag, "type").is_some_and(|t| t.eq_ignore_ascii_case(script_type))
    })
    .first()
    .map(|r| inner_html(r.outer(html)).to_string())
}

pub(crate) fn preserved_styles(html: &str) -> Option<Vec<String>> {
    let body = script_body(html, STYLE_SCRIPT_TYPE)?;
    let styles: Vec<String> = body
        .split(STYLE_BREAK)
        .map(|s| s.trim_matches('\n').to_string())
        .filter(|s| !s.trim().is_empty())
        .collect();
    (!styles.is_empty()).then_some(styles)
}

/// Inline defines restored by re-parsing the preserved mkly text.
pub(crate) fn preserved_defines(
    html: &str,
    registry: &KitRegistry,
    diags: &mut Diagnostics,
) -> Option<Vec<InlineDefine>> {
    let body = script_body(html, DEFINES_SCRIPT_TYPE)?;
    let parsed = parse_document(&body, registry);
    diags.extend(parsed.diagnostics);
    Some(parsed.document.defines)
}

/// `--mkly-*` custom properties found in `<style>` elements, as one theme.
pub(crate) fn css_variable_theme(html: &str) -> Option<InlineDefine> {
    let mut variables = IndexMap::new();
    for range in find_elements(html, |name, _| name == "style") {
        let css = inner_html(range.outer(html));
        for caps in CSS_VAR_RE.captures_iter(css) {
            variables.insert(caps[1].to_string(), caps[2].trim().to_string());
        }
    }
    (!variables.is_empty()).then(|| InlineDefine {
        kind: DefineKind::Theme,
        name: "recovered".to_string(),
        variables,
        raw_css: None,
    })
}

/// `<meta name="mkly:*">` values applied to the document preamble.
pub(crate) fn apply_meta_tags(html: &str, doc: &mut Document) {
    for tok in Scanner::new(html) {
        let HtmlTokenKind::Open { name, .. } = &tok.kind else {
            continue;
        };
        if name != "meta" {
            continue;
        }
        let tag = tok.text(html);
        let Some(key) = attrs::attr(tag, "name").and_then(|n| n.strip_prefix(META_PREFIX).map(str::to_string))
        else {
            continue;
        };
        let value = attrs::attr(tag, "content").unwrap_or_default();
        match key.as_str() {
            "use" => doc.uses.push(value),
            "theme" => doc.themes.push(value),
            "preset" => doc.presets.push(value),
            _ => {
                doc.meta.insert(key, value);
            }
        }
    }
}

/// Restores meta, defines and styles shared by the web and email paths.
///
/// Preserved sources win; the CSS-variable scrape and the per-block style
/// entries are only used when they are absent.
pub(crate) fn apply_preamble(
    html: &str,
    blocks: &[ParsedBlock],
    doc: &mut Document,
    registry: &KitRegistry,
    diags: &mut Diagnostics,
) {
    apply_meta_tags(html, doc);

    match preserved_defines(html, registry, diags) {
        Some(defines) => doc.defines = defines,
        None => doc.defines.extend(css_variable_theme(html)),
    }

    match preserved_styles(html) {
        Some(styles) => doc.styles = styles,
        None => doc.styles.extend(style_from_entries(blocks)),
    }
}

/// One `style` body built from preserved per-block inline overrides.
pub(crate) fn style_from_entries(blocks: &[ParsedBlock]) -> Option<String> {
    fn collect(blocks: &[ParsedBlock], lines: &mut Vec<String>) {
        for block in blocks {
            if !block.style_entries.is_empty() {
                match &block.label {
                    Some(label) => lines.push(format!("{}:{label}", block.block_type)),
                    None => lines.push(block.block_type.clone()),
                }
                lines.extend(block.style_entries.iter().map(|(p, v)| format!("  {p}: {v}")));
            }
            collect(&block.children, lines);
        }
    }
    let mut lines = vec![];
    collect(blocks, &mut lines);
    (!lines.is_empty()).then(|| lines.join("\n"))
}

/// Preserved author comments with their byte offsets in `html`.
pub(crate) fn author_comments(html: &str) -> Vec<(usize, String)> {
    Scanner::new(html)
        .filter(|t| t.kind == HtmlTokenKind::Comment)
        .filter_map(|t| {
            let body = t.text(html).trim_start_matches("<!--").trim_end_matches("-->").trim();
            body.strip_prefix(COMMENT_PREFIX)
                .map(|text| (t.start, text.trim().to_string()))
        })
        .collect()
}

/// `<title>` text, falling back to a `subject` meta tag.
pub(crate) fn page_title(html: &str) -> Option<String> {
    let title = find_elements(html, |name, _| name == "title")
        .first()
        .map(|r| text_content(inner_html(r.outer(html))))
        .filter(|t| !t.is_empty());
    title.or_else(|| {
        Scanner::new(html).find_map(|t| {
            let tag = t.text(html);
            let is_subject = matches!(&t.kind, HtmlTokenKind::Open { name, .. } if name == "meta")
                && attrs::attr(tag, "name").is_some_and(|n| n.eq_ignore_ascii_case("subject"));
            is_subject
                .then(|| attrs::attr(tag, "content"))
                .flatten()
                .filter(|c| !c.trim().is_empty())
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn style_script_is_split_on_breaks() {
        let html = format!(
            "<script type=\"text/mkly-style\">core/text\n  color: red{STYLE_BREAK}core/card\n  padding: 4px</script>"
        );
        assert_eq!(
            preserved_styles(&html),
            Some(vec![
                "core/text\n  color: red".to_string(),
                "core/card\n  padding: 4px".to_string()
            ])
        );
        assert_eq!(preserved_styles("<p>x</p>"), None);
    }

    #[test]
    fn defines_are_reparsed() {
        let html = "<script type=\"text/mkly-defines\">--- define-theme: brand\nprimary: #123456\n</script>";
        let mut diags = Diagnostics::new();
        let defines = preserved_defines(html, &KitRegistry::with_core(), &mut diags).unwrap();
        assert!(diags.is_empty());
        assert_eq!(defines[0].name, "brand");
        assert_eq!(defines[0].variables["primary"], "#123456");
    }

    #[test]
    fn css_variables_fall_back_to_a_recovered_theme() {
        let html = "<style>:root { --mkly-primary: #f00; --mkly-font-body: Georgia, serif; }</style>";
        let theme = css_variable_theme(html).unwrap();
        assert_eq!(theme.name, "recovered");
        assert_eq!(theme.variables["primary"], "#f00");
        assert_eq!(theme.variables["font-body"], "Georgia, serif");
    }

    #[test]
    fn meta_tags_fill_the_preamble() {
        let html = r#"<meta name="mkly:use" content="core"><meta name="mkly:use" content="news">
            <meta name="mkly:theme" content="dark"><meta name="mkly:title" content="Issue 3">
            <meta name="viewport" content="width=device-width">"#;
        let mut doc = Document::new();
        apply_meta_tags(html, &mut doc);
        assert_eq!(doc.uses, ["core", "news"]);
        assert_eq!(doc.themes, ["dark"]);
        assert_eq!(doc.meta.len(), 1);
        assert_eq!(doc.meta["title"], "Issue 3");
    }

    #[test]
    fn style_entries_become_one_style_block() {
        let mut card = ParsedBlock::new("core/card");
        card.label = Some("Lead".into());
        card.style_entries = vec![("padding".into(), "8px".into())];
        let mut section = ParsedBlock::new("core/section");
        section.style_entries = vec![("background".into(), "#eee".into())];
        section.children.push(card);
        assert_eq!(
            style_from_entries(&[section]).as_deref(),
            Some("core/section\n  background: #eee\ncore/card:Lead\n  padding: 8px")
        );
    }

    #[test]
    fn author_comments_keep_offsets() {
        let html = "<p>a</p><!-- mkly-c: keep me --><!-- other -->";
        assert_eq!(author_comments(html), [(8, "keep me".to_string())]);
    }

    #[test]
    fn title_then_subject() {
        assert_eq!(page_title("<title> Hi </title>").as_deref(), Some("Hi"));
        assert_eq!(
            page_title(r#"<meta name="subject" content="Weekly">"#).as_deref(),
            Some("Weekly")
        );
        assert_eq!(page_title("<p>x</p>"), None);
    }
}
