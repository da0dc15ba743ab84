//! Attribute, class and inline-style extraction from a single open tag.
//!
//! All helpers take the open tag text (e.g. `<img alt="x" src='y.png'>`) and
//! do not care about attribute order or quoting style.

use std::sync::LazyLock;

use regex::Regex;

use super::decode_entities;

static ATTR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"([^\s"'<>/=]+)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'=<>`]+)))?"#)
        .expect("ATTR_RE: hardcoded regex is valid")
});

/// All attributes in source order, names lowercased, values entity-decoded.
pub fn attributes(open_tag: &str) -> Vec<(String, String)> {
    let body = open_tag
        .trim_start_matches('<')
        .trim_end_matches('>')
        .trim_end_matches('/');
    // skip the tag name itself
    let name_len = body
        .find(|c: char| c.is_whitespace())
        .unwrap_or(body.len());
    ATTR_RE
        .captures_iter(&body[name_len..])
        .map(|caps| {
            let name = caps[1].to_ascii_lowercase();
            let value = caps
                .get(2)
                .or_else(|| caps.get(3))
                .or_else(|| caps.get(4))
                .map_or(String::new(), |m| decode_entities(m.as_str()));
            (name, value)
        })
        .collect()
}

pub fn attr(open_tag: &str, name: &str) -> Option<String> {
    attributes(open_tag)
        .into_iter()
        .find(|(n, _)| n.eq_ignore_ascii_case(name))
        .map(|(_, v)| v)
}

pub fn has_attr(open_tag: &str, name: &str) -> bool {
    attr(open_tag, name).is_some()
}

pub fn classes(open_tag: &str) -> Vec<String> {
    attr(open_tag, "class")
        .map(|c| c.split_whitespace().map(str::to_string).collect())
        .unwrap_or_default()
}

pub fn has_class(open_tag: &str, class: &str) -> bool {
    classes(open_tag).iter().any(|c| c == class)
}

/// Whether any class names one of `words` (case-insensitive), whole or as a
/// run of its `-`/`_` separated segments: `nav` matches `site-nav` and
/// `nav_bar` but not `canvas`.
pub fn class_mentions(open_tag: &str, words: &[&str]) -> bool {
    classes(open_tag).iter().any(|c| {
        let c = c.to_ascii_lowercase();
        let segments = class_segments(&c);
        words.iter().any(|w| {
            let wanted = class_segments(w);
            !wanted.is_empty() && segments.windows(wanted.len()).any(|run| run == wanted.as_slice())
        })
    })
}

fn class_segments(class: &str) -> Vec<&str> {
    class.split(['-', '_']).filter(|s| !s.is_empty()).collect()
}

/// `prop: value` pairs from the `style` attribute, property names lowercased.
pub fn style_declarations(open_tag: &str) -> Vec<(String, String)> {
    attr(open_tag, "style")
        .map(|s| parse_declarations(&s))
        .unwrap_or_default()
}

pub fn parse_declarations(style: &str) -> Vec<(String, String)> {
    style
        .split(';')
        .filter_map(|decl| {
            let (prop, value) = decl.split_once(':')?;
            let prop = prop.trim().to_ascii_lowercase();
            let value = value.trim();
            (!prop.is_empty() && !value.is_empty()).then(|| (prop, value.to_string()))
        })
        .collect()
}

pub fn style_value(open_tag: &str, prop: &str) -> Option<String> {
    style_declarations(open_tag)
        .into_iter()
        .find(|(p, _)| p == prop)
        .map(|(_, v)| v)
}

/// URL inside a CSS `url(...)` reference.
pub fn css_url(value: &str) -> Option<String> {
    let start = value.find("url(")? + 4;
    let end = value[start..].find(')')? + start;
    let url = value[start..end].trim().trim_matches(['"', '\'']);
    (!url.is_empty()).then(|| url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn attributes_in_any_order_and_quoting() {
        let tag = r#"<img alt='A &amp; B' src="x.png" width=600 hidden>"#;
        assert_eq!(
            attributes(tag),
            [
                ("alt".to_string(), "A & B".to_string()),
                ("src".to_string(), "x.png".to_string()),
                ("width".to_string(), "600".to_string()),
                ("hidden".to_string(), "".to_string()),
            ]
        );
        assert_eq!(attr(tag, "SRC").as_deref(), Some("x.png"));
        assert!(has_attr(tag, "hidden"));
    }

    #[test]
    fn self_closing_slash_is_not_an_attribute() {
        assert!(attributes("<br/>").is_empty());
        assert_eq!(attributes("<img src=a.png />").len(), 1);
    }

    #[test]
    fn class_helpers() {
        let tag = r#"<div data-x="1" class="mkly-core-card  featured">"#;
        assert_eq!(classes(tag), ["mkly-core-card", "featured"]);
        assert!(has_class(tag, "featured"));
        assert!(!has_class(tag, "feat"));
        assert!(class_mentions(tag, &["card"]));
        assert!(class_mentions(tag, &["core-card"]));
    }

    #[test]
    fn class_mentions_match_whole_segments() {
        assert!(class_mentions(r#"<div class="site-nav">"#, &["nav"]));
        assert!(class_mentions(r#"<div class="Nav_Bar">"#, &["nav"]));
        assert!(class_mentions(r#"<a class="btn read-more">"#, &["read-more"]));
        assert!(!class_mentions(r#"<div class="canvas">"#, &["nav"]));
        assert!(!class_mentions(r#"<span class="tooltip">"#, &["tip"]));
        assert!(!class_mentions(r#"<div class="discard-pile">"#, &["card"]));
        assert!(!class_mentions(r#"<a class="bread-more">"#, &["read-more"]));
    }

    #[test]
    fn style_helpers() {
        let tag = r#"<td style="Background-Image: url('hero.jpg'); padding: 0 ;">"#;
        assert_eq!(
            style_value(tag, "background-image").as_deref(),
            Some("url('hero.jpg')")
        );
        assert_eq!(css_url("url('hero.jpg')").as_deref(), Some("hero.jpg"));
        assert_eq!(style_declarations(tag).len(), 2);
    }
}
