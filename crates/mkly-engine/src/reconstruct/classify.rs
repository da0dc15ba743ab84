//! Tier 3: heuristic classification of foreign HTML segments.
//!
//! Each segment is matched against kit import patterns first, then against
//! a fixed ladder of built-in rules. The first rule whose signature matches
//! decides the segment, even when its extractor then drops it as empty.

use crate::{
    html::{
        self, attrs,
        scan::{HtmlTokenKind, Scanner, find_ci, first_element, inner_html, open_tag, remove_elements},
    },
    kit::KitRegistry,
};

use super::{
    ParsedBlock,
    segments::{Segment, SegmentKind},
};

/// Segments longer than this are never treated as implicit cards.
const CARD_MAX_BYTES: usize = 2000;

/// Text length under which a full-width image dominates its segment.
const HERO_MAX_TEXT: usize = 300;

const SOCIAL_HOSTS: &[&str] = &[
    "facebook.com",
    "twitter.com",
    "x.com/",
    "instagram.com",
    "linkedin.com",
    "youtube.com",
    "tiktok.com",
    "mastodon",
];

const WRAPPER_TAGS: &[&str] = &[
    "div", "span", "section", "article", "main", "center", "font", "aside", "figure",
];

/// The segment being classified, with its root tag pre-parsed.
struct Candidate<'a> {
    html: &'a str,
    tag: &'a str,
    open: &'a str,
}

impl Candidate<'_> {
    fn inner(&self) -> &str {
        inner_html(self.html)
    }

    fn class_mentions(&self, words: &[&str]) -> bool {
        attrs::class_mentions(self.open, words)
    }

    fn contains_tag(&self, name: &str) -> bool {
        first_element(self.html, |n, _| n == name).is_some()
    }

    fn has_heading(&self) -> bool {
        first_element(self.html, |n, _| is_heading(n)).is_some()
    }

    fn links(&self) -> Vec<String> {
        Scanner::new(self.html)
            .filter_map(|t| match &t.kind {
                HtmlTokenKind::Open { name, .. } if name == "a" => attrs::attr(t.text(self.html), "href"),
                _ => None,
            })
            .collect()
    }

    fn open_tags(&self, name: &'static str) -> impl Iterator<Item = &str> + '_ {
        Scanner::new(self.html).filter_map(move |t| match &t.kind {
            HtmlTokenKind::Open { name: n, .. } if n == name => Some(t.text(self.html)),
            _ => None,
        })
    }

    /// `url(...)` backgrounds of any element in the segment.
    fn backgrounds(&self) -> impl Iterator<Item = String> + '_ {
        Scanner::new(self.html).filter_map(move |t| match &t.kind {
            HtmlTokenKind::Open { .. } => background_image(t.text(self.html)),
            _ => None,
        })
    }
}

/// One step of the ladder: a signature and what to build when it matches.
struct Rule {
    name: &'static str,
    matches: fn(&Candidate) -> bool,
    extract: fn(&Candidate) -> Option<ParsedBlock>,
}

#[rustfmt::skip]
const LADDER: &[Rule] = &[
    Rule { name: "hero", matches: is_hero, extract: hero },
    Rule { name: "header", matches: is_header, extract: header },
    Rule { name: "card", matches: is_card, extract: card },
    Rule { name: "cta", matches: is_cta, extract: cta },
    Rule { name: "list", matches: |c| c.tag == "ul" || c.tag == "ol", extract: list },
    Rule { name: "quote", matches: is_quote, extract: quote },
    Rule { name: "tip", matches: is_tip, extract: tip },
    Rule { name: "footer", matches: is_footer, extract: footer },
    Rule { name: "heading", matches: |c| is_heading(c.tag), extract: heading },
    Rule { name: "paragraph", matches: |c| c.tag == "p", extract: paragraph },
    Rule { name: "image", matches: |c| c.tag == "img", extract: image },
    Rule { name: "divider", matches: |c| c.tag == "hr", extract: |_| Some(ParsedBlock::new("core/divider")) },
    Rule { name: "wrapper", matches: |c| WRAPPER_TAGS.iter().any(|t| *t == c.tag), extract: wrapper },
];

/// Classifies one segment. `None` means the segment carries nothing worth
/// keeping.
pub fn classify_segment(segment: &Segment, registry: &KitRegistry) -> Option<ParsedBlock> {
    if let Some(pattern) = registry.import_patterns().find(|p| (p.detect)(&segment.html)) {
        log::trace!("segment matched import pattern {}", pattern.name);
        return Some((pattern.parse)(&segment.html));
    }

    let tag = match &segment.kind {
        SegmentKind::Text => return text_block(&html::text_content(&segment.html)),
        SegmentKind::Element { tag } => tag.as_str(),
    };
    let candidate = Candidate {
        html: &segment.html,
        tag,
        open: open_tag(&segment.html),
    };

    match LADDER.iter().find(|rule| (rule.matches)(&candidate)) {
        Some(rule) => {
            log::trace!("segment <{tag}> classified as {}", rule.name);
            (rule.extract)(&candidate)
        }
        None => {
            log::trace!("segment <{tag}> kept verbatim");
            let mut block = ParsedBlock::new("core/html").with_content(segment.html.clone());
            block.verbatim = true;
            Some(block)
        }
    }
}

fn is_heading(name: &str) -> bool {
    matches!(name, "h1" | "h2" | "h3" | "h4" | "h5" | "h6")
}

fn text_block(content: &str) -> Option<ParsedBlock> {
    let content = content.trim();
    (!content.is_empty()).then(|| ParsedBlock::new("core/text").with_content(content))
}

fn markdown_without(html: &str, names: &[&str]) -> String {
    html::html_to_markdown(&remove_elements(html, |n, _| names.contains(&n)))
}

fn background_image(open: &str) -> Option<String> {
    attrs::style_value(open, "background-image")
        .or_else(|| attrs::style_value(open, "background"))
        .and_then(|v| attrs::css_url(&v))
        .or_else(|| attrs::attr(open, "background"))
}

fn is_full_width(img: &str) -> bool {
    let width = attrs::attr(img, "width").or_else(|| attrs::style_value(img, "width"));
    width.is_some_and(|w| {
        let w = w.trim();
        w == "100%" || w.trim_end_matches("px").parse::<u32>().is_ok_and(|px| px >= 600)
    })
}

fn is_hero(c: &Candidate) -> bool {
    if c.backgrounds().next().is_some() || c.class_mentions(&["hero", "banner", "jumbotron"]) {
        return true;
    }
    if c.tag == "img" {
        return false;
    }
    let images: Vec<&str> = c.open_tags("img").collect();
    images.len() == 1
        && is_full_width(images[0])
        && html::text_content(c.html).len() <= HERO_MAX_TEXT
        && c.has_heading()
}

fn hero(c: &Candidate) -> Option<ParsedBlock> {
    let img = c.open_tags("img").next();
    let image = c
        .backgrounds()
        .next()
        .or_else(|| img.and_then(|t| attrs::attr(t, "src")))
        .unwrap_or_default();
    let alt = img.and_then(|t| attrs::attr(t, "alt")).unwrap_or_default();
    Some(
        ParsedBlock::new("core/hero")
            .with_property("image", image)
            .with_property("alt", alt)
            .with_content(markdown_without(c.inner(), &["img"])),
    )
}

fn logo_image<'a>(c: &'a Candidate) -> Option<&'a str> {
    c.open_tags("img").find(|t| {
        ["src", "alt", "class", "id"]
            .iter()
            .filter_map(|a| attrs::attr(t, a))
            .any(|v| v.to_ascii_lowercase().contains("logo"))
    })
}

fn is_header(c: &Candidate) -> bool {
    c.tag == "nav"
        || c.tag == "header"
        || c.class_mentions(&["nav", "menu", "masthead", "topbar"])
        || (logo_image(c).is_some() && c.links().len() >= 3)
}

fn header(c: &Candidate) -> Option<ParsedBlock> {
    let logo = logo_image(c).or_else(|| c.open_tags("img").next());
    let title = first_element(c.html, |n, _| is_heading(n))
        .map(|r| html::text_content(r.outer(c.html)))
        .or_else(|| logo.and_then(|t| attrs::attr(t, "alt")))
        .unwrap_or_default();
    Some(
        ParsedBlock::new("core/header")
            .with_property("logo", logo.and_then(|t| attrs::attr(t, "src")).unwrap_or_default())
            .with_property("title", title),
    )
}

fn is_card(c: &Candidate) -> bool {
    if c.class_mentions(&["card"]) {
        return true;
    }
    c.html.len() <= CARD_MAX_BYTES
        && c.contains_tag("img")
        && (c.has_heading() || c.contains_tag("p"))
        && c.contains_tag("a")
}

fn card(c: &Candidate) -> Option<ParsedBlock> {
    let image = c
        .open_tags("img")
        .next()
        .and_then(|t| attrs::attr(t, "src"))
        .unwrap_or_default();
    let link = c.links().into_iter().next().unwrap_or_default();
    Some(
        ParsedBlock::new("core/card")
            .with_property("image", image)
            .with_property("link", link)
            .with_content(markdown_without(c.inner(), &["img"])),
    )
}

fn is_button_anchor(open: &str) -> bool {
    let styled = attrs::style_value(open, "padding").is_some()
        && (attrs::style_value(open, "background").is_some()
            || attrs::style_value(open, "background-color").is_some());
    styled || attrs::class_mentions(open, &["btn", "button"])
}

fn button_anchor<'a>(c: &'a Candidate) -> Option<&'a str> {
    c.open_tags("a").find(|t| is_button_anchor(t))
}

fn is_cta(c: &Candidate) -> bool {
    let Some(anchor) = button_anchor(c) else {
        return false;
    };
    let centered = c.tag == "center"
        || attrs::attr(c.open, "align").is_some_and(|a| a.eq_ignore_ascii_case("center"))
        || attrs::style_value(c.open, "text-align").is_some_and(|a| a == "center")
        || find_ci(c.html, "<center", 0).is_some();
    centered || c.class_mentions(&["cta"]) || attrs::class_mentions(anchor, &["cta"])
}

fn cta(c: &Candidate) -> Option<ParsedBlock> {
    let range = first_element(c.html, |n, t| n == "a" && is_button_anchor(t))?;
    let anchor = range.outer(c.html);
    let url = attrs::attr(anchor, "href").unwrap_or_default();
    let label = html::text_content(anchor);
    let rest = format!("{}{}", &c.html[..range.start], &c.html[range.end..]);
    let content = if c.tag == "a" {
        String::new()
    } else {
        html::html_to_markdown(inner_html(&rest))
    };
    Some(
        ParsedBlock::new("core/cta")
            .with_property("url", url)
            .with_property("buttonText", label)
            .with_content(content),
    )
}

fn list(c: &Candidate) -> Option<ParsedBlock> {
    let content = html::html_to_markdown(c.html);
    (!content.is_empty()).then(|| ParsedBlock::new("core/list").with_content(content))
}

fn is_quote(c: &Candidate) -> bool {
    c.tag == "blockquote" || c.class_mentions(&["quote", "testimonial"])
}

fn quote(c: &Candidate) -> Option<ParsedBlock> {
    let author = first_element(c.html, |n, _| n == "cite")
        .map(|r| html::text_content(r.outer(c.html)))
        .unwrap_or_default();
    let author = author.trim_start_matches(['—', '-', ' ']).to_string();
    Some(
        ParsedBlock::new("core/quote")
            .with_property("author", author)
            .with_content(markdown_without(c.inner(), &["cite"])),
    )
}

fn is_tip(c: &Candidate) -> bool {
    if c.class_mentions(&["tip", "callout", "alert", "notice"]) {
        return true;
    }
    let has_background = attrs::style_value(c.open, "background").is_some()
        || attrs::style_value(c.open, "background-color").is_some();
    has_background && attrs::style_value(c.open, "border-left").is_some()
}

fn tip(c: &Candidate) -> Option<ParsedBlock> {
    let kind = ["info", "warning", "success", "error"]
        .into_iter()
        .find(|k| c.class_mentions(&[k]))
        .or_else(|| c.class_mentions(&["danger"]).then_some("error"))
        .unwrap_or_default();
    Some(
        ParsedBlock::new("core/tip")
            .with_property("type", kind)
            .with_content(html::html_to_markdown(c.inner())),
    )
}

fn is_footer(c: &Candidate) -> bool {
    if c.tag == "footer" {
        return true;
    }
    let social = c.links().iter().any(|href| {
        let href = href.to_ascii_lowercase();
        SOCIAL_HOSTS.iter().any(|h| href.contains(h))
    });
    social && html::text_content(c.html).to_ascii_lowercase().contains("unsubscribe")
}

fn footer(c: &Candidate) -> Option<ParsedBlock> {
    Some(ParsedBlock::new("core/footer").with_content(html::html_to_markdown(c.inner())))
}

fn heading(c: &Candidate) -> Option<ParsedBlock> {
    let content = html::html_to_markdown(c.inner());
    if content.is_empty() {
        return None;
    }
    Some(
        ParsedBlock::new("core/heading")
            .with_property("level", &c.tag[1..])
            .with_content(content),
    )
}

fn paragraph(c: &Candidate) -> Option<ParsedBlock> {
    text_block(&html::html_to_markdown(c.html))
}

fn image(c: &Candidate) -> Option<ParsedBlock> {
    Some(
        ParsedBlock::new("core/image")
            .with_property("src", attrs::attr(c.open, "src").unwrap_or_default())
            .with_property("alt", attrs::attr(c.open, "alt").unwrap_or_default()),
    )
}

fn wrapper(c: &Candidate) -> Option<ParsedBlock> {
    text_block(&html::html_to_markdown(c.inner()))
}
