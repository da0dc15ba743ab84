//! Element parsers for the core block types in web output.
//!
//! Each parser receives the full outer markup of one marked element. Sub-parts
//! are found by their BEM class (`mkly-core-card__image`) first and by element
//! shape second, so attribute order and minor markup drift do not matter.

use crate::{
    html::{
        self, attrs,
        scan::{find_elements, first_element, inner_html, open_tag, remove_elements, root_name},
    },
    kit::ElementParser,
    reconstruct::ParsedBlock,
};

/// Anchor text the web target appends to linked cards.
const READ_MORE: &str = "read more";

pub fn core_parser(block_type: &str) -> Option<ElementParser> {
    let parser: ElementParser = match block_type {
        "core/heading" => heading,
        "core/text" => text,
        "core/image" => image,
        "core/button" => button,
        "core/divider" => |_| ParsedBlock::new("core/divider"),
        "core/spacer" => spacer,
        "core/code" => code,
        "core/quote" => quote,
        "core/hero" => hero,
        "core/section" => section,
        "core/card" => card,
        "core/list" => list,
        "core/header" => header,
        "core/footer" => footer,
        "core/cta" => cta,
        "core/tip" => tip,
        "core/html" => verbatim,
        _ => return None,
    };
    Some(parser)
}

/// Content of a block type without a dedicated parser.
pub fn fallback(block_type: &str, outer: &str) -> ParsedBlock {
    ParsedBlock::new(block_type).with_content(html::html_to_markdown(inner_html(outer)))
}

/// Outer markup of the first element carrying `class`.
fn part<'a>(outer: &'a str, class: &str) -> Option<&'a str> {
    first_element(outer, |_, tag| attrs::has_class(tag, class)).map(|r| r.outer(outer))
}

/// Outer markup of the first `name` element, the root included.
fn element<'a>(outer: &'a str, name: &str) -> Option<&'a str> {
    first_element(outer, |n, _| n == name).map(|r| r.outer(outer))
}

fn attr_of(outer: Option<&str>, name: &str) -> String {
    outer
        .and_then(|o| attrs::attr(open_tag(o), name))
        .unwrap_or_default()
}

fn without_classes(html: &str, classes: &[&str]) -> String {
    remove_elements(html, |_, outer| {
        let tag = open_tag(outer);
        classes.iter().any(|c| attrs::has_class(tag, c))
    })
}

fn heading(outer: &str) -> ParsedBlock {
    let h = first_element(outer, |n, _| matches!(n, "h1" | "h2" | "h3" | "h4" | "h5" | "h6"))
        .map(|r| r.outer(outer));
    let level = h
        .and_then(root_name)
        .map(|n| n[1..].to_string())
        .unwrap_or_default();
    let content = html::html_to_markdown(inner_html(h.unwrap_or(outer)));
    ParsedBlock::new("core/heading")
        .with_property("level", level)
        .with_content(content)
}

fn text(outer: &str) -> ParsedBlock {
    ParsedBlock::new("core/text").with_content(html::html_to_markdown(inner_html(outer)))
}

fn image(outer: &str) -> ParsedBlock {
    let img = element(outer, "img");
    let width = attr_of(img, "width");
    let link = element(outer, "a").map(|a| attr_of(Some(a), "href"));
    ParsedBlock::new("core/image")
        .with_property("src", attr_of(img, "src"))
        .with_property("alt", attr_of(img, "alt"))
        .with_property("width", if width.parse::<f64>().is_ok() { width } else { String::new() })
        .with_property("link", link.unwrap_or_default())
}

fn button(outer: &str) -> ParsedBlock {
    let anchor = element(outer, "a");
    ParsedBlock::new("core/button")
        .with_property("url", attr_of(anchor, "href"))
        .with_property("label", anchor.map(html::text_content).unwrap_or_default())
}

fn spacer(outer: &str) -> ParsedBlock {
    let tag = open_tag(outer);
    let height = attrs::style_value(tag, "height")
        .or_else(|| attrs::attr(tag, "height"))
        .map(|h| h.trim().trim_end_matches("px").to_string())
        .unwrap_or_default();
    ParsedBlock::new("core/spacer").with_property("height", height)
}

fn code(outer: &str) -> ParsedBlock {
    let code = element(outer, "code").or_else(|| element(outer, "pre"));
    let lang = code
        .map(|c| attrs::classes(open_tag(c)))
        .unwrap_or_default()
        .iter()
        .find_map(|c| c.strip_prefix("language-").map(str::to_string))
        .unwrap_or_default();
    let body = html::raw_text(inner_html(code.unwrap_or(outer)));
    ParsedBlock::new("core/code")
        .with_property("lang", lang)
        .with_content(body.trim_matches('\n'))
}

fn quote(outer: &str) -> ParsedBlock {
    let author = part(outer, "mkly-core-quote__author")
        .or_else(|| element(outer, "cite"))
        .map(html::text_content)
        .unwrap_or_default();
    let author = author.trim_start_matches(['—', '-', ' ']).to_string();
    let body = remove_elements(inner_html(outer), |name, o| {
        name == "cite" || attrs::has_class(open_tag(o), "mkly-core-quote__author")
    });
    let body = element(&body, "blockquote")
        .map(|bq| inner_html(bq).to_string())
        .unwrap_or(body);
    ParsedBlock::new("core/quote")
        .with_property("author", author)
        .with_content(html::html_to_markdown(&body))
}

fn hero(outer: &str) -> ParsedBlock {
    let tag = open_tag(outer);
    let img = part(outer, "mkly-core-hero__image").and_then(|p| element(p, "img").or(Some(p)));
    let background = attrs::style_value(tag, "background-image")
        .or_else(|| attrs::style_value(tag, "background"))
        .and_then(|v| attrs::css_url(&v));
    let img = img.or_else(|| element(outer, "img"));
    let image = background.unwrap_or_else(|| attr_of(img, "src"));
    let body = remove_elements(inner_html(outer), |name, o| {
        name == "img" || attrs::has_class(open_tag(o), "mkly-core-hero__image")
    });
    ParsedBlock::new("core/hero")
        .with_property("image", image)
        .with_property("alt", attr_of(img, "alt"))
        .with_content(html::html_to_markdown(&body))
}

/// Only the title; children are extracted by the reconstructor.
fn section(outer: &str) -> ParsedBlock {
    let title = part(outer, "mkly-core-section__title")
        .map(html::text_content)
        .unwrap_or_default();
    ParsedBlock::new("core/section").with_property("title", title)
}

fn is_read_more(name: &str, outer: &str) -> bool {
    if name != "a" {
        return false;
    }
    let tag = open_tag(outer);
    attrs::classes(tag)
        .iter()
        .any(|c| c.ends_with("__more") || c.ends_with("__cta"))
        || attrs::class_mentions(tag, &["read-more"])
        || html::text_content(outer)
            .to_ascii_lowercase()
            .trim_end_matches(|c: char| !c.is_alphanumeric())
            == READ_MORE
}

fn card(outer: &str) -> ParsedBlock {
    let image_part = part(outer, "mkly-core-card__image");
    let img = image_part
        .and_then(|p| element(p, "img"))
        .or_else(|| element(outer, "img"));

    let read_more = find_elements(outer, |n, _| n == "a")
        .into_iter()
        .map(|r| r.outer(outer))
        .find(|a| is_read_more("a", a));
    let link = part(outer, "mkly-core-card__link")
        .map(|l| attr_of(Some(l), "href"))
        .filter(|h| !h.is_empty())
        .or_else(|| read_more.map(|a| attr_of(Some(a), "href")))
        .or_else(|| {
            // image wrapped in a link
            first_element(outer, |n, _| n == "a")
                .map(|r| r.outer(outer))
                .filter(|a| element(a, "img").is_some())
                .map(|a| attr_of(Some(a), "href"))
        })
        .unwrap_or_default();

    let body = match part(outer, "mkly-core-card__body") {
        Some(body) => inner_html(body).to_string(),
        None => remove_elements(inner_html(outer), |name, o| {
            name == "img"
                || attrs::has_class(open_tag(o), "mkly-core-card__image")
                || attrs::has_class(open_tag(o), "mkly-core-card__link")
        }),
    };
    let body = remove_elements(&body, is_read_more);

    ParsedBlock::new("core/card")
        .with_property("image", attr_of(img, "src"))
        .with_property("link", link)
        .with_content(html::html_to_markdown(&body))
}

fn list(outer: &str) -> ParsedBlock {
    let list = element(outer, "ul").or_else(|| element(outer, "ol"));
    let content = html::html_to_markdown(list.unwrap_or_else(|| inner_html(outer)));
    ParsedBlock::new("core/list").with_content(content)
}

fn header(outer: &str) -> ParsedBlock {
    let logo = part(outer, "mkly-core-header__logo")
        .and_then(|p| element(p, "img"))
        .or_else(|| element(outer, "img"));
    let title = part(outer, "mkly-core-header__title")
        .or_else(|| first_element(outer, |n, _| matches!(n, "h1" | "h2" | "h3")).map(|r| r.outer(outer)))
        .map(html::text_content)
        .unwrap_or_default();
    ParsedBlock::new("core/header")
        .with_property("logo", attr_of(logo, "src"))
        .with_property("title", title)
}

fn footer(outer: &str) -> ParsedBlock {
    ParsedBlock::new("core/footer").with_content(html::html_to_markdown(inner_html(outer)))
}

fn cta(outer: &str) -> ParsedBlock {
    let button = part(outer, "mkly-core-cta__button").or_else(|| {
        find_elements(outer, |n, _| n == "a")
            .last()
            .map(|r| r.outer(outer))
    });
    let button = button.map(|b| element(b, "a").unwrap_or(b));
    let body = without_classes(inner_html(outer), &["mkly-core-cta__button"]);
    let body = match button {
        Some(b) => body.replacen(b, "", 1),
        None => body,
    };
    ParsedBlock::new("core/cta")
        .with_property("url", attr_of(button, "href"))
        .with_property("buttonText", button.map(html::text_content).unwrap_or_default())
        .with_content(html::html_to_markdown(&body))
}

fn tip(outer: &str) -> ParsedBlock {
    let kind = attrs::classes(open_tag(outer))
        .iter()
        .find_map(|c| c.strip_prefix("mkly-core-tip--").map(str::to_string))
        .unwrap_or_default();
    ParsedBlock::new("core/tip")
        .with_property("type", kind)
        .with_content(html::html_to_markdown(inner_html(outer)))
}

fn verbatim(outer: &str) -> ParsedBlock {
    let mut block = ParsedBlock::new("core/html").with_content(inner_html(outer).trim());
    block.verbatim = true;
    block
}
