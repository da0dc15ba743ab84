//! HTML fragment to markdown conversion used for recovered block content.
//!
//! `htmd` does the conversion. Its output is then normalized so recovered
//! bodies spell bullets, rules and headings one way whatever the converter
//! defaults are.

use std::sync::LazyLock;

use htmd::{
    HtmlToMarkdown,
    options::{CodeBlockStyle, HeadingStyle, Options},
};
use regex::Regex;
use scraper::Html;

use super::{nesting_depth, text_content};

/// Fragments nested deeper than this keep their text only.
pub const MAX_MARKDOWN_DEPTH: usize = 256;

/// Elements whose content never becomes markdown.
const SKIPPED_TAGS: &[&str] = &["script", "style", "head", "title", "noscript", "template"];

static BULLET_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\s*)[*+-]\s+(\S.*)$").expect("BULLET_RE: hardcoded regex is valid")
});

static ORDERED_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\s*)(\d+)\.\s+(\S.*)$").expect("ORDERED_RE: hardcoded regex is valid")
});

fn converter() -> HtmlToMarkdown {
    HtmlToMarkdown::builder()
        .skip_tags(SKIPPED_TAGS.to_vec())
        .options(Options {
            heading_style: HeadingStyle::Atx,
            code_block_style: CodeBlockStyle::Fenced,
            ..Default::default()
        })
        .build()
}

pub fn html_to_markdown(html: &str) -> String {
    let depth = nesting_depth(&Html::parse_fragment(html));
    if depth > MAX_MARKDOWN_DEPTH {
        log::debug!("fragment nests {depth} elements deep, keeping its text only");
        return text_content(html);
    }
    match converter().convert(html) {
        Ok(markdown) => normalize(&markdown),
        Err(e) => {
            log::warn!("markdown conversion failed, keeping text only: {e}");
            text_content(html)
        }
    }
}

/// Single pass over converter output. Fenced code passes through untouched;
/// elsewhere trailing whitespace goes, setext headings become ATX, rules
/// become `---`, bullets become `- `, and blank runs collapse to one line.
fn normalize(markdown: &str) -> String {
    let mut out: Vec<String> = vec![];
    let mut fence: Option<&str> = None;

    for line in markdown.lines() {
        let trimmed = line.trim();
        if let Some(marker) = fence {
            out.push(line.trim_end().to_string());
            if trimmed.starts_with(marker) && trimmed.trim_start_matches(marker).is_empty() {
                fence = None;
            }
            continue;
        }
        if let Some(marker) = ["```", "~~~"].into_iter().find(|m| trimmed.starts_with(m)) {
            fence = Some(marker);
            out.push(trimmed.to_string());
            continue;
        }

        let previous_is_text = out
            .last()
            .is_some_and(|l| !l.is_empty() && !l.starts_with(['#', '>']) && !is_rule(l) && !is_list_item(l));
        if previous_is_text && !trimmed.is_empty() && trimmed.chars().all(|c| c == '=') {
            if let Some(title) = out.pop() {
                out.push(format!("# {title}"));
            }
            continue;
        }
        if previous_is_text && trimmed.len() >= 2 && trimmed.chars().all(|c| c == '-') {
            if let Some(title) = out.pop() {
                out.push(format!("## {title}"));
            }
            continue;
        }

        if is_rule(trimmed) {
            out.push("---".to_string());
        } else if let Some(caps) = BULLET_RE.captures(line) {
            out.push(format!("{}- {}", &caps[1], caps[2].trim_end()));
        } else if let Some(caps) = ORDERED_RE.captures(line) {
            out.push(format!("{}{}. {}", &caps[1], &caps[2], caps[3].trim_end()));
        } else if trimmed.is_empty() {
            if out.last().is_some_and(|l| !l.is_empty()) {
                out.push(String::new());
            }
        } else {
            out.push(line.trim_end().to_string());
        }
    }

    while out.last().is_some_and(|l| l.is_empty()) {
        out.pop();
    }
    out.join("\n").trim_start_matches('\n').to_string()
}

/// Three or more of one of `-`, `*` or `_`, optionally spaced out.
fn is_rule(line: &str) -> bool {
    let marks: Vec<char> = line.chars().filter(|c| !c.is_whitespace()).collect();
    marks.len() >= 3 && matches!(marks[0], '-' | '*' | '_') && marks.iter().all(|&c| c == marks[0])
}

fn is_list_item(line: &str) -> bool {
    BULLET_RE.is_match(line) || ORDERED_RE.is_match(line)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn headings_and_paragraphs() {
        assert_eq!(
            html_to_markdown("<h2>Big news</h2>\n<p>Hello <strong>world</strong>!</p>"),
            "## Big news\n\nHello **world**!"
        );
    }

    #[test]
    fn links_and_images() {
        let md = html_to_markdown(
            r#"<p>See <a href="https://example.com">the site</a> <img src="a.png" alt="A"></p>"#,
        );
        assert!(md.contains("[the site](https://example.com)"), "{md}");
        assert!(md.contains("![A](a.png)"), "{md}");
    }

    #[test]
    fn lists_use_dash_and_number_markers() {
        let md = html_to_markdown("<ul><li>one<ul><li>inner</li></ul></li><li>two</li></ul>");
        let lines: Vec<&str> = md.lines().filter(|l| !l.trim().is_empty()).collect();
        assert_eq!(lines[0], "- one");
        assert!(lines[1].starts_with(' ') && lines[1].trim_start() == "- inner", "{md}");
        assert_eq!(lines[2], "- two");

        let md = html_to_markdown("<ol><li>a</li><li>b</li></ol>");
        assert!(md.contains("1. a") && md.contains("2. b"), "{md}");
    }

    #[test]
    fn blockquote_and_rule() {
        let md = html_to_markdown("<blockquote><p>One</p><p>Two</p></blockquote><hr>");
        assert!(md.starts_with("> One"), "{md}");
        assert!(md.contains("> Two"), "{md}");
        assert_eq!(md.lines().last(), Some("---"));
    }

    #[test]
    fn preformatted_code_keeps_indentation() {
        let md = html_to_markdown(
            "<pre><code class=\"language-rust\">fn main() {\n    let a = 1 &lt; 2;\n}</code></pre>",
        );
        assert!(md.starts_with("```"), "{md}");
        assert!(md.contains("\n    let a = 1 < 2;\n"), "{md}");
        assert!(md.ends_with("```"), "{md}");
    }

    #[test]
    fn entities_are_decoded() {
        let md = html_to_markdown("<p>Tom &amp; Jerry<br>&copy; 2024</p>");
        assert!(md.starts_with("Tom & Jerry"), "{md}");
        assert!(md.ends_with("© 2024"), "{md}");
    }

    #[test]
    fn scripts_are_dropped() {
        assert_eq!(html_to_markdown("<script>alert(1)</script><p>ok</p>"), "ok");
    }

    #[test]
    fn very_deep_nesting_keeps_text_only() {
        let depth = 10_000;
        let html = format!("<p>{}x{}</p>", "<b>".repeat(depth), "</b>".repeat(depth));
        assert_eq!(html_to_markdown(&html), "x");
    }

    #[test]
    fn normalize_unifies_markers() {
        assert_eq!(
            normalize("Title\n=====\n\n\n*   one\n    +   inner\n1.  first\n\n* * *\n"),
            "# Title\n\n- one\n    - inner\n1. first\n\n---"
        );
        assert_eq!(normalize("Sub\n---\n\ntext  \n\n___"), "## Sub\n\ntext\n\n---");
    }

    #[test]
    fn normalize_leaves_fenced_code_alone() {
        assert_eq!(
            normalize("```\n*   not a list\n\n\n---\n```\n\n*  a"),
            "```\n*   not a list\n\n\n---\n```\n\n- a"
        );
    }
}
