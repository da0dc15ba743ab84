use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

/// Where a piece of HTML came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    /// mkly web output.
    Web,
    /// mkly email output.
    Email,
    /// Anything else.
    Generic,
}

static WEB_CLASS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\bclass\s*=\s*["']?[^"'>]*?\bmkly-[a-z0-9]"#)
        .expect("WEB_CLASS_RE: hardcoded regex is valid")
});

static CONDITIONAL_COMMENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)<!--\[if\s").expect("CONDITIONAL_COMMENT_RE: hardcoded regex is valid")
});

static PRESENTATION_ROLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\brole\s*=\s*["']?presentation\b"#)
        .expect("PRESENTATION_ROLE_RE: hardcoded regex is valid")
});

/// Classifies `html`. The web signature wins when both signatures are present.
pub fn detect_origin(html: &str) -> Origin {
    if WEB_CLASS_RE.is_match(html) {
        Origin::Web
    } else if CONDITIONAL_COMMENT_RE.is_match(html) && PRESENTATION_ROLE_RE.is_match(html) {
        Origin::Email
    } else {
        Origin::Generic
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(r#"<div class="mkly-core-card">x</div>"#, Origin::Web)]
    #[case(r#"<div class='wrap mkly-core-text'>x</div>"#, Origin::Web)]
    #[case(
        r#"<!--[if mso]><table><![endif]--><table role="presentation"><tr><td>x</td></tr></table>"#,
        Origin::Email
    )]
    #[case(
        r#"<!--[if mso]>x<![endif]--><table role="presentation" class="mkly-core-text"></table>"#,
        Origin::Web
    )]
    #[case(r#"<table role="presentation"><tr><td>x</td></tr></table>"#, Origin::Generic)]
    #[case("<p>mkly-core-card mentioned in text</p>", Origin::Generic)]
    #[case("", Origin::Generic)]
    fn detects_origin(#[case] html: &str, #[case] expected: Origin) {
        assert_eq!(detect_origin(html), expected);
    }
}
