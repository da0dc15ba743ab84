use std::sync::LazyLock;

use regex::Regex;

use super::lines::{LineRef, lines_with_numbers};

static BLOCK_END_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^---\s+/([A-Za-z0-9][A-Za-z0-9_/-]*)\s*$")
        .expect("BLOCK_END_RE: hardcoded regex is valid")
});

static BLOCK_START_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^---\s+([A-Za-z0-9][A-Za-z0-9_/-]*)(?::\s*(.*?))?\s*$")
        .expect("BLOCK_START_RE: hardcoded regex is valid")
});

static PROPERTY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(@?[A-Za-z_][A-Za-z0-9_-]*): (.*)$")
        .expect("PROPERTY_RE: hardcoded regex is valid")
});

pub const COMMENT_MARKER: &str = "//";

/// Lexical class of one physical line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    Blank,
    Comment {
        text: String,
    },
    BlockStart {
        block_type: String,
        label: Option<String>,
    },
    BlockEnd {
        block_type: String,
    },
    Property {
        key: String,
        value: String,
    },
    Text,
}

/// One classified source line.
///
/// `raw` always holds the untrimmed line so that text bodies can reproduce
/// author formatting even when the line happens to look like a property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenizedLine {
    pub line: usize,
    /// 1-based column of the first non-whitespace character.
    pub column: usize,
    /// 1-based column just past the last non-whitespace character.
    pub end_column: usize,
    pub raw: String,
    pub kind: TokenKind,
}

/// Classifies every physical line of `source`, in order.
///
/// No lookahead across lines and no validation: a line that looks like a
/// property is a property token here even inside a text block.
pub fn tokenize(source: &str) -> Vec<TokenizedLine> {
    lines_with_numbers(source).map(|lr| classify(&lr)).collect()
}

fn classify(lr: &LineRef) -> TokenizedLine {
    TokenizedLine {
        line: lr.number,
        column: lr.indent_column(),
        end_column: lr.end_column(),
        raw: lr.text.to_string(),
        kind: classify_text(lr.text.trim()),
    }
}

/// Whether `line` reads as a comment or a block marker wherever it appears.
pub(crate) fn is_structural(line: &str) -> bool {
    matches!(
        classify_text(line.trim()),
        TokenKind::Comment { .. } | TokenKind::BlockStart { .. } | TokenKind::BlockEnd { .. }
    )
}

fn classify_text(trimmed: &str) -> TokenKind {
    if trimmed.is_empty() {
        return TokenKind::Blank;
    }
    if let Some(rest) = trimmed.strip_prefix(COMMENT_MARKER) {
        return TokenKind::Comment {
            text: rest.trim().to_string(),
        };
    }
    // closing markers share the `--- ` prefix, so they go first
    if let Some(caps) = BLOCK_END_RE.captures(trimmed) {
        return TokenKind::BlockEnd {
            block_type: caps[1].to_string(),
        };
    }
    if let Some(caps) = BLOCK_START_RE.captures(trimmed) {
        let label = caps
            .get(2)
            .map(|m| m.as_str().trim())
            .filter(|l| !l.is_empty())
            .map(str::to_string);
        return TokenKind::BlockStart {
            block_type: caps[1].to_string(),
            label,
        };
    }
    if let Some(caps) = PROPERTY_RE.captures(trimmed) {
        return TokenKind::Property {
            key: caps[1].to_string(),
            value: unquote(caps[2].trim()).to_string(),
        };
    }
    TokenKind::Text
}

/// Strips one pair of matching surrounding quotes.
pub(crate) fn unquote(value: &str) -> &str {
    for q in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(q) && value.ends_with(q) {
            return &value[1..value.len() - 1];
        }
    }
    value
}
