/// A reference to a single physical line of source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineRef<'a> {
    /// 1-based line number.
    pub number: usize,
    /// Line text without its terminator (`\n` or `\r\n`).
    pub text: &'a str,
}

impl LineRef<'_> {
    /// 1-based column of the first non-whitespace character.
    pub fn indent_column(&self) -> usize {
        let indent = self.text.len() - self.text.trim_start().len();
        self.text[..indent].chars().count() + 1
    }

    /// 1-based column just past the last non-whitespace character.
    pub fn end_column(&self) -> usize {
        self.text.trim_end().chars().count() + 1
    }
}

/// Returns an iterator over every physical line.
///
/// A trailing empty line (after a final newline) is yielded too, so the
/// number of lines is always one more than the number of newlines.
pub fn lines_with_numbers(source: &str) -> impl Iterator<Item = LineRef<'_>> + '_ {
    source.split('\n').enumerate().map(|(i, line)| LineRef {
        number: i + 1,
        text: line.strip_suffix('\r').unwrap_or(line),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_empty_line_is_included() {
        let lines: Vec<_> = lines_with_numbers("a\nb\n").collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[2].text, "");
        assert_eq!(lines[2].number, 3);
    }

    #[test]
    fn crlf_is_stripped() {
        let lines: Vec<_> = lines_with_numbers("a\r\nb").map(|l| l.text).collect();
        assert_eq!(lines, ["a", "b"]);
    }

    #[test]
    fn empty_source_is_one_line() {
        assert_eq!(lines_with_numbers("").count(), 1);
    }

    #[test]
    fn columns_count_chars() {
        let line = LineRef {
            number: 1,
            text: "  héllo  ",
        };
        assert_eq!(line.indent_column(), 3);
        assert_eq!(line.end_column(), 8);
    }
}
