use crate::html::scan::{HtmlTokenKind, Scanner, element_range};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SegmentKind {
    Element { tag: String },
    Text,
}

/// One top-level piece of normalized HTML.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub kind: SegmentKind,
    pub html: String,
}

impl Segment {
    pub fn tag(&self) -> Option<&str> {
        match &self.kind {
            SegmentKind::Element { tag } => Some(tag),
            SegmentKind::Text => None,
        }
    }
}

/// Splits `html` into top-level segments, left to right.
///
/// Paired elements span to their depth-balanced close tag (or to the end of
/// input when it is missing), void and self-closing elements stand alone,
/// text runs are trimmed and dropped when empty, comments are skipped.
pub fn split_segments(html: &str) -> Vec<Segment> {
    let mut segments = vec![];
    let mut skip_until = 0;

    for tok in Scanner::new(html) {
        if tok.start < skip_until {
            continue;
        }
        match &tok.kind {
            HtmlTokenKind::Open { name, .. } => {
                let range = element_range(html, &tok);
                skip_until = range.end;
                segments.push(Segment {
                    kind: SegmentKind::Element { tag: name.clone() },
                    html: range.outer(html).to_string(),
                });
            }
            HtmlTokenKind::Text => {
                let text = tok.text(html).trim();
                if !text.is_empty() {
                    segments.push(Segment {
                        kind: SegmentKind::Text,
                        html: text.to_string(),
                    });
                }
            }
            // stray close tags, comments and declarations
            _ => {}
        }
    }

    log::trace!("split html into {} segments", segments.len());
    segments
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn summary(html: &str) -> Vec<(Option<String>, String)> {
        split_segments(html)
            .into_iter()
            .map(|s| (s.tag().map(str::to_string), s.html))
            .collect()
    }

    #[test]
    fn splits_elements_text_and_voids() {
        assert_eq!(
            summary("<h1>Hi</h1>\n  loose text  <!-- c --><hr/><img src=a.png><p>x</p>"),
            [
                (Some("h1".into()), "<h1>Hi</h1>".into()),
                (None, "loose text".into()),
                (Some("hr".into()), "<hr/>".into()),
                (Some("img".into()), "<img src=a.png>".into()),
                (Some("p".into()), "<p>x</p>".into()),
            ]
        );
    }

    #[test]
    fn nested_same_name_elements_stay_together() {
        let segments = split_segments("<div><div>a</div><div>b</div></div><div>c</div>");
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].html, "<div><div>a</div><div>b</div></div>");
    }

    #[test]
    fn unbalanced_element_runs_to_end() {
        let segments = split_segments("<p>ok</p><div>never closed<p>x</p>");
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[1].html, "<div>never closed<p>x</p>");
    }

    #[test]
    fn stray_close_tags_are_skipped() {
        assert_eq!(summary("</div>text"), [(None, "text".into())]);
    }
}
