//! Tolerant, position-preserving HTML tag scanner.
//!
//! The scanner never fails: anything that is not a recognisable tag, comment
//! or declaration is text. Tokens carry byte offsets into the source so
//! callers can slice the original markup back out.

use std::collections::HashMap;

/// Elements that never have a closing tag.
pub const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

/// Elements whose body is raw text, not markup.
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style", "textarea", "title"];

pub fn is_void(name: &str) -> bool {
    VOID_ELEMENTS.contains(&name)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HtmlTokenKind {
    Open { name: String, self_closing: bool },
    Close { name: String },
    Comment,
    Declaration,
    Text,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HtmlToken {
    pub kind: HtmlTokenKind,
    pub start: usize,
    pub end: usize,
}

impl HtmlToken {
    pub fn text<'a>(&self, src: &'a str) -> &'a str {
        &src[self.start..self.end]
    }

    /// Open tags that will never see a matching close.
    pub fn is_atomic(&self) -> bool {
        matches!(&self.kind, HtmlTokenKind::Open { name, self_closing } if *self_closing || is_void(name))
    }
}

pub struct Scanner<'a> {
    src: &'a str,
    pos: usize,
    raw_until: Option<String>,
}

impl<'a> Scanner<'a> {
    pub fn new(src: &'a str) -> Self {
        Self::at(src, 0)
    }

    /// Starts scanning at byte offset `pos`, which must be outside any tag.
    pub fn at(src: &'a str, pos: usize) -> Self {
        Self {
            src,
            pos: pos.min(src.len()),
            raw_until: None,
        }
    }

    fn raw_text(&mut self, name: String) -> Option<HtmlToken> {
        let start = self.pos;
        let needle = format!("</{name}");
        let end = find_ci(self.src, &needle, start).unwrap_or(self.src.len());
        self.pos = end;
        (end > start).then_some(HtmlToken {
            kind: HtmlTokenKind::Text,
            start,
            end,
        })
    }

    fn text_run(&mut self) -> HtmlToken {
        let start = self.pos;
        let bytes = self.src.as_bytes();
        let mut i = start + 1;
        while i < bytes.len() {
            if bytes[i] == b'<' && starts_markup(&self.src[i..]) {
                break;
            }
            i += 1;
        }
        self.pos = i;
        HtmlToken {
            kind: HtmlTokenKind::Text,
            start,
            end: i,
        }
    }
}

impl Iterator for Scanner<'_> {
    type Item = HtmlToken;

    fn next(&mut self) -> Option<HtmlToken> {
        if let Some(name) = self.raw_until.take()
            && let Some(tok) = self.raw_text(name)
        {
            return Some(tok);
        }
        if self.pos >= self.src.len() {
            return None;
        }

        let rest = &self.src[self.pos..];
        let start = self.pos;

        if !rest.starts_with('<') || !starts_markup(rest) {
            return Some(self.text_run());
        }

        if rest.starts_with("<!--") {
            let end = rest[4..]
                .find("-->")
                .map_or(self.src.len(), |i| start + 4 + i + 3);
            self.pos = end;
            return Some(HtmlToken {
                kind: HtmlTokenKind::Comment,
                start,
                end,
            });
        }

        if rest.starts_with("<!") || rest.starts_with("<?") {
            let end = rest.find('>').map_or(self.src.len(), |i| start + i + 1);
            self.pos = end;
            return Some(HtmlToken {
                kind: HtmlTokenKind::Declaration,
                start,
                end,
            });
        }

        let end = tag_end(self.src, start);
        self.pos = end;
        let tag = &self.src[start..end];

        if let Some(after) = tag.strip_prefix("</") {
            return Some(HtmlToken {
                kind: HtmlTokenKind::Close {
                    name: tag_name(after),
                },
                start,
                end,
            });
        }

        let name = tag_name(&tag[1..]);
        let self_closing = tag.trim_end_matches('>').trim_end().ends_with('/');
        if !self_closing && RAW_TEXT_ELEMENTS.contains(&name.as_str()) {
            self.raw_until = Some(name.clone());
        }
        Some(HtmlToken {
            kind: HtmlTokenKind::Open { name, self_closing },
            start,
            end,
        })
    }
}

/// Whether `s` (starting with `<`) begins a tag, comment or declaration.
fn starts_markup(s: &str) -> bool {
    let mut chars = s.chars().skip(1);
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() => true,
        Some('!') | Some('?') => true,
        Some('/') => chars.next().is_some_and(|c| c.is_ascii_alphabetic()),
        _ => false,
    }
}

/// End offset (exclusive) of the tag starting at `start`, honouring quotes.
fn tag_end(src: &str, start: usize) -> usize {
    let bytes = src.as_bytes();
    let mut quote: Option<u8> = None;
    let mut i = start + 1;
    while i < bytes.len() {
        let b = bytes[i];
        match quote {
            Some(q) if b == q => quote = None,
            Some(_) => {}
            None if b == b'"' || b == b'\'' => quote = Some(b),
            None if b == b'>' => return i + 1,
            None => {}
        }
        i += 1;
    }
    src.len()
}

fn tag_name(after_lt: &str) -> String {
    after_lt
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == ':')
        .collect::<String>()
        .to_ascii_lowercase()
}

/// Case-insensitive ASCII substring search from `from`.
pub fn find_ci(haystack: &str, needle: &str, from: usize) -> Option<usize> {
    let h = haystack.as_bytes();
    let n = needle.as_bytes();
    if n.is_empty() || from >= h.len() || n.len() > h.len() - from {
        return None;
    }
    (from..=h.len() - n.len()).find(|&i| h[i..i + n.len()].eq_ignore_ascii_case(n))
}

/// Finds the depth-balanced closing tag for an element of `name` whose open
/// tag ends at `after_open`. Nested same-named elements are counted.
///
/// Returns the `(start, end)` byte range of the closing tag.
pub fn find_matching_close(src: &str, name: &str, after_open: usize) -> Option<(usize, usize)> {
    let mut depth = 1usize;
    for tok in Scanner::at(src, after_open) {
        match &tok.kind {
            HtmlTokenKind::Open {
                name: n,
                self_closing: false,
            } if n == name && !is_void(n) => depth += 1,
            HtmlTokenKind::Close { name: n } if n == name => {
                depth -= 1;
                if depth == 0 {
                    return Some((tok.start, tok.end));
                }
            }
            _ => {}
        }
    }
    None
}

/// Byte range of one element found in a larger string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElementRange {
    pub start: usize,
    /// End of the open tag.
    pub open_end: usize,
    /// End of the whole element (after the close tag, or end of input).
    pub end: usize,
}

impl ElementRange {
    pub fn outer<'a>(&self, src: &'a str) -> &'a str {
        &src[self.start..self.end]
    }

    pub fn open_tag<'a>(&self, src: &'a str) -> &'a str {
        &src[self.start..self.open_end]
    }
}

/// Range of the element opened by `tok`, extending to end of input when the
/// close tag is missing.
pub fn element_range(src: &str, tok: &HtmlToken) -> ElementRange {
    let end = match &tok.kind {
        HtmlTokenKind::Open { name, .. } if !tok.is_atomic() => {
            find_matching_close(src, name, tok.end).map_or(src.len(), |(_, e)| e)
        }
        _ => tok.end,
    };
    ElementRange {
        start: tok.start,
        open_end: tok.end,
        end,
    }
}

/// One element located by an [`ElementIndex`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexedElement {
    pub name: String,
    pub range: ElementRange,
    /// Start of the close tag, or `range.end` when there is none.
    pub inner_end: usize,
}

impl IndexedElement {
    pub fn inner<'a>(&self, src: &'a str) -> &'a str {
        &src[self.range.open_end..self.inner_end]
    }
}

/// Every element of a string in document order, with the same balanced
/// ranges [`element_range`] gives, built in a single forward pass.
#[derive(Debug, Clone, Default)]
pub struct ElementIndex {
    elements: Vec<IndexedElement>,
}

impl ElementIndex {
    pub fn new(src: &str) -> Self {
        let mut elements: Vec<IndexedElement> = vec![];
        // indices of unclosed elements, per tag name
        let mut open: HashMap<String, Vec<usize>> = HashMap::new();

        for tok in Scanner::new(src) {
            let atomic = tok.is_atomic();
            match tok.kind {
                HtmlTokenKind::Open { name, .. } => {
                    let end = if atomic { tok.end } else { src.len() };
                    if !atomic {
                        open.entry(name.clone()).or_default().push(elements.len());
                    }
                    elements.push(IndexedElement {
                        name,
                        range: ElementRange {
                            start: tok.start,
                            open_end: tok.end,
                            end,
                        },
                        inner_end: end,
                    });
                }
                HtmlTokenKind::Close { name } => {
                    if let Some(i) = open.get_mut(&name).and_then(Vec::pop) {
                        elements[i].range.end = tok.end;
                        elements[i].inner_end = tok.start;
                    }
                }
                _ => {}
            }
        }
        Self { elements }
    }

    pub fn elements(&self) -> &[IndexedElement] {
        &self.elements
    }

    pub fn named<'s, 'n>(&'s self, name: &'n str) -> impl Iterator<Item = &'s IndexedElement> {
        self.elements.iter().filter(move |e| e.name == name)
    }

    /// Elements named `name`, each paired with whether another element of
    /// the same name starts inside it.
    pub fn named_with_nesting<'s>(&'s self, name: &str) -> Vec<(&'s IndexedElement, bool)> {
        let found: Vec<&IndexedElement> = self.named(name).collect();
        found
            .iter()
            .enumerate()
            .map(|(i, el)| {
                let nested = found.get(i + 1).is_some_and(|next| next.range.start < el.range.end);
                (*el, nested)
            })
            .collect()
    }
}

/// Outermost elements whose open tag satisfies `pred(name, open_tag)`.
///
/// Matches nested inside an earlier match are not reported.
pub fn find_elements(src: &str, pred: impl Fn(&str, &str) -> bool) -> Vec<ElementRange> {
    let index = ElementIndex::new(src);
    let mut found = vec![];
    let mut skip_until = 0;
    for el in index.elements() {
        if el.range.start < skip_until {
            continue;
        }
        if pred(&el.name, el.range.open_tag(src)) {
            skip_until = el.range.end;
            found.push(el.range);
        }
    }
    found
}

pub fn first_element(src: &str, pred: impl Fn(&str, &str) -> bool) -> Option<ElementRange> {
    Scanner::new(src).find_map(|tok| match &tok.kind {
        HtmlTokenKind::Open { name, .. } if pred(name, tok.text(src)) => {
            Some(element_range(src, &tok))
        }
        _ => None,
    })
}

/// Copy of `src` without the elements for which `pred(name, outer)` holds.
///
/// Elements that are kept are still searched for removable descendants.
pub fn remove_elements(src: &str, pred: impl Fn(&str, &str) -> bool) -> String {
    let mut out = String::with_capacity(src.len());
    let mut copied_to = 0;
    for el in ElementIndex::new(src).elements() {
        if el.range.start < copied_to {
            continue;
        }
        if pred(&el.name, el.range.outer(src)) {
            out.push_str(&src[copied_to..el.range.start]);
            copied_to = el.range.end;
        }
    }
    out.push_str(&src[copied_to..]);
    out
}

/// The first open tag of `outer`, or `""` when it has none.
pub fn open_tag(outer: &str) -> &str {
    Scanner::new(outer)
        .find(|t| matches!(t.kind, HtmlTokenKind::Open { .. }))
        .map_or("", |t| &outer[t.start..t.end])
}

/// Name of the first element in `outer`.
pub fn root_name(outer: &str) -> Option<String> {
    Scanner::new(outer).find_map(|t| match t.kind {
        HtmlTokenKind::Open { name, .. } => Some(name),
        _ => None,
    })
}

/// Markup between the first element's open tag and its matching close.
pub fn inner_html(outer: &str) -> &str {
    let Some(tok) = Scanner::new(outer).find(|t| matches!(t.kind, HtmlTokenKind::Open { .. })) else {
        return outer;
    };
    if tok.is_atomic() {
        return "";
    }
    let HtmlTokenKind::Open { name, .. } = &tok.kind else {
        return "";
    };
    match find_matching_close(outer, name, tok.end) {
        Some((close_start, _)) => &outer[tok.end..close_start],
        None => &outer[tok.end..],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn kinds(src: &str) -> Vec<HtmlTokenKind> {
        Scanner::new(src).map(|t| t.kind).collect()
    }

    #[test]
    fn scans_tags_text_and_comments() {
        let src = "<p class=\"a>b\">Hi<!-- c --><br/></p>";
        assert_eq!(
            kinds(src),
            [
                HtmlTokenKind::Open {
                    name: "p".into(),
                    self_closing: false
                },
                HtmlTokenKind::Text,
                HtmlTokenKind::Comment,
                HtmlTokenKind::Open {
                    name: "br".into(),
                    self_closing: true
                },
                HtmlTokenKind::Close { name: "p".into() },
            ]
        );
    }

    #[test]
    fn stray_angle_bracket_is_text() {
        let src = "a < b <p>x</p>";
        let toks: Vec<_> = Scanner::new(src).collect();
        assert_eq!(toks[0].kind, HtmlTokenKind::Text);
        assert_eq!(toks[0].text(src), "a < b ");
    }

    #[test]
    fn script_body_is_raw_text() {
        let src = "<script>if (a<b) { x = '</div>'; }</script><p>";
        let toks: Vec<_> = Scanner::new(src).collect();
        assert_eq!(toks.len(), 4);
        assert_eq!(toks[1].kind, HtmlTokenKind::Text);
        assert_eq!(toks[2].kind, HtmlTokenKind::Close { name: "script".into() });
    }

    #[test]
    fn matching_close_counts_nested_same_name() {
        let src = "<div><div>inner</div>tail</div>after";
        let open_end = "<div>".len();
        let (start, end) = find_matching_close(src, "div", open_end).unwrap();
        assert_eq!(&src[start..end], "</div>");
        assert_eq!(&src[end..], "after");
    }

    #[test]
    fn inner_html_of_unbalanced_runs_to_end() {
        assert_eq!(inner_html("<div><p>open"), "<p>open");
        assert_eq!(inner_html("<img src=x>"), "");
        assert_eq!(inner_html("<div a=1><b>x</b></div>"), "<b>x</b>");
    }

    #[test]
    fn find_elements_reports_outermost_only() {
        let src = "<div class=x><div class=x>a</div></div><div class=x>b</div>";
        let found = find_elements(src, |_, tag| tag.contains("class=x"));
        assert_eq!(found.len(), 2);
        assert_eq!(found[1].outer(src), "<div class=x>b</div>");
    }

    #[test]
    fn remove_elements_keeps_surroundings() {
        let src = "<p>a<img src=x>b<span>c<img src=y></span></p>";
        assert_eq!(
            remove_elements(src, |name, _| name == "img"),
            "<p>ab<span>c</span></p>"
        );
        assert_eq!(
            remove_elements(src, |_, outer| outer.contains("src=y") && outer.starts_with("<span")),
            "<p>a<img src=x>b</p>"
        );
    }

    #[test]
    fn index_agrees_with_element_range() {
        let src = "<div><p>a<div>b</div><img src=x></p><ul><li>c</ul></div><div>tail";
        let index = ElementIndex::new(src);
        let opens: Vec<_> = Scanner::new(src)
            .filter(|t| matches!(t.kind, HtmlTokenKind::Open { .. }))
            .collect();
        assert_eq!(index.elements().len(), opens.len());
        for (el, tok) in index.elements().iter().zip(&opens) {
            assert_eq!(el.range, element_range(src, tok), "{}", el.name);
        }
        assert_eq!(index.elements()[0].inner(src), "<p>a<div>b</div><img src=x></p><ul><li>c</ul>");
        assert_eq!(index.elements().last().map(|e| e.inner(src)), Some("tail"));
    }

    #[test]
    fn nesting_flags_look_inside_only() {
        let src = "<table><tr><td><table></table></td></tr></table><table></table>";
        let index = ElementIndex::new(src);
        let flags: Vec<bool> = index.named_with_nesting("table").into_iter().map(|(_, n)| n).collect();
        assert_eq!(flags, [true, false, false]);
    }

    #[test]
    fn wide_flat_input_is_indexed_in_one_pass() {
        let src = "<p>x</p>".repeat(20_000);
        assert_eq!(find_elements(&src, |n, _| n == "p").len(), 20_000);
        assert_eq!(remove_elements(&format!("<div>{src}</div>"), |n, _| n == "p"), "<div></div>");
    }

    #[test]
    fn case_insensitive_search() {
        assert_eq!(find_ci("abc</SCRIPT>", "</script", 0), Some(3));
        assert_eq!(find_ci("abc", "abcd", 0), None);
    }

    #[test]
    fn tag_names_are_lowercased() {
        assert_eq!(root_name("<DIV CLASS=x></DIV>").as_deref(), Some("div"));
    }
}
