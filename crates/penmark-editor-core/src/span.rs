//! Inline content model: flat runs of marked text.
//!
//! Inline content is a sequence of `Span`s rather than a nested emphasis
//! tree. Each span carries the full set of marks that apply to its text,
//! which makes range formatting a split/toggle/merge operation instead of a
//! tree rewrite. Adjacent spans with identical marks and link merge.

use std::ops::Range;

use bitflags::bitflags;
use smol_str::SmolStr;

bitflags! {
    /// Inline formatting marks carried by a span.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
    pub struct Marks: u8 {
        const BOLD = 1 << 0;
        const ITALIC = 1 << 1;
        const UNDERLINE = 1 << 2;
        const STRIKE = 1 << 3;
        const CODE = 1 << 4;
    }
}

/// Link target attached to a span.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Link {
    pub href: SmolStr,
    pub title: Option<SmolStr>,
}

impl Link {
    pub fn new(href: impl Into<SmolStr>) -> Self {
        Self {
            href: href.into(),
            title: None,
        }
    }

    pub fn with_title(href: impl Into<SmolStr>, title: impl Into<SmolStr>) -> Self {
        Self {
            href: href.into(),
            title: Some(title.into()),
        }
    }
}

/// A run of text with a uniform mark set and optional link.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Span {
    pub text: String,
    pub marks: Marks,
    pub link: Option<Link>,
}

impl Span {
    /// Plain unmarked text.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            marks: Marks::empty(),
            link: None,
        }
    }

    /// Text with marks.
    pub fn marked(text: impl Into<String>, marks: Marks) -> Self {
        Self {
            text: text.into(),
            marks,
            link: None,
        }
    }

    /// Linked text.
    pub fn linked(text: impl Into<String>, link: Link) -> Self {
        Self {
            text: text.into(),
            marks: Marks::empty(),
            link: Some(link),
        }
    }

    /// Length in chars.
    pub fn len_chars(&self) -> usize {
        self.text.chars().count()
    }

    fn same_style(&self, other: &Span) -> bool {
        self.marks == other.marks && self.link == other.link
    }
}

/// Byte index of the `char_offset`-th char in `s` (or `s.len()` past the end).
fn byte_at_char(s: &str, char_offset: usize) -> usize {
    s.char_indices()
        .nth(char_offset)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

/// Total char length of a span run.
pub fn run_len(spans: &[Span]) -> usize {
    spans.iter().map(Span::len_chars).sum()
}

/// Concatenated plain text of a span run.
pub fn run_text(spans: &[Span]) -> String {
    let mut out = String::new();
    for span in spans {
        out.push_str(&span.text);
    }
    out
}

/// Insert plain text at a char offset, inheriting the style at that position.
///
/// Text typed at the boundary between two spans extends the preceding span,
/// matching how edit-in-place surfaces behave.
pub fn run_insert(spans: &mut Vec<Span>, offset: usize, text: &str) {
    if text.is_empty() {
        return;
    }
    if spans.is_empty() {
        spans.push(Span::text(text));
        return;
    }

    let mut remaining = offset;
    for span in spans.iter_mut() {
        let len = span.len_chars();
        if remaining <= len {
            let at = byte_at_char(&span.text, remaining);
            span.text.insert_str(at, text);
            return;
        }
        remaining -= len;
    }

    // Past the end: extend the last span.
    if let Some(last) = spans.last_mut() {
        last.text.push_str(text);
    }
}

/// Delete a char range from a span run.
pub fn run_delete(spans: &mut Vec<Span>, range: Range<usize>) {
    if range.is_empty() {
        return;
    }
    let mut pos = 0usize;
    for span in spans.iter_mut() {
        let len = span.len_chars();
        let span_start = pos;
        let span_end = pos + len;
        pos = span_end;

        let cut_start = range.start.max(span_start);
        let cut_end = range.end.min(span_end);
        if cut_start >= cut_end {
            continue;
        }
        let a = byte_at_char(&span.text, cut_start - span_start);
        let b = byte_at_char(&span.text, cut_end - span_start);
        span.text.replace_range(a..b, "");
    }
    spans.retain(|s| !s.text.is_empty());
    run_merge(spans);
}

/// Split a span run at a char offset, returning the tail.
pub fn run_split(spans: &mut Vec<Span>, offset: usize) -> Vec<Span> {
    let mut tail = Vec::new();
    let mut pos = 0usize;
    let mut split_idx = spans.len();

    for (i, span) in spans.iter_mut().enumerate() {
        let len = span.len_chars();
        if offset <= pos + len {
            let local = offset - pos;
            if local == 0 {
                split_idx = i;
            } else if local < len {
                let at = byte_at_char(&span.text, local);
                let rest = span.text.split_off(at);
                tail.push(Span {
                    text: rest,
                    marks: span.marks,
                    link: span.link.clone(),
                });
                split_idx = i + 1;
            } else {
                split_idx = i + 1;
            }
            break;
        }
        pos += len;
    }

    tail.extend(spans.split_off(split_idx));
    tail.retain(|s| !s.text.is_empty());
    spans.retain(|s| !s.text.is_empty());
    tail
}

/// Merge adjacent spans with identical style.
pub fn run_merge(spans: &mut Vec<Span>) {
    let mut i = 0;
    while i + 1 < spans.len() {
        if spans[i].same_style(&spans[i + 1]) {
            let next = spans.remove(i + 1);
            spans[i].text.push_str(&next.text);
        } else {
            i += 1;
        }
    }
}

/// Check whether every char in `range` carries `mark`.
pub fn run_has_mark(spans: &[Span], range: Range<usize>, mark: Marks) -> bool {
    if range.is_empty() {
        return false;
    }
    let mut pos = 0usize;
    let mut covered = false;
    for span in spans {
        let len = span.len_chars();
        let span_start = pos;
        let span_end = pos + len;
        pos = span_end;

        let overlap_start = range.start.max(span_start);
        let overlap_end = range.end.min(span_end);
        if overlap_start < overlap_end {
            covered = true;
            if !span.marks.contains(mark) {
                return false;
            }
        }
    }
    covered
}

/// Add or remove a mark over a char range, splitting spans at the edges.
pub fn run_set_mark(spans: &mut Vec<Span>, range: Range<usize>, mark: Marks, on: bool) {
    apply_over_range(spans, range, |span| {
        if on {
            span.marks.insert(mark);
        } else {
            span.marks.remove(mark);
        }
    });
}

/// Attach or clear a link over a char range.
pub fn run_set_link(spans: &mut Vec<Span>, range: Range<usize>, link: Option<Link>) {
    apply_over_range(spans, range, |span| span.link = link.clone());
}

fn apply_over_range(spans: &mut Vec<Span>, range: Range<usize>, f: impl Fn(&mut Span)) {
    if range.is_empty() {
        return;
    }
    let mut out: Vec<Span> = Vec::with_capacity(spans.len() + 2);
    let mut pos = 0usize;

    for span in spans.drain(..) {
        let len = span.len_chars();
        let span_start = pos;
        let span_end = pos + len;
        pos = span_end;

        let overlap_start = range.start.max(span_start);
        let overlap_end = range.end.min(span_end);

        if overlap_start >= overlap_end {
            out.push(span);
            continue;
        }

        let a = byte_at_char(&span.text, overlap_start - span_start);
        let b = byte_at_char(&span.text, overlap_end - span_start);

        if a > 0 {
            out.push(Span {
                text: span.text[..a].to_string(),
                marks: span.marks,
                link: span.link.clone(),
            });
        }
        let mut mid = Span {
            text: span.text[a..b].to_string(),
            marks: span.marks,
            link: span.link.clone(),
        };
        f(&mut mid);
        out.push(mid);
        if b < span.text.len() {
            out.push(Span {
                text: span.text[b..].to_string(),
                marks: span.marks,
                link: span.link.clone(),
            });
        }
    }

    *spans = out;
    run_merge(spans);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_insert_inherits_style() {
        let mut spans = vec![Span::marked("bold", Marks::BOLD)];
        run_insert(&mut spans, 2, "xx");
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].text, "boxxld");
        assert_eq!(spans[0].marks, Marks::BOLD);
    }

    #[test]
    fn test_run_insert_empty_run() {
        let mut spans = Vec::new();
        run_insert(&mut spans, 0, "hi");
        assert_eq!(spans, vec![Span::text("hi")]);
    }

    #[test]
    fn test_run_delete_across_spans() {
        let mut spans = vec![Span::text("hello "), Span::marked("world", Marks::BOLD)];
        run_delete(&mut spans, 4..8);
        assert_eq!(run_text(&spans), "hellrld");
        assert_eq!(spans.len(), 2);
    }

    #[test]
    fn test_run_delete_merges_equal_styles() {
        let mut spans = vec![
            Span::text("ab"),
            Span::marked("cd", Marks::ITALIC),
            Span::text("ef"),
        ];
        run_delete(&mut spans, 2..4);
        assert_eq!(spans, vec![Span::text("abef")]);
    }

    #[test]
    fn test_run_split_mid_span() {
        let mut spans = vec![Span::text("hello world")];
        let tail = run_split(&mut spans, 5);
        assert_eq!(run_text(&spans), "hello");
        assert_eq!(run_text(&tail), " world");
    }

    #[test]
    fn test_run_split_at_boundary() {
        let mut spans = vec![Span::text("ab"), Span::marked("cd", Marks::BOLD)];
        let tail = run_split(&mut spans, 2);
        assert_eq!(spans, vec![Span::text("ab")]);
        assert_eq!(tail, vec![Span::marked("cd", Marks::BOLD)]);
    }

    #[test]
    fn test_set_mark_splits_at_edges() {
        let mut spans = vec![Span::text("hello world")];
        run_set_mark(&mut spans, 6..11, Marks::BOLD, true);
        assert_eq!(
            spans,
            vec![
                Span::text("hello "),
                Span::marked("world", Marks::BOLD),
            ]
        );
    }

    #[test]
    fn test_set_mark_off() {
        let mut spans = vec![Span::marked("all bold", Marks::BOLD)];
        run_set_mark(&mut spans, 0..3, Marks::BOLD, false);
        assert_eq!(spans[0], Span::text("all"));
        assert_eq!(spans[1], Span::marked(" bold", Marks::BOLD));
    }

    #[test]
    fn test_has_mark() {
        let spans = vec![Span::text("ab"), Span::marked("cd", Marks::BOLD)];
        assert!(run_has_mark(&spans, 2..4, Marks::BOLD));
        assert!(!run_has_mark(&spans, 0..4, Marks::BOLD));
        assert!(!run_has_mark(&spans, 0..0, Marks::BOLD));
    }

    #[test]
    fn test_set_link() {
        let mut spans = vec![Span::text("see docs here")];
        run_set_link(&mut spans, 4..8, Some(Link::new("https://example.com")));
        assert_eq!(spans.len(), 3);
        assert_eq!(spans[1].text, "docs");
        assert_eq!(
            spans[1].link.as_ref().map(|l| l.href.as_str()),
            Some("https://example.com")
        );
    }

    #[test]
    fn test_multibyte_offsets() {
        let mut spans = vec![Span::text("héllo")];
        run_insert(&mut spans, 2, "x");
        assert_eq!(spans[0].text, "héxllo");
        run_delete(&mut spans, 2..3);
        assert_eq!(spans[0].text, "héllo");
    }
}
