//! Pasted-HTML sanitization.
//!
//! Pasted fragments (from word processors, web pages, other editors) carry
//! arbitrary markup. The sanitizer parses the fragment with a real HTML
//! parser and rebuilds it against an allow-list: supported elements become
//! document blocks and marks, unsupported elements are unwrapped so their
//! text survives, and active content (`script`, `iframe`, event handlers,
//! `javascript:` urls) is dropped outright.

use std::cell::RefCell;

use html5ever::parse_document;
use html5ever::tendril::TendrilSink;
use markup5ever::Attribute;
use markup5ever_rcdom::{Handle, NodeData, RcDom};
use smol_str::SmolStr;
use thiserror::Error;

use crate::span::{run_merge, Link, Marks, Span};
use crate::tree::{Block, ListBlock, ListItem};

/// Refuse to parse pasted fragments beyond this size.
const MAX_FRAGMENT_BYTES: usize = 2_000_000;

/// Elements whose entire subtree is dropped, text included. Unlike ordinary
/// disallowed elements (which are unwrapped), the text of these IS the
/// payload: script source, style rules, fallback markup.
const DROP_SUBTREE: [&str; 8] = [
    "script", "style", "iframe", "object", "embed", "noscript", "head", "title",
];

#[derive(Debug, Error)]
pub enum SanitizeError {
    #[error("pasted fragment too large: {0} bytes")]
    TooLarge(usize),
    #[error("html parse failed: {0}")]
    Parse(String),
}

/// The sanitized result of an HTML paste: document blocks only.
#[derive(Debug, Default, PartialEq)]
pub struct CleanFragment {
    blocks: Vec<Block>,
}

impl CleanFragment {
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn into_blocks(self) -> Vec<Block> {
        self.blocks
    }

    /// Re-serialize the clean blocks as HTML.
    pub fn to_html(&self) -> String {
        let mut out = String::new();
        for block in &self.blocks {
            write_block_html(block, &mut out);
        }
        out
    }
}

fn write_block_html(block: &Block, out: &mut String) {
    match block {
        Block::Paragraph { spans } => {
            out.push_str("<p>");
            write_inline_html(spans, out);
            out.push_str("</p>");
        }
        Block::Heading { level, spans } => {
            out.push_str(&format!("<h{level}>"));
            write_inline_html(spans, out);
            out.push_str(&format!("</h{level}>"));
        }
        Block::List(list) => write_list_html(list, out),
        Block::Quote { blocks } => {
            out.push_str("<blockquote>");
            for b in blocks {
                write_block_html(b, out);
            }
            out.push_str("</blockquote>");
        }
        Block::Code { language, code } => {
            if language.is_empty() {
                out.push_str("<pre><code>");
            } else {
                out.push_str(&format!("<pre><code class=\"language-{language}\">"));
            }
            escape_html(code, out);
            out.push_str("</code></pre>");
        }
        Block::Rule => out.push_str("<hr>"),
    }
}

fn write_list_html(list: &ListBlock, out: &mut String) {
    if list.ordered {
        if list.start == 1 {
            out.push_str("<ol>");
        } else {
            out.push_str(&format!("<ol start=\"{}\">", list.start));
        }
    } else {
        out.push_str("<ul>");
    }
    for item in &list.items {
        out.push_str("<li>");
        write_inline_html(&item.spans, out);
        if let Some(nested) = &item.nested {
            write_list_html(nested, out);
        }
        out.push_str("</li>");
    }
    out.push_str(if list.ordered { "</ol>" } else { "</ul>" });
}

fn write_inline_html(spans: &[Span], out: &mut String) {
    // Fixed tag nesting per span; adjacent equal-style spans are already
    // merged, so per-span open/close never doubles up.
    const TAGS: [(Marks, &str); 5] = [
        (Marks::BOLD, "strong"),
        (Marks::ITALIC, "em"),
        (Marks::UNDERLINE, "u"),
        (Marks::STRIKE, "s"),
        (Marks::CODE, "code"),
    ];
    for span in spans {
        if let Some(link) = &span.link {
            out.push_str("<a href=\"");
            escape_attr(&link.href, out);
            if let Some(title) = &link.title {
                out.push_str("\" title=\"");
                escape_attr(title, out);
            }
            out.push_str("\">");
        }
        for (mark, tag) in TAGS {
            if span.marks.contains(mark) {
                out.push_str(&format!("<{tag}>"));
            }
        }
        escape_html(&span.text, out);
        for (mark, tag) in TAGS.iter().rev() {
            if span.marks.contains(*mark) {
                out.push_str(&format!("</{tag}>"));
            }
        }
        if span.link.is_some() {
            out.push_str("</a>");
        }
    }
}

fn escape_html(text: &str, out: &mut String) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            c => out.push(c),
        }
    }
}

fn escape_attr(text: &str, out: &mut String) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            c => out.push(c),
        }
    }
}

/// Parse an HTML fragment and reduce it to allow-listed document blocks.
pub fn sanitize_html(html: &str) -> Result<CleanFragment, SanitizeError> {
    if html.len() > MAX_FRAGMENT_BYTES {
        return Err(SanitizeError::TooLarge(html.len()));
    }
    let dom = parse_document(RcDom::default(), Default::default())
        .from_utf8()
        .read_from(&mut html.as_bytes())
        .map_err(|e| SanitizeError::Parse(e.to_string()))?;

    let mut collector = BlockCollector::default();
    collector.walk(&dom.document);
    collector.flush_paragraph();
    tracing::debug!(blocks = collector.blocks.len(), "sanitized pasted fragment");
    Ok(CleanFragment {
        blocks: collector.blocks,
    })
}

#[derive(Default)]
struct BlockCollector {
    blocks: Vec<Block>,
    /// Inline content not yet wrapped in a block element.
    run: Vec<Span>,
}

impl BlockCollector {
    fn walk(&mut self, handle: &Handle) {
        match &handle.data {
            NodeData::Document => {
                for child in handle.children.borrow().iter() {
                    self.walk(child);
                }
            }
            NodeData::Element { name, attrs, .. } => {
                let tag = name.local.as_ref();
                if DROP_SUBTREE.contains(&tag) {
                    return;
                }
                match tag {
                    "p" => {
                        self.flush_paragraph();
                        let mut spans = Vec::new();
                        collect_inline(handle, &mut spans, Marks::empty(), None);
                        if let Some(spans) = finish_run(spans) {
                            self.blocks.push(Block::Paragraph { spans });
                        }
                    }
                    "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                        self.flush_paragraph();
                        let level = tag.as_bytes()[1] - b'0';
                        let mut spans = Vec::new();
                        collect_inline(handle, &mut spans, Marks::empty(), None);
                        if let Some(spans) = finish_run(spans) {
                            self.blocks.push(Block::Heading { level, spans });
                        }
                    }
                    "blockquote" => {
                        self.flush_paragraph();
                        let mut inner = BlockCollector::default();
                        for child in handle.children.borrow().iter() {
                            inner.walk(child);
                        }
                        inner.flush_paragraph();
                        if !inner.blocks.is_empty() {
                            self.blocks.push(Block::Quote {
                                blocks: inner.blocks,
                            });
                        }
                    }
                    "ul" | "ol" => {
                        self.flush_paragraph();
                        let list = collect_list(handle, tag == "ol", attrs);
                        if !list.items.is_empty() {
                            self.blocks.push(Block::List(list));
                        }
                    }
                    "pre" => {
                        self.flush_paragraph();
                        let mut code = String::new();
                        collect_raw_text(handle, &mut code);
                        if code.ends_with('\n') {
                            code.pop();
                        }
                        if !code.is_empty() {
                            self.blocks.push(Block::Code {
                                language: code_language(handle),
                                code,
                            });
                        }
                    }
                    "hr" => {
                        self.flush_paragraph();
                        self.blocks.push(Block::Rule);
                    }
                    // Inline element at block level: starts or extends an
                    // implicit paragraph.
                    "a" | "b" | "strong" | "i" | "em" | "u" | "ins" | "s" | "del" | "strike"
                    | "code" | "span" | "br" => {
                        collect_inline_node(handle, &mut self.run, Marks::empty(), None);
                    }
                    // Anything else (div, table, section, ...) is unwrapped.
                    _ => {
                        for child in handle.children.borrow().iter() {
                            self.walk(child);
                        }
                    }
                }
            }
            NodeData::Text { contents } => {
                push_collapsed_text(&mut self.run, &contents.borrow(), Marks::empty(), None);
            }
            _ => {}
        }
    }

    /// Close the implicit paragraph, if it holds any visible text.
    fn flush_paragraph(&mut self) {
        let run = std::mem::take(&mut self.run);
        if let Some(spans) = finish_run(run) {
            self.blocks.push(Block::Paragraph { spans });
        }
    }
}

fn collect_inline(handle: &Handle, run: &mut Vec<Span>, marks: Marks, link: Option<&Link>) {
    for child in handle.children.borrow().iter() {
        collect_inline_node(child, run, marks, link);
    }
}

fn collect_inline_node(handle: &Handle, run: &mut Vec<Span>, marks: Marks, link: Option<&Link>) {
    match &handle.data {
        NodeData::Text { contents } => {
            push_collapsed_text(run, &contents.borrow(), marks, link);
        }
        NodeData::Element { name, attrs, .. } => {
            let tag = name.local.as_ref();
            if DROP_SUBTREE.contains(&tag) {
                return;
            }
            match tag {
                "br" => run.push(Span {
                    text: "\n".into(),
                    marks,
                    link: link.cloned(),
                }),
                "strong" | "b" => collect_inline(handle, run, marks | Marks::BOLD, link),
                "em" | "i" => collect_inline(handle, run, marks | Marks::ITALIC, link),
                "u" | "ins" => collect_inline(handle, run, marks | Marks::UNDERLINE, link),
                "s" | "del" | "strike" => collect_inline(handle, run, marks | Marks::STRIKE, link),
                "code" => collect_inline(handle, run, marks | Marks::CODE, link),
                "a" => match safe_link(attrs) {
                    Some(target) => collect_inline(handle, run, marks, Some(&target)),
                    // Unsafe or missing href: keep the text, drop the link.
                    None => collect_inline(handle, run, marks, link),
                },
                // Unsupported inline element: unwrap, keep the text.
                _ => collect_inline(handle, run, marks, link),
            }
        }
        _ => {}
    }
}

fn collect_list(handle: &Handle, ordered: bool, attrs: &RefCell<Vec<Attribute>>) -> ListBlock {
    let start = if ordered {
        attr_value(attrs, "start")
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(1)
    } else {
        1
    };
    let mut list = ListBlock {
        ordered,
        start,
        items: Vec::new(),
    };
    for child in handle.children.borrow().iter() {
        if let NodeData::Element { name, .. } = &child.data {
            if name.local.as_ref() == "li" {
                let item = collect_item(child);
                if !item.spans.is_empty() || item.nested.is_some() {
                    list.items.push(item);
                }
            }
        }
    }
    list
}

fn collect_item(handle: &Handle) -> ListItem {
    let mut item = ListItem {
        spans: Vec::new(),
        nested: None,
    };
    for child in handle.children.borrow().iter() {
        match &child.data {
            NodeData::Element { name, attrs, .. } => match name.local.as_ref() {
                "ul" | "ol" => {
                    let tag = name.local.as_ref();
                    let nested = collect_list(child, tag == "ol", attrs);
                    match &mut item.nested {
                        Some(existing) => existing.items.extend(nested.items),
                        none => *none = Some(nested),
                    }
                }
                // Block elements inside an item become soft-break separated
                // text in the item's run.
                "p" | "div" => {
                    if !item.spans.is_empty() {
                        item.spans.push(Span::text("\n"));
                    }
                    collect_inline(child, &mut item.spans, Marks::empty(), None);
                }
                _ => collect_inline_node(child, &mut item.spans, Marks::empty(), None),
            },
            _ => collect_inline_node(child, &mut item.spans, Marks::empty(), None),
        }
    }
    item.spans = finish_run(item.spans).unwrap_or_default();
    item
}

/// All descendant text, verbatim. Used for `pre` contents.
fn collect_raw_text(handle: &Handle, out: &mut String) {
    match &handle.data {
        NodeData::Text { contents } => out.push_str(&contents.borrow()),
        NodeData::Element { name, .. } => {
            if !DROP_SUBTREE.contains(&name.local.as_ref()) {
                for child in handle.children.borrow().iter() {
                    collect_raw_text(child, out);
                }
            }
        }
        _ => {}
    }
}

/// Language hint from a `<code class="language-...">` child of a `pre`.
fn code_language(handle: &Handle) -> SmolStr {
    for child in handle.children.borrow().iter() {
        if let NodeData::Element { name, attrs, .. } = &child.data {
            if name.local.as_ref() == "code" {
                if let Some(class) = attr_value(attrs, "class") {
                    for part in class.split_whitespace() {
                        if let Some(lang) = part.strip_prefix("language-") {
                            return SmolStr::new(lang);
                        }
                    }
                }
            }
        }
    }
    SmolStr::default()
}

fn attr_value(attrs: &RefCell<Vec<Attribute>>, name: &str) -> Option<String> {
    attrs
        .borrow()
        .iter()
        .find(|a| a.name.local.as_ref() == name)
        .map(|a| a.value.to_string())
}

/// Build a link target from an anchor's attributes, rejecting active-content
/// url schemes.
fn safe_link(attrs: &RefCell<Vec<Attribute>>) -> Option<Link> {
    let href = attr_value(attrs, "href")?;
    let href = href.trim();
    if href.is_empty() {
        return None;
    }
    if let Some((scheme, _)) = href.split_once(':') {
        let scheme = scheme.to_ascii_lowercase();
        if matches!(scheme.as_str(), "javascript" | "vbscript" | "data") {
            tracing::debug!(scheme = %scheme, "dropped unsafe link scheme");
            return None;
        }
    }
    let mut link = Link::new(href);
    if let Some(title) = attr_value(attrs, "title") {
        if !title.trim().is_empty() {
            link.title = Some(SmolStr::new(title.trim()));
        }
    }
    Some(link)
}

/// Append text with HTML whitespace collapsing, merging into the previous
/// span when the style matches.
fn push_collapsed_text(run: &mut Vec<Span>, text: &str, marks: Marks, link: Option<&Link>) {
    let mut out = String::with_capacity(text.len());
    let mut prev_ws = false;
    for ch in text.chars() {
        if ch.is_whitespace() {
            if !prev_ws {
                out.push(' ');
            }
            prev_ws = true;
        } else {
            out.push(ch);
            prev_ws = false;
        }
    }
    if out.is_empty() {
        return;
    }
    let link = link.cloned();
    if let Some(last) = run.last_mut() {
        if last.marks == marks && last.link == link {
            last.text.push_str(&out);
            return;
        }
    }
    run.push(Span {
        text: out,
        marks,
        link,
    });
}

/// Merge, trim edge whitespace, and drop the run if nothing visible remains.
fn finish_run(mut spans: Vec<Span>) -> Option<Vec<Span>> {
    run_merge(&mut spans);
    if let Some(first) = spans.first_mut() {
        let trimmed = first.text.trim_start().to_string();
        first.text = trimmed;
    }
    spans.retain(|s| !s.text.is_empty());
    if let Some(last) = spans.last_mut() {
        let trimmed = last.text.trim_end().to_string();
        last.text = trimmed;
    }
    spans.retain(|s| !s.text.is_empty());
    if spans.iter().all(|s| s.text.trim().is_empty()) {
        return None;
    }
    Some(spans)
}
