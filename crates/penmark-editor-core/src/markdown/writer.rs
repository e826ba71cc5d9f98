//! Tree-to-markdown serialization.
//!
//! Inline runs are written by diffing the mark set between adjacent spans
//! against a fixed nesting order, so delimiters always close in reverse of
//! the order they opened. Whitespace at mark boundaries is hoisted outside
//! the delimiters; emphasis next to a space does not parse.
//!
//! Bullet markers alternate `-`/`*`/`+` by nesting depth, ordered markers
//! alternate `.`/`)`, so sibling levels reparse unambiguously.

use std::fmt::{self, Write};

use crate::span::{Marks, Span};
use crate::tree::{Block, DocTree, ListBlock};

/// Open/close delimiter per mark, outermost first. CODE is handled
/// separately: a code span swallows all other marks.
const MARK_ORDER: [(Marks, &str, &str); 4] = [
    (Marks::BOLD, "**", "**"),
    (Marks::ITALIC, "_", "_"),
    (Marks::STRIKE, "~~", "~~"),
    (Marks::UNDERLINE, "<u>", "</u>"),
];

const UNORDERED_MARKERS: [char; 3] = ['-', '*', '+'];
const ORDERED_DELIMS: [char; 2] = ['.', ')'];

pub(crate) fn write_document(tree: &DocTree) -> Result<String, fmt::Error> {
    let mut parts = Vec::with_capacity(tree.blocks.len());
    for block in &tree.blocks {
        let mut out = String::new();
        write_block(block, &mut out)?;
        parts.push(out);
    }
    Ok(parts.join("\n\n"))
}

fn write_block(block: &Block, out: &mut String) -> fmt::Result {
    match block {
        Block::Paragraph { spans } => {
            let base = out.len();
            write_inline(spans, out)?;
            trim_inline_edges(out, base);
            Ok(())
        }
        Block::Heading { level, spans } => {
            for _ in 0..*level {
                out.push('#');
            }
            out.push(' ');
            let base = out.len();
            write_inline(spans, out)?;
            trim_inline_edges(out, base);
            Ok(())
        }
        Block::List(list) => write_list(list, 0, "", out),
        Block::Quote { blocks } => write_quote(blocks, out),
        Block::Code { language, code } => write_code_block(language, code, out),
        Block::Rule => out.write_str("---"),
    }
}

fn write_quote(blocks: &[Block], out: &mut String) -> fmt::Result {
    let mut inner = String::new();
    for (i, block) in blocks.iter().enumerate() {
        if i > 0 {
            inner.push_str("\n\n");
        }
        write_block(block, &mut inner)?;
    }
    for (i, line) in inner.lines().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        if line.is_empty() {
            out.push('>');
        } else {
            out.push_str("> ");
            out.push_str(line);
        }
    }
    Ok(())
}

fn write_code_block(language: &str, code: &str, out: &mut String) -> fmt::Result {
    let fence = if code.contains("```") { "````" } else { "```" };
    out.push_str(fence);
    out.push_str(language);
    out.push('\n');
    out.push_str(code);
    if !code.is_empty() && !code.ends_with('\n') {
        out.push('\n');
    }
    out.push_str(fence);
    Ok(())
}

fn write_list(list: &ListBlock, depth: usize, indent: &str, out: &mut String) -> fmt::Result {
    let mut number = list.start;
    for (i, item) in list.items.iter().enumerate() {
        if i > 0 || depth > 0 {
            out.push('\n');
        }
        let marker = if list.ordered {
            let delim = ORDERED_DELIMS[depth % ORDERED_DELIMS.len()];
            format!("{number}{delim} ")
        } else {
            let bullet = UNORDERED_MARKERS[depth % UNORDERED_MARKERS.len()];
            format!("{bullet} ")
        };
        number += 1;

        out.push_str(indent);
        out.push_str(&marker);

        // Continuation lines (soft breaks in the item) align under the text.
        let content_indent = format!("{indent}{}", " ".repeat(marker.chars().count()));
        let mut rendered = String::new();
        write_inline(&item.spans, &mut rendered)?;
        let rendered = rendered.trim_matches(' ');
        for (j, line) in rendered.split('\n').enumerate() {
            if j > 0 {
                out.push('\n');
                out.push_str(&content_indent);
            }
            out.push_str(line);
        }

        if let Some(nested) = &item.nested {
            write_list(nested, depth + 1, &content_indent, out)?;
        }
    }
    Ok(())
}

/// Write an inline span run as markdown.
pub(crate) fn write_inline(spans: &[Span], out: &mut String) -> fmt::Result {
    let mut line_start = out.is_empty() || out.ends_with('\n');
    let mut i = 0;
    while i < spans.len() {
        match &spans[i].link {
            Some(link) => {
                let mut j = i;
                while j < spans.len() && spans[j].link.as_ref() == Some(link) {
                    j += 1;
                }
                out.push('[');
                line_start = false;
                write_marked_run(&spans[i..j], &mut line_start, out)?;
                out.push_str("](");
                out.push_str(&link.href);
                if let Some(title) = &link.title {
                    write!(out, " \"{title}\"")?;
                }
                out.push(')');
                i = j;
            }
            None => {
                let mut j = i;
                while j < spans.len() && spans[j].link.is_none() {
                    j += 1;
                }
                write_marked_run(&spans[i..j], &mut line_start, out)?;
                i = j;
            }
        }
    }
    Ok(())
}

fn write_marked_run(spans: &[Span], line_start: &mut bool, out: &mut String) -> fmt::Result {
    // Indices into MARK_ORDER, in opening order.
    let mut open: Vec<usize> = Vec::new();
    let mut pending_ws = String::new();

    for span in spans {
        if span.marks.contains(Marks::CODE) {
            close_marks(&mut open, 0, out);
            out.push_str(&pending_ws);
            pending_ws.clear();
            write_code_span(&span.text, out);
            *line_start = false;
            continue;
        }

        let (lead, core, trail) = split_ws(&span.text);

        if core.is_empty() {
            // Whitespace-only span: close any marks it does not carry, then
            // buffer the whitespace so delimiters never sit against a space.
            let keep = open
                .iter()
                .take_while(|idx| span.marks.contains(MARK_ORDER[**idx].0))
                .count();
            close_marks(&mut open, keep, out);
            pending_ws.push_str(&span.text);
            continue;
        }

        let want: Vec<usize> = MARK_ORDER
            .iter()
            .enumerate()
            .filter(|(_, (m, _, _))| span.marks.contains(*m))
            .map(|(idx, _)| idx)
            .collect();

        let mut keep = 0;
        while keep < open.len() && keep < want.len() && open[keep] == want[keep] {
            keep += 1;
        }
        close_marks(&mut open, keep, out);

        out.push_str(&pending_ws);
        if !pending_ws.is_empty() {
            *line_start = pending_ws.ends_with('\n');
        }
        pending_ws.clear();

        if !lead.is_empty() {
            out.push_str(lead);
            *line_start = lead.ends_with('\n');
        }
        for &idx in &want[keep..] {
            out.push_str(MARK_ORDER[idx].1);
            open.push(idx);
            *line_start = false;
        }
        escape_inline(core, line_start, out);
        if !trail.is_empty() {
            pending_ws.push_str(trail);
        }
    }

    close_marks(&mut open, 0, out);
    out.push_str(&pending_ws);
    if !pending_ws.is_empty() {
        *line_start = pending_ws.ends_with('\n');
    }
    Ok(())
}

/// Strip edge spaces from the inline text written after `base`. Edge
/// whitespace in a paragraph is insignificant to every markdown parser and
/// leading indentation would reparse as an indented code block.
fn trim_inline_edges(out: &mut String, base: usize) {
    while out.len() > base && (out.ends_with(' ') || out.ends_with('\t')) {
        out.pop();
    }
    let lead = out[base..].len() - out[base..].trim_start_matches([' ', '\t']).len();
    if lead > 0 {
        out.replace_range(base..base + lead, "");
    }
}

fn close_marks(open: &mut Vec<usize>, keep: usize, out: &mut String) {
    while open.len() > keep {
        if let Some(idx) = open.pop() {
            out.push_str(MARK_ORDER[idx].2);
        }
    }
}

fn write_code_span(text: &str, out: &mut String) {
    if text.contains('`') {
        out.push_str("`` ");
        out.push_str(text);
        out.push_str(" ``");
    } else {
        out.push('`');
        out.push_str(text);
        out.push('`');
    }
}

fn split_ws(text: &str) -> (&str, &str, &str) {
    let core_start = text.len() - text.trim_start().len();
    let core_end = text.trim_end().len();
    if core_start >= core_end {
        return (text, "", "");
    }
    (
        &text[..core_start],
        &text[core_start..core_end],
        &text[core_end..],
    )
}

/// Escape markdown-significant characters in plain text.
///
/// `*`, `_`, backtick, brackets, `<`, and backslash are escaped everywhere;
/// block-introducing characters only at the start of a line.
fn escape_inline(text: &str, line_start: &mut bool, out: &mut String) {
    let mut chars = text.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '\\' | '*' | '_' | '`' | '[' | ']' | '<' => {
                out.push('\\');
                out.push(ch);
                *line_start = false;
            }
            '#' | '>' | '-' | '+' if *line_start => {
                out.push('\\');
                out.push(ch);
                *line_start = false;
            }
            '.' | ')' if *line_start => {
                out.push(ch);
                *line_start = false;
            }
            '0'..='9' if *line_start => {
                // "1. " at line start would read as an ordered list.
                let mut digits = String::new();
                digits.push(ch);
                while let Some(&d @ '0'..='9') = chars.peek() {
                    digits.push(d);
                    chars.next();
                }
                out.push_str(&digits);
                if let Some(delim @ ('.' | ')')) = chars.peek().copied() {
                    chars.next();
                    out.push('\\');
                    out.push(delim);
                }
                *line_start = false;
            }
            '\n' => {
                out.push('\n');
                *line_start = true;
            }
            _ => {
                out.push(ch);
                *line_start = false;
            }
        }
    }
}
