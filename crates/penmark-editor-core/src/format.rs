//! Formatting operations over the document tree.
//!
//! Every operation goes through [`execute`], which acts on the current
//! selection range in the plain-text projection. A collapsed selection falls
//! back to the word around the caret for inline marks, and to the enclosing
//! block for block-level operations.

use std::ops::Range;

use crate::span::{self, Link, Marks, Span};
use crate::tree::{Block, DocTree, LeafMut, ListBlock, ListItem};
use crate::types::Selection;

/// Target shape for a block-type change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    Paragraph,
    Heading(u8),
    Quote,
    Code,
}

/// Kind argument for list toggling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListKind {
    Bullet,
    Numbered,
}

impl ListKind {
    fn is_ordered(self) -> bool {
        matches!(self, ListKind::Numbered)
    }
}

/// A discrete formatting operation.
#[derive(Debug, Clone, PartialEq)]
pub enum FormatOp {
    ToggleBold,
    ToggleItalic,
    ToggleUnderline,
    ToggleStrike,
    ToggleCode,
    SetBlockType(BlockKind),
    ToggleList(ListKind),
    InsertLink(Link),
    InsertRule,
}

/// Apply a formatting operation. Returns whether the tree changed.
pub fn execute(tree: &mut DocTree, selection: Selection, op: FormatOp) -> bool {
    tracing::trace!(?op, "format op");
    match op {
        FormatOp::ToggleBold => toggle_mark(tree, selection, Marks::BOLD),
        FormatOp::ToggleItalic => toggle_mark(tree, selection, Marks::ITALIC),
        FormatOp::ToggleUnderline => toggle_mark(tree, selection, Marks::UNDERLINE),
        FormatOp::ToggleStrike => toggle_mark(tree, selection, Marks::STRIKE),
        FormatOp::ToggleCode => toggle_mark(tree, selection, Marks::CODE),
        FormatOp::SetBlockType(kind) => match caret_block(tree, selection) {
            Some(index) => set_block_kind(tree, index, kind),
            None => {
                // Empty document: materialize the block.
                tree.blocks.push(Block::empty_paragraph());
                set_block_kind(tree, 0, kind)
            }
        },
        FormatOp::ToggleList(kind) => match caret_block(tree, selection) {
            Some(index) => toggle_list(tree, index, kind.is_ordered()),
            None => {
                tree.blocks.push(Block::empty_paragraph());
                toggle_list(tree, 0, kind.is_ordered())
            }
        },
        FormatOp::InsertLink(link) => set_link(tree, selection, link),
        FormatOp::InsertRule => {
            let index = caret_block(tree, selection)
                .map(|i| i + 1)
                .unwrap_or(tree.blocks.len());
            tree.blocks.insert(index, Block::Rule);
            true
        }
    }
}

/// Top-level block index under the selection start.
fn caret_block(tree: &DocTree, selection: Selection) -> Option<usize> {
    let at = tree.resolve(selection.start())?;
    tree.top_block_of_leaf(at.leaf)
}

/// The selected range, or the word around a collapsed caret.
fn effective_range(tree: &DocTree, selection: Selection) -> Option<Range<usize>> {
    if !selection.is_collapsed() {
        return Some(selection.to_range());
    }
    word_range(tree, selection.start())
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Word boundaries around `caret` in its leaf, as a global range.
fn word_range(tree: &DocTree, caret: usize) -> Option<Range<usize>> {
    let at = tree.resolve(caret)?;
    let text = tree.leaf_text(at.leaf)?;
    let chars: Vec<char> = text.chars().collect();
    let mut a = at.local.min(chars.len());
    let mut b = a;
    while a > 0 && is_word_char(chars[a - 1]) {
        a -= 1;
    }
    while b < chars.len() && is_word_char(chars[b]) {
        b += 1;
    }
    if a == b {
        return None;
    }
    let start = tree.leaf_start(at.leaf)?;
    Some(start + a..start + b)
}

/// Per-leaf sub-ranges of a global range.
fn leaf_segments(tree: &DocTree, range: &Range<usize>) -> Vec<(usize, Range<usize>)> {
    let mut out = Vec::new();
    let mut pos = 0usize;
    for (i, text) in tree.leaf_texts().iter().enumerate() {
        let len = text.chars().count();
        let start = range.start.max(pos);
        let end = range.end.min(pos + len);
        if start < end {
            out.push((i, start - pos..end - pos));
        }
        pos += len + 1;
    }
    out
}

fn toggle_mark(tree: &mut DocTree, selection: Selection, mark: Marks) -> bool {
    let Some(range) = effective_range(tree, selection) else {
        return false;
    };
    let segments = leaf_segments(tree, &range);

    // On iff some covered text is missing the mark. Code leaves carry no
    // marks and do not participate.
    let mut covered = false;
    let mut all_marked = true;
    for (leaf, local) in &segments {
        let has = tree.with_leaf_mut(*leaf, |l| match l {
            LeafMut::Run(spans) => Some(span::run_has_mark(spans, local.clone(), mark)),
            LeafMut::Code(_) => None,
        });
        if let Some(Some(has)) = has {
            covered = true;
            all_marked &= has;
        }
    }
    if !covered {
        return false;
    }
    let on = !all_marked;

    for (leaf, local) in segments {
        tree.with_leaf_mut(leaf, |l| {
            if let LeafMut::Run(spans) = l {
                span::run_set_mark(spans, local, mark, on);
            }
        });
    }
    true
}

fn set_link(tree: &mut DocTree, selection: Selection, link: Link) -> bool {
    let Some(range) = effective_range(tree, selection) else {
        return false;
    };
    let mut changed = false;
    for (leaf, local) in leaf_segments(tree, &range) {
        let applied = tree.with_leaf_mut(leaf, |l| match l {
            LeafMut::Run(spans) => {
                span::run_set_link(spans, local, Some(link.clone()));
                true
            }
            LeafMut::Code(_) => false,
        });
        changed |= applied == Some(true);
    }
    changed
}

/// Rebuild top-level block `index` as `kind`.
///
/// Quote is a wrap/unwrap toggle; the others replace the block, carrying the
/// inline content (or, for structured blocks, their plain text).
pub(crate) fn set_block_kind(tree: &mut DocTree, index: usize, kind: BlockKind) -> bool {
    if index >= tree.blocks.len() {
        return false;
    }
    match kind {
        BlockKind::Paragraph => {
            let spans = take_spans(tree.blocks.remove(index));
            tree.blocks.insert(index, Block::Paragraph { spans });
        }
        BlockKind::Heading(level) => {
            let spans = take_spans(tree.blocks.remove(index));
            tree.blocks.insert(
                index,
                Block::Heading {
                    level: level.clamp(1, 6),
                    spans,
                },
            );
        }
        BlockKind::Quote => match tree.blocks.remove(index) {
            Block::Quote { blocks } if !blocks.is_empty() => {
                for (i, b) in blocks.into_iter().enumerate() {
                    tree.blocks.insert(index + i, b);
                }
            }
            Block::Quote { .. } => tree.blocks.insert(index, Block::empty_paragraph()),
            other => tree.blocks.insert(
                index,
                Block::Quote {
                    blocks: vec![other],
                },
            ),
        },
        BlockKind::Code => {
            let removed = tree.blocks.remove(index);
            let block = match removed {
                code @ Block::Code { .. } => code,
                other => Block::Code {
                    language: Default::default(),
                    code: other.plain_text(),
                },
            };
            tree.blocks.insert(index, block);
        }
    }
    true
}

/// Toggle top-level block `index` between list and paragraph form.
pub(crate) fn toggle_list(tree: &mut DocTree, index: usize, ordered: bool) -> bool {
    if index >= tree.blocks.len() {
        return false;
    }
    match tree.blocks.remove(index) {
        // Same kind: unwrap items back into paragraphs.
        Block::List(list) if list.ordered == ordered => {
            let mut paragraphs = Vec::new();
            flatten_items(list.items, &mut paragraphs);
            if paragraphs.is_empty() {
                paragraphs.push(Block::empty_paragraph());
            }
            for (i, p) in paragraphs.into_iter().enumerate() {
                tree.blocks.insert(index + i, p);
            }
        }
        // Other kind: switch the marker style in place.
        Block::List(mut list) => {
            list.ordered = ordered;
            tree.blocks.insert(index, Block::List(list));
        }
        other => {
            let spans = take_spans(other);
            tree.blocks.insert(
                index,
                Block::List(ListBlock {
                    ordered,
                    start: 1,
                    items: vec![ListItem { spans, nested: None }],
                }),
            );
        }
    }
    true
}

fn flatten_items(items: Vec<ListItem>, out: &mut Vec<Block>) {
    for item in items {
        out.push(Block::Paragraph { spans: item.spans });
        if let Some(nested) = item.nested {
            flatten_items(nested.items, out);
        }
    }
}

fn take_spans(block: Block) -> Vec<Span> {
    match block {
        Block::Paragraph { spans } | Block::Heading { spans, .. } => spans,
        other => {
            let text = other.plain_text();
            if text.is_empty() {
                Vec::new()
            } else {
                vec![Span::text(text)]
            }
        }
    }
}
