//! The rich document tree: the structured, editable form of the document.
//!
//! Blocks hold inline span runs (see `span`). Character offsets address the
//! tree through its plain-text projection: leaf texts in document order,
//! joined by `\n`. Horizontal rules carry no text and are not addressable.
//!
//! Structural edits (block split, splice) apply to top-level paragraph and
//! heading blocks; inside lists, quotes, and code blocks a newline stays a
//! literal soft break.

use std::ops::Range;

use smol_str::SmolStr;

use crate::span::{self, Span};

/// A block-level node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Block {
    Paragraph { spans: Vec<Span> },
    Heading { level: u8, spans: Vec<Span> },
    List(ListBlock),
    Quote { blocks: Vec<Block> },
    Code { language: SmolStr, code: String },
    Rule,
}

impl Block {
    /// Empty paragraph.
    pub fn empty_paragraph() -> Self {
        Block::Paragraph { spans: Vec::new() }
    }

    /// Paragraph with plain text.
    pub fn paragraph(text: impl Into<String>) -> Self {
        Block::Paragraph {
            spans: vec![Span::text(text)],
        }
    }

    /// Heading with plain text. Level is clamped to 1..=6.
    pub fn heading(level: u8, text: impl Into<String>) -> Self {
        Block::Heading {
            level: level.clamp(1, 6),
            spans: vec![Span::text(text)],
        }
    }

    /// Inline span run, for blocks that have one.
    pub fn spans(&self) -> Option<&Vec<Span>> {
        match self {
            Block::Paragraph { spans } | Block::Heading { spans, .. } => Some(spans),
            _ => None,
        }
    }

    /// Concatenated plain text of this block and its children.
    pub fn plain_text(&self) -> String {
        let mut out = String::new();
        collect_plain(self, &mut out);
        out
    }
}

fn collect_plain(block: &Block, out: &mut String) {
    match block {
        Block::Paragraph { spans } | Block::Heading { spans, .. } => {
            out.push_str(&span::run_text(spans));
        }
        Block::List(list) => {
            for item in &list.items {
                if !out.is_empty() && !out.ends_with('\n') {
                    out.push('\n');
                }
                out.push_str(&span::run_text(&item.spans));
                if let Some(nested) = &item.nested {
                    collect_plain(&Block::List(nested.clone()), out);
                }
            }
        }
        Block::Quote { blocks } => {
            for b in blocks {
                if !out.is_empty() && !out.ends_with('\n') {
                    out.push('\n');
                }
                collect_plain(b, out);
            }
        }
        Block::Code { code, .. } => out.push_str(code),
        Block::Rule => {}
    }
}

/// An ordered or unordered list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ListBlock {
    pub ordered: bool,
    pub start: u64,
    pub items: Vec<ListItem>,
}

impl ListBlock {
    pub fn new(ordered: bool) -> Self {
        Self {
            ordered,
            start: 1,
            items: Vec::new(),
        }
    }
}

/// One list item: its own span run plus an optional nested list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ListItem {
    pub spans: Vec<Span>,
    pub nested: Option<ListBlock>,
}

impl ListItem {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            spans: vec![Span::text(text)],
            nested: None,
        }
    }
}

/// A location in the tree's plain-text projection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LeafRef {
    /// Leaf index in document order.
    pub leaf: usize,
    /// Char offset within the leaf's text.
    pub local: usize,
}

/// Mutable view of one text-bearing leaf.
pub enum LeafMut<'a> {
    Run(&'a mut Vec<Span>),
    Code(&'a mut String),
}

/// The document tree.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct DocTree {
    pub blocks: Vec<Block>,
}

impl DocTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_blocks(blocks: Vec<Block>) -> Self {
        Self { blocks }
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    // === Plain-text projection ===

    /// Leaf texts in document order.
    pub fn leaf_texts(&self) -> Vec<String> {
        let mut out = Vec::new();
        collect_leaf_texts(&self.blocks, &mut out);
        out
    }

    /// Full plain-text projection: leaf texts joined by `\n`.
    pub fn text(&self) -> String {
        self.leaf_texts().join("\n")
    }

    /// Length of the projection in chars.
    pub fn len_chars(&self) -> usize {
        let leaves = self.leaf_texts();
        if leaves.is_empty() {
            return 0;
        }
        leaves.iter().map(|t| t.chars().count()).sum::<usize>() + leaves.len() - 1
    }

    /// Resolve a global char offset to a leaf position.
    ///
    /// An offset on the separator between leaf `i` and `i+1` resolves to the
    /// end of leaf `i`.
    pub fn resolve(&self, offset: usize) -> Option<LeafRef> {
        let leaves = self.leaf_texts();
        let mut pos = 0usize;
        for (i, text) in leaves.iter().enumerate() {
            let len = text.chars().count();
            if offset <= pos + len {
                return Some(LeafRef {
                    leaf: i,
                    local: offset - pos,
                });
            }
            pos += len + 1;
        }
        None
    }

    /// Global char offset of the start of leaf `leaf`.
    pub fn leaf_start(&self, leaf: usize) -> Option<usize> {
        let leaves = self.leaf_texts();
        if leaf >= leaves.len() {
            return None;
        }
        Some(
            leaves[..leaf]
                .iter()
                .map(|t| t.chars().count() + 1)
                .sum::<usize>(),
        )
    }

    /// Text of leaf `leaf`.
    pub fn leaf_text(&self, leaf: usize) -> Option<String> {
        self.leaf_texts().into_iter().nth(leaf)
    }

    /// Index of the top-level block containing leaf `leaf`.
    pub fn top_block_of_leaf(&self, leaf: usize) -> Option<usize> {
        let mut seen = 0usize;
        for (i, block) in self.blocks.iter().enumerate() {
            let n = count_leaves(block);
            if leaf < seen + n {
                return Some(i);
            }
            seen += n;
        }
        None
    }

    /// Run a closure against the `leaf`-th leaf, mutably.
    pub fn with_leaf_mut<R>(&mut self, leaf: usize, f: impl FnOnce(LeafMut<'_>) -> R) -> Option<R> {
        let mut counter = 0usize;
        let mut f = Some(f);
        let mut result = None;
        visit_leaves_mut(&mut self.blocks, &mut counter, leaf, &mut |l| {
            if let Some(f) = f.take() {
                result = Some(f(l));
            }
        });
        result
    }

    // === Text edits ===

    /// Insert text without newlines at a global offset.
    ///
    /// Returns false if the offset does not resolve.
    pub fn insert_text(&mut self, offset: usize, text: &str) -> bool {
        debug_assert!(!text.contains('\n'));
        if self.blocks.is_empty() {
            self.blocks.push(Block::paragraph(text));
            return true;
        }
        let Some(at) = self.resolve(offset) else {
            return false;
        };
        self.with_leaf_mut(at.leaf, |leaf| match leaf {
            LeafMut::Run(spans) => span::run_insert(spans, at.local, text),
            LeafMut::Code(code) => {
                let byte = code
                    .char_indices()
                    .nth(at.local)
                    .map(|(i, _)| i)
                    .unwrap_or(code.len());
                code.insert_str(byte, text);
            }
        })
        .is_some()
    }

    /// Insert text that may contain newlines.
    ///
    /// Newlines split top-level paragraph/heading blocks; inside lists,
    /// quotes, and code they become literal newline chars (soft breaks).
    pub fn insert_plain(&mut self, offset: usize, text: &str) -> bool {
        if !text.contains('\n') {
            return self.insert_text(offset, text);
        }
        let mut at = offset;
        let mut first = true;
        for piece in text.split('\n') {
            if !first {
                if self.split_block_at(at).is_some() {
                    at += 1; // past the separator
                } else {
                    // Not splittable here: keep the newline literally.
                    let ok = self
                        .resolve(at)
                        .map(|r| {
                            self.with_leaf_mut(r.leaf, |leaf| match leaf {
                                LeafMut::Run(spans) => span::run_insert(spans, r.local, "\n"),
                                LeafMut::Code(code) => {
                                    let byte = code
                                        .char_indices()
                                        .nth(r.local)
                                        .map(|(i, _)| i)
                                        .unwrap_or(code.len());
                                    code.insert(byte, '\n');
                                }
                            })
                        })
                        .is_some();
                    if !ok {
                        return false;
                    }
                    at += 1;
                }
            }
            first = false;
            if !piece.is_empty() {
                if !self.insert_text(at, piece) {
                    return false;
                }
                at += piece.chars().count();
            }
        }
        true
    }

    /// Delete a global char range.
    ///
    /// Deletion is clamped per leaf; block boundaries inside the range are
    /// kept (emptied blocks remain as empty blocks).
    pub fn delete_range(&mut self, range: Range<usize>) {
        if range.is_empty() {
            return;
        }
        let leaves = self.leaf_texts();
        let mut pos = 0usize;
        // Collect per-leaf cut ranges first; leaf texts shift as we mutate.
        let mut cuts: Vec<(usize, Range<usize>)> = Vec::new();
        for (i, text) in leaves.iter().enumerate() {
            let len = text.chars().count();
            let leaf_start = pos;
            let leaf_end = pos + len;
            pos = leaf_end + 1;

            let cut_start = range.start.max(leaf_start);
            let cut_end = range.end.min(leaf_end);
            if cut_start < cut_end {
                cuts.push((i, cut_start - leaf_start..cut_end - leaf_start));
            }
        }
        for (leaf, cut) in cuts {
            self.with_leaf_mut(leaf, |l| match l {
                LeafMut::Run(spans) => span::run_delete(spans, cut),
                LeafMut::Code(code) => {
                    let a = code
                        .char_indices()
                        .nth(cut.start)
                        .map(|(i, _)| i)
                        .unwrap_or(code.len());
                    let b = code
                        .char_indices()
                        .nth(cut.end)
                        .map(|(i, _)| i)
                        .unwrap_or(code.len());
                    code.replace_range(a..b, "");
                }
            });
        }
    }

    // === Structural edits ===

    /// Split the top-level paragraph/heading containing `offset` into two
    /// blocks. The tail becomes a paragraph. Returns the index of the tail
    /// block, or None when the offset is not inside a splittable block.
    pub fn split_block_at(&mut self, offset: usize) -> Option<usize> {
        let at = self.resolve(offset)?;
        let top = self.top_block_of_leaf(at.leaf)?;
        match &mut self.blocks[top] {
            Block::Paragraph { spans } | Block::Heading { spans, .. } => {
                let tail = span::run_split(spans, at.local);
                self.blocks.insert(top + 1, Block::Paragraph { spans: tail });
                Some(top + 1)
            }
            _ => None,
        }
    }

    /// Splice blocks into the tree at a global offset.
    ///
    /// Splits the enclosing top-level paragraph/heading when the offset is
    /// inside one; otherwise inserts after the enclosing top-level block.
    /// Empty halves produced by the split are dropped. Returns the offset of
    /// the end of the spliced content.
    pub fn splice_blocks(&mut self, offset: usize, blocks: Vec<Block>) -> usize {
        if blocks.is_empty() {
            return offset;
        }
        if self.blocks.is_empty() {
            self.blocks = blocks;
            return self.len_chars();
        }

        let insert_at = match self.split_block_at(offset) {
            Some(tail_idx) => {
                let head_idx = tail_idx - 1;
                let tail_empty = self.blocks[tail_idx]
                    .spans()
                    .map(|s| span::run_len(s) == 0)
                    .unwrap_or(false);
                if tail_empty {
                    self.blocks.remove(tail_idx);
                }
                let head_empty = self.blocks[head_idx]
                    .spans()
                    .map(|s| span::run_len(s) == 0)
                    .unwrap_or(false);
                if head_empty {
                    self.blocks.remove(head_idx);
                    head_idx
                } else {
                    head_idx + 1
                }
            }
            None => self
                .resolve(offset)
                .and_then(|r| self.top_block_of_leaf(r.leaf))
                .map(|i| i + 1)
                .unwrap_or(self.blocks.len()),
        };

        let last = insert_at + blocks.len() - 1;
        for (i, block) in blocks.into_iter().enumerate() {
            self.blocks.insert(insert_at + i, block);
        }
        self.offset_of_block_end(last)
    }

    /// Global offset of the end of top-level block `index`'s text.
    pub fn offset_of_block_end(&self, index: usize) -> usize {
        let mut leaf = 0usize;
        for block in self.blocks.iter().take(index + 1) {
            leaf += count_leaves(block);
        }
        if leaf == 0 {
            return 0;
        }
        let leaves = self.leaf_texts();
        let upto = leaf.min(leaves.len());
        leaves[..upto]
            .iter()
            .map(|t| t.chars().count())
            .sum::<usize>()
            + upto.saturating_sub(1)
    }
}

fn collect_leaf_texts(blocks: &[Block], out: &mut Vec<String>) {
    for block in blocks {
        match block {
            Block::Paragraph { spans } | Block::Heading { spans, .. } => {
                out.push(span::run_text(spans));
            }
            Block::List(list) => collect_list_texts(list, out),
            Block::Quote { blocks } => collect_leaf_texts(blocks, out),
            Block::Code { code, .. } => out.push(code.clone()),
            Block::Rule => {}
        }
    }
}

fn collect_list_texts(list: &ListBlock, out: &mut Vec<String>) {
    for item in &list.items {
        out.push(span::run_text(&item.spans));
        if let Some(nested) = &item.nested {
            collect_list_texts(nested, out);
        }
    }
}

fn count_leaves(block: &Block) -> usize {
    match block {
        Block::Paragraph { .. } | Block::Heading { .. } | Block::Code { .. } => 1,
        Block::List(list) => count_list_leaves(list),
        Block::Quote { blocks } => blocks.iter().map(count_leaves).sum(),
        Block::Rule => 0,
    }
}

fn count_list_leaves(list: &ListBlock) -> usize {
    list.items
        .iter()
        .map(|i| 1 + i.nested.as_ref().map(count_list_leaves).unwrap_or(0))
        .sum()
}

fn visit_leaves_mut(
    blocks: &mut [Block],
    counter: &mut usize,
    target: usize,
    f: &mut impl FnMut(LeafMut<'_>),
) {
    for block in blocks {
        if *counter > target {
            return;
        }
        match block {
            Block::Paragraph { spans } | Block::Heading { spans, .. } => {
                if *counter == target {
                    f(LeafMut::Run(spans));
                }
                *counter += 1;
            }
            Block::Code { code, .. } => {
                if *counter == target {
                    f(LeafMut::Code(code));
                }
                *counter += 1;
            }
            Block::List(list) => visit_list_leaves_mut(list, counter, target, f),
            Block::Quote { blocks } => visit_leaves_mut(blocks, counter, target, f),
            Block::Rule => {}
        }
    }
}

fn visit_list_leaves_mut(
    list: &mut ListBlock,
    counter: &mut usize,
    target: usize,
    f: &mut impl FnMut(LeafMut<'_>),
) {
    for item in &mut list.items {
        if *counter == target {
            f(LeafMut::Run(&mut item.spans));
        }
        *counter += 1;
        if *counter > target {
            return;
        }
        if let Some(nested) = &mut item.nested {
            visit_list_leaves_mut(nested, counter, target, f);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::span::Marks;

    fn sample() -> DocTree {
        DocTree::from_blocks(vec![
            Block::heading(1, "Title"),
            Block::paragraph("Hello world"),
            Block::List(ListBlock {
                ordered: false,
                start: 1,
                items: vec![ListItem::text("one"), ListItem::text("two")],
            }),
        ])
    }

    #[test]
    fn test_text_projection() {
        let tree = sample();
        assert_eq!(tree.text(), "Title\nHello world\none\ntwo");
        assert_eq!(tree.len_chars(), 25);
    }

    #[test]
    fn test_resolve() {
        let tree = sample();
        // Inside "Title"
        assert_eq!(tree.resolve(3), Some(LeafRef { leaf: 0, local: 3 }));
        // Separator resolves to end of previous leaf
        assert_eq!(tree.resolve(5), Some(LeafRef { leaf: 0, local: 5 }));
        // Start of "Hello world"
        assert_eq!(tree.resolve(6), Some(LeafRef { leaf: 1, local: 0 }));
        // Past the end
        assert_eq!(tree.resolve(100), None);
    }

    #[test]
    fn test_leaf_start_roundtrip() {
        let tree = sample();
        for leaf in 0..4 {
            let start = tree.leaf_start(leaf).unwrap();
            assert_eq!(tree.resolve(start).map(|r| r.leaf), Some(leaf));
        }
    }

    #[test]
    fn test_insert_text() {
        let mut tree = sample();
        assert!(tree.insert_text(6, ">> "));
        assert_eq!(tree.text(), "Title\n>> Hello world\none\ntwo");
    }

    #[test]
    fn test_insert_into_empty_tree() {
        let mut tree = DocTree::new();
        assert!(tree.insert_text(0, "first"));
        assert_eq!(tree.blocks, vec![Block::paragraph("first")]);
    }

    #[test]
    fn test_delete_range_within_leaf() {
        let mut tree = sample();
        tree.delete_range(6..12); // "Hello "
        assert_eq!(tree.text(), "Title\nworld\none\ntwo");
    }

    #[test]
    fn test_delete_range_across_leaves_keeps_blocks() {
        let mut tree = sample();
        tree.delete_range(3..8); // "le" of Title + "He" of Hello
        assert_eq!(tree.text(), "Tit\nllo world\none\ntwo");
        assert_eq!(tree.blocks.len(), 3);
    }

    #[test]
    fn test_split_block() {
        let mut tree = DocTree::from_blocks(vec![Block::paragraph("Hello world")]);
        let tail = tree.split_block_at(5).unwrap();
        assert_eq!(tail, 1);
        assert_eq!(tree.text(), "Hello\n world");
    }

    #[test]
    fn test_split_inside_list_is_rejected() {
        let mut tree = sample();
        // offset 19 is inside "one"
        assert_eq!(tree.split_block_at(19), None);
    }

    #[test]
    fn test_insert_plain_with_newline_splits_paragraph() {
        let mut tree = DocTree::from_blocks(vec![Block::paragraph("ab")]);
        assert!(tree.insert_plain(1, "x\ny"));
        assert_eq!(tree.text(), "ax\nyb");
        assert_eq!(tree.blocks.len(), 2);
    }

    #[test]
    fn test_splice_blocks_mid_paragraph() {
        let mut tree = DocTree::from_blocks(vec![Block::paragraph("headtail")]);
        let caret = tree.splice_blocks(4, vec![Block::heading(2, "mid")]);
        assert_eq!(tree.text(), "head\nmid\ntail");
        assert_eq!(caret, 8); // end of "mid"
    }

    #[test]
    fn test_splice_blocks_empty_tree() {
        let mut tree = DocTree::new();
        let caret = tree.splice_blocks(0, vec![Block::paragraph("pasted")]);
        assert_eq!(tree.text(), "pasted");
        assert_eq!(caret, 6);
    }

    #[test]
    fn test_with_leaf_mut_marks() {
        let mut tree = sample();
        tree.with_leaf_mut(1, |leaf| {
            if let LeafMut::Run(spans) = leaf {
                crate::span::run_set_mark(spans, 0..5, Marks::BOLD, true);
            }
        });
        let spans = tree.blocks[1].spans().unwrap();
        assert_eq!(spans[0].marks, Marks::BOLD);
        assert_eq!(spans[0].text, "Hello");
    }

    #[test]
    fn test_plain_text_block() {
        let tree = sample();
        assert_eq!(tree.blocks[2].plain_text(), "one\ntwo");
    }
}
