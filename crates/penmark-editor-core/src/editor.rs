//! The dual-mode editor: mode controller, value derivation, and the
//! keydown dispatch chain.
//!
//! The live document is owned by exactly one surface at a time: the rich
//! tree or the markdown source buffer. The non-live form is a derived
//! projection recomputed on mode switch, never mutated directly. Every edit
//! synchronously re-derives the external markdown value; there is no
//! deferred re-sync.

use crate::clipboard::{resolve_paste, ClipboardPayload, PasteContent};
use crate::command::{Command, CommandEffect, MenuKeydown, TriggerDetector, TRIGGER_CHAR};
use crate::dispatch::{Fullscreen, Key, KeydownResult, Modifiers};
use crate::format::{self, BlockKind, FormatOp, ListKind};
use crate::markdown::{to_markdown, to_rich};
use crate::span;
use crate::text::{SourceRope, TextBuffer};
use crate::tree::{Block, DocTree};
use crate::types::Selection;

/// Which surface currently owns the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorMode {
    Rich,
    Source,
}

/// Events emitted to the surrounding field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditorEvent {
    /// The external markdown value changed.
    ValueChanged(String),
    Focus,
    Blur,
}

enum LiveDoc {
    Rich {
        tree: DocTree,
        selection: Selection,
    },
    Source {
        buffer: SourceRope,
        caret: usize,
    },
}

/// The editor engine. Owns the document, the command menu, and the
/// fullscreen state for one editor instance.
pub struct MarkdownEditor {
    doc: LiveDoc,
    value: String,
    trigger: TriggerDetector,
    fullscreen: Fullscreen,
    events: Vec<EditorEvent>,
}

impl Default for MarkdownEditor {
    fn default() -> Self {
        Self::new()
    }
}

impl MarkdownEditor {
    pub fn new() -> Self {
        Self::with_value("")
    }

    /// Start in rich mode with the given markdown value.
    pub fn with_value(markdown: &str) -> Self {
        Self {
            doc: LiveDoc::Rich {
                tree: to_rich(markdown),
                selection: Selection::collapsed(0),
            },
            value: markdown.to_string(),
            trigger: TriggerDetector::new(),
            fullscreen: Fullscreen::new(),
            events: Vec::new(),
        }
    }

    pub fn mode(&self) -> EditorMode {
        match self.doc {
            LiveDoc::Rich { .. } => EditorMode::Rich,
            LiveDoc::Source { .. } => EditorMode::Source,
        }
    }

    /// The current external markdown value.
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Drain pending field events.
    pub fn take_events(&mut self) -> Vec<EditorEvent> {
        std::mem::take(&mut self.events)
    }

    /// The rich tree, when rich mode is live.
    pub fn tree(&self) -> Option<&DocTree> {
        match &self.doc {
            LiveDoc::Rich { tree, .. } => Some(tree),
            LiveDoc::Source { .. } => None,
        }
    }

    pub fn selection(&self) -> Selection {
        match &self.doc {
            LiveDoc::Rich { selection, .. } => *selection,
            LiveDoc::Source { caret, .. } => Selection::collapsed(*caret),
        }
    }

    pub fn set_selection(&mut self, new: Selection) {
        match &mut self.doc {
            LiveDoc::Rich { tree, selection } => {
                let max = tree.len_chars();
                *selection = Selection::new(new.anchor.min(max), new.head.min(max));
                // Caret movement re-scans the trigger line.
                self.refresh_trigger(false);
            }
            LiveDoc::Source { buffer, caret } => {
                *caret = new.head.min(buffer.len_chars());
            }
        }
    }

    pub fn command_menu(&self) -> Option<&crate::command::CommandMenu> {
        self.trigger.menu()
    }

    pub fn is_fullscreen(&self) -> bool {
        self.fullscreen.is_active()
    }

    pub fn toggle_fullscreen(&mut self) {
        self.fullscreen.toggle();
    }

    pub fn focus(&mut self) {
        self.events.push(EditorEvent::Focus);
    }

    pub fn blur(&mut self) {
        self.events.push(EditorEvent::Blur);
    }

    // === Mode controller ===

    /// Switch surfaces. User-triggered only; never automatic.
    pub fn toggle_mode(&mut self) {
        self.trigger.close();
        self.fullscreen.set_suppress_exit(false);
        match &mut self.doc {
            LiveDoc::Rich { tree, selection } => {
                let source = to_markdown(tree);
                let caret = selection.head.min(source.chars().count());
                tracing::debug!(len = source.len(), "switched to source mode");
                self.doc = LiveDoc::Source {
                    buffer: SourceRope::from_str(&source),
                    caret,
                };
            }
            LiveDoc::Source { buffer, caret } => {
                let tree = to_rich(&buffer.to_string());
                let head = (*caret).min(tree.len_chars());
                tracing::debug!(blocks = tree.blocks.len(), "switched to rich mode");
                self.doc = LiveDoc::Rich {
                    tree,
                    selection: Selection::collapsed(head),
                };
            }
        }
        self.sync_value();
    }

    // === Editing ===

    /// Insert text at the selection, replacing any selected content.
    pub fn insert_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        match &mut self.doc {
            LiveDoc::Rich { tree, selection } => {
                let mut caret = selection.start();
                if !selection.is_collapsed() {
                    tree.delete_range(selection.to_range());
                }
                if tree.insert_plain(caret, text) {
                    caret += text.chars().count();
                }
                *selection = Selection::collapsed(caret.min(tree.len_chars()));
            }
            LiveDoc::Source { buffer, caret } => {
                buffer.insert(*caret, text);
                *caret += text.chars().count();
            }
        }
        let typed_trigger = {
            let mut chars = text.chars();
            chars.next() == Some(TRIGGER_CHAR) && chars.next().is_none()
        };
        self.refresh_trigger(typed_trigger);
        self.sync_value();
    }

    /// Backspace: delete the selection, or one char before the caret.
    pub fn delete_backward(&mut self) {
        match &mut self.doc {
            LiveDoc::Rich { tree, selection } => {
                if !selection.is_collapsed() {
                    tree.delete_range(selection.to_range());
                    *selection = Selection::collapsed(selection.start());
                } else if selection.head > 0 {
                    let caret = selection.head;
                    if at_leaf_start(tree, caret) {
                        merge_block_before(tree, caret);
                    } else {
                        tree.delete_range(caret - 1..caret);
                    }
                    *selection = Selection::collapsed(caret - 1);
                }
            }
            LiveDoc::Source { buffer, caret } => {
                if *caret > 0 {
                    buffer.delete(*caret - 1..*caret);
                    *caret -= 1;
                }
            }
        }
        self.refresh_trigger(false);
        self.sync_value();
    }

    /// Apply a formatting operation at the current selection (rich mode).
    pub fn apply_format(&mut self, op: FormatOp) -> bool {
        let LiveDoc::Rich { tree, selection } = &mut self.doc else {
            return false;
        };
        let changed = format::execute(tree, *selection, op);
        if changed {
            let max = tree.len_chars();
            let sel = *selection;
            self.set_selection(Selection::new(sel.anchor.min(max), sel.head.min(max)));
            self.sync_value();
        }
        changed
    }

    /// Paste from the clipboard boundary.
    pub fn paste(&mut self, payload: &dyn ClipboardPayload) {
        match resolve_paste(payload) {
            PasteContent::Blocks(blocks) => match &mut self.doc {
                LiveDoc::Rich { tree, selection } => {
                    if !selection.is_collapsed() {
                        tree.delete_range(selection.to_range());
                    }
                    let end = tree.splice_blocks(selection.start(), blocks);
                    *selection = Selection::collapsed(end);
                    self.trigger.close();
                    self.fullscreen.set_suppress_exit(false);
                    self.sync_value();
                }
                LiveDoc::Source { .. } => {
                    let md = to_markdown(&DocTree::from_blocks(blocks));
                    self.insert_text(&md);
                }
            },
            PasteContent::Text(text) => self.insert_text(&text),
            PasteContent::Empty => {}
        }
    }

    // === Keydown chain ===

    /// Offer a keydown to the prioritized handler chain: command menu,
    /// formatting shortcuts, editing keys, fullscreen.
    pub fn handle_keydown(&mut self, key: Key, mods: Modifiers) -> KeydownResult {
        if mods == Modifiers::NONE {
            if let Some(menu) = self.trigger.menu_mut() {
                match menu.handle_keydown(&key) {
                    MenuKeydown::Handled => return KeydownResult::Handled,
                    MenuKeydown::Invoke(cmd) => {
                        self.invoke_command(cmd);
                        return KeydownResult::Handled;
                    }
                    MenuKeydown::Dismiss => {
                        self.trigger.close();
                        self.fullscreen.set_suppress_exit(false);
                        return KeydownResult::Handled;
                    }
                    MenuKeydown::NotHandled => {}
                }
            }
        }

        if let Some(op) = shortcut_op(&key, mods) {
            self.apply_format(op);
            return KeydownResult::Handled;
        }

        if mods == Modifiers::NONE || mods == Modifiers::SHIFT {
            match &key {
                Key::Character(_) => {
                    if let Some(c) = key.as_char() {
                        self.insert_text(&c.to_string());
                        return KeydownResult::Handled;
                    }
                }
                Key::Enter => {
                    self.insert_text("\n");
                    return KeydownResult::Handled;
                }
                Key::Backspace => {
                    self.delete_backward();
                    return KeydownResult::Handled;
                }
                _ => {}
            }
        }

        self.fullscreen.handle_keydown(&key)
    }

    // === Command invocation ===

    /// Apply a menu command: delete the trigger text, split the block at the
    /// trigger position, and transform the block after the split.
    fn invoke_command(&mut self, cmd: &'static Command) {
        let Some(menu) = self.trigger.menu() else {
            return;
        };
        let anchor = menu.anchor();
        let trigger_len = menu.trigger_len();
        let LiveDoc::Rich { tree, selection } = &mut self.doc else {
            return;
        };
        let Some(start) = tree.leaf_start(anchor.leaf) else {
            self.trigger.close();
            return;
        };
        let global = start + anchor.local;
        tracing::debug!(command = cmd.name, at = global, "command invoked");
        tree.delete_range(global..global + trigger_len);

        let caret = match cmd.effect {
            CommandEffect::Rule => tree.splice_blocks(global, vec![Block::Rule]),
            effect => {
                let target = split_target(tree, global);
                match effect {
                    CommandEffect::Heading(level) => {
                        format::set_block_kind(tree, target, BlockKind::Heading(level));
                    }
                    CommandEffect::BulletList => {
                        format::toggle_list(tree, target, false);
                    }
                    CommandEffect::NumberedList => {
                        format::toggle_list(tree, target, true);
                    }
                    CommandEffect::Quote => {
                        format::set_block_kind(tree, target, BlockKind::Quote);
                    }
                    CommandEffect::CodeBlock => {
                        format::set_block_kind(tree, target, BlockKind::Code);
                    }
                    CommandEffect::Rule => {}
                }
                block_start_offset(tree, target)
            }
        };
        *selection = Selection::collapsed(caret.min(tree.len_chars()));

        self.trigger.close();
        self.fullscreen.set_suppress_exit(false);
        self.sync_value();
    }

    // === Internal plumbing ===

    /// Re-run trigger detection against the caret's leaf.
    fn refresh_trigger(&mut self, typed_trigger: bool) {
        if let LiveDoc::Rich { tree, selection } = &self.doc {
            if selection.is_collapsed() {
                if let Some(at) = tree.resolve(selection.head) {
                    if let Some(text) = tree.leaf_text(at.leaf) {
                        self.trigger.update(at.leaf, &text, at.local, typed_trigger);
                    }
                }
            } else {
                self.trigger.close();
            }
        } else {
            self.trigger.close();
        }
        self.fullscreen.set_suppress_exit(self.trigger.is_open());
    }

    /// Re-derive the external value and notify if it changed.
    fn sync_value(&mut self) {
        let value = match &self.doc {
            LiveDoc::Rich { tree, .. } => to_markdown(tree),
            LiveDoc::Source { buffer, .. } => buffer.to_string(),
        };
        if value != self.value {
            self.value = value.clone();
            self.events.push(EditorEvent::ValueChanged(value));
        }
    }
}

/// Map a key combination to a formatting shortcut.
fn shortcut_op(key: &Key, mods: Modifiers) -> Option<FormatOp> {
    if !mods.is_primary() {
        return None;
    }
    let c = key.as_char()?.to_ascii_lowercase();
    match (c, mods.shift) {
        ('b', false) => Some(FormatOp::ToggleBold),
        ('i', false) => Some(FormatOp::ToggleItalic),
        ('u', false) => Some(FormatOp::ToggleUnderline),
        ('x', true) => Some(FormatOp::ToggleStrike),
        ('e', false) => Some(FormatOp::ToggleCode),
        ('7', true) => Some(FormatOp::ToggleList(ListKind::Numbered)),
        ('8', true) => Some(FormatOp::ToggleList(ListKind::Bullet)),
        _ => None,
    }
}

fn at_leaf_start(tree: &DocTree, caret: usize) -> bool {
    tree.resolve(caret).map(|r| r.local == 0).unwrap_or(false)
}

/// Merge the top-level paragraph/heading containing `caret` into the block
/// before it, when both carry inline runs.
fn merge_block_before(tree: &mut DocTree, caret: usize) {
    let Some(at) = tree.resolve(caret) else {
        return;
    };
    let Some(top) = tree.top_block_of_leaf(at.leaf) else {
        return;
    };
    if top == 0 {
        return;
    }
    let both_runs = matches!(
        (&tree.blocks[top - 1], &tree.blocks[top]),
        (
            Block::Paragraph { .. } | Block::Heading { .. },
            Block::Paragraph { .. } | Block::Heading { .. }
        )
    );
    if !both_runs {
        return;
    }
    let removed = tree.blocks.remove(top);
    let mut tail = match removed {
        Block::Paragraph { spans } | Block::Heading { spans, .. } => spans,
        _ => Vec::new(),
    };
    if let Block::Paragraph { spans } | Block::Heading { spans, .. } = &mut tree.blocks[top - 1] {
        spans.append(&mut tail);
        span::run_merge(spans);
    }
}

/// Index of the block the command effect should transform: the tail half of
/// the split at `offset`, with an empty head dropped.
fn split_target(tree: &mut DocTree, offset: usize) -> usize {
    match tree.split_block_at(offset) {
        Some(tail_idx) => {
            let head_idx = tail_idx - 1;
            let head_empty = tree.blocks[head_idx]
                .spans()
                .map(|s| span::run_len(s) == 0)
                .unwrap_or(false);
            if head_empty {
                tree.blocks.remove(head_idx);
                head_idx
            } else {
                tail_idx
            }
        }
        None => tree
            .resolve(offset)
            .and_then(|r| tree.top_block_of_leaf(r.leaf))
            .unwrap_or_else(|| {
                tree.blocks.push(Block::empty_paragraph());
                tree.blocks.len() - 1
            }),
    }
}

/// Global char offset of the start of top-level block `index`'s text.
fn block_start_offset(tree: &DocTree, index: usize) -> usize {
    if index == 0 {
        return 0;
    }
    tree.offset_of_block_end(index - 1) + 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clipboard::StaticPayload;
    use crate::span::{Marks, Span};

    fn type_str(ed: &mut MarkdownEditor, text: &str) {
        for c in text.chars() {
            ed.handle_keydown(Key::ch(c), Modifiers::NONE);
        }
    }

    #[test]
    fn test_typing_updates_value_synchronously() {
        let mut ed = MarkdownEditor::new();
        type_str(&mut ed, "hi");
        assert_eq!(ed.value(), "hi");
        let events = ed.take_events();
        assert!(events.contains(&EditorEvent::ValueChanged("hi".into())));
    }

    #[test]
    fn test_enter_splits_paragraph() {
        let mut ed = MarkdownEditor::with_value("ab");
        ed.set_selection(Selection::collapsed(1));
        ed.handle_keydown(Key::Enter, Modifiers::NONE);
        assert_eq!(ed.value(), "a\n\nb");
    }

    #[test]
    fn test_backspace_merges_blocks() {
        let mut ed = MarkdownEditor::with_value("a\n\nb");
        // Projection "a\nb": caret at start of "b".
        ed.set_selection(Selection::collapsed(2));
        ed.handle_keydown(Key::Backspace, Modifiers::NONE);
        assert_eq!(ed.value(), "ab");
    }

    #[test]
    fn test_mode_switch_round_trip() {
        let mut ed = MarkdownEditor::with_value("# Title\n\nSome **bold** text");
        assert_eq!(ed.mode(), EditorMode::Rich);
        ed.toggle_mode();
        assert_eq!(ed.mode(), EditorMode::Source);
        ed.toggle_mode();
        assert_eq!(ed.mode(), EditorMode::Rich);
        assert_eq!(ed.value(), "# Title\n\nSome **bold** text");
    }

    #[test]
    fn test_source_edits_bypass_converter() {
        let mut ed = MarkdownEditor::with_value("");
        ed.toggle_mode();
        type_str(&mut ed, "# raw [");
        // Unbalanced markdown goes out verbatim while source mode is live.
        assert_eq!(ed.value(), "# raw [");
    }

    #[test]
    fn test_slash_opens_menu_and_space_dismisses() {
        let mut ed = MarkdownEditor::new();
        type_str(&mut ed, "x /bol");
        assert!(ed.command_menu().is_some());
        assert_eq!(ed.command_menu().map(|m| m.query()), Some("bol"));
        type_str(&mut ed, " ");
        assert!(ed.command_menu().is_none());
    }

    #[test]
    fn test_command_invocation_splits_block() {
        let mut ed = MarkdownEditor::new();
        type_str(&mut ed, "Hello /h1");
        assert_eq!(ed.command_menu().map(|m| m.query()), Some("h1"));
        ed.handle_keydown(Key::Enter, Modifiers::NONE);
        assert!(ed.command_menu().is_none());
        let tree = ed.tree().expect("rich mode");
        assert_eq!(tree.blocks[0], Block::paragraph("Hello "));
        assert_eq!(tree.blocks[1], Block::Heading { level: 1, spans: vec![] });
        // Typing lands in the new heading.
        type_str(&mut ed, "World");
        assert_eq!(ed.value(), "Hello\n\n# World");
    }

    #[test]
    fn test_command_on_lone_trigger_replaces_block() {
        let mut ed = MarkdownEditor::new();
        type_str(&mut ed, "/quote");
        ed.handle_keydown(Key::Enter, Modifiers::NONE);
        let tree = ed.tree().expect("rich mode");
        assert!(matches!(tree.blocks[0], Block::Quote { .. }));
    }

    #[test]
    fn test_format_shortcut_emits_value() {
        let mut ed = MarkdownEditor::with_value("hello world");
        ed.set_selection(Selection::new(6, 11));
        let res = ed.handle_keydown(Key::ch('b'), Modifiers::CTRL);
        assert_eq!(res, KeydownResult::Handled);
        assert_eq!(ed.value(), "hello **world**");
    }

    #[test]
    fn test_escape_priority_menu_then_fullscreen() {
        let mut ed = MarkdownEditor::new();
        ed.toggle_fullscreen();
        type_str(&mut ed, "/h");
        assert!(ed.command_menu().is_some());
        assert!(ed.is_fullscreen());

        assert_eq!(
            ed.handle_keydown(Key::Escape, Modifiers::NONE),
            KeydownResult::Handled
        );
        assert!(ed.command_menu().is_none());
        assert!(ed.is_fullscreen());

        assert_eq!(
            ed.handle_keydown(Key::Escape, Modifiers::NONE),
            KeydownResult::Handled
        );
        assert!(!ed.is_fullscreen());
    }

    #[test]
    fn test_paste_html_splices_sanitized_blocks() {
        let mut ed = MarkdownEditor::with_value("before");
        ed.set_selection(Selection::collapsed(6));
        ed.paste(&StaticPayload::html("<h2>Pasted</h2><script>x()</script>"));
        assert_eq!(ed.value(), "before\n\n## Pasted");
    }

    #[test]
    fn test_paste_text_fallback() {
        let mut ed = MarkdownEditor::new();
        ed.paste(&StaticPayload::text("plain words"));
        assert_eq!(ed.value(), "plain words");
    }

    #[test]
    fn test_paste_empty_clipboard_is_noop() {
        let mut ed = MarkdownEditor::with_value("keep");
        ed.paste(&StaticPayload::default());
        assert_eq!(ed.value(), "keep");
        assert!(ed.take_events().is_empty());
    }

    #[test]
    fn test_selection_replaced_by_typing() {
        let mut ed = MarkdownEditor::with_value("hello world");
        ed.set_selection(Selection::new(0, 5));
        ed.insert_text("bye");
        assert_eq!(ed.value(), "bye world");
    }

    #[test]
    fn test_toggle_bold_round_trips_through_source() {
        let mut ed = MarkdownEditor::with_value("plain");
        ed.set_selection(Selection::new(0, 5));
        ed.apply_format(FormatOp::ToggleBold);
        assert_eq!(ed.value(), "**plain**");
        ed.toggle_mode();
        ed.toggle_mode();
        let tree = ed.tree().expect("rich mode");
        assert_eq!(
            tree.blocks[0],
            Block::Paragraph {
                spans: vec![Span::marked("plain", Marks::BOLD)],
            }
        );
    }
}
