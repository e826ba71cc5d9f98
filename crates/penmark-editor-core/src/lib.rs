//! penmark-editor-core: dual-mode markdown editor logic without framework
//! dependencies.
//!
//! This crate provides:
//! - `DocTree` - the rich document tree with a plain-text projection
//! - `to_markdown` / `to_rich` - total converters between tree and source
//! - `sanitize_html` - allow-list sanitization for pasted fragments
//! - `TriggerDetector` / `CommandMenu` - the slash-command surface
//! - `execute` / `FormatOp` - formatting operations on the tree
//! - `MarkdownEditor` - the mode controller tying it all together

pub mod clipboard;
pub mod command;
pub mod dispatch;
pub mod editor;
pub mod format;
pub mod markdown;
pub mod sanitize;
pub mod span;
pub mod text;
pub mod tree;
pub mod types;

pub use clipboard::{resolve_paste, ClipboardPayload, PasteContent, StaticPayload};
pub use command::{
    candidates, Command, CommandEffect, CommandMenu, DismissPolicy, MenuKeydown, TriggerDetector,
    CATALOG, TRIGGER_CHAR,
};
pub use dispatch::{Fullscreen, Key, KeydownResult, Modifiers};
pub use editor::{EditorEvent, EditorMode, MarkdownEditor};
pub use format::{execute, BlockKind, FormatOp, ListKind};
pub use markdown::{to_markdown, to_rich};
pub use sanitize::{sanitize_html, CleanFragment, SanitizeError};
pub use smol_str::SmolStr;
pub use span::{Link, Marks, Span};
pub use text::{SourceRope, TextBuffer};
pub use tree::{Block, DocTree, LeafMut, LeafRef, ListBlock, ListItem};
pub use types::Selection;
