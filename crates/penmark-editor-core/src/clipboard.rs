//! Clipboard boundary for paste handling.
//!
//! The editor never talks to a system clipboard directly; the embedding
//! surface implements [`ClipboardPayload`] over whatever native API it has
//! (browser clipboard events, a desktop toolkit, a test stub). Paste prefers
//! the formatted representation and runs it through the sanitizer; plain
//! text is the fallback; an unreadable clipboard is a quiet no-op.

use crate::sanitize;
use crate::tree::Block;

/// One paste event's clipboard contents.
///
/// Both readers return `None` when the representation is absent or the
/// platform denied access; the two cases are deliberately not distinguished.
pub trait ClipboardPayload {
    /// The `text/html` representation, if any.
    fn read_html(&self) -> Option<String>;

    /// The `text/plain` representation, if any.
    fn read_text(&self) -> Option<String>;
}

/// What a paste resolves to after sanitization.
#[derive(Debug, PartialEq)]
pub enum PasteContent {
    /// Sanitized formatted content, as document blocks.
    Blocks(Vec<Block>),
    /// Plain text, to be inserted at the caret.
    Text(String),
    /// Nothing readable on the clipboard.
    Empty,
}

/// Resolve a clipboard payload to insertable content.
pub fn resolve_paste(payload: &dyn ClipboardPayload) -> PasteContent {
    if let Some(html) = payload.read_html() {
        match sanitize::sanitize_html(&html) {
            Ok(fragment) if !fragment.is_empty() => {
                return PasteContent::Blocks(fragment.into_blocks());
            }
            // Formatted but visually empty; fall through to plain text.
            Ok(_) => {}
            Err(err) => {
                tracing::warn!(%err, "paste sanitization failed, trying plain text");
            }
        }
    }
    if let Some(text) = payload.read_text() {
        if !text.is_empty() {
            return PasteContent::Text(text);
        }
    }
    tracing::debug!("clipboard had no readable content");
    PasteContent::Empty
}

/// In-memory payload for tests and headless use.
#[derive(Debug, Default)]
pub struct StaticPayload {
    pub html: Option<String>,
    pub text: Option<String>,
}

impl StaticPayload {
    pub fn html(html: impl Into<String>) -> Self {
        Self {
            html: Some(html.into()),
            text: None,
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self {
            html: None,
            text: Some(text.into()),
        }
    }
}

impl ClipboardPayload for StaticPayload {
    fn read_html(&self) -> Option<String> {
        self.html.clone()
    }

    fn read_text(&self) -> Option<String> {
        self.text.clone()
    }
}
