//! penmark-fields: form-field wrappers around the editor engine.
//!
//! The form system speaks strings and flags; this crate translates that
//! contract onto `penmark_editor_core::MarkdownEditor`.

pub mod kind;
pub mod markdown_field;

pub use kind::FieldKind;
pub use markdown_field::{FieldEvent, MarkdownField, MarkdownFieldProps};
