//! The markdown field: the editor engine wrapped in the form-field contract.
//!
//! The field owns an editor instance and gates input on the disabled and
//! readonly flags. The external value is always the markdown string; the
//! form layer never sees the tree.

use penmark_editor_core::{
    ClipboardPayload, EditorEvent, Key, KeydownResult, MarkdownEditor, Modifiers,
};
use serde::{Deserialize, Serialize};

/// Props handed in by the form system.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MarkdownFieldProps {
    /// Current markdown value.
    pub value: String,
    /// Placeholder shown while the document is empty.
    pub placeholder: String,
    /// Fixed editor height in pixels, if the form pins one.
    pub height: Option<u32>,
    pub disabled: bool,
    pub readonly: bool,
}

/// Events emitted to the form system.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldEvent {
    ValueChanged(String),
    Focus,
    Blur,
}

/// A markdown form field.
pub struct MarkdownField {
    props: MarkdownFieldProps,
    editor: MarkdownEditor,
}

impl MarkdownField {
    pub fn new(props: MarkdownFieldProps) -> Self {
        let editor = MarkdownEditor::with_value(&props.value);
        Self { props, editor }
    }

    pub fn props(&self) -> &MarkdownFieldProps {
        &self.props
    }

    pub fn editor(&self) -> &MarkdownEditor {
        &self.editor
    }

    pub fn editor_mut(&mut self) -> Option<&mut MarkdownEditor> {
        if self.editable() {
            Some(&mut self.editor)
        } else {
            None
        }
    }

    fn editable(&self) -> bool {
        !self.props.disabled && !self.props.readonly
    }

    /// Replace the value from outside (form reset, server refresh).
    ///
    /// Rebuilds the editor; any in-progress menu or mode state is dropped.
    pub fn set_value(&mut self, markdown: &str) {
        if markdown == self.props.value {
            return;
        }
        self.props.value = markdown.to_string();
        self.editor = MarkdownEditor::with_value(markdown);
    }

    /// Keyboard input, gated on the disabled/readonly flags.
    pub fn handle_keydown(&mut self, key: Key, mods: Modifiers) -> KeydownResult {
        if !self.editable() {
            return KeydownResult::NotHandled;
        }
        self.editor.handle_keydown(key, mods)
    }

    pub fn paste(&mut self, payload: &dyn ClipboardPayload) {
        if self.editable() {
            self.editor.paste(payload);
        }
    }

    pub fn focus(&mut self) {
        // Disabled fields never take focus; readonly fields do.
        if !self.props.disabled {
            self.editor.focus();
        }
    }

    pub fn blur(&mut self) {
        if !self.props.disabled {
            self.editor.blur();
        }
    }

    /// Drain editor events as field events, keeping the props value in step.
    pub fn take_events(&mut self) -> Vec<FieldEvent> {
        self.editor
            .take_events()
            .into_iter()
            .map(|event| match event {
                EditorEvent::ValueChanged(value) => {
                    self.props.value = value.clone();
                    FieldEvent::ValueChanged(value)
                }
                EditorEvent::Focus => FieldEvent::Focus,
                EditorEvent::Blur => FieldEvent::Blur,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(props: MarkdownFieldProps) -> MarkdownField {
        MarkdownField::new(props)
    }

    #[test]
    fn test_typing_updates_props_value() {
        let mut f = field(MarkdownFieldProps::default());
        f.handle_keydown(Key::ch('a'), Modifiers::NONE);
        let events = f.take_events();
        assert_eq!(events, vec![FieldEvent::ValueChanged("a".into())]);
        assert_eq!(f.props().value, "a");
    }

    #[test]
    fn test_disabled_field_ignores_input() {
        let mut f = field(MarkdownFieldProps {
            disabled: true,
            ..Default::default()
        });
        assert_eq!(
            f.handle_keydown(Key::ch('a'), Modifiers::NONE),
            KeydownResult::NotHandled
        );
        assert!(f.take_events().is_empty());
    }

    #[test]
    fn test_readonly_field_focuses_but_does_not_edit() {
        let mut f = field(MarkdownFieldProps {
            readonly: true,
            value: "keep".into(),
            ..Default::default()
        });
        f.focus();
        f.handle_keydown(Key::ch('x'), Modifiers::NONE);
        assert_eq!(f.take_events(), vec![FieldEvent::Focus]);
        assert_eq!(f.props().value, "keep");
    }

    #[test]
    fn test_set_value_rebuilds_editor() {
        let mut f = field(MarkdownFieldProps::default());
        f.set_value("# New");
        assert_eq!(f.props().value, "# New");
        assert_eq!(f.editor().value(), "# New");
    }

    #[test]
    fn test_props_serde_shape() {
        let json = r##"{"value":"# Hi","placeholder":"Write...","height":320,"disabled":false,"readonly":false}"##;
        let props: MarkdownFieldProps = serde_json::from_str(json).expect("valid props json");
        assert_eq!(props.value, "# Hi");
        assert_eq!(props.height, Some(320));
    }
}
