// End-to-end tests for the editor engine: the full keystroke-to-value
// pipeline, exercised the way an embedding surface would drive it.

use penmark_editor_core::{
    Block, EditorMode, Key, KeydownResult, MarkdownEditor, Modifiers, Selection, StaticPayload,
};

fn type_str(ed: &mut MarkdownEditor, text: &str) {
    for c in text.chars() {
        ed.handle_keydown(Key::ch(c), Modifiers::NONE);
    }
}

#[test]
fn round_trip_idempotence_over_supported_constructs() {
    let source = "# Title\n\n\
        Some **bold** and _italic_ and ~~struck~~ text\n\n\
        - one\n  * nested\n- two\n\n\
        1. first\n2. second\n\n\
        > quoted\n\n\
        ```rust\nfn main() {}\n```\n\n\
        a [link](https://example.com) and `code`\n\n\
        ---\n\n\
        the end";
    let mut ed = MarkdownEditor::with_value(source);
    ed.toggle_mode();
    let once = ed.value().to_string();
    ed.toggle_mode();
    ed.toggle_mode();
    assert_eq!(ed.value(), once, "second round trip changed the source");
}

#[test]
fn mode_switch_fidelity() {
    let mut ed = MarkdownEditor::with_value("# Title\n\nSome **bold** text");
    ed.toggle_mode();
    assert_eq!(ed.mode(), EditorMode::Source);
    assert_eq!(ed.value(), "# Title\n\nSome **bold** text");
    ed.toggle_mode();
    assert_eq!(ed.mode(), EditorMode::Rich);
    assert_eq!(ed.value(), "# Title\n\nSome **bold** text");
}

#[test]
fn command_menu_auto_dismiss_on_space() {
    let mut ed = MarkdownEditor::new();
    type_str(&mut ed, "/bol");
    assert!(ed.command_menu().is_some());
    type_str(&mut ed, " ");
    assert!(ed.command_menu().is_none());
    // The typed text stays in the document untouched.
    assert_eq!(ed.value(), "/bol");
}

#[test]
fn command_selection_splits_block_and_sets_heading() {
    let mut ed = MarkdownEditor::new();
    type_str(&mut ed, "Hello /h1");
    let menu = ed.command_menu().expect("menu open after trigger");
    assert_eq!(menu.query(), "h1");

    ed.handle_keydown(Key::Enter, Modifiers::NONE);
    type_str(&mut ed, "World");

    let tree = ed.tree().expect("rich mode live");
    assert_eq!(tree.blocks.len(), 2);
    assert!(matches!(&tree.blocks[0], Block::Paragraph { .. }));
    assert_eq!(
        tree.blocks[1],
        Block::Heading {
            level: 1,
            spans: vec![penmark_editor_core::Span::text("World")],
        }
    );
    assert_eq!(tree.blocks[0].plain_text(), "Hello ");
}

#[test]
fn escape_priority_menu_first_then_fullscreen() {
    let mut ed = MarkdownEditor::new();
    ed.toggle_fullscreen();
    type_str(&mut ed, "/h");
    assert!(ed.command_menu().is_some());
    assert!(ed.is_fullscreen());

    // First Escape: menu closes, fullscreen survives.
    assert_eq!(
        ed.handle_keydown(Key::Escape, Modifiers::NONE),
        KeydownResult::Handled
    );
    assert!(ed.command_menu().is_none());
    assert!(ed.is_fullscreen());

    // Second Escape: fullscreen exits.
    assert_eq!(
        ed.handle_keydown(Key::Escape, Modifiers::NONE),
        KeydownResult::Handled
    );
    assert!(!ed.is_fullscreen());
}

#[test]
fn sanitizer_closure_through_paste() {
    let mut ed = MarkdownEditor::new();
    ed.paste(&StaticPayload::html(
        "<div onclick=\"evil()\"><h1>Head</h1><script>steal()</script>\
         <marquee>kept text</marquee></div>",
    ));
    // Script content is gone, unknown-element text survives, heading kept.
    assert_eq!(ed.value(), "# Head\n\nkept text");
}

#[test]
fn formatting_shortcut_reflects_in_value_immediately() {
    let mut ed = MarkdownEditor::with_value("make this bold");
    ed.set_selection(Selection::new(10, 14));
    ed.take_events();
    ed.handle_keydown(Key::ch('b'), Modifiers::CTRL);
    assert_eq!(ed.value(), "make this **bold**");
    let events = ed.take_events();
    assert_eq!(
        events,
        vec![penmark_editor_core::EditorEvent::ValueChanged(
            "make this **bold**".into()
        )]
    );
}

#[test]
fn source_mode_edits_skip_the_converter() {
    let mut ed = MarkdownEditor::new();
    ed.toggle_mode();
    type_str(&mut ed, "# half-written [link](");
    assert_eq!(ed.value(), "# half-written [link](");
    // Switching back degrades gracefully instead of failing.
    ed.toggle_mode();
    assert_eq!(ed.mode(), EditorMode::Rich);
    assert!(ed.tree().is_some());
}
