//! Slash commands: the catalog, candidate filtering, and the menu state.
//!
//! The menu is pure state plus a keydown handler; anchoring it on screen and
//! drawing the candidate list is the embedding surface's job.

mod trigger;

pub use trigger::{DismissPolicy, TriggerDetector, TRIGGER_CHAR};

use crate::dispatch::Key;
use crate::tree::LeafRef;

/// What invoking a command does to the block at the caret.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandEffect {
    /// Turn the block into a heading of the given level.
    Heading(u8),
    /// Turn the block into a bullet list item.
    BulletList,
    /// Turn the block into a numbered list item.
    NumberedList,
    /// Wrap the block in a quote.
    Quote,
    /// Turn the block into a fenced code block.
    CodeBlock,
    /// Insert a horizontal rule.
    Rule,
}

/// One entry in the command catalog.
#[derive(Debug, PartialEq, Eq)]
pub struct Command {
    pub name: &'static str,
    pub description: &'static str,
    pub search_terms: &'static [&'static str],
    pub effect: CommandEffect,
}

impl Command {
    /// Case-insensitive substring match against name, description, or any
    /// search term.
    fn matches(&self, query_lower: &str) -> bool {
        if query_lower.is_empty() {
            return true;
        }
        self.name.to_lowercase().contains(query_lower)
            || self.description.to_lowercase().contains(query_lower)
            || self
                .search_terms
                .iter()
                .any(|t| t.to_lowercase().contains(query_lower))
    }
}

/// The catalog, in menu display order.
pub const CATALOG: &[Command] = &[
    Command {
        name: "Heading 1",
        description: "Large section heading",
        search_terms: &["h1", "title", "heading"],
        effect: CommandEffect::Heading(1),
    },
    Command {
        name: "Heading 2",
        description: "Medium section heading",
        search_terms: &["h2", "subtitle", "heading"],
        effect: CommandEffect::Heading(2),
    },
    Command {
        name: "Heading 3",
        description: "Small section heading",
        search_terms: &["h3", "heading"],
        effect: CommandEffect::Heading(3),
    },
    Command {
        name: "Bullet list",
        description: "List with bullet markers",
        search_terms: &["ul", "unordered", "bullet"],
        effect: CommandEffect::BulletList,
    },
    Command {
        name: "Numbered list",
        description: "List with numbered markers",
        search_terms: &["ol", "ordered", "numbered"],
        effect: CommandEffect::NumberedList,
    },
    Command {
        name: "Quote",
        description: "Block quotation",
        search_terms: &["blockquote", "quote"],
        effect: CommandEffect::Quote,
    },
    Command {
        name: "Code block",
        description: "Fenced code block",
        search_terms: &["code", "pre", "fence"],
        effect: CommandEffect::CodeBlock,
    },
    Command {
        name: "Divider",
        description: "Horizontal rule",
        search_terms: &["hr", "rule", "divider", "separator"],
        effect: CommandEffect::Rule,
    },
];

/// Catalog indices matching `query`, in declaration order.
pub fn candidates(query: &str) -> Vec<usize> {
    let query_lower = query.to_lowercase();
    CATALOG
        .iter()
        .enumerate()
        .filter(|(_, cmd)| cmd.matches(&query_lower))
        .map(|(i, _)| i)
        .collect()
}

/// Outcome of offering a keydown to the open menu.
#[derive(Debug, PartialEq, Eq)]
pub enum MenuKeydown {
    /// Navigation consumed the key.
    Handled,
    /// The key is not a menu key; let editing handle it.
    NotHandled,
    /// Enter on a candidate: apply this command.
    Invoke(&'static Command),
    /// Escape: close without touching the document.
    Dismiss,
}

/// Open-menu state: where it was triggered, the live query, and the
/// filtered candidate list with a highlighted row.
#[derive(Debug)]
pub struct CommandMenu {
    anchor: LeafRef,
    query: String,
    candidates: Vec<usize>,
    selected: usize,
}

impl CommandMenu {
    pub(crate) fn open_at(anchor: LeafRef) -> Self {
        Self {
            anchor,
            query: String::new(),
            candidates: candidates(""),
            selected: 0,
        }
    }

    /// Position of the trigger character in the document.
    pub fn anchor(&self) -> LeafRef {
        self.anchor
    }

    pub(crate) fn set_anchor(&mut self, anchor: LeafRef) {
        self.anchor = anchor;
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    /// Chars covered by the trigger character plus the query.
    pub fn trigger_len(&self) -> usize {
        1 + self.query.chars().count()
    }

    pub fn selected_index(&self) -> usize {
        self.selected
    }

    pub fn candidates(&self) -> impl Iterator<Item = &'static Command> + '_ {
        self.candidates.iter().map(|&i| &CATALOG[i])
    }

    pub fn candidate_count(&self) -> usize {
        self.candidates.len()
    }

    /// Replace the query, refilter, and clamp the highlight into range.
    pub(crate) fn set_query(&mut self, query: String) {
        self.candidates = candidates(&query);
        self.query = query;
        self.selected = self.selected.min(self.candidates.len().saturating_sub(1));
    }

    fn selected_command(&self) -> Option<&'static Command> {
        self.candidates.get(self.selected).map(|&i| &CATALOG[i])
    }

    /// Menu keyboard contract: arrows move the highlight (clamped, no
    /// wraparound), Enter invokes, Escape dismisses.
    pub fn handle_keydown(&mut self, key: &Key) -> MenuKeydown {
        match key {
            Key::ArrowDown => {
                self.selected = (self.selected + 1).min(self.candidates.len().saturating_sub(1));
                MenuKeydown::Handled
            }
            Key::ArrowUp => {
                self.selected = self.selected.saturating_sub(1);
                MenuKeydown::Handled
            }
            Key::Enter => match self.selected_command() {
                Some(cmd) => MenuKeydown::Invoke(cmd),
                None => MenuKeydown::Dismiss,
            },
            Key::Escape => MenuKeydown::Dismiss,
            _ => MenuKeydown::NotHandled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_query_matches_all() {
        assert_eq!(candidates("").len(), CATALOG.len());
    }

    #[test]
    fn test_query_h1_selects_heading_one() {
        let hits = candidates("h1");
        assert_eq!(hits.len(), 1);
        assert_eq!(CATALOG[hits[0]].effect, CommandEffect::Heading(1));
    }

    #[test]
    fn test_match_is_case_insensitive() {
        let hits = candidates("QUOTE");
        assert!(hits.iter().any(|&i| CATALOG[i].name == "Quote"));
    }

    #[test]
    fn test_candidates_keep_catalog_order() {
        let hits = candidates("heading");
        let names: Vec<_> = hits.iter().map(|&i| CATALOG[i].name).collect();
        assert_eq!(names, vec!["Heading 1", "Heading 2", "Heading 3"]);
    }

    #[test]
    fn test_selection_clamps_without_wraparound() {
        let mut menu = CommandMenu::open_at(LeafRef { leaf: 0, local: 0 });
        assert_eq!(menu.handle_keydown(&Key::ArrowUp), MenuKeydown::Handled);
        assert_eq!(menu.selected_index(), 0);
        for _ in 0..50 {
            menu.handle_keydown(&Key::ArrowDown);
        }
        assert_eq!(menu.selected_index(), CATALOG.len() - 1);
    }

    #[test]
    fn test_highlight_clamped_when_candidates_shrink() {
        let mut menu = CommandMenu::open_at(LeafRef { leaf: 0, local: 0 });
        for _ in 0..4 {
            menu.handle_keydown(&Key::ArrowDown);
        }
        menu.set_query("h1".into());
        assert_eq!(menu.selected_index(), 0);
        assert_eq!(menu.candidate_count(), 1);
    }

    #[test]
    fn test_enter_invokes_selected() {
        let mut menu = CommandMenu::open_at(LeafRef { leaf: 0, local: 0 });
        menu.set_query("h2".into());
        match menu.handle_keydown(&Key::Enter) {
            MenuKeydown::Invoke(cmd) => assert_eq!(cmd.effect, CommandEffect::Heading(2)),
            other => panic!("expected invoke, got {other:?}"),
        }
    }

    #[test]
    fn test_invoke_results_compare_by_command() {
        let mut a = CommandMenu::open_at(LeafRef { leaf: 0, local: 0 });
        let mut b = CommandMenu::open_at(LeafRef { leaf: 0, local: 3 });
        a.set_query("h1".into());
        b.set_query("h1".into());
        assert_eq!(a.handle_keydown(&Key::Enter), b.handle_keydown(&Key::Enter));
    }

    #[test]
    fn test_escape_dismisses() {
        let mut menu = CommandMenu::open_at(LeafRef { leaf: 0, local: 0 });
        assert_eq!(menu.handle_keydown(&Key::Escape), MenuKeydown::Dismiss);
    }
}
