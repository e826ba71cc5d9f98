//! Trigger detection: a two-state machine (`Idle`, `Open`) that opens the
//! command menu when the trigger character is typed and tracks the query
//! typed after it.
//!
//! The dismiss thresholds are empirically tuned values carried over from the
//! observable contract of the feature, kept as configurable constants rather
//! than re-derived.

use crate::command::{candidates, CommandMenu};
use crate::tree::LeafRef;

/// The character that opens the command menu.
pub const TRIGGER_CHAR: char = '/';

const DISMISS_PUNCTUATION: &[char] = &['.', '!', '?', ',', ':', ';'];

/// Heuristics for closing the menu while the user types ordinary prose that
/// happens to follow a literal trigger character.
#[derive(Debug, Clone)]
pub struct DismissPolicy {
    /// Close once the query grows past this many chars.
    pub max_query_len: usize,
    /// Close when the query is longer than this and matches nothing.
    pub stale_query_len: usize,
    /// Chars that close the menu immediately.
    pub punctuation: &'static [char],
}

impl Default for DismissPolicy {
    fn default() -> Self {
        Self {
            max_query_len: 20,
            stale_query_len: 5,
            punctuation: DISMISS_PUNCTUATION,
        }
    }
}

impl DismissPolicy {
    /// Evaluated on every query update while the menu is open.
    pub fn should_dismiss(&self, query: &str, candidate_count: usize) -> bool {
        let len = query.chars().count();
        query.contains(' ')
            || len > self.max_query_len
            || query.contains(self.punctuation)
            || (len > self.stale_query_len && candidate_count == 0)
    }
}

/// Watches rich-mode edits for the trigger character and owns the menu
/// while it is open.
#[derive(Debug, Default)]
pub struct TriggerDetector {
    policy: DismissPolicy,
    menu: Option<CommandMenu>,
}

impl TriggerDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(policy: DismissPolicy) -> Self {
        Self {
            policy,
            menu: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.menu.is_some()
    }

    pub fn menu(&self) -> Option<&CommandMenu> {
        self.menu.as_ref()
    }

    pub fn menu_mut(&mut self) -> Option<&mut CommandMenu> {
        self.menu.as_mut()
    }

    /// Close the menu without touching the document.
    pub fn close(&mut self) {
        if self.menu.take().is_some() {
            tracing::debug!("command menu closed");
        }
    }

    /// Re-evaluate after an edit. `caret` is the caret's char offset within
    /// the leaf, `typed_trigger` marks an edit that inserted the trigger
    /// character itself.
    pub fn update(&mut self, leaf: usize, leaf_text: &str, caret: usize, typed_trigger: bool) {
        match &mut self.menu {
            None => {
                if typed_trigger && caret > 0 {
                    let anchor = LeafRef {
                        leaf,
                        local: caret - 1,
                    };
                    tracing::debug!(leaf, local = anchor.local, "command menu opened");
                    self.menu = Some(CommandMenu::open_at(anchor));
                }
            }
            Some(menu) => {
                if menu.anchor().leaf != leaf {
                    self.close();
                    return;
                }
                // Scan backward from the caret to the nearest trigger on the
                // same line; its absence means the trigger was deleted or
                // the caret left the line.
                let Some((trigger_pos, query)) = scan_trigger(leaf_text, caret) else {
                    self.close();
                    return;
                };
                let count = candidates(&query).len();
                if self.policy.should_dismiss(&query, count) {
                    self.close();
                    return;
                }
                menu.set_anchor(LeafRef {
                    leaf,
                    local: trigger_pos,
                });
                menu.set_query(query);
            }
        }
    }
}

/// Nearest trigger character strictly before `caret`, stopping at a line
/// boundary. Returns its char offset and the text between it and the caret.
fn scan_trigger(text: &str, caret: usize) -> Option<(usize, String)> {
    let chars: Vec<char> = text.chars().collect();
    let caret = caret.min(chars.len());
    let mut i = caret;
    while i > 0 {
        i -= 1;
        match chars[i] {
            '\n' => return None,
            TRIGGER_CHAR => return Some((i, chars[i + 1..caret].iter().collect())),
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_detector(leaf_text: &str, caret: usize) -> TriggerDetector {
        let mut det = TriggerDetector::new();
        det.update(0, leaf_text, caret, true);
        assert!(det.is_open());
        det
    }

    #[test]
    fn test_trigger_opens_menu_with_empty_query() {
        let det = open_detector("Hello /", 7);
        let menu = det.menu().expect("menu open");
        assert_eq!(menu.query(), "");
        assert_eq!(menu.anchor(), LeafRef { leaf: 0, local: 6 });
    }

    #[test]
    fn test_query_tracks_typed_text() {
        let mut det = open_detector("Hello /", 7);
        det.update(0, "Hello /h1", 9, false);
        assert_eq!(det.menu().expect("open").query(), "h1");
    }

    #[test]
    fn test_space_dismisses() {
        let mut det = open_detector("/", 1);
        det.update(0, "/bol", 4, false);
        assert!(det.is_open());
        det.update(0, "/bol ", 5, false);
        assert!(!det.is_open());
    }

    #[test]
    fn test_punctuation_dismisses() {
        let mut det = open_detector("/", 1);
        det.update(0, "/h1.", 4, false);
        assert!(!det.is_open());
    }

    #[test]
    fn test_long_query_dismisses() {
        let mut det = open_detector("/", 1);
        let long = format!("/{}", "headingheadingheading");
        det.update(0, &long, long.chars().count(), false);
        assert!(!det.is_open());
    }

    #[test]
    fn test_stale_query_with_no_matches_dismisses() {
        let mut det = open_detector("/", 1);
        det.update(0, "/zzzzzz", 7, false);
        assert!(!det.is_open());
    }

    #[test]
    fn test_short_query_with_no_matches_stays_open() {
        let mut det = open_detector("/", 1);
        det.update(0, "/zzz", 4, false);
        assert!(det.is_open());
    }

    #[test]
    fn test_deleting_trigger_dismisses() {
        let mut det = open_detector("/", 1);
        det.update(0, "", 0, false);
        assert!(!det.is_open());
    }

    #[test]
    fn test_leaf_change_dismisses() {
        let mut det = open_detector("/", 1);
        det.update(1, "other /text", 7, false);
        assert!(!det.is_open());
    }

    #[test]
    fn test_line_boundary_stops_scan() {
        let mut det = open_detector("a /", 3);
        det.update(0, "a /\nb", 5, false);
        assert!(!det.is_open());
    }
}
