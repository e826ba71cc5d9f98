//! Keyboard input types and the fullscreen coordinator.
//!
//! Key events flow through a prioritized chain: the command menu sees the
//! event first, then editing keybindings, then the fullscreen coordinator.
//! A `Handled` result stops the chain, so a single Escape press affects
//! exactly one layer.

use smol_str::SmolStr;

/// Platform-agnostic key representation. Platform-specific code converts
/// from native key events to this enum.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    /// A character key.
    Character(SmolStr),

    /// Unknown/unidentified key.
    Unidentified,

    Backspace,
    Delete,
    Enter,
    Tab,
    Escape,

    ArrowLeft,
    ArrowRight,
    ArrowUp,
    ArrowDown,
    Home,
    End,
}

impl Key {
    /// Build a character key.
    pub fn ch(c: char) -> Self {
        Self::Character(SmolStr::new(c.to_string()))
    }

    /// The character this key inserts, if any.
    pub fn as_char(&self) -> Option<char> {
        match self {
            Self::Character(s) if s.chars().count() == 1 => s.chars().next(),
            _ => None,
        }
    }
}

/// Modifier key state for a key combination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Modifiers {
    pub ctrl: bool,
    pub alt: bool,
    pub shift: bool,
    pub meta: bool,
}

impl Modifiers {
    pub const NONE: Self = Self {
        ctrl: false,
        alt: false,
        shift: false,
        meta: false,
    };

    pub const CTRL: Self = Self {
        ctrl: true,
        alt: false,
        shift: false,
        meta: false,
    };

    pub const SHIFT: Self = Self {
        ctrl: false,
        alt: false,
        shift: true,
        meta: false,
    };

    pub const META: Self = Self {
        ctrl: false,
        alt: false,
        shift: false,
        meta: true,
    };

    pub const CTRL_SHIFT: Self = Self {
        ctrl: true,
        alt: false,
        shift: true,
        meta: false,
    };

    pub const META_SHIFT: Self = Self {
        ctrl: false,
        alt: false,
        shift: true,
        meta: true,
    };

    /// Get the primary modifier for the platform (Cmd on Mac, Ctrl elsewhere).
    pub fn primary(is_mac: bool) -> Self {
        if is_mac { Self::META } else { Self::CTRL }
    }

    /// Get the primary modifier + Shift for the platform.
    pub fn primary_shift(is_mac: bool) -> Self {
        if is_mac { Self::META_SHIFT } else { Self::CTRL_SHIFT }
    }

    /// Whether the platform primary modifier (and nothing conflicting) is down.
    pub fn is_primary(&self) -> bool {
        (self.ctrl ^ self.meta) && !self.alt
    }
}

/// Result of offering a keydown event to one handler in the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeydownResult {
    /// Event was consumed; stop the chain and prevent default.
    Handled,
    /// Event was not for this handler; offer it to the next one.
    NotHandled,
}

impl KeydownResult {
    pub fn is_handled(&self) -> bool {
        matches!(self, Self::Handled)
    }
}

/// Full-viewport display state for a single editor instance.
///
/// One writer (the toggle), two readers: the layout and the Escape handler.
/// While the command menu is open `suppress_exit` is asserted so the menu's
/// Escape wins even if the chain is miswired upstream.
#[derive(Debug, Default)]
pub struct Fullscreen {
    active: bool,
    suppress_exit: bool,
}

impl Fullscreen {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn toggle(&mut self) {
        self.active = !self.active;
        tracing::debug!(active = self.active, "fullscreen toggled");
    }

    /// Assert or clear the menu-open guard.
    pub fn set_suppress_exit(&mut self, on: bool) {
        self.suppress_exit = on;
    }

    /// Last handler in the chain: Escape exits fullscreen.
    pub fn handle_keydown(&mut self, key: &Key) -> KeydownResult {
        if *key == Key::Escape && self.active && !self.suppress_exit {
            self.active = false;
            tracing::debug!("fullscreen exited");
            return KeydownResult::Handled;
        }
        KeydownResult::NotHandled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_exits_fullscreen() {
        let mut fs = Fullscreen::new();
        fs.toggle();
        assert!(fs.is_active());
        assert_eq!(fs.handle_keydown(&Key::Escape), KeydownResult::Handled);
        assert!(!fs.is_active());
    }

    #[test]
    fn test_escape_ignored_when_inactive() {
        let mut fs = Fullscreen::new();
        assert_eq!(fs.handle_keydown(&Key::Escape), KeydownResult::NotHandled);
    }

    #[test]
    fn test_suppress_exit_blocks_escape() {
        let mut fs = Fullscreen::new();
        fs.toggle();
        fs.set_suppress_exit(true);
        assert_eq!(fs.handle_keydown(&Key::Escape), KeydownResult::NotHandled);
        assert!(fs.is_active());
        fs.set_suppress_exit(false);
        assert_eq!(fs.handle_keydown(&Key::Escape), KeydownResult::Handled);
    }

    #[test]
    fn test_primary_modifier() {
        assert!(Modifiers::CTRL.is_primary());
        assert!(Modifiers::META.is_primary());
        assert!(!Modifiers::NONE.is_primary());
        assert!(
            !Modifiers {
                ctrl: true,
                alt: true,
                ..Modifiers::NONE
            }
            .is_primary()
        );
    }
}
