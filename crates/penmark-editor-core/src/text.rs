//! Text buffer abstraction for the markdown-source editing surface.
//!
//! The `TextBuffer` trait is the seam between the source-mode surface and its
//! storage; `SourceRope` is the ropey-backed implementation used for local
//! editing. The trait carries exactly the operations the editor drives.

use std::ops::Range;

/// A text buffer that supports efficient editing.
///
/// All offsets are in Unicode scalar values (chars), not bytes or UTF-16.
pub trait TextBuffer {
    /// Total length in chars (Unicode scalar values).
    fn len_chars(&self) -> usize;

    /// Check if empty.
    fn is_empty(&self) -> bool {
        self.len_chars() == 0
    }

    /// Insert text at char offset.
    fn insert(&mut self, char_offset: usize, text: &str);

    /// Delete char range.
    fn delete(&mut self, char_range: Range<usize>);

    /// Convert entire buffer to String.
    fn to_string(&self) -> String;
}

/// Ropey-backed text buffer for the markdown-source surface.
///
/// Provides O(log n) editing operations.
#[derive(Clone, Default)]
pub struct SourceRope {
    rope: ropey::Rope,
}

impl SourceRope {
    /// Create a new empty rope.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create from string.
    pub fn from_str(s: &str) -> Self {
        Self {
            rope: ropey::Rope::from_str(s),
        }
    }
}

impl TextBuffer for SourceRope {
    fn len_chars(&self) -> usize {
        self.rope.len_chars()
    }

    fn insert(&mut self, char_offset: usize, text: &str) {
        self.rope.insert(char_offset, text);
    }

    fn delete(&mut self, char_range: Range<usize>) {
        self.rope.remove(char_range);
    }

    fn to_string(&self) -> String {
        self.rope.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_operations() {
        let mut rope = SourceRope::from_str("hello world");
        assert_eq!(rope.len_chars(), 11);
        assert_eq!(rope.to_string(), "hello world");

        rope.insert(5, " beautiful");
        assert_eq!(rope.to_string(), "hello beautiful world");

        rope.delete(5..15);
        assert_eq!(rope.to_string(), "hello world");
    }

    #[test]
    fn test_multibyte_offsets_are_chars() {
        // emoji is 4 bytes, 1 char
        let mut rope = SourceRope::from_str("hi 🌍!");
        assert_eq!(rope.len_chars(), 5);
        rope.insert(4, "x");
        assert_eq!(rope.to_string(), "hi 🌍x!");
        rope.delete(3..5);
        assert_eq!(rope.to_string(), "hi !");
    }

    #[test]
    fn test_empty_buffer() {
        let rope = SourceRope::new();
        assert!(rope.is_empty());
        assert_eq!(rope.to_string(), "");
    }
}
