//! Text buffer abstraction for the linear-buffer surface.
//!
//! The `TextBuffer` trait provides a common interface for text storage so the
//! linear token model can work with different backends. `EditorRope` is the
//! ropey-backed default.

use smol_str::{SmolStr, ToSmolStr};
use std::ops::Range;

/// A text buffer that supports editing and offset conversion.
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

    /// Replace char range with text.
    fn replace(&mut self, char_range: Range<usize>, text: &str) {
        self.delete(char_range.clone());
        self.insert(char_range.start, text);
    }

    /// Get a slice as SmolStr. Returns None if range is invalid.
    fn slice(&self, char_range: Range<usize>) -> Option<SmolStr>;

    /// Get character at offset. Returns None if out of bounds.
    fn char_at(&self, char_offset: usize) -> Option<char>;

    /// Convert entire buffer to String.
    fn to_string(&self) -> String;

    /// Convert a char offset to UTF-16 code units (what DOM selection APIs use).
    fn char_to_utf16(&self, char_offset: usize) -> usize;

    /// Convert UTF-16 code units to a char offset.
    fn utf16_to_char(&self, utf16_offset: usize) -> usize;
}

/// Ropey-backed text buffer.
///
/// Provides O(log n) editing operations and offset conversions.
#[derive(Clone, Default)]
pub struct EditorRope {
    rope: ropey::Rope,
}

impl EditorRope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_str(s: &str) -> Self {
        Self {
            rope: ropey::Rope::from_str(s),
        }
    }

    /// Get a reference to the underlying rope.
    pub fn rope(&self) -> &ropey::Rope {
        &self.rope
    }
}

impl TextBuffer for EditorRope {
    fn len_chars(&self) -> usize {
        self.rope.len_chars()
    }

    fn insert(&mut self, char_offset: usize, text: &str) {
        let char_offset = char_offset.min(self.rope.len_chars());
        self.rope.insert(char_offset, text);
    }

    fn delete(&mut self, char_range: Range<usize>) {
        let len = self.rope.len_chars();
        let end = char_range.end.min(len);
        let start = char_range.start.min(end);
        if start < end {
            self.rope.remove(start..end);
        }
    }

    fn slice(&self, char_range: Range<usize>) -> Option<SmolStr> {
        if char_range.start > char_range.end || char_range.end > self.len_chars() {
            return None;
        }
        Some(self.rope.slice(char_range).to_smolstr())
    }

    fn char_at(&self, char_offset: usize) -> Option<char> {
        if char_offset >= self.len_chars() {
            return None;
        }
        Some(self.rope.char(char_offset))
    }

    fn to_string(&self) -> String {
        self.rope.to_string()
    }

    fn char_to_utf16(&self, char_offset: usize) -> usize {
        self.rope
            .char_to_utf16_cu(char_offset.min(self.rope.len_chars()))
    }

    fn utf16_to_char(&self, utf16_offset: usize) -> usize {
        self.rope
            .utf16_cu_to_char(utf16_offset.min(self.rope.len_utf16_cu()))
    }
}

impl From<&str> for EditorRope {
    fn from(s: &str) -> Self {
        Self::from_str(s)
    }
}

impl From<String> for EditorRope {
    fn from(s: String) -> Self {
        Self::from_str(&s)
    }
}

impl std::fmt::Debug for EditorRope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("EditorRope").field(&self.rope.to_string()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_operations() {
        let mut rope = EditorRope::from_str("hello world");
        assert_eq!(rope.len_chars(), 11);

        rope.insert(5, " beautiful");
        assert_eq!(rope.to_string(), "hello beautiful world");

        rope.delete(5..15);
        assert_eq!(rope.to_string(), "hello world");
    }

    #[test]
    fn test_slice() {
        let rope = EditorRope::from_str("hello world");
        assert_eq!(rope.slice(0..5).as_deref(), Some("hello"));
        assert_eq!(rope.slice(6..11).as_deref(), Some("world"));
        assert_eq!(rope.slice(0..100), None);
    }

    #[test]
    fn test_replace() {
        let mut rope = EditorRope::from_str("hello @ja");
        rope.replace(6..9, "Jane Smith ");
        assert_eq!(rope.to_string(), "hello Jane Smith ");
    }

    #[test]
    fn test_out_of_range_edits_clamp() {
        let mut rope = EditorRope::from_str("abc");
        rope.delete(2..10);
        assert_eq!(rope.to_string(), "ab");
        rope.insert(99, "z");
        assert_eq!(rope.to_string(), "abz");
    }

    #[test]
    fn test_utf16_conversion() {
        // The emoji is one char but two UTF-16 code units.
        let rope = EditorRope::from_str("hi 🌍 @x");
        assert_eq!(rope.char_to_utf16(3), 3);
        assert_eq!(rope.char_to_utf16(4), 5);
        assert_eq!(rope.utf16_to_char(5), 4);
        assert_eq!(rope.utf16_to_char(100), rope.len_chars());
    }
}
