//! Edit records shared by the caller-side ledger and the watcher.
//!
//! An [`Insert`] or [`Remove`] remembers the position it was applied at
//! and can map a position measured *before* the edit to where it sits
//! *after* the edit. Replaying every later edit over a character's original
//! position yields its live position in the document.

use std::sync::Arc;

/// Byte sent for characters the one-byte protocol cannot express.
pub const PLACEHOLDER_BYTE: u8 = 0x1A;

/// Encode text as protocol bytes, one byte per character.
///
/// ASCII passes through; any other scalar value becomes [`PLACEHOLDER_BYTE`]
/// so that positions stay counted in characters.
pub fn encode_text(text: &str) -> Arc<[u8]> {
    text.chars()
        .map(|c| {
            if c.is_ascii() {
                c as u8
            } else {
                PLACEHOLDER_BYTE
            }
        })
        .collect()
}

// ============================================================================
// Insert
// ============================================================================

/// Inserted text with a count of leading characters already resolved.
///
/// Cloning is cheap: the text is shared, only the offset is per copy. The
/// caller ledger and the watcher each hold their own copy and advance it
/// independently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Insert {
    from: usize,
    consumed: usize,
    text: Arc<[u8]>,
}

impl Insert {
    pub fn new(from: usize, text: &str) -> Self {
        Self::from_bytes(from, encode_text(text))
    }

    pub fn from_bytes(from: usize, text: Arc<[u8]>) -> Self {
        Self {
            from,
            consumed: 0,
            text,
        }
    }

    /// Original position of the first unresolved character.
    pub fn next_position(&self) -> usize {
        self.from + self.consumed
    }

    pub fn remaining_len(&self) -> usize {
        self.text.len() - self.consumed
    }

    /// Bytes not yet resolved.
    pub fn remaining(&self) -> &[u8] {
        &self.text[self.consumed..]
    }

    /// Mark `delta` more characters resolved. Returns true once exhausted.
    ///
    /// `delta` is clamped to what remains.
    pub fn advance(&mut self, delta: usize) -> bool {
        let delta = delta.min(self.remaining_len());
        self.consumed += delta;
        self.remaining_len() == 0
    }

    pub fn adjust_position(&self, pos: usize) -> Option<usize> {
        if self.from <= pos {
            Some(pos.saturating_add(self.remaining_len()))
        } else {
            Some(pos)
        }
    }
}

// ============================================================================
// Remove
// ============================================================================

/// A deleted span. Never resolved, so it has no offset of its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Remove {
    from: usize,
    len: usize,
}

impl Remove {
    pub fn new(from: usize, len: usize) -> Self {
        Self { from, len }
    }

    pub fn remaining_len(&self) -> usize {
        self.len
    }

    /// `None` when `pos` was inside the deleted span.
    pub fn adjust_position(&self, pos: usize) -> Option<usize> {
        let end = self.from.saturating_add(self.len);
        if self.from <= pos && pos < end {
            None
        } else if end <= pos {
            Some(pos - self.len)
        } else {
            Some(pos)
        }
    }
}

// ============================================================================
// Change
// ============================================================================

/// One document edit, in the order it was applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    Insert(Insert),
    Remove(Remove),
}

impl Change {
    pub fn remaining_len(&self) -> usize {
        match self {
            Self::Insert(i) => i.remaining_len(),
            Self::Remove(r) => r.remaining_len(),
        }
    }

    /// Map a position measured before this edit to its value after it.
    ///
    /// Returns `None` if the character at `pos` was deleted by this edit.
    pub fn adjust_position(&self, pos: usize) -> Option<usize> {
        match self {
            Self::Insert(i) => i.adjust_position(pos),
            Self::Remove(r) => r.adjust_position(pos),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_text_keeps_one_byte_per_char() {
        assert_eq!(&*encode_text("RGB"), b"RGB");
        assert_eq!(&*encode_text("aé€b"), &[b'a', PLACEHOLDER_BYTE, PLACEHOLDER_BYTE, b'b']);
        assert!(encode_text("").is_empty());
    }

    #[test]
    fn test_insert_advance() {
        let mut insert = Insert::new(4, "abc");
        assert_eq!(insert.remaining_len(), 3);
        assert_eq!(insert.next_position(), 4);

        assert!(!insert.advance(2));
        assert_eq!(insert.next_position(), 6);
        assert_eq!(insert.remaining(), b"c");

        // Clamped to what remains
        assert!(insert.advance(5));
        assert_eq!(insert.remaining_len(), 0);
        assert_eq!(insert.next_position(), 7);
    }

    #[test]
    fn test_insert_copies_advance_independently() {
        let mut a = Insert::new(0, "xyz");
        let b = a.clone();
        a.advance(2);
        assert_eq!(a.remaining_len(), 1);
        assert_eq!(b.remaining_len(), 3);
    }

    #[test]
    fn test_insert_shifts_positions_at_or_after() {
        let change = Change::Insert(Insert::new(3, "ab"));
        assert_eq!(change.adjust_position(2), Some(2));
        assert_eq!(change.adjust_position(3), Some(5));
        assert_eq!(change.adjust_position(10), Some(12));
    }

    #[test]
    fn test_remove_adjusts_and_invalidates() {
        let change = Change::Remove(Remove::new(2, 3));
        assert_eq!(change.adjust_position(1), Some(1));
        assert_eq!(change.adjust_position(2), None);
        assert_eq!(change.adjust_position(4), None);
        assert_eq!(change.adjust_position(5), Some(2));
        assert_eq!(change.adjust_position(9), Some(6));
        assert_eq!(change.remaining_len(), 3);
    }

    #[test]
    fn test_remove_near_usize_max_does_not_overflow() {
        let remove = Remove::new(usize::MAX - 1, usize::MAX);
        assert_eq!(remove.adjust_position(0), Some(0));
        assert_eq!(remove.adjust_position(usize::MAX - 1), None);
    }
}
