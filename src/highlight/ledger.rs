//! Edit Ledger and position translation.
//!
//! Every edit applied to the document is appended here in order. Colors
//! come back strictly in submission order, so the oldest unfinished
//! insert always owns the next color. Its live position is found by
//! replaying every edit recorded after it.

use std::collections::VecDeque;

use super::change::{Change, Insert, Remove};
use super::color::{Color, ColorQueue, Highlight};

/// Outcome of matching one color against the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// The character is still in the document.
    Live(Highlight),
    /// The character was deleted before its color arrived.
    Deleted,
    /// No insert is waiting for a color.
    Unmatched,
}

/// Ordered log of in-flight edits, owned by the document-event context.
#[derive(Debug, Default)]
pub struct EditLedger {
    changes: VecDeque<Change>,
}

impl EditLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_insert(&mut self, insert: Insert) {
        if insert.remaining_len() > 0 {
            self.changes.push_back(Change::Insert(insert));
        }
    }

    /// With no insert pending there is nothing left to shift.
    pub fn record_remove(&mut self, pos: usize, len: usize) {
        if len > 0 && !self.changes.is_empty() {
            self.changes.push_back(Change::Remove(Remove::new(pos, len)));
        }
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Characters still waiting for a color.
    pub fn uncolored(&self) -> usize {
        self.changes
            .iter()
            .filter_map(|c| match c {
                Change::Insert(i) => Some(i.remaining_len()),
                Change::Remove(_) => None,
            })
            .sum()
    }

    /// Pop colors from `queue` until one resolves to a live position.
    ///
    /// Colors of characters deleted before they were colored are consumed
    /// and dropped. Returns `None` once the queue is empty.
    pub fn translate_next(&mut self, queue: &ColorQueue) -> Option<Highlight> {
        while let Some(color) = queue.pop() {
            match self.resolve(color) {
                Resolution::Live(highlight) => return Some(highlight),
                Resolution::Deleted => {
                    crate::debug!("translate"; "dropped color of deleted character");
                }
                Resolution::Unmatched => {
                    crate::debug!("translate"; "dropped color with no pending insert");
                }
            }
        }
        None
    }

    /// Match a single color to the oldest unfinished insert.
    pub fn resolve(&mut self, color: Color) -> Resolution {
        self.discard_leading_removes();

        let mut later = self.changes.iter();
        let Some(Change::Insert(head)) = later.next() else {
            return Resolution::Unmatched;
        };

        let position = later.try_fold(head.next_position(), |pos, change| {
            change.adjust_position(pos)
        });

        let exhausted = match self.changes.front_mut() {
            Some(Change::Insert(head)) => head.advance(1),
            _ => false,
        };
        if exhausted {
            self.changes.pop_front();
            self.discard_leading_removes();
        }

        match position {
            Some(position) => Resolution::Live(Highlight::new(position, color)),
            None => Resolution::Deleted,
        }
    }

    /// Removes ahead of every pending insert can no longer move anything.
    fn discard_leading_removes(&mut self) {
        while matches!(self.changes.front(), Some(Change::Remove(_))) {
            self.changes.pop_front();
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn insert(ledger: &mut EditLedger, pos: usize, text: &str) {
        ledger.record_insert(Insert::new(pos, text));
    }

    fn queue_of(colors: &[Color]) -> ColorQueue {
        let queue = ColorQueue::new();
        queue.push_all(colors.iter().copied());
        queue
    }

    fn drain(ledger: &mut EditLedger, queue: &ColorQueue) -> Vec<(usize, Color)> {
        std::iter::from_fn(|| ledger.translate_next(queue))
            .map(|h| (h.position, h.color))
            .collect()
    }

    #[test]
    fn test_sequential_inserts() {
        let mut ledger = EditLedger::new();
        insert(&mut ledger, 0, "R");
        insert(&mut ledger, 1, "G");
        insert(&mut ledger, 2, "B");

        let queue = queue_of(&[Color::RED, Color::GREEN, Color::BLUE]);
        assert_eq!(
            drain(&mut ledger, &queue),
            vec![(0, Color::RED), (1, Color::GREEN), (2, Color::BLUE)]
        );
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_multi_char_insert_resolves_each_char() {
        let mut ledger = EditLedger::new();
        insert(&mut ledger, 6, "RGB");

        let queue = queue_of(&[Color::RED, Color::GREEN, Color::BLUE]);
        assert_eq!(
            drain(&mut ledger, &queue),
            vec![(6, Color::RED), (7, Color::GREEN), (8, Color::BLUE)]
        );
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_deleted_before_colored_is_dropped() {
        let mut ledger = EditLedger::new();
        insert(&mut ledger, 0, "R");
        ledger.record_remove(0, 1);
        insert(&mut ledger, 0, "G");

        let queue = queue_of(&[Color::RED, Color::GREEN]);
        assert_eq!(drain(&mut ledger, &queue), vec![(0, Color::GREEN)]);
        assert!(ledger.is_empty());
        assert!(queue.is_empty());
    }

    #[test]
    fn test_repeated_delete_typed() {
        let mut ledger = EditLedger::new();
        insert(&mut ledger, 0, "R");
        ledger.record_remove(0, 1);
        insert(&mut ledger, 0, "G");
        ledger.record_remove(0, 1);
        insert(&mut ledger, 0, "B");

        let queue = queue_of(&[Color::RED, Color::GREEN, Color::BLUE]);
        assert_eq!(drain(&mut ledger, &queue), vec![(0, Color::BLUE)]);
    }

    #[test]
    fn test_later_inserts_before_shift_position() {
        let mut ledger = EditLedger::new();
        insert(&mut ledger, 5, "X");
        insert(&mut ledger, 3, "Y");
        insert(&mut ledger, 1, "Z");

        let queue = queue_of(&[Color::RED, Color::GREEN, Color::BLUE]);
        assert_eq!(
            drain(&mut ledger, &queue),
            vec![(7, Color::RED), (4, Color::GREEN), (1, Color::BLUE)]
        );
    }

    #[test]
    fn test_typing_at_front() {
        let mut ledger = EditLedger::new();
        insert(&mut ledger, 0, "R");
        insert(&mut ledger, 0, "G");
        insert(&mut ledger, 0, "B");

        let queue = queue_of(&[Color::RED, Color::GREEN, Color::BLUE]);
        assert_eq!(
            drain(&mut ledger, &queue),
            vec![(2, Color::RED), (1, Color::GREEN), (0, Color::BLUE)]
        );
    }

    #[test]
    fn test_remove_before_shifts_left() {
        let mut ledger = EditLedger::new();
        insert(&mut ledger, 10, "ab");
        ledger.record_remove(2, 3);

        let queue = queue_of(&[Color::RED, Color::GREEN]);
        assert_eq!(
            drain(&mut ledger, &queue),
            vec![(7, Color::RED), (8, Color::GREEN)]
        );
    }

    #[test]
    fn test_partial_delete_of_insert() {
        let mut ledger = EditLedger::new();
        insert(&mut ledger, 0, "abc");
        // Delete only the middle character
        ledger.record_remove(1, 1);

        let queue = queue_of(&[Color::RED, Color::GREEN, Color::BLUE]);
        assert_eq!(
            drain(&mut ledger, &queue),
            vec![(0, Color::RED), (1, Color::BLUE)]
        );
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_unmatched_color_is_dropped() {
        let mut ledger = EditLedger::new();
        ledger.record_remove(0, 3);
        assert_eq!(ledger.resolve(Color::RED), Resolution::Unmatched);
        // Leading remove was discarded
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_empty_queue_has_no_side_effects() {
        let mut ledger = EditLedger::new();
        insert(&mut ledger, 0, "R");
        let queue = ColorQueue::new();

        for _ in 0..3 {
            assert!(ledger.translate_next(&queue).is_none());
        }
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger.uncolored(), 1);
    }

    #[test]
    fn test_empty_edits_are_ignored() {
        let mut ledger = EditLedger::new();
        insert(&mut ledger, 0, "");
        ledger.record_remove(0, 0);
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_remove_without_pending_insert_is_dropped() {
        let mut ledger = EditLedger::new();
        for _ in 0..100 {
            ledger.record_remove(0, 1);
        }
        assert!(ledger.is_empty());

        insert(&mut ledger, 0, "R");
        ledger.record_remove(5, 1);
        assert_eq!(ledger.len(), 2);
    }

    #[test]
    fn test_colors_arriving_in_batches() {
        let mut ledger = EditLedger::new();
        insert(&mut ledger, 0, "RB");
        insert(&mut ledger, 2, "G");

        let queue = queue_of(&[Color::RED]);
        assert_eq!(drain(&mut ledger, &queue), vec![(0, Color::RED)]);

        // Edit between batches moves the rest
        insert(&mut ledger, 0, "xy");
        assert_eq!(ledger.uncolored(), 4);

        queue.push_all([Color::BLUE, Color::GREEN]);
        assert_eq!(
            drain(&mut ledger, &queue),
            vec![(3, Color::BLUE), (4, Color::GREEN)]
        );
    }
}
