//! Producer-side bookkeeping: what was submitted, what was sent, what was
//! acknowledged.
//!
//! Two ledgers hold their own copies of each submitted insert:
//!
//! - `unacked` keeps every insert until the coprocess has returned a color
//!   for each of its characters. It survives restarts.
//! - `unsent` holds the bytes not yet written to the *current* coprocess.
//!   It is rebuilt from `unacked` whenever a new coprocess starts.
//!
//! The outbox never touches a pipe. [`Outbox::flush_window`] hands the
//! bytes to send back to the caller, who writes them after releasing the
//! lock that guards the outbox.

use std::collections::VecDeque;

use crate::highlight::Insert;

#[derive(Debug)]
pub struct Outbox {
    unacked: VecDeque<Insert>,
    unsent: VecDeque<Insert>,
    in_flight: usize,
    window: usize,
    peak_in_flight: usize,
    acknowledged: u64,
}

impl Outbox {
    pub fn new(window: usize) -> Self {
        Self {
            unacked: VecDeque::new(),
            unsent: VecDeque::new(),
            in_flight: 0,
            window,
            peak_in_flight: 0,
            acknowledged: 0,
        }
    }

    /// Queue an insert for transmission.
    pub fn submit(&mut self, insert: Insert) {
        if insert.remaining_len() == 0 {
            return;
        }
        self.unsent.push_back(insert.clone());
        self.unacked.push_back(insert);
    }

    /// Take as many unsent bytes as the window allows.
    ///
    /// The returned bytes count as in flight from this point on.
    pub fn flush_window(&mut self) -> Vec<u8> {
        let mut batch = Vec::new();

        while self.in_flight < self.window {
            let Some(head) = self.unsent.front_mut() else {
                break;
            };

            let room = self.window - self.in_flight;
            let chunk = &head.remaining()[..head.remaining_len().min(room)];
            batch.extend_from_slice(chunk);

            let sent = chunk.len();
            self.in_flight += sent;
            if head.advance(sent) {
                self.unsent.pop_front();
            }
        }

        self.peak_in_flight = self.peak_in_flight.max(self.in_flight);
        batch
    }

    /// Record `n` colors received. Returns the bytes that now fit the window.
    pub fn on_bytes_acknowledged(&mut self, n: usize) -> Vec<u8> {
        self.in_flight = self.in_flight.saturating_sub(n);
        self.acknowledged += n as u64;

        let mut left = n;
        while left > 0 {
            let Some(head) = self.unacked.front_mut() else {
                crate::debug!("watch"; "{} color(s) beyond submitted input", left);
                break;
            };
            let step = left.min(head.remaining_len());
            if head.advance(step) {
                self.unacked.pop_front();
            }
            left -= step;
        }

        self.flush_window()
    }

    /// A new coprocess starts from scratch: everything unacknowledged is
    /// sent again, each insert resuming at its own acknowledged offset.
    pub fn on_restart(&mut self) -> Vec<u8> {
        self.unsent = self.unacked.iter().cloned().collect();
        self.in_flight = 0;
        self.flush_window()
    }

    /// Nothing is waiting for a color.
    pub fn is_idle(&self) -> bool {
        self.unacked.is_empty()
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight
    }

    pub fn acknowledged(&self) -> u64 {
        self.acknowledged
    }

    /// Characters submitted but not yet colored.
    pub fn unacknowledged(&self) -> usize {
        self.unacked.iter().map(Insert::remaining_len).sum()
    }
}

// ============================================================================
// Tests
// ============================================================================
