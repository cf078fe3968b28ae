//! Caller-side highlighting engine.
//!
//! # Module Structure
//!
//! - `change` - Insert/Remove edit records and position adjustment
//! - `color` - Colors, wire decoding and the color queue
//! - `ledger` - Edit Ledger and position translation
//!
//! [`Highlighter`] ties them to a [`WatcherHandle`]: edits are recorded in
//! the ledger, inserts are submitted to the coprocess, and colors coming
//! back are translated into [`Highlight`]s at their live positions.

mod change;
mod color;
mod ledger;

pub use change::{Change, Insert, PLACEHOLDER_BYTE, Remove, encode_text};
pub use color::{COLOR_BYTES, Color, ColorDecoder, ColorQueue, Highlight};
pub use ledger::{EditLedger, Resolution};

use std::sync::Arc;

use thiserror::Error;

use crate::config::{ConfigError, HighlighterConfig};
use crate::watcher::{Notifier, WatcherHandle, WatcherStats};

/// Errors raised while constructing a [`Highlighter`].
#[derive(Debug, Error)]
pub enum HighlightError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to start watcher thread")]
    Spawn(#[source] std::io::Error),
}

/// Per-character highlighter backed by an external coprocess.
///
/// `insert`, `remove` and `dequeue_highlight` take `&mut self`: they must
/// run from one context (typically the UI thread), which keeps edits and
/// translations serialized. The coprocess is supervised on a background
/// thread and restarted transparently when it crashes or hangs.
pub struct Highlighter {
    edits: EditLedger,
    colors: Arc<ColorQueue>,
    watcher: WatcherHandle,
}

impl Highlighter {
    pub fn new(config: HighlighterConfig) -> Result<Self, HighlightError> {
        config.validate()?;

        let colors = Arc::new(ColorQueue::new());
        let watcher =
            WatcherHandle::spawn(&config, Arc::clone(&colors)).map_err(HighlightError::Spawn)?;

        Ok(Self {
            edits: EditLedger::new(),
            colors,
            watcher,
        })
    }

    /// Construct with a change notifier already registered.
    pub fn with_notifier<F>(config: HighlighterConfig, notifier: F) -> Result<Self, HighlightError>
    where
        F: Fn() + Send + Sync + 'static,
    {
        let highlighter = Self::new(config)?;
        highlighter.set_change_notifier(notifier);
        Ok(highlighter)
    }

    /// Text was inserted at `position` (in characters).
    pub fn insert(&mut self, position: usize, text: &str) {
        let insert = Insert::new(position, text);
        if insert.remaining_len() == 0 {
            return;
        }
        self.edits.record_insert(insert.clone());
        self.watcher.submit(insert);
    }

    /// `len` characters were removed starting at `position`.
    pub fn remove(&mut self, position: usize, len: usize) {
        self.edits.record_remove(position, len);
    }

    /// Pop one resolved highlight, if any color is ready. Never blocks.
    pub fn dequeue_highlight(&mut self) -> Option<Highlight> {
        self.edits.translate_next(&self.colors)
    }

    /// Every highlight that can be resolved right now.
    pub fn drain_highlights(&mut self) -> impl Iterator<Item = Highlight> + '_ {
        std::iter::from_fn(move || self.dequeue_highlight())
    }

    /// Colors received but not yet translated.
    pub fn pending_colors(&self) -> usize {
        self.colors.len()
    }

    /// Characters inserted that have not been resolved to a highlight yet.
    pub fn uncolored(&self) -> usize {
        self.edits.uncolored()
    }

    /// Register a callback invoked from the watcher thread whenever new
    /// colors arrive. It must not block; typically it posts an event to the
    /// caller's own loop. Replaces any previous callback.
    pub fn set_change_notifier<F>(&self, notifier: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        let notifier: Notifier = Arc::new(notifier);
        self.watcher.set_notifier(Some(notifier));
    }

    pub fn clear_change_notifier(&self) {
        self.watcher.set_notifier(None);
    }

    pub fn stats(&self) -> WatcherStats {
        self.watcher.stats()
    }

    /// Stop the watcher and terminate the coprocess. Colors already queued
    /// stay available to `dequeue_highlight`.
    pub fn shutdown(&mut self) {
        self.watcher.shutdown();
    }

    pub fn is_shut_down(&self) -> bool {
        self.watcher.is_stopped()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_config_rejected() {
        let result = Highlighter::new(HighlighterConfig::default());
        assert!(matches!(result, Err(HighlightError::Config(_))));
    }

    #[test]
    fn test_missing_coprocess_is_not_fatal() {
        let config = HighlighterConfig::new(["/nonexistent/chromapipe-coprocess"])
            .with_timeout(std::time::Duration::from_millis(50));
        let mut highlighter = Highlighter::new(config).unwrap();

        highlighter.insert(0, "A");
        assert!(highlighter.dequeue_highlight().is_none());
        assert_eq!(highlighter.uncolored(), 1);

        highlighter.shutdown();
        assert!(highlighter.is_shut_down());
        assert!(highlighter.dequeue_highlight().is_none());
    }

    #[test]
    fn test_empty_edits_are_noops() {
        let config = HighlighterConfig::new(["/nonexistent/chromapipe-coprocess"]);
        let mut highlighter = Highlighter::new(config).unwrap();

        highlighter.insert(3, "");
        highlighter.remove(3, 0);
        assert_eq!(highlighter.uncolored(), 0);
        assert_eq!(highlighter.stats().unacknowledged, 0);
    }
}
