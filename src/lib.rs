//! chromapipe - per-character highlighting driven by an external coprocess.
//!
//! A front end reports document edits; every inserted character is streamed
//! to a long-running coprocess that answers with one RGB color per
//! character. By the time a color arrives the document may have moved on,
//! so each color is mapped to the character's *current* position before it
//! is handed back. A crashed or hung coprocess is replaced and every
//! character it had not colored yet is sent again.
//!
//! ```text
//! insert/remove ──> EditLedger ───────────────┐
//!        │                                    │ translate
//!        └──> Outbox ──> Watcher ──> coprocess │
//!                          │                  v
//!                          └──> ColorQueue ──> Highlight { position, color }
//! ```
//!
//! # Example
//!
//! ```no_run
//! use chromapipe::{Highlighter, HighlighterConfig};
//!
//! let config = HighlighterConfig::new(["./highlight"]);
//! let mut highlighter = Highlighter::new(config)?;
//! highlighter.insert(0, "fn main");
//! for highlight in highlighter.drain_highlights() {
//!     println!("{} -> {:?}", highlight.position, highlight.color);
//! }
//! highlighter.shutdown();
//! # Ok::<(), chromapipe::HighlightError>(())
//! ```

pub mod config;
pub mod highlight;
pub mod logger;
pub mod watcher;

pub use config::{ConfigError, HighlighterConfig};
pub use highlight::{Color, HighlightError, Highlight, Highlighter};
pub use watcher::{Phase, WatcherStats};
