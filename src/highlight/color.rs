//! Colors on the wire and the queue that carries them to the caller.

use crossbeam::queue::SegQueue;

/// Bytes per color on the coprocess output stream.
pub const COLOR_BYTES: usize = 3;

/// RGB color returned by the coprocess for one character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const BLACK: Self = Self::new(0, 0, 0);
    pub const WHITE: Self = Self::new(255, 255, 255);
    pub const GRAY: Self = Self::new(128, 128, 128);
    pub const RED: Self = Self::new(255, 0, 0);
    pub const GREEN: Self = Self::new(0, 255, 0);
    pub const BLUE: Self = Self::new(0, 0, 255);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub const fn to_bytes(self) -> [u8; COLOR_BYTES] {
        [self.r, self.g, self.b]
    }
}

/// A color resolved to its live document position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Highlight {
    pub position: usize,
    pub color: Color,
}

impl Highlight {
    pub const fn new(position: usize, color: Color) -> Self {
        Self { position, color }
    }
}

// ============================================================================
// Decoder
// ============================================================================

/// Splits a byte stream into colors, holding over a partial trailing triplet.
#[derive(Debug, Default)]
pub struct ColorDecoder {
    partial: [u8; COLOR_BYTES],
    held: usize,
}

impl ColorDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode every complete triplet in `held ++ bytes`.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<Color> {
        let mut colors = Vec::with_capacity((self.held + bytes.len()) / COLOR_BYTES);
        for &byte in bytes {
            self.partial[self.held] = byte;
            self.held += 1;
            if self.held == COLOR_BYTES {
                let [r, g, b] = self.partial;
                colors.push(Color::new(r, g, b));
                self.held = 0;
            }
        }
        colors
    }

    /// Bytes of an incomplete triplet waiting for the rest.
    pub fn held(&self) -> usize {
        self.held
    }

    /// Drop a partial triplet (the stream it came from is gone).
    pub fn reset(&mut self) {
        self.held = 0;
    }
}

// ============================================================================
// Color Response Queue
// ============================================================================

/// FIFO of colors from the watcher thread to the caller.
///
/// Lock-free, so the watcher never waits on a caller that is mid-translation.
#[derive(Debug, Default)]
pub struct ColorQueue {
    colors: SegQueue<Color>,
}

impl ColorQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_all(&self, colors: impl IntoIterator<Item = Color>) {
        for color in colors {
            self.colors.push(color);
        }
    }

    pub fn pop(&self) -> Option<Color> {
        self.colors.pop()
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }
}

// ============================================================================
// Tests
// ============================================================================
