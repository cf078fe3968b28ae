//! `edit`: a single-line raw-mode editor with live highlighting.
//!
//! Every keystroke is reported to the highlighter as an insert or remove;
//! the watcher's notifier wakes the loop through a channel and resolved
//! highlights are painted onto the line.

use anyhow::Result;
use chromapipe::{Color, Highlight, Highlighter, HighlighterConfig, logger};
use crossbeam::channel::{self, Receiver};
use crossterm::{
    cursor,
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    queue,
    terminal::{self, Clear, ClearType},
};
use owo_colors::OwoColorize;
use std::{
    io::{self, Write},
    time::Duration,
};

use super::render::contrast;

const PROMPT: &str = "> ";

/// How long to wait for a key before checking for colors again.
const KEY_POLL: Duration = Duration::from_millis(20);

// ============================================================================
// Line buffer
// ============================================================================

/// Text of the line with one optional color per character.
#[derive(Debug, Default)]
struct LineEditor {
    chars: Vec<char>,
    colors: Vec<Option<Color>>,
    cursor: usize,
}

impl LineEditor {
    /// Insert at the cursor. Returns the insert position.
    fn insert(&mut self, c: char) -> usize {
        let at = self.cursor;
        self.chars.insert(at, c);
        self.colors.insert(at, None);
        self.cursor += 1;
        at
    }

    /// Delete before the cursor. Returns the removed position.
    fn backspace(&mut self) -> Option<usize> {
        if self.cursor == 0 {
            return None;
        }
        self.cursor -= 1;
        self.remove_at(self.cursor)
    }

    /// Delete under the cursor. Returns the removed position.
    fn delete(&mut self) -> Option<usize> {
        self.remove_at(self.cursor)
    }

    fn remove_at(&mut self, at: usize) -> Option<usize> {
        if at >= self.chars.len() {
            return None;
        }
        self.chars.remove(at);
        self.colors.remove(at);
        Some(at)
    }

    fn left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    fn right(&mut self) {
        self.cursor = (self.cursor + 1).min(self.chars.len());
    }

    fn home(&mut self) {
        self.cursor = 0;
    }

    fn end(&mut self) {
        self.cursor = self.chars.len();
    }

    fn paint(&mut self, highlight: Highlight) {
        if let Some(slot) = self.colors.get_mut(highlight.position) {
            *slot = Some(highlight.color);
        }
    }

    fn render<W: Write>(&self, out: &mut W) -> io::Result<()> {
        queue!(out, cursor::MoveToColumn(0), Clear(ClearType::CurrentLine))?;
        write!(out, "{PROMPT}")?;
        for (&c, color) in self.chars.iter().zip(&self.colors) {
            match color {
                Some(color) => {
                    let fg = contrast(*color);
                    write!(
                        out,
                        "{}",
                        c.on_truecolor(color.r, color.g, color.b)
                            .truecolor(fg.r, fg.g, fg.b)
                    )?;
                }
                None => write!(out, "{c}")?,
            }
        }
        let column = u16::try_from(PROMPT.len() + self.cursor).unwrap_or(u16::MAX);
        queue!(out, cursor::MoveToColumn(column))?;
        out.flush()
    }
}

// ============================================================================
// Event loop
// ============================================================================

pub fn run_edit(config: HighlighterConfig) -> Result<()> {
    let (tx, rx) = channel::bounded::<()>(1);
    let mut highlighter = Highlighter::with_notifier(config, move || {
        let _ = tx.try_send(());
    })?;
    let mut editor = LineEditor::default();

    terminal::enable_raw_mode()?;
    logger::set_raw_mode(true);

    let result = edit_loop(&mut highlighter, &mut editor, &rx);

    logger::set_raw_mode(false);
    terminal::disable_raw_mode()?;
    println!();

    highlighter.shutdown();
    result
}

fn edit_loop(
    highlighter: &mut Highlighter,
    editor: &mut LineEditor,
    rx: &Receiver<()>,
) -> Result<()> {
    let mut out = io::stdout();
    editor.render(&mut out)?;

    loop {
        let mut dirty = false;

        if event::poll(KEY_POLL)? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                if is_exit(&key) {
                    return Ok(());
                }
                dirty = apply_key(highlighter, editor, key.code);
            }
        }

        if rx.try_recv().is_ok() || highlighter.pending_colors() > 0 {
            for highlight in highlighter.drain_highlights() {
                editor.paint(highlight);
                dirty = true;
            }
        }

        if dirty {
            editor.render(&mut out)?;
        }
    }
}

fn is_exit(key: &KeyEvent) -> bool {
    key.code == KeyCode::Esc
        || (key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL))
        || (key.code == KeyCode::Char('d') && key.modifiers.contains(KeyModifiers::CONTROL))
}

/// Apply a key to the buffer and mirror the edit. Returns whether to redraw.
fn apply_key(highlighter: &mut Highlighter, editor: &mut LineEditor, code: KeyCode) -> bool {
    match code {
        KeyCode::Char(c) => {
            let at = editor.insert(c);
            highlighter.insert(at, c.encode_utf8(&mut [0; 4]));
        }
        KeyCode::Backspace => {
            if let Some(at) = editor.backspace() {
                highlighter.remove(at, 1);
            }
        }
        KeyCode::Delete => {
            if let Some(at) = editor.delete() {
                highlighter.remove(at, 1);
            }
        }
        KeyCode::Left => editor.left(),
        KeyCode::Right => editor.right(),
        KeyCode::Home => editor.home(),
        KeyCode::End => editor.end(),
        _ => return false,
    }
    true
}
