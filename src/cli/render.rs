//! `render`: highlight a whole file and print it with colored backgrounds.

use anyhow::{Context, Result};
use chromapipe::{Color, Highlighter, HighlighterConfig, debug, log};
use crossbeam::channel;
use owo_colors::{OwoColorize, Stream};
use std::{
    fs,
    io::{self, Read, Write},
    path::Path,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::{Duration, Instant},
};

/// How long to sleep between drains when no notification arrives.
const DRAIN_INTERVAL: Duration = Duration::from_millis(50);

pub fn run_render(config: HighlighterConfig, file: Option<&Path>, wait: Duration) -> Result<()> {
    let text = read_input(file)?;

    let interrupted = Arc::new(AtomicBool::new(false));
    {
        let interrupted = Arc::clone(&interrupted);
        ctrlc::set_handler(move || interrupted.store(true, Ordering::SeqCst))
            .context("failed to set Ctrl+C handler")?;
    }

    let (tx, rx) = channel::bounded::<()>(1);
    let mut highlighter = Highlighter::with_notifier(config, move || {
        let _ = tx.try_send(());
    })?;

    let chars: Vec<char> = text.chars().collect();
    let mut colors: Vec<Option<Color>> = vec![None; chars.len()];

    // Feed line by line, the way a paste or a load would arrive
    let mut position = 0;
    for line in text.split_inclusive('\n') {
        highlighter.insert(position, line);
        position += line.chars().count();
    }

    let deadline = Instant::now() + wait;
    loop {
        for highlight in highlighter.drain_highlights() {
            if let Some(slot) = colors.get_mut(highlight.position) {
                *slot = Some(highlight.color);
            }
        }
        if highlighter.uncolored() == 0
            || interrupted.load(Ordering::SeqCst)
            || Instant::now() >= deadline
        {
            break;
        }
        let _ = rx.recv_timeout(DRAIN_INTERVAL);
    }

    let stats = highlighter.stats();
    highlighter.shutdown();
    debug!("render"; "{} colored, {} restart(s), peak in flight {}",
        stats.acknowledged, stats.restarts, stats.peak_in_flight);

    let uncolored = highlighter.uncolored();
    if uncolored > 0 {
        log!("render"; "{} character(s) left uncolored", uncolored);
    }

    let mut stdout = io::stdout().lock();
    write_painted(&mut stdout, &chars, &colors)?;
    stdout.flush()?;
    Ok(())
}

fn read_input(file: Option<&Path>) -> Result<String> {
    match file {
        Some(path) => {
            fs::read_to_string(path).with_context(|| format!("failed to read `{}`", path.display()))
        }
        None => {
            let mut text = String::new();
            io::stdin()
                .read_to_string(&mut text)
                .context("failed to read stdin")?;
            Ok(text)
        }
    }
}

/// Write each character on its highlight color. Line breaks stay unstyled.
fn write_painted<W: Write>(out: &mut W, chars: &[char], colors: &[Option<Color>]) -> Result<()> {
    for (&c, color) in chars.iter().zip(colors) {
        match color {
            Some(color) if c != '\n' => {
                let fg = contrast(*color);
                write!(
                    out,
                    "{}",
                    c.if_supports_color(Stream::Stdout, |c| c
                        .on_truecolor(color.r, color.g, color.b)
                        .truecolor(fg.r, fg.g, fg.b)
                        .to_string())
                )?;
            }
            _ => write!(out, "{c}")?,
        }
    }
    Ok(())
}

/// Black or white, whichever reads better on `background`.
pub(crate) fn contrast(background: Color) -> Color {
    let luma = 299 * u32::from(background.r)
        + 587 * u32::from(background.g)
        + 114 * u32::from(background.b);
    if luma > 128_000 {
        Color::BLACK
    } else {
        Color::WHITE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contrast() {
        assert_eq!(contrast(Color::WHITE), Color::BLACK);
        assert_eq!(contrast(Color::BLACK), Color::WHITE);
        assert_eq!(contrast(Color::BLUE), Color::WHITE);
        assert_eq!(contrast(Color::GREEN), Color::BLACK);
    }

    #[test]
    fn test_unstyled_when_uncolored() {
        let chars: Vec<char> = "ab\n".chars().collect();
        let mut out = Vec::new();
        write_painted(&mut out, &chars, &[None, None, None]).unwrap();
        assert_eq!(out, b"ab\n");
    }

    #[test]
    fn test_read_input_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("input.txt");
        fs::write(&path, "RGB\n").unwrap();
        assert_eq!(read_input(Some(&path)).unwrap(), "RGB\n");
        assert!(read_input(Some(&dir.path().join("missing.txt"))).is_err());
    }
}
