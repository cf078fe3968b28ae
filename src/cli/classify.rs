//! Reference coprocess.
//!
//! Reads characters from stdin and answers with three bytes (r, g, b) per
//! character on stdout, flushing after every chunk read. With fault
//! triggers enabled it can also stall or crash on demand, which is how the
//! restart logic gets exercised.

use anyhow::{Context, Result};
use chromapipe::Color;
use std::{
    io::{self, Read, Write},
    thread,
    time::Duration,
};

/// Bytes read per chunk.
const CHUNK: usize = 128;

/// How long an armed `S` stalls.
const STALL: Duration = Duration::from_secs(1);

/// Exit code of an armed `C`.
const CRASH_EXIT_CODE: i32 = 134;

/// What the classifier wants done after coloring a byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Continue,
    Stall,
    Crash,
}

#[derive(Debug, Default)]
struct Classifier {
    faults: bool,
    armed: bool,
}

impl Classifier {
    fn new(faults: bool) -> Self {
        Self {
            faults,
            armed: false,
        }
    }

    fn classify(&mut self, byte: u8) -> (Color, Action) {
        if self.faults {
            match byte {
                b'T' => {
                    self.armed = true;
                    return (Color::GRAY, Action::Continue);
                }
                b'F' => {
                    self.armed = false;
                    return (Color::GRAY, Action::Continue);
                }
                b'S' => {
                    let action = if self.armed { Action::Stall } else { Action::Continue };
                    return (Color::GRAY, action);
                }
                b'C' => {
                    let action = if self.armed { Action::Crash } else { Action::Continue };
                    return (Color::GRAY, action);
                }
                _ => {}
            }
        }

        let color = match byte {
            b'R' => Color::RED,
            b'G' => Color::GREEN,
            b'B' => Color::BLUE,
            b if b.is_ascii_digit() => Color::BLUE,
            b if b.is_ascii_whitespace() => Color::WHITE,
            _ => Color::BLACK,
        };
        (color, Action::Continue)
    }
}

/// Serve the byte protocol until stdin closes.
pub fn run_classify(faults: bool) -> Result<()> {
    let mut classifier = Classifier::new(faults);
    let mut stdin = io::stdin().lock();
    let mut stdout = io::stdout().lock();
    let mut buf = [0u8; CHUNK];

    loop {
        let n = match stdin.read(&mut buf) {
            Ok(0) => return Ok(()),
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e).context("failed to read input"),
        };

        let mut out = Vec::with_capacity(n * chromapipe::highlight::COLOR_BYTES);
        for &byte in &buf[..n] {
            let (color, action) = classifier.classify(byte);
            match action {
                Action::Continue => {}
                Action::Stall => thread::sleep(STALL),
                // Whatever this chunk produced so far is lost, like a real crash
                Action::Crash => std::process::exit(CRASH_EXIT_CODE),
            }
            out.extend_from_slice(&color.to_bytes());
        }

        if let Err(e) = stdout.write_all(&out).and_then(|()| stdout.flush()) {
            if e.kind() == io::ErrorKind::BrokenPipe {
                return Ok(());
            }
            return Err(e).context("failed to write colors");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn colors(classifier: &mut Classifier, input: &[u8]) -> Vec<Color> {
        input.iter().map(|&b| classifier.classify(b).0).collect()
    }

    #[test]
    fn test_palette() {
        let mut classifier = Classifier::new(false);
        assert_eq!(
            colors(&mut classifier, b"RGB7 x\n"),
            vec![
                Color::RED,
                Color::GREEN,
                Color::BLUE,
                Color::BLUE,
                Color::WHITE,
                Color::BLACK,
                Color::WHITE,
            ]
        );
    }

    #[test]
    fn test_fault_letters_are_plain_without_faults() {
        let mut classifier = Classifier::new(false);
        for byte in *b"TSCF" {
            assert_eq!(classifier.classify(byte), (Color::BLACK, Action::Continue));
        }
    }

    #[test]
    fn test_faults_need_arming() {
        let mut classifier = Classifier::new(true);
        assert_eq!(classifier.classify(b'C'), (Color::GRAY, Action::Continue));
        assert_eq!(classifier.classify(b'S'), (Color::GRAY, Action::Continue));

        assert_eq!(classifier.classify(b'T'), (Color::GRAY, Action::Continue));
        assert_eq!(classifier.classify(b'S'), (Color::GRAY, Action::Stall));
        assert_eq!(classifier.classify(b'C'), (Color::GRAY, Action::Crash));

        assert_eq!(classifier.classify(b'F'), (Color::GRAY, Action::Continue));
        assert_eq!(classifier.classify(b'C'), (Color::GRAY, Action::Continue));
        assert_eq!(classifier.classify(b'R'), (Color::RED, Action::Continue));
    }
}
