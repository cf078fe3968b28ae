//! Coprocess handle: spawn, write, poll output, check liveness, kill.
//!
//! The child's stdout is drained by a dedicated reader thread into a
//! channel, so the watcher can poll for output with a timeout instead of
//! blocking inside `read`. Each incarnation gets a fresh channel; output
//! of a killed coprocess is dropped together with its receiver.
//!
//! ```ignore
//! let mut proc = CoprocessCommand::from_slice(&["./highlight", "--fast"]).spawn()?;
//! proc.write(b"abc")?;
//! match proc.poll(Duration::from_millis(3)) {
//!     Poll::Data(bytes) => { /* 3 bytes per character */ }
//!     Poll::Empty => { /* nothing yet */ }
//!     Poll::Closed => { /* stdout closed, restart */ }
//! }
//! ```

use std::{
    ffi::{OsStr, OsString},
    io::{self, BufRead, BufReader, Read, Write},
    process::{Child, ChildStdin, Command, Stdio},
    thread,
    time::Duration,
};

use crossbeam::channel::{self, Receiver, RecvTimeoutError};

/// Bytes requested per read from the coprocess output.
pub const READ_CHUNK: usize = 16 * crate::highlight::COLOR_BYTES;

// ============================================================================
// Builder API
// ============================================================================

/// Command line used to start a coprocess incarnation.
#[derive(Debug, Clone, Default)]
pub struct CoprocessCommand {
    program: OsString,
    args: Vec<OsString>,
}

impl CoprocessCommand {
    /// Create from a command array (e.g., `["./highlight"]` or `["python3", "hl.py"]`).
    pub fn from_slice<S: AsRef<OsStr>>(cmd: &[S]) -> Self {
        let mut iter = cmd.iter();
        let program = iter
            .next()
            .map(|s| s.as_ref().to_owned())
            .unwrap_or_default();
        Self {
            program,
            args: iter.map(|s| s.as_ref().to_owned()).collect(),
        }
    }

    /// Program name for log messages.
    pub fn program_name(&self) -> String {
        self.program.to_string_lossy().to_string()
    }

    /// Start a new incarnation with piped stdin/stdout.
    pub fn spawn(&self) -> io::Result<Coprocess> {
        if self.program.is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "empty coprocess command",
            ));
        }

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = cmd.spawn()?;
        let (Some(stdin), Some(stdout)) = (child.stdin.take(), child.stdout.take()) else {
            let _ = child.kill();
            let _ = child.wait();
            return Err(io::Error::other("coprocess pipes unavailable"));
        };

        if let Some(stderr) = child.stderr.take() {
            forward_stderr(self.program_name(), stderr);
        }

        let (tx, rx) = channel::unbounded();
        let reader = thread::Builder::new()
            .name("coprocess-reader".into())
            .spawn(move || {
                let mut stdout = stdout;
                let mut buf = [0u8; READ_CHUNK];
                loop {
                    match stdout.read(&mut buf) {
                        Ok(0) => break,
                        Ok(n) => {
                            if tx.send(buf[..n].to_vec()).is_err() {
                                break;
                            }
                        }
                        Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                        Err(_) => break,
                    }
                }
            });

        if let Err(e) = reader {
            let _ = child.kill();
            let _ = child.wait();
            return Err(e);
        }

        Ok(Coprocess {
            child,
            stdin: Some(stdin),
            output: rx,
        })
    }
}

// ============================================================================
// Running coprocess
// ============================================================================

/// Result of waiting for coprocess output.
#[derive(Debug, PartialEq, Eq)]
pub enum Poll {
    Data(Vec<u8>),
    Empty,
    /// Output stream reached EOF or failed.
    Closed,
}

/// One live coprocess incarnation, owned by the watcher thread.
#[derive(Debug)]
pub struct Coprocess {
    child: Child,
    stdin: Option<ChildStdin>,
    output: Receiver<Vec<u8>>,
}

impl Coprocess {
    pub fn id(&self) -> u32 {
        self.child.id()
    }

    pub fn write(&mut self, bytes: &[u8]) -> io::Result<()> {
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| io::Error::from(io::ErrorKind::BrokenPipe))?;
        stdin.write_all(bytes)?;
        stdin.flush()
    }

    /// Wait up to `timeout` for output, returning everything already buffered.
    pub fn poll(&self, timeout: Duration) -> Poll {
        let mut data = match self.output.recv_timeout(timeout) {
            Ok(data) => data,
            Err(RecvTimeoutError::Timeout) => return Poll::Empty,
            Err(RecvTimeoutError::Disconnected) => return Poll::Closed,
        };
        while let Ok(more) = self.output.try_recv() {
            data.extend_from_slice(&more);
        }
        Poll::Data(data)
    }

    /// Whether the process has not exited yet.
    pub fn is_alive(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(None))
    }

    /// Terminate (if still running) and reap the process.
    pub fn kill(mut self) {
        // Closing stdin first lets a well-behaved coprocess exit on EOF
        drop(self.stdin.take());
        if self.is_alive() {
            let _ = self.child.kill();
        }
        let _ = self.child.wait();
    }
}

/// Forward coprocess stderr lines to the debug log.
fn forward_stderr<R: Read + Send + 'static>(name: String, stderr: R) {
    let spawned = thread::Builder::new()
        .name("coprocess-stderr".into())
        .spawn(move || {
            for line in BufReader::new(stderr).lines() {
                let Ok(line) = line else { break };
                let line = line.trim();
                if !line.is_empty() {
                    crate::debug!("coprocess"; "{}: {}", name, line);
                }
            }
        });
    if let Err(e) = spawned {
        crate::debug!("coprocess"; "stderr forwarding unavailable: {}", e);
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn poll_until_data(proc: &Coprocess) -> Vec<u8> {
        for _ in 0..500 {
            if let Poll::Data(data) = proc.poll(Duration::from_millis(10)) {
                return data;
            }
        }
        panic!("no output from coprocess");
    }

    #[test]
    fn test_from_slice() {
        let cmd = CoprocessCommand::from_slice(&["python3", "hl.py", "--fast"]);
        assert_eq!(cmd.program, OsString::from("python3"));
        assert_eq!(cmd.args, vec![OsString::from("hl.py"), OsString::from("--fast")]);
        assert_eq!(cmd.program_name(), "python3");

        let empty: [&str; 0] = [];
        assert!(CoprocessCommand::from_slice(&empty).program.is_empty());
    }

    #[test]
    fn test_spawn_missing_program_fails() {
        let cmd = CoprocessCommand::from_slice(&["/nonexistent/chromapipe-coprocess"]);
        assert!(cmd.spawn().is_err());
        assert!(CoprocessCommand::default().spawn().is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_echo_through_cat() {
        let mut proc = CoprocessCommand::from_slice(&["cat"]).spawn().unwrap();
        assert!(proc.is_alive());

        proc.write(b"abc").unwrap();
        let mut received = Vec::new();
        while received.len() < 3 {
            received.extend(poll_until_data(&proc));
        }
        assert_eq!(received, b"abc");
        proc.kill();
    }

    #[cfg(unix)]
    #[test]
    fn test_exit_closes_output() {
        let mut proc = CoprocessCommand::from_slice(&["true"]).spawn().unwrap();
        let mut closed = false;
        for _ in 0..500 {
            if proc.poll(Duration::from_millis(10)) == Poll::Closed {
                closed = true;
                break;
            }
        }
        assert!(closed);
        // Reaped eventually
        for _ in 0..500 {
            if !proc.is_alive() {
                break;
            }
            thread::sleep(Duration::from_millis(10));
        }
        assert!(!proc.is_alive());
    }
}
