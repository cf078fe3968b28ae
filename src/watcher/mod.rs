//! Coprocess supervision.
//!
//! A single background thread owns the coprocess and its pipes:
//!
//! ```text
//! Starting ──> Running <──> Waiting
//!                 │  ^
//!                 v  │
//!             Restarting          (any) ──> Stopped
//! ```
//!
//! - `Running`: write whatever fits the window, poll for output, turn output
//!   into colors and acknowledge them.
//! - `Waiting`: nothing is awaiting a color; block until a submission or
//!   shutdown arrives.
//! - `Restarting`: kill the current coprocess (if any), wait one retry
//!   interval, spawn a fresh one and resend every unacknowledged character.
//!
//! The only state shared with the caller is the [`Outbox`] (behind a mutex,
//! never held across I/O), the lock-free color queue and the notifier.

mod outbox;
mod process;

pub use outbox::Outbox;
pub use process::{Coprocess, CoprocessCommand, Poll, READ_CHUNK};

use std::{
    fmt, io,
    sync::Arc,
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use parking_lot::{Condvar, Mutex};

use crate::config::HighlighterConfig;
use crate::highlight::{ColorDecoder, ColorQueue, Insert};
use crate::{debug, log};

/// Callback fired from the watcher thread when new colors are queued.
pub type Notifier = Arc<dyn Fn() + Send + Sync>;

// ============================================================================
// Phase
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Starting,
    Running,
    Waiting,
    Restarting,
    Stopped,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Starting => "starting",
            Self::Running => "running",
            Self::Waiting => "waiting",
            Self::Restarting => "restarting",
            Self::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// Snapshot of watcher progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatcherStats {
    pub phase: Phase,
    /// Coprocess replacements after the initial start.
    pub restarts: u64,
    /// Characters colored by the coprocess so far.
    pub acknowledged: u64,
    /// Characters submitted and still waiting for a color.
    pub unacknowledged: usize,
    pub in_flight: usize,
    /// Highest in-flight byte count ever reached.
    pub peak_in_flight: usize,
}

// ============================================================================
// Shared state
// ============================================================================

struct State {
    outbox: Outbox,
    running: bool,
    phase: Phase,
    restarts: u64,
}

struct Shared {
    state: Mutex<State>,
    wake: Condvar,
    notifier: Mutex<Option<Notifier>>,
}

impl Shared {
    fn notifier(&self) -> Option<Notifier> {
        self.notifier.lock().clone()
    }
}

// ============================================================================
// Handle (caller side)
// ============================================================================

/// Caller-side handle to the watcher thread.
pub struct WatcherHandle {
    shared: Arc<Shared>,
    thread: Option<JoinHandle<()>>,
}

impl WatcherHandle {
    /// Start the watcher thread. The coprocess itself is started from the
    /// thread, so a missing binary is not an error here.
    pub fn spawn(config: &HighlighterConfig, colors: Arc<ColorQueue>) -> io::Result<Self> {
        let shared = Arc::new(Shared {
            state: Mutex::new(State {
                outbox: Outbox::new(config.window),
                running: true,
                phase: Phase::Starting,
                restarts: 0,
            }),
            wake: Condvar::new(),
            notifier: Mutex::new(None),
        });

        let watcher = Watcher {
            shared: Arc::clone(&shared),
            colors,
            command: config.coprocess_command(),
            timeout: config.timeout(),
            retry_interval: config.retry_interval(),
            process: None,
            decoder: ColorDecoder::new(),
            last_output: Instant::now(),
        };

        let thread = thread::Builder::new()
            .name("coprocess-watcher".into())
            .spawn(move || watcher.run())?;

        Ok(Self {
            shared,
            thread: Some(thread),
        })
    }

    /// Queue an insert for the coprocess and wake the watcher. Never blocks
    /// on I/O.
    pub fn submit(&self, insert: Insert) {
        let mut state = self.shared.state.lock();
        state.outbox.submit(insert);
        self.shared.wake.notify_all();
    }

    pub fn set_notifier(&self, notifier: Option<Notifier>) {
        *self.shared.notifier.lock() = notifier;
    }

    pub fn stats(&self) -> WatcherStats {
        let state = self.shared.state.lock();
        WatcherStats {
            phase: state.phase,
            restarts: state.restarts,
            acknowledged: state.outbox.acknowledged(),
            unacknowledged: state.outbox.unacknowledged(),
            in_flight: state.outbox.in_flight(),
            peak_in_flight: state.outbox.peak_in_flight(),
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.thread.is_none()
    }

    /// Stop the watcher, kill the coprocess and wait for the thread to exit.
    pub fn shutdown(&mut self) {
        {
            let mut state = self.shared.state.lock();
            state.running = false;
            self.shared.wake.notify_all();
        }

        let Some(thread) = self.thread.take() else {
            return;
        };
        if thread.join().is_err() {
            log!("watch"; "watcher thread panicked");
        }
    }
}

impl Drop for WatcherHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

// ============================================================================
// Watcher (thread side)
// ============================================================================

struct Watcher {
    shared: Arc<Shared>,
    colors: Arc<ColorQueue>,
    command: CoprocessCommand,
    timeout: Duration,
    retry_interval: Duration,
    process: Option<Coprocess>,
    decoder: ColorDecoder,
    last_output: Instant,
}

impl Watcher {
    fn run(mut self) {
        let mut phase = Phase::Starting;
        loop {
            self.enter(phase);
            phase = match phase {
                Phase::Starting | Phase::Restarting => self.restart(),
                Phase::Waiting => self.wait_for_work(),
                Phase::Running => self.step(),
                Phase::Stopped => break,
            };
        }

        if let Some(process) = self.process.take() {
            debug!("watch"; "stopping coprocess (pid {})", process.id());
            process.kill();
        }
    }

    fn enter(&self, phase: Phase) {
        let previous = std::mem::replace(&mut self.shared.state.lock().phase, phase);
        if previous != phase {
            debug!("watch"; "{} -> {}", previous, phase);
        }
    }

    /// Replace the coprocess and resend everything unacknowledged.
    fn restart(&mut self) -> Phase {
        let replacing = match self.process.take() {
            Some(old) => {
                old.kill();
                true
            }
            None => false,
        };
        self.decoder.reset();

        // Back off between replacements so a coprocess that dies on start
        // cannot spin the watcher
        let running = if replacing {
            self.pause(self.retry_interval)
        } else {
            self.is_running()
        };
        if !running {
            return Phase::Stopped;
        }

        let process = match self.command.spawn() {
            Ok(process) => process,
            Err(e) => {
                log!("watch"; "failed to start `{}`: {}", self.command.program_name(), e);
                // Retry after a full timeout, unless shut down meanwhile
                return if self.pause(self.timeout) {
                    self.restart_because("spawn failed")
                } else {
                    Phase::Stopped
                };
            }
        };

        debug!("watch"; "started `{}` (pid {})", self.command.program_name(), process.id());
        self.process = Some(process);
        self.last_output = Instant::now();

        let batch = self.shared.state.lock().outbox.on_restart();
        self.send(&batch)
    }

    /// Block until something is waiting for a color or shutdown is requested.
    fn wait_for_work(&mut self) -> Phase {
        let mut state = self.shared.state.lock();
        while state.running && state.outbox.is_idle() {
            self.shared.wake.wait(&mut state);
        }
        if !state.running {
            return Phase::Stopped;
        }
        drop(state);

        self.last_output = Instant::now();
        Phase::Running
    }

    /// One send/receive round.
    fn step(&mut self) -> Phase {
        let batch = {
            let mut state = self.shared.state.lock();
            if !state.running {
                return Phase::Stopped;
            }
            if state.outbox.is_idle() {
                return Phase::Waiting;
            }
            state.outbox.flush_window()
        };

        let phase = self.send(&batch);
        if phase != Phase::Running {
            return phase;
        }

        let (polled, alive) = match self.process.as_mut() {
            Some(process) => {
                let polled = process.poll(self.retry_interval);
                let alive = polled != Poll::Empty || process.is_alive();
                (polled, alive)
            }
            None => return self.restart_because("no coprocess"),
        };

        match polled {
            Poll::Data(bytes) => {
                self.last_output = Instant::now();
                self.receive(&bytes)
            }
            Poll::Empty if !alive => self.restart_because("coprocess exited"),
            Poll::Empty if self.last_output.elapsed() >= self.timeout => {
                self.restart_because("no response within timeout")
            }
            Poll::Empty => Phase::Running,
            Poll::Closed => self.restart_because("output closed"),
        }
    }

    /// Decode output, acknowledge it and hand the colors to the caller.
    fn receive(&mut self, bytes: &[u8]) -> Phase {
        let colors = self.decoder.feed(bytes);
        if colors.is_empty() {
            return Phase::Running;
        }

        let batch = self
            .shared
            .state
            .lock()
            .outbox
            .on_bytes_acknowledged(colors.len());

        self.colors.push_all(colors);
        if let Some(notify) = self.shared.notifier() {
            notify();
        }

        self.send(&batch)
    }

    fn send(&mut self, batch: &[u8]) -> Phase {
        if batch.is_empty() {
            return Phase::Running;
        }
        let written = match self.process.as_mut() {
            Some(process) => process.write(batch),
            None => return self.restart_because("no coprocess"),
        };
        match written {
            Ok(()) => Phase::Running,
            Err(e) => {
                debug!("watch"; "write of {} byte(s) failed: {}", batch.len(), e);
                self.restart_because("write failed")
            }
        }
    }

    fn restart_because(&self, reason: &str) -> Phase {
        let restarts = {
            let mut state = self.shared.state.lock();
            if !state.running {
                return Phase::Stopped;
            }
            state.restarts += 1;
            state.restarts
        };
        debug!("watch"; "restart #{}: {}", restarts, reason);
        Phase::Restarting
    }

    fn is_running(&self) -> bool {
        self.shared.state.lock().running
    }

    /// Sleep for `duration` or until shutdown. Returns whether still running.
    fn pause(&self, duration: Duration) -> bool {
        let deadline = Instant::now() + duration;
        let mut state = self.shared.state.lock();
        while state.running {
            if self.shared.wake.wait_until(&mut state, deadline).timed_out() {
                break;
            }
        }
        state.running
    }
}
