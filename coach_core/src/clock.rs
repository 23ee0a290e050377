//! Clock driver for the session state machine.
//!
//! The driver polls a time source several times per second and converts the
//! wall-clock delta since its reference timestamp into whole-second ticks.
//! Only consumed whole seconds move the reference forward, so sub-second
//! remainders carry over to the next poll. A gap larger than one poll
//! (suspended process, throttled host) is absorbed as a batch of catch-up
//! ticks, capped at `max_catch_up_ticks`.
//!
//! ## Usage
//!
//! ```ignore
//! let mut driver = ClockDriver::new(SystemClock::new());
//! session.start(steps);
//! driver.arm();
//! driver.run(&mut session, |_| ControlFlow::Continue(()));
//! ```

use crate::player::{Session, SessionStatus};
use std::ops::ControlFlow;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

pub const DEFAULT_POLL_INTERVAL_MS: u64 = 250;
pub const DEFAULT_MAX_CATCH_UP_TICKS: u32 = 300;

/// A gap of this many poll intervals between two polls of `run` means the
/// process was suspended (stopped job, host sleep)
pub const SUSPENSION_POLL_FACTOR: u32 = 4;

/// Source of monotonic milliseconds
pub trait TimeSource {
    fn now_ms(&self) -> u64;

    /// Block (or pretend to) until `duration` has passed
    fn sleep(&self, duration: Duration);
}

/// Real time, measured from construction
#[derive(Clone, Debug)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for SystemClock {
    fn now_ms(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Manually advanced time; `sleep` advances instead of blocking
///
/// Clones share the same counter, so a test can keep one handle and give
/// another to the driver.
#[derive(Clone, Debug, Default)]
pub struct ManualClock {
    now_ms: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, duration: Duration) {
        self.now_ms
            .fetch_add(duration.as_millis() as u64, Ordering::SeqCst);
    }

    pub fn advance_ms(&self, ms: u64) {
        self.now_ms.fetch_add(ms, Ordering::SeqCst);
    }
}

impl TimeSource for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now_ms.load(Ordering::SeqCst)
    }

    fn sleep(&self, duration: Duration) {
        self.advance(duration);
    }
}

/// Drives `Session::tick` from a time source
#[derive(Debug)]
pub struct ClockDriver<T: TimeSource> {
    clock: T,
    /// Timestamp of the last consumed whole second; `None` while not playing
    reference_ms: Option<u64>,
    poll_interval: Duration,
    max_catch_up_ticks: u32,
    foreground_catch_ups: u32,
}

impl<T: TimeSource> ClockDriver<T> {
    pub fn new(clock: T) -> Self {
        Self::with_limits(
            clock,
            Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            DEFAULT_MAX_CATCH_UP_TICKS,
        )
    }

    pub fn with_limits(clock: T, poll_interval: Duration, max_catch_up_ticks: u32) -> Self {
        Self {
            clock,
            reference_ms: None,
            poll_interval,
            max_catch_up_ticks: max_catch_up_ticks.max(1),
            foreground_catch_ups: 0,
        }
    }

    pub fn clock(&self) -> &T {
        &self.clock
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub fn reference_ms(&self) -> Option<u64> {
        self.reference_ms
    }

    /// Number of `on_foreground` calls that applied ticks
    pub fn foreground_catch_ups(&self) -> u32 {
        self.foreground_catch_ups
    }

    /// Start counting from now. Call when the session enters Playing.
    pub fn arm(&mut self) {
        self.reference_ms = Some(self.clock.now_ms());
    }

    pub fn disarm(&mut self) {
        self.reference_ms = None;
    }

    /// Periodic poll. Returns the number of ticks applied.
    ///
    /// While the session is not Playing the driver disarms, so paused time
    /// is never counted; the first poll after resuming re-arms.
    pub fn poll(&mut self, session: &mut Session) -> u32 {
        if session.status() != SessionStatus::Playing {
            self.disarm();
            return 0;
        }
        self.catch_up(session)
    }

    /// Host signalled a return from suspension; catch up immediately
    pub fn on_foreground(&mut self, session: &mut Session) -> u32 {
        let ticks = self.poll(session);
        if ticks > 0 {
            self.foreground_catch_ups += 1;
            tracing::info!("Resumed from background, applied {} catch-up ticks", ticks);
        }
        ticks
    }

    /// Poll until the session finishes or is stopped.
    ///
    /// `between_polls` runs once per iteration before polling, and is where
    /// the caller applies user commands. Returning `Break` stops the loop
    /// without touching the session. A poll arriving more than
    /// `SUSPENSION_POLL_FACTOR` intervals after the previous one is handled
    /// as a return to the foreground. Returns the total ticks applied.
    pub fn run<F>(&mut self, session: &mut Session, mut between_polls: F) -> u32
    where
        F: FnMut(&mut Session) -> ControlFlow<()>,
    {
        let suspension_ms =
            self.poll_interval.as_millis() as u64 * u64::from(SUSPENSION_POLL_FACTOR);
        let mut last_poll_ms = self.clock.now_ms();
        let mut total = 0;
        loop {
            if between_polls(session).is_break() {
                break;
            }
            let now = self.clock.now_ms();
            total += if now.saturating_sub(last_poll_ms) > suspension_ms {
                self.on_foreground(session)
            } else {
                self.poll(session)
            };
            last_poll_ms = now;
            if matches!(
                session.status(),
                SessionStatus::Finished | SessionStatus::Idle
            ) {
                break;
            }
            self.clock.sleep(self.poll_interval);
        }
        self.disarm();
        total
    }

    fn catch_up(&mut self, session: &mut Session) -> u32 {
        let now = self.clock.now_ms();
        let Some(reference) = self.reference_ms else {
            self.reference_ms = Some(now);
            return 0;
        };

        let whole_seconds = now.saturating_sub(reference) / 1000;
        if whole_seconds == 0 {
            return 0;
        }

        let batch = whole_seconds.min(u64::from(self.max_catch_up_ticks)) as u32;
        let mut applied = 0;
        for _ in 0..batch {
            if !session.tick() {
                break;
            }
            applied += 1;
        }

        self.reference_ms = Some(reference + whole_seconds * 1000);

        if whole_seconds > 1 {
            tracing::debug!(
                "Catch-up: {}s elapsed since last tick, applied {} ticks",
                whole_seconds,
                applied
            );
        }
        applied
    }
}
