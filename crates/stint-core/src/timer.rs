//! Session timer state machine.
//!
//! Elapsed time is measured with `Instant` deltas, so wall-clock jumps never
//! corrupt a running session. Every transition takes the observation instant
//! as a parameter; the suffix-free helpers supply `Instant::now()`.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use crate::state::TimerPhase;

#[derive(Debug, thiserror::Error)]
pub enum TimerError {
    #[error("invalid timer transition: {from:?} -> {to:?}")]
    InvalidTransition { from: TimerPhase, to: TimerPhase },
}

/// Check if a phase transition is valid.
///
/// ```text
/// Idle → Running ⇄ Paused
///           │         │
///           ↓         ↓
///     Stopped / Cancelled
/// ```
pub fn is_transition_allowed(from: TimerPhase, to: TimerPhase) -> bool {
    use TimerPhase::*;

    match (from, to) {
        // Start
        (Idle, Running) => true,
        // Pause / Resume
        (Running, Paused) => true,
        (Paused, Running) => true,
        // Stop from either live phase
        (Running, Stopped) => true,
        (Paused, Stopped) => true,
        // Cancel from either live phase
        (Running, Cancelled) => true,
        (Paused, Cancelled) => true,
        _ => false,
    }
}

/// Accumulates elapsed time for one session.
///
/// `banked` holds time from closed running intervals; `resumed_at` marks the
/// start of the currently open one, present only while Running.
#[derive(Debug, Clone)]
pub struct SessionTimer {
    phase: TimerPhase,
    banked: Duration,
    resumed_at: Option<Instant>,
}

impl SessionTimer {
    pub fn new() -> Self {
        Self {
            phase: TimerPhase::Idle,
            banked: Duration::ZERO,
            resumed_at: None,
        }
    }

    pub fn phase(&self) -> TimerPhase {
        self.phase
    }

    /// Start the session. Only valid from Idle.
    pub fn start_at(&mut self, now: Instant) -> Result<(), TimerError> {
        self.shift(TimerPhase::Idle, TimerPhase::Running)?;
        self.resumed_at = Some(now);
        Ok(())
    }

    /// Freeze the clock. Only valid from Running.
    pub fn pause_at(&mut self, now: Instant) -> Result<(), TimerError> {
        self.shift(TimerPhase::Running, TimerPhase::Paused)?;
        self.bank_open_interval(now);
        Ok(())
    }

    /// Re-arm the clock. Only valid from Paused.
    pub fn resume_at(&mut self, now: Instant) -> Result<(), TimerError> {
        self.shift(TimerPhase::Paused, TimerPhase::Running)?;
        self.resumed_at = Some(now);
        Ok(())
    }

    /// Finish the session and return its final elapsed time.
    pub fn stop_at(&mut self, now: Instant) -> Result<Duration, TimerError> {
        self.shift_from_live(TimerPhase::Stopped)?;
        self.bank_open_interval(now);
        Ok(self.banked)
    }

    /// Abandon the session. Elapsed time stays readable for reporting but
    /// must not be persisted past the last flush.
    pub fn cancel_at(&mut self, now: Instant) -> Result<(), TimerError> {
        self.shift_from_live(TimerPhase::Cancelled)?;
        self.bank_open_interval(now);
        Ok(())
    }

    /// Elapsed time as observed at `now`: banked intervals plus the open one.
    pub fn elapsed_at(&self, now: Instant) -> Duration {
        match self.resumed_at {
            Some(since) if self.phase == TimerPhase::Running => {
                self.banked + now.saturating_duration_since(since)
            }
            _ => self.banked,
        }
    }

    pub fn start(&mut self) -> Result<(), TimerError> {
        self.start_at(Instant::now())
    }

    pub fn pause(&mut self) -> Result<(), TimerError> {
        self.pause_at(Instant::now())
    }

    pub fn resume(&mut self) -> Result<(), TimerError> {
        self.resume_at(Instant::now())
    }

    pub fn stop(&mut self) -> Result<Duration, TimerError> {
        self.stop_at(Instant::now())
    }

    pub fn cancel(&mut self) -> Result<(), TimerError> {
        self.cancel_at(Instant::now())
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed_at(Instant::now())
    }

    pub fn elapsed_seconds(&self) -> i64 {
        i64::try_from(self.elapsed().as_secs()).unwrap_or(i64::MAX)
    }

    fn shift(&mut self, expect_from: TimerPhase, to: TimerPhase) -> Result<(), TimerError> {
        if self.phase != expect_from || !is_transition_allowed(self.phase, to) {
            return Err(TimerError::InvalidTransition {
                from: self.phase,
                to,
            });
        }
        self.phase = to;
        Ok(())
    }

    fn shift_from_live(&mut self, to: TimerPhase) -> Result<(), TimerError> {
        if !self.phase.is_live() || !is_transition_allowed(self.phase, to) {
            return Err(TimerError::InvalidTransition {
                from: self.phase,
                to,
            });
        }
        self.phase = to;
        Ok(())
    }

    fn bank_open_interval(&mut self, now: Instant) {
        if let Some(since) = self.resumed_at.take() {
            self.banked += now.saturating_duration_since(since);
        }
    }
}

impl Default for SessionTimer {
    fn default() -> Self {
        Self::new()
    }
}

/// Timer handle shared between the foreground loop and the autosave pump.
/// One lock guards all reads and transitions; holds are O(1).
#[derive(Debug, Clone)]
pub struct SharedTimer {
    inner: Arc<Mutex<SessionTimer>>,
}

impl SharedTimer {
    pub fn new(timer: SessionTimer) -> Self {
        Self {
            inner: Arc::new(Mutex::new(timer)),
        }
    }

    pub fn phase(&self) -> TimerPhase {
        self.lock().phase()
    }

    pub fn elapsed(&self) -> Duration {
        self.lock().elapsed()
    }

    pub fn elapsed_seconds(&self) -> i64 {
        self.lock().elapsed_seconds()
    }

    pub fn start_at(&self, now: Instant) -> Result<(), TimerError> {
        self.lock().start_at(now)
    }

    pub fn start(&self) -> Result<(), TimerError> {
        self.start_at(Instant::now())
    }

    /// Pause a running timer or resume a paused one, under a single lock
    /// hold, and return the phase that resulted.
    pub fn toggle_pause_at(&self, now: Instant) -> Result<TimerPhase, TimerError> {
        let mut timer = self.lock();
        match timer.phase() {
            TimerPhase::Running => {
                timer.pause_at(now)?;
                Ok(TimerPhase::Paused)
            }
            TimerPhase::Paused => {
                timer.resume_at(now)?;
                Ok(TimerPhase::Running)
            }
            from => Err(TimerError::InvalidTransition {
                from,
                to: TimerPhase::Paused,
            }),
        }
    }

    pub fn toggle_pause(&self) -> Result<TimerPhase, TimerError> {
        self.toggle_pause_at(Instant::now())
    }

    pub fn stop_at(&self, now: Instant) -> Result<Duration, TimerError> {
        self.lock().stop_at(now)
    }

    pub fn stop(&self) -> Result<Duration, TimerError> {
        self.stop_at(Instant::now())
    }

    pub fn cancel_at(&self, now: Instant) -> Result<(), TimerError> {
        self.lock().cancel_at(now)
    }

    pub fn cancel(&self) -> Result<(), TimerError> {
        self.cancel_at(Instant::now())
    }

    fn lock(&self) -> MutexGuard<'_, SessionTimer> {
        self.inner.lock().expect("session timer lock")
    }
}

impl Default for SharedTimer {
    fn default() -> Self {
        Self::new(SessionTimer::new())
    }
}
