//! Session timer phases.

use serde::{Deserialize, Serialize};

/// Lifecycle of a single timed session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TimerPhase {
    /// No session started yet
    #[default]
    Idle,
    /// Clock is advancing
    Running,
    /// Clock is frozen, session can resume
    Paused,
    /// Session finished and its total is final
    Stopped,
    /// Session abandoned; nothing past the last flush is kept
    Cancelled,
}

impl std::fmt::Display for TimerPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tag = match self {
            TimerPhase::Idle => "IDLE",
            TimerPhase::Running => "RUNNING",
            TimerPhase::Paused => "PAUSED",
            TimerPhase::Stopped => "STOPPED",
            TimerPhase::Cancelled => "CANCELLED",
        };
        f.write_str(tag)
    }
}

impl TimerPhase {
    /// Returns true once the session can never run again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TimerPhase::Stopped | TimerPhase::Cancelled)
    }

    /// Returns true while the session still owns the terminal.
    pub fn is_live(&self) -> bool {
        matches!(self, TimerPhase::Running | TimerPhase::Paused)
    }
}
