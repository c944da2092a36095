//! Live-session screen: renders the clock and dispatches keypresses.

use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};

use stint_core::{format_hms, SharedTimer, TimerPhase};
use stint_store::SessionRecorder;

use crate::autosave::AutosavePump;
use crate::input::{poll_command, TimerCommand};

/// How a live session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    /// Stop: the final total was persisted.
    Stopped { seconds: i64 },
    /// Cancel: nothing past the last autosave flush was persisted.
    Cancelled { seconds: i64 },
    /// SIGINT/SIGTERM: saved like a Stop; the caller should exit.
    Interrupted { seconds: i64 },
}

pub fn outcome_summary(outcome: SessionOutcome) -> String {
    match outcome {
        SessionOutcome::Stopped { seconds } => format!("recorded {}", format_hms(seconds)),
        SessionOutcome::Cancelled { seconds } => {
            format!("discarded {} (autosaved time is kept)", format_hms(seconds))
        }
        SessionOutcome::Interrupted { seconds } => {
            format!("interrupted; recorded {}", format_hms(seconds))
        }
    }
}

/// Runs the foreground loop for one session. The timer must already be
/// running. Raw mode is restored before this returns, success or not.
pub fn run_live_session(
    task_name: &str,
    timer: SharedTimer,
    recorder: Arc<SessionRecorder>,
    pump: Option<AutosavePump>,
    shutdown: Arc<AtomicBool>,
    tick: Duration,
) -> anyhow::Result<SessionOutcome> {
    let mut pump = pump;
    enable_raw_mode().context("enable raw mode")?;
    let result = session_loop(task_name, &timer, &recorder, &mut pump, &shutdown, tick);
    disable_raw_mode().context("disable raw mode")?;
    // the error path may leave the pump running; join it before returning
    shutdown_pump(&mut pump);
    println!();
    result
}

fn session_loop(
    task_name: &str,
    timer: &SharedTimer,
    recorder: &SessionRecorder,
    pump: &mut Option<AutosavePump>,
    shutdown: &AtomicBool,
    tick: Duration,
) -> anyhow::Result<SessionOutcome> {
    loop {
        if shutdown.load(Ordering::SeqCst) {
            timer.stop().context("stop timer on shutdown signal")?;
            let seconds = timer.elapsed_seconds();
            shutdown_pump(pump);
            // best effort: the process is on its way out either way
            if let Err(err) = recorder.finalize(seconds) {
                eprintln!("\r\n[session] final flush failed: {err}");
            }
            return Ok(SessionOutcome::Interrupted { seconds });
        }

        render_status_line(task_name, timer.phase(), timer.elapsed_seconds())
            .context("render status line")?;

        let Some(command) = poll_command(tick).context("poll for keypress")? else {
            continue;
        };

        match command {
            TimerCommand::TogglePause => {
                timer.toggle_pause().context("toggle pause")?;
            }
            TimerCommand::Stop => {
                timer.stop().context("stop timer")?;
                let seconds = timer.elapsed_seconds();
                shutdown_pump(pump);
                recorder
                    .finalize(seconds)
                    .context("persist final session total")?;
                return Ok(SessionOutcome::Stopped { seconds });
            }
            TimerCommand::Cancel => {
                timer.cancel().context("cancel timer")?;
                let seconds = timer.elapsed_seconds();
                shutdown_pump(pump);
                return Ok(SessionOutcome::Cancelled { seconds });
            }
        }
    }
}

fn shutdown_pump(pump: &mut Option<AutosavePump>) {
    if let Some(pump) = pump.take() {
        pump.shutdown();
    }
}

fn render_status_line(task_name: &str, phase: TimerPhase, seconds: i64) -> io::Result<()> {
    let mut out = io::stdout();
    write!(
        out,
        "\r\x1b[2K {}  {}  {}  [p]ause/resume [s]top [c]ancel ",
        phase_tag(phase),
        task_name,
        format_hms(seconds),
    )?;
    out.flush()
}

fn phase_tag(phase: TimerPhase) -> &'static str {
    match phase {
        TimerPhase::Idle => "IDLE   ",
        TimerPhase::Running => "\x1b[32mRUNNING\x1b[0m",
        TimerPhase::Paused => "\x1b[33mPAUSED \x1b[0m",
        TimerPhase::Stopped => "STOPPED",
        TimerPhase::Cancelled => "CANCELLED",
    }
}

#[cfg(test)]
mod tests {
    use super::{outcome_summary, phase_tag, SessionOutcome};
    use stint_core::TimerPhase;

    #[test]
    fn outcome_summary_reports_each_ending() {
        assert_eq!(
            outcome_summary(SessionOutcome::Stopped { seconds: 125 }),
            "recorded 0:02:05"
        );
        assert_eq!(
            outcome_summary(SessionOutcome::Cancelled { seconds: 61 }),
            "discarded 0:01:01 (autosaved time is kept)"
        );
        assert_eq!(
            outcome_summary(SessionOutcome::Interrupted { seconds: 3600 }),
            "interrupted; recorded 1:00:00"
        );
    }

    #[test]
    fn phase_tags_keep_live_phases_the_same_width() {
        let running = phase_tag(TimerPhase::Running).replace("\x1b[32m", "").replace("\x1b[0m", "");
        let paused = phase_tag(TimerPhase::Paused).replace("\x1b[33m", "").replace("\x1b[0m", "");
        assert_eq!(running.len(), paused.len());
    }
}
