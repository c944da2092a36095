//! Keypress handling for the live-session screen.

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use std::io;
use std::time::Duration;

/// Commands a single keypress can issue against the live timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerCommand {
    TogglePause,
    Stop,
    Cancel,
}

pub fn map_key_to_command(key: KeyEvent) -> Option<TimerCommand> {
    if key.kind != KeyEventKind::Press {
        return None;
    }

    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return Some(TimerCommand::Cancel);
    }

    match key.code {
        KeyCode::Char('p') | KeyCode::Char(' ') => Some(TimerCommand::TogglePause),
        KeyCode::Char('s') | KeyCode::Enter => Some(TimerCommand::Stop),
        KeyCode::Char('c') | KeyCode::Esc => Some(TimerCommand::Cancel),
        _ => None,
    }
}

/// Waits up to `timeout` for one keypress and maps it. Unknown keys and
/// non-key events read as no command.
pub fn poll_command(timeout: Duration) -> io::Result<Option<TimerCommand>> {
    if !event::poll(timeout)? {
        return Ok(None);
    }
    match event::read()? {
        Event::Key(key) => Ok(map_key_to_command(key)),
        _ => Ok(None),
    }
}

pub fn command_label(command: TimerCommand) -> &'static str {
    match command {
        TimerCommand::TogglePause => "toggle_pause",
        TimerCommand::Stop => "stop",
        TimerCommand::Cancel => "cancel",
    }
}
