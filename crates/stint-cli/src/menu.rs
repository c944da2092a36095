//! Line-oriented menu: create tasks, pick one to track, delete tasks.
//!
//! Every flow reports its own failures and hands control back to the
//! menu loop; only a shutdown signal, a quit choice, or a closed stdin
//! ends the loop.

use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, Utc};

use stint_core::{format_hms, AppConfig, SessionTimer, SharedTimer, Task, TaskSort};
use stint_store::{SessionRecorder, SqliteStore, StoreError};

use crate::autosave::AutosavePump;
use crate::session::{outcome_summary, run_live_session, SessionOutcome};

#[derive(Debug, thiserror::Error)]
pub enum MenuError {
    #[error("invalid selection '{input}'")]
    InvalidSelection { input: String },
    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Session(#[from] anyhow::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuChoice {
    CreateTask,
    TrackTask,
    DeleteTask,
    Quit,
}

/// Whether the menu loop keeps going after a flow returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Exit,
}

pub struct MenuContext {
    pub store: Arc<SqliteStore>,
    pub config: AppConfig,
    pub sort: TaskSort,
    pub shutdown: Arc<AtomicBool>,
}

pub fn run_menu(ctx: &MenuContext) -> Result<(), MenuError> {
    println!("stint | task time tracker");
    loop {
        if ctx.shutdown.load(Ordering::SeqCst) {
            return Ok(());
        }

        print_menu();
        let Some(line) = prompt_line("> ")? else {
            // stdin closed; leave quietly
            return Ok(());
        };

        match parse_menu_choice(&line) {
            Some(MenuChoice::CreateTask) => {
                if let Err(err) = create_flow(ctx) {
                    eprintln!("[menu] create task failed: {err}");
                }
            }
            Some(MenuChoice::TrackTask) => match track_flow(ctx) {
                Ok(Flow::Exit) => return Ok(()),
                Ok(Flow::Continue) => {}
                Err(err) => eprintln!("[menu] tracking failed: {err}"),
            },
            Some(MenuChoice::DeleteTask) => {
                if let Err(err) = delete_flow(ctx) {
                    eprintln!("[menu] delete task failed: {err}");
                }
            }
            Some(MenuChoice::Quit) => return Ok(()),
            None => println!("unknown option '{line}'"),
        }
    }
}

fn print_menu() {
    println!();
    println!(" 1. create task");
    println!(" 2. list & track");
    println!(" 3. delete task");
    println!(" 4. quit");
}

fn create_flow(ctx: &MenuContext) -> Result<(), MenuError> {
    let Some(name) = prompt_line("task name: ")? else {
        return Ok(());
    };
    if name.is_empty() {
        println!("task name cannot be empty");
        return Ok(());
    }
    let Some(description) = prompt_line("description (optional): ")? else {
        return Ok(());
    };
    let description = if description.is_empty() {
        None
    } else {
        Some(description.as_str())
    };

    match ctx.store.create_task(&name, description) {
        Ok(task) => println!("created task {} '{}'", task.id, task.name),
        Err(StoreError::DuplicateName { name }) => {
            println!("a task named '{name}' already exists; nothing was created");
        }
        Err(err) => return Err(err.into()),
    }
    Ok(())
}

fn track_flow(ctx: &MenuContext) -> Result<Flow, MenuError> {
    let tasks = ctx.store.list_tasks(ctx.sort)?;
    if tasks.is_empty() {
        println!("no tasks yet; create one first");
        return Ok(Flow::Continue);
    }

    print_task_table(&tasks);
    let Some(line) = prompt_line("track which task? (empty to go back): ")? else {
        return Ok(Flow::Continue);
    };
    if line.is_empty() {
        return Ok(Flow::Continue);
    }
    let index = match parse_selection(&line, tasks.len()) {
        Ok(index) => index,
        Err(err) => {
            println!("{err}");
            return Ok(Flow::Continue);
        }
    };
    let task = &tasks[index];

    print_recent_sessions(ctx, task)?;

    let autosave = prompt_line("autosave while tracking? [s/N]: ")?
        .map(|answer| parse_confirmation(&answer))
        .unwrap_or(false);
    let interval = if autosave {
        let default = ctx.config.autosave.interval();
        let entry = prompt_line(&format!(
            "autosave interval in seconds [{}]: ",
            default.as_secs()
        ))?
        .unwrap_or_default();
        Some(parse_interval_entry(&entry, default))
    } else {
        None
    };

    run_tracking(ctx, task, interval)
}

fn run_tracking(
    ctx: &MenuContext,
    task: &Task,
    autosave_interval: Option<Duration>,
) -> Result<Flow, MenuError> {
    let recorder = Arc::new(SessionRecorder::begin(
        Arc::clone(&ctx.store),
        task.id,
        Utc::now(),
    )?);

    let timer = SharedTimer::new(SessionTimer::new());
    timer.start().map_err(anyhow::Error::from)?;

    let pump = autosave_interval
        .map(|interval| AutosavePump::spawn(timer.clone(), Arc::clone(&recorder), interval));

    let outcome = run_live_session(
        &task.name,
        timer,
        Arc::clone(&recorder),
        pump,
        Arc::clone(&ctx.shutdown),
        ctx.config.ui.tick(),
    )?;

    println!("{}", outcome_summary(outcome));
    match outcome {
        SessionOutcome::Interrupted { .. } => Ok(Flow::Exit),
        _ => Ok(Flow::Continue),
    }
}

fn print_recent_sessions(ctx: &MenuContext, task: &Task) -> Result<(), MenuError> {
    let sessions = ctx.store.list_sessions_for_task(task.id)?;
    if sessions.is_empty() {
        return Ok(());
    }
    println!("recent sessions of '{}':", task.name);
    for session in sessions.iter().rev().take(5) {
        println!(
            "  {}  {}",
            session
                .started_at
                .with_timezone(&Local)
                .format("%Y-%m-%d %H:%M"),
            format_hms(session.duration_seconds)
        );
    }
    Ok(())
}

fn delete_flow(ctx: &MenuContext) -> Result<(), MenuError> {
    let tasks = ctx.store.list_tasks(ctx.sort)?;
    if tasks.is_empty() {
        println!("no tasks to delete");
        return Ok(());
    }

    print_task_table(&tasks);
    let Some(line) = prompt_line("delete which task? (empty to go back): ")? else {
        return Ok(());
    };
    if line.is_empty() {
        return Ok(());
    }
    let index = match parse_selection(&line, tasks.len()) {
        Ok(index) => index,
        Err(err) => {
            println!("{err}");
            return Ok(());
        }
    };
    let task = &tasks[index];

    let confirmed = prompt_line(&format!(
        "delete '{}' and all of its sessions? [s/N]: ",
        task.name
    ))?
    .map(|answer| parse_confirmation(&answer))
    .unwrap_or(false);
    if !confirmed {
        println!("kept '{}'", task.name);
        return Ok(());
    }

    match ctx.store.delete_task(task.id) {
        Ok(true) => println!("deleted '{}'", task.name),
        Ok(false) => println!("task '{}' was already gone", task.name),
        Err(err @ StoreError::RolledBack { .. }) => {
            println!("delete failed and was rolled back: {err}");
        }
        Err(err) => return Err(err.into()),
    }
    Ok(())
}

fn print_task_table(tasks: &[Task]) {
    println!("{:>3}  {:<28} {:>10}  {}", "#", "task", "total", "description");
    for (idx, task) in tasks.iter().enumerate() {
        println!(
            "{:>3}  {:<28} {:>10}  {}",
            idx + 1,
            task.name,
            task.accumulated_hms(),
            task.description.as_deref().unwrap_or("")
        );
    }
}

pub fn parse_menu_choice(input: &str) -> Option<MenuChoice> {
    match input.trim().to_lowercase().as_str() {
        "1" => Some(MenuChoice::CreateTask),
        "2" => Some(MenuChoice::TrackTask),
        "3" => Some(MenuChoice::DeleteTask),
        "4" | "q" | "quit" => Some(MenuChoice::Quit),
        _ => None,
    }
}

/// Maps a 1-based menu entry onto a 0-based index into a listing of
/// `len` rows.
pub fn parse_selection(input: &str, len: usize) -> Result<usize, MenuError> {
    let trimmed = input.trim();
    let number: usize = trimmed.parse().map_err(|_| MenuError::InvalidSelection {
        input: trimmed.to_string(),
    })?;
    if number == 0 || number > len {
        return Err(MenuError::InvalidSelection {
            input: trimmed.to_string(),
        });
    }
    Ok(number - 1)
}

/// `[s/N]` prompts: anything but an explicit yes counts as no.
pub fn parse_confirmation(input: &str) -> bool {
    matches!(
        input.trim().to_lowercase().as_str(),
        "s" | "si" | "y" | "yes"
    )
}

/// Free-text interval entry. Unparseable or zero input falls back to
/// the configured default instead of re-prompting.
pub fn parse_interval_entry(input: &str, default: Duration) -> Duration {
    match input.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Duration::from_secs(secs),
        _ => default,
    }
}

fn prompt_line(prompt: &str) -> io::Result<Option<String>> {
    print!("{prompt}");
    io::stdout().flush()?;
    let mut line = String::new();
    let bytes_read = io::stdin().read_line(&mut line)?;
    if bytes_read == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}
