use std::env;
use std::fs;
use std::io::{self, IsTerminal};
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use signal_hook::consts::{SIGINT, SIGTERM};
use signal_hook::flag;

use stint_cli::menu::{run_menu, MenuContext, MenuError};
use stint_core::config::{load_or_default_app_config, ConfigError};
use stint_core::types::TaskSort;
use stint_core::validation::{Validate, ValidationIssue, ValidationLevel};
use stint_store::{SqliteStore, StoreError};

const DEFAULT_CONFIG_PATH: &str = "stint.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
struct CliArgs {
    config_path: PathBuf,
    db_path: Option<PathBuf>,
    sort: Option<TaskSort>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum CliCommand {
    Run(CliArgs),
    Help(String),
}

#[derive(Debug, thiserror::Error)]
enum MainError {
    #[error("{0}")]
    Args(String),
    #[error("{0}")]
    InvalidConfig(String),
    #[error("stint needs an interactive terminal; stdin is not a tty")]
    NotATerminal,
    #[error("failed to create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to load config at {path}: {source}")]
    LoadConfig {
        path: PathBuf,
        #[source]
        source: ConfigError,
    },
    #[error("failed to register signal handler: {source}")]
    Signals {
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Menu(#[from] MenuError),
}

fn main() {
    if let Err(err) = run() {
        eprintln!("stint failed: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), MainError> {
    let mut argv = env::args();
    let program = argv.next().unwrap_or_else(|| "stint".to_string());
    let command = parse_cli_args(argv.collect::<Vec<_>>(), &program)?;

    let args = match command {
        CliCommand::Help(text) => {
            println!("{text}");
            return Ok(());
        }
        CliCommand::Run(args) => args,
    };

    if !io::stdin().is_terminal() {
        return Err(MainError::NotATerminal);
    }

    let mut config =
        load_or_default_app_config(&args.config_path).map_err(|source| MainError::LoadConfig {
            path: args.config_path.clone(),
            source,
        })?;
    if let Some(db_path) = args.db_path {
        config.storage.db_path = db_path;
    }
    validate_config(&config.validate())?;

    let db_path = config.storage.db_path.clone();
    ensure_parent_dir(&db_path)?;
    let store = SqliteStore::open(&db_path)?;
    store.migrate()?;

    let shutdown = register_shutdown_flag()?;

    let ctx = MenuContext {
        store: Arc::new(store),
        config,
        sort: args.sort.unwrap_or_default(),
        shutdown,
    };
    run_menu(&ctx)?;
    Ok(())
}

fn parse_cli_args(args: Vec<String>, program: &str) -> Result<CliCommand, MainError> {
    let mut parsed = CliArgs {
        config_path: PathBuf::from(DEFAULT_CONFIG_PATH),
        db_path: None,
        sort: None,
    };

    let mut idx = 0usize;
    while idx < args.len() {
        let arg = &args[idx];
        match arg.as_str() {
            "help" | "--help" | "-h" => return Ok(CliCommand::Help(usage(program))),
            "--config" => {
                idx += 1;
                let value = args
                    .get(idx)
                    .ok_or_else(|| MainError::Args("missing value for --config".to_string()))?;
                parsed.config_path = PathBuf::from(value);
            }
            "--db" => {
                idx += 1;
                let value = args
                    .get(idx)
                    .ok_or_else(|| MainError::Args("missing value for --db".to_string()))?;
                parsed.db_path = Some(PathBuf::from(value));
            }
            "--sort" => {
                idx += 1;
                let value = args
                    .get(idx)
                    .ok_or_else(|| MainError::Args("missing value for --sort".to_string()))?;
                parsed.sort = Some(value.parse::<TaskSort>().map_err(MainError::Args)?);
            }
            other => {
                return Err(MainError::Args(format!(
                    "unknown argument: {other}\n\n{}",
                    usage(program)
                )));
            }
        }
        idx += 1;
    }

    Ok(CliCommand::Run(parsed))
}

fn usage(program: &str) -> String {
    format!(
        "Usage: {program} [--config <path>] [--db <path>] [--sort <name|accumulated|id>]\n\
\nDefaults:\n  --config stint.toml\n  --db taken from the config file (stint.sqlite)\n  --sort name"
    )
}

fn validate_config(issues: &[ValidationIssue]) -> Result<(), MainError> {
    for issue in issues {
        if issue.level == ValidationLevel::Warning {
            eprintln!("[config] {}: {}", issue.code, issue.message);
        }
    }

    let errors = issues
        .iter()
        .filter(|issue| issue.level == ValidationLevel::Error)
        .map(|issue| format!("{}: {}", issue.code, issue.message))
        .collect::<Vec<_>>();
    if errors.is_empty() {
        return Ok(());
    }
    Err(MainError::InvalidConfig(format!(
        "config validation failed ({})",
        errors.join("; ")
    )))
}

fn ensure_dir(path: &Path) -> Result<(), MainError> {
    fs::create_dir_all(path).map_err(|source| MainError::CreateDir {
        path: path.to_path_buf(),
        source,
    })
}

fn ensure_parent_dir(path: &Path) -> Result<(), MainError> {
    let parent = path.parent().filter(|p| !p.as_os_str().is_empty());
    if let Some(parent) = parent {
        ensure_dir(parent)?;
    }
    Ok(())
}

fn register_shutdown_flag() -> Result<Arc<AtomicBool>, MainError> {
    let shutdown = Arc::new(AtomicBool::new(false));
    for signal in [SIGINT, SIGTERM] {
        // a second signal while the flag is already set force-exits
        flag::register_conditional_shutdown(signal, 130, Arc::clone(&shutdown))
            .map_err(|source| MainError::Signals { source })?;
        flag::register(signal, Arc::clone(&shutdown))
            .map_err(|source| MainError::Signals { source })?;
    }
    Ok(shutdown)
}

#[cfg(test)]
mod tests {
    use super::{parse_cli_args, usage, CliArgs, CliCommand, MainError};
    use std::path::PathBuf;
    use stint_core::types::TaskSort;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn parse_cli_args_uses_defaults_when_no_flags_are_passed() {
        let parsed = parse_cli_args(Vec::new(), "stint").expect("parse");
        assert_eq!(
            parsed,
            CliCommand::Run(CliArgs {
                config_path: PathBuf::from("stint.toml"),
                db_path: None,
                sort: None,
            })
        );
    }

    #[test]
    fn parse_cli_args_applies_explicit_overrides() {
        let parsed = parse_cli_args(
            args(&[
                "--config",
                "custom.toml",
                "--db",
                "custom.sqlite",
                "--sort",
                "accumulated",
            ]),
            "stint",
        )
        .expect("parse");
        assert_eq!(
            parsed,
            CliCommand::Run(CliArgs {
                config_path: PathBuf::from("custom.toml"),
                db_path: Some(PathBuf::from("custom.sqlite")),
                sort: Some(TaskSort::Accumulated),
            })
        );
    }

    #[test]
    fn parse_cli_args_help_returns_usage_message() {
        for flag in ["help", "--help", "-h"] {
            let parsed = parse_cli_args(args(&[flag]), "stint").expect("parse");
            assert_eq!(parsed, CliCommand::Help(usage("stint")));
        }
    }

    #[test]
    fn parse_cli_args_requires_values_for_flags() {
        for flag in ["--config", "--db", "--sort"] {
            let err = parse_cli_args(args(&[flag]), "stint").expect_err("missing value");
            assert!(matches!(err, MainError::Args(ref msg) if msg.contains(flag)));
        }
    }

    #[test]
    fn parse_cli_args_reports_unknown_arguments_with_usage() {
        let err = parse_cli_args(args(&["--nope"]), "stint").expect_err("unknown flag");
        match err {
            MainError::Args(message) => {
                assert!(message.contains("unknown argument: --nope"));
                assert!(message.contains("Usage:"));
            }
            other => panic!("expected args error, got {other:?}"),
        }
    }

    #[test]
    fn parse_cli_args_rejects_bad_sort_values() {
        let err = parse_cli_args(args(&["--sort", "alphabetical"]), "stint").expect_err("bad sort");
        assert!(matches!(err, MainError::Args(ref msg) if msg.contains("alphabetical")));
    }
}
