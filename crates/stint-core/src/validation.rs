//! Validation for stint configuration.

use serde::{Deserialize, Serialize};

use crate::config::AppConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationLevel {
    Error,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub level: ValidationLevel,
    pub code: &'static str,
    pub message: String,
}

pub trait Validate {
    fn validate(&self) -> Vec<ValidationIssue>;
}

impl Validate for AppConfig {
    fn validate(&self) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();

        if self.storage.db_path.as_os_str().is_empty() {
            issues.push(ValidationIssue {
                level: ValidationLevel::Error,
                code: "storage.db_path.empty",
                message: "db_path must not be empty".to_string(),
            });
        }

        if self.autosave.interval_secs == 0 {
            issues.push(ValidationIssue {
                level: ValidationLevel::Warning,
                code: "autosave.interval.zero",
                message: "autosave interval is 0; the default interval will be used".to_string(),
            });
        }

        if self.ui.tick_ms == 0 {
            issues.push(ValidationIssue {
                level: ValidationLevel::Warning,
                code: "ui.tick.zero",
                message: "ui tick is 0; the default tick will be used".to_string(),
            });
        }

        if self.ui.tick_ms > 1000 {
            issues.push(ValidationIssue {
                level: ValidationLevel::Warning,
                code: "ui.tick.slow",
                message: format!(
                    "ui tick of {}ms makes keypresses feel laggy",
                    self.ui.tick_ms
                ),
            });
        }

        issues
    }
}
