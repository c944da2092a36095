//! Core types for the stint time tracker.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord,
)]
pub struct TaskId(pub i64);

impl TaskId {
    pub fn new(id: i64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord,
)]
pub struct SessionId(pub i64);

impl SessionId {
    pub fn new(id: i64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Sort order for task listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskSort {
    #[default]
    Name,
    Accumulated,
    Id,
}

impl TaskSort {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskSort::Name => "name",
            TaskSort::Accumulated => "accumulated",
            TaskSort::Id => "id",
        }
    }
}

impl std::str::FromStr for TaskSort {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "name" => Ok(TaskSort::Name),
            "accumulated" | "time" => Ok(TaskSort::Accumulated),
            "id" => Ok(TaskSort::Id),
            other => Err(format!(
                "invalid task sort '{other}'. valid values: name, accumulated, id"
            )),
        }
    }
}

impl std::fmt::Display for TaskSort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named unit of work that time is tracked against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub name: String,
    pub description: Option<String>,
    /// Total seconds recorded across all of this task's sessions.
    pub accumulated_seconds: i64,
}

impl Task {
    pub fn accumulated_hms(&self) -> String {
        format_hms(self.accumulated_seconds)
    }
}

/// One timed stretch of work against a task. The row is created with a zero
/// duration when a timer starts and only ever mutated by gateway flushes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub task_id: TaskId,
    pub started_at: DateTime<Utc>,
    pub duration_seconds: i64,
}

/// Renders a second count as `H:MM:SS`. Negative counts clamp to zero.
pub fn format_hms(total_seconds: i64) -> String {
    let total = total_seconds.max(0);
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;
    format!("{hours}:{minutes:02}:{seconds:02}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_sort_parses_known_values() {
        assert_eq!("name".parse::<TaskSort>(), Ok(TaskSort::Name));
        assert_eq!("ACCUMULATED".parse::<TaskSort>(), Ok(TaskSort::Accumulated));
        assert_eq!(" time ".parse::<TaskSort>(), Ok(TaskSort::Accumulated));
        assert_eq!("id".parse::<TaskSort>(), Ok(TaskSort::Id));
    }

    #[test]
    fn task_sort_rejects_unknown_value_with_hint() {
        let err = "alphabetical"
            .parse::<TaskSort>()
            .expect_err("unknown sort should fail");
        assert!(err.contains("invalid task sort 'alphabetical'"));
        assert!(err.contains("name, accumulated, id"));
    }

    #[test]
    fn task_sort_serializes_as_snake_case() {
        let json = serde_json::to_string(&TaskSort::Accumulated).unwrap();
        assert_eq!(json, "\"accumulated\"");
    }

    #[test]
    fn task_sort_display_roundtrips_through_from_str() {
        for sort in [TaskSort::Name, TaskSort::Accumulated, TaskSort::Id] {
            assert_eq!(sort.to_string().parse::<TaskSort>(), Ok(sort));
        }
    }

    #[test]
    fn format_hms_renders_zero_and_subminute_counts() {
        assert_eq!(format_hms(0), "0:00:00");
        assert_eq!(format_hms(5), "0:00:05");
        assert_eq!(format_hms(59), "0:00:59");
    }

    #[test]
    fn format_hms_carries_minutes_and_hours() {
        assert_eq!(format_hms(60), "0:01:00");
        assert_eq!(format_hms(3601), "1:00:01");
        assert_eq!(format_hms(3600 * 27 + 62), "27:01:02");
    }

    #[test]
    fn format_hms_clamps_negative_counts() {
        assert_eq!(format_hms(-12), "0:00:00");
    }

    #[test]
    fn task_roundtrips_through_json() {
        let task = Task {
            id: TaskId::new(7),
            name: "Write docs".to_string(),
            description: Some("chapter two".to_string()),
            accumulated_seconds: 125,
        };
        let json = serde_json::to_string(&task).unwrap();
        let decoded: Task = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, task);
        assert_eq!(decoded.accumulated_hms(), "0:02:05");
    }

    #[test]
    fn ids_display_as_plain_integers() {
        assert_eq!(TaskId::new(42).to_string(), "42");
        assert_eq!(SessionId::new(9).to_string(), "9");
    }
}
