use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use super::list::TreeError;

/// Task priority, highest first
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    VeryHigh,
    High,
    #[default]
    Medium,
    Low,
    VeryLow,
}

impl Priority {
    pub const ALL: [Priority; 5] = [
        Priority::VeryHigh,
        Priority::High,
        Priority::Medium,
        Priority::Low,
        Priority::VeryLow,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Priority::VeryHigh => "veryhigh",
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
            Priority::VeryLow => "verylow",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .collect::<String>()
            .to_lowercase();
        match normalized.as_str() {
            "veryhigh" => Ok(Priority::VeryHigh),
            "high" => Ok(Priority::High),
            "medium" => Ok(Priority::Medium),
            "low" => Ok(Priority::Low),
            "verylow" => Ok(Priority::VeryLow),
            _ => Err(format!(
                "unknown priority '{}' (expected: veryhigh, high, medium, low, verylow)",
                s
            )),
        }
    }
}

/// A node in the task tree. Owns its subtasks; has no link back to its parent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub text: String,
    #[serde(default)]
    pub priority: Priority,
    pub created: DateTime<Utc>,
    /// None = not done
    #[serde(
        default,
        deserialize_with = "deserialize_completion",
        skip_serializing_if = "Option::is_none"
    )]
    pub completed: Option<DateTime<Utc>>,
    /// Subtasks in storage order; position here defines the dotted index.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subtasks: Vec<Task>,
}

impl Task {
    /// Create a detached leaf. Fails if `text` is blank.
    pub fn new(
        text: impl Into<String>,
        priority: Priority,
        created: DateTime<Utc>,
    ) -> Result<Self, TreeError> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(TreeError::EmptyText);
        }
        Ok(Task {
            text,
            priority,
            created,
            completed: None,
            subtasks: Vec::new(),
        })
    }

    /// Append a new leaf as the last subtask and return it.
    pub fn create(
        &mut self,
        text: impl Into<String>,
        priority: Priority,
        now: DateTime<Utc>,
    ) -> Result<&mut Task, TreeError> {
        let task = Task::new(text, priority, now)?;
        self.subtasks.push(task);
        let last = self.subtasks.len() - 1;
        Ok(&mut self.subtasks[last])
    }

    pub fn set_text(&mut self, text: impl Into<String>) -> Result<(), TreeError> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(TreeError::EmptyText);
        }
        self.text = text;
        Ok(())
    }

    pub fn set_priority(&mut self, priority: Priority) {
        self.priority = priority;
    }

    /// Mark done at `now`. A task that is already done keeps its first
    /// completion time.
    pub fn set_completed(&mut self, now: DateTime<Utc>) {
        if self.completed.is_none() {
            self.completed = Some(now);
        }
    }

    /// Direct setter; `None` marks the task not done.
    pub fn set_completion_time(&mut self, completed: Option<DateTime<Utc>>) {
        self.completed = completed;
    }

    pub fn is_completed(&self) -> bool {
        self.completed.is_some()
    }

    /// Time from creation to completion, or to `now` if still open.
    pub fn duration(&self, now: DateTime<Utc>) -> TimeDelta {
        self.completed.unwrap_or(now) - self.created
    }

    /// Subtask at a 0-based position
    pub fn at(&self, i: usize) -> Option<&Task> {
        self.subtasks.get(i)
    }

    pub fn len(&self) -> usize {
        self.subtasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subtasks.is_empty()
    }

    /// Number of nodes in this subtree, including self.
    pub fn subtree_size(&self) -> usize {
        1 + self.subtasks.iter().map(Task::subtree_size).sum::<usize>()
    }
}

/// Older writers stored "not done" as a zero timestamp instead of omitting it.
fn deserialize_completion<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<DateTime<Utc>>::deserialize(deserializer)?;
    Ok(value.filter(|t| t.timestamp() > 0))
}
