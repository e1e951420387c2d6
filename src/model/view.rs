use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};

use super::task::Task;

/// Key used to order siblings for display
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    Index,
    Created,
    Completed,
    Text,
    Priority,
    Duration,
    Done,
}

impl SortKey {
    pub fn as_str(self) -> &'static str {
        match self {
            SortKey::Index => "index",
            SortKey::Created => "created",
            SortKey::Completed => "completed",
            SortKey::Text => "text",
            SortKey::Priority => "priority",
            SortKey::Duration => "duration",
            SortKey::Done => "done",
        }
    }
}

/// A sort key plus direction. Parsed from e.g. `priority` or `-created`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortOrder {
    pub key: SortKey,
    pub reversed: bool,
}

impl Default for SortOrder {
    fn default() -> Self {
        SortOrder {
            key: SortKey::Priority,
            reversed: false,
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.reversed {
            f.write_str("-")?;
        }
        f.write_str(self.key.as_str())
    }
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (reversed, name) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s),
        };
        let key = match name.to_lowercase().as_str() {
            "index" => SortKey::Index,
            "created" => SortKey::Created,
            "completed" => SortKey::Completed,
            "text" => SortKey::Text,
            "priority" => SortKey::Priority,
            "duration" => SortKey::Duration,
            "done" => SortKey::Done,
            _ => {
                return Err(format!(
                    "unknown order '{}' (expected: index, created, completed, text, priority, duration, done)",
                    s
                ));
            }
        };
        Ok(SortOrder { key, reversed })
    }
}

/// Display-only options. Never changes storage order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ViewOptions {
    /// Include completed tasks
    pub show_all: bool,
    /// One line per task, truncated to the terminal width
    pub summarise: bool,
    pub order: SortOrder,
}

impl ViewOptions {
    pub fn is_visible(&self, task: &Task) -> bool {
        self.show_all || !task.is_completed()
    }
}

/// Visible siblings in display order, each paired with its 1-based storage
/// position (which is what the index shows).
pub fn arrange<'a>(tasks: &'a [Task], options: &ViewOptions, now: DateTime<Utc>) -> Vec<(usize, &'a Task)> {
    let mut visible: Vec<(usize, &Task)> = tasks
        .iter()
        .enumerate()
        .filter(|(_, task)| options.is_visible(task))
        .map(|(i, task)| (i + 1, task))
        .collect();

    // Stable sort: ties keep storage order
    visible.sort_by(|(_, a), (_, b)| compare(a, b, options.order.key, now));
    if options.order.reversed {
        visible.reverse();
    }
    visible
}

fn compare(a: &Task, b: &Task, key: SortKey, now: DateTime<Utc>) -> Ordering {
    match key {
        SortKey::Index => Ordering::Equal,
        SortKey::Created => a.created.cmp(&b.created),
        SortKey::Completed => match (a.completed, b.completed) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        },
        SortKey::Text => a.text.to_lowercase().cmp(&b.text.to_lowercase()),
        SortKey::Priority => a.priority.cmp(&b.priority),
        SortKey::Duration => a.duration(now).cmp(&b.duration(now)),
        SortKey::Done => a.is_completed().cmp(&b.is_completed()),
    }
}
