use chrono::{DateTime, TimeDelta, Utc};

use crate::model::index::TaskIndex;
use crate::model::list::{TaskList, TreeError};
use crate::model::task::Priority;
use crate::model::view::ViewOptions;
use crate::ops::import::{import_sources, SourceFile};
use crate::util::duration::format_duration;
use crate::ops::resolve::{resolve_one, resolve_references};

/// Error type for task operations
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    #[error("invalid task index {0}")]
    InvalidIndex(String),
    #[error("invalid graft target {0}")]
    InvalidGraft(String),
    #[error("invalid task range {0}")]
    InvalidRange(String),
    #[error("{0}")]
    EmptyInput(&'static str),
    #[error(transparent)]
    Tree(#[from] TreeError),
    #[error("purge age {0} is out of range")]
    AgeOutOfRange(String),
}

/// One parsed command, ready to apply to a loaded list.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    View(ViewOptions),
    Add {
        text: String,
        priority: Priority,
        /// Parent index; None adds at the top level
        graft: Option<String>,
    },
    Edit {
        index: String,
        text: Option<String>,
        priority: Option<Priority>,
    },
    Remove(Vec<String>),
    MarkDone(Vec<String>),
    MarkNotDone(Vec<String>),
    Reparent {
        index: String,
        /// New parent; None moves to the top level
        parent: Option<String>,
    },
    SetTitle(String),
    Info(String),
    /// Remove tasks completed more than this long ago
    Purge(TimeDelta),
    Import(Vec<SourceFile>),
}

/// What happened, so the caller knows whether to render or save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    View(ViewOptions),
    Info(TaskIndex),
    /// The list was modified; the message is for the user.
    Changed(String),
}

/// Apply one action. Every index is resolved before anything is modified,
/// so a failed action leaves the list untouched.
pub fn apply(list: &mut TaskList, action: Action, now: DateTime<Utc>) -> Result<Outcome, TaskError> {
    match action {
        Action::View(options) => Ok(Outcome::View(options)),
        Action::Info(token) => Ok(Outcome::Info(resolve_one(list, &token)?)),
        Action::Add {
            text,
            priority,
            graft,
        } => add(list, &text, priority, graft.as_deref(), now),
        Action::Edit {
            index,
            text,
            priority,
        } => edit(list, &index, text.as_deref(), priority),
        Action::Remove(tokens) => remove(list, &tokens),
        Action::MarkDone(tokens) => mark_done(list, &tokens, now),
        Action::MarkNotDone(tokens) => mark_not_done(list, &tokens),
        Action::Reparent { index, parent } => reparent(list, &index, parent.as_deref()),
        Action::SetTitle(title) => set_title(list, &title),
        Action::Purge(age) => purge(list, age, now),
        Action::Import(sources) => {
            let result = import_sources(list, &sources, now)?;
            Ok(Outcome::Changed(result.to_string()))
        }
    }
}

// ---------------------------------------------------------------------------
// Create / edit
// ---------------------------------------------------------------------------

pub fn add(
    list: &mut TaskList,
    text: &str,
    priority: Priority,
    graft: Option<&str>,
    now: DateTime<Utc>,
) -> Result<Outcome, TaskError> {
    if text.trim().is_empty() {
        return Err(TaskError::EmptyInput("expected text for new task"));
    }
    let parent = match graft {
        None => None,
        Some(token) => Some(
            resolve_one(list, token).map_err(|_| TaskError::InvalidGraft(token.to_string()))?,
        ),
    };
    let index = list.create(parent.as_ref(), text, priority, now)?;
    Ok(Outcome::Changed(format!("added {}", index)))
}

pub fn edit(
    list: &mut TaskList,
    token: &str,
    text: Option<&str>,
    priority: Option<Priority>,
) -> Result<Outcome, TaskError> {
    let index = resolve_one(list, token)?;
    let text = text.filter(|t| !t.trim().is_empty());
    if text.is_none() && priority.is_none() {
        return Err(TaskError::EmptyInput("expected new text or priority"));
    }
    let task = list
        .find_mut(&index)
        .ok_or_else(|| TaskError::InvalidIndex(index.to_string()))?;
    if let Some(text) = text {
        task.set_text(text)?;
    }
    if let Some(priority) = priority {
        task.set_priority(priority);
    }
    Ok(Outcome::Changed(format!("edited {}", index)))
}

pub fn set_title(list: &mut TaskList, title: &str) -> Result<Outcome, TaskError> {
    if title.trim().is_empty() {
        return Err(TaskError::EmptyInput("expected text for title"));
    }
    list.set_title(title);
    Ok(Outcome::Changed("title set".to_string()))
}

// ---------------------------------------------------------------------------
// Batch actions
// ---------------------------------------------------------------------------

pub fn remove(list: &mut TaskList, tokens: &[String]) -> Result<Outcome, TaskError> {
    let targets = resolve_references(list, tokens)?;
    let removed = list.remove_all(&targets);
    let count: usize = removed.iter().map(|task| task.subtree_size()).sum();
    Ok(Outcome::Changed(format!("removed {}", plural(count))))
}

pub fn mark_done(list: &mut TaskList, tokens: &[String], now: DateTime<Utc>) -> Result<Outcome, TaskError> {
    let targets = resolve_references(list, tokens)?;
    for index in &targets {
        if let Some(task) = list.find_mut(index) {
            task.set_completed(now);
        }
    }
    Ok(Outcome::Changed(format!("marked {} done", plural(targets.len()))))
}

pub fn mark_not_done(list: &mut TaskList, tokens: &[String]) -> Result<Outcome, TaskError> {
    let targets = resolve_references(list, tokens)?;
    for index in &targets {
        if let Some(task) = list.find_mut(index) {
            task.set_completion_time(None);
        }
    }
    Ok(Outcome::Changed(format!(
        "marked {} not done",
        plural(targets.len())
    )))
}

// ---------------------------------------------------------------------------
// Structure
// ---------------------------------------------------------------------------

pub fn reparent(list: &mut TaskList, token: &str, parent: Option<&str>) -> Result<Outcome, TaskError> {
    let index = resolve_one(list, token)?;
    let parent = parent.map(|p| resolve_one(list, p)).transpose()?;
    let moved = list.reparent(&index, parent.as_ref())?;
    Ok(Outcome::Changed(format!("moved {} to {}", index, moved)))
}

/// Remove every task completed before `now - age`, subtree included.
pub fn purge(list: &mut TaskList, age: TimeDelta, now: DateTime<Utc>) -> Result<Outcome, TaskError> {
    let cutoff = now
        .checked_sub_signed(age)
        .ok_or_else(|| TaskError::AgeOutOfRange(format_duration(age)))?;
    let targets: Vec<TaskIndex> = list
        .find_all(|task| task.completed.is_some_and(|done| done < cutoff))
        .into_iter()
        .map(|(index, _)| index)
        .collect();
    let removed = list.remove_all(&targets);
    let count: usize = removed.iter().map(|task| task.subtree_size()).sum();
    Ok(Outcome::Changed(format!("purged {}", plural(count))))
}

fn plural(n: usize) -> String {
    if n == 1 {
        "1 task".to_string()
    } else {
        format!("{} tasks", n)
    }
}
