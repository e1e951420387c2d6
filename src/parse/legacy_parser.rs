use chrono::{DateTime, TimeZone, Utc};

use crate::model::list::TaskList;
use crate::model::task::{Priority, Task};

/// Spaces per nesting level
const INDENT_STEP: usize = 2;

/// Error type for the legacy text format
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("line {line}: {message}")]
pub struct LegacyError {
    pub line: usize,
    pub message: String,
}

impl LegacyError {
    fn new(line: &Line<'_>, message: impl Into<String>) -> Self {
        LegacyError {
            line: line.number,
            message: message.into(),
        }
    }
}

/// A non-blank source line with its 1-based line number
struct Line<'a> {
    number: usize,
    indent: usize,
    body: &'a str,
}

/// Parse the legacy line format into a task list.
///
/// Blank input gives an empty list.
pub fn parse_legacy(text: &str) -> Result<TaskList, LegacyError> {
    let lines: Vec<Line<'_>> = text
        .lines()
        .enumerate()
        .filter(|(_, raw)| !raw.trim().is_empty())
        .map(|(i, raw)| {
            let body = raw.trim_start_matches(' ');
            Line {
                number: i + 1,
                indent: raw.len() - body.len(),
                body: body.trim_end(),
            }
        })
        .collect();

    let mut list = TaskList::new();
    let mut idx = 0;
    if let Some(first) = lines.first()
        && first.indent == 0
        && let Some(title) = first.body.strip_prefix('#')
    {
        list.set_title(title.trim());
        idx = 1;
    }

    let (tasks, next_idx) = parse_tasks(&lines, idx, 0)?;
    if let Some(line) = lines.get(next_idx) {
        return Err(LegacyError::new(line, "unexpected indentation"));
    }
    list.tasks = tasks;
    Ok(list)
}

/// Parse sibling tasks at `indent`. Stops at the first line indented less.
fn parse_tasks(lines: &[Line<'_>], start_idx: usize, indent: usize) -> Result<(Vec<Task>, usize), LegacyError> {
    let mut tasks = Vec::new();
    let mut idx = start_idx;

    while let Some(line) = lines.get(idx) {
        if line.indent < indent {
            break;
        }
        if line.indent > indent {
            return Err(LegacyError::new(line, "unexpected indentation"));
        }
        let (task, next_idx) = parse_single_task(lines, idx, indent)?;
        tasks.push(task);
        idx = next_idx;
    }

    Ok((tasks, idx))
}

/// Parse one task line, its metadata lines, then its subtasks.
fn parse_single_task(lines: &[Line<'_>], start_idx: usize, indent: usize) -> Result<(Task, usize), LegacyError> {
    let line = &lines[start_idx];
    let (done, priority, text) = parse_task_line(line)?;

    let mut created = None;
    let mut completed = None;
    let mut idx = start_idx + 1;
    let child_indent = indent + INDENT_STEP;

    while let Some(meta) = lines.get(idx) {
        if meta.indent != child_indent {
            break;
        }
        let Some((key, value)) = parse_metadata(meta.body) else {
            break;
        };
        match key {
            "created" => created = Some(parse_timestamp(meta, value)?),
            "completed" => completed = parse_timestamp(meta, value).map(Some)?,
            other => {
                return Err(LegacyError::new(meta, format!("unknown field '{}'", other)));
            }
        }
        idx += 1;
    }

    // Missing creation time reads as the Unix epoch
    let created = created.unwrap_or_default();
    let mut task = Task::new(text, priority, created).map_err(|e| LegacyError::new(line, e.to_string()))?;
    match (done, completed) {
        (true, None) => task.set_completion_time(Some(created)),
        (true, Some(at)) => task.set_completion_time(Some(at)),
        (false, _) => {}
    }

    let (subtasks, next_idx) = parse_tasks(lines, idx, child_indent)?;
    task.subtasks = subtasks;
    Ok((task, next_idx))
}

/// `- [ ] (high) text` or `- [x] text`
fn parse_task_line<'a>(line: &Line<'a>) -> Result<(bool, Priority, &'a str), LegacyError> {
    let rest = line
        .body
        .strip_prefix("- [")
        .ok_or_else(|| LegacyError::new(line, "expected a task line"))?;
    let (done, rest) = match rest.split_at_checked(2) {
        Some(("x]" | "X]", rest)) => (true, rest),
        Some((" ]", rest)) => (false, rest),
        _ => return Err(LegacyError::new(line, "expected [ ] or [x]")),
    };
    let rest = rest.trim_start();

    let (priority, text) = match rest.strip_prefix('(').and_then(|r| r.split_once(')')) {
        Some((name, text)) => {
            let priority = name
                .parse::<Priority>()
                .map_err(|e| LegacyError::new(line, e))?;
            (priority, text.trim())
        }
        None => (Priority::default(), rest),
    };
    Ok((done, priority, text))
}

/// `- key: value` with a lowercase ASCII key
fn parse_metadata(body: &str) -> Option<(&str, &str)> {
    let rest = body.strip_prefix("- ")?;
    let (key, value) = rest.split_once(':')?;
    if key.is_empty() || !key.bytes().all(|b| b.is_ascii_lowercase()) {
        return None;
    }
    Some((key, value.trim()))
}

/// RFC 3339 or Unix seconds
fn parse_timestamp(line: &Line<'_>, value: &str) -> Result<DateTime<Utc>, LegacyError> {
    if !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit()) {
        return value
            .parse::<i64>()
            .ok()
            .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
            .ok_or_else(|| LegacyError::new(line, format!("invalid timestamp '{}'", value)));
    }
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|_| LegacyError::new(line, format!("invalid timestamp '{}'", value)))
}
