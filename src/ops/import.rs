use std::fmt;
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;

use crate::model::index::TaskIndex;
use crate::model::list::{TaskList, TreeError};
use crate::model::task::Priority;

/// A source file to scan, already read by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: String,
    pub contents: String,
}

/// A comment marker found in source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Marker {
    pub text: String,
    pub priority: Priority,
}

/// Counts from one import run
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ImportResult {
    pub files: usize,
    pub added: usize,
    pub completed: usize,
    pub reopened: usize,
}

impl fmt::Display for ImportResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "imported {} file(s): {} added, {} completed, {} reopened",
            self.files, self.added, self.completed, self.reopened
        )
    }
}

const MARKER_PATTERN: &str =
    r"(?://+|#+|/\*+|--|;+|<!--)\s*(TODO|FIXME|XXX)\b(?:\([^)]*\))?:?\s*(.*?)\s*(?:\*/|-->)?\s*$";

static MARKER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(MARKER_PATTERN).expect("marker pattern is a valid regex"));

/// TODO/FIXME/XXX comments after a comment leader, in file order, without
/// duplicates.
pub fn scan_markers(contents: &str) -> Vec<Marker> {
    let mut markers: Vec<Marker> = Vec::new();
    for line in contents.lines() {
        let Some(caps) = MARKER_RE.captures(line) else {
            continue;
        };
        let text = caps[2].trim();
        if text.is_empty() || markers.iter().any(|m| m.text == text) {
            continue;
        }
        let priority = match &caps[1] {
            "TODO" => Priority::Medium,
            _ => Priority::High,
        };
        markers.push(Marker {
            text: text.to_string(),
            priority,
        });
    }
    markers
}

/// Synchronise one top-level task per file with the markers in that file.
///
/// New markers become subtasks, subtasks whose marker is gone are marked
/// done, and done subtasks whose marker came back are reopened.
pub fn import_sources(
    list: &mut TaskList,
    sources: &[SourceFile],
    now: DateTime<Utc>,
) -> Result<ImportResult, TreeError> {
    let mut result = ImportResult::default();
    for source in sources {
        let markers = scan_markers(&source.contents);
        tracing::debug!(path = %source.path, markers = markers.len(), "scanned source file");
        result.files += 1;

        let existing = list
            .tasks
            .iter()
            .position(|task| task.text == source.path)
            .map(|i| TaskIndex::top(i + 1));
        let file_index = match existing {
            Some(index) => index,
            None if markers.is_empty() => continue,
            None => match list.create(None, source.path.as_str(), Priority::Medium, now) {
                Ok(index) => index,
                Err(e) => {
                    tracing::warn!(path = %source.path, error = %e, "skipping source file");
                    continue;
                }
            },
        };

        let Some(file_task) = list.find_mut(&file_index) else {
            continue;
        };
        for child in file_task.subtasks.iter_mut() {
            let present = markers.iter().any(|m| m.text == child.text);
            match (present, child.is_completed()) {
                (true, true) => {
                    child.set_completion_time(None);
                    result.reopened += 1;
                }
                (false, false) => {
                    child.set_completed(now);
                    result.completed += 1;
                }
                _ => {}
            }
        }

        let new_markers: Vec<&Marker> = markers
            .iter()
            .filter(|m| !file_task.subtasks.iter().any(|child| child.text == m.text))
            .collect();
        for marker in new_markers {
            list.create(Some(&file_index), marker.text.as_str(), marker.priority, now)?;
            result.added += 1;
        }
    }
    Ok(result)
}
