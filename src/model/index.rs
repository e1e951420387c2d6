use std::fmt;
use std::str::FromStr;

/// Error type for index parsing
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IndexError {
    #[error("invalid task index {0}")]
    Malformed(String),
    #[error("invalid task range {0}")]
    InvalidRange(String),
}

/// A dotted task index like `2.1.3`: 1-based child positions from the root down.
///
/// Indices are derived from position alone. They are valid only against the
/// tree they were resolved in and shift whenever an earlier sibling (or an
/// ancestor's earlier sibling) is removed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskIndex(Vec<usize>);

impl TaskIndex {
    /// Index of the `position`-th top-level task (1-based).
    pub fn top(position: usize) -> Self {
        TaskIndex(vec![position])
    }

    /// Build an index from 1-based segments. Returns None for an empty path or
    /// a zero segment.
    pub fn from_segments(segments: Vec<usize>) -> Option<Self> {
        if segments.is_empty() || segments.contains(&0) {
            return None;
        }
        Some(TaskIndex(segments))
    }

    pub fn segments(&self) -> &[usize] {
        &self.0
    }

    /// Nesting depth (0 = top-level)
    pub fn depth(&self) -> usize {
        self.0.len() - 1
    }

    /// Position among siblings (1-based)
    pub fn position(&self) -> usize {
        self.0[self.0.len() - 1]
    }

    /// The parent index, or None for a top-level task.
    pub fn parent(&self) -> Option<TaskIndex> {
        if self.0.len() == 1 {
            return None;
        }
        Some(TaskIndex(self.0[..self.0.len() - 1].to_vec()))
    }

    /// Index of this node's `position`-th child (1-based).
    pub fn child(&self, position: usize) -> TaskIndex {
        let mut segments = self.0.clone();
        segments.push(position);
        TaskIndex(segments)
    }

    /// Same parent, different last segment.
    pub fn sibling(&self, position: usize) -> TaskIndex {
        let mut segments = self.0.clone();
        let last = segments.len() - 1;
        segments[last] = position;
        TaskIndex(segments)
    }

    /// True if `self` lies strictly inside the subtree rooted at `other`.
    pub fn is_descendant_of(&self, other: &TaskIndex) -> bool {
        self.0.len() > other.0.len() && self.0.starts_with(&other.0)
    }
}

impl fmt::Display for TaskIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "{}", segment)?;
        }
        Ok(())
    }
}

impl FromStr for TaskIndex {
    type Err = IndexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let segments = s
            .split('.')
            .map(|part| {
                if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                    return None;
                }
                part.parse::<usize>().ok()
            })
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| IndexError::Malformed(s.to_string()))?;
        TaskIndex::from_segments(segments).ok_or_else(|| IndexError::Malformed(s.to_string()))
    }
}

/// True if the token should be treated as a range (`1.2-5`) rather than a
/// single index.
pub fn is_range(token: &str) -> bool {
    token.contains('-')
}

/// Expand a range token. `1.2-5` becomes `1.2 1.3 1.4 1.5`: only the last
/// segment of the left-hand index varies, up to the right-hand number.
///
/// Indices are produced lazily. A reversed range (`1.5-2`) expands to nothing.
/// Deciding whether that is acceptable is up to the caller.
pub fn expand_range(token: &str) -> Result<impl Iterator<Item = TaskIndex> + use<>, IndexError> {
    let invalid = || IndexError::InvalidRange(token.to_string());

    let (start, end) = token.split_once('-').ok_or_else(invalid)?;
    if end.contains('-') {
        return Err(invalid());
    }
    let start: TaskIndex = start.parse().map_err(|_| invalid())?;
    if end.is_empty() || !end.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    let end: usize = end.parse().map_err(|_| invalid())?;

    Ok((start.position()..=end).map(move |n| start.sibling(n)))
}
