use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::index::TaskIndex;
use super::task::{Priority, Task};

/// Error type for structural tree operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TreeError {
    #[error("task text cannot be empty")]
    EmptyText,
    #[error("no task at index {0}")]
    NotFound(TaskIndex),
    #[error("cannot move task {task} below itself ({parent})")]
    CyclicMove { task: TaskIndex, parent: TaskIndex },
}

/// The whole to-do list: an optional title plus an unnumbered root whose
/// children are the top-level tasks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskList {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default)]
    pub tasks: Vec<Task>,
}

impl TaskList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    /// Set the list title. A blank title clears it.
    pub fn set_title(&mut self, title: impl Into<String>) {
        let title = title.into();
        self.title = if title.trim().is_empty() {
            None
        } else {
            Some(title)
        };
    }

    /// Number of top-level tasks
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Top-level task at a 0-based position
    pub fn at(&self, i: usize) -> Option<&Task> {
        self.tasks.get(i)
    }

    /// Total number of tasks at every depth.
    pub fn count(&self) -> usize {
        self.tasks.iter().map(Task::subtree_size).sum()
    }

    // -----------------------------------------------------------------------
    // Lookup
    // -----------------------------------------------------------------------

    /// Resolve a dotted index. None if any segment is out of bounds.
    pub fn find(&self, index: &TaskIndex) -> Option<&Task> {
        let (first, rest) = index.segments().split_first()?;
        let mut task = self.tasks.get(first.checked_sub(1)?)?;
        for position in rest {
            task = task.subtasks.get(position.checked_sub(1)?)?;
        }
        Some(task)
    }

    pub fn find_mut(&mut self, index: &TaskIndex) -> Option<&mut Task> {
        let (first, rest) = index.segments().split_first()?;
        let mut task = self.tasks.get_mut(first.checked_sub(1)?)?;
        for position in rest {
            task = task.subtasks.get_mut(position.checked_sub(1)?)?;
        }
        Some(task)
    }

    /// Pre-order search of the whole tree.
    pub fn find_all<P>(&self, mut predicate: P) -> Vec<(TaskIndex, &Task)>
    where
        P: FnMut(&Task) -> bool,
    {
        self.iter().filter(|(_, task)| predicate(task)).collect()
    }

    /// Pre-order walk yielding every task with its current index.
    pub fn iter(&self) -> Walk<'_> {
        let stack = self
            .tasks
            .iter()
            .enumerate()
            .rev()
            .map(|(i, task)| (TaskIndex::top(i + 1), task))
            .collect();
        Walk { stack }
    }

    /// The child sequence of `parent`, or of the root when `parent` is None.
    fn children_mut(&mut self, parent: Option<&TaskIndex>) -> Option<&mut Vec<Task>> {
        match parent {
            None => Some(&mut self.tasks),
            Some(index) => self.find_mut(index).map(|task| &mut task.subtasks),
        }
    }

    // -----------------------------------------------------------------------
    // Structural mutation
    // -----------------------------------------------------------------------

    /// Append a new task under `parent` (the root when None). Returns its index.
    pub fn create(
        &mut self,
        parent: Option<&TaskIndex>,
        text: impl Into<String>,
        priority: Priority,
        now: DateTime<Utc>,
    ) -> Result<TaskIndex, TreeError> {
        let task = Task::new(text, priority, now)?;
        let children = match parent {
            None => &mut self.tasks,
            Some(p) => {
                &mut self
                    .find_mut(p)
                    .ok_or_else(|| TreeError::NotFound(p.clone()))?
                    .subtasks
            }
        };
        children.push(task);
        let position = children.len();
        Ok(match parent {
            None => TaskIndex::top(position),
            Some(p) => p.child(position),
        })
    }

    /// Detach a task (with its subtree). Later siblings shift down by one.
    pub fn remove(&mut self, index: &TaskIndex) -> Option<Task> {
        let parent = index.parent();
        let children = self.children_mut(parent.as_ref())?;
        let i = index.position() - 1;
        if i >= children.len() {
            return None;
        }
        Some(children.remove(i))
    }

    /// Remove several tasks resolved against the same tree state.
    ///
    /// Targets are removed last-first so no removal shifts a pending one.
    /// Targets inside another target's subtree go with it and are not
    /// returned separately. Returns removed tasks in index order.
    pub fn remove_all(&mut self, indices: &[TaskIndex]) -> Vec<Task> {
        let mut targets: Vec<TaskIndex> = indices.to_vec();
        targets.sort();
        targets.dedup();
        let roots: Vec<TaskIndex> = targets
            .iter()
            .filter(|index| !targets.iter().any(|other| index.is_descendant_of(other)))
            .cloned()
            .collect();

        let mut removed: Vec<Task> = roots
            .iter()
            .rev()
            .filter_map(|index| self.remove(index))
            .collect();
        removed.reverse();
        removed
    }

    /// Move a task and its subtree to the end of `new_parent`'s children
    /// (the root when None). Returns the task's new index.
    pub fn reparent(
        &mut self,
        index: &TaskIndex,
        new_parent: Option<&TaskIndex>,
    ) -> Result<TaskIndex, TreeError> {
        if self.find(index).is_none() {
            return Err(TreeError::NotFound(index.clone()));
        }
        if let Some(parent) = new_parent {
            if parent == index || parent.is_descendant_of(index) {
                return Err(TreeError::CyclicMove {
                    task: index.clone(),
                    parent: parent.clone(),
                });
            }
            if self.find(parent).is_none() {
                return Err(TreeError::NotFound(parent.clone()));
            }
        }

        // Removing the task shifts the target if it sits under a later sibling.
        let target = new_parent.map(|parent| shifted_after_removal(parent, index));

        let task = self
            .remove(index)
            .ok_or_else(|| TreeError::NotFound(index.clone()))?;
        let children = match target.as_ref() {
            None => &mut self.tasks,
            Some(parent) => {
                &mut self
                    .find_mut(parent)
                    .ok_or_else(|| TreeError::NotFound(parent.clone()))?
                    .subtasks
            }
        };
        children.push(task);
        let position = children.len();
        Ok(match target {
            None => TaskIndex::top(position),
            Some(parent) => parent.child(position),
        })
    }
}

/// Where `index` ends up once `removed` (not an ancestor of it) is detached.
fn shifted_after_removal(index: &TaskIndex, removed: &TaskIndex) -> TaskIndex {
    let level = removed.depth();
    let segments = index.segments();
    let removed_segments = removed.segments();
    if segments.len() > level
        && segments[..level] == removed_segments[..level]
        && segments[level] > removed_segments[level]
    {
        let mut shifted = segments.to_vec();
        shifted[level] -= 1;
        if let Some(shifted) = TaskIndex::from_segments(shifted) {
            return shifted;
        }
    }
    index.clone()
}

/// Pre-order iterator over a task list.
pub struct Walk<'a> {
    stack: Vec<(TaskIndex, &'a Task)>,
}

impl<'a> Iterator for Walk<'a> {
    type Item = (TaskIndex, &'a Task);

    fn next(&mut self) -> Option<Self::Item> {
        let (index, task) = self.stack.pop()?;
        for (i, sub) in task.subtasks.iter().enumerate().rev() {
            self.stack.push((index.child(i + 1), sub));
        }
        Some((index, task))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn idx(s: &str) -> TaskIndex {
        s.parse().unwrap()
    }

    fn flat(n: usize) -> TaskList {
        let mut list = TaskList::new();
        for i in 1..=n {
            list.create(None, format!("task {}", i), Priority::Medium, at(i as i64))
                .unwrap();
        }
        list
    }

    /// 1 A
    ///   1.1 A.A
    ///     1.1.1 A.A.A
    ///   1.2 A.B
    /// 2 B
    ///   2.1 B.A
    /// 3 C
    fn nested() -> TaskList {
        let mut list = TaskList::new();
        list.create(None, "A", Priority::Medium, at(1)).unwrap();
        list.create(Some(&idx("1")), "A.A", Priority::High, at(2)).unwrap();
        list.create(Some(&idx("1.1")), "A.A.A", Priority::Low, at(3)).unwrap();
        list.create(Some(&idx("1")), "A.B", Priority::Medium, at(4)).unwrap();
        list.create(None, "B", Priority::Medium, at(5)).unwrap();
        list.create(Some(&idx("2")), "B.A", Priority::Medium, at(6)).unwrap();
        list.create(None, "C", Priority::Medium, at(7)).unwrap();
        list
    }

    fn texts(list: &TaskList) -> Vec<(String, String)> {
        list.iter()
            .map(|(index, task)| (index.to_string(), task.text.clone()))
            .collect()
    }

    #[test]
    fn find_in_flat_list() {
        let list = flat(5);
        for i in 1..=5 {
            let task = list.find(&TaskIndex::top(i)).unwrap();
            assert_eq!(task.text, format!("task {}", i));
        }
        assert!(list.find(&TaskIndex::top(6)).is_none());
    }

    #[test]
    fn find_nested_and_out_of_bounds() {
        let list = nested();
        assert_eq!(list.find(&idx("1.1.1")).unwrap().text, "A.A.A");
        assert_eq!(list.find(&idx("2.1")).unwrap().text, "B.A");
        assert!(list.find(&idx("2.2")).is_none());
        assert!(list.find(&idx("3.1")).is_none());
        assert!(list.find(&idx("1.1.1.1")).is_none());
    }

    #[test]
    fn create_returns_index_and_validates() {
        let mut list = nested();
        let index = list.create(Some(&idx("2")), "B.B", Priority::Low, at(9)).unwrap();
        assert_eq!(index, idx("2.2"));
        assert_eq!(list.find(&index).unwrap().created, at(9));

        assert_eq!(
            list.create(Some(&idx("9")), "nope", Priority::Low, at(9)),
            Err(TreeError::NotFound(idx("9")))
        );
        assert_eq!(
            list.create(None, "", Priority::Low, at(9)),
            Err(TreeError::EmptyText)
        );
    }

    #[test]
    fn iter_is_pre_order() {
        let list = nested();
        let order: Vec<String> = texts(&list).into_iter().map(|(i, _)| i).collect();
        assert_eq!(order, vec!["1", "1.1", "1.1.1", "1.2", "2", "2.1", "3"]);
        assert_eq!(list.count(), 7);
    }

    #[test]
    fn find_all_follows_index_order() {
        let list = nested();
        let hits = list.find_all(|task| task.text.contains('A'));
        let found: Vec<String> = hits.iter().map(|(i, _)| i.to_string()).collect();
        assert_eq!(found, vec!["1", "1.1", "1.1.1", "1.2", "2.1"]);
    }

    #[test]
    fn remove_takes_subtree_and_shifts_siblings() {
        let mut list = nested();
        let removed = list.remove(&idx("1")).unwrap();
        assert_eq!(removed.subtree_size(), 4);
        assert_eq!(
            texts(&list),
            vec![
                ("1".to_string(), "B".to_string()),
                ("1.1".to_string(), "B.A".to_string()),
                ("2".to_string(), "C".to_string()),
            ]
        );
        assert!(list.remove(&idx("7")).is_none());
    }

    #[test]
    fn remove_all_is_stable_against_shifting() {
        let mut list = flat(5);
        let removed = list.remove_all(&[idx("2"), idx("4"), idx("2")]);
        let removed: Vec<&str> = removed.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(removed, vec!["task 2", "task 4"]);
        let left: Vec<&str> = list.tasks.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(left, vec!["task 1", "task 3", "task 5"]);
    }

    #[test]
    fn remove_all_skips_targets_inside_removed_subtrees() {
        let mut list = nested();
        let removed = list.remove_all(&[idx("1.1.1"), idx("1"), idx("2.1")]);
        assert_eq!(removed.len(), 2);
        assert_eq!(removed[0].text, "A");
        assert_eq!(removed[1].text, "B.A");
        assert_eq!(list.count(), 2);
    }

    #[test]
    fn reparent_moves_subtree_under_new_parent() {
        let mut list = nested();
        let new_index = list.reparent(&idx("1.1"), Some(&idx("3"))).unwrap();
        assert_eq!(new_index, idx("3.1"));
        let moved = list.find(&new_index).unwrap();
        assert_eq!(moved.text, "A.A");
        assert_eq!(moved.subtasks[0].text, "A.A.A");
        assert_eq!(list.find(&idx("1.1")).unwrap().text, "A.B");
    }

    #[test]
    fn reparent_accounts_for_shift_of_later_sibling() {
        let mut list = flat(3);
        let new_index = list.reparent(&idx("1"), Some(&idx("3"))).unwrap();
        assert_eq!(new_index, idx("2.1"));
        assert_eq!(list.find(&idx("2")).unwrap().text, "task 3");
        assert_eq!(list.find(&idx("2.1")).unwrap().text, "task 1");
    }

    #[test]
    fn reparent_to_root_appends() {
        let mut list = nested();
        let new_index = list.reparent(&idx("1.1"), None).unwrap();
        assert_eq!(new_index, idx("4"));
        assert_eq!(list.find(&idx("4.1")).unwrap().text, "A.A.A");
    }

    #[test]
    fn reparent_rejects_cycles_and_missing_nodes() {
        let mut list = nested();
        assert_eq!(
            list.reparent(&idx("1"), Some(&idx("1.1.1"))),
            Err(TreeError::CyclicMove {
                task: idx("1"),
                parent: idx("1.1.1"),
            })
        );
        assert!(matches!(
            list.reparent(&idx("1"), Some(&idx("1"))),
            Err(TreeError::CyclicMove { .. })
        ));
        assert_eq!(
            list.reparent(&idx("8"), None),
            Err(TreeError::NotFound(idx("8")))
        );
        assert_eq!(
            list.reparent(&idx("1"), Some(&idx("2.5"))),
            Err(TreeError::NotFound(idx("2.5")))
        );
        // Unchanged after failed moves
        assert_eq!(list, nested());
    }

    #[test]
    fn set_title_blank_clears() {
        let mut list = TaskList::new();
        list.set_title("Groceries");
        assert_eq!(list.title(), Some("Groceries"));
        list.set_title("  ");
        assert_eq!(list.title(), None);
    }

    #[test]
    fn shifted_after_removal_cases() {
        assert_eq!(shifted_after_removal(&idx("3.2"), &idx("1")), idx("2.2"));
        assert_eq!(shifted_after_removal(&idx("1.3"), &idx("1.2")), idx("1.2"));
        assert_eq!(shifted_after_removal(&idx("1.1"), &idx("1.2")), idx("1.1"));
        assert_eq!(shifted_after_removal(&idx("2"), &idx("1.2")), idx("2"));
    }
}
