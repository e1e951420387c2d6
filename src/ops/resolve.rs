use crate::model::index::{expand_range, is_range, TaskIndex};
use crate::model::list::TaskList;
use crate::ops::task_ops::TaskError;

/// Turn command-line index tokens into indices of existing tasks.
///
/// Ranges are expanded in place and output order follows the tokens. Any
/// token that does not resolve fails the whole batch, and so does a batch
/// that resolves to nothing at all.
pub fn resolve_references(list: &TaskList, tokens: &[String]) -> Result<Vec<TaskIndex>, TaskError> {
    if tokens.is_empty() {
        return Err(TaskError::EmptyInput("no tasks given"));
    }

    let mut resolved = Vec::new();
    for token in tokens {
        let token = token.trim();
        if is_range(token) {
            let expanded =
                expand_range(token).map_err(|_| TaskError::InvalidRange(token.to_string()))?;
            for index in expanded {
                if list.find(&index).is_none() {
                    return Err(TaskError::InvalidIndex(index.to_string()));
                }
                resolved.push(index);
            }
        } else {
            resolved.push(resolve_one(list, token)?);
        }
    }

    if resolved.is_empty() {
        return Err(TaskError::EmptyInput("no tasks matched"));
    }
    Ok(resolved)
}

/// Resolve a single dotted index. Ranges are not accepted here.
pub fn resolve_one(list: &TaskList, token: &str) -> Result<TaskIndex, TaskError> {
    let token = token.trim();
    let index: TaskIndex = token
        .parse()
        .map_err(|_| TaskError::InvalidIndex(token.to_string()))?;
    if list.find(&index).is_none() {
        return Err(TaskError::InvalidIndex(token.to_string()));
    }
    Ok(index)
}
