use chrono::{DateTime, SecondsFormat, Utc};
use crossterm::style::Stylize;
use serde::Serialize;

use crate::model::index::TaskIndex;
use crate::model::list::TaskList;
use crate::model::task::{Priority, Task};
use crate::model::view::{arrange, SortKey, SortOrder, ViewOptions};
use crate::util::duration::format_duration;
use crate::util::text::{display_width, first_line, fit_width};

/// Marker appended to completed tasks
const DONE_MARK: &str = " ✓";

// ---------------------------------------------------------------------------
// JSON output structs
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct TaskJson {
    pub index: String,
    pub text: String,
    pub priority: Priority,
    pub created: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub subtasks: Vec<TaskJson>,
}

#[derive(Serialize)]
pub struct TaskListJson {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub tasks: Vec<TaskJson>,
}

#[derive(Serialize)]
pub struct TaskInfoJson {
    #[serde(flatten)]
    pub task: TaskJson,
    pub duration_secs: i64,
    pub subtask_count: usize,
}

// ---------------------------------------------------------------------------
// Conversions
// ---------------------------------------------------------------------------

/// The visible tree in display order, as it would be printed.
pub fn list_to_json(list: &TaskList, options: &ViewOptions, now: DateTime<Utc>) -> TaskListJson {
    TaskListJson {
        title: list.title.clone(),
        tasks: level_to_json(&list.tasks, None, options, now),
    }
}

fn level_to_json(
    tasks: &[Task],
    parent: Option<&TaskIndex>,
    options: &ViewOptions,
    now: DateTime<Utc>,
) -> Vec<TaskJson> {
    arrange(tasks, options, now)
        .into_iter()
        .map(|(position, task)| {
            let index = match parent {
                Some(p) => p.child(position),
                None => TaskIndex::top(position),
            };
            TaskJson {
                index: index.to_string(),
                text: task.text.clone(),
                priority: task.priority,
                created: task.created,
                completed: task.completed,
                subtasks: level_to_json(&task.subtasks, Some(&index), options, now),
            }
        })
        .collect()
}

/// A single task with all of its subtasks, regardless of view options.
pub fn info_to_json(task: &Task, index: &TaskIndex, now: DateTime<Utc>) -> TaskInfoJson {
    let options = ViewOptions {
        show_all: true,
        order: SortOrder {
            key: SortKey::Index,
            reversed: false,
        },
        ..Default::default()
    };
    TaskInfoJson {
        task: TaskJson {
            index: index.to_string(),
            text: task.text.clone(),
            priority: task.priority,
            created: task.created,
            completed: task.completed,
            subtasks: level_to_json(&task.subtasks, Some(index), &options, now),
        },
        duration_secs: task.duration(now).num_seconds(),
        subtask_count: task.subtree_size() - 1,
    }
}

// ---------------------------------------------------------------------------
// Human-readable formatting
// ---------------------------------------------------------------------------

/// How the console renderer should draw
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderStyle {
    /// Emit ANSI colours
    pub color: bool,
    /// Terminal width in cells, used by summary mode
    pub width: Option<usize>,
}

/// Format the visible tree: title, then one entry per task, indented by depth.
pub fn format_tree(list: &TaskList, options: &ViewOptions, style: RenderStyle, now: DateTime<Utc>) -> Vec<String> {
    let mut lines = Vec::new();
    if let Some(title) = list.title() {
        if style.color {
            lines.push(title.bold().to_string());
        } else {
            lines.push(title.to_string());
        }
        lines.push(String::new());
    }
    format_level(&list.tasks, 0, options, style, now, &mut lines);
    lines
}

fn format_level(
    tasks: &[Task],
    depth: usize,
    options: &ViewOptions,
    style: RenderStyle,
    now: DateTime<Utc>,
    lines: &mut Vec<String>,
) {
    for (position, task) in arrange(tasks, options, now) {
        lines.extend(format_task(task, position, depth, options.summarise, style));
        format_level(&task.subtasks, depth + 1, options, style, now, lines);
    }
}

/// `    ` per depth level, the position right-aligned in 3 columns, then the
/// text. Continuation lines line up under the text.
fn format_task(task: &Task, position: usize, depth: usize, summarise: bool, style: RenderStyle) -> Vec<String> {
    let prefix = format!("{}{:>3}. ", "    ".repeat(depth), position);
    let hang = " ".repeat(display_width(&prefix));
    let mark = if task.is_completed() { DONE_MARK } else { "" };

    let mut text_lines: Vec<String> = if summarise {
        let line = first_line(&task.text);
        let fitted = match style.width {
            Some(width) => {
                let room = width.saturating_sub(display_width(&prefix) + display_width(mark));
                fit_width(line, room.max(1)).into_owned()
            }
            None => line.to_string(),
        };
        vec![fitted]
    } else {
        task.text.lines().map(str::to_string).collect()
    };
    if text_lines.is_empty() {
        text_lines.push(String::new());
    }
    if let Some(last) = text_lines.last_mut() {
        last.push_str(mark);
    }

    text_lines
        .iter()
        .enumerate()
        .map(|(i, text)| {
            let lead = if i == 0 { prefix.as_str() } else { hang.as_str() };
            format!("{}{}", lead, paint(text, task, style.color))
        })
        .collect()
}

fn paint(text: &str, task: &Task, color: bool) -> String {
    if !color {
        return text.to_string();
    }
    let styled = text.stylize();
    let styled = match task.priority {
        Priority::VeryHigh => styled.red().bold(),
        Priority::High => styled.yellow(),
        Priority::Medium => styled,
        Priority::Low => styled.blue(),
        Priority::VeryLow => styled.dark_grey(),
    };
    if task.is_completed() {
        styled.dim().to_string()
    } else {
        styled.to_string()
    }
}

fn timestamp(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Format detailed task view
pub fn format_task_detail(task: &Task, index: &TaskIndex, now: DateTime<Utc>) -> Vec<String> {
    let mut lines = Vec::new();
    let field = |name: &str, value: String| format!("{:<11}{}", format!("{}:", name), value);

    lines.push(field("index", index.to_string()));
    let mut text = task.text.lines();
    lines.push(field("text", text.next().unwrap_or_default().to_string()));
    for more in text {
        lines.push(format!("{:<11}{}", "", more));
    }
    lines.push(field("priority", task.priority.to_string()));
    lines.push(field("created", timestamp(task.created)));
    lines.push(field(
        "completed",
        task.completed.map(timestamp).unwrap_or_else(|| "no".to_string()),
    ));
    lines.push(field("duration", format_duration(task.duration(now))));
    lines.push(field("subtasks", (task.subtree_size() - 1).to_string()));
    lines
}

// ---------------------------------------------------------------------------
// Manual page
// ---------------------------------------------------------------------------

/// Render a roff manual page from the command definition.
pub fn format_man_page(cmd: &clap::Command) -> String {
    let name = cmd.get_name().to_string();
    let mut out = String::new();
    out.push_str(&format!(
        ".TH {} 1 \"\" \"{} {}\"\n",
        name.to_uppercase(),
        name,
        cmd.get_version().unwrap_or_default()
    ));
    out.push_str(".SH NAME\n");
    out.push_str(&format!(
        "{} \\- {}\n",
        name,
        roff_escape(&cmd.get_about().map(|s| s.to_string()).unwrap_or_default())
    ));
    out.push_str(".SH SYNOPSIS\n");
    out.push_str(&format!("\\fB{}\\fR [\\fIOPTIONS\\fR] [\\fICOMMAND\\fR]\n", name));

    out.push_str(".SH OPTIONS\n");
    for arg in cmd.get_arguments().filter(|a| !a.is_positional() && !a.is_hide_set()) {
        push_arg(&mut out, arg);
    }

    out.push_str(".SH COMMANDS\n");
    for sub in cmd.get_subcommands().filter(|s| !s.is_hide_set()) {
        let usage: Vec<String> = sub
            .get_arguments()
            .filter(|a| a.is_positional())
            .map(|a| format!("\\fI{}\\fR", a.get_id().as_str().to_uppercase()))
            .collect();
        out.push_str(".TP\n");
        out.push_str(&format!("\\fB{}\\fR {}\n", sub.get_name(), usage.join(" ")).trim_end().to_string());
        out.push('\n');
        out.push_str(&format!(
            "{}\n",
            roff_escape(&sub.get_about().map(|s| s.to_string()).unwrap_or_default())
        ));
        for arg in sub
            .get_arguments()
            .filter(|a| !a.is_positional() && !a.is_global_set() && !a.is_hide_set())
            .filter(|a| a.get_id() != "help")
        {
            out.push_str(".RS\n");
            push_arg(&mut out, arg);
            out.push_str(".RE\n");
        }
    }

    out.push_str(".SH ENVIRONMENT\n");
    out.push_str(".TP\n\\fBTWIG_CONFIG\\fR\nPath of the config file.\n");
    out.push_str(".TP\n\\fBTWIG_LOG\\fR\nLog filter, e.g. debug.\n");
    out.push_str(".TP\n\\fBNO_COLOR\\fR\nDisable coloured output.\n");
    out
}

fn push_arg(out: &mut String, arg: &clap::Arg) {
    let mut names = Vec::new();
    if let Some(short) = arg.get_short() {
        names.push(format!("\\fB\\-{}\\fR", short));
    }
    if let Some(long) = arg.get_long() {
        names.push(format!("\\fB\\-\\-{}\\fR", roff_escape(long)));
    }
    if names.is_empty() {
        return;
    }
    out.push_str(".TP\n");
    out.push_str(&names.join(", "));
    out.push('\n');
    if let Some(help) = arg.get_help() {
        out.push_str(&roff_escape(&help.to_string()));
        out.push('\n');
    }
}

fn roff_escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('-', "\\-")
}
