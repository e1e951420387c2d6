use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "twig",
    about = concat!("twig v", env!("CARGO_PKG_VERSION"), " - a hierarchical to-do list"),
    version,
    args_conflicts_with_subcommands = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Display options when no subcommand is given
    #[command(flatten)]
    pub view: ViewArgs,

    /// Task list file (default: .twig)
    #[arg(long, global = true, value_name = "PATH")]
    pub file: Option<PathBuf>,

    /// Legacy list file, read when the task list file is unusable (default: .todo)
    #[arg(long = "legacy-file", global = true, value_name = "PATH")]
    pub legacy_file: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show the task tree
    View(ViewArgs),
    /// Add a task
    Add(AddArgs),
    /// Change a task's text or priority
    Edit(EditArgs),
    /// Remove tasks and their subtasks
    Rm(TargetArgs),
    /// Mark tasks done
    Done(TargetArgs),
    /// Mark tasks not done
    Undone(TargetArgs),
    /// Move a task under another task, or to the top level
    Mv(MvArgs),
    /// Set the list title
    Title(TitleArgs),
    /// Show details for one task
    Info(InfoArgs),
    /// Remove tasks completed more than AGE ago
    Purge(PurgeArgs),
    /// Sync TODO/FIXME/XXX comments from source files
    Import(ImportArgs),
    /// Print a manual page
    #[command(hide = true)]
    Man,
}

// ---------------------------------------------------------------------------
// Read command args
// ---------------------------------------------------------------------------

#[derive(Args, Default)]
pub struct ViewArgs {
    /// Include completed tasks
    #[arg(short = 'A', long = "all")]
    pub all: bool,
    /// One line per task, cut to the terminal width
    #[arg(short, long = "summary")]
    pub summary: bool,
    /// Sort siblings by index, created, completed, text, priority, duration or done (prefix - to reverse)
    #[arg(long, value_name = "ORDER", allow_hyphen_values = true)]
    pub order: Option<String>,
}

#[derive(Args)]
pub struct InfoArgs {
    /// Task index, e.g. 2.1
    pub index: String,
}

// ---------------------------------------------------------------------------
// Write command args
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct AddArgs {
    /// Priority: veryhigh, high, medium, low, verylow
    #[arg(short, long)]
    pub priority: Option<String>,
    /// Add as the last subtask of this task
    #[arg(short, long, value_name = "INDEX")]
    pub graft: Option<String>,
    /// Task text
    #[arg(num_args = 1.., trailing_var_arg = true, allow_hyphen_values = true)]
    pub text: Vec<String>,
}

#[derive(Args)]
pub struct EditArgs {
    /// New priority
    #[arg(short, long)]
    pub priority: Option<String>,
    /// Task index
    pub index: String,
    /// New text (optional when -p is given)
    #[arg(num_args = 1.., trailing_var_arg = true, allow_hyphen_values = true)]
    pub text: Vec<String>,
}

#[derive(Args)]
pub struct TargetArgs {
    /// Task indices or ranges, e.g. 3 1.2-4
    pub indices: Vec<String>,
}

#[derive(Args)]
pub struct MvArgs {
    /// Task to move
    pub index: String,
    /// New parent (default: top level)
    pub parent: Option<String>,
}

#[derive(Args)]
pub struct TitleArgs {
    #[arg(num_args = 1.., trailing_var_arg = true, allow_hyphen_values = true)]
    pub text: Vec<String>,
}

#[derive(Args)]
pub struct PurgeArgs {
    /// Age such as 7d, 36h or 1h30m
    #[arg(allow_hyphen_values = true)]
    pub age: String,
}

#[derive(Args)]
pub struct ImportArgs {
    /// Source files to scan
    #[arg(required = true)]
    pub files: Vec<PathBuf>,
}
