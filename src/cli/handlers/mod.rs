use std::fs;
use std::io::{self, Write};

use chrono::{DateTime, Utc};
use clap::CommandFactory;
use crossterm::tty::IsTty;

use crate::cli::commands::*;
use crate::cli::output::*;
use crate::io::config_io;
use crate::io::list_io::{load_list, save_list, ListPaths, LoadSource};
use crate::model::config::Config;
use crate::model::list::TaskList;
use crate::model::task::Priority;
use crate::model::view::{SortOrder, ViewOptions};
use crate::ops::import::SourceFile;
use crate::ops::task_ops::{self, Action, Outcome};
use crate::util::duration::parse_duration;

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

pub fn dispatch(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(Commands::Man) = cli.command {
        print!("{}", format_man_page(&Cli::command()));
        return Ok(());
    }

    let config = config_io::read_config()?;
    let paths = ListPaths::new(
        cli.file.clone().unwrap_or_else(|| config.file.clone().into()),
        cli.legacy_file
            .clone()
            .unwrap_or_else(|| config.legacy_file.clone().into()),
    );
    let json = cli.json;
    let action = build_action(cli, &config)?;
    let now = Utc::now();

    let (mut list, source) = load_list(&paths);
    match task_ops::apply(&mut list, action, now)? {
        Outcome::View(options) => show_view(&list, &options, &config, json, now)?,
        Outcome::Info(index) => {
            let task = list
                .find(&index)
                .ok_or_else(|| format!("no task at index {}", index))?;
            if json {
                println!("{}", serde_json::to_string_pretty(&info_to_json(task, &index, now))?);
            } else {
                print_lines(&format_task_detail(task, &index, now))?;
            }
        }
        Outcome::Changed(message) => {
            save_list(&paths.current, &list)?;
            if source == LoadSource::Legacy {
                tracing::info!(
                    from = %paths.legacy.display(),
                    to = %paths.current.display(),
                    "converted legacy list"
                );
            }
            println!("{}", message);
        }
    }
    Ok(())
}

/// Turn parsed arguments into an action. Config supplies defaults for
/// anything not given on the command line.
fn build_action(cli: Cli, config: &Config) -> Result<Action, Box<dyn std::error::Error>> {
    let action = match cli.command {
        None => Action::View(view_options(&cli.view, config)?),
        Some(Commands::View(args)) => Action::View(view_options(&args, config)?),
        Some(Commands::Add(args)) => Action::Add {
            text: args.text.join(" "),
            priority: match args.priority {
                Some(p) => p.parse()?,
                None => config.priority.parse::<Priority>()?,
            },
            graft: args.graft,
        },
        Some(Commands::Edit(args)) => Action::Edit {
            index: args.index,
            text: Some(args.text.join(" ")).filter(|t| !t.is_empty()),
            priority: args.priority.as_deref().map(str::parse::<Priority>).transpose()?,
        },
        Some(Commands::Rm(args)) => Action::Remove(args.indices),
        Some(Commands::Done(args)) => Action::MarkDone(args.indices),
        Some(Commands::Undone(args)) => Action::MarkNotDone(args.indices),
        Some(Commands::Mv(args)) => Action::Reparent {
            index: args.index,
            parent: args.parent,
        },
        Some(Commands::Title(args)) => Action::SetTitle(args.text.join(" ")),
        Some(Commands::Info(args)) => Action::Info(args.index),
        Some(Commands::Purge(args)) => Action::Purge(parse_duration(&args.age)?),
        Some(Commands::Import(args)) => Action::Import(read_sources(&args)?),
        Some(Commands::Man) => return Err("man page is printed before loading".into()),
    };
    Ok(action)
}

fn view_options(args: &ViewArgs, config: &Config) -> Result<ViewOptions, Box<dyn std::error::Error>> {
    let order: SortOrder = args.order.as_deref().unwrap_or(&config.order).parse()?;
    Ok(ViewOptions {
        show_all: args.all || config.show_all,
        summarise: args.summary || config.summarise,
        order,
    })
}

fn read_sources(args: &ImportArgs) -> Result<Vec<SourceFile>, Box<dyn std::error::Error>> {
    let mut sources = Vec::new();
    for path in &args.files {
        let contents = fs::read_to_string(path)
            .map_err(|e| format!("could not read {}: {}", path.display(), e))?;
        sources.push(SourceFile {
            path: path.display().to_string(),
            contents,
        });
    }
    Ok(sources)
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

fn show_view(
    list: &TaskList,
    options: &ViewOptions,
    config: &Config,
    json: bool,
    now: DateTime<Utc>,
) -> Result<(), Box<dyn std::error::Error>> {
    if json {
        println!("{}", serde_json::to_string_pretty(&list_to_json(list, options, now))?);
        return Ok(());
    }

    let tty = io::stdout().is_tty();
    let style = RenderStyle {
        color: tty && config.color && std::env::var_os("NO_COLOR").is_none(),
        width: if tty {
            crossterm::terminal::size().ok().map(|(w, _)| w as usize)
        } else {
            None
        },
    };
    print_lines(&format_tree(list, options, style, now))
}

fn print_lines(lines: &[String]) -> Result<(), Box<dyn std::error::Error>> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    for line in lines {
        writeln!(out, "{}", line)?;
    }
    Ok(())
}
