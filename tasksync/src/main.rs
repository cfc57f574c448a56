//! `tasksync`: command-line client for a synced task list.
//!
//! Keeps a local JSON task store and mirrors changes to a REST endpoint.
//! Configuration via CLI flags, environment variables, or config file
//! (`~/.config/tasksync/config.toml`).
//!
//! ```bash
//! # Start a local endpoint
//! cargo run --bin tasksync-server
//!
//! # Add a task and list everything
//! cargo run --bin tasksync -- add "Buy milk" --priority high
//! cargo run --bin tasksync -- list
//!
//! # Pull remote changes
//! TASKSYNC_URL=http://127.0.0.1:9000/ cargo run --bin tasksync -- sync
//! ```

use std::path::Path;
use std::process::ExitCode;

use clap::Parser;
use tracing_appender::non_blocking::WorkerGuard;

use tasksync::config::{CliArgs, ClientConfig, Command};
use tasksync::gateway::{HttpRemote, SyncGateway};
use tasksync::service::{self, Operation, SyncCommand, SyncEvent, SyncHandle};
use tasksync::store::FileStore;
use tasksync::tasks::{TaskEdit, TaskManager, TaskSection, group_sections};
use tasksync_proto::task::{Task, TaskDraft};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = CliArgs::parse();

    let config = match ClientConfig::load(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Warning: failed to load config file: {e}");
            ClientConfig::default()
        }
    };

    let _log_guard = init_logging(&cli.log_level, cli.log_file.as_deref());

    match run(cli.command.unwrap_or(Command::List), &config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("error: {message}");
            ExitCode::FAILURE
        }
    }
}

/// Initialize logging.
///
/// With `file_path`, logs go to that file through a non-blocking writer and
/// the returned [`WorkerGuard`] must be held until shutdown so buffered
/// entries are flushed. Without it, logs go to stderr so stdout stays clean.
fn init_logging(level: &str, file_path: Option<&Path>) -> Option<WorkerGuard> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let Some(log_path) = file_path else {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(env_filter)
            .init();
        return None;
    };

    let log_dir = log_path.parent()?;
    let file_name = log_path.file_name()?.to_str()?;

    let file_appender = tracing_appender::rolling::never(log_dir, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_env_filter(env_filter)
        .with_ansi(false)
        .init();

    Some(guard)
}

async fn run(command: Command, config: &ClientConfig) -> Result<(), String> {
    let store = FileStore::open(&config.store_path).map_err(|e| e.to_string())?;
    let remote =
        HttpRemote::new(&config.base_url, config.request_timeout).map_err(|e| e.to_string())?;
    let manager = TaskManager::new(SyncGateway::new(remote), store);

    if command == Command::List {
        let sections = manager.sections().map_err(|e| e.to_string())?;
        print_sections(&sections);
        return Ok(());
    }

    tracing::info!(base_url = %config.base_url, store = %config.store_path.display(), "tasksync starting");
    let SyncHandle {
        commands,
        mut events,
        worker,
    } = service::spawn_sync(manager, config.event_buffer);

    // The worker refreshes once on startup.
    let startup = events
        .recv()
        .await
        .ok_or_else(|| "sync worker stopped unexpectedly".to_string())?;

    let outcome = match to_sync_command(command) {
        None => startup,
        Some(cmd) => {
            if let SyncEvent::Failed { reason, .. } = &startup {
                eprintln!("Warning: could not refresh from remote: {reason}");
            }
            commands
                .send(cmd)
                .await
                .map_err(|_| "sync worker stopped unexpectedly".to_string())?;
            events
                .recv()
                .await
                .ok_or_else(|| "sync worker stopped unexpectedly".to_string())?
        }
    };

    drop(commands);
    if let Err(e) = worker.await {
        tracing::warn!(error = %e, "sync worker did not shut down cleanly");
    }

    report(outcome)
}

/// Maps a CLI subcommand to a worker command. `sync` is served by the
/// startup refresh and maps to `None`.
fn to_sync_command(command: Command) -> Option<SyncCommand> {
    match command {
        Command::List | Command::Sync => None,
        Command::Add {
            name,
            notes,
            priority,
            complete,
        } => {
            let mut draft = TaskDraft::new(name)
                .with_priority(priority)
                .with_complete(complete);
            draft.notes = notes;
            Some(SyncCommand::Create(draft))
        }
        Command::Toggle { id } => Some(SyncCommand::ToggleComplete(id)),
        Command::Edit {
            id,
            name,
            notes,
            clear_notes,
            priority,
        } => {
            let notes = if clear_notes { Some(None) } else { notes.map(Some) };
            Some(SyncCommand::Edit {
                id,
                edit: TaskEdit {
                    name,
                    notes,
                    priority,
                    complete: None,
                },
            })
        }
        Command::Delete { id } => Some(SyncCommand::Delete(id)),
    }
}

fn report(event: SyncEvent) -> Result<(), String> {
    match event {
        SyncEvent::Updated { operation, tasks } => {
            if operation != Operation::Refresh {
                println!("{operation}: ok");
            }
            print_sections(&group_sections(tasks));
            Ok(())
        }
        SyncEvent::Failed {
            operation, reason, ..
        } => Err(format!("{operation} failed: {reason}")),
    }
}

fn print_sections(sections: &[TaskSection]) {
    if sections.is_empty() {
        println!("No tasks.");
        return;
    }
    for section in sections {
        println!("{}", section.priority);
        for task in &section.tasks {
            println!("  {}", format_task(task));
        }
    }
}

fn format_task(task: &Task) -> String {
    let mark = if task.is_complete() { 'x' } else { ' ' };
    match task.notes() {
        Some(notes) => format!("[{mark}] {}  {} ({notes})", task.id(), task.name()),
        None => format!("[{mark}] {}  {}", task.id(), task.name()),
    }
}
