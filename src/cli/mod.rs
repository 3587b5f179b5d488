//! Command-line interface for tm
//!
//! This module defines the CLI structure using clap derive macros.
//! Command implementations live in `task.rs`.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::Config;
use crate::controller::Controller;
use crate::error::Result;
use crate::notify::Notifier;
use crate::repository::TaskRepository;
use crate::storage::{FileBackend, SlotStore};

mod task;

/// Controller over the on-disk slot store
pub type FileController<N> = Controller<SlotStore<FileBackend>, N>;

/// tm - Task Master
///
/// Create, edit, complete, and delete timestamped tasks, and track how much
/// of the list is done.
#[derive(Parser, Debug)]
#[command(name = "tm")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the task store document
    #[arg(long, global = true, env = "TM_STORE")]
    pub store: Option<PathBuf>,

    /// Path to the config file
    #[arg(long, global = true, env = "TM_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Add a task
    Add {
        /// Task title (words are joined with spaces)
        #[arg(required = true, num_args = 1..)]
        title: Vec<String>,

        /// Due date: "DD/MM/YYYY HH:mm", RFC 3339, or epoch ms (default: now)
        #[arg(long)]
        due: Option<String>,
    },

    /// Change a task's title and/or due date
    Edit {
        /// List position (1-based), or task id with --id
        target: String,

        /// Treat TARGET as a task id
        #[arg(long)]
        id: bool,

        /// New title
        #[arg(long)]
        title: Option<String>,

        /// New due date
        #[arg(long)]
        due: Option<String>,
    },

    /// Toggle a task between complete and incomplete
    Done {
        /// List position (1-based), or task id with --id
        target: String,

        /// Treat TARGET as a task id
        #[arg(long)]
        id: bool,
    },

    /// Delete a task (asks for confirmation)
    Rm {
        /// List position (1-based), or task id with --id
        target: String,

        /// Treat TARGET as a task id
        #[arg(long)]
        id: bool,

        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },

    /// List tasks with progress
    #[command(alias = "ls")]
    List,

    /// Show completion progress
    Progress,

    /// Interactive terminal view
    Tui,
}

/// Resolved configuration and store location for one invocation
pub(crate) struct Context {
    pub config: Config,
    pub store_path: PathBuf,
}

impl Context {
    pub fn load(store: Option<PathBuf>, config: Option<PathBuf>) -> Result<Self> {
        let config = Config::resolve(config.as_deref())?;
        let store_path = config.storage_path(store.as_deref())?;
        tracing::debug!(store = %store_path.display(), "resolved task store");
        Ok(Self { config, store_path })
    }

    pub fn open_store(&self) -> SlotStore<FileBackend> {
        SlotStore::with_key(FileBackend::new(&self.store_path), self.config.store.key.clone())
    }

    pub fn controller<N: Notifier>(&self, notifier: N) -> FileController<N> {
        Controller::new(TaskRepository::open(self.open_store()), notifier)
    }
}

impl Cli {
    /// Execute the CLI command
    pub fn run(self) -> Result<()> {
        let ctx = Context::load(self.store, self.config)?;
        let output = crate::output::OutputOptions {
            json: self.json,
            quiet: self.quiet,
        };

        match self.command {
            Commands::Add { title, due } => task::run_add(
                &ctx,
                task::AddOptions {
                    title: title.join(" "),
                    due,
                },
                output,
            ),
            Commands::Edit {
                target,
                id,
                title,
                due,
            } => task::run_edit(
                &ctx,
                task::EditOptions {
                    target,
                    by_id: id,
                    title,
                    due,
                },
                output,
            ),
            Commands::Done { target, id } => task::run_done(&ctx, &target, id, output),
            Commands::Rm { target, id, yes } => task::run_rm(
                &ctx,
                task::RmOptions {
                    target,
                    by_id: id,
                    yes,
                },
                output,
            ),
            Commands::List => task::run_list(&ctx, output),
            Commands::Progress => task::run_progress(&ctx, output),
            Commands::Tui => {
                let controller = ctx.controller(crate::ui::StatusNotifier::default());
                crate::ui::run(controller, ctx.config.display.clone())
            }
        }
    }
}
