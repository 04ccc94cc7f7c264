//! CLI for the DLM download list manager.
//!
//! Every subcommand edits or inspects the persisted blobs directly; no
//! transfer is started from here.

mod commands;


use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use dlm_core::config;
use dlm_core::task::SortKey;

use commands::{
    open_store, run_add, run_limit, run_list, run_remove, run_rename, run_status, run_trash,
};

/// Top-level CLI for the DLM download list manager.
#[derive(Debug, Parser)]
#[command(name = "dlm")]
#[command(about = "DLM: download task list manager", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

/// Sort key argument; maps onto the maintained orderings.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum SortArg {
    Addtime,
    Name,
    Size,
    Type,
}

impl From<SortArg> for SortKey {
    fn from(arg: SortArg) -> Self {
        match arg {
            SortArg::Addtime => SortKey::AddTime,
            SortArg::Name => SortKey::Name,
            SortArg::Size => SortKey::Size,
            SortArg::Type => SortKey::Type,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Queue one or more download URLs as pending tasks.
    Add {
        /// Direct HTTP/HTTPS URLs.
        urls: Vec<String>,
    },

    /// List tasks in display order.
    List {
        /// Sort key (defaults to the persisted setting).
        #[arg(long, value_enum)]
        sort: Option<SortArg>,

        /// Reverse the ordering.
        #[arg(long)]
        desc: bool,

        /// Group the list under derived section headers.
        #[arg(long)]
        sections: bool,
    },

    /// Show per-state counts and totals.
    Status,

    /// Change a task's display name.
    Rename {
        /// Task URL.
        url: String,
        /// New display name.
        name: String,
    },

    /// Remove a task from the list (to the trash list when enabled).
    Remove {
        /// Task URL.
        url: String,
    },

    /// List the trash, or purge one entry from it.
    Trash {
        /// Drop this URL from the trash list.
        #[arg(long)]
        purge: Option<String>,
    },

    /// Show or change the concurrency limit (0 = unbounded).
    Limit {
        /// New limit; omit to print the current one.
        n: Option<usize>,
    },
}

impl CliCommand {
    pub fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);
        let store = open_store(&cfg)?;

        match cli.command {
            CliCommand::Add { urls } => run_add(&store, &urls)?,
            CliCommand::List {
                sort,
                desc,
                sections,
            } => run_list(&store, &cfg, sort.map(SortKey::from), desc, sections)?,
            CliCommand::Status => run_status(&store, &cfg)?,
            CliCommand::Rename { url, name } => run_rename(&store, &url, &name)?,
            CliCommand::Remove { url } => run_remove(&store, &cfg, &url)?,
            CliCommand::Trash { purge } => run_trash(&store, purge.as_deref())?,
            CliCommand::Limit { n } => run_limit(&store, &cfg, n)?,
        }

        Ok(())
    }
}
