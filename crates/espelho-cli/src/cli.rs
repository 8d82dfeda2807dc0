use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "espelho")]
#[command(about = "Offline-first task mirror and sync engine")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to the local database file
    #[arg(long, global = true, value_name = "PATH", default_value = "espelho.db")]
    pub db_path: PathBuf,

    /// Sync API base URL (required for sync/pull)
    #[arg(long, global = true, value_name = "URL")]
    pub endpoint: Option<String>,

    /// Acting user's email (required for sync/pull)
    #[arg(long, global = true, value_name = "EMAIL")]
    pub email: Option<String>,

    /// Bearer token for the sync API
    #[arg(long, global = true, value_name = "TOKEN")]
    pub token: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a task locally (queued for upload)
    Add {
        /// Task title
        title: Vec<String>,
        /// Owning user id
        #[arg(long, default_value = "1")]
        user: i64,
        /// Workspace to link the task to
        #[arg(long)]
        workspace: Option<i64>,
    },
    /// List tasks for a user
    List {
        #[arg(long, default_value = "1")]
        user: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show one task with its categories
    Show {
        /// Task id
        id: i64,
    },
    /// Delete a task locally (queued for upload)
    Delete {
        /// Task id
        id: i64,
    },
    /// Show the pending-operation log
    Log,
    /// Upload pending operations to the server
    Sync,
    /// Replace the local mirror with a fresh server snapshot
    Pull,
    /// Show sync state and local row counts
    Status,
    /// Wipe all mirrored data (pending operations are kept)
    Reset,
}
