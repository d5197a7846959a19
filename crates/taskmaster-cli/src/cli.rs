use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use taskmaster_core::{ConflictResolution, Priority};

#[derive(Parser)]
#[command(name = "taskmaster")]
#[command(about = "Manage tasks offline-first from the command line")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to a JSON config file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Skip the remote store: reads come from the local cache, writes fail
    #[arg(long, global = true)]
    pub offline: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List tasks, newest first
    #[command(alias = "ls")]
    List {
        /// Only tasks in this category (ID or unique prefix)
        #[arg(long, value_name = "ID")]
        category: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Create a task
    #[command(alias = "new")]
    Add {
        /// Task title
        title: Vec<String>,
        #[arg(short, long)]
        description: Option<String>,
        #[arg(short, long, value_enum, default_value_t = PriorityArg::Medium)]
        priority: PriorityArg,
        /// Due date (RFC 3339 or YYYY-MM-DD)
        #[arg(long, value_name = "DATE")]
        due: Option<String>,
        /// Category ID or unique prefix
        #[arg(long, value_name = "ID")]
        category: Option<String>,
    },
    /// Show one task
    Show {
        /// Task ID or unique ID prefix
        id: String,
        #[arg(long)]
        json: bool,
    },
    /// Edit a task
    Edit {
        /// Task ID or unique ID prefix
        id: String,
        #[arg(long)]
        title: Option<String>,
        /// New description (empty string clears it)
        #[arg(short, long)]
        description: Option<String>,
        #[arg(short, long, value_enum)]
        priority: Option<PriorityArg>,
        /// Due date (RFC 3339 or YYYY-MM-DD)
        #[arg(long, value_name = "DATE", conflicts_with = "clear_due")]
        due: Option<String>,
        #[arg(long)]
        clear_due: bool,
        /// Category ID or unique prefix
        #[arg(long, value_name = "ID", conflicts_with = "clear_category")]
        category: Option<String>,
        #[arg(long)]
        clear_category: bool,
    },
    /// Toggle a task's completion
    Done {
        /// Task ID or unique ID prefix
        id: String,
    },
    /// Delete a task
    #[command(alias = "rm")]
    Delete {
        /// Task ID or unique ID prefix
        id: String,
    },
    /// Search task titles and descriptions
    Search {
        /// Text to match; blank lists every task
        #[arg(default_value = "")]
        query: String,
        #[arg(long)]
        json: bool,
    },
    /// Manage categories
    Category {
        #[command(subcommand)]
        command: CategoryCommands,
    },
    /// Pull tasks and categories from the remote store
    Sync {
        /// Keep syncing on an interval until interrupted
        #[arg(long)]
        watch: bool,
        /// Seconds between runs in watch mode (defaults to the configured interval)
        #[arg(long, value_name = "SECS")]
        interval: Option<u64>,
        /// Settle detected conflicts with this strategy
        #[arg(long, value_enum)]
        resolve: Option<ResolveArg>,
    },
    /// Manage the stored session
    Auth {
        #[command(subcommand)]
        command: AuthCommands,
    },
    /// Generate shell completion scripts
    Completions {
        #[arg(value_enum)]
        shell: CompletionShell,
        /// Optional output path (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
pub enum CategoryCommands {
    /// List categories
    List {
        #[arg(long)]
        json: bool,
    },
    /// Create a category
    Add {
        name: String,
        /// Hex color, e.g. #3366CC
        #[arg(long, default_value = "#007AFF")]
        color: String,
        #[arg(long, default_value = "folder")]
        icon: String,
    },
    /// Delete a category (tasks keep their reference)
    Delete {
        /// Category ID or unique ID prefix
        id: String,
    },
}

#[derive(Subcommand)]
pub enum AuthCommands {
    /// Store a session for the remote store
    Login {
        #[arg(long, value_name = "ID")]
        user_id: String,
        /// Bearer token issued by the identity provider
        #[arg(long, value_name = "TOKEN")]
        token: String,
        #[arg(long, value_name = "EMAIL")]
        email: Option<String>,
        /// Token expiry as a unix timestamp
        #[arg(long, value_name = "UNIX")]
        expires_at: Option<i64>,
    },
    /// Show the stored session
    Status,
    /// Clear the stored session
    Logout,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum PriorityArg {
    Low,
    Medium,
    High,
}

impl From<PriorityArg> for Priority {
    fn from(value: PriorityArg) -> Self {
        match value {
            PriorityArg::Low => Self::Low,
            PriorityArg::Medium => Self::Medium,
            PriorityArg::High => Self::High,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum ResolveArg {
    KeepLocal,
    KeepRemote,
}

impl From<ResolveArg> for ConflictResolution {
    fn from(value: ResolveArg) -> Self {
        match value {
            ResolveArg::KeepLocal => Self::KeepLocal,
            ResolveArg::KeepRemote => Self::KeepRemote,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
}
