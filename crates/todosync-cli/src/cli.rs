use std::path::PathBuf;

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use todosync_core::models::{ResolutionChoice, SyncMode};
use todosync_core::DocumentScope;

#[derive(Parser)]
#[command(name = "todosync")]
#[command(about = "Keep a todo list in sync with a GitHub Gist")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Directory holding settings and the local cache
    #[arg(long, global = true, value_name = "PATH")]
    pub data_dir: Option<PathBuf>,

    /// Document scope to act on (user or workspace)
    #[arg(long, global = true, value_parser = parse_scope)]
    pub scope: Option<DocumentScope>,

    /// Named collection inside the document, e.g. a workspace file path
    #[arg(long, global = true, value_name = "PATH")]
    pub file: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Add a todo
    #[command(alias = "new")]
    Add {
        /// Todo text
        text: Vec<String>,
        /// Render the text as markdown
        #[arg(long)]
        markdown: bool,
        /// Store as a note rather than a task
        #[arg(long)]
        note: bool,
    },
    /// List todos
    #[command(alias = "ls")]
    List {
        /// Hide completed todos
        #[arg(long)]
        open: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Mark a todo completed
    #[command(alias = "done")]
    Complete {
        /// Todo id
        id: i64,
        /// Reopen instead of completing
        #[arg(long)]
        undo: bool,
    },
    /// Replace the text of a todo
    Edit {
        /// Todo id
        id: i64,
        /// New text
        text: Vec<String>,
    },
    /// Delete a todo
    #[command(alias = "rm")]
    Delete {
        /// Todo id
        id: i64,
    },
    /// Run one sync pass for the selected scope, or every enabled scope
    Sync {
        /// Settle every conflict with this choice instead of prompting
        #[arg(long, value_parser = parse_choice)]
        prefer: Option<ResolutionChoice>,
    },
    /// Keep syncing in the foreground until interrupted
    Watch {
        /// Settle every conflict with this choice; unresolved passes fail otherwise
        #[arg(long, value_parser = parse_choice)]
        prefer: Option<ResolutionChoice>,
    },
    /// Show sync status per scope
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Forget the cached copy and sync history of a scope
    Disconnect,
    /// Show or switch between local and remote mode
    Mode {
        /// New mode
        #[arg(value_parser = parse_mode)]
        mode: Option<SyncMode>,
    },
    /// Inspect or change sync settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    /// Manage the stored GitHub token
    Auth {
        #[command(subcommand)]
        command: AuthCommands,
    },
    /// Generate shell completion scripts
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: Shell,
        /// Optional output path (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Print the effective settings
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Update persisted settings
    Set {
        /// Gist that stores the todo documents
        #[arg(long, value_name = "ID")]
        gist_id: Option<String>,
        /// Seconds between background polls (clamped to 30-600)
        #[arg(long, value_name = "SECS")]
        poll_interval: Option<u64>,
        /// Quiet period after an edit before syncing
        #[arg(long, value_name = "MS")]
        debounce_ms: Option<u64>,
        /// Remote file name for the user document
        #[arg(long, value_name = "NAME")]
        user_file: Option<String>,
        /// Remote file name for the workspace document
        #[arg(long, value_name = "NAME")]
        workspace_file: Option<String>,
        /// GitHub API base URL
        #[arg(long, value_name = "URL")]
        api_base_url: Option<String>,
        /// Include a scope in syncing
        #[arg(long, value_name = "SCOPE", value_parser = parse_scope)]
        enable: Vec<DocumentScope>,
        /// Exclude a scope from syncing
        #[arg(long, value_name = "SCOPE", value_parser = parse_scope)]
        disable: Vec<DocumentScope>,
    },
}

#[derive(Subcommand)]
pub enum AuthCommands {
    /// Store a GitHub token in the system keychain
    Login {
        /// Token with gist scope; read from stdin when omitted
        #[arg(long, value_name = "TOKEN")]
        token: Option<String>,
    },
    /// Show where the token comes from
    Status,
    /// Remove the stored token
    Logout,
}

fn parse_scope(value: &str) -> Result<DocumentScope, String> {
    value.parse()
}

fn parse_mode(value: &str) -> Result<SyncMode, String> {
    value.parse()
}

fn parse_choice(value: &str) -> Result<ResolutionChoice, String> {
    value.parse()
}
