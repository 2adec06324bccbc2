//! todosync CLI - manage todos and sync them through a GitHub Gist

mod auth;
mod cli;
mod commands;
mod error;
mod resolver;
mod settings;
mod watcher;

#[cfg(test)]
mod tests;

use clap::{CommandFactory, Parser};

use crate::cli::{Cli, Commands};
use crate::commands::add::run_add;
use crate::commands::auth_cmd::run_auth;
use crate::commands::complete::run_complete;
use crate::commands::completions::run_completions;
use crate::commands::config::run_config;
use crate::commands::delete::run_delete;
use crate::commands::disconnect::run_disconnect;
use crate::commands::edit::run_edit;
use crate::commands::list::run_list;
use crate::commands::mode::run_mode;
use crate::commands::status::run_status;
use crate::commands::sync::run_sync;
use crate::commands::watch::run_watch;
use crate::error::CliError;
use crate::settings::{CliPaths, Context};

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    let mut filter = tracing_subscriber::EnvFilter::from_default_env();
    for directive in ["todosync=info", "todosync_core=info"] {
        filter = filter.add_directive(
            directive
                .parse()
                .map_err(|error| CliError::Config(format!("{error}")))?,
        );
    }
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let context = Context::load(CliPaths::resolve(cli.data_dir), cli.scope, cli.file)?;

    match cli.command {
        Some(Commands::Add {
            text,
            markdown,
            note,
        }) => {
            run_add(&text, markdown, note, &context)?;
        }
        Some(Commands::List { open, json }) => run_list(open, json, &context)?,
        Some(Commands::Complete { id, undo }) => run_complete(id, undo, &context)?,
        Some(Commands::Edit { id, text }) => run_edit(id, &text, &context)?,
        Some(Commands::Delete { id }) => run_delete(id, &context)?,
        Some(Commands::Sync { prefer }) => run_sync(prefer, &context).await?,
        Some(Commands::Watch { prefer }) => run_watch(prefer, &context).await?,
        Some(Commands::Status { json }) => run_status(json, &context)?,
        Some(Commands::Disconnect) => run_disconnect(&context)?,
        Some(Commands::Mode { mode }) => run_mode(mode, &context)?,
        Some(Commands::Config { command }) => run_config(command, &context)?,
        Some(Commands::Auth { command }) => run_auth(command)?,
        Some(Commands::Completions { shell, output }) => {
            run_completions(shell, output.as_deref())?;
        }
        None => {
            Cli::command().print_help().map_err(CliError::Io)?;
            println!();
        }
    }

    Ok(())
}
