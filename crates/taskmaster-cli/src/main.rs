//! TaskMaster CLI - offline-first task management from the terminal
//!
//! Every command goes through the same container the other front ends use:
//! reads fall back to the local cache, writes go to the remote store first.

mod cli;
mod commands;
mod error;
mod session;

#[cfg(test)]
mod tests;

use clap::Parser;
use taskmaster_core::AuthState;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands};
use crate::commands::auth_cmd::run_auth;
use crate::commands::category::run_category;
use crate::commands::common::{build_container, load_config, session_store};
use crate::commands::completions::run_completions;
use crate::commands::sync::run_sync;
use crate::commands::tasks::{
    run_add, run_delete, run_done, run_edit, run_list, run_search, run_show, TaskEdit,
};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    let directive = "taskmaster=info"
        .parse()
        .map_err(|error| CliError::Config(format!("invalid log directive: {error}")))?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(directive))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Commands::Completions { shell, output } = &cli.command {
        return run_completions(*shell, output.as_deref());
    }

    let config = load_config(cli.config.as_deref())?;

    if let Commands::Auth { command } = cli.command {
        return run_auth(command, &config);
    }

    let session = session_store(&config).load_active()?;
    let container = build_container(config, AuthState::new(session), cli.offline)?;

    match cli.command {
        Commands::List { category, json } => {
            run_list(&container, category.as_deref(), json).await
        }
        Commands::Add {
            title,
            description,
            priority,
            due,
            category,
        } => {
            run_add(
                &container,
                &title,
                description,
                priority.into(),
                due.as_deref(),
                category.as_deref(),
            )
            .await
        }
        Commands::Show { id, json } => run_show(&container, &id, json).await,
        Commands::Edit {
            id,
            title,
            description,
            priority,
            due,
            clear_due,
            category,
            clear_category,
        } => {
            let edit = TaskEdit {
                title,
                description,
                priority: priority.map(Into::into),
                due,
                clear_due,
                category,
                clear_category,
            };
            run_edit(&container, &id, edit).await
        }
        Commands::Done { id } => run_done(&container, &id).await,
        Commands::Delete { id } => run_delete(&container, &id).await,
        Commands::Search { query, json } => run_search(&container, &query, json).await,
        Commands::Category { command } => run_category(&container, command).await,
        Commands::Sync {
            watch,
            interval,
            resolve,
        } => run_sync(&container, watch, interval, resolve.map(Into::into)).await,
        Commands::Auth { .. } | Commands::Completions { .. } => Ok(()),
    }
}
