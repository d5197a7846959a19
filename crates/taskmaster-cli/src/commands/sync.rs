use std::time::Duration;

use taskmaster_core::sync::{SyncReport, SyncSnapshot};
use taskmaster_core::{AppContainer, ConflictResolution, Error, TaskConflict};

use crate::commands::common::{format_timestamp, short_id};
use crate::error::CliError;

pub async fn run_sync(
    container: &AppContainer,
    watch: bool,
    interval: Option<u64>,
    resolve: Option<ConflictResolution>,
) -> Result<(), CliError> {
    if !container.auth().is_authenticated() {
        return Err(CliError::Auth(
            "Not signed in. Run `taskmaster auth login` first.".to_string(),
        ));
    }

    if watch {
        return run_watch(container, interval).await;
    }

    let outcome = container.sync_data().execute().await;
    let Some(report) = outcome
        .into_result()
        .map_err(|error| sync_failure(&error))?
    else {
        println!("Sync already in progress");
        return Ok(());
    };
    println!("{}", format_report(&report));

    let conflicts = container.sync_engine().take_conflicts();
    if conflicts.is_empty() {
        return Ok(());
    }

    let Some(resolution) = resolve else {
        for line in format_conflict_lines(&conflicts) {
            println!("{line}");
        }
        println!("Re-run with --resolve keep-local|keep-remote to settle them.");
        return Ok(());
    };

    let resolver = container.resolve_conflict();
    for conflict in conflicts {
        let id = short_id(&conflict.id().to_string());
        let resolved = resolver.execute(conflict, resolution).await?;
        println!("Resolved {id} -> \"{}\"", resolved.title);
    }
    Ok(())
}

async fn run_watch(container: &AppContainer, interval: Option<u64>) -> Result<(), CliError> {
    let interval = interval
        .filter(|secs| *secs > 0)
        .map_or_else(|| container.config().auto_sync_interval(), Duration::from_secs);
    let mut events = container.sync_engine().subscribe();

    let handle = container
        .sync_engine()
        .start_auto_sync(container.auth().clone(), interval);
    println!(
        "Syncing every {}s, press Ctrl-C to stop",
        interval.as_secs()
    );

    loop {
        tokio::select! {
            changed = events.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = events.borrow_and_update().clone();
                println!("{}", format_snapshot(&snapshot));
            }
            signal = tokio::signal::ctrl_c() => {
                signal?;
                break;
            }
        }
    }

    handle.shutdown().await;
    Ok(())
}

/// Failed runs never touch the cache; say so when the remote was the problem.
pub fn sync_failure(error: &Error) -> CliError {
    if error.is_remote_unavailable() {
        CliError::Sync(format!("{error} (cached data left unchanged)"))
    } else {
        CliError::Sync(error.to_string())
    }
}

pub fn format_report(report: &SyncReport) -> String {
    format!(
        "Synced {} tasks and {} categories at {}{}",
        report.tasks,
        report.categories,
        format_timestamp(report.completed_at),
        match report.conflicts {
            0 => String::new(),
            1 => " (1 conflict)".to_string(),
            count => format!(" ({count} conflicts)"),
        }
    )
}

pub fn format_snapshot(snapshot: &SyncSnapshot) -> String {
    let mut line = format!("status={}", snapshot.status);
    if let Some(last_sync_at) = snapshot.last_sync_at {
        line.push_str(&format!(" last_sync={}", format_timestamp(last_sync_at)));
    }
    if let Some(error) = &snapshot.last_error {
        line.push_str(&format!(" error=\"{error}\""));
    }
    if snapshot.conflict_count > 0 {
        line.push_str(&format!(" conflicts={}", snapshot.conflict_count));
    }
    line
}

pub fn format_conflict_lines(conflicts: &[TaskConflict]) -> Vec<String> {
    conflicts
        .iter()
        .map(|conflict| {
            format!(
                "conflict {}  local=\"{}\" ({})  remote=\"{}\" ({})",
                short_id(&conflict.id().to_string()),
                conflict.local().title,
                format_timestamp(conflict.local().updated_at),
                conflict.remote().title,
                format_timestamp(conflict.remote().updated_at),
            )
        })
        .collect()
}
