use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};
use clap::Parser;
use pretty_assertions::assert_eq;
use taskmaster_core::config::{CoreConfig, LocalBackend};
use taskmaster_core::remote::MemoryRemoteStore;
use taskmaster_core::sync::{SyncReport, SyncSnapshot};
use taskmaster_core::{
    AppContainer, AuthSession, AuthState, Category, ConflictResolution, Error, Priority,
    SyncStatus, Task, TaskConflict,
};

use crate::cli::{Cli, Commands, CompletionShell, PriorityArg, ResolveArg};
use crate::commands::common::{
    build_container, format_task_line, load_config, normalize_identifier, normalize_title,
    parse_due_date, resolve_category, resolve_task, short_id,
};
use crate::commands::tasks::run_search;
use crate::commands::completions::render_completions;
use crate::commands::sync::{format_conflict_lines, format_report, format_snapshot, sync_failure};
use crate::error::CliError;
use crate::session::SessionStore;

const USER: &str = "user-1";

fn task_with_id(id: &str, title: &str) -> Task {
    let mut task = Task::new(title);
    task.id = id.parse().unwrap();
    task
}

fn memory_config() -> CoreConfig {
    let mut config = CoreConfig::default();
    config.local.backend = LocalBackend::Memory;
    config
}

fn seeded_container(tasks: Vec<Task>, categories: Vec<Category>) -> AppContainer {
    let task_remote = MemoryRemoteStore::<Task>::new();
    task_remote.seed(USER, tasks);
    let category_remote = MemoryRemoteStore::<Category>::new();
    category_remote.seed(USER, categories);

    AppContainer::with_remotes(
        memory_config(),
        AuthState::new(Some(AuthSession::new(USER, "token"))),
        Arc::new(task_remote),
        Arc::new(category_remote),
    )
    .unwrap()
}

#[test]
fn normalize_title_joins_words_and_rejects_blank() {
    let parts = vec!["  Buy".to_string(), "milk  ".to_string()];
    assert_eq!(normalize_title(&parts).unwrap(), "Buy milk");
    assert!(matches!(
        normalize_title(&["   ".to_string()]),
        Err(CliError::EmptyTitle)
    ));
    assert!(matches!(normalize_title(&[]), Err(CliError::EmptyTitle)));
}

#[test]
fn normalize_identifier_trims_and_lowercases() {
    assert_eq!(normalize_identifier("  ABCD12 ").unwrap(), "abcd12");
    assert!(matches!(normalize_identifier("  "), Err(CliError::EmptyId)));
}

#[test]
fn parse_due_date_accepts_rfc3339_and_plain_dates() {
    assert_eq!(
        parse_due_date("2026-03-01T09:30:00+02:00").unwrap(),
        Utc.with_ymd_and_hms(2026, 3, 1, 7, 30, 0).unwrap()
    );
    assert_eq!(
        parse_due_date(" 2026-03-01 ").unwrap(),
        Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap()
    );
    assert!(matches!(
        parse_due_date("next tuesday"),
        Err(CliError::InvalidDueDate(value)) if value == "next tuesday"
    ));
}

#[test]
fn short_id_keeps_first_eight_characters() {
    assert_eq!(short_id("0192f1c4-aaaa-7000-8000-000000000000"), "0192f1c4");
    assert_eq!(short_id("abc"), "abc");
}

#[test]
fn format_task_line_shows_state_priority_due_and_category() {
    let now = Utc.with_ymd_and_hms(2026, 5, 10, 12, 0, 0).unwrap();
    let category = Category::new("Errands", "#FF9500", "cart");
    let mut task = task_with_id("aaaaaaaa-0000-7000-8000-000000000001", "Buy milk")
        .with_priority(Priority::High)
        .with_due_date(now - Duration::days(1))
        .with_category(category.id);

    assert_eq!(
        format_task_line(&task, std::slice::from_ref(&category), now),
        "[ ] aaaaaaaa  Buy milk  (high, overdue 2026-05-09, Errands)"
    );

    task.is_completed = true;
    task.category_id = None;
    assert_eq!(
        format_task_line(&task, &[], now),
        "[x] aaaaaaaa  Buy milk  (high, due 2026-05-09)"
    );
}

#[test]
fn cli_parses_add_with_options() {
    let cli = Cli::try_parse_from([
        "taskmaster",
        "add",
        "Buy",
        "milk",
        "--priority",
        "high",
        "--due",
        "2026-01-02",
    ])
    .unwrap();

    match cli.command {
        Commands::Add {
            title,
            priority,
            due,
            description,
            category,
        } => {
            assert_eq!(title, vec!["Buy".to_string(), "milk".to_string()]);
            assert_eq!(priority, PriorityArg::High);
            assert_eq!(due.as_deref(), Some("2026-01-02"));
            assert_eq!(description, None);
            assert_eq!(category, None);
        }
        _ => panic!("expected add command"),
    }
}

#[test]
fn cli_parses_sync_flags_and_global_offline() {
    let cli = Cli::try_parse_from([
        "taskmaster",
        "sync",
        "--resolve",
        "keep-remote",
        "--offline",
    ])
    .unwrap();

    assert!(cli.offline);
    match cli.command {
        Commands::Sync {
            watch,
            interval,
            resolve,
        } => {
            assert!(!watch);
            assert_eq!(interval, None);
            assert_eq!(resolve, Some(ResolveArg::KeepRemote));
            assert_eq!(
                resolve.map(ConflictResolution::from),
                Some(ConflictResolution::KeepRemote)
            );
        }
        _ => panic!("expected sync command"),
    }
}

#[test]
fn cli_rejects_conflicting_edit_flags() {
    let result = Cli::try_parse_from([
        "taskmaster",
        "edit",
        "abcd",
        "--due",
        "2026-01-02",
        "--clear-due",
    ]);
    assert!(result.is_err());
}

#[test]
fn completions_mention_binary_name() {
    let script = String::from_utf8(render_completions(CompletionShell::Bash)).unwrap();
    assert!(script.contains("taskmaster"));
}

#[test]
fn session_store_round_trips_per_endpoint() {
    let store = SessionStore::for_endpoint(Some("https://tasks.example.com/round-trip"));
    let other = SessionStore::for_endpoint(Some("https://other.example.com/round-trip"));
    let session = AuthSession::new("user-42", "secret").with_email("ada@example.com");

    store.save(&session).unwrap();
    assert_eq!(store.load().unwrap(), Some(session));
    assert_eq!(other.load().unwrap(), None);

    store.clear().unwrap();
    assert_eq!(store.load().unwrap(), None);
    store.clear().unwrap();
}

#[test]
fn session_store_drops_expired_sessions() {
    let store = SessionStore::for_endpoint(Some("https://tasks.example.com/expired"));
    let expired = AuthSession::new("user-7", "secret").with_expires_at(1);
    store.save(&expired).unwrap();

    assert_eq!(store.load_active().unwrap(), None);
    assert!(store.load().unwrap().is_some());
    store.clear().unwrap();
}

#[test]
fn load_config_reads_explicit_file() {
    let file = tempfile::NamedTempFile::new().unwrap();
    std::fs::write(
        file.path(),
        r#"{"remote":{"base_url":"https://tasks.example.com/v1"},"sync":{"auto_sync_interval_secs":60}}"#,
    )
    .unwrap();

    let config = load_config(Some(file.path())).unwrap();
    assert_eq!(config.local.backend, LocalBackend::Memory);
    assert_eq!(config.sync.auto_sync_interval_secs, 60);
    assert_eq!(
        config.remote_base_url().as_deref(),
        Some("https://tasks.example.com/v1")
    );
}

#[test]
fn load_config_rejects_unknown_fields() {
    let file = tempfile::NamedTempFile::new().unwrap();
    std::fs::write(file.path(), r#"{"remote":{"endpoint":"x"}}"#).unwrap();
    assert!(load_config(Some(file.path())).is_err());
}

#[test]
fn build_container_requires_remote_unless_offline() {
    let error = build_container(memory_config(), AuthState::signed_out(), false).unwrap_err();
    assert!(matches!(error, CliError::RemoteNotConfigured));
    assert!(build_container(memory_config(), AuthState::signed_out(), true).is_ok());
}

#[tokio::test]
async fn offline_container_rejects_writes() {
    let container = build_container(
        memory_config(),
        AuthState::new(Some(AuthSession::new(USER, "token"))),
        true,
    )
    .unwrap();

    let result = container.create_task().execute(Task::new("Offline")).await;
    assert!(result.is_err());
    assert!(container.tasks().local().list().is_empty());
}

#[tokio::test]
async fn resolve_task_matches_full_id_and_unique_prefix() {
    let first = task_with_id("aaaaaaaa-0000-7000-8000-000000000001", "First");
    let second = task_with_id("bbbbbbbb-0000-7000-8000-000000000002", "Second");
    let container = seeded_container(vec![first.clone(), second.clone()], Vec::new());

    let by_full = resolve_task(&container, &second.id.to_string()).await.unwrap();
    assert_eq!(by_full.title, "Second");

    let by_prefix = resolve_task(&container, "AAAA").await.unwrap();
    assert_eq!(by_prefix.id, first.id);

    assert!(matches!(
        resolve_task(&container, "cccc").await,
        Err(CliError::TaskNotFound(query)) if query == "cccc"
    ));
}

#[tokio::test]
async fn resolve_task_reports_ambiguous_prefix() {
    let container = seeded_container(
        vec![
            task_with_id("aaaaaaaa-0000-7000-8000-000000000001", "First"),
            task_with_id("aaaabbbb-0000-7000-8000-000000000002", "Second"),
        ],
        Vec::new(),
    );

    match resolve_task(&container, "aaaa").await {
        Err(CliError::AmbiguousId(message)) => {
            assert!(message.contains("aaaaaaaa"));
            assert!(message.contains("aaaabbbb"));
        }
        other => panic!("expected ambiguity error, got {other:?}"),
    }
}

#[tokio::test]
async fn resolve_category_finds_prefix() {
    let mut errands = Category::new("Errands", "#FF9500", "cart");
    errands.id = "cccccccc-0000-7000-8000-000000000003".parse().unwrap();
    let container = seeded_container(Vec::new(), vec![errands.clone()]);

    let resolved = resolve_category(&container, "ccc").await.unwrap();
    assert_eq!(resolved, errands);
    assert!(matches!(
        resolve_category(&container, "ddd").await,
        Err(CliError::CategoryNotFound(_))
    ));
}

#[test]
fn format_report_pluralizes_conflicts() {
    let completed_at = Utc.with_ymd_and_hms(2026, 5, 10, 12, 0, 0).unwrap();
    let mut report = SyncReport {
        tasks: 3,
        categories: 1,
        conflicts: 0,
        completed_at,
    };
    assert_eq!(
        format_report(&report),
        "Synced 3 tasks and 1 categories at 2026-05-10 12:00:00 UTC"
    );
    report.conflicts = 2;
    assert!(format_report(&report).ends_with("(2 conflicts)"));
}

#[test]
fn format_snapshot_includes_error_and_conflicts() {
    let snapshot = SyncSnapshot {
        status: SyncStatus::Failed,
        last_sync_at: None,
        last_error: Some("network unreachable".to_string()),
        conflict_count: 1,
    };
    let line = format_snapshot(&snapshot);
    assert!(line.starts_with(&format!("status={}", SyncStatus::Failed)));
    assert!(line.contains("error=\"network unreachable\""));
    assert!(line.ends_with("conflicts=1"));
}

#[test]
fn format_conflict_lines_shows_both_versions() {
    let at = Utc.with_ymd_and_hms(2026, 5, 10, 12, 0, 0).unwrap();
    let mut local = task_with_id("aaaaaaaa-0000-7000-8000-000000000001", "Local title");
    local.updated_at = at + Duration::minutes(5);
    let mut remote = local.clone();
    remote.title = "Remote title".to_string();
    remote.updated_at = at;

    let conflict = TaskConflict::new(local, remote).unwrap();
    let lines = format_conflict_lines(&[conflict]);
    assert_eq!(lines.len(), 1);
    assert!(lines[0].starts_with("conflict aaaaaaaa"));
    assert!(lines[0].contains("local=\"Local title\" (2026-05-10 12:05:00 UTC)"));
    assert!(lines[0].contains("remote=\"Remote title\" (2026-05-10 12:00:00 UTC)"));
}

#[test]
fn sync_failure_notes_untouched_cache_for_unreachable_remote() {
    let unreachable = sync_failure(&Error::Network("connection refused".to_string()));
    assert_eq!(
        unreachable.to_string(),
        "Sync failed: Network error: connection refused (cached data left unchanged)"
    );

    let signed_out = sync_failure(&Error::NotAuthenticated);
    assert!(!signed_out.to_string().contains("cached data"));
}

#[test]
fn cli_search_query_defaults_to_blank() {
    let cli = Cli::try_parse_from(["taskmaster", "search", "--json"]).unwrap();
    match cli.command {
        Commands::Search { query, json } => {
            assert_eq!(query, "");
            assert!(json);
        }
        _ => panic!("expected search command"),
    }
}

#[tokio::test]
async fn blank_search_lists_every_task() {
    let container = seeded_container(
        vec![
            task_with_id("aaaaaaaa-0000-7000-8000-000000000001", "Buy milk"),
            task_with_id("bbbbbbbb-0000-7000-8000-000000000002", "Call mom"),
        ],
        Vec::new(),
    );

    assert!(run_search(&container, "   ", true).await.is_ok());
    assert_eq!(container.search_tasks().execute("   ").await.unwrap().len(), 2);
    assert_eq!(container.search_tasks().execute("milk").await.unwrap().len(), 1);
}
