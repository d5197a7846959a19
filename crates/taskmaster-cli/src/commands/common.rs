use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use taskmaster_core::config::{CoreConfig, LocalBackend};
use taskmaster_core::remote::MemoryRemoteStore;
use taskmaster_core::{AppContainer, AuthState, Category, CategoryId, Task, TaskId};

use crate::error::CliError;
use crate::session::SessionStore;

const CONFIG_FILE_NAME: &str = "config.json";
const CACHE_FILE_NAME: &str = "cache.db";
const SHORT_ID_LEN: usize = 8;

pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("taskmaster").join(CONFIG_FILE_NAME))
}

pub fn default_cache_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("taskmaster")
        .join(CACHE_FILE_NAME)
}

/// Load the config file (explicit path, else the default location when
/// present) and apply environment overrides.
///
/// Without a config file the cache is a SQLite file in the user data dir.
pub fn load_config(explicit: Option<&Path>) -> Result<CoreConfig, CliError> {
    let (config, from_file) = match explicit {
        Some(path) => (CoreConfig::load_from_path(path)?, true),
        None => match default_config_path().filter(|path| path.exists()) {
            Some(path) => (CoreConfig::load_from_path(path)?, true),
            None => (CoreConfig::default(), false),
        },
    };

    let mut config = config.with_env_overrides();
    if !from_file && config.local.path.is_none() {
        config.local.backend = LocalBackend::Sqlite;
        config.local.path = Some(default_cache_path());
    }
    config.validate()?;
    Ok(config)
}

/// Session store scoped to the configured remote endpoint.
pub fn session_store(config: &CoreConfig) -> SessionStore {
    SessionStore::for_endpoint(config.remote_base_url().as_deref())
}

/// Build the container for a command run.
///
/// Offline mode swaps in an unreachable remote so reads are served from the
/// cache and writes fail without touching the network.
pub fn build_container(
    config: CoreConfig,
    auth: AuthState,
    offline: bool,
) -> Result<AppContainer, CliError> {
    if offline {
        let tasks = MemoryRemoteStore::<Task>::new();
        let categories = MemoryRemoteStore::<Category>::new();
        tasks.set_offline(true);
        categories.set_offline(true);
        return Ok(AppContainer::with_remotes(
            config,
            auth,
            Arc::new(tasks),
            Arc::new(categories),
        )?);
    }

    if config.remote_base_url().is_none() {
        return Err(CliError::RemoteNotConfigured);
    }
    Ok(AppContainer::from_config(config, auth)?)
}

pub fn normalize_identifier(id: &str) -> Result<String, CliError> {
    let trimmed = id.trim();
    if trimmed.is_empty() {
        Err(CliError::EmptyId)
    } else {
        Ok(trimmed.to_lowercase())
    }
}

pub fn normalize_title(parts: &[String]) -> Result<String, CliError> {
    let title = parts.join(" ");
    let title = title.trim();
    if title.is_empty() {
        Err(CliError::EmptyTitle)
    } else {
        Ok(title.to_string())
    }
}

/// Pick the one candidate whose id starts with `query`.
fn resolve_by_prefix<T, I: ToString>(
    query: &str,
    candidates: Vec<T>,
    id_of: impl Fn(&T) -> I,
    not_found: impl FnOnce(String) -> CliError,
) -> Result<T, CliError> {
    let mut matches: Vec<T> = candidates
        .into_iter()
        .filter(|candidate| id_of(candidate).to_string().starts_with(query))
        .collect();

    match matches.len() {
        0 => Err(not_found(query.to_string())),
        1 => Ok(matches.remove(0)),
        _ => {
            let options = matches
                .iter()
                .take(3)
                .map(|candidate| short_id(&id_of(candidate).to_string()))
                .collect::<Vec<_>>()
                .join(", ");
            Err(CliError::AmbiguousId(format!(
                "ID prefix '{query}' is ambiguous; matches: {options}"
            )))
        }
    }
}

/// Find a task by full id or unique id prefix.
pub async fn resolve_task(container: &AppContainer, query: &str) -> Result<Task, CliError> {
    let query = normalize_identifier(query)?;
    if let Ok(id) = query.parse::<TaskId>() {
        if let Some(task) = container.get_task().execute(&id).await? {
            return Ok(task);
        }
    }

    let tasks = container.get_tasks().execute().await?;
    resolve_by_prefix(&query, tasks, |task| task.id, CliError::TaskNotFound)
}

/// Find a category by full id or unique id prefix.
pub async fn resolve_category(
    container: &AppContainer,
    query: &str,
) -> Result<Category, CliError> {
    let query = normalize_identifier(query)?;
    let categories = container.get_categories().execute().await?;
    if let Ok(id) = query.parse::<CategoryId>() {
        if let Some(category) = categories.iter().find(|category| category.id == id) {
            return Ok(category.clone());
        }
    }
    resolve_by_prefix(
        &query,
        categories,
        |category| category.id,
        CliError::CategoryNotFound,
    )
}

/// Parse an RFC 3339 timestamp or a bare `YYYY-MM-DD` date (midnight UTC).
pub fn parse_due_date(value: &str) -> Result<DateTime<Utc>, CliError> {
    let value = value.trim();
    if let Ok(date_time) = DateTime::parse_from_rfc3339(value) {
        return Ok(date_time.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| CliError::InvalidDueDate(value.to_string()))
}

pub fn short_id(id: &str) -> String {
    id.chars().take(SHORT_ID_LEN).collect()
}

pub fn format_task_line(task: &Task, categories: &[Category], now: DateTime<Utc>) -> String {
    let check = if task.is_completed { "x" } else { " " };
    let mut details = vec![task.priority.to_string()];
    if let Some(due) = task.due_date {
        let marker = if task.is_overdue(now) { "overdue" } else { "due" };
        details.push(format!("{marker} {}", due.format("%Y-%m-%d")));
    }
    if let Some(category) = task
        .category_id
        .and_then(|id| categories.iter().find(|category| category.id == id))
    {
        details.push(category.name.clone());
    }

    format!(
        "[{check}] {}  {}  ({})",
        short_id(&task.id.to_string()),
        task.title,
        details.join(", ")
    )
}

pub fn format_task_details(task: &Task, categories: &[Category]) -> Vec<String> {
    let category = task.category_id.map(|id| {
        categories
            .iter()
            .find(|category| category.id == id)
            .map_or_else(|| format!("{id} (missing)"), |category| category.name.clone())
    });

    vec![
        format!("ID:          {}", task.id),
        format!("Title:       {}", task.title),
        format!(
            "Description: {}",
            task.description.as_deref().unwrap_or("-")
        ),
        format!("Priority:    {}", task.priority),
        format!(
            "Due:         {}",
            task.due_date
                .map_or_else(|| "-".to_string(), format_timestamp)
        ),
        format!(
            "Completed:   {}",
            if task.is_completed { "yes" } else { "no" }
        ),
        format!("Category:    {}", category.as_deref().unwrap_or("-")),
        format!("Created:     {}", format_timestamp(task.created_at)),
        format!("Updated:     {}", format_timestamp(task.updated_at)),
    ]
}

pub fn format_category_line(category: &Category) -> String {
    format!(
        "{}  {:<20}  {}  {}",
        short_id(&category.id.to_string()),
        category.name,
        category.color,
        category.icon
    )
}

pub fn format_timestamp(value: DateTime<Utc>) -> String {
    value.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}
