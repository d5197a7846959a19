use chrono::Utc;
use taskmaster_core::{AppContainer, Category, Priority, Task};

use crate::commands::common::{
    format_task_details, format_task_line, normalize_title, parse_due_date, resolve_category,
    resolve_task, short_id,
};
use crate::error::CliError;

/// Fields to change on an existing task; `None` leaves a field as is.
#[derive(Debug, Default)]
pub struct TaskEdit {
    pub title: Option<String>,
    pub description: Option<String>,
    pub priority: Option<Priority>,
    pub due: Option<String>,
    pub clear_due: bool,
    pub category: Option<String>,
    pub clear_category: bool,
}

/// Categories for labelling output; a failed lookup only loses the labels.
async fn categories_for_display(container: &AppContainer) -> Vec<Category> {
    container
        .get_categories()
        .execute()
        .await
        .unwrap_or_else(|error| {
            tracing::debug!("Category labels unavailable: {}", error);
            Vec::new()
        })
}

fn print_tasks(tasks: &[Task], categories: &[Category], as_json: bool) -> Result<(), CliError> {
    if as_json {
        println!("{}", serde_json::to_string_pretty(tasks)?);
        return Ok(());
    }

    if tasks.is_empty() {
        println!("No tasks.");
        return Ok(());
    }

    let now = Utc::now();
    for task in tasks {
        println!("{}", format_task_line(task, categories, now));
    }
    Ok(())
}

pub async fn run_list(
    container: &AppContainer,
    category: Option<&str>,
    as_json: bool,
) -> Result<(), CliError> {
    let tasks = if let Some(query) = category {
        let category = resolve_category(container, query).await?;
        container
            .get_tasks_by_category()
            .execute(&category.id)
            .await?
    } else {
        container.get_tasks().execute().await?
    };

    let categories = categories_for_display(container).await;
    print_tasks(&tasks, &categories, as_json)
}

pub async fn run_add(
    container: &AppContainer,
    title_parts: &[String],
    description: Option<String>,
    priority: Priority,
    due: Option<&str>,
    category: Option<&str>,
) -> Result<(), CliError> {
    let mut task = Task::new(normalize_title(title_parts)?).with_priority(priority);
    task.description = taskmaster_core::util::normalize_text_option(description);
    if let Some(due) = due {
        task = task.with_due_date(parse_due_date(due)?);
    }
    if let Some(query) = category {
        task = task.with_category(resolve_category(container, query).await?.id);
    }

    let created = container.create_task().execute(task).await?;
    println!("Created task {}", short_id(&created.id.to_string()));
    Ok(())
}

pub async fn run_show(container: &AppContainer, id: &str, as_json: bool) -> Result<(), CliError> {
    let task = resolve_task(container, id).await?;
    if as_json {
        println!("{}", serde_json::to_string_pretty(&task)?);
        return Ok(());
    }

    let categories = categories_for_display(container).await;
    for line in format_task_details(&task, &categories) {
        println!("{line}");
    }
    Ok(())
}

pub async fn run_edit(container: &AppContainer, id: &str, edit: TaskEdit) -> Result<(), CliError> {
    let mut task = resolve_task(container, id).await?;

    if let Some(title) = edit.title {
        task.title = normalize_title(&[title])?;
    }
    if let Some(description) = edit.description {
        task.description = taskmaster_core::util::normalize_text_option(Some(description));
    }
    if let Some(priority) = edit.priority {
        task.priority = priority;
    }
    if edit.clear_due {
        task.due_date = None;
    } else if let Some(due) = edit.due.as_deref() {
        task.due_date = Some(parse_due_date(due)?);
    }
    if edit.clear_category {
        task.category_id = None;
    } else if let Some(query) = edit.category.as_deref() {
        task.category_id = Some(resolve_category(container, query).await?.id);
    }

    let updated = container.update_task().execute(task).await?;
    println!("Updated task {}", short_id(&updated.id.to_string()));
    Ok(())
}

pub async fn run_done(container: &AppContainer, id: &str) -> Result<(), CliError> {
    let task = resolve_task(container, id).await?;
    let toggled = container.toggle_task_completion().execute(task).await?;
    let state = if toggled.is_completed {
        "completed"
    } else {
        "not completed"
    };
    println!(
        "Marked task {} as {state}",
        short_id(&toggled.id.to_string())
    );
    Ok(())
}

pub async fn run_delete(container: &AppContainer, id: &str) -> Result<(), CliError> {
    let task = resolve_task(container, id).await?;
    container.delete_task().execute(&task.id).await?;
    println!("Deleted task {}", short_id(&task.id.to_string()));
    Ok(())
}

pub async fn run_search(
    container: &AppContainer,
    query: &str,
    as_json: bool,
) -> Result<(), CliError> {
    let tasks = container.search_tasks().execute(query).await?;
    let categories = categories_for_display(container).await;
    print_tasks(&tasks, &categories, as_json)
}
