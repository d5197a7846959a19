use taskmaster_core::{AppContainer, Category};

use crate::cli::CategoryCommands;
use crate::commands::common::{format_category_line, resolve_category, short_id};
use crate::error::CliError;

pub async fn run_category(
    container: &AppContainer,
    command: CategoryCommands,
) -> Result<(), CliError> {
    match command {
        CategoryCommands::List { json } => {
            let categories = container.get_categories().execute().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&categories)?);
            } else if categories.is_empty() {
                println!("No categories.");
            } else {
                for category in &categories {
                    println!("{}", format_category_line(category));
                }
            }
        }
        CategoryCommands::Add { name, color, icon } => {
            let category = Category::new(name.trim(), color.trim(), icon.trim());
            let created = container.create_category().execute(category).await?;
            println!(
                "Created category {} ({})",
                created.name,
                short_id(&created.id.to_string())
            );
        }
        CategoryCommands::Delete { id } => {
            let category = resolve_category(container, &id).await?;
            container.delete_category().execute(&category.id).await?;
            println!("Deleted category {}", category.name);
        }
    }
    Ok(())
}
