//! `gag-relay group ...`: manage the recipient directory from the shell.

use std::fmt::Write as _;

use clap::Subcommand;

use crate::error::DirectoryError;
use crate::pipeline::Category;
use crate::store::LibSqlDirectory;

#[derive(Debug, Subcommand)]
pub enum GroupAction {
    /// Add a group, or replace the title and categories of an existing one.
    Add {
        /// Telegram chat id (group ids are negative).
        #[arg(allow_negative_numbers = true)]
        chat_id: i64,
        title: String,
        /// Comma-separated categories, e.g. `beefy,meaty`.
        #[arg(required = true, value_delimiter = ',')]
        categories: Vec<Category>,
    },
    /// Remove a group and all of its subscriptions.
    Rm {
        #[arg(allow_negative_numbers = true)]
        chat_id: i64,
    },
    /// List groups and their categories.
    Ls,
}

/// Run one group command and return what to print.
pub async fn handle_group(
    directory: &LibSqlDirectory,
    action: GroupAction,
) -> Result<String, DirectoryError> {
    match action {
        GroupAction::Add {
            chat_id,
            title,
            categories,
        } => {
            directory.upsert_group(chat_id, &title, &categories).await?;
            Ok(format!(
                "Saved group {chat_id} ({title}): {}",
                join(&categories)
            ))
        }
        GroupAction::Rm { chat_id } => {
            if directory.remove_group(chat_id).await? {
                Ok(format!("Removed group {chat_id}"))
            } else {
                Ok(format!("No group {chat_id}"))
            }
        }
        GroupAction::Ls => {
            let groups = directory.list_groups().await?;
            if groups.is_empty() {
                return Ok("No groups configured.".into());
            }
            let mut out = String::new();
            for group in groups {
                let _ = writeln!(
                    out,
                    "{}\t{}\t{}\t{}",
                    group.chat_id,
                    group.title,
                    join(&group.categories),
                    group.added_at.format("%Y-%m-%d %H:%M")
                );
            }
            Ok(out.trim_end().to_string())
        }
    }
}

fn join(categories: &[Category]) -> String {
    categories
        .iter()
        .map(Category::as_str)
        .collect::<Vec<_>>()
        .join(",")
}
