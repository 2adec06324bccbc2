use crate::commands::common::{flatten_document, format_item_lines, TodoListItem};
use crate::error::CliError;
use crate::settings::Context;

pub fn run_list(open_only: bool, as_json: bool, context: &Context) -> Result<(), CliError> {
    let document = context.cache().data(context.item_scope())?;

    if as_json {
        let rows: Vec<TodoListItem> = match context.file() {
            Some(path) => document
                .collection(Some(path))
                .into_iter()
                .flatten()
                .map(|item| TodoListItem::new(item, Some(path)))
                .collect(),
            None => flatten_document(&document),
        };
        let rows: Vec<TodoListItem> = rows
            .into_iter()
            .filter(|row| !open_only || !row.completed)
            .collect();
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    if let Some(path) = context.file() {
        let lines = document
            .collection(Some(path))
            .map(|items| format_item_lines(items, open_only))
            .unwrap_or_default();
        print_section(None, &lines);
        return Ok(());
    }

    print_section(None, &format_item_lines(&document.todos, open_only));
    for (path, items) in document.named_or_empty() {
        print_section(Some(path), &format_item_lines(items, open_only));
    }
    Ok(())
}

fn print_section(title: Option<&str>, lines: &[String]) {
    if let Some(title) = title {
        if lines.is_empty() {
            return;
        }
        println!();
        println!("{title}");
    } else if lines.is_empty() {
        println!("No todos.");
        return;
    }
    for line in lines {
        println!("{line}");
    }
}
