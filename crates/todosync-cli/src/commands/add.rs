use todosync_core::Item;

use crate::commands::common::resolve_todo_text;
use crate::error::CliError;
use crate::settings::Context;

pub fn run_add(
    text_parts: &[String],
    markdown: bool,
    note: bool,
    context: &Context,
) -> Result<i64, CliError> {
    let text = resolve_todo_text(text_parts)?;
    let cache = context.cache();
    let id = cache.record_local_edit(context.item_scope(), |document| {
        let id = document.next_item_id();
        let mut item = Item::new(id, text);
        item.is_markdown = markdown;
        item.is_note = note;
        document.collection_mut(context.file()).push(item);
        Ok(id)
    })?;
    println!("{id}");
    Ok(id)
}
