use crate::commands::common::resolve_todo_text;
use crate::commands::complete::not_found_as;
use crate::error::CliError;
use crate::settings::Context;

pub fn run_edit(id: i64, text_parts: &[String], context: &Context) -> Result<(), CliError> {
    let text = resolve_todo_text(text_parts)?;
    context
        .cache()
        .record_local_edit(context.item_scope(), |document| {
            document.item_mut(context.file(), id)?.text = text;
            Ok(())
        })
        .map_err(|error| not_found_as(id, error))?;
    println!("{id}");
    Ok(())
}
