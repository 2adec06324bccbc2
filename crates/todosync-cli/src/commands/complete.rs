use crate::error::CliError;
use crate::settings::Context;

pub fn run_complete(id: i64, undo: bool, context: &Context) -> Result<(), CliError> {
    context
        .cache()
        .record_local_edit(context.item_scope(), |document| {
            let item = document.item_mut(context.file(), id)?;
            if undo {
                item.reopen();
            } else {
                item.complete();
            }
            Ok(())
        })
        .map_err(|error| not_found_as(id, error))?;
    println!("{id}");
    Ok(())
}

/// Report a missing item by its id rather than the core error text.
pub fn not_found_as(id: i64, error: todosync_core::Error) -> CliError {
    match error {
        todosync_core::Error::ItemNotFound(_) | todosync_core::Error::CollectionNotFound(_) => {
            CliError::TodoNotFound(id)
        }
        other => CliError::Core(other),
    }
}
