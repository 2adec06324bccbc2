use crate::commands::complete::not_found_as;
use crate::error::CliError;
use crate::settings::Context;

pub fn run_delete(id: i64, context: &Context) -> Result<(), CliError> {
    let removed = context
        .cache()
        .record_local_edit(context.item_scope(), |document| {
            document.remove_item(context.file(), id)
        })
        .map_err(|error| not_found_as(id, error))?;
    println!("{}", removed.id);
    Ok(())
}
