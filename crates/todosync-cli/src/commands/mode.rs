use todosync_core::models::SyncMode;

use crate::error::CliError;
use crate::settings::Context;

pub fn run_mode(mode: Option<SyncMode>, context: &Context) -> Result<(), CliError> {
    let Some(mode) = mode else {
        println!("{}", context.settings.mode);
        return Ok(());
    };

    let mut settings = context.stored_settings()?;
    settings.mode = mode;
    context.save_settings(&settings)?;
    if mode == SyncMode::Remote && settings.gist_id().is_none() {
        println!("Switched to remote mode; set a gist with `todosync config set --gist-id <ID>`");
    } else {
        println!("Switched to {mode} mode");
    }
    Ok(())
}
