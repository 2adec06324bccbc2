use crate::error::CliError;
use crate::settings::Context;

pub fn run_disconnect(context: &Context) -> Result<(), CliError> {
    let cache = context.cache();
    for scope in context.selected_scopes() {
        cache.clear(scope)?;
        println!("Disconnected {scope} ({} mode)", cache.mode());
    }
    Ok(())
}
