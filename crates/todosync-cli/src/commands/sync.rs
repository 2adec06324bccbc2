use todosync_core::models::ResolutionChoice;
use todosync_core::sync::{SyncAction, SyncError};
use todosync_core::DocumentScope;

use crate::commands::common::{build_engine, choose_resolver};
use crate::error::CliError;
use crate::settings::Context;

pub async fn run_sync(prefer: Option<ResolutionChoice>, context: &Context) -> Result<(), CliError> {
    let engine = build_engine(context, choose_resolver(prefer))?;
    let results = match context.scope {
        Some(scope) => vec![(scope, engine.sync(scope).await)],
        None => engine.sync_all().await,
    };

    for line in format_sync_results(&results) {
        println!("{line}");
    }

    match results.into_iter().filter(|(_, result)| result.is_err()).count() {
        0 => Ok(()),
        failed => Err(CliError::SyncFailed(failed)),
    }
}

pub fn format_sync_results(
    results: &[(DocumentScope, Result<SyncAction, SyncError>)],
) -> Vec<String> {
    results
        .iter()
        .map(|(scope, result)| match result {
            Ok(action) => format!("{scope}: {action}"),
            Err(error) if error.retryable() => format!("{scope}: failed, will retry: {error}"),
            Err(error) => format!("{scope}: failed: {error}"),
        })
        .collect()
}
