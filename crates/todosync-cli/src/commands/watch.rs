use std::sync::Arc;

use todosync_core::models::{ResolutionChoice, SyncMode};
use todosync_core::scheduler::{Scheduler, SyncTrigger};
use todosync_core::sync::{CancelResolver, ConflictResolver, PreferenceResolver, StatusMap};

use crate::commands::common::build_engine;
use crate::error::CliError;
use crate::settings::Context;
use crate::watcher::CacheWatcher;

/// Poll every enabled scope and follow local edits until Ctrl-C, printing
/// status changes.
pub async fn run_watch(prefer: Option<ResolutionChoice>, context: &Context) -> Result<(), CliError> {
    if context.settings.mode == SyncMode::Local {
        println!("Local mode: nothing to watch. Run `todosync mode remote` first.");
        return Ok(());
    }

    // No prompting here: output is streaming and stdin may be shared.
    let resolver: Arc<dyn ConflictResolver> = match prefer {
        Some(choice) => Arc::new(PreferenceResolver::new(choice)),
        None => Arc::new(CancelResolver),
    };
    let engine = Arc::new(build_engine(context, resolver)?);
    let mut statuses = engine.subscribe();
    let scheduler = Scheduler::new(
        Arc::clone(&engine) as Arc<dyn SyncTrigger>,
        context.settings.clone(),
    );
    let view = scheduler.attach_view();
    let watcher = CacheWatcher::start(
        &context.paths.cache_dir,
        context.cache(),
        scheduler.clone(),
    )?;
    println!(
        "Watching {} every {}s (Ctrl-C to stop)",
        context
            .settings
            .enabled_scopes()
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", "),
        context.settings.poll_interval().as_secs()
    );

    loop {
        tokio::select! {
            changed = statuses.changed() => {
                if changed.is_err() {
                    break;
                }
                println!("{}", format_statuses(&statuses.borrow_and_update()));
            }
            signal = tokio::signal::ctrl_c() => {
                signal?;
                break;
            }
        }
    }

    drop(watcher);
    drop(view);
    scheduler.shutdown();
    Ok(())
}

pub fn format_statuses(statuses: &StatusMap) -> String {
    statuses
        .iter()
        .map(|(scope, status)| format!("{scope}={status}"))
        .collect::<Vec<_>>()
        .join("  ")
}
