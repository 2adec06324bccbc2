//! Timers that decide when sync passes run.
//!
//! Each enabled scope gets a poll task while at least one view is attached,
//! and a debounce task restarted by every local edit. All timer tasks are
//! plain tokio tasks owned here and aborted together on
//! [`Scheduler::shutdown`]. Passes themselves run on their own tasks, so
//! aborting a timer never stops a pass halfway through its commit.
//! Methods that start tasks must be called from within a tokio runtime.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::config::SyncSettings;
use crate::models::{DocumentScope, SyncMode};
use crate::sync::SyncEngine;

/// Something that runs a sync pass for a scope.
#[async_trait]
pub trait SyncTrigger: Send + Sync {
    async fn trigger(&self, scope: DocumentScope);
}

#[async_trait]
impl SyncTrigger for SyncEngine {
    async fn trigger(&self, scope: DocumentScope) {
        // Outcomes are logged and published as status by the engine.
        let _ = self.sync(scope).await;
    }
}

#[derive(Clone)]
pub struct Scheduler {
    inner: Arc<Inner>,
}

struct Inner {
    trigger: Arc<dyn SyncTrigger>,
    state: Mutex<State>,
}

struct State {
    settings: SyncSettings,
    views: usize,
    polls: HashMap<DocumentScope, JoinHandle<()>>,
    debounces: HashMap<DocumentScope, JoinHandle<()>>,
    shut_down: bool,
}

impl Scheduler {
    pub fn new(trigger: Arc<dyn SyncTrigger>, settings: SyncSettings) -> Self {
        Self {
            inner: Arc::new(Inner {
                trigger,
                state: Mutex::new(State {
                    settings,
                    views: 0,
                    polls: HashMap::new(),
                    debounces: HashMap::new(),
                    shut_down: false,
                }),
            }),
        }
    }

    /// Register a visible view. Polling runs while any handle is alive.
    #[must_use = "dropping the handle detaches the view immediately"]
    pub fn attach_view(&self) -> ViewHandle {
        let mut state = self.inner.lock();
        state.views += 1;
        if state.views == 1 {
            self.inner.start_polling(&mut state);
        }
        ViewHandle {
            inner: Arc::clone(&self.inner),
        }
    }

    pub fn view_count(&self) -> usize {
        self.inner.lock().views
    }

    pub fn is_polling(&self) -> bool {
        !self.inner.lock().polls.is_empty()
    }

    /// Restart the quiet-period timer for `scope`.
    pub fn notify_local_edit(&self, scope: DocumentScope) {
        let mut state = self.inner.lock();
        if state.shut_down
            || state.settings.mode == SyncMode::Local
            || !state.settings.is_enabled(scope)
        {
            return;
        }

        if let Some(pending) = state.debounces.remove(&scope) {
            pending.abort();
        }
        let delay = state.settings.debounce();
        let trigger = Arc::clone(&self.inner.trigger);
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            tracing::debug!("Debounce elapsed for {}", scope);
            spawn_pass(trigger, scope);
        });
        state.debounces.insert(scope, task);
    }

    /// Whether a debounced pass is still waiting for `scope`.
    pub fn has_pending_edit(&self, scope: DocumentScope) -> bool {
        self.inner
            .lock()
            .debounces
            .get(&scope)
            .is_some_and(|task| !task.is_finished())
    }

    pub fn settings(&self) -> SyncSettings {
        self.inner.lock().settings.clone()
    }

    /// Replace settings, restarting polling if it is running.
    pub fn update_settings(&self, settings: SyncSettings) {
        let mut state = self.inner.lock();
        let restart = state.views > 0 && state.settings != settings;
        state.settings = settings;
        if restart {
            tracing::debug!("Sync settings changed; restarting polling");
            Inner::stop_polling(&mut state);
            self.inner.start_polling(&mut state);
        }
    }

    /// Abort every timer. The scheduler starts nothing afterwards.
    pub fn shutdown(&self) {
        let mut state = self.inner.lock();
        state.shut_down = true;
        Inner::stop_polling(&mut state);
        for (_, task) in state.debounces.drain() {
            task.abort();
        }
    }
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn start_polling(&self, state: &mut State) {
        if state.shut_down || state.settings.mode == SyncMode::Local {
            return;
        }
        let period = state.settings.poll_interval();
        for scope in state.settings.enabled_scopes() {
            let trigger = Arc::clone(&self.trigger);
            let task = tokio::spawn(async move {
                let mut ticks = tokio::time::interval(period);
                ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
                loop {
                    ticks.tick().await;
                    if let Err(error) = spawn_pass(Arc::clone(&trigger), scope).await {
                        tracing::warn!("Sync pass for {} did not finish: {}", scope, error);
                    }
                }
            });
            state.polls.insert(scope, task);
        }
        tracing::debug!("Polling every {:?}", period);
    }

    fn stop_polling(state: &mut State) {
        for (_, task) in state.polls.drain() {
            task.abort();
        }
    }
}

fn spawn_pass(trigger: Arc<dyn SyncTrigger>, scope: DocumentScope) -> JoinHandle<()> {
    tokio::spawn(async move { trigger.trigger(scope).await })
}

/// Keeps polling alive while held.
pub struct ViewHandle {
    inner: Arc<Inner>,
}

impl Drop for ViewHandle {
    fn drop(&mut self) {
        let mut state = self.inner.lock();
        state.views = state.views.saturating_sub(1);
        if state.views == 0 {
            Inner::stop_polling(&mut state);
        }
    }
}
