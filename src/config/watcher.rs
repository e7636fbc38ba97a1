//! Configuration file watcher for hot reload.
//!
//! # States
//! ```text
//! WatchingFile --modify--> reload --> WatchingFile
//! WatchingFile --remove/rename--> unwatch, re-watch (with backoff), reload --> WatchingFile
//!                                  └── re-watch keeps failing --> Idle
//! Idle --rearm tick, file back--> reload --> WatchingFile
//! any --shutdown--> stopped (backend released)
//! ```
//!
//! Editors and deployment tools often replace a file (remove + recreate, or
//! rename over it) instead of writing in place. The kernel watch follows the
//! old inode, so the path has to be registered again to see the new file.
//!
//! Reload failures are logged and never change the state: the store keeps
//! serving the last good configuration.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use notify::event::ModifyKind;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use rand::Rng;
use thiserror::Error;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::config::loader::{ConfigError, ConfigLoader};
use crate::config::store::ConfigStore;
use crate::lifecycle::startup::StartupPolicy;

/// Watcher state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchState {
    /// The path is not registered with the backend.
    Idle,
    /// The path is registered and events are being dispatched.
    WatchingFile,
}

/// Startup failures. Nothing after startup is fatal.
#[derive(Debug, Error)]
pub enum WatchError {
    #[error("failed to create file watcher: {0}")]
    Backend(#[source] notify::Error),

    #[error("failed to start watching {path}: {source}")]
    Register {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },

    #[error("initial configuration load failed: {0}")]
    InitialLoad(#[source] ConfigError),
}

/// Tuning for re-registration after the file disappears.
#[derive(Debug, Clone)]
pub struct WatchSettings {
    /// Re-watch attempts made right after a remove event.
    pub rewatch_attempts: u32,
    pub rewatch_base_delay_ms: u64,
    pub rewatch_max_delay_ms: u64,
    /// How often an `Idle` watcher retries registration.
    pub rearm_interval: Duration,
}

impl Default for WatchSettings {
    fn default() -> Self {
        Self {
            rewatch_attempts: 5,
            rewatch_base_delay_ms: 50,
            rewatch_max_delay_ms: 800,
            rearm_interval: Duration::from_secs(1),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rewatch {
    Registered,
    Missing,
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Reload,
    Rearm,
    Ignore,
}

fn classify(kind: &EventKind) -> Action {
    match kind {
        EventKind::Remove(_) | EventKind::Modify(ModifyKind::Name(_)) => Action::Rearm,
        EventKind::Modify(ModifyKind::Metadata(_)) => Action::Ignore,
        EventKind::Modify(_) | EventKind::Create(_) => Action::Reload,
        _ => Action::Ignore,
    }
}

/// Exponential delay with up to 10% jitter.
fn rewatch_delay(attempt: u32, base_ms: u64, max_ms: u64) -> Duration {
    if attempt == 0 {
        return Duration::ZERO;
    }
    let delay_ms = base_ms
        .saturating_mul(2u64.saturating_pow(attempt - 1))
        .min(max_ms);
    let jitter_range = delay_ms / 10;
    let jitter = if jitter_range > 0 {
        rand::thread_rng().gen_range(0..jitter_range)
    } else {
        0
    };
    Duration::from_millis(delay_ms + jitter)
}

/// A watcher that keeps a [`ConfigStore`] in sync with a file.
pub struct ConfigWatcher {
    loader: ConfigLoader,
    store: Arc<ConfigStore>,
    settings: WatchSettings,
    policy: StartupPolicy,
}

impl ConfigWatcher {
    pub fn new(loader: ConfigLoader, store: Arc<ConfigStore>) -> Self {
        Self {
            loader,
            store,
            settings: WatchSettings::default(),
            policy: StartupPolicy::default(),
        }
    }

    pub fn path(&self) -> &Path {
        self.loader.path()
    }

    pub fn with_settings(mut self, settings: WatchSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_startup_policy(mut self, policy: StartupPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Register the path, perform the initial load and start the dispatch task.
    ///
    /// The path is registered before the first load so a write landing in
    /// between is not missed. The task runs until `shutdown` fires.
    pub fn spawn(self, shutdown: broadcast::Receiver<()>) -> Result<WatcherHandle, WatchError> {
        let path = self.loader.path().to_path_buf();
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        let mut backend = RecommendedWatcher::new(
            move |res: notify::Result<Event>| {
                let _ = event_tx.send(res);
            },
            notify::Config::default(),
        )
        .map_err(WatchError::Backend)?;

        backend
            .watch(&path, RecursiveMode::NonRecursive)
            .map_err(|source| WatchError::Register {
                path: path.clone(),
                source,
            })?;

        if let Err(e) = self.loader.reload(&self.store) {
            match self.policy {
                StartupPolicy::FailFast => return Err(WatchError::InitialLoad(e)),
                StartupPolicy::Degrade => {
                    tracing::error!(
                        path = ?path,
                        error = %e,
                        "Initial config load failed, serving 503 until a valid config is loaded"
                    );
                }
            }
        }

        let (state_tx, state_rx) = watch::channel(WatchState::WatchingFile);
        let watch_loop = WatchLoop {
            path,
            backend,
            events: event_rx,
            loader: self.loader,
            store: self.store,
            settings: self.settings,
            state: state_tx,
            shutdown,
            stopping: false,
        };

        tracing::info!(path = ?watch_loop.path, "Config watcher started");
        let task = tokio::spawn(watch_loop.run());

        Ok(WatcherHandle {
            task,
            state: state_rx,
        })
    }
}

/// Handle to the running watch task.
#[derive(Debug)]
pub struct WatcherHandle {
    task: JoinHandle<()>,
    state: watch::Receiver<WatchState>,
}

impl WatcherHandle {
    pub fn state(&self) -> WatchState {
        *self.state.borrow()
    }

    /// Receiver notified on every state transition.
    pub fn subscribe_state(&self) -> watch::Receiver<WatchState> {
        self.state.clone()
    }

    /// Wait for the task to exit after shutdown was triggered.
    pub async fn join(self) -> Result<(), tokio::task::JoinError> {
        self.task.await
    }
}

/// Single sequential dispatch loop; owns the backend.
struct WatchLoop {
    path: PathBuf,
    backend: RecommendedWatcher,
    events: mpsc::UnboundedReceiver<notify::Result<Event>>,
    loader: ConfigLoader,
    store: Arc<ConfigStore>,
    settings: WatchSettings,
    state: watch::Sender<WatchState>,
    shutdown: broadcast::Receiver<()>,
    /// Set once shutdown was observed outside the main select.
    stopping: bool,
}

impl WatchLoop {
    async fn run(mut self) {
        let mut rearm = tokio::time::interval(self.settings.rearm_interval);
        rearm.set_missed_tick_behavior(MissedTickBehavior::Delay);

        while !self.stopping {
            let idle = self.current_state() == WatchState::Idle;
            tokio::select! {
                _ = self.shutdown.recv() => break,
                event = self.events.recv() => match event {
                    Some(Ok(event)) => self.on_event(event).await,
                    Some(Err(e)) => tracing::error!(error = %e, "Config file watch error"),
                    None => break,
                },
                _ = rearm.tick(), if idle => {
                    if self.register() {
                        self.set_state(WatchState::WatchingFile);
                        self.reload().await;
                    }
                }
            }
        }

        tracing::info!(path = ?self.path, "Config watcher stopped");
    }

    async fn on_event(&mut self, event: Event) {
        let action = classify(&event.kind);
        tracing::debug!(kind = ?event.kind, paths = ?event.paths, ?action, "Config file event");

        match action {
            Action::Reload => {
                tracing::info!(path = ?self.path, "Config file change detected, reloading...");
                self.reload().await;
            }
            Action::Rearm => {
                tracing::info!(path = ?self.path, "Config file removed or replaced, re-registering");
                if let Err(e) = self.backend.unwatch(&self.path) {
                    // inotify drops the watch by itself once the inode is gone
                    tracing::debug!(error = %e, "Unwatch failed");
                }
                self.set_state(WatchState::Idle);

                match self.rewatch().await {
                    Rewatch::Registered => {
                        self.set_state(WatchState::WatchingFile);
                        self.reload().await;
                    }
                    Rewatch::Missing => {
                        tracing::warn!(
                            path = ?self.path,
                            retry_every = ?self.settings.rearm_interval,
                            "Config file still missing, will keep retrying"
                        );
                    }
                    Rewatch::Stopped => {}
                }
            }
            Action::Ignore => {}
        }
    }

    /// Retry registration with backoff while the file is being recreated.
    ///
    /// Shutdown interrupts the backoff.
    async fn rewatch(&mut self) -> Rewatch {
        for attempt in 1..=self.settings.rewatch_attempts {
            if self.register() {
                return Rewatch::Registered;
            }
            let delay = rewatch_delay(
                attempt,
                self.settings.rewatch_base_delay_ms,
                self.settings.rewatch_max_delay_ms,
            );
            tokio::select! {
                _ = self.shutdown.recv() => {
                    self.stopping = true;
                    return Rewatch::Stopped;
                }
                _ = tokio::time::sleep(delay) => {}
            }
        }
        if self.register() {
            Rewatch::Registered
        } else {
            Rewatch::Missing
        }
    }

    fn register(&mut self) -> bool {
        match self.backend.watch(&self.path, RecursiveMode::NonRecursive) {
            Ok(()) => true,
            Err(e) => {
                tracing::debug!(path = ?self.path, error = %e, "Failed to register config path");
                false
            }
        }
    }

    /// Reload on the blocking pool; large buffers take a while to fill.
    async fn reload(&self) {
        let loader = self.loader.clone();
        let store = Arc::clone(&self.store);
        match tokio::task::spawn_blocking(move || loader.reload(&store)).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => {
                tracing::error!(path = ?self.path, error = %e, "Failed to reload config. Keeping current configuration.");
            }
            Err(e) => tracing::error!(error = %e, "Config reload task failed"),
        }
    }

    fn current_state(&self) -> WatchState {
        *self.state.borrow()
    }

    fn set_state(&self, next: WatchState) {
        let previous = self.state.send_replace(next);
        if previous != next {
            tracing::debug!(from = ?previous, to = ?next, "Watcher state changed");
        }
    }
}
