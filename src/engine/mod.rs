//! Leaderboard manager: loads every definition, owns the live instances and
//! drives them from one tick loop plus one save loop per leaderboard.

pub mod handle;
pub mod placeholder;
pub mod worker;

pub use handle::{Cadence, FlushOutcome, LeaderboardHandle};
pub use placeholder::format_remaining;
pub use worker::Worker;

use crate::config::{ConfigSet, EngineSettings, SkippedConfig, load_directory};
use crate::core::{LeaderboardError, LeaderboardKind, Result};
use crate::interface::EngineContext;
use crate::leaderboard::{RankingEntry, ResetCountdown};
use futures::future::join_all;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use tracing::{debug_span, info, warn};
use worker::{spawn_save_worker, spawn_tick_worker};

type Registry = BTreeMap<String, Arc<LeaderboardHandle>>;

/// What the query surface reports about one leaderboard.
#[derive(Debug, Clone, PartialEq)]
pub struct LeaderboardInfo {
    pub name: String,
    pub kind: LeaderboardKind,
    pub placeholders: Vec<String>,
    pub active_index: usize,
    pub description: String,
    pub reset: ResetCountdown,
}

/// State shared between the engine and its tick worker.
pub struct EngineCore {
    pub(crate) settings: EngineSettings,
    pub(crate) context: EngineContext,
    registry: RwLock<Registry>,
    ticks: AtomicU64,
}

impl EngineCore {
    fn handles(&self) -> Result<Vec<Arc<LeaderboardHandle>>> {
        Ok(self.registry.read()?.values().cloned().collect())
    }

    /// Ticks every leaderboard once. A failing leaderboard does not stop the others.
    pub(crate) fn tick(&self) -> Result<u64> {
        let tick = self.ticks.fetch_add(1, Ordering::SeqCst);
        let _span = debug_span!("tick", tick).entered();

        for handle in self.handles()? {
            if let Err(err) = handle.tick(tick, &self.context) {
                warn!(leaderboard = %handle.name(), error = %err, kind = err.as_label(), "tick failed");
            }
        }
        Ok(tick)
    }
}

pub struct Engine {
    core: Arc<EngineCore>,
    failures: Vec<SkippedConfig>,
    tick_worker: Option<Worker>,
    save_workers: Vec<Worker>,
}

impl Engine {
    /// Loads every leaderboard without starting any background work.
    ///
    /// The embedding process calls [`Engine::tick`] itself.
    pub fn load(settings: EngineSettings, context: EngineContext) -> Result<Self> {
        let (registry, failures) = build_registry(&settings, &context)?;
        Ok(Self {
            core: Arc::new(EngineCore {
                settings,
                context,
                registry: RwLock::new(registry),
                ticks: AtomicU64::new(0),
            }),
            failures,
            tick_worker: None,
            save_workers: Vec::new(),
        })
    }

    /// Loads every leaderboard and starts the tick driver and save workers.
    pub async fn start(settings: EngineSettings, context: EngineContext) -> Result<Self> {
        let mut engine = Self::load(settings, context)?;
        engine.spawn_workers()?;
        Ok(engine)
    }

    fn spawn_workers(&mut self) -> Result<()> {
        for handle in self.core.handles()? {
            self.save_workers.push(spawn_save_worker(handle));
        }
        self.tick_worker = Some(spawn_tick_worker(self.core.clone()));
        info!(
            leaderboards = self.save_workers.len(),
            tick_ms = self.core.settings.tick_interval.as_millis() as u64,
            "engine started"
        );
        Ok(())
    }

    async fn stop_workers(&mut self) {
        // the tick driver goes first so no scan starts after the final flush
        if let Some(worker) = self.tick_worker.take() {
            if let Err(err) = worker.stop().await {
                warn!(error = %err, "tick worker did not stop cleanly");
            }
        }
        let stops = self.save_workers.drain(..).map(Worker::stop);
        for result in join_all(stops).await {
            if let Err(err) = result {
                warn!(error = %err, "save worker did not stop cleanly");
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.tick_worker.is_some()
    }

    /// Advances the tick counter and ticks every leaderboard once.
    ///
    /// Only meant for hosted mode; a started engine ticks on its own.
    pub fn tick(&self) -> Result<u64> {
        self.core.tick()
    }

    pub fn current_tick(&self) -> u64 {
        self.core.ticks.load(Ordering::SeqCst)
    }

    /// Writes every dirty leaderboard. Returns how many were written.
    ///
    /// Write failures are logged per leaderboard and leave it dirty.
    pub fn flush_all(&self) -> Result<usize> {
        let mut written = 0;
        for handle in self.core.handles()? {
            if let Ok(FlushOutcome::Written) = handle.flush() {
                written += 1;
            }
        }
        Ok(written)
    }

    /// Stops all background work, then flushes everything once.
    pub async fn shutdown(&mut self) -> Result<usize> {
        self.stop_workers().await;
        let written = self.flush_all()?;
        for name in self.names() {
            info!(leaderboard = %name, "leaderboard stopped");
        }
        Ok(written)
    }

    /// Shuts down, then rebuilds every leaderboard from the config directory.
    ///
    /// Background work is restarted only if it was running before.
    pub async fn reload(&mut self) -> Result<()> {
        let restart = self.is_running();
        self.shutdown().await?;

        let (registry, failures) = build_registry(&self.core.settings, &self.core.context)?;
        *self.core.registry.write()? = registry;
        self.core.ticks.store(0, Ordering::SeqCst);
        self.failures = failures;

        if restart {
            self.spawn_workers()?;
        }
        info!(leaderboards = self.len(), skipped = self.failures.len(), "engine reloaded");
        Ok(())
    }

    // ========================================================================
    // Lookup
    // ========================================================================

    /// Case-insensitive lookup.
    pub fn get(&self, name: &str) -> Option<Arc<LeaderboardHandle>> {
        self.core
            .registry
            .read()
            .ok()?
            .get(&name.to_lowercase())
            .cloned()
    }

    /// Like [`Engine::get`], but unknown names are an error.
    pub fn require(&self, name: &str) -> Result<Arc<LeaderboardHandle>> {
        self.get(name)
            .ok_or_else(|| LeaderboardError::NotFound(name.to_lowercase()))
    }

    pub fn names(&self) -> Vec<String> {
        self.core
            .registry
            .read()
            .map(|registry| registry.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.core
            .registry
            .read()
            .map(|registry| registry.len())
            .unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Definitions that failed to load on the last load or reload.
    pub fn failures(&self) -> &[SkippedConfig] {
        &self.failures
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.core.settings
    }

    pub fn context(&self) -> &EngineContext {
        &self.core.context
    }

    pub fn info(&self, name: &str) -> Option<LeaderboardInfo> {
        let now = self.core.context.now();
        self.get(name)?
            .with_board(|board| LeaderboardInfo {
                name: board.name().to_string(),
                kind: board.kind(),
                placeholders: board.tasks().iter().map(|t| t.placeholder.clone()).collect(),
                active_index: board.current_task_index(),
                description: board.description().to_string(),
                reset: board.time_until_reset(now),
            })
            .ok()
    }

    /// Ranked entries of one leaderboard, best first.
    pub fn standings(&self, name: &str) -> Option<Vec<RankingEntry>> {
        self.get(name)?
            .with_board(|board| board.ranking().entries().to_vec())
            .ok()
    }

    pub fn top_name(&self, name: &str, position: usize) -> String {
        let directory = self.core.context.directory.as_ref();
        self.get(name)
            .and_then(|handle| {
                handle
                    .with_board(|board| board.top_name(position, directory))
                    .ok()
            })
            .unwrap_or_default()
    }

    pub fn top_value(&self, name: &str, position: usize) -> String {
        self.get(name)
            .and_then(|handle| handle.with_board(|board| board.top_value(position)).ok())
            .unwrap_or_default()
    }
}

fn build_registry(
    settings: &EngineSettings,
    context: &EngineContext,
) -> Result<(Registry, Vec<SkippedConfig>)> {
    let ConfigSet {
        configs,
        mut skipped,
    } = load_directory(&settings.config_dir, settings.stagger_ticks)?;

    let mut registry = Registry::new();
    for config in configs {
        match LeaderboardHandle::open(&config, settings, context) {
            Ok(handle) => {
                info!(
                    leaderboard = %config.name,
                    kind = %config.kind,
                    tasks = config.tasks.len(),
                    first_tick = handle.cadence().first_tick,
                    "leaderboard started"
                );
                registry.insert(config.name.clone(), Arc::new(handle));
            }
            Err(error) => {
                warn!(leaderboard = %config.name, error = %error, "leaderboard skipped");
                skipped.push(SkippedConfig {
                    file: config
                        .source
                        .clone()
                        .unwrap_or_else(|| settings.config_dir.join(format!("{}.toml", config.name))),
                    error,
                });
            }
        }
    }
    Ok((registry, skipped))
}
