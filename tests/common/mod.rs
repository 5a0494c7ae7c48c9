#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use leaderboards::storage::MemoryStore;
use leaderboards::{
    EngineContext, EngineSettings, EntityId, FileStoreProvider, ManualClock, MemoryStoreProvider,
    MemoryWorld,
};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use uuid::Uuid;

pub const KILLS: &str = r#"
type = "simple"
update-interval = 1

[[tasks]]
placeholder = "%kills%"
description = "Most kills"
"#;

pub const WEEKLY: &str = r#"
type = "timed"
update-interval = 1
cron = "0 0 0 1 * ?"

[[tasks]]
placeholder = "%blocks%"
description = "Mine blocks"

[[tasks]]
placeholder = "%fish%"
description = "Catch fish"

[rewards]
"1" = ["give {player} {score}", "say {player} finished #{position}"]
"2" = ["give {player} {score}"]
"5" = ["give {player} 1"]
"#;

pub fn january() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 10, 12, 0, 0).unwrap()
}

/// Temp config/data directories plus in-memory collaborators.
pub struct Harness {
    pub dir: TempDir,
    pub world: Arc<MemoryWorld>,
    pub clock: Arc<ManualClock>,
    pub stores: Arc<MemoryStoreProvider>,
}

impl Harness {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
            world: Arc::new(MemoryWorld::new()),
            clock: Arc::new(ManualClock::new(january())),
            stores: Arc::new(MemoryStoreProvider::new()),
        }
    }

    pub fn config_dir(&self) -> PathBuf {
        self.dir.path().join("leaderboards")
    }

    pub fn write_config(&self, name: &str, contents: &str) {
        fs::create_dir_all(self.config_dir()).unwrap();
        fs::write(self.config_dir().join(format!("{}.toml", name)), contents).unwrap();
    }

    pub fn remove_config(&self, name: &str) {
        fs::remove_file(self.config_dir().join(format!("{}.toml", name))).unwrap();
    }

    /// One tick per second, so `update-interval = 1` scans on every tick.
    pub fn settings(&self) -> EngineSettings {
        EngineSettings::new(self.config_dir())
            .tick_interval(Duration::from_secs(1))
            .initial_delay_ticks(0)
            .stagger_ticks(0)
    }

    pub fn context(&self) -> EngineContext {
        EngineContext::new(
            self.world.clone(),
            self.world.clone(),
            self.world.clone(),
            self.stores.clone(),
        )
        .with_clock(self.clock.clone())
    }

    pub fn file_context(&self) -> EngineContext {
        EngineContext::new(
            self.world.clone(),
            self.world.clone(),
            self.world.clone(),
            Arc::new(FileStoreProvider::new(self.dir.path())),
        )
        .with_clock(self.clock.clone())
    }

    pub fn store(&self, leaderboard: &str) -> Arc<MemoryStore> {
        self.stores.store(leaderboard).unwrap()
    }

    pub fn player(&self, name: &str) -> EntityId {
        let id = Uuid::new_v5(&Uuid::NAMESPACE_OID, name.as_bytes());
        self.world.join(id, name).unwrap();
        id
    }

    pub fn set(&self, player: EntityId, placeholder: &str, value: &str) {
        self.world.set_metric(player, placeholder, value).unwrap();
    }
}
