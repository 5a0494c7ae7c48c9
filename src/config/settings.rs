use crate::core::{BATCH_SIZE, CACHE_LIMIT};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Engine-wide settings
///
/// Per-leaderboard settings live in [`super::LeaderboardConfig`]; these apply to
/// every leaderboard the engine hosts.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// Directory holding one `<name>.toml` per leaderboard
    pub config_dir: PathBuf,

    /// Length of one scheduler tick
    pub tick_interval: Duration,

    /// Players resolved per tick during a scan or re-seed
    pub batch_size: usize,

    /// Ranked entries kept per leaderboard
    pub cache_limit: usize,

    /// Ticks between the first scans of consecutive leaderboards
    pub stagger_ticks: u64,

    /// Ticks before the first leaderboard scans
    pub initial_delay_ticks: u64,

    /// Entries per page of the `top` command
    pub page_size: usize,
}

impl EngineSettings {
    pub fn new<P: AsRef<Path>>(config_dir: P) -> Self {
        Self {
            config_dir: config_dir.as_ref().to_path_buf(),
            tick_interval: Duration::from_millis(50),
            batch_size: BATCH_SIZE,
            cache_limit: CACHE_LIMIT,
            stagger_ticks: 10,
            initial_delay_ticks: 20,
            page_size: 10,
        }
    }

    /// Set the tick length
    pub fn tick_interval(mut self, tick: Duration) -> Self {
        self.tick_interval = tick;
        self
    }

    /// Set the batch size
    pub fn batch_size(mut self, size: usize) -> Self {
        self.batch_size = size;
        self
    }

    /// Set the ranking size
    pub fn cache_limit(mut self, limit: usize) -> Self {
        self.cache_limit = limit;
        self
    }

    /// Set the stagger between leaderboards
    pub fn stagger_ticks(mut self, ticks: u64) -> Self {
        self.stagger_ticks = ticks;
        self
    }

    /// Set the delay before the first scan
    pub fn initial_delay_ticks(mut self, ticks: u64) -> Self {
        self.initial_delay_ticks = ticks;
        self
    }

    /// Set the `top` page size
    pub fn page_size(mut self, size: usize) -> Self {
        self.page_size = size;
        self
    }

    /// Whole ticks covering `duration`, never less than one.
    pub fn ticks_for(&self, duration: Duration) -> u64 {
        let tick = self.tick_interval.as_millis().max(1);
        let ticks = duration.as_millis().div_ceil(tick);
        u64::try_from(ticks).unwrap_or(u64::MAX).max(1)
    }
}
