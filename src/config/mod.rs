//! Leaderboard definitions, one TOML file per leaderboard.
//!
//! ```toml
//! type = "timed"
//! update-interval = 30
//! save-interval = 300
//! cron = "0 0 0 1 * ?"
//!
//! [[tasks]]
//! placeholder = "%statistic_mine_block%"
//! description = "Mine the most blocks"
//!
//! [rewards]
//! "1" = ["give {player} diamond 5"]
//! ```

pub mod settings;

pub use settings::EngineSettings;

use crate::core::{LeaderboardError, LeaderboardKind, MetricTask, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

pub const DEFAULT_UPDATE_INTERVAL: Duration = Duration::from_secs(30);
pub const DEFAULT_SAVE_INTERVAL: Duration = Duration::from_secs(300);

#[derive(Debug, Clone, PartialEq)]
pub struct LeaderboardConfig {
    /// Lower-cased, unique across the engine
    pub name: String,
    pub kind: LeaderboardKind,
    pub tasks: Vec<MetricTask>,
    pub update_interval: Duration,
    pub save_interval: Duration,
    /// Extra ticks before the first scan, used to stagger leaderboards
    pub start_offset: u64,
    /// Reset schedule, rotating leaderboards only
    pub cron: Option<String>,
    /// Position -> command templates, rotating leaderboards only
    pub rewards: BTreeMap<usize, Vec<String>>,
    /// File the definition was read from, if any
    pub source: Option<PathBuf>,
}

impl LeaderboardConfig {
    pub fn permanent(name: &str, task: MetricTask) -> Self {
        Self {
            name: name.to_lowercase(),
            kind: LeaderboardKind::Permanent,
            tasks: vec![task],
            update_interval: DEFAULT_UPDATE_INTERVAL,
            save_interval: DEFAULT_SAVE_INTERVAL,
            start_offset: 0,
            cron: None,
            rewards: BTreeMap::new(),
            source: None,
        }
    }

    pub fn rotating(name: &str, tasks: Vec<MetricTask>) -> Self {
        Self {
            name: name.to_lowercase(),
            kind: LeaderboardKind::Rotating,
            tasks,
            update_interval: DEFAULT_UPDATE_INTERVAL,
            save_interval: DEFAULT_SAVE_INTERVAL,
            start_offset: 0,
            cron: None,
            rewards: BTreeMap::new(),
            source: None,
        }
    }

    pub fn update_interval(mut self, interval: Duration) -> Self {
        self.update_interval = interval;
        self
    }

    pub fn save_interval(mut self, interval: Duration) -> Self {
        self.save_interval = interval;
        self
    }

    pub fn start_offset(mut self, ticks: u64) -> Self {
        self.start_offset = ticks;
        self
    }

    pub fn cron(mut self, expression: &str) -> Self {
        self.cron = Some(expression.to_string());
        self
    }

    pub fn reward(mut self, position: usize, commands: Vec<String>) -> Self {
        self.rewards.insert(position, commands);
        self
    }

    pub fn source(mut self, path: impl Into<PathBuf>) -> Self {
        self.source = Some(path.into());
        self
    }

    /// Parses one definition file's contents.
    pub fn from_toml(name: &str, text: &str) -> Result<Self> {
        let name = name.to_lowercase();
        let raw: RawConfig = toml::from_str(text)
            .map_err(|e| LeaderboardError::config(&name, format!("malformed TOML: {}", e)))?;
        raw.into_config(name)
    }
}

// ============================================================================
// Raw file shape
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct RawConfig {
    #[serde(rename = "type")]
    kind: Option<String>,
    tasks: Option<Vec<RawTask>>,
    update_interval: Option<u64>,
    save_interval: Option<u64>,
    cron: Option<String>,
    rewards: Option<BTreeMap<String, Vec<String>>>,
}

#[derive(Debug, Deserialize)]
struct RawTask {
    placeholder: Option<String>,
    description: Option<String>,
}

impl RawConfig {
    fn into_config(self, name: String) -> Result<LeaderboardConfig> {
        let kind_text = self.kind.as_deref().unwrap_or("simple");
        let kind = LeaderboardKind::parse(kind_text).ok_or_else(|| {
            LeaderboardError::config(&name, format!("unknown leaderboard type '{}'", kind_text))
        })?;

        let raw_tasks = self
            .tasks
            .ok_or_else(|| LeaderboardError::config(&name, "no tasks section"))?;
        if raw_tasks.is_empty() {
            return Err(LeaderboardError::config(&name, "empty tasks list"));
        }

        let tasks = match kind {
            LeaderboardKind::Permanent => {
                let first = &raw_tasks[0];
                let placeholder = first
                    .placeholder
                    .clone()
                    .ok_or_else(|| LeaderboardError::config(&name, "task has no placeholder"))?;
                vec![MetricTask::new(placeholder, first.description.clone().unwrap_or_default())]
            }
            LeaderboardKind::Rotating => {
                let mut tasks = Vec::with_capacity(raw_tasks.len());
                for (index, task) in raw_tasks.into_iter().enumerate() {
                    match (task.placeholder, task.description) {
                        (Some(placeholder), Some(description)) => {
                            tasks.push(MetricTask::new(placeholder, description))
                        }
                        _ => warn!(leaderboard = %name, index, "invalid task skipped"),
                    }
                }
                if tasks.is_empty() {
                    return Err(LeaderboardError::config(&name, "no valid tasks"));
                }
                tasks
            }
        };

        let mut rewards = BTreeMap::new();
        if kind == LeaderboardKind::Rotating {
            for (key, commands) in self.rewards.unwrap_or_default() {
                let position = key
                    .trim()
                    .parse::<usize>()
                    .ok()
                    .filter(|p| *p >= 1)
                    .ok_or_else(|| {
                        LeaderboardError::config(&name, format!("invalid reward position '{}'", key))
                    })?;
                if !commands.is_empty() {
                    rewards.insert(position, commands);
                }
            }
        }

        let cron = match kind {
            LeaderboardKind::Rotating => self.cron,
            LeaderboardKind::Permanent => None,
        };

        Ok(LeaderboardConfig {
            name,
            kind,
            tasks,
            update_interval: self
                .update_interval
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_UPDATE_INTERVAL),
            save_interval: self
                .save_interval
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_SAVE_INTERVAL),
            start_offset: 0,
            cron,
            rewards,
            source: None,
        })
    }
}

// ============================================================================
// Directory loading
// ============================================================================

#[derive(Debug)]
pub struct SkippedConfig {
    pub file: PathBuf,
    pub error: LeaderboardError,
}

#[derive(Debug, Default)]
pub struct ConfigSet {
    pub configs: Vec<LeaderboardConfig>,
    pub skipped: Vec<SkippedConfig>,
}

/// Reads every `*.toml` in `dir`, in file-name order.
///
/// A broken file is reported in [`ConfigSet::skipped`] and does not stop the
/// others. Each loaded config gets `start_offset = index * stagger_ticks`.
pub fn load_directory(dir: &Path, stagger_ticks: u64) -> Result<ConfigSet> {
    fs::create_dir_all(dir).map_err(|e| {
        LeaderboardError::IoError(format!("Failed to create config directory: {}", e))
    })?;

    let mut files: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "toml"))
        .collect();
    files.sort();

    let mut set = ConfigSet::default();
    for file in files {
        let Some(name) = file.file_stem().and_then(|s| s.to_str()).map(str::to_lowercase) else {
            continue;
        };

        let parsed = fs::read_to_string(&file)
            .map_err(LeaderboardError::from)
            .and_then(|text| LeaderboardConfig::from_toml(&name, &text))
            .map(|config| config.source(&file));

        match parsed {
            Ok(config) if set.configs.iter().any(|c| c.name == config.name) => {
                let error = LeaderboardError::config(&name, "duplicate leaderboard name");
                warn!(file = %file.display(), error = %error, "leaderboard skipped");
                set.skipped.push(SkippedConfig { file, error });
            }
            Ok(config) => {
                let offset = set.configs.len() as u64 * stagger_ticks;
                set.configs.push(config.start_offset(offset));
            }
            Err(error) => {
                warn!(file = %file.display(), error = %error, "leaderboard skipped");
                set.skipped.push(SkippedConfig { file, error });
            }
        }
    }

    Ok(set)
}
