//! On-disk shape of leaderboard state.
//!
//! Permanent boards persist a flat `{ "<player-uuid>": score }` object.
//! Rotating boards persist `last-reset` (epoch millis), `current-task-index`,
//! and the `baseline` / `values` maps keyed by player uuid.

use crate::core::{EntityId, LeaderboardError, LeaderboardKind, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermanentSnapshot {
    pub values: BTreeMap<EntityId, f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RotatingSnapshot {
    /// Epoch millis. Missing in a saved file means the board was never reset.
    #[serde(default)]
    pub last_reset: Option<i64>,
    #[serde(default)]
    pub current_task_index: usize,
    #[serde(default)]
    pub baseline: BTreeMap<EntityId, f64>,
    #[serde(default)]
    pub values: BTreeMap<EntityId, f64>,
}

/// Value copy of everything a leaderboard persists.
#[derive(Debug, Clone, PartialEq)]
pub enum LeaderboardSnapshot {
    Permanent(PermanentSnapshot),
    Rotating(RotatingSnapshot),
}

impl LeaderboardSnapshot {
    pub fn kind(&self) -> LeaderboardKind {
        match self {
            Self::Permanent(_) => LeaderboardKind::Permanent,
            Self::Rotating(_) => LeaderboardKind::Rotating,
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        let encoded = match self {
            Self::Permanent(snapshot) => serde_json::to_vec_pretty(snapshot),
            Self::Rotating(snapshot) => serde_json::to_vec_pretty(snapshot),
        };
        encoded.map_err(|e| LeaderboardError::Snapshot(format!("Failed to serialize state: {}", e)))
    }

    pub fn decode(kind: LeaderboardKind, bytes: &[u8]) -> Result<Self> {
        let decoded = match kind {
            LeaderboardKind::Permanent => serde_json::from_slice(bytes).map(Self::Permanent),
            LeaderboardKind::Rotating => serde_json::from_slice(bytes).map(Self::Rotating),
        };
        decoded.map_err(|e| {
            LeaderboardError::Snapshot(format!("Failed to deserialize {} state: {}", kind, e))
        })
    }
}

pub(crate) fn to_ordered(map: &HashMap<EntityId, f64>) -> BTreeMap<EntityId, f64> {
    map.iter().map(|(id, value)| (*id, *value)).collect()
}
