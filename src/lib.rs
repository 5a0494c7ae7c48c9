// ============================================================================
// Leaderboards Library
// ============================================================================

pub mod admin;
pub mod config;
pub mod core;
pub mod engine;
pub mod interface;
pub mod leaderboard;
pub mod storage;

// Re-export main types for convenience
pub use core::{EntityId, LeaderboardError, LeaderboardKind, MetricTask, Result};
pub use config::{EngineSettings, LeaderboardConfig};
pub use engine::{Engine, LeaderboardHandle, LeaderboardInfo};
pub use leaderboard::{Leaderboard, ResetCountdown, Step};

// Re-export collaborator API
pub use interface::{
    Clock, EngineContext, EntityDirectory, ManualClock, MemoryWorld, MetricSource,
    RewardDispatcher, SystemClock,
};
pub use storage::{FileStoreProvider, MemoryStoreProvider, PersistenceStore, StoreProvider};
