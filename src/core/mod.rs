pub mod error;
pub mod types;

pub use error::{LeaderboardError, Result};
pub use types::{
    BATCH_SIZE, CACHE_LIMIT, EntityId, LeaderboardKind, MetricTask, format_score, parse_metric,
};
