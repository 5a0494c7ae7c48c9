use thiserror::Error;

#[derive(Error, Debug)]
pub enum LeaderboardError {
    #[error("Config error in '{name}': {reason}")]
    Config { name: String, reason: String },

    #[error("Invalid schedule '{expression}': {reason}")]
    Schedule { expression: String, reason: String },

    #[error("Metric resolution failed: {0}")]
    Metric(String),

    #[error("Snapshot error: {0}")]
    Snapshot(String),

    #[error("Reward dispatch failed: {0}")]
    Dispatch(String),

    #[error("Leaderboard '{0}' not found")]
    NotFound(String),

    #[error("Background worker error: {0}")]
    Worker(String),

    #[error("Lock error: {0}")]
    LockError(String),

    #[error("I/O error: {0}")]
    IoError(String),
}

impl LeaderboardError {
    pub fn config(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Config {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Short stable label for log fields.
    pub fn as_label(&self) -> &'static str {
        match self {
            Self::Config { .. } => "config_invalid",
            Self::Schedule { .. } => "schedule_invalid",
            Self::Metric(_) => "metric_failed",
            Self::Snapshot(_) => "snapshot_invalid",
            Self::Dispatch(_) => "dispatch_failed",
            Self::NotFound(_) => "not_found",
            Self::Worker(_) => "worker_failed",
            Self::LockError(_) => "lock_poisoned",
            Self::IoError(_) => "io_failed",
        }
    }
}

pub type Result<T> = std::result::Result<T, LeaderboardError>;

impl<T> From<std::sync::PoisonError<T>> for LeaderboardError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        Self::LockError(err.to_string())
    }
}

impl From<std::io::Error> for LeaderboardError {
    fn from(err: std::io::Error) -> Self {
        Self::IoError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_are_stable() {
        let err = LeaderboardError::config("weekly", "empty tasks list");
        assert_eq!(err.as_label(), "config_invalid");
        assert_eq!(err.to_string(), "Config error in 'weekly': empty tasks list");

        let err = LeaderboardError::NotFound("kills".into());
        assert_eq!(err.as_label(), "not_found");
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: LeaderboardError = io.into();
        assert_eq!(err.as_label(), "io_failed");
    }
}
