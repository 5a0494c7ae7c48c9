use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Stable identifier of a tracked player.
pub type EntityId = Uuid;

/// Maximum number of ranked entries retained per leaderboard.
pub const CACHE_LIMIT: usize = 30;

/// Entities resolved per scheduler tick during a scan or a baseline re-seed.
pub const BATCH_SIZE: usize = 10;

/// A metric the leaderboard tracks, identified by its placeholder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricTask {
    pub placeholder: String,
    pub description: String,
}

impl MetricTask {
    pub fn new(placeholder: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            placeholder: placeholder.into(),
            description: description.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LeaderboardKind {
    /// Single fixed metric, absolute values, never reset.
    #[serde(rename = "simple")]
    Permanent,
    /// Rotates through its tasks on a cron schedule, scoring the delta from a baseline.
    #[serde(rename = "timed")]
    Rotating,
}

impl LeaderboardKind {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "simple" | "permanent" => Some(Self::Permanent),
            "timed" | "rotating" => Some(Self::Rotating),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Permanent => "simple",
            Self::Rotating => "timed",
        }
    }
}

impl fmt::Display for LeaderboardKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parses the text a metric source resolved to.
///
/// Thousands separators are dropped. Anything that is not a finite number
/// yields `None`, which callers treat as "no observation".
pub fn parse_metric(raw: &str) -> Option<f64> {
    let cleaned: String = raw.trim().chars().filter(|c| *c != ',').collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Renders a score without trailing fractional zeros (`100.0` -> `100`, `2.50` -> `2.5`).
pub fn format_score(value: f64) -> String {
    if value == 0.0 {
        // covers -0.0
        return "0".to_string();
    }
    if value.fract() == 0.0 && value.abs() < 1e15 {
        return format!("{:.0}", value);
    }
    let text = format!("{}", value);
    if text.contains('.') && !text.contains('e') {
        text.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_metric_accepts_numbers() {
        assert_eq!(parse_metric("5"), Some(5.0));
        assert_eq!(parse_metric(" 12.5 "), Some(12.5));
        assert_eq!(parse_metric("1,234,567"), Some(1_234_567.0));
        assert_eq!(parse_metric("-3"), Some(-3.0));
    }

    #[test]
    fn test_parse_metric_rejects_text() {
        assert_eq!(parse_metric("N/A"), None);
        assert_eq!(parse_metric(""), None);
        assert_eq!(parse_metric("%statistic_kills%"), None);
        assert_eq!(parse_metric("NaN"), None);
        assert_eq!(parse_metric("inf"), None);
    }

    #[test]
    fn test_format_score_strips_zeros() {
        assert_eq!(format_score(100.0), "100");
        assert_eq!(format_score(7.0), "7");
        assert_eq!(format_score(2.5), "2.5");
        assert_eq!(format_score(-0.0), "0");
        assert_eq!(format_score(-4.25), "-4.25");
    }

    #[test]
    fn test_kind_parse_and_labels() {
        assert_eq!(LeaderboardKind::parse("TIMED"), Some(LeaderboardKind::Rotating));
        assert_eq!(LeaderboardKind::parse("simple"), Some(LeaderboardKind::Permanent));
        assert_eq!(LeaderboardKind::parse("weekly"), None);
        assert_eq!(LeaderboardKind::Rotating.to_string(), "timed");
    }
}
