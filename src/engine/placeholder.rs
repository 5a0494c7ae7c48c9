use super::Engine;
use crate::leaderboard::ResetCountdown;
use chrono::Duration;

/// Renders a remaining duration as `X days, Y hours, Z minutes`.
pub fn format_remaining(remaining: Duration) -> String {
    let minutes = remaining.num_minutes().max(0);
    format!(
        "{} days, {} hours, {} minutes",
        minutes / (24 * 60),
        (minutes / 60) % 24,
        minutes % 60
    )
}

impl Engine {
    /// Answers a host placeholder query such as `topname_kills_1`.
    ///
    /// Matching is case-insensitive; anything unknown expands to an empty string.
    pub fn expand(&self, params: &str) -> String {
        let params = params.trim().to_lowercase();

        if let Some(name) = params.strip_prefix("description_") {
            return self
                .get(name)
                .and_then(|handle| handle.with_board(|b| b.description().to_string()).ok())
                .unwrap_or_default();
        }
        if let Some(rest) = params.strip_prefix("topname_") {
            return match split_position(rest) {
                Some((name, position)) => self.top_name(name, position),
                None => String::new(),
            };
        }
        if let Some(rest) = params.strip_prefix("topvalue_") {
            return match split_position(rest) {
                Some((name, position)) => self.top_value(name, position),
                None => String::new(),
            };
        }
        if let Some(name) = params.strip_prefix("timeuntil_") {
            return match self.info(name).map(|info| info.reset) {
                Some(ResetCountdown::Permanent) => "Permanent".to_string(),
                Some(ResetCountdown::Due) => "Resetting...".to_string(),
                Some(ResetCountdown::Remaining(remaining)) => format_remaining(remaining),
                Some(ResetCountdown::Unscheduled) => "Never".to_string(),
                // unknown names expand to nothing, like every other prefix
                None => String::new(),
            };
        }
        String::new()
    }
}

/// `kills_3` -> `("kills", 3)`. The name itself may contain underscores.
fn split_position(rest: &str) -> Option<(&str, usize)> {
    let (name, position) = rest.rsplit_once('_')?;
    let position = position.parse::<usize>().ok().filter(|p| *p >= 1)?;
    Some((name, position))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_remaining() {
        let remaining = Duration::days(2) + Duration::hours(5) + Duration::minutes(7);
        assert_eq!(format_remaining(remaining), "2 days, 5 hours, 7 minutes");
        assert_eq!(format_remaining(Duration::seconds(59)), "0 days, 0 hours, 0 minutes");
    }

    #[test]
    fn test_split_position() {
        assert_eq!(split_position("kills_3"), Some(("kills", 3)));
        assert_eq!(split_position("mob_kills_10"), Some(("mob_kills", 10)));
        assert_eq!(split_position("kills_0"), None);
        assert_eq!(split_position("kills_x"), None);
        assert_eq!(split_position("kills"), None);
    }
}
