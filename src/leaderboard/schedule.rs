use crate::core::{LeaderboardError, Result};
use chrono::{DateTime, Duration, Utc};
use croner::Cron;

/// Monthly, at midnight on the first day.
pub const DEFAULT_CRON: &str = "0 0 0 1 * ?";

/// Next-occurrence lookup over a cron expression, evaluated in UTC.
///
/// Two dialects are accepted, told apart by field count:
///
/// - Quartz, 6 or 7 fields with seconds first (`0 0 0 1 * ?`). Weekdays run
///   `1` (Sunday) to `7` (Saturday); `L`, `W` and `#` are supported and the
///   optional year field must be `*` or `?`.
/// - Classic, 5 fields (`30 6 * * 1`). Weekdays run `0` or `7` (Sunday) to
///   `6` (Saturday) and the schedule fires at second zero.
#[derive(Debug, Clone)]
pub struct ScheduleEvaluator {
    expression: String,
    cron: Cron,
}

impl ScheduleEvaluator {
    pub fn parse(expression: &str) -> Result<Self> {
        let trimmed = expression.trim();
        let fields: Vec<&str> = trimmed.split_whitespace().collect();
        let pattern = match fields.len() {
            5 => fields.join(" "),
            6 | 7 => from_quartz(&fields).map_err(|reason| invalid(expression, reason))?,
            n => {
                return Err(invalid(
                    expression,
                    format!("expected 5, 6 or 7 fields, found {}", n),
                ));
            }
        };
        let cron = Cron::new(&pattern)
            .with_seconds_optional()
            .parse()
            .map_err(|e| invalid(expression, e.to_string()))?;
        Ok(Self {
            expression: trimmed.to_string(),
            cron,
        })
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// First scheduled instant strictly after `after`.
    pub fn next_occurrence(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.cron.find_next_occurrence(&after, false).ok()
    }

    /// `next_occurrence(last_reset) - now`. Zero or negative means a reset is due.
    pub fn time_until(&self, last_reset: DateTime<Utc>, now: DateTime<Utc>) -> Option<Duration> {
        self.next_occurrence(last_reset).map(|next| next - now)
    }
}

fn invalid(expression: &str, reason: String) -> LeaderboardError {
    LeaderboardError::Schedule {
        expression: expression.to_string(),
        reason,
    }
}

/// Rewrites a Quartz expression into the seconds-first classic form the
/// parser evaluates: `?` becomes `*`, weekday numbers shift down by one and
/// the year field is dropped.
fn from_quartz(fields: &[&str]) -> std::result::Result<String, String> {
    if let Some(year) = fields.get(6) {
        if *year != "*" && *year != "?" {
            return Err(format!("year field '{}' is not supported", year));
        }
    }

    let mut out: Vec<String> = fields[..6]
        .iter()
        .map(|field| if *field == "?" { "*".to_string() } else { field.to_string() })
        .collect();
    out[5] = quartz_weekdays(&out[5])?;
    Ok(out.join(" "))
}

/// `2-6/2,7#1` -> `1-5/2,6#1`. Step and nth values are left alone.
fn quartz_weekdays(field: &str) -> std::result::Result<String, String> {
    let mut items = Vec::new();
    for item in field.split(',') {
        let (base, step) = match item.split_once('/') {
            Some((base, step)) => (base, Some(step)),
            None => (item, None),
        };
        let base = base
            .split('-')
            .map(quartz_weekday)
            .collect::<std::result::Result<Vec<_>, _>>()?
            .join("-");
        items.push(match step {
            Some(step) => format!("{}/{}", base, step),
            None => base,
        });
    }
    Ok(items.join(","))
}

fn quartz_weekday(token: &str) -> std::result::Result<String, String> {
    let digits = token.chars().take_while(char::is_ascii_digit).count();
    if digits == 0 {
        return Ok(token.to_string());
    }
    let (number, suffix) = token.split_at(digits);
    match number.parse::<u8>() {
        Ok(day @ 1..=7) => Ok(format!("{}{}", day - 1, suffix)),
        _ => Err(format!("weekday '{}' is outside 1-7", number)),
    }
}
