//! Administrative commands: `reload`, `info <leaderboard>`, `top <leaderboard> [page]`.
//!
//! Output is a list of plain lines so any host (console, chat, test) can print it.

use crate::core::{LeaderboardKind, format_score};
use crate::engine::{Engine, LeaderboardInfo, format_remaining};
use crate::leaderboard::ResetCountdown;

pub const INFO_USAGE: &str = "info <leaderboard>";
pub const TOP_USAGE: &str = "top <leaderboard> [page]";
pub const NOT_FOUND: &str = "Not found.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminCommand {
    Reload,
    Info { leaderboard: String },
    Top { leaderboard: String, page: usize },
}

impl AdminCommand {
    /// Parses one command line. `Err` carries the lines to show instead,
    /// usually a usage hint.
    pub fn parse(line: &str) -> Result<Self, Vec<String>> {
        let args: Vec<&str> = line.split_whitespace().collect();
        let Some(first) = args.first() else {
            return Err(usage());
        };

        match first.to_lowercase().as_str() {
            "reload" => Ok(Self::Reload),
            "info" => match args.as_slice() {
                [_, name] => Ok(Self::Info {
                    leaderboard: name.to_lowercase(),
                }),
                _ => Err(vec![INFO_USAGE.to_string()]),
            },
            "top" => match args.as_slice() {
                [_, name] => Ok(Self::Top {
                    leaderboard: name.to_lowercase(),
                    page: 1,
                }),
                [_, name, page] => match page.parse::<usize>() {
                    Ok(page) if page >= 1 => Ok(Self::Top {
                        leaderboard: name.to_lowercase(),
                        page,
                    }),
                    _ => Err(vec![TOP_USAGE.to_string()]),
                },
                _ => Err(vec![TOP_USAGE.to_string()]),
            },
            _ => Err(usage()),
        }
    }

    pub async fn execute(&self, engine: &mut Engine) -> Vec<String> {
        match self {
            Self::Reload => match engine.reload().await {
                Ok(()) => {
                    let mut lines = vec!["Reloaded.".to_string()];
                    for skipped in engine.failures() {
                        lines.push(format!("Skipped {}: {}", skipped.file.display(), skipped.error));
                    }
                    lines
                }
                Err(err) => vec![format!("Reload failed: {}", err)],
            },
            Self::Info { leaderboard } => render_info(engine, leaderboard),
            Self::Top { leaderboard, page } => render_top(engine, leaderboard, *page),
        }
    }
}

pub fn usage() -> Vec<String> {
    vec!["reload".to_string(), INFO_USAGE.to_string(), TOP_USAGE.to_string()]
}

/// Completions for the argument being typed.
pub fn complete(engine: &Engine, args: &[&str]) -> Vec<String> {
    match args {
        [] | [_] => {
            let prefix = args.first().map(|a| a.to_lowercase()).unwrap_or_default();
            ["reload", "info", "top"]
                .into_iter()
                .filter(|c| c.starts_with(&prefix))
                .map(str::to_string)
                .collect()
        }
        [command, partial] if command.eq_ignore_ascii_case("info") || command.eq_ignore_ascii_case("top") => {
            let partial = partial.to_lowercase();
            engine
                .names()
                .into_iter()
                .filter(|name| name.starts_with(&partial))
                .collect()
        }
        _ => Vec::new(),
    }
}

pub fn render_info(engine: &Engine, name: &str) -> Vec<String> {
    match engine.info(name) {
        Some(info) => info_lines(&info),
        None => vec![NOT_FOUND.to_string()],
    }
}

fn info_lines(info: &LeaderboardInfo) -> Vec<String> {
    let mut lines = vec![info.name.clone(), format!("Type: {}", info.kind)];

    if info.placeholders.len() == 1 {
        lines.push(format!("Placeholder: {}", info.placeholders[0]));
    } else {
        let marked: Vec<String> = info
            .placeholders
            .iter()
            .enumerate()
            .map(|(i, p)| {
                if i == info.active_index {
                    format!("[{}]", p)
                } else {
                    p.clone()
                }
            })
            .collect();
        lines.push(format!("Placeholders: {}", marked.join(", ")));
    }
    lines.push(format!("Description: {}", info.description));

    let resets = match (info.kind, info.reset) {
        (LeaderboardKind::Permanent, _) | (_, ResetCountdown::Permanent) => "Permanent".to_string(),
        (_, ResetCountdown::Remaining(remaining)) => format_remaining(remaining),
        (_, ResetCountdown::Due | ResetCountdown::Unscheduled) => "Soon".to_string(),
    };
    lines.push(format!("Resets in: {}", resets));
    lines
}

/// One page of the standings. Entries at or below zero are not shown.
pub fn render_top(engine: &Engine, name: &str, page: usize) -> Vec<String> {
    let Some(standings) = engine.standings(name) else {
        return vec![NOT_FOUND.to_string()];
    };

    let page_size = engine.settings().page_size.max(1);
    let shown: Vec<_> = standings
        .into_iter()
        .enumerate()
        .filter(|(_, entry)| entry.score.is_finite() && entry.score > 0.0)
        .collect();
    let pages = shown.len().div_ceil(page_size).max(1);
    let page = page.clamp(1, pages);

    let mut lines = vec![format!("Top {} (page {}/{})", name.to_lowercase(), page, pages)];
    let directory = engine.context().directory.as_ref();
    let rows: Vec<String> = shown
        .iter()
        .skip((page - 1) * page_size)
        .take(page_size)
        .map(|(index, entry)| {
            let player = directory
                .display_name(entry.entity)
                .unwrap_or_else(|| entry.entity.to_string());
            format!("#{} {} - {}", index + 1, player, format_score(entry.score))
        })
        .collect();

    if rows.is_empty() {
        lines.push("No entries.".to_string());
    } else {
        lines.extend(rows);
    }
    lines
}
