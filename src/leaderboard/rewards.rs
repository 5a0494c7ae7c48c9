use super::ranking::RankingEntry;
use crate::core::format_score;
use crate::interface::{EntityDirectory, RewardDispatcher};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Reward command templates per finishing position (1-indexed).
///
/// Templates may use `{player}`, `{position}` and `{score}`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RewardTable {
    rules: BTreeMap<usize, Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RewardReport {
    pub dispatched: usize,
    pub failed: usize,
    pub skipped_positions: Vec<usize>,
}

impl RewardTable {
    pub fn new(rules: BTreeMap<usize, Vec<String>>) -> Self {
        Self { rules }
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn rules(&self) -> &BTreeMap<usize, Vec<String>> {
        &self.rules
    }

    /// Runs every rule against a ranking captured before the reset.
    ///
    /// Positions past the end of the ranking are ignored. A rule whose player
    /// has no display name is skipped; the remaining rules still run.
    pub fn distribute(
        &self,
        standings: &[RankingEntry],
        directory: &dyn EntityDirectory,
        dispatcher: &dyn RewardDispatcher,
    ) -> RewardReport {
        let mut report = RewardReport::default();

        for (position, templates) in &self.rules {
            let Some(entry) = position.checked_sub(1).and_then(|i| standings.get(i)) else {
                continue;
            };
            let Some(player) = directory.display_name(entry.entity) else {
                warn!(position, entity = %entry.entity, "reward skipped, player name unresolved");
                report.skipped_positions.push(*position);
                continue;
            };
            let score = format_score(entry.score);

            for template in templates {
                let command = render(template, &player, *position, &score);
                match dispatcher.dispatch(&command) {
                    Ok(()) => {
                        debug!(position, command = %command, "reward dispatched");
                        report.dispatched += 1;
                    }
                    Err(err) => {
                        warn!(position, command = %command, error = %err, "reward dispatch failed");
                        report.failed += 1;
                    }
                }
            }
        }

        report
    }
}

/// Substitutes in one pass, so text coming from a substitution is never
/// scanned again.
fn render(template: &str, player: &str, position: usize, score: &str) -> String {
    let position = position.to_string();
    let tokens = [("{player}", player), ("{position}", position.as_str()), ("{score}", score)];

    let mut out = String::with_capacity(template.len() + player.len());
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        rest = &rest[start..];
        match tokens.iter().find(|(token, _)| rest.starts_with(token)) {
            Some((token, value)) => {
                out.push_str(value);
                rest = &rest[token.len()..];
            }
            None => {
                out.push('{');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interface::MemoryWorld;
    use uuid::Uuid;

    fn standings(world: &MemoryWorld) -> Vec<RankingEntry> {
        let a = Uuid::from_u128(1);
        let b = Uuid::from_u128(2);
        world.join(a, "A").unwrap();
        world.join(b, "B").unwrap();
        vec![
            RankingEntry { entity: a, score: 100.0 },
            RankingEntry { entity: b, score: 50.0 },
        ]
    }

    #[test]
    fn test_first_place_reward() {
        let world = MemoryWorld::new();
        let ranking = standings(&world);
        let table = RewardTable::new(BTreeMap::from([(1, vec!["give {player} {score}".to_string()])]));

        let report = table.distribute(&ranking, &world, &world);

        assert_eq!(world.dispatched(), vec!["give A 100".to_string()]);
        assert_eq!(report.dispatched, 1);
    }

    #[test]
    fn test_templates_keep_order_and_positions() {
        let world = MemoryWorld::new();
        let ranking = standings(&world);
        let table = RewardTable::new(BTreeMap::from([
            (2, vec!["say {player} came {position}".to_string(), "give {player} 1".to_string()]),
            (1, vec!["say winner {player}".to_string()]),
        ]));

        table.distribute(&ranking, &world, &world);

        assert_eq!(
            world.dispatched(),
            vec![
                "say winner A".to_string(),
                "say B came 2".to_string(),
                "give B 1".to_string(),
            ]
        );
    }

    #[test]
    fn test_player_name_is_not_substituted_again() {
        let world = MemoryWorld::new();
        let id = Uuid::from_u128(7);
        world.join(id, "{score}{position}").unwrap();
        let ranking = vec![RankingEntry { entity: id, score: 12.5 }];
        let table = RewardTable::new(BTreeMap::from([(
            1,
            vec!["give {player} {score} {unknown} {".to_string()],
        )]));

        table.distribute(&ranking, &world, &world);

        assert_eq!(world.dispatched(), vec!["give {score}{position} 12.5 {unknown} {".to_string()]);
    }

    #[test]
    fn test_positions_past_standings_are_ignored() {
        let world = MemoryWorld::new();
        let ranking = standings(&world);
        let table = RewardTable::new(BTreeMap::from([(3, vec!["give {player} 1".to_string()])]));

        let report = table.distribute(&ranking, &world, &world);

        assert!(world.dispatched().is_empty());
        assert_eq!(report, RewardReport::default());
    }

    #[test]
    fn test_unknown_player_skips_only_that_rule() {
        let world = MemoryWorld::new();
        let mut ranking = standings(&world);
        ranking.insert(0, RankingEntry { entity: Uuid::from_u128(99), score: 500.0 });
        let table = RewardTable::new(BTreeMap::from([
            (1, vec!["give {player} 10".to_string()]),
            (2, vec!["give {player} 5".to_string()]),
        ]));

        let report = table.distribute(&ranking, &world, &world);

        assert_eq!(world.dispatched(), vec!["give A 5".to_string()]);
        assert_eq!(report.skipped_positions, vec![1]);
    }
}
