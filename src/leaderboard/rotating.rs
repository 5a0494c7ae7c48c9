use super::rewards::RewardTable;
use super::schedule::ScheduleEvaluator;
use crate::core::{EntityId, LeaderboardError, MetricTask, Result};
use crate::storage::snapshot::{RotatingSnapshot, to_ordered};
use chrono::{DateTime, Duration, TimeZone, Utc};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RotationState {
    pub current_index: usize,
    pub last_reset: DateTime<Utc>,
}

/// Rotates through its tasks on a schedule and scores the gain since the
/// start of the current cycle.
///
/// The baseline for a player is captured the first time the player is seen
/// in a cycle and is never overwritten until the next reset.
#[derive(Debug, Clone)]
pub struct RotatingBoard {
    tasks: Vec<MetricTask>,
    rotation: RotationState,
    baseline: HashMap<EntityId, f64>,
    schedule: ScheduleEvaluator,
    rewards: RewardTable,
}

impl RotatingBoard {
    pub fn new(
        tasks: Vec<MetricTask>,
        schedule: ScheduleEvaluator,
        rewards: RewardTable,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        if tasks.is_empty() {
            return Err(LeaderboardError::config(
                "rotating",
                "a rotating leaderboard needs at least one task",
            ));
        }
        Ok(Self {
            tasks,
            rotation: RotationState {
                current_index: 0,
                last_reset: now,
            },
            baseline: HashMap::new(),
            schedule,
            rewards,
        })
    }

    /// Applies persisted rotation state and returns the persisted scores.
    ///
    /// A task index beyond the configured list (tasks removed since the save)
    /// wraps around instead of failing.
    pub(crate) fn restore(
        &mut self,
        snapshot: RotatingSnapshot,
        now: DateTime<Utc>,
    ) -> HashMap<EntityId, f64> {
        self.rotation = RotationState {
            current_index: snapshot.current_task_index % self.tasks.len(),
            last_reset: snapshot
                .last_reset
                .and_then(|millis| Utc.timestamp_millis_opt(millis).single())
                .unwrap_or(now),
        };
        self.baseline = snapshot.baseline.into_iter().collect();
        snapshot.values.into_iter().collect()
    }

    pub(crate) fn snapshot(&self, scores: &HashMap<EntityId, f64>) -> RotatingSnapshot {
        RotatingSnapshot {
            last_reset: Some(self.rotation.last_reset.timestamp_millis()),
            current_task_index: self.rotation.current_index,
            baseline: to_ordered(&self.baseline),
            values: to_ordered(scores),
        }
    }

    pub fn tasks(&self) -> &[MetricTask] {
        &self.tasks
    }

    pub fn active_task(&self) -> &MetricTask {
        &self.tasks[self.rotation.current_index]
    }

    pub fn rotation(&self) -> RotationState {
        self.rotation
    }

    pub fn baseline(&self) -> &HashMap<EntityId, f64> {
        &self.baseline
    }

    pub fn schedule(&self) -> &ScheduleEvaluator {
        &self.schedule
    }

    pub fn rewards(&self) -> &RewardTable {
        &self.rewards
    }

    /// Gain since the baseline, capturing the baseline on first sight.
    pub(crate) fn observe(&mut self, entity: EntityId, current: f64) -> f64 {
        let base = *self.baseline.entry(entity).or_insert(current);
        current - base
    }

    /// Sets the baseline only if the player has none yet this cycle.
    pub(crate) fn seed_baseline(&mut self, entity: EntityId, value: f64) -> bool {
        if self.baseline.contains_key(&entity) {
            return false;
        }
        self.baseline.insert(entity, value);
        true
    }

    /// Time left until the next scheduled reset. `None` when the schedule has
    /// no further occurrence.
    pub fn time_until_reset(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.schedule.time_until(self.rotation.last_reset, now)
    }

    /// Same as [`Self::time_until_reset`] in milliseconds, `-1` when unscheduled.
    pub fn time_until_reset_millis(&self, now: DateTime<Utc>) -> i64 {
        self.time_until_reset(now)
            .map(|remaining| remaining.num_milliseconds())
            .unwrap_or(-1)
    }

    pub fn reset_due(&self, now: DateTime<Utc>) -> bool {
        self.time_until_reset(now)
            .is_some_and(|remaining| remaining <= Duration::zero())
    }

    /// Moves to the next task and starts a new cycle at `now`.
    ///
    /// Returns `(previous_index, new_index)`.
    pub(crate) fn rotate(&mut self, now: DateTime<Utc>) -> (usize, usize) {
        let previous = self.rotation.current_index;
        let next = (previous + 1) % self.tasks.len();
        self.rotation = RotationState {
            current_index: next,
            last_reset: now,
        };
        self.baseline.clear();
        (previous, next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::leaderboard::schedule::DEFAULT_CRON;
    use std::collections::BTreeMap;
    use uuid::Uuid;

    fn board(task_count: usize) -> RotatingBoard {
        let tasks = (0..task_count)
            .map(|i| MetricTask::new(format!("%metric_{}%", i), format!("Task {}", i)))
            .collect();
        RotatingBoard::new(
            tasks,
            ScheduleEvaluator::parse(DEFAULT_CRON).unwrap(),
            RewardTable::default(),
            Utc.with_ymd_and_hms(2024, 1, 10, 0, 0, 0).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn test_baseline_is_set_once() {
        let mut board = board(1);
        let id = Uuid::new_v4();
        assert_eq!(board.observe(id, 40.0), 0.0);
        assert_eq!(board.observe(id, 55.0), 15.0);
        assert!(!board.seed_baseline(id, 100.0));
        assert_eq!(board.baseline()[&id], 40.0);
    }

    #[test]
    fn test_rotate_wraps_and_clears_baseline() {
        let mut board = board(3);
        board.observe(Uuid::new_v4(), 1.0);
        let now = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 5).unwrap();

        assert_eq!(board.rotate(now), (0, 1));
        assert!(board.baseline().is_empty());
        assert_eq!(board.rotation().last_reset, now);
        assert_eq!(board.active_task().placeholder, "%metric_1%");

        board.rotate(now);
        assert_eq!(board.rotate(now), (2, 0));
    }

    #[test]
    fn test_reset_due_follows_schedule() {
        let board = board(1);
        let before = Utc.with_ymd_and_hms(2024, 1, 31, 23, 59, 0).unwrap();
        let after = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();
        assert!(!board.reset_due(before));
        assert_eq!(board.time_until_reset_millis(before), 60_000);
        assert!(board.reset_due(after));
    }

    #[test]
    fn test_restore_wraps_out_of_range_index() {
        let mut board = board(2);
        let id = Uuid::new_v4();
        let scores = board.restore(
            RotatingSnapshot {
                last_reset: Some(1_704_067_200_000),
                current_task_index: 5,
                baseline: BTreeMap::from([(id, 3.0)]),
                values: BTreeMap::from([(id, 9.0)]),
            },
            Utc::now(),
        );
        assert_eq!(board.rotation().current_index, 1);
        assert_eq!(board.rotation().last_reset.timestamp_millis(), 1_704_067_200_000);
        assert_eq!(scores[&id], 9.0);
        assert_eq!(board.baseline()[&id], 3.0);
    }

    #[test]
    fn test_restore_without_last_reset_starts_from_now() {
        let mut board = board(2);
        let now = Utc.with_ymd_and_hms(2024, 1, 10, 12, 0, 0).unwrap();
        board.restore(
            RotatingSnapshot {
                last_reset: None,
                current_task_index: 1,
                baseline: BTreeMap::new(),
                values: BTreeMap::new(),
            },
            now,
        );
        assert_eq!(board.rotation().last_reset, now);
        assert_eq!(board.rotation().current_index, 1);
        assert!(!board.reset_due(now));
    }
}
