//! Leaderboard state machine.
//!
//! A [`Leaderboard`] owns its score map, its ranking and a single [`PhaseKind`]
//! that makes scans and resets mutually exclusive:
//!
//! ```text
//!            begin_refresh                  last batch
//!   Idle ─────────────────────► Scanning ───────────────► Idle
//!    ▲                                │ last batch, reset due
//!    │                                ▼
//!    │   last re-seed batch     Resetting   (rewards paid, task rotated,
//!    └────────────────────────────────┘      scores and baseline cleared)
//! ```
//!
//! Every call to [`Leaderboard::step`] processes at most one batch, so the
//! caller's tick never runs an unbounded loop.

pub mod cursor;
pub mod permanent;
pub mod ranking;
pub mod rewards;
pub mod rotating;
pub mod schedule;

pub use cursor::BatchCursor;
pub use permanent::PermanentBoard;
pub use ranking::{RankingCache, RankingEntry};
pub use rewards::{RewardReport, RewardTable};
pub use rotating::{RotatingBoard, RotationState};
pub use schedule::{DEFAULT_CRON, ScheduleEvaluator};

use crate::config::LeaderboardConfig;
use crate::core::{
    BATCH_SIZE, CACHE_LIMIT, EntityId, LeaderboardError, LeaderboardKind, MetricTask, Result,
    format_score, parse_metric,
};
use crate::interface::{EngineContext, EntityDirectory};
use crate::storage::LeaderboardSnapshot;
use chrono::{DateTime, Duration, Utc};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub enum Variant {
    Permanent(PermanentBoard),
    Rotating(RotatingBoard),
}

impl Variant {
    pub fn kind(&self) -> LeaderboardKind {
        match self {
            Self::Permanent(_) => LeaderboardKind::Permanent,
            Self::Rotating(_) => LeaderboardKind::Rotating,
        }
    }
}

#[derive(Debug, Clone)]
enum Phase {
    Idle,
    Scanning(BatchCursor),
    Resetting(BatchCursor),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseKind {
    Idle,
    Scanning,
    Resetting,
}

/// What one call to [`Leaderboard::step`] did.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// Nothing in flight.
    Idle,
    /// One scan batch processed, more to come.
    Scanned { remaining: usize },
    /// Scan finished without triggering a reset.
    ScanCompleted { changed: usize },
    /// Scan finished, rewards were paid and the board rotated.
    ResetStarted {
        from_task: usize,
        to_task: usize,
        rewards: RewardReport,
    },
    /// One re-seed batch processed, more to come.
    Reseeded { remaining: usize },
    /// Re-seed finished; the board is idle again.
    ResetCompleted { seeded: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetCountdown {
    Permanent,
    Due,
    Remaining(Duration),
    /// The schedule has no future occurrence.
    Unscheduled,
}

#[derive(Debug, Clone)]
pub struct Leaderboard {
    name: String,
    scores: HashMap<EntityId, f64>,
    ranking: RankingCache,
    phase: Phase,
    dirty: bool,
    batch_size: usize,
    variant: Variant,
}

impl Leaderboard {
    pub fn permanent(name: &str, task: MetricTask) -> Self {
        Self::assemble(name, Variant::Permanent(PermanentBoard::new(task)))
    }

    pub fn rotating(name: &str, board: RotatingBoard) -> Self {
        Self::assemble(name, Variant::Rotating(board))
    }

    fn assemble(name: &str, variant: Variant) -> Self {
        Self {
            name: name.to_lowercase(),
            scores: HashMap::new(),
            ranking: RankingCache::new(CACHE_LIMIT),
            phase: Phase::Idle,
            dirty: false,
            batch_size: BATCH_SIZE,
            variant,
        }
    }

    /// Builds a leaderboard from its definition and the persisted state, if any.
    ///
    /// Fails for an empty task list, an invalid cron expression, or a
    /// snapshot that does not match the leaderboard type.
    pub fn from_config(
        config: &LeaderboardConfig,
        snapshot: Option<LeaderboardSnapshot>,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        if config.tasks.is_empty() {
            return Err(LeaderboardError::config(&config.name, "empty tasks list"));
        }

        let mut board = match config.kind {
            LeaderboardKind::Permanent => Self::permanent(&config.name, config.tasks[0].clone()),
            LeaderboardKind::Rotating => {
                let expression = config.cron.as_deref().unwrap_or(DEFAULT_CRON);
                let schedule = ScheduleEvaluator::parse(expression)?;
                let rotating = RotatingBoard::new(
                    config.tasks.clone(),
                    schedule,
                    RewardTable::new(config.rewards.clone()),
                    now,
                )?;
                Self::rotating(&config.name, rotating)
            }
        };

        if let Some(snapshot) = snapshot {
            board.restore(snapshot, now)?;
        }
        Ok(board)
    }

    pub fn with_limits(mut self, cache_limit: usize, batch_size: usize) -> Self {
        self.ranking = RankingCache::new(cache_limit);
        self.ranking.rebuild(&self.scores);
        self.batch_size = batch_size.max(1);
        self
    }

    fn restore(&mut self, snapshot: LeaderboardSnapshot, now: DateTime<Utc>) -> Result<()> {
        match (&mut self.variant, snapshot) {
            (Variant::Permanent(_), LeaderboardSnapshot::Permanent(saved)) => {
                self.scores = PermanentBoard::restore(saved);
            }
            (Variant::Rotating(board), LeaderboardSnapshot::Rotating(saved)) => {
                self.scores = board.restore(saved, now);
            }
            (variant, saved) => {
                return Err(LeaderboardError::Snapshot(format!(
                    "'{}' is {} but its saved state is {}",
                    self.name,
                    variant.kind(),
                    saved.kind()
                )));
            }
        }
        self.ranking.rebuild(&self.scores);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> LeaderboardKind {
        self.variant.kind()
    }

    pub fn variant(&self) -> &Variant {
        &self.variant
    }

    pub fn active_task(&self) -> &MetricTask {
        match &self.variant {
            Variant::Permanent(board) => board.task(),
            Variant::Rotating(board) => board.active_task(),
        }
    }

    pub fn active_placeholder(&self) -> &str {
        &self.active_task().placeholder
    }

    pub fn description(&self) -> &str {
        &self.active_task().description
    }

    pub fn tasks(&self) -> &[MetricTask] {
        match &self.variant {
            Variant::Permanent(board) => std::slice::from_ref(board.task()),
            Variant::Rotating(board) => board.tasks(),
        }
    }

    pub fn current_task_index(&self) -> usize {
        match &self.variant {
            Variant::Permanent(_) => 0,
            Variant::Rotating(board) => board.rotation().current_index,
        }
    }

    pub fn phase(&self) -> PhaseKind {
        match self.phase {
            Phase::Idle => PhaseKind::Idle,
            Phase::Scanning(_) => PhaseKind::Scanning,
            Phase::Resetting(_) => PhaseKind::Resetting,
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn scores(&self) -> &HashMap<EntityId, f64> {
        &self.scores
    }

    pub fn score(&self, entity: EntityId) -> Option<f64> {
        self.scores.get(&entity).copied()
    }

    pub fn ranking(&self) -> &RankingCache {
        &self.ranking
    }

    /// Display name at `position` (1-indexed), empty when out of range or unknown.
    pub fn top_name(&self, position: usize, directory: &dyn EntityDirectory) -> String {
        self.ranking
            .get(position)
            .and_then(|entry| directory.display_name(entry.entity))
            .unwrap_or_default()
    }

    /// Score at `position` (1-indexed), empty when out of range.
    pub fn top_value(&self, position: usize) -> String {
        self.ranking
            .get(position)
            .map(|entry| format_score(entry.score))
            .unwrap_or_default()
    }

    pub fn time_until_reset(&self, now: DateTime<Utc>) -> ResetCountdown {
        match &self.variant {
            Variant::Permanent(_) => ResetCountdown::Permanent,
            Variant::Rotating(board) => match board.time_until_reset(now) {
                None => ResetCountdown::Unscheduled,
                Some(remaining) if remaining <= Duration::zero() => ResetCountdown::Due,
                Some(remaining) => ResetCountdown::Remaining(remaining),
            },
        }
    }

    // ------------------------------------------------------------------
    // Scan / reset state machine
    // ------------------------------------------------------------------

    /// Starts a scan over `entities`. Returns `false` (and does nothing) while
    /// a scan or reset is already in flight.
    pub fn begin_refresh(&mut self, entities: Vec<EntityId>) -> bool {
        if !matches!(self.phase, Phase::Idle) {
            return false;
        }
        let cursor = BatchCursor::new(entities, self.active_placeholder(), self.batch_size);
        self.phase = Phase::Scanning(cursor);
        true
    }

    /// Processes at most one batch of the operation in flight.
    pub fn step(&mut self, ctx: &EngineContext) -> Step {
        match std::mem::replace(&mut self.phase, Phase::Idle) {
            Phase::Idle => Step::Idle,
            Phase::Scanning(mut cursor) => {
                let mut changed = 0;
                for entity in cursor.next_batch() {
                    let Some(current) = resolve(ctx, entity, cursor.placeholder()) else {
                        continue;
                    };
                    if self.observe(entity, current) {
                        changed += 1;
                    }
                }
                cursor.record_changes(changed);

                if cursor.is_exhausted() {
                    self.finish_scan(&cursor, ctx)
                } else {
                    let remaining = cursor.remaining();
                    self.phase = Phase::Scanning(cursor);
                    Step::Scanned { remaining }
                }
            }
            Phase::Resetting(mut cursor) => {
                let mut seeded = 0;
                if let Variant::Rotating(board) = &mut self.variant {
                    for entity in cursor.next_batch() {
                        let Some(current) = resolve(ctx, entity, cursor.placeholder()) else {
                            continue;
                        };
                        if board.seed_baseline(entity, current) {
                            seeded += 1;
                        }
                    }
                }
                cursor.record_changes(seeded);

                if cursor.is_exhausted() {
                    if cursor.changed() > 0 {
                        self.dirty = true;
                    }
                    info!(leaderboard = %self.name, seeded = cursor.changed(), "baseline re-seeded");
                    Step::ResetCompleted {
                        seeded: cursor.changed(),
                    }
                } else {
                    let remaining = cursor.remaining();
                    self.phase = Phase::Resetting(cursor);
                    Step::Reseeded { remaining }
                }
            }
        }
    }

    /// Records one observation; returns whether the stored score changed.
    fn observe(&mut self, entity: EntityId, current: f64) -> bool {
        let score = match &mut self.variant {
            Variant::Permanent(_) => current,
            Variant::Rotating(board) => board.observe(entity, current),
        };
        match self.scores.get(&entity) {
            Some(old) if old.total_cmp(&score).is_eq() => false,
            _ => {
                self.scores.insert(entity, score);
                true
            }
        }
    }

    fn finish_scan(&mut self, cursor: &BatchCursor, ctx: &EngineContext) -> Step {
        let changed = cursor.changed();
        if changed > 0 {
            self.ranking.rebuild(&self.scores);
            self.dirty = true;
        }
        debug!(
            leaderboard = %self.name,
            batches = cursor.batches(),
            changed,
            "scan completed"
        );

        let now = ctx.now();
        let due = matches!(&self.variant, Variant::Rotating(board) if board.reset_due(now));
        if due {
            return self.begin_reset(ctx, now);
        }
        Step::ScanCompleted { changed }
    }

    fn begin_reset(&mut self, ctx: &EngineContext, now: DateTime<Utc>) -> Step {
        let Variant::Rotating(board) = &mut self.variant else {
            return Step::Idle;
        };

        // rewards read the standings as they were before anything is cleared
        let standings = self.ranking.snapshot();
        let rewards =
            board
                .rewards()
                .distribute(&standings, ctx.directory.as_ref(), ctx.rewards.as_ref());

        let (from_task, to_task) = board.rotate(now);
        self.scores.clear();
        self.ranking.clear();
        self.dirty = true;

        let cursor = BatchCursor::new(
            ctx.directory.online(),
            board.active_task().placeholder.clone(),
            self.batch_size,
        );
        info!(
            leaderboard = %self.name,
            from_task,
            to_task,
            rewarded = rewards.dispatched,
            players = cursor.remaining(),
            "leaderboard reset"
        );
        self.phase = Phase::Resetting(cursor);

        Step::ResetStarted {
            from_task,
            to_task,
            rewards,
        }
    }

    // ------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------

    /// Value copy of the persisted state.
    pub fn snapshot(&self) -> LeaderboardSnapshot {
        match &self.variant {
            Variant::Permanent(board) => LeaderboardSnapshot::Permanent(board.snapshot(&self.scores)),
            Variant::Rotating(board) => LeaderboardSnapshot::Rotating(board.snapshot(&self.scores)),
        }
    }

    /// Copies the state and clears the dirty flag. `None` when clean.
    pub fn take_snapshot(&mut self) -> Option<LeaderboardSnapshot> {
        if !self.dirty {
            return None;
        }
        self.dirty = false;
        Some(self.snapshot())
    }

    /// Re-marks the state as unsaved, e.g. after a failed write.
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Reward rules, empty for permanent boards.
    pub fn rewards(&self) -> BTreeMap<usize, Vec<String>> {
        match &self.variant {
            Variant::Permanent(_) => BTreeMap::new(),
            Variant::Rotating(board) => board.rewards().rules().clone(),
        }
    }
}

fn resolve(ctx: &EngineContext, entity: EntityId, placeholder: &str) -> Option<f64> {
    match ctx.metrics.resolve(entity, placeholder) {
        Ok(text) => parse_metric(&text),
        Err(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interface::{Clock, ManualClock, MemoryWorld};
    use crate::storage::MemoryStoreProvider;
    use chrono::TimeZone;
    use std::sync::Arc;
    use uuid::Uuid;

    fn context(world: &Arc<MemoryWorld>, clock: &Arc<ManualClock>) -> EngineContext {
        EngineContext::new(
            world.clone(),
            world.clone(),
            world.clone(),
            Arc::new(MemoryStoreProvider::new()),
        )
        .with_clock(clock.clone())
    }

    fn run_to_idle(board: &mut Leaderboard, ctx: &EngineContext) -> Vec<Step> {
        let mut steps = Vec::new();
        loop {
            match board.step(ctx) {
                Step::Idle => return steps,
                step => steps.push(step),
            }
        }
    }

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 10, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_scan_spreads_over_batches() {
        let world = Arc::new(MemoryWorld::new());
        let clock = Arc::new(ManualClock::new(start()));
        let ctx = context(&world, &clock);
        let mut board = Leaderboard::permanent("kills", MetricTask::new("%kills%", "Kills"));

        for i in 0..25 {
            let id = Uuid::new_v4();
            world.join(id, format!("p{}", i)).unwrap();
            world.set_metric(id, "%kills%", (i + 1).to_string()).unwrap();
        }

        assert!(board.begin_refresh(world.online()));
        assert!(!board.begin_refresh(world.online()));
        assert_eq!(board.step(&ctx), Step::Scanned { remaining: 15 });
        assert_eq!(board.step(&ctx), Step::Scanned { remaining: 5 });
        assert_eq!(board.step(&ctx), Step::ScanCompleted { changed: 25 });
        assert_eq!(board.step(&ctx), Step::Idle);

        assert_eq!(board.scores().len(), 25);
        assert_eq!(board.ranking().len(), 25);
        assert_eq!(board.top_value(1), "25");
        assert!(board.is_dirty());
    }

    #[test]
    fn test_non_numeric_metric_keeps_prior_score() {
        let world = Arc::new(MemoryWorld::new());
        let clock = Arc::new(ManualClock::new(start()));
        let ctx = context(&world, &clock);
        let mut board = Leaderboard::permanent("kills", MetricTask::new("%kills%", "Kills"));
        let x = Uuid::new_v4();
        world.join(x, "X").unwrap();

        world.set_metric(x, "%kills%", "5").unwrap();
        board.begin_refresh(world.online());
        run_to_idle(&mut board, &ctx);
        assert!(board.take_snapshot().is_some());

        world.set_metric(x, "%kills%", "N/A").unwrap();
        board.begin_refresh(world.online());
        assert_eq!(run_to_idle(&mut board, &ctx), vec![Step::ScanCompleted { changed: 0 }]);
        assert_eq!(board.score(x), Some(5.0));
        assert!(!board.is_dirty());
        assert!(board.take_snapshot().is_none());
    }

    #[test]
    fn test_ranking_is_capped_and_sorted() {
        let world = Arc::new(MemoryWorld::new());
        let clock = Arc::new(ManualClock::new(start()));
        let ctx = context(&world, &clock);
        let mut board = Leaderboard::permanent("kills", MetricTask::new("%kills%", "Kills"));

        for i in 0..45 {
            let id = Uuid::new_v4();
            world.join(id, format!("p{}", i)).unwrap();
            world.set_metric(id, "%kills%", ((i * 7) % 45).to_string()).unwrap();
        }
        board.begin_refresh(world.online());
        run_to_idle(&mut board, &ctx);

        let entries = board.ranking().entries();
        assert_eq!(entries.len(), CACHE_LIMIT);
        assert!(entries.windows(2).all(|w| w[0].score >= w[1].score));
        assert_eq!(board.top_value(CACHE_LIMIT + 1), "");
    }

    fn rotating_board(clock: &ManualClock) -> Leaderboard {
        let config = LeaderboardConfig::rotating(
            "Weekly",
            vec![
                MetricTask::new("%blocks%", "Mine blocks"),
                MetricTask::new("%fish%", "Catch fish"),
            ],
        )
        .reward(1, vec!["give {player} {score}".to_string()]);
        Leaderboard::from_config(&config, None, clock.now()).unwrap()
    }

    #[test]
    fn test_rotating_scores_gain_since_baseline() {
        let world = Arc::new(MemoryWorld::new());
        let clock = Arc::new(ManualClock::new(start()));
        let ctx = context(&world, &clock);
        let mut board = rotating_board(&clock);
        let a = Uuid::new_v4();
        world.join(a, "A").unwrap();

        world.set_metric(a, "%blocks%", "1,000").unwrap();
        board.begin_refresh(world.online());
        run_to_idle(&mut board, &ctx);
        assert_eq!(board.score(a), Some(0.0));

        world.set_metric(a, "%blocks%", "1,250").unwrap();
        board.begin_refresh(world.online());
        run_to_idle(&mut board, &ctx);
        assert_eq!(board.score(a), Some(250.0));
        assert_eq!(board.name(), "weekly");
    }

    #[test]
    fn test_reset_pays_rewards_then_rotates_and_reseeds() {
        let world = Arc::new(MemoryWorld::new());
        let clock = Arc::new(ManualClock::new(start()));
        let ctx = context(&world, &clock);
        let mut board = rotating_board(&clock);

        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        world.join(a, "A").unwrap();
        world.join(b, "B").unwrap();
        world.set_metric(a, "%blocks%", "10").unwrap();
        world.set_metric(b, "%blocks%", "20").unwrap();
        world.set_metric(a, "%fish%", "3").unwrap();

        board.begin_refresh(world.online());
        run_to_idle(&mut board, &ctx);
        world.set_metric(a, "%blocks%", "110").unwrap();
        world.set_metric(b, "%blocks%", "70").unwrap();
        board.begin_refresh(world.online());
        run_to_idle(&mut board, &ctx);
        assert_eq!(board.top_value(1), "100");

        let reset_at = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 1).unwrap();
        clock.set(reset_at);
        board.take_snapshot();
        board.begin_refresh(world.online());
        match board.step(&ctx) {
            Step::ResetStarted {
                from_task,
                to_task,
                rewards,
            } => {
                assert_eq!((from_task, to_task), (0, 1));
                assert_eq!(rewards.dispatched, 1);
            }
            other => panic!("expected a reset, got {:?}", other),
        }
        assert_eq!(world.dispatched(), vec!["give A 100".to_string()]);

        assert_eq!(board.phase(), PhaseKind::Resetting);
        assert!(board.scores().is_empty());
        assert!(board.ranking().is_empty());
        assert!(board.is_dirty());
        assert_eq!(board.active_placeholder(), "%fish%");
        assert!(!board.begin_refresh(world.online()));

        assert_eq!(board.step(&ctx), Step::ResetCompleted { seeded: 1 });
        assert_eq!(board.phase(), PhaseKind::Idle);

        let Variant::Rotating(rotating) = board.variant() else {
            panic!("expected a rotating board");
        };
        assert_eq!(rotating.rotation().current_index, 1);
        assert_eq!(rotating.rotation().last_reset, reset_at);
        assert_eq!(rotating.baseline().get(&a), Some(&3.0));
        assert_eq!(rotating.baseline().get(&b), None);
        let next = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        assert_eq!(
            board.time_until_reset(reset_at),
            ResetCountdown::Remaining(next - reset_at)
        );
    }

    #[test]
    fn test_snapshot_kind_mismatch_is_rejected() {
        let config = LeaderboardConfig::permanent("kills", MetricTask::new("%kills%", "Kills"));
        let saved = LeaderboardSnapshot::Rotating(crate::storage::RotatingSnapshot {
            last_reset: Some(0),
            current_task_index: 0,
            baseline: BTreeMap::new(),
            values: BTreeMap::new(),
        });
        let err = Leaderboard::from_config(&config, Some(saved), start()).unwrap_err();
        assert!(matches!(err, LeaderboardError::Snapshot(_)));
    }
}
