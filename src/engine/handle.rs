use crate::config::{EngineSettings, LeaderboardConfig};
use crate::core::{LeaderboardKind, Result};
use crate::interface::EngineContext;
use crate::leaderboard::{Leaderboard, PhaseKind, Step};
use crate::storage::{LeaderboardSnapshot, PersistenceStore};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tracing::{debug, error};

/// When a leaderboard scans, in engine ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cadence {
    pub first_tick: u64,
    pub period: u64,
}

impl Cadence {
    pub fn is_due(&self, tick: u64) -> bool {
        tick >= self.first_tick && (tick - self.first_tick) % self.period.max(1) == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushOutcome {
    /// Nothing changed since the last write.
    Clean,
    Written,
}

/// A live leaderboard plus its store and timing.
///
/// The board sits behind one mutex. Scans and resets mutate it on the tick
/// context; the save path only holds the lock long enough to copy it.
pub struct LeaderboardHandle {
    name: String,
    kind: LeaderboardKind,
    cadence: Cadence,
    save_interval: Duration,
    board: Mutex<Leaderboard>,
    store: Arc<dyn PersistenceStore>,
}

impl LeaderboardHandle {
    /// Loads persisted state (if any) and builds the leaderboard.
    pub fn open(
        config: &LeaderboardConfig,
        settings: &EngineSettings,
        ctx: &EngineContext,
    ) -> Result<Self> {
        let store = ctx.stores.open(&config.name)?;
        let snapshot = match store.read()? {
            Some(bytes) => Some(LeaderboardSnapshot::decode(config.kind, &bytes)?),
            None => None,
        };
        let board = Leaderboard::from_config(config, snapshot, ctx.now())?
            .with_limits(settings.cache_limit, settings.batch_size);

        Ok(Self {
            name: config.name.clone(),
            kind: config.kind,
            cadence: Cadence {
                first_tick: settings.initial_delay_ticks + config.start_offset,
                period: settings.ticks_for(config.update_interval),
            },
            save_interval: config.save_interval.max(Duration::from_secs(1)),
            board: Mutex::new(board),
            store,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> LeaderboardKind {
        self.kind
    }

    pub fn cadence(&self) -> Cadence {
        self.cadence
    }

    pub fn save_interval(&self) -> Duration {
        self.save_interval
    }

    /// Locks the board for reading or direct manipulation.
    pub fn lock(&self) -> Result<MutexGuard<'_, Leaderboard>> {
        Ok(self.board.lock()?)
    }

    /// Runs `f` against the board under the lock.
    pub fn with_board<R>(&self, f: impl FnOnce(&Leaderboard) -> R) -> Result<R> {
        let board = self.board.lock()?;
        Ok(f(&board))
    }

    /// One scheduler tick: starts a scan when one is due and the board is
    /// idle, then advances whatever is in flight by one batch.
    pub fn tick(&self, tick: u64, ctx: &EngineContext) -> Result<Step> {
        let mut board = self.board.lock()?;
        if self.cadence.is_due(tick) {
            if board.phase() == PhaseKind::Idle {
                board.begin_refresh(ctx.directory.online());
            } else {
                debug!(leaderboard = %self.name, tick, phase = ?board.phase(), "scan tick dropped");
            }
        }
        Ok(board.step(ctx))
    }

    /// Writes the state if it changed since the last write.
    ///
    /// The dirty flag is cleared when the copy is taken and restored if the
    /// write fails, so a failed write is retried on the next save cycle.
    pub fn flush(&self) -> Result<FlushOutcome> {
        let snapshot = self.board.lock()?.take_snapshot();
        let Some(snapshot) = snapshot else {
            return Ok(FlushOutcome::Clean);
        };

        match snapshot.encode().and_then(|bytes| self.store.write(&bytes)) {
            Ok(()) => {
                debug!(leaderboard = %self.name, "state written");
                Ok(FlushOutcome::Written)
            }
            Err(err) => {
                error!(leaderboard = %self.name, error = %err, "state write failed");
                self.board.lock()?.mark_dirty();
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cadence_starts_at_offset_then_repeats() {
        let cadence = Cadence {
            first_tick: 30,
            period: 600,
        };
        assert!(!cadence.is_due(0));
        assert!(!cadence.is_due(29));
        assert!(cadence.is_due(30));
        assert!(!cadence.is_due(31));
        assert!(cadence.is_due(630));
        assert!(cadence.is_due(1230));
    }
}
