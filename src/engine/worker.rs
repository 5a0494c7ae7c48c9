use super::EngineCore;
use super::handle::{FlushOutcome, LeaderboardHandle};
use crate::core::{LeaderboardError, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval, interval_at};
use tracing::{debug, error, warn};

/// A periodic background task that can be stopped and awaited.
pub struct Worker {
    label: String,
    stop_tx: Option<oneshot::Sender<()>>,
    join_handle: Option<JoinHandle<()>>,
}

impl Worker {
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Signals the worker to stop and waits for its current iteration to finish.
    pub async fn stop(mut self) -> Result<()> {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }

        if let Some(join_handle) = self.join_handle.take() {
            join_handle.await.map_err(|err| {
                LeaderboardError::Worker(format!("{} worker join: {}", self.label, err))
            })?;
        }
        Ok(())
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }
        if let Some(join_handle) = self.join_handle.take() {
            join_handle.abort();
        }
    }
}

/// Drives every leaderboard's scan and reset work, one batch per tick.
pub(crate) fn spawn_tick_worker(core: Arc<EngineCore>) -> Worker {
    let period = core.settings.tick_interval.max(Duration::from_millis(1));
    let (stop_tx, mut stop_rx) = oneshot::channel::<()>();

    let join_handle = tokio::spawn(async move {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                _ = &mut stop_rx => {
                    break;
                }
                _ = ticker.tick() => {
                    if let Err(err) = core.tick() {
                        warn!(error = %err, "tick failed");
                    }
                }
            }
        }
        debug!("tick worker stopped");
    });

    Worker {
        label: "tick".to_string(),
        stop_tx: Some(stop_tx),
        join_handle: Some(join_handle),
    }
}

/// Writes one leaderboard's state every save interval, off the tick context.
///
/// The first write happens one full interval after start.
pub(crate) fn spawn_save_worker(handle: Arc<LeaderboardHandle>) -> Worker {
    let period = handle.save_interval();
    let label = format!("save:{}", handle.name());
    let (stop_tx, mut stop_rx) = oneshot::channel::<()>();

    let join_handle = tokio::spawn(async move {
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                _ = &mut stop_rx => {
                    break;
                }
                _ = ticker.tick() => {
                    let target = handle.clone();
                    match tokio::task::spawn_blocking(move || target.flush()).await {
                        Ok(Ok(FlushOutcome::Written)) => {
                            debug!(leaderboard = %handle.name(), "periodic save");
                        }
                        Ok(Ok(FlushOutcome::Clean)) => {}
                        // already logged by the handle; retried next cycle
                        Ok(Err(_)) => {}
                        Err(err) => {
                            error!(leaderboard = %handle.name(), error = %err, "save task panicked");
                        }
                    }
                }
            }
        }
    });

    Worker {
        label,
        stop_tx: Some(stop_tx),
        join_handle: Some(join_handle),
    }
}
