use crate::core::{EntityId, LeaderboardError, Result};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::storage::StoreProvider;

/// Resolves a metric placeholder for one player.
///
/// The returned text may be anything the host produces; non-numeric text is
/// not an error and simply leaves the player's score untouched.
pub trait MetricSource: Send + Sync {
    fn resolve(&self, entity: EntityId, placeholder: &str) -> Result<String>;
}

/// Enumerates reachable players and resolves display names.
pub trait EntityDirectory: Send + Sync {
    /// Players that can currently be scanned.
    fn online(&self) -> Vec<EntityId>;

    /// Display name of a player, online or not. `None` when unknown.
    fn display_name(&self, entity: EntityId) -> Option<String>;
}

/// Executes a reward command produced from a template.
pub trait RewardDispatcher: Send + Sync {
    fn dispatch(&self, command: &str) -> Result<()>;
}

/// Wall clock seen by the schedule logic.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that only moves when told to. Used by hosts that simulate time and by tests.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn set(&self, instant: DateTime<Utc>) {
        if let Ok(mut guard) = self.now.lock() {
            *guard = instant;
        }
    }

    pub fn advance(&self, by: chrono::Duration) {
        if let Ok(mut guard) = self.now.lock() {
            *guard += by;
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        match self.now.lock() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}

/// Collaborators handed to every leaderboard at construction.
#[derive(Clone)]
pub struct EngineContext {
    pub metrics: Arc<dyn MetricSource>,
    pub directory: Arc<dyn EntityDirectory>,
    pub rewards: Arc<dyn RewardDispatcher>,
    pub stores: Arc<dyn StoreProvider>,
    pub clock: Arc<dyn Clock>,
}

impl EngineContext {
    pub fn new(
        metrics: Arc<dyn MetricSource>,
        directory: Arc<dyn EntityDirectory>,
        rewards: Arc<dyn RewardDispatcher>,
        stores: Arc<dyn StoreProvider>,
    ) -> Self {
        Self {
            metrics,
            directory,
            rewards,
            stores,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }
}

// ============================================================================
// In-memory world
// ============================================================================

#[derive(Debug, Default)]
struct WorldState {
    names: HashMap<EntityId, String>,
    online: Vec<EntityId>,
    metrics: HashMap<(EntityId, String), String>,
    dispatched: Vec<String>,
}

/// A self-contained player world implementing every collaborator trait.
///
/// Players keep their names after going offline, the way a server remembers
/// everyone who ever joined. Dispatched reward commands are recorded in order.
#[derive(Debug, Default)]
pub struct MemoryWorld {
    state: Mutex<WorldState>,
}

impl MemoryWorld {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn join(&self, entity: EntityId, name: impl Into<String>) -> Result<()> {
        let mut state = self.state.lock()?;
        state.names.insert(entity, name.into());
        if !state.online.contains(&entity) {
            state.online.push(entity);
        }
        Ok(())
    }

    pub fn leave(&self, entity: EntityId) -> Result<()> {
        let mut state = self.state.lock()?;
        state.online.retain(|id| *id != entity);
        Ok(())
    }

    pub fn set_metric(
        &self,
        entity: EntityId,
        placeholder: &str,
        value: impl Into<String>,
    ) -> Result<()> {
        let mut state = self.state.lock()?;
        state
            .metrics
            .insert((entity, placeholder.to_string()), value.into());
        Ok(())
    }

    pub fn clear_metric(&self, entity: EntityId, placeholder: &str) -> Result<()> {
        let mut state = self.state.lock()?;
        state.metrics.remove(&(entity, placeholder.to_string()));
        Ok(())
    }

    pub fn dispatched(&self) -> Vec<String> {
        self.state
            .lock()
            .map(|state| state.dispatched.clone())
            .unwrap_or_default()
    }
}

impl MetricSource for MemoryWorld {
    fn resolve(&self, entity: EntityId, placeholder: &str) -> Result<String> {
        let state = self.state.lock()?;
        state
            .metrics
            .get(&(entity, placeholder.to_string()))
            .cloned()
            .ok_or_else(|| LeaderboardError::Metric(format!("{} has no value for {}", entity, placeholder)))
    }
}

impl EntityDirectory for MemoryWorld {
    fn online(&self) -> Vec<EntityId> {
        self.state
            .lock()
            .map(|state| state.online.clone())
            .unwrap_or_default()
    }

    fn display_name(&self, entity: EntityId) -> Option<String> {
        self.state
            .lock()
            .ok()
            .and_then(|state| state.names.get(&entity).cloned())
    }
}

impl RewardDispatcher for MemoryWorld {
    fn dispatch(&self, command: &str) -> Result<()> {
        let mut state = self.state.lock()?;
        state.dispatched.push(command.to_string());
        Ok(())
    }
}
