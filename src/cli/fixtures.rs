use anyhow::{Context, Result, anyhow};
use leaderboards::core::Result as LeaderboardResult;
use leaderboards::{EntityId, MemoryWorld, RewardDispatcher};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// Fixture file layout:
///
/// ```json
/// { "players": [ { "name": "Alice", "online": true, "metrics": { "%kills%": 12 } } ] }
/// ```
#[derive(Debug, Default, Deserialize)]
pub struct FixtureFile {
    #[serde(default)]
    pub players: Vec<FixturePlayer>,
}

#[derive(Debug, Deserialize)]
pub struct FixturePlayer {
    pub name: String,
    #[serde(default)]
    pub id: Option<Uuid>,
    #[serde(default = "default_online")]
    pub online: bool,
    #[serde(default)]
    pub metrics: BTreeMap<String, Value>,
}

fn default_online() -> bool {
    true
}

/// Stable id for a player known only by name.
pub fn player_id(name: &str) -> EntityId {
    Uuid::new_v5(&Uuid::NAMESPACE_OID, name.to_lowercase().as_bytes())
}

fn metric_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// The console's player world, addressed by player name.
pub struct Roster {
    world: Arc<MemoryWorld>,
    ids: BTreeMap<String, EntityId>,
}

impl Roster {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let fixture = match path {
            Some(path) => {
                let text = fs::read_to_string(path)
                    .with_context(|| format!("failed to read fixtures {}", path.display()))?;
                serde_json::from_str::<FixtureFile>(&text)
                    .with_context(|| format!("malformed fixtures {}", path.display()))?
            }
            None => FixtureFile::default(),
        };

        let mut roster = Self {
            world: Arc::new(MemoryWorld::new()),
            ids: BTreeMap::new(),
        };
        for player in fixture.players {
            let id = player.id.unwrap_or_else(|| player_id(&player.name));
            roster.world.join(id, player.name.clone())?;
            if !player.online {
                roster.world.leave(id)?;
            }
            for (placeholder, value) in &player.metrics {
                roster.world.set_metric(id, placeholder, metric_text(value))?;
            }
            roster.ids.insert(player.name.to_lowercase(), id);
        }
        Ok(roster)
    }

    pub fn world(&self) -> Arc<MemoryWorld> {
        self.world.clone()
    }

    pub fn names(&self) -> Vec<String> {
        self.ids.keys().cloned().collect()
    }

    fn id_of(&self, name: &str) -> Result<EntityId> {
        self.ids
            .get(&name.to_lowercase())
            .copied()
            .ok_or_else(|| anyhow!("unknown player '{}'", name))
    }

    pub fn join(&mut self, name: &str) -> Result<EntityId> {
        let id = self
            .ids
            .get(&name.to_lowercase())
            .copied()
            .unwrap_or_else(|| player_id(name));
        self.world.join(id, name)?;
        self.ids.insert(name.to_lowercase(), id);
        Ok(id)
    }

    pub fn leave(&self, name: &str) -> Result<()> {
        self.world.leave(self.id_of(name)?)?;
        Ok(())
    }

    pub fn set(&self, name: &str, placeholder: &str, value: &str) -> Result<()> {
        self.world.set_metric(self.id_of(name)?, placeholder, value)?;
        Ok(())
    }
}

/// Logs every reward command and records it in the world.
pub struct ConsoleDispatcher {
    world: Arc<MemoryWorld>,
}

impl ConsoleDispatcher {
    pub fn new(world: Arc<MemoryWorld>) -> Self {
        Self { world }
    }
}

impl RewardDispatcher for ConsoleDispatcher {
    fn dispatch(&self, command: &str) -> LeaderboardResult<()> {
        info!(command, "reward command");
        self.world.dispatch(command)
    }
}
