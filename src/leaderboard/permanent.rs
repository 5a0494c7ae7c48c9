use crate::core::{EntityId, MetricTask};
use crate::storage::snapshot::{PermanentSnapshot, to_ordered};
use std::collections::HashMap;

/// One fixed metric, scored by its absolute value. Never resets.
#[derive(Debug, Clone)]
pub struct PermanentBoard {
    task: MetricTask,
}

impl PermanentBoard {
    pub fn new(task: MetricTask) -> Self {
        Self { task }
    }

    pub fn task(&self) -> &MetricTask {
        &self.task
    }

    pub(crate) fn restore(snapshot: PermanentSnapshot) -> HashMap<EntityId, f64> {
        snapshot.values.into_iter().collect()
    }

    pub(crate) fn snapshot(&self, scores: &HashMap<EntityId, f64>) -> PermanentSnapshot {
        PermanentSnapshot {
            values: to_ordered(scores),
        }
    }
}
