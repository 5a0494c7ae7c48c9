use crate::core::EntityId;
use std::collections::VecDeque;

/// Resumable walk over a fixed set of players, one batch per scheduler tick.
///
/// The player list is captured when the pass starts and sorted, so the order
/// inside one pass does not depend on how the directory enumerates players.
#[derive(Debug, Clone)]
pub struct BatchCursor {
    placeholder: String,
    remaining: VecDeque<EntityId>,
    batch_size: usize,
    changed: usize,
    batches: usize,
}

impl BatchCursor {
    pub fn new(mut entities: Vec<EntityId>, placeholder: impl Into<String>, batch_size: usize) -> Self {
        entities.sort_unstable();
        entities.dedup();
        Self {
            placeholder: placeholder.into(),
            remaining: entities.into(),
            batch_size: batch_size.max(1),
            changed: 0,
            batches: 0,
        }
    }

    /// Placeholder this pass resolves. Fixed for the whole pass.
    pub fn placeholder(&self) -> &str {
        &self.placeholder
    }

    /// Removes and returns the next batch. Empty once exhausted.
    pub fn next_batch(&mut self) -> Vec<EntityId> {
        let take = self.batch_size.min(self.remaining.len());
        if take > 0 {
            self.batches += 1;
        }
        self.remaining.drain(..take).collect()
    }

    pub fn record_changes(&mut self, count: usize) {
        self.changed += count;
    }

    pub fn changed(&self) -> usize {
        self.changed
    }

    pub fn batches(&self) -> usize {
        self.batches
    }

    pub fn remaining(&self) -> usize {
        self.remaining.len()
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining.is_empty()
    }
}
