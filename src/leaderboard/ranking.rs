use crate::core::EntityId;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankingEntry {
    pub entity: EntityId,
    pub score: f64,
}

/// Highest score first; equal scores fall back to ascending player id.
fn by_rank(a: &RankingEntry, b: &RankingEntry) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| a.entity.cmp(&b.entity))
}

/// Top `limit` entries of `scores`, best first.
pub fn rank(scores: &HashMap<EntityId, f64>, limit: usize) -> Vec<RankingEntry> {
    let mut entries: Vec<RankingEntry> = scores
        .iter()
        .map(|(entity, score)| RankingEntry {
            entity: *entity,
            score: *score,
        })
        .collect();

    if limit == 0 {
        return Vec::new();
    }
    if entries.len() > limit {
        entries.select_nth_unstable_by(limit - 1, by_rank);
        entries.truncate(limit);
    }
    entries.sort_unstable_by(by_rank);
    entries
}

/// Sorted top-N view over a score map.
///
/// The entries live behind an `Arc` that is swapped whole on rebuild, so a
/// caller holding [`RankingCache::snapshot`] keeps a consistent view.
#[derive(Debug, Clone)]
pub struct RankingCache {
    limit: usize,
    entries: Arc<[RankingEntry]>,
}

impl RankingCache {
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            entries: Arc::from(Vec::new()),
        }
    }

    pub fn rebuild(&mut self, scores: &HashMap<EntityId, f64>) {
        self.entries = Arc::from(rank(scores, self.limit));
    }

    pub fn clear(&mut self) {
        self.entries = Arc::from(Vec::new());
    }

    pub fn snapshot(&self) -> Arc<[RankingEntry]> {
        Arc::clone(&self.entries)
    }

    pub fn entries(&self) -> &[RankingEntry] {
        &self.entries
    }

    /// 1-indexed lookup; `None` outside `1..=len`.
    pub fn get(&self, position: usize) -> Option<&RankingEntry> {
        if position == 0 {
            return None;
        }
        self.entries.get(position - 1)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn limit(&self) -> usize {
        self.limit
    }
}
