//! In-process ordered score store
//!
//! Each collection keeps a member→score map alongside a `BTreeSet` ordered by
//! descending score then ascending member name. Position lookups walk the
//! set, so this store suits tests and small embedded leaderboards.

use super::{resolve_positions, ScoreStore};
use crate::{Entry, StoreError, StoreResult};
use async_trait::async_trait;
use std::cmp::Reverse;
use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;
use tracing::{debug, info};

type OrderKey = (Reverse<i64>, String);

#[derive(Debug, Default)]
struct SortedSet {
    scores: HashMap<String, i64>,
    order: BTreeSet<OrderKey>,
}

impl SortedSet {
    fn insert(&mut self, member: &str, score: i64) {
        if let Some(old) = self.scores.insert(member.to_string(), score) {
            self.order.remove(&(Reverse(old), member.to_string()));
        }
        self.order.insert((Reverse(score), member.to_string()));
    }

    fn remove(&mut self, member: &str) -> bool {
        match self.scores.remove(member) {
            Some(score) => {
                self.order.remove(&(Reverse(score), member.to_string()));
                true
            }
            None => false,
        }
    }

    fn len(&self) -> u64 {
        self.scores.len() as u64
    }

    fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    fn in_range(&self, min: i64, max: i64) -> impl Iterator<Item = &OrderKey> {
        self.order
            .range((Reverse(max), String::new())..)
            .take_while(move |(Reverse(score), _)| *score >= min)
    }

    fn window(&self, start: i64, end: i64) -> impl Iterator<Item = &OrderKey> {
        let (skip, take) = match resolve_positions(self.len(), start, end) {
            Some((start, end)) => (start, end - start + 1),
            None => (0, 0),
        };
        self.order.iter().skip(skip).take(take)
    }
}

/// Ordered score store held in process memory.
#[derive(Debug, Default)]
pub struct MemoryScoreStore {
    collections: RwLock<HashMap<String, SortedSet>>,
    closed: AtomicBool,
}

impl MemoryScoreStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject every subsequent call with [`StoreError::Unavailable`].
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        info!("Memory score store closed");
    }

    fn ensure_open(&self) -> StoreResult<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store is closed".to_string()));
        }
        Ok(())
    }

    /// Drop a collection once its last member is gone, as Redis does.
    fn prune(collections: &mut HashMap<String, SortedSet>, collection: &str) {
        if collections.get(collection).is_some_and(SortedSet::is_empty) {
            collections.remove(collection);
        }
    }
}

#[async_trait]
impl ScoreStore for MemoryScoreStore {
    async fn upsert(&self, collection: &str, member: &str, score: i64) -> StoreResult<()> {
        self.ensure_open()?;
        let mut collections = self.collections.write().await;
        collections
            .entry(collection.to_string())
            .or_default()
            .insert(member, score);
        Ok(())
    }

    async fn upsert_many(&self, collection: &str, entries: &[Entry]) -> StoreResult<()> {
        self.ensure_open()?;
        if entries.is_empty() {
            return Ok(());
        }
        let mut collections = self.collections.write().await;
        let set = collections.entry(collection.to_string()).or_default();
        for entry in entries {
            set.insert(&entry.member, entry.score);
        }
        debug!(collection = %collection, count = entries.len(), "Upserted batch");
        Ok(())
    }

    async fn increment_by(&self, collection: &str, member: &str, delta: i64) -> StoreResult<i64> {
        self.ensure_open()?;
        let mut collections = self.collections.write().await;
        let set = collections.entry(collection.to_string()).or_default();
        let current = set.scores.get(member).copied().unwrap_or(0);
        let updated = current
            .checked_add(delta)
            .ok_or_else(|| StoreError::Overflow(member.to_string()))?;
        set.insert(member, updated);
        Ok(updated)
    }

    async fn remove(&self, collection: &str, member: &str) -> StoreResult<()> {
        self.ensure_open()?;
        let mut collections = self.collections.write().await;
        if let Some(set) = collections.get_mut(collection) {
            set.remove(member);
        }
        Self::prune(&mut collections, collection);
        Ok(())
    }

    async fn remove_range(&self, collection: &str, min: i64, max: i64) -> StoreResult<u64> {
        self.ensure_open()?;
        let mut collections = self.collections.write().await;
        let Some(set) = collections.get_mut(collection) else {
            return Ok(0);
        };
        let doomed: Vec<String> = set
            .in_range(min, max)
            .map(|(_, member)| member.clone())
            .collect();
        for member in &doomed {
            set.remove(member);
        }
        Self::prune(&mut collections, collection);
        Ok(doomed.len() as u64)
    }

    async fn remove_by_position_range(
        &self,
        collection: &str,
        start: i64,
        end: i64,
    ) -> StoreResult<u64> {
        self.ensure_open()?;
        let mut collections = self.collections.write().await;
        let Some(set) = collections.get_mut(collection) else {
            return Ok(0);
        };
        let doomed: Vec<String> = set
            .window(start, end)
            .map(|(_, member)| member.clone())
            .collect();
        for member in &doomed {
            set.remove(member);
        }
        Self::prune(&mut collections, collection);
        Ok(doomed.len() as u64)
    }

    async fn score_of(&self, collection: &str, member: &str) -> StoreResult<Option<i64>> {
        self.ensure_open()?;
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .and_then(|set| set.scores.get(member).copied()))
    }

    async fn count_above(&self, collection: &str, score: i64) -> StoreResult<u64> {
        self.ensure_open()?;
        let collections = self.collections.read().await;
        Ok(collections.get(collection).map_or(0, |set| {
            set.order.range(..(Reverse(score), String::new())).count() as u64
        }))
    }

    async fn count_in_range(&self, collection: &str, min: i64, max: i64) -> StoreResult<u64> {
        self.ensure_open()?;
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .map_or(0, |set| set.in_range(min, max).count() as u64))
    }

    async fn range_by_position(
        &self,
        collection: &str,
        start: i64,
        end: i64,
    ) -> StoreResult<Vec<Entry>> {
        self.ensure_open()?;
        let collections = self.collections.read().await;
        Ok(collections.get(collection).map_or_else(Vec::new, |set| {
            set.window(start, end)
                .map(|(Reverse(score), member)| Entry::new(member.clone(), *score))
                .collect()
        }))
    }

    async fn range_by_score(
        &self,
        collection: &str,
        min: i64,
        max: i64,
    ) -> StoreResult<Vec<String>> {
        self.ensure_open()?;
        let collections = self.collections.read().await;
        Ok(collections.get(collection).map_or_else(Vec::new, |set| {
            set.in_range(min, max)
                .map(|(_, member)| member.clone())
                .collect()
        }))
    }

    async fn position_of(&self, collection: &str, member: &str) -> StoreResult<Option<u64>> {
        self.ensure_open()?;
        let collections = self.collections.read().await;
        Ok(collections.get(collection).and_then(|set| {
            let score = *set.scores.get(member)?;
            Some(set.order.range(..(Reverse(score), member.to_string())).count() as u64)
        }))
    }

    async fn count(&self, collection: &str) -> StoreResult<u64> {
        self.ensure_open()?;
        let collections = self.collections.read().await;
        Ok(collections.get(collection).map_or(0, SortedSet::len))
    }

    async fn delete_collection(&self, collection: &str) -> StoreResult<()> {
        self.ensure_open()?;
        let mut collections = self.collections.write().await;
        collections.remove(collection);
        Ok(())
    }
}
