//! Ordered score store
//!
//! Every leaderboard query is composed from the primitives below. Positions
//! are 0-based in descending score order and follow the Redis convention that
//! negative indices count from the end (`-1` is the last member).
//!
//! The order among tied scores is up to the backend: [`MemoryScoreStore`]
//! puts ascending member names first, while Redis `ZREVRANGE`/`ZREVRANK` put
//! descending names first. Ranks never depend on it; window contents and
//! `percentile_for` within a tie group do.

pub mod memory;
pub mod redis_store;

pub use self::memory::MemoryScoreStore;
pub use self::redis_store::RedisScoreStore;

use crate::{Entry, StoreResult};
use async_trait::async_trait;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ScoreStore: Send + Sync {
    /// Set a member's score, creating the member if needed
    async fn upsert(&self, collection: &str, member: &str, score: i64) -> StoreResult<()>;

    /// Upsert many members as a single unit
    async fn upsert_many(&self, collection: &str, entries: &[Entry]) -> StoreResult<()>;

    /// Add `delta` to a member's score (absent members start at 0) and
    /// return the resulting score
    async fn increment_by(&self, collection: &str, member: &str, delta: i64) -> StoreResult<i64>;

    async fn remove(&self, collection: &str, member: &str) -> StoreResult<()>;

    /// Remove members whose score lies in `[min, max]`
    async fn remove_range(&self, collection: &str, min: i64, max: i64) -> StoreResult<u64>;

    /// Remove members at descending positions `[start, end]`
    async fn remove_by_position_range(
        &self,
        collection: &str,
        start: i64,
        end: i64,
    ) -> StoreResult<u64>;

    async fn score_of(&self, collection: &str, member: &str) -> StoreResult<Option<i64>>;

    /// Scores for many members, in input order
    async fn scores_of(
        &self,
        collection: &str,
        members: &[String],
    ) -> StoreResult<Vec<Option<i64>>> {
        let mut scores = Vec::with_capacity(members.len());
        for member in members {
            scores.push(self.score_of(collection, member).await?);
        }
        Ok(scores)
    }

    /// Count members with a score strictly greater than `score`
    async fn count_above(&self, collection: &str, score: i64) -> StoreResult<u64>;

    /// Count members whose score lies in `[min, max]`
    async fn count_in_range(&self, collection: &str, min: i64, max: i64) -> StoreResult<u64>;

    /// Members at descending positions `[start, end]`
    async fn range_by_position(
        &self,
        collection: &str,
        start: i64,
        end: i64,
    ) -> StoreResult<Vec<Entry>>;

    /// Members whose score lies in `[min, max]`, highest first
    async fn range_by_score(&self, collection: &str, min: i64, max: i64)
        -> StoreResult<Vec<String>>;

    async fn position_of(&self, collection: &str, member: &str) -> StoreResult<Option<u64>>;

    async fn count(&self, collection: &str) -> StoreResult<u64>;

    async fn delete_collection(&self, collection: &str) -> StoreResult<()>;
}

/// Resolve a signed, inclusive position range against a collection of `len`
/// members. Returns `None` when the range selects nothing.
pub(crate) fn resolve_positions(len: u64, start: i64, end: i64) -> Option<(usize, usize)> {
    let len = len as i64;
    let start = if start < 0 { (len + start).max(0) } else { start };
    let end = if end < 0 { len + end } else { end.min(len - 1) };
    if len == 0 || start > end || start >= len || end < 0 {
        return None;
    }
    Some((start as usize, end as usize))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_full_range() {
        assert_eq!(resolve_positions(5, 0, -1), Some((0, 4)));
    }

    #[test]
    fn test_resolve_clamps_end() {
        assert_eq!(resolve_positions(5, 2, 100), Some((2, 4)));
    }

    #[test]
    fn test_resolve_negative_start() {
        assert_eq!(resolve_positions(5, -2, -1), Some((3, 4)));
        assert_eq!(resolve_positions(5, -10, 1), Some((0, 1)));
    }

    #[test]
    fn test_resolve_empty_selections() {
        assert_eq!(resolve_positions(0, 0, -1), None);
        assert_eq!(resolve_positions(5, 5, 10), None);
        assert_eq!(resolve_positions(5, 3, 2), None);
        assert_eq!(resolve_positions(5, 0, -6), None);
    }
}
