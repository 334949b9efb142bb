//! Redis sorted-set score store
//!
//! One sorted set per collection. All commands go through a single
//! `ConnectionManager` guarded by a Tokio mutex, so concurrent leaderboards
//! never interleave request/response pairs on the wire.

use super::ScoreStore;
use crate::{Entry, StoreResult};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client, Pipeline};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Shared Redis connection manager
pub type SharedRedis = Arc<Mutex<ConnectionManager>>;

#[derive(Clone)]
pub struct RedisScoreStore {
    redis: SharedRedis,
}

impl RedisScoreStore {
    pub fn new(redis: SharedRedis) -> Self {
        Self { redis }
    }

    pub async fn connect(redis_url: &str) -> StoreResult<Self> {
        let client = Client::open(redis_url)?;
        let manager = ConnectionManager::new(client).await?;
        info!("Redis score store connected");
        Ok(Self::new(Arc::new(Mutex::new(manager))))
    }

    pub fn manager(&self) -> SharedRedis {
        self.redis.clone()
    }

    /// Release this handle. The connection closes once every clone is gone.
    pub async fn close(self) {
        let remaining = Arc::strong_count(&self.redis) - 1;
        drop(self);
        info!(remaining_handles = remaining, "Redis score store closed");
    }
}

/// Map descending positions onto the ascending ranks `ZREMRANGEBYRANK`
/// expects. Index `d` from the top is index `-d - 1` from the bottom, for
/// negative `d` too.
fn ascending_bounds(start: i64, end: i64) -> (isize, isize) {
    ((-end - 1) as isize, (-start - 1) as isize)
}

#[async_trait]
impl ScoreStore for RedisScoreStore {
    async fn upsert(&self, collection: &str, member: &str, score: i64) -> StoreResult<()> {
        let mut conn = self.redis.lock().await;
        let _: () = conn.zadd(collection, member, score).await?;
        Ok(())
    }

    async fn upsert_many(&self, collection: &str, entries: &[Entry]) -> StoreResult<()> {
        if entries.is_empty() {
            return Ok(());
        }

        let mut conn = self.redis.lock().await;
        let mut pipe = Pipeline::new();
        for entry in entries {
            pipe.zadd(collection, &entry.member, entry.score).ignore();
        }
        pipe.query_async::<_, ()>(&mut *conn).await?;

        debug!(collection = %collection, count = entries.len(), "Pipelined ZADD batch");
        Ok(())
    }

    async fn increment_by(&self, collection: &str, member: &str, delta: i64) -> StoreResult<i64> {
        let mut conn = self.redis.lock().await;
        let score: i64 = conn.zincr(collection, member, delta).await?;
        Ok(score)
    }

    async fn remove(&self, collection: &str, member: &str) -> StoreResult<()> {
        let mut conn = self.redis.lock().await;
        let _: () = conn.zrem(collection, member).await?;
        Ok(())
    }

    async fn remove_range(&self, collection: &str, min: i64, max: i64) -> StoreResult<u64> {
        let mut conn = self.redis.lock().await;
        let removed: u64 = conn.zrembyscore(collection, min, max).await?;
        Ok(removed)
    }

    async fn remove_by_position_range(
        &self,
        collection: &str,
        start: i64,
        end: i64,
    ) -> StoreResult<u64> {
        let (asc_start, asc_end) = ascending_bounds(start, end);
        let mut conn = self.redis.lock().await;
        let removed: u64 = conn
            .zremrangebyrank(collection, asc_start, asc_end)
            .await?;
        Ok(removed)
    }

    async fn score_of(&self, collection: &str, member: &str) -> StoreResult<Option<i64>> {
        let mut conn = self.redis.lock().await;
        let score: Option<i64> = conn.zscore(collection, member).await?;
        Ok(score)
    }

    async fn scores_of(
        &self,
        collection: &str,
        members: &[String],
    ) -> StoreResult<Vec<Option<i64>>> {
        if members.is_empty() {
            return Ok(Vec::new());
        }

        let mut conn = self.redis.lock().await;
        let mut pipe = Pipeline::new();
        for member in members {
            pipe.zscore(collection, member);
        }
        let scores: Vec<Option<i64>> = pipe.query_async(&mut *conn).await?;
        Ok(scores)
    }

    async fn count_above(&self, collection: &str, score: i64) -> StoreResult<u64> {
        let mut conn = self.redis.lock().await;
        // "(" makes the lower bound exclusive
        let count: u64 = conn
            .zcount(collection, format!("({}", score), "+inf")
            .await?;
        Ok(count)
    }

    async fn count_in_range(&self, collection: &str, min: i64, max: i64) -> StoreResult<u64> {
        let mut conn = self.redis.lock().await;
        let count: u64 = conn.zcount(collection, min, max).await?;
        Ok(count)
    }

    async fn range_by_position(
        &self,
        collection: &str,
        start: i64,
        end: i64,
    ) -> StoreResult<Vec<Entry>> {
        let mut conn = self.redis.lock().await;
        let rows: Vec<(String, i64)> = conn
            .zrevrange_withscores(collection, start as isize, end as isize)
            .await?;
        Ok(rows
            .into_iter()
            .map(|(member, score)| Entry { member, score })
            .collect())
    }

    async fn range_by_score(
        &self,
        collection: &str,
        min: i64,
        max: i64,
    ) -> StoreResult<Vec<String>> {
        let mut conn = self.redis.lock().await;
        let members: Vec<String> = conn.zrevrangebyscore(collection, max, min).await?;
        Ok(members)
    }

    async fn position_of(&self, collection: &str, member: &str) -> StoreResult<Option<u64>> {
        let mut conn = self.redis.lock().await;
        let position: Option<u64> = conn.zrevrank(collection, member).await?;
        Ok(position)
    }

    async fn count(&self, collection: &str) -> StoreResult<u64> {
        let mut conn = self.redis.lock().await;
        let count: u64 = conn.zcard(collection).await?;
        Ok(count)
    }

    async fn delete_collection(&self, collection: &str) -> StoreResult<()> {
        let mut conn = self.redis.lock().await;
        let _: () = conn.del(collection).await?;
        info!(collection = %collection, "Deleted sorted set");
        Ok(())
    }
}
