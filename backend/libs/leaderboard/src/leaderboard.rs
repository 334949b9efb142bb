//! Ranking semantics over an ordered score store
//!
//! Ranks use competition ranking: a member's rank is the number of members
//! with a strictly greater score, plus one, so ties share a rank and the
//! next distinct score skips ahead (1, 1, 3, 3, 5).
//!
//! Every range and page query resolves its members through
//! [`Leaderboard::ranked_in_list`], so returned ranks come from live scores
//! rather than from positions inside the window.
//!
//! No operation holds a lock across its store calls. A score changing
//! between two reads of one operation can produce a rank that was never
//! simultaneously true; callers needing point-in-time consistency must
//! snapshot outside this layer.

use crate::config::{InterpolationMode, LeaderboardConfig};
use crate::keys::LeaderboardKey;
use crate::store::ScoreStore;
use crate::{
    Entry, LeaderboardError, LeaderboardMetrics, LeaderboardResult, RankScore, RankedMember,
};
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, warn};

/// Handle to one named leaderboard.
///
/// Holds no mutable state; clones share the same store.
#[derive(Clone)]
pub struct Leaderboard {
    store: Arc<dyn ScoreStore>,
    name: String,
    collection: String,
    default_page_size: u64,
    interpolation: InterpolationMode,
    metrics: LeaderboardMetrics,
}

impl Leaderboard {
    pub fn new(store: Arc<dyn ScoreStore>, name: &str) -> Self {
        Self::with_config(store, name, &LeaderboardConfig::default())
    }

    pub fn with_config(store: Arc<dyn ScoreStore>, name: &str, config: &LeaderboardConfig) -> Self {
        let collection = LeaderboardKey::new(&config.key_prefix).collection(name);
        Self {
            store,
            name: name.to_string(),
            collection,
            default_page_size: config.default_page_size.max(1),
            interpolation: config.interpolation,
            metrics: LeaderboardMetrics::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Store key backing this leaderboard
    pub fn collection(&self) -> &str {
        &self.collection
    }

    async fn observe<T, F>(&self, operation: &'static str, fut: F) -> LeaderboardResult<T>
    where
        F: Future<Output = LeaderboardResult<T>>,
    {
        self.metrics.record_operation(operation);
        let result = fut.await;
        if let Err(err) = &result {
            match err {
                LeaderboardError::NotFound(_) => {
                    debug!(
                        leaderboard = %self.name,
                        operation,
                        error = %err,
                        "Leaderboard lookup missed"
                    )
                }
                _ => {
                    warn!(
                        leaderboard = %self.name,
                        operation,
                        error = %err,
                        "Leaderboard operation failed"
                    )
                }
            }
            self.metrics.record_error(operation, err.kind());
        }
        result
    }

    fn page_size(&self, page_size: i64) -> u64 {
        if page_size < 1 {
            self.default_page_size
        } else {
            page_size as u64
        }
    }

    async fn rank_of_score(&self, score: i64) -> LeaderboardResult<u64> {
        let above = self.store.count_above(&self.collection, score).await?;
        Ok(above + 1)
    }

    async fn require_score(&self, member: &str) -> LeaderboardResult<i64> {
        self.store
            .score_of(&self.collection, member)
            .await?
            .ok_or_else(|| LeaderboardError::NotFound(member.to_string()))
    }

    // ============= Writes =============

    /// Set a member's score, creating the member if needed
    pub async fn rank_member(&self, member: &str, score: i64) -> LeaderboardResult<()> {
        self.observe("rank_member", async {
            self.store.upsert(&self.collection, member, score).await?;
            debug!(leaderboard = %self.name, member = %member, score, "Ranked member");
            Ok::<_, LeaderboardError>(())
        })
        .await
    }

    /// Upsert many members in one store round-trip. A failure is reported for
    /// the batch as a whole.
    pub async fn rank_members(&self, entries: &[Entry]) -> LeaderboardResult<()> {
        self.observe("rank_members", async {
            self.store.upsert_many(&self.collection, entries).await?;
            debug!(leaderboard = %self.name, count = entries.len(), "Ranked members");
            Ok::<_, LeaderboardError>(())
        })
        .await
    }

    /// Set a member's score and return its new rank.
    ///
    /// An existing member is moved by the relative delta to `score`, and the
    /// store's resulting score must equal `score`; a mismatch means another
    /// writer touched the member in between and yields
    /// [`LeaderboardError::Inconsistent`]. No write is issued when the score
    /// is already `score`.
    pub async fn rank_member_ex(&self, member: &str, score: i64) -> LeaderboardResult<u64> {
        self.observe("rank_member_ex", async {
            match self.store.score_of(&self.collection, member).await? {
                None => {
                    self.store.upsert(&self.collection, member, score).await?;
                }
                Some(existing) if existing != score => {
                    let delta = score.checked_sub(existing).ok_or_else(|| {
                        LeaderboardError::InvalidArgument(format!(
                            "score change from {} to {} overflows",
                            existing, score
                        ))
                    })?;
                    let actual = self
                        .store
                        .increment_by(&self.collection, member, delta)
                        .await?;
                    if actual != score {
                        return Err(LeaderboardError::Inconsistent {
                            member: member.to_string(),
                            expected: score,
                            actual,
                        });
                    }
                }
                Some(_) => {
                    debug!(
                        leaderboard = %self.name,
                        member = %member,
                        score,
                        "Score unchanged, skipping write"
                    );
                }
            }
            self.rank_of_score(score).await
        })
        .await
    }

    /// Add `delta` to a member's score, creating it at `delta` when absent.
    /// Returns the new score.
    pub async fn change_score_for(&self, member: &str, delta: i64) -> LeaderboardResult<i64> {
        self.observe("change_score_for", async {
            let score = self
                .store
                .increment_by(&self.collection, member, delta)
                .await?;
            debug!(leaderboard = %self.name, member = %member, delta, score, "Changed score");
            Ok::<_, LeaderboardError>(score)
        })
        .await
    }

    pub async fn remove_member(&self, member: &str) -> LeaderboardResult<()> {
        self.observe("remove_member", async {
            self.store
                .remove(&self.collection, member)
                .await
                .map_err(LeaderboardError::from)
        })
        .await
    }

    /// Remove members whose score lies in `[min, max]`; returns how many went.
    pub async fn remove_members_in_score_range(
        &self,
        min: i64,
        max: i64,
    ) -> LeaderboardResult<u64> {
        self.observe("remove_members_in_score_range", async {
            self.store
                .remove_range(&self.collection, min, max)
                .await
                .map_err(LeaderboardError::from)
        })
        .await
    }

    /// Keep only the top `rank` members by descending position. A rank below
    /// zero is treated as zero, which empties the leaderboard.
    pub async fn remove_members_outside_rank(&self, rank: i64) -> LeaderboardResult<u64> {
        self.observe("remove_members_outside_rank", async {
            let keep = rank.max(0);
            let removed = self
                .store
                .remove_by_position_range(&self.collection, keep, -1)
                .await?;
            debug!(leaderboard = %self.name, keep, removed, "Trimmed leaderboard");
            Ok::<_, LeaderboardError>(removed)
        })
        .await
    }

    pub async fn delete_leaderboard(&self) -> LeaderboardResult<()> {
        self.observe("delete_leaderboard", async {
            self.store
                .delete_collection(&self.collection)
                .await
                .map_err(LeaderboardError::from)
        })
        .await
    }

    // ============= Single member queries =============

    pub async fn check_member(&self, member: &str) -> LeaderboardResult<bool> {
        self.observe("check_member", async {
            let score = self.store.score_of(&self.collection, member).await?;
            Ok::<_, LeaderboardError>(score.is_some())
        })
        .await
    }

    pub async fn score_for(&self, member: &str) -> LeaderboardResult<i64> {
        self.observe("score_for", self.require_score(member)).await
    }

    pub async fn rank_for(&self, member: &str) -> LeaderboardResult<u64> {
        self.observe("rank_for", async {
            let score = self.require_score(member).await?;
            self.rank_of_score(score).await
        })
        .await
    }

    pub async fn score_and_rank_for(&self, member: &str) -> LeaderboardResult<RankScore> {
        self.observe("score_and_rank_for", async {
            let score = self.require_score(member).await?;
            let rank = self.rank_of_score(score).await?;
            Ok::<_, LeaderboardError>(RankScore {
                member: member.to_string(),
                score,
                rank,
            })
        })
        .await
    }

    /// Share of the leaderboard ranked below `member`, rounded up to a whole
    /// percent. Ties are ordered by member name.
    pub async fn percentile_for(&self, member: &str) -> LeaderboardResult<u8> {
        self.observe("percentile_for", async {
            let not_found = || LeaderboardError::NotFound(member.to_string());

            if self.store.score_of(&self.collection, member).await?.is_none() {
                return Err(not_found());
            }
            let total = self.store.count(&self.collection).await?;
            let position = self
                .store
                .position_of(&self.collection, member)
                .await?
                .ok_or_else(not_found)?;
            if total == 0 {
                return Err(not_found());
            }

            let below = total.saturating_sub(position + 1);
            let percentile = (below as f64 / total as f64 * 100.0).ceil();
            Ok(percentile as u8)
        })
        .await
    }

    /// Score at `percentile` (0 is the lowest score, 100 the highest), or
    /// `None` for an empty leaderboard.
    ///
    /// The fractional index `(total - 1) * percentile / 100` is bracketed by
    /// the scores at its floor and ceiling. How those combine depends on the
    /// configured [`InterpolationMode`]; the default truncates the weight and
    /// so returns the lower bracket.
    pub async fn score_for_percentile(&self, percentile: i64) -> LeaderboardResult<Option<i64>> {
        self.observe("score_for_percentile", async {
            if !(0..=100).contains(&percentile) {
                return Err(LeaderboardError::InvalidArgument(format!(
                    "percentile must be within 0..=100, got {}",
                    percentile
                )));
            }

            let total = self.store.count(&self.collection).await?;
            if total == 0 {
                return Ok(None);
            }

            let last = (total - 1) as i64;
            let index = last as f64 * (percentile as f64 / 100.0);
            let low_index = index.floor() as i64;
            let high_index = index.ceil() as i64;

            // ascending index i sits at descending position last - i
            let window = self
                .store
                .range_by_position(&self.collection, last - high_index, last - low_index)
                .await?;
            let (Some(high), Some(low)) = (window.first(), window.last()) else {
                return Ok(None);
            };

            if index == index.floor() {
                return Ok(Some(low.score));
            }

            let score = match self.interpolation {
                // the fractional weight truncates to zero
                InterpolationMode::Truncated => low.score,
                InterpolationMode::Linear => {
                    interpolate(low.score, high.score, index - index.floor())
                }
            };
            Ok(Some(score))
        })
        .await
    }

    // ============= Counts and pages =============

    pub async fn total_members(&self) -> LeaderboardResult<u64> {
        self.observe("total_members", async {
            self.store
                .count(&self.collection)
                .await
                .map_err(LeaderboardError::from)
        })
        .await
    }

    pub async fn total_pages(&self, page_size: i64) -> LeaderboardResult<u64> {
        self.observe("total_pages", async {
            let page_size = self.page_size(page_size);
            let total = self.store.count(&self.collection).await?;
            Ok::<_, LeaderboardError>(total.div_ceil(page_size))
        })
        .await
    }

    pub async fn total_members_in_score_range(&self, min: i64, max: i64) -> LeaderboardResult<u64> {
        self.observe("total_members_in_score_range", async {
            self.store
                .count_in_range(&self.collection, min, max)
                .await
                .map_err(LeaderboardError::from)
        })
        .await
    }

    /// Page on which `member` appears for the given page size
    pub async fn page_for(&self, member: &str, page_size: i64) -> LeaderboardResult<u64> {
        self.observe("page_for", async {
            let page_size = self.page_size(page_size);
            let score = self.require_score(member).await?;
            let rank = self.rank_of_score(score).await?;
            Ok::<_, LeaderboardError>(rank.div_ceil(page_size))
        })
        .await
    }

    // ============= Ranges =============

    /// One page of members, highest first. Pages are 1-based; a page below 1
    /// reads the first page and a page past the end reads the last.
    pub async fn members(&self, page: i64, page_size: i64) -> LeaderboardResult<Vec<RankScore>> {
        self.observe("members", async {
            let page_size = self.page_size(page_size);
            let total = self.store.count(&self.collection).await?;
            let last_page = total.div_ceil(page_size).max(1);

            let page = page.clamp(1, last_page.min(i64::MAX as u64) as i64) as u64;
            let start = (page - 1).saturating_mul(page_size);
            let end = start.saturating_add(page_size - 1);
            self.resolve_window(to_position(start), to_position(end)).await
        })
        .await
    }

    pub async fn all_members(&self) -> LeaderboardResult<Vec<RankScore>> {
        self.observe("all_members", self.resolve_window(0, -1))
            .await
    }

    /// Members whose score lies in `[min, max]`, highest first
    pub async fn members_from_score_range(
        &self,
        min: i64,
        max: i64,
    ) -> LeaderboardResult<Vec<RankScore>> {
        self.observe("members_from_score_range", async {
            let names = self.store.range_by_score(&self.collection, min, max).await?;
            self.resolve_present(&names).await
        })
        .await
    }

    /// Members at 1-based positions `[start_rank, end_rank]`, clamped to the
    /// leaderboard's bounds.
    pub async fn members_from_rank_range(
        &self,
        start_rank: i64,
        end_rank: i64,
    ) -> LeaderboardResult<Vec<RankScore>> {
        self.observe(
            "members_from_rank_range",
            self.rank_range(start_rank, end_rank),
        )
        .await
    }

    /// The first `count` members
    pub async fn top(&self, count: i64) -> LeaderboardResult<Vec<RankScore>> {
        self.observe("top", self.rank_range(1, count)).await
    }

    /// Member at a 1-based position, or `None` when out of range
    pub async fn member_at(&self, position: i64) -> LeaderboardResult<Option<RankScore>> {
        self.observe("member_at", async {
            let members = self.rank_range(position, position).await?;
            Ok::<_, LeaderboardError>(members.into_iter().next())
        })
        .await
    }

    /// A page of `page_size` members centered on `member`'s position, never
    /// starting before the first member.
    pub async fn around_me(
        &self,
        member: &str,
        page_size: i64,
    ) -> LeaderboardResult<Vec<RankScore>> {
        self.observe("around_me", async {
            let page_size = to_position(self.page_size(page_size));
            let position = self
                .store
                .position_of(&self.collection, member)
                .await?
                .ok_or_else(|| LeaderboardError::NotFound(member.to_string()))?;

            let start = to_position(position).saturating_sub(page_size / 2).max(0);
            let end = start.saturating_add(page_size - 1);
            self.resolve_window(start, end).await
        })
        .await
    }

    async fn rank_range(
        &self,
        start_rank: i64,
        end_rank: i64,
    ) -> LeaderboardResult<Vec<RankScore>> {
        let start = start_rank.saturating_sub(1).max(0);
        let total = to_position(self.store.count(&self.collection).await?);
        let end = end_rank.saturating_sub(1).min(total - 1);
        if end < start {
            return Ok(Vec::new());
        }
        self.resolve_window(start, end).await
    }

    async fn resolve_window(&self, start: i64, end: i64) -> LeaderboardResult<Vec<RankScore>> {
        let names: Vec<String> = self
            .store
            .range_by_position(&self.collection, start, end)
            .await?
            .into_iter()
            .map(|entry| entry.member)
            .collect();
        self.resolve_present(&names).await
    }

    /// Batch-resolve members read from a range. Members removed since the
    /// range read are dropped.
    async fn resolve_present(&self, names: &[String]) -> LeaderboardResult<Vec<RankScore>> {
        let resolved = self.resolve_batch(names).await?;
        let expected = resolved.len();
        let present: Vec<RankScore> = resolved
            .into_iter()
            .filter_map(RankedMember::into_present)
            .collect();
        if present.len() < expected {
            debug!(
                leaderboard = %self.name,
                dropped = expected - present.len(),
                "Members vanished during range resolution"
            );
        }
        Ok(present)
    }

    // ============= Batch resolution =============

    /// Score and rank for each requested member, in input order.
    ///
    /// Names need not exist or be unique; every input produces exactly one
    /// output. Scores are read for the whole list first, then ranks only for
    /// members that were found.
    pub async fn ranked_in_list<S>(&self, members: &[S]) -> LeaderboardResult<Vec<RankedMember>>
    where
        S: AsRef<str> + Sync,
    {
        self.observe("ranked_in_list", async {
            let names: Vec<String> = members.iter().map(|m| m.as_ref().to_string()).collect();
            self.resolve_batch(&names).await
        })
        .await
    }

    async fn resolve_batch(&self, names: &[String]) -> LeaderboardResult<Vec<RankedMember>> {
        if names.is_empty() {
            return Ok(Vec::new());
        }

        let scores = self.store.scores_of(&self.collection, names).await?;

        let mut resolved = Vec::with_capacity(names.len());
        for (member, score) in names.iter().zip(scores) {
            let ranked = match score {
                Some(score) => RankedMember::Present(RankScore {
                    member: member.clone(),
                    score,
                    rank: self.rank_of_score(score).await?,
                }),
                None => RankedMember::Absent {
                    member: member.clone(),
                },
            };
            resolved.push(ranked);
        }
        Ok(resolved)
    }
}

/// Store positions are signed; counts beyond `i64::MAX` saturate.
fn to_position(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

/// `low + fraction * (high - low)`, rounded. The spread of two `i64` scores
/// can exceed `i64`, so the step is taken in `i128`.
fn interpolate(low: i64, high: i64, fraction: f64) -> i64 {
    let spread = high as i128 - low as i128;
    let step = (fraction * spread as f64).round() as i128;
    (low as i128 + step).clamp(i64::MIN as i128, i64::MAX as i128) as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MockScoreStore;
    use crate::StoreError;
    use mockall::predicate::*;

    fn leaderboard(store: MockScoreStore) -> Leaderboard {
        Leaderboard::new(Arc::new(store), "test_lb")
    }

    #[tokio::test]
    async fn test_rank_member_ex_inserts_new_member() {
        let mut store = MockScoreStore::new();
        store
            .expect_score_of()
            .with(eq("test_lb"), eq("alice"))
            .returning(|_, _| Ok(None));
        store
            .expect_upsert()
            .with(eq("test_lb"), eq("alice"), eq(40))
            .times(1)
            .returning(|_, _, _| Ok(()));
        store.expect_increment_by().never();
        store
            .expect_count_above()
            .with(eq("test_lb"), eq(40))
            .returning(|_, _| Ok(2));

        let rank = leaderboard(store).rank_member_ex("alice", 40).await.unwrap();
        assert_eq!(rank, 3);
    }

    #[tokio::test]
    async fn test_rank_member_ex_applies_relative_delta() {
        let mut store = MockScoreStore::new();
        store.expect_score_of().returning(|_, _| Ok(Some(30)));
        store.expect_upsert().never();
        store
            .expect_increment_by()
            .with(eq("test_lb"), eq("alice"), eq(15))
            .times(1)
            .returning(|_, _, _| Ok(45));
        store.expect_count_above().returning(|_, _| Ok(0));

        let rank = leaderboard(store).rank_member_ex("alice", 45).await.unwrap();
        assert_eq!(rank, 1);
    }

    #[tokio::test]
    async fn test_rank_member_ex_skips_write_when_unchanged() {
        let mut store = MockScoreStore::new();
        store.expect_score_of().returning(|_, _| Ok(Some(30)));
        store.expect_upsert().never();
        store.expect_increment_by().never();
        store.expect_count_above().returning(|_, _| Ok(4));

        let rank = leaderboard(store).rank_member_ex("alice", 30).await.unwrap();
        assert_eq!(rank, 5);
    }

    #[tokio::test]
    async fn test_rank_member_ex_detects_concurrent_write() {
        let mut store = MockScoreStore::new();
        store.expect_score_of().returning(|_, _| Ok(Some(30)));
        // another writer added 5 between our read and our increment
        store
            .expect_increment_by()
            .returning(|_, _, delta| Ok(35 + delta));
        store.expect_count_above().never();

        let err = leaderboard(store)
            .rank_member_ex("alice", 40)
            .await
            .unwrap_err();
        match err {
            LeaderboardError::Inconsistent {
                member,
                expected,
                actual,
            } => {
                assert_eq!(member, "alice");
                assert_eq!(expected, 40);
                assert_eq!(actual, 45);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_store_failure_is_propagated() {
        let mut store = MockScoreStore::new();
        store
            .expect_score_of()
            .returning(|_, _| Err(StoreError::Unavailable("connection refused".to_string())));

        let err = leaderboard(store).rank_for("alice").await.unwrap_err();
        assert!(matches!(err, LeaderboardError::StoreUnavailable(_)));
        assert_eq!(err.kind(), "store_unavailable");
    }

    #[tokio::test]
    async fn test_batch_skips_rank_query_for_absent_members() {
        let mut store = MockScoreStore::new();
        store
            .expect_scores_of()
            .times(1)
            .returning(|_, members| {
                Ok(members
                    .iter()
                    .map(|m| if m == "ghost" { None } else { Some(10) })
                    .collect())
            });
        // one rank query per present member only
        store
            .expect_count_above()
            .with(eq("test_lb"), eq(10))
            .times(2)
            .returning(|_, _| Ok(0));

        let result = leaderboard(store)
            .ranked_in_list(&["a", "ghost", "b"])
            .await
            .unwrap();
        assert_eq!(result.len(), 3);
        assert!(!result[1].is_present());
    }

    #[tokio::test]
    async fn test_score_for_percentile_rejects_out_of_range() {
        let mut store = MockScoreStore::new();
        store.expect_count().never();
        let lb = leaderboard(store);

        for percentile in [-1, 101] {
            let err = lb.score_for_percentile(percentile).await.unwrap_err();
            assert!(matches!(err, LeaderboardError::InvalidArgument(_)));
        }
    }

    #[test]
    fn test_interpolate_spans_full_score_range() {
        assert_eq!(interpolate(10, 20, 0.5), 15);
        assert_eq!(interpolate(i64::MIN, i64::MAX, 0.5), 0);
        assert_eq!(interpolate(i64::MIN, 0, 0.5), -(1 << 62));
        // the widened spread rounds up past i64::MAX and is clamped back
        assert_eq!(interpolate(0, i64::MAX, 1.0), i64::MAX);
    }

    #[tokio::test]
    async fn test_around_me_missing_member() {
        let mut store = MockScoreStore::new();
        store.expect_position_of().returning(|_, _| Ok(None));
        store.expect_range_by_position().never();

        let err = leaderboard(store).around_me("ghost", 5).await.unwrap_err();
        assert!(matches!(err, LeaderboardError::NotFound(m) if m == "ghost"));
    }

    #[tokio::test]
    async fn test_prefixed_collection() {
        let config = LeaderboardConfig::default().with_key_prefix("game");
        let lb = Leaderboard::with_config(Arc::new(MockScoreStore::new()), "weekly", &config);
        assert_eq!(lb.name(), "weekly");
        assert_eq!(lb.collection(), "game:leaderboard:weekly");
    }
}
