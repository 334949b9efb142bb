//! Nova leaderboards
//!
//! Competition-ranked leaderboards over an ordered score store:
//! - Ranks derived from live scores on every read (ties share a rank)
//! - Percentiles and score-at-percentile lookups
//! - Clamped pagination, rank ranges and "around me" windows
//! - Order-preserving batch rank/score resolution
//! - Redis sorted-set and in-process store backends
//!
//! ```ignore
//! let store = Arc::new(RedisScoreStore::connect(&config.redis_url).await?);
//! let weekly = Leaderboard::with_config(store.clone(), "weekly", &config);
//! weekly.rank_member("alice", 420).await?;
//! let page = weekly.members(1, 25).await?;
//! ```

pub mod config;
mod error;
mod keys;
pub mod leaderboard;
mod metrics;
mod models;
pub mod store;

pub use config::{InterpolationMode, LeaderboardConfig, DEFAULT_PAGE_SIZE};
pub use error::{LeaderboardError, LeaderboardResult, StoreError, StoreResult};
pub use keys::LeaderboardKey;
pub use leaderboard::Leaderboard;
pub use metrics::LeaderboardMetrics;
pub use models::{Entry, RankScore, RankedMember, NOT_FOUND};
pub use store::{MemoryScoreStore, RedisScoreStore, ScoreStore};
