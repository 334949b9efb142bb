//! Store key schema
//!
//! Key format: {prefix}:leaderboard:{name}, or the bare name when no prefix
//! is configured (compatible with leaderboards written by older clients).

/// Leaderboard key builder
#[derive(Debug, Clone, Default)]
pub struct LeaderboardKey {
    prefix: Option<String>,
}

impl LeaderboardKey {
    pub fn new(prefix: &str) -> Self {
        let prefix = prefix.trim().trim_end_matches(':');
        Self {
            prefix: (!prefix.is_empty()).then(|| prefix.to_string()),
        }
    }

    /// Sorted set holding a leaderboard's members
    pub fn collection(&self, name: &str) -> String {
        match &self.prefix {
            Some(prefix) => format!("{}:leaderboard:{}", prefix, name),
            None => name.to_string(),
        }
    }
}
