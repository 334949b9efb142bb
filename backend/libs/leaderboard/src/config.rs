use serde::Deserialize;
use std::fmt;

/// Page size used when a caller passes a size below 1.
pub const DEFAULT_PAGE_SIZE: u64 = 25;

const ENV_PREFIX: &str = "LEADERBOARD_";

/// How `score_for_percentile` weights the two bracketing scores.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InterpolationMode {
    /// The fractional weight is truncated to an integer before use, so a
    /// non-integral index always yields the lower bracket's score.
    #[default]
    Truncated,
    /// True linear interpolation, rounded to the nearest integer.
    Linear,
}

#[derive(Clone, Deserialize)]
pub struct LeaderboardConfig {
    #[serde(default = "default_redis_url")]
    pub redis_url: String,
    #[serde(default = "default_page_size")]
    pub default_page_size: u64,
    #[serde(default)]
    pub key_prefix: String,
    #[serde(default)]
    pub interpolation: InterpolationMode,
}

fn default_redis_url() -> String {
    "redis://localhost:6379".to_string()
}

fn default_page_size() -> u64 {
    DEFAULT_PAGE_SIZE
}

impl fmt::Debug for LeaderboardConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LeaderboardConfig")
            .field("redis_url", &"[REDACTED]")
            .field("default_page_size", &self.default_page_size)
            .field("key_prefix", &self.key_prefix)
            .field("interpolation", &self.interpolation)
            .finish()
    }
}

impl Default for LeaderboardConfig {
    fn default() -> Self {
        Self {
            redis_url: default_redis_url(),
            default_page_size: DEFAULT_PAGE_SIZE,
            key_prefix: String::new(),
            interpolation: InterpolationMode::default(),
        }
    }
}

impl LeaderboardConfig {
    /// Load `LEADERBOARD_*` variables, reading `.env` first when present.
    pub fn from_env() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::prefixed(ENV_PREFIX)
            .from_env::<Self>()
            .map(Self::normalized)
    }

    /// Same as [`from_env`](Self::from_env) but over explicit variables.
    pub fn from_vars<I>(vars: I) -> Result<Self, envy::Error>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        envy::prefixed(ENV_PREFIX)
            .from_iter::<_, Self>(vars)
            .map(Self::normalized)
    }

    pub fn with_key_prefix(mut self, prefix: &str) -> Self {
        self.key_prefix = prefix.to_string();
        self
    }

    pub fn with_interpolation(mut self, mode: InterpolationMode) -> Self {
        self.interpolation = mode;
        self
    }

    fn normalized(mut self) -> Self {
        if self.default_page_size < 1 {
            self.default_page_size = DEFAULT_PAGE_SIZE;
        }
        self
    }
}
