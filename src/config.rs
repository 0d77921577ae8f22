//! Runtime configuration.
//!
//! Every tunable the pipeline and the resilience layer consume lives here, so
//! thresholds and capacities never appear as literals in the decision logic.
//! All fields have defaults; a TOML file only needs to name what it overrides.

use crate::error::Result;
use anyhow::Context;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable that points at an explicit config file.
pub const CONFIG_ENV_VAR: &str = "SHELF_SEARCH_CONFIG";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub query: QueryConfig,
    pub scoring: ScoringWeights,
    pub thresholds: Thresholds,
    pub rate_limit: RateLimitConfig,
    pub circuit: CircuitConfig,
    pub coalescer: CoalescerConfig,
    pub upstream: UpstreamConfig,
    /// Extra aliases merged over the built-in dictionary.
    pub aliases: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct QueryConfig {
    /// Maximum length of a normalized query, in characters.
    pub max_length: usize,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self { max_length: 100 }
    }
}

/// Point contributions for each scoring signal.
///
/// Penalties are stored as negative numbers so the total is a plain sum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScoringWeights {
    pub exact_title_match: i32,
    pub target_volume_match: i32,
    pub volume_one_bonus: i32,
    pub short_title_bonus: i32,
    /// Titles at or under this many characters earn the short-title bonus.
    pub short_title_max_chars: usize,
    pub edition_format_penalty: i32,
    pub spinoff_penalty: i32,
    pub adult_content_penalty: i32,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            exact_title_match: 100,
            target_volume_match: 500,
            volume_one_bonus: 30,
            short_title_bonus: 20,
            short_title_max_chars: 30,
            edition_format_penalty: -30,
            spinoff_penalty: -80,
            adult_content_penalty: -100_000,
        }
    }
}

impl ScoringWeights {
    /// Highest score any candidate can reach before the adult penalty.
    ///
    /// Edition and spin-off weights count too when a config makes them positive.
    pub fn max_positive(&self) -> i32 {
        [
            self.exact_title_match,
            self.target_volume_match,
            self.volume_one_bonus,
            self.short_title_bonus,
            self.edition_format_penalty,
            self.spinoff_penalty,
        ]
        .into_iter()
        .fold(0, |sum, weight| sum.saturating_add(weight.max(0)))
    }
}

/// Score cut-offs used by ranking and classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Thresholds {
    /// Top score at or above this is a confident match.
    pub confident: i32,
    /// Candidates scoring below this are dropped before classification.
    pub ambiguous: i32,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            confident: 100,
            ambiguous: -1000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WindowConfig {
    pub capacity: usize,
    pub window_secs: u64,
}

impl WindowConfig {
    pub const fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            capacity: 30,
            window_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RateLimitConfig {
    pub global: WindowConfig,
    pub per_client: WindowConfig,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            global: WindowConfig {
                capacity: 600,
                window_secs: 60,
            },
            per_client: WindowConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CircuitConfig {
    pub failure_threshold: u32,
    pub cooldown_secs: u64,
}

impl CircuitConfig {
    pub const fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_secs)
    }
}

impl Default for CircuitConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            cooldown_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CoalescerConfig {
    pub capacity: usize,
    pub ttl_secs: u64,
}

impl CoalescerConfig {
    pub const fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

impl Default for CoalescerConfig {
    fn default() -> Self {
        Self {
            capacity: 256,
            ttl_secs: 15,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UpstreamConfig {
    pub endpoint: String,
    pub application_id: String,
    pub timeout_secs: u64,
    /// Records requested per upstream call.
    pub hits: u32,
    /// Cap on merged records across all calls of one search.
    pub max_records: usize,
    /// Cap on ranked results returned to the caller.
    pub max_results: usize,
}

impl UpstreamConfig {
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://app.rakuten.co.jp/services/api/BooksBook/Search/20170404".into(),
            application_id: String::new(),
            timeout_secs: 8,
            hits: 30,
            max_records: 60,
            max_results: 20,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Locate and load configuration.
    ///
    /// Looks at `$SHELF_SEARCH_CONFIG` first, then the user config directory.
    /// Falls back to defaults when neither exists.
    pub fn discover() -> Result<Self> {
        if let Ok(explicit) = std::env::var(CONFIG_ENV_VAR) {
            return Self::load(Path::new(&explicit));
        }

        match default_config_path() {
            Some(path) if path.exists() => Self::load(&path),
            _ => {
                tracing::debug!("No config file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Reject settings that would break a documented invariant.
    pub fn validate(&self) -> Result<()> {
        if self.query.max_length == 0 {
            anyhow::bail!("query.max_length must be at least 1");
        }
        if self.scoring.adult_content_penalty.saturating_add(self.scoring.max_positive())
            >= self.thresholds.ambiguous
        {
            anyhow::bail!(
                "scoring.adult_content_penalty ({}) must push any candidate below thresholds.ambiguous ({})",
                self.scoring.adult_content_penalty,
                self.thresholds.ambiguous
            );
        }
        for (name, window) in [
            ("rate_limit.global", &self.rate_limit.global),
            ("rate_limit.per_client", &self.rate_limit.per_client),
        ] {
            if window.capacity == 0 || window.window_secs == 0 {
                anyhow::bail!("{name} needs a non-zero capacity and window");
            }
        }
        if self.circuit.failure_threshold == 0 {
            anyhow::bail!("circuit.failure_threshold must be at least 1");
        }
        if self.coalescer.capacity == 0 {
            anyhow::bail!("coalescer.capacity must be at least 1");
        }
        Ok(())
    }
}

/// `<config dir>/shelf-search/config.toml`, when a config dir exists.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("shelf-search").join("config.toml"))
}
