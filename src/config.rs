//! Configuration loaded from `homers.toml`.
//!
//! Every section is optional; missing keys fall back to the defaults below.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::NaiveDate;
use serde::Deserialize;

use crate::error::{Error, Result};

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub paths: PathsConfig,
    pub http: HttpConfig,
    pub scrape: ScrapeConfig,
    pub matching: MatchingConfig,
    pub trivia: TriviaConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub dataset: PathBuf,
    pub schedule: PathBuf,
    pub log: PathBuf,
    pub video_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            dataset: PathBuf::from("data/2025_homeruns_running.csv"),
            schedule: PathBuf::from("data/mlb_schedule_2025.csv"),
            log: PathBuf::from("data/log.txt"),
            video_dir: PathBuf::from("data/2025_homeruns"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub user_agent: String,
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: BROWSER_USER_AGENT.to_string(),
            timeout_secs: 10,
        }
    }
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScrapeConfig {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub max_attempts: u32,
    pub retry_delay_ms: u64,
    pub day_delay_ms: u64,
    /// Delay after each per-play page request (park counts, videos).
    pub page_delay_ms: u64,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            start: NaiveDate::from_ymd_opt(2025, 3, 27).unwrap_or(NaiveDate::MIN),
            end: NaiveDate::from_ymd_opt(2025, 8, 27).unwrap_or(NaiveDate::MIN),
            max_attempts: 3,
            retry_delay_ms: 2000,
            day_delay_ms: 1000,
            page_delay_ms: 2000,
        }
    }
}

impl ScrapeConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn day_delay(&self) -> Duration {
        Duration::from_millis(self.day_delay_ms)
    }

    pub fn page_delay(&self) -> Duration {
        Duration::from_millis(self.page_delay_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MatchingConfig {
    /// Minimum similarity (0-100) for a fuzzy name match.
    pub fuzzy_threshold: f64,
    pub pitch_speed_tolerance: f64,
    pub exit_velocity_tolerance: f64,
    pub distance_tolerance: f64,
    pub feed_delay_ms: u64,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            fuzzy_threshold: 80.0,
            pitch_speed_tolerance: 2.0,
            exit_velocity_tolerance: 2.0,
            distance_tolerance: 10.0,
            feed_delay_ms: 100,
        }
    }
}

impl MatchingConfig {
    pub fn feed_delay(&self) -> Duration {
        Duration::from_millis(self.feed_delay_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TriviaConfig {
    pub rounds: u32,
}

impl Default for TriviaConfig {
    fn default() -> Self {
        Self { rounds: 10 }
    }
}

impl Config {
    /// Load the config file, or the defaults when it does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let config = Config::from_toml(
            r#"
            [matching]
            fuzzy_threshold = 90.0

            [scrape]
            start = "2024-03-28"
            "#,
        )
        .unwrap();

        assert_eq!(config.matching.fuzzy_threshold, 90.0);
        assert_eq!(config.matching.distance_tolerance, 10.0);
        assert_eq!(config.scrape.start, NaiveDate::from_ymd_opt(2024, 3, 28).unwrap());
        assert_eq!(config.scrape.end, NaiveDate::from_ymd_opt(2025, 8, 27).unwrap());
        assert_eq!(config.scrape.max_attempts, 3);
        assert_eq!(config.trivia.rounds, 10);
    }

    #[test]
    fn invalid_file_is_config_error() {
        let err = Config::from_toml("[trivia]\nrounds = \"ten\"").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn missing_file_is_default() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = Config::load(&dir.path().join("homers.toml")).unwrap();
        assert_eq!(config.http.timeout_secs, 10);
        assert!(config.http.user_agent.starts_with("Mozilla/5.0"));
    }
}
