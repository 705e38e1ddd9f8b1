//! Application configuration
//!
//! Loads YAML settings with typed defaults and environment overrides. The
//! `ALPHAVANTAGE_API_KEY` environment variable takes precedence over the
//! file so the key can stay out of checked-in configs.

use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const PLACEHOLDER_API_KEY: &str = "YOUR_API_KEY_HERE";

/// Complete application configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub alpha_vantage: AlphaVantageConfig,
    pub universe: Vec<String>,
    pub lookbacks: LookbacksConfig,
    pub vol_windows: VolWindowsConfig,
    pub scoring: ScoringConfig,
    pub data: DataConfig,
    pub app: AppConfig,
    pub fetcher: FetcherConfig,
}

/// Alpha Vantage API settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AlphaVantageConfig {
    pub api_key: String,
    pub daily_request_limit: u32,
    pub base_url: String,
}

impl Default for AlphaVantageConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            daily_request_limit: 25,
            base_url: "https://www.alphavantage.co/query".to_string(),
        }
    }
}

/// Momentum lookback periods in trading days
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LookbacksConfig {
    pub r1m: usize,
    pub r3m: usize,
    pub r6m: usize,
    pub r12m: usize,
}

impl Default for LookbacksConfig {
    fn default() -> Self {
        Self {
            r1m: 21,
            r3m: 63,
            r6m: 126,
            r12m: 252,
        }
    }
}

/// Volatility windows in trading days
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct VolWindowsConfig {
    pub short: usize,
    pub long: usize,
}

impl Default for VolWindowsConfig {
    fn default() -> Self {
        Self {
            short: 63,
            long: 126,
        }
    }
}

/// Momentum scoring parameters
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub penalty_lambda: f64,
    pub min_adv_usd: f64,
    pub breadth_min_positive: usize,
    pub breadth_total_lookbacks: usize,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            penalty_lambda: 0.35,
            min_adv_usd: 5_000_000.0,
            breadth_min_positive: 3,
            breadth_total_lookbacks: 4,
        }
    }
}

/// Data storage locations
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DataConfig {
    pub data_dir: PathBuf,
    pub db_name: String,
    pub export_dir: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            db_name: "momentum.db".to_string(),
            export_dir: PathBuf::from("./exports"),
        }
    }
}

/// Application-level settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    pub top_n: usize,
    pub auto_export: bool,
    pub log_level: String,
    pub log_format: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            top_n: 5,
            auto_export: true,
            log_level: "info".to_string(),
            log_format: "json".to_string(),
        }
    }
}

/// Fetch scheduler settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FetcherConfig {
    pub max_workers: usize,
    /// Per-request timeout in seconds
    pub timeout: u64,
    pub max_retries: u32,
    /// Accepted for config compatibility; refreshes always fetch compact history
    pub only_fetch_deltas: bool,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            max_workers: 5,
            timeout: 30,
            max_retries: 3,
            only_fetch_deltas: true,
        }
    }
}

impl Config {
    /// Load configuration from an explicit path, or from the default
    /// locations (`configs/config.yaml`, then `config.yaml`), falling back
    /// to built-in defaults when no file exists.
    pub fn load(path: Option<&Path>) -> Result<Config> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let mut found = None;
                for candidate in ["configs/config.yaml", "config.yaml"] {
                    let candidate = Path::new(candidate);
                    if candidate.exists() {
                        found = Some(Self::from_file(candidate)?);
                        break;
                    }
                }
                found.unwrap_or_default()
            }
        };

        if let Ok(api_key) = std::env::var("ALPHAVANTAGE_API_KEY") {
            if !api_key.is_empty() {
                config.alpha_vantage.api_key = api_key;
            }
        }

        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Config> {
        let content = std::fs::read_to_string(path)?;
        serde_yaml::from_str(&content)
            .map_err(|e| AppError::Config(format!("error parsing {}: {e}", path.display())))
    }

    /// Full path to the database file.
    pub fn db_path(&self) -> PathBuf {
        self.data.data_dir.join(&self.data.db_name)
    }

    /// Check that all required fields are present and consistent.
    pub fn validate(&self) -> Result<()> {
        if self.alpha_vantage.api_key.is_empty()
            || self.alpha_vantage.api_key == PLACEHOLDER_API_KEY
        {
            return Err(AppError::Config(
                "alpha_vantage.api_key is required (set via config file or ALPHAVANTAGE_API_KEY env var)"
                    .into(),
            ));
        }
        if self.universe.is_empty() {
            return Err(AppError::Config(
                "universe must contain at least one symbol".into(),
            ));
        }
        if self.alpha_vantage.daily_request_limit < 1 {
            return Err(AppError::Config(
                "alpha_vantage.daily_request_limit must be at least 1".into(),
            ));
        }
        if self.lookbacks.r1m < 1
            || self.lookbacks.r3m < 1
            || self.lookbacks.r6m < 1
            || self.lookbacks.r12m < 1
        {
            return Err(AppError::Config(
                "all lookback periods must be positive".into(),
            ));
        }
        if self.vol_windows.short < 1 || self.vol_windows.long < 1 {
            return Err(AppError::Config(
                "volatility windows must be positive".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.scoring.penalty_lambda) {
            return Err(AppError::Config(
                "scoring.penalty_lambda must be between 0 and 1".into(),
            ));
        }
        if self.scoring.min_adv_usd < 0.0 {
            return Err(AppError::Config(
                "scoring.min_adv_usd must be non-negative".into(),
            ));
        }
        if self.scoring.breadth_total_lookbacks < 1 {
            return Err(AppError::Config(
                "scoring.breadth_total_lookbacks must be positive".into(),
            ));
        }
        if self.scoring.breadth_min_positive > self.scoring.breadth_total_lookbacks {
            return Err(AppError::Config(
                "breadth_min_positive cannot exceed breadth_total_lookbacks".into(),
            ));
        }
        if !["debug", "info", "warn", "error"].contains(&self.app.log_level.as_str()) {
            return Err(AppError::Config(
                "app.log_level must be one of: debug, info, warn, error".into(),
            ));
        }
        if !["json", "text"].contains(&self.app.log_format.as_str()) {
            return Err(AppError::Config(
                "app.log_format must be either 'json' or 'text'".into(),
            ));
        }
        if self.fetcher.max_workers < 1 {
            return Err(AppError::Config(
                "fetcher.max_workers must be at least 1".into(),
            ));
        }
        if self.fetcher.timeout < 1 {
            return Err(AppError::Config(
                "fetcher.timeout must be at least 1 second".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> Config {
        Config {
            alpha_vantage: AlphaVantageConfig {
                api_key: "TESTKEY123".to_string(),
                ..Default::default()
            },
            universe: vec!["SPY".to_string(), "QQQ".to_string()],
            ..Default::default()
        }
    }

    #[test]
    fn defaults_match_documented_values() {
        let config = Config::default();
        assert_eq!(config.alpha_vantage.daily_request_limit, 25);
        assert_eq!(config.alpha_vantage.base_url, "https://www.alphavantage.co/query");
        assert_eq!(config.lookbacks.r1m, 21);
        assert_eq!(config.lookbacks.r12m, 252);
        assert_eq!(config.vol_windows.short, 63);
        assert_eq!(config.vol_windows.long, 126);
        assert_eq!(config.scoring.penalty_lambda, 0.35);
        assert_eq!(config.scoring.min_adv_usd, 5_000_000.0);
        assert_eq!(config.scoring.breadth_min_positive, 3);
        assert_eq!(config.data.db_name, "momentum.db");
        assert_eq!(config.fetcher.max_workers, 5);
        assert_eq!(config.fetcher.max_retries, 3);
        assert!(config.fetcher.only_fetch_deltas);
        assert_eq!(config.app.top_n, 5);
    }

    #[test]
    fn partial_yaml_overrides_defaults() {
        let yaml = r#"
alpha_vantage:
  api_key: ABC123
  daily_request_limit: 10
universe:
  - SPY
  - IWM
fetcher:
  max_workers: 2
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.alpha_vantage.api_key, "ABC123");
        assert_eq!(config.alpha_vantage.daily_request_limit, 10);
        assert_eq!(config.universe, vec!["SPY", "IWM"]);
        assert_eq!(config.fetcher.max_workers, 2);
        // Untouched sections keep their defaults
        assert_eq!(config.lookbacks.r3m, 63);
        assert_eq!(config.scoring.penalty_lambda, 0.35);
    }

    #[test]
    fn missing_api_key_is_rejected() {
        let mut config = valid_config();
        config.alpha_vantage.api_key = String::new();
        assert!(config.validate().is_err());

        config.alpha_vantage.api_key = PLACEHOLDER_API_KEY.to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn empty_universe_is_rejected() {
        let mut config = valid_config();
        config.universe.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn penalty_lambda_bounds() {
        let mut config = valid_config();
        config.scoring.penalty_lambda = 1.0;
        config.validate().unwrap();

        config.scoring.penalty_lambda = 1.01;
        assert!(config.validate().is_err());

        config.scoring.penalty_lambda = -0.1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn breadth_min_cannot_exceed_total() {
        let mut config = valid_config();
        config.scoring.breadth_min_positive = 4;
        config.scoring.breadth_total_lookbacks = 4;
        config.validate().unwrap();

        config.scoring.breadth_min_positive = 5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn log_settings_are_whitelisted() {
        let mut config = valid_config();
        config.app.log_level = "verbose".to_string();
        assert!(config.validate().is_err());

        config.app.log_level = "debug".to_string();
        config.app.log_format = "xml".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn db_path_joins_dir_and_name() {
        let config = valid_config();
        assert_eq!(config.db_path(), PathBuf::from("./data/momentum.db"));
    }
}
