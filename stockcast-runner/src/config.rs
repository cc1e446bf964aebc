//! Dashboard configuration, loaded from TOML.
//!
//! Every section and field has a default, so an empty file is a valid config:
//!
//! ```toml
//! [data]
//! start_date = "2016-01-01"
//! # end_date = "2024-12-31"   # omitted: today
//! tickers = ["CVS", "GM", "UAL", "F", "DAL"]
//!
//! [display]
//! enable_backward_fill = true
//! show_components = true
//! show_changepoints = true
//! run_cross_validation = false
//! tail_rows = 5
//! changepoint_threshold = 0.01
//!
//! [model]
//! n_changepoints = 25
//! interval_width = 0.8
//!
//! [cross_validation]
//! initial_days = 730
//! period_days = 180
//! horizon_days = 365
//!
//! [provider]
//! kind = "yahoo"          # or "csv", "synthetic"
//! csv_dir = "data"
//!
//! [provider.yahoo]
//! timeout_secs = 30
//! max_retries = 0
//! ```

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use stockcast_core::data::tickers::DEFAULT_TICKERS;
use stockcast_core::data::{AllowedTickers, FillPolicy, YahooConfig};
use stockcast_core::forecast::{
    CrossValidationConfig, EngineConfig, DEFAULT_CHANGEPOINT_THRESHOLD,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    pub start_date: NaiveDate,
    /// Inclusive end of the history; `None` means the current local date.
    pub end_date: Option<NaiveDate>,
    pub tickers: Vec<String>,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            start_date: NaiveDate::from_ymd_opt(2016, 1, 1).unwrap_or_default(),
            end_date: None,
            tickers: DEFAULT_TICKERS.iter().map(|t| t.to_string()).collect(),
        }
    }
}

impl DataConfig {
    pub fn resolved_end(&self) -> NaiveDate {
        self.end_date
            .unwrap_or_else(|| chrono::Local::now().date_naive())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub enable_backward_fill: bool,
    pub show_components: bool,
    pub show_changepoints: bool,
    pub run_cross_validation: bool,
    pub tail_rows: usize,
    /// Minimum absolute rate change for a changepoint to be reported.
    pub changepoint_threshold: f64,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            enable_backward_fill: true,
            show_components: true,
            show_changepoints: true,
            run_cross_validation: false,
            tail_rows: 5,
            changepoint_threshold: DEFAULT_CHANGEPOINT_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    #[default]
    Yahoo,
    Csv,
    Synthetic,
}

impl std::str::FromStr for ProviderKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "yahoo" => Ok(ProviderKind::Yahoo),
            "csv" => Ok(ProviderKind::Csv),
            "synthetic" => Ok(ProviderKind::Synthetic),
            other => Err(ConfigError::Invalid(format!(
                "unknown provider '{other}' (expected yahoo, csv or synthetic)"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub kind: ProviderKind,
    pub csv_dir: PathBuf,
    pub breaker_cooldown_secs: u64,
    pub yahoo: YahooConfig,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            kind: ProviderKind::Yahoo,
            csv_dir: PathBuf::from("data"),
            breaker_cooldown_secs: 30 * 60,
            yahoo: YahooConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub data: DataConfig,
    pub display: DisplayConfig,
    pub model: EngineConfig,
    pub cross_validation: CrossValidationConfig,
    pub provider: ProviderConfig,
}

impl DashboardConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: DashboardConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(end) = self.data.end_date {
            if end < self.data.start_date {
                return Err(ConfigError::Invalid(format!(
                    "end_date {end} is before start_date {}",
                    self.data.start_date
                )));
            }
        }
        let threshold = self.display.changepoint_threshold;
        if !threshold.is_finite() || threshold < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "changepoint_threshold must be a non-negative number, got {threshold}"
            )));
        }
        if self.allowed_tickers().is_empty() {
            return Err(ConfigError::Invalid("ticker list is empty".into()));
        }
        self.model
            .validate()
            .map_err(|e| ConfigError::Invalid(format!("model: {e}")))?;
        self.cross_validation
            .validate()
            .map_err(|e| ConfigError::Invalid(format!("cross_validation: {e}")))?;
        Ok(())
    }

    pub fn allowed_tickers(&self) -> AllowedTickers {
        AllowedTickers::new(&self.data.tickers)
    }

    pub fn fill_policy(&self) -> FillPolicy {
        FillPolicy {
            backward: self.display.enable_backward_fill,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_is_default() {
        let cfg = DashboardConfig::from_toml("").unwrap();
        assert_eq!(cfg, DashboardConfig::default());
        assert_eq!(
            cfg.data.start_date,
            NaiveDate::from_ymd_opt(2016, 1, 1).unwrap()
        );
        assert!(cfg.display.enable_backward_fill);
        assert!(cfg.display.show_components);
        assert!(cfg.display.show_changepoints);
        assert!(!cfg.display.run_cross_validation);
        assert_eq!(cfg.provider.kind, ProviderKind::Yahoo);
        assert_eq!(cfg.provider.yahoo.max_retries, 0);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let cfg = DashboardConfig::from_toml(
            r#"
            [display]
            enable_backward_fill = false

            [provider]
            kind = "synthetic"

            [model]
            interval_width = 0.95
            "#,
        )
        .unwrap();
        assert!(!cfg.fill_policy().backward);
        assert_eq!(cfg.display.tail_rows, 5);
        assert_eq!(cfg.provider.kind, ProviderKind::Synthetic);
        assert_eq!(cfg.model.interval_width, 0.95);
        assert_eq!(cfg.model.n_changepoints, 25);
    }

    #[test]
    fn inverted_dates_rejected() {
        let err = DashboardConfig::from_toml(
            r#"
            [data]
            start_date = "2020-01-01"
            end_date = "2019-01-01"
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn bad_model_rejected() {
        let err = DashboardConfig::from_toml("[model]\nchangepoint_range = 1.5\n").unwrap_err();
        assert!(err.to_string().contains("model"));
    }

    #[test]
    fn oversized_cross_validation_window_rejected() {
        let err = DashboardConfig::from_toml("[cross_validation]\ninitial_days = 4000000000\n")
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
        assert!(err.to_string().contains("cross_validation"));
    }

    #[test]
    fn ticker_list_comes_from_data_section() {
        let cfg = DashboardConfig::from_toml("[data]\ntickers = [\"xom\", \"CVS\", \"xom\"]\n")
            .unwrap();
        let allowed = cfg.allowed_tickers();
        assert_eq!(allowed.iter().collect::<Vec<_>>(), vec!["XOM", "CVS"]);
        assert!(matches!(
            DashboardConfig::from_toml("[data]\ntickers = [\" \"]\n"),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn changepoint_threshold_must_be_non_negative() {
        let cfg = DashboardConfig::from_toml("[display]\nchangepoint_threshold = 0.5\n").unwrap();
        assert_eq!(cfg.display.changepoint_threshold, 0.5);
        assert_eq!(
            DashboardConfig::default().display.changepoint_threshold,
            DEFAULT_CHANGEPOINT_THRESHOLD
        );
        assert!(matches!(
            DashboardConfig::from_toml("[display]\nchangepoint_threshold = -1.0\n"),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn unknown_provider_is_parse_error() {
        assert!(matches!(
            DashboardConfig::from_toml("[provider]\nkind = \"bloomberg\"\n"),
            Err(ConfigError::Parse(_))
        ));
        assert!("bloomberg".parse::<ProviderKind>().is_err());
        assert_eq!("CSV".parse::<ProviderKind>().unwrap(), ProviderKind::Csv);
    }

    #[test]
    fn toml_roundtrip() {
        let mut cfg = DashboardConfig::default();
        cfg.data.end_date = NaiveDate::from_ymd_opt(2024, 6, 30);
        cfg.display.run_cross_validation = true;
        let text = cfg.to_toml().unwrap();
        assert_eq!(DashboardConfig::from_toml(&text).unwrap(), cfg);
    }

    #[test]
    fn explicit_end_date_is_used() {
        let mut cfg = DataConfig::default();
        let end = NaiveDate::from_ymd_opt(2023, 3, 1).unwrap();
        cfg.end_date = Some(end);
        assert_eq!(cfg.resolved_end(), end);
    }
}
