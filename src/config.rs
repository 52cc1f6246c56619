use serde::{Deserialize, Serialize};
use std::fs;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};

use crate::error::{ForecastError, Result};
use crate::global_variables::{
    DEFAULT_CONFIG_PATH, DEFAULT_MAX_JUNCTION, DEFAULT_MIN_JUNCTION, DEFAULT_MODEL_PATH,
    DEFAULT_TRAFFIC_DATA_PATH,
};
use crate::shared_data::JunctionId;

/// Process configuration for the forecast service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    pub traffic_data_path: PathBuf,
    pub model_path: PathBuf,
    /// Optional JSON array of feature names; when absent the model file's
    /// own feature names are used.
    pub features_path: Option<PathBuf>,
    pub min_junction: JunctionId,
    pub max_junction: JunctionId,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            traffic_data_path: PathBuf::from(DEFAULT_TRAFFIC_DATA_PATH),
            model_path: PathBuf::from(DEFAULT_MODEL_PATH),
            features_path: None,
            min_junction: DEFAULT_MIN_JUNCTION,
            max_junction: DEFAULT_MAX_JUNCTION,
        }
    }
}

impl ForecastConfig {
    /// Reads a JSON config file. Missing keys take their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path).map_err(|e| {
            ForecastError::Configuration(format!("cannot read {}: {}", path.display(), e))
        })?;
        let config: ForecastConfig = serde_json::from_str(&data).map_err(|e| {
            ForecastError::Configuration(format!("invalid config {}: {}", path.display(), e))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Builds the process configuration: the file named by `FORECAST_CONFIG`
    /// (or the default path, if it exists), then environment overrides.
    pub fn from_env() -> Result<Self> {
        let explicit = std::env::var("FORECAST_CONFIG").ok().map(PathBuf::from);
        let path = explicit
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));

        let mut config = if path.exists() {
            log::info!("Loading configuration from {}", path.display());
            Self::load(&path)?
        } else if explicit.is_some() {
            return Err(ForecastError::Configuration(format!(
                "config file {} not found",
                path.display()
            )));
        } else {
            Self::default()
        };

        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Applies `TRAFFIC_DATA_PATH`, `MODEL_PATH`, `FEATURES_PATH`,
    /// `MIN_JUNCTION` and `MAX_JUNCTION` from `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("TRAFFIC_DATA_PATH") {
            self.traffic_data_path = PathBuf::from(v);
        }
        if let Some(v) = lookup("MODEL_PATH") {
            self.model_path = PathBuf::from(v);
        }
        if let Some(v) = lookup("FEATURES_PATH") {
            self.features_path = Some(PathBuf::from(v));
        }
        if let Some(v) = lookup("MIN_JUNCTION") {
            self.min_junction = parse_junction("MIN_JUNCTION", &v)?;
        }
        if let Some(v) = lookup("MAX_JUNCTION") {
            self.max_junction = parse_junction("MAX_JUNCTION", &v)?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.min_junction > self.max_junction {
            return Err(ForecastError::Configuration(format!(
                "junction range is empty: {}..={}",
                self.min_junction, self.max_junction
            )));
        }
        Ok(())
    }

    pub fn junction_range(&self) -> RangeInclusive<JunctionId> {
        self.min_junction..=self.max_junction
    }
}

fn parse_junction(key: &str, value: &str) -> Result<JunctionId> {
    value.trim().parse::<JunctionId>().map_err(|_| {
        ForecastError::Configuration(format!("{} must be a junction id, got '{}'", key, value))
    })
}
