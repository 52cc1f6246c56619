use chrono::{Datelike, NaiveDateTime, Timelike};
use serde::Serialize;
use std::collections::HashSet;

use crate::error::{ForecastError, Result};
use crate::flow_analyzer::LagFeatures;
use crate::global_variables::{
    is_peak_hour, is_weekend_day, FEATURE_DAY_OF_WEEK, FEATURE_HOUR, FEATURE_IS_PEAK,
    FEATURE_IS_WEEKEND, FEATURE_LAG_1, FEATURE_LAG_2, FEATURE_LAG_3, FEATURE_MONTH,
    FEATURE_NAMES,
};

/// Named numeric features in a fixed order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureVector {
    entries: Vec<(String, f64)>,
}

impl FeatureVector {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| *v)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    pub fn values(&self) -> Vec<f64> {
        self.entries.iter().map(|(_, v)| *v).collect()
    }

    pub fn entries(&self) -> &[(String, f64)] {
        &self.entries
    }
}

/// Calendar and lag features for one junction at `timestamp`, in builder order.
pub fn build(timestamp: NaiveDateTime, lags: LagFeatures) -> FeatureVector {
    let hour = timestamp.hour();
    let day_of_week = timestamp.weekday().num_days_from_monday();
    let flag = |set: bool| if set { 1.0 } else { 0.0 };

    let entries = vec![
        (FEATURE_HOUR.to_string(), hour as f64),
        (FEATURE_DAY_OF_WEEK.to_string(), day_of_week as f64),
        (FEATURE_MONTH.to_string(), timestamp.month() as f64),
        (FEATURE_IS_WEEKEND.to_string(), flag(is_weekend_day(day_of_week))),
        (FEATURE_IS_PEAK.to_string(), flag(is_peak_hour(hour))),
        (FEATURE_LAG_1.to_string(), lags.lag_1),
        (FEATURE_LAG_2.to_string(), lags.lag_2),
        (FEATURE_LAG_3.to_string(), lags.lag_3),
    ];
    FeatureVector { entries }
}

/// The feature order a model was trained on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureSchema {
    names: Vec<String>,
}

impl FeatureSchema {
    /// Checks the schema against what the builder can produce. Every name
    /// must be a builder feature, and none may repeat.
    pub fn new(names: Vec<String>) -> Result<Self> {
        if names.is_empty() {
            return Err(ForecastError::Configuration(
                "model declares an empty feature schema".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for name in &names {
            if !seen.insert(name.as_str()) {
                return Err(ForecastError::Configuration(format!(
                    "feature '{}' appears twice in the model schema",
                    name
                )));
            }
        }

        let missing: Vec<&str> = names
            .iter()
            .map(String::as_str)
            .filter(|name| !FEATURE_NAMES.contains(name))
            .collect();
        if !missing.is_empty() {
            return Err(ForecastError::Configuration(format!(
                "model expects features the builder does not produce: {:?}",
                missing
            )));
        }

        let unused: Vec<&str> = FEATURE_NAMES
            .iter()
            .copied()
            .filter(|f| !seen.contains(f))
            .collect();
        if !unused.is_empty() {
            log::warn!("Model schema ignores builder features {:?}", unused);
        }

        Ok(Self { names })
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Reorders `features` into schema order. Builder features outside the
    /// schema are dropped; a schema field with no value is a configuration
    /// error.
    pub fn align(&self, features: &FeatureVector) -> Result<FeatureVector> {
        let entries = self
            .names
            .iter()
            .map(|name| {
                features
                    .get(name)
                    .map(|value| (name.clone(), value))
                    .ok_or_else(|| {
                        ForecastError::Configuration(format!(
                            "feature '{}' required by the model was not built",
                            name
                        ))
                    })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(FeatureVector { entries })
    }
}
