use thiserror::Error;

use crate::shared_data::JunctionId;

pub type Result<T> = std::result::Result<T, ForecastError>;

/// Failures raised by the forecasting core.
#[derive(Debug, Error)]
pub enum ForecastError {
    /// The historical traffic log is missing or could not be parsed.
    #[error("traffic data unavailable: {0}")]
    DataUnavailable(String),

    /// Statistics were requested where no observations exist.
    #[error("no observations for {}", describe_scope(.0))]
    EmptyDataset(Option<JunctionId>),

    /// Model schema and feature builder disagree, or the process is misconfigured.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The request never reached the pipeline because a field is malformed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("model scoring failed: {0}")]
    Scoring(String),

    /// Wraps any failure raised while serving a single prediction.
    #[error("prediction error: {0}")]
    Prediction(#[source] Box<ForecastError>),
}

fn describe_scope(junction: &Option<JunctionId>) -> String {
    match junction {
        Some(id) => format!("junction {}", id),
        None => "the dataset".to_string(),
    }
}

impl ForecastError {
    /// Wraps `self` as a prediction failure, leaving existing wrappers alone.
    pub fn into_prediction(self) -> Self {
        match self {
            ForecastError::Prediction(_) => self,
            other => ForecastError::Prediction(Box::new(other)),
        }
    }

    /// True for failures caused by the deployment (data or configuration)
    /// rather than by the caller's input.
    pub fn is_server_side(&self) -> bool {
        match self {
            ForecastError::DataUnavailable(_) | ForecastError::Configuration(_) => true,
            ForecastError::Prediction(inner) => inner.is_server_side(),
            _ => false,
        }
    }
}
