pub mod config;
pub mod error;
pub mod flow_analyzer;
pub mod global_variables;
pub mod historical;
pub mod monitoring;
pub mod prediction;
pub mod shared_data;

pub use error::{ForecastError, Result};
