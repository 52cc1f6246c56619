pub mod feature_vector;
pub mod model_adapter;
pub mod prediction_service;

pub use feature_vector::{FeatureSchema, FeatureVector};
pub use model_adapter::{load_feature_list, ModelAdapter, TreeEnsembleModel};
pub use prediction_service::{parse_request_datetime, validate_request, PredictionService};
