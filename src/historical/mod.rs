pub mod dataset;
pub mod store;

pub use dataset::{parse_timestamp, HistoricalDataset};
pub use store::HistoricalStore;
