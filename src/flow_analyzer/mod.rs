pub mod lag_features;
pub mod traffic_analyzer;

// Re-export the items callers reach for most often
pub use lag_features::{resolve as resolve_lags, LagFeatures};
pub use traffic_analyzer::{
    daily_averages, hourly_averages, junction_overview, junction_stats, overall_stats,
    peak_hours, per_junction_stats, traffic_stats, JunctionOverview, JunctionStats, OverallStats,
    TrafficStats,
};
