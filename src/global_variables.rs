// Data sources
pub const DEFAULT_TRAFFIC_DATA_PATH: &str = "traffic.csv";
pub const DEFAULT_MODEL_PATH: &str = "traffic_model.json";
pub const DEFAULT_CONFIG_PATH: &str = "forecast_config.json";

// Junction ids accepted by the prediction endpoint
pub const DEFAULT_MIN_JUNCTION: u32 = 1;
pub const DEFAULT_MAX_JUNCTION: u32 = 4;

// Calendar flags
pub const PEAK_HOURS: [u32; 6] = [7, 8, 9, 17, 18, 19];
pub const WEEKEND_DAYS: [u32; 2] = [5, 6];

// Number of top hours reported as peak hours in traffic statistics
pub const DEFAULT_PEAK_HOUR_COUNT: usize = 3;

// Feature names, in the order the builder emits them
pub const FEATURE_HOUR: &str = "hour";
pub const FEATURE_DAY_OF_WEEK: &str = "dayofweek";
pub const FEATURE_MONTH: &str = "month";
pub const FEATURE_IS_WEEKEND: &str = "is_weekend";
pub const FEATURE_IS_PEAK: &str = "is_peak";
pub const FEATURE_LAG_1: &str = "lag_1";
pub const FEATURE_LAG_2: &str = "lag_2";
pub const FEATURE_LAG_3: &str = "lag_3";

pub const FEATURE_NAMES: [&str; 8] = [
    FEATURE_HOUR,
    FEATURE_DAY_OF_WEEK,
    FEATURE_MONTH,
    FEATURE_IS_WEEKEND,
    FEATURE_IS_PEAK,
    FEATURE_LAG_1,
    FEATURE_LAG_2,
    FEATURE_LAG_3,
];

pub fn is_peak_hour(hour: u32) -> bool {
    PEAK_HOURS.contains(&hour)
}

pub fn is_weekend_day(day_of_week: u32) -> bool {
    WEEKEND_DAYS.contains(&day_of_week)
}
