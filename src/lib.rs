//! Lagged, windowed water-quality feature tables.
//!
//! Current implemented scope:
//! - reading ingestion and Canada/Central timestamp normalization
//! - per (parameter, site) and per site series selection
//! - discharge-weighted load derivation
//! - lag-bucket trailing-window statistics
//! - bucket fan-out, timestamp joins and CSV persistence

mod assembly;
mod config;
mod error;
mod features;
mod load;
mod observability;
mod readings;
mod series;
mod timestamps;
mod window;


pub use assembly::{
    build_combined_table, build_discharge_table, build_param_tables, combine_with_discharge,
    combined_file_name, concentration_file_name, discharge_file_name, left_join, load_file_name,
    manifest_path_for, outer_join, write_schema_manifest, write_table, write_table_csv,
};
pub use config::{default_buckets, parse_buckets, run_config_from_env, RunConfig};
pub use error::FeatureError;
pub use features::{
    assert_schema_compatible, build_feature_schema, compute_discharge_features,
    compute_param_features, concentration_column, discharge_column, load_column, FeatureColumn,
    FeatureDType, FeatureRow, FeatureSchema, FeatureTable, ParamFeatures, Statistic,
    FEATURE_SCHEMA_VERSION,
};
pub use load::{conversion_for, derive_loads, LoadRow, UnitConversion, TURBIDITY_NTU_PER_MG_L};
pub use observability::{
    init_logging, log_run_finish, log_run_start, logging_config_from_env, LogFormat,
    LoggingConfig, LoggingInitError,
};
pub use readings::{load_readings_csv, read_readings, Parameter, Reading, Site};
pub use series::{select_param_site, select_site, CanonicalSeries, SeriesRow};
pub use timestamps::{
    format_local, normalize, parse_utc, to_local, LocalTimestamp, LOCAL_ZONE, TIMESTAMP_COLUMN,
};
pub use window::{
    aggregate_lag_bucket, shift_later, trailing_window_stats, LagBucket, SignalPoint, WindowStats,
};
