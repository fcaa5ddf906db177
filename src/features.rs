//! Per-bucket feature tables for concentration, load and discharge.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::error::FeatureError;
use crate::load::derive_loads;
use crate::readings::{Parameter, Reading, Site};
use crate::series::{select_param_site, select_site};
use crate::timestamps::LocalTimestamp;
use crate::window::{aggregate_lag_bucket, LagBucket, SignalPoint, WindowStats};

pub const FEATURE_SCHEMA_VERSION: u32 = 1;

const DISCHARGE_PREFIX: &str = "dschrg";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Statistic {
    Mean,
    Min,
    Max,
    MaxMin,
}

impl Statistic {
    pub const ALL: [Statistic; 4] = [Self::Mean, Self::Min, Self::Max, Self::MaxMin];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Mean => "mean",
            Self::Min => "min",
            Self::Max => "max",
            Self::MaxMin => "max_min",
        }
    }

    fn pick(self, stats: &WindowStats) -> f64 {
        match self {
            Self::Mean => stats.mean,
            Self::Min => stats.min,
            Self::Max => stats.max,
            Self::MaxMin => stats.max_min,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeatureDType {
    F64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureColumn {
    pub name: String,
    pub dtype: FeatureDType,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSchema {
    pub version: u32,
    pub fingerprint: String,
    pub columns: Vec<FeatureColumn>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRow {
    pub timestamp: LocalTimestamp,
    /// One cell per schema column; `None` is a non-value.
    pub values: Vec<Option<f64>>,
}

/// Rows keyed by canonical timestamp, ascending and unique.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureTable {
    pub schema: FeatureSchema,
    pub rows: Vec<FeatureRow>,
}

impl FeatureTable {
    pub fn column_names(&self) -> Vec<&str> {
        self.schema.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.schema.columns.iter().position(|c| c.name == name)
    }

    pub fn timestamps(&self) -> Vec<LocalTimestamp> {
        self.rows.iter().map(|row| row.timestamp).collect()
    }

    /// Cells of one column in row order.
    pub fn column(&self, name: &str) -> Option<Vec<Option<f64>>> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(|row| row.values[idx]).collect())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParamFeatures {
    pub concentration: FeatureTable,
    pub load: FeatureTable,
}

pub fn concentration_column(
    parameter: &Parameter,
    site: &Site,
    stat: Statistic,
    bucket: LagBucket,
) -> String {
    format!("{parameter}_{site}_{}_{}", stat.as_str(), bucket.suffix())
}

pub fn load_column(
    parameter: &Parameter,
    site: &Site,
    stat: Statistic,
    bucket: LagBucket,
) -> String {
    format!("{parameter}_{site}_{}_load_{}", stat.as_str(), bucket.suffix())
}

pub fn discharge_column(site: &Site, stat: Statistic, bucket: LagBucket) -> String {
    format!("{DISCHARGE_PREFIX}_{site}_{}_{}", stat.as_str(), bucket.suffix())
}

pub fn build_feature_schema(column_names: Vec<String>) -> FeatureSchema {
    let columns: Vec<FeatureColumn> = column_names
        .into_iter()
        .map(|name| FeatureColumn {
            name,
            dtype: FeatureDType::F64,
        })
        .collect();
    let fingerprint = schema_fingerprint(FEATURE_SCHEMA_VERSION, &columns);

    debug!(
        component = "features",
        event = "features.schema.built",
        version = FEATURE_SCHEMA_VERSION,
        column_count = columns.len(),
        fingerprint = fingerprint
    );

    FeatureSchema {
        version: FEATURE_SCHEMA_VERSION,
        fingerprint,
        columns,
    }
}

pub fn assert_schema_compatible(
    expected_version: u32,
    expected_fingerprint: &str,
    actual: &FeatureSchema,
) -> Result<(), FeatureError> {
    if expected_version != actual.version {
        return Err(FeatureError::SchemaVersionMismatch {
            expected: expected_version,
            actual: actual.version,
        });
    }

    if expected_fingerprint != actual.fingerprint {
        return Err(FeatureError::SchemaFingerprintMismatch {
            expected: expected_fingerprint.to_string(),
            actual: actual.fingerprint.clone(),
        });
    }

    Ok(())
}

/// Concentration and load features for one parameter at one site.
pub fn compute_param_features(
    readings: &[Reading],
    parameter: &Parameter,
    site: &Site,
    bucket: LagBucket,
) -> Result<ParamFeatures, FeatureError> {
    let series = select_param_site(readings, parameter, site);
    let rows = derive_loads(&series, parameter)?;

    let timestamps: Vec<LocalTimestamp> = rows.iter().map(|r| r.timestamp).collect();
    let concentration_points: Vec<SignalPoint> = rows
        .iter()
        .map(|r| (r.timestamp, Some(r.value).filter(|v| !v.is_nan())))
        .collect();
    let load_points: Vec<SignalPoint> = rows.iter().map(|r| (r.timestamp, r.load)).collect();

    let concentration = stats_table(
        Statistic::ALL.map(|stat| concentration_column(parameter, site, stat, bucket)),
        &timestamps,
        &aggregate_lag_bucket(&concentration_points, bucket),
    );
    let load = stats_table(
        Statistic::ALL.map(|stat| load_column(parameter, site, stat, bucket)),
        &timestamps,
        &aggregate_lag_bucket(&load_points, bucket),
    );

    info!(
        component = "features",
        event = "features.param.computed",
        parameter = parameter.as_str(),
        site = site.as_str(),
        bucket = %bucket,
        rows = timestamps.len()
    );

    Ok(ParamFeatures {
        concentration,
        load,
    })
}

/// Discharge features for one site, drawn from every reading at the site.
pub fn compute_discharge_features(
    readings: &[Reading],
    site: &Site,
    bucket: LagBucket,
) -> FeatureTable {
    let series = select_site(readings, site);
    let points: Vec<SignalPoint> = series
        .rows
        .iter()
        .map(|r| (r.timestamp, r.discharge))
        .collect();

    let table = stats_table(
        Statistic::ALL.map(|stat| discharge_column(site, stat, bucket)),
        &series.timestamps(),
        &aggregate_lag_bucket(&points, bucket),
    );

    info!(
        component = "features",
        event = "features.discharge.computed",
        site = site.as_str(),
        bucket = %bucket,
        rows = table.rows.len()
    );

    table
}

fn stats_table(
    columns: [String; 4],
    timestamps: &[LocalTimestamp],
    stats: &[Option<WindowStats>],
) -> FeatureTable {
    let rows = timestamps
        .iter()
        .zip(stats)
        .map(|(ts, stat)| FeatureRow {
            timestamp: *ts,
            values: Statistic::ALL
                .iter()
                .map(|s| stat.as_ref().map(|w| s.pick(w)))
                .collect(),
        })
        .collect();

    FeatureTable {
        schema: build_feature_schema(columns.to_vec()),
        rows,
    }
}

fn schema_fingerprint(version: u32, columns: &[FeatureColumn]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(format!("version:{version};"));
    hasher.update("columns:");
    for column in columns {
        hasher.update(column.name.as_bytes());
        hasher.update(":f64;");
    }
    hex::encode(hasher.finalize())
}
