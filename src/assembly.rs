//! Fan-out over lag buckets and fan-in by timestamp joins, plus persistence.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::FeatureError;
use crate::features::{
    build_feature_schema, compute_discharge_features, compute_param_features, FeatureRow,
    FeatureTable, ParamFeatures,
};
use crate::readings::{Parameter, Reading, Site};
use crate::timestamps::{format_local, LocalTimestamp, TIMESTAMP_COLUMN};
use crate::window::LagBucket;

/// Full outer join on timestamp. Keys are the ascending union of every
/// table's keys; columns follow table order; absent cells are `None`.
pub fn outer_join(tables: &[FeatureTable]) -> FeatureTable {
    let width: usize = tables.iter().map(|t| t.schema.columns.len()).sum();
    let mut merged: BTreeMap<LocalTimestamp, Vec<Option<f64>>> = BTreeMap::new();

    let mut offset = 0;
    for table in tables {
        for row in &table.rows {
            let cells = merged
                .entry(row.timestamp)
                .or_insert_with(|| vec![None; width]);
            cells[offset..offset + row.values.len()].copy_from_slice(&row.values);
        }
        offset += table.schema.columns.len();
    }

    FeatureTable {
        schema: build_feature_schema(joined_column_names(tables)),
        rows: merged
            .into_iter()
            .map(|(timestamp, values)| FeatureRow { timestamp, values })
            .collect(),
    }
}

/// Keeps exactly the rows of `left`, appending matching `right` cells.
pub fn left_join(left: &FeatureTable, right: &FeatureTable) -> FeatureTable {
    let right_width = right.schema.columns.len();
    let lookup: HashMap<LocalTimestamp, &[Option<f64>]> = right
        .rows
        .iter()
        .map(|row| (row.timestamp, row.values.as_slice()))
        .collect();

    let rows = left
        .rows
        .iter()
        .map(|row| {
            let mut values = row.values.clone();
            match lookup.get(&row.timestamp) {
                Some(cells) => values.extend_from_slice(cells),
                None => values.extend(std::iter::repeat(None).take(right_width)),
            }
            FeatureRow {
                timestamp: row.timestamp,
                values,
            }
        })
        .collect();

    FeatureTable {
        schema: build_feature_schema(joined_column_names([left, right])),
        rows,
    }
}

/// Concentration and load tables for every bucket, each outer-joined.
pub fn build_param_tables(
    readings: &[Reading],
    parameter: &Parameter,
    site: &Site,
    buckets: &[LagBucket],
) -> Result<ParamFeatures, FeatureError> {
    let mut concentration = Vec::with_capacity(buckets.len());
    let mut load = Vec::with_capacity(buckets.len());
    for bucket in buckets {
        let features = compute_param_features(readings, parameter, site, *bucket)?;
        concentration.push(features.concentration);
        load.push(features.load);
    }

    Ok(ParamFeatures {
        concentration: outer_join(&concentration),
        load: outer_join(&load),
    })
}

pub fn build_discharge_table(
    readings: &[Reading],
    site: &Site,
    buckets: &[LagBucket],
) -> FeatureTable {
    let tables: Vec<FeatureTable> = buckets
        .iter()
        .map(|bucket| compute_discharge_features(readings, site, *bucket))
        .collect();
    outer_join(&tables)
}

/// Every concentration and load table of `parameter` across `sites`,
/// outer-joined, with the sites' discharge features left-joined on.
pub fn build_combined_table(
    readings: &[Reading],
    parameter: &Parameter,
    sites: &[Site],
    buckets: &[LagBucket],
) -> Result<FeatureTable, FeatureError> {
    let mut param_tables = Vec::with_capacity(sites.len() * 2);
    let mut discharge_tables = Vec::with_capacity(sites.len());
    for site in sites {
        let features = build_param_tables(readings, parameter, site, buckets)?;
        param_tables.push(features.concentration);
        param_tables.push(features.load);
        discharge_tables.push(build_discharge_table(readings, site, buckets));
    }

    Ok(combine_with_discharge(&param_tables, &discharge_tables))
}

/// Outer join of `param_tables`, then left join of the outer-joined
/// `discharge_tables`.
pub fn combine_with_discharge(
    param_tables: &[FeatureTable],
    discharge_tables: &[FeatureTable],
) -> FeatureTable {
    left_join(&outer_join(param_tables), &outer_join(discharge_tables))
}

pub fn concentration_file_name(parameter: &Parameter, site: &Site) -> String {
    format!("{}_{site}_concentration_features.csv", parameter.file_code())
}

pub fn load_file_name(parameter: &Parameter, site: &Site) -> String {
    format!("{}_{site}_load_features.csv", parameter.file_code())
}

pub fn discharge_file_name(site: &Site) -> String {
    format!("discharge_{site}_features.csv")
}

pub fn combined_file_name(parameter: &Parameter) -> String {
    format!("{}_combined_with_discharge.csv", parameter.file_code())
}

/// Schema manifest written next to a table: `x.csv` -> `x.schema.json`.
pub fn manifest_path_for(csv_path: &Path) -> PathBuf {
    csv_path.with_extension("schema.json")
}

/// Header `timestamp_ccentral` then the feature columns; `None` cells are empty.
pub fn write_table<W: Write>(table: &FeatureTable, out: W) -> Result<(), FeatureError> {
    let mut writer = csv::Writer::from_writer(out);

    let mut header = Vec::with_capacity(table.schema.columns.len() + 1);
    header.push(TIMESTAMP_COLUMN);
    header.extend(table.column_names());
    writer.write_record(&header)?;

    for row in &table.rows {
        let mut record = Vec::with_capacity(row.values.len() + 1);
        record.push(format_local(&row.timestamp));
        record.extend(
            row.values
                .iter()
                .map(|cell| cell.map(|v| v.to_string()).unwrap_or_default()),
        );
        writer.write_record(&record)?;
    }

    writer.flush()?;
    Ok(())
}

pub fn write_table_csv(table: &FeatureTable, path: &Path) -> Result<(), FeatureError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let file = fs::File::create(path)?;
    write_table(table, file)?;

    info!(
        component = "assembly",
        event = "assembly.table.written",
        path = %path.display(),
        rows = table.rows.len(),
        columns = table.schema.columns.len(),
        fingerprint = table.schema.fingerprint
    );

    Ok(())
}

pub fn write_schema_manifest(table: &FeatureTable, path: &Path) -> Result<(), FeatureError> {
    let file = fs::File::create(path)?;
    serde_json::to_writer_pretty(file, &table.schema)?;
    Ok(())
}

fn joined_column_names<'a>(tables: impl IntoIterator<Item = &'a FeatureTable>) -> Vec<String> {
    tables
        .into_iter()
        .flat_map(|t| t.schema.columns.iter().map(|c| c.name.clone()))
        .collect()
}
