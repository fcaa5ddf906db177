//! Raw sensor readings and their CSV source.

use std::fmt;
use std::fs;
use std::io::Read;
use std::path::Path;

use chrono::{DateTime, Utc};
use csv::StringRecord;
use tracing::info;

use crate::error::FeatureError;
use crate::timestamps::parse_utc;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Parameter {
    Turbidity,
    Toc,
    TotalDissolvedSolids,
    Discharge,
    Other(String),
}

impl Parameter {
    pub fn parse(tag: &str) -> Self {
        match tag.trim() {
            "turbidity" => Self::Turbidity,
            "toc" => Self::Toc,
            "total_dissolved_solids" => Self::TotalDissolvedSolids,
            "discharge" => Self::Discharge,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Turbidity => "turbidity",
            Self::Toc => "toc",
            Self::TotalDissolvedSolids => "total_dissolved_solids",
            Self::Discharge => "discharge",
            Self::Other(tag) => tag,
        }
    }

    /// Short prefix used in output file names.
    pub fn file_code(&self) -> &str {
        match self {
            Self::Turbidity => "tur",
            Self::Toc => "toc",
            Self::TotalDissolvedSolids => "tds",
            Self::Discharge => "discharge",
            Self::Other(tag) => tag,
        }
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Site {
    Pinawa,
    Whitemouth,
    Other(String),
}

impl Site {
    pub fn parse(tag: &str) -> Self {
        match tag.trim() {
            "pnwa" => Self::Pinawa,
            "wmth" => Self::Whitemouth,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Pinawa => "pnwa",
            Self::Whitemouth => "wmth",
            Self::Other(tag) => tag,
        }
    }
}

impl fmt::Display for Site {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One observation. A blank `value` reads as NaN; a blank or NaN
/// `discharge` reads as `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    pub timestamp: DateTime<Utc>,
    pub parameter: Parameter,
    pub site: Site,
    pub value: f64,
    pub discharge: Option<f64>,
}

struct ColumnIndex {
    timestamp: usize,
    parameter: usize,
    site: usize,
    value: usize,
    discharge: usize,
}

impl ColumnIndex {
    fn from_headers(headers: &StringRecord) -> Result<Self, FeatureError> {
        let find = |column: &'static str| {
            headers
                .iter()
                .position(|h| h.trim() == column)
                .ok_or(FeatureError::MissingColumn { column })
        };
        Ok(Self {
            timestamp: find("timestamp")?,
            parameter: find("parameter")?,
            site: find("site")?,
            value: find("value")?,
            discharge: find("discharge")?,
        })
    }
}

pub fn load_readings_csv(path: &Path) -> Result<Vec<Reading>, FeatureError> {
    let file = fs::File::open(path)?;
    let readings = read_readings(file)?;

    info!(
        component = "readings",
        event = "readings.load.finish",
        path = %path.display(),
        readings = readings.len()
    );

    Ok(readings)
}

pub fn read_readings<R: Read>(source: R) -> Result<Vec<Reading>, FeatureError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(source);

    let columns = ColumnIndex::from_headers(reader.headers()?)?;

    let mut out = Vec::new();
    for record in reader.records() {
        let record = record?;
        out.push(parse_reading(&record, &columns)?);
    }
    Ok(out)
}

fn parse_reading(record: &StringRecord, columns: &ColumnIndex) -> Result<Reading, FeatureError> {
    let line = record.position().map(|p| p.line()).unwrap_or_default();
    let raw_ts = record.get(columns.timestamp).unwrap_or_default();

    Ok(Reading {
        timestamp: parse_utc(raw_ts)?,
        parameter: Parameter::parse(record.get(columns.parameter).unwrap_or_default()),
        site: Site::parse(record.get(columns.site).unwrap_or_default()),
        value: parse_optional_f64(record, columns.value, "value", line)?.unwrap_or(f64::NAN),
        discharge: parse_optional_f64(record, columns.discharge, "discharge", line)?,
    })
}

fn parse_optional_f64(
    record: &StringRecord,
    idx: usize,
    field: &'static str,
    line: u64,
) -> Result<Option<f64>, FeatureError> {
    let raw = record.get(idx).unwrap_or_default().trim();
    if raw.is_empty() {
        return Ok(None);
    }
    let parsed = raw.parse::<f64>().map_err(|_| FeatureError::ParseField {
        field,
        line,
        value: raw.to_string(),
    })?;
    Ok(Some(parsed).filter(|v| !v.is_nan()))
}
