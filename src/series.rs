//! Selection of a single canonical series from the reading collection.

use std::collections::HashSet;

use tracing::debug;

use crate::readings::{Parameter, Reading, Site};
use crate::timestamps::{to_local, LocalTimestamp};

#[derive(Debug, Clone, PartialEq)]
pub struct SeriesRow {
    pub timestamp: LocalTimestamp,
    pub value: f64,
    pub discharge: Option<f64>,
}

/// Rows strictly ascending by canonical timestamp, one per timestamp.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CanonicalSeries {
    /// `None` for a site-only (discharge) selection.
    pub parameter: Option<Parameter>,
    pub site: Option<Site>,
    pub rows: Vec<SeriesRow>,
}

impl CanonicalSeries {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn timestamps(&self) -> Vec<LocalTimestamp> {
        self.rows.iter().map(|row| row.timestamp).collect()
    }

    /// Builds a series from rows in source order: first occurrence of each
    /// timestamp wins, then rows are sorted ascending.
    pub fn from_rows(
        parameter: Option<Parameter>,
        site: Option<Site>,
        rows: impl IntoIterator<Item = SeriesRow>,
    ) -> Self {
        let mut seen = HashSet::new();
        let mut kept = Vec::new();
        let mut dropped = 0_usize;

        for row in rows {
            if seen.insert(row.timestamp) {
                kept.push(row);
            } else {
                dropped += 1;
            }
        }
        kept.sort_by_key(|row| row.timestamp);

        if dropped > 0 {
            debug!(
                component = "series",
                event = "series.duplicates.dropped",
                parameter = parameter.as_ref().map(Parameter::as_str),
                site = site.as_ref().map(Site::as_str),
                dropped
            );
        }

        Self {
            parameter,
            site,
            rows: kept,
        }
    }
}

pub fn select_param_site(
    readings: &[Reading],
    parameter: &Parameter,
    site: &Site,
) -> CanonicalSeries {
    let rows = readings
        .iter()
        .filter(|r| &r.parameter == parameter && &r.site == site)
        .map(series_row);
    CanonicalSeries::from_rows(Some(parameter.clone()), Some(site.clone()), rows)
}

/// Every reading at `site` regardless of parameter; the discharge column
/// is the signal of interest.
pub fn select_site(readings: &[Reading], site: &Site) -> CanonicalSeries {
    let rows = readings.iter().filter(|r| &r.site == site).map(series_row);
    CanonicalSeries::from_rows(None, Some(site.clone()), rows)
}

fn series_row(reading: &Reading) -> SeriesRow {
    SeriesRow {
        timestamp: to_local(reading.timestamp),
        value: reading.value,
        discharge: reading.discharge,
    }
}
