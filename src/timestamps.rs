//! UTC source timestamps to canonical Canada/Central civil time.
//!
//! Conversion goes UTC -> local only, which `chrono-tz` resolves as a total
//! function: every instant has exactly one local reading with its own offset.
//! During the autumn fall-back two instants share a wall-clock reading but
//! keep distinct offsets, so they stay distinct and ordered. The skipped
//! spring-forward hour has no instants mapping into it. Equality and ordering
//! of canonical timestamps are by instant.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Canada::Central;
use chrono_tz::Tz;

use crate::error::FeatureError;

/// Canonical timestamp used for ordering, windowing and joins.
pub type LocalTimestamp = DateTime<Tz>;

pub const LOCAL_ZONE: Tz = Central;

/// Column name of the canonical timestamp in persisted tables.
pub const TIMESTAMP_COLUMN: &str = "timestamp_ccentral";

const OUTPUT_FORMAT: &str = "%Y-%m-%d %H:%M:%S%:z";

const OFFSET_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f%:z", "%Y-%m-%d %H:%M:%S%.f%#z"];

const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

pub fn to_local(instant: DateTime<Utc>) -> LocalTimestamp {
    instant.with_timezone(&LOCAL_ZONE)
}

/// Parses a source timestamp. Zone-less text is taken as UTC.
pub fn parse_utc(raw: &str) -> Result<DateTime<Utc>, FeatureError> {
    let trimmed = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.with_timezone(&Utc));
    }

    for format in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(trimmed, format) {
            return Ok(dt.with_timezone(&Utc));
        }
    }

    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Ok(Utc.from_utc_datetime(&naive));
        }
    }

    Err(FeatureError::InvalidTimestamp {
        value: raw.to_string(),
    })
}

pub fn normalize(raw: &str) -> Result<LocalTimestamp, FeatureError> {
    parse_utc(raw).map(to_local)
}

pub fn format_local(ts: &LocalTimestamp) -> String {
    ts.format(OUTPUT_FORMAT).to_string()
}
