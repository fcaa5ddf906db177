//! Lag-bucket windowed aggregation.
//!
//! For a bucket `[start, end]` hours ago the aggregator computes, at every
//! row `t`, mean/min/max/range over the trailing time window `[t - W, t)`
//! with `W = end - start + 1` hours. The row at `t` never contributes to its
//! own statistic. The per-row results are then moved `shift_rows()` rows
//! later so that each row reports the bucket instead of `[0, W)`.

use std::fmt;
use std::str::FromStr;

use chrono::Duration;
use tracing::debug;

use crate::error::FeatureError;
use crate::timestamps::LocalTimestamp;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LagBucket {
    start: u32,
    end: u32,
}

impl LagBucket {
    pub fn new(start: i64, end: i64) -> Result<Self, FeatureError> {
        if start < 1 {
            return Err(FeatureError::InvalidLagBucket {
                start,
                end,
                reason: "start must be at least 1 hour ago",
            });
        }
        if start > end {
            return Err(FeatureError::InvalidLagBucket {
                start,
                end,
                reason: "start must not exceed end",
            });
        }
        let (Ok(start_u), Ok(end_u)) = (u32::try_from(start), u32::try_from(end)) else {
            return Err(FeatureError::InvalidLagBucket {
                start,
                end,
                reason: "bounds exceed the supported hour range",
            });
        };
        Ok(Self {
            start: start_u,
            end: end_u,
        })
    }

    pub fn start(&self) -> u32 {
        self.start
    }

    pub fn end(&self) -> u32 {
        self.end
    }

    /// `W`, the window length in hours.
    pub fn offset_width_hours(&self) -> u32 {
        self.end - self.start + 1
    }

    /// Saturates at `Duration::MAX` for widths past the representable range.
    pub fn window(&self) -> Duration {
        Duration::try_hours(i64::from(self.offset_width_hours())).unwrap_or(Duration::MAX)
    }

    /// Number of rows the raw statistics are moved later:
    /// `floor(start / W) * W`.
    ///
    /// This is a row count, not a duration. It only equals the intended
    /// hour lag when the series is sampled exactly hourly; gaps or denser
    /// sampling misalign the reported lag.
    pub fn shift_rows(&self) -> usize {
        let width = self.offset_width_hours();
        ((self.start / width) * width) as usize
    }

    /// `"{start}_{end}"`, the suffix carried by feature column names.
    pub fn suffix(&self) -> String {
        format!("{}_{}", self.start, self.end)
    }
}

impl fmt::Display for LagBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.start, self.end)
    }
}

/// Parses `"start-end"`, e.g. `"4-6"`.
impl FromStr for LagBucket {
    type Err = FeatureError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let invalid = || {
            FeatureError::InvalidConfig(format!("invalid lag bucket '{raw}', expected start-end"))
        };
        let (start, end) = raw.trim().split_once('-').ok_or_else(invalid)?;
        let start = start.trim().parse::<i64>().map_err(|_| invalid())?;
        let end = end.trim().parse::<i64>().map_err(|_| invalid())?;
        Self::new(start, end)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowStats {
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    pub max_min: f64,
}

impl WindowStats {
    fn from_values(values: impl Iterator<Item = f64>) -> Option<Self> {
        let mut count = 0_usize;
        let mut sum = 0.0_f64;
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        for v in values {
            count += 1;
            sum += v;
            min = min.min(v);
            max = max.max(v);
        }
        if count == 0 {
            return None;
        }
        Some(Self {
            mean: sum / count as f64,
            min,
            max,
            max_min: (max - min).abs(),
        })
    }
}

/// One input row: canonical timestamp and the signal, `None` when absent.
pub type SignalPoint = (LocalTimestamp, Option<f64>);

/// Statistics over `[t - width, t)` for each row, before any lag shift.
/// `points` must be strictly ascending by timestamp.
pub fn trailing_window_stats(points: &[SignalPoint], width: Duration) -> Vec<Option<WindowStats>> {
    let mut out = Vec::with_capacity(points.len());
    let mut left = 0_usize;

    for (idx, (ts, _)) in points.iter().enumerate() {
        // A start before the representable range reaches back to the first row.
        if let Some(window_start) = ts.checked_sub_signed(width) {
            while left < idx && points[left].0 < window_start {
                left += 1;
            }
        }
        let present = points[left..idx]
            .iter()
            .filter_map(|(_, value)| *value)
            .filter(|v| !v.is_nan());
        out.push(WindowStats::from_values(present));
    }

    out
}

/// Moves every entry `rows` positions later; the first `rows` entries
/// become `None`. Length is preserved.
pub fn shift_later<T: Copy>(raw: &[Option<T>], rows: usize) -> Vec<Option<T>> {
    (0..raw.len())
        .map(|idx| idx.checked_sub(rows).and_then(|src| raw[src]))
        .collect()
}

/// Lag-aligned bucket statistics, one entry per input row.
pub fn aggregate_lag_bucket(points: &[SignalPoint], bucket: LagBucket) -> Vec<Option<WindowStats>> {
    let raw = trailing_window_stats(points, bucket.window());
    let shift = bucket.shift_rows();
    let shifted = shift_later(&raw, shift);

    debug!(
        component = "window",
        event = "window.bucket.aggregated",
        bucket = %bucket,
        width_hours = bucket.offset_width_hours(),
        shift_rows = shift,
        rows = points.len(),
        populated = shifted.iter().filter(|s| s.is_some()).count()
    );

    shifted
}
