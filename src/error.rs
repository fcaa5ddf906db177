use thiserror::Error;

#[derive(Debug, Error)]
pub enum FeatureError {
    #[error("invalid lag bucket [{start}, {end}]: {reason}")]
    InvalidLagBucket {
        start: i64,
        end: i64,
        reason: &'static str,
    },
    #[error("reading source is missing required column '{column}'")]
    MissingColumn { column: &'static str },
    #[error("unit conversion for parameter '{parameter}' is not implemented")]
    UnimplementedConversion { parameter: String },
    #[error("series holds parameter '{found}' but load was requested for '{expected}'")]
    ParameterMismatch { expected: String, found: String },
    #[error("invalid timestamp: '{value}'")]
    InvalidTimestamp { value: String },
    #[error("failed to parse field {field} value '{value}' on line {line}")]
    ParseField {
        field: &'static str,
        line: u64,
        value: String,
    },
    #[error("schema version mismatch: expected {expected}, got {actual}")]
    SchemaVersionMismatch { expected: u32, actual: u32 },
    #[error("schema fingerprint mismatch: expected {expected}, got {actual}")]
    SchemaFingerprintMismatch { expected: String, actual: String },
    #[error("invalid run config: {0}")]
    InvalidConfig(String),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl FeatureError {
    /// True for caller errors that must never be defaulted away.
    pub fn is_contract_violation(&self) -> bool {
        matches!(
            self,
            Self::InvalidLagBucket { .. }
                | Self::MissingColumn { .. }
                | Self::UnimplementedConversion { .. }
                | Self::ParameterMismatch { .. }
        )
    }
}
