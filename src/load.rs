//! Discharge-weighted load derivation.
//!
//! Unit handling is an explicit dispatch table from parameter to
//! [`UnitConversion`]. Total dissolved solids is declared but has no
//! agreed conversion factor yet, so it maps to `Unimplemented` and fails.

use tracing::debug;

use crate::error::FeatureError;
use crate::readings::Parameter;
use crate::series::CanonicalSeries;
use crate::timestamps::LocalTimestamp;

/// NTU per mg/L used to turn turbidity into a mass-concentration proxy.
pub const TURBIDITY_NTU_PER_MG_L: f64 = 3.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UnitConversion {
    /// Value is already mg/L.
    Identity,
    /// Divide the value by this factor before multiplying by discharge.
    DivideBy(f64),
    Unimplemented,
}

impl UnitConversion {
    fn to_mass_concentration(self, value: f64, parameter: &Parameter) -> Result<f64, FeatureError> {
        match self {
            Self::Identity => Ok(value),
            Self::DivideBy(factor) => Ok(value / factor),
            Self::Unimplemented => Err(FeatureError::UnimplementedConversion {
                parameter: parameter.as_str().to_string(),
            }),
        }
    }
}

pub fn conversion_for(parameter: &Parameter) -> UnitConversion {
    match parameter {
        Parameter::Turbidity => UnitConversion::DivideBy(TURBIDITY_NTU_PER_MG_L),
        Parameter::TotalDissolvedSolids => UnitConversion::Unimplemented,
        Parameter::Toc | Parameter::Discharge | Parameter::Other(_) => UnitConversion::Identity,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoadRow {
    pub timestamp: LocalTimestamp,
    pub value: f64,
    pub discharge: Option<f64>,
    /// `None` when discharge is missing.
    pub load: Option<f64>,
}

pub fn derive_loads(
    series: &CanonicalSeries,
    parameter: &Parameter,
) -> Result<Vec<LoadRow>, FeatureError> {
    if let Some(found) = &series.parameter {
        if found != parameter {
            return Err(FeatureError::ParameterMismatch {
                expected: parameter.as_str().to_string(),
                found: found.as_str().to_string(),
            });
        }
    }

    let conversion = conversion_for(parameter);
    // Fail on the reserved path even when there is nothing to convert.
    if conversion == UnitConversion::Unimplemented {
        return Err(FeatureError::UnimplementedConversion {
            parameter: parameter.as_str().to_string(),
        });
    }

    let mut out = Vec::with_capacity(series.len());
    let mut missing_discharge = 0_usize;
    for row in &series.rows {
        let load = match row.discharge {
            Some(discharge) => {
                Some(conversion.to_mass_concentration(row.value, parameter)? * discharge)
            }
            None => {
                missing_discharge += 1;
                None
            }
        };
        out.push(LoadRow {
            timestamp: row.timestamp,
            value: row.value,
            discharge: row.discharge,
            load,
        });
    }

    debug!(
        component = "load",
        event = "load.derived",
        parameter = parameter.as_str(),
        conversion = ?conversion,
        rows = out.len(),
        missing_discharge
    );

    Ok(out)
}
