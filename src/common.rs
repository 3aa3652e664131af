//! Common types and constants used throughout the project.

use arrow::datatypes::DataType;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

// ============================================================================
// Column Names
// ============================================================================

/// Default name of the part identifier column.
pub const ID_COLUMN: &str = "uuid";

/// Default name of the column holding the JSON-serialized hole list.
pub const HOLES_COLUMN: &str = "holes";

/// Output column: some hole is deeper than [`WARN_FACTOR`] times its radius.
pub const WARNING_COLUMN: &str = "has_unreachable_hole_warning";

/// Output column: some hole is deeper than [`ERROR_FACTOR`] times its radius.
///
/// The spelling is part of the output format consumed downstream. Do not fix it
/// without migrating the readers.
pub const ERROR_COLUMN: &str = "has_unreacheable_hole_error";

// ============================================================================
// Thresholds
// ============================================================================

/// Length-to-radius multiplier above which a hole raises a warning.
pub const WARN_FACTOR: f64 = 2.0 * 10.0;

/// Length-to-radius multiplier above which a hole raises an error.
pub const ERROR_FACTOR: f64 = 2.0 * 40.0;

/// The pair of multipliers applied to a hole's radius to get its length limits.
///
/// `error_factor > warn_factor` always holds for a constructed value, which is
/// what makes an error-level hole also a warning-level hole.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    warn_factor: f64,
    error_factor: f64,
}

impl Thresholds {
    pub fn new(warn_factor: f64, error_factor: f64) -> Result<Self, ValidatorError> {
        // Written so that NaN factors are rejected too.
        if !(error_factor > warn_factor) {
            return Err(ValidatorError::InvalidThresholds {
                warn: warn_factor,
                error: error_factor,
            });
        }
        Ok(Self {
            warn_factor,
            error_factor,
        })
    }

    pub fn warn_factor(&self) -> f64 {
        self.warn_factor
    }

    pub fn error_factor(&self) -> f64 {
        self.error_factor
    }
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            warn_factor: WARN_FACTOR,
            error_factor: ERROR_FACTOR,
        }
    }
}

// ============================================================================
// Holes
// ============================================================================

/// One drilled hole, as described inside a record's `holes` payload.
///
/// Decoding never fails: a missing or non-numeric `length`/`radius` reads as
/// `0.0`, and so does every field of an element that is not a JSON object.
/// See [`crate::payload`] for the conversion.
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize)]
#[serde(from = "Value")]
pub struct HoleDescriptor {
    pub length: f64,
    pub radius: f64,
}

/// The two diagnostic flags derived for one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HoleFlags {
    pub warning: bool,
    pub error: bool,
}

// ============================================================================
// Configuration
// ============================================================================

#[derive(Debug, Clone)]
pub struct ValidatorConfig {
    /// Name of the identifier column. Only used in diagnostics.
    pub id_column: String,
    /// Name of the column holding the JSON hole list.
    pub holes_column: String,
    /// Length limits applied to every hole.
    pub thresholds: Thresholds,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            id_column: ID_COLUMN.to_string(),
            holes_column: HOLES_COLUMN.to_string(),
            thresholds: Thresholds::default(),
        }
    }
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug, Error)]
pub enum ValidatorError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("required column '{name}' not found in input")]
    MissingColumn { name: String },

    #[error("column '{name}' has unsupported type {data_type}")]
    UnsupportedColumnType { name: String, data_type: DataType },

    #[error("error factor ({error}) must be greater than warning factor ({warn})")]
    InvalidThresholds { warn: f64, error: f64 },
}
