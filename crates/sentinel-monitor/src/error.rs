//! Error types for the bias detector and diversity analyzer.
//!
//! Analysis itself never fails: insufficient data yields a degenerate
//! analysis or no report. The only error path is construction with an
//! invalid configuration.

use thiserror::Error;

/// Result type alias for monitor operations.
pub type Result<T> = std::result::Result<T, MonitorError>;

/// Errors that can occur when building a detector or analyzer.
#[derive(Debug, Error)]
pub enum MonitorError {
    /// A configuration value is missing or out of its valid range.
    #[error("invalid configuration for {field}: {reason}")]
    InvalidConfig {
        /// Name of the offending field.
        field: &'static str,
        /// Why the value was rejected.
        reason: String,
    },
}

impl MonitorError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field,
            reason: reason.into(),
        }
    }
}

/// Checks that `value` is finite and inside `[min, max]`.
pub(crate) fn check_range(field: &'static str, value: f64, min: f64, max: f64) -> Result<()> {
    if !value.is_finite() {
        return Err(MonitorError::invalid(field, format!("{value} is not finite")));
    }
    if value < min || value > max {
        return Err(MonitorError::invalid(
            field,
            format!("{value} is outside [{min}, {max}]"),
        ));
    }
    Ok(())
}

/// Checks that `value` is finite and non-negative.
pub(crate) fn check_non_negative(field: &'static str, value: f64) -> Result<()> {
    check_range(field, value, 0.0, f64::MAX)
}
