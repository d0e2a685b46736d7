//! Error types for the motion fusion engine.
//!
//! Bad samples are never errors here. They are dropped at the sample level
//! and counted; only capability and configuration problems surface as `Err`.

/// Common result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the distance tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TrackerError {
    /// The platform has no usable location capability.
    #[error("location tracking is not supported on this device")]
    Unsupported,
}

/// Rejected estimator configuration.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    /// A parameter is outside its meaningful range.
    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter {
        /// Config field name.
        name: &'static str,
        /// Why the value was rejected.
        reason: String,
    },
}

impl ConfigError {
    pub(crate) fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}

/// Unified error type for engine operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    /// Location tracker error
    #[error("tracker error: {0}")]
    Tracker(#[from] TrackerError),

    /// Invalid configuration
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Reject non-finite or non-positive values.
pub(crate) fn ensure_positive(name: &'static str, value: f64) -> std::result::Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::invalid(name, format!("must be finite and > 0, got {value}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            TrackerError::Unsupported.to_string(),
            "location tracking is not supported on this device"
        );
        let err = ConfigError::invalid("step_length_m", "must be > 0");
        assert_eq!(err.to_string(), "invalid parameter `step_length_m`: must be > 0");
    }

    #[test]
    fn test_error_conversion() {
        let err: Error = TrackerError::Unsupported.into();
        assert!(matches!(err, Error::Tracker(TrackerError::Unsupported)));
    }

    #[test]
    fn test_ensure_positive() {
        assert!(ensure_positive("q", 0.5).is_ok());
        assert!(ensure_positive("q", 0.0).is_err());
        assert!(ensure_positive("q", f64::NAN).is_err());
    }
}
