//! Harness Error Types
//!
//! One error enum for every way a scenario can fail. Each variant maps to a
//! stable code used in the suite report.

use thiserror::Error;

use crate::equivalence::Mismatch;

/// Channel names used in [`HarnessError::Adapter`]
pub const INPUT_CHANNEL: &str = "input";
pub const OUTPUT_CHANNEL: &str = "output";

/// Scenario failure
///
/// Every variant is fatal to the scenario it occurred in and to nothing else.
#[derive(Error, Debug, Clone)]
pub enum HarnessError {
    /// Override targets an undocumented field, or carries the wrong kind of value.
    /// Raised before any engine call.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Subscribe/send failure on the reference channel pair
    #[error("Adapter error on {channel} channel: {reason}")]
    Adapter {
        channel: &'static str,
        reason: String,
    },

    /// Engine answered with an error payload instead of a result
    #[error("Engine reported error: {0}")]
    EngineReported(String),

    /// Normalized results differ
    #[error("Equivalence mismatch: {0}")]
    EquivalenceMismatch(Box<Mismatch>),

    /// Reference engine did not answer in time
    #[error("Reference engine did not answer within {after_ms} ms")]
    Timeout { after_ms: u64 },

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl HarnessError {
    /// Stable code for reports
    pub fn code(&self) -> &'static str {
        match self {
            HarnessError::Configuration(_) => "CONFIGURATION_ERROR",
            HarnessError::Adapter { .. } => "ADAPTER_ERROR",
            HarnessError::EngineReported(_) => "ENGINE_REPORTED_ERROR",
            HarnessError::EquivalenceMismatch(_) => "EQUIVALENCE_MISMATCH",
            HarnessError::Timeout { .. } => "TIMEOUT",
            HarnessError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }

    pub fn adapter(channel: &'static str, reason: impl Into<String>) -> Self {
        HarnessError::Adapter {
            channel,
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for HarnessError {
    fn from(e: serde_json::Error) -> Self {
        HarnessError::Serialization(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            HarnessError::Configuration("x".into()).code(),
            "CONFIGURATION_ERROR"
        );
        assert_eq!(
            HarnessError::adapter(INPUT_CHANNEL, "closed").code(),
            "ADAPTER_ERROR"
        );
        assert_eq!(HarnessError::Timeout { after_ms: 5 }.code(), "TIMEOUT");
    }

    #[test]
    fn test_adapter_error_names_channel() {
        let err = HarnessError::adapter(OUTPUT_CHANNEL, "engine gone");
        assert_eq!(
            err.to_string(),
            "Adapter error on output channel: engine gone"
        );
    }
}
