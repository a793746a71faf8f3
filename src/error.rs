//! Error types for the rico autoscaler
//!
//! Provides structured error types for configuration validation, topology
//! verification, and provider failures, along with the retry classification
//! the reconciler relies on.

use thiserror::Error;

// =============================================================================
// Provider Identity
// =============================================================================

/// Which provider surfaced an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Cloud,
    Storage,
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderKind::Cloud => write!(f, "cloud"),
            ProviderKind::Storage => write!(f, "storage"),
        }
    }
}

// =============================================================================
// Error Type
// =============================================================================

/// Unified error type for the autoscaler
#[derive(Error, Debug)]
pub enum Error {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    #[error("Invalid class {class}: {reason}")]
    ConfigInvalid { class: String, reason: String },

    #[error("Class not found: {name}")]
    ClassNotFound { name: String },

    // =========================================================================
    // Topology Errors
    // =========================================================================
    #[error("Invalid topology: {0}")]
    TopologyInvalid(String),

    // =========================================================================
    // Provider Errors
    // =========================================================================
    #[error("Transient {provider} provider error in {operation}: {reason}")]
    ProviderTransient {
        provider: ProviderKind,
        operation: String,
        reason: String,
    },

    #[error("Permanent {provider} provider error in {operation}: {reason}")]
    ProviderPermanent {
        provider: ProviderKind,
        operation: String,
        reason: String,
    },

    // =========================================================================
    // Driver Errors
    // =========================================================================
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Action to take after a failed reconcile pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorAction {
    /// The next reconcile re-observes the topology and decides afresh
    RetryNextPass,
    /// Operator intervention required; retrying will not help
    NoRetry,
}

impl Error {
    pub fn transient(
        provider: ProviderKind,
        operation: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::ProviderTransient {
            provider,
            operation: operation.into(),
            reason: reason.into(),
        }
    }

    pub fn permanent(
        provider: ProviderKind,
        operation: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::ProviderPermanent {
            provider,
            operation: operation.into(),
            reason: reason.into(),
        }
    }

    pub fn config_invalid(class: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ConfigInvalid {
            class: class.into(),
            reason: reason.into(),
        }
    }

    /// Determine what action to take for this error
    pub fn action(&self) -> ErrorAction {
        match self {
            // A fresh snapshot may look different on the next pass
            Error::ProviderTransient { .. } | Error::TopologyInvalid(_) => {
                ErrorAction::RetryNextPass
            }

            // Configuration and permanent provider failures need an operator
            Error::ConfigInvalid { .. }
            | Error::ClassNotFound { .. }
            | Error::ProviderPermanent { .. }
            | Error::InvalidArgument(_) => ErrorAction::NoRetry,

            Error::Internal(_) | Error::Io(_) | Error::Json(_) => ErrorAction::NoRetry,
        }
    }

    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(self.action(), ErrorAction::RetryNextPass)
    }

    /// Check if this error is a transient provider failure
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::ProviderTransient { .. })
    }
}

/// Result type alias for the autoscaler
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_actions() {
        let err = Error::transient(ProviderKind::Cloud, "device_create", "rate limited");
        assert_eq!(err.action(), ErrorAction::RetryNextPass);
        assert!(err.is_retryable());
        assert!(err.is_transient());

        let err = Error::permanent(ProviderKind::Storage, "device_add", "unsupported");
        assert_eq!(err.action(), ErrorAction::NoRetry);
        assert!(!err.is_retryable());
        assert!(!err.is_transient());

        let err = Error::config_invalid("gp2", "low watermark above high");
        assert_eq!(err.action(), ErrorAction::NoRetry);
    }

    #[test]
    fn test_topology_invalid_retries() {
        // An empty cluster may gain nodes before the next pass
        let err = Error::TopologyInvalid("no storage nodes in cluster".into());
        assert_eq!(err.action(), ErrorAction::RetryNextPass);
        assert!(!err.is_transient());
    }

    #[test]
    fn test_provider_kind_display() {
        assert_eq!(format!("{}", ProviderKind::Cloud), "cloud");
        assert_eq!(format!("{}", ProviderKind::Storage), "storage");
    }
}
