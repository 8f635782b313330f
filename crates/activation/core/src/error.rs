//! Common error infrastructure for activation-core.
//!
//! The heap, tracker and activation set never fail: their contracts are debug
//! assertions and "not found" is reported through `bool`/`Option`. Errors only
//! arise at the edges, when tuning values are supplied from configuration.

/// Severity level of an error, used for routing and log priority.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ErrorSeverity {
    /// Invalid input that should be rejected and corrected by the caller.
    ///
    /// Examples: negative activation radius, unparsable environment value
    Validation,

    /// Unexpected internal inconsistency. Indicates a bug.
    Internal,
}

impl ErrorSeverity {
    /// Returns a human-readable description of this severity level.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::Internal => "internal",
        }
    }

    /// Returns true if this error indicates an internal bug.
    pub const fn is_internal(&self) -> bool {
        matches!(self, Self::Internal)
    }
}

/// Common trait for all activation errors.
///
/// - Use `#[derive(thiserror::Error)]` for the Display/Error impl
/// - Classify severity by who has to fix it, not by impact
pub trait ActivationError: core::fmt::Display + core::fmt::Debug {
    /// Returns the severity level of this error.
    fn severity(&self) -> ErrorSeverity;

    /// Returns a static string identifier for this error variant.
    fn error_code(&self) -> &'static str {
        core::any::type_name::<Self>()
    }
}

/// Rejected tuning value.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("activation radius must be finite and non-negative, got {0}")]
    InvalidActivationRadius(f32),

    #[error("rebase threshold must be finite and positive, got {0}")]
    InvalidRebaseThreshold(f32),

    #[error("invalid value {value:?} for {key}")]
    InvalidEnv { key: &'static str, value: String },
}

impl ActivationError for ConfigError {
    fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Validation
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidActivationRadius(_) => "INVALID_ACTIVATION_RADIUS",
            Self::InvalidRebaseThreshold(_) => "INVALID_REBASE_THRESHOLD",
            Self::InvalidEnv { .. } => "INVALID_ENV",
        }
    }
}
