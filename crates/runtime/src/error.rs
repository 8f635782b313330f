//! Errors surfaced by the runtime API.
use activation_core::{ActivationError, ConfigError, ErrorSeverity, FrameIndex};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, RuntimeError>;

#[derive(Clone, Debug, PartialEq, Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("item {0} is already tracked")]
    AlreadyTracked(String),

    #[error("item {0} is not tracked")]
    NotTracked(String),

    /// Tracker and activation set disagree about which items are in range.
    #[error("proximity and activation state diverged before frame {frame}")]
    Inconsistent { frame: FrameIndex },
}

impl ActivationError for RuntimeError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Config(err) => err.severity(),
            Self::AlreadyTracked(_) | Self::NotTracked(_) => ErrorSeverity::Validation,
            Self::Inconsistent { .. } => ErrorSeverity::Internal,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::Config(err) => err.error_code(),
            Self::AlreadyTracked(_) => "ALREADY_TRACKED",
            Self::NotTracked(_) => "NOT_TRACKED",
            Self::Inconsistent { .. } => "INCONSISTENT_STATE",
        }
    }
}
