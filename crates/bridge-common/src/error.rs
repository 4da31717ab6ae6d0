//! Error handling for the NVMe bridge

use std::io;
use thiserror::Error;

/// Result type for bridge operations
pub type Result<T> = std::result::Result<T, BridgeError>;

/// Main error type for the bridge.
///
/// The client-facing variants carry their message verbatim: callers match on
/// the exact text, so no prefix is added when they are displayed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BridgeError {
    /// Malformed identity, bad request fields or a backend refusing a mutation
    #[error("{0}")]
    InvalidArgument(String),

    /// Missing local resource, parent or pagination token
    #[error("{0}")]
    NotFound(String),

    /// Duplicate NQN
    #[error("{0}")]
    AlreadyExists(String),

    /// Operation deliberately not provided
    #[error("{0}")]
    Unimplemented(String),

    /// Backend transport or decoding failure, prefixed with the method name
    #[error("{0}")]
    Unknown(String),

    /// The request was cancelled before it completed
    #[error("{0}")]
    Cancelled(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// I/O related errors
    #[error("I/O error: {0}")]
    IoError(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Internal errors that should not normally occur
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl BridgeError {
    /// Lookup miss for a named resource, parent or key
    pub fn not_found(key: impl std::fmt::Display) -> Self {
        BridgeError::NotFound(format!("unable to find key {}", key))
    }

    /// Request aborted by its cancellation token
    pub fn cancelled() -> Self {
        BridgeError::Cancelled("request cancelled".to_string())
    }
}

impl From<io::Error> for BridgeError {
    fn from(err: io::Error) -> Self {
        BridgeError::IoError(err.to_string())
    }
}

impl From<serde_json::Error> for BridgeError {
    fn from(err: serde_json::Error) -> Self {
        BridgeError::SerializationError(format!("JSON error: {}", err))
    }
}

impl From<uuid::Error> for BridgeError {
    fn from(err: uuid::Error) -> Self {
        BridgeError::InvalidArgument(format!("UUID error: {}", err))
    }
}

/// Convert BridgeError to gRPC Status for network transmission
impl From<BridgeError> for tonic::Status {
    fn from(err: BridgeError) -> Self {
        use tonic::Code;

        let code = match err {
            BridgeError::InvalidArgument(_) => Code::InvalidArgument,
            BridgeError::NotFound(_) => Code::NotFound,
            BridgeError::AlreadyExists(_) => Code::AlreadyExists,
            BridgeError::Unimplemented(_) => Code::Unimplemented,
            BridgeError::Cancelled(_) => Code::Cancelled,
            BridgeError::ConfigError(_) | BridgeError::InternalError(_) => Code::Internal,
            BridgeError::Unknown(_)
            | BridgeError::IoError(_)
            | BridgeError::SerializationError(_) => Code::Unknown,
        };
        tonic::Status::new(code, err.to_string())
    }
}

/// Macro for creating bridge errors with a formatted message
#[macro_export]
macro_rules! bridge_error {
    ($kind:ident, $($arg:tt)*) => {
        $crate::error::BridgeError::$kind(format!($($arg)*))
    };
}

/// Macro for returning early with a formatted error
#[macro_export]
macro_rules! bail {
    ($kind:ident, $($arg:tt)*) => {
        return Err($crate::bridge_error!($kind, $($arg)*))
    };
}

/// Macro for ensuring a condition or returning an error
#[macro_export]
macro_rules! ensure {
    ($cond:expr, $kind:ident, $($arg:tt)*) => {
        if !($cond) {
            $crate::bail!($kind, $($arg)*);
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use tonic::Code;

    #[test]
    fn test_status_mapping_keeps_message() {
        let status: tonic::Status =
            BridgeError::InvalidArgument("Could not delete NQN: nqn.2022-09.io.spdk:opi3".into()).into();
        assert_eq!(status.code(), Code::InvalidArgument);
        assert_eq!(status.message(), "Could not delete NQN: nqn.2022-09.io.spdk:opi3");

        let status: tonic::Status = BridgeError::not_found("subsystems/s1").into();
        assert_eq!(status.code(), Code::NotFound);
        assert_eq!(status.message(), "unable to find key subsystems/s1");

        let status: tonic::Status = BridgeError::Unknown("get_version: EOF".into()).into();
        assert_eq!(status.code(), Code::Unknown);

        let status: tonic::Status = BridgeError::cancelled().into();
        assert_eq!(status.code(), Code::Cancelled);
    }

    #[test]
    fn test_ensure_macro() {
        fn check(value: i32) -> Result<()> {
            ensure!(value >= 0, InvalidArgument, "negative value {}", value);
            Ok(())
        }

        assert!(check(1).is_ok());
        assert_eq!(
            check(-1),
            Err(BridgeError::InvalidArgument("negative value -1".into()))
        );
    }
}
