//! Error types for the cache client.

use crate::registry::Role;
use std::fmt;

/// Result type for cache operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the cache client.
///
/// Connection failures and command failures are kept apart so callers can tell
/// an unreachable backend from a bad request against a reachable one.
#[derive(Debug, Clone)]
pub enum Error {
    /// The backend actively refused the connection attempt.
    ///
    /// The reconnection policy logs these separately from other connect
    /// failures since they usually mean nothing is listening on the endpoint.
    ConnectionRefused(String),

    /// The backend could not be reached or never became ready.
    ///
    /// Common causes:
    /// - DNS or routing failure
    /// - Connect timeout elapsed
    /// - Authentication rejected during the handshake
    /// - `PING` not answered after connecting
    ConnectionError(String),

    /// Connecting kept failing until the reconnection limits were reached.
    ///
    /// **Recovery:** check backend availability; the next `acquire` starts a
    /// fresh round of attempts.
    RetryExhausted {
        /// Role the connection was being opened for
        role: Role,
        /// Number of attempts made, including the first
        attempts: u32,
        /// Message of the last connect failure
        last_error: String,
    },

    /// A command failed on an established connection.
    ///
    /// Carries the command name and key for context.
    OperationError(String),

    /// A typed payload could not be converted to a cacheable value.
    SerializationError(String),

    /// A cached value did not match the requested type.
    ///
    /// Raw reads never produce this; they fall back to the stored string.
    DeserializationError(String),

    /// Configuration error while reading the environment.
    ConfigError(String),

    /// Generic error with custom message.
    Other(String),
}

impl Error {
    /// Whether this error came from establishing a connection rather than
    /// from a command on an open one.
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Error::ConnectionRefused(_) | Error::ConnectionError(_) | Error::RetryExhausted { .. }
        )
    }

    /// Whether the backend refused the connection outright.
    pub fn is_connection_refused(&self) -> bool {
        matches!(self, Error::ConnectionRefused(_))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::ConnectionRefused(msg) => write!(f, "Connection refused: {}", msg),
            Error::ConnectionError(msg) => write!(f, "Connection error: {}", msg),
            Error::RetryExhausted {
                role,
                attempts,
                last_error,
            } => write!(
                f,
                "Gave up connecting {} after {} attempts: {}",
                role, attempts, last_error
            ),
            Error::OperationError(msg) => write!(f, "Operation error: {}", msg),
            Error::SerializationError(msg) => write!(f, "Serialization error: {}", msg),
            Error::DeserializationError(msg) => write!(f, "Deserialization error: {}", msg),
            Error::ConfigError(msg) => write!(f, "Config error: {}", msg),
            Error::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

// ============================================================================
// Conversions from other error types
// ============================================================================

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        if e.is_io() {
            Error::OperationError(e.to_string())
        } else if e.is_syntax() || e.is_data() || e.is_eof() {
            Error::DeserializationError(e.to_string())
        } else {
            Error::SerializationError(e.to_string())
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        if e.kind() == std::io::ErrorKind::ConnectionRefused {
            Error::ConnectionRefused(e.to_string())
        } else {
            Error::ConnectionError(e.to_string())
        }
    }
}

impl From<String> for Error {
    fn from(e: String) -> Self {
        Error::Other(e)
    }
}

impl From<&str> for Error {
    fn from(e: &str) -> Self {
        Error::Other(e.to_string())
    }
}

#[cfg(feature = "redis")]
impl From<redis::RedisError> for Error {
    fn from(e: redis::RedisError) -> Self {
        if e.is_connection_refusal() {
            Error::ConnectionRefused(format!("Redis error: {}", e))
        } else if e.is_io_error() || e.is_connection_dropped() || e.is_timeout() {
            Error::ConnectionError(format!("Redis error: {}", e))
        } else {
            Error::OperationError(format!("Redis error: {}", e))
        }
    }
}
