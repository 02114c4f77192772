//! Error types for key-value store operations.

use snafu::Snafu;

/// Errors returned by [`KeyValueStore`](crate::KeyValueStore) implementations.
#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
#[snafu(visibility(pub))]
pub enum KeyValueStoreError {
    /// No endpoint of the store could be reached.
    #[snafu(display("store unavailable: {reason}"))]
    Unavailable {
        /// Description of the connection failure.
        reason: String,
    },

    /// The store answered, but the operation failed.
    #[snafu(display("operation failed: {reason}"))]
    Failed {
        /// Description of the failure.
        reason: String,
    },

    /// The store answered with something that could not be understood.
    #[snafu(display("invalid store response: {reason}"))]
    InvalidResponse {
        /// Description of what was wrong with the response.
        reason: String,
    },

    /// The operation did not complete within its deadline.
    #[snafu(display("operation timed out after {duration_ms}ms"))]
    Timeout {
        /// Deadline that was exceeded, in milliseconds.
        duration_ms: u64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unavailable_display() {
        let err = KeyValueStoreError::Unavailable {
            reason: "connection refused".to_string(),
        };
        assert_eq!(err.to_string(), "store unavailable: connection refused");
    }

    #[test]
    fn timeout_display() {
        let err = KeyValueStoreError::Timeout { duration_ms: 2000 };
        assert_eq!(err.to_string(), "operation timed out after 2000ms");
    }

    #[test]
    fn invalid_response_display() {
        let err = KeyValueStoreError::InvalidResponse {
            reason: "missing header".to_string(),
        };
        assert_eq!(err.to_string(), "invalid store response: missing header");
    }
}
