//! Error types shared across the engine.
//!
//! # Responsibilities
//! - `ProbeError`: failures that stop a scan or a candidate
//! - `TransportError`: failures of a single network attempt; these stay
//!   local to one query and never abort the run

use thiserror::Error;

/// Engine-level failures.
#[derive(Debug, Error)]
pub enum ProbeError {
    /// The OS secure RNG refused to produce bytes. Never downgraded to a
    /// weaker source; the scan shuts down instead.
    #[error("secure entropy source unavailable: {0}")]
    EntropyUnavailable(#[from] rand::Error),

    #[error("configuration error: {0}")]
    Config(String),

    /// Shutdown was triggered while waiting on a shared resource.
    #[error("operation cancelled by shutdown")]
    Cancelled,
}

/// Failures of a single transport attempt.
#[derive(Debug, Error)]
pub enum TransportError {
    /// No pooled connection became free within the acquire timeout.
    #[error("connection pool exhausted after waiting {waited_ms}ms")]
    PoolExhausted { waited_ms: u64 },

    /// The pool has been closed; no further requests are possible.
    #[error("connection pool closed")]
    Closed,

    #[error("connection failed: {0}")]
    Connect(#[from] reqwest::Error),

    #[error("request timed out")]
    Timeout,

    /// The service answered but the body did not match its wire format.
    #[error("malformed response: {0}")]
    Malformed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_exhausted_names_the_wait() {
        let err = TransportError::PoolExhausted { waited_ms: 5_000 };
        assert!(err.to_string().contains("5000ms"));
    }

    #[test]
    fn cancelled_display_is_stable() {
        assert_eq!(
            ProbeError::Cancelled.to_string(),
            "operation cancelled by shutdown"
        );
    }
}
