//! Shared deadline for the store calls of one lookup.

use std::future::Future;
use std::time::Duration;

use kvdns_core::KeyValueStoreError;
use tokio::time::Instant;

use crate::error::ResolveResult;

/// Absolute deadline derived from the configured lookup timeout.
///
/// The main read and every defaults read of a lookup share one deadline, so
/// the whole lookup is bounded by a single timeout.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Deadline {
    at: Instant,
    timeout: Duration,
}

impl Deadline {
    pub(crate) fn after(timeout: Duration) -> Self {
        Self {
            at: Instant::now() + timeout,
            timeout,
        }
    }

    /// Run a store call, failing with a timeout once the deadline passes.
    pub(crate) async fn run<T, F>(&self, call: F) -> ResolveResult<T>
    where F: Future<Output = Result<T, KeyValueStoreError>> {
        match tokio::time::timeout_at(self.at, call).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(KeyValueStoreError::Timeout {
                duration_ms: self.timeout.as_millis() as u64,
            }
            .into()),
        }
    }
}
