//! Error taxonomy for probing and waiting on remote resources

use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// Boxed source error from the remote API layer.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// A failed attempt to read a remote resource's status.
///
/// Not-found is not an error at this layer; probers report it as
/// [`crate::waiter::Probe::NotFound`] so the waiter can apply the
/// direction-dependent policy.
#[derive(Debug, Error)]
pub enum ProbeError {
    /// Retry-eligible failure (throttling, network blip, server-side 5xx).
    #[error("transient error probing remote status: {0}")]
    Transient(#[source] BoxError),

    /// Non-retryable failure. Propagated immediately.
    #[error("failed to probe remote status: {0}")]
    Fatal(#[source] BoxError),
}

impl ProbeError {
    pub fn transient(source: impl Into<BoxError>) -> Self {
        Self::Transient(source.into())
    }

    pub fn fatal(source: impl Into<BoxError>) -> Self {
        Self::Fatal(source.into())
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

/// A wait that did not resolve to its target condition.
///
/// `Timeout` is distinct from `Failure` so callers can tell "still working,
/// ran out of patience" from "broke".
#[derive(Debug, Error)]
pub enum WaitError<S: fmt::Debug> {
    /// The resource was never observed within the configured not-found
    /// tolerance (create-direction waits).
    #[error("resource not found after {checks} consecutive probe(s)")]
    NotFound { checks: u32 },

    /// The resource reached a terminal state in the failure set.
    #[error("resource reached failure state {status:?}")]
    Failure { status: S },

    /// The prober returned a status outside the pending, target, and
    /// failure sets. Failing fast beats polling a state we cannot interpret.
    #[error("resource reported unclassified status {status:?}")]
    Unclassified { status: S },

    /// The deadline elapsed while the resource was still pending.
    #[error("timed out after {waited:?} waiting for target state (last observed: {last:?})")]
    Timeout { waited: Duration, last: Option<S> },

    /// A fatal probe error ended the wait.
    #[error(transparent)]
    Probe(#[from] ProbeError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_display_includes_last_status() {
        let err: WaitError<&str> = WaitError::Timeout {
            waited: Duration::from_secs(30),
            last: Some("PROVISIONING"),
        };
        let msg = err.to_string();
        assert!(msg.contains("timed out"));
        assert!(msg.contains("PROVISIONING"));
    }

    #[test]
    fn probe_error_classification() {
        let transient = ProbeError::transient("throttled");
        assert!(transient.is_transient());
        let fatal = ProbeError::fatal("access denied");
        assert!(!fatal.is_transient());
    }
}
