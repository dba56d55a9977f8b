//! Waiter - Poll a remote resource's status until a target condition holds
//!
//! After a mutating control-plane call, the resource transitions
//! asynchronously. A waiter drives repeated status probes until the resource
//! reaches a target state, an unrecoverable state, or the timeout elapses.
//! Each wait occupies one logical task and holds no shared mutable state;
//! independent waits compose by running one waiter per resource.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::time::{Duration, Instant};

use tracing::{debug, trace};

use crate::backoff::BackoffPolicy;
use crate::error::{ProbeError, WaitError};

/// Return type for async trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Outcome of a single status read.
#[derive(Debug, Clone, PartialEq)]
pub enum Probe<S> {
    /// The resource exists and reported a status.
    Status(S),
    /// The resource does not exist. Distinct from a read error.
    NotFound,
}

/// A single read call against the remote system, mapped to a normalized
/// status value.
///
/// Implementations must distinguish three outcomes: the object exists with a
/// known status, the object does not exist, and the read itself failed
/// (transient or fatal, see [`ProbeError`]).
pub trait StatusProber: Send + Sync {
    type Status: Clone + PartialEq + fmt::Debug + Send + Sync;

    fn probe(&self) -> BoxFuture<'_, Result<Probe<Self::Status>, ProbeError>>;
}

/// How a waiter interprets a not-found read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotFoundPolicy {
    /// Not-found ends the wait with [`WaitError::NotFound`] immediately.
    Fail,
    /// Tolerate up to this many consecutive not-found reads as pending,
    /// then error. Create direction: the read side may briefly lag the
    /// mutation that was just issued.
    PendingGrace(u32),
    /// This many consecutive not-found reads mean the resource is gone.
    /// Delete direction; a found read resets the count so a single stale
    /// negative read is never mistaken for completion.
    SuccessAfter(u32),
}

/// Configuration for one wait: status classification sets, poll interval
/// policy, total timeout, consecutive-target requirement, and the
/// not-found policy.
///
/// Constructed fresh for each mutating operation and discarded after the
/// wait resolves.
#[derive(Debug, Clone)]
pub struct WaitSpec<S> {
    pending: Vec<S>,
    target: Vec<S>,
    failure: Vec<S>,
    timeout: Duration,
    interval: BackoffPolicy,
    consecutive_targets: u32,
    not_found: NotFoundPolicy,
}

impl<S: Clone + PartialEq + fmt::Debug> WaitSpec<S> {
    pub fn new(pending: Vec<S>, target: Vec<S>) -> Self {
        Self {
            pending,
            target,
            failure: Vec::new(),
            timeout: Duration::from_secs(600),
            interval: BackoffPolicy::fixed(Duration::from_secs(5)),
            consecutive_targets: 1,
            not_found: NotFoundPolicy::Fail,
        }
    }

    pub fn with_failure(mut self, failure: Vec<S>) -> Self {
        self.failure = failure;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_interval(mut self, interval: BackoffPolicy) -> Self {
        self.interval = interval;
        self
    }

    /// Minimum consecutive target observations before declaring success.
    pub fn with_consecutive_targets(mut self, count: u32) -> Self {
        self.consecutive_targets = count.max(1);
        self
    }

    pub fn with_not_found(mut self, policy: NotFoundPolicy) -> Self {
        self.not_found = policy;
        self
    }

    pub fn pending(&self) -> &[S] {
        &self.pending
    }

    pub fn target(&self) -> &[S] {
        &self.target
    }

    pub fn failure(&self) -> &[S] {
        &self.failure
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn consecutive_targets(&self) -> u32 {
        self.consecutive_targets
    }

    pub fn not_found(&self) -> NotFoundPolicy {
        self.not_found
    }
}

/// Successful resolution of a wait.
#[derive(Debug, Clone, PartialEq)]
pub enum Completion<S> {
    /// A target status was observed the required number of consecutive times.
    Reached(S),
    /// The resource disappeared and the not-found policy treats that as done.
    Gone,
}

/// Drive the prober until the spec's target condition holds, a failure
/// state is observed, the probe fails fatally, or the timeout elapses.
///
/// The deadline is checked before and after each probe call, so a wait never
/// outlives its budget by more than one in-flight call, and no poll calls
/// are performed after the deadline. Transient probe errors are retried and
/// bounded by the same overall timeout.
pub async fn wait_for<P: StatusProber>(
    spec: &WaitSpec<P::Status>,
    prober: &P,
) -> Result<Completion<P::Status>, WaitError<P::Status>> {
    let started = Instant::now();
    let deadline = started + spec.timeout;
    let required = spec.consecutive_targets.max(1);
    let mut target_streak: u32 = 0;
    let mut not_found_streak: u32 = 0;
    let mut attempt: u32 = 0;
    let mut last: Option<P::Status> = None;

    loop {
        if Instant::now() >= deadline {
            return Err(WaitError::Timeout {
                waited: started.elapsed(),
                last,
            });
        }

        match prober.probe().await {
            Ok(Probe::Status(status)) => {
                not_found_streak = 0;
                last = Some(status.clone());
                if spec.failure.contains(&status) {
                    return Err(WaitError::Failure { status });
                }
                if spec.target.contains(&status) {
                    target_streak += 1;
                    trace!(?status, target_streak, required, "target status observed");
                    if target_streak >= required {
                        return Ok(Completion::Reached(status));
                    }
                } else if spec.pending.contains(&status) {
                    target_streak = 0;
                    trace!(?status, "still pending");
                } else {
                    return Err(WaitError::Unclassified { status });
                }
            }
            Ok(Probe::NotFound) => {
                target_streak = 0;
                not_found_streak += 1;
                match spec.not_found {
                    NotFoundPolicy::Fail => {
                        return Err(WaitError::NotFound {
                            checks: not_found_streak,
                        });
                    }
                    NotFoundPolicy::PendingGrace(grace) => {
                        if not_found_streak > grace {
                            return Err(WaitError::NotFound {
                                checks: not_found_streak,
                            });
                        }
                        debug!(not_found_streak, grace, "resource not visible yet");
                    }
                    NotFoundPolicy::SuccessAfter(needed) => {
                        if not_found_streak >= needed.max(1) {
                            return Ok(Completion::Gone);
                        }
                        debug!(
                            not_found_streak,
                            needed, "awaiting consecutive not-found reads"
                        );
                    }
                }
            }
            Err(err) if err.is_transient() => {
                // Retried until the deadline, never counted as fatal.
                target_streak = 0;
                debug!(error = %err, "transient probe failure, retrying");
            }
            Err(err) => return Err(WaitError::from(err)),
        }

        if Instant::now() >= deadline {
            return Err(WaitError::Timeout {
                waited: started.elapsed(),
                last,
            });
        }

        let remaining = deadline.saturating_duration_since(Instant::now());
        let sleep_for = spec.interval.delay(attempt).min(remaining);
        attempt += 1;
        tokio::time::sleep(sleep_for).await;
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    /// Prober that replays a scripted sequence of probe results. Once the
    /// script is exhausted it keeps reporting a pending status.
    struct ScriptedProber {
        steps: Mutex<VecDeque<Result<Probe<&'static str>, ProbeError>>>,
        calls: AtomicU32,
    }

    impl ScriptedProber {
        fn new(steps: Vec<Result<Probe<&'static str>, ProbeError>>) -> Self {
            Self {
                steps: Mutex::new(steps.into()),
                calls: AtomicU32::new(0),
            }
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl StatusProber for ScriptedProber {
        type Status = &'static str;

        fn probe(&self) -> BoxFuture<'_, Result<Probe<&'static str>, ProbeError>> {
            Box::pin(async move {
                self.calls.fetch_add(1, Ordering::SeqCst);
                self.steps
                    .lock()
                    .unwrap()
                    .pop_front()
                    .unwrap_or(Ok(Probe::Status("PENDING")))
            })
        }
    }

    fn spec() -> WaitSpec<&'static str> {
        WaitSpec::new(vec!["PENDING"], vec!["READY"])
            .with_failure(vec!["FAILED"])
            .with_interval(BackoffPolicy::fixed(Duration::from_millis(1)))
            .with_timeout(Duration::from_secs(5))
    }

    #[tokio::test]
    async fn target_on_first_probe_resolves_after_one_call() {
        let prober = ScriptedProber::new(vec![Ok(Probe::Status("READY"))]);
        let outcome = wait_for(&spec(), &prober).await.unwrap();
        assert_eq!(outcome, Completion::Reached("READY"));
        assert_eq!(prober.calls(), 1);
    }

    #[tokio::test]
    async fn flapping_target_resets_consecutive_counter() {
        let prober = ScriptedProber::new(vec![
            Ok(Probe::Status("READY")),
            Ok(Probe::Status("PENDING")),
            Ok(Probe::Status("READY")),
            Ok(Probe::Status("READY")),
        ]);
        let outcome = wait_for(&spec().with_consecutive_targets(2), &prober)
            .await
            .unwrap();
        assert_eq!(outcome, Completion::Reached("READY"));
        assert_eq!(prober.calls(), 4);
    }

    #[tokio::test]
    async fn always_pending_times_out_and_stops_polling() {
        let prober = ScriptedProber::new(vec![]);
        let err = wait_for(
            &spec()
                .with_interval(BackoffPolicy::fixed(Duration::from_millis(2)))
                .with_timeout(Duration::from_millis(20)),
            &prober,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, WaitError::Timeout { .. }));

        let polled = prober.calls();
        assert!(polled >= 1);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(prober.calls(), polled);
    }

    #[tokio::test]
    async fn delete_wait_resolves_after_consecutive_not_found() {
        let prober = ScriptedProber::new(vec![Ok(Probe::NotFound), Ok(Probe::NotFound)]);
        let outcome = wait_for(
            &WaitSpec::new(vec!["DELETING"], vec![])
                .with_interval(BackoffPolicy::fixed(Duration::from_millis(1)))
                .with_not_found(NotFoundPolicy::SuccessAfter(2)),
            &prober,
        )
        .await
        .unwrap();
        assert_eq!(outcome, Completion::Gone);
        assert_eq!(prober.calls(), 2);
    }

    #[tokio::test]
    async fn found_read_resets_not_found_count() {
        let prober = ScriptedProber::new(vec![
            Ok(Probe::NotFound),
            Ok(Probe::Status("DELETING")),
            Ok(Probe::NotFound),
            Ok(Probe::NotFound),
        ]);
        let outcome = wait_for(
            &WaitSpec::new(vec!["DELETING"], vec![])
                .with_interval(BackoffPolicy::fixed(Duration::from_millis(1)))
                .with_not_found(NotFoundPolicy::SuccessAfter(2)),
            &prober,
        )
        .await
        .unwrap();
        assert_eq!(outcome, Completion::Gone);
        assert_eq!(prober.calls(), 4);
    }

    #[tokio::test]
    async fn fatal_probe_error_ends_wait_immediately() {
        let prober = ScriptedProber::new(vec![Err(ProbeError::fatal("access denied"))]);
        let err = wait_for(&spec(), &prober).await.unwrap_err();
        assert!(matches!(err, WaitError::Probe(ProbeError::Fatal(_))));
        assert_eq!(prober.calls(), 1);
    }

    #[tokio::test]
    async fn transient_probe_errors_are_retried() {
        let prober = ScriptedProber::new(vec![
            Err(ProbeError::transient("throttled")),
            Ok(Probe::Status("READY")),
        ]);
        let outcome = wait_for(&spec(), &prober).await.unwrap();
        assert_eq!(outcome, Completion::Reached("READY"));
        assert_eq!(prober.calls(), 2);
    }

    #[tokio::test]
    async fn failure_status_is_reported_with_the_observed_state() {
        let prober = ScriptedProber::new(vec![Ok(Probe::Status("FAILED"))]);
        let err = wait_for(&spec(), &prober).await.unwrap_err();
        match err {
            WaitError::Failure { status } => assert_eq!(status, "FAILED"),
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unclassified_status_fails_fast() {
        let prober = ScriptedProber::new(vec![Ok(Probe::Status("UNEXPECTED"))]);
        let err = wait_for(&spec(), &prober).await.unwrap_err();
        assert!(matches!(err, WaitError::Unclassified { status: "UNEXPECTED" }));
        assert_eq!(prober.calls(), 1);
    }

    #[tokio::test]
    async fn create_grace_tolerates_bounded_not_found() {
        let prober = ScriptedProber::new(vec![Ok(Probe::NotFound), Ok(Probe::Status("READY"))]);
        let outcome = wait_for(
            &spec().with_not_found(NotFoundPolicy::PendingGrace(2)),
            &prober,
        )
        .await
        .unwrap();
        assert_eq!(outcome, Completion::Reached("READY"));
    }

    #[tokio::test]
    async fn create_grace_exhaustion_is_an_error() {
        let prober = ScriptedProber::new(vec![
            Ok(Probe::NotFound),
            Ok(Probe::NotFound),
            Ok(Probe::NotFound),
        ]);
        let err = wait_for(
            &spec().with_not_found(NotFoundPolicy::PendingGrace(2)),
            &prober,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, WaitError::NotFound { checks: 3 }));
    }

    #[tokio::test]
    async fn immediate_not_found_fails_by_default() {
        let prober = ScriptedProber::new(vec![Ok(Probe::NotFound)]);
        let err = wait_for(&spec(), &prober).await.unwrap_err();
        assert!(matches!(err, WaitError::NotFound { checks: 1 }));
        assert_eq!(prober.calls(), 1);
    }
}
