//! Vallum Core
//!
//! Core library for managing asynchronous cloud resources: completion
//! waiters that poll a remote status until a target condition holds, and
//! set reconciliation for attach/detach style collections.

pub mod arn;
pub mod backoff;
pub mod error;
pub mod reconcile;
pub mod waiter;

pub use arn::Arn;
pub use backoff::BackoffPolicy;
pub use error::{ProbeError, WaitError};
pub use reconcile::{Delta, reconcile};
pub use waiter::{BoxFuture, Completion, NotFoundPolicy, Probe, StatusProber, WaitSpec, wait_for};
