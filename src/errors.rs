//! Crate-wide structured error types.
//!
//! The teacher crate propagates most failures as `anyhow::Error` because its
//! callers only ever need to bubble them up. The two cores in this crate are
//! different: their callers (the surrounding build system) need to match on
//! a *closed* set of error codes, so we expose typed `thiserror` enums here
//! and reserve `anyhow` for the places that only ever propagate (branch
//! execution failures from the caller-supplied back-ends).

use serde::Serialize;

/// Errors produced while building or flattening a [`crate::nested_set::NestedSet`].
#[derive(Debug, thiserror::Error)]
pub enum NestedSetError {
    /// A transitive child was added to a [`crate::nested_set::Builder`] whose
    /// [`crate::order::Order`] does not match the builder's own order.
    #[error("cannot union nested sets with different orders")]
    OrderMismatch,
    /// `split_if_exceeds_max_degree` was called with `k < 2`.
    #[error("split_if_exceeds_max_degree requires k >= 2, got {0}")]
    MaxDegreeTooSmall(usize),
    /// `to_list_with_timeout` did not complete within the requested duration.
    #[error("nested set flatten timed out")]
    FlattenTimedOut,
}

/// The closed set of failure codes `DynamicSpawnStrategy::exec` can report,
/// grouped under the `DynamicExecution` category (spec.md §6-§7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FailureCode {
    /// The spawn declares a platform-specific requirement without the
    /// matching availability marker, and the option requires it.
    XcodeRelatedPrereqUnmet,
    /// Neither the local nor the remote back-end can execute this spawn.
    NoUsableStrategyFound,
}

/// A structured failure detail: a fixed category plus one of the codes in
/// [`FailureCode`]. Intentionally small and serializable so a caller can log
/// or report it without depending on this crate's internal error type.
#[derive(Debug, Clone, Serialize)]
pub struct FailureDetail {
    pub category: &'static str,
    pub code: FailureCode,
    pub message: String,
}

impl FailureDetail {
    pub fn new(code: FailureCode, message: impl Into<String>) -> Self {
        Self {
            category: "DynamicExecution",
            code,
            message: message.into(),
        }
    }
}

/// Errors produced by the dynamic spawn scheduler.
#[derive(Debug, thiserror::Error)]
pub enum DynamicExecError {
    /// Neither back-end can execute the spawn. A user-facing error.
    #[error("no usable dynamic execution strategy found for this spawn")]
    NoUsableStrategyFound(FailureDetail),

    /// The spawn requires availability info the platform doesn't provide. An
    /// environmental error, distinct from a user error.
    #[error("spawn violates an Xcode-related availability precondition")]
    XcodeRelatedPrereqUnmet(FailureDetail),

    /// The branch's underlying runner reported a failure. Propagated only
    /// after the peer branch has been cancelled and its done-semaphore
    /// acquired.
    #[error("spawn execution failed: {source}")]
    Execution {
        #[source]
        source: anyhow::Error,
    },

    /// This branch was asked to stop by the arbiter (it lost the race, or
    /// the top-level call was interrupted). Not a real failure -- callers
    /// convert this into the branch's cancelled sentinel. Spec.md §9 tracks
    /// the underlying already-cancelled race as b/173020239 and says not to
    /// diagnose it further than surfacing this and logging at debug level.
    #[error("branch execution was cancelled by the arbiter")]
    DynamicInterrupted,
}

/// Panics with a message describing a protocol invariant violation.
///
/// Used for the two "should never happen" assertions in spec.md §7/§9:
/// both branches returning a real result (b/173153395), both branches
/// returning cancelled, or `stop_branch` being invoked twice by the same
/// branch. These are programmer errors in the surrounding build system, not
/// recoverable conditions, so -- matching the teacher's own use of
/// `bail!`/`assert_eq!` in `runner.rs` for "the plan shape is impossible"
/// checks -- we crash with a descriptive message rather than returning a
/// `Result` a caller might be tempted to swallow.
pub fn protocol_violation(message: impl AsRef<str>) -> ! {
    panic!("dynamic spawn protocol violation: {}", message.as_ref());
}
