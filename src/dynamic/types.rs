//! The trait boundaries a caller implements to plug its real local and
//! remote back-ends into [`super::strategy::DynamicSpawnStrategy`].
//!
//! None of these traits know anything about process execution, sandboxing,
//! or RPC -- that's deliberately out of scope here (see `SPEC_FULL.md`'s
//! non-goals). They exist only to give the scheduler something concrete to
//! race and cancel.

use crate::interrupt::Interrupt;

/// One unit of work the scheduler can race across back-ends.
///
/// Implemented by the caller's own action/spawn representation.
pub trait Spawn: Send + Sync + 'static {
    /// A short, stable label (e.g. the action mnemonic) used in logs and
    /// error messages.
    fn mnemonic(&self) -> &str;

    /// Whether this spawn's correctness depends on platform availability
    /// info the dynamic scheduler may not have (the Xcode-availability
    /// precondition from `SPEC_FULL.md` §6).
    fn requires_xcode_availability_info(&self) -> bool {
        false
    }
}

/// Everything a [`SandboxedStrategy`] needs from the surrounding execution
/// environment to actually run a spawn: where to read inputs, where to
/// write outputs, and a cooperative interrupt to poll.
pub trait ActionExecutionContext: Send + Sync {
    /// The interrupt this branch should poll while executing. Real
    /// back-ends are expected to check this periodically (or pass it
    /// through to whatever process/RPC client they shell out to) so that
    /// losing a race actually stops doing work rather than just being
    /// ignored.
    fn interrupt(&self) -> &Interrupt;

    /// Reports a one-time informational event to whatever the surrounding
    /// build system uses for user-facing progress output (spec.md §4.6 step
    /// 5's "skip first build" notice). A no-op by default -- most contexts
    /// used in tests have nothing to report to.
    fn post_info_event(&self, _message: &str) {}
}

/// A runnable back-end for one [`DynamicMode`]: local sandboxed execution,
/// or a remote execution client.
pub trait SandboxedStrategy: Send + Sync + 'static {
    /// A short name used in logs (`"local"`, `"remote-cache"`, ...).
    fn name(&self) -> &'static str;

    /// Runs `spawn` to completion or returns an error. Expected to check
    /// `ctx.interrupt()` at reasonable points and return promptly once it
    /// fires -- the scheduler has no way to force a thread to stop.
    fn exec(&self, spawn: &dyn Spawn, ctx: &dyn ActionExecutionContext) -> anyhow::Result<()>;
}

/// Resolves which [`SandboxedStrategy`] (if any) should run a given spawn
/// for a given [`DynamicMode`].
///
/// A spawn for which neither mode resolves a strategy cannot be executed
/// dynamically at all; see [`crate::errors::DynamicExecError::NoUsableStrategyFound`].
pub trait DynamicStrategyRegistry: Send + Sync {
    fn strategy_for(
        &self,
        mode: DynamicMode,
        spawn: &dyn Spawn,
    ) -> Option<std::sync::Arc<dyn SandboxedStrategy>>;
}

/// Which side of a race a [`super::branch::Branch`] is running.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DynamicMode {
    Local,
    Remote,
}

impl DynamicMode {
    /// The other mode. `Local.other() == Remote` and vice versa.
    pub const fn other(self) -> Self {
        match self {
            DynamicMode::Local => DynamicMode::Remote,
            DynamicMode::Remote => DynamicMode::Local,
        }
    }
}
