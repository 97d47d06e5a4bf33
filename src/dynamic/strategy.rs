//! The scheduler itself: decides whether a spawn can run dynamically at
//! all, whether the host has spare capacity to race it, and arbitrates the
//! race to a single winning result.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::time::Duration;

use crate::errors::{protocol_violation, DynamicExecError, FailureCode, FailureDetail};
use crate::interrupt::Interrupt;

use super::arbiter::ArbitrationCell;
use super::branch::Branch;
use super::semaphore::Semaphore;
use super::types::{ActionExecutionContext, DynamicMode, DynamicStrategyRegistry, SandboxedStrategy, Spawn};

/// Tunables that shape scheduling decisions without touching which
/// strategies exist. See [`crate::config::DynamicExecutionOptions`] for the
/// concrete struct most callers hand in.
pub trait ExecutionPolicy: Send + Sync {
    /// How long to hold off starting the local branch, to give a
    /// (typically faster-to-cancel-but-slower-to-win) remote branch a head
    /// start before burning local CPU.
    fn local_execution_delay(&self) -> Duration;

    /// Whether to emit verbose `tracing::debug!` output about scheduling
    /// decisions.
    fn debug_spawn_scheduler(&self) -> bool;

    /// Whether spawns that declare [`Spawn::requires_xcode_availability_info`]
    /// must be rejected unless explicitly exempted.
    fn require_availability_info(&self) -> bool;

    /// Whether `mnemonic` is exempt from the availability-info requirement.
    fn is_exempt_from_availability_info(&self, mnemonic: &str) -> bool;

    /// Whether the process's very first dynamic `exec` call should skip the
    /// local race and run remote-only (spec.md §4.6 step 5).
    fn skip_first_build(&self) -> bool {
        false
    }
}

/// Extra local-start delay applied once [`DynamicSpawnStrategy::delay_local_execution`]
/// has tripped: the first time a remote branch wins a race, subsequent races
/// give the local branch a small additional head-start penalty on top of
/// whatever `ExecutionPolicy::local_execution_delay` already configures, on
/// the theory that a remote back-end which has already proven itself once is
/// worth favoring a little harder. Advisory, not a correctness requirement.
const DELAY_LOCAL_EXECUTION_FLOOR: Duration = Duration::from_millis(10);

/// Races a spawn's local and remote strategies against each other, subject
/// to a process-wide concurrency cap, and returns whichever finishes first
/// after cleanly cancelling the loser.
pub struct DynamicSpawnStrategy<P: ExecutionPolicy> {
    policy: Arc<P>,
    registry: Arc<dyn DynamicStrategyRegistry>,
    concurrency: Semaphore,
    /// Cleared after the first `exec` call of this strategy's lifetime, so
    /// `skip_first_build` only ever applies once.
    first_build: AtomicBool,
    /// Set the first time any remote branch completes successfully, across
    /// every `exec` call this strategy instance has ever run (spec.md §3).
    /// Read without synchronization -- it's an advisory scheduling hint, not
    /// a correctness-bearing flag.
    delay_local_execution: Arc<AtomicBool>,
}

impl<P: ExecutionPolicy> DynamicSpawnStrategy<P> {
    /// `concurrency_cap` bounds how many spawns may be racing (both
    /// branches running at once) at any moment; callers typically size it
    /// to `num_cpus::get()` (see [`Self::with_host_concurrency`]).
    pub fn new(policy: Arc<P>, registry: Arc<dyn DynamicStrategyRegistry>, concurrency_cap: usize) -> Self {
        Self {
            policy,
            registry,
            concurrency: Semaphore::new(concurrency_cap.max(1)),
            first_build: AtomicBool::new(true),
            delay_local_execution: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Convenience constructor sizing the concurrency cap to the host's
    /// logical CPU count, matching spec.md §4.6 step 6's "configured CPU
    /// count" guidance.
    pub fn with_host_concurrency(policy: Arc<P>, registry: Arc<dyn DynamicStrategyRegistry>) -> Self {
        Self::new(policy, registry, num_cpus::get())
    }

    pub fn exec(
        &self,
        spawn: Arc<dyn Spawn>,
        ctx: Arc<dyn ActionExecutionContext>,
    ) -> Result<(), DynamicExecError> {
        if self.policy.require_availability_info()
            && spawn.requires_xcode_availability_info()
            && !self.policy.is_exempt_from_availability_info(spawn.mnemonic())
        {
            return Err(DynamicExecError::XcodeRelatedPrereqUnmet(FailureDetail::new(
                FailureCode::XcodeRelatedPrereqUnmet,
                format!(
                    "spawn '{}' needs Xcode availability info this execution environment did not provide",
                    spawn.mnemonic()
                ),
            )));
        }

        let local_strategy = self.registry.strategy_for(DynamicMode::Local, spawn.as_ref());
        let remote_strategy = self.registry.strategy_for(DynamicMode::Remote, spawn.as_ref());

        let (local_strategy, remote_strategy) = match (local_strategy, remote_strategy) {
            (None, None) => {
                return Err(DynamicExecError::NoUsableStrategyFound(FailureDetail::new(
                    FailureCode::NoUsableStrategyFound,
                    format!("no local or remote strategy can execute spawn '{}'", spawn.mnemonic()),
                )));
            }
            (Some(local), None) => return run_single(local, spawn, ctx),
            (None, Some(remote)) => return self.run_remote_only(remote, spawn, ctx),
            (Some(local), Some(remote)) => (local, remote),
        };

        let is_first_build = self.first_build.swap(false, Ordering::SeqCst);
        if is_first_build && self.policy.skip_first_build() {
            ctx.post_info_event(&format!(
                "skipping local race for the first build action ('{}'); running remote-only",
                spawn.mnemonic()
            ));
            return self.run_remote_only(remote_strategy, spawn, ctx);
        }

        if !self.concurrency.try_acquire() {
            if self.policy.debug_spawn_scheduler() {
                tracing::debug!(
                    mnemonic = spawn.mnemonic(),
                    "dynamic concurrency cap reached; the local side is already saturated, running remote-only"
                );
            }
            return self.run_remote_only(remote_strategy, spawn, ctx);
        }

        if self.policy.debug_spawn_scheduler() {
            tracing::debug!(mnemonic = spawn.mnemonic(), "racing local and remote strategies");
        }
        let result = self.run_dynamic(local_strategy, remote_strategy, spawn, ctx);
        self.concurrency.release();
        result
    }

    /// The remote-only fast path taken when no local strategy is registered,
    /// the concurrency cap is saturated, or `skip_first_build` fires. Also
    /// feeds `delay_local_execution`, matching spec.md §4.6 step 4's note
    /// that the remote fast path honors that flag too: a remote success
    /// here is just as much evidence that remote is worth favoring as a
    /// remote win inside a full race.
    fn run_remote_only(
        &self,
        remote_strategy: Arc<dyn SandboxedStrategy>,
        spawn: Arc<dyn Spawn>,
        ctx: Arc<dyn ActionExecutionContext>,
    ) -> Result<(), DynamicExecError> {
        let result = run_single(remote_strategy, spawn, ctx);
        if result.is_ok() {
            self.delay_local_execution.store(true, Ordering::Relaxed);
        }
        result
    }

    fn run_dynamic(
        &self,
        local_strategy: Arc<dyn SandboxedStrategy>,
        remote_strategy: Arc<dyn SandboxedStrategy>,
        spawn: Arc<dyn Spawn>,
        ctx: Arc<dyn ActionExecutionContext>,
    ) -> Result<(), DynamicExecError> {
        let (tx, rx) = mpsc::channel();
        let arbitration = Arc::new(ArbitrationCell::new());
        let local = Branch::new(DynamicMode::Local, tx.clone(), Arc::clone(&arbitration));
        let remote = Branch::new(DynamicMode::Remote, tx, Arc::clone(&arbitration));

        let mut local_delay = self.policy.local_execution_delay();
        if self.delay_local_execution.load(Ordering::Relaxed) {
            local_delay = local_delay.max(DELAY_LOCAL_EXECUTION_FLOOR);
        }

        let top_level_interrupt = ctx.interrupt().clone();
        local.spawn(local_strategy, Arc::clone(&spawn), Arc::clone(&ctx), local_delay);
        remote.spawn(remote_strategy, spawn, ctx, Duration::ZERO);

        let result = wait_branches(local, remote, Arc::clone(&arbitration), rx, &top_level_interrupt);
        if result.is_ok() && arbitration.winner() == Some(DynamicMode::Remote) {
            self.delay_local_execution.store(true, Ordering::Relaxed);
        }
        result
    }
}

fn run_single(
    strategy: Arc<dyn SandboxedStrategy>,
    spawn: Arc<dyn Spawn>,
    ctx: Arc<dyn ActionExecutionContext>,
) -> Result<(), DynamicExecError> {
    strategy
        .exec(spawn.as_ref(), ctx.as_ref())
        .map_err(|source| DynamicExecError::Execution { source })
}

/// How often [`wait_branches`] polls `top_level_interrupt` while waiting for
/// either branch to report. Short enough that an external interrupt is
/// noticed promptly without busy-spinning.
const TOP_LEVEL_INTERRUPT_POLL: Duration = Duration::from_millis(5);

/// Blocks for whichever of `local`/`remote` finishes first, then reads the
/// arbitration cell each branch tries to claim as its very last act before
/// reporting completion -- the channel only exists to wake this thread up;
/// the cell is the single source of truth for who actually won.
///
/// Also polls `top_level_interrupt` (spec.md §4.7 step 1's "the top-level is
/// interrupted"): if the caller's own context is interrupted before either
/// branch reports, both branches are cancelled and awaited, and the
/// interrupt is propagated rather than waiting for a winner that may never
/// come (the caller itself is shutting down, not racing to a result).
fn wait_branches(
    local: Arc<Branch>,
    remote: Arc<Branch>,
    arbitration: Arc<ArbitrationCell>,
    rx: mpsc::Receiver<DynamicMode>,
    top_level_interrupt: &Interrupt,
) -> Result<(), DynamicExecError> {
    loop {
        match rx.recv_timeout(TOP_LEVEL_INTERRUPT_POLL) {
            Ok(_) => break,
            Err(mpsc::RecvTimeoutError::Timeout) => {
                if top_level_interrupt.is_set() {
                    local.cancel();
                    remote.cancel();
                    local.wait();
                    remote.wait();
                    return Err(DynamicExecError::DynamicInterrupted);
                }
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                panic!("both branch senders dropped without either branch reporting completion")
            }
        }
    }

    let winner_mode = arbitration
        .winner()
        .expect("a branch reported completion on its notify channel without claiming arbitration first");

    let (winner, loser) = if winner_mode == local.mode() {
        (local, remote)
    } else {
        (remote, local)
    };

    if !loser.cancel() {
        protocol_violation(format!(
            "both {:?} and {:?} branches completed before either could be cancelled",
            winner.mode(),
            loser.mode()
        ));
    }
    loser.wait();

    match winner.take_result() {
        Some(result) => result,
        None => protocol_violation(format!(
            "{:?} branch reported completion on its notify channel with no stored result",
            winner.mode()
        )),
    }
}
