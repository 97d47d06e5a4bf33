//! One side of a dynamic-execution race: a branch runs a single
//! [`SandboxedStrategy`] against a spawn on a rayon worker thread, can be
//! cooperatively cancelled, and can be waited on to confirm it has
//! actually stopped.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{mpsc, Arc, Mutex};
use std::time::Duration;

use crate::errors::DynamicExecError;
use crate::interrupt::Interrupt;

use super::arbiter::ArbitrationCell;
use super::semaphore::Semaphore;
use super::types::{ActionExecutionContext, DynamicMode, SandboxedStrategy, Spawn};

const RUNNABLE: u8 = 0;
const STARTED: u8 = 1;
const CANCELLED: u8 = 2;
const DONE: u8 = 3;

/// The observable lifecycle of a [`Branch`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BranchState {
    /// Created, not yet running (possibly still waiting out its start delay).
    Runnable,
    /// Actively executing its strategy.
    Started,
    /// Cancelled, either before it started or while running.
    Cancelled,
    /// Finished on its own, with a result available via [`Branch::take_result`].
    Done,
}

/// A minimal execution context used by callers that don't need anything
/// beyond the interrupt -- e.g. tests, or a strategy with no further
/// dependency on its environment. Informational events are recorded rather
/// than discarded, so tests can assert on the skip-first-build notice.
pub struct BareContext {
    interrupt: Interrupt,
    events: Mutex<Vec<String>>,
}

impl BareContext {
    pub fn new(interrupt: Interrupt) -> Self {
        Self {
            interrupt,
            events: Mutex::new(Vec::new()),
        }
    }

    /// Every message passed to [`ActionExecutionContext::post_info_event`]
    /// so far, in order.
    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }
}

impl ActionExecutionContext for BareContext {
    fn interrupt(&self) -> &Interrupt {
        &self.interrupt
    }

    fn post_info_event(&self, message: &str) {
        self.events.lock().unwrap().push(message.to_string());
    }
}

/// Wraps the single [`ActionExecutionContext`] a caller hands to `exec` so
/// each racing branch's strategy observes only *its own* branch's
/// cancellation, not its sibling's: both branches are handed the same `ctx`
/// (there's one informational-event sink per `exec` call), but each needs a
/// distinct cancellation signal, so `interrupt()` is substituted with the
/// owning branch's own [`Interrupt`] while `post_info_event` still forwards
/// to the shared context.
struct BranchContext {
    inner: Arc<dyn ActionExecutionContext>,
    interrupt: Interrupt,
}

impl ActionExecutionContext for BranchContext {
    fn interrupt(&self) -> &Interrupt {
        &self.interrupt
    }

    fn post_info_event(&self, message: &str) {
        self.inner.post_info_event(message);
    }
}

pub struct Branch {
    mode: DynamicMode,
    state: AtomicU8,
    done: Semaphore,
    interrupt: Interrupt,
    result: Mutex<Option<Result<(), DynamicExecError>>>,
    notify: mpsc::Sender<DynamicMode>,
    arbitration: Arc<ArbitrationCell>,
}

impl Branch {
    pub fn new(
        mode: DynamicMode,
        notify: mpsc::Sender<DynamicMode>,
        arbitration: Arc<ArbitrationCell>,
    ) -> Arc<Self> {
        Arc::new(Self {
            mode,
            state: AtomicU8::new(RUNNABLE),
            done: Semaphore::new(0),
            interrupt: Interrupt::new(),
            result: Mutex::new(None),
            notify,
            arbitration,
        })
    }

    pub fn mode(&self) -> DynamicMode {
        self.mode
    }

    pub fn interrupt(&self) -> &Interrupt {
        &self.interrupt
    }

    pub fn state(&self) -> BranchState {
        match self.state.load(Ordering::SeqCst) {
            RUNNABLE => BranchState::Runnable,
            STARTED => BranchState::Started,
            CANCELLED => BranchState::Cancelled,
            DONE => BranchState::Done,
            other => unreachable!("Branch state byte {other} out of range"),
        }
    }

    /// Runs `strategy` against `spawn` on a rayon worker thread, after
    /// first waiting out `start_delay` (polled in small increments so a
    /// cancellation during the delay window aborts before any real work
    /// starts). The branch reports its own mode on `self.notify` exactly
    /// once, via [`Self::finish`].
    pub fn spawn(
        self: &Arc<Self>,
        strategy: Arc<dyn SandboxedStrategy>,
        spawn: Arc<dyn Spawn>,
        ctx: Arc<dyn ActionExecutionContext>,
        start_delay: Duration,
    ) {
        let branch = Arc::clone(self);
        rayon::spawn(move || {
            if !start_delay.is_zero() {
                let step = Duration::from_millis(5).min(start_delay);
                let mut waited = Duration::ZERO;
                while waited < start_delay && branch.state.load(Ordering::SeqCst) == RUNNABLE {
                    std::thread::sleep(step);
                    waited += step;
                }
            }
            if branch
                .state
                .compare_exchange(RUNNABLE, STARTED, Ordering::SeqCst, Ordering::SeqCst)
                .is_err()
            {
                // Cancelled before it ever started its strategy -- either the
                // ordinary peer-cancel path, or the ambiguous already-
                // cancelled race spec.md §9 tracks as b/173020239. Either
                // way we don't try to distinguish further, just log and
                // report the cancelled sentinel.
                tracing::debug!(mode = ?branch.mode, "branch cancelled before it started running");
                branch.finish(Err(DynamicExecError::DynamicInterrupted));
                return;
            }
            let branch_ctx = BranchContext {
                inner: ctx,
                interrupt: branch.interrupt.clone(),
            };
            let outcome = strategy.exec(spawn.as_ref(), &branch_ctx);
            branch.finish(outcome.map_err(|source| DynamicExecError::Execution { source }));
        });
    }

    fn finish(&self, result: Result<(), DynamicExecError>) {
        *self.result.lock().unwrap() = Some(result);
        // Leave a CANCELLED state as-is; only a still-Started branch
        // transitions to Done on its own.
        let _ = self
            .state
            .compare_exchange(STARTED, DONE, Ordering::SeqCst, Ordering::SeqCst);
        // Whichever branch gets here first wins the race; the loser's claim
        // attempt simply fails and is ignored here -- `wait_branches` reads
        // the cell's outcome, not this return value.
        self.arbitration.try_claim(self.mode);
        self.done.release();
        let _ = self.notify.send(self.mode);
    }

    /// Attempts to cancel this branch. Returns true if it is now (or
    /// already was) cancelled; false if it had already finished before the
    /// cancellation could land -- the caller must then treat both branches
    /// as having produced a real result, which `wait_branches` escalates to
    /// a protocol violation.
    pub fn cancel(&self) -> bool {
        loop {
            match self.state.load(Ordering::SeqCst) {
                RUNNABLE => {
                    if self
                        .state
                        .compare_exchange(RUNNABLE, CANCELLED, Ordering::SeqCst, Ordering::SeqCst)
                        .is_ok()
                    {
                        return true;
                    }
                }
                STARTED => {
                    if self
                        .state
                        .compare_exchange(STARTED, CANCELLED, Ordering::SeqCst, Ordering::SeqCst)
                        .is_ok()
                    {
                        self.interrupt.set();
                        return true;
                    }
                }
                CANCELLED => return true,
                DONE => return false,
                other => unreachable!("Branch state byte {other} out of range"),
            }
        }
    }

    /// Blocks until this branch has fully stopped (reached `Done` or
    /// `Cancelled` and run its `finish` callback).
    pub fn wait(&self) {
        self.done.acquire();
    }

    /// Takes the stored result, if any. `None` if the branch never ran its
    /// strategy to completion (cancelled before `finish` was ever called is
    /// not possible -- `finish` always runs, even on the cancel-before-start
    /// path -- so this is only `None` before the branch has finished at all).
    pub fn take_result(&self) -> Option<Result<(), DynamicExecError>> {
        self.result.lock().unwrap().take()
    }
}
