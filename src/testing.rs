//! Test doubles and assertion helpers for exercising the dynamic spawn
//! scheduler and nested sets without a real build system attached.
//!
//! # Quick start
//!
//! ```
//! use nested_dag_exec::testing::*;
//! use nested_dag_exec::dynamic::*;
//! use nested_dag_exec::interrupt::Interrupt;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let registry = MockRegistry::new()
//!     .with_local(MockStrategy::new("local").succeeds_after(Duration::from_millis(5)))
//!     .with_remote(MockStrategy::new("remote").succeeds_after(Duration::from_millis(50)));
//! let spawn: Arc<dyn Spawn> = Arc::new(MockSpawn::new("compile"));
//! let ctx: Arc<dyn ActionExecutionContext> = Arc::new(BareContext::new(Interrupt::new()));
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::dynamic::{ActionExecutionContext, DynamicMode, DynamicStrategyRegistry, SandboxedStrategy, Spawn};
use crate::interrupt::Interrupt;

/// A minimal [`Spawn`] for tests: just a mnemonic and an optional
/// availability-info requirement.
pub struct MockSpawn {
    mnemonic: String,
    requires_availability_info: bool,
}

impl MockSpawn {
    pub fn new(mnemonic: impl Into<String>) -> Self {
        Self {
            mnemonic: mnemonic.into(),
            requires_availability_info: false,
        }
    }

    pub fn requiring_xcode_availability_info(mut self) -> Self {
        self.requires_availability_info = true;
        self
    }
}

impl Spawn for MockSpawn {
    fn mnemonic(&self) -> &str {
        &self.mnemonic
    }

    fn requires_xcode_availability_info(&self) -> bool {
        self.requires_availability_info
    }
}

/// A [`SandboxedStrategy`] whose behavior is entirely configured up front:
/// how long to simulate work, whether it ultimately succeeds or fails, and
/// whether it actually honors the interrupt (a strategy that doesn't is
/// useful for exercising the "peer could not be cancelled" path).
pub struct MockStrategy {
    name: &'static str,
    delay: Duration,
    outcome: MockOutcome,
    honors_interrupt: bool,
    calls: AtomicUsize,
}

enum MockOutcome {
    Success,
    Failure(String),
}

impl MockStrategy {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            delay: Duration::ZERO,
            outcome: MockOutcome::Success,
            honors_interrupt: true,
            calls: AtomicUsize::new(0),
        }
    }

    #[must_use]
    pub fn succeeds_after(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self.outcome = MockOutcome::Success;
        self
    }

    #[must_use]
    pub fn fails_after(mut self, delay: Duration, message: impl Into<String>) -> Self {
        self.delay = delay;
        self.outcome = MockOutcome::Failure(message.into());
        self
    }

    #[must_use]
    pub fn ignoring_interrupt(mut self) -> Self {
        self.honors_interrupt = false;
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl SandboxedStrategy for MockStrategy {
    fn name(&self) -> &'static str {
        self.name
    }

    fn exec(&self, _spawn: &dyn Spawn, ctx: &dyn ActionExecutionContext) -> anyhow::Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let step = Duration::from_millis(1);
        let mut waited = Duration::ZERO;
        while waited < self.delay {
            if self.honors_interrupt && ctx.interrupt().is_set() {
                anyhow::bail!("mock strategy '{}' observed interrupt before finishing", self.name);
            }
            std::thread::sleep(step.min(self.delay - waited));
            waited += step;
        }
        match &self.outcome {
            MockOutcome::Success => Ok(()),
            MockOutcome::Failure(message) => anyhow::bail!("{message}"),
        }
    }
}

/// A [`DynamicStrategyRegistry`] that resolves to a fixed local and/or
/// remote strategy regardless of which spawn is asked about.
#[derive(Default)]
pub struct MockRegistry {
    local: Mutex<Option<Arc<dyn SandboxedStrategy>>>,
    remote: Mutex<Option<Arc<dyn SandboxedStrategy>>>,
}

impl MockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_local(self, strategy: impl SandboxedStrategy) -> Self {
        self.with_local_arc(Arc::new(strategy))
    }

    #[must_use]
    pub fn with_remote(self, strategy: impl SandboxedStrategy) -> Self {
        self.with_remote_arc(Arc::new(strategy))
    }

    /// Like [`Self::with_local`], but takes an already-`Arc`-wrapped strategy
    /// so the caller can keep its own handle (e.g. to read `MockStrategy::
    /// call_count` afterward) instead of losing ownership to the registry.
    #[must_use]
    pub fn with_local_arc(self, strategy: Arc<dyn SandboxedStrategy>) -> Self {
        *self.local.lock().unwrap() = Some(strategy);
        self
    }

    /// Like [`Self::with_remote`], but takes an already-`Arc`-wrapped strategy.
    #[must_use]
    pub fn with_remote_arc(self, strategy: Arc<dyn SandboxedStrategy>) -> Self {
        *self.remote.lock().unwrap() = Some(strategy);
        self
    }
}

impl DynamicStrategyRegistry for MockRegistry {
    fn strategy_for(&self, mode: DynamicMode, _spawn: &dyn Spawn) -> Option<Arc<dyn SandboxedStrategy>> {
        match mode {
            DynamicMode::Local => self.local.lock().unwrap().clone(),
            DynamicMode::Remote => self.remote.lock().unwrap().clone(),
        }
    }
}

/// A fresh, unset [`Interrupt`] paired with a [`crate::dynamic::BareContext`]
/// wrapping it -- the pairing tests usually want, since the test typically
/// needs to call `.set()` on the same handle the context exposes.
pub fn bare_context() -> (Interrupt, crate::dynamic::BareContext) {
    let interrupt = Interrupt::new();
    let ctx = crate::dynamic::BareContext::new(interrupt.clone());
    (interrupt, ctx)
}

/// Asserts two element collections are equal, ignoring order. Mirrors the
/// teacher's `assert_collections_unordered_equal`, specialized for
/// [`crate::nested_set::NestedSet::to_list`] output.
pub fn assert_elements_unordered_equal<E>(actual: Vec<E>, expected: Vec<E>)
where
    E: std::fmt::Debug + Eq + std::hash::Hash,
{
    let actual_set: std::collections::HashSet<_> = actual.into_iter().collect();
    let expected_set: std::collections::HashSet<_> = expected.into_iter().collect();
    assert_eq!(actual_set, expected_set, "element sets differ");
}
