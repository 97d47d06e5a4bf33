//! Cooperative interrupt signaling shared by the nested-set flatten paths and
//! the dynamic-spawn arbiter.
//!
//! Both cores in this crate need a cheap, cloneable "please stop" flag that a
//! controlling thread can set and a worker thread can poll at safe points.
//! `Interrupt` is that flag. It carries no payload -- once set it stays set
//! for the lifetime of the handle.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Process exit code used by [`crate::nested_set::NestedSet::to_list_or_crash`]
/// when it observes an interrupt while a caller has declared itself unable to
/// handle one. Matches the conventional Unix "terminated by SIGINT" code
/// (128 + signal 2) so that callers shelling out to this process can
/// distinguish it from an ordinary nonzero exit.
pub const INTERRUPTED_EXIT_CODE: i32 = 130;

/// A cheap, cloneable cooperative cancellation/interrupt flag.
#[derive(Clone, Debug, Default)]
pub struct Interrupt {
    flag: Arc<AtomicBool>,
}

impl Interrupt {
    /// Create a fresh, unset interrupt handle.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the interrupt. Idempotent.
    pub fn set(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// True if [`Self::set`] has been called on this handle or any clone of it.
    pub fn is_set(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Error returned by interrupt-propagating entry points when an [`Interrupt`]
/// fires mid-traversal.
#[derive(Debug, thiserror::Error)]
#[error("interrupted")]
pub struct Interrupted;
