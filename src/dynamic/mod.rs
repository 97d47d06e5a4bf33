//! Dynamic spawn execution: race a spawn's local and remote strategies
//! against each other and return whichever finishes first, after cleanly
//! cancelling the loser.
//!
//! Entry point: [`strategy::DynamicSpawnStrategy::exec`].

mod arbiter;
mod branch;
mod semaphore;
mod strategy;
mod types;

pub use branch::{BareContext, Branch, BranchState};
pub use strategy::{DynamicSpawnStrategy, ExecutionPolicy};
pub use types::{ActionExecutionContext, DynamicMode, DynamicStrategyRegistry, SandboxedStrategy, Spawn};
