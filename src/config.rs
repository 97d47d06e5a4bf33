//! Tunables for the dynamic spawn scheduler, collected into one struct the
//! way the teacher groups checkpointing knobs into `CheckpointConfig`.

use std::collections::HashSet;
use std::time::Duration;

use crate::dynamic::ExecutionPolicy;

/// Configuration for [`crate::dynamic::DynamicSpawnStrategy`].
///
/// Implements [`ExecutionPolicy`] directly so it can be handed straight to
/// `DynamicSpawnStrategy::new` without an adapter.
#[derive(Clone, Debug)]
pub struct DynamicExecutionOptions {
    /// How long to delay starting the local branch of a race, giving the
    /// remote branch a head start. Zero disables the delay.
    pub local_execution_delay: Duration,
    /// Emit `tracing::debug!` output about scheduling decisions.
    pub debug_spawn_scheduler: bool,
    /// Reject spawns that need Xcode availability info unless their
    /// mnemonic is in `availability_info_exempt`.
    pub require_availability_info: bool,
    /// Mnemonics exempted from `require_availability_info`.
    pub availability_info_exempt: HashSet<String>,
    /// Run the very first `exec` call of a process's lifetime remote-only,
    /// skipping the local race entirely (spec.md §4.6 step 5). Later calls
    /// race normally.
    pub skip_first_build: bool,
}

impl Default for DynamicExecutionOptions {
    fn default() -> Self {
        Self {
            local_execution_delay: Duration::ZERO,
            debug_spawn_scheduler: false,
            require_availability_info: false,
            availability_info_exempt: HashSet::new(),
            skip_first_build: false,
        }
    }
}

impl ExecutionPolicy for DynamicExecutionOptions {
    fn local_execution_delay(&self) -> Duration {
        self.local_execution_delay
    }

    fn debug_spawn_scheduler(&self) -> bool {
        self.debug_spawn_scheduler
    }

    fn require_availability_info(&self) -> bool {
        self.require_availability_info
    }

    fn is_exempt_from_availability_info(&self, mnemonic: &str) -> bool {
        self.availability_info_exempt.contains(mnemonic)
    }

    fn skip_first_build(&self) -> bool {
        self.skip_first_build
    }
}
