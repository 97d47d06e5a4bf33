//! The single-producer arbitration cell that decides which of two racing
//! branches gets to declare victory and cancel its peer.

use std::sync::atomic::{AtomicU8, Ordering};

use super::types::DynamicMode;

const UNDECIDED: u8 = 0;
const LOCAL_WON: u8 = 1;
const REMOTE_WON: u8 = 2;

fn mode_to_tag(mode: DynamicMode) -> u8 {
    match mode {
        DynamicMode::Local => LOCAL_WON,
        DynamicMode::Remote => REMOTE_WON,
    }
}

fn tag_to_mode(tag: u8) -> DynamicMode {
    match tag {
        LOCAL_WON => DynamicMode::Local,
        REMOTE_WON => DynamicMode::Remote,
        _ => unreachable!("ArbitrationCell tag other than LOCAL_WON/REMOTE_WON observed after UNDECIDED check"),
    }
}

/// A write-once cell: exactly one of the two racing branches can
/// successfully claim it, via a single compare-and-swap from `UNDECIDED`.
pub struct ArbitrationCell {
    winner: AtomicU8,
}

impl ArbitrationCell {
    pub fn new() -> Self {
        Self {
            winner: AtomicU8::new(UNDECIDED),
        }
    }

    /// Attempts to claim victory for `mode`. Returns true exactly once,
    /// for whichever mode calls this first.
    pub fn try_claim(&self, mode: DynamicMode) -> bool {
        self.winner
            .compare_exchange(UNDECIDED, mode_to_tag(mode), Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    /// The mode that won, if arbitration has completed.
    pub fn winner(&self) -> Option<DynamicMode> {
        match self.winner.load(Ordering::SeqCst) {
            UNDECIDED => None,
            tag => Some(tag_to_mode(tag)),
        }
    }
}

impl Default for ArbitrationCell {
    fn default() -> Self {
        Self::new()
    }
}
