//! The lazily-computed, write-once traversal memo for a branch node.
//!
//! A branch node's memo records, per successor slot, exactly which elements
//! that slot contributes once duplicates against earlier slots (in this
//! node's own traversal order) are removed. A bare leaf slot needs only one
//! bit; a transitive-child slot needs one bit per element of that child's
//! own (already deduplicated) flattened list, since a child can contribute
//! some of its elements and not others depending on what earlier slots in
//! *this* node already produced.
//!
//! The memo is computed exactly once (the first time the node is flattened,
//! under the node's `OnceLock`) and published for every later flatten to
//! replay without rehashing: replaying still walks the successor structure
//! and reuses each child's own, independently memoized `to_list`, but only
//! keeps the positions the memo says survived.

/// What one successor slot contributes to a replay.
#[derive(Debug)]
pub(crate) enum SlotMemo {
    /// Nothing from this slot survived this node's dedup pass.
    None,
    /// The slot's bare leaf survived.
    Leaf,
    /// A transitive child slot: `keep[i]` is true iff position `i` of that
    /// child's own `to_list()` output survived this node's dedup pass.
    Node(Box<[bool]>),
}

#[derive(Debug)]
pub(crate) struct Memo {
    pub(crate) slots: Box<[SlotMemo]>,
    /// The total number of distinct elements this node flattens to.
    pub(crate) size: usize,
}

impl Memo {
    pub(crate) fn new(slots: Vec<SlotMemo>, size: usize) -> Self {
        Self {
            slots: slots.into_boxed_slice(),
            size,
        }
    }
}
