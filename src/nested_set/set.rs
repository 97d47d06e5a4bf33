//! The `NestedSet<E>` value type itself: representation, structural queries,
//! and the flattening entry points.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashSet;
use std::hash::{Hash, Hasher};
use std::sync::{mpsc, Arc, OnceLock};
use std::time::Duration;

use crate::errors::NestedSetError;
use crate::interrupt::{Interrupt, Interrupted};
use crate::order::Order;

use super::memo::{Memo, SlotMemo};

/// The bound every element type stored in a [`NestedSet`] must satisfy.
///
/// Cloning is assumed to be cheap: flattening clones elements into the
/// output vector rather than threading references through the recursion,
/// matching how callers actually use these sets (interned strings, small
/// value structs, `Arc`-wrapped artifacts).
pub trait Element: Clone + Eq + Hash + Send + Sync + 'static {}
impl<T: Clone + Eq + Hash + Send + Sync + 'static> Element for T {}

/// An immutable, structurally-shared, ordered multiset arranged as a DAG.
///
/// Cheap to clone (an `Arc` bump) and cheap to union into a larger set via
/// [`Builder`](super::Builder). See the crate-level docs for the full
/// contract.
pub struct NestedSet<E: Element> {
    pub(crate) repr: Repr<E>,
}

pub(crate) enum Repr<E: Element> {
    /// The canonical empty node for a given order. Carries no allocation.
    Empty(Order),
    /// A singleton produced either directly or by the structure-sharing
    /// collapse in [`Builder::build`](super::Builder::build).
    Leaf(E),
    Branch(Arc<BranchNode<E>>),
}

/// One successor slot of a branch node: either a bare element (a direct
/// input, or a transitive child that collapsed to a singleton and was
/// hoisted into this node's own dedup pass) or a reference to another node.
#[derive(Clone)]
pub(crate) enum Successor<E: Element> {
    Leaf(E),
    Node(NestedSet<E>),
}

pub(crate) struct BranchNode<E: Element> {
    pub(crate) order: Order,
    pub(crate) depth: u32,
    pub(crate) successors: Vec<Successor<E>>,
    pub(crate) memo: MemoSlot<E>,
}

/// Whether a branch node needs a memo at all. A node whose successors are
/// *all* bare leaves was already deduplicated during construction (the
/// builder's ephemeral `HashSet` saw every element exactly once), so
/// flattening it is a free clone with no hashing and no cache to maintain.
pub(crate) enum MemoSlot<E: Element> {
    NotNeeded(std::marker::PhantomData<E>),
    Lazy(OnceLock<Memo>),
}

impl<E: Element> MemoSlot<E> {
    pub(crate) fn for_successors(successors: &[Successor<E>]) -> Self {
        if successors
            .iter()
            .all(|s| matches!(s, Successor::Leaf(_)))
        {
            MemoSlot::NotNeeded(std::marker::PhantomData)
        } else {
            MemoSlot::Lazy(OnceLock::new())
        }
    }
}

impl<E: Element> Clone for NestedSet<E> {
    fn clone(&self) -> Self {
        Self {
            repr: match &self.repr {
                Repr::Empty(o) => Repr::Empty(*o),
                Repr::Leaf(e) => Repr::Leaf(e.clone()),
                Repr::Branch(n) => Repr::Branch(Arc::clone(n)),
            },
        }
    }
}

/// The depth a branch node with the given successor slots would have. A
/// bare leaf slot contributes no extra branch-node chain of its own, so it
/// counts for `1` (this node itself); a transitive-node slot contributes
/// `1 + successor.depth()`, per spec §4.2's running update. The result is
/// the max across all slots, so a branch whose successors are all leaves
/// has depth `1`, matching `depth`'s own contract ("the longest chain of
/// branch nodes from this node down to a leaf").
fn branch_depth<E: Element>(successors: &[Successor<E>]) -> u32 {
    successors
        .iter()
        .map(|s| match s {
            Successor::Leaf(_) => 1,
            Successor::Node(n) => 1 + n.depth(),
        })
        .max()
        .unwrap_or(1)
}

impl<E: Element> NestedSet<E> {
    pub(crate) fn empty(order: Order) -> Self {
        Self {
            repr: Repr::Empty(order),
        }
    }

    pub(crate) fn leaf(e: E) -> Self {
        Self {
            repr: Repr::Leaf(e),
        }
    }

    pub(crate) fn branch(order: Order, successors: Vec<Successor<E>>) -> Self {
        let depth = branch_depth(&successors);
        let memo = MemoSlot::for_successors(&successors);
        Self {
            repr: Repr::Branch(Arc::new(BranchNode {
                order,
                depth,
                successors,
                memo,
            })),
        }
    }

    /// True for the canonical empty node of any order.
    pub fn is_empty(&self) -> bool {
        matches!(self.repr, Repr::Empty(_))
    }

    /// True for a node holding exactly one element, whether it started that
    /// way or was collapsed to one by [`Builder::build`](super::Builder::build).
    pub fn is_singleton(&self) -> bool {
        matches!(self.repr, Repr::Leaf(_))
    }

    /// The element of a singleton node.
    ///
    /// # Panics
    /// Panics if `self` is not [`is_singleton`](Self::is_singleton).
    pub fn get_single(&self) -> E {
        match &self.repr {
            Repr::Leaf(e) => e.clone(),
            _ => panic!("get_single called on a NestedSet that is not a singleton"),
        }
    }

    /// The order this set was built with. Bare leaves carry no order of
    /// their own (a singleton has no meaningful interleaving to preserve),
    /// so this returns `None` for them.
    pub fn order(&self) -> Option<Order> {
        match &self.repr {
            Repr::Empty(o) => Some(*o),
            Repr::Leaf(_) => None,
            Repr::Branch(n) => Some(n.order),
        }
    }

    /// The longest chain of branch nodes from this node down to a leaf.
    /// `0` for the empty node, `1` for a singleton.
    pub fn depth(&self) -> u32 {
        match &self.repr {
            Repr::Empty(_) => 0,
            Repr::Leaf(_) => 1,
            Repr::Branch(n) => n.depth,
        }
    }

    /// A cheap, coarser-than-deep-equality comparison: true if `self` and
    /// `other` are the exact same allocation, or if they have the same order
    /// and their successor slots are pairwise identical (bare elements
    /// compared by value, nested nodes compared by `Arc` pointer, *not*
    /// recursively). Two structurally-equal sets built independently of one
    /// another will generally compare unequal here -- that's the tradeoff
    /// for not walking the whole DAG.
    pub fn shallow_equals(&self, other: &Self) -> bool {
        match (&self.repr, &other.repr) {
            (Repr::Empty(a), Repr::Empty(b)) => a == b,
            (Repr::Leaf(a), Repr::Leaf(b)) => a == b,
            (Repr::Branch(a), Repr::Branch(b)) => {
                if Arc::ptr_eq(a, b) {
                    return true;
                }
                a.order == b.order
                    && a.successors.len() == b.successors.len()
                    && a.successors
                        .iter()
                        .zip(b.successors.iter())
                        .all(|(x, y)| successor_shallow_eq(x, y))
            }
            _ => false,
        }
    }

    /// A hash consistent with [`shallow_equals`](Self::shallow_equals):
    /// equal nodes under that relation always hash equal here.
    pub fn shallow_hash(&self) -> u64 {
        let mut h = DefaultHasher::new();
        match &self.repr {
            Repr::Empty(o) => {
                0u8.hash(&mut h);
                o.hash(&mut h);
            }
            Repr::Leaf(e) => {
                1u8.hash(&mut h);
                e.hash(&mut h);
            }
            Repr::Branch(n) => {
                2u8.hash(&mut h);
                n.order.hash(&mut h);
                for s in &n.successors {
                    hash_successor(s, &mut h);
                }
            }
        }
        h.finish()
    }

    /// Walks this node and its descendants in slot order, calling
    /// `descend` on every node visited (including leaves) and `visit` on
    /// every leaf for which the enclosing chain of `descend` calls all
    /// returned true. Returning false from `descend` prunes that subtree.
    ///
    /// Unlike [`to_list`](Self::to_list), this performs no deduplication or
    /// memoization: a leaf reachable through two different paths is visited
    /// twice.
    pub fn for_each_element(
        &self,
        mut descend: impl FnMut(&NestedSet<E>) -> bool,
        mut visit: impl FnMut(&E),
    ) {
        self.for_each_element_dyn(&mut descend, &mut visit);
    }

    fn for_each_element_dyn(
        &self,
        descend: &mut dyn FnMut(&NestedSet<E>) -> bool,
        visit: &mut dyn FnMut(&E),
    ) {
        if !descend(self) {
            return;
        }
        match &self.repr {
            Repr::Empty(_) => {}
            Repr::Leaf(e) => visit(e),
            Repr::Branch(n) => {
                for s in &n.successors {
                    match s {
                        Successor::Leaf(e) => {
                            let wrapped = NestedSet::leaf(e.clone());
                            if descend(&wrapped) {
                                visit(e);
                            }
                        }
                        Successor::Node(child) => child.for_each_element_dyn(descend, visit),
                    }
                }
            }
        }
    }

    /// The direct (non-transitive) elements of this node, in slot order.
    pub fn get_leaves(&self) -> Vec<E> {
        match &self.repr {
            Repr::Empty(_) => Vec::new(),
            Repr::Leaf(e) => vec![e.clone()],
            Repr::Branch(n) => n
                .successors
                .iter()
                .filter_map(|s| match s {
                    Successor::Leaf(e) => Some(e.clone()),
                    Successor::Node(_) => None,
                })
                .collect(),
        }
    }

    /// The direct transitive children of this node, in slot order.
    pub fn get_non_leaves(&self) -> Vec<NestedSet<E>> {
        match &self.repr {
            Repr::Branch(n) => n
                .successors
                .iter()
                .filter_map(|s| match s {
                    Successor::Node(n) => Some(n.clone()),
                    Successor::Leaf(_) => None,
                })
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Rebuilds this node so no branch node has more than `k` immediate
    /// successors, wrapping excess fan-out in intermediate branch nodes of
    /// the same order. Leaves the flattened element sequence unchanged.
    ///
    /// Only ever touches this node's own fan-out; children that already sit
    /// within the limit are shared, not rebuilt.
    ///
    /// # Errors
    /// Returns [`NestedSetError::MaxDegreeTooSmall`] if `k < 2`.
    pub fn split_if_exceeds_max_degree(&self, k: usize) -> Result<Self, NestedSetError> {
        if k < 2 {
            return Err(NestedSetError::MaxDegreeTooSmall(k));
        }
        let Repr::Branch(node) = &self.repr else {
            return Ok(self.clone());
        };
        let n = node.successors.len();
        if n <= k {
            return Ok(self.clone());
        }
        let order = node.order;
        let num_buckets = k.min(n);
        let base = n / num_buckets;
        let rem = n % num_buckets;

        let mut new_successors = Vec::with_capacity(num_buckets);
        let mut idx = 0;
        for i in 0..num_buckets {
            let take = base + usize::from(i < rem);
            let chunk: Vec<Successor<E>> = node.successors[idx..idx + take].to_vec();
            idx += take;
            new_successors.push(Successor::Node(NestedSet::branch(order, chunk)));
        }
        Ok(NestedSet::branch(order, new_successors))
    }

    /// An opaque handle to this node's identity, for external callers that
    /// want to memoize per-node work (e.g. "have I already processed this
    /// sub-DAG while walking a larger action graph") without depending on
    /// `NestedSet`'s own richer API. Unlike [`shallow_equals`](Self::shallow_equals),
    /// which also compares a branch node's successor slots one level deep,
    /// two `Node` handles are equal only if they point at the exact same
    /// underlying allocation (or are both the canonical empty node of the
    /// same order, or both the same bare leaf value -- those representations
    /// carry no heap allocation of their own to key an identity off of).
    pub fn to_node(&self) -> Node<E> {
        Node(self.clone())
    }

    /// The fully flattened, deduplicated element sequence, preserving the
    /// order semantics of this node's [`Order`]. Memoized: the first call
    /// on a given branch node pays the full deduplication cost; every later
    /// call (on this node, from anywhere) replays a cached bitfield.
    pub fn to_list(&self) -> Vec<E> {
        match &self.repr {
            Repr::Empty(_) => Vec::new(),
            Repr::Leaf(e) => vec![e.clone()],
            Repr::Branch(n) => n.flatten(),
        }
    }

    /// [`to_list`](Self::to_list) collected into a `HashSet`.
    pub fn to_set(&self) -> HashSet<E> {
        self.to_list().into_iter().collect()
    }

    /// The size of [`to_list`](Self::to_list) without materializing it.
    /// Shares the same memo, so calling this before or after `to_list`
    /// costs nothing extra.
    pub fn memoized_flatten_and_get_size(&self) -> usize {
        match &self.repr {
            Repr::Empty(_) => 0,
            Repr::Leaf(_) => 1,
            Repr::Branch(n) => n.size(),
        }
    }

    /// Flattens on a rayon worker thread, bounded by `timeout`.
    ///
    /// # Errors
    /// Returns [`NestedSetError::FlattenTimedOut`] if the flatten doesn't
    /// finish in time. The in-flight computation is not cancelled -- it
    /// keeps running and still populates the memo for later callers.
    pub fn to_list_with_timeout(&self, timeout: Duration) -> Result<Vec<E>, NestedSetError> {
        let (tx, rx) = mpsc::channel();
        let this = self.clone();
        rayon::spawn(move || {
            let _ = tx.send(this.to_list());
        });
        rx.recv_timeout(timeout)
            .map_err(|_| NestedSetError::FlattenTimedOut)
    }

    /// Flattens while checking `interrupt` at every node boundary, bailing
    /// out as soon as it fires.
    ///
    /// This path does not use or populate the memo: once a caller cares
    /// about interruption it generally isn't on the hot, repeated-flatten
    /// path the memo exists for, so it instead re-derives the same
    /// dedup-and-reversal composition as `to_list` with an explicit,
    /// globally-threaded seen-set.
    pub fn to_list_interruptible(&self, interrupt: &Interrupt) -> Result<Vec<E>, Interrupted> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        self.collect_interruptible(interrupt, &mut seen, &mut out)?;
        Ok(out)
    }

    fn collect_interruptible(
        &self,
        interrupt: &Interrupt,
        seen: &mut HashSet<E>,
        out: &mut Vec<E>,
    ) -> Result<(), Interrupted> {
        if interrupt.is_set() {
            return Err(Interrupted);
        }
        match &self.repr {
            Repr::Empty(_) => Ok(()),
            Repr::Leaf(e) => {
                if seen.insert(e.clone()) {
                    out.push(e.clone());
                }
                Ok(())
            }
            Repr::Branch(n) => {
                let start = out.len();
                for s in &n.successors {
                    if interrupt.is_set() {
                        return Err(Interrupted);
                    }
                    match s {
                        Successor::Leaf(e) => {
                            if seen.insert(e.clone()) {
                                out.push(e.clone());
                            }
                        }
                        Successor::Node(child) => {
                            child.collect_interruptible(interrupt, seen, out)?
                        }
                    }
                }
                if n.order.reverse_at_flatten() {
                    out[start..].reverse();
                }
                Ok(())
            }
        }
    }

    /// Like [`to_list_interruptible`](Self::to_list_interruptible), but for
    /// callers with no way to propagate an interrupted `Result` up their own
    /// call stack. Exits the process with [`crate::interrupt::INTERRUPTED_EXIT_CODE`]
    /// rather than returning on interrupt.
    pub fn to_list_or_crash(&self, interrupt: &Interrupt) -> Vec<E> {
        match self.to_list_interruptible(interrupt) {
            Ok(list) => list,
            Err(Interrupted) => {
                tracing::error!(
                    "nested set flatten interrupted in a context that cannot propagate it; exiting"
                );
                std::process::exit(crate::interrupt::INTERRUPTED_EXIT_CODE);
            }
        }
    }
}

/// An opaque handle returned by [`NestedSet::to_node`], exposing only
/// identity equality (and a consistent hash) over the node it was taken
/// from -- no flattening, no successor inspection.
#[derive(Clone)]
pub struct Node<E: Element>(NestedSet<E>);

impl<E: Element> PartialEq for Node<E> {
    fn eq(&self, other: &Self) -> bool {
        match (&self.0.repr, &other.0.repr) {
            (Repr::Empty(a), Repr::Empty(b)) => a == b,
            (Repr::Leaf(a), Repr::Leaf(b)) => a == b,
            (Repr::Branch(a), Repr::Branch(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl<E: Element> Eq for Node<E> {}

impl<E: Element> Hash for Node<E> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match &self.0.repr {
            Repr::Empty(o) => {
                0u8.hash(state);
                o.hash(state);
            }
            Repr::Leaf(e) => {
                1u8.hash(state);
                e.hash(state);
            }
            Repr::Branch(b) => {
                2u8.hash(state);
                (Arc::as_ptr(b) as usize).hash(state);
            }
        }
    }
}

fn successor_shallow_eq<E: Element>(a: &Successor<E>, b: &Successor<E>) -> bool {
    match (a, b) {
        (Successor::Leaf(a), Successor::Leaf(b)) => a == b,
        (Successor::Node(a), Successor::Node(b)) => match (&a.repr, &b.repr) {
            (Repr::Branch(a), Repr::Branch(b)) => Arc::ptr_eq(a, b),
            (Repr::Empty(a), Repr::Empty(b)) => a == b,
            (Repr::Leaf(a), Repr::Leaf(b)) => a == b,
            _ => false,
        },
        _ => false,
    }
}

fn hash_successor<E: Element>(s: &Successor<E>, h: &mut impl Hasher) {
    match s {
        Successor::Leaf(e) => {
            0u8.hash(h);
            e.hash(h);
        }
        Successor::Node(n) => {
            1u8.hash(h);
            match &n.repr {
                Repr::Branch(b) => (Arc::as_ptr(b) as usize).hash(h),
                Repr::Empty(o) => o.hash(h),
                Repr::Leaf(e) => e.hash(h),
            }
        }
    }
}

impl<E: Element> BranchNode<E> {
    fn flatten(&self) -> Vec<E> {
        match &self.memo {
            MemoSlot::NotNeeded(_) => self.flatten_no_memo(),
            MemoSlot::Lazy(cell) => {
                let memo = cell.get_or_init(|| self.compute_memo());
                self.replay(memo)
            }
        }
    }

    fn size(&self) -> usize {
        match &self.memo {
            MemoSlot::NotNeeded(_) => self.successors.len(),
            MemoSlot::Lazy(cell) => cell.get_or_init(|| self.compute_memo()).size,
        }
    }

    /// Every successor is a bare, already-deduplicated leaf (guaranteed by
    /// the builder's own dedup pass), so this is a plain clone.
    fn flatten_no_memo(&self) -> Vec<E> {
        let mut out: Vec<E> = self
            .successors
            .iter()
            .map(|s| match s {
                Successor::Leaf(e) => e.clone(),
                Successor::Node(_) => unreachable!("MemoSlot::NotNeeded implies no Node slots"),
            })
            .collect();
        if self.order.reverse_at_flatten() {
            out.reverse();
        }
        out
    }

    /// First-ever flatten of a memoized node: walks every slot, recursing
    /// into child nodes' own (independently memoized) `to_list`, deduping
    /// against a seen-set scoped to this node, and records exactly which
    /// positions of each slot's contribution survived -- not just whether
    /// the slot contributed *something*, since a transitive child can
    /// contribute some of its elements and not others depending on what
    /// earlier slots in this node already produced.
    fn compute_memo(&self) -> Memo {
        let mut seen = HashSet::new();
        let mut count = 0usize;
        let mut slots = Vec::with_capacity(self.successors.len());
        for s in &self.successors {
            match s {
                Successor::Leaf(e) => {
                    if seen.insert(e.clone()) {
                        count += 1;
                        slots.push(SlotMemo::Leaf);
                    } else {
                        slots.push(SlotMemo::None);
                    }
                }
                Successor::Node(child) => {
                    let mut keep = Vec::new();
                    let mut any = false;
                    for e in child.to_list() {
                        let is_new = seen.insert(e);
                        any |= is_new;
                        keep.push(is_new);
                    }
                    if any {
                        count += keep.iter().filter(|k| **k).count();
                        slots.push(SlotMemo::Node(keep.into_boxed_slice()));
                    } else {
                        slots.push(SlotMemo::None);
                    }
                }
            }
        }
        Memo::new(slots, count)
    }

    /// Replays a published memo with zero rehashing: skips every slot the
    /// memo says contributed nothing, and for a `Node` slot re-reads that
    /// child's own (already memoized) list, keeping only the positions the
    /// memo marked as having survived this node's dedup pass.
    fn replay(&self, memo: &Memo) -> Vec<E> {
        let mut out = Vec::with_capacity(memo.size);
        for (slot, s) in memo.slots.iter().zip(self.successors.iter()) {
            match (slot, s) {
                (SlotMemo::None, _) => {}
                (SlotMemo::Leaf, Successor::Leaf(e)) => out.push(e.clone()),
                (SlotMemo::Node(keep), Successor::Node(child)) => {
                    for (e, keep) in child.to_list().into_iter().zip(keep.iter()) {
                        if *keep {
                            out.push(e);
                        }
                    }
                }
                _ => unreachable!("Memo slot shape inconsistent with this node's successor shape"),
            }
        }
        if self.order.reverse_at_flatten() {
            out.reverse();
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::super::Builder;
    use super::*;
    use crate::order::Order;

    #[test]
    fn empty_node_is_empty_and_flattens_to_nothing() {
        let n: NestedSet<i32> = Builder::new(Order::Stable).build();
        assert!(n.is_empty());
        assert!(!n.is_singleton());
        assert_eq!(n.depth(), 0);
        assert_eq!(n.to_list(), Vec::<i32>::new());
        assert_eq!(n.memoized_flatten_and_get_size(), 0);
    }

    #[test]
    fn single_direct_element_collapses_to_singleton() {
        let n = Builder::new(Order::Stable).add(7).build();
        assert!(n.is_singleton());
        assert_eq!(n.get_single(), 7);
        assert_eq!(n.depth(), 1);
    }

    #[test]
    fn single_transitive_child_is_returned_by_identity() {
        let inner = Builder::new(Order::Stable).add(1).add(2).build();
        let outer = Builder::new(Order::Stable)
            .add_transitive(inner.clone())
            .unwrap()
            .build();
        assert!(outer.shallow_equals(&inner));
    }

    #[test]
    fn repeated_flatten_is_idempotent() {
        let inner = Builder::new(Order::Stable).add("c").add("d").build();
        let outer = Builder::new(Order::Stable)
            .add("a")
            .add("b")
            .add_transitive(inner)
            .unwrap()
            .build();
        let first = outer.to_list();
        for _ in 0..3 {
            assert_eq!(outer.to_list(), first);
        }
        assert_eq!(outer.memoized_flatten_and_get_size(), first.len());
    }

    #[test]
    fn dedup_across_overlapping_transitive_children() {
        let a = Builder::new(Order::Stable).add(1).add(2).build();
        let b = Builder::new(Order::Stable).add(2).add(3).build();
        let outer = Builder::new(Order::Stable)
            .add_transitive(a)
            .unwrap()
            .add_transitive(b)
            .unwrap()
            .build();
        let mut list = outer.to_list();
        list.sort();
        assert_eq!(list, vec![1, 2, 3]);
        assert_eq!(outer.memoized_flatten_and_get_size(), 3);
    }

    #[test]
    fn shallow_equals_is_reflexive_and_symmetric() {
        let a = Builder::new(Order::Stable).add(1).add(2).build();
        let b = Builder::new(Order::Stable).add(1).add(2).build();
        assert!(a.shallow_equals(&a));
        // Independently constructed, structurally-equal branch nodes are
        // distinct allocations: shallow_equals only compares successor
        // identity, not deep value equality across separately-built nodes.
        assert_eq!(a.shallow_equals(&b), b.shallow_equals(&a));
    }

    #[test]
    fn shallow_equals_consistent_with_shallow_hash_for_identical_node() {
        let a = Builder::new(Order::Stable).add(1).add(2).build();
        assert!(a.shallow_equals(&a));
        assert_eq!(a.shallow_hash(), a.shallow_hash());
    }

    #[test]
    fn split_if_exceeds_max_degree_preserves_flattened_list() {
        let n = Builder::new(Order::Stable)
            .add(1)
            .add(2)
            .add(3)
            .add(4)
            .add(5)
            .build();
        let original_depth = n.depth();
        let split = n.split_if_exceeds_max_degree(2).unwrap();
        assert_eq!(split.depth(), original_depth + 1);
        let mut original_list = n.to_list();
        let mut split_list = split.to_list();
        original_list.sort();
        split_list.sort();
        assert_eq!(original_list, split_list);
        for child in split.get_non_leaves() {
            assert!(child.get_leaves().len() <= 2);
        }
    }

    #[test]
    fn split_if_exceeds_max_degree_rejects_k_below_two() {
        let n = Builder::new(Order::Stable).add(1).add(2).add(3).build();
        assert!(matches!(
            n.split_if_exceeds_max_degree(1),
            Err(NestedSetError::MaxDegreeTooSmall(1))
        ));
    }

    #[test]
    fn split_if_exceeds_max_degree_is_a_no_op_under_the_limit() {
        let n = Builder::new(Order::Stable).add(1).add(2).build();
        let split = n.split_if_exceeds_max_degree(5).unwrap();
        assert!(split.shallow_equals(&n));
    }

    #[test]
    fn for_each_element_with_no_pruning_visits_every_leaf() {
        let inner = Builder::new(Order::Stable).add(1).add(2).build();
        let outer = Builder::new(Order::Stable)
            .add(0)
            .add_transitive(inner)
            .unwrap()
            .build();
        let mut visited = Vec::new();
        outer.for_each_element(|_| true, |e| visited.push(*e));
        visited.sort();
        assert_eq!(visited, vec![0, 1, 2]);
    }

    #[test]
    fn for_each_element_pruned_subtree_contributes_no_leaves() {
        let inner = Builder::new(Order::Stable).add(1).add(2).build();
        let outer = Builder::new(Order::Stable)
            .add(0)
            .add_transitive(inner)
            .unwrap()
            .build();
        let mut visited = Vec::new();
        outer.for_each_element(|node| !matches!(&node.repr, Repr::Branch(_)), |e| visited.push(*e));
        // Branch nodes are pruned, so only the direct leaf 0 is ever reached.
        assert_eq!(visited, vec![0]);
    }

    #[test]
    fn get_leaves_and_get_non_leaves_partition_successors() {
        // `inner` collapses to a singleton, so it is hoisted into a bare leaf
        // successor of `outer` just like a genuinely direct element would be
        // (spec.md's "treat its sole element as if it were a direct element"
        // hoisting rule) -- get_leaves partitions by successor shape, not by
        // how each successor originated.
        let inner = Builder::new(Order::Stable).add(1).build();
        let outer = Builder::new(Order::Stable)
            .add(0)
            .add_transitive(inner)
            .unwrap()
            .add(9)
            .build();
        let mut leaves = outer.get_leaves();
        leaves.sort();
        assert_eq!(leaves, vec![0, 1, 9]);
        assert_eq!(outer.get_non_leaves().len(), 0);
    }

    #[test]
    fn get_non_leaves_returns_an_unhoisted_transitive_branch_child() {
        let inner = Builder::new(Order::Stable).add(1).add(2).build();
        let outer = Builder::new(Order::Stable)
            .add(0)
            .add_transitive(inner.clone())
            .unwrap()
            .build();
        assert_eq!(outer.get_leaves(), vec![0]);
        let non_leaves = outer.get_non_leaves();
        assert_eq!(non_leaves.len(), 1);
        assert!(non_leaves[0].shallow_equals(&inner));
    }

    #[test]
    fn to_list_interruptible_bails_out_when_set_up_front() {
        let n = Builder::new(Order::Stable).add(1).add(2).build();
        let interrupt = Interrupt::new();
        interrupt.set();
        assert!(n.to_list_interruptible(&interrupt).is_err());
    }

    #[test]
    fn to_list_interruptible_matches_to_list_when_never_set() {
        let inner = Builder::new(Order::Stable).add(1).add(2).build();
        let outer = Builder::new(Order::Stable)
            .add(0)
            .add_transitive(inner)
            .unwrap()
            .build();
        let interrupt = Interrupt::new();
        assert_eq!(
            outer.to_list_interruptible(&interrupt).unwrap(),
            outer.to_list()
        );
    }

    #[test]
    fn to_list_with_timeout_succeeds_well_within_budget() {
        let n = Builder::new(Order::Stable).add(1).add(2).add(3).build();
        let got = n
            .to_list_with_timeout(std::time::Duration::from_secs(5))
            .unwrap();
        let mut got = got;
        got.sort();
        assert_eq!(got, vec![1, 2, 3]);
    }

    #[test]
    fn to_node_is_identity_equal_for_the_same_branch_and_unequal_for_a_structurally_identical_one() {
        let a = Builder::new(Order::Stable).add(1).add(2).build();
        let b = Builder::new(Order::Stable).add(1).add(2).build();
        assert_eq!(a.to_node(), a.clone().to_node());
        assert_ne!(a.to_node(), b.to_node());
    }

    #[test]
    fn to_node_is_value_equal_for_empty_and_singleton_nodes() {
        let e1: NestedSet<i32> = Builder::new(Order::Stable).build();
        let e2: NestedSet<i32> = Builder::new(Order::Stable).build();
        assert_eq!(e1.to_node(), e2.to_node());

        let s1 = Builder::new(Order::Stable).add(7).build();
        let s2 = Builder::new(Order::Stable).add(7).build();
        assert_eq!(s1.to_node(), s2.to_node());
    }

    #[test]
    fn to_node_survives_a_hash_set() {
        let a = Builder::new(Order::Stable).add(1).add(2).build();
        let mut seen = HashSet::new();
        assert!(seen.insert(a.to_node()));
        assert!(!seen.insert(a.to_node()));
    }
}
