//! Construction of a [`NestedSet`] from direct elements and transitive
//! children, per the algorithm in `SPEC_FULL.md` §4.2.

use std::collections::HashSet;

use crate::errors::NestedSetError;
use crate::order::Order;

use super::set::{Element, NestedSet, Repr, Successor};

/// Accumulates direct elements and transitive children for one
/// [`NestedSet`], then assembles them into a single node with
/// `build`.
///
/// All transitive children added to one builder must share the builder's
/// own `Order` -- mixing orders is rejected by [`Self::add_transitive`].
/// Bare elements have no order of their own, so adding them is unchecked.
pub struct Builder<E: Element> {
    order: Order,
    direct: Vec<E>,
    transitive: Vec<NestedSet<E>>,
}

impl<E: Element> Builder<E> {
    pub fn new(order: Order) -> Self {
        Self {
            order,
            direct: Vec::new(),
            transitive: Vec::new(),
        }
    }

    /// Adds one direct element.
    pub fn add(mut self, element: E) -> Self {
        self.direct.push(element);
        self
    }

    /// Adds several direct elements, in iteration order.
    pub fn add_all(mut self, elements: impl IntoIterator<Item = E>) -> Self {
        self.direct.extend(elements);
        self
    }

    /// Adds a transitive child.
    ///
    /// # Errors
    /// Returns [`NestedSetError::OrderMismatch`] if `child` carries an
    /// order different from this builder's. A child that has already
    /// collapsed to a bare singleton carries no order of its own and is
    /// always accepted.
    pub fn add_transitive(mut self, child: NestedSet<E>) -> Result<Self, NestedSetError> {
        if let Some(child_order) = child.order() {
            if child_order != self.order {
                return Err(NestedSetError::OrderMismatch);
            }
        }
        self.transitive.push(child);
        Ok(self)
    }

    /// Assembles the accumulated direct elements and transitive children
    /// into a single node.
    ///
    /// Applies, in order: the `Order`-dependent reversal of the two input
    /// collections, a direct-vs-transitive visitation order also dictated
    /// by `Order`, dedup of direct elements and hoisted transitive
    /// singletons against one shared ephemeral set, unconditional carry-
    /// through of transitive branch children (duplicates across branch
    /// boundaries are left for flatten-time pruning), and the
    /// single-successor structure-sharing collapse.
    pub fn build(self) -> NestedSet<E> {
        let Builder {
            order,
            mut direct,
            mut transitive,
        } = self;

        if order.reverse_inputs_at_construction() {
            direct.reverse();
            transitive.reverse();
        }

        let mut seen: HashSet<E> = HashSet::new();
        let mut slots: Vec<Successor<E>> = Vec::with_capacity(direct.len() + transitive.len());

        let push_direct = |seen: &mut HashSet<E>, slots: &mut Vec<Successor<E>>, direct: Vec<E>| {
            for e in direct {
                if seen.insert(e.clone()) {
                    slots.push(Successor::Leaf(e));
                }
            }
        };
        let push_transitive =
            |seen: &mut HashSet<E>, slots: &mut Vec<Successor<E>>, transitive: Vec<NestedSet<E>>| {
                for child in transitive {
                    match child.repr {
                        Repr::Empty(_) => {}
                        Repr::Leaf(e) => {
                            if seen.insert(e.clone()) {
                                slots.push(Successor::Leaf(e));
                            }
                        }
                        Repr::Branch(_) => slots.push(Successor::Node(child)),
                    }
                }
            };

        if order.visit_direct_first() {
            push_direct(&mut seen, &mut slots, direct);
            push_transitive(&mut seen, &mut slots, transitive);
        } else {
            push_transitive(&mut seen, &mut slots, transitive);
            push_direct(&mut seen, &mut slots, direct);
        }

        match slots.len() {
            0 => NestedSet::empty(order),
            1 => match slots.into_iter().next().unwrap() {
                Successor::Leaf(e) => NestedSet::leaf(e),
                Successor::Node(n) => n,
            },
            _ => NestedSet::branch(order, slots),
        }
    }
}
