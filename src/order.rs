//! Traversal order for [`crate::nested_set::NestedSet`].
//!
//! `Order` controls two independent things about how a nested set flattens:
//! whether direct elements are visited before or after transitive successors,
//! and whether the assembled list is reversed. See the table in the crate's
//! design notes for the exact combination each variant encodes.

/// The interleaving and reversal policy used when building and flattening a
/// [`crate::nested_set::NestedSet`].
///
/// Two sets may only be unioned if they share the same `Order`; mixing orders
/// is a programming error and is rejected by [`crate::nested_set::Builder`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Order {
    /// Transitive successors first, then direct elements. No reversal.
    Stable,
    /// Same interleaving as `Stable`. Kept distinct because callers use it to
    /// tag compile-input sets even though the flattening behavior is
    /// currently identical to `Stable`.
    Compile,
    /// Direct elements first, then transitive successors. No reversal.
    NaiveLink,
    /// Transitive successors first, then direct elements, but both input
    /// collections are iterated in reverse at construction time, and the
    /// assembled list is reversed once more at flatten time.
    Link,
}

impl Order {
    /// Whether direct elements are visited before transitive successors when
    /// assembling a branch node's successor slots.
    pub const fn visit_direct_first(self) -> bool {
        matches!(self, Order::NaiveLink)
    }

    /// Whether the direct-element and transitive-successor input collections
    /// should be iterated in reverse at construction time.
    pub const fn reverse_inputs_at_construction(self) -> bool {
        matches!(self, Order::Link)
    }

    /// Whether the fully assembled, deduplicated list should be reversed once
    /// more when a node finalizes its own flattened output.
    pub const fn reverse_at_flatten(self) -> bool {
        matches!(self, Order::Link)
    }
}

#[cfg(test)]
mod tests {
    use super::Order;

    #[test]
    fn only_naive_link_visits_direct_elements_first() {
        assert!(!Order::Stable.visit_direct_first());
        assert!(!Order::Compile.visit_direct_first());
        assert!(Order::NaiveLink.visit_direct_first());
        assert!(!Order::Link.visit_direct_first());
    }

    #[test]
    fn only_link_reverses_inputs_and_the_final_list() {
        for order in [Order::Stable, Order::Compile, Order::NaiveLink] {
            assert!(!order.reverse_inputs_at_construction());
            assert!(!order.reverse_at_flatten());
        }
        assert!(Order::Link.reverse_inputs_at_construction());
        assert!(Order::Link.reverse_at_flatten());
    }
}
