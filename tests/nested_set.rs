use std::collections::HashSet;

use nested_dag_exec::nested_set::Builder;
use nested_dag_exec::order::Order;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct Artifact(String);

fn artifact(name: &str) -> Artifact {
    Artifact(name.to_string())
}

#[test]
fn compile_inputs_accumulate_across_a_small_dependency_chain() {
    // Mirrors how a build graph actually uses this type: each target's
    // nested set is built from its own direct outputs plus its
    // dependencies' already-built transitive sets.
    let leaf_a = Builder::new(Order::Compile).add(artifact("a.h")).build();
    let leaf_b = Builder::new(Order::Compile).add(artifact("b.h")).build();

    let mid = Builder::new(Order::Compile)
        .add(artifact("mid.h"))
        .add_transitive(leaf_a)
        .unwrap()
        .add_transitive(leaf_b)
        .unwrap()
        .build();

    let top = Builder::new(Order::Compile)
        .add(artifact("top.h"))
        .add_transitive(mid)
        .unwrap()
        .build();

    let list = top.to_list();
    let set: HashSet<_> = list.iter().cloned().collect();
    assert_eq!(list.len(), set.len(), "every element must appear exactly once");
    assert_eq!(
        set,
        HashSet::from([
            artifact("a.h"),
            artifact("b.h"),
            artifact("mid.h"),
            artifact("top.h"),
        ])
    );
    assert_eq!(top.memoized_flatten_and_get_size(), list.len());
}

#[test]
fn to_list_length_always_matches_memoized_size_across_orders() {
    for order in [Order::Stable, Order::Compile, Order::NaiveLink, Order::Link] {
        let inner = Builder::new(order).add(1).add(2).add(3).build();
        let outer = Builder::new(order)
            .add(4)
            .add_transitive(inner)
            .unwrap()
            .add(2) // overlaps with a transitive element
            .build();
        assert_eq!(outer.to_list().len(), outer.memoized_flatten_and_get_size());
    }
}

#[test]
fn repeated_to_list_calls_on_a_shared_node_are_identical() {
    let inner = Builder::new(Order::Stable).add("x").add("y").build();
    let outer = Builder::new(Order::Stable)
        .add("z")
        .add_transitive(inner)
        .unwrap()
        .build();

    let first = outer.to_list();
    let second = outer.to_list();
    let third = outer.to_list();
    assert_eq!(first, second);
    assert_eq!(second, third);
}

#[test]
fn union_of_two_overlapping_branches_dedups_only_at_flatten_time() {
    let a = Builder::new(Order::Stable).add(1).add(2).build();
    let b = Builder::new(Order::Stable).add(2).add(3).build();

    // Both transitive children are carried through construction unpruned
    // (spec: "duplicate transitive subgraphs are not eliminated at
    // construction"); the two successor slots both still reference their
    // own branch node.
    let union = Builder::new(Order::Stable)
        .add_transitive(a.clone())
        .unwrap()
        .add_transitive(b.clone())
        .unwrap()
        .build();
    assert_eq!(union.get_non_leaves().len(), 2);

    let mut list = union.to_list();
    list.sort();
    assert_eq!(list, vec![1, 2, 3]);
}

#[test]
fn split_if_exceeds_max_degree_is_recursively_stable_under_repeated_splitting() {
    let n = Builder::new(Order::Stable)
        .add_all(1..=9)
        .build();
    let mut original = n.to_list();
    original.sort();

    let split = n.split_if_exceeds_max_degree(3).unwrap();
    let mut split_list = split.to_list();
    split_list.sort();
    assert_eq!(original, split_list);

    for child in split.get_non_leaves() {
        assert!(child.get_leaves().len() <= 3);
    }

    // Splitting again with a larger degree than the node already satisfies
    // is a no-op.
    let unchanged = split.split_if_exceeds_max_degree(9).unwrap();
    assert!(unchanged.shallow_equals(&split));
}

#[test]
fn depth_reflects_the_longest_chain_to_a_leaf() {
    let leaf = Builder::new(Order::Stable).add(1).build();
    assert_eq!(leaf.depth(), 1);

    let branch = Builder::new(Order::Stable).add(1).add(2).build();
    assert_eq!(branch.depth(), 1);

    let nested = Builder::new(Order::Stable)
        .add(3)
        .add_transitive(branch)
        .unwrap()
        .build();
    assert_eq!(nested.depth(), 2);
}

#[test]
fn to_set_matches_to_list_contents() {
    let inner = Builder::new(Order::Stable).add(1).add(2).build();
    let outer = Builder::new(Order::Stable)
        .add(2)
        .add(3)
        .add_transitive(inner)
        .unwrap()
        .build();
    let list = outer.to_list();
    let set = outer.to_set();
    assert_eq!(list.len(), set.len());
    assert_eq!(list.into_iter().collect::<HashSet<_>>(), set);
}
