//! An immutable, structurally-shared DAG of ordered multisets with cheap
//! union and lazy, memoized flattening.
//!
//! Build one with [`Builder`], inspect it with the methods on [`NestedSet`]
//! itself, and materialize its elements with [`NestedSet::to_list`] or one
//! of its variants.

mod builder;
mod memo;
mod set;

pub use builder::Builder;
pub use set::{Element, NestedSet, Node};
