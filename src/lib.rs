//! Two hard-engineering cores pulled out of a build system: a scheduler
//! that races a unit of work across a local and a remote back-end with
//! clean cancellation of whichever loses, and an immutable, structurally
//! shared DAG for representing the kind of "set of sets" a build graph
//! accumulates (transitive dependencies, transitive inputs) without paying
//! to flatten it until something actually needs the flat list.
//!
//! ## Dynamic spawn execution
//!
//! [`dynamic::DynamicSpawnStrategy`] races a spawn's local and remote
//! [`dynamic::SandboxedStrategy`] implementations against each other,
//! subject to a process-wide concurrency cap, and returns whichever
//! finishes first after cooperatively cancelling the other:
//!
//! ```
//! use nested_dag_exec::config::DynamicExecutionOptions;
//! use nested_dag_exec::dynamic::{ActionExecutionContext, BareContext, DynamicSpawnStrategy, Spawn};
//! use nested_dag_exec::interrupt::Interrupt;
//! use nested_dag_exec::testing::{MockRegistry, MockSpawn, MockStrategy};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let registry = MockRegistry::new()
//!     .with_local(MockStrategy::new("local").succeeds_after(Duration::from_millis(1)))
//!     .with_remote(MockStrategy::new("remote").succeeds_after(Duration::from_millis(20)));
//!
//! let strategy = DynamicSpawnStrategy::new(
//!     Arc::new(DynamicExecutionOptions::default()),
//!     Arc::new(registry),
//!     4,
//! );
//!
//! let spawn: Arc<dyn Spawn> = Arc::new(MockSpawn::new("compile"));
//! let ctx: Arc<dyn ActionExecutionContext> = Arc::new(BareContext::new(Interrupt::new()));
//! strategy.exec(spawn, ctx).unwrap();
//! ```
//!
//! ## Nested sets
//!
//! [`nested_set::NestedSet`] is an immutable, ordered multiset built out of
//! direct elements and transitive child sets, sharing structure with its
//! inputs rather than copying them:
//!
//! ```
//! use nested_dag_exec::nested_set::Builder;
//! use nested_dag_exec::order::Order;
//!
//! let inner = Builder::new(Order::Stable).add(1).add(2).build();
//! let outer = Builder::new(Order::Stable)
//!     .add(0)
//!     .add_transitive(inner)
//!     .unwrap()
//!     .build();
//!
//! assert_eq!(outer.to_list(), vec![1, 2, 0]);
//! ```

pub mod config;
pub mod dynamic;
pub mod errors;
pub mod interrupt;
pub mod nested_set;
pub mod order;
pub mod testing;

pub use errors::{DynamicExecError, FailureCode, FailureDetail, NestedSetError};
pub use interrupt::{Interrupt, Interrupted};
pub use nested_set::{Builder, NestedSet, Node};
pub use order::Order;
