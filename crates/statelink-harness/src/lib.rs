#![forbid(unsafe_code)]

//! Test collaborators for statelink bindings.
//!
//! - [`MemoryStore`]: a [`Store`](statelink_core::Store) whose dispatches are
//!   queued and applied on [`MemoryStore::flush`], modelling a store whose
//!   commits arrive after `dispatch` returns.
//! - [`StaticHost`]: an [`EvaluationHost`](statelink_core::EvaluationHost)
//!   over a fixed resource registry, for evaluating expressions outside a
//!   binding.

pub mod host;
pub mod store;

pub use host::StaticHost;
pub use store::{DispatchRecord, MemoryStore, Reducer};
