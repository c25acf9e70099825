// src/data/mod.rs

//! Data handed to decision callbacks and launched workflows.
//!
//! - [`TaskData`] is the per-task payload. Each callback invocation receives
//!   its own deep copy.
//! - [`DataStore`] is the workflow-wide key-value store, shared by reference
//!   and passed through to callbacks and parameter resolution unchanged.

pub mod store;
pub mod task_data;

pub use store::{DataStore, MemoryStore};
pub use task_data::TaskData;
