// src/context/mod.rs

//! Execution context construction and placeholder resolution.
//!
//! - [`placeholders`] is the pure `{{dotted.path}}` resolver.
//! - [`execution`] assembles the per-run context map from engine config,
//!   module metadata and the module-local override file.

pub mod execution;
pub mod placeholders;

pub use execution::{ExecutionContext, OverrideWarning, deep_merge, load_module_overrides};
pub use placeholders::{has_placeholders, lookup, resolve, resolve_str, value_to_string};
