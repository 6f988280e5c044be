// src/config/mod.rs

//! Catalog and engine configuration loading.
//!
//! Responsibilities:
//! - Define the typed operation / engine data model (`model.rs`).
//! - Load catalogs and `remake.toml` from disk (`loader.rs`).
//! - Validate invariants at the trust boundary (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{find_catalog, load_catalog, load_engine_config, load_raw_catalog};
pub use model::{
    EngineConfig, EngineSettings, ModuleInfo, ModuleTable, OperationCatalog, OperationSpec,
    PromptSpec, RawCatalog, RawEngineConfig,
};
pub use validate::validate_operation;
