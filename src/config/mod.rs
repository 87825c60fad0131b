//! Service Configuration Module
//!
//! Provides the shelf-compliance configuration loaded from TOML files: server
//! binding, detection provider access, reference table location, clustering
//! parameters and the finding policy.
//!
//! ## Loading Order
//!
//! 1. `SHELF_CONFIG` environment variable (path to TOML file)
//! 2. `shelf_config.toml` in the current working directory
//! 3. Built-in defaults
//!
//! ## Usage
//!
//! ```ignore
//! let config = ShelfConfig::load();
//! let params = config.engine_params();
//! ```

mod shelf_config;
pub mod defaults;

pub use shelf_config::*;
