//! Configuration loading
//!
//! Environment variables first, then a JSON or TOML file.

pub mod loader;

// Re-export commonly used items
pub use loader::{load, load_from_env, load_from_file, probe_config_paths};
