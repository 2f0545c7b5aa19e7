//! Configuration module
//!
//! Handles loading server settings from an optional TOML file and merging
//! command line overrides.

mod settings;

pub use settings::*;
