//! Storage infrastructure: configuration file persistence.
//!
//! The `config` sub-module reads `mouhid.toml` from the platform config
//! directory (or an explicit path), falls back to defaults when the file does
//! not exist yet, and writes it back as pretty TOML.

pub mod config;
