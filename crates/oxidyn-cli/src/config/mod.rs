//! Run configuration: command-line arguments merged over an optional TOML
//! configuration file over built-in defaults.

pub mod defaults;
mod file;
mod models;

pub use models::{PartialRunConfig, RunSettings};
