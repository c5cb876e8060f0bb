//! # Workflows Module
//!
//! High-level entry points that tie the `core` and `engine` layers together
//! into complete procedures. Each workflow handles resource loading,
//! parameter validation, progress reporting, and result organization.
//!
//! - **Simulation Workflow** ([`simulate`]) - Parameterize, minimize, and run
//!   dynamics on a structure, with timing and energy bookkeeping.

pub mod simulate;
