//! # OxiDyn Core Library
//!
//! A molecular dynamics library for biomolecular simulation: load a
//! structure, parameterize it with an Amber-style force field, minimize its
//! energy, and propagate Langevin dynamics with periodic trajectory and
//! state output.
//!
//! ## Architectural Philosophy
//!
//! The library is designed with a strict three-layer architecture to ensure
//! a clear separation of concerns, making it modular, testable, and
//! extensible.
//!
//! - **[`core`]: The Foundation.** Contains stateless data models
//!   (`MolecularSystem`), pure mathematical representations of the force
//!   field (`potentials`, `params`), and I/O utilities.
//!
//! - **[`engine`]: The Logic Core.** This stateful layer runs the
//!   simulation. It flattens the system into dense arrays
//!   (`SimulationSystem`), evaluates forces (pair lists, Ewald summation),
//!   and implements minimization, constrained Langevin integration, and
//!   periodic reporters.
//!
//! - **[`workflows`]: The Public API.** This is the highest-level,
//!   user-facing layer. It ties the `engine` and `core` together to execute
//!   a complete simulation run with progress reporting and wall-clock
//!   timing. It provides a simple and powerful entry point for end-users of
//!   the library.

pub mod core;
pub mod engine;
pub mod workflows;
