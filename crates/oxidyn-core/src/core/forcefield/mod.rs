//! # Force Field Module
//!
//! This module provides the molecular mechanics force field machinery:
//! parameter sets, the pure potential functions they feed, and the
//! parameterization pass that stamps a [`crate::core::models::system::MolecularSystem`]
//! with per-atom types, charges, and masses.
//!
//! ## Key Components
//!
//! - [`params`] - Parameter-set files (atom types, bonded tables, residue templates)
//! - [`potentials`] - Potential energy functions and their analytic derivatives
//! - [`term`] - Energy decomposition and aggregation
//! - [`parameterization`] - Automatic assignment of force-field parameters to atoms
//!
//! The energy model is Amber-shaped: harmonic bonds and angles, periodic
//! torsion Fourier series with wildcard fallbacks, Lennard-Jones 12-6 with
//! Lorentz-Berthelot mixing, fixed point charges, and scaled 1-4
//! interactions.

pub mod parameterization;
pub mod params;
pub mod potentials;
pub mod term;
