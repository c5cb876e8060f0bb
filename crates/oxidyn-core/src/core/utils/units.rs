//! Internal unit system: Angstrom / kcal·mol⁻¹ / amu / picosecond.
//!
//! Velocities are Å/ps and forces are kcal/(mol·Å). The two constants below
//! bridge the energy and mechanical scales; everything else is consistent by
//! construction.

/// Boltzmann constant in kcal/(mol·K).
pub const BOLTZMANN_KCAL_MOL_K: f64 = 1.987_204_259e-3;

/// Converts kcal/(mol·Å) / amu into Å/ps².
///
/// 1 kcal/mol = 4184 J/mol, and (J/mol)/(g/mol)/Å expressed in Å/ps² gives
/// the factor 418.4.
pub const ACCEL_CONVERSION: f64 = 418.4;

/// Kinetic energy in kcal/mol for a mass in amu and a velocity in Å/ps.
#[inline]
pub fn kinetic_energy(mass: f64, velocity_sq: f64) -> f64 {
    0.5 * mass * velocity_sq / ACCEL_CONVERSION
}

/// Instantaneous temperature in Kelvin from a kinetic energy in kcal/mol and
/// a number of degrees of freedom.
#[inline]
pub fn temperature_from_kinetic(kinetic: f64, degrees_of_freedom: usize) -> f64 {
    if degrees_of_freedom == 0 {
        return 0.0;
    }
    2.0 * kinetic / (degrees_of_freedom as f64 * BOLTZMANN_KCAL_MOL_K)
}
