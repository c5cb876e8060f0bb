use crate::core::forcefield::potentials::COULOMB_CONSTANT;
use crate::engine::system::EwaldParams;
use nalgebra::{Point3, Vector3};

/// Reciprocal-space part of the Ewald sum for an orthorhombic box.
///
/// Accumulates forces into `forces` and returns the reciprocal energy in
/// kcal/mol. The structure factor is recomputed per k-vector; with the kmax
/// values derived from the usual error tolerance this stays cheap relative
/// to the real-space loop for the system sizes this engine targets.
pub fn reciprocal_energy_and_forces(
    positions: &[Point3<f64>],
    charges: &[f64],
    box_lengths: &Vector3<f64>,
    params: &EwaldParams,
    forces: &mut [Vector3<f64>],
) -> f64 {
    let volume = box_lengths.x * box_lengths.y * box_lengths.z;
    let prefactor = 2.0 * std::f64::consts::PI * COULOMB_CONSTANT / volume;
    let four_alpha_sq = 4.0 * params.alpha * params.alpha;
    let two_pi = 2.0 * std::f64::consts::PI;

    let mut energy = 0.0;
    for nx in -params.kmax[0]..=params.kmax[0] {
        for ny in -params.kmax[1]..=params.kmax[1] {
            for nz in -params.kmax[2]..=params.kmax[2] {
                if nx == 0 && ny == 0 && nz == 0 {
                    continue;
                }
                let k = Vector3::new(
                    two_pi * nx as f64 / box_lengths.x,
                    two_pi * ny as f64 / box_lengths.y,
                    two_pi * nz as f64 / box_lengths.z,
                );
                let k_sq = k.norm_squared();
                let weight = (-k_sq / four_alpha_sq).exp() / k_sq;

                let mut structure_re = 0.0;
                let mut structure_im = 0.0;
                for (position, charge) in positions.iter().zip(charges) {
                    let phase = k.dot(&position.coords);
                    structure_re += charge * phase.cos();
                    structure_im += charge * phase.sin();
                }

                energy +=
                    prefactor * weight * (structure_re * structure_re + structure_im * structure_im);

                for ((position, charge), force) in
                    positions.iter().zip(charges).zip(forces.iter_mut())
                {
                    let phase = k.dot(&position.coords);
                    let projection =
                        structure_re * phase.sin() - structure_im * phase.cos();
                    *force += k * (2.0 * prefactor * weight * charge * projection);
                }
            }
        }
    }
    energy
}

/// Uniform-background correction for systems with a net charge,
/// `E = -C pi Q^2 / (2 V alpha^2)`. Zero for neutral systems.
pub fn net_charge_correction(charges: &[f64], box_lengths: &Vector3<f64>, alpha: f64) -> f64 {
    let total_charge: f64 = charges.iter().sum();
    if total_charge == 0.0 {
        return 0.0;
    }
    let volume = box_lengths.x * box_lengths.y * box_lengths.z;
    -COULOMB_CONSTANT * std::f64::consts::PI * total_charge * total_charge
        / (2.0 * volume * alpha * alpha)
}
