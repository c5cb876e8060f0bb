use crate::core::forcefield::potentials;
use crate::core::forcefield::term::EnergyTerm;
use crate::core::utils::geometry::{self, minimum_image};
use crate::engine::ewald;
use crate::engine::neighbor::NeighborList;
use crate::engine::system::SimulationSystem;
use nalgebra::{Point3, Vector3};
use rayon::prelude::*;

/// Verlet-list skin in Angstroms.
const NEIGHBOR_SKIN: f64 = 2.0;
/// Pair-chunk size for the parallel nonbonded loop.
const NONBONDED_CHUNK: usize = 4096;

/// Evaluates potential energy and per-atom forces for a
/// [`SimulationSystem`].
///
/// The evaluator owns the neighbor list and therefore carries mutable state
/// between calls; everything else is read from the system definition.
pub struct ForceEvaluator<'a> {
    system: &'a SimulationSystem,
    neighbor_list: NeighborList,
}

impl<'a> ForceEvaluator<'a> {
    pub fn new(system: &'a SimulationSystem) -> Self {
        let cutoff = system.nonbonded.cutoff().unwrap_or(f64::INFINITY);
        Self {
            system,
            neighbor_list: NeighborList::new(cutoff, NEIGHBOR_SKIN),
        }
    }

    /// Computes the potential energy decomposition and forces at the given
    /// positions.
    pub fn evaluate(&mut self, positions: &[Point3<f64>]) -> (EnergyTerm, Vec<Vector3<f64>>) {
        let mut energy = EnergyTerm::default();
        let mut forces = vec![Vector3::zeros(); positions.len()];

        self.accumulate_bonds(positions, &mut energy, &mut forces);
        self.accumulate_angles(positions, &mut energy, &mut forces);
        self.accumulate_torsions(positions, &mut energy, &mut forces);
        self.accumulate_nonbonded(positions, &mut energy, &mut forces);
        self.accumulate_one_four(positions, &mut energy, &mut forces);
        if self.system.ewald.is_some() {
            self.accumulate_ewald_long_range(positions, &mut energy, &mut forces);
        }

        (energy, forces)
    }

    fn accumulate_bonds(
        &self,
        positions: &[Point3<f64>],
        energy: &mut EnergyTerm,
        forces: &mut [Vector3<f64>],
    ) {
        for bond in &self.system.bonds {
            let delta = positions[bond.j] - positions[bond.i];
            let dist = delta.norm();
            if dist < 1e-12 {
                continue;
            }
            energy.bond += potentials::harmonic_bond(dist, bond.k, bond.r0);
            let unit = delta / dist;
            let pull = potentials::harmonic_bond_deriv(dist, bond.k, bond.r0);
            forces[bond.j] -= unit * pull;
            forces[bond.i] += unit * pull;
        }
    }

    fn accumulate_angles(
        &self,
        positions: &[Point3<f64>],
        energy: &mut EnergyTerm,
        forces: &mut [Vector3<f64>],
    ) {
        for angle in &self.system.angles {
            let r_ij = positions[angle.i] - positions[angle.j];
            let r_kj = positions[angle.k_idx] - positions[angle.j];
            let len_ij = r_ij.norm();
            let len_kj = r_kj.norm();
            if len_ij < 1e-12 || len_kj < 1e-12 {
                continue;
            }
            let u = r_ij / len_ij;
            let v = r_kj / len_kj;
            let cos_theta = u.dot(&v).clamp(-1.0, 1.0);
            let sin_theta = (1.0 - cos_theta * cos_theta).sqrt().max(1e-8);
            let theta = cos_theta.acos();

            energy.angle += potentials::harmonic_angle(theta, angle.k, angle.theta0);
            let de_dtheta = potentials::harmonic_angle_deriv(theta, angle.k, angle.theta0);

            let f_i = (v - u * cos_theta) * (de_dtheta / (sin_theta * len_ij));
            let f_k = (u - v * cos_theta) * (de_dtheta / (sin_theta * len_kj));
            forces[angle.i] += f_i;
            forces[angle.k_idx] += f_k;
            forces[angle.j] -= f_i + f_k;
        }
    }

    fn accumulate_torsions(
        &self,
        positions: &[Point3<f64>],
        energy: &mut EnergyTerm,
        forces: &mut [Vector3<f64>],
    ) {
        for torsion in &self.system.torsions {
            let p_i = &positions[torsion.i];
            let p_j = &positions[torsion.j];
            let p_k = &positions[torsion.k_idx];
            let p_l = &positions[torsion.l];

            let b1 = p_j - p_i;
            let b2 = p_k - p_j;
            let b3 = p_l - p_k;
            let n1 = b1.cross(&b2);
            let n2 = b2.cross(&b3);
            let n1_sq = n1.norm_squared();
            let n2_sq = n2.norm_squared();
            let b2_len = b2.norm();
            if n1_sq < 1e-12 || n2_sq < 1e-12 || b2_len < 1e-12 {
                // Collinear geometry: the dihedral is undefined.
                continue;
            }

            let phi = geometry::dihedral(p_i, p_j, p_k, p_l);
            energy.torsion +=
                potentials::periodic_torsion(phi, torsion.k, torsion.periodicity, torsion.phase);
            let de_dphi = potentials::periodic_torsion_deriv(
                phi,
                torsion.k,
                torsion.periodicity,
                torsion.phase,
            );

            let f_i = n1 * (-de_dphi * b2_len / n1_sq);
            let f_l = n2 * (de_dphi * b2_len / n2_sq);
            let p = b1.dot(&b2) / (b2_len * b2_len);
            let q = b3.dot(&b2) / (b2_len * b2_len);
            let f_j = f_i * (p - 1.0) - f_l * q;
            let f_k = f_i * (-p) + f_l * (q - 1.0);

            forces[torsion.i] += f_i;
            forces[torsion.j] += f_j;
            forces[torsion.k_idx] += f_k;
            forces[torsion.l] += f_l;
        }
    }

    fn accumulate_nonbonded(
        &mut self,
        positions: &[Point3<f64>],
        energy: &mut EnergyTerm,
        forces: &mut [Vector3<f64>],
    ) {
        let system = self.system;
        let box_lengths = system.box_lengths;
        self.neighbor_list
            .update(positions, box_lengths.as_ref(), &system.excluded);

        let cutoff_sq = system
            .nonbonded
            .cutoff()
            .map(|c| c * c)
            .unwrap_or(f64::INFINITY);
        let alpha = system.ewald.map(|e| e.alpha);

        let chunk_results: Vec<(f64, f64, Vec<(usize, Vector3<f64>)>)> = self
            .neighbor_list
            .pairs()
            .par_chunks(NONBONDED_CHUNK)
            .map(|chunk| {
                let mut vdw = 0.0;
                let mut coulomb = 0.0;
                let mut local_forces: Vec<(usize, Vector3<f64>)> =
                    Vec::with_capacity(chunk.len() * 2);
                for &(i, j) in chunk {
                    let mut delta = positions[j] - positions[i];
                    if let Some(lengths) = &box_lengths {
                        delta = minimum_image(delta, lengths);
                    }
                    let dist_sq = delta.norm_squared();
                    if dist_sq > cutoff_sq {
                        continue;
                    }
                    let dist = dist_sq.sqrt();
                    let unit = delta / dist;

                    let mut pull = 0.0;
                    let epsilon = (system.epsilons[i] * system.epsilons[j]).sqrt();
                    if epsilon > 0.0 {
                        let sigma = 0.5 * (system.sigmas[i] + system.sigmas[j]);
                        vdw += potentials::lennard_jones_12_6(dist, sigma, epsilon);
                        pull += potentials::lennard_jones_12_6_deriv(dist, sigma, epsilon);
                    }
                    let (q_i, q_j) = (system.charges[i], system.charges[j]);
                    if q_i != 0.0 && q_j != 0.0 {
                        match alpha {
                            Some(alpha) => {
                                coulomb += potentials::ewald_real(dist, q_i, q_j, alpha);
                                pull += potentials::ewald_real_deriv(dist, q_i, q_j, alpha);
                            }
                            None => {
                                coulomb += potentials::coulomb(dist, q_i, q_j);
                                pull += potentials::coulomb_deriv(dist, q_i, q_j);
                            }
                        }
                    }
                    if pull != 0.0 {
                        local_forces.push((j, -unit * pull));
                        local_forces.push((i, unit * pull));
                    }
                }
                (vdw, coulomb, local_forces)
            })
            .collect();

        for (vdw, coulomb, local_forces) in chunk_results {
            energy.vdw += vdw;
            energy.coulomb += coulomb;
            for (index, force) in local_forces {
                forces[index] += force;
            }
        }
    }

    fn accumulate_one_four(
        &self,
        positions: &[Point3<f64>],
        energy: &mut EnergyTerm,
        forces: &mut [Vector3<f64>],
    ) {
        let system = self.system;
        for &(i, j) in &system.pairs_14 {
            let mut delta = positions[j] - positions[i];
            if let Some(lengths) = &system.box_lengths {
                delta = minimum_image(delta, lengths);
            }
            let dist = delta.norm();
            if dist < 1e-12 {
                continue;
            }
            let unit = delta / dist;
            let mut pull = 0.0;

            let epsilon = (system.epsilons[i] * system.epsilons[j]).sqrt() * system.lj14_scale;
            if epsilon > 0.0 {
                let sigma = 0.5 * (system.sigmas[i] + system.sigmas[j]);
                energy.vdw += potentials::lennard_jones_12_6(dist, sigma, epsilon);
                pull += potentials::lennard_jones_12_6_deriv(dist, sigma, epsilon);
            }
            let q_product_scale = system.coulomb14_scale;
            let (q_i, q_j) = (system.charges[i], system.charges[j]);
            if q_i != 0.0 && q_j != 0.0 {
                energy.coulomb += potentials::coulomb(dist, q_i, q_j) * q_product_scale;
                pull += potentials::coulomb_deriv(dist, q_i, q_j) * q_product_scale;
            }

            forces[j] -= unit * pull;
            forces[i] += unit * pull;
        }
    }

    /// Reciprocal, self, net-charge, and exclusion corrections of the Ewald
    /// sum. Only called when the method is PME.
    fn accumulate_ewald_long_range(
        &self,
        positions: &[Point3<f64>],
        energy: &mut EnergyTerm,
        forces: &mut [Vector3<f64>],
    ) {
        let system = self.system;
        let params = system.ewald.expect("checked by caller");
        let box_lengths = system
            .box_lengths
            .expect("PME always carries a periodic box");

        energy.coulomb += ewald::reciprocal_energy_and_forces(
            positions,
            &system.charges,
            &box_lengths,
            &params,
            forces,
        );

        for charge in &system.charges {
            energy.coulomb += potentials::ewald_self(*charge, params.alpha);
        }
        energy.coulomb += ewald::net_charge_correction(&system.charges, &box_lengths, params.alpha);

        // The reciprocal sum includes every pair; excluded pairs (1-2, 1-3,
        // and scaled 1-4) must have that contribution removed.
        for &(i, j) in &system.exclusion_pairs {
            let (q_i, q_j) = (system.charges[i], system.charges[j]);
            if q_i == 0.0 || q_j == 0.0 {
                continue;
            }
            let mut delta = positions[j] - positions[i];
            delta = minimum_image(delta, &box_lengths);
            let dist = delta.norm();
            if dist < 1e-12 {
                continue;
            }
            energy.coulomb += potentials::ewald_excluded(dist, q_i, q_j, params.alpha);
            let pull = potentials::ewald_excluded_deriv(dist, q_i, q_j, params.alpha);
            let unit = delta / dist;
            forces[j] -= unit * pull;
            forces[i] += unit * pull;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::forcefield::parameterization::Parameterizer;
    use crate::core::forcefield::params::Forcefield;
    use crate::core::models::atom::Atom;
    use crate::core::models::chain::ChainType;
    use crate::core::models::residue::ResidueType;
    use crate::core::models::system::MolecularSystem;
    use crate::engine::config::{ConstraintPolicy, NonbondedMethod};
    use std::fs;
    use tempfile::tempdir;

    const TEST_SET: &str = r#"
[globals]
coulomb14_scale = 0.8333333333
lj14_scale = 0.5

[types.OW]
mass = 15.999
sigma = 3.1655
epsilon = 0.1784

[types.HW]
mass = 1.008
sigma = 1.0
epsilon = 0.0

[types.A]
mass = 12.011
sigma = 3.4
epsilon = 0.1

[types.IP]
mass = 22.99
sigma = 2.35
epsilon = 0.0874

[types.IM]
mass = 35.45
sigma = 4.4
epsilon = 0.1

[bonds."OW-HW"]
k = 450.0
r0 = 0.9572

[bonds."A-A"]
k = 310.0
r0 = 1.526

[angles."HW-OW-HW"]
k = 55.0
theta0 = 104.52

[angles."A-A-A"]
k = 40.0
theta0 = 109.5

[[torsions."X-A-A-X"]]
k = 0.15
periodicity = 3
phase = 0.0

[templates.HOH]
atoms = [
    { name = "O", type = "OW", charge = -0.8476 },
    { name = "H1", type = "HW", charge = 0.4238 },
    { name = "H2", type = "HW", charge = 0.4238 },
]
bonds = [["O", "H1"], ["O", "H2"]]

[templates.BUT]
atoms = [
    { name = "C1", type = "A", charge = 0.1 },
    { name = "C2", type = "A", charge = -0.1 },
    { name = "C3", type = "A", charge = -0.1 },
    { name = "C4", type = "A", charge = 0.1 },
]
bonds = [["C1", "C2"], ["C2", "C3"], ["C3", "C4"]]

[templates.NA]
atoms = [{ name = "NA", type = "IP", charge = 1.0 }]

[templates.CL]
atoms = [{ name = "CL", type = "IM", charge = -1.0 }]
"#;

    fn load_forcefield() -> (Forcefield, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ff.toml");
        fs::write(&path, TEST_SET).unwrap();
        (Forcefield::load(&[path]).unwrap(), dir)
    }

    fn water_dimer() -> MolecularSystem {
        let mut system = MolecularSystem::new();
        let chain = system.add_chain('W', ChainType::Water);
        for (w, base) in [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(2.9, 0.3, 0.1),
        ]
        .iter()
        .enumerate()
        {
            let res = system
                .add_residue(chain, w as isize + 1, "HOH", Some(ResidueType::Water))
                .unwrap();
            for (name, element, offset) in [
                ("O", "O", Vector3::new(0.0, 0.0, 0.0)),
                ("H1", "H", Vector3::new(0.96, 0.05, 0.0)),
                ("H2", "H", Vector3::new(-0.25, 0.93, 0.05)),
            ] {
                let mut atom = Atom::new(name, res, base + offset);
                atom.element = element.to_string();
                system.add_atom_to_residue(res, atom).unwrap();
            }
        }
        system
    }

    fn butane_chain() -> MolecularSystem {
        let mut system = MolecularSystem::new();
        let chain = system.add_chain('L', ChainType::Other);
        let res = system.add_residue(chain, 1, "BUT", None).unwrap();
        for (name, position) in [
            ("C1", Point3::new(0.0, 0.8, 0.3)),
            ("C2", Point3::new(1.5, 0.0, 0.0)),
            ("C3", Point3::new(2.5, 1.0, 0.6)),
            ("C4", Point3::new(3.9, 0.6, 0.2)),
        ] {
            let mut atom = Atom::new(name, res, position);
            atom.element = "C".to_string();
            system.add_atom_to_residue(res, atom).unwrap();
        }
        system
    }

    fn build_sim(
        system: &mut MolecularSystem,
        ff: &Forcefield,
        nonbonded: NonbondedMethod,
    ) -> SimulationSystem {
        Parameterizer::new(ff).parameterize_system(system).unwrap();
        SimulationSystem::build(system, ff, nonbonded, ConstraintPolicy::None).unwrap()
    }

    fn assert_forces_match_numeric_gradient(sim: &SimulationSystem, tolerance: f64) {
        let mut evaluator = ForceEvaluator::new(sim);
        let base = sim.initial_positions.clone();
        let (_, forces) = evaluator.evaluate(&base);

        let h = 1e-5;
        for atom in 0..base.len() {
            for axis in 0..3 {
                let mut plus = base.clone();
                plus[atom][axis] += h;
                let mut minus = base.clone();
                minus[atom][axis] -= h;
                let e_plus = ForceEvaluator::new(sim).evaluate(&plus).0.total();
                let e_minus = ForceEvaluator::new(sim).evaluate(&minus).0.total();
                let numeric = -(e_plus - e_minus) / (2.0 * h);
                assert!(
                    (forces[atom][axis] - numeric).abs() < tolerance,
                    "atom {} axis {}: analytic {} vs numeric {}",
                    atom,
                    axis,
                    forces[atom][axis],
                    numeric
                );
            }
        }
    }

    #[test]
    fn water_dimer_energy_is_finite_and_attractive() {
        let (ff, _dir) = load_forcefield();
        let mut system = water_dimer();
        let sim = build_sim(&mut system, &ff, NonbondedMethod::NoCutoff);
        let mut evaluator = ForceEvaluator::new(&sim);

        let (energy, forces) = evaluator.evaluate(&sim.initial_positions);
        assert!(energy.is_finite());
        assert!(
            energy.coulomb < 0.0,
            "a hydrogen-bonded dimer is electrostatically attractive"
        );
        assert_eq!(forces.len(), 6);
    }

    #[test]
    fn bonded_and_nonbonded_forces_match_numeric_gradient() {
        let (ff, _dir) = load_forcefield();
        let mut system = water_dimer();
        let sim = build_sim(&mut system, &ff, NonbondedMethod::NoCutoff);
        assert_forces_match_numeric_gradient(&sim, 1e-3);
    }

    #[test]
    fn torsion_forces_match_numeric_gradient() {
        let (ff, _dir) = load_forcefield();
        let mut system = butane_chain();
        let sim = build_sim(&mut system, &ff, NonbondedMethod::NoCutoff);
        assert_eq!(sim.torsions.len(), 1);
        assert_eq!(sim.pairs_14.len(), 1);
        assert_forces_match_numeric_gradient(&sim, 1e-3);
    }

    #[test]
    fn total_forces_sum_to_zero() {
        let (ff, _dir) = load_forcefield();
        let mut system = water_dimer();
        let sim = build_sim(&mut system, &ff, NonbondedMethod::NoCutoff);
        let mut evaluator = ForceEvaluator::new(&sim);
        let (_, forces) = evaluator.evaluate(&sim.initial_positions);
        let net: Vector3<f64> = forces.iter().sum();
        assert!(net.norm() < 1e-8);
    }

    fn salt_pair(box_edge: f64) -> MolecularSystem {
        let mut system = MolecularSystem::new();
        let chain = system.add_chain('I', ChainType::Ion);
        let na = system
            .add_residue(chain, 1, "NA", Some(ResidueType::Ion))
            .unwrap();
        let mut atom = Atom::new("NA", na, Point3::new(8.0, 10.0, 10.0));
        atom.element = "NA".to_string();
        system.add_atom_to_residue(na, atom).unwrap();

        let cl = system
            .add_residue(chain, 2, "CL", Some(ResidueType::Ion))
            .unwrap();
        let mut atom = Atom::new("CL", cl, Point3::new(11.0, 10.0, 10.0));
        atom.element = "CL".to_string();
        system.add_atom_to_residue(cl, atom).unwrap();

        system.set_periodic_box(Some(Vector3::new(box_edge, box_edge, box_edge)));
        system
    }

    #[test]
    fn ewald_total_is_insensitive_to_the_splitting_parameter() {
        let (ff, _dir) = load_forcefield();

        // Different cutoffs imply different alpha/kmax splits; a correct
        // Ewald implementation returns the same total electrostatics.
        let mut system_a = salt_pair(24.0);
        let sim_a = build_sim(&mut system_a, &ff, NonbondedMethod::Pme { cutoff: 11.0 });
        let (energy_a, _) = ForceEvaluator::new(&sim_a).evaluate(&sim_a.initial_positions);

        let mut system_b = salt_pair(24.0);
        let sim_b = build_sim(&mut system_b, &ff, NonbondedMethod::Pme { cutoff: 8.0 });
        let (energy_b, _) = ForceEvaluator::new(&sim_b).evaluate(&sim_b.initial_positions);

        assert!(
            (energy_a.coulomb - energy_b.coulomb).abs() < 0.25,
            "alpha split changed the total: {} vs {}",
            energy_a.coulomb,
            energy_b.coulomb
        );
    }

    #[test]
    fn ewald_energy_approximates_direct_coulomb_in_a_large_box() {
        let (ff, _dir) = load_forcefield();
        let mut system = salt_pair(40.0);
        let sim = build_sim(&mut system, &ff, NonbondedMethod::Pme { cutoff: 12.0 });
        let (energy, _) = ForceEvaluator::new(&sim).evaluate(&sim.initial_positions);

        // Two opposite unit charges 3 Å apart; periodic images in a 40 Å box
        // perturb the bare pair energy only slightly.
        let direct = potentials::coulomb(3.0, 1.0, -1.0);
        assert!(
            (energy.coulomb - direct).abs() < 0.05 * direct.abs(),
            "ewald {} vs direct {}",
            energy.coulomb,
            direct
        );
    }

    #[test]
    fn pme_forces_match_numeric_gradient() {
        let (ff, _dir) = load_forcefield();
        let mut system = salt_pair(24.0);
        let sim = build_sim(&mut system, &ff, NonbondedMethod::Pme { cutoff: 8.0 });
        assert_forces_match_numeric_gradient(&sim, 1e-3);
    }
}
