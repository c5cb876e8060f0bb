use crate::core::forcefield::params::Forcefield;
use crate::core::models::ids::AtomId;
use crate::core::models::system::MolecularSystem;
use crate::engine::config::{ConstraintPolicy, NonbondedMethod};
use crate::engine::error::EngineError;
use nalgebra::{Point3, Vector3};
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

/// Relative error target of the Ewald splitting; sets alpha and the
/// reciprocal-space extent from the real-space cutoff.
const EWALD_ERROR_TOLERANCE: f64 = 5e-4;

/// A flexible harmonic bond term between dense atom indices.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BondTerm {
    pub i: usize,
    pub j: usize,
    pub k: f64,
    pub r0: f64,
}

/// A harmonic angle term; `theta0` is stored in radians.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AngleTerm {
    pub i: usize,
    pub j: usize,
    pub k_idx: usize,
    pub k: f64,
    pub theta0: f64,
}

/// One periodic torsion term; `phase` is stored in radians.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TorsionTerm {
    pub i: usize,
    pub j: usize,
    pub k_idx: usize,
    pub l: usize,
    pub k: f64,
    pub periodicity: u8,
    pub phase: f64,
}

/// A rigid distance constraint between two atoms.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DistanceConstraint {
    pub i: usize,
    pub j: usize,
    pub distance: f64,
}

/// Ewald splitting parameters derived from the cutoff and box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EwaldParams {
    pub alpha: f64,
    pub kmax: [i32; 3],
}

/// A molecular system flattened into the dense arrays the force loops and
/// integrator consume.
///
/// Built once per run from a parameterized [`MolecularSystem`] plus the
/// nonbonded method and constraint policy; immutable afterwards.
#[derive(Debug, Clone)]
pub struct SimulationSystem {
    /// Dense index -> originating atom ID, for writing state back.
    pub atom_ids: Vec<AtomId>,
    /// Atom names, kept for diagnostics.
    pub atom_names: Vec<String>,
    /// Positions snapshot taken at build time, in Angstroms.
    pub initial_positions: Vec<Point3<f64>>,
    pub masses: Vec<f64>,
    pub charges: Vec<f64>,
    pub sigmas: Vec<f64>,
    pub epsilons: Vec<f64>,

    pub bonds: Vec<BondTerm>,
    pub angles: Vec<AngleTerm>,
    pub torsions: Vec<TorsionTerm>,
    pub constraints: Vec<DistanceConstraint>,

    /// All excluded pairs (1-2, 1-3, and 1-4), with `i < j`.
    pub exclusion_pairs: Vec<(usize, usize)>,
    /// Per-atom view of `exclusion_pairs` for pair-list construction.
    pub excluded: Vec<HashSet<usize>>,
    /// Scaled 1-4 pairs, with `i < j`.
    pub pairs_14: Vec<(usize, usize)>,

    pub nonbonded: NonbondedMethod,
    pub coulomb14_scale: f64,
    pub lj14_scale: f64,
    pub box_lengths: Option<Vector3<f64>>,
    pub ewald: Option<EwaldParams>,
}

impl SimulationSystem {
    /// Builds a simulatable system from a parameterized molecular system.
    ///
    /// # Errors
    ///
    /// Returns an error when an atom lacks van der Waals parameters, a bond
    /// or angle lacks force-field parameters, or a periodic method is
    /// requested without a periodic box.
    pub fn build(
        system: &MolecularSystem,
        forcefield: &Forcefield,
        nonbonded: NonbondedMethod,
        constraints: ConstraintPolicy,
    ) -> Result<Self, EngineError> {
        let box_lengths = system.periodic_box();
        if nonbonded.is_periodic() && box_lengths.is_none() {
            return Err(EngineError::Initialization(
                "A periodic nonbonded method requires a periodic box (CRYST1 record)".to_string(),
            ));
        }
        if let (Some(cutoff), Some(lengths)) = (nonbonded.cutoff(), box_lengths) {
            let min_edge = lengths.x.min(lengths.y).min(lengths.z);
            if 2.0 * cutoff > min_edge {
                warn!(
                    "Cutoff {:.2} Å exceeds half the smallest box edge ({:.2} Å); minimum-image results will be inaccurate.",
                    cutoff,
                    min_edge / 2.0
                );
            }
        }

        // Dense index mapping and per-atom parameters.
        let mut atom_ids = Vec::with_capacity(system.atom_count());
        let mut atom_names = Vec::with_capacity(system.atom_count());
        let mut initial_positions = Vec::with_capacity(system.atom_count());
        let mut masses = Vec::with_capacity(system.atom_count());
        let mut charges = Vec::with_capacity(system.atom_count());
        let mut sigmas = Vec::with_capacity(system.atom_count());
        let mut epsilons = Vec::with_capacity(system.atom_count());
        let mut index_of: HashMap<AtomId, usize> = HashMap::with_capacity(system.atom_count());
        let mut is_hydrogen = Vec::with_capacity(system.atom_count());

        for (atom_id, atom) in system.atoms_iter() {
            let type_param = forcefield.types.get(&atom.force_field_type).ok_or_else(|| {
                EngineError::MissingVdwParams {
                    ff_type: atom.force_field_type.clone(),
                    atom_name: atom.name.clone(),
                }
            })?;
            index_of.insert(atom_id, atom_ids.len());
            atom_ids.push(atom_id);
            atom_names.push(atom.name.clone());
            initial_positions.push(atom.position);
            masses.push(atom.mass);
            charges.push(atom.partial_charge);
            sigmas.push(type_param.sigma);
            epsilons.push(type_param.epsilon);
            is_hydrogen.push(atom.is_hydrogen());
        }
        let num_atoms = atom_ids.len();

        let ff_type = |idx: usize| -> &str {
            let atom_id = atom_ids[idx];
            &system.atom(atom_id).unwrap().force_field_type
        };

        // Bonds: flexible terms, or rigid constraints under the H-bond policy.
        let mut bonds = Vec::new();
        let mut constraint_terms = Vec::new();
        for bond in system.bonds() {
            let i = index_of[&bond.atom1_id];
            let j = index_of[&bond.atom2_id];
            let (t1, t2) = (ff_type(i), ff_type(j));
            let param =
                forcefield
                    .bond_param(t1, t2)
                    .ok_or_else(|| EngineError::MissingBondParams {
                        type1: t1.to_string(),
                        type2: t2.to_string(),
                    })?;
            let constrain = constraints == ConstraintPolicy::HBonds
                && (is_hydrogen[i] || is_hydrogen[j]);
            if constrain {
                constraint_terms.push(DistanceConstraint {
                    i,
                    j,
                    distance: param.r0,
                });
            } else {
                bonds.push(BondTerm {
                    i,
                    j,
                    k: param.k,
                    r0: param.r0,
                });
            }
        }

        // Adjacency on dense indices (bonds and constraints both count).
        let mut adjacency: Vec<Vec<usize>> = vec![Vec::new(); num_atoms];
        for bond in system.bonds() {
            let i = index_of[&bond.atom1_id];
            let j = index_of[&bond.atom2_id];
            adjacency[i].push(j);
            adjacency[j].push(i);
        }

        // Angles: every pair of neighbors around a central atom.
        let mut angles = Vec::new();
        for center in 0..num_atoms {
            let neighbors = &adjacency[center];
            for a in 0..neighbors.len() {
                for b in (a + 1)..neighbors.len() {
                    let (i, k_idx) = (neighbors[a], neighbors[b]);
                    let (t1, t2, t3) = (ff_type(i), ff_type(center), ff_type(k_idx));
                    let param = forcefield.angle_param(t1, t2, t3).ok_or_else(|| {
                        EngineError::MissingAngleParams {
                            type1: t1.to_string(),
                            type2: t2.to_string(),
                            type3: t3.to_string(),
                        }
                    })?;
                    angles.push(AngleTerm {
                        i,
                        j: center,
                        k_idx,
                        k: param.k,
                        theta0: param.theta0.to_radians(),
                    });
                }
            }
        }

        // Proper torsions: expand around every central bond. Quadruplets
        // without parameters contribute nothing, per the Amber convention.
        let mut torsions = Vec::new();
        let mut unmatched_torsions: usize = 0;
        for bond in system.bonds() {
            let j = index_of[&bond.atom1_id];
            let k_idx = index_of[&bond.atom2_id];
            for &i in &adjacency[j] {
                if i == k_idx {
                    continue;
                }
                for &l in &adjacency[k_idx] {
                    if l == j || l == i {
                        continue;
                    }
                    let (t1, t2, t3, t4) = (ff_type(i), ff_type(j), ff_type(k_idx), ff_type(l));
                    match forcefield.torsion_params(t1, t2, t3, t4) {
                        Some(series) => {
                            for term in series {
                                torsions.push(TorsionTerm {
                                    i,
                                    j,
                                    k_idx,
                                    l,
                                    k: term.k,
                                    periodicity: term.periodicity,
                                    phase: term.phase.to_radians(),
                                });
                            }
                        }
                        None => unmatched_torsions += 1,
                    }
                }
            }
        }
        if unmatched_torsions > 0 {
            debug!(
                "{} torsion quadruplets had no parameters and were skipped.",
                unmatched_torsions
            );
        }

        // Exclusions: 1-2 and 1-3 are fully excluded; 1-4 pairs are excluded
        // from the plain loop and re-added with scaled parameters.
        let mut excluded: Vec<HashSet<usize>> = vec![HashSet::new(); num_atoms];
        let exclude = |excluded: &mut Vec<HashSet<usize>>, i: usize, j: usize| -> bool {
            if i == j {
                return false;
            }
            excluded[i].insert(j) && {
                excluded[j].insert(i);
                true
            }
        };

        for i in 0..num_atoms {
            for &j in &adjacency[i] {
                exclude(&mut excluded, i, j);
            }
        }
        let mut one_three: Vec<(usize, usize)> = Vec::new();
        for center in 0..num_atoms {
            let neighbors = &adjacency[center];
            for a in 0..neighbors.len() {
                for b in (a + 1)..neighbors.len() {
                    one_three.push((neighbors[a], neighbors[b]));
                }
            }
        }
        for (i, j) in one_three {
            exclude(&mut excluded, i, j);
        }

        let mut pairs_14 = Vec::new();
        for bond in system.bonds() {
            let j = index_of[&bond.atom1_id];
            let k_idx = index_of[&bond.atom2_id];
            for &i in &adjacency[j] {
                if i == k_idx {
                    continue;
                }
                for &l in &adjacency[k_idx] {
                    if l == j || l == i {
                        continue;
                    }
                    if exclude(&mut excluded, i, l) {
                        pairs_14.push((i.min(l), i.max(l)));
                    }
                }
            }
        }

        let mut exclusion_pairs: Vec<(usize, usize)> = Vec::new();
        for (i, set) in excluded.iter().enumerate() {
            for &j in set {
                if i < j {
                    exclusion_pairs.push((i, j));
                }
            }
        }
        exclusion_pairs.sort_unstable();

        let ewald = match nonbonded {
            NonbondedMethod::Pme { cutoff } => {
                let lengths = box_lengths.expect("periodic method checked above");
                Some(Self::derive_ewald_params(cutoff, &lengths))
            }
            _ => None,
        };

        Ok(Self {
            atom_ids,
            atom_names,
            initial_positions,
            masses,
            charges,
            sigmas,
            epsilons,
            bonds,
            angles,
            torsions,
            constraints: constraint_terms,
            exclusion_pairs,
            excluded,
            pairs_14,
            nonbonded,
            coulomb14_scale: forcefield.globals.coulomb14_scale,
            lj14_scale: forcefield.globals.lj14_scale,
            box_lengths,
            ewald,
        })
    }

    /// Splitting parameter and reciprocal extent for the requested error
    /// tolerance, following the conventional cutoff-driven derivation.
    fn derive_ewald_params(cutoff: f64, box_lengths: &Vector3<f64>) -> EwaldParams {
        let alpha = (-(2.0 * EWALD_ERROR_TOLERANCE).ln()).sqrt() / cutoff;
        let k_cut = 2.0 * alpha * (-(EWALD_ERROR_TOLERANCE).ln()).sqrt();
        let kmax = [
            (k_cut * box_lengths.x / (2.0 * std::f64::consts::PI)).ceil() as i32,
            (k_cut * box_lengths.y / (2.0 * std::f64::consts::PI)).ceil() as i32,
            (k_cut * box_lengths.z / (2.0 * std::f64::consts::PI)).ceil() as i32,
        ];
        EwaldParams { alpha, kmax }
    }

    pub fn num_atoms(&self) -> usize {
        self.atom_ids.len()
    }

    /// Kinetic degrees of freedom: three per atom minus one per constraint.
    pub fn degrees_of_freedom(&self) -> usize {
        3 * self.num_atoms() - self.constraints.len()
    }
}
