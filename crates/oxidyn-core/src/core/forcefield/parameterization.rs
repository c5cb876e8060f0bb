use super::params::{Forcefield, ResidueTemplate};
use crate::core::models::{
    atom::AtomRole,
    chain::ChainType,
    ids::{AtomId, ChainId, ResidueId},
    residue::ResidueType,
    system::MolecularSystem,
};
use crate::core::utils::elements;
use thiserror::Error;
use tracing::warn;

/// Backbone atom names shared by all standard amino acid residues,
/// including terminal variants.
const BACKBONE_ATOM_NAMES: &[&str] = &[
    "N", "CA", "C", "O", "OXT", "H", "H1", "H2", "H3", "HA", "HA2", "HA3",
];

#[derive(Debug, Error, PartialEq)]
pub enum ParameterizationError {
    #[error("No residue template found for '{residue_name}' (residue {residue_number})")]
    MissingTemplate {
        residue_name: String,
        residue_number: isize,
    },
    #[error(
        "No mass available for atom '{atom_name}' of residue '{residue_name}' (unknown element '{element}')"
    )]
    MissingMass {
        residue_name: String,
        atom_name: String,
        element: String,
    },
}

/// Assigns force-field parameters to a molecular system.
///
/// Parameterization stamps every atom with its force-field type, partial
/// charge, mass, and role, and materializes the covalent topology from the
/// residue templates: intra-residue bonds plus the peptide links between
/// consecutive residues of a protein chain.
pub struct Parameterizer<'a> {
    forcefield: &'a Forcefield,
}

impl<'a> Parameterizer<'a> {
    pub fn new(forcefield: &'a Forcefield) -> Self {
        Self { forcefield }
    }

    /// Parameterizes the whole system in place.
    ///
    /// # Errors
    ///
    /// Returns an error if a recognized residue has no template, or if an
    /// atom ends up with no usable mass.
    pub fn parameterize_system(
        &self,
        system: &mut MolecularSystem,
    ) -> Result<(), ParameterizationError> {
        let chain_ids: Vec<ChainId> = system.chains_iter().map(|(id, _)| id).collect();

        let mut pending_bonds: Vec<(AtomId, AtomId)> = Vec::new();

        for chain_id in chain_ids {
            let (chain_type, residue_ids) = {
                let chain = system.chain(chain_id).unwrap();
                (chain.chain_type, chain.residues().to_vec())
            };

            let mut previous_link: Option<AtomId> = None;
            for (index, &residue_id) in residue_ids.iter().enumerate() {
                let is_first = index == 0;
                let is_last = index + 1 == residue_ids.len();

                let template = self.resolve_template(
                    system,
                    residue_id,
                    chain_type,
                    is_first,
                    is_last,
                )?;

                match template {
                    Some(template) => {
                        let template = template.clone();
                        self.apply_template(system, residue_id, &template, &mut pending_bonds)?;

                        // Peptide link: previous residue's C-side atom bonds
                        // to this residue's N-side atom.
                        if chain_type == ChainType::Protein {
                            if let (Some(prev_atom), Some(link_prev)) =
                                (previous_link, template.link_prev.as_deref())
                            {
                                if let Some(this_atom) = system
                                    .residue(residue_id)
                                    .and_then(|r| r.get_first_atom_id_by_name(link_prev))
                                {
                                    pending_bonds.push((prev_atom, this_atom));
                                }
                            }
                            previous_link = template.link_next.as_deref().and_then(|name| {
                                system
                                    .residue(residue_id)
                                    .and_then(|r| r.get_first_atom_id_by_name(name))
                            });
                        }
                    }
                    None => {
                        self.apply_element_fallback(system, residue_id)?;
                        previous_link = None;
                    }
                }
            }
        }

        for (a1, a2) in pending_bonds {
            system.add_bond(a1, a2);
        }

        Ok(())
    }

    /// Resolves the template for a residue, trying terminal variants
    /// (`N<RES>`, `C<RES>`) for the first and last residues of a protein
    /// chain before the base name.
    ///
    /// Returns `Ok(None)` for unrecognized hetero residues, which fall back
    /// to element-derived defaults.
    fn resolve_template(
        &self,
        system: &MolecularSystem,
        residue_id: ResidueId,
        chain_type: ChainType,
        is_first: bool,
        is_last: bool,
    ) -> Result<Option<&ResidueTemplate>, ParameterizationError> {
        let residue = system.residue(residue_id).unwrap();

        if chain_type == ChainType::Protein {
            if is_first {
                if let Some(t) = self.forcefield.templates.get(&format!("N{}", residue.name)) {
                    return Ok(Some(t));
                }
            }
            if is_last {
                if let Some(t) = self.forcefield.templates.get(&format!("C{}", residue.name)) {
                    return Ok(Some(t));
                }
            }
        }

        if let Some(t) = self.forcefield.templates.get(&residue.name) {
            return Ok(Some(t));
        }

        if residue.residue_type.is_some() {
            return Err(ParameterizationError::MissingTemplate {
                residue_name: residue.name.clone(),
                residue_number: residue.residue_number,
            });
        }

        warn!(
            "Residue '{}' ({}) has no template. Falling back to element defaults.",
            residue.name, residue.residue_number
        );
        Ok(None)
    }

    fn apply_template(
        &self,
        system: &mut MolecularSystem,
        residue_id: ResidueId,
        template: &ResidueTemplate,
        pending_bonds: &mut Vec<(AtomId, AtomId)>,
    ) -> Result<(), ParameterizationError> {
        let (residue_name, residue_type, atom_ids) = {
            let residue = system.residue(residue_id).unwrap();
            (
                residue.name.clone(),
                residue.residue_type,
                residue.atoms().to_vec(),
            )
        };

        for atom_id in atom_ids {
            let (atom_name, element) = {
                let atom = system.atom(atom_id).unwrap();
                (atom.name.clone(), atom.element.clone())
            };

            let role = Self::role_for(residue_type, &atom_name);
            match template.atom(&atom_name) {
                Some(template_atom) => {
                    let mass = match self.forcefield.types.get(&template_atom.type_name) {
                        Some(type_param) => type_param.mass,
                        None => Self::element_mass_or_err(&element, &residue_name, &atom_name)?,
                    };
                    let atom = system.atom_mut(atom_id).unwrap();
                    atom.role = role;
                    atom.force_field_type = template_atom.type_name.clone();
                    atom.partial_charge = template_atom.charge;
                    atom.mass = mass;
                }
                None => {
                    warn!(
                        "Atom '{}' of residue '{}' is not in its template. Falling back to element defaults.",
                        atom_name, residue_name
                    );
                    let mass = Self::element_mass_or_err(&element, &residue_name, &atom_name)?;
                    let atom = system.atom_mut(atom_id).unwrap();
                    atom.role = role;
                    atom.force_field_type = element.clone();
                    atom.partial_charge = 0.0;
                    atom.mass = mass;
                }
            }
        }

        for [name1, name2] in &template.bonds {
            let residue = system.residue(residue_id).unwrap();
            if let (Some(a1), Some(a2)) = (
                residue.get_first_atom_id_by_name(name1),
                residue.get_first_atom_id_by_name(name2),
            ) {
                pending_bonds.push((a1, a2));
            }
        }

        Ok(())
    }

    fn apply_element_fallback(
        &self,
        system: &mut MolecularSystem,
        residue_id: ResidueId,
    ) -> Result<(), ParameterizationError> {
        let (residue_name, atom_ids) = {
            let residue = system.residue(residue_id).unwrap();
            (residue.name.clone(), residue.atoms().to_vec())
        };
        for atom_id in atom_ids {
            let (atom_name, element) = {
                let atom = system.atom(atom_id).unwrap();
                (atom.name.clone(), atom.element.clone())
            };
            let mass = Self::element_mass_or_err(&element, &residue_name, &atom_name)?;
            let atom = system.atom_mut(atom_id).unwrap();
            atom.role = AtomRole::Other;
            atom.force_field_type = element.clone();
            atom.partial_charge = 0.0;
            atom.mass = mass;
        }
        Ok(())
    }

    fn element_mass_or_err(
        element: &str,
        residue_name: &str,
        atom_name: &str,
    ) -> Result<f64, ParameterizationError> {
        elements::element_mass(element).ok_or_else(|| ParameterizationError::MissingMass {
            residue_name: residue_name.to_string(),
            atom_name: atom_name.to_string(),
            element: element.to_string(),
        })
    }

    fn role_for(residue_type: Option<ResidueType>, atom_name: &str) -> AtomRole {
        match residue_type {
            Some(ResidueType::Water) => AtomRole::Water,
            Some(ResidueType::Ion) => AtomRole::Ion,
            Some(t) if t.is_amino_acid() => {
                if BACKBONE_ATOM_NAMES.contains(&atom_name) {
                    AtomRole::Backbone
                } else {
                    AtomRole::Sidechain
                }
            }
            _ => AtomRole::Other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::atom::Atom;
    use nalgebra::Point3;
    use std::fs;
    use tempfile::tempdir;

    const TEST_SET: &str = r#"
[globals]
coulomb14_scale = 0.8333333333
lj14_scale = 0.5

[types.N]
mass = 14.007
sigma = 3.25
epsilon = 0.17

[types.CT]
mass = 12.011
sigma = 3.39967
epsilon = 0.1094

[types.C]
mass = 12.011
sigma = 3.39967
epsilon = 0.086

[types.OW]
mass = 15.999
sigma = 3.1655
epsilon = 0.1784

[types.HW]
mass = 1.008
sigma = 1.0
epsilon = 0.0

[templates.GLY]
atoms = [
    { name = "N", type = "N", charge = -0.4157 },
    { name = "CA", type = "CT", charge = -0.0252 },
    { name = "C", type = "C", charge = 0.5973 },
]
bonds = [["N", "CA"], ["CA", "C"]]
link_prev = "N"
link_next = "C"

[templates.HOH]
atoms = [
    { name = "O", type = "OW", charge = -0.8476 },
    { name = "H1", type = "HW", charge = 0.4238 },
    { name = "H2", type = "HW", charge = 0.4238 },
]
bonds = [["O", "H1"], ["O", "H2"]]
"#;

    fn load_test_forcefield() -> Forcefield {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ff.toml");
        fs::write(&path, TEST_SET).unwrap();
        Forcefield::load(&[path]).unwrap()
    }

    fn build_digly_with_water() -> MolecularSystem {
        let mut system = MolecularSystem::new();
        let chain_a = system.add_chain('A', ChainType::Protein);
        for res_num in 1..=2 {
            let res = system
                .add_residue(chain_a, res_num, "GLY", Some(ResidueType::Glycine))
                .unwrap();
            for (name, element, x) in [("N", "N", 0.0), ("CA", "C", 1.4), ("C", "C", 2.5)] {
                let mut atom = Atom::new(
                    name,
                    res,
                    Point3::new(x + res_num as f64 * 4.0, 0.0, 0.0),
                );
                atom.element = element.to_string();
                system.add_atom_to_residue(res, atom).unwrap();
            }
        }

        let chain_w = system.add_chain('W', ChainType::Water);
        let hoh = system
            .add_residue(chain_w, 100, "HOH", Some(ResidueType::Water))
            .unwrap();
        for (name, element, x) in [("O", "O", 20.0), ("H1", "H", 20.8), ("H2", "H", 19.4)] {
            let mut atom = Atom::new(name, hoh, Point3::new(x, 0.0, 0.0));
            atom.element = element.to_string();
            system.add_atom_to_residue(hoh, atom).unwrap();
        }
        system
    }

    #[test]
    fn parameterize_assigns_types_charges_and_masses() {
        let ff = load_test_forcefield();
        let mut system = build_digly_with_water();
        Parameterizer::new(&ff).parameterize_system(&mut system).unwrap();

        let chain_a = system.find_chain_by_id('A').unwrap();
        let gly1 = system.find_residue_by_id(chain_a, 1).unwrap();
        let n_id = system
            .residue(gly1)
            .unwrap()
            .get_first_atom_id_by_name("N")
            .unwrap();
        let n = system.atom(n_id).unwrap();
        assert_eq!(n.force_field_type, "N");
        assert!((n.partial_charge - -0.4157).abs() < 1e-12);
        assert_eq!(n.mass, 14.007);
        assert_eq!(n.role, AtomRole::Backbone);
    }

    #[test]
    fn parameterize_builds_template_and_link_bonds() {
        let ff = load_test_forcefield();
        let mut system = build_digly_with_water();
        Parameterizer::new(&ff).parameterize_system(&mut system).unwrap();

        // 2 residues x 2 intra bonds + 1 peptide link + 2 water bonds = 7.
        assert_eq!(system.bonds().len(), 7);

        let chain_a = system.find_chain_by_id('A').unwrap();
        let gly1 = system.find_residue_by_id(chain_a, 1).unwrap();
        let gly2 = system.find_residue_by_id(chain_a, 2).unwrap();
        let c1 = system
            .residue(gly1)
            .unwrap()
            .get_first_atom_id_by_name("C")
            .unwrap();
        let n2 = system
            .residue(gly2)
            .unwrap()
            .get_first_atom_id_by_name("N")
            .unwrap();
        assert!(
            system.get_bonded_neighbors(c1).unwrap().contains(&n2),
            "peptide bond must link C(i) to N(i+1)"
        );
    }

    #[test]
    fn parameterize_assigns_water_roles() {
        let ff = load_test_forcefield();
        let mut system = build_digly_with_water();
        Parameterizer::new(&ff).parameterize_system(&mut system).unwrap();

        assert_eq!(system.water_atoms().count(), 3);
        let o_id = system
            .water_atoms()
            .find(|(_, a)| a.name == "O")
            .map(|(id, _)| id)
            .unwrap();
        let o = system.atom(o_id).unwrap();
        assert_eq!(o.force_field_type, "OW");
        assert!((o.partial_charge - -0.8476).abs() < 1e-12);
    }

    #[test]
    fn parameterize_fails_for_recognized_residue_without_template() {
        let ff = load_test_forcefield();
        let mut system = MolecularSystem::new();
        let chain = system.add_chain('A', ChainType::Protein);
        let ala = system
            .add_residue(chain, 1, "ALA", Some(ResidueType::Alanine))
            .unwrap();
        let mut atom = Atom::new("CA", ala, Point3::origin());
        atom.element = "C".to_string();
        system.add_atom_to_residue(ala, atom).unwrap();

        let result = Parameterizer::new(&ff).parameterize_system(&mut system);
        assert_eq!(
            result,
            Err(ParameterizationError::MissingTemplate {
                residue_name: "ALA".to_string(),
                residue_number: 1,
            })
        );
    }

    #[test]
    fn unknown_hetero_residue_falls_back_to_element_defaults() {
        let ff = load_test_forcefield();
        let mut system = MolecularSystem::new();
        let chain = system.add_chain('L', ChainType::Other);
        let lig = system.add_residue(chain, 1, "LIG", None).unwrap();
        let mut atom = Atom::new("C1", lig, Point3::origin());
        atom.element = "C".to_string();
        let c1 = system.add_atom_to_residue(lig, atom).unwrap();

        Parameterizer::new(&ff).parameterize_system(&mut system).unwrap();
        let c1 = system.atom(c1).unwrap();
        assert_eq!(c1.role, AtomRole::Other);
        assert_eq!(c1.force_field_type, "C");
        assert_eq!(c1.partial_charge, 0.0);
        assert_eq!(c1.mass, 12.011);
    }

    #[test]
    fn unknown_element_without_template_mass_is_an_error() {
        let ff = load_test_forcefield();
        let mut system = MolecularSystem::new();
        let chain = system.add_chain('L', ChainType::Other);
        let lig = system.add_residue(chain, 1, "LIG", None).unwrap();
        let mut atom = Atom::new("Q1", lig, Point3::origin());
        atom.element = "Q".to_string();
        system.add_atom_to_residue(lig, atom).unwrap();

        let result = Parameterizer::new(&ff).parameterize_system(&mut system);
        assert!(matches!(
            result,
            Err(ParameterizationError::MissingMass { .. })
        ));
    }
}
