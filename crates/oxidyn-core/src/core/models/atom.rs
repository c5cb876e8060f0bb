use super::ids::ResidueId;
use nalgebra::Point3;
use std::str::FromStr;

/// Represents the role or classification of an atom within a molecular structure.
///
/// This enum categorizes atoms based on their functional role in the molecule,
/// which lets the engine treat solvent, solute, and ions differently when
/// building the simulatable system (e.g., rigid-water handling or
/// degrees-of-freedom accounting).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum AtomRole {
    /// Backbone atom, part of the main chain in proteins (e.g., C, N, O).
    Backbone,
    /// Sidechain atom, part of the side groups attached to the backbone.
    Sidechain,
    /// Water molecule atom, for solvent molecules in the system.
    Water,
    /// Monatomic ion (e.g., Na+, Cl-).
    Ion,
    /// Unknown or unclassified atom role.
    #[default]
    Other,
}

/// Represents an atom in a molecular system with its properties and parameters.
///
/// This struct carries the identity of an atom (name, element, parent residue)
/// together with the per-atom quantities dynamics needs: coordinates in
/// Angstroms, mass in amu, partial charge in elementary charge units, and the
/// force-field atom type assigned during parameterization.
#[derive(Debug, Clone, PartialEq)]
pub struct Atom {
    /// The name of the atom (e.g., "CA", "N", "O").
    pub name: String,
    /// The ID of the parent residue this atom belongs to.
    pub residue_id: ResidueId,
    /// The role or classification of the atom in the molecular structure.
    pub role: AtomRole,
    /// The chemical element symbol (e.g., "C", "N", "Na").
    pub element: String,
    /// The force field atom type (e.g., "CT", "N", "OW").
    pub force_field_type: String,
    /// The partial atomic charge in elementary charge units.
    pub partial_charge: f64,
    /// The atomic mass in amu (g/mol).
    pub mass: f64,
    /// The 3D coordinates of the atom in Angstroms.
    pub position: Point3<f64>,
}

impl Atom {
    /// Creates a new `Atom` with default values for most fields.
    ///
    /// The constructor initializes an atom with the provided name, residue ID,
    /// and position. Parameterization fills in the force-field type, charge,
    /// and mass afterwards.
    ///
    /// # Arguments
    ///
    /// * `name` - The name of the atom.
    /// * `residue_id` - The ID of the residue this atom belongs to.
    /// * `position` - The 3D coordinates of the atom.
    pub fn new(name: &str, residue_id: ResidueId, position: Point3<f64>) -> Self {
        Self {
            name: name.to_string(),
            residue_id,
            position,
            role: AtomRole::default(),
            element: String::new(),
            force_field_type: String::new(),
            partial_charge: 0.0,
            mass: 0.0,
        }
    }

    /// Returns true if this atom is a hydrogen.
    ///
    /// The element field takes precedence; when it is empty (e.g., before
    /// element inference) the atom name is consulted instead.
    pub fn is_hydrogen(&self) -> bool {
        if !self.element.is_empty() {
            return self.element.eq_ignore_ascii_case("H");
        }
        self.name
            .chars()
            .find(|c| c.is_ascii_alphabetic())
            .is_some_and(|c| c.eq_ignore_ascii_case(&'h'))
    }
}

impl FromStr for AtomRole {
    type Err = ();

    /// Parses a string into an `AtomRole`.
    ///
    /// Matching is case-insensitive and supports common variations
    /// (e.g., "side-chain" or "side_chain").
    ///
    /// # Errors
    ///
    /// Returns `()` if the input string does not match any known atom role.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "backbone" => Ok(AtomRole::Backbone),
            "sidechain" | "side-chain" | "side_chain" => Ok(AtomRole::Sidechain),
            "water" => Ok(AtomRole::Water),
            "ion" => Ok(AtomRole::Ion),
            "other" | "unknown" => Ok(AtomRole::Other),
            _ => Err(()),
        }
    }
}
