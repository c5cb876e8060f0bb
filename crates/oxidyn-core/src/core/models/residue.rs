use super::ids::{AtomId, ChainId};
use std::collections::HashMap;
use std::str::FromStr;

/// Classifies a residue by its chemical identity.
///
/// The engine mostly cares about three things: whether a residue is one of
/// the twenty standard amino acids (and which), whether it is solvent, or
/// whether it is a monatomic ion. Anything else is treated as an
/// unparameterized hetero group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResidueType {
    // --- Aliphatic, Nonpolar ---
    Alanine,
    Glycine,
    Isoleucine,
    Leucine,
    Proline,
    Valine,

    // --- Aromatic ---
    Phenylalanine,
    Tryptophan,
    Tyrosine,

    // --- Polar, Uncharged ---
    Asparagine,
    Cysteine,
    Glutamine,
    Serine,
    Threonine,
    Methionine,

    // --- Positively Charged (Basic) ---
    Arginine,
    Lysine,

    // --- Negatively Charged (Acidic) ---
    AsparticAcid,
    GlutamicAcid,

    // --- Histidine and its protonation variants ---
    Histidine,           // HIS / HIE - Epsilon-protonated state
    HistidineDelta,      // HID - Delta-protonated state
    HistidineProtonated, // HIP - Doubly-protonated, positively charged

    /// Water molecule (HOH, WAT, TIP3, SOL).
    Water,
    /// Monatomic ion (NA, CL, K, MG, ...).
    Ion,
}

impl ResidueType {
    /// Returns true for the twenty standard amino acids and their
    /// protonation variants.
    pub fn is_amino_acid(&self) -> bool {
        !matches!(self, ResidueType::Water | ResidueType::Ion)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseResidueTypeError;

impl FromStr for ResidueType {
    type Err = ParseResidueTypeError;

    /// Parses a PDB residue name into a `ResidueType`.
    ///
    /// Recognizes the standard three-letter amino acid codes, the common
    /// histidine protonation aliases, and the usual water/ion names.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "ALA" => Ok(ResidueType::Alanine),
            "GLY" => Ok(ResidueType::Glycine),
            "ILE" => Ok(ResidueType::Isoleucine),
            "LEU" => Ok(ResidueType::Leucine),
            "PRO" => Ok(ResidueType::Proline),
            "VAL" => Ok(ResidueType::Valine),
            "PHE" => Ok(ResidueType::Phenylalanine),
            "TRP" => Ok(ResidueType::Tryptophan),
            "TYR" => Ok(ResidueType::Tyrosine),
            "ASN" => Ok(ResidueType::Asparagine),
            "CYS" | "CYX" => Ok(ResidueType::Cysteine),
            "GLN" => Ok(ResidueType::Glutamine),
            "SER" => Ok(ResidueType::Serine),
            "THR" => Ok(ResidueType::Threonine),
            "MET" => Ok(ResidueType::Methionine),
            "ARG" => Ok(ResidueType::Arginine),
            "LYS" => Ok(ResidueType::Lysine),
            "ASP" => Ok(ResidueType::AsparticAcid),
            "GLU" => Ok(ResidueType::GlutamicAcid),
            "HIS" | "HIE" | "HSE" => Ok(ResidueType::Histidine),
            "HID" | "HSD" => Ok(ResidueType::HistidineDelta),
            "HIP" | "HSP" => Ok(ResidueType::HistidineProtonated),
            "HOH" | "WAT" | "TIP3" | "SOL" => Ok(ResidueType::Water),
            "NA" | "NA+" | "CL" | "CL-" | "K" | "K+" | "MG" | "CA2" | "ZN" => Ok(ResidueType::Ion),
            _ => Err(ParseResidueTypeError),
        }
    }
}

/// Represents a residue within a chain of a molecular system.
///
/// A residue groups the atoms of one amino acid, one water molecule, or one
/// hetero group, and keeps a name-to-ID map so parameterization can resolve
/// template atoms by name.
#[derive(Debug, Clone, PartialEq)]
pub struct Residue {
    /// Residue sequence number from the source file.
    pub residue_number: isize,
    /// Name of the residue (e.g., "ALA", "HOH").
    pub name: String,
    /// The chemical classification of the residue, if recognized.
    pub residue_type: Option<ResidueType>,
    /// ID of the parent chain.
    pub chain_id: ChainId,
    pub(crate) atoms: Vec<AtomId>,
    atom_name_map: HashMap<String, Vec<AtomId>>,
}

impl Residue {
    pub(crate) fn new(
        residue_number: isize,
        name: &str,
        residue_type: Option<ResidueType>,
        chain_id: ChainId,
    ) -> Self {
        Self {
            residue_number,
            name: name.to_string(),
            residue_type,
            chain_id,
            atoms: Vec::new(),
            atom_name_map: HashMap::new(),
        }
    }

    pub(crate) fn add_atom(&mut self, atom_name: &str, atom_id: AtomId) {
        self.atoms.push(atom_id);
        self.atom_name_map
            .entry(atom_name.to_string())
            .or_default()
            .push(atom_id);
    }

    /// Returns the IDs of all atoms belonging to this residue, in insertion order.
    pub fn atoms(&self) -> &[AtomId] {
        &self.atoms
    }

    /// Returns the ID of the first atom with the given name, if any.
    pub fn get_first_atom_id_by_name(&self, name: &str) -> Option<AtomId> {
        self.atom_name_map
            .get(name)
            .and_then(|ids| ids.first())
            .copied()
    }

    /// Returns the IDs of all atoms with the given name, if any.
    pub fn get_atom_ids_by_name(&self, name: &str) -> Option<&[AtomId]> {
        self.atom_name_map.get(name).map(|ids| ids.as_slice())
    }
}
