use super::ids::ResidueId;
use std::fmt;
use std::str::FromStr;

/// Classifies a chain by the kind of molecules it holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChainType {
    Protein,
    Water,
    Ion,
    Other,
}

impl FromStr for ChainType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "protein" => Ok(ChainType::Protein),
            "water" | "solvent" => Ok(ChainType::Water),
            "ion" => Ok(ChainType::Ion),
            _ => Ok(ChainType::Other),
        }
    }
}

impl fmt::Display for ChainType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                ChainType::Protein => "Protein",
                ChainType::Water => "Water",
                ChainType::Ion => "Ion",
                ChainType::Other => "Other",
            }
        )
    }
}

/// Represents a chain of residues in a molecular system.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chain {
    /// Chain identifier from the source file (e.g., 'A', 'B').
    pub id: char,
    /// Type of the chain.
    pub chain_type: ChainType,
    /// Ordered list of residue IDs belonging to this chain.
    pub(crate) residues: Vec<ResidueId>,
}

impl Chain {
    pub(crate) fn new(id: char, chain_type: ChainType) -> Self {
        Self {
            id,
            chain_type,
            residues: Vec::new(),
        }
    }

    /// Returns the ordered residues of this chain.
    pub fn residues(&self) -> &[ResidueId] {
        &self.residues
    }
}
