use phf::phf_map;

/// Standard atomic masses in amu, keyed by element symbol.
///
/// Covers the elements that occur in protein/solvent systems plus the
/// common counterions. Used as a fallback when a force-field atom type
/// does not supply a mass.
static ELEMENT_MASSES: phf::Map<&'static str, f64> = phf_map! {
    "H" => 1.008,
    "C" => 12.011,
    "N" => 14.007,
    "O" => 15.999,
    "S" => 32.06,
    "P" => 30.974,
    "F" => 18.998,
    "NA" => 22.990,
    "MG" => 24.305,
    "CL" => 35.45,
    "K" => 39.098,
    "CA" => 40.078,
    "ZN" => 65.38,
    "FE" => 55.845,
    "BR" => 79.904,
    "I" => 126.904,
};

/// Returns the standard atomic mass for an element symbol, if known.
pub fn element_mass(symbol: &str) -> Option<f64> {
    ELEMENT_MASSES
        .get(symbol.to_ascii_uppercase().as_str())
        .copied()
}

/// Infers an element symbol from a PDB atom name.
///
/// PDB atom names encode the element in their leading alphabetic characters
/// (possibly after a digit, as in "1HB"). Two-letter elements are only
/// assumed when the two-letter prefix is a known symbol and the one-letter
/// prefix is not a better match for organic atoms, which keeps "CA" (an
/// alpha-carbon) from being read as calcium inside amino acids.
pub fn element_from_atom_name(name: &str, residue_is_amino_acid: bool) -> Option<String> {
    let trimmed: String = name
        .trim()
        .chars()
        .skip_while(|c| c.is_ascii_digit())
        .collect();
    if trimmed.is_empty() {
        return None;
    }

    let first: String = trimmed.chars().take(1).collect::<String>().to_uppercase();
    if residue_is_amino_acid {
        if ELEMENT_MASSES.contains_key(first.as_str()) {
            return Some(first);
        }
        return None;
    }

    let two: String = trimmed.chars().take(2).collect::<String>().to_uppercase();
    if trimmed.len() >= 2 && ELEMENT_MASSES.contains_key(two.as_str()) {
        return Some(two);
    }
    if ELEMENT_MASSES.contains_key(first.as_str()) {
        return Some(first);
    }
    None
}
