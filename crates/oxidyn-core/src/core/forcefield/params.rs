use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

/// Global nonbonded settings of a parameter set.
///
/// Amber-family force fields attenuate 1-4 interactions; the divisors live
/// in the parameter files rather than in code so that other families can
/// supply their own.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
pub struct GlobalParams {
    pub coulomb14_scale: f64,
    pub lj14_scale: f64,
}

/// Per-atom-type nonbonded parameters: mass in amu, Lennard-Jones sigma in
/// Angstroms and epsilon in kcal/mol.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
pub struct AtomTypeParam {
    pub mass: f64,
    pub sigma: f64,
    pub epsilon: f64,
}

/// Harmonic bond parameters: `k` in kcal/mol/Å², `r0` in Angstroms.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
pub struct BondParam {
    pub k: f64,
    pub r0: f64,
}

/// Harmonic angle parameters: `k` in kcal/mol/rad², `theta0` in degrees.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
pub struct AngleParam {
    pub k: f64,
    pub theta0: f64,
}

/// One periodic torsion term: `k` in kcal/mol, `phase` in degrees.
///
/// A torsion key may map to several terms (a Fourier series).
#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
pub struct TorsionParam {
    pub k: f64,
    pub periodicity: u8,
    pub phase: f64,
}

/// One atom of a residue template.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct TemplateAtom {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    pub charge: f64,
}

/// A residue template: named atoms with their types and charges, the
/// intra-residue bonds, and the atoms that link consecutive residues in a
/// chain (`link_prev` bonds to the previous residue's `link_next`).
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
pub struct ResidueTemplate {
    pub atoms: Vec<TemplateAtom>,
    #[serde(default)]
    pub bonds: Vec<[String; 2]>,
    #[serde(default)]
    pub link_prev: Option<String>,
    #[serde(default)]
    pub link_next: Option<String>,
}

impl ResidueTemplate {
    /// Finds a template atom by name.
    pub fn atom(&self, name: &str) -> Option<&TemplateAtom> {
        self.atoms.iter().find(|a| a.name == name)
    }
}

/// The raw on-disk shape of one parameter-set file.
#[derive(Debug, Deserialize, Default)]
struct ParameterSet {
    globals: Option<GlobalParams>,
    #[serde(default)]
    types: HashMap<String, AtomTypeParam>,
    #[serde(default)]
    bonds: HashMap<String, BondParam>,
    #[serde(default)]
    angles: HashMap<String, AngleParam>,
    #[serde(default)]
    torsions: HashMap<String, Vec<TorsionParam>>,
    #[serde(default)]
    templates: HashMap<String, ResidueTemplate>,
}

#[derive(Debug, Error)]
pub enum ParamLoadError {
    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("TOML parsing error for '{path}': {source}")]
    Toml {
        path: String,
        source: toml::de::Error,
    },
    #[error("Malformed {kind} key '{key}' in '{path}' (expected {expected} type names joined by '-')")]
    MalformedKey {
        kind: &'static str,
        key: String,
        path: String,
        expected: usize,
    },
    #[error("No parameter set defines [globals]")]
    MissingGlobals,
}

/// A merged force field built from one or more parameter-set files.
///
/// Later files override earlier ones key-by-key, which is how a water model
/// (e.g. `amber14/tip3pfb`) layers on top of a protein force field
/// (`amber14-all`).
#[derive(Debug, Clone)]
pub struct Forcefield {
    pub globals: GlobalParams,
    pub types: HashMap<String, AtomTypeParam>,
    bonds: HashMap<(String, String), BondParam>,
    angles: HashMap<(String, String, String), AngleParam>,
    torsions: HashMap<(String, String, String, String), Vec<TorsionParam>>,
    pub templates: HashMap<String, ResidueTemplate>,
}

fn split_key<'a>(
    key: &'a str,
    kind: &'static str,
    expected: usize,
    path: &Path,
) -> Result<Vec<&'a str>, ParamLoadError> {
    let parts: Vec<&str> = key.split('-').collect();
    if parts.len() != expected || parts.iter().any(|p| p.is_empty()) {
        return Err(ParamLoadError::MalformedKey {
            kind,
            key: key.to_string(),
            path: path.to_string_lossy().to_string(),
            expected,
        });
    }
    Ok(parts)
}

impl Forcefield {
    /// Loads and merges parameter sets in order.
    ///
    /// # Errors
    ///
    /// Returns an error if any file cannot be read or parsed, if a bonded
    /// key is malformed, or if no file supplies `[globals]`.
    pub fn load<P: AsRef<Path>>(paths: &[P]) -> Result<Self, ParamLoadError> {
        let mut globals = None;
        let mut types = HashMap::new();
        let mut bonds = HashMap::new();
        let mut angles = HashMap::new();
        let mut torsions = HashMap::new();
        let mut templates = HashMap::new();

        for path in paths {
            let path = path.as_ref();
            let set = Self::load_set(path)?;

            if set.globals.is_some() {
                globals = set.globals;
            }
            types.extend(set.types);
            templates.extend(set.templates);

            for (key, param) in set.bonds {
                let parts = split_key(&key, "bond", 2, path)?;
                bonds.insert(canonical_pair(parts[0], parts[1]), param);
            }
            for (key, param) in set.angles {
                let parts = split_key(&key, "angle", 3, path)?;
                angles.insert(canonical_triplet(parts[0], parts[1], parts[2]), param);
            }
            for (key, params) in set.torsions {
                let parts = split_key(&key, "torsion", 4, path)?;
                torsions.insert(
                    canonical_quad(parts[0], parts[1], parts[2], parts[3]),
                    params,
                );
            }
        }

        Ok(Self {
            globals: globals.ok_or(ParamLoadError::MissingGlobals)?,
            types,
            bonds,
            angles,
            torsions,
            templates,
        })
    }

    fn load_set(path: &Path) -> Result<ParameterSet, ParamLoadError> {
        let content = std::fs::read_to_string(path).map_err(|e| ParamLoadError::Io {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;
        toml::from_str(&content).map_err(|e| ParamLoadError::Toml {
            path: path.to_string_lossy().to_string(),
            source: e,
        })
    }

    /// Looks up bond parameters for a pair of atom types, in either order.
    pub fn bond_param(&self, t1: &str, t2: &str) -> Option<&BondParam> {
        self.bonds.get(&canonical_pair(t1, t2))
    }

    /// Looks up angle parameters for a type triplet, in either direction.
    pub fn angle_param(&self, t1: &str, t2: &str, t3: &str) -> Option<&AngleParam> {
        self.angles.get(&canonical_triplet(t1, t2, t3))
    }

    /// Looks up the torsion Fourier series for a type quadruplet.
    ///
    /// Falls back to wildcard entries (`X-B-C-X`) when no explicit match
    /// exists, mirroring the Amber parameter-file convention.
    pub fn torsion_params(&self, t1: &str, t2: &str, t3: &str, t4: &str) -> Option<&[TorsionParam]> {
        if let Some(params) = self.torsions.get(&canonical_quad(t1, t2, t3, t4)) {
            return Some(params);
        }
        self.torsions
            .get(&canonical_quad("X", t2, t3, "X"))
            .map(|v| v.as_slice())
    }
}

fn canonical_pair(t1: &str, t2: &str) -> (String, String) {
    if t1 <= t2 {
        (t1.to_string(), t2.to_string())
    } else {
        (t2.to_string(), t1.to_string())
    }
}

fn canonical_triplet(t1: &str, t2: &str, t3: &str) -> (String, String, String) {
    if t1 <= t3 {
        (t1.to_string(), t2.to_string(), t3.to_string())
    } else {
        (t3.to_string(), t2.to_string(), t1.to_string())
    }
}

fn canonical_quad(t1: &str, t2: &str, t3: &str, t4: &str) -> (String, String, String, String) {
    if (t2, t3, t1, t4) <= (t3, t2, t4, t1) {
        (
            t1.to_string(),
            t2.to_string(),
            t3.to_string(),
            t4.to_string(),
        )
    } else {
        (
            t4.to_string(),
            t3.to_string(),
            t2.to_string(),
            t1.to_string(),
        )
    }
}
