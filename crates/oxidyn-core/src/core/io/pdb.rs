use crate::core::io::traits::MolecularFile;
use crate::core::models::atom::Atom;
use crate::core::models::chain::ChainType;
use crate::core::models::ids::AtomId;
use crate::core::models::residue::ResidueType;
use crate::core::models::system::MolecularSystem;
use crate::core::utils::elements;
use nalgebra::{Point3, Vector3};
use std::collections::HashMap;
use std::io::{self, BufRead, Write};
use thiserror::Error;

/// Metadata preserved across a PDB read/write round trip.
///
/// Coordinate records are fully represented by the `MolecularSystem`; the
/// remaining title-section records (HEADER, TITLE, REMARK, ...) are carried
/// verbatim so they can be replayed on output.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PdbMetadata {
    pub header_lines: Vec<String>,
}

#[derive(Debug, Error)]
pub enum PdbError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Parse error on line {line}: {kind}")]
    Parse {
        line: usize,
        kind: PdbParseErrorKind,
    },
    #[error("Inconsistent data: {0}")]
    Inconsistency(String),
    #[error("Missing required record: {0}")]
    MissingRecord(String),
}

#[derive(Debug, Error)]
pub enum PdbParseErrorKind {
    #[error("Invalid integer format in columns {columns} (value: '{value}')")]
    InvalidInt { columns: String, value: String },
    #[error("Invalid float format in columns {columns} (value: '{value}')")]
    InvalidFloat { columns: String, value: String },
    #[error("Required field in columns {columns} is empty")]
    MissingRequiredField { columns: String },
    #[error("Line is too short for ATOM/HETATM record (must cover the coordinate columns)")]
    LineTooShort,
}

fn slice_and_trim(line: &str, start: usize, end: usize) -> &str {
    line.get(start..end).unwrap_or("").trim()
}

fn parse_coord(line: &str, line_num: usize, start: usize, end: usize) -> Result<f64, PdbError> {
    let value = slice_and_trim(line, start, end);
    value.parse().map_err(|_| PdbError::Parse {
        line: line_num,
        kind: PdbParseErrorKind::InvalidFloat {
            columns: format!("{}-{}", start + 1, end),
            value: value.into(),
        },
    })
}

/// Reader/writer for the Protein Data Bank coordinate format.
///
/// Reading covers ATOM/HETATM, TER, CRYST1 (orthorhombic boxes), CONECT,
/// and the MODEL/ENDMDL bracketing of multi-model files (only the first
/// model is loaded). Writing emits a single coordinate set; multi-frame
/// trajectory output goes through [`PdbFile::write_model_frame`].
pub struct PdbFile;

impl PdbFile {
    /// Classifies the chain a residue should open based on its record type
    /// and recognized residue type.
    fn chain_type_for(record_type: &str, residue_type: Option<ResidueType>) -> ChainType {
        match residue_type {
            Some(ResidueType::Water) => ChainType::Water,
            Some(ResidueType::Ion) => ChainType::Ion,
            Some(_) => ChainType::Protein,
            None => {
                if record_type == "HETATM" {
                    ChainType::Other
                } else {
                    ChainType::Protein
                }
            }
        }
    }

    /// Formats an atom name into the 4-column PDB convention: names of
    /// single-letter elements shorter than four characters are indented by
    /// one column.
    fn format_atom_name(name: &str, element: &str) -> String {
        if name.len() >= 4 || element.len() > 1 {
            format!("{:<4}", name)
        } else {
            format!(" {:<3}", name)
        }
    }

    fn write_atom_records(
        system: &MolecularSystem,
        writer: &mut impl Write,
    ) -> Result<(), PdbError> {
        let mut serial: usize = 0;
        for (_, chain) in system.chains_iter() {
            let is_protein = chain.chain_type == ChainType::Protein;
            for &residue_id in chain.residues() {
                let residue = system.residue(residue_id).ok_or_else(|| {
                    PdbError::Inconsistency("Chain references a missing residue".into())
                })?;
                let record_type = if is_protein { "ATOM" } else { "HETATM" };
                for &atom_id in residue.atoms() {
                    let atom = system.atom(atom_id).ok_or_else(|| {
                        PdbError::Inconsistency("Residue references a missing atom".into())
                    })?;
                    serial += 1;
                    writeln!(
                        writer,
                        "{:<6}{:>5} {} {:>3} {:1}{:>4}    {:>8.3}{:>8.3}{:>8.3}{:>6.2}{:>6.2}          {:>2}",
                        record_type,
                        serial % 100_000,
                        Self::format_atom_name(&atom.name, &atom.element),
                        residue.name,
                        chain.id,
                        residue.residue_number % 10_000,
                        atom.position.x,
                        atom.position.y,
                        atom.position.z,
                        1.00,
                        0.00,
                        atom.element
                    )?;
                }
            }
            if is_protein {
                serial += 1;
                writeln!(writer, "TER   {:>5}", serial % 100_000)?;
            }
        }
        Ok(())
    }

    /// Writes one trajectory frame as a `MODEL`/`ENDMDL` block.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub fn write_model_frame(
        system: &MolecularSystem,
        model_serial: usize,
        writer: &mut impl Write,
    ) -> Result<(), PdbError> {
        writeln!(writer, "MODEL     {:>4}", model_serial)?;
        Self::write_atom_records(system, writer)?;
        writeln!(writer, "ENDMDL")?;
        Ok(())
    }

    /// Writes the CRYST1 record for an orthorhombic box.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub fn write_cryst1(
        box_lengths: &Vector3<f64>,
        writer: &mut impl Write,
    ) -> Result<(), PdbError> {
        writeln!(
            writer,
            "CRYST1{:>9.3}{:>9.3}{:>9.3}{:>7.2}{:>7.2}{:>7.2} P 1           1",
            box_lengths.x, box_lengths.y, box_lengths.z, 90.0, 90.0, 90.0
        )?;
        Ok(())
    }
}

impl MolecularFile for PdbFile {
    type Metadata = PdbMetadata;
    type Error = PdbError;

    fn read_from(
        reader: &mut impl BufRead,
    ) -> Result<(MolecularSystem, Self::Metadata), Self::Error> {
        let mut system = MolecularSystem::new();
        let mut metadata = PdbMetadata::default();
        let mut serial_to_atom: HashMap<usize, AtomId> = HashMap::new();
        let mut conect_pairs: Vec<(usize, usize)> = Vec::new();
        let mut in_first_model = true;

        for (line_idx, line_res) in reader.lines().enumerate() {
            let line = line_res?;
            let line_num = line_idx + 1;
            let record_type = slice_and_trim(&line, 0, 6);

            match record_type {
                "ATOM" | "HETATM" => {
                    if !in_first_model {
                        continue;
                    }
                    if line.len() < 54 {
                        return Err(PdbError::Parse {
                            line: line_num,
                            kind: PdbParseErrorKind::LineTooShort,
                        });
                    }

                    // Alternate locations: keep the primary conformation only.
                    let alt_loc = slice_and_trim(&line, 16, 17);
                    if !alt_loc.is_empty() && alt_loc != "A" {
                        continue;
                    }

                    let serial_str = slice_and_trim(&line, 6, 11);
                    let serial: usize = serial_str.parse().map_err(|_| PdbError::Parse {
                        line: line_num,
                        kind: PdbParseErrorKind::InvalidInt {
                            columns: "7-11".into(),
                            value: serial_str.into(),
                        },
                    })?;
                    if serial_to_atom.contains_key(&serial) {
                        return Err(PdbError::Inconsistency(format!(
                            "Duplicate atom serial: {}",
                            serial
                        )));
                    }

                    let name = slice_and_trim(&line, 12, 16);
                    if name.is_empty() {
                        return Err(PdbError::Parse {
                            line: line_num,
                            kind: PdbParseErrorKind::MissingRequiredField {
                                columns: "13-16".into(),
                            },
                        });
                    }
                    let res_name = slice_and_trim(&line, 17, 21);
                    if res_name.is_empty() {
                        return Err(PdbError::Parse {
                            line: line_num,
                            kind: PdbParseErrorKind::MissingRequiredField {
                                columns: "18-21".into(),
                            },
                        });
                    }
                    let chain_char = slice_and_trim(&line, 21, 22).chars().next().unwrap_or('A');
                    let res_seq_str = slice_and_trim(&line, 22, 26);
                    let res_seq: isize = res_seq_str.parse().map_err(|_| PdbError::Parse {
                        line: line_num,
                        kind: PdbParseErrorKind::InvalidInt {
                            columns: "23-26".into(),
                            value: res_seq_str.into(),
                        },
                    })?;

                    let x = parse_coord(&line, line_num, 30, 38)?;
                    let y = parse_coord(&line, line_num, 38, 46)?;
                    let z = parse_coord(&line, line_num, 46, 54)?;

                    let residue_type = res_name.parse::<ResidueType>().ok();
                    let chain_type = Self::chain_type_for(record_type, residue_type);
                    let chain_id = system.add_chain(chain_char, chain_type);
                    let residue_id = system
                        .add_residue(chain_id, res_seq, res_name, residue_type)
                        .expect("chain was just created");

                    let mut atom = Atom::new(name, residue_id, Point3::new(x, y, z));
                    let element_field = slice_and_trim(&line, 76, 78);
                    atom.element = if !element_field.is_empty() {
                        element_field.to_uppercase()
                    } else {
                        let is_amino = residue_type.is_some_and(|t| t.is_amino_acid());
                        elements::element_from_atom_name(name, is_amino).unwrap_or_default()
                    };

                    let atom_id = system
                        .add_atom_to_residue(residue_id, atom)
                        .expect("residue was just created");
                    serial_to_atom.insert(serial, atom_id);
                }
                "CRYST1" => {
                    let a = parse_coord(&line, line_num, 6, 15)?;
                    let b = parse_coord(&line, line_num, 15, 24)?;
                    let c = parse_coord(&line, line_num, 24, 33)?;
                    // A degenerate placeholder cell (1 1 1) means "no box".
                    if a > 1.0 && b > 1.0 && c > 1.0 {
                        system.set_periodic_box(Some(Vector3::new(a, b, c)));
                    }
                }
                "CONECT" => {
                    let parts: Vec<&str> = line[6..].split_whitespace().collect();
                    if parts.len() < 2 {
                        continue;
                    }
                    if let Ok(origin) = parts[0].parse::<usize>() {
                        for bonded in &parts[1..] {
                            if let Ok(target) = bonded.parse::<usize>() {
                                conect_pairs.push((origin.min(target), origin.max(target)));
                            }
                        }
                    }
                }
                "MODEL" => {}
                "ENDMDL" => {
                    // Only the first model carries the input coordinates.
                    in_first_model = false;
                }
                "TER" | "ANISOU" => {}
                "END" => break,
                "" => {}
                _ => metadata.header_lines.push(line),
            }
        }

        if serial_to_atom.is_empty() {
            return Err(PdbError::MissingRecord("ATOM/HETATM records".into()));
        }

        conect_pairs.sort_unstable();
        conect_pairs.dedup();
        for (serial1, serial2) in conect_pairs {
            if let (Some(&a1), Some(&a2)) =
                (serial_to_atom.get(&serial1), serial_to_atom.get(&serial2))
            {
                system.add_bond(a1, a2);
            }
        }

        Ok((system, metadata))
    }

    fn write_to(
        system: &MolecularSystem,
        metadata: &Self::Metadata,
        writer: &mut impl Write,
    ) -> Result<(), Self::Error> {
        for line in &metadata.header_lines {
            writeln!(writer, "{}", line)?;
        }
        if let Some(box_lengths) = system.periodic_box() {
            Self::write_cryst1(&box_lengths, writer)?;
        }
        Self::write_atom_records(system, writer)?;
        writeln!(writer, "END")?;
        Ok(())
    }

    fn write_system_to(
        system: &MolecularSystem,
        writer: &mut impl Write,
    ) -> Result<(), Self::Error> {
        let metadata = PdbMetadata {
            header_lines: vec!["REMARK   1 GENERATED BY OXIDYN".to_string()],
        };
        Self::write_to(system, &metadata, writer)
    }
}
