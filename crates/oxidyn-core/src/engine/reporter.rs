use crate::core::forcefield::term::EnergyTerm;
use crate::core::io::pdb::PdbFile;
use crate::core::models::system::MolecularSystem;
use crate::engine::error::EngineError;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Snapshot of the simulation state handed to reporters.
pub struct ReportContext<'a> {
    pub step: u64,
    pub potential: EnergyTerm,
    pub kinetic: f64,
    pub temperature: f64,
    /// The molecular system with current coordinates written back.
    pub system: &'a MolecularSystem,
}

/// A periodic output sink invoked during dynamics.
///
/// Reporters fire whenever the step count is a multiple of their interval;
/// `finalize` runs once after the last step so file-backed reporters can
/// write their trailers.
pub trait Reporter {
    fn interval(&self) -> u64;

    fn report(&mut self, context: &ReportContext) -> Result<(), EngineError>;

    fn finalize(&mut self) -> Result<(), EngineError> {
        Ok(())
    }
}

/// Writes trajectory frames as PDB `MODEL` blocks.
pub struct TrajectoryReporter {
    writer: BufWriter<File>,
    interval: u64,
    frames_written: usize,
    header_written: bool,
}

impl TrajectoryReporter {
    /// Creates the output file immediately so permission problems surface
    /// before the run starts.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created.
    pub fn create<P: AsRef<Path>>(path: P, interval: u64) -> Result<Self, EngineError> {
        let file = File::create(path)?;
        Ok(Self {
            writer: BufWriter::new(file),
            interval,
            frames_written: 0,
            header_written: false,
        })
    }

    /// Number of frames written so far.
    pub fn frames_written(&self) -> usize {
        self.frames_written
    }
}

impl Reporter for TrajectoryReporter {
    fn interval(&self) -> u64 {
        self.interval
    }

    fn report(&mut self, context: &ReportContext) -> Result<(), EngineError> {
        if !self.header_written {
            writeln!(self.writer, "REMARK   1 GENERATED BY OXIDYN")?;
            if let Some(box_lengths) = context.system.periodic_box() {
                PdbFile::write_cryst1(&box_lengths, &mut self.writer)?;
            }
            self.header_written = true;
        }
        self.frames_written += 1;
        PdbFile::write_model_frame(context.system, self.frames_written, &mut self.writer)?;
        Ok(())
    }

    fn finalize(&mut self) -> Result<(), EngineError> {
        if self.header_written {
            writeln!(self.writer, "END")?;
        }
        self.writer.flush()?;
        Ok(())
    }
}

/// Writes periodic state rows (step, potential energy, temperature) as
/// quoted CSV, the way the reference driver logs to the console.
pub struct StateDataReporter<W: Write> {
    writer: csv::Writer<W>,
    interval: u64,
    header_written: bool,
}

impl<W: Write> StateDataReporter<W> {
    pub fn new(sink: W, interval: u64) -> Self {
        let writer = csv::WriterBuilder::new()
            .quote_style(csv::QuoteStyle::Always)
            .from_writer(sink);
        Self {
            writer,
            interval,
            header_written: false,
        }
    }
}

impl StateDataReporter<std::io::Stdout> {
    /// A state reporter printing to standard output.
    pub fn to_console(interval: u64) -> Self {
        Self::new(std::io::stdout(), interval)
    }
}

impl<W: Write> Reporter for StateDataReporter<W> {
    fn interval(&self) -> u64 {
        self.interval
    }

    fn report(&mut self, context: &ReportContext) -> Result<(), EngineError> {
        if !self.header_written {
            self.writer.write_record([
                "Step",
                "Potential Energy (kcal/mol)",
                "Temperature (K)",
            ])?;
            self.header_written = true;
        }
        self.writer.write_record([
            context.step.to_string(),
            format!("{:.4}", context.potential.total()),
            format!("{:.2}", context.temperature),
        ])?;
        self.writer.flush()?;
        Ok(())
    }

    fn finalize(&mut self) -> Result<(), EngineError> {
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::atom::Atom;
    use crate::core::models::chain::ChainType;
    use crate::core::models::residue::ResidueType;
    use nalgebra::{Point3, Vector3};
    use std::sync::{Arc, Mutex};
    use tempfile::tempdir;

    fn tiny_system() -> MolecularSystem {
        let mut system = MolecularSystem::new();
        let chain = system.add_chain('W', ChainType::Water);
        let res = system
            .add_residue(chain, 1, "HOH", Some(ResidueType::Water))
            .unwrap();
        for (name, element, position) in [
            ("O", "O", Point3::new(0.0, 0.0, 0.0)),
            ("H1", "H", Point3::new(0.96, 0.0, 0.0)),
            ("H2", "H", Point3::new(-0.25, 0.93, 0.0)),
        ] {
            let mut atom = Atom::new(name, res, position);
            atom.element = element.to_string();
            system.add_atom_to_residue(res, atom).unwrap();
        }
        system.set_periodic_box(Some(Vector3::new(20.0, 20.0, 20.0)));
        system
    }

    fn context(system: &MolecularSystem, step: u64) -> ReportContext<'_> {
        ReportContext {
            step,
            potential: EnergyTerm::new(0.0, 0.0, 0.0, -1.5, -8.5),
            kinetic: 2.0,
            temperature: 297.3,
            system,
        }
    }

    #[test]
    fn trajectory_reporter_writes_model_frames_and_trailer() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("traj.pdb");
        let system = tiny_system();

        let mut reporter = TrajectoryReporter::create(&path, 10).unwrap();
        assert_eq!(reporter.interval(), 10);
        reporter.report(&context(&system, 10)).unwrap();
        reporter.report(&context(&system, 20)).unwrap();
        reporter.finalize().unwrap();
        assert_eq!(reporter.frames_written(), 2);
        drop(reporter);

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("CRYST1"));
        let model_lines = content.lines().filter(|l| l.starts_with("MODEL")).count();
        let endmdl_lines = content.lines().filter(|l| l.starts_with("ENDMDL")).count();
        assert_eq!(model_lines, 2);
        assert_eq!(endmdl_lines, 2);
        assert!(content.trim_end().ends_with("END"));
    }

    /// Shared buffer standing in for stdout.
    #[derive(Clone, Default)]
    struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuffer {
        fn write(&mut self, data: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().write(data)
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn state_data_reporter_writes_header_and_quoted_rows() {
        let buffer = SharedBuffer::default();
        let system = tiny_system();

        let mut reporter = StateDataReporter::new(buffer.clone(), 10);
        reporter.report(&context(&system, 10)).unwrap();
        reporter.report(&context(&system, 20)).unwrap();
        reporter.finalize().unwrap();

        let content = String::from_utf8(buffer.0.lock().unwrap().clone()).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(
            lines[0],
            "\"Step\",\"Potential Energy (kcal/mol)\",\"Temperature (K)\""
        );
        assert_eq!(lines[1], "\"10\",\"-10.0000\",\"297.30\"");
        assert_eq!(lines[2], "\"20\",\"-10.0000\",\"297.30\"");
    }

    #[test]
    fn state_data_header_is_written_once() {
        let buffer = SharedBuffer::default();
        let system = tiny_system();
        let mut reporter = StateDataReporter::new(buffer.clone(), 5);
        for step in [5, 10, 15] {
            reporter.report(&context(&system, step)).unwrap();
        }
        let content = String::from_utf8(buffer.0.lock().unwrap().clone()).unwrap();
        assert_eq!(content.matches("Step").count(), 1);
    }
}
