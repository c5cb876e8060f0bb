//! Built-in defaults reproducing the reference simulation protocol.

pub const INPUT_PATH: &str = "input.pdb";
pub const OUTPUT_PATH: &str = "output.pdb";
pub const FORCEFIELDS: [&str; 2] = ["amber14-all", "amber14/tip3pfb"];
pub const STEPS: u64 = 2000;
pub const TEMPERATURE_K: f64 = 300.0;
pub const FRICTION_PER_PS: f64 = 1.0;
pub const TIMESTEP_FS: f64 = 4.0;
pub const CUTOFF_NM: f64 = 1.0;
pub const REPORT_INTERVAL: u64 = 1000;
