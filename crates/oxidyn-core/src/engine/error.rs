use crate::core::forcefield::parameterization::ParameterizationError;
use crate::core::forcefield::params::ParamLoadError;
use crate::core::io::pdb::PdbError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Initialization failed: {0}")]
    Initialization(String),

    #[error("Force field loading failed: {source}")]
    ParamLoad {
        #[from]
        source: ParamLoadError,
    },

    #[error("Parameterization failed: {source}")]
    Parameterization {
        #[from]
        source: ParameterizationError,
    },

    #[error("Missing bond parameters for types '{type1}-{type2}'")]
    MissingBondParams { type1: String, type2: String },

    #[error("Missing angle parameters for types '{type1}-{type2}-{type3}'")]
    MissingAngleParams {
        type1: String,
        type2: String,
        type3: String,
    },

    #[error("Missing van der Waals parameters for force field type '{ff_type}' (atom '{atom_name}')")]
    MissingVdwParams { ff_type: String, atom_name: String },

    #[error("Potential energy became non-finite at step {step}")]
    NumericalInstability { step: u64 },

    #[error("Constraint solver failed to converge after {iterations} iterations")]
    ConstraintConvergence { iterations: usize },

    #[error("Trajectory output failed: {source}")]
    Trajectory {
        #[from]
        source: PdbError,
    },

    #[error("State data output failed: {source}")]
    StateData {
        #[from]
        source: csv::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
