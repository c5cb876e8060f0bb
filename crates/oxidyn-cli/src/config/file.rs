use super::models::PartialRunConfig;
use crate::error::{CliError, Result};
use std::path::Path;

impl PartialRunConfig {
    /// Loads a partial configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            CliError::Config(format!(
                "Cannot read configuration file '{}': {}",
                path.display(),
                e
            ))
        })?;
        toml::from_str(&content).map_err(|e| {
            CliError::Config(format!(
                "Malformed configuration file '{}': {}",
                path.display(),
                e
            ))
        })
    }
}
