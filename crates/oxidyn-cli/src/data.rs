use crate::error::{CliError, Result};
use std::path::{Path, PathBuf};

const DATA_DIR_ENV: &str = "OXIDYN_DATA_DIR";
const DEFAULT_DATA_DIR: &str = "data";

/// Resolves logical force-field names against the local data directory.
///
/// A parameter-set argument is either a literal path to a `.toml` file, or
/// a logical name like `amber14-all` or `amber14/tip3pfb` that maps to
/// `<data_dir>/<name>.toml`.
#[derive(Debug, Clone)]
pub struct DataResolver {
    data_dir: PathBuf,
}

impl DataResolver {
    /// Picks the data directory: an explicit override wins, then
    /// `$OXIDYN_DATA_DIR`, then `./data`.
    pub fn new(override_dir: Option<PathBuf>) -> Self {
        let data_dir = override_dir
            .or_else(|| std::env::var_os(DATA_DIR_ENV).map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));
        Self { data_dir }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Resolves one parameter-set argument to a file path.
    ///
    /// # Errors
    ///
    /// Returns a data error naming both interpretations when neither the
    /// literal path nor the resolved name exists.
    pub fn resolve(&self, name_or_path: &str) -> Result<PathBuf> {
        let literal = PathBuf::from(name_or_path);
        if literal.extension().is_some_and(|ext| ext == "toml") {
            if literal.is_file() {
                return Ok(literal);
            }
            return Err(CliError::Data(format!(
                "Parameter file '{}' does not exist",
                literal.display()
            )));
        }

        let resolved = self.data_dir.join(format!("{}.toml", name_or_path));
        if resolved.is_file() {
            return Ok(resolved);
        }
        Err(CliError::Data(format!(
            "Unknown force field '{}': no file at '{}'. Set --data-dir or {} to the directory holding your parameter sets.",
            name_or_path,
            resolved.display(),
            DATA_DIR_ENV
        )))
    }

    /// Lists the logical names of every parameter set under the data
    /// directory, recursively.
    ///
    /// # Errors
    ///
    /// Returns a data error if the directory cannot be read.
    pub fn list_sets(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        self.collect_sets(&self.data_dir.clone(), &mut names)?;
        names.sort();
        Ok(names)
    }

    fn collect_sets(&self, dir: &Path, names: &mut Vec<String>) -> Result<()> {
        let entries = std::fs::read_dir(dir).map_err(|e| {
            CliError::Data(format!(
                "Cannot read data directory '{}': {}",
                dir.display(),
                e
            ))
        })?;
        for entry in entries {
            let entry = entry.map_err(CliError::Io)?;
            let path = entry.path();
            if path.is_dir() {
                self.collect_sets(&path, names)?;
            } else if path.extension().is_some_and(|ext| ext == "toml") {
                if let Ok(relative) = path.strip_prefix(&self.data_dir) {
                    let name = relative.with_extension("");
                    names.push(name.to_string_lossy().replace('\\', "/"));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn explicit_toml_paths_pass_through() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        fs::write(&path, "[globals]").unwrap();

        let resolver = DataResolver::new(Some(dir.path().to_path_buf()));
        let resolved = resolver.resolve(path.to_str().unwrap()).unwrap();
        assert_eq!(resolved, path);
    }

    #[test]
    fn missing_explicit_path_is_a_data_error() {
        let dir = tempdir().unwrap();
        let resolver = DataResolver::new(Some(dir.path().to_path_buf()));
        let result = resolver.resolve("/nope/missing.toml");
        assert!(matches!(result, Err(CliError::Data(_))));
    }

    #[test]
    fn logical_names_resolve_inside_the_data_dir() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("amber14-all.toml"), "[globals]").unwrap();
        fs::create_dir(dir.path().join("amber14")).unwrap();
        fs::write(dir.path().join("amber14/tip3pfb.toml"), "[globals]").unwrap();

        let resolver = DataResolver::new(Some(dir.path().to_path_buf()));
        assert_eq!(
            resolver.resolve("amber14-all").unwrap(),
            dir.path().join("amber14-all.toml")
        );
        assert_eq!(
            resolver.resolve("amber14/tip3pfb").unwrap(),
            dir.path().join("amber14/tip3pfb.toml")
        );
    }

    #[test]
    fn unknown_logical_name_mentions_the_data_dir() {
        let dir = tempdir().unwrap();
        let resolver = DataResolver::new(Some(dir.path().to_path_buf()));
        let error = resolver.resolve("charmm36").unwrap_err();
        let message = error.to_string();
        assert!(message.contains("charmm36"));
        assert!(message.contains("charmm36.toml"));
    }

    #[test]
    fn list_sets_returns_logical_names() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("amber14-all.toml"), "").unwrap();
        fs::create_dir(dir.path().join("amber14")).unwrap();
        fs::write(dir.path().join("amber14/tip3pfb.toml"), "").unwrap();
        fs::write(dir.path().join("notes.txt"), "").unwrap();

        let resolver = DataResolver::new(Some(dir.path().to_path_buf()));
        let sets = resolver.list_sets().unwrap();
        assert_eq!(sets, vec!["amber14-all", "amber14/tip3pfb"]);
    }
}
