use anyhow::{Context, Result, bail};
use directories::ProjectDirs;
use std::path::{Path, PathBuf};

const LAST_DATA_DIR_FILE: &str = "last_data_dir";

pub struct Config {
    pub data_dir: PathBuf,
}

impl Config {
    pub fn load() -> Result<Self> {
        let proj_dirs =
            ProjectDirs::from("", "", "asa24").context("Could not determine home directory")?;
        Self::at(proj_dirs.data_dir())
    }

    pub fn at(data_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(data_dir)
            .with_context(|| format!("Failed to create data directory: {}", data_dir.display()))?;
        Ok(Config {
            data_dir: data_dir.to_path_buf(),
        })
    }

    /// The ASA24 directory most recently loaded successfully, if it still exists.
    pub fn last_asa24_dir(&self) -> Result<Option<PathBuf>> {
        let path = self.data_dir.join(LAST_DATA_DIR_FILE);
        if !path.exists() {
            return Ok(None);
        }
        let saved = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let saved = PathBuf::from(saved.trim());
        Ok((!saved.as_os_str().is_empty() && saved.is_dir()).then_some(saved))
    }

    pub fn remember_asa24_dir(&self, dir: &Path) -> Result<()> {
        let dir = std::fs::canonicalize(dir).unwrap_or_else(|_| dir.to_path_buf());
        let path = self.data_dir.join(LAST_DATA_DIR_FILE);
        std::fs::write(&path, dir.display().to_string())
            .with_context(|| format!("Failed to write {}", path.display()))
    }

    /// `--dir` if given, else the remembered directory.
    pub fn resolve_asa24_dir(&self, explicit: Option<PathBuf>) -> Result<PathBuf> {
        if let Some(dir) = explicit {
            return Ok(dir);
        }
        match self.last_asa24_dir()? {
            Some(dir) => Ok(dir),
            None => bail!("No ASA24 data directory given. Pass --dir <PATH> (it is remembered for later runs)"),
        }
    }
}
