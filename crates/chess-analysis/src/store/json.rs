use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::debug;

use super::{GameStore, StoreError};
use crate::record::GameAnalysis;

/// One pretty-printed `<id>.json` file per game in a directory.
///
/// Records are written to a temporary file in the same directory and then
/// renamed into place, so readers never observe a partial record.
#[derive(Debug, Clone)]
pub struct JsonDirStore {
    dir: PathBuf,
}

impl JsonDirStore {
    /// Opens a store rooted at `dir`, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// The directory records are kept in.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, id: &str) -> Result<PathBuf, StoreError> {
        let valid = !id.is_empty()
            && id != "."
            && id != ".."
            && !id.contains(['/', '\\', '\0']);
        if !valid {
            return Err(StoreError::InvalidId(id.to_string()));
        }
        Ok(self.dir.join(format!("{id}.json")))
    }

    fn read(path: &Path, id: &str) -> Result<GameAnalysis, StoreError> {
        let text = fs::read_to_string(path)?;
        serde_json::from_str(&text).map_err(|source| StoreError::Malformed {
            id: id.to_string(),
            source,
        })
    }
}

impl GameStore for JsonDirStore {
    fn exists(&self, id: &str) -> Result<bool, StoreError> {
        Ok(self.path_for(id)?.is_file())
    }

    fn get(&self, id: &str) -> Result<Option<GameAnalysis>, StoreError> {
        let path = self.path_for(id)?;
        match Self::read(&path, id) {
            Ok(analysis) => Ok(Some(analysis)),
            Err(StoreError::Io(e)) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn put(&self, analysis: &GameAnalysis) -> Result<(), StoreError> {
        let id = analysis.id();
        let path = self.path_for(id)?;
        let body = serde_json::to_string_pretty(analysis).map_err(|source| {
            StoreError::Malformed {
                id: id.to_string(),
                source,
            }
        })?;

        let mut file = NamedTempFile::new_in(&self.dir)?;
        file.write_all(body.as_bytes())?;
        file.as_file().sync_all()?;
        match file.persist_noclobber(&path) {
            Ok(_) => {
                debug!(id, path = %path.display(), "stored analysis");
                Ok(())
            }
            Err(e) if e.error.kind() == ErrorKind::AlreadyExists => {
                debug!(id, "analysis already stored");
                Ok(())
            }
            Err(e) => Err(StoreError::Io(e.error)),
        }
    }

    fn list_all(&self) -> Result<Vec<GameAnalysis>, StoreError> {
        let mut paths: Vec<PathBuf> = fs::read_dir(&self.dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "json"))
            .collect();
        paths.sort();

        paths
            .iter()
            .map(|path| {
                let id = path
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_default();
                Self::read(path, &id)
            })
            .collect()
    }
}
