//! Small filesystem helpers shared by the settings, stats, diagnostics and
//! export writers.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("data directory {path:?} unusable: {message}")]
    DataDir { path: PathBuf, message: String },
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Creates `dir` and its parents when missing.
pub fn ensure_data_dir(dir: &Path) -> Result<(), PersistError> {
    let unusable = |message: String| PersistError::DataDir {
        path: dir.to_path_buf(),
        message,
    };
    if dir.is_file() {
        return Err(unusable("path is a file".into()));
    }
    fs::create_dir_all(dir).map_err(|err| unusable(err.to_string()))
}

/// Reads `{dir}/{filename}`; a missing file is `Ok(None)`.
pub fn read_optional(dir: &Path, filename: &str) -> Result<Option<String>, PersistError> {
    match fs::read_to_string(dir.join(filename)) {
        Ok(text) => Ok(Some(text)),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err.into()),
    }
}

/// Replaces files under one directory by renaming a synced temp file over
/// the target, so a crash never leaves a truncated settings or stats file.
#[derive(Debug, Clone)]
pub struct AtomicFileWriter {
    dir: PathBuf,
}

impl AtomicFileWriter {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn write(&self, filename: &str, content: &str) -> Result<PathBuf, PersistError> {
        self.write_bytes(filename, content.as_bytes())
    }

    pub fn write_bytes(&self, filename: &str, content: &[u8]) -> Result<PathBuf, PersistError> {
        ensure_data_dir(&self.dir)?;
        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(content)?;
        tmp.as_file().sync_all()?;

        let target = self.dir.join(filename);
        tmp.persist(&target).map_err(|err| PersistError::Io(err.error))?;
        Ok(target)
    }
}
