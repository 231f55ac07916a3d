//! Side logs for later auditing
//!
//! Each line is appended and flushed immediately so the logs reflect partial
//! progress if a run aborts.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::Result;

/// Repositories rejected by verification, one URL per line
pub const VERIFICATION_FAILED_FILE_NAME: &str = "verification_failed_list.txt";

/// Subfolders that were searched and held no library, one name per line
pub const NON_LIBRARY_FOLDERS_FILE_NAME: &str = "non_library_folders_list.txt";

/// Append-only audit logs of one run
#[derive(Debug, Clone, Default)]
pub struct AuditLog {
    dir: Option<PathBuf>,
}

impl AuditLog {
    /// Logs inside `dir`, which is created if missing.
    ///
    /// Logs left by a previous run are removed.
    pub fn in_dir(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;

        for name in [VERIFICATION_FAILED_FILE_NAME, NON_LIBRARY_FOLDERS_FILE_NAME] {
            match fs::remove_file(dir.join(name)) {
                Ok(()) => debug!(file = name, "removed previous log"),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }

        Ok(Self { dir: Some(dir) })
    }

    /// Logs that discard every line
    pub fn disabled() -> Self {
        Self { dir: None }
    }

    pub fn dir(&self) -> Option<&Path> {
        self.dir.as_deref()
    }

    pub fn verification_failed_path(&self) -> Option<PathBuf> {
        self.dir.as_ref().map(|dir| dir.join(VERIFICATION_FAILED_FILE_NAME))
    }

    pub fn non_library_folders_path(&self) -> Option<PathBuf> {
        self.dir.as_ref().map(|dir| dir.join(NON_LIBRARY_FOLDERS_FILE_NAME))
    }

    pub fn record_verification_failure(&self, repository_url: &str) -> Result<()> {
        self.append(self.verification_failed_path(), repository_url)
    }

    pub fn record_non_library_folder(&self, folder: &str) -> Result<()> {
        self.append(self.non_library_folders_path(), folder)
    }

    fn append(&self, path: Option<PathBuf>, line: &str) -> Result<()> {
        let Some(path) = path else {
            return Ok(());
        };

        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        writeln!(file, "{}", line)?;
        file.flush()?;
        Ok(())
    }
}
