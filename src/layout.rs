//! On-disk layout of the data directory.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use tempfile::TempDir;
use tracing::{debug, warn};

use crate::error::Error;

const FASTA_DIR: &str = "fasta_files";
const SOURCE_DIR: &str = "source_files";
const TEMP_DIR: &str = "temp_files";
const TEMP_PREFIX: &str = "temp_";

/// Data root with `fasta_files/`, `source_files/` and `temp_files/`.
#[derive(Debug, Clone)]
pub struct DataLayout {
    root: PathBuf,
}

impl DataLayout {
    #[must_use]
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn fasta_dir(&self) -> PathBuf {
        self.root.join(FASTA_DIR)
    }

    #[must_use]
    pub fn source_dir(&self) -> PathBuf {
        self.root.join(SOURCE_DIR)
    }

    #[must_use]
    pub fn temp_dir(&self) -> PathBuf {
        self.root.join(TEMP_DIR)
    }

    /// Create the directory tree if missing.
    pub fn ensure(&self) -> Result<(), Error> {
        for dir in [self.fasta_dir(), self.source_dir(), self.temp_dir()] {
            fs::create_dir_all(&dir)?;
        }
        Ok(())
    }

    /// Genome file of one assembly under one nomenclature.
    #[must_use]
    pub fn genome_path(&self, assembly_id: u64, nomenclature: &str) -> PathBuf {
        self.fasta_dir()
            .join(format!("{assembly_id}_{nomenclature}.fasta"))
    }

    /// Annotation source file of one submission under one nomenclature.
    #[must_use]
    pub fn source_path(&self, sva_id: u64, nomenclature: &str, extension: &str) -> PathBuf {
        self.source_dir()
            .join(format!("{sva_id}_{nomenclature}.{extension}"))
    }

    /// Scoped directory under `temp_files/`, removed when dropped.
    pub fn scoped_dir(&self, label: &str) -> Result<TempDir, Error> {
        fs::create_dir_all(self.temp_dir())?;
        let dir = tempfile::Builder::new()
            .prefix(&format!("{TEMP_PREFIX}{label}_"))
            .tempdir_in(self.temp_dir())?;
        debug!(path = %dir.path().display(), "scoped temp dir");
        Ok(dir)
    }

    /// Remove `temp_*` entries last modified at least `older_than` ago, e.g.
    /// leftovers of a killed process. Younger entries may belong to a run
    /// still in progress and are kept. Returns the number of entries removed.
    pub fn sweep_temp(&self, older_than: Duration) -> Result<usize, Error> {
        let dir = self.temp_dir();
        if !dir.is_dir() {
            return Ok(0);
        }
        let now = SystemTime::now();
        let mut removed = 0;
        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            if !entry.file_name().to_string_lossy().starts_with(TEMP_PREFIX) {
                continue;
            }
            let age = now
                .duration_since(entry.metadata()?.modified()?)
                .unwrap_or(Duration::ZERO);
            if age < older_than {
                continue;
            }
            let path = entry.path();
            let result = if entry.file_type()?.is_dir() {
                fs::remove_dir_all(&path)
            } else {
                fs::remove_file(&path)
            };
            match result {
                Ok(()) => removed += 1,
                Err(e) => warn!(path = %path.display(), error = %e, "could not remove temp entry"),
            }
        }
        debug!(removed, ?older_than, "temp entries swept");
        Ok(removed)
    }
}

/// Files detached by a delete, parked under `temp_files/` until the delete
/// commits. `discard` removes them for good; dropping the guard instead moves
/// every parked file back to where it was.
#[derive(Debug)]
pub struct RetiredFiles {
    root: PathBuf,
    parking: TempDir,
    moved: Vec<(PathBuf, PathBuf)>,
}

impl RetiredFiles {
    pub fn new(layout: &DataLayout) -> Result<Self, Error> {
        Ok(Self {
            root: layout.root().to_path_buf(),
            parking: layout.scoped_dir("retired")?,
            moved: Vec::new(),
        })
    }

    /// Park `path`. Paths outside the data root are refused; a missing file
    /// is logged and skipped. Returns whether a file was parked.
    pub fn retire(&mut self, path: &Path) -> Result<bool, Error> {
        if !path.starts_with(&self.root) {
            return Err(Error::Validation(format!(
                "refusing to remove {} outside {}",
                path.display(),
                self.root.display()
            )));
        }
        if !path.exists() {
            warn!(path = %path.display(), "file to remove is already gone");
            return Ok(false);
        }
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let parked = self
            .parking
            .path()
            .join(format!("{}_{name}", self.moved.len()));
        fs::rename(path, &parked)?;
        self.moved.push((path.to_path_buf(), parked));
        Ok(true)
    }

    /// Original locations of the parked files.
    #[must_use]
    pub fn paths(&self) -> Vec<&Path> {
        self.moved.iter().map(|(from, _)| from.as_path()).collect()
    }

    /// Delete every parked file.
    pub fn discard(mut self) -> Vec<PathBuf> {
        let removed = std::mem::take(&mut self.moved)
            .into_iter()
            .map(|(from, _)| from)
            .collect();
        debug!(path = %self.parking.path().display(), "retired files discarded");
        removed
    }
}

impl Drop for RetiredFiles {
    fn drop(&mut self) {
        for (from, parked) in self.moved.drain(..).rev() {
            if let Err(e) = fs::rename(&parked, &from) {
                warn!(path = %from.display(), error = %e, "could not restore retired file");
            }
        }
    }
}

/// Files written ahead of a commit. Every listed file is removed on drop
/// unless `keep` was called.
#[derive(Debug, Default)]
pub struct StagedFiles {
    paths: Vec<PathBuf>,
    kept: bool,
}

impl StagedFiles {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Track `path` for removal. Call before creating the file.
    pub fn add(&mut self, path: &Path) -> Result<(), Error> {
        if path.exists() {
            return Err(Error::Validation(format!(
                "refusing to overwrite {}",
                path.display()
            )));
        }
        self.paths.push(path.to_path_buf());
        Ok(())
    }

    #[must_use]
    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    /// Keep every staged file.
    pub fn keep(mut self) -> Vec<PathBuf> {
        self.kept = true;
        std::mem::take(&mut self.paths)
    }
}

impl Drop for StagedFiles {
    fn drop(&mut self) {
        if self.kept {
            return;
        }
        for path in &self.paths {
            if let Err(e) = fs::remove_file(path) {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!(path = %path.display(), error = %e, "could not remove staged file");
                }
            }
        }
    }
}
