//! Intermediate capture storage
//!
//! Every run owns a scratch directory (used as `HOME` for `top`, so a
//! personal `toprc` cannot change the table layout) that is removed when the
//! run ends or is interrupted. With `--store-dir`, every `ps`/`top`/`jstack`
//! capture and the per-round report are also kept there, named
//! `<run timestamp>_<round>_<kind>`.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use tempfile::TempDir;

use crate::domain::SetupError;

pub struct ArtifactStore {
    scratch: TempDir,
    keep_dir: Option<PathBuf>,
    prefix: String,
}

impl ArtifactStore {
    /// Create the scratch directory. `keep_dir` must already exist and be
    /// writable (see [`crate::preflight::prepare_store_dir`]).
    ///
    /// # Errors
    /// Returns an error if the scratch directory cannot be created.
    pub fn new(keep_dir: Option<&Path>) -> Result<Self, SetupError> {
        let scratch = tempfile::Builder::new()
            .prefix("busy-threads.")
            .tempdir()
            .map_err(|source| SetupError::UnwritablePath { path: std::env::temp_dir(), source })?;
        debug!("scratch directory: {}", scratch.path().display());

        let prefix = chrono::Local::now().format("%Y-%m-%d_%H-%M-%S%.3f_").to_string();
        Ok(Self { scratch, keep_dir: keep_dir.map(Path::to_path_buf), prefix })
    }

    #[must_use]
    pub fn scratch_dir(&self) -> &Path {
        self.scratch.path()
    }

    #[must_use]
    pub fn is_persistent(&self) -> bool {
        self.keep_dir.is_some()
    }

    /// Where a capture of `kind` for 0-based `round` is kept, if anywhere.
    #[must_use]
    pub fn path_for(&self, round: u64, kind: &str) -> Option<PathBuf> {
        self.keep_dir.as_ref().map(|dir| dir.join(format!("{}{}_{kind}", self.prefix, round + 1)))
    }

    /// Keep a capture, preceded by the command line that produced it.
    ///
    /// # Errors
    /// Returns an error if the file cannot be written.
    pub fn save(
        &self,
        round: u64,
        kind: &str,
        command_line: &str,
        body: &str,
    ) -> std::io::Result<()> {
        let Some(path) = self.path_for(round, kind) else {
            return Ok(());
        };
        let mut file = fs::File::create(&path)?;
        writeln!(file, "{command_line}")?;
        file.write_all(body.as_bytes())?;
        debug!("saved {}", path.display());
        Ok(())
    }

    /// Append text to a per-round capture.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened or written.
    pub fn append(&self, round: u64, kind: &str, text: &str) -> std::io::Result<()> {
        let Some(path) = self.path_for(round, kind) else {
            return Ok(());
        };
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        file.write_all(text.as_bytes())
    }

    /// Remove the scratch directory now. Used on interrupt, when destructors
    /// will not run. The kept directory is never touched.
    pub fn discard(&self) {
        if let Err(e) = fs::remove_dir_all(self.scratch.path()) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!("Failed to remove {}: {e}", self.scratch.path().display());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scratch_only_saves_nothing() {
        let store = ArtifactStore::new(None).unwrap();
        assert!(!store.is_persistent());
        assert!(store.path_for(0, "ps").is_none());
        store.save(0, "ps", "ps -o pid", "1\n").unwrap();
        assert!(store.scratch_dir().is_dir());
    }

    #[test]
    fn test_persistent_names_are_round_numbered() {
        let keep = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(Some(keep.path())).unwrap();

        store.save(1, "jstack_42", "jstack 42", "dump\n").unwrap();
        let path = store.path_for(1, "jstack_42").unwrap();
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.ends_with("_2_jstack_42"), "unexpected name {name}");
        assert_eq!(fs::read_to_string(&path).unwrap(), "jstack 42\ndump\n");

        store.append(1, "busy_threads", "a\n").unwrap();
        store.append(1, "busy_threads", "b\n").unwrap();
        let report = store.path_for(1, "busy_threads").unwrap();
        assert_eq!(fs::read_to_string(report).unwrap(), "a\nb\n");
    }

    #[test]
    fn test_discard_keeps_store_dir() {
        let keep = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(Some(keep.path())).unwrap();
        store.save(0, "ps", "ps", "x").unwrap();

        store.discard();
        assert!(!store.scratch_dir().exists());
        assert!(store.path_for(0, "ps").unwrap().exists());
    }
}
