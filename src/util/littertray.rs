//! Filesystem helper for tests
// Copyright (c) 2020 Sergio Benitez, (c) 2025 Ross Younger
// MIT license applies to this file.

use std::fs::File;
use std::io::{BufWriter, Write as _};
use std::path::{Component, Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use anyhow::Result;
use tempfile::TempDir;

/// A lightweight jail for tests that write files.
///
/// The process changes directory into a fresh temporary directory for the duration of the closure.
/// The directory is removed, and the previous working directory restored, on drop.
/// Only one tray exists at a time, as the working directory is process-wide.
#[derive(Debug)]
pub(crate) struct LitterTray {
    canonical_dir: PathBuf,
    _dir: TempDir,
    saved_cwd: PathBuf,
}

static G_LOCK: Mutex<()> = Mutex::new(());

impl LitterTray {
    /// Runs a fallible closure in a new litter tray
    pub(crate) fn try_with<F: FnOnce(&mut LitterTray) -> Result<()>>(f: F) -> Result<()> {
        // A test that panicked inside a tray poisons the lock; the tray itself is still sound.
        let _guard = G_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
        let dir = TempDir::new()?;
        let mut tray = LitterTray {
            canonical_dir: dir.path().canonicalize()?,
            _dir: dir,
            saved_cwd: std::env::current_dir()?,
        };
        std::env::set_current_dir(tray.directory())?;
        f(&mut tray)
    }

    /// Runs a closure in a new litter tray. Setup failures panic.
    pub(crate) fn run<F: FnOnce(&mut LitterTray)>(f: F) {
        Self::try_with(|tray| {
            f(tray);
            Ok(())
        })
        .unwrap();
    }

    /// The temporary directory that is this litter tray
    #[must_use]
    pub(crate) fn directory(&self) -> &Path {
        &self.canonical_dir
    }

    fn safe_path_within_tray(&self, path: &Path) -> Result<PathBuf> {
        anyhow::ensure!(
            !path.components().any(|c| matches!(c, Component::ParentDir)),
            "LitterTray: path escapes the tray"
        );
        if path.is_absolute() {
            anyhow::ensure!(
                path.starts_with(self.directory()),
                "LitterTray: input path is outside of tray directory"
            );
        }
        Ok(path.to_path_buf())
    }

    /// Creates a binary file within the tray
    pub(crate) fn create_binary<P: AsRef<Path>>(&self, path: P, bytes: &[u8]) -> Result<File> {
        let path = self.safe_path_within_tray(path.as_ref())?;
        let mut writer = BufWriter::new(File::create(path)?);
        writer.write_all(bytes)?;
        Ok(writer.into_inner()?)
    }

    /// Creates a text file within the tray
    pub(crate) fn create_text<P: AsRef<Path>>(&self, path: P, contents: &str) -> Result<File> {
        self.create_binary(path, contents.as_bytes())
    }

    /// Creates a directory within the tray
    pub(crate) fn make_dir<P: AsRef<Path>>(&self, path: P) -> Result<PathBuf> {
        let path = self.safe_path_within_tray(path.as_ref())?;
        std::fs::create_dir_all(&path)?;
        Ok(path)
    }
}

impl Drop for LitterTray {
    fn drop(&mut self) {
        let _ = std::env::set_current_dir(&self.saved_cwd);
    }
}

#[cfg(test)]
mod test {
    use super::LitterTray;

    #[test]
    fn files_land_in_the_tray() {
        let mut seen = None;
        LitterTray::try_with(|tray| {
            let _ = tray.create_text("test.txt", "Hello, world!")?;
            assert_eq!(std::fs::read_to_string("test.txt")?, "Hello, world!");
            let _ = tray.make_dir("sub/dir")?;
            assert!(tray.directory().join("sub/dir").is_dir());
            seen = Some(tray.directory().to_path_buf());
            Ok(())
        })
        .unwrap();
        assert!(!seen.unwrap().exists());
    }

    #[test]
    fn escapes_are_refused() {
        LitterTray::run(|tray| {
            assert!(tray.create_text("../oops", "x").is_err());
            assert!(tray.create_text("/tmp/oops", "x").is_err());
        });
    }
}
