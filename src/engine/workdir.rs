//! Scoped per-run working directory.

use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::error::FitError;

/// A unique run directory that is removed when dropped.
///
/// With `keep = true` the directory is detached from cleanup and left on disk.
#[derive(Debug)]
pub struct Workdir {
    dir: Option<TempDir>,
    path: PathBuf,
}

impl Workdir {
    pub fn create(root: Option<&Path>, stem: &str, keep: bool) -> Result<Self, FitError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(stem).suffix(".run");
        let dir = match root {
            Some(root) => builder.tempdir_in(root).map_err(|e| FitError::io(root, e))?,
            None => builder
                .tempdir()
                .map_err(|e| FitError::io(std::env::temp_dir(), e))?,
        };

        let path = dir.path().to_path_buf();
        if keep {
            // Disables removal on drop.
            let _ = dir.keep();
            return Ok(Self { dir: None, path });
        }
        Ok(Self { dir: Some(dir), path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_kept(&self) -> bool {
        self.dir.is_none()
    }

    pub fn write(&self, file: &str, contents: &str) -> Result<PathBuf, FitError> {
        let target = self.path.join(file);
        std::fs::write(&target, contents).map_err(|e| FitError::io(&target, e))?;
        Ok(target)
    }

    /// Path of `file` inside the directory, if it exists.
    pub fn existing(&self, file: &str) -> Option<PathBuf> {
        let p = self.path.join(file);
        p.is_file().then_some(p)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removed_on_drop() {
        let root = tempfile::tempdir().unwrap();
        let path = {
            let wd = Workdir::create(Some(root.path()), "m", false).unwrap();
            wd.write("m.tpl", "DATA_SECTION\n").unwrap();
            assert!(wd.existing("m.tpl").is_some());
            wd.path().to_path_buf()
        };
        assert!(!path.exists());
    }

    #[test]
    fn kept_dir_survives_drop() {
        let root = tempfile::tempdir().unwrap();
        let path = {
            let wd = Workdir::create(Some(root.path()), "m", true).unwrap();
            assert!(wd.is_kept());
            wd.path().to_path_buf()
        };
        assert!(path.is_dir());
    }

    #[test]
    fn names_are_unique() {
        let root = tempfile::tempdir().unwrap();
        let a = Workdir::create(Some(root.path()), "m", false).unwrap();
        let b = Workdir::create(Some(root.path()), "m", false).unwrap();
        assert_ne!(a.path(), b.path());
    }
}
