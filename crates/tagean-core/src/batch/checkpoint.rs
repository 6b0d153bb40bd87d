//! Single-item checkpoint file.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use super::Result;
use crate::error::BatchError;

/// File holding the id of the last completed work item.
///
/// The file contains exactly the item id, nothing else.
#[derive(Debug, Clone)]
pub struct Checkpoint {
    path: PathBuf,
}

impl Checkpoint {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Last completed item id, or `None` if no checkpoint was written yet.
    pub fn load(&self) -> Result<Option<String>> {
        match fs::read_to_string(&self.path) {
            Ok(content) => {
                let id = content.trim();
                Ok((!id.is_empty()).then(|| id.to_string()))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(self.error("read", e)),
        }
    }

    /// Record `item_id` as the last completed item.
    ///
    /// Written to a temporary file and renamed into place, so readers never
    /// observe a partial id.
    pub fn save(&self, item_id: &str) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| self.error("create directory for", e))?;
        }

        let temp_path = self.path.with_extension("tmp");
        fs::write(&temp_path, item_id).map_err(|e| self.error("write", e))?;
        fs::rename(&temp_path, &self.path).map_err(|e| self.error("replace", e))?;

        Ok(())
    }

    /// Remove the checkpoint so the next run starts from the beginning.
    pub fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(self.error("remove", e)),
        }
    }

    fn error(&self, action: &str, e: std::io::Error) -> BatchError {
        BatchError::Checkpoint(format!("failed to {} {}: {}", action, self.path.display(), e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_missing_checkpoint_loads_none() {
        let dir = tempfile::tempdir().unwrap();
        let checkpoint = Checkpoint::new(dir.path().join("progress.txt"));

        assert_eq!(checkpoint.load().unwrap(), None);
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let checkpoint = Checkpoint::new(dir.path().join("state").join("progress.txt"));

        checkpoint.save("0003.jpg").unwrap();
        checkpoint.save("0004.jpg").unwrap();

        assert_eq!(checkpoint.load().unwrap(), Some("0004.jpg".to_string()));
        assert_eq!(fs::read_to_string(checkpoint.path()).unwrap(), "0004.jpg");
        assert!(!checkpoint.path().with_extension("tmp").exists());
    }

    #[test]
    fn test_blank_checkpoint_loads_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("progress.txt");
        fs::write(&path, "  \n").unwrap();

        assert_eq!(Checkpoint::new(path).load().unwrap(), None);
    }

    #[test]
    fn test_clear() {
        let dir = tempfile::tempdir().unwrap();
        let checkpoint = Checkpoint::new(dir.path().join("progress.txt"));

        checkpoint.save("a.jpg").unwrap();
        checkpoint.clear().unwrap();
        checkpoint.clear().unwrap();

        assert_eq!(checkpoint.load().unwrap(), None);
    }
}
