//! Work item enumeration.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, warn};

use super::Result;
use crate::error::BatchError;

/// Image extensions recognized by default.
pub const DEFAULT_IMAGE_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// One image to process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkItem {
    /// File name, used as the item id in the log and checkpoint.
    pub id: String,
    /// Full path to the image.
    pub path: PathBuf,
}

impl WorkItem {
    pub fn new(id: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            id: id.into(),
            path: path.into(),
        }
    }

    /// Read the image bytes.
    pub fn read(&self) -> std::io::Result<Vec<u8>> {
        fs::read(&self.path)
    }
}

/// List the images in `dir`, sorted by file name.
///
/// Only regular files whose extension matches one of `extensions`
/// (case-insensitive) are kept. An empty result is an error.
pub fn enumerate_work_items<S: AsRef<str>>(dir: &Path, extensions: &[S]) -> Result<Vec<WorkItem>> {
    let mut items = Vec::new();

    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }

        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        if !extensions.iter().any(|e| e.as_ref().eq_ignore_ascii_case(ext)) {
            continue;
        }

        match path.file_name().and_then(|n| n.to_str()) {
            Some(name) => items.push(WorkItem::new(name, path.clone())),
            None => warn!("Skipping image with non UTF-8 name: {}", path.display()),
        }
    }

    if items.is_empty() {
        return Err(BatchError::NoWorkItems(dir.to_path_buf()));
    }

    items.sort_by(|a, b| a.id.cmp(&b.id));
    debug!("Enumerated {} images in {}", items.len(), dir.display());

    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_enumerate_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.JPG", "a.png", "notes.txt", "c.jpeg", "10.jpg", "2.jpg"] {
            fs::write(dir.path().join(name), b"x").unwrap();
        }
        fs::create_dir(dir.path().join("sub.jpg")).unwrap();

        let items = enumerate_work_items(dir.path(), &DEFAULT_IMAGE_EXTENSIONS).unwrap();
        let ids: Vec<&str> = items.iter().map(|i| i.id.as_str()).collect();

        assert_eq!(ids, vec!["10.jpg", "2.jpg", "a.png", "b.JPG", "c.jpeg"]);
        assert_eq!(items[0].path, dir.path().join("10.jpg"));
    }

    #[test]
    fn test_empty_enumeration_is_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("readme.md"), b"x").unwrap();

        let result = enumerate_work_items(dir.path(), &DEFAULT_IMAGE_EXTENSIONS);
        assert!(matches!(result, Err(BatchError::NoWorkItems(_))));
    }
}
