//! Change-debounced file reads.

use parking_lot::Mutex;
use std::path::{Path, PathBuf};

/// Result of one debounced read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileRead {
    /// Content differs from the previous read.
    Changed(String),
    /// Byte-identical to the previous read; skip downstream work.
    Unchanged,
    /// The file does not exist. Treated as an empty configuration,
    /// never as an error.
    Missing,
}

/// One watched configuration file with its last-seen raw content.
pub struct WatchedFile {
    path: PathBuf,
    last_content: Mutex<Option<Vec<u8>>>,
}

impl WatchedFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            last_content: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Read the file, comparing raw bytes against the previous read.
    pub fn read(&self) -> FileRead {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(error) => {
                if error.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!("failed to read {:?}: {}", self.path, error);
                }
                // Forget the cache so a later re-creation reads as changed.
                *self.last_content.lock() = None;
                return FileRead::Missing;
            }
        };

        let mut last = self.last_content.lock();
        if last.as_deref() == Some(bytes.as_slice()) {
            return FileRead::Unchanged;
        }
        let text = String::from_utf8_lossy(&bytes).into_owned();
        *last = Some(bytes);
        FileRead::Changed(text)
    }

    /// Forget the cached content so the next read registers as changed.
    pub fn reset(&self) {
        *self.last_content.lock() = None;
    }
}
