//! Playable copies of uploaded audio.
//!
//! Each accepted upload is published as a file the presentation layer can
//! play back, independent of whether transcription succeeds. Only the most
//! recent copy is kept; superseded copies are deleted immediately and the
//! store's directory is removed when the session ends.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::warn;

/// Owns the on-disk playable copy of the current upload.
///
/// The store owns its directory: it is created on construction and removed
/// on drop, so callers should hand it a session-scoped path.
pub struct SourceStore {
    dir: PathBuf,
    current: Option<PathBuf>,
    counter: u64,
}

impl SourceStore {
    /// Create a store rooted at `dir`, creating the directory if needed.
    pub fn new(dir: impl Into<PathBuf>) -> std::io::Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            current: None,
            counter: 0,
        })
    }

    /// Write `bytes` as the new playable source, replacing any previous one.
    ///
    /// The original file extension is preserved so playback tooling can
    /// sniff the container. Returns the path of the stored copy.
    pub fn publish(&mut self, file_name: &str, bytes: &[u8]) -> std::io::Result<PathBuf> {
        self.counter += 1;
        let ext = Path::new(file_name)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("bin");
        let path = self.dir.join(format!("upload-{}.{}", self.counter, ext));

        fs::write(&path, bytes)?;
        self.release();
        self.current = Some(path.clone());
        Ok(path)
    }

    /// Path of the current playable source, if any.
    pub fn current(&self) -> Option<&Path> {
        self.current.as_deref()
    }

    /// Delete the current playable copy.
    pub fn release(&mut self) {
        if let Some(path) = self.current.take() {
            if let Err(e) = fs::remove_file(&path) {
                warn!(path = %path.display(), error = %e, "Failed to remove superseded source copy");
            }
        }
    }
}

impl Drop for SourceStore {
    fn drop(&mut self) {
        self.release();
        let _ = fs::remove_dir_all(&self.dir);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_publish_writes_bytes() {
        let temp = TempDir::new().unwrap();
        let mut store = SourceStore::new(temp.path().join("sources")).unwrap();

        let path = store.publish("clip.wav", b"RIFF").unwrap();

        assert_eq!(store.current(), Some(path.as_path()));
        assert_eq!(path.extension().unwrap(), "wav");
        assert_eq!(fs::read(&path).unwrap(), b"RIFF");
    }

    #[test]
    fn test_publish_replaces_previous_copy() {
        let temp = TempDir::new().unwrap();
        let mut store = SourceStore::new(temp.path().join("sources")).unwrap();

        let first = store.publish("a.wav", b"first").unwrap();
        let second = store.publish("b.mp3", b"second").unwrap();

        assert!(!first.exists());
        assert!(second.exists());
        assert_eq!(store.current(), Some(second.as_path()));
    }

    #[test]
    fn test_release_removes_current() {
        let temp = TempDir::new().unwrap();
        let mut store = SourceStore::new(temp.path().join("sources")).unwrap();

        let path = store.publish("a.wav", b"bytes").unwrap();
        store.release();

        assert!(!path.exists());
        assert_eq!(store.current(), None);
    }

    #[test]
    fn test_unknown_extension_falls_back() {
        let temp = TempDir::new().unwrap();
        let mut store = SourceStore::new(temp.path().join("sources")).unwrap();

        let path = store.publish("noext", b"bytes").unwrap();

        assert_eq!(path.extension().unwrap(), "bin");
    }

    #[test]
    fn test_drop_removes_directory() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("sources");

        let mut store = SourceStore::new(&dir).unwrap();
        store.publish("a.wav", b"bytes").unwrap();
        drop(store);

        assert!(!dir.exists());
    }
}
