//! Request-scoped temporary files.
//!
//! A [`TempArtifact`] is a `tempfile` placeholder in the shared temp
//! directory, removed when the handle drops, so every exit path (success,
//! handled failure, `?`, panic unwind, cancelled future) cleans up.
//!
//! yt-dlp also writes siblings next to its target (`.part`, `.ytdl`,
//! per-format `.f137.mp4` files). Download artifacts sweep those with
//! [`TempArtifact::sweep_leftovers`] once the tool exits; if the future is
//! dropped first, `Drop` does the sweep.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use tempfile::TempPath;
use tracing::debug;

/// Prefix of every file the pipeline creates.
pub const TEMP_PREFIX: &str = "recut";

/// Suffixes yt-dlp appends to its output path while working.
const TOOL_SUFFIXES: &[&str] = &[".part", ".ytdl"];

/// A temp file owned by one request.
#[derive(Debug)]
pub struct TempArtifact {
    path: TempPath,
    stem: String,
    owner: String,
    /// Siblings may exist and have not been swept yet
    leftovers_pending: AtomicBool,
}

impl TempArtifact {
    /// Create an empty `recut-<owner>-<random>.<ext>` in `dir` for ffmpeg output.
    pub fn create(dir: impl AsRef<Path>, owner: &str, ext: &str) -> io::Result<Self> {
        Self::build(dir.as_ref(), owner, ext, false)
    }

    /// Like [`create`](Self::create), for a yt-dlp target that may leave siblings.
    pub fn create_for_download(dir: impl AsRef<Path>, owner: &str, ext: &str) -> io::Result<Self> {
        Self::build(dir.as_ref(), owner, ext, true)
    }

    fn build(dir: &Path, owner: &str, ext: &str, leftovers: bool) -> io::Result<Self> {
        let owner = sanitize_owner(owner);
        let prefix = format!("{}-{}-", TEMP_PREFIX, owner);
        let suffix = format!(".{}", ext);
        let path = tempfile::Builder::new()
            .prefix(&prefix)
            .suffix(&suffix)
            .rand_bytes(12)
            .tempfile_in(dir)?
            .into_temp_path();

        let stem = path
            .file_name()
            .map(|n| n.to_string_lossy().trim_end_matches(suffix.as_str()).to_string())
            .unwrap_or(prefix);

        Ok(Self {
            path,
            stem,
            owner,
            leftovers_pending: AtomicBool::new(leftovers),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Path as a command-line argument.
    pub fn arg(&self) -> String {
        self.path.to_string_lossy().to_string()
    }

    /// Size of the file on disk; 0 when missing.
    pub async fn size(&self) -> u64 {
        tokio::fs::metadata(self.path())
            .await
            .map(|m| m.len())
            .unwrap_or(0)
    }

    /// Read the whole file into memory.
    pub async fn read_bytes(&self) -> io::Result<Vec<u8>> {
        tokio::fs::read(self.path()).await
    }

    /// Remove siblings sharing this artifact's stem. The artifact itself stays.
    pub async fn sweep_leftovers(&self) {
        if !self.leftovers_pending.swap(false, Ordering::AcqRel) {
            return;
        }
        let Some(dir) = self.path.parent() else {
            return;
        };
        let Ok(mut entries) = tokio::fs::read_dir(dir).await else {
            return;
        };
        while let Ok(Some(entry)) = entries.next_entry().await {
            let path = entry.path();
            if self.is_leftover(&path) {
                match tokio::fs::remove_file(&path).await {
                    Ok(()) => debug!(path = %path.display(), "Removed tool leftover"),
                    Err(e) => debug!(path = %path.display(), error = %e, "Failed to remove tool leftover"),
                }
            }
        }
    }

    fn is_leftover(&self, candidate: &Path) -> bool {
        candidate != self.path()
            && candidate
                .file_name()
                .is_some_and(|n| n.to_string_lossy().starts_with(&self.stem))
    }

    /// Blocking sweep, only reached when the request was dropped mid-download.
    fn sweep_leftovers_blocking(&self) {
        for suffix in TOOL_SUFFIXES {
            remove_quietly(&sibling(self.path(), suffix));
        }
        let Some(dir) = self.path.parent() else {
            return;
        };
        let Ok(entries) = fs::read_dir(dir) else {
            return;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if self.is_leftover(&path) {
                remove_quietly(&path);
            }
        }
    }
}

impl Drop for TempArtifact {
    fn drop(&mut self) {
        if *self.leftovers_pending.get_mut() {
            self.sweep_leftovers_blocking();
        }
        // the TempPath field removes the artifact itself
    }
}

fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

fn remove_quietly(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => debug!(path = %path.display(), "Removed temp file"),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => debug!(path = %path.display(), error = %e, "Failed to remove temp file"),
    }
}

/// Keep owner tags short and filename-safe; they may come from a client header.
fn sanitize_owner(owner: &str) -> String {
    let cleaned: String = owner
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .take(12)
        .collect();
    if cleaned.is_empty() {
        "anon".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn file_count(dir: &Path) -> usize {
        fs::read_dir(dir).unwrap().count()
    }

    #[test]
    fn test_create_and_drop() {
        let dir = TempDir::new().unwrap();
        let artifact = TempArtifact::create(dir.path(), "req1", "mp4").unwrap();
        assert!(artifact.path().exists());
        assert!(artifact.path().starts_with(dir.path()));
        assert!(artifact.arg().ends_with(".mp4"));
        assert_eq!(file_count(dir.path()), 1);

        drop(artifact);
        assert_eq!(file_count(dir.path()), 0);
    }

    #[test]
    fn test_unique_names() {
        let dir = TempDir::new().unwrap();
        let a = TempArtifact::create(dir.path(), "same", "mp4").unwrap();
        let b = TempArtifact::create(dir.path(), "same", "mp4").unwrap();
        assert_ne!(a.path(), b.path());
        assert!(a.stem.starts_with("recut-same-"));
    }

    #[test]
    fn test_placeholder_starts_empty() {
        let dir = TempDir::new().unwrap();
        let artifact = TempArtifact::create(dir.path(), "req", "mp4").unwrap();
        assert_eq!(tokio_test::block_on(artifact.size()), 0);

        fs::write(artifact.path(), b"clip").unwrap();
        assert_eq!(tokio_test::block_on(artifact.size()), 4);
        assert_eq!(tokio_test::block_on(artifact.read_bytes()).unwrap(), b"clip");
    }

    #[tokio::test]
    async fn test_sweep_keeps_artifact_and_unrelated_files() {
        let dir = TempDir::new().unwrap();
        let unrelated = dir.path().join("keep.txt");
        fs::write(&unrelated, b"x").unwrap();

        let artifact = TempArtifact::create_for_download(dir.path(), "req", "mp4").unwrap();
        fs::write(artifact.path(), b"data").unwrap();
        fs::write(format!("{}.part", artifact.arg()), b"partial").unwrap();
        fs::write(dir.path().join(format!("{}.f137.mp4", artifact.stem)), b"video").unwrap();
        assert_eq!(file_count(dir.path()), 4);

        artifact.sweep_leftovers().await;
        assert_eq!(file_count(dir.path()), 2);
        assert_eq!(artifact.size().await, 4);

        drop(artifact);
        assert_eq!(file_count(dir.path()), 1);
        assert!(unrelated.exists());
    }

    #[test]
    fn test_drop_sweeps_unswept_download_leftovers() {
        let dir = TempDir::new().unwrap();
        {
            let artifact = TempArtifact::create_for_download(dir.path(), "req", "mp4").unwrap();
            fs::write(format!("{}.ytdl", artifact.arg()), b"state").unwrap();
            fs::write(dir.path().join(format!("{}.f140.m4a.part", artifact.stem)), b"a").unwrap();
            assert_eq!(file_count(dir.path()), 3);
        }
        assert_eq!(file_count(dir.path()), 0);
    }

    #[test]
    fn test_drop_after_external_removal_is_silent() {
        let dir = TempDir::new().unwrap();
        let artifact = TempArtifact::create(dir.path(), "req", "mp4").unwrap();
        fs::remove_file(artifact.path()).unwrap();
        drop(artifact);
        assert_eq!(file_count(dir.path()), 0);
    }

    #[test]
    fn test_owner_sanitized() {
        let dir = TempDir::new().unwrap();
        let artifact = TempArtifact::create(dir.path(), "../../etc/passwd", "mp4").unwrap();
        assert_eq!(artifact.owner(), "etcpasswd");
        assert_eq!(artifact.path().parent().unwrap(), dir.path());

        let anon = TempArtifact::create(dir.path(), "", "mp4").unwrap();
        assert_eq!(anon.owner(), "anon");
    }
}
