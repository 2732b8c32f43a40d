//! Scratch-file lifecycle for uploads in flight
//!
//! Every staged file is owned by a [`StagedFile`] guard. The pipeline
//! discards guards explicitly on every exit path; dropping a guard that was
//! never discarded still unlinks the file, which covers panics and
//! cancelled requests.

use std::io::SeekFrom;
use std::path::{Path, PathBuf};

use tokio::fs::File;
use tokio::io::{AsyncSeekExt, AsyncWriteExt};
use tracing::{debug, warn};

use crate::error::StagingError;

const STAGED_PREFIX: &str = "tubely-upload-";

/// Directory that holds staged uploads
#[derive(Debug, Clone)]
pub struct StagingArea {
    dir: PathBuf,
}

impl StagingArea {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Create an empty, uniquely named file ending in `.{extension}`
    pub async fn create(&self, extension: &str) -> Result<StagedFile, StagingError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| StagingError::new(&self.dir, e))?;

        let dir = self.dir.clone();
        let suffix = format!(".{extension}");
        let (file, path) = tokio::task::spawn_blocking(move || {
            tempfile::Builder::new()
                .prefix(STAGED_PREFIX)
                .suffix(&suffix)
                .tempfile_in(&dir)?
                .keep()
                .map_err(|e| e.error)
        })
        .await
        .map_err(|e| StagingError::new(&self.dir, std::io::Error::other(e)))?
        .map_err(|e| StagingError::new(&self.dir, e))?;

        debug!(path = %path.display(), "Staged file created");

        Ok(StagedFile {
            path,
            file: Some(File::from_std(file)),
            released: false,
        })
    }

    /// Take ownership of a path some other process will write to, so it is
    /// cleaned up with the same guarantees as files from [`StagingArea::create`]
    pub fn adopt(&self, path: PathBuf) -> StagedFile {
        StagedFile {
            path,
            file: None,
            released: false,
        }
    }

    /// Delete a staged file. A file that is already gone counts as deleted.
    pub async fn remove(path: &Path) -> Result<(), StagingError> {
        match tokio::fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StagingError::new(path, e)),
        }
    }

    /// Close and delete a staged file. Failures are logged; they never
    /// change the outcome of the request that owned the file.
    pub async fn discard(&self, mut staged: StagedFile) {
        staged.file.take();
        if let Err(e) = Self::remove(&staged.path).await {
            warn!(error = %e, "Failed to remove staged file");
        }
        staged.released = true;
    }
}

/// A file in the staging area. Unlinked when discarded or dropped.
#[derive(Debug)]
pub struct StagedFile {
    path: PathBuf,
    file: Option<File>,
    released: bool,
}

impl StagedFile {
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn handle(&mut self) -> Result<&mut File, StagingError> {
        let path = &self.path;
        self.file.as_mut().ok_or_else(|| {
            StagingError::new(
                path,
                std::io::Error::other("staged file has no open handle"),
            )
        })
    }

    /// Append a buffer
    pub async fn write(&mut self, bytes: &[u8]) -> Result<(), StagingError> {
        let handle = self.handle()?;
        match handle.write_all(bytes).await {
            Ok(()) => Ok(()),
            Err(e) => Err(StagingError::new(&self.path, e)),
        }
    }

    /// Flush pending writes and move the cursor back to the start
    pub async fn rewind(&mut self) -> Result<(), StagingError> {
        let handle = self.handle()?;
        let result = async {
            handle.flush().await?;
            handle.seek(SeekFrom::Start(0)).await?;
            Ok::<_, std::io::Error>(())
        }
        .await;
        result.map_err(|e| StagingError::new(&self.path, e))
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        self.file.take();
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "Staged file removed on drop"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %self.path.display(), error = %e, "Failed to remove staged file"),
        }
    }
}
