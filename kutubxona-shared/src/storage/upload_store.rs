use std::collections::HashSet;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use super::filename::SafeName;
use super::StorageError;

/// Upper bound on `_n` suffixes tried for a single name
const MAX_COLLISION_ATTEMPTS: u32 = 10_000;

/// Flat directory of uploaded material files
#[derive(Debug, Clone)]
pub struct UploadStore {
    base_path: PathBuf,
}

impl UploadStore {
    /// Opens the upload directory, creating it if needed
    pub async fn new(base_path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let base_path = base_path.into();
        fs::create_dir_all(&base_path).await?;

        info!(path = %base_path.display(), "Upload store initialized");

        Ok(Self { base_path })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Stores `data` under a sanitized, collision-free name
    ///
    /// Each candidate (`name.ext`, `name_1.ext`, `name_2.ext`, …) is claimed
    /// with create-new semantics, so two concurrent uploads of the same name
    /// never end up sharing a file.
    ///
    /// # Returns
    ///
    /// The stored filename, relative to the upload directory
    pub async fn store(&self, original_name: &str, data: &[u8]) -> Result<String, StorageError> {
        let safe = SafeName::parse(original_name);

        for attempt in 0..MAX_COLLISION_ATTEMPTS {
            let candidate = safe.candidate(attempt);
            let path = self.base_path.join(&candidate);

            let mut file = match OpenOptions::new().write(true).create_new(true).open(&path).await {
                Ok(file) => file,
                Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(e.into()),
            };

            let written = async {
                file.write_all(data).await?;
                file.flush().await
            }
            .await;

            if let Err(e) = written {
                drop(file);
                self.remove_best_effort(&candidate).await;
                return Err(e.into());
            }

            debug!(filename = %candidate, size = data.len(), "Stored upload");
            return Ok(candidate);
        }

        Err(StorageError::NamesExhausted(safe.candidate(0)))
    }

    /// Reads a stored file
    ///
    /// Anything that is not a regular file (a sub-directory) is not found.
    pub async fn read(&self, filename: &str) -> Result<Vec<u8>, StorageError> {
        let path = self.resolve(filename)?;

        match fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => {}
            Ok(_) => return Err(StorageError::NotFound(filename.to_string())),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StorageError::NotFound(filename.to_string()))
            }
            Err(e) => return Err(e.into()),
        }

        match fs::read(&path).await {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(StorageError::NotFound(filename.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Checks whether a stored file exists
    pub async fn exists(&self, filename: &str) -> bool {
        match self.resolve(filename) {
            Ok(path) => fs::metadata(path).await.map(|m| m.is_file()).unwrap_or(false),
            Err(_) => false,
        }
    }

    /// Removes a stored file, logging instead of failing
    ///
    /// A file that is already gone is not worth a warning.
    pub async fn remove_best_effort(&self, filename: &str) {
        let path = match self.resolve(filename) {
            Ok(path) => path,
            Err(e) => {
                warn!(filename, error = %e, "Refusing to remove upload");
                return;
            }
        };

        match fs::remove_file(&path).await {
            Ok(()) => debug!(filename, "Removed upload"),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(filename, "Upload already absent")
            }
            Err(e) => warn!(filename, error = %e, "Failed to remove upload"),
        }
    }

    /// Deletes files in the upload directory that no material references
    ///
    /// Sub-directories are left alone.
    ///
    /// # Returns
    ///
    /// Number of files removed
    pub async fn sweep_orphans(&self, referenced: &HashSet<String>) -> Result<usize, StorageError> {
        let mut removed = 0;
        let mut entries = fs::read_dir(&self.base_path).await?;

        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }

            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };

            if referenced.contains(&name) {
                continue;
            }

            match fs::remove_file(entry.path()).await {
                Ok(()) => {
                    info!(filename = %name, "Removed orphaned upload");
                    removed += 1;
                }
                Err(e) => warn!(filename = %name, error = %e, "Failed to remove orphaned upload"),
            }
        }

        Ok(removed)
    }

    /// Maps a stored filename to its path, refusing anything but a plain name
    fn resolve(&self, filename: &str) -> Result<PathBuf, StorageError> {
        let mut components = Path::new(filename).components();

        match (components.next(), components.next()) {
            (Some(Component::Normal(name)), None) if !filename.contains('\\') => {
                Ok(self.base_path.join(name))
            }
            _ => Err(StorageError::InvalidFilename(filename.to_string())),
        }
    }
}
