/// Upload directory management
///
/// Uploaded files live flat in a single directory. Stored names are derived
/// from the client's filename, sanitized, and made unique by appending
/// `_1`, `_2`, … before the extension.
///
/// # Modules
///
/// - `filename`: Sanitization and collision-candidate naming
/// - `upload_store`: Writing, reading, and removing files on disk
///
/// # Example
///
/// ```no_run
/// use kutubxona_shared::storage::UploadStore;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = UploadStore::new("uploads").await?;
///
/// let first = store.store("My Book.pdf", b"%PDF-1.4").await?;
/// let second = store.store("My Book.pdf", b"%PDF-1.4").await?;
/// assert_eq!(first, "My_Book.pdf");
/// assert_eq!(second, "My_Book_1.pdf");
/// # Ok(())
/// # }
/// ```

pub mod filename;
pub mod upload_store;

pub use filename::sanitize_filename;
pub use upload_store::UploadStore;

/// Error type for upload storage
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Requested name would leave the upload directory or is not a plain name
    #[error("Invalid filename: {0}")]
    InvalidFilename(String),

    /// No stored file by that name
    #[error("File not found: {0}")]
    NotFound(String),

    /// Every collision candidate is taken
    #[error("No free filename for {0}")]
    NamesExhausted(String),

    /// Underlying filesystem error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
