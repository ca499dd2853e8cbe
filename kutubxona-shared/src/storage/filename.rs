/// Filename sanitization
///
/// The extension is whatever follows the last `.` of the client's name, kept
/// only if it is non-empty ASCII alphanumeric, and lowercased. The stem is
/// everything before it, cleaned as follows:
///
/// 1. Whitespace becomes `_`
/// 2. Everything except ASCII letters, digits, `_`, `.` and `-` is dropped
///    (this removes path separators)
/// 3. Leading and trailing dots and underscores are stripped
/// 4. An empty stem becomes `upload`
///
/// ```
/// use kutubxona_shared::storage::sanitize_filename;
///
/// assert_eq!(sanitize_filename("My Book.PDF"), "My_Book.pdf");
/// assert_eq!(sanitize_filename("../../etc/passwd"), "etcpasswd");
/// assert_eq!(sanitize_filename("Китоб.epub"), "upload.epub");
/// ```

/// Stem used when nothing of the original stem survives
pub const FALLBACK_STEM: &str = "upload";

/// Sanitized filename split into stem and (possibly empty) extension
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SafeName {
    pub stem: String,
    pub extension: String,
}

impl SafeName {
    /// Parses and sanitizes a client-supplied filename
    pub fn parse(original: &str) -> Self {
        let (stem, extension) = match original.rsplit_once('.') {
            Some((stem, ext)) if !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()) => {
                (stem, ext.to_ascii_lowercase())
            }
            _ => (original, String::new()),
        };

        let cleaned: String = stem
            .chars()
            .filter_map(|c| {
                if c.is_whitespace() {
                    Some('_')
                } else if c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-') {
                    Some(c)
                } else {
                    None
                }
            })
            .collect();

        let stem = cleaned.trim_matches(|c| c == '.' || c == '_');
        let stem = if stem.is_empty() { FALLBACK_STEM } else { stem };

        Self {
            stem: stem.to_string(),
            extension,
        }
    }

    /// Name for the `n`th collision attempt
    ///
    /// Attempt 0 is the plain name, attempt `n` appends `_n` to the stem.
    pub fn candidate(&self, n: u32) -> String {
        let stem = if n == 0 {
            self.stem.clone()
        } else {
            format!("{}_{}", self.stem, n)
        };

        if self.extension.is_empty() {
            stem
        } else {
            format!("{}.{}", stem, self.extension)
        }
    }
}

/// Sanitizes a client-supplied filename
pub fn sanitize_filename(original: &str) -> String {
    SafeName::parse(original).candidate(0)
}
