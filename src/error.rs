use std::path::PathBuf;

use chrono::NaiveDate;

/// The primary error type for all operations in the `artipack` crate.
#[derive(Debug)]
pub enum PackError {
    /// The base directory handed to the collector does not exist.
    NotFound { path: PathBuf },

    /// Every entry under the base directory was unreadable. Carries the full
    /// list of paths that had to be skipped so callers see the whole picture.
    Permission { skipped: Vec<PathBuf> },

    /// A read-side I/O error, with the path where it happened.
    Io { source: std::io::Error, path: PathBuf },

    /// A write-side OS denial while materializing a manifest onto disk.
    Filesystem { source: std::io::Error, path: PathBuf },

    /// A manifest path that is absolute, escapes its root via `..`, or uses
    /// characters the archive format cannot carry. Rejected before any I/O.
    UnsafePath { path: String },

    /// An archive-level constraint was violated (path encoding, size cap).
    Encoding { reason: String },

    /// The selector string does not parse as a version-range expression.
    InvalidRange { selector: String },

    /// The selector parsed but matches no entry of the support matrix.
    UnsupportedRange { selector: String },

    /// The selector matches only runtimes whose support window has closed.
    Discontinued { selector: String, major: u64, date: NaiveDate },

    /// The operation was cancelled through its `CancelToken`.
    Cancelled,

    /// A wrapper for any other error that doesn't fit the specific variants.
    Other(Box<dyn std::error::Error + Send + Sync>),
}

impl std::fmt::Display for PackError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PackError::NotFound { path } => write!(f, "Base path '{}' does not exist", path.display()),
            PackError::Permission { skipped } => {
                let list: Vec<String> = skipped.iter().map(|p| p.display().to_string()).collect();
                write!(f, "No readable entries; skipped: {}", list.join(", "))
            }
            PackError::Io { source, path } => write!(f, "I/O error on path '{}': {}", path.display(), source),
            PackError::Filesystem { source, path } => write!(f, "Write error on path '{}': {}", path.display(), source),
            PackError::UnsafePath { path } => write!(f, "Unsafe manifest path '{}'", path),
            PackError::Encoding { reason } => write!(f, "Archive encoding error: {}", reason),
            PackError::InvalidRange { selector } => write!(f, "Invalid version range '{}'", selector),
            PackError::UnsupportedRange { selector } => write!(f, "Version range '{}' matches no supported runtime", selector),
            PackError::Discontinued { selector, major, date } => write!(
                f,
                "Version range '{}' only matches runtime major {} which was discontinued on {}",
                selector, major, date
            ),
            PackError::Cancelled => write!(f, "Operation cancelled"),
            PackError::Other(e) => write!(f, "An unexpected error occurred: {}", e),
        }
    }
}

impl std::error::Error for PackError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PackError::Io { source, .. } => Some(source),
            PackError::Filesystem { source, .. } => Some(source),
            PackError::Other(e) => Some(e.as_ref()),
            _ => None,
        }
    }
}

// Generic IO error conversion that doesn't carry a path
impl From<std::io::Error> for PackError {
    fn from(err: std::io::Error) -> Self {
        PackError::Io { source: err, path: PathBuf::new() }
    }
}

impl From<zip::result::ZipError> for PackError {
    fn from(err: zip::result::ZipError) -> Self {
        match err {
            zip::result::ZipError::Io(e) => PackError::Io { source: e, path: PathBuf::new() },
            other => PackError::Encoding { reason: other.to_string() },
        }
    }
}
