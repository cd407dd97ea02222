//! Error types for song deck generation.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while turning a song collection into a deck.
#[derive(Error, Debug)]
pub enum Error {
    /// The input text or template file does not exist or cannot be opened.
    #[error("File not found: {}", path.display())]
    FileNotFound { path: PathBuf },

    /// Parsing succeeded but no titled songs were found.
    #[error("No songs found in the file. Make sure song titles start with {marker}")]
    NoSongs { marker: char },

    /// Any other I/O failure (reading, writing the output).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The template file is not a usable presentation.
    #[error("Invalid template: {0}")]
    Template(String),

    /// ZIP archive error (reading or writing the PPTX container).
    #[error("ZIP error: {0}")]
    Zip(String),

    /// XML error while reading or rewriting package parts.
    #[error("XML error: {0}")]
    Xml(String),

    /// Slide assembly failed.
    #[error("Slide assembly failed: {0}")]
    Generation(String),
}

impl Error {
    /// Map an I/O error on `path` to `FileNotFound` when the path is missing.
    pub fn from_io(path: impl Into<PathBuf>, err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Error::FileNotFound { path: path.into() },
            _ => Error::Io(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_maps_to_file_not_found() {
        let err = Error::from_io(
            "missing.txt",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert!(matches!(err, Error::FileNotFound { .. }));
        assert_eq!(err.to_string(), "File not found: missing.txt");
    }

    #[test]
    fn test_other_io_errors_stay_io() {
        let err = Error::from_io(
            "locked.txt",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "nope"),
        );
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_no_songs_message_names_marker() {
        let err = Error::NoSongs { marker: '#' };
        assert_eq!(
            err.to_string(),
            "No songs found in the file. Make sure song titles start with #"
        );
    }
}
