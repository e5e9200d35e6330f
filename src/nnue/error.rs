//! Error types for network loading and saving.

use std::fmt;
use std::io;

/// Why a network could not be read or written.
#[derive(Debug)]
pub enum NetworkError {
    /// Underlying stream or file failure
    Io(io::Error),
    /// Header declares an unknown format version
    VersionMismatch { expected: u32, found: u32 },
    /// A header or section hash does not match this build's architecture
    HashMismatch {
        section: &'static str,
        expected: u32,
        found: u32,
    },
    /// Header declares an implausibly long description
    DescriptionTooLong { len: usize },
    /// Description bytes are not valid UTF-8
    InvalidDescription,
    /// Stream ended before all parameters were read
    Truncated,
    /// Stream holds data past the last section
    TrailingBytes,
    /// No network is loaded for this size
    NotLoaded,
    /// Refusing to save a non-default network without an explicit file name
    NonDefaultNetwork { name: String },
}

impl fmt::Display for NetworkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetworkError::Io(err) => write!(f, "I/O error: {err}"),
            NetworkError::VersionMismatch { expected, found } => {
                write!(f, "Unsupported network version {found:#010x}, expected {expected:#010x}")
            }
            NetworkError::HashMismatch {
                section,
                expected,
                found,
            } => write!(
                f,
                "Hash mismatch in {section}: found {found:#010x}, expected {expected:#010x}"
            ),
            NetworkError::DescriptionTooLong { len } => {
                write!(f, "Network description of {len} bytes is too long")
            }
            NetworkError::InvalidDescription => {
                write!(f, "Network description is not valid UTF-8")
            }
            NetworkError::Truncated => write!(f, "Network file is truncated"),
            NetworkError::TrailingBytes => write!(f, "Network file has trailing data"),
            NetworkError::NotLoaded => write!(f, "No network loaded"),
            NetworkError::NonDefaultNetwork { name } => write!(
                f,
                "Network '{name}' is not the default one; a file name must be given to save it"
            ),
        }
    }
}

impl std::error::Error for NetworkError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            NetworkError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for NetworkError {
    fn from(err: io::Error) -> Self {
        if err.kind() == io::ErrorKind::UnexpectedEof {
            NetworkError::Truncated
        } else {
            NetworkError::Io(err)
        }
    }
}
