//! Error types for Iceberg metadata table operations.

use thiserror::Error;

/// Errors from Iceberg metadata table operations.
#[derive(Debug, Error)]
pub enum IcebergError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Metadata parsing error
    #[error("Metadata error: {0}")]
    Metadata(String),

    /// Storage backend error (file not found, backend failure)
    #[error("Storage error: {0}")]
    Storage(String),

    /// Reading a file failed; carries the offending location.
    #[error("Cannot read file {path}: {source}")]
    Io {
        /// Location of the file that could not be read
        path: String,
        /// Underlying storage failure
        #[source]
        source: Box<IcebergError>,
    },

    /// Binary layout of a file could not be decoded.
    #[error("Cannot decode {path}: {message}")]
    Decode {
        /// Location of the file being decoded
        path: String,
        /// What went wrong
        message: String,
    },

    /// Manifest record error (shape or value problems outside a file context)
    #[error("Manifest error: {0}")]
    Manifest(String),

    /// Schema lookup or projection error
    #[error("Schema error: {0}")]
    Schema(String),

    /// Scan planning error
    #[error("Scan error: {0}")]
    Scan(String),
}

impl IcebergError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn metadata(msg: impl Into<String>) -> Self {
        Self::Metadata(msg.into())
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    pub fn manifest(msg: impl Into<String>) -> Self {
        Self::Manifest(msg.into())
    }

    pub fn schema(msg: impl Into<String>) -> Self {
        Self::Schema(msg.into())
    }

    pub fn scan(msg: impl Into<String>) -> Self {
        Self::Scan(msg.into())
    }

    /// Wrap a storage failure with the location that was being read.
    pub fn io(path: impl Into<String>, source: IcebergError) -> Self {
        Self::Io {
            path: path.into(),
            source: Box::new(source),
        }
    }

    pub fn decode(path: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Decode {
            path: path.into(),
            message: msg.into(),
        }
    }

    /// True for failures reading a resource (as opposed to decoding it).
    pub fn is_io(&self) -> bool {
        matches!(self, Self::Io { .. } | Self::Storage(_))
    }

    /// True for malformed file content.
    pub fn is_decode(&self) -> bool {
        matches!(self, Self::Decode { .. })
    }

    /// The file location attached to this error, if any.
    pub fn path(&self) -> Option<&str> {
        match self {
            Self::Io { path, .. } | Self::Decode { path, .. } => Some(path.as_str()),
            _ => None,
        }
    }
}

/// Result type for Iceberg metadata table operations.
pub type Result<T> = std::result::Result<T, IcebergError>;
