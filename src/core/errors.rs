//! SAV-prefixed error types with structured error codes.

#![allow(missing_docs)]

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Shared `Result` alias for the project.
pub type Result<T> = std::result::Result<T, SavError>;

/// Top-level error type for the analyzer crate.
///
/// The visualization itself never returns these; they surface only at the
/// fallible edges (config loading, CLI input, log files).
#[derive(Debug, Error)]
pub enum SavError {
    #[error("[SAV-1001] invalid configuration: {details}")]
    InvalidConfig { details: String },

    #[error("[SAV-1002] missing configuration file: {path}")]
    MissingConfig { path: PathBuf },

    #[error("[SAV-1003] configuration parse failure in {context}: {details}")]
    ConfigParse {
        context: &'static str,
        details: String,
    },

    #[error("[SAV-2001] invalid bit string at offset {offset}: {found:?}")]
    InvalidBits { offset: usize, found: char },

    #[error("[SAV-2101] serialization failure in {context}: {details}")]
    Serialization {
        context: &'static str,
        details: String,
    },

    #[error("[SAV-3002] IO failure at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl SavError {
    /// Stable machine-parseable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidConfig { .. } => "SAV-1001",
            Self::MissingConfig { .. } => "SAV-1002",
            Self::ConfigParse { .. } => "SAV-1003",
            Self::InvalidBits { .. } => "SAV-2001",
            Self::Serialization { .. } => "SAV-2101",
            Self::Io { .. } => "SAV-3002",
        }
    }

    /// Convenience constructor for IO errors with a known path.
    #[must_use]
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}

impl From<serde_json::Error> for SavError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization {
            context: "serde_json",
            details: value.to_string(),
        }
    }
}

impl From<toml::de::Error> for SavError {
    fn from(value: toml::de::Error) -> Self {
        Self::ConfigParse {
            context: "toml",
            details: value.to_string(),
        }
    }
}

impl From<toml::ser::Error> for SavError {
    fn from(value: toml::ser::Error) -> Self {
        Self::Serialization {
            context: "toml",
            details: value.to_string(),
        }
    }
}
