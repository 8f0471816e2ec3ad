//! Error types for configuration handling
//!
//! Provides error handling for:
//! - Load operations (file → raw document)
//! - Validate operations (raw document → immutable config)

use std::fmt;
use std::path::PathBuf;

/// Which configuration record a validation failure belongs to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSubject {
    /// The single network record
    Network,
    /// A tenant record, identified by name (or list position when unnamed)
    Tenant(String),
}

impl fmt::Display for ConfigSubject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Network => write!(f, "network config"),
            Self::Tenant(name) => write!(f, "tenant config '{name}'"),
        }
    }
}

/// Malformed or missing required field in a tenant or network config
///
/// Raised before any resource is constructed; the whole build stops.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{subject}: field `{field}` {reason}")]
pub struct ConfigValidationError {
    /// Record the field belongs to
    pub subject: ConfigSubject,
    /// Field name as it appears in the document
    pub field: &'static str,
    /// Human readable reason
    pub reason: String,
}

impl ConfigValidationError {
    /// Validation failure on the network record
    pub fn network(field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            subject: ConfigSubject::Network,
            field,
            reason: reason.into(),
        }
    }

    /// Validation failure on a tenant record
    pub fn tenant(name: impl Into<String>, field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            subject: ConfigSubject::Tenant(name.into()),
            field,
            reason: reason.into(),
        }
    }

    /// Required field absent from the document
    pub fn missing(subject: ConfigSubject, field: &'static str) -> Self {
        Self {
            subject,
            field,
            reason: "is required".to_string(),
        }
    }
}

/// Errors while reading a configuration document
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// No format registered for file extension
    #[error("unsupported config format for {path}: '{extension}'")]
    UnsupportedFormat { path: PathBuf, extension: String },

    /// Syntax error in source document
    #[error("syntax error in {path}: {message}")]
    Syntax { path: PathBuf, message: String },

    /// IO error during file read
    #[error("io error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Document parsed but its content is invalid
    #[error(transparent)]
    Invalid(#[from] ConfigValidationError),
}

impl LoadError {
    /// Create syntax error for path
    pub fn syntax_error(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Syntax {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
