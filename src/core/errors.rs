//! SGQ-prefixed error types with structured error codes.

#![allow(missing_docs)]

use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

/// Shared `Result` alias for the project.
pub type Result<T> = std::result::Result<T, SgqError>;

/// Top-level error type for the sensor gateway query engine.
#[derive(Debug, Error)]
pub enum SgqError {
    #[error("[SGQ-1001] invalid configuration: {details}")]
    InvalidConfig { details: String },

    #[error("[SGQ-1002] missing configuration file: {path}")]
    MissingConfig { path: PathBuf },

    #[error("[SGQ-1003] configuration parse failure in {context}: {details}")]
    ConfigParse {
        context: &'static str,
        details: String,
    },

    #[error("[SGQ-2001] invalid parameter {name}: {details}")]
    InvalidParameter { name: &'static str, details: String },

    #[error("[SGQ-2002] {source_kind} not found at {path}")]
    NotFound {
        source_kind: &'static str,
        path: PathBuf,
    },

    #[error("[SGQ-3001] reading store unavailable at {path}: {details}")]
    StoreUnavailable { path: PathBuf, details: String },

    #[error("[SGQ-3002] SQL failure in {context}: {details}")]
    Sql {
        context: &'static str,
        details: String,
    },

    #[error("[SGQ-3003] failed to read {source_kind} at {path}: {source}")]
    ReadFailure {
        source_kind: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("[SGQ-3101] serialization failure in {context}: {details}")]
    Serialization {
        context: &'static str,
        details: String,
    },

    #[error("[SGQ-3900] IO failure at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("[SGQ-3901] failed to write output: {source}")]
    OutputWrite {
        #[source]
        source: std::io::Error,
    },
}

/// Coarse error classification handed to callers of the query facade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    InvalidParameter,
    StoreUnavailable,
    ReadFailure,
    Config,
    Internal,
}

impl ErrorKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::InvalidParameter => "invalid_parameter",
            Self::StoreUnavailable => "store_unavailable",
            Self::ReadFailure => "read_failure",
            Self::Config => "config",
            Self::Internal => "internal",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl SgqError {
    /// Stable machine-parseable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidConfig { .. } => "SGQ-1001",
            Self::MissingConfig { .. } => "SGQ-1002",
            Self::ConfigParse { .. } => "SGQ-1003",
            Self::InvalidParameter { .. } => "SGQ-2001",
            Self::NotFound { .. } => "SGQ-2002",
            Self::StoreUnavailable { .. } => "SGQ-3001",
            Self::Sql { .. } => "SGQ-3002",
            Self::ReadFailure { .. } => "SGQ-3003",
            Self::Serialization { .. } => "SGQ-3101",
            Self::Io { .. } => "SGQ-3900",
            Self::OutputWrite { .. } => "SGQ-3901",
        }
    }

    /// Classification used by the facade's uniform failure result.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidConfig { .. } | Self::MissingConfig { .. } | Self::ConfigParse { .. } => {
                ErrorKind::Config
            }
            Self::InvalidParameter { .. } => ErrorKind::InvalidParameter,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::StoreUnavailable { .. } | Self::Sql { .. } => ErrorKind::StoreUnavailable,
            Self::ReadFailure { .. } => ErrorKind::ReadFailure,
            Self::Serialization { .. } | Self::Io { .. } | Self::OutputWrite { .. } => {
                ErrorKind::Internal
            }
        }
    }

    /// Message safe to hand to untrusted callers: no filesystem paths.
    #[must_use]
    pub fn public_message(&self) -> String {
        match self {
            Self::InvalidConfig { .. } | Self::MissingConfig { .. } | Self::ConfigParse { .. } => {
                "service configuration is invalid".to_string()
            }
            Self::InvalidParameter { name, details } => format!("invalid {name}: {details}"),
            Self::NotFound { source_kind, .. } => format!("{source_kind} not found"),
            Self::StoreUnavailable { .. } => "reading store is unavailable".to_string(),
            Self::Sql { .. } => "reading store query failed".to_string(),
            Self::ReadFailure { source_kind, source, .. } => {
                format!("failed to read {source_kind}: {}", source.kind())
            }
            Self::Serialization { .. } | Self::Io { .. } => "internal error".to_string(),
            Self::OutputWrite { source } => format!("failed to write output: {}", source.kind()),
        }
    }

    /// Nothing in the read path is retried; a failed read is reported once.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        false
    }

    /// Convenience constructor for IO errors with a known path.
    #[must_use]
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Classify a failed read of a file-backed source.
    #[must_use]
    pub fn source_read(
        source_kind: &'static str,
        path: impl AsRef<Path>,
        source: std::io::Error,
    ) -> Self {
        let path = path.as_ref().to_path_buf();
        if source.kind() == std::io::ErrorKind::NotFound {
            Self::NotFound { source_kind, path }
        } else {
            Self::ReadFailure {
                source_kind,
                path,
                source,
            }
        }
    }

    /// Convenience constructor for a malformed caller parameter.
    #[must_use]
    pub fn invalid_parameter(name: &'static str, details: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name,
            details: details.into(),
        }
    }
}

impl From<rusqlite::Error> for SgqError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sql {
            context: "rusqlite",
            details: value.to_string(),
        }
    }
}

impl From<serde_json::Error> for SgqError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization {
            context: "serde_json",
            details: value.to_string(),
        }
    }
}

impl From<toml::de::Error> for SgqError {
    fn from(value: toml::de::Error) -> Self {
        Self::ConfigParse {
            context: "toml",
            details: value.to_string(),
        }
    }
}
