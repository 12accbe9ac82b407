//! Error types for the bulk configuration tool.
//!
//! This module provides the error hierarchy for every stage of a run:
//! loading the change file, applying stanzas and validating cluster
//! replication.

use std::path::PathBuf;
use thiserror::Error;

/// Maximum number of characters of a response body kept in error details.
pub const BODY_EXCERPT_CHARS: usize = 200;

/// The main error type for the bulk configuration tool.
#[derive(Debug, Error)]
pub enum SplunkConfError {
    /// Configuration-related errors.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Errors raised while applying a stanza.
    #[error("Apply error: {0}")]
    Apply(#[from] ApplyError),

    /// Cluster validation errors.
    #[error("Cluster validation error: {0}")]
    Cluster(#[from] ClusterError),

    /// IO errors.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The change file was not found.
    #[error("Change file not found: {path}")]
    FileNotFound {
        /// Path to the missing file.
        path: PathBuf,
    },

    /// The change file could not be parsed.
    #[error("Failed to parse change file: {message}")]
    ParseError {
        /// Description of the parse error.
        message: String,
        /// Optional source location.
        location: Option<String>,
    },

    /// Validation failed.
    #[error("Validation failed: {message}")]
    ValidationError {
        /// Description of the validation error.
        message: String,
        /// Field that failed validation.
        field: Option<String>,
    },

    /// Environment variable is missing.
    #[error("Missing environment variable: {name}")]
    MissingEnvVar {
        /// Name of the missing variable.
        name: String,
    },

    /// Neither a resource id nor a conf type + title were available.
    #[error("Stanza '{title}' has no id and no conf type was provided")]
    UnresolvedTarget {
        /// Title of the item that could not be resolved.
        title: String,
    },
}

/// Errors raised while talking to the management API for one stanza.
#[derive(Debug, Error)]
pub enum ApplyError {
    /// The stanza does not exist (HTTP 404).
    #[error("Stanza not found at {path}")]
    NotFound {
        /// Path that returned 404.
        path: String,
    },

    /// The server answered with a non-success status.
    #[error("Status: {status}, Body: {body}")]
    RemoteRejection {
        /// HTTP status code.
        status: u16,
        /// Excerpt of the response body.
        body: String,
    },

    /// The request never produced a response (timeout, refused, TLS).
    #[error("Transport error: {message}")]
    Transport {
        /// Description of the transport failure.
        message: String,
    },

    /// The response could not be interpreted.
    #[error("Invalid response: {message}")]
    InvalidResponse {
        /// Description of the response issue.
        message: String,
    },
}

/// Cluster validation errors. These abort the validation phase only.
#[derive(Debug, Error)]
pub enum ClusterError {
    /// The captain reported that the cluster is not ready.
    #[error("Captain '{label}' is not ready (service_ready_flag={flag})")]
    CaptainUnhealthy {
        /// Captain label.
        label: String,
        /// Observed readiness flag.
        flag: String,
    },

    /// The coordinating host is not a search head cluster member.
    #[error("Host does not appear to be a cluster member (HTTP {status})")]
    NotClustered {
        /// HTTP status returned by the captain info endpoint.
        status: u16,
    },

    /// The captain endpoint could not be queried.
    #[error("Failed to reach captain info endpoint: {message}")]
    CaptainUnreachable {
        /// Description of the failure.
        message: String,
    },

    /// The member roster could not be retrieved.
    #[error("Failed to discover members: {message}")]
    MemberDiscoveryFailed {
        /// Description of the failure.
        message: String,
    },
}

/// Result type alias for bulk configuration operations.
pub type Result<T> = std::result::Result<T, SplunkConfError>;

impl SplunkConfError {
    /// Creates a new internal error with the given message.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }
}

impl ConfigError {
    /// Creates a validation error for a specific field.
    #[must_use]
    pub fn validation(message: impl Into<String>, field: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
            field: Some(field.into()),
        }
    }
}

impl ApplyError {
    /// Creates a remote rejection error, keeping only an excerpt of the body.
    #[must_use]
    pub fn rejected(status: u16, body: &str) -> Self {
        Self::RemoteRejection {
            status,
            body: excerpt(body),
        }
    }

    /// Creates a transport error.
    #[must_use]
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Returns true if the error is a transport-level failure.
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }
}

/// Truncates a response body to [`BODY_EXCERPT_CHARS`] characters.
#[must_use]
pub fn excerpt(body: &str) -> String {
    let trimmed = body.trim();
    match trimmed.char_indices().nth(BODY_EXCERPT_CHARS) {
        Some((idx, _)) => format!("{}...", &trimmed[..idx]),
        None => trimmed.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_excerpt_keeps_short_bodies() {
        assert_eq!(excerpt("  not found \n"), "not found");
    }

    #[test]
    fn test_excerpt_truncates_on_char_boundary() {
        let body = "é".repeat(BODY_EXCERPT_CHARS + 10);
        let short = excerpt(&body);
        assert!(short.ends_with("..."));
        assert_eq!(short.chars().count(), BODY_EXCERPT_CHARS + 3);
    }

    #[test]
    fn test_rejection_display_includes_status_and_body() {
        let err = ApplyError::rejected(400, "bad argument");
        assert_eq!(err.to_string(), "Status: 400, Body: bad argument");
        assert!(!err.is_transport());
        assert!(ApplyError::transport("refused").is_transport());
    }

    #[test]
    fn test_io_errors_convert_through_question_mark() {
        fn open_log(path: &std::path::Path) -> Result<std::fs::File> {
            Ok(std::fs::File::options().append(true).open(path)?)
        }

        let dir = tempfile::tempdir().unwrap();
        let err = open_log(&dir.path().join("missing").join("run.log")).unwrap_err();
        assert!(matches!(err, SplunkConfError::Io(_)));
        assert!(err.to_string().starts_with("IO error:"));
    }
}
