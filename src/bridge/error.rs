// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Mark Wells <contact@markwells.dev>

//! Error taxonomy shared by every privileged service.
//!
//! `Display` output is what crosses the process boundary, so variants carry
//! short, generic messages. The underlying `source` stays on this side and is
//! only ever logged.

use std::io;
use thiserror::Error;

/// Failure of a privileged operation.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Path or content rejected by the security policy. Never retried.
    #[error("{0}")]
    PolicyViolation(Denial),

    /// The target does not exist.
    #[error("{context}: {source}")]
    NotFound {
        /// What was being attempted.
        context: &'static str,
        /// The underlying OS error.
        #[source]
        source: io::Error,
    },

    /// Any other storage failure, surfaced with the OS message.
    #[error("{context}: {source}")]
    Io {
        /// What was being attempted.
        context: &'static str,
        /// The underlying OS error.
        #[source]
        source: io::Error,
    },

    /// The request was well-formed JSON but not a valid operation.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The settings document could not be written back.
    #[error("Failed to save settings: {0}")]
    Persistence(#[source] io::Error),
}

/// The generic denial reasons a caller may see.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Denial {
    /// A file path failed the path rule.
    FilePath,
    /// A directory path failed the path rule.
    DirectoryPath,
    /// A project root failed the path rule.
    ProjectPath,
    /// File content matched an injection pattern.
    UnsafeContent,
}

impl std::fmt::Display for Denial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let message = match self {
            Self::FilePath => "Invalid file path",
            Self::DirectoryPath => "Invalid directory path",
            Self::ProjectPath => "Invalid project path",
            Self::UnsafeContent => "Content contains potentially dangerous patterns",
        };
        f.write_str(message)
    }
}

impl ServiceError {
    /// Classifies an I/O error, splitting out `NotFound`.
    #[must_use]
    pub fn io(context: &'static str, source: io::Error) -> Self {
        if source.kind() == io::ErrorKind::NotFound {
            Self::NotFound { context, source }
        } else {
            Self::Io { context, source }
        }
    }
}

/// Result alias for privileged operations.
pub type ServiceResult<T> = Result<T, ServiceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_is_split_out() {
        let err = ServiceError::io(
            "Failed to read file",
            io::Error::new(io::ErrorKind::NotFound, "gone"),
        );
        assert!(matches!(err, ServiceError::NotFound { .. }));
        assert_eq!(err.to_string(), "Failed to read file: gone");
    }

    #[test]
    fn test_denial_message_is_generic() {
        let err = ServiceError::PolicyViolation(Denial::FilePath);
        assert_eq!(err.to_string(), "Invalid file path");
    }
}
