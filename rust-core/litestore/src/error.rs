// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Error types for LiteStore.
//
// Reads and writes against a store's in-memory contents are total and never
// produce an error. Failures only surface from `synchronize()` (codec or I/O)
// and from the registry when a store cannot be opened under the requested
// name or path.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur when persisting or opening a store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// An I/O error occurred while writing the store file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The codec failed to encode (or decode) the store contents.
    #[error("codec error: {0}")]
    Codec(String),

    /// A store with this name is already live under a different path.
    #[error("store '{name}' is already open at {existing} (requested {requested})")]
    PathConflict {
        /// Name of the store.
        name: String,
        /// Path the live instance was opened with.
        existing: PathBuf,
        /// Path passed to the conflicting lookup.
        requested: PathBuf,
    },

    /// The file is already backing a live store with a different name.
    #[error("{path} is already backing store '{owner}' (requested as '{requested}')")]
    PathInUse {
        /// Normalised file path.
        path: PathBuf,
        /// Name of the live store using the file.
        owner: String,
        /// Name passed to the conflicting lookup.
        requested: String,
    },

    /// The store name cannot be used to derive a file name.
    #[error("invalid store name: {0:?}")]
    InvalidName(String),
}

/// Convenience alias used throughout the crate.
pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_display() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only");
        let err = StoreError::from(io_err);
        assert!(err.to_string().contains("I/O error"));
        assert!(err.to_string().contains("read-only"));
    }

    #[test]
    fn test_codec_error_display() {
        let err = StoreError::Codec("unexpected end of input".to_string());
        assert_eq!(err.to_string(), "codec error: unexpected end of input");
    }

    #[test]
    fn test_path_conflict_display() {
        let err = StoreError::PathConflict {
            name: "prefs".to_string(),
            existing: PathBuf::from("/a/prefs.json"),
            requested: PathBuf::from("/b/prefs.json"),
        };
        let msg = err.to_string();
        assert!(msg.contains("prefs"));
        assert!(msg.contains("/a/prefs.json"));
        assert!(msg.contains("/b/prefs.json"));
    }

    #[test]
    fn test_path_in_use_display() {
        let err = StoreError::PathInUse {
            path: PathBuf::from("/data/shared.json"),
            owner: "first".to_string(),
            requested: "second".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "/data/shared.json is already backing store 'first' (requested as 'second')"
        );
    }

    #[test]
    fn test_invalid_name_display() {
        let err = StoreError::InvalidName("../etc".to_string());
        assert_eq!(err.to_string(), "invalid store name: \"../etc\"");
    }
}
