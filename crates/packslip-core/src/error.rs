// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Packslip.

use thiserror::Error;

/// Top-level error type for all Packslip operations.
///
/// Every variant is terminal for the composition call that produced it: the
/// core never retries and never hands back a partially written document.
#[derive(Debug, Error)]
pub enum PackslipError {
    // -- Input errors --
    #[error("missing required input: {0}")]
    MissingRequiredInput(String),

    #[error("unsupported media type: {0}")]
    UnsupportedMediaType(String),

    #[error("decode failed: {0}")]
    DecodeError(String),

    #[error("primary document is not a valid PDF: {0}")]
    InvalidPrimaryFormat(String),

    // -- Output errors --
    #[error("serialization failed: {0}")]
    SerializationError(String),

    // -- Configuration --
    #[error("invalid layout configuration: {0}")]
    InvalidConfig(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration parse error: {0}")]
    Config(#[from] serde_json::Error),
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, PackslipError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_errors_convert() {
        let err: PackslipError = std::io::Error::new(std::io::ErrorKind::NotFound, "layout.json").into();
        assert!(matches!(err, PackslipError::Io(_)));
        assert_eq!(err.to_string(), "file I/O error: layout.json");
    }

    #[test]
    fn messages_carry_context() {
        let err = PackslipError::UnsupportedMediaType("text/plain".into());
        assert_eq!(err.to_string(), "unsupported media type: text/plain");
    }
}
