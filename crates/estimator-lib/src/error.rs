//! Library error type

use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced at the library's public boundary.
///
/// Parse-level failures (missing sections, malformed rows, unreadable dump
/// files) are recovered in place and never reach this type; what remains is
/// bad configuration and bad quote input.
#[derive(Debug, Error)]
pub enum EstimatorError {
    #[error("failed to read {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid pricing catalog")]
    Catalog(#[from] config::ConfigError),

    #[error("invalid quote file {path}")]
    QuoteFile {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
