//! Application-wide error types using thiserror.

use opsgraph_common::OpsGraphError;
use std::path::PathBuf;

/// Errors that stop a run before any section starts.
#[derive(thiserror::Error, Debug)]
pub enum ReportError {
    /// Configuration or logging setup error.
    #[error("Configuration error: {0}")]
    Config(#[from] OpsGraphError),

    /// Output directory could not be created.
    #[error("Cannot prepare output directory '{}': {source}", path.display())]
    OutputDir {
        /// Directory path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// Result type for the report application.
pub type ReportResult<T> = Result<T, ReportError>;
