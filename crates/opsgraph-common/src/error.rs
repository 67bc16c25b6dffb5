//! Error types and utilities for OpsGraph

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for OpsGraph operations
pub type Result<T> = std::result::Result<T, OpsGraphError>;

type BoxedSource = Box<dyn std::error::Error + Send + Sync>;

/// Failures raised while reading one sheet of the input workbook.
///
/// Callers are expected to log these and skip the charts that depend on the
/// sheet; they never abort a whole report run.
#[derive(Error, Debug)]
pub enum LoadError {
    /// The backing workbook does not exist.
    #[error("input workbook not found at '{}'", .path.display())]
    FileMissing {
        /// Path that was checked.
        path: PathBuf,
    },

    /// The workbook exists but has no sheet with the requested name.
    #[error("sheet '{sheet}' not found in workbook")]
    SheetMissing {
        /// Requested sheet name.
        sheet: String,
    },

    /// Anything else: corrupt file, unreadable range, malformed header.
    #[error("unexpected error while loading sheet '{sheet}': {message}")]
    Unexpected {
        /// Requested sheet name.
        sheet: String,
        /// Human readable description.
        message: String,
        /// Underlying cause, when there is one.
        #[source]
        source: Option<BoxedSource>,
    },
}

impl LoadError {
    /// Create an unexpected load error without an underlying cause
    pub fn unexpected(sheet: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Unexpected {
            sheet: sheet.into(),
            message: msg.into(),
            source: None,
        }
    }

    /// Create an unexpected load error wrapping its cause
    pub fn unexpected_with_source(
        sheet: impl Into<String>,
        msg: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Unexpected {
            sheet: sheet.into(),
            message: msg.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Short machine-friendly name of the failure kind
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::FileMissing { .. } => "file_missing",
            Self::SheetMissing { .. } => "sheet_missing",
            Self::Unexpected { .. } => "unexpected_load_error",
        }
    }
}

/// Main error type for OpsGraph operations
#[derive(Error, Debug)]
pub enum OpsGraphError {
    /// Configuration related errors
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<BoxedSource>,
    },

    /// I/O related errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Sheet loading errors
    #[error("Load error: {0}")]
    Load(#[from] LoadError),

    /// A column a transform relies on is absent or has the wrong kind
    #[error("Incompatible schema: {message}")]
    IncompatibleSchema {
        message: String,
        column: Option<String>,
    },

    /// Chart drawing or image encoding errors
    #[error("Render error: {message}")]
    Render {
        message: String,
        #[source]
        source: Option<BoxedSource>,
    },

    /// Validation errors for configuration values or input data
    #[error("Validation error: {message}")]
    Validation {
        message: String,
        field: Option<String>,
    },

    /// Generic error with custom message
    #[error("{message}")]
    Generic {
        message: String,
        #[source]
        source: Option<BoxedSource>,
    },
}

impl OpsGraphError {
    /// Create a new generic error with a custom message
    pub fn new(msg: impl Into<String>) -> Self {
        Self::Generic {
            message: msg.into(),
            source: None,
        }
    }

    /// Create a new generic error with a custom message and source
    pub fn with_source(
        msg: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Generic {
            message: msg.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
            source: None,
        }
    }

    /// Create a new configuration error with source
    pub fn config_with_source(
        msg: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Config {
            message: msg.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a schema error for a missing or mistyped column
    pub fn missing_column(column: impl Into<String>) -> Self {
        let column = column.into();
        Self::IncompatibleSchema {
            message: format!("required column '{column}' is absent"),
            column: Some(column),
        }
    }

    /// Create a schema error without a specific column
    pub fn schema(msg: impl Into<String>) -> Self {
        Self::IncompatibleSchema {
            message: msg.into(),
            column: None,
        }
    }

    /// Create a new render error
    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render {
            message: msg.into(),
            source: None,
        }
    }

    /// Create a new render error with source
    pub fn render_with_source(
        msg: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Render {
            message: msg.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a new validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
            field: None,
        }
    }

    /// Create a new validation error with field name
    pub fn validation_field(msg: impl Into<String>, field: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
            field: Some(field.into()),
        }
    }

    /// Whether the error only means a derived metric or chart must be omitted
    pub const fn is_schema_gap(&self) -> bool {
        matches!(self, Self::IncompatibleSchema { .. })
    }
}

#[cfg(feature = "plotters")]
/// Convert from plotters drawing errors to OpsGraphError
impl<T> From<plotters::drawing::DrawingAreaErrorKind<T>> for OpsGraphError
where
    T: std::error::Error + Send + Sync + 'static,
{
    fn from(err: plotters::drawing::DrawingAreaErrorKind<T>) -> Self {
        Self::render_with_source("Chart rendering failed", err)
    }
}
