//! Error types for the coordinate-system transformation engine.

use std::error::Error as StdError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransformError {
    /// A coordinate dimension has no mapped variable, no explicit values,
    /// no interval, and no retrieved coordinate variable to copy (§4.5
    /// selection precedence, rule 3 falling through). Promoted from the
    /// original engine's silent best-effort copy to a diagnosable error.
    #[error("coordinate dimension '{dimension}' of coordinate system '{coord_system}' could not be resolved: no mapped variable, explicit values, or retrieved coordinate variable found")]
    UnresolvableCoordDim { coord_system: String, dimension: String },

    /// A `required` coordinate-dimension mapping could not be found in
    /// any input datastream (§4.5 rule 1).
    #[error("required coordinate variable '{variable}' for dimension '{dimension}' not found in any input datastream")]
    RequiredVariableMissing { variable: String, dimension: String },

    #[error("invalid coordinate system '{coord_system}': {reason}")]
    InvalidCoordinateSystem { coord_system: String, reason: String },

    #[error("could not convert units for '{variable}' from '{from}' to '{to}'")]
    UnitConvertFailed { variable: String, from: String, to: String },

    #[error("bounds array for '{variable}' has length {actual}, expected {expected}")]
    BoundsLengthMismatch { variable: String, expected: usize, actual: usize },

    #[error("regrid of '{variable}' failed: {reason}")]
    RegridFailed { variable: String, reason: String },

    #[error("model error: {0}")]
    Model(#[from] ingest_model::ModelError),

    #[error("qc error: {0}")]
    Qc(#[from] ingest_qc::QcError),

    #[error("{message}")]
    Other {
        message: String,
        #[source]
        source: Option<Box<dyn StdError + Send + Sync>>,
    },
}

impl TransformError {
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
            source: None,
        }
    }

    pub fn with_context(self, context: impl Into<String>) -> Self {
        let context = context.into();
        match self {
            Self::Other { message, source } => Self::Other {
                message: format!("{context}: {message}"),
                source,
            },
            other => Self::Other {
                message: format!("{context}: {other}"),
                source: Some(Box::new(other)),
            },
        }
    }
}

impl From<anyhow::Error> for TransformError {
    fn from(err: anyhow::Error) -> Self {
        Self::Other {
            message: err.to_string(),
            source: None,
        }
    }
}

pub type Result<T> = std::result::Result<T, TransformError>;
