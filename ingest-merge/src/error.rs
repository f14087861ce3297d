//! Error types for observation merging and variable mapping.
//!
//! `MergeError` covers both C3 (the observation merger) and C4 (the
//! variable mapper); the two stages share a result type because mapping
//! always runs against data the merger has already settled.

use std::error::Error as StdError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MergeError {
    /// Two observations overlap and overlap filtering is off (§4.3 step 2).
    #[error(
        "overlapping input data: [{start_a}, {end_a}] vs [{start_b}, {end_b}] (dod {dod_a} vs {dod_b})"
    )]
    OverlappingInputData {
        start_a: f64,
        end_a: f64,
        dod_a: String,
        start_b: f64,
        end_b: f64,
        dod_b: String,
    },

    /// The output dataset already has times at the mapped slice's
    /// location that don't match the input's (§4.4 rule 3).
    #[error("conflicting time values for variable '{variable}' at output sample {sample_start}")]
    ConflictingTimeValues {
        variable: String,
        sample_start: usize,
    },

    /// A non-leading (non sample-axis) dimension length mismatch between
    /// an input and output variable; always fatal (§4.4).
    #[error(
        "dimension length mismatch copying '{variable}': input dim '{dimension}' has length {input_len}, output has {output_len}"
    )]
    DimensionMismatch {
        variable: String,
        dimension: String,
        input_len: usize,
        output_len: usize,
    },

    /// A `required` variable tag could not be resolved against any input
    /// datastream.
    #[error("required variable '{name}' not found in any input datastream")]
    RequiredVariableMissing { name: String },

    /// The output variable doesn't exist yet and dynamic-DOD mode is off,
    /// so the mapper has no variable definition to copy into.
    #[error("output variable '{name}' is undefined and dynamic-DOD mode is off")]
    OutputVariableUndefined { name: String },

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

impl MergeError {
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

impl From<anyhow::Error> for MergeError {
    fn from(err: anyhow::Error) -> Self {
        Self::Other {
            message: err.to_string(),
            source: None,
        }
    }
}

pub type Result<T> = std::result::Result<T, MergeError>;
