//! Error types for QC bit checks and outlier filtering.

use std::error::Error as StdError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum QcError {
    /// A QC variable's sample size doesn't match its data variable's
    /// (§4.6 limit-check precondition).
    #[error(
        "QC variable dimensions do not match '{variable}': variable sample size {var_size}, qc variable sample size {qc_size}"
    )]
    DimensionMismatch {
        variable: String,
        var_size: usize,
        qc_size: usize,
    },

    /// A threshold attribute (`{test}_min`/`{test}_max`) is set but no bit
    /// description matches its canonical phrasing, and no default flag was
    /// supplied by the caller.
    #[error("could not find {test} bit description for '{variable}'")]
    NoBitDescription { variable: String, test: String },

    /// A solar-obstruction range attribute is malformed (wrong length, or
    /// elevation `low > high`).
    #[error("invalid {attribute} on '{variable}': {reason}")]
    InvalidRange {
        variable: String,
        attribute: String,
        reason: String,
    },

    /// The time variable could not be located or decoded for time checks.
    #[error("no time variable found in group '{group}'")]
    NoTimeVariable { group: String },

    /// Outlier window width or min-points configuration is nonsensical.
    #[error("invalid outlier configuration: {0}")]
    InvalidConfig(String),

    #[error("model error: {0}")]
    Model(#[from] ingest_model::ModelError),

    #[error("{message}")]
    Other {
        message: String,
        #[source]
        source: Option<Box<dyn StdError + Send + Sync>>,
    },
}

impl QcError {
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

impl From<anyhow::Error> for QcError {
    fn from(err: anyhow::Error) -> Self {
        Self::Other {
            message: err.to_string(),
            source: None,
        }
    }
}

pub type Result<T> = std::result::Result<T, QcError>;
