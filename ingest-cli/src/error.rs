//! Error taxonomy for the CLI/orchestration crate (§7): aggregates every
//! engine crate's error type plus the handful of CLI-specific failures
//! (bad flag values, missing required environment/config).

use std::error::Error as StdError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("invalid processing interval '{0}': expected YYYYMMDD[.hhmmss][:YYYYMMDD[.hhmmss]]")]
    BadInterval(String),

    #[error("unknown site/facility '{site}{facility}': no datastreams configured")]
    UnknownSiteFacility { site: String, facility: String },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("model error: {0}")]
    Model(#[from] ingest_model::ModelError),

    #[error("merge error: {0}")]
    Merge(#[from] ingest_merge::MergeError),

    #[error("transform error: {0}")]
    Transform(#[from] ingest_transform::TransformError),

    #[error("qc error: {0}")]
    Qc(#[from] ingest_qc::QcError),

    #[error("storage error: {0}")]
    Storage(#[from] ingest_storage::StorageError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{message}")]
    Other {
        message: String,
        #[source]
        source: Option<Box<dyn StdError + Send + Sync>>,
    },
}

impl CliError {
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
            source: None,
        }
    }
}

impl From<anyhow::Error> for CliError {
    fn from(err: anyhow::Error) -> Self {
        Self::Other {
            message: err.to_string(),
            source: None,
        }
    }
}

pub type Result<T> = std::result::Result<T, CliError>;
