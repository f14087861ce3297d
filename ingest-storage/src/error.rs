//! Error taxonomy for the storage/splitter engine (§4.7, §7).

use std::error::Error as StdError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    /// Two samples share a time but their per-variable bytes differ
    /// (§4.7 step 2).
    #[error("duplicate time {time} has mismatched data for variable '{variable}'")]
    DuplicateTimeMismatch { variable: String, time: f64 },

    /// `FILTER_NANS` is set but the variable has no `missing_value` or
    /// `_FillValue` attribute to replace NaN/Inf with (§4.7 step 4).
    #[error("variable '{variable}' contains NaN/Inf but defines no missing value")]
    NoMissingValueDefined { variable: String },

    /// A stored sample's time falls inside an existing file's range but
    /// its data differs from what's on disk (§4.7 step 8).
    #[error("sample at {time} overlaps previously stored data in '{file}' with different values")]
    OverlapWithStored { file: String, time: f64 },

    /// The output dataset's first sample time is not after the located
    /// file's last sample time (§4.7 step 11).
    #[error("time order violation: new data begins at {begin}, file '{file}' ends at {file_end}")]
    TimeOrderViolation { file: String, begin: f64, file_end: f64 },

    /// The dataset's begin time precedes `min_valid_time` (§4.7 step 9).
    #[error("begin time {begin} precedes the minimum valid time {min_valid_time}")]
    BeforeMinValidTime { begin: f64, min_valid_time: f64 },

    /// The dataset's end time is in the future (§4.7 step 9).
    #[error("end time {end} is in the future (now is {now})")]
    FutureTime { end: f64, now: f64 },

    /// `raw_rename`: destination exists and its MD5 differs from the
    /// source's (§4.7 "Raw renaming").
    #[error("file md5 mismatch moving '{src}' to '{dest}'")]
    FileMd5Mismatch { src: String, dest: String },

    /// `raw_rename`: every `,N` suffix up to the configured ceiling was
    /// already taken in the `.done` subdirectory.
    #[error("could not find an unused ',N' suffix for '{dest}' in '.done'")]
    RenameCollisionExhausted { dest: String },

    #[error("model error: {0}")]
    Model(#[from] ingest_model::ModelError),

    #[error("qc error: {0}")]
    Qc(#[from] ingest_qc::QcError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("{message}")]
    Other {
        message: String,
        #[source]
        source: Option<Box<dyn StdError + Send + Sync>>,
    },
}

impl StorageError {
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

impl From<anyhow::Error> for StorageError {
    fn from(err: anyhow::Error) -> Self {
        Self::Other {
            message: err.to_string(),
            source: None,
        }
    }
}

pub type Result<T> = std::result::Result<T, StorageError>;
