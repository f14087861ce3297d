//! Error taxonomy for the dataset model (spec §4.1, §7).

use thiserror::Error;

/// Errors raised by [`crate::group::Group`], [`crate::variable::Variable`]
/// and the datastream registry.
///
/// `oom` from the original taxonomy has no variant here: Rust's global
/// allocator aborts the process on allocation failure, so there is no
/// catchable path to represent it — the process-level abort already
/// satisfies the "fatal" policy §7 assigns to `oom`.
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("no such {kind} '{name}' in group '{group}'")]
    NoSuchName {
        kind: &'static str,
        name: String,
        group: String,
    },

    #[error("type mismatch for '{name}': expected {expected:?}, got {actual:?}")]
    TypeMismatch {
        name: String,
        expected: crate::variable::DataType,
        actual: crate::variable::DataType,
    },

    #[error("dimension '{0}' is locked against redefinition")]
    DimensionLocked(String),

    #[error("group '{0}' is locked against definition changes")]
    GroupLocked(String),

    #[error("variable '{0}' has no time variable (expected `time` or `base_time`+`time_offset`)")]
    NoTimeVariable(String),

    #[error("malformed time units string: '{0}'")]
    BadTimeUnits(String),

    #[error("datastream key already registered with a different role/format: {0}")]
    DatastreamConflict(String),

    #[error("unknown datastream id {0}")]
    UnknownDatastream(u64),

    #[error("invalid output-interval spec: '{0}'")]
    BadOutputIntervalSpec(String),
}

pub type Result<T> = std::result::Result<T, ModelError>;
