//! Observation merger and variable mapper.
//!
//! This crate turns a tree of per-observation groups retrieved from
//! input datastreams into the merged, tagged, time-aligned data the
//! transformation and QC engines operate on: [`merge::merge_observations`]
//! folds adjacent observations within a stream into one continuous
//! group, and [`mapper::map_variables`] copies tagged variables from
//! that merged tree into their output datasets.

pub mod error;
pub mod history;
pub mod mapper;
pub mod merge;
pub mod tag;

pub use error::{MergeError, Result};
pub use mapper::{MappingRecord, map_variables};
pub use merge::{MergeReport, Observation, OverlapMode, merge_observations};
pub use tag::{DqrRecord, OutputTarget, TagFlags, VariableTag};
