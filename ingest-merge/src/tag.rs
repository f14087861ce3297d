//! Variable tags (spec §3 "Variable tag", §4.4): the side-channel
//! records that drive the mapper's per-variable decisions.

use ingest_model::DatastreamId;
use serde::{Deserialize, Serialize};

/// Per-variable processing flags carried on a [`VariableTag`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TagFlags {
    pub skip_transform: bool,
    pub rollup_trans_qc: bool,
    pub required: bool,
}

/// One destination a tagged variable should be materialized into.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputTarget {
    pub target_datastream: DatastreamId,
    pub target_var_name: String,
}

/// A data-quality record retrieved from an external DQR database,
/// surfaced on the variable tag rather than fetched ad hoc by the
/// mapper (spec GLOSSARY "DQR").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DqrRecord {
    pub assessment: String,
    pub start: f64,
    pub end: f64,
    pub description: String,
}

/// The side-channel record attached to a retrieved variable (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariableTag {
    pub source_datastream: DatastreamId,
    pub source_name: String,
    pub target_coord_system: Option<String>,
    pub output_targets: Vec<OutputTarget>,
    pub flags: TagFlags,
    pub dqrs: Vec<DqrRecord>,
}

impl VariableTag {
    #[must_use]
    pub fn new(source_datastream: DatastreamId, source_name: impl Into<String>) -> Self {
        Self {
            source_datastream,
            source_name: source_name.into(),
            target_coord_system: None,
            output_targets: Vec::new(),
            flags: TagFlags::default(),
            dqrs: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_output(mut self, target_datastream: DatastreamId, target_var_name: impl Into<String>) -> Self {
        self.output_targets.push(OutputTarget {
            target_datastream,
            target_var_name: target_var_name.into(),
        });
        self
    }

    #[must_use]
    pub fn with_target_coord_system(mut self, name: impl Into<String>) -> Self {
        self.target_coord_system = Some(name.into());
        self
    }

    #[must_use]
    pub fn required(mut self) -> Self {
        self.flags.required = true;
        self
    }

    #[must_use]
    pub fn rollup_trans_qc(mut self) -> Self {
        self.flags.rollup_trans_qc = true;
        self
    }

    #[must_use]
    pub fn skip_transform(mut self) -> Self {
        self.flags.skip_transform = true;
        self
    }

    #[must_use]
    pub fn has_output(&self) -> bool {
        !self.output_targets.is_empty()
    }

    /// The DQR, if any, whose time range covers `sample_time`.
    #[must_use]
    pub fn dqr_at(&self, sample_time: f64) -> Option<&DqrRecord> {
        self.dqrs
            .iter()
            .find(|dqr| dqr.start <= sample_time && sample_time <= dqr.end)
    }
}
