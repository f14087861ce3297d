//! Typed hierarchical dataset model (groups, dimensions, variables,
//! attributes) plus the datastream registry that tracks input/output
//! handles across a processing run.
//!
//! This crate is the shared data model the rest of the ingest workspace
//! builds on: the merger, mapper, transformation engine, QC engine and
//! storage engine all operate on [`Group`]/[`Variable`] trees rather than
//! any file-format-specific representation.

pub mod attribute;
pub mod companion;
pub mod datastream;
pub mod dataset;
pub mod dimension;
pub mod error;
pub mod flags;
pub mod group;
pub mod registry;
pub mod split;
pub mod time;
pub mod variable;

pub use attribute::{Attribute, AttributeValue};
pub use companion::{CompanionKind, bounds_name, metric_name, qc_name};
pub use datastream::{Datastream, DatastreamFormat, DatastreamId, DatastreamRole};
pub use dataset::Dataset;
pub use dimension::Dimension;
pub use error::{ModelError, Result};
pub use flags::DatastreamFlags;
pub use group::Group;
pub use registry::DatastreamRegistry;
pub use split::{SplitMode, SplitPolicy, parse_output_interval_spec};
pub use time::TimeValue;
pub use variable::{DataType, Variable, decode_scalar_f64, encode_scalar_f64};
