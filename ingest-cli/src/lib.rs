//! Command-line ingest/vap entry point (§6): wires the CLI flag surface
//! and the out-of-scope metadata/retrieval layer into the `ingest-model`
//! / `ingest-merge` / `ingest-transform` / `ingest-qc` / `ingest-storage`
//! crates' strict processing order.

pub mod cli;
pub mod context;
pub mod error;
pub mod metadata;
pub mod pipeline;

pub use cli::Cli;
pub use context::ProcessContext;
pub use error::{CliError, Result};
pub use metadata::{FilesystemMetadataProvider, MetadataProvider};
pub use pipeline::PipelineReport;
