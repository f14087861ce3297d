//! Ingest/vap entry point (§6): parses the command line, builds the
//! process-wide context and the filesystem-backed metadata/storage
//! collaborators, and runs one processing interval.

use clap::Parser;
use ingest_cli::cli::Cli;
use ingest_cli::context::ProcessContext;
use ingest_cli::metadata::FilesystemMetadataProvider;
use ingest_cli::pipeline;
use ingest_model::DatastreamRegistry;
use ingest_qc::checks::StandardQcConfig;
use ingest_storage::{FilesystemSink, NoopHook};

fn main() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();

    std::process::exit(run());
}

fn run() -> i32 {
    let cli = Cli::parse();
    let now = chrono::Utc::now().timestamp() as f64;

    let ctx = match ProcessContext::from_cli(&cli, now) {
        Ok(ctx) => ctx,
        Err(err) => {
            tracing::error!(%err, "invalid command line");
            return 1;
        }
    };

    tracing::info!(
        site = %ctx.site,
        facility = %ctx.facility,
        process = %ctx.process_name,
        begin = ctx.begin,
        end = ctx.end,
        "starting processing interval"
    );

    let metadata = FilesystemMetadataProvider::new(ctx.paths.conf_data.clone(), ctx.paths.logs_data.clone(), ctx.disable_db_updates);
    let mut registry = DatastreamRegistry::new();
    let directory = FilesystemSink::new();
    let mut sink = FilesystemSink::new();
    let hook = NoopHook;
    let qc_config = StandardQcConfig::default();

    let report = match pipeline::run(&ctx, &metadata, &mut registry, &directory, &mut sink, &hook, &qc_config) {
        Ok(report) => report,
        Err(err) => {
            tracing::error!(%err, "processing interval failed");
            return 1;
        }
    };

    if let Some(reason) = &report.disabled_reason {
        tracing::warn!(reason, "auto-disabled; exiting cleanly");
        return 0;
    }

    for (dsc_name, store_report) in &report.stores {
        if store_report.stored {
            tracing::info!(
                datastream = dsc_name,
                files = ?store_report.files_written,
                records = store_report.records_written,
                "stored output dataset"
            );
        } else {
            tracing::info!(datastream = dsc_name, "output dataset dropped (no data or custom-QC veto)");
        }
    }

    0
}
