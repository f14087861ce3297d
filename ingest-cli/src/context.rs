//! Process-wide context (§5 "Process-wide state"): the single
//! long-lived object carrying identity, the processing interval and the
//! small set of global switches, built once from CLI flags and
//! environment variables before the pipeline enters its steady state.

use std::env;
use std::path::PathBuf;

use crate::cli::Cli;
use crate::error::Result;

/// Resolved `DATASTREAM_DATA`/`LOGS_DATA`/`CONF_DATA`/`DB_CONNECT_FILE`/
/// `PROC_INTERVAL`/`DATA_HOME` (§6 "Environment variables"), all optional.
#[derive(Debug, Clone)]
pub struct Paths {
    pub datastream_data: PathBuf,
    pub logs_data: PathBuf,
    pub conf_data: PathBuf,
    pub db_connect_file: Option<PathBuf>,
    pub data_home: PathBuf,
}

impl Paths {
    fn from_env() -> Self {
        let data_home = env_path("DATA_HOME").unwrap_or_else(|| PathBuf::from("/data"));
        Self {
            datastream_data: env_path("DATASTREAM_DATA").unwrap_or_else(|| data_home.join("datastream")),
            logs_data: env_path("LOGS_DATA").unwrap_or_else(|| data_home.join("logs")),
            conf_data: env_path("CONF_DATA").unwrap_or_else(|| data_home.join("conf")),
            db_connect_file: env_path("DB_CONNECT_FILE"),
            data_home,
        }
    }
}

fn env_path(name: &str) -> Option<PathBuf> {
    env::var_os(name).map(PathBuf::from)
}

/// `PROC_INTERVAL`, used only when `-a` is absent from the command line.
#[must_use]
pub fn proc_interval_env() -> Option<String> {
    env::var("PROC_INTERVAL").ok()
}

#[derive(Debug, Clone)]
pub struct ProcessContext {
    pub site: String,
    pub facility: String,
    pub process_name: String,
    pub force: bool,
    pub reprocessing: bool,
    pub debug_level: u8,
    pub provenance: bool,
    pub dynamic_dods: bool,
    pub disable_db_updates: bool,
    pub output_interval: Option<String>,
    pub begin: f64,
    pub end: f64,
    pub now: f64,
    pub paths: Paths,
}

impl ProcessContext {
    pub fn from_cli(cli: &Cli, now: f64) -> Result<Self> {
        let (begin, end) = cli.parse_interval()?;
        Ok(Self {
            site: cli.site.clone(),
            facility: cli.facility.clone(),
            process_name: cli.process_name.clone(),
            force: cli.force,
            reprocessing: cli.reprocess,
            debug_level: cli.debug_level,
            provenance: cli.provenance,
            dynamic_dods: cli.dynamic_dods,
            disable_db_updates: cli.disable_db_updates,
            output_interval: cli.output_interval.clone(),
            begin,
            end,
            now,
            paths: Paths::from_env(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_cli() -> Cli {
        Cli {
            interval: Some("20200115:20200116".into()),
            site: "sgp".into(),
            facility: "E13".into(),
            process_name: "met_b1_ingest".into(),
            force: false,
            reprocess: false,
            debug_level: 0,
            provenance: false,
            dynamic_dods: false,
            disable_db_updates: false,
            output_interval: None,
        }
    }

    #[test]
    fn context_carries_resolved_interval() {
        let ctx = ProcessContext::from_cli(&sample_cli(), 2_000_000_000.0).unwrap();
        assert!(ctx.end > ctx.begin);
        assert_eq!(ctx.site, "sgp");
    }
}
