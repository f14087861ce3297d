//! Command-line flag surface (§6 "Command-line surface (ingest/vap
//! entry)"). Flag letters and long-option spellings follow the spec
//! exactly; [`Cli::parse_interval`] resolves `-a` into concrete begin/end
//! epoch seconds.

use chrono::{NaiveDate, NaiveTime};
use clap::Parser;

use crate::error::{CliError, Result};

/// Ingest/vap entry point: runs one processing interval for a single
/// site/facility/process.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(name = "ingest")]
#[command(about = "Dataset ingest/transform/QC/storage engine entry point", long_about = None)]
pub struct Cli {
    /// Processing interval, `begin[:end]` in `YYYYMMDD[.hhmmss]`. Falls
    /// back to `PROC_INTERVAL` (§6 "Environment variables") when absent.
    #[arg(short = 'a', long = "interval", value_name = "BEGIN[:END]")]
    pub interval: Option<String>,

    /// Site code, e.g. "sgp".
    #[arg(short = 's', long = "site")]
    pub site: String,

    /// Facility code, e.g. "E13".
    #[arg(short = 'f', long = "facility")]
    pub facility: String,

    /// Process name, e.g. "met_b1_ingest".
    #[arg(short = 'n', long = "process-name")]
    pub process_name: String,

    /// Force mode: proceed despite conditions that would otherwise abort.
    #[arg(short = 'F', long = "force")]
    pub force: bool,

    /// Reprocessing mode: relaxes the overlap-with-stored-data check
    /// when the split policy is `on_store`.
    #[arg(short = 'R', long = "reprocess")]
    pub reprocess: bool,

    /// Debug verbosity level (0 = off).
    #[arg(short = 'D', long = "debug", default_value_t = 0)]
    pub debug_level: u8,

    /// Enable provenance logging.
    #[arg(short = 'P', long = "provenance")]
    pub provenance: bool,

    /// Allow output datasets without a predefined DOD to be written with
    /// a dynamically inferred structure.
    #[arg(long = "dynamic-dods")]
    pub dynamic_dods: bool,

    /// Skip reading/writing the processed-time watermark and DQR store.
    #[arg(long = "disable-db-updates")]
    pub disable_db_updates: bool,

    /// Output file split-interval spec (§4.2 grammar), e.g. "daily".
    #[arg(long = "output-interval", value_name = "SPEC")]
    pub output_interval: Option<String>,
}

impl Cli {
    /// Parses the `-a` flag (or, absent that, `PROC_INTERVAL`) into
    /// begin/end epoch seconds. A missing end defaults to `begin + 1 day`.
    pub fn parse_interval(&self) -> Result<(f64, f64)> {
        let raw = self
            .interval
            .clone()
            .or_else(crate::context::proc_interval_env)
            .ok_or_else(|| CliError::Config("no processing interval: pass -a or set PROC_INTERVAL".into()))?;

        let mut parts = raw.splitn(2, ':');
        let begin_str = parts.next().unwrap_or_default();
        let end_str = parts.next();

        let begin = parse_timestamp(begin_str).ok_or_else(|| CliError::BadInterval(raw.clone()))?;
        let end = match end_str {
            Some(s) => parse_timestamp(s).ok_or_else(|| CliError::BadInterval(raw.clone()))?,
            None => begin + 86_400.0,
        };
        Ok((begin, end))
    }
}

fn parse_timestamp(raw: &str) -> Option<f64> {
    if let Some((date_part, time_part)) = raw.split_once('.') {
        let date = NaiveDate::parse_from_str(date_part, "%Y%m%d").ok()?;
        let time = NaiveTime::parse_from_str(time_part, "%H%M%S").ok()?;
        Some(date.and_time(time).and_utc().timestamp() as f64)
    } else {
        let date = NaiveDate::parse_from_str(raw, "%Y%m%d").ok()?;
        Some(date.and_hms_opt(0, 0, 0)?.and_utc().timestamp() as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli(interval: &str) -> Cli {
        Cli {
            interval: Some(interval.to_string()),
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
    fn date_only_interval_defaults_to_one_day() {
        let (begin, end) = cli("20200115").parse_interval().unwrap();
        assert_eq!(end - begin, 86_400.0);
    }

    #[test]
    fn explicit_begin_and_end_are_both_honored() {
        let (begin, end) = cli("20200115:20200116").parse_interval().unwrap();
        assert_eq!(end - begin, 86_400.0);
    }

    #[test]
    fn time_of_day_component_is_parsed() {
        let (begin, _) = cli("20200115.083000").parse_interval().unwrap();
        let (midnight, _) = cli("20200115").parse_interval().unwrap();
        assert_eq!(begin - midnight, 8.0 * 3600.0 + 30.0 * 60.0);
    }

    #[test]
    fn garbage_interval_is_rejected() {
        assert!(cli("not-a-date").parse_interval().is_err());
    }
}
