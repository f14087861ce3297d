//! Top-level `store_dataset` orchestrator (§4.7): ties together every
//! step module in this crate into the full 14-step sequence.

use chrono::DateTime;
use ingest_model::{DatastreamFlags, DatastreamFormat, DatastreamId, DatastreamRegistry, Group, SplitMode};
use ingest_qc::checks::{PreviousSampleContext, StandardQcConfig, standard_qc_checks};

use crate::basetime::adjust_base_time_if_needed;
use crate::bounds::{set_cell_bounds, set_chunk_sizes};
use crate::csv::write_csv;
use crate::dedup::{apply_dedup, plan_dedup};
use crate::error::Result;
use crate::hook::CustomQcHook;
use crate::locate::{Target, locate_target_file};
use crate::nan_filter::filter_nans;
use crate::rename::canonical_name;
use crate::sink::{DatastreamDirectory, NetCdfSink, dod_fingerprint};
use crate::split::next_split_time;
use crate::stored;
use crate::validate::validate_times;

/// Per-store-call options that aren't carried by the registry itself.
pub struct StoreOptions<'a> {
    /// Forces creation of a new file, skipping step 11's location logic.
    pub newfile: bool,
    pub is_async: bool,
    pub is_reprocessing: bool,
    pub min_valid_time: Option<f64>,
    pub now: f64,
    /// Standard-QC configuration, consulted only when `STANDARD_QC` is set.
    pub qc_config: Option<&'a StandardQcConfig>,
    pub previous_qc_context: Option<&'a PreviousSampleContext>,
    pub hook: &'a dyn CustomQcHook,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct StoreReport {
    /// `false` if the dataset was dropped (empty input or a custom-QC
    /// hook veto) rather than written.
    pub stored: bool,
    pub files_written: Vec<String>,
    pub records_written: usize,
    pub begin: f64,
    pub end: f64,
}

fn format_timestamp(epoch_seconds: i64) -> (String, String) {
    let dt = DateTime::from_timestamp(epoch_seconds, 0).unwrap_or_default();
    (dt.format("%Y%m%d").to_string(), dt.format("%H%M%S").to_string())
}

/// Implements the full §4.7 14-step `store_dataset` sequence for one
/// output dataset.
pub fn store_dataset(
    registry: &DatastreamRegistry,
    ds_id: DatastreamId,
    group: &mut Group,
    directory: &dyn DatastreamDirectory,
    sink: &mut dyn NetCdfSink,
    options: &StoreOptions<'_>,
) -> Result<StoreReport> {
    let ds = registry.get(ds_id)?;
    let flags = registry.flags(ds_id)?;
    let split_policy = registry.split_policy(ds_id)?;
    let dir = ds.path.clone().unwrap_or_default();

    // Step 1: read times and establish begin.
    let times = group.get_variable("time")?.scalar_samples_as_f64()?;
    if times.is_empty() {
        return Ok(StoreReport::default());
    }

    // Step 2: dedup within dataset.
    let plan = plan_dedup(group)?;
    apply_dedup(group, &plan)?;

    // Step 3: cell bounds, chunk sizes.
    set_cell_bounds(group)?;
    set_chunk_sizes(group)?;

    // Step 4: FILTER_NANS.
    let first_sample_filtered = if flags.contains(DatastreamFlags::FILTER_NANS) {
        filter_nans(group)?
    } else {
        false
    };

    // Step 5: STANDARD_QC.
    if flags.contains(DatastreamFlags::STANDARD_QC) {
        if let Some(config) = options.qc_config {
            standard_qc_checks(group, config, options.previous_qc_context)?;
        }
    }

    // Step 6: custom-QC hook; a `false` return drops the dataset silently.
    if !options.hook.run(group)? {
        return Ok(StoreReport::default());
    }

    // Step 7: CSV path returns early.
    if ds.format == DatastreamFormat::Csv {
        let name = format!("{}.csv", ds.dsc_name());
        std::fs::create_dir_all(&dir)?;
        let mut file = std::fs::File::create(std::path::Path::new(&dir).join(&name))?;
        write_csv(group, &mut file)?;
        let n = group.get_variable("time")?.sample_count();
        return Ok(StoreReport {
            stored: true,
            files_written: vec![name],
            records_written: n,
            begin: times[0],
            end: *times.last().unwrap(),
        });
    }

    let stored_files = directory.list_files(&dir)?;

    // Step 8: filter against previously stored data.
    if stored::applies(options.is_async, options.is_reprocessing, split_policy.mode == SplitMode::OnStore) {
        stored::filter_against_stored(group, &stored_files, sink, &dir)?;
    }

    let times = group.get_variable("time")?.scalar_samples_as_f64()?;
    if times.is_empty() {
        return Ok(StoreReport::default());
    }
    let begin = times[0];
    let end = *times.last().unwrap();

    // Step 9: validate times.
    validate_times(begin, end, options.min_valid_time, options.now)?;

    // Step 10: base_time midnight adjustment.
    adjust_base_time_if_needed(group, first_sample_filtered, Some(begin as i64))?;

    // Step 11: locate target file.
    let fingerprint = dod_fingerprint(group);
    let mut target = locate_target_file(&stored_files, begin, options.newfile, options.is_async, split_policy, &fingerprint)?;

    // Steps 12-13: iterate split intervals within this batch, appending
    // to or creating one file per slice.
    let mut files_written = Vec::new();
    let mut cursor = 0usize;

    loop {
        let slice_begin = times[cursor];
        let boundary = next_split_time(split_policy, slice_begin as i64);
        let slice_end_index = match boundary {
            Some(boundary) => times[cursor..].iter().position(|&t| t >= boundary as f64).map_or(times.len(), |offset| cursor + offset),
            None => times.len(),
        };
        let count = slice_end_index.saturating_sub(cursor);
        if count == 0 {
            break;
        }

        match &target {
            Target::Append(file) => {
                sink.append_records(&dir, &file.name, group, cursor, count, file.ntimes)?;
                files_written.push(file.name.clone());
            }
            Target::CreateNew => {
                let (yyyymmdd, hhmmss) = format_timestamp(slice_begin as i64);
                let name = canonical_name(&ds.dsc_name(), &yyyymmdd, &hhmmss, "nc", &[]);
                sink.create_file(&dir, &name, group, cursor, count)?;
                files_written.push(name);
            }
        }
        directory.invalidate(&dir);

        cursor = slice_end_index;
        if cursor >= times.len() {
            break;
        }
        target = Target::CreateNew;
    }

    Ok(StoreReport {
        stored: true,
        files_written,
        records_written: times.len(),
        begin,
        end,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hook::NoopHook;
    use crate::sink::FilesystemSink;
    use ingest_model::{DataType, DatastreamRole, Variable, encode_scalar_f64};

    fn group_with_times(times: &[f64]) -> Group {
        let mut g = Group::new("ds");
        g.define_dimension("time", 0, true).unwrap();
        let mut t = Variable::new("time", DataType::Double, vec!["time".into()]);
        let mut v = Variable::new("temp", DataType::Float, vec!["time".into()]);
        for &time in times {
            t.push_sample(encode_scalar_f64(DataType::Double, time));
            v.push_sample(encode_scalar_f64(DataType::Float, 1.0));
        }
        g.define_variable(t).unwrap();
        g.define_variable(v).unwrap();
        g
    }

    fn options() -> StoreOptions<'static> {
        StoreOptions {
            newfile: false,
            is_async: false,
            is_reprocessing: false,
            min_valid_time: None,
            now: 2_000_000_000.0,
            qc_config: None,
            previous_qc_context: None,
            hook: &NoopHook,
        }
    }

    #[test]
    fn stores_a_fresh_dataset_into_a_new_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut registry = DatastreamRegistry::new();
        let ds_id = registry.init_datastream("sgp", "E13", "met", "b1", DatastreamRole::Output, ingest_model::DatastreamFormat::Netcdf3);
        registry.set_path(ds_id, dir.path().to_str().unwrap()).unwrap();

        let mut group = group_with_times(&[0.0, 60.0, 120.0]);
        let directory = FilesystemSink::new();
        let mut sink = FilesystemSink::new();

        let report = store_dataset(&registry, ds_id, &mut group, &directory, &mut sink, &options()).unwrap();
        assert!(report.stored);
        assert_eq!(report.files_written.len(), 1);
        assert_eq!(report.records_written, 3);
    }

    #[test]
    fn empty_dataset_is_not_stored() {
        let dir = tempfile::tempdir().unwrap();
        let mut registry = DatastreamRegistry::new();
        let ds_id = registry.init_datastream("sgp", "E13", "met", "b1", DatastreamRole::Output, ingest_model::DatastreamFormat::Netcdf3);
        registry.set_path(ds_id, dir.path().to_str().unwrap()).unwrap();

        let mut group = group_with_times(&[]);
        let directory = FilesystemSink::new();
        let mut sink = FilesystemSink::new();

        let report = store_dataset(&registry, ds_id, &mut group, &directory, &mut sink, &options()).unwrap();
        assert!(!report.stored);
    }
}
