//! Filtering against previously stored data (§4.7 step 8).

use ingest_model::Group;

use crate::error::{Result, StorageError};
use crate::sink::{FileMeta, NetCdfSink};

/// Whether step 8 (filter-against-stored) applies at all: it's skipped
/// for async datastreams, and for reprocessing runs whose split mode is
/// `on_store` (§4.7 step 8 preamble).
#[must_use]
pub fn applies(is_async: bool, is_reprocessing: bool, split_mode_is_on_store: bool) -> bool {
    !is_async && !(is_reprocessing && split_mode_is_on_store)
}

/// Drops samples at or before `last_stored_time`, then checks every
/// remaining sample whose time falls within an existing file's range for
/// byte-identical data against what's on disk.
///
/// Samples entirely past the newest stored file's end are left alone;
/// samples inside an existing file's range must match exactly or the
/// whole store fails with [`StorageError::OverlapWithStored`].
pub fn filter_against_stored(group: &mut Group, stored_files: &[FileMeta], sink: &dyn NetCdfSink, dir: &str) -> Result<()> {
    let Some(last_stored) = stored_files.iter().map(|f| f.end).fold(None, max_option) else {
        return Ok(());
    };

    let time = group.get_variable("time")?;
    let times = time.scalar_samples_as_f64()?;

    let mut drop_through = 0usize;
    for (i, &t) in times.iter().enumerate() {
        if t <= last_stored {
            drop_through = i + 1;
        } else {
            break;
        }
    }

    for file in stored_files {
        for (i, &t) in times.iter().enumerate() {
            if i < drop_through {
                continue;
            }
            if t < file.begin || t > file.end {
                continue;
            }
            let stored_group = sink.read_file(dir, &file.name)?;
            if !group_samples_match(group, &stored_group, i, t)? {
                return Err(StorageError::OverlapWithStored {
                    file: file.name.clone(),
                    time: t,
                });
            }
        }
    }

    if drop_through > 0 {
        for name in group.variable_names() {
            let var = group.get_variable_mut(&name)?;
            if var.sample_axis().is_some() {
                var.drain_front(drop_through);
            }
        }
    }
    Ok(())
}

fn max_option(acc: Option<f64>, x: f64) -> Option<f64> {
    Some(acc.map_or(x, |a| a.max(x)))
}

fn group_samples_match(incoming: &Group, stored: &Group, index: usize, time: f64) -> Result<bool> {
    for name in incoming.variable_names() {
        let var = incoming.get_variable(&name)?;
        if var.sample_axis().is_none() {
            continue;
        }
        let Ok(stored_var) = stored.get_variable(&name) else {
            continue;
        };
        let stored_times = stored.get_variable("time")?.scalar_samples_as_f64()?;
        let Some(stored_index) = stored_times.iter().position(|&t| (t - time).abs() < f64::EPSILON) else {
            continue;
        };
        let (Some(incoming_bytes), Some(stored_bytes)) = (var.samples().get(index), stored_var.samples().get(stored_index)) else {
            continue;
        };
        if incoming_bytes != stored_bytes {
            return Ok(false);
        }
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skipped_for_async_datastreams() {
        assert!(!applies(true, false, false));
    }

    #[test]
    fn skipped_for_reprocessing_with_on_store_split() {
        assert!(!applies(false, true, true));
    }

    #[test]
    fn applies_for_normal_processing() {
        assert!(applies(false, false, false));
        assert!(applies(false, true, false));
    }
}
