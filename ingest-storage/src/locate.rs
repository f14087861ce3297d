//! Target-file location (§4.7 step 11).

use ingest_model::SplitMode;
use ingest_model::split::SplitPolicy;

use crate::error::{Result, StorageError};
use crate::sink::FileMeta;
use crate::split::next_split_time;

/// Where a slice of a dataset should be written.
#[derive(Debug, Clone, PartialEq)]
pub enum Target {
    /// Append to this already-stored file.
    Append(FileMeta),
    /// Create a new file; no existing file is a valid append target.
    CreateNew,
}

/// Locates the target file for a batch beginning at `begin`, given the
/// datastream's existing stored files (sorted by begin time, as returned
/// by [`crate::sink::DatastreamDirectory::list_files`]).
///
/// `newfile` and `split_mode == on_store` both force file creation
/// outright, skipping location entirely. In async mode, the target is
/// the most recently updated file (approximated here by the file with
/// the latest `end` time, since this crate tracks no per-process file
/// handle state). Otherwise, the target is the file whose range contains
/// `begin`, or the one immediately preceding it.
pub fn locate_target_file(
    files: &[FileMeta],
    begin: f64,
    newfile: bool,
    is_async: bool,
    split_policy: &SplitPolicy,
    current_dod_fingerprint: &str,
) -> Result<Target> {
    if newfile || split_policy.mode == SplitMode::OnStore {
        return Ok(Target::CreateNew);
    }

    let candidate = if is_async {
        files.iter().max_by(|a, b| a.end.partial_cmp(&b.end).unwrap())
    } else {
        files
            .iter()
            .filter(|f| f.begin <= begin)
            .max_by(|a, b| a.begin.partial_cmp(&b.begin).unwrap())
    };

    let Some(file) = candidate else {
        return Ok(Target::CreateNew);
    };

    if begin <= file.end {
        return Err(StorageError::TimeOrderViolation {
            file: file.name.clone(),
            begin,
            file_end: file.end,
        });
    }

    if let Some(boundary) = next_split_time(split_policy, file.end as i64) {
        if (boundary as f64) <= begin {
            return Ok(Target::CreateNew);
        }
    }

    if file.dod_fingerprint != current_dod_fingerprint {
        tracing::warn!(
            file = file.name,
            "DOD metadata differs from the located file; forcing a new file"
        );
        return Ok(Target::CreateNew);
    }

    Ok(Target::Append(file.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(name: &str, begin: f64, end: f64, fingerprint: &str) -> FileMeta {
        FileMeta {
            name: name.to_string(),
            begin,
            end,
            ntimes: 0,
            dod_fingerprint: fingerprint.to_string(),
        }
    }

    #[test]
    fn newfile_flag_forces_creation() {
        let files = vec![file("a", 0.0, 60.0, "x")];
        let target = locate_target_file(&files, 120.0, true, false, &SplitPolicy::never(), "x").unwrap();
        assert_eq!(target, Target::CreateNew);
    }

    #[test]
    fn on_store_mode_forces_creation() {
        let files = vec![file("a", 0.0, 60.0, "x")];
        let target = locate_target_file(&files, 120.0, false, false, &SplitPolicy::on_store(), "x").unwrap();
        assert_eq!(target, Target::CreateNew);
    }

    #[test]
    fn no_stored_files_creates_new() {
        let target = locate_target_file(&[], 0.0, false, false, &SplitPolicy::never(), "x").unwrap();
        assert_eq!(target, Target::CreateNew);
    }

    #[test]
    fn appends_to_the_preceding_file() {
        let files = vec![file("a", 0.0, 60.0, "x")];
        let target = locate_target_file(&files, 120.0, false, false, &SplitPolicy::never(), "x").unwrap();
        assert_eq!(target, Target::Append(files[0].clone()));
    }

    #[test]
    fn begin_at_or_before_file_end_is_time_order_violation() {
        let files = vec![file("a", 0.0, 60.0, "x")];
        let err = locate_target_file(&files, 60.0, false, false, &SplitPolicy::never(), "x").unwrap_err();
        assert!(matches!(err, StorageError::TimeOrderViolation { .. }));
    }

    #[test]
    fn dod_mismatch_forces_a_new_file() {
        let files = vec![file("a", 0.0, 60.0, "old-fingerprint")];
        let target = locate_target_file(&files, 120.0, false, false, &SplitPolicy::never(), "new-fingerprint").unwrap();
        assert_eq!(target, Target::CreateNew);
    }
}
