//! File-writing backend seam (§4.7 steps 11-13).
//!
//! A real netCDF-3 binding is out of scope per spec §1 (the same way
//! `gates` depends on `flow-fcs` as a sibling crate rather than
//! reimplementing a file format it doesn't own). [`NetCdfSink`] and
//! [`DatastreamDirectory`] are the seam a real binding would plug into;
//! [`FilesystemSink`] is the filesystem-backed default that makes the
//! CSV/raw paths this crate fully owns testable without one. It
//! persists each output file as a serialized [`Group`] and keeps a
//! per-directory listing cache, the storage-engine analogue of
//! `gates::filtering::cache::FilterCache`.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::RwLock;

use ingest_model::Group;
use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};

use crate::error::{Result, StorageError};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileMeta {
    pub name: String,
    pub begin: f64,
    pub end: f64,
    pub ntimes: usize,
    pub dod_fingerprint: String,
}

/// Structural fingerprint of a group's variable shapes, used as a
/// cheap stand-in for ADI's "DOD" (data-object-description) comparison
/// (§4.7 step 11, "Reject if DOD metadata differs").
#[must_use]
pub fn dod_fingerprint(group: &Group) -> String {
    let mut names: Vec<_> = group.variable_names();
    names.sort();
    let mut descriptor = String::new();
    for name in names {
        let Ok(var) = group.get_variable(&name) else { continue };
        descriptor.push_str(&format!("{}:{:?}:{:?}|", var.name, var.dtype, var.dimensions));
    }
    let mut hasher = Md5::new();
    hasher.update(descriptor.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn time_range(group: &Group) -> Result<(f64, f64, usize)> {
    let time = group.get_variable("time")?;
    let values = time.scalar_samples_as_f64()?;
    let begin = values.first().copied().unwrap_or(0.0);
    let end = values.last().copied().unwrap_or(begin);
    Ok((begin, end, values.len()))
}

pub trait DatastreamDirectory: Send + Sync {
    /// Lists every stored file in `dir`, sorted by begin time.
    fn list_files(&self, dir: &str) -> Result<Vec<FileMeta>>;
    /// Invalidates any cached listing for `dir` (§4.7 step 13, "the
    /// directory/file cache is invalidated so subsequent listings see
    /// fresh state").
    fn invalidate(&self, dir: &str);
}

pub trait NetCdfSink: Send + Sync {
    /// Creates a new file at `dir/name`: static data is written once,
    /// then records `[start, start+count)` of `group`.
    fn create_file(&mut self, dir: &str, name: &str, group: &Group, start: usize, count: usize) -> Result<()>;
    /// Appends records `[start, start+count)` of `group` to an existing
    /// file, continuing at record index `nc_start`.
    fn append_records(&mut self, dir: &str, name: &str, group: &Group, start: usize, count: usize, nc_start: usize) -> Result<()>;
    /// Reads back the full stored group, used by overlap checks and
    /// DOD comparison.
    fn read_file(&self, dir: &str, name: &str) -> Result<Group>;
}

/// Filesystem-backed [`NetCdfSink`]/[`DatastreamDirectory`]: each output
/// file is a JSON-serialized [`Group`] at `{dir}/{name}`, with a
/// per-directory listing cache to avoid re-reading every file on every
/// `list_files` call.
#[derive(Default)]
pub struct FilesystemSink {
    listing_cache: RwLock<HashMap<String, Vec<FileMeta>>>,
}

impl FilesystemSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn write_group(&self, dir: &str, name: &str, group: &Group) -> Result<()> {
        fs::create_dir_all(dir)?;
        let path = Path::new(dir).join(name);
        let bytes = serde_json::to_vec_pretty(group).map_err(|e| StorageError::other(e.to_string()))?;
        fs::write(path, bytes)?;
        self.invalidate(dir);
        Ok(())
    }
}

impl DatastreamDirectory for FilesystemSink {
    fn list_files(&self, dir: &str) -> Result<Vec<FileMeta>> {
        if let Some(cached) = self.listing_cache.read().unwrap().get(dir) {
            return Ok(cached.clone());
        }

        let mut files = Vec::new();
        if Path::new(dir).is_dir() {
            for entry in fs::read_dir(dir)? {
                let entry = entry?;
                if !entry.file_type()?.is_file() {
                    continue;
                }
                let name = entry.file_name().to_string_lossy().into_owned();
                let bytes = fs::read(entry.path())?;
                let group: Group = serde_json::from_slice(&bytes).map_err(|e| StorageError::other(e.to_string()))?;
                let (begin, end, ntimes) = time_range(&group)?;
                files.push(FileMeta {
                    name,
                    begin,
                    end,
                    ntimes,
                    dod_fingerprint: dod_fingerprint(&group),
                });
            }
        }
        files.sort_by(|a, b| a.begin.partial_cmp(&b.begin).unwrap());

        self.listing_cache.write().unwrap().insert(dir.to_string(), files.clone());
        Ok(files)
    }

    fn invalidate(&self, dir: &str) {
        self.listing_cache.write().unwrap().remove(dir);
    }
}

impl NetCdfSink for FilesystemSink {
    fn create_file(&mut self, dir: &str, name: &str, group: &Group, start: usize, count: usize) -> Result<()> {
        let sliced = slice_group(group, start, count)?;
        self.write_group(dir, name, &sliced)
    }

    fn append_records(&mut self, dir: &str, name: &str, group: &Group, start: usize, count: usize, nc_start: usize) -> Result<()> {
        let mut existing = self.read_file(dir, name)?;
        let incoming = slice_group(group, start, count)?;
        append_into(&mut existing, &incoming, nc_start)?;
        self.write_group(dir, name, &existing)
    }

    fn read_file(&self, dir: &str, name: &str) -> Result<Group> {
        let path = Path::new(dir).join(name);
        let bytes = fs::read(path)?;
        serde_json::from_slice(&bytes).map_err(|e| StorageError::other(e.to_string()))
    }
}

/// Copies `group` keeping only sample-axis records `[start, start+count)`
/// of every variable (static, non-sample-axis variables are copied
/// whole).
fn slice_group(group: &Group, start: usize, count: usize) -> Result<Group> {
    let mut out = group.deep_copy();
    for name in group.variable_names() {
        let src = group.get_variable(&name)?;
        if src.sample_axis().is_none() {
            continue;
        }
        let dst = out.get_variable_mut(&name)?;
        dst.clear_samples();
        for bytes in src.samples().iter().skip(start).take(count) {
            dst.push_sample(bytes.clone());
        }
    }
    Ok(out)
}

/// Appends `incoming`'s sample-axis records onto `existing`, starting
/// at record index `nc_start` (spec's "append to the located file,
/// write new records starting at `file.ntimes`").
fn append_into(existing: &mut Group, incoming: &Group, nc_start: usize) -> Result<()> {
    for name in incoming.variable_names() {
        if !existing.has_variable(&name) {
            continue;
        }
        let src = incoming.get_variable(&name)?;
        if src.sample_axis().is_none() {
            continue;
        }
        if let Ok(dst) = existing.get_variable_mut(&name) {
            for (offset, bytes) in src.samples().iter().enumerate() {
                let index = nc_start + offset;
                if index < dst.sample_count() {
                    dst.set_sample(index, bytes.clone())?;
                } else {
                    dst.push_sample(bytes.clone());
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ingest_model::{DataType, Variable, encode_scalar_f64};

    fn group_with_times(times: &[f64]) -> Group {
        let mut g = Group::new("ds");
        g.define_dimension("time", 0, true).unwrap();
        let mut t = Variable::new("time", DataType::Double, vec!["time".into()]);
        for &v in times {
            t.push_sample(encode_scalar_f64(DataType::Double, v));
        }
        g.define_variable(t).unwrap();
        g
    }

    #[test]
    fn create_then_list_round_trips_time_range() {
        let dir = tempfile::tempdir().unwrap();
        let dir_path = dir.path().to_str().unwrap();
        let mut sink = FilesystemSink::new();
        let group = group_with_times(&[0.0, 60.0, 120.0]);

        sink.create_file(dir_path, "ds.20200101.000000.nc", &group, 0, 3).unwrap();
        let files = sink.list_files(dir_path).unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].begin, 0.0);
        assert_eq!(files[0].end, 120.0);
        assert_eq!(files[0].ntimes, 3);
    }

    #[test]
    fn append_records_extends_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let dir_path = dir.path().to_str().unwrap();
        let mut sink = FilesystemSink::new();
        let first = group_with_times(&[0.0, 60.0]);
        sink.create_file(dir_path, "ds.nc", &first, 0, 2).unwrap();

        let second = group_with_times(&[120.0, 180.0]);
        sink.append_records(dir_path, "ds.nc", &second, 0, 2, 2).unwrap();

        let stored = sink.read_file(dir_path, "ds.nc").unwrap();
        let times = stored.get_variable("time").unwrap().scalar_samples_as_f64().unwrap();
        assert_eq!(times, vec![0.0, 60.0, 120.0, 180.0]);
    }

    #[test]
    fn listing_cache_is_invalidated_by_writes() {
        let dir = tempfile::tempdir().unwrap();
        let dir_path = dir.path().to_str().unwrap();
        let mut sink = FilesystemSink::new();
        assert_eq!(sink.list_files(dir_path).unwrap().len(), 0);

        let group = group_with_times(&[0.0]);
        sink.create_file(dir_path, "ds.nc", &group, 0, 1).unwrap();
        assert_eq!(sink.list_files(dir_path).unwrap().len(), 1);
    }
}
