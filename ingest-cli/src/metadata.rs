//! Out-of-scope external collaborator: the command-line DB/retrieval-plan
//! metadata layer (§6 "Out-of-scope external collaborators"). Everything
//! this crate needs from that layer — which datastreams exist, how
//! variables are tagged for mapping, optional coordinate-transform plans,
//! the retrieved observation trees, and the processed-time watermark — is
//! expressed as the [`MetadataProvider`] trait, with [`FilesystemMetadataProvider`]
//! a JSON-file-backed default good enough to drive the CSV/raw paths and
//! tests this crate owns.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use ingest_merge::Observation;
use ingest_model::{DataType, DatastreamFormat, DatastreamRole, Group};
use ingest_transform::coordinate::{ComputedGrid, CoordDimSpec, CoordinateSystem};
use ingest_transform::driver::{RegridParams, TransformMethod};
use ingest_transform::engine::VariableTransform;
use serde::{Deserialize, Serialize};

use crate::error::{CliError, Result};

/// One datastream this site/facility/process touches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatastreamSpec {
    pub class_name: String,
    pub class_level: String,
    pub role: DatastreamRole,
    pub format: DatastreamFormat,
    /// §4.2 output-interval grammar clause scoped to this stream, if it
    /// overrides the process-wide `--output-interval`.
    pub split_interval: Option<String>,
}

/// One output destination a tagged source variable is mapped to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagTarget {
    pub class_name: String,
    pub class_level: String,
    pub target_var_name: String,
}

/// A [`ingest_merge::VariableTag`] expressed against datastream
/// class/level names rather than [`ingest_model::DatastreamId`]s, since
/// the metadata layer doesn't hold a live registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariableTagSpec {
    pub source_class: String,
    pub source_level: String,
    pub source_name: String,
    pub target_coord_system: Option<String>,
    pub outputs: Vec<TagTarget>,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub rollup_trans_qc: bool,
    #[serde(default)]
    pub skip_transform: bool,
}

/// JSON-serializable mirror of [`ingest_transform::driver::TransformMethod`]
/// (the engine type carries no derive for it — it's built from domain
/// logic, not read off the wire — so config files name the method and
/// this DTO maps the name onto the real enum).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TransformMethodSpec {
    Interpolate,
    Subsample,
    BinAverage,
    Caracena,
}

impl From<TransformMethodSpec> for TransformMethod {
    fn from(spec: TransformMethodSpec) -> Self {
        match spec {
            TransformMethodSpec::Interpolate => Self::Interpolate,
            TransformMethodSpec::Subsample => Self::Subsample,
            TransformMethodSpec::BinAverage => Self::BinAverage,
            TransformMethodSpec::Caracena => Self::Caracena,
        }
    }
}

/// Mirror of [`RegridParams`], deserializable from config JSON.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegridParamsSpec {
    pub range: Option<f64>,
    pub width: Option<f64>,
    pub alignment: Option<f64>,
    pub std_bad_max: Option<f64>,
    pub std_ind_max: Option<f64>,
    pub goodfrac_bad_min: Option<f64>,
    pub goodfrac_ind_min: Option<f64>,
    pub station_coords: Option<Vec<(f64, f64)>>,
    pub grid_coords: Option<Vec<(f64, f64)>>,
    #[serde(default)]
    pub caracena_lambda: f64,
}

impl From<RegridParamsSpec> for RegridParams {
    fn from(spec: RegridParamsSpec) -> Self {
        Self {
            range: spec.range,
            width: spec.width,
            alignment: spec.alignment,
            std_bad_max: spec.std_bad_max,
            std_ind_max: spec.std_ind_max,
            goodfrac_bad_min: spec.goodfrac_bad_min,
            goodfrac_ind_min: spec.goodfrac_ind_min,
            station_coords: spec.station_coords,
            grid_coords: spec.grid_coords,
            caracena_lambda: spec.caracena_lambda,
        }
    }
}

/// A variable's transform method plus its regridding parameters, keyed
/// by name within a [`TransformPlan`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariableTransformSpec {
    pub name: String,
    pub method: TransformMethodSpec,
    #[serde(default)]
    pub params: RegridParamsSpec,
    pub transform_param: Option<String>,
    #[serde(default)]
    pub dim_grouping: bool,
}

/// Mirror of [`CoordDimSpec`], deserializable from config JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordDimSpecDef {
    pub name: String,
    pub units: String,
    pub dtype: DataType,
    pub mapped_variable: Option<String>,
    #[serde(default)]
    pub required: bool,
    pub explicit_values: Option<Vec<f64>>,
    pub explicit_units: Option<String>,
    pub grid: Option<ComputedGridDef>,
    pub width: Option<f64>,
    pub alignment: Option<f64>,
    pub front_edge: Option<Vec<f64>>,
    pub back_edge: Option<Vec<f64>>,
    pub transform: Option<String>,
    #[serde(default)]
    pub is_time: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ComputedGridDef {
    pub start: Option<f64>,
    pub length: Option<usize>,
    pub interval: Option<f64>,
}

impl From<ComputedGridDef> for ComputedGrid {
    fn from(def: ComputedGridDef) -> Self {
        Self {
            start: def.start,
            length: def.length,
            interval: def.interval,
        }
    }
}

impl From<CoordDimSpecDef> for CoordDimSpec {
    fn from(def: CoordDimSpecDef) -> Self {
        Self {
            name: def.name,
            units: def.units,
            dtype: def.dtype,
            mapped_variable: def.mapped_variable,
            required: def.required,
            explicit_values: def.explicit_values,
            explicit_units: def.explicit_units,
            grid: def.grid.map(ComputedGrid::from),
            width: def.width,
            alignment: def.alignment,
            front_edge: def.front_edge,
            back_edge: def.back_edge,
            transform: def.transform,
            is_time: def.is_time,
        }
    }
}

/// The per-output-stream coordinate system and variable transform list
/// (§4.5), resolved once per output datastream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransformPlan {
    pub coordinate_system_name: String,
    pub dims: Vec<CoordDimSpecDef>,
    pub in_coord_name: String,
    pub variables: Vec<VariableTransformSpec>,
}

impl TransformPlan {
    #[must_use]
    pub fn coordinate_system(&self) -> CoordinateSystem {
        CoordinateSystem {
            name: self.coordinate_system_name.clone(),
            dims: self.dims.iter().cloned().map(CoordDimSpec::from).collect(),
        }
    }

    #[must_use]
    pub fn variable_transforms(&self) -> Vec<VariableTransform> {
        self.variables
            .iter()
            .cloned()
            .map(|v| VariableTransform {
                name: v.name,
                method: v.method.into(),
                params: v.params.into(),
                transform_param: v.transform_param,
                dim_grouping: v.dim_grouping,
            })
            .collect()
    }
}

/// The out-of-scope retrieval-plan/DOD/watermark metadata service
/// (§6). `class`/`level` identify a datastream the way the on-disk
/// config and directory layout do, independent of any particular
/// registry's assigned ids.
pub trait MetadataProvider: Send + Sync {
    fn datastreams(&self, site: &str, facility: &str, process_name: &str) -> Result<Vec<DatastreamSpec>>;
    fn variable_tags(&self, site: &str, facility: &str, process_name: &str) -> Result<Vec<VariableTagSpec>>;
    fn transform_plan(&self, class_name: &str, class_level: &str) -> Result<Option<TransformPlan>>;
    fn retrieve(&self, path: &str, begin: f64, end: f64) -> Result<Vec<Observation>>;
    fn output_template(&self, class_name: &str, class_level: &str, dynamic_dods: bool) -> Result<Group>;
    fn watermark(&self, class_name: &str, class_level: &str) -> Result<Option<f64>>;
    fn record_watermark(&self, class_name: &str, class_level: &str, end: f64) -> Result<()>;
    fn disable(&self, reason: &str) -> Result<()>;
    /// The process-wide `FILTER_INPUT_OBS` overlap-filter switch (§5,
    /// §7 `overlapping_input_data`); unlike per-datastream flags, this
    /// one is process-global configuration, so it lives on the
    /// metadata layer rather than [`ingest_model::DatastreamFlags`].
    fn filter_input_obs(&self, site: &str, facility: &str, process_name: &str) -> Result<bool>;
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct ProcessConfig {
    #[serde(default)]
    datastreams: Vec<DatastreamSpec>,
    #[serde(default)]
    tags: Vec<VariableTagSpec>,
    #[serde(default)]
    filter_input_obs: bool,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Watermarks {
    #[serde(default)]
    by_stream: HashMap<String, f64>,
}

/// Filesystem-backed [`MetadataProvider`]: process configuration and DOD
/// skeletons are JSON files under `conf_data`; the processed-time
/// watermark is a JSON file under `logs_data`; retrieval reads the same
/// JSON-serialized [`Group`] files [`ingest_storage::FilesystemSink`]
/// writes.
pub struct FilesystemMetadataProvider {
    conf_data: PathBuf,
    logs_data: PathBuf,
    disable_db_updates: bool,
}

impl FilesystemMetadataProvider {
    #[must_use]
    pub fn new(conf_data: impl Into<PathBuf>, logs_data: impl Into<PathBuf>, disable_db_updates: bool) -> Self {
        Self {
            conf_data: conf_data.into(),
            logs_data: logs_data.into(),
            disable_db_updates,
        }
    }

    fn process_config(&self, site: &str, facility: &str, process_name: &str) -> Result<ProcessConfig> {
        let path = self.conf_data.join(format!("{site}{facility}.{process_name}.json"));
        let bytes = fs::read(&path).map_err(|e| CliError::Config(format!("reading process config '{}': {e}", path.display())))?;
        serde_json::from_slice(&bytes).map_err(|e| CliError::Config(format!("parsing process config '{}': {e}", path.display())))
    }

    fn dod_path(&self, class_name: &str, class_level: &str) -> PathBuf {
        self.conf_data.join("dod").join(format!("{class_name}.{class_level}.json"))
    }

    fn transform_path(&self, class_name: &str, class_level: &str) -> PathBuf {
        self.conf_data.join("transform").join(format!("{class_name}.{class_level}.json"))
    }

    fn watermark_path(&self) -> PathBuf {
        self.logs_data.join("watermarks.json")
    }

    fn load_watermarks(&self) -> Result<Watermarks> {
        let path = self.watermark_path();
        if !path.exists() {
            return Ok(Watermarks::default());
        }
        let bytes = fs::read(&path)?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

impl MetadataProvider for FilesystemMetadataProvider {
    fn datastreams(&self, site: &str, facility: &str, process_name: &str) -> Result<Vec<DatastreamSpec>> {
        Ok(self.process_config(site, facility, process_name)?.datastreams)
    }

    fn variable_tags(&self, site: &str, facility: &str, process_name: &str) -> Result<Vec<VariableTagSpec>> {
        Ok(self.process_config(site, facility, process_name)?.tags)
    }

    fn transform_plan(&self, class_name: &str, class_level: &str) -> Result<Option<TransformPlan>> {
        let path = self.transform_path(class_name, class_level);
        if !path.exists() {
            return Ok(None);
        }
        let bytes = fs::read(&path)?;
        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    fn retrieve(&self, path: &str, begin: f64, end: f64) -> Result<Vec<Observation>> {
        read_observations(Path::new(path), begin, end)
    }

    fn output_template(&self, class_name: &str, class_level: &str, dynamic_dods: bool) -> Result<Group> {
        let path = self.dod_path(class_name, class_level);
        if path.exists() {
            let bytes = fs::read(&path)?;
            return Ok(serde_json::from_slice(&bytes)?);
        }
        if dynamic_dods {
            return Ok(Group::new(format!("{class_name}.{class_level}")));
        }
        Err(CliError::Config(format!("no DOD for '{class_name}.{class_level}' and --dynamic-dods is off")))
    }

    fn watermark(&self, class_name: &str, class_level: &str) -> Result<Option<f64>> {
        if self.disable_db_updates {
            return Ok(None);
        }
        Ok(self.load_watermarks()?.by_stream.get(&format!("{class_name}.{class_level}")).copied())
    }

    fn record_watermark(&self, class_name: &str, class_level: &str, end: f64) -> Result<()> {
        if self.disable_db_updates {
            return Ok(());
        }
        let mut watermarks = self.load_watermarks()?;
        watermarks.by_stream.insert(format!("{class_name}.{class_level}"), end);
        fs::create_dir_all(&self.logs_data)?;
        fs::write(self.watermark_path(), serde_json::to_vec_pretty(&watermarks)?)?;
        Ok(())
    }

    fn disable(&self, reason: &str) -> Result<()> {
        if self.disable_db_updates {
            tracing::warn!(reason, "auto-disable (db updates disabled, reason not persisted)");
            return Ok(());
        }
        fs::create_dir_all(&self.logs_data)?;
        fs::write(self.logs_data.join("disabled.json"), serde_json::to_vec_pretty(&serde_json::json!({ "reason": reason }))?)?;
        Ok(())
    }

    fn filter_input_obs(&self, site: &str, facility: &str, process_name: &str) -> Result<bool> {
        Ok(self.process_config(site, facility, process_name)?.filter_input_obs)
    }
}

/// Reads every `*.json` file in `dir` as a [`Group`] and turns it into an
/// [`Observation`], keeping only those overlapping `[begin, end]`.
fn read_observations(dir: &Path, begin: f64, end: f64) -> Result<Vec<Observation>> {
    let mut observations = Vec::new();
    if !dir.exists() {
        return Ok(observations);
    }

    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        let bytes = fs::read(&path)?;
        let group: Group = serde_json::from_slice(&bytes)?;
        let Ok(time_var) = group.get_variable("time") else {
            continue;
        };
        let times = time_var.scalar_samples_as_f64()?;
        let (Some(&first), Some(&last)) = (times.first(), times.last()) else {
            continue;
        };
        if last < begin || first > end {
            continue;
        }
        let dod_version = group.get_attribute("dod_version").and_then(|a| a.value.as_text()).unwrap_or("1.0").to_string();
        let creation_time = entry.metadata().ok().and_then(|m| m.modified().ok()).and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok()).map(|d| d.as_secs() as i64);

        observations.push(Observation {
            group,
            start: first,
            end: last,
            dod_version,
            creation_time,
        });
    }

    observations.sort_by(|a, b| a.start.partial_cmp(&b.start).unwrap_or(std::cmp::Ordering::Equal));
    Ok(observations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ingest_model::{DataType, Variable, encode_scalar_f64};

    fn group_with_times(name: &str, times: &[f64]) -> Group {
        let mut g = Group::new(name);
        g.define_dimension("time", 0, true).unwrap();
        let mut t = Variable::new("time", DataType::Double, vec!["time".into()]);
        for &time in times {
            t.push_sample(encode_scalar_f64(DataType::Double, time));
        }
        g.define_variable(t).unwrap();
        g
    }

    #[test]
    fn retrieve_skips_files_outside_the_requested_window() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.json"), serde_json::to_vec(&group_with_times("a", &[0.0, 60.0])).unwrap()).unwrap();
        fs::write(dir.path().join("b.json"), serde_json::to_vec(&group_with_times("b", &[10_000.0, 10_060.0])).unwrap()).unwrap();

        let obs = read_observations(dir.path(), 0.0, 120.0).unwrap();
        assert_eq!(obs.len(), 1);
        assert_eq!(obs[0].group.name, "a");
    }

    #[test]
    fn watermark_round_trips_through_filesystem_provider() {
        let conf = tempfile::tempdir().unwrap();
        let logs = tempfile::tempdir().unwrap();
        let provider = FilesystemMetadataProvider::new(conf.path(), logs.path(), false);
        assert_eq!(provider.watermark("met", "b1").unwrap(), None);
        provider.record_watermark("met", "b1", 12345.0).unwrap();
        assert_eq!(provider.watermark("met", "b1").unwrap(), Some(12345.0));
    }

    #[test]
    fn disable_db_updates_suppresses_watermark_persistence() {
        let conf = tempfile::tempdir().unwrap();
        let logs = tempfile::tempdir().unwrap();
        let provider = FilesystemMetadataProvider::new(conf.path(), logs.path(), true);
        provider.record_watermark("met", "b1", 12345.0).unwrap();
        assert!(!logs.path().join("watermarks.json").exists());
    }

    #[test]
    fn missing_dod_without_dynamic_dods_is_an_error() {
        let conf = tempfile::tempdir().unwrap();
        let logs = tempfile::tempdir().unwrap();
        let provider = FilesystemMetadataProvider::new(conf.path(), logs.path(), false);
        assert!(provider.output_template("met", "b1", false).is_err());
        assert!(provider.output_template("met", "b1", true).is_ok());
    }
}
