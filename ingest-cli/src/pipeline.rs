//! Top-level pipeline driver (§5 "Processing loop"): runs the strict
//! `retrieve -> merge -> map/transform -> (hook) -> standard-QC -> store`
//! sequence for one site/facility/process/interval.

use std::collections::HashMap;

use ingest_merge::{VariableTag, map_variables, merge_observations};
use ingest_model::{Dataset, DatastreamFlags, DatastreamId, DatastreamRegistry, DatastreamRole, Group};
use ingest_qc::checks::{PreviousSampleContext, StandardQcConfig};
use ingest_storage::{CustomQcHook, DatastreamDirectory, NetCdfSink, StoreOptions, StoreReport, store_dataset};
use ingest_transform::engine::transform_variable;

use crate::context::ProcessContext;
use crate::error::{CliError, Result};
use crate::metadata::MetadataProvider;

/// Outcome of one pipeline run: either an auto-disable (§7 `future_time`)
/// or the per-output-datastream store reports.
#[derive(Debug, Default)]
pub struct PipelineReport {
    pub disabled_reason: Option<String>,
    pub stores: Vec<(String, StoreReport)>,
}

impl PipelineReport {
    #[must_use]
    pub fn is_disabled(&self) -> bool {
        self.disabled_reason.is_some()
    }
}

/// A datastream key as the metadata layer names it, distinct from the
/// registry-assigned [`DatastreamId`] resolved once per run.
type ClassKey = (String, String, DatastreamRole);

/// Runs one processing interval end to end.
#[allow(clippy::too_many_arguments)]
pub fn run(
    ctx: &ProcessContext,
    metadata: &dyn MetadataProvider,
    registry: &mut DatastreamRegistry,
    directory: &dyn DatastreamDirectory,
    sink: &mut dyn NetCdfSink,
    hook: &dyn CustomQcHook,
    qc_config: &StandardQcConfig,
) -> Result<PipelineReport> {
    // §7 `future_time`: an interval that reaches past "now" is never
    // processed; the stream auto-disables instead of erroring.
    if ctx.end > ctx.now {
        let reason = format!("future_time: requested end {} is past now {}", ctx.end, ctx.now);
        metadata.disable(&reason)?;
        return Ok(PipelineReport {
            disabled_reason: Some(reason),
            stores: Vec::new(),
        });
    }

    let specs = metadata.datastreams(&ctx.site, &ctx.facility, &ctx.process_name)?;
    if specs.is_empty() {
        return Err(CliError::UnknownSiteFacility {
            site: ctx.site.clone(),
            facility: ctx.facility.clone(),
        });
    }

    let ids = register_datastreams(ctx, registry, &specs)?;

    let filter_input_obs = metadata.filter_input_obs(&ctx.site, &ctx.facility, &ctx.process_name)?;
    let overlap_mode = if filter_input_obs {
        ingest_merge::OverlapMode::FilterInputObs
    } else {
        ingest_merge::OverlapMode::Strict
    };

    let mut retrieved = Vec::new();
    for spec in specs.iter().filter(|s| s.role == DatastreamRole::Input) {
        let id = ids[&(spec.class_name.clone(), spec.class_level.clone(), DatastreamRole::Input)];
        let ds = registry.get(id)?;
        let path = ds.path.clone().unwrap_or_default();

        let mut observations = metadata.retrieve(&path, ctx.begin, ctx.end)?;
        observations.sort_by(|a, b| a.start.partial_cmp(&b.start).unwrap_or(std::cmp::Ordering::Equal));
        merge_observations(&mut observations, overlap_mode)?;

        for observation in observations {
            retrieved.push(observation.group);
        }
    }

    let tag_specs = metadata.variable_tags(&ctx.site, &ctx.facility, &ctx.process_name)?;
    let tags = resolve_tags(&tag_specs, &ids, registry)?;

    let mut outputs = Vec::new();
    for spec in specs.iter().filter(|s| s.role == DatastreamRole::Output) {
        let id = ids[&(spec.class_name.clone(), spec.class_level.clone(), DatastreamRole::Output)];
        let template = metadata.output_template(&spec.class_name, &spec.class_level, ctx.dynamic_dods)?;
        outputs.push(Dataset::new(id, template));
    }

    let map_time_range = Some((ctx.begin, ctx.end));
    for group in &retrieved {
        map_variables(group, &tags, &mut outputs, map_time_range, ctx.dynamic_dods)?;
    }

    apply_transforms(ctx, metadata, registry, &retrieved, &mut outputs)?;

    let mut report = PipelineReport::default();
    let previous = PreviousSampleContext::default();
    for mut dataset in outputs {
        let ds = registry.get(dataset.datastream)?;
        let dsc_name = ds.dsc_name();
        let watermark = metadata.watermark(&ds.class_name, &ds.class_level)?;

        let options = StoreOptions {
            newfile: ctx.force,
            is_async: false,
            is_reprocessing: ctx.reprocessing,
            min_valid_time: watermark,
            now: ctx.now,
            qc_config: Some(qc_config),
            previous_qc_context: Some(&previous),
            hook,
        };

        let store_report = store_dataset(registry, dataset.datastream, &mut dataset.root, directory, sink, &options)?;
        if store_report.stored {
            metadata.record_watermark(&ds.class_name, &ds.class_level, store_report.end)?;
        }
        report.stores.push((dsc_name, store_report));
    }

    Ok(report)
}

fn register_datastreams(
    ctx: &ProcessContext,
    registry: &mut DatastreamRegistry,
    specs: &[crate::metadata::DatastreamSpec],
) -> Result<HashMap<ClassKey, DatastreamId>> {
    let mut ids = HashMap::new();

    for spec in specs {
        let id = registry.init_datastream(&ctx.site, &ctx.facility, &spec.class_name, &spec.class_level, spec.role, spec.format);

        let path = format!(
            "{}/{}{}{}.{}",
            ctx.paths.datastream_data.display(),
            ctx.site,
            spec.class_name,
            ctx.facility,
            spec.class_level
        );
        registry.set_path(id, path)?;

        let clause_spec = spec.split_interval.clone().or_else(|| ctx.output_interval.clone());
        if let Some(clause_spec) = clause_spec {
            let clauses = ingest_model::parse_output_interval_spec(&clause_spec)?;
            let matching = clauses.into_iter().find(|clause| match &clause.class_level {
                None => true,
                Some((class_name, level)) => class_name == &spec.class_name && level == &spec.class_level,
            });
            if let Some(clause) = matching {
                registry.set_split_policy(id, clause.policy)?;
            }
        }

        ids.insert((spec.class_name.clone(), spec.class_level.clone(), spec.role), id);
    }

    Ok(ids)
}

/// Resolves class/level-keyed [`crate::metadata::VariableTagSpec`]s into
/// [`VariableTag`]s against the now-populated registry, OR-ing in each
/// output datastream's `ROLLUP_TRANS_QC` flag (§4.5) alongside whatever
/// the tag itself specifies.
fn resolve_tags(specs: &[crate::metadata::VariableTagSpec], ids: &HashMap<ClassKey, DatastreamId>, registry: &DatastreamRegistry) -> Result<Vec<VariableTag>> {
    let mut tags = Vec::with_capacity(specs.len());

    for spec in specs {
        let source_key = (spec.source_class.clone(), spec.source_level.clone(), DatastreamRole::Input);
        let source_id = *ids
            .get(&source_key)
            .ok_or_else(|| CliError::Config(format!("variable tag references unconfigured source datastream '{}.{}'", spec.source_class, spec.source_level)))?;

        let mut tag = VariableTag::new(source_id, spec.source_name.clone());
        if let Some(system) = &spec.target_coord_system {
            tag = tag.with_target_coord_system(system.clone());
        }
        if spec.required {
            tag = tag.required();
        }
        if spec.skip_transform {
            tag = tag.skip_transform();
        }

        let mut rollup = spec.rollup_trans_qc;
        for output in &spec.outputs {
            let target_key = (output.class_name.clone(), output.class_level.clone(), DatastreamRole::Output);
            let target_id = *ids
                .get(&target_key)
                .ok_or_else(|| CliError::Config(format!("variable tag references unconfigured output datastream '{}.{}'", output.class_name, output.class_level)))?;
            rollup = rollup || registry.flags(target_id)?.contains(DatastreamFlags::ROLLUP_TRANS_QC);
            tag = tag.with_output(target_id, output.target_var_name.clone());
        }
        if rollup {
            tag = tag.rollup_trans_qc();
        }

        tags.push(tag);
    }

    Ok(tags)
}

/// Runs the coordinate-transform engine over every output dataset that
/// has a configured [`crate::metadata::TransformPlan`] and whose
/// datastream doesn't carry `SKIP_TRANSFORM` (§4.5).
fn apply_transforms(ctx: &ProcessContext, metadata: &dyn MetadataProvider, registry: &DatastreamRegistry, retrieved: &[Group], outputs: &mut [Dataset]) -> Result<()> {
    let inputs: Vec<&Group> = retrieved.iter().collect();

    for dataset in outputs.iter_mut() {
        let ds = registry.get(dataset.datastream)?;
        if registry.flags(dataset.datastream)?.contains(DatastreamFlags::SKIP_TRANSFORM) {
            continue;
        }

        let Some(plan) = metadata.transform_plan(&ds.class_name, &ds.class_level)? else {
            continue;
        };

        let coord_system = plan.coordinate_system();
        let built = coord_system.build(&inputs, ctx.begin)?;

        let Some(out_dim) = coord_system.dims.first() else {
            continue;
        };
        let Ok(out_coord_var) = built.get_variable(&out_dim.name) else {
            continue;
        };
        let out_coord = out_coord_var.scalar_samples_as_f64()?;

        for dim in built.dimensions() {
            if dataset.root.get_dimension(&dim.name).is_none() {
                dataset.root.define_dimension(dim.name.clone(), dim.length(), dim.is_unlimited)?;
            }
        }
        for var in built.variables() {
            if !dataset.root.has_variable(&var.name) {
                dataset.root.define_variable(var.clone())?;
            }
        }

        for var_spec in plan.variable_transforms() {
            let Some(in_group) = inputs.iter().copied().find(|g| g.has_variable(&var_spec.name)) else {
                // §7 `missing_optional_mapped_coord`: non-fatal, skip.
                continue;
            };

            let (out_var, out_qc) = transform_variable(&coord_system.name, &var_spec, in_group, &plan.in_coord_name, &out_coord)?;
            dataset.root.define_variable(out_var)?;
            dataset.root.define_variable(out_qc)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ingest_model::DatastreamFormat;

    #[test]
    fn register_datastreams_assigns_distinct_ids_per_role() {
        let ctx = sample_ctx();
        let mut registry = DatastreamRegistry::new();
        let specs = vec![
            crate::metadata::DatastreamSpec {
                class_name: "met".into(),
                class_level: "a1".into(),
                role: DatastreamRole::Input,
                format: DatastreamFormat::Netcdf3,
                split_interval: None,
            },
            crate::metadata::DatastreamSpec {
                class_name: "met".into(),
                class_level: "b1".into(),
                role: DatastreamRole::Output,
                format: DatastreamFormat::Netcdf3,
                split_interval: Some("daily".into()),
            },
        ];

        let ids = register_datastreams(&ctx, &mut registry, &specs).unwrap();
        assert_eq!(ids.len(), 2);
        let out_id = ids[&("met".to_string(), "b1".to_string(), DatastreamRole::Output)];
        assert_eq!(registry.split_policy(out_id).unwrap().mode, ingest_model::SplitMode::OnDays);
    }

    fn sample_ctx() -> ProcessContext {
        ProcessContext {
            site: "sgp".into(),
            facility: "E13".into(),
            process_name: "met_b1_ingest".into(),
            force: false,
            reprocessing: false,
            debug_level: 0,
            provenance: false,
            dynamic_dods: false,
            disable_db_updates: false,
            output_interval: None,
            begin: 0.0,
            end: 86_400.0,
            now: 2_000_000_000.0,
            paths: crate::context::Paths {
                datastream_data: "/data/datastream".into(),
                logs_data: "/data/logs".into(),
                conf_data: "/data/conf".into(),
                db_connect_file: None,
                data_home: "/data".into(),
            },
        }
    }
}
