//! Variable mapper (spec §4.4, C4): walks tagged retrieved variables and
//! materializes them into their output datasets, handling time-axis
//! alignment, companion-variable copy, and `ROLLUP_TRANS_QC`
//! consolidation.

use crate::error::{MergeError, Result};
use crate::tag::VariableTag;
use ingest_model::companion::{METRIC_SUFFIXES, bounds_name, metric_name, qc_name};
use ingest_model::{Attribute, Dataset, Group, Variable};

/// One (input, output) pairing the mapper visited, recording the input
/// slice and where it landed in the output (spec §4.4).
#[derive(Debug, Clone, PartialEq)]
pub struct MappingRecord {
    pub variable_name: String,
    pub input_start_index: usize,
    pub input_end_index: usize,
    pub output_sample_start: usize,
}

/// Maps every tagged, output-bound variable from `retrieved` into the
/// matching entries of `outputs`.
///
/// `map_time_range` clips the input slice to `[lo, hi]` (the configured
/// map time range, defaulting to the current processing interval at the
/// call site). `dynamic_dod` mirrors the process-wide dynamic-DOD
/// switch: when true, absent output variables are created by cloning
/// the input; when false, a missing output variable is an error.
pub fn map_variables(
    retrieved: &Group,
    tags: &[VariableTag],
    outputs: &mut [Dataset],
    map_time_range: Option<(f64, f64)>,
    dynamic_dod: bool,
) -> Result<Vec<MappingRecord>> {
    let mut records = Vec::new();

    for tag in tags {
        if !tag.has_output() {
            continue;
        }
        let source_var = match retrieved.get_variable(&tag.source_name) {
            Ok(v) => v,
            Err(_) if tag.flags.required => {
                return Err(MergeError::RequiredVariableMissing {
                    name: tag.source_name.clone(),
                });
            }
            Err(_) => continue,
        };

        for target in &tag.output_targets {
            let Some(dataset) = outputs
                .iter_mut()
                .find(|d| d.datastream == target.target_datastream)
            else {
                continue;
            };

            let record = map_one_variable(
                retrieved,
                source_var,
                &target.target_var_name,
                tag,
                dataset,
                map_time_range,
                dynamic_dod,
            )?;
            records.push(record);
        }
    }

    Ok(records)
}

fn sample_times(group: &Group) -> Result<Vec<f64>> {
    use ingest_model::time::{TimeVariableKind, find_time_variable};
    Ok(match find_time_variable(group)? {
        TimeVariableKind::Time(v) => v.scalar_samples_as_f64()?,
        TimeVariableKind::BaseTimeOffset {
            base_time,
            time_offset,
        } => {
            let base = base_time.scalar_sample_as_f64(0).unwrap_or(0.0);
            time_offset
                .scalar_samples_as_f64()?
                .into_iter()
                .map(|o| o + base)
                .collect()
        }
    })
}

fn map_one_variable(
    retrieved: &Group,
    source_var: &Variable,
    output_name: &str,
    tag: &VariableTag,
    dataset: &mut Dataset,
    map_time_range: Option<(f64, f64)>,
    dynamic_dod: bool,
) -> Result<MappingRecord> {
    let is_time_indexed = source_var.sample_axis() == Some("time");

    if !is_time_indexed {
        ensure_output_variable(retrieved, source_var, output_name, dataset, dynamic_dod)?;
        copy_all_samples(source_var, output_name, dataset)?;
        stamp_source_attribute(dataset, output_name, tag)?;
        return Ok(MappingRecord {
            variable_name: output_name.to_string(),
            input_start_index: 0,
            input_end_index: source_var.sample_count(),
            output_sample_start: 0,
        });
    }

    let input_times = sample_times(retrieved)?;
    let (lo, hi) = map_time_range.unwrap_or((f64::MIN, f64::MAX));
    let start_idx = input_times
        .iter()
        .position(|&t| t >= lo)
        .unwrap_or(input_times.len());
    let end_idx = input_times
        .iter()
        .rposition(|&t| t <= hi)
        .map(|i| i + 1)
        .unwrap_or(0)
        .max(start_idx);

    ensure_output_variable(retrieved, source_var, output_name, dataset, dynamic_dod)?;

    // Overlap must be keyed off how many samples *this* output variable
    // already carries, not the shared output time axis: an earlier tag
    // mapped in the same call may have already pushed the group's time
    // axis ahead of where this variable's own data actually ends.
    let existing_count = dataset
        .root
        .get_variable(output_name)
        .map(Variable::sample_count)
        .unwrap_or(0);
    let output_times_before = sample_times(&dataset.root).unwrap_or_default();
    let output_times_for_var = &output_times_before[..existing_count.min(output_times_before.len())];

    let (sample_start, overlap_len) = if output_times_for_var.is_empty() {
        (0, 0)
    } else if let Some(first_input_time) = input_times.get(start_idx) {
        match output_times_for_var
            .iter()
            .position(|&ot| ot >= *first_input_time)
        {
            Some(idx) => {
                let n = end_idx.saturating_sub(start_idx);
                let window_end = (idx + n).min(output_times_for_var.len());
                let window = &output_times_for_var[idx..window_end];
                let input_window = &input_times[start_idx..start_idx + window.len()];
                if window.iter().zip(input_window).all(|(a, b)| (a - b).abs() < 1e-6) {
                    (idx, window.len())
                } else {
                    return Err(MergeError::ConflictingTimeValues {
                        variable: output_name.to_string(),
                        sample_start: idx,
                    });
                }
            }
            None => (output_times_for_var.len(), 0),
        }
    } else {
        (output_times_for_var.len(), 0)
    };

    let copy_start = start_idx + overlap_len;
    if copy_start < end_idx {
        copy_sample_range(retrieved, source_var, output_name, copy_start, end_idx, dataset)?;
    }

    copy_companions(retrieved, source_var, output_name, copy_start, end_idx, dataset, tag)?;
    stamp_source_attribute(dataset, output_name, tag)?;

    Ok(MappingRecord {
        variable_name: output_name.to_string(),
        input_start_index: start_idx,
        input_end_index: end_idx,
        output_sample_start: sample_start,
    })
}

fn ensure_output_variable(
    retrieved: &Group,
    source_var: &Variable,
    output_name: &str,
    dataset: &mut Dataset,
    dynamic_dod: bool,
) -> Result<()> {
    if dataset.root.has_variable(output_name) {
        return Ok(());
    }
    if !dynamic_dod {
        return Err(MergeError::OutputVariableUndefined {
            name: output_name.to_string(),
        });
    }
    for dim_name in &source_var.dimensions {
        if dataset.root.get_dimension(dim_name).is_none() {
            if let Some(source_dim) = retrieved.get_dimension(dim_name) {
                dataset.root.define_dimension(
                    dim_name.clone(),
                    source_dim.length(),
                    source_dim.is_unlimited,
                )?;
            }
        }
    }
    let mut cloned = Variable::new(output_name, source_var.dtype, source_var.dimensions.clone());
    for attr in source_var.attributes.values() {
        cloned.define_attribute(attr.clone())?;
    }
    dataset.root.define_variable(cloned)?;
    Ok(())
}

fn copy_all_samples(source_var: &Variable, output_name: &str, dataset: &mut Dataset) -> Result<()> {
    for sample in source_var.samples() {
        dataset.root.append_sample(output_name, sample.clone())?;
    }
    Ok(())
}

fn copy_sample_range(
    retrieved: &Group,
    source_var: &Variable,
    output_name: &str,
    start: usize,
    end: usize,
    dataset: &mut Dataset,
) -> Result<()> {
    check_non_leading_dims(retrieved, source_var, output_name, dataset)?;
    for sample in &source_var.samples()[start.min(source_var.sample_count())..end.min(source_var.sample_count())] {
        dataset.root.append_sample(output_name, sample.clone())?;
    }
    Ok(())
}

/// Mismatched non-leading (non sample-axis) dimension lengths between the
/// input and output variable are fatal (spec §4.4).
fn check_non_leading_dims(
    retrieved: &Group,
    source_var: &Variable,
    output_name: &str,
    dataset: &Dataset,
) -> Result<()> {
    let Ok(output_var) = dataset.root.get_variable(output_name) else {
        return Ok(());
    };
    for (src_dim, out_dim) in source_var.dimensions[1..].iter().zip(output_var.dimensions[1..].iter()) {
        let src_len = retrieved.get_dimension(src_dim).map(ingest_model::Dimension::length);
        let out_len = dataset.root.get_dimension(out_dim).map(ingest_model::Dimension::length);
        if let (Some(src_len), Some(out_len)) = (src_len, out_len) {
            if src_len != out_len {
                return Err(MergeError::DimensionMismatch {
                    variable: output_name.to_string(),
                    dimension: out_dim.clone(),
                    input_len: src_len,
                    output_len: out_len,
                });
            }
        }
    }
    Ok(())
}

fn copy_companions(
    retrieved: &Group,
    source_var: &Variable,
    output_name: &str,
    start: usize,
    end: usize,
    dataset: &mut Dataset,
    tag: &VariableTag,
) -> Result<()> {
    let output_qc_name = qc_name(output_name);

    match retrieved.get_qc_variable(&source_var.name) {
        Some(qc_var) if tag.flags.rollup_trans_qc && ingest_qc::rollup::is_transformation_qc(qc_var) => {
            let rollup = ingest_qc::rollup::rollup_transformation_qc(qc_var)?;
            ensure_output_variable(retrieved, qc_var, &output_qc_name, dataset, true)?;
            for &bits in &rollup.bits[start.min(rollup.bits.len())..end.min(rollup.bits.len())] {
                dataset
                    .root
                    .append_sample(&output_qc_name, (bits as i32).to_le_bytes().to_vec())?;
            }
        }
        Some(qc_var) => {
            if dataset.root.has_variable(&output_qc_name) {
                copy_sample_range(retrieved, qc_var, &output_qc_name, start, end, dataset)?;
            }
        }
        None => {
            if let Ok(output_qc) = dataset.root.get_variable(&output_qc_name) {
                let zero_count = end.saturating_sub(start);
                let size = output_qc.dtype.size();
                for _ in 0..zero_count {
                    dataset.root.append_sample(&output_qc_name, vec![0u8; size])?;
                }
            }
        }
    }

    if let Some(bounds_var) = retrieved.get_bounds_variable(&source_var.name) {
        let output_bounds_name = bounds_name(output_name);
        if dataset.root.has_variable(&output_bounds_name) {
            copy_sample_range(retrieved, bounds_var, &output_bounds_name, start, end, dataset)?;
        }
    }

    for suffix in METRIC_SUFFIXES {
        let source_metric = metric_name(&source_var.name, suffix);
        if let Ok(metric_var) = retrieved.get_variable(&source_metric) {
            let output_metric = metric_name(output_name, suffix);
            if dataset.root.has_variable(&output_metric) {
                copy_sample_range(retrieved, metric_var, &output_metric, start, end, dataset)?;
            }
        }
    }

    Ok(())
}

fn stamp_source_attribute(dataset: &mut Dataset, output_name: &str, tag: &VariableTag) -> Result<()> {
    let Ok(output_var) = dataset.root.get_variable_mut(output_name) else {
        return Ok(());
    };
    let locked = output_var.attributes_locked();
    let already_set = output_var.get_attribute("source").is_some();
    if locked && already_set {
        return Ok(());
    }
    let value = format!("{}:{}", tag.source_datastream, tag.source_name);
    output_var.define_attribute(Attribute::string("source", value))?;
    Ok(())
}
