//! Per-variable transform orchestration (§4.5 "For each variable to
//! transform"): decides whether a variable needs transforming, and if
//! so creates its output + transformation-QC companion and invokes the
//! regridding driver; otherwise clones both verbatim.
//!
//! Scoped to the variable's sample (leading) dimension, matching the
//! per-sample QC model used throughout this engine.

use ingest_model::{DataType, Group, Variable, companion, encode_scalar_f64};
use ingest_qc::{bit_descriptions, find_bit_by_phrase, values::missing_values};

use crate::coordinate::needs_transform;
use crate::driver::{RegridContext, RegridParams, TransformMethod, driver_for};
use crate::error::{Result, TransformError};
use crate::qc::new_transformation_qc_variable;

#[derive(Debug, Clone)]
pub struct VariableTransform {
    pub name: String,
    pub method: TransformMethod,
    pub params: RegridParams,
    /// Non-empty forces transformation regardless of shape (§4.5 rule a).
    pub transform_param: Option<String>,
    /// One input dim mapping to several output dims (§4.5 rule c).
    pub dim_grouping: bool,
}

fn input_bad_mask(qc_var: Option<&Variable>) -> u32 {
    let Some(qc_var) = qc_var else { return 0x1 };
    let descriptions = bit_descriptions(qc_var, None);
    find_bit_by_phrase(&descriptions, "transformation could not finish")
        .or_else(|| descriptions.iter().find(|d| d.assessment == ingest_qc::Assessment::Bad))
        .map_or(0x1, |d| d.mask())
}

fn zero_init_qc(name: String, dims: Vec<String>, len: usize) -> Variable {
    let mut qc = Variable::new(name, DataType::Int, dims);
    for _ in 0..len {
        qc.push_sample(encode_scalar_f64(DataType::Int, 0.0));
    }
    qc
}

/// Produces `(output variable, output QC variable)` for one variable
/// mapped onto coordinate `in_coord_name` of `in_group`, regridded onto
/// `out_coord` when needed, or cloned verbatim when not (§4.5).
pub fn transform_variable(coord_system: &str, spec: &VariableTransform, in_group: &Group, in_coord_name: &str, out_coord: &[f64]) -> Result<(Variable, Variable)> {
    let in_var = in_group.get_variable(&spec.name)?;
    let in_coord_var = in_group.get_coordinate_variable(in_coord_name).ok_or_else(|| TransformError::UnresolvableCoordDim {
        coord_system: coord_system.to_string(),
        dimension: in_coord_name.to_string(),
    })?;
    let in_coord = in_coord_var.scalar_samples_as_f64()?;
    let in_qc_var = in_group.get_qc_variable(&spec.name);

    if !needs_transform(spec.transform_param.as_deref(), spec.dim_grouping, Some(&in_coord), out_coord) {
        let out_var = in_var.clone();
        let out_qc = in_qc_var
            .cloned()
            .unwrap_or_else(|| zero_init_qc(companion::qc_name(&spec.name), in_var.dimensions.clone(), in_var.sample_count()));
        return Ok((out_var, out_qc));
    }

    let mut out_var = Variable::new(spec.name.clone(), in_var.dtype, in_var.dimensions.clone());
    if let Some(units) = in_var.get_attribute("units") {
        out_var.define_attribute(units.clone())?;
    }
    let mut out_qc_var = new_transformation_qc_variable(companion::qc_name(&spec.name), in_var.dimensions[0].clone())?;

    let bad_mask = input_bad_mask(in_qc_var);
    let missing = missing_values(in_var).first().copied().unwrap_or(f64::NAN);

    let ctx = RegridContext {
        in_coord: &in_coord,
        out_coord,
        in_var,
        in_qc_var,
        bad_mask,
        missing_value: missing,
        params: &spec.params,
    };

    let output = driver_for(&spec.method).regrid(&ctx)?;

    for value in output.values {
        out_var.push_sample(encode_scalar_f64(in_var.dtype, value));
    }
    for flag in output.qc {
        out_qc_var.push_sample(encode_scalar_f64(DataType::Int, f64::from(flag)));
    }

    Ok((out_var, out_qc_var))
}
