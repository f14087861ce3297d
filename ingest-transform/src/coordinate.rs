//! Coordinate dimension construction for a target coordinate system
//! (spec §4.5, paragraph 1): for each named dimension, exactly one of
//! four selection rules fires, in precedence order.

use ingest_model::{Attribute, DataType, Group, Variable, encode_scalar_f64};

use crate::error::{Result, TransformError};
use crate::units::conversion_factor;

/// `(start, length, interval)` sourcing for a computed grid (§4.5 rule
/// 4). Each field falls back, in order, to a value taken off a retrieved
/// coordinate variable when not supplied directly.
#[derive(Debug, Clone, Default)]
pub struct ComputedGrid {
    pub start: Option<f64>,
    pub length: Option<usize>,
    pub interval: Option<f64>,
}

/// One coordinate dimension of a [`CoordinateSystem`] (§4.5).
#[derive(Debug, Clone)]
pub struct CoordDimSpec {
    pub name: String,
    pub units: String,
    pub dtype: DataType,
    /// Rule 1: source variable name mapped onto this dimension.
    pub mapped_variable: Option<String>,
    /// Whether an unresolved `mapped_variable` is fatal (rule 1).
    pub required: bool,
    /// Rule 2: explicit value array, in `explicit_units` if given.
    pub explicit_values: Option<Vec<f64>>,
    pub explicit_units: Option<String>,
    /// Rule 4: computed grid. `None` routes to rule 3 (implicit copy).
    pub grid: Option<ComputedGrid>,
    pub width: Option<f64>,
    pub alignment: Option<f64>,
    pub front_edge: Option<Vec<f64>>,
    pub back_edge: Option<Vec<f64>>,
    /// Non-empty signals "transform this dimension" regardless of shape
    /// (§4.5 "performed" rule (a)).
    pub transform: Option<String>,
    /// The time dimension always becomes unlimited, in seconds, with its
    /// unit string rewritten to the processing interval's epoch.
    pub is_time: bool,
}

fn find_variable_across<'a>(inputs: &[&'a Group], name: &str) -> Option<&'a Variable> {
    inputs.iter().find_map(|g| g.get_variable(name).ok())
}

fn find_coordinate_variable_across<'a>(inputs: &[&'a Group], name: &str) -> Option<&'a Variable> {
    inputs.iter().find_map(|g| g.get_coordinate_variable(name))
}

fn convert_variable_units(var: &mut Variable, to_units: &str) -> Result<()> {
    let from_units = var.get_attribute("units").and_then(|a| a.value.as_text()).unwrap_or(to_units).to_string();
    if from_units.trim().is_empty() || from_units.eq_ignore_ascii_case(to_units) {
        return Ok(());
    }
    let factor = conversion_factor(&from_units, to_units).ok_or_else(|| TransformError::UnitConvertFailed {
        variable: var.name.clone(),
        from: from_units.clone(),
        to: to_units.to_string(),
    })?;
    let dtype = var.dtype;
    for i in 0..var.sample_count() {
        let v = var.scalar_sample_as_f64(i)?;
        var.set_sample(i, encode_scalar_f64(dtype, v * factor))?;
    }
    var.define_attribute(Attribute::string("units", to_units))?;
    Ok(())
}

fn variable_from_values(name: &str, dtype: DataType, values: &[f64], units: &str, dim_name: &str) -> Variable {
    let mut var = Variable::new(name, dtype, vec![dim_name.to_string()]);
    var.define_attribute(Attribute::string("units", units)).expect("fresh variable");
    for &v in values {
        var.push_sample(encode_scalar_f64(dtype, v));
    }
    var
}

/// Builds an arithmetic sequence `start, start+interval, ...` of
/// `length` values.
#[must_use]
pub fn build_grid_values(start: f64, length: usize, interval: f64) -> Vec<f64> {
    (0..length).map(|i| start + interval * i as f64).collect()
}

fn resolve_grid(coord_system: &str, dim: &str, grid: &ComputedGrid, retrieved: Option<&Variable>) -> Result<(f64, usize, f64)> {
    let retrieved_values = retrieved.and_then(|v| v.scalar_samples_as_f64().ok());

    let start = grid
        .start
        .or_else(|| retrieved_values.as_ref().and_then(|v| v.first().copied()))
        .ok_or_else(|| TransformError::UnresolvableCoordDim {
            coord_system: coord_system.to_string(),
            dimension: dim.to_string(),
        })?;

    let length = grid
        .length
        .or_else(|| retrieved_values.as_ref().map(Vec::len))
        .ok_or_else(|| TransformError::UnresolvableCoordDim {
            coord_system: coord_system.to_string(),
            dimension: dim.to_string(),
        })?;

    let interval = grid
        .interval
        .or_else(|| {
            retrieved_values.as_ref().and_then(|v| {
                if v.len() >= 2 {
                    Some(v[1] - v[0])
                } else {
                    None
                }
            })
        })
        .ok_or_else(|| TransformError::UnresolvableCoordDim {
            coord_system: coord_system.to_string(),
            dimension: dim.to_string(),
        })?;

    Ok((start, length, interval))
}

/// Resolves one coordinate dimension per the §4.5 precedence. Returns
/// `None` only when rule 1's mapped variable is missing and optional
/// (silently skipped); every other path returns a variable or an error.
pub fn resolve_coordinate_dim(coord_system: &str, dim: &CoordDimSpec, inputs: &[&Group], epoch_seconds: f64) -> Result<Option<Variable>> {
    // Rule 1: mapped coordinate variable.
    if let Some(mapped) = &dim.mapped_variable {
        match find_variable_across(inputs, mapped) {
            Some(found) => {
                let mut var = found.clone();
                var.name = dim.name.clone();
                convert_variable_units(&mut var, &dim.units)?;
                return Ok(Some(var));
            }
            None if dim.required => {
                return Err(TransformError::RequiredVariableMissing {
                    variable: mapped.clone(),
                    dimension: dim.name.clone(),
                });
            }
            None => return Ok(None),
        }
    }

    // Rule 2: explicit value array.
    if let Some(values) = &dim.explicit_values {
        let source_units = dim.explicit_units.as_deref().unwrap_or(&dim.units);
        let mut var = variable_from_values(&dim.name, dim.dtype, values, source_units, &dim.name);
        convert_variable_units(&mut var, &dim.units)?;
        return Ok(Some(var));
    }

    match &dim.grid {
        // Rule 3: implicit self-mapping, no interval given.
        None => {
            let retrieved = find_coordinate_variable_across(inputs, &dim.name).ok_or_else(|| TransformError::UnresolvableCoordDim {
                coord_system: coord_system.to_string(),
                dimension: dim.name.clone(),
            })?;
            let mut var = retrieved.clone();
            convert_variable_units(&mut var, &dim.units)?;
            Ok(Some(var))
        }
        // Rule 4: computed grid.
        Some(grid) => {
            let retrieved = find_coordinate_variable_across(inputs, &dim.name);
            let (start, length, interval) = resolve_grid(coord_system, &dim.name, grid, retrieved)?;
            let values = build_grid_values(start, length, interval);
            let mut var = variable_from_values(&dim.name, dim.dtype, &values, &dim.units, &dim.name);
            if dim.is_time {
                var.define_attribute(Attribute::string("units", format!("seconds since {epoch_seconds}")))?;
            }
            Ok(Some(var))
        }
    }
}

/// Synthesizes a companion bounds array (`[front, back]` pairs), either
/// from `width`/`alignment` (default center, `alignment = 0.5`) applied
/// to each coordinate value, or from explicit `front_edge`/`back_edge`
/// arrays used verbatim. Returns `None` if neither is configured.
pub fn synthesize_bounds(dim: &CoordDimSpec, coord_values: &[f64]) -> Result<Option<Vec<(f64, f64)>>> {
    if let (Some(front), Some(back)) = (&dim.front_edge, &dim.back_edge) {
        if front.len() != coord_values.len() || back.len() != coord_values.len() {
            return Err(TransformError::BoundsLengthMismatch {
                variable: dim.name.clone(),
                expected: coord_values.len(),
                actual: front.len().max(back.len()),
            });
        }
        return Ok(Some(front.iter().copied().zip(back.iter().copied()).collect()));
    }

    if let Some(width) = dim.width {
        let alignment = dim.alignment.unwrap_or(0.5);
        return Ok(Some(
            coord_values
                .iter()
                .map(|&c| (c - width * alignment, c + width * (1.0 - alignment)))
                .collect(),
        ));
    }

    Ok(None)
}

/// A named target coordinate system: a set of dimensions built exactly
/// once each, in the order given (§4.5).
#[derive(Debug, Clone)]
pub struct CoordinateSystem {
    pub name: String,
    pub dims: Vec<CoordDimSpec>,
}

impl CoordinateSystem {
    /// Builds the transformation group: one coordinate variable (plus
    /// bounds, if configured) per dimension.
    pub fn build(&self, inputs: &[&Group], epoch_seconds: f64) -> Result<Group> {
        let mut group = Group::new(self.name.clone());
        for dim in &self.dims {
            let Some(var) = resolve_coordinate_dim(&self.name, dim, inputs, epoch_seconds)? else {
                continue;
            };
            group.define_dimension(dim.name.clone(), var.sample_count(), dim.is_time)?;

            let values = var.scalar_samples_as_f64().unwrap_or_default();
            if let Some(bounds) = synthesize_bounds(dim, &values)? {
                let bounds_dim = format!("{}_bound", dim.name);
                group.define_dimension(&bounds_dim, 2, false)?;
                let mut bounds_var = Variable::new(ingest_model::companion::bounds_name(&dim.name), dim.dtype, vec![dim.name.clone(), bounds_dim]);
                for (front, back) in bounds {
                    bounds_var.push_sample(encode_scalar_f64(dim.dtype, front));
                    bounds_var.push_sample(encode_scalar_f64(dim.dtype, back));
                }
                group.define_variable(bounds_var)?;
            }

            group.define_variable(var)?;
        }
        Ok(group)
    }
}

/// Decides whether `variable` needs transformation onto one dimension of
/// the target coordinate system (§4.5 "Transformation is performed"):
/// (a) a non-empty `transform` parameter, (b) shape/value mismatch
/// between the retrieved and target coordinate, or (c) a dimension
/// grouping (one input dim maps to several output dims).
#[must_use]
pub fn needs_transform(transform_param: Option<&str>, dim_grouping: bool, retrieved_values: Option<&[f64]>, target_values: &[f64]) -> bool {
    if transform_param.is_some_and(|t| !t.trim().is_empty()) {
        return true;
    }
    if dim_grouping {
        return true;
    }
    match retrieved_values {
        None => true,
        Some(retrieved) => {
            if retrieved.len() != target_values.len() {
                return true;
            }
            retrieved.iter().zip(target_values).any(|(a, b)| (a - b).abs() > f64::EPSILON)
        }
    }
}
