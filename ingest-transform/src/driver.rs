//! The regridding driver trait and its four method implementations
//! (§4.5 "When performed", step 2): `TRANS_INTERPOLATE`,
//! `TRANS_SUBSAMPLE`, `TRANS_BIN_AVERAGE`, `TRANS_CARACENA`.

use ingest_model::Variable;

use crate::caracena::caracena_interpolate;
use crate::error::{Result, TransformError};
use crate::qc::{
    BIT_ALL_BAD_INPUTS, BIT_BAD_GOODFRAC, BIT_BAD_STD, BIT_EXTRAPOLATE, BIT_IND_GOODFRAC, BIT_IND_STD, BIT_NOT_USING_CLOSEST, BIT_OUTSIDE_RANGE, BIT_SOME_BAD_INPUTS, BIT_ZERO_WEIGHT,
};

/// Per-(variable, dimension) regrid parameters; only the fields relevant
/// to the chosen [`TransformMethod`] are consulted.
#[derive(Debug, Clone, Default)]
pub struct RegridParams {
    /// `TRANS_INTERPOLATE`: maximum extrapolation distance beyond the
    /// input coordinate's range.
    pub range: Option<f64>,
    /// `TRANS_BIN_AVERAGE`: window width and alignment (default center).
    pub width: Option<f64>,
    pub alignment: Option<f64>,
    pub std_bad_max: Option<f64>,
    pub std_ind_max: Option<f64>,
    pub goodfrac_bad_min: Option<f64>,
    pub goodfrac_ind_min: Option<f64>,
    /// `TRANS_CARACENA`: input station `(lat, lon)` positions, parallel
    /// to `in_var`'s samples.
    pub station_coords: Option<Vec<(f64, f64)>>,
    /// `TRANS_CARACENA`: output grid `(lat, lon)` positions, parallel to
    /// the output variable's samples.
    pub grid_coords: Option<Vec<(f64, f64)>>,
    pub caracena_lambda: f64,
}

#[derive(Debug, Clone)]
pub enum TransformMethod {
    Interpolate,
    Subsample,
    BinAverage,
    Caracena,
}

/// The decoded inputs a [`RegridDriver`] needs: the retrieved
/// coordinate axis, the target coordinate axis, and the source
/// variable/QC pair plus its bad-bit mask and missing-value sentinel.
pub struct RegridContext<'a> {
    pub in_coord: &'a [f64],
    pub out_coord: &'a [f64],
    pub in_var: &'a Variable,
    pub in_qc_var: Option<&'a Variable>,
    pub bad_mask: u32,
    pub missing_value: f64,
    pub params: &'a RegridParams,
}

#[derive(Debug, Clone)]
pub struct RegridOutput {
    pub values: Vec<f64>,
    pub qc: Vec<u32>,
}

pub trait RegridDriver {
    fn regrid(&self, ctx: &RegridContext) -> Result<RegridOutput>;
}

fn good_input_indices(values: &[f64], qc: Option<&[f64]>, bad_mask: u32, missing: f64) -> Vec<usize> {
    (0..values.len())
        .filter(|&i| {
            let not_bad = qc.is_none_or(|q| (q[i] as i64 as u32) & bad_mask == 0);
            let not_missing = values[i] != missing;
            not_bad && not_missing
        })
        .collect()
}

fn decode_qc(qc_var: Option<&Variable>) -> Result<Option<Vec<f64>>> {
    qc_var.map(Variable::scalar_samples_as_f64).transpose().map_err(Into::into)
}

pub struct InterpolateDriver;

impl RegridDriver for InterpolateDriver {
    fn regrid(&self, ctx: &RegridContext) -> Result<RegridOutput> {
        let in_values = ctx.in_var.scalar_samples_as_f64()?;
        let in_qc = decode_qc(ctx.in_qc_var)?;
        let good = good_input_indices(&in_values, in_qc.as_deref(), ctx.bad_mask, ctx.missing_value);

        if good.is_empty() {
            return Ok(RegridOutput {
                values: vec![ctx.missing_value; ctx.out_coord.len()],
                qc: vec![BIT_ALL_BAD_INPUTS; ctx.out_coord.len()],
            });
        }

        let mut values = Vec::with_capacity(ctx.out_coord.len());
        let mut qc = vec![0u32; ctx.out_coord.len()];

        for (i, &target) in ctx.out_coord.iter().enumerate() {
            let lo = good.iter().copied().filter(|&gi| ctx.in_coord[gi] <= target).max_by(|&a, &b| ctx.in_coord[a].total_cmp(&ctx.in_coord[b]));
            let hi = good.iter().copied().filter(|&gi| ctx.in_coord[gi] >= target).min_by(|&a, &b| ctx.in_coord[a].total_cmp(&ctx.in_coord[b]));

            match (lo, hi) {
                (Some(l), Some(h)) if l == h => values.push(in_values[l]),
                (Some(l), Some(h)) => {
                    let (x0, x1) = (ctx.in_coord[l], ctx.in_coord[h]);
                    let t = (target - x0) / (x1 - x0);
                    values.push(in_values[l] + t * (in_values[h] - in_values[l]));
                }
                (Some(edge), None) | (None, Some(edge)) => {
                    let dist = (target - ctx.in_coord[edge]).abs();
                    if ctx.params.range.is_some_and(|range| dist <= range) {
                        values.push(in_values[edge]);
                        qc[i] |= BIT_EXTRAPOLATE;
                    } else {
                        values.push(ctx.missing_value);
                        qc[i] |= BIT_OUTSIDE_RANGE;
                    }
                }
                (None, None) => unreachable!("good is non-empty"),
            }
        }

        Ok(RegridOutput { values, qc })
    }
}

pub struct SubsampleDriver;

impl RegridDriver for SubsampleDriver {
    fn regrid(&self, ctx: &RegridContext) -> Result<RegridOutput> {
        let in_values = ctx.in_var.scalar_samples_as_f64()?;
        let in_qc = decode_qc(ctx.in_qc_var)?;
        let good: Vec<usize> = good_input_indices(&in_values, in_qc.as_deref(), ctx.bad_mask, ctx.missing_value);

        let mut values = Vec::with_capacity(ctx.out_coord.len());
        let mut qc = vec![0u32; ctx.out_coord.len()];

        for (i, &target) in ctx.out_coord.iter().enumerate() {
            let nearest_any = (0..ctx.in_coord.len()).min_by(|&a, &b| (ctx.in_coord[a] - target).abs().total_cmp(&(ctx.in_coord[b] - target).abs()));
            let nearest_good = good.iter().copied().min_by(|&a, &b| (ctx.in_coord[a] - target).abs().total_cmp(&(ctx.in_coord[b] - target).abs()));

            match nearest_good {
                Some(g) => {
                    values.push(in_values[g]);
                    if nearest_any != Some(g) {
                        qc[i] |= BIT_NOT_USING_CLOSEST;
                    }
                }
                None => {
                    values.push(ctx.missing_value);
                    qc[i] |= BIT_ALL_BAD_INPUTS;
                }
            }
        }

        Ok(RegridOutput { values, qc })
    }
}

pub struct BinAverageDriver;

impl RegridDriver for BinAverageDriver {
    fn regrid(&self, ctx: &RegridContext) -> Result<RegridOutput> {
        let width = ctx.params.width.ok_or_else(|| TransformError::other("bin-average transform requires a width parameter"))?;
        let alignment = ctx.params.alignment.unwrap_or(0.5);

        let in_values = ctx.in_var.scalar_samples_as_f64()?;
        let in_qc = decode_qc(ctx.in_qc_var)?;

        let mut values = Vec::with_capacity(ctx.out_coord.len());
        let mut qc = vec![0u32; ctx.out_coord.len()];

        for (i, &target) in ctx.out_coord.iter().enumerate() {
            let lo = target - width * alignment;
            let hi = target + width * (1.0 - alignment);

            let in_window: Vec<usize> = (0..ctx.in_coord.len()).filter(|&j| ctx.in_coord[j] >= lo && ctx.in_coord[j] <= hi).collect();

            if in_window.is_empty() {
                values.push(ctx.missing_value);
                qc[i] |= BIT_ZERO_WEIGHT;
                continue;
            }

            let good: Vec<usize> = in_window
                .iter()
                .copied()
                .filter(|&j| {
                    let not_bad = in_qc.as_ref().is_none_or(|q| (q[j] as i64 as u32) & ctx.bad_mask == 0);
                    let not_missing = in_values[j] != ctx.missing_value;
                    not_bad && not_missing
                })
                .collect();

            if good.is_empty() {
                values.push(ctx.missing_value);
                qc[i] |= BIT_ALL_BAD_INPUTS;
                continue;
            }

            let mut flags = 0u32;
            if good.len() < in_window.len() {
                flags |= BIT_SOME_BAD_INPUTS;
            }

            let goodfrac = good.len() as f64 / in_window.len() as f64;
            if ctx.params.goodfrac_bad_min.is_some_and(|min| goodfrac < min) {
                flags |= BIT_BAD_GOODFRAC;
            } else if ctx.params.goodfrac_ind_min.is_some_and(|min| goodfrac < min) {
                flags |= BIT_IND_GOODFRAC;
            }

            let mean = good.iter().map(|&j| in_values[j]).sum::<f64>() / good.len() as f64;
            let std = (good.iter().map(|&j| (in_values[j] - mean).powi(2)).sum::<f64>() / good.len() as f64).sqrt();
            if ctx.params.std_bad_max.is_some_and(|max| std > max) {
                flags |= BIT_BAD_STD;
            } else if ctx.params.std_ind_max.is_some_and(|max| std > max) {
                flags |= BIT_IND_STD;
            }

            values.push(mean);
            qc[i] |= flags;
        }

        Ok(RegridOutput { values, qc })
    }
}

pub struct CaracenaDriver;

impl RegridDriver for CaracenaDriver {
    fn regrid(&self, ctx: &RegridContext) -> Result<RegridOutput> {
        let stations = ctx.params.station_coords.as_ref().ok_or_else(|| TransformError::other("Caracena transform requires station_coords"))?;
        let grid = ctx.params.grid_coords.as_ref().ok_or_else(|| TransformError::other("Caracena transform requires grid_coords"))?;

        let in_values = ctx.in_var.scalar_samples_as_f64()?;
        let in_qc = decode_qc(ctx.in_qc_var)?;
        let good = good_input_indices(&in_values, in_qc.as_deref(), ctx.bad_mask, ctx.missing_value);

        if good.is_empty() {
            return Ok(RegridOutput {
                values: vec![ctx.missing_value; grid.len()],
                qc: vec![BIT_ALL_BAD_INPUTS; grid.len()],
            });
        }

        let good_stations: Vec<((f64, f64), f64)> = good.iter().map(|&i| (stations[i], in_values[i])).collect();
        let values = caracena_interpolate(&good_stations, grid, ctx.params.caracena_lambda)?;

        let mut qc = vec![0u32; grid.len()];
        if good.len() < stations.len() {
            for flag in &mut qc {
                *flag |= BIT_SOME_BAD_INPUTS;
            }
        }

        Ok(RegridOutput { values, qc })
    }
}

/// Dispatches to the driver matching `method`.
#[must_use]
pub fn driver_for(method: &TransformMethod) -> Box<dyn RegridDriver> {
    match method {
        TransformMethod::Interpolate => Box::new(InterpolateDriver),
        TransformMethod::Subsample => Box::new(SubsampleDriver),
        TransformMethod::BinAverage => Box::new(BinAverageDriver),
        TransformMethod::Caracena => Box::new(CaracenaDriver),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ingest_model::{DataType, encode_scalar_f64};

    fn var_with(values: &[f64]) -> Variable {
        let mut v = Variable::new("x", DataType::Double, vec!["axis".into()]);
        for &value in values {
            v.push_sample(encode_scalar_f64(DataType::Double, value));
        }
        v
    }

    fn ctx<'a>(in_coord: &'a [f64], out_coord: &'a [f64], in_var: &'a Variable, params: &'a RegridParams) -> RegridContext<'a> {
        RegridContext {
            in_coord,
            out_coord,
            in_var,
            in_qc_var: None,
            bad_mask: 1,
            missing_value: -9999.0,
            params,
        }
    }

    #[test]
    fn interpolate_linear_between_two_points() {
        let in_coord = [0.0, 10.0];
        let var = var_with(&[0.0, 100.0]);
        let out_coord = [5.0];
        let params = RegridParams::default();
        let out = InterpolateDriver.regrid(&ctx(&in_coord, &out_coord, &var, &params)).unwrap();
        assert_eq!(out.values, vec![50.0]);
        assert_eq!(out.qc, vec![0]);
    }

    #[test]
    fn interpolate_extrapolates_within_range() {
        let in_coord = [0.0, 10.0];
        let var = var_with(&[0.0, 100.0]);
        let out_coord = [12.0];
        let mut params = RegridParams::default();
        params.range = Some(5.0);
        let out = InterpolateDriver.regrid(&ctx(&in_coord, &out_coord, &var, &params)).unwrap();
        assert_eq!(out.qc, vec![BIT_EXTRAPOLATE]);
    }

    #[test]
    fn interpolate_outside_range_is_missing() {
        let in_coord = [0.0, 10.0];
        let var = var_with(&[0.0, 100.0]);
        let out_coord = [50.0];
        let mut params = RegridParams::default();
        params.range = Some(1.0);
        let out = InterpolateDriver.regrid(&ctx(&in_coord, &out_coord, &var, &params)).unwrap();
        assert_eq!(out.qc, vec![BIT_OUTSIDE_RANGE]);
        assert_eq!(out.values, vec![-9999.0]);
    }

    #[test]
    fn subsample_flags_not_using_closest_when_nearest_is_bad() {
        let in_coord = [0.0, 1.0, 2.0];
        let var = var_with(&[10.0, 20.0, 30.0]);
        let mut qc_var = Variable::new("qc_x", DataType::Int, vec!["axis".into()]);
        for v in [0.0, 1.0, 0.0] {
            qc_var.push_sample(encode_scalar_f64(DataType::Int, v));
        }
        let out_coord = [1.0];
        let params = RegridParams::default();
        let mut c = ctx(&in_coord, &out_coord, &var, &params);
        c.in_qc_var = Some(&qc_var);
        let out = SubsampleDriver.regrid(&c).unwrap();
        assert_eq!(out.values, vec![10.0]);
        assert_eq!(out.qc, vec![BIT_NOT_USING_CLOSEST]);
    }

    #[test]
    fn bin_average_computes_mean_and_flags_std() {
        let in_coord = [0.0, 1.0, 2.0, 3.0];
        let var = var_with(&[10.0, 10.0, 10.0, 100.0]);
        let out_coord = [1.5];
        let mut params = RegridParams::default();
        params.width = Some(4.0);
        params.std_bad_max = Some(5.0);
        let out = BinAverageDriver.regrid(&ctx(&in_coord, &out_coord, &var, &params)).unwrap();
        assert_eq!(out.qc, vec![BIT_BAD_STD]);
    }

    #[test]
    fn bin_average_empty_window_sets_zero_weight() {
        let in_coord = [0.0, 1.0];
        let var = var_with(&[10.0, 20.0]);
        let out_coord = [100.0];
        let mut params = RegridParams::default();
        params.width = Some(1.0);
        let out = BinAverageDriver.regrid(&ctx(&in_coord, &out_coord, &var, &params)).unwrap();
        assert_eq!(out.qc, vec![BIT_ZERO_WEIGHT]);
    }
}
