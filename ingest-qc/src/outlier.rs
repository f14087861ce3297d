//! Windowed outlier utilities (spec §4.8).

use ingest_model::Variable;
use tracing::info;

use crate::error::{QcError, Result};
use crate::stats::median_mad::{median, median_mad};
use crate::values::missing_values;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutlierCenter {
    Mean,
    Median,
}

#[derive(Debug, Clone, Copy)]
pub enum OutlierMethod {
    Std,
    Iqd,
    Mad { center: OutlierCenter },
    MeanDev,
}

/// Scale factor making the interquartile deviation comparable to a
/// standard deviation for normal data (`1 / 1.349`).
pub const IQD_SCALE_FACTOR: f64 = 1.0 / 1.349;
pub use crate::stats::median_mad::MAD_SCALE_FACTOR as MAD_OUTLIER_SCALE_FACTOR;

#[derive(Debug, Clone)]
pub struct OutlierConfig {
    pub method: OutlierMethod,
    /// Window width in seconds; the window is `[t - width/2, t +
    /// width/2]`.
    pub window_width_secs: f64,
    pub min_npoints: usize,
    pub skipped_flag: u32,
    pub bad_flag: u32,
    pub ind_flag: u32,
    pub bad_threshold: f64,
    pub ind_threshold: f64,
    /// Emits a deviation histogram via `tracing::info!` for operator
    /// tuning (§4.8 `analyze`).
    pub analyze: bool,
}

#[derive(Debug, Clone)]
pub struct OutlierReport {
    pub flags: Vec<u32>,
    pub skipped: usize,
    pub bad: usize,
    pub indeterminate: usize,
}

fn quartiles(sorted: &[f64]) -> (f64, f64) {
    let at = |p: f64| -> f64 {
        let n = sorted.len();
        if n == 1 {
            return sorted[0];
        }
        let pos = p * (n as f64 - 1.0);
        let lo = pos.floor() as usize;
        let hi = pos.ceil() as usize;
        if lo == hi {
            sorted[lo]
        } else {
            let frac = pos - lo as f64;
            sorted[lo] * (1.0 - frac) + sorted[hi] * frac
        }
    };
    (at(0.25), at(0.75))
}

fn window_center_and_scale(window: &[f64], method: OutlierMethod) -> Result<(f64, f64)> {
    match method {
        OutlierMethod::Std => {
            let mean = window.iter().sum::<f64>() / window.len() as f64;
            let variance = window.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / window.len() as f64;
            Ok((mean, variance.sqrt()))
        }
        OutlierMethod::Iqd => {
            let mut sorted = window.to_vec();
            sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
            let med = median(&sorted)?;
            let (q1, q3) = quartiles(&sorted);
            Ok((med, (q3 - q1) * IQD_SCALE_FACTOR))
        }
        OutlierMethod::Mad {
            center: OutlierCenter::Median,
        } => {
            let (med, mad) = median_mad(window)?;
            Ok((med, mad))
        }
        OutlierMethod::Mad { center: OutlierCenter::Mean } => {
            let mean = window.iter().sum::<f64>() / window.len() as f64;
            let mad = window.iter().map(|v| (v - mean).abs()).sum::<f64>() / window.len() as f64;
            Ok((mean, mad))
        }
        OutlierMethod::MeanDev => {
            let mean = window.iter().sum::<f64>() / window.len() as f64;
            Ok((mean, 1.0))
        }
    }
}

/// Scans `var` (one value per `times` entry) with a sliding `[t-W/2,
/// t+W/2]` window and flags points deviating from the window's central
/// tendency, per `config.method` (§4.8). `qc`/`bad_mask`, if given,
/// exclude already-bad points from each window.
pub fn flag_outliers(var: &Variable, times: &[f64], qc: Option<&[u32]>, bad_mask: u32, config: &OutlierConfig) -> Result<OutlierReport> {
    if config.min_npoints < 2 {
        return Err(QcError::InvalidConfig("min_npoints must be >= 2".into()));
    }

    let values = var.scalar_samples_as_f64()?;
    if values.len() != times.len() {
        return Err(QcError::DimensionMismatch {
            variable: var.name.clone(),
            var_size: values.len(),
            qc_size: times.len(),
        });
    }

    let missing = missing_values(var);
    let half_window = config.window_width_secs / 2.0;

    let mut flags = vec![0u32; values.len()];
    let mut skipped = 0usize;
    let mut bad = 0usize;
    let mut indeterminate = 0usize;
    let mut deviations: Vec<f64> = Vec::new();

    for i in 0..values.len() {
        let t = times[i];
        let window: Vec<f64> = (0..values.len())
            .filter(|&j| {
                let within_window = (times[j] - t).abs() <= half_window;
                let not_bad = qc.is_none_or(|q| q[j] & bad_mask == 0);
                let not_missing = !missing.iter().any(|m| *m == values[j]);
                within_window && not_bad && not_missing
            })
            .map(|j| values[j])
            .collect();

        if window.len() < config.min_npoints {
            flags[i] |= config.skipped_flag;
            skipped += 1;
            continue;
        }

        let (center, scale) = window_center_and_scale(&window, config.method)?;
        let deviation = (values[i] - center).abs();
        if config.analyze {
            deviations.push(deviation);
        }

        let units = match config.method {
            OutlierMethod::MeanDev => deviation,
            _ if scale > 0.0 => deviation / scale,
            _ => 0.0,
        };

        if units > config.bad_threshold {
            flags[i] |= config.bad_flag;
            bad += 1;
        } else if units > config.ind_threshold {
            flags[i] |= config.ind_flag;
            indeterminate += 1;
        }
    }

    if config.analyze {
        log_histogram(&var.name, &deviations);
    }

    Ok(OutlierReport {
        flags,
        skipped,
        bad,
        indeterminate,
    })
}

fn log_histogram(variable: &str, deviations: &[f64]) {
    if deviations.is_empty() {
        return;
    }
    let max = deviations.iter().copied().fold(0.0_f64, f64::max);
    if max <= 0.0 {
        return;
    }
    const BUCKETS: usize = 10;
    let mut counts = vec![0usize; BUCKETS];
    for &d in deviations {
        let idx = ((d / max) * (BUCKETS as f64 - 1.0)) as usize;
        counts[idx.min(BUCKETS - 1)] += 1;
    }
    for (i, count) in counts.iter().enumerate() {
        let lo = max * i as f64 / BUCKETS as f64;
        let hi = max * (i + 1) as f64 / BUCKETS as f64;
        info!(variable, bucket_lo = lo, bucket_hi = hi, count, "outlier deviation histogram bucket");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ingest_model::{DataType, encode_scalar_f64};

    fn var_with(values: &[f64]) -> Variable {
        let mut v = Variable::new("temp", DataType::Float, vec!["time".into()]);
        for &value in values {
            v.push_sample(encode_scalar_f64(DataType::Float, value));
        }
        v
    }

    fn config(method: OutlierMethod) -> OutlierConfig {
        OutlierConfig {
            method,
            window_width_secs: 600.0,
            min_npoints: 3,
            skipped_flag: 0x1,
            bad_flag: 0x2,
            ind_flag: 0x4,
            bad_threshold: 3.0,
            ind_threshold: 2.0,
            analyze: false,
        }
    }

    #[test]
    fn std_method_flags_a_spike() {
        let values = vec![10.0, 10.0, 10.0, 10.0, 100.0, 10.0, 10.0];
        let times: Vec<f64> = (0..values.len()).map(|i| (i as f64) * 60.0).collect();
        let var = var_with(&values);
        let report = flag_outliers(&var, &times, None, 0, &config(OutlierMethod::Std)).unwrap();
        assert!(report.flags[4] & 0x2 != 0);
    }

    #[test]
    fn too_few_points_in_window_are_skipped() {
        let values = vec![1.0, 2.0];
        let times = vec![0.0, 1_000_000.0];
        let var = var_with(&values);
        let report = flag_outliers(&var, &times, None, 0, &config(OutlierMethod::Std)).unwrap();
        assert_eq!(report.skipped, 2);
        assert!(report.flags.iter().all(|f| f & 0x1 != 0));
    }

    #[test]
    fn mad_median_method_is_robust_to_the_outlier_itself() {
        let values = vec![10.0, 10.0, 10.0, 10.0, 1000.0, 10.0, 10.0];
        let times: Vec<f64> = (0..values.len()).map(|i| (i as f64) * 60.0).collect();
        let var = var_with(&values);
        let report = flag_outliers(
            &var,
            &times,
            None,
            0,
            &config(OutlierMethod::Mad {
                center: OutlierCenter::Median,
            }),
        )
        .unwrap();
        assert!(report.bad >= 1);
    }

    #[test]
    fn rejects_min_npoints_below_two() {
        let var = var_with(&[1.0]);
        let mut cfg = config(OutlierMethod::Std);
        cfg.min_npoints = 1;
        assert!(flag_outliers(&var, &[0.0], None, 0, &cfg).is_err());
    }
}
