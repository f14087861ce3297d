//! Limit checks (spec §4.6 `qc_limit_checks`).

use ingest_model::Variable;
use tracing::warn;

use crate::bits::{BitDescription, find_bit_by_phrase, missing_value_phrase, threshold_phrase};
use crate::error::Result;
use crate::values::{decode_samples, missing_values};

/// Default flags used when no matching bit description is found for the
/// `missing_value`/`valid_min`/`valid_max` tests (mirrors the original
/// engine's `dsproc_qc_limit_checks(var, qc_var, 0x1, 0x2, 0x4)` call).
#[derive(Debug, Clone, Copy)]
pub struct LimitCheckConfig {
    pub default_missing_flag: u32,
    pub default_min_flag: u32,
    pub default_max_flag: u32,
}

impl Default for LimitCheckConfig {
    fn default() -> Self {
        Self {
            default_missing_flag: 0x1,
            default_min_flag: 0x2,
            default_max_flag: 0x4,
        }
    }
}

/// Extra threshold tests beyond `valid_min`/`valid_max`, read from
/// `{test}_min`/`{test}_max` attributes on `var` (checked first) or
/// `qc_var` (fallback). Unlike the `valid` test these have no default
/// flag: if no bit description matches, the check is skipped with a
/// warning (§4.6).
const EXTRA_TESTS: &[&str] = &["warn", "fail"];

fn attr_f64(var: &Variable, qc_var: &Variable, name: &str) -> Option<f64> {
    var.get_attribute(name)
        .and_then(|a| a.value.as_f64())
        .or_else(|| qc_var.get_attribute(name).and_then(|a| a.value.as_f64()))
}

/// Flags every sample of `var` for missing-value / out-of-range
/// violations, returning one OR-reduced flag word per sample.
pub fn qc_limit_checks(
    var: &Variable,
    qc_var: &Variable,
    descriptions: &[BitDescription],
    config: &LimitCheckConfig,
) -> Result<Vec<u32>> {
    let samples = decode_samples(var)?;
    let mut flags = vec![0u32; samples.len()];

    let missing = missing_values(var);
    let missing_flag = find_bit_by_phrase(descriptions, missing_value_phrase())
        .map(BitDescription::mask)
        .unwrap_or_else(|| {
            if !missing.is_empty() {
                warn!(variable = %var.name, "could not find missing_value bit description; using default flag");
            }
            config.default_missing_flag
        });

    let valid_min = var.get_attribute("valid_min").and_then(|a| a.value.as_f64());
    let valid_max = var.get_attribute("valid_max").and_then(|a| a.value.as_f64());
    let min_flag = find_bit_by_phrase(descriptions, &threshold_phrase("valid", '<'))
        .map(BitDescription::mask)
        .unwrap_or_else(|| {
            if valid_min.is_some() {
                warn!(variable = %var.name, "could not find valid_min bit description; using default flag");
            }
            config.default_min_flag
        });
    let max_flag = find_bit_by_phrase(descriptions, &threshold_phrase("valid", '>'))
        .map(BitDescription::mask)
        .unwrap_or_else(|| {
            if valid_max.is_some() {
                warn!(variable = %var.name, "could not find valid_max bit description; using default flag");
            }
            config.default_max_flag
        });

    for (sample, flag) in samples.iter().zip(flags.iter_mut()) {
        for &value in sample {
            if !missing.is_empty() && missing.iter().any(|m| *m == value) {
                *flag |= missing_flag;
            }
            if let Some(min) = valid_min {
                if value < min {
                    *flag |= min_flag;
                }
            }
            if let Some(max) = valid_max {
                if value > max {
                    *flag |= max_flag;
                }
            }
        }
    }

    for test in EXTRA_TESTS {
        let min_attr = format!("{test}_min");
        let max_attr = format!("{test}_max");

        if let Some(min) = attr_f64(var, qc_var, &min_attr) {
            match find_bit_by_phrase(descriptions, &threshold_phrase(test, '<')) {
                Some(bit) => {
                    let mask = bit.mask();
                    for (sample, flag) in samples.iter().zip(flags.iter_mut()) {
                        if sample.iter().any(|&v| v < min) {
                            *flag |= mask;
                        }
                    }
                }
                None => warn!(variable = %var.name, attribute = %min_attr, "could not find bit description; skipping check"),
            }
        }

        if let Some(max) = attr_f64(var, qc_var, &max_attr) {
            match find_bit_by_phrase(descriptions, &threshold_phrase(test, '>')) {
                Some(bit) => {
                    let mask = bit.mask();
                    for (sample, flag) in samples.iter().zip(flags.iter_mut()) {
                        if sample.iter().any(|&v| v > max) {
                            *flag |= mask;
                        }
                    }
                }
                None => warn!(variable = %var.name, attribute = %max_attr, "could not find bit description; skipping check"),
            }
        }
    }

    Ok(flags)
}
