//! Delta checks (spec §4.6 `qc_delta_checks`): flags sample `i` when
//! `|x_i - x_{i-1}| > valid_delta`.

use ingest_model::Variable;
use tracing::warn;

use crate::bits::{BitDescription, find_bit_by_phrase};
use crate::error::Result;
use crate::values::decode_samples;

/// Canonical phrase for the delta-check bit.
#[must_use]
pub fn valid_delta_phrase() -> &'static str {
    "exceeds valid_delta"
}

/// `previous_last_sample` is the prior file's last sample, used as
/// `x_{-1}` when the QC variable carries a `prior_sample_flag`
/// attribute (§4.6); pass `None` otherwise.
pub fn qc_delta_checks(
    var: &Variable,
    descriptions: &[BitDescription],
    previous_last_sample: Option<&[f64]>,
    default_flag: u32,
) -> Result<Vec<u32>> {
    let Some(valid_delta) = var.get_attribute("valid_delta").and_then(|a| a.value.as_f64()) else {
        return Ok(vec![0u32; var.sample_count()]);
    };

    let bit = find_bit_by_phrase(descriptions, valid_delta_phrase())
        .map(BitDescription::mask)
        .unwrap_or_else(|| {
            warn!(variable = %var.name, "could not find valid_delta bit description; using default flag");
            default_flag
        });

    let samples = decode_samples(var)?;
    let mut flags = vec![0u32; samples.len()];
    let mut previous: Option<Vec<f64>> = previous_last_sample.map(<[f64]>::to_vec);

    for (i, sample) in samples.iter().enumerate() {
        if let Some(prev) = &previous {
            let exceeded = sample.iter().zip(prev.iter()).any(|(a, b)| (a - b).abs() > valid_delta);
            if exceeded {
                flags[i] |= bit;
            }
        }
        previous = Some(sample.clone());
    }

    Ok(flags)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ingest_model::{Attribute, DataType, encode_scalar_f64};

    fn var_with(values: &[f64], valid_delta: f64) -> Variable {
        let mut v = Variable::new("temp", DataType::Float, vec!["time".into()]);
        v.define_attribute(Attribute::float("valid_delta", valid_delta)).unwrap();
        for &value in values {
            v.push_sample(encode_scalar_f64(DataType::Float, value));
        }
        v
    }

    #[test]
    fn flags_samples_exceeding_valid_delta() {
        let var = var_with(&[1.0, 1.5, 10.0, 10.2], 2.0);
        let flags = qc_delta_checks(&var, &[], None, 0x8).unwrap();
        assert_eq!(flags, vec![0, 0, 0x8, 0]);
    }

    #[test]
    fn uses_previous_sample_as_seed_when_supplied() {
        let var = var_with(&[100.0], 2.0);
        let flags = qc_delta_checks(&var, &[], Some(&[1.0]), 0x8).unwrap();
        assert_eq!(flags, vec![0x8]);
    }

    #[test]
    fn no_valid_delta_attribute_means_no_flags() {
        let mut v = Variable::new("temp", DataType::Float, vec!["time".into()]);
        v.push_sample(encode_scalar_f64(DataType::Float, 1.0));
        v.push_sample(encode_scalar_f64(DataType::Float, 100.0));
        let flags = qc_delta_checks(&v, &[], None, 0x8).unwrap();
        assert_eq!(flags, vec![0, 0]);
    }
}
