//! `FILTER_NANS` datastream flag: replaces NaN/Inf samples with the
//! variable's missing value before storage (§4.7 step 4).

use ingest_model::{Group, encode_scalar_f64};
use ingest_qc::values::{decode_samples, missing_values};

use crate::error::{Result, StorageError};

/// Replaces every NaN/Inf element of every numeric, sample-axis variable
/// in `group` with that variable's first `missing_value`/`_FillValue`.
/// Fails with [`StorageError::NoMissingValueDefined`] if a variable
/// contains NaN/Inf but defines neither attribute.
///
/// Returns `true` if the dataset's very first sample of its time
/// variable was filtered, the signal step 10 (base-time midnight
/// adjustment) needs.
pub fn filter_nans(group: &mut Group) -> Result<bool> {
    let mut first_time_sample_filtered = false;

    for name in group.variable_names() {
        let var = group.get_variable(&name)?;
        if var.sample_axis().is_none() || !var.dtype.is_numeric() {
            continue;
        }
        let decoded = decode_samples(var)?;
        let has_nan = decoded.iter().any(|sample| sample.iter().any(|v| !v.is_finite()));
        if !has_nan {
            continue;
        }

        let sentinels = missing_values(var);
        let replacement = *sentinels.first().ok_or_else(|| StorageError::NoMissingValueDefined {
            variable: name.clone(),
        })?;

        let dtype = var.dtype;
        let var = group.get_variable_mut(&name)?;
        for (index, sample) in decoded.iter().enumerate() {
            if !sample.iter().any(|v| !v.is_finite()) {
                continue;
            }
            if index == 0 && name == "time" {
                first_time_sample_filtered = true;
            }
            let mut bytes = Vec::with_capacity(sample.len() * dtype.size());
            for &value in sample {
                let value = if value.is_finite() { value } else { replacement };
                bytes.extend(encode_scalar_f64(dtype, value));
            }
            var.set_sample(index, bytes)?;
        }
    }

    Ok(first_time_sample_filtered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ingest_model::{Attribute, DataType, Variable};

    fn group_with_nan(value: f64) -> Group {
        let mut g = Group::new("ds");
        g.define_dimension("time", 0, true).unwrap();
        let mut t = Variable::new("time", DataType::Double, vec!["time".into()]);
        t.push_sample(encode_scalar_f64(DataType::Double, 0.0));
        t.push_sample(encode_scalar_f64(DataType::Double, 60.0));
        g.define_variable(t).unwrap();

        let mut v = Variable::new("temp", DataType::Float, vec!["time".into()]);
        v.define_attribute(Attribute::float("missing_value", -999.0)).unwrap();
        v.push_sample(encode_scalar_f64(DataType::Float, 1.0));
        v.push_sample(encode_scalar_f64(DataType::Float, value));
        g.define_variable(v).unwrap();
        g
    }

    #[test]
    fn replaces_nan_with_missing_value() {
        let mut g = group_with_nan(f64::NAN);
        filter_nans(&mut g).unwrap();
        let values = g.get_variable("temp").unwrap().scalar_samples_as_f64().unwrap();
        assert_eq!(values, vec![1.0, -999.0]);
    }

    #[test]
    fn replaces_infinity_with_missing_value() {
        let mut g = group_with_nan(f64::INFINITY);
        filter_nans(&mut g).unwrap();
        let values = g.get_variable("temp").unwrap().scalar_samples_as_f64().unwrap();
        assert_eq!(values, vec![1.0, -999.0]);
    }

    #[test]
    fn no_missing_value_attribute_is_an_error() {
        let mut g = Group::new("ds");
        g.define_dimension("time", 0, true).unwrap();
        let mut v = Variable::new("temp", DataType::Float, vec!["time".into()]);
        v.push_sample(encode_scalar_f64(DataType::Float, f64::NAN));
        g.define_variable(v).unwrap();

        let err = filter_nans(&mut g).unwrap_err();
        assert!(matches!(err, StorageError::NoMissingValueDefined { .. }));
    }

    #[test]
    fn finite_data_is_left_untouched() {
        let mut g = group_with_nan(2.0);
        let filtered_first = filter_nans(&mut g).unwrap();
        assert!(!filtered_first);
        let values = g.get_variable("temp").unwrap().scalar_samples_as_f64().unwrap();
        assert_eq!(values, vec![1.0, 2.0]);
    }
}
