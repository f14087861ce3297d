//! Scalar decoding helpers shared by the QC checks and outlier filters.

use ingest_model::{Variable, decode_scalar_f64};

use crate::error::Result;

/// Decodes every sample of `var` into its per-element `f64` values
/// (row-major, per spec §3 "sample size"). Unlike
/// [`Variable::scalar_sample_as_f64`], this handles variables whose
/// samples hold more than one element.
pub fn decode_samples(var: &Variable) -> Result<Vec<Vec<f64>>> {
    let size = var.dtype.size();
    var.samples()
        .iter()
        .map(|bytes| {
            bytes
                .chunks(size)
                .map(|chunk| decode_scalar_f64(var.dtype, chunk).map_err(Into::into))
                .collect()
        })
        .collect()
}

/// The missing-value sentinel(s) for `var`: its `missing_value`
/// attribute if present, else `_FillValue`.
pub fn missing_values(var: &Variable) -> Vec<f64> {
    for name in ["missing_value", "_FillValue"] {
        let Some(attr) = var.get_attribute(name) else {
            continue;
        };
        if let Some(values) = attr.value.as_doubles() {
            return values.to_vec();
        }
        if let Some(value) = attr.value.as_f64() {
            return vec![value];
        }
    }
    Vec::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ingest_model::{Attribute, DataType, encode_scalar_f64};

    #[test]
    fn decodes_multi_element_samples_row_major() {
        let mut v = Variable::new("spectra", DataType::Float, vec!["time".into(), "freq".into()]);
        let mut bytes = encode_scalar_f64(DataType::Float, 1.0);
        bytes.extend(encode_scalar_f64(DataType::Float, 2.0));
        v.push_sample(bytes);
        let decoded = decode_samples(&v).unwrap();
        assert_eq!(decoded, vec![vec![1.0, 2.0]]);
    }

    #[test]
    fn missing_values_prefers_missing_value_over_fill_value() {
        let mut v = Variable::new("temp", DataType::Float, vec!["time".into()]);
        v.define_attribute(Attribute::float("missing_value", -999.0)).unwrap();
        v.define_attribute(Attribute::float("_FillValue", -9999.0)).unwrap();
        assert_eq!(missing_values(&v), vec![-999.0]);
    }
}
