//! Variable and data-type modeling (spec §3 "Variable").

use crate::attribute::Attribute;
use crate::error::{ModelError, Result};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use strum_macros::Display;

/// The element type a [`Variable`] stores, per spec §3.
#[derive(Display, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub enum DataType {
    Byte,
    Char,
    Short,
    Int,
    Float,
    Double,
}

impl DataType {
    /// Size in bytes of a single element of this type.
    #[must_use]
    pub const fn size(self) -> usize {
        match self {
            Self::Byte | Self::Char => 1,
            Self::Short => 2,
            Self::Int | Self::Float => 4,
            Self::Double => 8,
        }
    }

    #[must_use]
    pub const fn is_numeric(self) -> bool {
        !matches!(self, Self::Char)
    }
}

/// One stored sample's worth of raw values for a variable, kept as bytes
/// so the generic model does not need a type parameter per dtype. Readers
/// are expected to reinterpret via [`DataType::size`] and the variable's
/// own `dtype`.
pub type SampleBytes = Vec<u8>;

/// Encodes a single scalar value as little-endian bytes of the given
/// dtype. `Char` values are truncated to their low byte.
#[must_use]
pub fn encode_scalar_f64(dtype: DataType, value: f64) -> SampleBytes {
    match dtype {
        DataType::Byte => vec![value as i64 as u8],
        DataType::Char => vec![value as i64 as u8],
        DataType::Short => (value as i64 as i16).to_le_bytes().to_vec(),
        DataType::Int => (value as i64 as i32).to_le_bytes().to_vec(),
        DataType::Float => (value as f32).to_le_bytes().to_vec(),
        DataType::Double => value.to_le_bytes().to_vec(),
    }
}

/// Decodes a single scalar value of the given dtype from its
/// little-endian byte representation, widening to `f64`.
pub fn decode_scalar_f64(dtype: DataType, bytes: &[u8]) -> Result<f64> {
    if bytes.len() < dtype.size() {
        return Err(ModelError::TypeMismatch {
            name: "<scalar>".to_string(),
            expected: dtype,
            actual: dtype,
        });
    }
    Ok(match dtype {
        DataType::Byte | DataType::Char => bytes[0] as f64,
        DataType::Short => i16::from_le_bytes(bytes[..2].try_into().unwrap()) as f64,
        DataType::Int => i32::from_le_bytes(bytes[..4].try_into().unwrap()) as f64,
        DataType::Float => f32::from_le_bytes(bytes[..4].try_into().unwrap()) as f64,
        DataType::Double => f64::from_le_bytes(bytes[..8].try_into().unwrap()),
    })
}

/// A named, typed array variable belonging to a [`crate::group::Group`].
///
/// The first entry of `dimensions` is the sample axis (spec §3): the
/// product of the remaining dimensions' lengths is the sample size.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Variable {
    pub name: String,
    pub dtype: DataType,
    /// Names of dimensions, in order; first is the sample axis.
    pub dimensions: Vec<String>,
    /// Row-major sample storage: `samples.len()` is the number of stored
    /// samples, which may be less than the sample dimension's length.
    samples: Vec<SampleBytes>,
    pub attributes: FxHashMap<String, Attribute>,
    attributes_locked: bool,
}

impl Variable {
    #[must_use]
    pub fn new(name: impl Into<String>, dtype: DataType, dimensions: Vec<String>) -> Self {
        Self {
            name: name.into(),
            dtype,
            dimensions,
            samples: Vec::new(),
            attributes: FxHashMap::default(),
            attributes_locked: false,
        }
    }

    #[must_use]
    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    #[must_use]
    pub fn sample_axis(&self) -> Option<&str> {
        self.dimensions.first().map(String::as_str)
    }

    /// Number of scalar values per sample: the product of all dimension
    /// lengths after the first (spec §3 "sample size").
    pub fn sample_size(&self, dim_lengths: &FxHashMap<String, usize>) -> Result<usize> {
        self.dimensions[1..]
            .iter()
            .try_fold(1usize, |acc, dim_name| {
                dim_lengths
                    .get(dim_name)
                    .copied()
                    .map(|len| acc * len)
                    .ok_or_else(|| ModelError::NoSuchName {
                        kind: "dimension",
                        name: dim_name.clone(),
                        group: self.name.clone(),
                    })
            })
    }

    #[must_use]
    pub fn samples(&self) -> &[SampleBytes] {
        &self.samples
    }

    /// Appends a sample's raw bytes, growing the sample count by one.
    /// Callers (the unlimited-dimension auto-grow logic in
    /// [`crate::group::Group::append_sample`]) are responsible for
    /// bumping the backing dimension's length.
    pub fn push_sample(&mut self, bytes: SampleBytes) {
        self.samples.push(bytes);
    }

    pub fn clear_samples(&mut self) {
        self.samples.clear();
    }

    /// Drops the first `n` samples (used by storage-filter steps that
    /// discard samples already present in a previously stored file).
    pub fn drain_front(&mut self, n: usize) {
        self.samples.drain(0..n.min(self.samples.len()));
    }

    pub fn set_sample(&mut self, index: usize, bytes: SampleBytes) -> Result<()> {
        let slot = self
            .samples
            .get_mut(index)
            .ok_or_else(|| ModelError::NoSuchName {
                kind: "sample index",
                name: index.to_string(),
                group: self.name.clone(),
            })?;
        *slot = bytes;
        Ok(())
    }

    pub fn define_attribute(&mut self, attr: Attribute) -> Result<()> {
        if self.attributes_locked {
            return Err(ModelError::GroupLocked(self.name.clone()));
        }
        self.attributes.insert(attr.name.clone(), attr);
        Ok(())
    }

    pub fn get_attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.get(name)
    }

    pub fn lock_attributes(&mut self) {
        self.attributes_locked = true;
    }

    #[must_use]
    pub fn attributes_locked(&self) -> bool {
        self.attributes_locked
    }

    /// Decodes sample `index` as a scalar `f64`, for variables whose
    /// sample size is a single element (e.g. `time`). Errors if the
    /// stored bytes are shorter than `dtype`'s size.
    pub fn scalar_sample_as_f64(&self, index: usize) -> Result<f64> {
        let bytes = self.samples.get(index).ok_or_else(|| ModelError::NoSuchName {
            kind: "sample index",
            name: index.to_string(),
            group: self.name.clone(),
        })?;
        decode_scalar_f64(self.dtype, bytes)
    }

    /// Decodes every stored sample as a scalar `f64` (see
    /// [`Self::scalar_sample_as_f64`]).
    pub fn scalar_samples_as_f64(&self) -> Result<Vec<f64>> {
        (0..self.samples.len())
            .map(|i| self.scalar_sample_as_f64(i))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_count_tracks_pushed_samples() {
        let mut v = Variable::new("temp", DataType::Float, vec!["time".into()]);
        assert_eq!(v.sample_count(), 0);
        v.push_sample(vec![0, 0, 0, 0]);
        v.push_sample(vec![0, 0, 0, 0]);
        assert_eq!(v.sample_count(), 2);
    }

    #[test]
    fn sample_size_multiplies_non_leading_dims() {
        let v = Variable::new(
            "spectra",
            DataType::Float,
            vec!["time".into(), "wavelength".into()],
        );
        let mut lens = FxHashMap::default();
        lens.insert("wavelength".to_string(), 64usize);
        assert_eq!(v.sample_size(&lens).unwrap(), 64);
    }

    #[test]
    fn scalar_round_trips_through_every_dtype() {
        for dtype in [
            DataType::Byte,
            DataType::Short,
            DataType::Int,
            DataType::Float,
            DataType::Double,
        ] {
            let encoded = encode_scalar_f64(dtype, 42.0);
            let decoded = decode_scalar_f64(dtype, &encoded).unwrap();
            assert!((decoded - 42.0).abs() < 1e-6, "{dtype:?} round trip failed");
        }
    }

    #[test]
    fn locked_attributes_reject_redefinition() {
        let mut v = Variable::new("t", DataType::Int, vec!["time".into()]);
        v.lock_attributes();
        let err = v
            .define_attribute(Attribute::string("units", "seconds"))
            .unwrap_err();
        assert!(matches!(err, ModelError::GroupLocked(_)));
    }
}
