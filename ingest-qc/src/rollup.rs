//! Transformation-QC rollup (spec §4.5 last paragraph): consolidates the
//! canonical 13-bit transformation-QC scheme into a `bad`/`indeterminate`
//! pair, for datastreams carrying `ROLLUP_TRANS_QC`.

use ingest_model::Variable;

use crate::bits::{Assessment, BitDescription, bit_descriptions, find_bit_by_phrase};
use crate::error::Result;

/// Default canonical phrase identifying the "bad" bit of a
/// transformation-QC variable.
pub const BAD_PHRASE: &str = "transformation could not finish";
/// Default canonical phrase identifying the "indeterminate" bit.
pub const INDETERMINATE_PHRASE: &str = "transformation resulted in an indeterminate outcome";

pub const ROLLUP_BAD_FLAG: u32 = 0b01;
pub const ROLLUP_IND_FLAG: u32 = 0b10;

/// True if `qc_var` is a transformation-QC variable: one whose bit
/// descriptions include the canonical "bad" phrase.
#[must_use]
pub fn is_transformation_qc(qc_var: &Variable) -> bool {
    let descriptions = bit_descriptions(qc_var, None);
    find_bit_by_phrase(&descriptions, BAD_PHRASE).is_some()
}

#[derive(Debug, Clone)]
pub struct RollupResult {
    /// One consolidated flag word per sample; only bits
    /// [`ROLLUP_BAD_FLAG`]/[`ROLLUP_IND_FLAG`] are ever set.
    pub bits: Vec<u32>,
    pub bad_flag: u32,
    pub ind_flag: u32,
}

fn bad_mask(descriptions: &[BitDescription]) -> u32 {
    find_bit_by_phrase(descriptions, BAD_PHRASE)
        .map(BitDescription::mask)
        .unwrap_or_else(|| descriptions.iter().find(|d| d.assessment == Assessment::Bad).map_or(0, BitDescription::mask))
}

/// Consolidates a transformation-QC variable into a new QC variable
/// whose bits are exactly `bad` and `indeterminate`: the `bad` bit is an
/// OR-reduction of the input's descriptor-matched bad mask, and the
/// `indeterminate` bit is an OR-reduction of every other nonzero bit.
pub fn rollup_transformation_qc(qc_var: &Variable) -> Result<RollupResult> {
    let descriptions = bit_descriptions(qc_var, None);
    let bad_mask = bad_mask(&descriptions);

    let samples = qc_var.scalar_samples_as_f64()?;
    let bits = samples
        .into_iter()
        .map(|value| {
            let raw = value as i64 as u32;
            let mut out = 0u32;
            if raw & bad_mask != 0 {
                out |= ROLLUP_BAD_FLAG;
            }
            if raw & !bad_mask != 0 {
                out |= ROLLUP_IND_FLAG;
            }
            out
        })
        .collect();

    Ok(RollupResult {
        bits,
        bad_flag: ROLLUP_BAD_FLAG,
        ind_flag: ROLLUP_IND_FLAG,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ingest_model::{Attribute, DataType, encode_scalar_f64};

    fn canonical_qc_var(values: &[i64]) -> Variable {
        let mut v = Variable::new("qc_temp", DataType::Int, vec!["time".into()]);
        v.define_attribute(Attribute::string("bit_1_description", "Transformation could not finish"))
            .unwrap();
        v.define_attribute(Attribute::string("bit_1_assessment", "Bad")).unwrap();
        v.define_attribute(Attribute::string("bit_2_description", "Transformation resulted in an indeterminate outcome"))
            .unwrap();
        v.define_attribute(Attribute::string("bit_2_assessment", "Indeterminate"))
            .unwrap();
        v.define_attribute(Attribute::string("bit_4_description", "Extrapolated value"))
            .unwrap();
        v.define_attribute(Attribute::string("bit_4_assessment", "Indeterminate"))
            .unwrap();
        for &value in values {
            v.push_sample(encode_scalar_f64(DataType::Int, value as f64));
        }
        v
    }

    #[test]
    fn recognizes_a_canonical_transformation_qc_variable() {
        let v = canonical_qc_var(&[]);
        assert!(is_transformation_qc(&v));
        let plain = Variable::new("qc_other", DataType::Int, vec!["time".into()]);
        assert!(!is_transformation_qc(&plain));
    }

    #[test]
    fn rolls_up_bad_bit_and_other_bits_separately() {
        let v = canonical_qc_var(&[0b0001, 0b1000, 0b0000]);
        let result = rollup_transformation_qc(&v).unwrap();
        assert_eq!(result.bits[0], ROLLUP_BAD_FLAG);
        assert_eq!(result.bits[1], ROLLUP_IND_FLAG);
        assert_eq!(result.bits[2], 0);
    }

    #[test]
    fn combined_bad_and_other_bits_set_both_flags() {
        let v = canonical_qc_var(&[0b1001]);
        let result = rollup_transformation_qc(&v).unwrap();
        assert_eq!(result.bits[0], ROLLUP_BAD_FLAG | ROLLUP_IND_FLAG);
    }
}
