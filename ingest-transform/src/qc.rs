//! The canonical 13-bit transformation-QC scheme (§4.5, GLOSSARY
//! "Transformation-QC (13-bit)"). Every transformed output variable
//! gets a companion QC variable stamped with these bit descriptions, so
//! [`ingest_qc::rollup::rollup_transformation_qc`] can later consolidate
//! it against a `ROLLUP_TRANS_QC` datastream.
//!
//! The glossary does not describe a distinct bit layout for the
//! Caracena method ("or the Caracena QC scheme" in §4.5); Caracena's
//! per-grid-point zero-weight/bad-input/goodfrac outcomes map onto bits
//! 6, 7, 9, 12 and 13 of the same canonical scheme, so we stamp the one
//! scheme uniformly rather than inventing an undocumented second one.

use ingest_model::{Attribute, DataType, Variable};

use crate::error::Result;

pub const BIT_BAD: u32 = 1 << 0;
pub const BIT_SOME_INDETERMINATE_INPUT: u32 = 1 << 1;
pub const BIT_NON_STANDARD_INTERPOLATION: u32 = 1 << 2;
pub const BIT_EXTRAPOLATE: u32 = 1 << 3;
pub const BIT_NOT_USING_CLOSEST: u32 = 1 << 4;
pub const BIT_SOME_BAD_INPUTS: u32 = 1 << 5;
pub const BIT_ZERO_WEIGHT: u32 = 1 << 6;
pub const BIT_OUTSIDE_RANGE: u32 = 1 << 7;
pub const BIT_ALL_BAD_INPUTS: u32 = 1 << 8;
pub const BIT_BAD_STD: u32 = 1 << 9;
pub const BIT_IND_STD: u32 = 1 << 10;
pub const BIT_BAD_GOODFRAC: u32 = 1 << 11;
pub const BIT_IND_GOODFRAC: u32 = 1 << 12;

/// `(bit number, description, assessment)` for the 13 canonical bits, in
/// glossary order.
const CANONICAL_BITS: &[(u32, &str, &str)] = &[
    (1, "Transformation could not finish", "Bad"),
    (2, "Transformation resulted in an indeterminate outcome", "Indeterminate"),
    (3, "Non-standard interpolation was used", "Indeterminate"),
    (4, "Extrapolated value", "Indeterminate"),
    (5, "Nearest point used was not the closest available point", "Indeterminate"),
    (6, "Some input values used were bad", "Indeterminate"),
    (7, "No input values had a non-zero weight", "Bad"),
    (8, "Value fell outside the valid input range", "Bad"),
    (9, "All input values used were bad", "Bad"),
    (10, "Standard deviation of input values exceeded the bad threshold", "Bad"),
    (11, "Standard deviation of input values exceeded the indeterminate threshold", "Indeterminate"),
    (12, "Fraction of good input values fell below the bad threshold", "Bad"),
    (13, "Fraction of good input values fell below the indeterminate threshold", "Indeterminate"),
];

/// Stamps `qc_var` with the canonical 13-bit transformation-QC
/// descriptions and assessments.
pub fn define_transformation_qc_attributes(qc_var: &mut Variable) -> Result<()> {
    for (bit, description, assessment) in CANONICAL_BITS {
        qc_var.define_attribute(Attribute::string(format!("bit_{bit}_description"), *description))?;
        qc_var.define_attribute(Attribute::string(format!("bit_{bit}_assessment"), *assessment))?;
    }
    Ok(())
}

/// Creates a fresh, zero-initialized transformation-QC companion
/// variable for `output_dim`, stamped with the canonical scheme.
pub fn new_transformation_qc_variable(name: impl Into<String>, output_dim: impl Into<String>) -> Result<Variable> {
    let mut qc_var = Variable::new(name, DataType::Int, vec![output_dim.into()]);
    define_transformation_qc_attributes(&mut qc_var)?;
    Ok(qc_var)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ingest_qc::{bit_descriptions, find_bit_by_phrase, is_transformation_qc};

    #[test]
    fn stamped_variable_is_recognized_as_transformation_qc() {
        let mut qc_var = Variable::new("qc_out", DataType::Int, vec!["time".into()]);
        define_transformation_qc_attributes(&mut qc_var).unwrap();
        assert!(is_transformation_qc(&qc_var));
    }

    #[test]
    fn extrapolate_is_bit_four() {
        let mut qc_var = Variable::new("qc_out", DataType::Int, vec!["time".into()]);
        define_transformation_qc_attributes(&mut qc_var).unwrap();
        let descriptions = bit_descriptions(&qc_var, None);
        let found = find_bit_by_phrase(&descriptions, "extrapolated value").unwrap();
        assert_eq!(found.bit, 4);
        assert_eq!(found.mask(), BIT_EXTRAPOLATE);
    }
}
