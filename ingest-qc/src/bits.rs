//! Bit-description / assessment attribute lookup (spec §4.6).
//!
//! A QC variable's bits are self-describing: bit `n`'s meaning and
//! severity live in its `bit_n_description`/`bit_n_assessment`
//! attributes. When a QC variable carries none of its own (e.g. it was
//! just created and not yet stamped), the same pairs are looked up as
//! `qc_bit_n_description`/`qc_bit_n_assessment` on a fallback group,
//! standing in for the process-global `qc_`-prefixed attributes the
//! original engine keeps on its process context.

use ingest_model::{Group, Variable};

/// Bits are stored as a 32-bit integer QC flag; bit numbers are 1-based.
pub const MAX_BITS: u32 = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Assessment {
    Bad,
    Indeterminate,
}

impl Assessment {
    fn parse(text: &str) -> Option<Self> {
        match text.trim().to_ascii_lowercase().as_str() {
            "bad" => Some(Self::Bad),
            "indeterminate" => Some(Self::Indeterminate),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BitDescription {
    pub bit: u32,
    pub description: String,
    pub assessment: Assessment,
}

impl BitDescription {
    /// The bit's mask value (`1 << (bit - 1)`).
    #[must_use]
    pub fn mask(&self) -> u32 {
        1 << (self.bit - 1)
    }
}

fn scan(desc_of: impl Fn(u32) -> Option<String>, assess_of: impl Fn(u32) -> Option<String>) -> Vec<BitDescription> {
    (1..=MAX_BITS)
        .filter_map(|bit| {
            let description = desc_of(bit)?;
            let assessment = assess_of(bit).as_deref().and_then(Assessment::parse).unwrap_or(Assessment::Bad);
            Some(BitDescription {
                bit,
                description,
                assessment,
            })
        })
        .collect()
}

/// All bit descriptions for `qc_var`, falling back to group-level
/// `qc_bit_n_description`/`qc_bit_n_assessment` attributes on `fallback`
/// when the variable itself has none.
#[must_use]
pub fn bit_descriptions(qc_var: &Variable, fallback: Option<&Group>) -> Vec<BitDescription> {
    let own = scan(
        |n| {
            qc_var
                .get_attribute(&format!("bit_{n}_description"))
                .and_then(|a| a.value.as_text())
                .map(str::to_string)
        },
        |n| {
            qc_var
                .get_attribute(&format!("bit_{n}_assessment"))
                .and_then(|a| a.value.as_text())
                .map(str::to_string)
        },
    );
    if !own.is_empty() {
        return own;
    }
    let Some(group) = fallback else {
        return Vec::new();
    };
    scan(
        |n| {
            group
                .get_attribute(&format!("qc_bit_{n}_description"))
                .and_then(|a| a.value.as_text())
                .map(str::to_string)
        },
        |n| {
            group
                .get_attribute(&format!("qc_bit_{n}_assessment"))
                .and_then(|a| a.value.as_text())
                .map(str::to_string)
        },
    )
}

/// Finds the bit whose description contains `phrase` (case-insensitive
/// substring match, per the canonical-descriptor-matching convention used
/// throughout §4.5/§4.6).
#[must_use]
pub fn find_bit_by_phrase(descriptions: &[BitDescription], phrase: &str) -> Option<&BitDescription> {
    let phrase = phrase.to_ascii_lowercase();
    descriptions.iter().find(|d| d.description.to_ascii_lowercase().contains(&phrase))
}

/// Canonical phrase for a missing-value flag: `"value == missing_value"`.
#[must_use]
pub fn missing_value_phrase() -> &'static str {
    "value == missing_value"
}

/// Canonical phrase for a `{test}_min`/`{test}_max` threshold test, e.g.
/// `"value < valid_min"` or `"value > fail_max"`.
#[must_use]
pub fn threshold_phrase(test: &str, op: char) -> String {
    match op {
        '<' => format!("value < {test}_min"),
        '>' => format!("value > {test}_max"),
        _ => unreachable!("threshold_phrase only supports '<' and '>'"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ingest_model::{Attribute, DataType};

    fn qc_var_with(descs: &[(u32, &str, &str)]) -> Variable {
        let mut v = Variable::new("qc_temp", DataType::Int, vec!["time".into()]);
        for (bit, desc, assess) in descs {
            v.define_attribute(Attribute::string(format!("bit_{bit}_description"), *desc))
                .unwrap();
            v.define_attribute(Attribute::string(format!("bit_{bit}_assessment"), *assess))
                .unwrap();
        }
        v
    }

    #[test]
    fn reads_descriptions_directly_off_the_variable() {
        let v = qc_var_with(&[
            (1, "value == missing_value", "Bad"),
            (2, "value < valid_min", "Bad"),
            (3, "value > valid_max", "Bad"),
        ]);
        let descs = bit_descriptions(&v, None);
        assert_eq!(descs.len(), 3);
        assert_eq!(descs[1].bit, 2);
        assert_eq!(descs[1].mask(), 0b10);
    }

    #[test]
    fn falls_back_to_group_level_attributes_when_variable_has_none() {
        let v = Variable::new("qc_temp", DataType::Int, vec!["time".into()]);
        let mut group = Group::new("ds");
        group
            .define_attribute(Attribute::string("qc_bit_1_description", "value < valid_min"))
            .unwrap();
        group.define_attribute(Attribute::string("qc_bit_1_assessment", "Bad")).unwrap();
        let descs = bit_descriptions(&v, Some(&group));
        assert_eq!(descs.len(), 1);
        assert_eq!(descs[0].bit, 1);
    }

    #[test]
    fn find_bit_by_phrase_is_case_insensitive() {
        let v = qc_var_with(&[(1, "Value < VALID_MIN", "Bad")]);
        let descs = bit_descriptions(&v, None);
        let found = find_bit_by_phrase(&descs, &threshold_phrase("valid", '<'));
        assert!(found.is_some());
    }

    #[test]
    fn unassessed_bit_defaults_to_bad() {
        let mut v = Variable::new("qc_temp", DataType::Int, vec!["time".into()]);
        v.define_attribute(Attribute::string("bit_1_description", "custom test")).unwrap();
        let descs = bit_descriptions(&v, None);
        assert_eq!(descs[0].assessment, Assessment::Bad);
    }
}
