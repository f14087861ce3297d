//! Attributes (spec §3 "Attribute"): named, typed, variable-length values
//! attached to a group or a variable.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttributeValue {
    Text(String),
    Int(i64),
    Float(f64),
    Doubles(Vec<f64>),
    Ints(Vec<i64>),
}

impl AttributeValue {
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            Self::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_doubles(&self) -> Option<&[f64]> {
        match self {
            Self::Doubles(v) => Some(v),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    pub name: String,
    pub value: AttributeValue,
}

impl Attribute {
    #[must_use]
    pub fn string(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: AttributeValue::Text(value.into()),
        }
    }

    #[must_use]
    pub fn float(name: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            value: AttributeValue::Float(value),
        }
    }

    #[must_use]
    pub fn int(name: impl Into<String>, value: i64) -> Self {
        Self {
            name: name.into(),
            value: AttributeValue::Int(value),
        }
    }

    #[must_use]
    pub fn doubles(name: impl Into<String>, values: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            value: AttributeValue::Doubles(values),
        }
    }
}
