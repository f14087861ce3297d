//! Output file split-interval policies (spec §4.2 "Split interval").

use crate::error::{ModelError, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SplitMode {
    OnStore,
    OnHours,
    OnDays,
    OnMonths,
    None,
}

/// A resolved split policy for one datastream class/level: when to
/// start a new output file, how many `interval` units apart, and
/// whether the file boundary is computed in UTC or local time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitPolicy {
    pub mode: SplitMode,
    pub interval: u32,
    pub phase: u32,
    pub use_local_time: bool,
    /// Hours subtracted from UTC when computing split boundaries, only
    /// meaningful when `use_local_time` is set.
    pub tz_offset_hours: f64,
}

impl SplitPolicy {
    #[must_use]
    pub fn never() -> Self {
        Self {
            mode: SplitMode::None,
            interval: 0,
            phase: 0,
            use_local_time: false,
            tz_offset_hours: 0.0,
        }
    }

    #[must_use]
    pub fn on_store() -> Self {
        Self {
            mode: SplitMode::OnStore,
            interval: 0,
            phase: 0,
            use_local_time: false,
            tz_offset_hours: 0.0,
        }
    }
}

/// One parsed clause of an output-interval spec, optionally scoped to a
/// specific `class.level`.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputIntervalSpec {
    pub class_level: Option<(String, String)>,
    pub policy: SplitPolicy,
}

/// Parses the `[class.level-]{hourly|daily|monthly|yearly|always|never}[-utc|local][,...]`
/// grammar into one [`OutputIntervalSpec`] per comma-separated clause.
///
/// `always` maps to [`SplitMode::OnStore`] (split every time the dataset
/// is stored); `never` maps to [`SplitMode::None`].
pub fn parse_output_interval_spec(spec: &str) -> Result<Vec<OutputIntervalSpec>> {
    spec.split(',')
        .map(str::trim)
        .filter(|clause| !clause.is_empty())
        .map(parse_clause)
        .collect()
}

fn parse_clause(clause: &str) -> Result<OutputIntervalSpec> {
    let mut rest = clause;
    let mut class_level = None;

    if let Some(dash) = rest.find('-') {
        let candidate = &rest[..dash];
        if let Some(dot) = candidate.find('.') {
            let class_name = candidate[..dot].to_string();
            let level = candidate[dot + 1..].to_string();
            if !class_name.is_empty() && !level.is_empty() {
                class_level = Some((class_name, level));
                rest = &rest[dash + 1..];
            }
        }
    }

    let mut use_local_time = false;
    if let Some(stripped) = rest.strip_suffix("-utc") {
        rest = stripped;
    } else if let Some(stripped) = rest.strip_suffix("-local") {
        use_local_time = true;
        rest = stripped;
    }

    let policy = match rest {
        "always" => SplitPolicy {
            mode: SplitMode::OnStore,
            interval: 0,
            phase: 0,
            use_local_time,
            tz_offset_hours: 0.0,
        },
        "never" => SplitPolicy {
            mode: SplitMode::None,
            interval: 0,
            phase: 0,
            use_local_time,
            tz_offset_hours: 0.0,
        },
        "hourly" => SplitPolicy {
            mode: SplitMode::OnHours,
            interval: 1,
            phase: 0,
            use_local_time,
            tz_offset_hours: 0.0,
        },
        "daily" => SplitPolicy {
            mode: SplitMode::OnDays,
            interval: 1,
            phase: 0,
            use_local_time,
            tz_offset_hours: 0.0,
        },
        "monthly" => SplitPolicy {
            mode: SplitMode::OnMonths,
            interval: 1,
            phase: 0,
            use_local_time,
            tz_offset_hours: 0.0,
        },
        "yearly" => SplitPolicy {
            mode: SplitMode::OnMonths,
            interval: 12,
            phase: 0,
            use_local_time,
            tz_offset_hours: 0.0,
        },
        other => return Err(ModelError::BadOutputIntervalSpec(other.to_string())),
    };

    Ok(OutputIntervalSpec {
        class_level,
        policy,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bare_keyword() {
        let specs = parse_output_interval_spec("daily").unwrap();
        assert_eq!(specs.len(), 1);
        assert_eq!(specs[0].policy.mode, SplitMode::OnDays);
        assert!(specs[0].class_level.is_none());
    }

    #[test]
    fn parses_scoped_clause_with_timezone_suffix() {
        let specs = parse_output_interval_spec("met.b1-monthly-local").unwrap();
        assert_eq!(
            specs[0].class_level,
            Some(("met".to_string(), "b1".to_string()))
        );
        assert_eq!(specs[0].policy.mode, SplitMode::OnMonths);
        assert!(specs[0].policy.use_local_time);
    }

    #[test]
    fn parses_multiple_comma_separated_clauses() {
        let specs = parse_output_interval_spec("met.b1-daily,qc.a1-never").unwrap();
        assert_eq!(specs.len(), 2);
        assert_eq!(specs[1].policy.mode, SplitMode::None);
    }

    #[test]
    fn rejects_unknown_keyword() {
        assert!(parse_output_interval_spec("weekly").is_err());
    }

    #[test]
    fn yearly_is_twelve_months() {
        let specs = parse_output_interval_spec("yearly").unwrap();
        assert_eq!(specs[0].policy.mode, SplitMode::OnMonths);
        assert_eq!(specs[0].policy.interval, 12);
    }
}
