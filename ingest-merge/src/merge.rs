//! Observation merger (spec §4.3, C3).
//!
//! Retrieved data arrives as one [`Group`] per input file. Within a
//! stream, adjacent observations are folded into a single continuous
//! group; observations whose time ranges overlap are first resolved
//! down to one winner using the 75%-sample-count rule.

use crate::error::{MergeError, Result};
use crate::history::parse_creation_time;
use ingest_model::Group;
use std::cmp::Ordering;

/// Whether the merger is allowed to resolve overlaps by dropping a
/// losing observation, or must treat any overlap as fatal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlapMode {
    Strict,
    FilterInputObs,
}

/// One input observation: a group plus the cached metadata the merger
/// needs without re-scanning the group's time variable on every
/// comparison.
#[derive(Debug, Clone)]
pub struct Observation {
    pub group: Group,
    pub start: f64,
    pub end: f64,
    pub dod_version: String,
    pub creation_time: Option<i64>,
}

impl Observation {
    /// Builds an `Observation` from a group, deriving `start`/`end` from
    /// its time variable's first and last scalar samples and
    /// `creation_time` from its `history` attribute.
    pub fn from_group(group: Group) -> Result<Self> {
        let time_kind = ingest_model::time::find_time_variable(&group)?;
        let (start, end) = match time_kind {
            ingest_model::time::TimeVariableKind::Time(var) => {
                let samples = var.scalar_samples_as_f64()?;
                let first = *samples.first().ok_or_else(|| MergeError::other("empty time variable"))?;
                let last = *samples.last().ok_or_else(|| MergeError::other("empty time variable"))?;
                (first, last)
            }
            ingest_model::time::TimeVariableKind::BaseTimeOffset {
                base_time,
                time_offset,
            } => {
                let base = base_time.scalar_sample_as_f64(0).unwrap_or(0.0);
                let offsets = time_offset.scalar_samples_as_f64()?;
                let first = *offsets.first().ok_or_else(|| MergeError::other("empty time_offset variable"))?;
                let last = *offsets.last().ok_or_else(|| MergeError::other("empty time_offset variable"))?;
                (base + first, base + last)
            }
        };

        let creation_time = group
            .get_attribute("history")
            .and_then(|a| a.value.as_text())
            .and_then(|h| parse_creation_time(Some(h)));

        let dod_version = group
            .get_attribute("dod_version")
            .and_then(|a| a.value.as_text())
            .unwrap_or("unknown")
            .to_string();

        Ok(Self {
            group,
            start,
            end,
            dod_version,
            creation_time,
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct MergeReport {
    pub merged_count: usize,
    pub dropped_count: usize,
    pub warnings: Vec<String>,
}

/// Merges adjacent observations of a single stream in place, mutating
/// `observations` to the resulting (possibly shorter) sequence.
/// `observations` must already be ordered by `start`.
pub fn merge_observations(
    observations: &mut Vec<Observation>,
    mode: OverlapMode,
) -> Result<MergeReport> {
    let mut report = MergeReport::default();
    let mut i = 0;

    while i + 1 < observations.len() {
        let disjoint = observations[i + 1].start > observations[i].end;

        if !disjoint {
            if mode != OverlapMode::FilterInputObs {
                let a = &observations[i];
                let b = &observations[i + 1];
                return Err(MergeError::OverlappingInputData {
                    start_a: a.start,
                    end_a: a.end,
                    dod_a: a.dod_version.clone(),
                    start_b: b.start,
                    end_b: b.end,
                    dod_b: b.dod_version.clone(),
                });
            }

            let loser = resolve_overlap(&observations[i], &observations[i + 1]);
            let removed = observations.remove(i + loser);
            report.dropped_count += 1;
            report.warnings.push(format!(
                "dropped overlapping observation [{}, {}] (dod {})",
                removed.start, removed.end, removed.dod_version
            ));
            continue;
        }

        if observations[i].group.structurally_compatible(&observations[i + 1].group)
            && observations[i].group.static_data_matches(&observations[i + 1].group)
        {
            let next = observations.remove(i + 1);
            append_observation(&mut observations[i], next)?;
            report.merged_count += 1;
            continue;
        }

        report.warnings.push(format!(
            "observations [{}, {}] and [{}, {}] are not structurally mergeable; left separate",
            observations[i].start,
            observations[i].end,
            observations[i + 1].start,
            observations[i + 1].end
        ));
        i += 1;
    }

    Ok(report)
}

/// The 75%-sample-count overlap-resolution rule (§4.3 step 3). Returns
/// `0` if `a` should be kept (and `b` dropped), or `1` for the reverse.
fn resolve_overlap(a: &Observation, b: &Observation) -> usize {
    match (a.creation_time, b.creation_time) {
        (Some(ct_a), Some(ct_b)) => {
            let (newer, older, newer_is_b) = if ct_b >= ct_a {
                (b, a, true)
            } else {
                (a, b, false)
            };
            let newer_samples = sample_count_hint(newer);
            let older_samples = sample_count_hint(older);
            let newer_is_big_enough =
                older_samples == 0 || (newer_samples as f64) >= 0.75 * older_samples as f64;
            if newer_is_big_enough {
                usize::from(newer_is_b)
            } else {
                usize::from(!newer_is_b)
            }
        }
        (Some(_), None) => 1,
        (None, Some(_)) => 0,
        (None, None) => {
            if sample_count_hint(b) > sample_count_hint(a) {
                0
            } else {
                1
            }
        }
    }
}

fn sample_count_hint(obs: &Observation) -> usize {
    ingest_model::time::find_time_variable(&obs.group)
        .ok()
        .map(|kind| match kind {
            ingest_model::time::TimeVariableKind::Time(v) => v.sample_count(),
            ingest_model::time::TimeVariableKind::BaseTimeOffset { time_offset, .. } => {
                time_offset.sample_count()
            }
        })
        .unwrap_or(0)
}

/// Appends `next`'s unlimited-dim samples (including the time variable)
/// onto `base`, then discards `next`.
fn append_observation(base: &mut Observation, next: Observation) -> Result<()> {
    let var_names: Vec<String> = base.group.variable_names();
    for name in var_names {
        let Some(axis) = base.group.get_variable(&name)?.sample_axis().map(str::to_string) else {
            continue;
        };
        let Some(dim) = base.group.get_dimension(&axis) else {
            continue;
        };
        if !dim.is_unlimited {
            continue;
        }
        let Ok(source_var) = next.group.get_variable(&name) else {
            continue;
        };
        for sample in source_var.samples() {
            base.group.append_sample(&name, sample.clone())?;
        }
    }
    base.end = base.end.max(next.end);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ingest_model::{Attribute, DataType, Group, Variable, encode_scalar_f64};

    fn time_group(name: &str, times: &[f64], history: &str) -> Group {
        let mut g = Group::new(name);
        g.define_dimension("time", 0, true).unwrap();
        let mut time_var = Variable::new("time", DataType::Double, vec!["time".into()]);
        time_var
            .define_attribute(Attribute::string("units", "seconds since 1970-01-01 00:00:00"))
            .unwrap();
        g.define_variable(time_var).unwrap();
        for &t in times {
            g.append_sample("time", encode_scalar_f64(DataType::Double, t)).unwrap();
        }
        g.define_attribute(Attribute::string("history", history)).unwrap();
        g
    }

    #[test]
    fn disjoint_compatible_observations_merge_into_one() {
        let a = Observation::from_group(time_group("obs_a", &[0.0, 1.0, 2.0], "2020-01-01 00:00:00")).unwrap();
        let b = Observation::from_group(time_group("obs_b", &[3.0, 4.0], "2020-01-01 00:00:01")).unwrap();
        let mut obs = vec![a, b];
        let report = merge_observations(&mut obs, OverlapMode::FilterInputObs).unwrap();
        assert_eq!(report.merged_count, 1);
        assert_eq!(obs.len(), 1);
        assert_eq!(obs[0].group.get_variable("time").unwrap().sample_count(), 5);
    }

    #[test]
    fn strict_mode_fails_on_overlap() {
        let a = Observation::from_group(time_group("obs_a", &[0.0, 1.0, 2.0], "2020-01-01 00:00:00")).unwrap();
        let b = Observation::from_group(time_group("obs_b", &[1.5, 4.0], "2020-01-01 00:00:01")).unwrap();
        let mut obs = vec![a, b];
        let err = merge_observations(&mut obs, OverlapMode::Strict).unwrap_err();
        assert!(matches!(err, MergeError::OverlappingInputData { .. }));
    }

    #[test]
    fn overlap_resolution_prefers_newer_when_big_enough() {
        let a = Observation::from_group(time_group("obs_a", &[0.0, 1.0, 2.0, 3.0], "2020-01-01 00:00:00")).unwrap();
        let b = Observation::from_group(time_group("obs_b", &[1.5, 2.5, 3.5, 4.5], "2020-06-01 00:00:00")).unwrap();
        let mut obs = vec![a, b];
        let report = merge_observations(&mut obs, OverlapMode::FilterInputObs).unwrap();
        assert_eq!(report.dropped_count, 1);
        assert_eq!(obs.len(), 1);
        // b is newer and has >= 75% of a's sample count (4 >= 3), so it wins
        assert_eq!(obs[0].start, 1.5);
    }

    #[test]
    fn overlap_resolution_falls_back_to_older_when_newer_too_small() {
        let a = Observation::from_group(
            time_group("obs_a", &[0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0], "2020-01-01 00:00:00"),
        )
        .unwrap();
        let b = Observation::from_group(time_group("obs_b", &[6.5, 7.5], "2020-06-01 00:00:00")).unwrap();
        let mut obs = vec![a, b];
        let report = merge_observations(&mut obs, OverlapMode::FilterInputObs).unwrap();
        assert_eq!(report.dropped_count, 1);
        // b is newer but only 2/8 = 25% of a's samples, so a (older) is kept
        assert_eq!(obs[0].start, 0.0);
    }
}
