//! Within-dataset time dedup and chronological-order check (§4.7 step 2).

use ingest_model::Group;

use crate::error::{Result, StorageError};

/// Indices to drop from a dataset before it is written: earlier duplicate
/// samples whose data matches a later sample at the same time.
#[derive(Debug, Default, PartialEq)]
pub struct DedupPlan {
    pub drop_indices: Vec<usize>,
}

/// Scans `group`'s time variable for duplicate or out-of-order samples.
///
/// Two samples sharing a time are fine if every variable's bytes at both
/// indices match (the later one wins, the earlier is dropped); they are a
/// [`StorageError::DuplicateTimeMismatch`] otherwise. Any non-monotonic time
/// (a sample strictly before its predecessor) is also a mismatch, since the
/// ingest engine never reorders samples within one dataset.
pub fn plan_dedup(group: &Group) -> Result<DedupPlan> {
    let time = group.get_variable("time")?;
    let times = time.scalar_samples_as_f64()?;

    let mut plan = DedupPlan::default();
    for i in 1..times.len() {
        if times[i] > times[i - 1] {
            continue;
        }
        if times[i] < times[i - 1] {
            return Err(StorageError::DuplicateTimeMismatch {
                variable: "time".to_string(),
                time: times[i],
            });
        }
        if samples_match(group, i - 1, i)? {
            plan.drop_indices.push(i - 1);
        } else {
            return Err(StorageError::DuplicateTimeMismatch {
                variable: "time".to_string(),
                time: times[i],
            });
        }
    }
    Ok(plan)
}

fn samples_match(group: &Group, a: usize, b: usize) -> Result<bool> {
    for name in group.variable_names() {
        let var = group.get_variable(&name)?;
        if var.sample_axis().is_none() {
            continue;
        }
        let (Some(x), Some(y)) = (var.samples().get(a), var.samples().get(b)) else {
            continue;
        };
        if x != y {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Removes `plan`'s drop indices from every sample-axis variable in
/// `group`, highest index first so earlier indices stay valid.
pub fn apply_dedup(group: &mut Group, plan: &DedupPlan) -> Result<()> {
    if plan.drop_indices.is_empty() {
        return Ok(());
    }
    let mut sorted = plan.drop_indices.clone();
    sorted.sort_unstable();
    sorted.dedup();

    for name in group.variable_names() {
        let var = group.get_variable_mut(&name)?;
        if var.sample_axis().is_none() {
            continue;
        }
        for &index in sorted.iter().rev() {
            if index < var.sample_count() {
                let mut kept: Vec<_> = var.samples().to_vec();
                kept.remove(index);
                var.clear_samples();
                for bytes in kept {
                    var.push_sample(bytes);
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ingest_model::{DataType, Variable, encode_scalar_f64};

    fn group_with(times: &[f64], values: &[f64]) -> Group {
        let mut g = Group::new("ds");
        g.define_dimension("time", 0, true).unwrap();
        let mut t = Variable::new("time", DataType::Double, vec!["time".into()]);
        let mut v = Variable::new("temp", DataType::Float, vec!["time".into()]);
        for (&time, &value) in times.iter().zip(values) {
            t.push_sample(encode_scalar_f64(DataType::Double, time));
            v.push_sample(encode_scalar_f64(DataType::Float, value));
        }
        g.define_variable(t).unwrap();
        g.define_variable(v).unwrap();
        g
    }

    #[test]
    fn strictly_increasing_times_plan_nothing() {
        let g = group_with(&[0.0, 60.0, 120.0], &[1.0, 2.0, 3.0]);
        assert_eq!(plan_dedup(&g).unwrap(), DedupPlan::default());
    }

    #[test]
    fn matching_duplicate_drops_the_earlier_sample() {
        let g = group_with(&[0.0, 60.0, 60.0], &[1.0, 2.0, 2.0]);
        let plan = plan_dedup(&g).unwrap();
        assert_eq!(plan.drop_indices, vec![1]);
    }

    #[test]
    fn mismatched_duplicate_is_an_error() {
        let g = group_with(&[0.0, 60.0, 60.0], &[1.0, 2.0, 3.0]);
        let err = plan_dedup(&g).unwrap_err();
        assert!(matches!(err, StorageError::DuplicateTimeMismatch { .. }));
    }

    #[test]
    fn out_of_order_time_is_an_error() {
        let g = group_with(&[60.0, 0.0], &[1.0, 2.0]);
        let err = plan_dedup(&g).unwrap_err();
        assert!(matches!(err, StorageError::DuplicateTimeMismatch { .. }));
    }

    #[test]
    fn apply_dedup_removes_planned_indices() {
        let mut g = group_with(&[0.0, 60.0, 60.0], &[1.0, 2.0, 2.0]);
        let plan = plan_dedup(&g).unwrap();
        apply_dedup(&mut g, &plan).unwrap();
        let times = g.get_variable("time").unwrap().scalar_samples_as_f64().unwrap();
        assert_eq!(times, vec![0.0, 60.0]);
    }
}
