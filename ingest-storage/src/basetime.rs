//! Base-time midnight adjustment (§4.7 step 10).

use ingest_model::Group;
use ingest_model::time::{TimeVariableKind, find_time_variable, parse_base_epoch, set_base_time};

use crate::error::Result;

const SECONDS_PER_DAY: i64 = 86_400;

fn is_midnight_aligned(epoch_seconds: i64) -> bool {
    epoch_seconds.rem_euclid(SECONDS_PER_DAY) == 0
}

/// If the dataset's first sample was dropped by NaN filtering (§4.7 step
/// 4) and its existing `base_time` was midnight-aligned, re-bases it to
/// the midnight containing the new first sample's time. A no-op for
/// datasets using the plain `time` variable (no separate `base_time` to
/// adjust) or whose `base_time` wasn't midnight-aligned to begin with.
pub fn adjust_base_time_if_needed(group: &mut Group, first_sample_was_filtered: bool, new_first_sample_epoch: Option<i64>) -> Result<()> {
    if !first_sample_was_filtered {
        return Ok(());
    }
    let TimeVariableKind::BaseTimeOffset { base_time, .. } = find_time_variable(group)? else {
        return Ok(());
    };
    let Some(old_epoch) = base_time
        .get_attribute("units")
        .and_then(|a| a.value.as_text())
        .and_then(|units| parse_base_epoch(units).ok())
    else {
        return Ok(());
    };
    if !is_midnight_aligned(old_epoch) {
        return Ok(());
    }
    let Some(new_first) = new_first_sample_epoch else {
        return Ok(());
    };

    let new_midnight = new_first - new_first.rem_euclid(SECONDS_PER_DAY);
    if new_midnight == old_epoch {
        return Ok(());
    }
    set_base_time(group, "base time", new_midnight)
}
