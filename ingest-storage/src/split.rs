//! Output file split-interval calendar math (§4.7 step 12), ported from
//! the original `_dsproc_get_next_split_time`: given the time of the
//! previously stored (or about-to-be-stored) record, find the next time
//! a new file boundary falls.

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use ingest_model::{SplitMode, SplitPolicy};

fn tz_offset_seconds(policy: &SplitPolicy) -> i64 {
    if policy.use_local_time {
        (policy.tz_offset_hours * 3600.0).round() as i64
    } else {
        0
    }
}

fn midnight_of(seconds: i64) -> NaiveDateTime {
    let date = Utc.timestamp_opt(seconds, 0).unwrap().date_naive();
    date.and_time(NaiveTime::MIN)
}

fn to_epoch(dt: NaiveDateTime, tz_offset: i64) -> i64 {
    dt.and_utc().timestamp() - tz_offset
}

/// Computes the next split boundary after `prev_time`. Returns `None`
/// for `SPLIT_ON_STORE`/`SPLIT_NONE`, where splitting is governed
/// entirely by the store call rather than by calendar boundaries.
#[must_use]
pub fn next_split_time(policy: &SplitPolicy, prev_time: i64) -> Option<i64> {
    match policy.mode {
        SplitMode::OnStore | SplitMode::None => None,
        SplitMode::OnMonths => Some(next_months_boundary(policy, prev_time)),
        SplitMode::OnDays => Some(next_days_boundary(policy, prev_time)),
        SplitMode::OnHours => Some(next_hours_boundary(policy, prev_time)),
    }
}

fn next_months_boundary(policy: &SplitPolicy, prev_time: i64) -> i64 {
    let tz = tz_offset_seconds(policy);
    let interval = if policy.interval > 0 { policy.interval } else { 1 };
    let start_month = policy.phase.clamp(1, 12);

    let gmt = midnight_of(prev_time);
    let mut year = gmt.year();
    let base = NaiveDate::from_ymd_opt(year, start_month, 1).unwrap().and_time(NaiveTime::MIN);
    let mut split_time = to_epoch(base, tz);

    if split_time > prev_time {
        year -= 1;
    }

    let mut cursor_year = year;
    let mut cursor_month = start_month;
    split_time = to_epoch(
        NaiveDate::from_ymd_opt(cursor_year, cursor_month, 1).unwrap().and_time(NaiveTime::MIN),
        tz,
    );

    while split_time <= prev_time {
        let total = (cursor_month - 1) as i64 + i64::from(interval);
        cursor_year += (total / 12) as i32;
        cursor_month = (total % 12) as u32 + 1;
        split_time = to_epoch(
            NaiveDate::from_ymd_opt(cursor_year, cursor_month, 1).unwrap().and_time(NaiveTime::MIN),
            tz,
        );
    }
    split_time
}

fn next_days_boundary(policy: &SplitPolicy, prev_time: i64) -> i64 {
    let tz = tz_offset_seconds(policy);
    let interval = if policy.interval > 0 {
        i64::from(policy.interval) * 86_400
    } else {
        86_400
    };
    let phase_seconds = i64::from(policy.phase) * 86_400;

    let gmt = midnight_of(prev_time);
    let month_start = NaiveDate::from_ymd_opt(gmt.year(), gmt.month(), 1).unwrap().and_time(NaiveTime::MIN);
    let mut split_time = to_epoch(month_start, tz) + phase_seconds;

    while split_time <= prev_time {
        split_time += interval;
    }
    split_time
}

fn next_hours_boundary(policy: &SplitPolicy, prev_time: i64) -> i64 {
    let tz = tz_offset_seconds(policy);
    let interval = if policy.interval > 0 {
        i64::from(policy.interval) * 3_600
    } else {
        86_400
    };
    let phase_seconds = i64::from(policy.phase) * 3_600;

    let gmt = midnight_of(prev_time);
    let mut split_time = to_epoch(gmt, tz) + phase_seconds;
    while split_time <= prev_time {
        split_time += interval;
    }
    split_time
}

#[cfg(test)]
mod tests {
    use super::*;
    use ingest_model::SplitMode;

    fn policy(mode: SplitMode, interval: u32, phase: u32) -> SplitPolicy {
        SplitPolicy {
            mode,
            interval,
            phase,
            use_local_time: false,
            tz_offset_hours: 0.0,
        }
    }

    #[test]
    fn on_store_and_none_never_split() {
        assert_eq!(next_split_time(&policy(SplitMode::OnStore, 0, 0), 0), None);
        assert_eq!(next_split_time(&policy(SplitMode::None, 0, 0), 0), None);
    }

    #[test]
    fn daily_splits_at_next_midnight() {
        // 2020-01-15 08:00:00 UTC
        let prev = 1_579_075_200;
        let next = next_split_time(&policy(SplitMode::OnDays, 1, 0), prev).unwrap();
        assert_eq!(next - prev, 16 * 3600);
    }

    #[test]
    fn hourly_with_interval_twenty_four_matches_daily() {
        let prev = 1_579_075_200;
        let hourly = next_split_time(&policy(SplitMode::OnHours, 24, 0), prev).unwrap();
        let daily = next_split_time(&policy(SplitMode::OnDays, 1, 0), prev).unwrap();
        assert_eq!(hourly, daily);
    }

    #[test]
    fn monthly_splits_on_the_first_of_next_month() {
        // 2020-01-15 00:00:00 UTC
        let prev = 1_579_046_400;
        let next = next_split_time(&policy(SplitMode::OnMonths, 1, 1), prev).unwrap();
        let expected = NaiveDate::from_ymd_opt(2020, 2, 1).unwrap().and_time(NaiveTime::MIN).and_utc().timestamp();
        assert_eq!(next, expected);
    }
}
