//! Time checks (spec §4.6 `qc_time_checks`).

use crate::bits::{BitDescription, find_bit_by_phrase};

#[derive(Debug, Clone, Copy)]
pub struct TimeCheckConfig {
    pub non_monotonic_flag: u32,
    pub delta_t_lower_flag: u32,
    pub delta_t_upper_flag: u32,
}

impl Default for TimeCheckConfig {
    fn default() -> Self {
        Self {
            non_monotonic_flag: 0x1,
            delta_t_lower_flag: 0x2,
            delta_t_upper_flag: 0x4,
        }
    }
}

/// For each consecutive pair of times Δt = t_i − t_{i−1} (plus Δt₀ from
/// `previous_sample_time` when supplied), flags `Δt ≤ 0`, `Δt <
/// delta_t_lower_limit`, `Δt > delta_t_upper_limit`.
pub fn qc_time_checks(
    times: &[f64],
    previous_sample_time: Option<f64>,
    delta_t_lower_limit: Option<f64>,
    delta_t_upper_limit: Option<f64>,
    descriptions: &[BitDescription],
    config: &TimeCheckConfig,
) -> Vec<u32> {
    let non_monotonic = find_bit_by_phrase(descriptions, "less than or equal to the previous time")
        .map(BitDescription::mask)
        .unwrap_or(config.non_monotonic_flag);
    let lower = find_bit_by_phrase(descriptions, "less than the delta_t_lower_limit")
        .map(BitDescription::mask)
        .unwrap_or(config.delta_t_lower_flag);
    let upper = find_bit_by_phrase(descriptions, "greater than the delta_t_upper_limit")
        .map(BitDescription::mask)
        .unwrap_or(config.delta_t_upper_flag);

    let mut flags = vec![0u32; times.len()];
    let mut prev = previous_sample_time;

    for (i, &t) in times.iter().enumerate() {
        if let Some(p) = prev {
            let dt = t - p;
            if dt <= 0.0 {
                flags[i] |= non_monotonic;
            }
            if let Some(lo) = delta_t_lower_limit {
                if dt < lo {
                    flags[i] |= lower;
                }
            }
            if let Some(hi) = delta_t_upper_limit {
                if dt > hi {
                    flags[i] |= upper;
                }
            }
        }
        prev = Some(t);
    }

    flags
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_non_monotonic_and_out_of_bound_deltas() {
        let times = vec![0.0, 10.0, 10.0, 5.0, 1000.0];
        let flags = qc_time_checks(&times, None, Some(2.0), Some(100.0), &[], &TimeCheckConfig::default());
        assert_eq!(flags[0], 0);
        assert_eq!(flags[1], 0);
        assert_eq!(flags[2] & 0x1, 0x1);
        assert_eq!(flags[3] & 0x1, 0x1);
        assert_eq!(flags[4] & 0x4, 0x4);
    }

    #[test]
    fn previous_sample_time_seeds_first_delta() {
        let times = vec![0.0];
        let flags = qc_time_checks(&times, Some(-1.0), None, None, &[], &TimeCheckConfig::default());
        assert_eq!(flags[0], 0);
    }
}
