//! Minimal unit-conversion table for coordinate dimensions (§4.5 rules
//! 2-4). Only the handful of unit families coordinate dimensions
//! actually carry; an unknown unit or a cross-family pair fails loudly
//! rather than guessing at a conversion.

fn family_factor(unit: &str) -> Option<(&'static str, f64)> {
    match unit.trim().to_ascii_lowercase().as_str() {
        "s" | "sec" | "secs" | "second" | "seconds" => Some(("time", 1.0)),
        "min" | "mins" | "minute" | "minutes" => Some(("time", 60.0)),
        "hr" | "hrs" | "hour" | "hours" => Some(("time", 3600.0)),
        "day" | "days" => Some(("time", 86400.0)),
        "m" | "meter" | "meters" | "metre" | "metres" => Some(("length", 1.0)),
        "km" | "kilometer" | "kilometers" | "kilometre" | "kilometres" => Some(("length", 1000.0)),
        "deg" | "degree" | "degrees" | "degrees_north" | "degrees_east" | "degrees_true" => Some(("angle", 1.0)),
        "rad" | "radian" | "radians" => Some(("angle", 180.0 / std::f64::consts::PI)),
        _ => None,
    }
}

/// Multiplicative factor converting a value in `from` to `to`, or `None`
/// if either unit is unrecognized or they belong to different families.
#[must_use]
pub fn conversion_factor(from: &str, to: &str) -> Option<f64> {
    if from.trim().eq_ignore_ascii_case(to.trim()) {
        return Some(1.0);
    }
    let (from_family, from_factor) = family_factor(from)?;
    let (to_family, to_factor) = family_factor(to)?;
    if from_family != to_family {
        return None;
    }
    Some(from_factor / to_factor)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_conversion_is_one() {
        assert_eq!(conversion_factor("seconds", "seconds"), Some(1.0));
    }

    #[test]
    fn converts_within_the_same_family() {
        let f = conversion_factor("hours", "seconds").unwrap();
        assert!((f - 3600.0).abs() < 1e-9);
    }

    #[test]
    fn refuses_cross_family_conversion() {
        assert_eq!(conversion_factor("seconds", "meters"), None);
    }

    #[test]
    fn refuses_unknown_units() {
        assert_eq!(conversion_factor("furlongs", "meters"), None);
    }
}
