//! Companion-variable naming (spec §3 "Companion variables").

/// Which kind of companion variable a name-derivation function targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompanionKind {
    Qc,
    Bounds,
    Std,
    GoodFraction,
    Dist,
    Dist1,
    Dist2,
    Nstat,
    DerivLat,
    DerivLon,
}

impl CompanionKind {
    #[must_use]
    pub const fn suffix(self) -> Option<&'static str> {
        match self {
            Self::Qc => None,
            Self::Bounds => Some("bounds"),
            Self::Std => Some("std"),
            Self::GoodFraction => Some("goodfraction"),
            Self::Dist => Some("dist"),
            Self::Dist1 => Some("dist_1"),
            Self::Dist2 => Some("dist_2"),
            Self::Nstat => Some("nstat"),
            Self::DerivLat => Some("deriv_lat"),
            Self::DerivLon => Some("deriv_lon"),
        }
    }
}

/// All metric-variable suffixes the mapper loops over (spec §4.4).
pub const METRIC_SUFFIXES: &[&str] = &[
    "std",
    "goodfraction",
    "dist",
    "dist_1",
    "dist_2",
    "nstat",
    "deriv_lat",
    "deriv_lon",
];

#[must_use]
pub fn qc_name(var_name: &str) -> String {
    format!("qc_{var_name}")
}

#[must_use]
pub fn bounds_name(var_name: &str) -> String {
    format!("{var_name}_bounds")
}

#[must_use]
pub fn metric_name(var_name: &str, suffix: &str) -> String {
    format!("{var_name}_{suffix}")
}

/// If `name` looks like a companion of some primary variable (`qc_X`,
/// `X_bounds`, or `X_<metric-suffix>`), returns `(primary_name, kind)`.
#[must_use]
pub fn parse_companion_name(name: &str) -> Option<(String, CompanionKind)> {
    if let Some(primary) = name.strip_prefix("qc_") {
        return Some((primary.to_string(), CompanionKind::Qc));
    }
    for suffix in METRIC_SUFFIXES {
        if let Some(primary) = name.strip_suffix(&format!("_{suffix}")) {
            let kind = match *suffix {
                "std" => CompanionKind::Std,
                "goodfraction" => CompanionKind::GoodFraction,
                "dist" => CompanionKind::Dist,
                "dist_1" => CompanionKind::Dist1,
                "dist_2" => CompanionKind::Dist2,
                "nstat" => CompanionKind::Nstat,
                "deriv_lat" => CompanionKind::DerivLat,
                "deriv_lon" => CompanionKind::DerivLon,
                _ => unreachable!(),
            };
            return Some((primary.to_string(), kind));
        }
    }
    name.strip_suffix("_bounds")
        .map(|primary| (primary.to_string(), CompanionKind::Bounds))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip() {
        assert_eq!(qc_name("temp"), "qc_temp");
        assert_eq!(bounds_name("temp"), "temp_bounds");
        assert_eq!(metric_name("temp", "std"), "temp_std");
    }

    #[test]
    fn parse_companion_name_recognizes_qc_and_metrics() {
        assert_eq!(
            parse_companion_name("qc_temp"),
            Some(("temp".to_string(), CompanionKind::Qc))
        );
        assert_eq!(
            parse_companion_name("temp_goodfraction"),
            Some(("temp".to_string(), CompanionKind::GoodFraction))
        );
        assert_eq!(
            parse_companion_name("temp_bounds"),
            Some(("temp".to_string(), CompanionKind::Bounds))
        );
        assert_eq!(parse_companion_name("temp"), None);
    }
}
