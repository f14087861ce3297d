//! Solar-obstruction check (spec §4.6 `solar_obstruction_check`).
//!
//! Solar position is computed with the NOAA low-precision solar
//! position algorithm (accurate to within a few arc-minutes), which is
//! sufficient to test whether the sun sits inside a configured
//! azimuth/elevation keep-out window; it is not a high-precision
//! ephemeris and is not meant to be.

use std::f64::consts::PI;

use crate::bits::{BitDescription, find_bit_by_phrase};
use crate::error::{QcError, Result};

fn deg2rad(d: f64) -> f64 {
    d * PI / 180.0
}

fn rad2deg(r: f64) -> f64 {
    r * 180.0 / PI
}

/// Solar azimuth (degrees, 0 = north, clockwise) and elevation (degrees
/// above the horizon) at `epoch_seconds` (UTC) for the given
/// latitude/longitude (degrees, east-positive).
#[must_use]
pub fn solar_position(epoch_seconds: f64, latitude: f64, longitude: f64) -> (f64, f64) {
    let jd = epoch_seconds / 86400.0 + 2_440_587.5;
    let jc = (jd - 2_451_545.0) / 36525.0;

    let geom_mean_long_sun = (280.466_46 + jc * (36000.769_83 + jc * 0.000_3032)).rem_euclid(360.0);
    let geom_mean_anom_sun = 357.529_11 + jc * (35999.050_29 - 0.000_1537 * jc);
    let eccent_earth_orbit = 0.016_708_634 - jc * (0.000_042_037 + 0.000_000_126_7 * jc);
    let mean_anom_rad = deg2rad(geom_mean_anom_sun);

    let sun_eq_of_ctr = mean_anom_rad.sin() * (1.914_602 - jc * (0.004_817 + 0.000_014 * jc))
        + (2.0 * mean_anom_rad).sin() * (0.019_993 - 0.000_101 * jc)
        + (3.0 * mean_anom_rad).sin() * 0.000_289;

    let sun_true_long = geom_mean_long_sun + sun_eq_of_ctr;
    let omega = 125.04 - 1934.136 * jc;
    let sun_app_long = sun_true_long - 0.005_69 - 0.004_78 * deg2rad(omega).sin();

    let mean_obliq_ecliptic = 23.0 + (26.0 + (21.448 - jc * (46.815 + jc * (0.000_59 - jc * 0.001_813))) / 60.0) / 60.0;
    let obliq_corr = mean_obliq_ecliptic + 0.002_56 * deg2rad(omega).cos();

    let sun_declin = rad2deg((deg2rad(obliq_corr).sin() * deg2rad(sun_app_long).sin()).asin());

    let y = deg2rad(obliq_corr / 2.0).tan().powi(2);
    let eq_of_time = 4.0
        * rad2deg(
            y * (2.0 * deg2rad(geom_mean_long_sun)).sin() - 2.0 * eccent_earth_orbit * mean_anom_rad.sin()
                + 4.0 * eccent_earth_orbit * y * mean_anom_rad.sin() * (2.0 * deg2rad(geom_mean_long_sun)).cos()
                - 0.5 * y * y * (4.0 * deg2rad(geom_mean_long_sun)).sin()
                - 1.25 * eccent_earth_orbit * eccent_earth_orbit * (2.0 * mean_anom_rad).sin(),
        );

    let time_offset = eq_of_time + 4.0 * longitude;
    let seconds_in_day = epoch_seconds.rem_euclid(86400.0);
    let true_solar_time = (seconds_in_day / 60.0 + time_offset).rem_euclid(1440.0);

    let hour_angle = if true_solar_time / 4.0 < 0.0 {
        true_solar_time / 4.0 + 180.0
    } else {
        true_solar_time / 4.0 - 180.0
    };

    let lat_rad = deg2rad(latitude);
    let decl_rad = deg2rad(sun_declin);
    let hour_rad = deg2rad(hour_angle);

    let zenith_cos = lat_rad.sin() * decl_rad.sin() + lat_rad.cos() * decl_rad.cos() * hour_rad.cos();
    let zenith = zenith_cos.clamp(-1.0, 1.0).acos();
    let elevation = 90.0 - rad2deg(zenith);

    let azimuth_cos = ((lat_rad.sin() * zenith.cos() - decl_rad.sin()) / (lat_rad.cos() * zenith.sin())).clamp(-1.0, 1.0);
    let azimuth = if hour_angle > 0.0 {
        (rad2deg(azimuth_cos.acos()) + 180.0).rem_euclid(360.0)
    } else {
        (540.0 - rad2deg(azimuth_cos.acos())).rem_euclid(360.0)
    };

    (azimuth, elevation)
}

/// Wrap-aware azimuth range test: true if `value` falls within `[low,
/// high]` going clockwise, wrapping through 360/0 when `low > high`.
#[must_use]
pub fn azimuth_in_range(value: f64, low: f64, high: f64) -> bool {
    let v = value.rem_euclid(360.0);
    let lo = low.rem_euclid(360.0);
    let hi = high.rem_euclid(360.0);
    if lo <= hi { v >= lo && v <= hi } else { v >= lo || v <= hi }
}

#[must_use]
pub fn elevation_in_range(value: f64, low: f64, high: f64) -> bool {
    value >= low && value <= high
}

pub fn validate_azimuth_range(range: &[f64], variable: &str) -> Result<(f64, f64)> {
    if range.len() != 2 {
        return Err(QcError::InvalidRange {
            variable: variable.to_string(),
            attribute: "solar_obstruction_azimuth_range".into(),
            reason: "expected exactly two values".into(),
        });
    }
    Ok((range[0], range[1]))
}

pub fn validate_elevation_range(range: &[f64], variable: &str) -> Result<(f64, f64)> {
    if range.len() != 2 {
        return Err(QcError::InvalidRange {
            variable: variable.to_string(),
            attribute: "solar_obstruction_elevation_range".into(),
            reason: "expected exactly two values".into(),
        });
    }
    let (low, high) = (range[0], range[1]);
    if low > high {
        return Err(QcError::InvalidRange {
            variable: variable.to_string(),
            attribute: "solar_obstruction_elevation_range".into(),
            reason: "low must be <= high".into(),
        });
    }
    if !(-90.0..=90.0).contains(&low) || !(-90.0..=90.0).contains(&high) {
        return Err(QcError::InvalidRange {
            variable: variable.to_string(),
            attribute: "solar_obstruction_elevation_range".into(),
            reason: "elevation must fall within -90..90".into(),
        });
    }
    Ok((low, high))
}

/// Flags samples whose computed solar position falls within the
/// configured azimuth/elevation obstruction window.
#[must_use]
pub fn solar_obstruction_check(
    times: &[f64],
    latitude: f64,
    longitude: f64,
    azimuth_range: (f64, f64),
    elevation_range: (f64, f64),
    descriptions: &[BitDescription],
    default_flag: u32,
) -> Vec<u32> {
    let bit = find_bit_by_phrase(descriptions, "solar obstruction")
        .map(BitDescription::mask)
        .unwrap_or(default_flag);

    times
        .iter()
        .map(|&t| {
            let (az, el) = solar_position(t, latitude, longitude);
            if azimuth_in_range(az, azimuth_range.0, azimuth_range.1) && elevation_in_range(el, elevation_range.0, elevation_range.1) {
                bit
            } else {
                0
            }
        })
        .collect()
}
