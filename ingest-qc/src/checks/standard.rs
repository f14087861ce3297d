//! Standard QC orchestration (spec §4.6 `standard_qc_checks`): runs
//! limit, delta, time, and solar-obstruction checks over every
//! non-excluded data variable that has a companion QC variable, in that
//! order.

use std::collections::HashMap;

use ingest_model::{DataType, Group, encode_scalar_f64};

use crate::bits::bit_descriptions;
use crate::checks::delta::qc_delta_checks;
use crate::checks::limit::{LimitCheckConfig, qc_limit_checks};
use crate::checks::solar::{solar_obstruction_check, validate_azimuth_range, validate_elevation_range};
use crate::checks::time::{TimeCheckConfig, qc_time_checks};
use crate::error::Result;

/// Context hydrated from the previously-stored file, used to seed the
/// delta and time checks' first comparison (§4.6, `prior_sample_flag`).
#[derive(Debug, Clone, Default)]
pub struct PreviousSampleContext {
    pub time: Option<f64>,
    pub last_values: HashMap<String, Vec<f64>>,
}

#[derive(Debug, Clone)]
pub struct StandardQcConfig {
    pub limit: LimitCheckConfig,
    pub time: TimeCheckConfig,
    pub delta_default_flag: u32,
    pub solar_default_flag: u32,
    /// Variable names excluded from standard QC entirely.
    pub exclude: Vec<String>,
}

impl Default for StandardQcConfig {
    fn default() -> Self {
        Self {
            limit: LimitCheckConfig::default(),
            time: TimeCheckConfig::default(),
            delta_default_flag: 0x8,
            solar_default_flag: 0x8,
            exclude: Vec::new(),
        }
    }
}

fn write_flags(group: &mut Group, qc_name: &str, flags: &[u32]) -> Result<()> {
    let out = group.get_variable_mut(qc_name)?;
    for (i, &flag) in flags.iter().enumerate() {
        let bytes = encode_scalar_f64(DataType::Int, f64::from(flag));
        if i < out.sample_count() {
            out.set_sample(i, bytes)?;
        } else {
            out.push_sample(bytes);
        }
    }
    Ok(())
}

/// Runs limit → delta → time → solar checks (in that order) over every
/// data variable in `group` that has a `qc_<name>` companion and isn't
/// named in `config.exclude`.
pub fn standard_qc_checks(group: &mut Group, config: &StandardQcConfig, previous: Option<&PreviousSampleContext>) -> Result<()> {
    let names = group.variable_names();

    for name in names {
        if name.starts_with("qc_") || config.exclude.iter().any(|n| n == &name) {
            continue;
        }
        let qc_name = ingest_model::companion::qc_name(&name);
        if !group.has_variable(&qc_name) {
            continue;
        }

        let var = group.get_variable(&name)?.clone();
        let qc_var = group.get_variable(&qc_name)?.clone();
        let descriptions = bit_descriptions(&qc_var, Some(group));

        let mut flags = qc_limit_checks(&var, &qc_var, &descriptions, &config.limit)?;

        if var.get_attribute("valid_delta").is_some() {
            let prior_last = previous.and_then(|p| p.last_values.get(&name)).map(Vec::as_slice);
            let delta_flags = qc_delta_checks(&var, &descriptions, prior_last, config.delta_default_flag)?;
            for (flag, delta) in flags.iter_mut().zip(delta_flags) {
                *flag |= delta;
            }
        }

        if name == "time" || name == "base_time" {
            let times = var.scalar_samples_as_f64().unwrap_or_default();
            let previous_time = previous.and_then(|p| p.time);
            let lower = group.get_attribute("delta_t_lower_limit").and_then(|a| a.value.as_f64());
            let upper = group.get_attribute("delta_t_upper_limit").and_then(|a| a.value.as_f64());
            let time_flags = qc_time_checks(&times, previous_time, lower, upper, &descriptions, &config.time);
            for (flag, t) in flags.iter_mut().zip(time_flags) {
                *flag |= t;
            }
        }

        let az_attr = var
            .get_attribute("solar_obstruction_azimuth_range")
            .or_else(|| qc_var.get_attribute("solar_obstruction_azimuth_range"))
            .and_then(|a| a.value.as_doubles());
        let el_attr = var
            .get_attribute("solar_obstruction_elevation_range")
            .or_else(|| qc_var.get_attribute("solar_obstruction_elevation_range"))
            .and_then(|a| a.value.as_doubles());

        if let (Some(az_range), Some(el_range)) = (az_attr, el_attr) {
            let lat = group.get_attribute("latitude").and_then(|a| a.value.as_f64());
            let lon = group.get_attribute("longitude").and_then(|a| a.value.as_f64());
            if let (Some(latitude), Some(longitude)) = (lat, lon) {
                let azimuth_range = validate_azimuth_range(az_range, &name)?;
                let elevation_range = validate_elevation_range(el_range, &name)?;
                let times = group.get_variable("time")?.scalar_samples_as_f64().unwrap_or_default();
                let solar_flags = solar_obstruction_check(&times, latitude, longitude, azimuth_range, elevation_range, &descriptions, config.solar_default_flag);
                for (flag, s) in flags.iter_mut().zip(solar_flags) {
                    *flag |= s;
                }
            }
        }

        write_flags(group, &qc_name, &flags)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ingest_model::{Attribute, DataType, Variable, encode_scalar_f64};

    fn sample_group() -> Group {
        let mut group = Group::new("ds");
        group.define_dimension("time", 3, true).unwrap();

        let mut time = Variable::new("time", DataType::Double, vec!["time".into()]);
        for t in [0.0, 60.0, 59.0] {
            time.push_sample(encode_scalar_f64(DataType::Double, t));
        }
        group.define_variable(time).unwrap();

        let mut temp = Variable::new("temp", DataType::Float, vec!["time".into()]);
        temp.define_attribute(Attribute::float("valid_min", -40.0)).unwrap();
        temp.define_attribute(Attribute::float("valid_max", 40.0)).unwrap();
        for v in [10.0, 999.0, 20.0] {
            temp.push_sample(encode_scalar_f64(DataType::Float, v));
        }
        group.define_variable(temp).unwrap();

        let qc_temp = Variable::new("qc_temp", DataType::Int, vec!["time".into()]);
        group.define_variable(qc_temp).unwrap();

        let qc_time = Variable::new("qc_time", DataType::Int, vec!["time".into()]);
        group.define_variable(qc_time).unwrap();

        group
    }

    #[test]
    fn standard_checks_populate_qc_variables() {
        let mut group = sample_group();
        standard_qc_checks(&mut group, &StandardQcConfig::default(), None).unwrap();

        let qc_temp = group.get_variable("qc_temp").unwrap();
        let flags = qc_temp.scalar_samples_as_f64().unwrap();
        assert_eq!(flags[1] as u32 & 0x4, 0x4);

        let qc_time = group.get_variable("qc_time").unwrap();
        let time_flags = qc_time.scalar_samples_as_f64().unwrap();
        assert_eq!(time_flags[2] as u32 & 0x1, 0x1);
    }

    #[test]
    fn excluded_variable_is_skipped() {
        let mut group = sample_group();
        let config = StandardQcConfig {
            exclude: vec!["temp".to_string()],
            ..StandardQcConfig::default()
        };
        standard_qc_checks(&mut group, &config, None).unwrap();
        let qc_temp = group.get_variable("qc_temp").unwrap();
        assert_eq!(qc_temp.sample_count(), 0);
    }
}
