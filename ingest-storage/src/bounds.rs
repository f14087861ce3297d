//! Cell-bounds and chunk-size preparation (§4.7 step 3).

use ingest_model::{Attribute, Group, Variable, bounds_name, encode_scalar_f64};

use crate::error::Result;

/// Default chunk size, in samples along the unlimited axis, stamped on
/// every sample-axis variable that doesn't already define `_ChunkSizes`.
pub const DEFAULT_CHUNK_SAMPLES: i64 = 512;

/// Derives a `V_bounds` companion for every coordinate variable (one
/// sharing a name with its own sample axis) that doesn't already have
/// one: each cell's bounds are the midpoints to its neighbors, extended
/// by the adjacent cell's half-width at the ends.
pub fn set_cell_bounds(group: &mut Group) -> Result<()> {
    for name in group.variable_names() {
        if group.get_bounds_variable(&name).is_some() {
            continue;
        }
        let var = group.get_variable(&name)?;
        if var.sample_axis() != Some(name.as_str()) {
            continue;
        }
        let values = var.scalar_samples_as_f64()?;
        if values.len() < 2 {
            continue;
        }

        let dtype = var.dtype;
        let bounds_dim = format!("{name}_bnds");
        if group.get_dimension(&bounds_dim).is_none() {
            group.define_dimension(&bounds_dim, 2, false)?;
        }

        let mut bounds_var = Variable::new(bounds_name(&name), dtype, vec![name.clone(), bounds_dim]);
        for i in 0..values.len() {
            let lower = if i == 0 {
                values[0] - (values[1] - values[0]) / 2.0
            } else {
                (values[i - 1] + values[i]) / 2.0
            };
            let upper = if i + 1 == values.len() {
                values[i] + (values[i] - values[i - 1]) / 2.0
            } else {
                (values[i] + values[i + 1]) / 2.0
            };
            let mut bytes = encode_scalar_f64(dtype, lower);
            bytes.extend(encode_scalar_f64(dtype, upper));
            bounds_var.push_sample(bytes);
        }
        group.define_variable(bounds_var)?;
    }
    Ok(())
}

/// Stamps a `_ChunkSizes` attribute on every sample-axis variable
/// missing one. A storage backend that supports chunked writes reads
/// this to size its chunk cache; [`crate::sink::FilesystemSink`]
/// ignores it.
pub fn set_chunk_sizes(group: &mut Group) -> Result<()> {
    for name in group.variable_names() {
        let var = group.get_variable_mut(&name)?;
        if var.sample_axis().is_none() || var.get_attribute("_ChunkSizes").is_some() {
            continue;
        }
        var.define_attribute(Attribute::int("_ChunkSizes", DEFAULT_CHUNK_SAMPLES))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ingest_model::DataType;

    fn time_group(times: &[f64]) -> Group {
        let mut g = Group::new("ds");
        g.define_dimension("time", 0, true).unwrap();
        let mut t = Variable::new("time", DataType::Double, vec!["time".into()]);
        for &value in times {
            t.push_sample(encode_scalar_f64(DataType::Double, value));
        }
        g.define_variable(t).unwrap();
        g
    }

    #[test]
    fn derives_bounds_with_midpoints_and_edge_extension() {
        let mut g = time_group(&[0.0, 60.0, 180.0]);
        set_cell_bounds(&mut g).unwrap();
        let bounds = g.get_bounds_variable("time").unwrap();
        assert_eq!(bounds.sample_count(), 3);

        let first = &bounds.samples()[0];
        let lower = f64::from_le_bytes(first[..8].try_into().unwrap());
        let upper = f64::from_le_bytes(first[8..].try_into().unwrap());
        assert_eq!(lower, -30.0);
        assert_eq!(upper, 30.0);
    }

    #[test]
    fn skips_variables_that_already_have_bounds() {
        let mut g = time_group(&[0.0, 60.0]);
        let mut existing = Variable::new(bounds_name("time"), DataType::Double, vec!["time".into()]);
        existing.push_sample(encode_scalar_f64(DataType::Double, 0.0));
        existing.push_sample(encode_scalar_f64(DataType::Double, 0.0));
        g.define_variable(existing).unwrap();

        set_cell_bounds(&mut g).unwrap();
        assert_eq!(g.get_bounds_variable("time").unwrap().sample_count(), 2);
    }

    #[test]
    fn chunk_sizes_are_stamped_on_sample_axis_variables() {
        let mut g = time_group(&[0.0, 60.0]);
        set_chunk_sizes(&mut g).unwrap();
        let attr = g.get_variable("time").unwrap().get_attribute("_ChunkSizes").unwrap();
        assert_eq!(attr.value.as_f64(), Some(DEFAULT_CHUNK_SAMPLES as f64));
    }
}
