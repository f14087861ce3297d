//! CSV output path (§4.7 step 7, §6 CSV format).

use ::csv::{QuoteStyle, WriterBuilder};
use ingest_model::{DataType, Group, Variable};

use crate::error::Result;

/// Variables never written as CSV columns regardless of shape.
const EXCLUDED_NAMES: &[&str] = &["base_time", "time", "time_offset"];

/// Picks the CSV column order: group's variable order, skipping
/// `base_time`/`time`/`time_offset`, variables with more than one
/// dimension whose dtype isn't `Char`, and variables not indexed by the
/// sample (time) axis at all.
fn csv_columns(group: &Group) -> Vec<String> {
    let mut names = group.variable_names();
    names.sort();
    names
        .into_iter()
        .filter(|name| !EXCLUDED_NAMES.contains(&name.as_str()))
        .filter(|name| {
            let Ok(var) = group.get_variable(name) else {
                return false;
            };
            if var.sample_axis().is_none() {
                return false;
            }
            var.dimensions.len() == 1 || var.dtype == DataType::Char
        })
        .collect()
}

/// Renders one cell. Character (`Char`) data is decoded as Latin-1 bytes
/// to a string; anything else is its scalar `f64` formatted with `{}`.
fn render_cell(var: &Variable, index: usize) -> Result<String> {
    if var.dtype == DataType::Char {
        let bytes = var.samples().get(index).cloned().unwrap_or_default();
        return Ok(bytes.iter().map(|&b| b as char).collect());
    }
    Ok(format!("{}", var.scalar_sample_as_f64(index)?))
}

/// Quotes a cell if it contains a comma or a double quote. The original
/// ingest's lossy fallback — replacing an embedded quote with a single
/// quote rather than properly doubling it, so a quoted cell never needs
/// re-scanning — is kept here for output compatibility with downstream
/// consumers that expect it, but now warns every time it fires.
fn quote_cell(raw: &str) -> String {
    if !raw.contains(',') && !raw.contains('"') {
        return raw.to_string();
    }
    if raw.contains('"') {
        tracing::warn!(cell = raw, "CSV cell contains an embedded quote; using lossy escaping");
    }
    let escaped = raw.replace('"', "'");
    format!("\"{escaped}\"")
}

/// Writes `group` as CSV to `writer`: a header row of column names,
/// followed by one row per sample of the sample (time) axis.
///
/// Uses the `csv` crate's writer with [`QuoteStyle::Never`] so our own
/// [`quote_cell`] escaping is emitted verbatim rather than re-escaped by
/// the writer's standard RFC 4180 quoting.
pub fn write_csv(group: &Group, writer: impl std::io::Write) -> Result<()> {
    let columns = csv_columns(group);
    let mut csv_writer = WriterBuilder::new().quote_style(QuoteStyle::Never).from_writer(writer);
    csv_writer.write_record(&columns)?;

    let nrows = columns
        .iter()
        .filter_map(|name| group.get_variable(name).ok())
        .map(Variable::sample_count)
        .max()
        .unwrap_or(0);

    for row in 0..nrows {
        let mut cells = Vec::with_capacity(columns.len());
        for name in &columns {
            let var = group.get_variable(name)?;
            let raw = render_cell(var, row)?;
            cells.push(quote_cell(&raw));
        }
        csv_writer.write_record(&cells)?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Renders `group` as a CSV string (a thin wrapper over [`write_csv`] for
/// callers that don't have a `Write` sink handy, e.g. tests).
pub fn render_csv(group: &Group) -> Result<String> {
    let mut buf = Vec::new();
    write_csv(group, &mut buf)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ingest_model::encode_scalar_f64;

    fn sample_group() -> Group {
        let mut g = Group::new("ds");
        g.define_dimension("time", 0, true).unwrap();

        let mut time = Variable::new("time", DataType::Double, vec!["time".into()]);
        let mut temp = Variable::new("temp", DataType::Float, vec!["time".into()]);
        for (t, v) in [(0.0, 1.5), (60.0, 2.5)] {
            time.push_sample(encode_scalar_f64(DataType::Double, t));
            temp.push_sample(encode_scalar_f64(DataType::Float, v));
        }
        g.define_variable(time).unwrap();
        g.define_variable(temp).unwrap();
        g
    }

    #[test]
    fn excludes_time_and_orders_columns_alphabetically() {
        let g = sample_group();
        assert_eq!(csv_columns(&g), vec!["temp".to_string()]);
    }

    #[test]
    fn excludes_multi_dim_non_char_variables() {
        let mut g = sample_group();
        g.define_dimension("level", 4, false).unwrap();
        let spectra = Variable::new("spectra", DataType::Float, vec!["time".into(), "level".into()]);
        g.define_variable(spectra).unwrap();
        assert_eq!(csv_columns(&g), vec!["temp".to_string()]);
    }

    #[test]
    fn renders_header_and_rows() {
        let g = sample_group();
        let csv_text = render_csv(&g).unwrap();
        let mut lines = csv_text.lines();
        assert_eq!(lines.next(), Some("temp"));
        assert_eq!(lines.next(), Some("1.5"));
        assert_eq!(lines.next(), Some("2.5"));
    }

    #[test]
    fn quotes_cells_containing_commas() {
        assert_eq!(quote_cell("a,b"), "\"a,b\"");
        assert_eq!(quote_cell("plain"), "plain");
    }

    #[test]
    fn lossily_escapes_embedded_quotes() {
        assert_eq!(quote_cell("a\"b"), "\"a'b\"");
    }
}
