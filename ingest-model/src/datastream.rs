//! Datastream identity (spec §2 "Datastream Registry").

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DatastreamRole {
    Input,
    Output,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DatastreamFormat {
    Netcdf3,
    Csv,
    Raw,
    Jpg,
    Png,
}

/// Opaque per-datastream handle, returned by
/// [`crate::registry::DatastreamRegistry::init_datastream`]. Stable for
/// the lifetime of the registry; never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DatastreamId(pub(crate) u64);

impl fmt::Display for DatastreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ds#{}", self.0)
    }
}

/// A registered datastream: the (site, facility, class, level, role) key
/// plus its resolved flags and format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Datastream {
    pub id: DatastreamId,
    pub site: String,
    pub facility: String,
    pub class_name: String,
    pub class_level: String,
    pub role: DatastreamRole,
    pub format: DatastreamFormat,
    pub path: Option<String>,
}

impl Datastream {
    /// The canonical `site facclass.level` name used in file names and
    /// log messages, e.g. `sgpmetE13.b1`.
    #[must_use]
    pub fn dsc_name(&self) -> String {
        format!(
            "{}{}{}.{}",
            self.site, self.facility, self.class_name, self.class_level
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dsc_name_matches_conventional_layout() {
        let ds = Datastream {
            id: DatastreamId(1),
            site: "sgp".into(),
            facility: "E13".into(),
            class_name: "met".into(),
            class_level: "b1".into(),
            role: DatastreamRole::Output,
            format: DatastreamFormat::Netcdf3,
            path: None,
        };
        assert_eq!(ds.dsc_name(), "sgpmetE13.b1");
    }
}
