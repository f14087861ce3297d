//! Datastream registry (spec §2, C2): tracks every datastream an ingest
//! run touches, assigns it a stable [`DatastreamId`], and resolves its
//! default processing flags the first time it is seen.

use crate::datastream::{Datastream, DatastreamFormat, DatastreamId, DatastreamRole};
use crate::error::{ModelError, Result};
use crate::flags::DatastreamFlags;
use crate::split::SplitPolicy;
use rustc_hash::FxHashMap;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct DatastreamKey {
    site: String,
    facility: String,
    class_name: String,
    class_level: String,
    role: DatastreamRole,
}

/// Default-flags table for [`DatastreamRegistry::init_datastream`]
/// (spec §4.2). Level `'0'` (raw) datastreams get no default flags;
/// higher input levels get versioned-file filtering; output levels get
/// overlap checking plus the per-level QC/NaN defaults.
fn default_flags(role: DatastreamRole, class_level: &str) -> DatastreamFlags {
    let mut flags = DatastreamFlags::empty();
    let is_raw = class_level == "0";

    match role {
        DatastreamRole::Input => {
            if !is_raw {
                flags.set(DatastreamFlags::FILTER_VERSIONED_FILES);
            }
        }
        DatastreamRole::Output => {
            if !is_raw {
                flags.set(DatastreamFlags::OVERLAP_CHECK);
            }
            if class_level.starts_with('a') {
                flags.set(DatastreamFlags::FILTER_NANS);
            }
            if class_level.starts_with('b') {
                flags.set(DatastreamFlags::STANDARD_QC);
                flags.set(DatastreamFlags::FILTER_NANS);
            }
        }
    }

    flags
}

#[derive(Debug, Default)]
pub struct DatastreamRegistry {
    by_key: FxHashMap<DatastreamKey, DatastreamId>,
    datastreams: FxHashMap<DatastreamId, Datastream>,
    flags: FxHashMap<DatastreamId, DatastreamFlags>,
    split_policies: FxHashMap<DatastreamId, SplitPolicy>,
    next_id: u64,
}

impl DatastreamRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a datastream if it hasn't been seen before, returning
    /// its stable id either way. Idempotent per
    /// (site, facility, class_name, class_level, role).
    pub fn init_datastream(
        &mut self,
        site: &str,
        facility: &str,
        class_name: &str,
        class_level: &str,
        role: DatastreamRole,
        format: DatastreamFormat,
    ) -> DatastreamId {
        let key = DatastreamKey {
            site: site.to_string(),
            facility: facility.to_string(),
            class_name: class_name.to_string(),
            class_level: class_level.to_string(),
            role,
        };

        if let Some(&id) = self.by_key.get(&key) {
            return id;
        }

        let id = DatastreamId(self.next_id);
        self.next_id += 1;

        let datastream = Datastream {
            id,
            site: site.to_string(),
            facility: facility.to_string(),
            class_name: class_name.to_string(),
            class_level: class_level.to_string(),
            role,
            format,
            path: None,
        };

        self.flags.insert(id, default_flags(role, class_level));
        self.split_policies.insert(id, SplitPolicy::never());
        self.datastreams.insert(id, datastream);
        self.by_key.insert(key, id);
        id
    }

    pub fn get(&self, id: DatastreamId) -> Result<&Datastream> {
        self.datastreams
            .get(&id)
            .ok_or(ModelError::UnknownDatastream(id.0))
    }

    pub fn flags(&self, id: DatastreamId) -> Result<DatastreamFlags> {
        self.flags
            .get(&id)
            .copied()
            .ok_or(ModelError::UnknownDatastream(id.0))
    }

    pub fn set_flags(&mut self, id: DatastreamId, flags: DatastreamFlags) -> Result<()> {
        if !self.datastreams.contains_key(&id) {
            return Err(ModelError::UnknownDatastream(id.0));
        }
        self.flags.insert(id, flags);
        Ok(())
    }

    pub fn split_policy(&self, id: DatastreamId) -> Result<&SplitPolicy> {
        self.split_policies
            .get(&id)
            .ok_or(ModelError::UnknownDatastream(id.0))
    }

    pub fn set_split_policy(&mut self, id: DatastreamId, policy: SplitPolicy) -> Result<()> {
        if !self.datastreams.contains_key(&id) {
            return Err(ModelError::UnknownDatastream(id.0));
        }
        self.split_policies.insert(id, policy);
        Ok(())
    }

    pub fn set_path(&mut self, id: DatastreamId, path: impl Into<String>) -> Result<()> {
        let ds = self
            .datastreams
            .get_mut(&id)
            .ok_or(ModelError::UnknownDatastream(id.0))?;
        ds.path = Some(path.into());
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Datastream> {
        self.datastreams.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_datastream_is_idempotent_per_key() {
        let mut reg = DatastreamRegistry::new();
        let a = reg.init_datastream("sgp", "E13", "met", "b1", DatastreamRole::Output, DatastreamFormat::Netcdf3);
        let b = reg.init_datastream("sgp", "E13", "met", "b1", DatastreamRole::Output, DatastreamFormat::Netcdf3);
        assert_eq!(a, b);
        assert_eq!(reg.iter().count(), 1);
    }

    #[test]
    fn distinct_roles_get_distinct_ids() {
        let mut reg = DatastreamRegistry::new();
        let input = reg.init_datastream("sgp", "E13", "met", "a1", DatastreamRole::Input, DatastreamFormat::Netcdf3);
        let output = reg.init_datastream("sgp", "E13", "met", "a1", DatastreamRole::Output, DatastreamFormat::Netcdf3);
        assert_ne!(input, output);
    }

    #[test]
    fn default_flags_match_level_conventions() {
        let mut reg = DatastreamRegistry::new();

        let raw_in = reg.init_datastream("sgp", "E13", "met", "0", DatastreamRole::Input, DatastreamFormat::Raw);
        assert_eq!(reg.flags(raw_in).unwrap(), DatastreamFlags::empty());

        let versioned_in = reg.init_datastream("sgp", "E13", "met", "a1", DatastreamRole::Input, DatastreamFormat::Netcdf3);
        assert!(reg.flags(versioned_in).unwrap().contains(DatastreamFlags::FILTER_VERSIONED_FILES));

        let a_level_out = reg.init_datastream("sgp", "E13", "met", "a1", DatastreamRole::Output, DatastreamFormat::Netcdf3);
        let a_flags = reg.flags(a_level_out).unwrap();
        assert!(a_flags.contains(DatastreamFlags::OVERLAP_CHECK));
        assert!(a_flags.contains(DatastreamFlags::FILTER_NANS));
        assert!(!a_flags.contains(DatastreamFlags::STANDARD_QC));

        let b_level_out = reg.init_datastream("sgp", "E13", "met", "b1", DatastreamRole::Output, DatastreamFormat::Netcdf3);
        let b_flags = reg.flags(b_level_out).unwrap();
        assert!(b_flags.contains(DatastreamFlags::STANDARD_QC));
        assert!(b_flags.contains(DatastreamFlags::FILTER_NANS));
    }

    #[test]
    fn unknown_id_is_an_error() {
        let reg = DatastreamRegistry::new();
        assert!(reg.get(DatastreamId(9999)).is_err());
    }
}
