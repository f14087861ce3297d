//! Per-datastream processing flags (spec §4.2).
//!
//! A small hand-rolled bitset rather than an external crate: the flag
//! set is fixed and tiny, and every bit has registry-specific default
//! logic attached to it in [`crate::registry`].

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatastreamFlags(u32);

impl DatastreamFlags {
    pub const STANDARD_QC: Self = Self(1 << 0);
    pub const FILTER_NANS: Self = Self(1 << 1);
    pub const OVERLAP_CHECK: Self = Self(1 << 2);
    pub const PRESERVE_OBS: Self = Self(1 << 3);
    pub const DISABLE_MERGE: Self = Self(1 << 4);
    pub const SKIP_TRANSFORM: Self = Self(1 << 5);
    pub const ROLLUP_TRANS_QC: Self = Self(1 << 6);
    pub const SCAN_MODE: Self = Self(1 << 7);
    pub const OBS_LOOP: Self = Self(1 << 8);
    pub const FILTER_VERSIONED_FILES: Self = Self(1 << 9);

    #[must_use]
    pub const fn empty() -> Self {
        Self(0)
    }

    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }

    #[must_use]
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn set(&mut self, other: Self) {
        self.0 |= other.0;
    }

    pub fn unset(&mut self, other: Self) {
        self.0 &= !other.0;
    }

    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    #[must_use]
    pub const fn intersection(self, other: Self) -> Self {
        Self(self.0 & other.0)
    }
}

impl std::ops::BitOr for DatastreamFlags {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

impl std::ops::BitAnd for DatastreamFlags {
    type Output = Self;
    fn bitand(self, rhs: Self) -> Self {
        self.intersection(rhs)
    }
}

impl Default for DatastreamFlags {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn union_and_intersection_behave_bitwise() {
        let a = DatastreamFlags::STANDARD_QC | DatastreamFlags::FILTER_NANS;
        assert!(a.contains(DatastreamFlags::STANDARD_QC));
        assert!(a.contains(DatastreamFlags::FILTER_NANS));
        assert!(!a.contains(DatastreamFlags::OVERLAP_CHECK));

        let b = DatastreamFlags::STANDARD_QC | DatastreamFlags::OVERLAP_CHECK;
        let both = a & b;
        assert_eq!(both, DatastreamFlags::STANDARD_QC);
    }

    #[test]
    fn unset_clears_only_the_named_bit() {
        let mut flags = DatastreamFlags::STANDARD_QC | DatastreamFlags::FILTER_NANS;
        flags.unset(DatastreamFlags::STANDARD_QC);
        assert!(!flags.contains(DatastreamFlags::STANDARD_QC));
        assert!(flags.contains(DatastreamFlags::FILTER_NANS));
    }
}
