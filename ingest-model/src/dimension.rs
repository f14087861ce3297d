//! Dimensions (spec §3 "Dimension").

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dimension {
    pub name: String,
    length: usize,
    pub is_unlimited: bool,
    locked: bool,
}

impl Dimension {
    #[must_use]
    pub fn new(name: impl Into<String>, length: usize, is_unlimited: bool) -> Self {
        Self {
            name: name.into(),
            length,
            is_unlimited,
            locked: false,
        }
    }

    #[must_use]
    pub fn length(&self) -> usize {
        self.length
    }

    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn lock(&mut self) {
        self.locked = true;
    }

    /// Grows an unlimited dimension to at least `new_length`. Locked
    /// dimensions may still grow via data writes (spec §3: "mutating data
    /// is still allowed" while a group's definition is locked) but a
    /// non-unlimited dimension can never grow past its defined length.
    pub fn grow_to(&mut self, new_length: usize) -> bool {
        if new_length <= self.length {
            return true;
        }
        if !self.is_unlimited {
            return false;
        }
        self.length = new_length;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unlimited_dimension_grows() {
        let mut d = Dimension::new("time", 0, true);
        assert!(d.grow_to(10));
        assert_eq!(d.length(), 10);
    }

    #[test]
    fn fixed_dimension_rejects_growth() {
        let mut d = Dimension::new("wavelength", 64, false);
        assert!(!d.grow_to(65));
        assert_eq!(d.length(), 64);
    }

    #[test]
    fn locked_dimension_still_grows_via_data_writes() {
        let mut d = Dimension::new("time", 5, true);
        d.lock();
        assert!(d.grow_to(6));
    }
}
