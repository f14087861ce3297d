//! Groups (spec §3 "Group", spec §4.1 Dataset Model operations).

use crate::attribute::Attribute;
use crate::companion::{bounds_name, qc_name};
use crate::dimension::Dimension;
use crate::error::{ModelError, Result};
use crate::variable::{DataType, SampleBytes, Variable};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// A named container holding dimensions, attributes, variables, and child
/// groups. Owns the lifetime of its children exclusively (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Group {
    pub name: String,
    dimensions: FxHashMap<String, Dimension>,
    variables: FxHashMap<String, Variable>,
    attributes: FxHashMap<String, Attribute>,
    children: FxHashMap<String, Group>,
    definition_locked: bool,
}

impl Group {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            dimensions: FxHashMap::default(),
            variables: FxHashMap::default(),
            attributes: FxHashMap::default(),
            children: FxHashMap::default(),
            definition_locked: false,
        }
    }

    #[must_use]
    pub fn is_definition_locked(&self) -> bool {
        self.definition_locked
    }

    pub fn lock_definition(&mut self) {
        self.definition_locked = true;
    }

    pub fn unlock_definition(&mut self) {
        self.definition_locked = false;
    }

    // ---- dimensions ----------------------------------------------------

    pub fn define_dimension(&mut self, name: impl Into<String>, length: usize, is_unlimited: bool) -> Result<()> {
        let name = name.into();
        if self.definition_locked {
            return Err(ModelError::GroupLocked(self.name.clone()));
        }
        self.dimensions
            .insert(name.clone(), Dimension::new(name, length, is_unlimited));
        Ok(())
    }

    #[must_use]
    pub fn get_dimension(&self, name: &str) -> Option<&Dimension> {
        self.dimensions.get(name)
    }

    pub fn get_dimension_mut(&mut self, name: &str) -> Option<&mut Dimension> {
        self.dimensions.get_mut(name)
    }

    #[must_use]
    pub fn dimensions(&self) -> impl Iterator<Item = &Dimension> {
        self.dimensions.values()
    }

    // ---- variables -------------------------------------------------------

    pub fn define_variable(&mut self, variable: Variable) -> Result<()> {
        if self.definition_locked {
            return Err(ModelError::GroupLocked(self.name.clone()));
        }
        for dim_name in &variable.dimensions {
            if !self.dimensions.contains_key(dim_name) {
                return Err(ModelError::NoSuchName {
                    kind: "dimension",
                    name: dim_name.clone(),
                    group: self.name.clone(),
                });
            }
        }
        self.variables.insert(variable.name.clone(), variable);
        Ok(())
    }

    pub fn get_variable(&self, name: &str) -> Result<&Variable> {
        self.variables.get(name).ok_or_else(|| ModelError::NoSuchName {
            kind: "variable",
            name: name.to_string(),
            group: self.name.clone(),
        })
    }

    pub fn get_variable_mut(&mut self, name: &str) -> Result<&mut Variable> {
        let group_name = self.name.clone();
        self.variables
            .get_mut(name)
            .ok_or_else(|| ModelError::NoSuchName {
                kind: "variable",
                name: name.to_string(),
                group: group_name,
            })
    }

    pub fn has_variable(&self, name: &str) -> bool {
        self.variables.contains_key(name)
    }

    #[must_use]
    pub fn variables(&self) -> impl Iterator<Item = &Variable> {
        self.variables.values()
    }

    pub fn variable_names(&self) -> Vec<String> {
        self.variables.keys().cloned().collect()
    }

    /// Appends one sample to `var_name`, auto-growing its (unlimited)
    /// sample-axis dimension. Fails with [`ModelError::DimensionLocked`]
    /// if the axis is not unlimited and already at capacity, or if the
    /// dimension itself is locked and not unlimited.
    pub fn append_sample(&mut self, var_name: &str, bytes: SampleBytes) -> Result<()> {
        let dim_name = self
            .get_variable(var_name)?
            .sample_axis()
            .map(str::to_string)
            .ok_or_else(|| ModelError::NoSuchName {
                kind: "sample axis",
                name: var_name.to_string(),
                group: self.name.clone(),
            })?;

        let next_index = self.get_variable(var_name)?.sample_count();

        let dim = self
            .dimensions
            .get_mut(&dim_name)
            .ok_or_else(|| ModelError::NoSuchName {
                kind: "dimension",
                name: dim_name.clone(),
                group: self.name.clone(),
            })?;
        if !dim.grow_to(next_index + 1) {
            return Err(ModelError::DimensionLocked(dim_name));
        }

        self.get_variable_mut(var_name)?.push_sample(bytes);
        Ok(())
    }

    // ---- attributes --------------------------------------------------

    pub fn define_attribute(&mut self, attr: Attribute) -> Result<()> {
        if self.definition_locked {
            return Err(ModelError::GroupLocked(self.name.clone()));
        }
        self.attributes.insert(attr.name.clone(), attr);
        Ok(())
    }

    #[must_use]
    pub fn get_attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.get(name)
    }

    #[must_use]
    pub fn attributes(&self) -> impl Iterator<Item = &Attribute> {
        self.attributes.values()
    }

    // ---- children --------------------------------------------------

    pub fn add_child(&mut self, child: Group) -> Result<()> {
        if self.definition_locked {
            return Err(ModelError::GroupLocked(self.name.clone()));
        }
        self.children.insert(child.name.clone(), child);
        Ok(())
    }

    #[must_use]
    pub fn get_child(&self, name: &str) -> Option<&Group> {
        self.children.get(name)
    }

    pub fn get_child_mut(&mut self, name: &str) -> Option<&mut Group> {
        self.children.get_mut(name)
    }

    pub fn remove_child(&mut self, name: &str) -> Option<Group> {
        self.children.remove(name)
    }

    #[must_use]
    pub fn children(&self) -> impl Iterator<Item = &Group> {
        self.children.values()
    }

    pub fn children_mut(&mut self) -> impl Iterator<Item = &mut Group> {
        self.children.values_mut()
    }

    pub fn child_names(&self) -> Vec<String> {
        self.children.keys().cloned().collect()
    }

    // ---- companions --------------------------------------------------

    /// The `qc_V` companion variable of `var_name`, if defined in this
    /// group.
    #[must_use]
    pub fn get_qc_variable(&self, var_name: &str) -> Option<&Variable> {
        self.variables.get(&qc_name(var_name))
    }

    /// The `V_bounds` companion variable of `var_name`, if defined.
    #[must_use]
    pub fn get_bounds_variable(&self, var_name: &str) -> Option<&Variable> {
        self.variables.get(&bounds_name(var_name))
    }

    /// A coordinate variable is one named identically to one of this
    /// group's dimensions.
    #[must_use]
    pub fn get_coordinate_variable(&self, dim_name: &str) -> Option<&Variable> {
        self.variables.get(dim_name)
    }

    // ---- copy / compare (spec §4.1) --------------------------------

    /// Deep-copies the entire group (dimensions, attributes, variables,
    /// children) into a fresh, unlocked `Group`.
    #[must_use]
    pub fn deep_copy(&self) -> Self {
        let mut copy = self.clone();
        copy.definition_locked = false;
        copy
    }

    /// Structural comparison used by the observation merger (spec §4.3):
    /// equal dimension name sets and `is_unlimited` flags, equal static
    /// (non-unlimited) dimension lengths, and equal variable shapes /
    /// dimension ordering. Does not compare sample data.
    #[must_use]
    pub fn structurally_compatible(&self, other: &Group) -> bool {
        let mut self_dims: Vec<_> = self.dimensions.values().collect();
        let mut other_dims: Vec<_> = other.dimensions.values().collect();
        self_dims.sort_by(|a, b| a.name.cmp(&b.name));
        other_dims.sort_by(|a, b| a.name.cmp(&b.name));

        if self_dims.len() != other_dims.len() {
            return false;
        }
        for (a, b) in self_dims.iter().zip(other_dims.iter()) {
            if a.name != b.name || a.is_unlimited != b.is_unlimited {
                return false;
            }
            if !a.is_unlimited && a.length() != b.length() {
                return false;
            }
        }

        let mut self_vars: Vec<_> = self.variables.values().collect();
        let mut other_vars: Vec<_> = other.variables.values().collect();
        self_vars.sort_by(|a, b| a.name.cmp(&b.name));
        other_vars.sort_by(|a, b| a.name.cmp(&b.name));
        if self_vars.len() != other_vars.len() {
            return false;
        }
        for (a, b) in self_vars.iter().zip(other_vars.iter()) {
            if a.name != b.name || a.dtype != b.dtype || a.dimensions != b.dimensions {
                return false;
            }
        }
        true
    }

    /// Byte-for-byte equality of all *static* (non-time-varying, i.e. not
    /// indexed by the first/unlimited dimension) variable data between
    /// two structurally compatible groups. Used by the merger to decide
    /// whether two observations may be merged (spec §4.3).
    #[must_use]
    pub fn static_data_matches(&self, other: &Group) -> bool {
        for var in self.variables.values() {
            let Some(axis) = var.sample_axis() else {
                continue;
            };
            let is_unlimited = self
                .dimensions
                .get(axis)
                .map(|d| d.is_unlimited)
                .unwrap_or(false);
            if is_unlimited {
                continue;
            }
            let Ok(other_var) = other.get_variable(&var.name) else {
                return false;
            };
            if var.samples() != other_var.samples() {
                return false;
            }
        }
        true
    }
}
