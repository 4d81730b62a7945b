//! Per-subject nutrient ratios: grams of nutrient per gram of subject.
//!
//! Each nutrient is either undefined or holds a ratio in `[0, 1]`. For every
//! defined group nutrient, the defined mass of its constituents may not exceed
//! the group's own ratio by more than [`GROUP_TOLERANCE`]. An undefined
//! constituent counts as the sum of its own defined constituents, so
//! resetting a subgroup can raise its parent's total and is validated like
//! any other edit.

use std::collections::{BTreeMap, BTreeSet};

use crate::catalog::NutrientRegistry;
use crate::error::EditError;
use crate::units::Unit;

/// Constituents may exceed their group by 1% to absorb rounding on labels.
pub const GROUP_TOLERANCE: f64 = 1.01;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NutrientRatio {
    ratio: Option<f64>,
    unit: Unit,
}

impl Default for NutrientRatio {
    fn default() -> Self {
        Self {
            ratio: None,
            unit: Unit::Gram,
        }
    }
}

impl NutrientRatio {
    pub(crate) fn restore(ratio: Option<f64>, unit: Unit) -> Self {
        Self { ratio, unit }
    }

    pub fn ratio(&self) -> Option<f64> {
        self.ratio
    }

    /// Unit the nutrient mass is displayed in.
    pub fn unit(&self) -> Unit {
        self.unit
    }

    pub fn is_defined(&self) -> bool {
        self.ratio.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct NutrientRatioSet {
    ratios: BTreeMap<String, NutrientRatio>,
}

impl NutrientRatioSet {
    /// One undefined ratio per known nutrient.
    pub fn new(nutrients: &NutrientRegistry) -> Self {
        let ratios = nutrients
            .names()
            .map(|name| (name.to_string(), NutrientRatio::default()))
            .collect();
        Self { ratios }
    }

    pub(crate) fn restore(ratios: BTreeMap<String, NutrientRatio>) -> Self {
        Self { ratios }
    }

    pub fn get(&self, primary_name: &str) -> NutrientRatio {
        self.ratios.get(primary_name).copied().unwrap_or_default()
    }

    pub fn ratio(&self, primary_name: &str) -> Option<f64> {
        self.get(primary_name).ratio
    }

    pub fn is_defined(&self, primary_name: &str) -> bool {
        self.ratio(primary_name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &NutrientRatio)> {
        self.ratios.iter().map(|(name, ratio)| (name.as_str(), ratio))
    }

    /// Defined ratios only.
    pub fn defined(&self) -> impl Iterator<Item = (&str, f64)> {
        self.ratios
            .iter()
            .filter_map(|(name, r)| r.ratio.map(|ratio| (name.as_str(), ratio)))
    }

    /// Checks that setting `primary_name` to `candidate` would keep every
    /// affected group consistent. Nothing is modified.
    pub fn check_candidate(
        &self,
        nutrients: &NutrientRegistry,
        primary_name: &str,
        candidate: Option<f64>,
    ) -> Result<(), EditError> {
        let value = |name: &str| {
            if name == primary_name {
                candidate
            } else {
                self.ratio(name)
            }
        };

        let mut affected = nutrients.ancestors_of(primary_name);
        affected.insert(primary_name);
        for group in affected {
            if let Some(parent) = value(group) {
                if constituent_total(nutrients, group, &value) > parent * GROUP_TOLERANCE {
                    return Err(EditError::ChildExceedsParent {
                        parent: group.to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Validates then stores a ratio. The set is unchanged on error.
    pub fn set_ratio(
        &mut self,
        nutrients: &NutrientRegistry,
        primary_name: &str,
        ratio: f64,
    ) -> Result<(), EditError> {
        self.check_candidate(nutrients, primary_name, Some(ratio))?;
        self.commit(primary_name, Some(ratio));
        Ok(())
    }

    pub(crate) fn commit(&mut self, primary_name: &str, ratio: Option<f64>) {
        self.ratios
            .entry(primary_name.to_string())
            .or_default()
            .ratio = ratio;
    }

    /// Makes the ratio undefined again. Fails with `ChildExceedsParent` when
    /// the subgroup's own members would then overflow an enclosing group.
    pub fn reset(
        &mut self,
        nutrients: &NutrientRegistry,
        primary_name: &str,
    ) -> Result<(), EditError> {
        if !self.is_defined(primary_name) {
            return Ok(());
        }
        self.check_candidate(nutrients, primary_name, None)?;
        self.commit(primary_name, None);
        Ok(())
    }

    pub fn set_unit(&mut self, primary_name: &str, unit: Unit) -> Result<(), EditError> {
        if !unit.is_mass() {
            return Err(EditError::NotAMassUnit(unit));
        }
        self.ratios
            .entry(primary_name.to_string())
            .or_default()
            .unit = unit;
        Ok(())
    }

    /// First defined group whose constituents exceed it, if any.
    pub fn group_violation(&self, nutrients: &NutrientRegistry) -> Option<String> {
        let value = |name: &str| self.ratio(name);
        nutrients.groups().find_map(|group| {
            let parent = value(group.name())?;
            (constituent_total(nutrients, group.name(), &value) > parent * GROUP_TOLERANCE)
                .then(|| group.name().to_string())
        })
    }
}

/// Sum of the outermost defined constituents below `group`.
///
/// Undefined constituents are looked through to their own constituents. A
/// defined nutrient that sits below another counted nutrient is skipped, so
/// shared members are never counted twice.
fn constituent_total(
    nutrients: &NutrientRegistry,
    group: &str,
    value: &dyn Fn(&str) -> Option<f64>,
) -> f64 {
    let mut seen = BTreeSet::new();
    let mut frontier = BTreeSet::new();
    let mut stack: Vec<&str> = nutrients.children_of(group).iter().map(String::as_str).collect();
    while let Some(name) = stack.pop() {
        if !seen.insert(name) {
            continue;
        }
        if value(name).is_some() {
            frontier.insert(name);
        } else {
            stack.extend(nutrients.children_of(name).iter().map(String::as_str));
        }
    }

    let covered: BTreeSet<&str> = frontier
        .iter()
        .flat_map(|name| nutrients.descendants_of(name))
        .collect();
    frontier
        .iter()
        .filter(|name| !covered.contains(*name))
        .filter_map(|name| value(*name))
        .sum()
}
