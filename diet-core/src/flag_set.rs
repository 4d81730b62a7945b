//! Per-subject dietary flag values.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::catalog::FlagRegistry;
use crate::error::EditError;
use crate::ratios::NutrientRatioSet;

/// Tri-state flag value. Serialized as `true`, `false` or `null`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "Option<bool>", into = "Option<bool>")]
pub enum FlagValue {
    True,
    False,
    #[default]
    Undefined,
}

impl FlagValue {
    pub fn as_bool(self) -> Option<bool> {
        match self {
            FlagValue::True => Some(true),
            FlagValue::False => Some(false),
            FlagValue::Undefined => None,
        }
    }

    pub fn is_defined(self) -> bool {
        self != FlagValue::Undefined
    }
}

impl From<bool> for FlagValue {
    fn from(value: bool) -> Self {
        if value {
            FlagValue::True
        } else {
            FlagValue::False
        }
    }
}

impl From<Option<bool>> for FlagValue {
    fn from(value: Option<bool>) -> Self {
        value.map_or(FlagValue::Undefined, FlagValue::from)
    }
}

impl From<FlagValue> for Option<bool> {
    fn from(value: FlagValue) -> Self {
        value.as_bool()
    }
}

impl FromStr for FlagValue {
    type Err = EditError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "true" | "yes" | "y" | "1" => Ok(FlagValue::True),
            "false" | "no" | "n" | "0" => Ok(FlagValue::False),
            "none" | "undefined" | "unset" | "null" => Ok(FlagValue::Undefined),
            _ => Err(EditError::InvalidFlagValue(s.to_string())),
        }
    }
}

impl fmt::Display for FlagValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlagValue::True => write!(f, "yes"),
            FlagValue::False => write!(f, "no"),
            FlagValue::Undefined => write!(f, "undefined"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct FlagSet {
    values: BTreeMap<String, FlagValue>,
}

impl FlagSet {
    /// Every known flag, undefined.
    pub fn new(flags: &FlagRegistry) -> Self {
        let values = flags
            .names()
            .map(|name| (name.to_string(), FlagValue::Undefined))
            .collect();
        Self { values }
    }

    pub(crate) fn restore(values: BTreeMap<String, FlagValue>) -> Self {
        Self { values }
    }

    pub fn get(&self, name: &str) -> FlagValue {
        self.values.get(name).copied().unwrap_or_default()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, FlagValue)> {
        self.values.iter().map(|(name, value)| (name.as_str(), *value))
    }

    pub fn defined(&self) -> impl Iterator<Item = (&str, bool)> {
        self.iter()
            .filter_map(|(name, value)| value.as_bool().map(|v| (name, v)))
    }

    /// Resolves `name` and checks `value` against the defined ratios of every
    /// nutrient the flag constrains. Returns the primary flag name.
    ///
    /// Subjects without nutrient ratios pass `None` and only get the name check.
    pub fn check<'r>(
        &self,
        flags: &'r FlagRegistry,
        name: &str,
        value: FlagValue,
        ratios: Option<&NutrientRatioSet>,
    ) -> Result<&'r str, EditError> {
        let flag = flags.resolve(name)?;
        let (Some(value), Some(ratios)) = (value.as_bool(), ratios) else {
            return Ok(flag);
        };

        for implication in flags.implications_for(flag) {
            if let Some(ratio) = ratios.ratio(&implication.nutrient) {
                if implication.polarity.conflicts(value, ratio) {
                    return Err(EditError::FlagNutrientConflict {
                        flag: flag.to_string(),
                        nutrient: implication.nutrient.clone(),
                    });
                }
            }
        }
        Ok(flag)
    }

    pub(crate) fn commit(&mut self, flag: &str, value: FlagValue) {
        self.values.insert(flag.to_string(), value);
    }

    /// Validates then stores a flag value. The set is unchanged on error.
    pub fn set_flag(
        &mut self,
        flags: &FlagRegistry,
        name: &str,
        value: FlagValue,
        ratios: Option<&NutrientRatioSet>,
    ) -> Result<(), EditError> {
        let flag = self.check(flags, name, value, ratios)?;
        self.commit(flag, value);
        Ok(())
    }
}
