//! Subjects are the things a user describes: ingredients and recipes.
//!
//! Each subject owns one [`BulkProfile`] and, depending on its kind, a
//! [`NutrientRatioSet`] and a [`FlagSet`]. Code that works across kinds asks
//! a subject for a capability instead of matching on its concrete type.

mod ingredient;
mod recipe;
mod record;

pub use ingredient::Ingredient;
pub use recipe::{IngredientLine, Recipe};
pub use record::{BulkRecord, NutrientRecord, RecordError, Storable, SubjectRecord};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::bulk::BulkProfile;
use crate::flag_set::FlagSet;
use crate::ratios::NutrientRatioSet;
use crate::units::display_quantity;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubjectKind {
    Ingredient,
    Recipe,
}

impl SubjectKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubjectKind::Ingredient => "ingredient",
            SubjectKind::Recipe => "recipe",
        }
    }
}

impl fmt::Display for SubjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SubjectKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ingredient" => Ok(SubjectKind::Ingredient),
            "recipe" => Ok(SubjectKind::Recipe),
            _ => Err(format!(
                "Invalid subject kind '{}'. Valid options: ingredient, recipe",
                s
            )),
        }
    }
}

pub trait HasBulk {
    fn bulk(&self) -> &BulkProfile;
    fn bulk_mut(&mut self) -> &mut BulkProfile;
}

pub trait HasNutrientRatios {
    fn nutrient_ratios(&self) -> &NutrientRatioSet;
    fn nutrient_ratios_mut(&mut self) -> &mut NutrientRatioSet;
}

pub trait HasFlags {
    fn flags(&self) -> &FlagSet;
    fn flags_mut(&mut self) -> &mut FlagSet;
}

/// A named aggregate with a bulk profile and optional capabilities.
///
/// The `as_*` queries return `None` unless the subject overrides them.
pub trait Subject: HasBulk {
    fn kind(&self) -> SubjectKind;

    fn name(&self) -> &str;

    /// Records that the subject was modified.
    fn touch(&mut self) {}

    fn as_nutrient_ratios(&self) -> Option<&dyn HasNutrientRatios> {
        None
    }

    fn as_nutrient_ratios_mut(&mut self) -> Option<&mut dyn HasNutrientRatios> {
        None
    }

    fn as_flags(&self) -> Option<&dyn HasFlags> {
        None
    }

    fn as_flags_mut(&mut self) -> Option<&mut dyn HasFlags> {
        None
    }
}

/// Display blocks for defined nutrient ratios and flags, shared by every
/// kind that has both.
fn write_ratios_and_flags<S>(f: &mut fmt::Formatter<'_>, subject: &S) -> fmt::Result
where
    S: HasNutrientRatios + HasFlags + ?Sized,
{
    let defined: Vec<_> = subject.nutrient_ratios().defined().collect();
    if !defined.is_empty() {
        writeln!(f, "\nNutrients (g per g):")?;
        for (name, ratio) in defined {
            writeln!(f, "  - {}: {}", name, display_quantity(ratio))?;
        }
    }

    let flags: Vec<_> = subject.flags().defined().collect();
    if !flags.is_empty() {
        writeln!(f, "\nFlags:")?;
        for (name, value) in flags {
            writeln!(f, "  - {}: {}", name, if value { "yes" } else { "no" })?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subject_kind_display() {
        assert_eq!(format!("{}", SubjectKind::Ingredient), "ingredient");
        assert_eq!(format!("{}", SubjectKind::Recipe), "recipe");
    }

    #[test]
    fn test_subject_kind_from_str() {
        assert_eq!(
            SubjectKind::from_str("Ingredient").unwrap(),
            SubjectKind::Ingredient
        );
        assert_eq!(SubjectKind::from_str("RECIPE").unwrap(), SubjectKind::Recipe);
        assert!(SubjectKind::from_str("meal").is_err());
    }

    #[test]
    fn test_subject_kind_json() {
        assert_eq!(
            serde_json::to_string(&SubjectKind::Recipe).unwrap(),
            "\"recipe\""
        );
    }

    #[test]
    fn test_kinds_share_nutrient_and_flag_display() {
        use crate::catalog::test_support::fixture;
        use crate::coordinator::Coordinator;
        use crate::units::Unit;

        let catalog = fixture();
        let coordinator = Coordinator::new(&catalog);
        let mut oats = Ingredient::new(&catalog, "Oats");
        let mut porridge = Recipe::new(&catalog, "Oats");
        coordinator
            .set_nutrient_ratio(&mut oats, "alcohol", 0.0, Unit::Gram, 100.0, Unit::Gram)
            .unwrap();
        coordinator
            .set_nutrient_ratio(&mut porridge, "alcohol", 0.0, Unit::Gram, 100.0, Unit::Gram)
            .unwrap();

        let expected = concat!(
            "\nNutrients (g per g):\n  - alcohol: 0\n",
            "\nFlags:\n  - alcohol_free: yes\n  - contains_alcohol: no\n"
        );
        assert!(oats.to_string().ends_with(expected));
        assert!(porridge.to_string().ends_with(expected));
    }
}
