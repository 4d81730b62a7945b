use chrono::{DateTime, Utc};
use std::fmt;
use uuid::Uuid;

use super::{HasBulk, HasFlags, HasNutrientRatios, Subject, SubjectKind};
use crate::bulk::BulkProfile;
use crate::catalog::Catalog;
use crate::error::{non_negative, EditError};
use crate::flag_set::FlagSet;
use crate::ratios::NutrientRatioSet;
use crate::units::display_quantity;

/// A basic food with its own nutrient ratios, flags and an optional price.
#[derive(Debug, Clone, PartialEq)]
pub struct Ingredient {
    pub id: Uuid,
    pub name: String,
    pub(crate) bulk: BulkProfile,
    pub(crate) nutrients: NutrientRatioSet,
    pub(crate) flags: FlagSet,
    /// Price of the reference quantity.
    pub(crate) cost: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Ingredient {
    /// A new ingredient quoted per 100 g with every nutrient and flag undefined.
    pub fn new(catalog: &Catalog, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            bulk: BulkProfile::new(),
            nutrients: NutrientRatioSet::new(catalog.nutrients()),
            flags: FlagSet::new(catalog.flags()),
            cost: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn cost(&self) -> Option<f64> {
        self.cost
    }

    pub fn set_cost(&mut self, cost: f64) -> Result<(), EditError> {
        self.cost = Some(non_negative(cost)?);
        self.touch();
        Ok(())
    }

    pub fn clear_cost(&mut self) {
        self.cost = None;
        self.touch();
    }
}

impl HasBulk for Ingredient {
    fn bulk(&self) -> &BulkProfile {
        &self.bulk
    }

    fn bulk_mut(&mut self) -> &mut BulkProfile {
        &mut self.bulk
    }
}

impl HasNutrientRatios for Ingredient {
    fn nutrient_ratios(&self) -> &NutrientRatioSet {
        &self.nutrients
    }

    fn nutrient_ratios_mut(&mut self) -> &mut NutrientRatioSet {
        &mut self.nutrients
    }
}

impl HasFlags for Ingredient {
    fn flags(&self) -> &FlagSet {
        &self.flags
    }

    fn flags_mut(&mut self) -> &mut FlagSet {
        &mut self.flags
    }
}

impl Subject for Ingredient {
    fn kind(&self) -> SubjectKind {
        SubjectKind::Ingredient
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    fn as_nutrient_ratios(&self) -> Option<&dyn HasNutrientRatios> {
        Some(self)
    }

    fn as_nutrient_ratios_mut(&mut self) -> Option<&mut dyn HasNutrientRatios> {
        Some(self)
    }

    fn as_flags(&self) -> Option<&dyn HasFlags> {
        Some(self)
    }

    fn as_flags_mut(&mut self) -> Option<&mut dyn HasFlags> {
        Some(self)
    }
}

impl fmt::Display for Ingredient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.name)?;
        writeln!(f, "{}", "=".repeat(self.name.len()))?;
        writeln!(f, "Per: {}", self.bulk)?;
        if let Some(cost) = self.cost {
            writeln!(f, "Cost: {}", display_quantity(cost))?;
        }

        super::write_ratios_and_flags(f, self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::test_support::fixture;
    use crate::flag_set::FlagValue;

    #[test]
    fn test_ingredient_new() {
        let catalog = fixture();
        let ingredient = Ingredient::new(&catalog, "Oats");
        assert_eq!(ingredient.name(), "Oats");
        assert_eq!(ingredient.kind(), SubjectKind::Ingredient);
        assert_eq!(ingredient.bulk().reference_quantity(), 100.0);
        assert_eq!(ingredient.nutrient_ratios().defined().count(), 0);
        assert_eq!(ingredient.flags().get("vegan"), FlagValue::Undefined);
        assert!(ingredient.cost().is_none());
    }

    #[test]
    fn test_ingredient_capabilities() {
        let catalog = fixture();
        let mut ingredient = Ingredient::new(&catalog, "Oats");
        assert!(ingredient.as_nutrient_ratios().is_some());
        assert!(ingredient.as_flags().is_some());
        assert!(ingredient.as_flags_mut().is_some());
    }

    #[test]
    fn test_set_cost() {
        let catalog = fixture();
        let mut ingredient = Ingredient::new(&catalog, "Oats");
        ingredient.set_cost(1.25).unwrap();
        assert_eq!(ingredient.cost(), Some(1.25));

        ingredient.set_cost(0.0).unwrap();
        assert_eq!(ingredient.cost(), Some(0.0));

        assert_eq!(
            ingredient.set_cost(-1.0),
            Err(EditError::InvalidQuantity(-1.0))
        );
        assert_eq!(ingredient.cost(), Some(0.0));

        ingredient.clear_cost();
        assert!(ingredient.cost().is_none());
    }

    #[test]
    fn test_ingredient_display() {
        let catalog = fixture();
        let mut ingredient = Ingredient::new(&catalog, "Beer");
        ingredient
            .nutrient_ratios_mut()
            .set_ratio(catalog.nutrients(), "alcohol", 0.05)
            .unwrap();
        let output = format!("{}", ingredient);
        assert!(output.contains("Beer\n===="));
        assert!(output.contains("Per: 100 g"));
        assert!(output.contains("  - alcohol: 0.05"));
    }
}
