use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::{HasBulk, HasFlags, HasNutrientRatios, Subject, SubjectKind};
use crate::bulk::BulkProfile;
use crate::catalog::Catalog;
use crate::error::{positive, EditError};
use crate::flag_set::FlagSet;
use crate::ratios::NutrientRatioSet;
use crate::units::{display_quantity, Unit};

/// One line of a recipe's ingredient list, referring to an ingredient by name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngredientLine {
    pub name: String,
    pub quantity: f64,
    pub unit: Unit,
}

impl fmt::Display for IngredientLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {}",
            display_quantity(self.quantity),
            self.unit,
            self.name
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Recipe {
    pub id: Uuid,
    pub name: String,
    pub(crate) bulk: BulkProfile,
    pub(crate) nutrients: NutrientRatioSet,
    pub(crate) flags: FlagSet,
    pub(crate) ingredients: Vec<IngredientLine>,
    pub instructions: String,
    pub servings: Option<u32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Recipe {
    pub fn new(catalog: &Catalog, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            bulk: BulkProfile::new(),
            nutrients: NutrientRatioSet::new(catalog.nutrients()),
            flags: FlagSet::new(catalog.flags()),
            ingredients: Vec::new(),
            instructions: String::new(),
            servings: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = instructions.into();
        self
    }

    pub fn with_servings(mut self, servings: u32) -> Self {
        self.servings = Some(servings);
        self
    }

    pub fn ingredients(&self) -> &[IngredientLine] {
        &self.ingredients
    }

    /// Adds an ingredient line, or replaces the quantity of an existing line
    /// with the same name (case-insensitive).
    pub fn add_ingredient(
        &mut self,
        name: impl Into<String>,
        quantity: f64,
        unit: Unit,
    ) -> Result<(), EditError> {
        let name = name.into();
        let quantity = positive(quantity)?;
        match self
            .ingredients
            .iter_mut()
            .find(|line| line.name.eq_ignore_ascii_case(&name))
        {
            Some(line) => {
                line.quantity = quantity;
                line.unit = unit;
            }
            None => self.ingredients.push(IngredientLine {
                name,
                quantity,
                unit,
            }),
        }
        self.touch();
        Ok(())
    }

    /// Removes an ingredient line by name (case-insensitive).
    pub fn remove_ingredient(&mut self, name: &str) -> bool {
        let len_before = self.ingredients.len();
        self.ingredients
            .retain(|line| !line.name.eq_ignore_ascii_case(name));
        if self.ingredients.len() != len_before {
            self.touch();
            true
        } else {
            false
        }
    }
}

impl HasBulk for Recipe {
    fn bulk(&self) -> &BulkProfile {
        &self.bulk
    }

    fn bulk_mut(&mut self) -> &mut BulkProfile {
        &mut self.bulk
    }
}

impl HasNutrientRatios for Recipe {
    fn nutrient_ratios(&self) -> &NutrientRatioSet {
        &self.nutrients
    }

    fn nutrient_ratios_mut(&mut self) -> &mut NutrientRatioSet {
        &mut self.nutrients
    }
}

impl HasFlags for Recipe {
    fn flags(&self) -> &FlagSet {
        &self.flags
    }

    fn flags_mut(&mut self) -> &mut FlagSet {
        &mut self.flags
    }
}

impl Subject for Recipe {
    fn kind(&self) -> SubjectKind {
        SubjectKind::Recipe
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

impl fmt::Display for Recipe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.name)?;
        writeln!(f, "{}", "=".repeat(self.name.len()))?;
        writeln!(f, "Per: {}", self.bulk)?;
        if let Some(servings) = self.servings {
            writeln!(f, "Servings: {}", servings)?;
        }

        if !self.ingredients.is_empty() {
            writeln!(f, "\nIngredients:")?;
            for line in &self.ingredients {
                writeln!(f, "  - {}", line)?;
            }
        }

        if !self.instructions.is_empty() {
            writeln!(f, "\nInstructions:\n{}", self.instructions)?;
        }

        super::write_ratios_and_flags(f, self)
    }
}
