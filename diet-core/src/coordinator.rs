//! Edits that touch both nutrient ratios and flags.
//!
//! Every edit runs in three steps. The new value is computed and validated
//! against the subject without mutating it; then it is committed; then the
//! direct implications of the committed value are computed in one go and
//! applied to whatever is still undefined on the other side. Propagation is a
//! single hop and never fails: a target that is already defined, or that
//! would break its own rules, is skipped.

use serde::Serialize;
use std::fmt;

use crate::catalog::Catalog;
use crate::error::{non_negative, positive, EditError};
use crate::flag_set::{FlagSet, FlagValue};
use crate::ratios::NutrientRatioSet;
use crate::subject::Subject;
use crate::units::{display_quantity, Unit};

/// A value filled in by propagation rather than by the user.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SoftUpdate {
    Flag { flag: String, value: bool },
    Nutrient { nutrient: String, ratio: f64 },
}

impl fmt::Display for SoftUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SoftUpdate::Flag { flag, value } => {
                write!(f, "{} -> {}", flag, FlagValue::from(*value))
            }
            SoftUpdate::Nutrient { nutrient, ratio } => {
                write!(f, "{} -> {}", nutrient, display_quantity(*ratio))
            }
        }
    }
}

/// Soft updates applied after a successful edit.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Propagation {
    pub applied: Vec<SoftUpdate>,
}

impl Propagation {
    pub fn is_empty(&self) -> bool {
        self.applied.is_empty()
    }
}

pub struct Coordinator<'c> {
    catalog: &'c Catalog,
}

impl<'c> Coordinator<'c> {
    pub fn new(catalog: &'c Catalog) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &'c Catalog {
        self.catalog
    }

    /// Sets a nutrient ratio from "`nutrient_qty` of nutrient in
    /// `subject_qty` of subject", then fills in undefined flags that the new
    /// ratio decides.
    pub fn set_nutrient_ratio<S: Subject + ?Sized>(
        &self,
        subject: &mut S,
        name: &str,
        nutrient_qty: f64,
        nutrient_unit: Unit,
        subject_qty: f64,
        subject_unit: Unit,
    ) -> Result<Propagation, EditError> {
        let nutrients = self.catalog.nutrients();
        let flags = self.catalog.flags();

        let ratios = subject
            .as_nutrient_ratios()
            .ok_or(EditError::Unsupported(subject.kind().as_str(), "nutrient ratios"))?
            .nutrient_ratios();
        let primary = nutrients.resolve_primary_name(name)?;

        // Conversions can overflow to infinity or underflow to zero grams.
        let nutrient_grams = subject
            .bulk()
            .to_grams(non_negative(nutrient_qty)?, nutrient_unit)?;
        non_negative(nutrient_grams).map_err(|_| EditError::InvalidQuantity(nutrient_qty))?;
        let subject_grams = subject
            .bulk()
            .to_grams(positive(subject_qty)?, subject_unit)?;
        positive(subject_grams).map_err(|_| EditError::InvalidQuantity(subject_qty))?;
        let ratio = nutrient_grams / subject_grams;
        if nutrient_qty > 0.0 && ratio == 0.0 {
            return Err(EditError::InvalidQuantity(nutrient_qty));
        }
        if ratio > 1.0 {
            return Err(EditError::RatioAboveOne(ratio));
        }

        ratios.check_candidate(nutrients, primary, Some(ratio))?;
        if let Some(flag_set) = subject.as_flags().map(|f| f.flags()) {
            for link in flags.flags_implied_by(primary) {
                if let Some(value) = flag_set.get(&link.flag).as_bool() {
                    if link.polarity.conflicts(value, ratio) {
                        return Err(EditError::FlagNutrientConflict {
                            flag: link.flag.clone(),
                            nutrient: primary.to_string(),
                        });
                    }
                }
            }
        }

        if let Some(target) = subject.as_nutrient_ratios_mut() {
            target.nutrient_ratios_mut().commit(primary, Some(ratio));
        }
        tracing::debug!(nutrient = primary, ratio, subject = subject.name(), "Nutrient ratio set");

        let planned = self.plan_flag_updates(&*subject, primary, ratio);
        let propagation = apply(subject, planned);
        subject.touch();
        Ok(propagation)
    }

    /// Makes a nutrient ratio undefined again. Nothing propagates. The
    /// subject is unchanged if an enclosing group would overflow.
    pub fn reset_nutrient_ratio<S: Subject + ?Sized>(
        &self,
        subject: &mut S,
        name: &str,
    ) -> Result<(), EditError> {
        let nutrients = self.catalog.nutrients();
        let primary = nutrients.resolve_primary_name(name)?;
        let kind = subject.kind().as_str();
        subject
            .as_nutrient_ratios_mut()
            .ok_or(EditError::Unsupported(kind, "nutrient ratios"))?
            .nutrient_ratios_mut()
            .reset(nutrients, primary)?;
        subject.touch();
        Ok(())
    }

    pub fn set_nutrient_unit<S: Subject + ?Sized>(
        &self,
        subject: &mut S,
        name: &str,
        unit: Unit,
    ) -> Result<(), EditError> {
        let primary = self.catalog.nutrients().resolve_primary_name(name)?;
        let kind = subject.kind().as_str();
        subject
            .as_nutrient_ratios_mut()
            .ok_or(EditError::Unsupported(kind, "nutrient ratios"))?
            .nutrient_ratios_mut()
            .set_unit(primary, unit)?;
        subject.touch();
        Ok(())
    }

    /// Sets a flag, rejecting values that contradict defined nutrient ratios,
    /// then zeroes undefined nutrients the flag rules out.
    pub fn set_flag<S: Subject + ?Sized>(
        &self,
        subject: &mut S,
        name: &str,
        value: FlagValue,
    ) -> Result<Propagation, EditError> {
        let flags = self.catalog.flags();
        let ratios = subject.as_nutrient_ratios().map(|r| r.nutrient_ratios());
        let flag_set = subject
            .as_flags()
            .ok_or(EditError::Unsupported(subject.kind().as_str(), "flags"))?
            .flags();
        let flag = flag_set.check(flags, name, value, ratios)?;

        if let Some(target) = subject.as_flags_mut() {
            target.flags_mut().commit(flag, value);
        }
        tracing::debug!(flag, %value, subject = subject.name(), "Flag set");

        let planned = match value.as_bool() {
            Some(value) => self.plan_nutrient_updates(&*subject, flag, value),
            None => Vec::new(),
        };
        let propagation = apply(subject, planned);
        subject.touch();
        Ok(propagation)
    }

    /// Undefined flags whose value follows from the ratio just committed.
    fn plan_flag_updates<S: Subject + ?Sized>(
        &self,
        subject: &S,
        nutrient: &str,
        ratio: f64,
    ) -> Vec<SoftUpdate> {
        let flags = self.catalog.flags();
        let (Some(flag_set), Some(ratios)) = (
            subject.as_flags().map(|f| f.flags()),
            subject.as_nutrient_ratios().map(|r| r.nutrient_ratios()),
        ) else {
            return Vec::new();
        };

        let mut planned = Vec::new();
        for link in flags.flags_implied_by(nutrient) {
            if flag_set.get(&link.flag).is_defined() {
                tracing::debug!(flag = %link.flag, "Flag already defined, not propagating");
                continue;
            }
            let value = link.polarity.flag_value_for(ratio);
            // The flag may constrain other nutrients that are already defined.
            if let Err(err) = flag_set.check(flags, &link.flag, value.into(), Some(ratios)) {
                tracing::debug!(flag = %link.flag, error = %err, "Skipping flag propagation");
                continue;
            }
            planned.push(SoftUpdate::Flag {
                flag: link.flag.clone(),
                value,
            });
        }
        planned
    }

    /// Undefined nutrients that a flag value forces to zero.
    fn plan_nutrient_updates<S: Subject + ?Sized>(
        &self,
        subject: &S,
        flag: &str,
        value: bool,
    ) -> Vec<SoftUpdate> {
        let flags = self.catalog.flags();
        let Some(ratios) = subject.as_nutrient_ratios().map(|r| r.nutrient_ratios()) else {
            return Vec::new();
        };
        let flag_set = subject.as_flags().map(|f| f.flags());

        let mut planned = Vec::new();
        for implication in flags.implications_for(flag) {
            let nutrient = implication.nutrient.as_str();
            if !implication.polarity.requires_zero(value) {
                continue;
            }
            if ratios.is_defined(nutrient) {
                tracing::debug!(nutrient, "Nutrient already defined, not propagating");
                continue;
            }
            if let Err(err) = zero_is_allowed(self.catalog, ratios, flag_set, nutrient) {
                tracing::debug!(nutrient, error = %err, "Skipping nutrient propagation");
                continue;
            }
            planned.push(SoftUpdate::Nutrient {
                nutrient: nutrient.to_string(),
                ratio: 0.0,
            });
        }
        planned
    }
}

/// Whether setting `nutrient` to zero keeps its groups and every defined flag
/// on it consistent.
fn zero_is_allowed(
    catalog: &Catalog,
    ratios: &NutrientRatioSet,
    flag_set: Option<&FlagSet>,
    nutrient: &str,
) -> Result<(), EditError> {
    ratios.check_candidate(catalog.nutrients(), nutrient, Some(0.0))?;
    let Some(flag_set) = flag_set else {
        return Ok(());
    };
    for link in catalog.flags().flags_implied_by(nutrient) {
        if let Some(value) = flag_set.get(&link.flag).as_bool() {
            if link.polarity.conflicts(value, 0.0) {
                return Err(EditError::FlagNutrientConflict {
                    flag: link.flag.clone(),
                    nutrient: nutrient.to_string(),
                });
            }
        }
    }
    Ok(())
}

/// Writes planned soft updates in a single pass.
fn apply<S: Subject + ?Sized>(subject: &mut S, planned: Vec<SoftUpdate>) -> Propagation {
    for update in &planned {
        match update {
            SoftUpdate::Flag { flag, value } => {
                if let Some(target) = subject.as_flags_mut() {
                    target.flags_mut().commit(flag, FlagValue::from(*value));
                }
            }
            SoftUpdate::Nutrient { nutrient, ratio } => {
                if let Some(target) = subject.as_nutrient_ratios_mut() {
                    target.nutrient_ratios_mut().commit(nutrient, Some(*ratio));
                }
            }
        }
        tracing::debug!(update = %update, "Propagated");
    }
    Propagation { applied: planned }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bulk::BulkProfile;
    use crate::catalog::test_support::fixture;
    use crate::subject::{HasBulk, HasFlags, HasNutrientRatios, Ingredient, SubjectKind};
    use crate::units::UnitError;

    /// A subject with flags but no nutrient ratios.
    struct Label {
        bulk: BulkProfile,
        flags: FlagSet,
    }

    impl HasBulk for Label {
        fn bulk(&self) -> &BulkProfile {
            &self.bulk
        }

        fn bulk_mut(&mut self) -> &mut BulkProfile {
            &mut self.bulk
        }
    }

    impl HasFlags for Label {
        fn flags(&self) -> &FlagSet {
            &self.flags
        }

        fn flags_mut(&mut self) -> &mut FlagSet {
            &mut self.flags
        }
    }

    impl Subject for Label {
        fn kind(&self) -> SubjectKind {
            SubjectKind::Ingredient
        }

        fn name(&self) -> &str {
            "label"
        }

        fn as_flags(&self) -> Option<&dyn HasFlags> {
            Some(self)
        }

        fn as_flags_mut(&mut self) -> Option<&mut dyn HasFlags> {
            Some(self)
        }
    }

    fn set_grams(
        coordinator: &Coordinator,
        subject: &mut Ingredient,
        nutrient: &str,
        grams: f64,
    ) -> Result<Propagation, EditError> {
        coordinator.set_nutrient_ratio(subject, nutrient, grams, Unit::Gram, 100.0, Unit::Gram)
    }

    #[test]
    fn test_zero_alcohol_marks_alcohol_free() {
        let catalog = fixture();
        let coordinator = Coordinator::new(&catalog);
        let mut beer = Ingredient::new(&catalog, "Alcohol-free beer");

        let propagation = set_grams(&coordinator, &mut beer, "alcohol", 0.0).unwrap();
        assert_eq!(beer.nutrient_ratios().ratio("alcohol"), Some(0.0));
        assert_eq!(beer.flags().get("alcohol_free"), FlagValue::True);
        assert_eq!(beer.flags().get("contains_alcohol"), FlagValue::False);
        assert_eq!(propagation.applied.len(), 2);
        assert!(propagation.applied.contains(&SoftUpdate::Flag {
            flag: "alcohol_free".to_string(),
            value: true
        }));
    }

    #[test]
    fn test_some_alcohol_clears_alcohol_free() {
        let catalog = fixture();
        let coordinator = Coordinator::new(&catalog);
        let mut beer = Ingredient::new(&catalog, "Beer");

        set_grams(&coordinator, &mut beer, "alcohol", 5.0).unwrap();
        assert_eq!(beer.nutrient_ratios().ratio("alcohol"), Some(0.05));
        assert_eq!(beer.flags().get("alcohol_free"), FlagValue::False);
        assert_eq!(beer.flags().get("contains_alcohol"), FlagValue::True);
    }

    #[test]
    fn test_flag_conflicting_with_ratio_is_rejected() {
        let catalog = fixture();
        let coordinator = Coordinator::new(&catalog);
        let mut beer = Ingredient::new(&catalog, "Beer");
        beer.nutrient_ratios_mut()
            .set_ratio(catalog.nutrients(), "alcohol", 0.05)
            .unwrap();

        let err = coordinator
            .set_flag(&mut beer, "alcohol_free", FlagValue::True)
            .unwrap_err();
        assert_eq!(
            err,
            EditError::FlagNutrientConflict {
                flag: "alcohol_free".to_string(),
                nutrient: "alcohol".to_string()
            }
        );
        assert_eq!(beer.flags().get("alcohol_free"), FlagValue::Undefined);
    }

    #[test]
    fn test_rejected_flag_keeps_previous_value() {
        let catalog = fixture();
        let coordinator = Coordinator::new(&catalog);
        let mut beer = Ingredient::new(&catalog, "Beer");
        set_grams(&coordinator, &mut beer, "alcohol", 5.0).unwrap();
        let before = beer.clone();

        assert!(coordinator
            .set_flag(&mut beer, "alcohol_free", FlagValue::True)
            .is_err());
        assert_eq!(beer, before);
    }

    #[test]
    fn test_ratio_conflicting_with_flag_is_rejected() {
        let catalog = fixture();
        let coordinator = Coordinator::new(&catalog);
        let mut juice = Ingredient::new(&catalog, "Juice");
        coordinator
            .set_flag(&mut juice, "alcohol_free", FlagValue::True)
            .unwrap();
        let before = juice.clone();

        let err = set_grams(&coordinator, &mut juice, "ethanol", 1.0).unwrap_err();
        assert!(matches!(err, EditError::FlagNutrientConflict { .. }));
        assert_eq!(juice, before);
    }

    #[test]
    fn test_flag_zeroes_undefined_nutrient() {
        let catalog = fixture();
        let coordinator = Coordinator::new(&catalog);
        let mut juice = Ingredient::new(&catalog, "Juice");

        let propagation = coordinator
            .set_flag(&mut juice, "alcohol_free", FlagValue::True)
            .unwrap();
        assert_eq!(juice.nutrient_ratios().ratio("alcohol"), Some(0.0));
        assert_eq!(
            propagation.applied,
            vec![SoftUpdate::Nutrient {
                nutrient: "alcohol".to_string(),
                ratio: 0.0
            }]
        );
        // One hop only: the zero ratio does not go on to decide other flags.
        assert_eq!(juice.flags().get("contains_alcohol"), FlagValue::Undefined);
    }

    #[test]
    fn test_flag_never_invents_nonzero_ratio() {
        let catalog = fixture();
        let coordinator = Coordinator::new(&catalog);
        let mut wine = Ingredient::new(&catalog, "Wine");

        let propagation = coordinator
            .set_flag(&mut wine, "contains_alcohol", FlagValue::True)
            .unwrap();
        assert!(propagation.is_empty());
        assert_eq!(wine.nutrient_ratios().ratio("alcohol"), None);

        let propagation = coordinator
            .set_flag(&mut wine, "alcohol_free", FlagValue::False)
            .unwrap();
        assert!(propagation.is_empty());
        assert_eq!(wine.nutrient_ratios().ratio("alcohol"), None);
    }

    #[test]
    fn test_false_nonzero_flag_zeroes_nutrient() {
        let catalog = fixture();
        let coordinator = Coordinator::new(&catalog);
        let mut water = Ingredient::new(&catalog, "Water");

        coordinator
            .set_flag(&mut water, "contains_alcohol", FlagValue::False)
            .unwrap();
        assert_eq!(water.nutrient_ratios().ratio("alcohol"), Some(0.0));
    }

    #[test]
    fn test_propagation_never_overrides_defined_values() {
        let catalog = fixture();
        let coordinator = Coordinator::new(&catalog);
        let mut water = Ingredient::new(&catalog, "Water");
        water
            .flags_mut()
            .set_flag(catalog.flags(), "contains_alcohol", FlagValue::False, None)
            .unwrap();

        let propagation = set_grams(&coordinator, &mut water, "alcohol", 0.0).unwrap();
        assert_eq!(
            propagation.applied,
            vec![SoftUpdate::Flag {
                flag: "alcohol_free".to_string(),
                value: true
            }]
        );

        water
            .nutrient_ratios_mut()
            .set_ratio(catalog.nutrients(), "gluten", 0.0)
            .unwrap();
        let propagation = coordinator
            .set_flag(&mut water, "gluten_free", FlagValue::True)
            .unwrap();
        assert!(propagation.is_empty());
    }

    #[test]
    fn test_nutrient_propagation_skips_group_violation() {
        let yaml = r#"
nutrients:
  - name: sugar
  - name: glucose
groups:
  sugar: [glucose]
flags: [sugar_free]
relations:
  - { flag: sugar_free, nutrient: sugar, polarity: zero }
"#;
        let catalog = Catalog::from_yaml(yaml).unwrap();
        let coordinator = Coordinator::new(&catalog);
        let mut syrup = Ingredient::new(&catalog, "Syrup");
        syrup
            .nutrient_ratios_mut()
            .set_ratio(catalog.nutrients(), "glucose", 0.05)
            .unwrap();

        let propagation = coordinator
            .set_flag(&mut syrup, "sugar_free", FlagValue::True)
            .unwrap();
        assert!(propagation.is_empty());
        assert_eq!(syrup.flags().get("sugar_free"), FlagValue::True);
        assert_eq!(syrup.nutrient_ratios().ratio("sugar"), None);
    }

    #[test]
    fn test_flag_propagation_skips_conflicting_flag() {
        let yaml = r#"
nutrients:
  - name: alcohol
  - name: sugar
flags: [dry]
relations:
  - { flag: dry, nutrient: alcohol, polarity: zero }
  - { flag: dry, nutrient: sugar, polarity: zero }
"#;
        let catalog = Catalog::from_yaml(yaml).unwrap();
        let coordinator = Coordinator::new(&catalog);
        let mut cordial = Ingredient::new(&catalog, "Cordial");
        cordial
            .nutrient_ratios_mut()
            .set_ratio(catalog.nutrients(), "sugar", 0.1)
            .unwrap();

        let propagation = set_grams(&coordinator, &mut cordial, "alcohol", 0.0).unwrap();
        assert!(propagation.is_empty());
        assert_eq!(cordial.flags().get("dry"), FlagValue::Undefined);
        assert_eq!(cordial.nutrient_ratios().ratio("alcohol"), Some(0.0));
    }

    #[test]
    fn test_group_violation_rolls_back() {
        let catalog = fixture();
        let coordinator = Coordinator::new(&catalog);
        let mut cereal = Ingredient::new(&catalog, "Cereal");
        set_grams(&coordinator, &mut cereal, "carbohydrate", 10.0).unwrap();
        set_grams(&coordinator, &mut cereal, "glucose", 6.0).unwrap();
        let before = cereal.clone();

        let err = coordinator
            .set_nutrient_ratio(&mut cereal, "sucrose", 6000.0, Unit::Milligram, 100.0, Unit::Gram)
            .unwrap_err();
        assert_eq!(
            err,
            EditError::ChildExceedsParent {
                parent: "carbohydrate".to_string()
            }
        );
        assert_eq!(cereal, before);
        assert_eq!(cereal.nutrient_ratios().ratio("sucrose"), None);
    }

    #[test]
    fn test_ratio_uses_bulk_conversions() {
        let catalog = fixture();
        let coordinator = Coordinator::new(&catalog);
        let mut beer = Ingredient::new(&catalog, "Beer");

        let err = coordinator
            .set_nutrient_ratio(&mut beer, "alcohol", 4.0, Unit::Gram, 100.0, Unit::Millilitre)
            .unwrap_err();
        assert_eq!(err, EditError::Unit(UnitError::MissingDensity));

        beer.bulk_mut()
            .set_density(1030.0, Unit::Gram, 1.0, Unit::Litre)
            .unwrap();
        coordinator
            .set_nutrient_ratio(&mut beer, "alcohol", 4.0, Unit::Gram, 100.0, Unit::Millilitre)
            .unwrap();
        let ratio = beer.nutrient_ratios().ratio("alcohol").unwrap();
        assert!((ratio - 4.0 / 103.0).abs() < 1e-9);
    }

    #[test]
    fn test_invalid_quantities() {
        let catalog = fixture();
        let coordinator = Coordinator::new(&catalog);
        let mut oats = Ingredient::new(&catalog, "Oats");

        assert_eq!(
            coordinator.set_nutrient_ratio(&mut oats, "protein", 10.0, Unit::Gram, 0.0, Unit::Gram),
            Err(EditError::InvalidQuantity(0.0))
        );
        assert_eq!(
            set_grams(&coordinator, &mut oats, "protein", -1.0),
            Err(EditError::InvalidQuantity(-1.0))
        );
        assert_eq!(
            set_grams(&coordinator, &mut oats, "protein", 150.0),
            Err(EditError::RatioAboveOne(1.5))
        );
        assert_eq!(
            set_grams(&coordinator, &mut oats, "vitamin_q", 1.0),
            Err(EditError::UnknownNutrient("vitamin_q".to_string()))
        );
        assert_eq!(oats.nutrient_ratios().defined().count(), 0);
    }

    #[test]
    fn test_overflowing_conversions_are_rejected() {
        let catalog = fixture();
        let coordinator = Coordinator::new(&catalog);
        let mut beer = Ingredient::new(&catalog, "Beer");
        let before = beer.clone();

        assert_eq!(
            coordinator.set_nutrient_ratio(
                &mut beer,
                "alcohol",
                1e306,
                Unit::Kilogram,
                1e306,
                Unit::Kilogram
            ),
            Err(EditError::InvalidQuantity(1e306))
        );
        assert_eq!(
            coordinator.set_nutrient_ratio(
                &mut beer,
                "alcohol",
                0.0,
                Unit::Gram,
                5e-324,
                Unit::Microgram
            ),
            Err(EditError::InvalidQuantity(5e-324))
        );
        // A nonzero amount must not round down to an exact zero.
        assert_eq!(
            coordinator.set_nutrient_ratio(
                &mut beer,
                "alcohol",
                1e-300,
                Unit::Gram,
                1e300,
                Unit::Gram
            ),
            Err(EditError::InvalidQuantity(1e-300))
        );
        assert_eq!(beer, before);
        assert_eq!(beer.flags().get("alcohol_free"), FlagValue::Undefined);
    }

    #[test]
    fn test_reset_rejected_when_parent_would_overflow() {
        let catalog = fixture();
        let coordinator = Coordinator::new(&catalog);
        let mut cereal = Ingredient::new(&catalog, "Cereal");
        for (name, grams) in [
            ("carbohydrate", 20.0),
            ("sugar", 10.0),
            ("glucose", 5.0),
            ("sucrose", 5.08),
            ("starch", 10.15),
        ] {
            set_grams(&coordinator, &mut cereal, name, grams).unwrap();
        }
        let before = cereal.clone();

        let err = coordinator
            .reset_nutrient_ratio(&mut cereal, "sugar")
            .unwrap_err();
        assert_eq!(
            err,
            EditError::ChildExceedsParent {
                parent: "carbohydrate".to_string()
            }
        );
        assert_eq!(cereal, before);
    }

    #[test]
    fn test_group_invariant_across_mixed_edits() {
        let yaml = r#"
nutrients:
  - name: carbohydrate
  - name: sugar
  - name: glucose
  - name: sucrose
  - name: starch
groups:
  carbohydrate: [sugar, starch]
  sugar: [glucose, sucrose]
flags: [sugar_free, starch_free]
relations:
  - { flag: sugar_free, nutrient: sugar, polarity: zero }
  - { flag: sugar_free, nutrient: glucose, polarity: zero }
  - { flag: sugar_free, nutrient: sucrose, polarity: zero }
  - { flag: starch_free, nutrient: starch, polarity: zero }
"#;
        enum Step {
            Set(&'static str, f64),
            Reset(&'static str),
            Flag(&'static str, FlagValue),
        }
        use Step::*;

        let catalog = Catalog::from_yaml(yaml).unwrap();
        let coordinator = Coordinator::new(&catalog);
        let mut cereal = Ingredient::new(&catalog, "Cereal");

        let steps = [
            Set("carbohydrate", 20.0),
            Flag("sugar_free", FlagValue::True),
            Set("glucose", 5.0),
            Flag("sugar_free", FlagValue::Undefined),
            Reset("sugar"),
            Set("glucose", 5.0),
            Set("starch", 15.0),
            Set("sugar", 4.0),
            Set("sugar", 5.0),
            Reset("carbohydrate"),
            Flag("starch_free", FlagValue::True),
            Reset("starch"),
            Flag("starch_free", FlagValue::True),
            Set("carbohydrate", 5.0),
            Reset("sugar"),
            Set("sucrose", 1.0),
            Reset("glucose"),
        ];
        let mut succeeded = 0;
        for (index, step) in steps.iter().enumerate() {
            let result = match step {
                Set(name, grams) => set_grams(&coordinator, &mut cereal, name, *grams).map(|_| ()),
                Reset(name) => coordinator.reset_nutrient_ratio(&mut cereal, name),
                Flag(name, value) => coordinator.set_flag(&mut cereal, name, *value).map(|_| ()),
            };
            if result.is_ok() {
                succeeded += 1;
                assert_eq!(
                    cereal.nutrient_ratios().group_violation(catalog.nutrients()),
                    None,
                    "after step {index}"
                );
            }
        }

        assert!(succeeded > steps.len() / 2);
        assert_eq!(cereal.flags().get("starch_free"), FlagValue::True);
        assert_eq!(cereal.nutrient_ratios().ratio("starch"), Some(0.0));
        assert_eq!(cereal.nutrient_ratios().ratio("carbohydrate"), Some(0.05));
    }

    #[test]
    fn test_reset_is_idempotent() {
        let catalog = fixture();
        let coordinator = Coordinator::new(&catalog);
        let mut oats = Ingredient::new(&catalog, "Oats");
        set_grams(&coordinator, &mut oats, "protein", 13.0).unwrap();

        coordinator.reset_nutrient_ratio(&mut oats, "Protein").unwrap();
        let once = oats.nutrient_ratios().clone();
        coordinator.reset_nutrient_ratio(&mut oats, "protein").unwrap();
        assert_eq!(oats.nutrient_ratios(), &once);
        assert_eq!(oats.nutrient_ratios().ratio("protein"), None);
    }

    #[test]
    fn test_set_nutrient_unit() {
        let catalog = fixture();
        let coordinator = Coordinator::new(&catalog);
        let mut oats = Ingredient::new(&catalog, "Oats");

        coordinator
            .set_nutrient_unit(&mut oats, "sugars", Unit::Milligram)
            .unwrap();
        assert_eq!(oats.nutrient_ratios().get("sugar").unit(), Unit::Milligram);
        assert_eq!(
            coordinator.set_nutrient_unit(&mut oats, "sugar", Unit::Cup),
            Err(EditError::NotAMassUnit(Unit::Cup))
        );
    }

    #[test]
    fn test_subject_without_nutrient_ratios() {
        let catalog = fixture();
        let coordinator = Coordinator::new(&catalog);
        let mut label = Label {
            bulk: BulkProfile::new(),
            flags: FlagSet::new(catalog.flags()),
        };

        let err = coordinator
            .set_nutrient_ratio(&mut label, "alcohol", 0.0, Unit::Gram, 100.0, Unit::Gram)
            .unwrap_err();
        assert_eq!(err, EditError::Unsupported("ingredient", "nutrient ratios"));

        let propagation = coordinator
            .set_flag(&mut label, "alcohol_free", FlagValue::True)
            .unwrap();
        assert!(propagation.is_empty());
        assert_eq!(label.flags().get("alcohol_free"), FlagValue::True);
    }

    #[test]
    fn test_soft_update_display() {
        let flag = SoftUpdate::Flag {
            flag: "vegan".to_string(),
            value: false,
        };
        assert_eq!(flag.to_string(), "vegan -> no");
        let nutrient = SoftUpdate::Nutrient {
            nutrient: "alcohol".to_string(),
            ratio: 0.0,
        };
        assert_eq!(nutrient.to_string(), "alcohol -> 0");
    }
}
