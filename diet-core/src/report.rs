//! Read-only summaries of a subject for front ends.

use crate::catalog::Catalog;
use crate::error::{non_negative, EditError};
use crate::ratios::NutrientRatioSet;
use crate::subject::Subject;
use crate::units::{display_quantity, Unit};

fn ratios_of<S: Subject + ?Sized>(subject: &S) -> Result<&NutrientRatioSet, EditError> {
    subject
        .as_nutrient_ratios()
        .map(|r| r.nutrient_ratios())
        .ok_or(EditError::Unsupported(subject.kind().as_str(), "nutrient ratios"))
}

/// Nutrient mass in the reference quantity, e.g. `sugar: 12.5 g per 100 g`.
pub fn nutrient_ratio_summary<S: Subject + ?Sized>(
    catalog: &Catalog,
    subject: &S,
    name: &str,
) -> Result<String, EditError> {
    let primary = catalog.nutrients().resolve_primary_name(name)?;
    let ratio = ratios_of(subject)?.get(primary);
    let bulk = subject.bulk();

    let Some(value) = ratio.ratio() else {
        return Ok(format!("{}: undefined", primary));
    };
    let grams = value * bulk.reference_grams()?;
    let amount = Unit::Gram.convert(grams, ratio.unit(), bulk.context())?;
    Ok(format!(
        "{}: {} {} per {} {}",
        primary,
        display_quantity(amount),
        ratio.unit(),
        display_quantity(bulk.reference_quantity()),
        bulk.preferred_unit()
    ))
}

/// e.g. `gluten_free: yes`.
pub fn flag_summary<S: Subject + ?Sized>(
    catalog: &Catalog,
    subject: &S,
    name: &str,
) -> Result<String, EditError> {
    let flag = catalog.flags().resolve(name)?;
    let flags = subject
        .as_flags()
        .ok_or(EditError::Unsupported(subject.kind().as_str(), "flags"))?
        .flags();
    Ok(format!("{}: {}", flag, flags.get(flag)))
}

pub fn bulk_summary<S: Subject + ?Sized>(subject: &S) -> String {
    subject.bulk().summary()
}

/// Kilocalories in the reference quantity, or `None` if no caloric nutrient
/// is defined.
///
/// A caloric nutrient is skipped when a caloric group containing it is also
/// defined, since the group's mass already includes it.
pub fn energy_per_reference<S: Subject + ?Sized>(
    catalog: &Catalog,
    subject: &S,
) -> Result<Option<f64>, EditError> {
    let nutrients = catalog.nutrients();
    let ratios = ratios_of(subject)?;

    let mut kcal_per_gram = None;
    for (name, ratio) in ratios.defined() {
        let Some(nutrient) = nutrients.get(name) else {
            continue;
        };
        if !nutrient.is_caloric() {
            continue;
        }
        let counted_by_group = nutrients.ancestors_of(name).into_iter().any(|ancestor| {
            ratios.is_defined(ancestor)
                && nutrients.get(ancestor).is_some_and(|n| n.is_caloric())
        });
        if counted_by_group {
            continue;
        }
        *kcal_per_gram.get_or_insert(0.0) += ratio * nutrient.calories_per_gram();
    }

    let reference_grams = subject.bulk().reference_grams()?;
    Ok(kcal_per_gram.map(|k| k * reference_grams))
}

/// Grams of a nutrient in `quantity` of the subject, or `None` if its ratio
/// is undefined.
pub fn nutrient_mass<S: Subject + ?Sized>(
    catalog: &Catalog,
    subject: &S,
    name: &str,
    quantity: f64,
    unit: Unit,
) -> Result<Option<f64>, EditError> {
    let primary = catalog.nutrients().resolve_primary_name(name)?;
    let ratio = ratios_of(subject)?.ratio(primary);
    let grams = subject.bulk().to_grams(non_negative(quantity)?, unit)?;
    Ok(ratio.map(|r| r * grams))
}
