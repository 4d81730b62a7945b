//! The serialization view of a subject.
//!
//! Records are trusted: loading one skips the edit-time validation and only
//! checks that values have the right shape. Bulk is restored first because
//! everything else is quoted against it, then nutrient ratios, then flags.
//! Names the catalog no longer knows are dropped with a warning; names it
//! has gained since the record was written start out undefined.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use uuid::Uuid;

use super::{Ingredient, IngredientLine, Recipe, Subject, SubjectKind};
use crate::bulk::BulkProfile;
use crate::catalog::Catalog;
use crate::flag_set::{FlagSet, FlagValue};
use crate::ratios::{NutrientRatio, NutrientRatioSet};
use crate::units::{Dimension, Unit, UnitError};

#[derive(Error, Debug)]
pub enum RecordError {
    #[error("Malformed subject record: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid value for '{field}': {value}")]
    InvalidValue { field: String, value: f64 },

    #[error("Invalid unit in subject record: {0}")]
    Unit(#[from] UnitError),

    #[error("Expected a {expected} record, found a {found} record")]
    WrongKind {
        expected: SubjectKind,
        found: SubjectKind,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulkRecord {
    pub preferred_unit: String,
    pub reference_quantity: f64,
    #[serde(default)]
    pub density_g_per_ml: Option<f64>,
    #[serde(default)]
    pub piece_mass_g: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NutrientRecord {
    pub ratio: Option<f64>,
    pub unit: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectRecord {
    pub kind: SubjectKind,
    pub id: Uuid,
    pub name: String,
    pub bulk: BulkRecord,
    #[serde(default)]
    pub nutrients: BTreeMap<String, NutrientRecord>,
    #[serde(default)]
    pub flags: BTreeMap<String, FlagValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost: Option<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ingredients: Vec<IngredientLine>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub instructions: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub servings: Option<u32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A subject that can be written to and read back from a [`SubjectRecord`].
pub trait Storable: Subject + Sized {
    const KIND: SubjectKind;

    fn to_record(&self) -> SubjectRecord;

    fn from_record(catalog: &Catalog, record: SubjectRecord) -> Result<Self, RecordError>;

    fn to_raw(&self) -> Result<serde_json::Value, RecordError> {
        Ok(serde_json::to_value(self.to_record())?)
    }

    fn from_raw(catalog: &Catalog, raw: serde_json::Value) -> Result<Self, RecordError> {
        let record: SubjectRecord = serde_json::from_value(raw)?;
        if record.kind != Self::KIND {
            return Err(RecordError::WrongKind {
                expected: Self::KIND,
                found: record.kind,
            });
        }
        Self::from_record(catalog, record)
    }
}

impl Storable for Ingredient {
    const KIND: SubjectKind = SubjectKind::Ingredient;

    fn to_record(&self) -> SubjectRecord {
        SubjectRecord {
            kind: Self::KIND,
            id: self.id,
            name: self.name.clone(),
            bulk: bulk_record(&self.bulk),
            nutrients: nutrient_records(&self.nutrients),
            flags: self.flags.iter().map(|(k, v)| (k.to_string(), v)).collect(),
            cost: self.cost,
            ingredients: Vec::new(),
            instructions: String::new(),
            servings: None,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    fn from_record(catalog: &Catalog, record: SubjectRecord) -> Result<Self, RecordError> {
        let bulk = restore_bulk(&record.bulk)?;
        let nutrients = restore_nutrients(catalog, &record.nutrients)?;
        let flags = restore_flags(catalog, &record.flags);
        if let Some(cost) = record.cost {
            check_range("cost", cost, 0.0, f64::INFINITY)?;
        }
        Ok(Self {
            id: record.id,
            name: record.name,
            bulk,
            nutrients,
            flags,
            cost: record.cost,
            created_at: record.created_at,
            updated_at: record.updated_at,
        })
    }
}

impl Storable for Recipe {
    const KIND: SubjectKind = SubjectKind::Recipe;

    fn to_record(&self) -> SubjectRecord {
        SubjectRecord {
            kind: Self::KIND,
            id: self.id,
            name: self.name.clone(),
            bulk: bulk_record(&self.bulk),
            nutrients: nutrient_records(&self.nutrients),
            flags: self.flags.iter().map(|(k, v)| (k.to_string(), v)).collect(),
            cost: None,
            ingredients: self.ingredients.clone(),
            instructions: self.instructions.clone(),
            servings: self.servings,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    fn from_record(catalog: &Catalog, record: SubjectRecord) -> Result<Self, RecordError> {
        let bulk = restore_bulk(&record.bulk)?;
        let nutrients = restore_nutrients(catalog, &record.nutrients)?;
        let flags = restore_flags(catalog, &record.flags);
        for line in &record.ingredients {
            check_range("ingredients.quantity", line.quantity, f64::MIN_POSITIVE, f64::INFINITY)?;
        }
        Ok(Self {
            id: record.id,
            name: record.name,
            bulk,
            nutrients,
            flags,
            ingredients: record.ingredients,
            instructions: record.instructions,
            servings: record.servings,
            created_at: record.created_at,
            updated_at: record.updated_at,
        })
    }
}

fn bulk_record(bulk: &BulkProfile) -> BulkRecord {
    BulkRecord {
        preferred_unit: bulk.preferred_unit().to_string(),
        reference_quantity: bulk.reference_quantity(),
        density_g_per_ml: bulk.density_g_per_ml(),
        piece_mass_g: bulk.piece_mass_g(),
    }
}

fn nutrient_records(ratios: &NutrientRatioSet) -> BTreeMap<String, NutrientRecord> {
    ratios
        .iter()
        .map(|(name, ratio)| {
            let record = NutrientRecord {
                ratio: ratio.ratio(),
                unit: ratio.unit().to_string(),
            };
            (name.to_string(), record)
        })
        .collect()
}

fn check_range(field: &str, value: f64, min: f64, max: f64) -> Result<f64, RecordError> {
    if value.is_finite() && value >= min && value <= max {
        Ok(value)
    } else {
        Err(RecordError::InvalidValue {
            field: field.to_string(),
            value,
        })
    }
}

fn restore_bulk(record: &BulkRecord) -> Result<BulkProfile, RecordError> {
    let unit: Unit = record.preferred_unit.parse()?;
    let reference = check_range(
        "bulk.reference_quantity",
        record.reference_quantity,
        f64::MIN_POSITIVE,
        f64::INFINITY,
    )?;
    let density = record
        .density_g_per_ml
        .map(|d| check_range("bulk.density_g_per_ml", d, f64::MIN_POSITIVE, f64::INFINITY))
        .transpose()?;
    let piece_mass = record
        .piece_mass_g
        .map(|m| check_range("bulk.piece_mass_g", m, f64::MIN_POSITIVE, f64::INFINITY))
        .transpose()?;

    let bulk = BulkProfile::restore(unit, reference, density, piece_mass);
    // The preferred unit must be convertible with what was stored alongside it.
    bulk.reference_grams()?;
    Ok(bulk)
}

fn restore_nutrients(
    catalog: &Catalog,
    records: &BTreeMap<String, NutrientRecord>,
) -> Result<NutrientRatioSet, RecordError> {
    let mut ratios: BTreeMap<String, NutrientRatio> = catalog
        .nutrients()
        .names()
        .map(|name| (name.to_string(), NutrientRatio::default()))
        .collect();

    for (name, record) in records {
        let Some(slot) = ratios.get_mut(name) else {
            tracing::warn!(nutrient = %name, "Dropping unknown nutrient from stored record");
            continue;
        };
        let ratio = record
            .ratio
            .map(|r| check_range(&format!("nutrients.{}", name), r, 0.0, 1.0))
            .transpose()?;
        let unit = record.unit.parse::<Unit>()?.expect(Dimension::Mass)?;
        *slot = NutrientRatio::restore(ratio, unit);
    }

    Ok(NutrientRatioSet::restore(ratios))
}

fn restore_flags(catalog: &Catalog, records: &BTreeMap<String, FlagValue>) -> FlagSet {
    let mut values: BTreeMap<String, FlagValue> = catalog
        .flags()
        .names()
        .map(|name| (name.to_string(), FlagValue::Undefined))
        .collect();

    for (name, value) in records {
        match values.get_mut(name) {
            Some(slot) => *slot = *value,
            None => tracing::warn!(flag = %name, "Dropping unknown flag from stored record"),
        }
    }

    FlagSet::restore(values)
}
