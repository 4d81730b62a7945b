//! Diet Core Library
//!
//! The nutrient, flag and bulk consistency engine behind the `diet` CLI:
//! unit conversion, the static nutrient and flag catalog, and the subjects
//! (ingredients and recipes) whose values are kept consistent as they are
//! edited one field at a time.

pub mod bulk;
pub mod catalog;
pub mod coordinator;
pub mod error;
pub mod flag_set;
pub mod ratios;
pub mod report;
pub mod subject;
pub mod units;

pub use bulk::BulkProfile;
pub use catalog::{Catalog, CatalogConfig, CatalogError, Flag, Nutrient, Polarity};
pub use coordinator::{Coordinator, Propagation, SoftUpdate};
pub use error::EditError;
pub use flag_set::{FlagSet, FlagValue};
pub use ratios::{NutrientRatio, NutrientRatioSet, GROUP_TOLERANCE};
pub use report::{
    bulk_summary, energy_per_reference, flag_summary, nutrient_mass, nutrient_ratio_summary,
};
pub use subject::{
    HasBulk, HasFlags, HasNutrientRatios, Ingredient, IngredientLine, Recipe, RecordError,
    Storable, Subject, SubjectKind, SubjectRecord,
};
pub use units::{convert, display_quantity, ConversionContext, Dimension, Unit, UnitError};

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
