//! Errors raised by direct edits to a subject.
//!
//! A subject is left exactly as it was whenever one of these is returned.

use thiserror::Error;

use crate::units::{Unit, UnitError};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EditError {
    #[error("Invalid quantity: {0}")]
    InvalidQuantity(f64),

    #[error("Cannot use volume unit '{0}' without a density")]
    DensityRequired(Unit),

    #[error("Cannot use pieces without a piece mass")]
    PieceMassRequired,

    #[error("Density is in use by the preferred unit '{0}'; change the unit first")]
    DensityInUse(Unit),

    #[error("Piece mass is in use by the preferred unit; change the unit first")]
    PieceMassInUse,

    #[error("Unknown nutrient: '{0}'")]
    UnknownNutrient(String),

    #[error("Unknown flag: '{0}'")]
    UnknownFlag(String),

    #[error("Invalid flag value '{0}'. Valid options: true, false, none")]
    InvalidFlagValue(String),

    #[error("Constituents of '{parent}' would exceed its own ratio")]
    ChildExceedsParent { parent: String },

    #[error("Flag '{flag}' conflicts with the ratio of nutrient '{nutrient}'")]
    FlagNutrientConflict { flag: String, nutrient: String },

    #[error("Nutrient mass cannot exceed the mass of what contains it (ratio {0})")]
    RatioAboveOne(f64),

    #[error("Nutrient unit must be a mass unit, got '{0}'")]
    NotAMassUnit(Unit),

    #[error("This {0} has no {1}")]
    Unsupported(&'static str, &'static str),

    #[error(transparent)]
    Unit(#[from] UnitError),
}

/// Rejects NaN, infinities and anything not strictly positive.
pub(crate) fn positive(value: f64) -> Result<f64, EditError> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(EditError::InvalidQuantity(value))
    }
}

/// Rejects NaN, infinities and negatives; zero is allowed.
pub(crate) fn non_negative(value: f64) -> Result<f64, EditError> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(EditError::InvalidQuantity(value))
    }
}
