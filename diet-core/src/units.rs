//! Mass, volume and piece-count units.
//!
//! Every unit converts to a base unit of its dimension (grams for mass,
//! millilitres for volume). Crossing from mass to volume needs a density in
//! g/ml; crossing to or from pieces needs a piece mass in grams.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Volume conversion constants (to millilitres)
const ML_PER_TSP: f64 = 5.0;
const ML_PER_TBSP: f64 = 15.0;
const ML_PER_FL_OZ: f64 = 29.5735;
const ML_PER_CUP: f64 = 240.0;
const ML_PER_PINT: f64 = 473.176;

/// Weight conversion constants (to grams)
const GRAMS_PER_OZ: f64 = 28.3495;
const GRAMS_PER_LB: f64 = 453.592;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum UnitError {
    #[error("Unknown unit: '{0}'")]
    UnknownUnit(String),

    #[error("A density is required to convert between mass and volume")]
    MissingDensity,

    #[error("A piece mass is required to convert to or from pieces")]
    MissingPieceMass,

    #[error("Unit '{unit}' is not a {expected} unit")]
    DimensionMismatch { unit: Unit, expected: Dimension },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dimension {
    Mass,
    Volume,
    Piece,
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dimension::Mass => write!(f, "mass"),
            Dimension::Volume => write!(f, "volume"),
            Dimension::Piece => write!(f, "piece"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Unit {
    Microgram,
    Milligram,
    Gram,
    Kilogram,
    Ounce,
    Pound,
    Millilitre,
    Centilitre,
    Decilitre,
    Litre,
    Teaspoon,
    Tablespoon,
    FluidOunce,
    Cup,
    Pint,
    Piece,
}

impl Unit {
    pub const ALL: [Unit; 16] = [
        Unit::Microgram,
        Unit::Milligram,
        Unit::Gram,
        Unit::Kilogram,
        Unit::Ounce,
        Unit::Pound,
        Unit::Millilitre,
        Unit::Centilitre,
        Unit::Decilitre,
        Unit::Litre,
        Unit::Teaspoon,
        Unit::Tablespoon,
        Unit::FluidOunce,
        Unit::Cup,
        Unit::Pint,
        Unit::Piece,
    ];

    /// Canonical symbol, as stored and displayed.
    pub fn symbol(&self) -> &'static str {
        match self {
            Unit::Microgram => "ug",
            Unit::Milligram => "mg",
            Unit::Gram => "g",
            Unit::Kilogram => "kg",
            Unit::Ounce => "oz",
            Unit::Pound => "lb",
            Unit::Millilitre => "ml",
            Unit::Centilitre => "cl",
            Unit::Decilitre => "dl",
            Unit::Litre => "l",
            Unit::Teaspoon => "tsp",
            Unit::Tablespoon => "tbsp",
            Unit::FluidOunce => "fl_oz",
            Unit::Cup => "cup",
            Unit::Pint => "pint",
            Unit::Piece => "piece",
        }
    }

    pub fn dimension(&self) -> Dimension {
        match self {
            Unit::Microgram
            | Unit::Milligram
            | Unit::Gram
            | Unit::Kilogram
            | Unit::Ounce
            | Unit::Pound => Dimension::Mass,
            Unit::Millilitre
            | Unit::Centilitre
            | Unit::Decilitre
            | Unit::Litre
            | Unit::Teaspoon
            | Unit::Tablespoon
            | Unit::FluidOunce
            | Unit::Cup
            | Unit::Pint => Dimension::Volume,
            Unit::Piece => Dimension::Piece,
        }
    }

    pub fn is_mass(&self) -> bool {
        self.dimension() == Dimension::Mass
    }

    pub fn is_volume(&self) -> bool {
        self.dimension() == Dimension::Volume
    }

    /// Size of one unit in the base unit of its dimension.
    fn base_factor(&self) -> f64 {
        match self {
            Unit::Microgram => 1e-6,
            Unit::Milligram => 1e-3,
            Unit::Gram => 1.0,
            Unit::Kilogram => 1000.0,
            Unit::Ounce => GRAMS_PER_OZ,
            Unit::Pound => GRAMS_PER_LB,
            Unit::Millilitre => 1.0,
            Unit::Centilitre => 10.0,
            Unit::Decilitre => 100.0,
            Unit::Litre => 1000.0,
            Unit::Teaspoon => ML_PER_TSP,
            Unit::Tablespoon => ML_PER_TBSP,
            Unit::FluidOunce => ML_PER_FL_OZ,
            Unit::Cup => ML_PER_CUP,
            Unit::Pint => ML_PER_PINT,
            Unit::Piece => 1.0,
        }
    }

    /// Fails with `DimensionMismatch` unless this unit has the given dimension.
    pub fn expect(self, expected: Dimension) -> Result<Self, UnitError> {
        if self.dimension() == expected {
            Ok(self)
        } else {
            Err(UnitError::DimensionMismatch {
                unit: self,
                expected,
            })
        }
    }

    /// Converts `quantity` of this unit into `to`.
    pub fn convert(
        self,
        quantity: f64,
        to: Unit,
        context: ConversionContext,
    ) -> Result<f64, UnitError> {
        if self.dimension() == to.dimension() {
            return Ok(quantity * self.base_factor() / to.base_factor());
        }
        let grams = context.to_grams(quantity, self)?;
        context.from_grams(grams, to)
    }
}

/// Lowercases, trims and folds separators so "Fl. Oz" and "fl_oz" match.
fn canonical_unit_key(s: &str) -> String {
    s.trim()
        .to_lowercase()
        .replace(['.'], "")
        .split(|c: char| c.is_whitespace() || c == '-' || c == '_')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("_")
}

impl FromStr for Unit {
    type Err = UnitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let unit = match canonical_unit_key(s).as_str() {
            "ug" | "mcg" | "µg" | "microgram" | "micrograms" => Unit::Microgram,
            "mg" | "milligram" | "milligrams" => Unit::Milligram,
            "g" | "gram" | "grams" | "gramme" | "grammes" => Unit::Gram,
            "kg" | "kilogram" | "kilograms" | "kilo" | "kilos" => Unit::Kilogram,
            "oz" | "ounce" | "ounces" => Unit::Ounce,
            "lb" | "lbs" | "pound" | "pounds" => Unit::Pound,
            "ml" | "millilitre" | "millilitres" | "milliliter" | "milliliters" => {
                Unit::Millilitre
            }
            "cl" | "centilitre" | "centilitres" | "centiliter" | "centiliters" => {
                Unit::Centilitre
            }
            "dl" | "decilitre" | "decilitres" | "deciliter" | "deciliters" => Unit::Decilitre,
            "l" | "litre" | "litres" | "liter" | "liters" => Unit::Litre,
            "tsp" | "teaspoon" | "teaspoons" => Unit::Teaspoon,
            "tbsp" | "tablespoon" | "tablespoons" => Unit::Tablespoon,
            "fl_oz" | "floz" | "fluid_ounce" | "fluid_ounces" => Unit::FluidOunce,
            "cup" | "cups" => Unit::Cup,
            "pint" | "pints" | "pt" => Unit::Pint,
            "piece" | "pieces" | "pc" | "pcs" | "each" => Unit::Piece,
            _ => return Err(UnitError::UnknownUnit(s.to_string())),
        };
        Ok(unit)
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

impl TryFrom<String> for Unit {
    type Error = UnitError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Unit> for String {
    fn from(unit: Unit) -> Self {
        unit.symbol().to_string()
    }
}

/// Optional density and piece mass used when a conversion crosses dimensions.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ConversionContext {
    pub density_g_per_ml: Option<f64>,
    pub piece_mass_g: Option<f64>,
}

impl ConversionContext {
    pub fn new(density_g_per_ml: Option<f64>, piece_mass_g: Option<f64>) -> Self {
        Self {
            density_g_per_ml,
            piece_mass_g,
        }
    }

    fn density(&self) -> Result<f64, UnitError> {
        self.density_g_per_ml
            .filter(|d| d.is_finite() && *d > 0.0)
            .ok_or(UnitError::MissingDensity)
    }

    fn piece_mass(&self) -> Result<f64, UnitError> {
        self.piece_mass_g
            .filter(|m| m.is_finite() && *m > 0.0)
            .ok_or(UnitError::MissingPieceMass)
    }

    /// Converts a quantity of any unit to grams.
    pub fn to_grams(&self, quantity: f64, unit: Unit) -> Result<f64, UnitError> {
        match unit.dimension() {
            Dimension::Mass => Ok(quantity * unit.base_factor()),
            Dimension::Volume => Ok(quantity * unit.base_factor() * self.density()?),
            Dimension::Piece => Ok(quantity * self.piece_mass()?),
        }
    }

    /// Converts grams to a quantity of any unit.
    pub fn from_grams(&self, grams: f64, unit: Unit) -> Result<f64, UnitError> {
        match unit.dimension() {
            Dimension::Mass => Ok(grams / unit.base_factor()),
            Dimension::Volume => Ok(grams / self.density()? / unit.base_factor()),
            Dimension::Piece => Ok(grams / self.piece_mass()?),
        }
    }
}

/// Rounds to three decimals for display, dropping trailing zeros.
pub fn display_quantity(value: f64) -> String {
    let rounded = (value * 1000.0).round() / 1000.0;
    if rounded == 0.0 {
        "0".to_string()
    } else {
        format!("{}", rounded)
    }
}

/// Converts `quantity` from one unit string to another.
///
/// Unit strings are matched case-insensitively against symbols and common
/// spellings. `density_g_per_ml` is only consulted when the conversion crosses
/// the mass/volume boundary, `piece_mass_g` only when pieces are involved.
pub fn convert(
    quantity: f64,
    from_unit: &str,
    to_unit: &str,
    density_g_per_ml: Option<f64>,
    piece_mass_g: Option<f64>,
) -> Result<f64, UnitError> {
    let from: Unit = from_unit.parse()?;
    let to: Unit = to_unit.parse()?;
    from.convert(
        quantity,
        to,
        ConversionContext::new(density_g_per_ml, piece_mass_g),
    )
}
