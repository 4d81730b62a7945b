//! Per-subject bulk properties: preferred unit, reference quantity, density
//! and piece mass.
//!
//! The preferred unit may only be a volume unit while a density is defined,
//! and only "piece" while a piece mass is defined. Nutrient ratios are stored
//! per gram, so none of these setters touch them.

use std::fmt;

use crate::error::{positive, EditError};
use crate::units::{display_quantity, ConversionContext, Dimension, Unit, UnitError};

const DEFAULT_REFERENCE_QUANTITY: f64 = 100.0;

#[derive(Debug, Clone, PartialEq)]
pub struct BulkProfile {
    preferred_unit: Unit,
    reference_quantity: f64,
    density_g_per_ml: Option<f64>,
    piece_mass_g: Option<f64>,
}

impl Default for BulkProfile {
    fn default() -> Self {
        Self::new()
    }
}

impl BulkProfile {
    /// A profile quoting everything per 100 g.
    pub fn new() -> Self {
        Self {
            preferred_unit: Unit::Gram,
            reference_quantity: DEFAULT_REFERENCE_QUANTITY,
            density_g_per_ml: None,
            piece_mass_g: None,
        }
    }

    /// Rebuilds a profile from stored values without running the setters.
    pub(crate) fn restore(
        preferred_unit: Unit,
        reference_quantity: f64,
        density_g_per_ml: Option<f64>,
        piece_mass_g: Option<f64>,
    ) -> Self {
        Self {
            preferred_unit,
            reference_quantity,
            density_g_per_ml,
            piece_mass_g,
        }
    }

    pub fn preferred_unit(&self) -> Unit {
        self.preferred_unit
    }

    pub fn reference_quantity(&self) -> f64 {
        self.reference_quantity
    }

    pub fn density_g_per_ml(&self) -> Option<f64> {
        self.density_g_per_ml
    }

    pub fn piece_mass_g(&self) -> Option<f64> {
        self.piece_mass_g
    }

    pub fn context(&self) -> ConversionContext {
        ConversionContext::new(self.density_g_per_ml, self.piece_mass_g)
    }

    pub fn set_reference_quantity(&mut self, value: f64) -> Result<(), EditError> {
        self.reference_quantity = positive(value)?;
        Ok(())
    }

    pub fn set_preferred_unit(&mut self, unit: Unit) -> Result<(), EditError> {
        match unit.dimension() {
            Dimension::Volume if self.density_g_per_ml.is_none() => {
                Err(EditError::DensityRequired(unit))
            }
            Dimension::Piece if self.piece_mass_g.is_none() => Err(EditError::PieceMassRequired),
            _ => {
                self.preferred_unit = unit;
                Ok(())
            }
        }
    }

    /// Sets the density from a measured mass of a measured volume.
    pub fn set_density(
        &mut self,
        mass_qty: f64,
        mass_unit: Unit,
        vol_qty: f64,
        vol_unit: Unit,
    ) -> Result<(), EditError> {
        positive(mass_qty)?;
        positive(vol_qty)?;
        mass_unit.expect(Dimension::Mass)?;
        vol_unit.expect(Dimension::Volume)?;

        let context = ConversionContext::default();
        let grams = context.to_grams(mass_qty, mass_unit)?;
        let millilitres = vol_unit.convert(vol_qty, Unit::Millilitre, context)?;
        let density = positive(grams / millilitres)
            .map_err(|_| EditError::InvalidQuantity(mass_qty))?;
        self.density_g_per_ml = Some(density);
        Ok(())
    }

    pub fn clear_density(&mut self) -> Result<(), EditError> {
        if self.preferred_unit.is_volume() {
            return Err(EditError::DensityInUse(self.preferred_unit));
        }
        self.density_g_per_ml = None;
        Ok(())
    }

    /// Sets the piece mass from the mass of a counted number of pieces.
    pub fn set_piece_mass(
        &mut self,
        mass_qty: f64,
        mass_unit: Unit,
        num_pieces: f64,
    ) -> Result<(), EditError> {
        positive(mass_qty)?;
        positive(num_pieces)?;
        mass_unit.expect(Dimension::Mass)?;

        let grams = ConversionContext::default().to_grams(mass_qty, mass_unit)?;
        let piece_mass = positive(grams / num_pieces)
            .map_err(|_| EditError::InvalidQuantity(mass_qty))?;
        self.piece_mass_g = Some(piece_mass);
        Ok(())
    }

    pub fn clear_piece_mass(&mut self) -> Result<(), EditError> {
        if self.preferred_unit == Unit::Piece {
            return Err(EditError::PieceMassInUse);
        }
        self.piece_mass_g = None;
        Ok(())
    }

    pub fn to_grams(&self, quantity: f64, unit: Unit) -> Result<f64, UnitError> {
        self.context().to_grams(quantity, unit)
    }

    pub fn from_grams(&self, grams: f64, unit: Unit) -> Result<f64, UnitError> {
        self.context().from_grams(grams, unit)
    }

    /// Mass of the reference quantity in grams.
    pub fn reference_grams(&self) -> Result<f64, UnitError> {
        self.to_grams(self.reference_quantity, self.preferred_unit)
    }

    /// One-line description, e.g. `100 g (density 1.03 g/ml, 1 piece = 50 g)`.
    pub fn summary(&self) -> String {
        let mut extras = Vec::new();
        if let Some(density) = self.density_g_per_ml {
            extras.push(format!("density {} g/ml", display_quantity(density)));
        }
        if let Some(piece) = self.piece_mass_g {
            extras.push(format!("1 piece = {} g", display_quantity(piece)));
        }

        let reference = format!(
            "{} {}",
            display_quantity(self.reference_quantity),
            self.preferred_unit
        );
        if extras.is_empty() {
            reference
        } else {
            format!("{} ({})", reference, extras.join(", "))
        }
    }
}

impl fmt::Display for BulkProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.summary())
    }
}
