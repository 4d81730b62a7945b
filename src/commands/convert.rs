use clap::Args;
use diet_core::{convert, display_quantity};

/// Convert a quantity between units
#[derive(Args)]
pub struct ConvertCommand {
    /// Quantity to convert
    quantity: f64,

    /// Unit to convert from (e.g. g, cup, tbsp, piece)
    from: String,

    /// Unit to convert to
    to: String,

    /// Density in grams per millilitre, for mass/volume conversions
    #[arg(long)]
    density: Option<f64>,

    /// Mass of one piece in grams, for piece conversions
    #[arg(long)]
    piece_mass: Option<f64>,
}

impl ConvertCommand {
    pub fn run(&self) -> Result<(), Box<dyn std::error::Error>> {
        let result = convert(
            self.quantity,
            &self.from,
            &self.to,
            self.density,
            self.piece_mass,
        )?;
        println!(
            "{} {} = {} {}",
            display_quantity(self.quantity),
            self.from,
            display_quantity(result),
            self.to
        );
        Ok(())
    }
}
