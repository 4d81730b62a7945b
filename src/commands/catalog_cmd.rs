use clap::{Args, Subcommand};
use diet_core::{display_quantity, Catalog};

use super::OutputFormat;

#[derive(Args)]
pub struct CatalogCommand {
    #[command(subcommand)]
    pub command: CatalogSubcommand,
}

#[derive(Subcommand)]
pub enum CatalogSubcommand {
    /// List known nutrients, their aliases and groups
    Nutrients {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// List known dietary flags and the nutrients they constrain
    Flags {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },
}

impl CatalogCommand {
    pub fn run(&self, catalog: &Catalog) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            CatalogSubcommand::Nutrients { format } => {
                let nutrients: Vec<_> = catalog.nutrients().iter().collect();
                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(&nutrients)?);
                    }
                    OutputFormat::Text => {
                        println!("{:<24}  {:>8}  {:<30}  ALIASES", "NAME", "KCAL/G", "CONTAINS");
                        println!("{}", "-".repeat(90));
                        for nutrient in &nutrients {
                            let children: Vec<&str> =
                                nutrient.children().iter().map(String::as_str).collect();
                            println!(
                                "{:<24}  {:>8}  {:<30}  {}",
                                nutrient.name(),
                                display_quantity(nutrient.calories_per_gram()),
                                children.join(", "),
                                nutrient.aliases().join(", ")
                            );
                        }
                        println!("\nTotal: {} nutrient(s)", nutrients.len());
                    }
                }
                Ok(())
            }

            CatalogSubcommand::Flags { format } => {
                let flags: Vec<_> = catalog.flags().iter().collect();
                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(&flags)?);
                    }
                    OutputFormat::Text => {
                        println!("{:<24}  IMPLIES", "NAME");
                        println!("{}", "-".repeat(60));
                        for flag in &flags {
                            let implications: Vec<String> = flag
                                .implications()
                                .iter()
                                .map(|i| format!("{} {}", i.nutrient, i.polarity))
                                .collect();
                            println!("{:<24}  {}", flag.name(), implications.join(", "));
                        }
                        println!("\nTotal: {} flag(s)", flags.len());
                    }
                }
                Ok(())
            }
        }
    }
}
