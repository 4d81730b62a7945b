use clap::{Args, Subcommand};
use std::fmt;
use std::io::{self, Write};
use uuid::Uuid;

use diet_core::{
    display_quantity, energy_per_reference, Catalog, Coordinator, FlagValue, HasBulk, Ingredient,
    Propagation, Recipe, Storable, Subject, Unit,
};

use super::OutputFormat;
use crate::db::SubjectRepository;

type CommandResult<T = ()> = Result<T, Box<dyn std::error::Error>>;

/// Subcommands shared by ingredients and recipes
#[derive(Subcommand)]
pub enum SubjectSubcommand {
    /// Create a new entry quoted per 100 g
    Create {
        /// Name
        name: String,
    },

    /// List all entries
    List {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Show an entry's details
    Show {
        /// ID (UUID) or name
        identifier: String,

        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Delete an entry
    Delete {
        /// ID (UUID) or name
        identifier: String,

        /// Skip confirmation prompt
        #[arg(long, short)]
        force: bool,
    },

    /// Set the preferred unit (volume units need a density, piece needs a piece mass)
    SetUnit {
        /// ID (UUID) or name
        identifier: String,

        /// Unit (e.g. g, ml, cup, piece)
        unit: String,
    },

    /// Set the reference quantity nutrients are quoted per
    SetReference {
        /// ID (UUID) or name
        identifier: String,

        /// Quantity in the preferred unit
        quantity: f64,
    },

    /// Set the density from a mass and the volume it occupies
    SetDensity {
        /// ID (UUID) or name
        identifier: String,

        /// Mass quantity
        mass: f64,

        /// Mass unit
        mass_unit: String,

        /// Volume quantity
        volume: f64,

        /// Volume unit
        volume_unit: String,
    },

    /// Remove the density
    ClearDensity {
        /// ID (UUID) or name
        identifier: String,
    },

    /// Set the mass of a piece from the mass of a number of pieces
    SetPieceMass {
        /// ID (UUID) or name
        identifier: String,

        /// Mass quantity
        mass: f64,

        /// Mass unit
        mass_unit: String,

        /// Number of pieces weighing that much
        #[arg(long, default_value_t = 1.0)]
        pieces: f64,
    },

    /// Remove the piece mass
    ClearPieceMass {
        /// ID (UUID) or name
        identifier: String,
    },

    /// Set how much of a nutrient is in a quantity of this entry
    SetNutrient {
        /// ID (UUID) or name
        identifier: String,

        /// Nutrient name or alias
        nutrient: String,

        /// Amount of the nutrient
        amount: f64,

        /// Unit of the nutrient amount
        #[arg(long, default_value = "g")]
        unit: String,

        /// Quantity of this entry containing that amount (defaults to the reference quantity)
        #[arg(long)]
        per: Option<f64>,

        /// Unit of --per (defaults to the preferred unit)
        #[arg(long)]
        per_unit: Option<String>,
    },

    /// Make a nutrient undefined again
    ResetNutrient {
        /// ID (UUID) or name
        identifier: String,

        /// Nutrient name or alias
        nutrient: String,
    },

    /// Set the mass unit a nutrient is displayed in
    SetNutrientUnit {
        /// ID (UUID) or name
        identifier: String,

        /// Nutrient name or alias
        nutrient: String,

        /// Mass unit (e.g. g, mg, ug)
        unit: String,
    },

    /// Set a dietary flag to true, false or none
    SetFlag {
        /// ID (UUID) or name
        identifier: String,

        /// Flag name
        flag: String,

        /// true, false or none
        value: String,
    },
}

#[derive(Args)]
pub struct IngredientCommand {
    #[command(subcommand)]
    pub command: IngredientSubcommand,
}

#[derive(Subcommand)]
pub enum IngredientSubcommand {
    #[command(flatten)]
    Common(SubjectSubcommand),

    /// Set the price of the reference quantity
    SetCost {
        /// ID (UUID) or name
        identifier: String,

        /// Price
        cost: f64,
    },

    /// Remove the price
    ClearCost {
        /// ID (UUID) or name
        identifier: String,
    },
}

impl IngredientCommand {
    pub async fn run(&self, repo: &SubjectRepository, catalog: &Catalog) -> CommandResult {
        match &self.command {
            IngredientSubcommand::Common(command) => {
                run_common(command, repo, catalog, |c, name| Ingredient::new(c, name)).await
            }

            IngredientSubcommand::SetCost { identifier, cost } => {
                edit(repo, catalog, identifier, |ingredient: &mut Ingredient| {
                    ingredient.set_cost(*cost)?;
                    Ok(Propagation::default())
                })
                .await
            }

            IngredientSubcommand::ClearCost { identifier } => {
                edit(repo, catalog, identifier, |ingredient: &mut Ingredient| {
                    ingredient.clear_cost();
                    Ok(Propagation::default())
                })
                .await
            }
        }
    }
}

#[derive(Args)]
pub struct RecipeCommand {
    #[command(subcommand)]
    pub command: RecipeSubcommand,
}

#[derive(Subcommand)]
pub enum RecipeSubcommand {
    #[command(flatten)]
    Common(SubjectSubcommand),

    /// Add an ingredient line, or change the quantity of an existing one
    AddIngredient {
        /// Recipe ID (UUID) or name
        identifier: String,

        /// Ingredient name
        #[arg(long)]
        name: String,

        /// Quantity (amount)
        #[arg(long)]
        quantity: f64,

        /// Unit of measurement
        #[arg(long)]
        unit: String,
    },

    /// Remove an ingredient line
    RemoveIngredient {
        /// Recipe ID (UUID) or name
        identifier: String,

        /// Ingredient name
        #[arg(long)]
        name: String,
    },

    /// Replace the cooking instructions
    SetInstructions {
        /// Recipe ID (UUID) or name
        identifier: String,

        /// Instructions text
        instructions: String,
    },

    /// Set the number of servings
    SetServings {
        /// Recipe ID (UUID) or name
        identifier: String,

        /// Number of servings
        servings: u32,
    },
}

impl RecipeCommand {
    pub async fn run(&self, repo: &SubjectRepository, catalog: &Catalog) -> CommandResult {
        match &self.command {
            RecipeSubcommand::Common(command) => {
                run_common(command, repo, catalog, |c, name| Recipe::new(c, name)).await
            }

            RecipeSubcommand::AddIngredient {
                identifier,
                name,
                quantity,
                unit,
            } => {
                let unit: Unit = unit.parse()?;
                edit(repo, catalog, identifier, |recipe: &mut Recipe| {
                    recipe.add_ingredient(name.trim(), *quantity, unit)?;
                    Ok(Propagation::default())
                })
                .await
            }

            RecipeSubcommand::RemoveIngredient { identifier, name } => {
                edit(repo, catalog, identifier, |recipe: &mut Recipe| {
                    if !recipe.remove_ingredient(name) {
                        return Err(format!("Ingredient not in recipe: {}", name).into());
                    }
                    Ok(Propagation::default())
                })
                .await
            }

            RecipeSubcommand::SetInstructions {
                identifier,
                instructions,
            } => {
                edit(repo, catalog, identifier, |recipe: &mut Recipe| {
                    recipe.instructions = instructions.clone();
                    Ok(Propagation::default())
                })
                .await
            }

            RecipeSubcommand::SetServings {
                identifier,
                servings,
            } => {
                if *servings == 0 {
                    return Err("Servings must be at least 1".into());
                }
                edit(repo, catalog, identifier, |recipe: &mut Recipe| {
                    recipe.servings = Some(*servings);
                    Ok(Propagation::default())
                })
                .await
            }
        }
    }
}

async fn run_common<S, F>(
    command: &SubjectSubcommand,
    repo: &SubjectRepository,
    catalog: &Catalog,
    create: F,
) -> CommandResult
where
    S: Storable + fmt::Display,
    F: Fn(&Catalog, &str) -> S,
{
    let coordinator = Coordinator::new(catalog);

    match command {
        SubjectSubcommand::Create { name } => {
            if name.trim().is_empty() {
                return Err(format!("The {} name cannot be empty", S::KIND).into());
            }

            let subject = create(catalog, name.trim());
            repo.create(&subject).await?;
            println!("Created {}:", S::KIND);
            println!("{}", subject);
            Ok(())
        }

        SubjectSubcommand::List { format } => {
            let subjects: Vec<S> = repo.list(catalog).await?;
            if subjects.is_empty() {
                println!("No {}s found", S::KIND);
                return Ok(());
            }

            match format {
                OutputFormat::Json => {
                    let records: Vec<_> = subjects.iter().map(|s| s.to_record()).collect();
                    println!("{}", serde_json::to_string_pretty(&records)?);
                }
                OutputFormat::Text => {
                    println!("{:<36}  {:<30}  PER", "ID", "NAME");
                    println!("{}", "-".repeat(80));
                    for subject in &subjects {
                        let record = subject.to_record();
                        let name = if record.name.chars().count() > 30 {
                            format!("{}...", record.name.chars().take(27).collect::<String>())
                        } else {
                            record.name.clone()
                        };
                        println!("{:<36}  {:<30}  {}", record.id, name, subject.bulk());
                    }
                    println!("\nTotal: {} {}(s)", subjects.len(), S::KIND);
                }
            }
            Ok(())
        }

        SubjectSubcommand::Show { identifier, format } => {
            let subject: S = find(repo, catalog, identifier).await?;
            match format {
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&subject.to_record())?);
                }
                OutputFormat::Text => {
                    print!("{}", subject);
                    if let Some(kcal) = energy_per_reference(catalog, &subject)? {
                        println!(
                            "\nEnergy: {} kcal per {} {}",
                            display_quantity(kcal),
                            display_quantity(subject.bulk().reference_quantity()),
                            subject.bulk().preferred_unit()
                        );
                    }
                }
            }
            Ok(())
        }

        SubjectSubcommand::Delete { identifier, force } => {
            let subject: S = find(repo, catalog, identifier).await?;

            // Confirm deletion unless --force is used
            if !force {
                print!("Delete {} '{}'? [y/N] ", S::KIND, subject.name());
                io::stdout().flush()?;

                let mut input = String::new();
                io::stdin().read_line(&mut input)?;

                if !input.trim().eq_ignore_ascii_case("y") {
                    println!("Deletion cancelled.");
                    return Ok(());
                }
            }

            repo.delete(subject.to_record().id).await?;
            println!("Deleted {}: {}", S::KIND, subject.name());
            Ok(())
        }

        SubjectSubcommand::SetUnit { identifier, unit } => {
            let unit: Unit = unit.parse()?;
            edit(repo, catalog, identifier, |subject: &mut S| {
                subject.bulk_mut().set_preferred_unit(unit)?;
                Ok(Propagation::default())
            })
            .await
        }

        SubjectSubcommand::SetReference {
            identifier,
            quantity,
        } => {
            edit(repo, catalog, identifier, |subject: &mut S| {
                subject.bulk_mut().set_reference_quantity(*quantity)?;
                Ok(Propagation::default())
            })
            .await
        }

        SubjectSubcommand::SetDensity {
            identifier,
            mass,
            mass_unit,
            volume,
            volume_unit,
        } => {
            let mass_unit: Unit = mass_unit.parse()?;
            let volume_unit: Unit = volume_unit.parse()?;
            edit(repo, catalog, identifier, |subject: &mut S| {
                subject
                    .bulk_mut()
                    .set_density(*mass, mass_unit, *volume, volume_unit)?;
                Ok(Propagation::default())
            })
            .await
        }

        SubjectSubcommand::ClearDensity { identifier } => {
            edit(repo, catalog, identifier, |subject: &mut S| {
                subject.bulk_mut().clear_density()?;
                Ok(Propagation::default())
            })
            .await
        }

        SubjectSubcommand::SetPieceMass {
            identifier,
            mass,
            mass_unit,
            pieces,
        } => {
            let mass_unit: Unit = mass_unit.parse()?;
            edit(repo, catalog, identifier, |subject: &mut S| {
                subject
                    .bulk_mut()
                    .set_piece_mass(*mass, mass_unit, *pieces)?;
                Ok(Propagation::default())
            })
            .await
        }

        SubjectSubcommand::ClearPieceMass { identifier } => {
            edit(repo, catalog, identifier, |subject: &mut S| {
                subject.bulk_mut().clear_piece_mass()?;
                Ok(Propagation::default())
            })
            .await
        }

        SubjectSubcommand::SetNutrient {
            identifier,
            nutrient,
            amount,
            unit,
            per,
            per_unit,
        } => {
            let unit: Unit = unit.parse()?;
            let per_unit: Option<Unit> = per_unit
                .as_deref()
                .map(str::parse::<Unit>)
                .transpose()?;
            edit(repo, catalog, identifier, |subject: &mut S| {
                let per = per.unwrap_or(subject.bulk().reference_quantity());
                let per_unit = per_unit.unwrap_or(subject.bulk().preferred_unit());
                Ok(coordinator.set_nutrient_ratio(subject, nutrient, *amount, unit, per, per_unit)?)
            })
            .await
        }

        SubjectSubcommand::ResetNutrient {
            identifier,
            nutrient,
        } => {
            edit(repo, catalog, identifier, |subject: &mut S| {
                coordinator.reset_nutrient_ratio(subject, nutrient)?;
                Ok(Propagation::default())
            })
            .await
        }

        SubjectSubcommand::SetNutrientUnit {
            identifier,
            nutrient,
            unit,
        } => {
            let unit: Unit = unit.parse()?;
            edit(repo, catalog, identifier, |subject: &mut S| {
                coordinator.set_nutrient_unit(subject, nutrient, unit)?;
                Ok(Propagation::default())
            })
            .await
        }

        SubjectSubcommand::SetFlag {
            identifier,
            flag,
            value,
        } => {
            let value: FlagValue = value.parse()?;
            edit(repo, catalog, identifier, |subject: &mut S| {
                Ok(coordinator.set_flag(subject, flag, value)?)
            })
            .await
        }
    }
}

/// Looks a subject up by UUID first, then by name.
async fn find<S: Storable>(
    repo: &SubjectRepository,
    catalog: &Catalog,
    identifier: &str,
) -> CommandResult<S> {
    let subject = if let Ok(uuid) = Uuid::parse_str(identifier) {
        repo.get_by_id(catalog, uuid).await?
    } else {
        repo.get_by_name(catalog, identifier).await?
    };

    subject.ok_or_else(|| format!("No {} found: {}", S::KIND, identifier).into())
}

/// Loads a subject, applies one edit and stores it. Nothing is written if
/// the edit fails.
async fn edit<S, F>(
    repo: &SubjectRepository,
    catalog: &Catalog,
    identifier: &str,
    apply: F,
) -> CommandResult
where
    S: Storable,
    F: FnOnce(&mut S) -> CommandResult<Propagation>,
{
    let mut subject: S = find(repo, catalog, identifier).await?;
    let propagation = apply(&mut subject)?;
    subject.touch();
    repo.update(&subject).await?;

    println!("Updated {} '{}': {}", S::KIND, subject.name(), subject.bulk());
    for update in &propagation.applied {
        println!("  also set {}", update);
    }
    Ok(())
}
