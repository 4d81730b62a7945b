use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod config;
mod db;

use commands::{CatalogCommand, ConfigCommand, ConvertCommand, IngredientCommand, RecipeCommand};
use config::Config;
use db::{init_db, SubjectRepository};
use diet_core::Catalog;

#[derive(Parser)]
#[command(name = "diet")]
#[command(version)]
#[command(about = "Track nutrients and dietary flags of ingredients and recipes", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage ingredients
    Ingredient(IngredientCommand),

    /// Manage recipes
    Recipe(RecipeCommand),

    /// Inspect the nutrient and flag catalog
    Catalog(CatalogCommand),

    /// Convert a quantity between units
    Convert(ConvertCommand),

    /// Manage configuration
    Config(ConfigCommand),
}

#[tokio::main]
async fn main() {
    init_tracing();

    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "diet=warn,diet_core=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(cli.config)?;

    match cli.command {
        Some(Commands::Ingredient(cmd)) => {
            let catalog = load_catalog(&config)?;
            let repo = open_repo(&config).await?;
            cmd.run(&repo, &catalog).await?;
        }
        Some(Commands::Recipe(cmd)) => {
            let catalog = load_catalog(&config)?;
            let repo = open_repo(&config).await?;
            cmd.run(&repo, &catalog).await?;
        }
        Some(Commands::Catalog(cmd)) => {
            let catalog = load_catalog(&config)?;
            cmd.run(&catalog)?;
        }
        Some(Commands::Convert(cmd)) => {
            cmd.run()?;
        }
        Some(Commands::Config(cmd)) => {
            cmd.run(&config)?;
        }
        None => {
            println!("Use --help to see available commands");
        }
    }

    Ok(())
}

fn load_catalog(config: &Config) -> Result<Catalog, diet_core::CatalogError> {
    match &config.catalog_path.value {
        Some(path) => {
            tracing::debug!(path = %path.display(), "loading catalog");
            Catalog::load(path)
        }
        None => Catalog::builtin(),
    }
}

async fn open_repo(config: &Config) -> Result<SubjectRepository, sqlx::Error> {
    let pool = init_db(&config.database_path.value).await?;
    Ok(SubjectRepository::new(pool))
}
