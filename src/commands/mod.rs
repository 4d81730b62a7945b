mod catalog_cmd;
mod config_cmd;
mod convert;
mod subject;

pub use catalog_cmd::CatalogCommand;
pub use config_cmd::ConfigCommand;
pub use convert::ConvertCommand;
pub use subject::{IngredientCommand, RecipeCommand};

use clap::ValueEnum;

#[derive(Clone, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}
