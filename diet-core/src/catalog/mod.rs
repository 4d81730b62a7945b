//! Static nutrient and flag tables.
//!
//! The catalog is built once at startup from a YAML document and is read-only
//! afterwards. Any inconsistency in the tables is a [`CatalogError`], which
//! callers are expected to treat as fatal.

mod flags;
mod nutrients;

pub use flags::{Flag, FlagLink, FlagRegistry, Implication, Polarity};
pub use nutrients::{Nutrient, NutrientRegistry};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

const BUILTIN_CATALOG: &str = include_str!("../../data/catalog.yaml");

/// Errors in the static tables. These are startup failures, never edit errors.
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Failed to read catalog file '{}': {1}", .0.display())]
    Read(PathBuf, #[source] std::io::Error),

    #[error("Failed to parse catalog: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Invalid name '{0}': names must be non-empty snake_case")]
    InvalidName(String),

    #[error("Nutrient '{0}' has an invalid calories_per_gram")]
    InvalidCalories(String),

    #[error("Nutrient '{0}' is defined more than once")]
    DuplicateNutrient(String),

    #[error("Alias '{0}' is defined more than once")]
    DuplicateAlias(String),

    #[error("Alias '{0}' has the same name as a primary nutrient")]
    AliasShadowsPrimary(String),

    #[error("Alias '{alias}' points to unknown nutrient '{target}'")]
    DanglingAlias { alias: String, target: String },

    #[error("Group '{0}' is not a known nutrient")]
    UnknownGroup(String),

    #[error("Group '{group}' lists unknown member '{member}'")]
    UnknownGroupMember { group: String, member: String },

    #[error("Group membership cycles back to '{0}'")]
    CyclicGroup(String),

    #[error("Flag '{0}' is defined more than once")]
    DuplicateFlag(String),

    #[error("Relation references unknown flag '{0}'")]
    UnknownFlag(String),

    #[error("Flag '{flag}' references unknown nutrient '{nutrient}'")]
    UnknownFlagNutrient { flag: String, nutrient: String },

    #[error("Flag '{flag}' implies both zero and nonzero '{nutrient}'")]
    ContradictoryRelation { flag: String, nutrient: String },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NutrientDef {
    pub name: String,
    #[serde(default)]
    pub calories_per_gram: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelationDef {
    pub flag: String,
    pub nutrient: String,
    pub polarity: Polarity,
}

/// The raw tables, as read from YAML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub nutrients: Vec<NutrientDef>,
    /// alias -> primary nutrient name
    pub aliases: BTreeMap<String, String>,
    /// group -> direct members
    pub groups: BTreeMap<String, Vec<String>>,
    pub flags: Vec<String>,
    pub relations: Vec<RelationDef>,
}

impl CatalogConfig {
    pub fn from_yaml(contents: &str) -> Result<Self, CatalogError> {
        Ok(serde_yaml::from_str(contents)?)
    }
}

/// Validated nutrient and flag registries.
#[derive(Debug, Clone)]
pub struct Catalog {
    nutrients: NutrientRegistry,
    flags: FlagRegistry,
}

impl Catalog {
    pub fn from_config(config: &CatalogConfig) -> Result<Self, CatalogError> {
        let nutrients = NutrientRegistry::build(&config.nutrients, &config.aliases, &config.groups)?;
        let flags = FlagRegistry::build(&config.flags, &config.relations, &nutrients)?;
        tracing::debug!(
            nutrients = nutrients.len(),
            flags = flags.len(),
            "Catalog built"
        );
        Ok(Self { nutrients, flags })
    }

    pub fn from_yaml(contents: &str) -> Result<Self, CatalogError> {
        Self::from_config(&CatalogConfig::from_yaml(contents)?)
    }

    /// Loads and validates a catalog file.
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| CatalogError::Read(path.to_path_buf(), e))?;
        Self::from_yaml(&contents)
    }

    /// The tables shipped with the crate.
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::from_yaml(BUILTIN_CATALOG)
    }

    pub fn nutrients(&self) -> &NutrientRegistry {
        &self.nutrients
    }

    pub fn flags(&self) -> &FlagRegistry {
        &self.flags
    }
}

/// Lowercases, trims and turns runs of spaces or hyphens into underscores.
pub fn normalize_name(name: &str) -> String {
    name.trim()
        .to_lowercase()
        .split(|c: char| c.is_whitespace() || c == '-' || c == '_')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("_")
}

/// Table names must already be in normalized form.
fn check_name(name: &str) -> Result<(), CatalogError> {
    if !name.is_empty() && normalize_name(name) == name {
        Ok(())
    } else {
        Err(CatalogError::InvalidName(name.to_string()))
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    /// Small catalog used throughout the crate's tests.
    pub const FIXTURE: &str = r#"
nutrients:
  - name: protein
    calories_per_gram: 4
  - name: fat
    calories_per_gram: 9
  - name: saturated_fat
  - name: carbohydrate
    calories_per_gram: 4
  - name: sugar
  - name: glucose
  - name: sucrose
  - name: starch
  - name: alcohol
    calories_per_gram: 7
  - name: gluten
aliases:
  carbs: carbohydrate
  sugars: sugar
  ethanol: alcohol
groups:
  fat: [saturated_fat]
  carbohydrate: [sugar, starch]
  sugar: [glucose, sucrose]
flags:
  - alcohol_free
  - contains_alcohol
  - gluten_free
  - vegan
relations:
  - { flag: alcohol_free, nutrient: alcohol, polarity: zero }
  - { flag: contains_alcohol, nutrient: alcohol, polarity: nonzero }
  - { flag: gluten_free, nutrient: gluten, polarity: zero }
"#;

    pub fn fixture() -> Catalog {
        Catalog::from_yaml(FIXTURE).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_builtin_catalog_is_valid() {
        let catalog = Catalog::builtin().unwrap();
        assert!(catalog.nutrients().len() > 20);
        assert_eq!(catalog.nutrients().resolve_primary_name("Carbs").unwrap(), "carbohydrate");
        assert!(catalog.flags().contains("alcohol_free"));
    }

    #[test]
    fn test_fixture_catalog() {
        let catalog = test_support::fixture();
        assert_eq!(catalog.nutrients().len(), 11);
        assert_eq!(catalog.flags().len(), 4);
    }

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("  Saturated Fat "), "saturated_fat");
        assert_eq!(normalize_name("vitamin-B12"), "vitamin_b12");
        assert_eq!(normalize_name("omega__3"), "omega_3");
        assert_eq!(normalize_name(""), "");
    }

    #[test]
    fn test_invalid_table_name() {
        let yaml = "nutrients:\n  - name: Saturated Fat\n";
        let err = Catalog::from_yaml(yaml).unwrap_err();
        assert!(matches!(err, CatalogError::InvalidName(n) if n == "Saturated Fat"));
    }

    #[test]
    fn test_parse_error() {
        let err = Catalog::from_yaml("nutrients: [").unwrap_err();
        assert!(matches!(err, CatalogError::Parse(_)));
        assert!(err.to_string().contains("Failed to parse catalog"));
    }

    #[test]
    fn test_load_from_file() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("catalog.yaml");
        let mut file = std::fs::File::create(&path).unwrap();
        write!(file, "{}", test_support::FIXTURE).unwrap();

        let catalog = Catalog::load(&path).unwrap();
        assert!(catalog.nutrients().get("glucose").is_some());
    }

    #[test]
    fn test_load_missing_file() {
        let temp_dir = tempdir().unwrap();
        let err = Catalog::load(&temp_dir.path().join("missing.yaml")).unwrap_err();
        assert!(matches!(err, CatalogError::Read(_, _)));
    }
}
