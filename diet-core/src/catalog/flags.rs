use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::{check_name, normalize_name, CatalogError, NutrientRegistry, RelationDef};
use crate::error::EditError;

/// What a flag being true says about a nutrient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Polarity {
    /// The flag being true means the nutrient is absent.
    Zero,
    /// The flag being true means the nutrient is present.
    NonZero,
}

impl Polarity {
    /// Whether a flag with this polarity, set to `value`, requires the
    /// nutrient ratio to be zero. Otherwise it requires it to be nonzero.
    pub fn requires_zero(self, value: bool) -> bool {
        match self {
            Polarity::Zero => value,
            Polarity::NonZero => !value,
        }
    }

    /// The flag value that agrees with a nutrient ratio.
    ///
    /// Zero is compared exactly. Ratio edits only produce 0.0 from a zero
    /// nutrient quantity; nonzero amounts that round to zero are rejected.
    pub fn flag_value_for(self, ratio: f64) -> bool {
        match self {
            Polarity::Zero => ratio == 0.0,
            Polarity::NonZero => ratio > 0.0,
        }
    }

    /// Whether a flag value and a defined ratio contradict each other. Zero is
    /// compared exactly, as in [`Polarity::flag_value_for`].
    pub fn conflicts(self, value: bool, ratio: f64) -> bool {
        self.requires_zero(value) != (ratio == 0.0)
    }
}

impl fmt::Display for Polarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Polarity::Zero => write!(f, "zero"),
            Polarity::NonZero => write!(f, "nonzero"),
        }
    }
}

/// A (nutrient, polarity) pair attached to a flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Implication {
    pub nutrient: String,
    pub polarity: Polarity,
}

/// The reverse of an [`Implication`]: a flag that depends on a nutrient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlagLink {
    pub flag: String,
    pub polarity: Polarity,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Flag {
    name: String,
    implications: Vec<Implication>,
}

impl Flag {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn implications(&self) -> &[Implication] {
        &self.implications
    }
}

/// Every known dietary flag and its nutrient implications.
#[derive(Debug, Clone)]
pub struct FlagRegistry {
    flags: BTreeMap<String, Flag>,
    by_nutrient: BTreeMap<String, Vec<FlagLink>>,
}

impl FlagRegistry {
    pub(crate) fn build(
        names: &[String],
        relations: &[RelationDef],
        nutrients: &NutrientRegistry,
    ) -> Result<Self, CatalogError> {
        let mut flags = BTreeMap::new();
        for name in names {
            check_name(name)?;
            let flag = Flag {
                name: name.clone(),
                implications: Vec::new(),
            };
            if flags.insert(name.clone(), flag).is_some() {
                return Err(CatalogError::DuplicateFlag(name.clone()));
            }
        }

        let mut by_nutrient: BTreeMap<String, Vec<FlagLink>> = BTreeMap::new();
        for relation in relations {
            let Some(flag) = flags.get_mut(&relation.flag) else {
                return Err(CatalogError::UnknownFlag(relation.flag.clone()));
            };
            if !nutrients.contains(&relation.nutrient) {
                return Err(CatalogError::UnknownFlagNutrient {
                    flag: relation.flag.clone(),
                    nutrient: relation.nutrient.clone(),
                });
            }

            match flag
                .implications
                .iter()
                .find(|i| i.nutrient == relation.nutrient)
            {
                Some(existing) if existing.polarity == relation.polarity => continue,
                Some(_) => {
                    return Err(CatalogError::ContradictoryRelation {
                        flag: relation.flag.clone(),
                        nutrient: relation.nutrient.clone(),
                    })
                }
                None => {}
            }

            flag.implications.push(Implication {
                nutrient: relation.nutrient.clone(),
                polarity: relation.polarity,
            });
            by_nutrient
                .entry(relation.nutrient.clone())
                .or_default()
                .push(FlagLink {
                    flag: relation.flag.clone(),
                    polarity: relation.polarity,
                });
        }

        Ok(Self { flags, by_nutrient })
    }

    /// Normalizes a flag name and checks that it is known.
    pub fn resolve(&self, name: &str) -> Result<&str, EditError> {
        let key = normalize_name(name);
        self.flags
            .get_key_value(&key)
            .map(|(k, _)| k.as_str())
            .ok_or_else(|| EditError::UnknownFlag(name.to_string()))
    }

    pub fn get(&self, name: &str) -> Option<&Flag> {
        self.flags.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.flags.contains_key(name)
    }

    /// Nutrients constrained by a flag. Empty for unknown flags.
    pub fn implications_for(&self, flag: &str) -> &[Implication] {
        self.flags
            .get(flag)
            .map(Flag::implications)
            .unwrap_or(&[])
    }

    /// Flags that constrain a nutrient. Empty for unconstrained nutrients.
    pub fn flags_implied_by(&self, nutrient: &str) -> &[FlagLink] {
        self.by_nutrient
            .get(nutrient)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Flag> {
        self.flags.values()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.flags.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.flags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::test_support::fixture;
    use crate::catalog::Catalog;

    #[test]
    fn test_polarity_rules() {
        assert!(Polarity::Zero.requires_zero(true));
        assert!(!Polarity::Zero.requires_zero(false));
        assert!(Polarity::NonZero.requires_zero(false));
        assert!(!Polarity::NonZero.requires_zero(true));

        assert!(Polarity::Zero.flag_value_for(0.0));
        assert!(!Polarity::Zero.flag_value_for(0.05));
        assert!(!Polarity::NonZero.flag_value_for(0.0));
        assert!(Polarity::NonZero.flag_value_for(0.05));
    }

    #[test]
    fn test_polarity_conflicts() {
        // true + nonzero polarity + zero ratio
        assert!(Polarity::NonZero.conflicts(true, 0.0));
        // true + zero polarity + nonzero ratio
        assert!(Polarity::Zero.conflicts(true, 0.05));
        // false + nonzero polarity + nonzero ratio
        assert!(Polarity::NonZero.conflicts(false, 0.05));
        // false + zero polarity + zero ratio
        assert!(Polarity::Zero.conflicts(false, 0.0));

        assert!(!Polarity::Zero.conflicts(true, 0.0));
        assert!(!Polarity::Zero.conflicts(false, 0.3));
        assert!(!Polarity::NonZero.conflicts(true, 0.3));
        assert!(!Polarity::NonZero.conflicts(false, 0.0));
    }

    #[test]
    fn test_implications_and_reverse_lookup() {
        let catalog = fixture();
        let flags = catalog.flags();

        assert_eq!(
            flags.implications_for("alcohol_free"),
            [Implication {
                nutrient: "alcohol".to_string(),
                polarity: Polarity::Zero
            }]
        );
        assert!(flags.implications_for("vegan").is_empty());
        assert!(flags.implications_for("unknown").is_empty());

        let links = flags.flags_implied_by("alcohol");
        assert_eq!(links.len(), 2);
        assert!(links
            .iter()
            .any(|l| l.flag == "contains_alcohol" && l.polarity == Polarity::NonZero));
        assert!(flags.flags_implied_by("protein").is_empty());
    }

    #[test]
    fn test_resolve_flag() {
        let catalog = fixture();
        assert_eq!(catalog.flags().resolve("Gluten Free").unwrap(), "gluten_free");
        assert_eq!(
            catalog.flags().resolve("halal"),
            Err(EditError::UnknownFlag("halal".to_string()))
        );
    }

    #[test]
    fn test_relation_to_unknown_flag() {
        let yaml = "nutrients:\n  - name: alcohol\nflags: [vegan]\nrelations:\n  - { flag: alcohol_free, nutrient: alcohol, polarity: zero }\n";
        let err = Catalog::from_yaml(yaml).unwrap_err();
        assert!(matches!(err, CatalogError::UnknownFlag(f) if f == "alcohol_free"));
    }

    #[test]
    fn test_relation_to_unknown_nutrient() {
        let yaml = "nutrients:\n  - name: alcohol\nflags: [alcohol_free]\nrelations:\n  - { flag: alcohol_free, nutrient: ethanol, polarity: zero }\n";
        let err = Catalog::from_yaml(yaml).unwrap_err();
        assert!(matches!(
            err,
            CatalogError::UnknownFlagNutrient { flag, nutrient } if flag == "alcohol_free" && nutrient == "ethanol"
        ));
    }

    #[test]
    fn test_duplicate_flag() {
        let yaml = "flags: [vegan, vegan]\n";
        let err = Catalog::from_yaml(yaml).unwrap_err();
        assert!(matches!(err, CatalogError::DuplicateFlag(f) if f == "vegan"));
    }

    #[test]
    fn test_contradictory_relation() {
        let yaml = "nutrients:\n  - name: alcohol\nflags: [alcohol_free]\nrelations:\n  - { flag: alcohol_free, nutrient: alcohol, polarity: zero }\n  - { flag: alcohol_free, nutrient: alcohol, polarity: nonzero }\n";
        let err = Catalog::from_yaml(yaml).unwrap_err();
        assert!(matches!(err, CatalogError::ContradictoryRelation { .. }));
    }

    #[test]
    fn test_repeated_relation_is_merged() {
        let yaml = "nutrients:\n  - name: alcohol\nflags: [alcohol_free]\nrelations:\n  - { flag: alcohol_free, nutrient: alcohol, polarity: zero }\n  - { flag: alcohol_free, nutrient: alcohol, polarity: zero }\n";
        let catalog = Catalog::from_yaml(yaml).unwrap();
        assert_eq!(catalog.flags().implications_for("alcohol_free").len(), 1);
        assert_eq!(catalog.flags().flags_implied_by("alcohol").len(), 1);
    }
}
