use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};

use super::{check_name, normalize_name, CatalogError, NutrientDef};
use crate::error::EditError;

static NO_NAMES: BTreeSet<String> = BTreeSet::new();

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Nutrient {
    name: String,
    aliases: Vec<String>,
    calories_per_gram: f64,
    parents: BTreeSet<String>,
    children: BTreeSet<String>,
}

impl Nutrient {
    fn new(name: &str, calories_per_gram: f64) -> Self {
        Self {
            name: name.to_string(),
            aliases: Vec::new(),
            calories_per_gram,
            parents: BTreeSet::new(),
            children: BTreeSet::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    pub fn calories_per_gram(&self) -> f64 {
        self.calories_per_gram
    }

    pub fn is_caloric(&self) -> bool {
        self.calories_per_gram > 0.0
    }

    pub fn parents(&self) -> &BTreeSet<String> {
        &self.parents
    }

    pub fn children(&self) -> &BTreeSet<String> {
        &self.children
    }

    pub fn is_group(&self) -> bool {
        !self.children.is_empty()
    }
}

/// Every known nutrient, its aliases and the group graph.
#[derive(Debug, Clone)]
pub struct NutrientRegistry {
    nutrients: BTreeMap<String, Nutrient>,
    aliases: BTreeMap<String, String>,
}

#[derive(Clone, Copy, PartialEq)]
enum Mark {
    Visiting,
    Done,
}

impl NutrientRegistry {
    pub(crate) fn build(
        defs: &[NutrientDef],
        aliases: &BTreeMap<String, String>,
        groups: &BTreeMap<String, Vec<String>>,
    ) -> Result<Self, CatalogError> {
        let mut nutrients = BTreeMap::new();
        for def in defs {
            check_name(&def.name)?;
            if !def.calories_per_gram.is_finite() || def.calories_per_gram < 0.0 {
                return Err(CatalogError::InvalidCalories(def.name.clone()));
            }
            if nutrients.contains_key(&def.name) {
                return Err(CatalogError::DuplicateNutrient(def.name.clone()));
            }
            nutrients.insert(
                def.name.clone(),
                Nutrient::new(&def.name, def.calories_per_gram),
            );
        }

        let mut alias_map = BTreeMap::new();
        for (alias, target) in aliases {
            let key = normalize_name(alias);
            if key.is_empty() {
                return Err(CatalogError::InvalidName(alias.clone()));
            }
            if nutrients.contains_key(&key) {
                return Err(CatalogError::AliasShadowsPrimary(alias.clone()));
            }
            let Some(nutrient) = nutrients.get_mut(target) else {
                return Err(CatalogError::DanglingAlias {
                    alias: alias.clone(),
                    target: target.clone(),
                });
            };
            if alias_map.insert(key.clone(), target.clone()).is_some() {
                return Err(CatalogError::DuplicateAlias(alias.clone()));
            }
            nutrient.aliases.push(key);
        }

        for (group, members) in groups {
            if !nutrients.contains_key(group) {
                return Err(CatalogError::UnknownGroup(group.clone()));
            }
            for member in members {
                if member == group {
                    return Err(CatalogError::CyclicGroup(group.clone()));
                }
                let Some(child) = nutrients.get_mut(member) else {
                    return Err(CatalogError::UnknownGroupMember {
                        group: group.clone(),
                        member: member.clone(),
                    });
                };
                child.parents.insert(group.clone());
                if let Some(parent) = nutrients.get_mut(group) {
                    parent.children.insert(member.clone());
                }
            }
        }

        let registry = Self {
            nutrients,
            aliases: alias_map,
        };
        registry.check_acyclic()?;
        Ok(registry)
    }

    fn check_acyclic(&self) -> Result<(), CatalogError> {
        let mut marks = HashMap::new();
        for name in self.nutrients.keys() {
            self.visit(name, &mut marks)?;
        }
        Ok(())
    }

    fn visit<'a>(
        &'a self,
        name: &'a str,
        marks: &mut HashMap<&'a str, Mark>,
    ) -> Result<(), CatalogError> {
        match marks.get(name) {
            Some(Mark::Done) => return Ok(()),
            Some(Mark::Visiting) => return Err(CatalogError::CyclicGroup(name.to_string())),
            None => {}
        }
        marks.insert(name, Mark::Visiting);
        for child in self.children_of(name) {
            self.visit(child, marks)?;
        }
        marks.insert(name, Mark::Done);
        Ok(())
    }

    /// Maps any spelling of a primary name or alias to the primary name.
    pub fn resolve_primary_name(&self, name: &str) -> Result<&str, EditError> {
        let key = normalize_name(name);
        if let Some((primary, _)) = self.nutrients.get_key_value(&key) {
            return Ok(primary.as_str());
        }
        self.aliases
            .get(&key)
            .map(String::as_str)
            .ok_or_else(|| EditError::UnknownNutrient(name.to_string()))
    }

    pub fn get(&self, primary_name: &str) -> Option<&Nutrient> {
        self.nutrients.get(primary_name)
    }

    pub fn contains(&self, primary_name: &str) -> bool {
        self.nutrients.contains_key(primary_name)
    }

    /// Groups the nutrient is a direct member of.
    pub fn parents_of(&self, primary_name: &str) -> &BTreeSet<String> {
        self.get(primary_name).map_or(&NO_NAMES, Nutrient::parents)
    }

    /// Direct constituents of a group nutrient.
    pub fn children_of(&self, primary_name: &str) -> &BTreeSet<String> {
        self.get(primary_name).map_or(&NO_NAMES, Nutrient::children)
    }

    /// Every group the nutrient belongs to, directly or through other groups.
    pub fn ancestors_of(&self, primary_name: &str) -> BTreeSet<&str> {
        let mut found = BTreeSet::new();
        let mut stack: Vec<&str> = self.parents_of(primary_name).iter().map(String::as_str).collect();
        while let Some(name) = stack.pop() {
            if found.insert(name) {
                stack.extend(self.parents_of(name).iter().map(String::as_str));
            }
        }
        found
    }

    /// Every constituent of the nutrient, directly or through subgroups.
    pub fn descendants_of(&self, primary_name: &str) -> BTreeSet<&str> {
        let mut found = BTreeSet::new();
        let mut stack: Vec<&str> = self.children_of(primary_name).iter().map(String::as_str).collect();
        while let Some(name) = stack.pop() {
            if found.insert(name) {
                stack.extend(self.children_of(name).iter().map(String::as_str));
            }
        }
        found
    }

    pub fn iter(&self) -> impl Iterator<Item = &Nutrient> {
        self.nutrients.values()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.nutrients.keys().map(String::as_str)
    }

    /// Nutrients that have constituents.
    pub fn groups(&self) -> impl Iterator<Item = &Nutrient> {
        self.nutrients.values().filter(|n| n.is_group())
    }

    pub fn len(&self) -> usize {
        self.nutrients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nutrients.is_empty()
    }
}
