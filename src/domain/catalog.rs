//! Built-in flip catalog and load-time validation.

use std::collections::HashSet;

use thiserror::Error;

use super::entities::RecipeDefinition;

const BUILTIN_FLIPS: &str = include_str!("../../data/flips.json");

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("recipe {0} has a zero stage-1 ratio")]
    ZeroStage1Ratio(String),
    #[error("recipe {0} declares a stage-2 output without a stage-2 ratio")]
    MissingStage2Ratio(String),
    #[error("recipe {0} has a zero stage-2 ratio")]
    ZeroStage2Ratio(String),
    #[error("recipe id {0} appears more than once")]
    DuplicateId(String),
}

/// Validated, ordered set of recipes. Order is the ranking tie-break.
#[derive(Clone, Debug, PartialEq)]
pub struct Catalog {
    recipes: Vec<RecipeDefinition>,
}

impl Catalog {
    /// Validates every entry; a single bad entry rejects the whole catalog.
    pub fn new(recipes: Vec<RecipeDefinition>) -> Result<Self, CatalogError> {
        let mut seen = HashSet::with_capacity(recipes.len());
        for recipe in &recipes {
            validate_recipe(recipe)?;
            if !seen.insert(recipe.id.as_str()) {
                return Err(CatalogError::DuplicateId(recipe.id.clone()));
            }
        }
        Ok(Self { recipes })
    }

    pub fn from_json(raw: &str) -> Result<Self, CatalogError> {
        Self::new(serde_json::from_str(raw)?)
    }

    pub fn builtin() -> Result<Self, CatalogError> {
        Self::from_json(BUILTIN_FLIPS)
    }

    pub fn recipes(&self) -> &[RecipeDefinition] {
        &self.recipes
    }

    pub fn get(&self, id: &str) -> Option<&RecipeDefinition> {
        self.recipes.iter().find(|recipe| recipe.id == id)
    }

    pub fn len(&self) -> usize {
        self.recipes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recipes.is_empty()
    }
}

fn validate_recipe(recipe: &RecipeDefinition) -> Result<(), CatalogError> {
    if recipe.stage1_ratio == 0 {
        return Err(CatalogError::ZeroStage1Ratio(recipe.id.clone()));
    }
    match (&recipe.stage2_output_id, recipe.stage2_ratio) {
        (Some(_), None) => Err(CatalogError::MissingStage2Ratio(recipe.id.clone())),
        (_, Some(0)) => Err(CatalogError::ZeroStage2Ratio(recipe.id.clone())),
        _ => Ok(()),
    }
}
