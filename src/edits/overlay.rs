//! Read-time merge of a viewer's personal edit over canonical content.

use serde::Serialize;

use crate::{edits::repo_types::Edit, recipes::repo_types::Recipe};

#[derive(Debug, Clone, Serialize)]
#[serde(transparent)]
pub struct MergedRecipe(pub Recipe);

/// Overlays `personal` on `recipe`. Ingredients and steps are replaced
/// independently, and only by a non-empty list.
pub fn overlay(mut recipe: Recipe, personal: Option<&Edit>) -> MergedRecipe {
    if let Some(edit) = personal.filter(|e| !e.is_suggestion && e.recipe_id == recipe.id) {
        if !edit.ingredients.is_empty() {
            recipe.ingredients = edit.ingredients.clone();
        }
        if !edit.steps.is_empty() {
            recipe.steps = edit.steps.clone();
        }
    }
    MergedRecipe(recipe)
}
