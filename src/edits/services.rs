use serde_json::{Map, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    auth::extractors::Identity,
    edits::{
        overlay::{overlay, MergedRecipe},
        repo_types::Edit,
    },
    error::AppError,
    recipes::{author::AuthorInfo, services::find_visible},
    state::AppState,
    validation,
};

pub async fn view_merged(
    state: &AppState,
    identity: &Identity,
    recipe_id: Uuid,
) -> Result<(MergedRecipe, Option<AuthorInfo>), AppError> {
    let recipe = find_visible(state, identity, recipe_id).await?;
    let personal = state.edits.find_personal(recipe.id, identity.id()).await?;
    let author = state
        .authors
        .resolve_author(recipe.author_kind, recipe.author_id)
        .await?;
    Ok((overlay(recipe, personal.as_ref()), author))
}

pub async fn apply_or_suggest(
    state: &AppState,
    identity: &Identity,
    body: &Map<String, Value>,
) -> Result<MergedRecipe, AppError> {
    // 1) validate payload
    let payload = validation::edit_payload(body)?;
    let recipe_id = validation::body_id(body).map_err(|_| AppError::RecipeNotFound)?;

    // 2) recipe must be visible and saved by the caller
    let recipe = find_visible(state, identity, recipe_id)
        .await
        .map_err(|e| match e {
            AppError::NotFound => AppError::RecipeNotFound,
            other => other,
        })?;
    if !recipe.saved_by.contains(&identity.id()) {
        debug!(recipe_id = %recipe.id, user_id = %identity.id(), "edit on an unsaved recipe");
        return Err(AppError::RecipeNotFound);
    }
    if recipe.is_author(identity.id()) {
        warn!(recipe_id = %recipe.id, "author tried to edit own recipe");
        return Err(AppError::NotEditable);
    }
    if payload.is_suggestion && !recipe.b_allow_suggestions {
        return Err(AppError::SuggestionsDisabled);
    }

    // 3) suggestions accumulate, the personal edit is replaced
    if payload.is_suggestion {
        let suggestion = state
            .edits
            .insert_suggestion(recipe.id, identity.id(), &payload)
            .await?;
        info!(recipe_id = %recipe.id, edit_id = %suggestion.id, user_id = %identity.id(), "suggestion filed");
        let personal = state.edits.find_personal(recipe.id, identity.id()).await?;
        Ok(overlay(recipe, personal.as_ref()))
    } else {
        let personal = state
            .edits
            .upsert_personal(recipe.id, identity.id(), &payload)
            .await?;
        info!(recipe_id = %recipe.id, edit_id = %personal.id, user_id = %identity.id(), "personal edit saved");
        Ok(overlay(recipe, Some(&personal)))
    }
}

pub async fn list_suggestions(
    state: &AppState,
    identity: &Identity,
    recipe_id: Uuid,
) -> Result<Vec<Edit>, AppError> {
    let recipe = find_visible(state, identity, recipe_id).await?;
    if !recipe.is_author(identity.id()) {
        return Err(AppError::NotOwner);
    }
    Ok(state.edits.list_for_recipe(recipe.id).await?)
}
