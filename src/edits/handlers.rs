use axum::{
    extract::{rejection::JsonRejection, rejection::PathRejection, Path, State},
    routing::{get, post},
    Json, Router,
};
use serde_json::{Map, Value};
use tracing::instrument;
use uuid::Uuid;

use crate::{
    auth::extractors::AuthUser,
    edits::services,
    error::AppError,
    recipes::dto::{EditsData, MergedRecipeData},
    response::ApiResponse,
    state::AppState,
};

pub fn edit_routes() -> Router<AppState> {
    Router::new()
        .route("/recipes/edit-recipe", post(edit_recipe))
        .route("/recipes/view-suggestions/:id", get(view_suggestions))
        .route("/recipes/:id", get(view_recipe))
}

#[instrument(skip(state, identity, id), fields(user_id = %identity.id()))]
pub async fn view_recipe(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<ApiResponse, AppError> {
    let Path(id) = id?;
    let (recipe, author) = services::view_merged(&state, &identity, id).await?;
    ApiResponse::success(MergedRecipeData { recipe, author })
}

#[instrument(skip(state, identity, payload), fields(user_id = %identity.id()))]
pub async fn edit_recipe(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    payload: Result<Json<Map<String, Value>>, JsonRejection>,
) -> Result<ApiResponse, AppError> {
    let Json(body) = payload?;
    let recipe = services::apply_or_suggest(&state, &identity, &body).await?;
    ApiResponse::success(MergedRecipeData {
        recipe,
        author: None,
    })
}

#[instrument(skip(state, identity, id), fields(user_id = %identity.id()))]
pub async fn view_suggestions(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<ApiResponse, AppError> {
    let Path(id) = id?;
    let edits = services::list_suggestions(&state, &identity, id).await?;
    ApiResponse::success(EditsData { edits })
}
