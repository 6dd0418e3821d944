use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    http::StatusCode,
    routing::{get, patch, post},
    Json, Router,
};
use serde_json::{Map, Value};
use tracing::instrument;

use crate::{
    auth::extractors::AuthUser,
    error::AppError,
    recipes::{
        dto::{RecipeData, SearchQuery},
        services,
    },
    response::ApiResponse,
    state::AppState,
    validation,
};

pub fn recipe_routes() -> Router<AppState> {
    Router::new()
        .route("/recipes/create", post(create_recipe))
        .route("/recipes/search", get(search_recipes))
        .route("/recipes/delete", post(delete_recipe))
        .route("/recipes/toggle-save", post(toggle_save))
        .route("/recipes/update-own-recipe", patch(update_own_recipe))
}

#[instrument(skip(state, identity, payload), fields(user_id = %identity.id()))]
pub async fn create_recipe(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    payload: Result<Json<Map<String, Value>>, JsonRejection>,
) -> Result<ApiResponse, AppError> {
    let Json(body) = payload?;
    let recipe = services::create(&state, &identity, &body).await?;
    Ok(ApiResponse::success(RecipeData { recipe: &recipe })?.with_status(StatusCode::CREATED))
}

#[instrument(skip(state, identity, query), fields(user_id = %identity.id()))]
pub async fn search_recipes(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    query: Result<Query<SearchQuery>, QueryRejection>,
) -> Result<ApiResponse, AppError> {
    let Query(query) = query?;
    let page = services::search(&state, &identity, query).await?;
    let total_pages = page.total_pages();
    Ok(ApiResponse::success(&page.recipes)?
        .with_field("results", page.recipes.len())
        .with_field("totalPages", total_pages)
        .with_field("currentPage", page.page))
}

#[instrument(skip(state, identity, payload), fields(user_id = %identity.id()))]
pub async fn delete_recipe(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    payload: Result<Json<Map<String, Value>>, JsonRejection>,
) -> Result<ApiResponse, AppError> {
    let Json(body) = payload?;
    let id = validation::body_id(&body)?;
    services::soft_delete(&state, &identity, id).await?;
    ApiResponse::success(Value::Null)
}

#[instrument(skip(state, identity, payload), fields(user_id = %identity.id()))]
pub async fn toggle_save(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    payload: Result<Json<Map<String, Value>>, JsonRejection>,
) -> Result<ApiResponse, AppError> {
    let Json(body) = payload?;
    let want_saved = body
        .get("bSave")
        .and_then(Value::as_bool)
        .ok_or(AppError::MissingFields)?;
    let id = validation::body_id(&body).map_err(|_| AppError::RecipeNotFound)?;
    services::set_saved(&state, &identity, id, want_saved).await?;
    ApiResponse::success(Value::Null)
}

#[instrument(skip(state, identity, payload), fields(user_id = %identity.id()))]
pub async fn update_own_recipe(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    payload: Result<Json<Map<String, Value>>, JsonRejection>,
) -> Result<ApiResponse, AppError> {
    let Json(body) = payload?;
    let recipe = services::update_own(&state, &identity, &body).await?;
    ApiResponse::success(RecipeData { recipe: &recipe })
}
