use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    routing::{delete, get, patch, post},
    Json, Router,
};
use tracing::instrument;

use crate::{
    auth::{
        dto::{
            ForgotPasswordRequest, LoginRequest, ResetPasswordRequest, SessionData,
            SignupRequest, UpdatePasswordRequest, UserDetails,
        },
        extractors::AuthUser,
        repo_types::PublicUser,
        services::{self, SessionGrant},
    },
    error::AppError,
    recipes,
    response::ApiResponse,
    state::AppState,
};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users/signup", post(signup))
        .route("/users/login", post(login))
        .route("/users/forgotten-password", post(forgotten_password))
        .route("/users/reset-password/:token", patch(reset_password))
        .route("/users/update-password", patch(update_password))
        .route("/users/delete-account", delete(delete_account))
        .route("/users/user-details", get(user_details))
        .route("/users/saved-recipes", get(saved_recipes))
}

fn session_response(grant: SessionGrant, status: StatusCode) -> Result<ApiResponse, AppError> {
    Ok(ApiResponse::success(SessionData { user: grant.user })?
        .with_field("token", grant.session.token)
        .with_status(status))
}

#[instrument(skip(state, payload))]
pub async fn signup(
    State(state): State<AppState>,
    payload: Result<Json<SignupRequest>, JsonRejection>,
) -> Result<ApiResponse, AppError> {
    let Json(payload) = payload?;
    let grant = services::signup(&state, payload).await?;
    session_response(grant, StatusCode::CREATED)
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<ApiResponse, AppError> {
    let Json(payload) = payload?;
    let grant = services::login(&state, payload).await?;
    session_response(grant, StatusCode::OK)
}

#[instrument(skip(state, payload))]
pub async fn forgotten_password(
    State(state): State<AppState>,
    payload: Result<Json<ForgotPasswordRequest>, JsonRejection>,
) -> Result<ApiResponse, AppError> {
    let Json(payload) = payload?;
    services::forgot_password(&state, payload).await?;
    Ok(ApiResponse::success(serde_json::Value::Null)?.with_message("Token sent to email"))
}

#[instrument(skip(state, token, payload))]
pub async fn reset_password(
    State(state): State<AppState>,
    Path(token): Path<String>,
    payload: Result<Json<ResetPasswordRequest>, JsonRejection>,
) -> Result<ApiResponse, AppError> {
    let Json(payload) = payload?;
    let grant = services::reset_password(&state, &token, payload).await?;
    session_response(grant, StatusCode::OK)
}

#[instrument(skip(state, identity, payload), fields(user_id = %identity.id()))]
pub async fn update_password(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    payload: Result<Json<UpdatePasswordRequest>, JsonRejection>,
) -> Result<ApiResponse, AppError> {
    let Json(payload) = payload?;
    let grant = services::update_password(&state, &identity, payload).await?;
    session_response(grant, StatusCode::OK)
}

#[instrument(skip(state, identity), fields(user_id = %identity.id()))]
pub async fn delete_account(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
) -> Result<ApiResponse, AppError> {
    services::deactivate(&state, &identity).await?;
    Ok(ApiResponse::no_content())
}

#[instrument(skip(state, identity), fields(user_id = %identity.id()))]
pub async fn user_details(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
) -> Result<ApiResponse, AppError> {
    let saved_recipes = recipes::services::saved_recipes(&state, &identity).await?;
    ApiResponse::success(UserDetails {
        user: PublicUser::from(identity.user()),
        saved_recipes,
    })
}

#[instrument(skip(state, identity), fields(user_id = %identity.id()))]
pub async fn saved_recipes(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
) -> Result<ApiResponse, AppError> {
    let saved = recipes::services::saved_recipes(&state, &identity).await?;
    Ok(ApiResponse::success(&saved)?.with_field("results", saved.len()))
}
