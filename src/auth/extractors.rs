use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use tracing::warn;
use uuid::Uuid;

use crate::{
    auth::{jwt::JwtKeys, repo_types::User},
    error::AppError,
    state::AppState,
};

/// A user proven by a verified session. Only [`authenticate`] hands these
/// out, so holding one is the capability every gated operation asks for.
#[derive(Debug, Clone)]
pub struct Identity {
    user: User,
}

impl Identity {
    pub fn id(&self) -> Uuid {
        self.user.id
    }

    pub fn user(&self) -> &User {
        &self.user
    }

    #[cfg(test)]
    pub fn for_test(user: User) -> Self {
        Self { user }
    }
}

/// Resolves a raw `Authorization` header value to an [`Identity`].
pub async fn authenticate(state: &AppState, header: Option<&str>) -> Result<Identity, AppError> {
    let header = header.ok_or(AppError::Unauthenticated("Missing Authorization header"))?;
    let token = header
        .strip_prefix("Bearer ")
        .or_else(|| header.strip_prefix("bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(AppError::Unauthenticated("Invalid Authorization header"))?;

    let keys = JwtKeys::from_ref(state);
    let claims = keys.verify(token).map_err(|e| {
        warn!(error = %e, "invalid or expired token");
        AppError::Unauthenticated("Invalid or expired token")
    })?;

    let user = state
        .users
        .find_by_id(claims.sub)
        .await?
        .filter(|u| u.active)
        .ok_or_else(|| {
            warn!(user_id = %claims.sub, "token subject no longer exists");
            AppError::UnknownSubject
        })?;

    if user.changed_password_after(claims.iat) {
        warn!(user_id = %user.id, "token predates password change");
        return Err(AppError::StaleCredential);
    }

    Ok(Identity { user })
}

/// Extracts and validates the bearer session, yielding the caller's identity.
pub struct AuthUser(pub Identity);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok());
        authenticate(state, header).await.map(AuthUser)
    }
}
