use axum::extract::FromRef;
use lazy_static::lazy_static;
use regex::Regex;
use time::{Duration, OffsetDateTime};
use tracing::{error, info, warn};

use crate::{
    auth::{
        dto::{
            ForgotPasswordRequest, LoginRequest, ResetPasswordRequest, SignupRequest,
            UpdatePasswordRequest,
        },
        extractors::Identity,
        jwt::{JwtKeys, SessionToken},
        password::{
            digest_reset_token, hash_password_off_thread, verify_password_off_thread, ResetToken,
        },
        repo_types::{NewUser, PublicUser, User},
    },
    error::{AppError, FieldError},
    state::AppState,
};

const USERNAME_MIN: usize = 4;
const USERNAME_MAX: usize = 40;
const PASSWORD_MIN: usize = 8;

lazy_static! {
    static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

/// A signed session plus the public view of its owner.
#[derive(Debug)]
pub struct SessionGrant {
    pub session: SessionToken,
    pub user: PublicUser,
}

fn grant(state: &AppState, user: &User) -> Result<SessionGrant, AppError> {
    let session = JwtKeys::from_ref(state).issue(user.id)?;
    Ok(SessionGrant {
        session,
        user: PublicUser::from(user),
    })
}

fn check_new_password(
    password: Option<&str>,
    confirm: Option<&str>,
    errors: &mut Vec<FieldError>,
) {
    match password {
        None | Some("") => errors.push(FieldError::new("password", "REQUIRED")),
        Some(p) if p.chars().count() < PASSWORD_MIN => {
            errors.push(FieldError::new("password", "TOO_SMALL"))
        }
        Some(_) => {}
    }
    match confirm {
        None | Some("") => errors.push(FieldError::new("passwordConfirm", "CONFIRM")),
        Some(c) if Some(c) != password => errors.push(FieldError::new("passwordConfirm", "CONFIRM")),
        Some(_) => {}
    }
}

fn validate_signup(req: &SignupRequest) -> Result<NewUserInput, AppError> {
    let mut errors = Vec::new();

    let username = req.username.as_deref().map(str::trim).unwrap_or_default();
    let username_len = username.chars().count();
    if username.is_empty() {
        errors.push(FieldError::new("username", "REQUIRED"));
    } else if username_len < USERNAME_MIN {
        errors.push(FieldError::new("username", "TOO_SMALL"));
    } else if username_len > USERNAME_MAX {
        errors.push(FieldError::new("username", "TOO_BIG"));
    }

    let email = req
        .email
        .as_deref()
        .map(|e| e.trim().to_lowercase())
        .unwrap_or_default();
    if email.is_empty() {
        errors.push(FieldError::new("email", "REQUIRED"));
    } else if !is_valid_email(&email) {
        errors.push(FieldError::new("email", "INVALID"));
    }

    check_new_password(
        req.password.as_deref(),
        req.password_confirm.as_deref(),
        &mut errors,
    );

    if !errors.is_empty() {
        return Err(AppError::validation(errors));
    }
    Ok(NewUserInput {
        username: username.to_string(),
        email,
        password: req.password.clone().unwrap_or_default(),
    })
}

struct NewUserInput {
    username: String,
    email: String,
    password: String,
}

pub async fn signup(state: &AppState, req: SignupRequest) -> Result<SessionGrant, AppError> {
    let input = validate_signup(&req)?;
    let password_hash = hash_password_off_thread(input.password).await?;
    let user = state
        .users
        .create(NewUser {
            username: input.username,
            email: input.email,
            password_hash,
        })
        .await?;
    info!(user_id = %user.id, username = %user.username, "user signed up");
    grant(state, &user)
}

pub async fn login(state: &AppState, req: LoginRequest) -> Result<SessionGrant, AppError> {
    let (Some(email), Some(password)) = (req.email, req.password) else {
        return Err(AppError::MissingCredentials);
    };
    if email.trim().is_empty() || password.is_empty() {
        return Err(AppError::MissingCredentials);
    }
    let email = email.trim().to_lowercase();

    let Some(user) = state.users.find_by_email(&email).await? else {
        warn!(email = %email, "login unknown email");
        return Err(AppError::InvalidCredentials);
    };
    if !verify_password_off_thread(password, user.password_hash.clone()).await? {
        warn!(user_id = %user.id, "login invalid password");
        return Err(AppError::InvalidCredentials);
    }

    info!(user_id = %user.id, "user logged in");
    grant(state, &user)
}

/// Stores the digest of a fresh reset token on the user and returns the
/// plaintext. The plaintext cannot be recovered afterwards.
pub async fn issue_reset_token(state: &AppState, user: &User) -> anyhow::Result<String> {
    let token = ResetToken::generate();
    let expires = OffsetDateTime::now_utc() + Duration::minutes(state.config.reset_token_ttl_minutes);
    state
        .users
        .set_reset_token(user.id, Some(&token.digest), Some(expires))
        .await?;
    Ok(token.plaintext)
}

/// Finds the user owning an unexpired reset token.
pub async fn consume_reset_token(state: &AppState, plaintext: &str) -> Result<User, AppError> {
    let digest = digest_reset_token(plaintext);
    state
        .users
        .find_by_reset_digest(&digest, OffsetDateTime::now_utc())
        .await?
        .ok_or(AppError::TokenInvalidOrExpired)
}

/// Re-hashes and stores a password. The change is stamped one second in the
/// past so a session issued right afterwards is not considered stale.
async fn change_password(state: &AppState, user: &User, plain: String) -> Result<(), AppError> {
    let hash = hash_password_off_thread(plain).await?;
    let changed_at = OffsetDateTime::now_utc() - Duration::seconds(1);
    state.users.set_password(user.id, &hash, changed_at).await?;
    info!(user_id = %user.id, "password changed");
    Ok(())
}

pub async fn forgot_password(state: &AppState, req: ForgotPasswordRequest) -> Result<(), AppError> {
    let email = req
        .email
        .map(|e| e.trim().to_lowercase())
        .filter(|e| !e.is_empty())
        .ok_or(AppError::MissingFields)?;
    let user = state
        .users
        .find_by_email(&email)
        .await?
        .ok_or(AppError::UnknownEmail)?;

    let token = issue_reset_token(state, &user).await?;
    let reset_url = format!(
        "{}/api/v1/users/reset-password/{}",
        state.config.public_base_url.trim_end_matches('/'),
        token
    );
    let message = format!(
        "Forgot your password? Submit a PATCH request with your new password and \
         passwordConfirm to: {reset_url}.\nIf you didn't forget your password, please ignore this email"
    );

    if let Err(e) = state
        .mailer
        .send_email(
            &user.email,
            "Your password reset token (only valid for 10 min)",
            &message,
        )
        .await
    {
        if let Err(rollback) = state.users.set_reset_token(user.id, None, None).await {
            error!(error = %rollback, user_id = %user.id, "reset token rollback failed");
        }
        return Err(AppError::Delivery(e));
    }

    info!(user_id = %user.id, "password reset token issued");
    Ok(())
}

pub async fn reset_password(
    state: &AppState,
    token: &str,
    req: ResetPasswordRequest,
) -> Result<SessionGrant, AppError> {
    let mut errors = Vec::new();
    check_new_password(
        req.password.as_deref(),
        req.password_confirm.as_deref(),
        &mut errors,
    );
    if !errors.is_empty() {
        return Err(AppError::validation(errors));
    }

    let user = consume_reset_token(state, token).await?;
    change_password(state, &user, req.password.unwrap_or_default()).await?;
    grant(state, &user)
}

pub async fn update_password(
    state: &AppState,
    identity: &Identity,
    req: UpdatePasswordRequest,
) -> Result<SessionGrant, AppError> {
    let present = |v: &Option<String>| v.as_deref().filter(|s| !s.is_empty()).is_some();
    if !present(&req.password) || !present(&req.password_confirm) {
        return Err(AppError::MissingFields);
    }
    let Some(current) = req.current_password.as_deref().filter(|s| !s.is_empty()) else {
        return Err(AppError::MissingFields);
    };

    let mut errors = Vec::new();
    check_new_password(
        req.password.as_deref(),
        req.password_confirm.as_deref(),
        &mut errors,
    );
    if !errors.is_empty() {
        return Err(AppError::validation(errors));
    }

    let user = identity.user();
    if !verify_password_off_thread(current.to_string(), user.password_hash.clone()).await? {
        warn!(user_id = %user.id, "update password with wrong current password");
        return Err(AppError::CurrentPasswordInvalid);
    }

    change_password(state, user, req.password.unwrap_or_default()).await?;
    grant(state, user)
}

pub async fn deactivate(state: &AppState, identity: &Identity) -> Result<(), AppError> {
    state.users.deactivate(identity.id()).await?;
    info!(user_id = %identity.id(), "account deactivated");
    Ok(())
}
