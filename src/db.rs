use std::time::Duration;

use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::{config::AppConfig, error::AppError};

pub async fn connect(config: &AppConfig) -> anyhow::Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(Duration::from_secs(config.db_acquire_timeout_secs))
        .connect(&config.database_url)
        .await
        .context("connect to database")
}

pub async fn migrate(db: &PgPool) {
    if let Err(e) = sqlx::migrate!("./migrations").run(db).await {
        tracing::warn!(error = %e, "migrations folder not found or migration failed; continuing");
    }
}

/// Surfaces unique-index violations as `DuplicateField`; everything else
/// stays an infrastructure error.
pub fn map_unique_violation(err: sqlx::Error) -> anyhow::Error {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            let field = field_for_constraint(db_err.constraint().unwrap_or_default());
            return AppError::DuplicateField { field }.into();
        }
    }
    anyhow::Error::from(err)
}

fn field_for_constraint(constraint: &str) -> String {
    match constraint {
        "users_username_active_key" => "username".into(),
        "users_email_active_key" => "email".into(),
        other => other.to_string(),
    }
}

/// Escapes `%`, `_` and `\` so user text matches literally inside `ILIKE`.
pub fn escape_like(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}
