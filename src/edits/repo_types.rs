use serde::Serialize;
use sqlx::{types::Json, FromRow};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::recipes::repo_types::Ingredient;

/// Only `Pending` is ever written. Personal edits carry no status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EditStatus {
    Pending,
    Accepted,
    Rejected,
}

impl EditStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            EditStatus::Pending => "pending",
            EditStatus::Accepted => "accepted",
            EditStatus::Rejected => "rejected",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "pending" => Some(EditStatus::Pending),
            "accepted" => Some(EditStatus::Accepted),
            "rejected" => Some(EditStatus::Rejected),
            _ => None,
        }
    }
}

/// Validated body of an edit or suggestion. An empty list means "no
/// override" for that field.
#[derive(Debug, Clone, PartialEq)]
pub struct EditPayload {
    pub is_suggestion: bool,
    pub ingredients: Vec<Ingredient>,
    pub steps: Vec<String>,
    pub comments: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Edit {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub recipe_id: Uuid,
    pub user_id: Uuid,
    pub is_suggestion: bool,
    pub ingredients: Vec<Ingredient>,
    pub steps: Vec<String>,
    pub comments: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<EditStatus>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, FromRow)]
pub struct EditRow {
    pub id: Uuid,
    pub recipe_id: Uuid,
    pub user_id: Uuid,
    pub is_suggestion: bool,
    pub ingredients: Json<Vec<Ingredient>>,
    pub steps: Vec<String>,
    pub comments: Option<String>,
    pub status: Option<String>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl TryFrom<EditRow> for Edit {
    type Error = anyhow::Error;

    fn try_from(r: EditRow) -> Result<Self, Self::Error> {
        let status = match r.status.as_deref() {
            None => None,
            Some(raw) => Some(
                EditStatus::parse(raw)
                    .ok_or_else(|| anyhow::anyhow!("unknown edit status {raw:?} on edit {}", r.id))?,
            ),
        };
        Ok(Self {
            id: r.id,
            recipe_id: r.recipe_id,
            user_id: r.user_id,
            is_suggestion: r.is_suggestion,
            ingredients: r.ingredients.0,
            steps: r.steps,
            comments: r.comments,
            status,
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}
