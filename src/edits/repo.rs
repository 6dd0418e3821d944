use async_trait::async_trait;
use sqlx::{types::Json, PgPool};
use uuid::Uuid;

use crate::edits::repo_types::{Edit, EditPayload, EditRow, EditStatus};

#[async_trait]
pub trait EditStore: Send + Sync {
    async fn find_personal(&self, recipe_id: Uuid, user_id: Uuid) -> anyhow::Result<Option<Edit>>;
    /// Creates the personal edit or replaces it wholesale; never duplicates.
    async fn upsert_personal(
        &self,
        recipe_id: Uuid,
        user_id: Uuid,
        payload: &EditPayload,
    ) -> anyhow::Result<Edit>;
    async fn insert_suggestion(
        &self,
        recipe_id: Uuid,
        user_id: Uuid,
        payload: &EditPayload,
    ) -> anyhow::Result<Edit>;
    async fn list_for_recipe(&self, recipe_id: Uuid) -> anyhow::Result<Vec<Edit>>;
}

const EDIT_COLUMNS: &str = r#"
    id, recipe_id, user_id, is_suggestion, ingredients, steps, comments,
    status, created_at, updated_at
"#;

#[derive(Clone)]
pub struct PgEditStore {
    db: PgPool,
}

impl PgEditStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl EditStore for PgEditStore {
    async fn find_personal(&self, recipe_id: Uuid, user_id: Uuid) -> anyhow::Result<Option<Edit>> {
        let row = sqlx::query_as::<_, EditRow>(&format!(
            r#"
            SELECT {EDIT_COLUMNS}
              FROM edits
             WHERE recipe_id = $1 AND user_id = $2 AND NOT is_suggestion
            "#
        ))
        .bind(recipe_id)
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?;
        row.map(Edit::try_from).transpose()
    }

    async fn upsert_personal(
        &self,
        recipe_id: Uuid,
        user_id: Uuid,
        payload: &EditPayload,
    ) -> anyhow::Result<Edit> {
        // edits_personal_key: one non-suggestion row per (recipe, user).
        let row = sqlx::query_as::<_, EditRow>(&format!(
            r#"
            INSERT INTO edits (recipe_id, user_id, is_suggestion, ingredients, steps, comments, status)
            VALUES ($1, $2, FALSE, $3, $4, $5, NULL)
            ON CONFLICT (recipe_id, user_id) WHERE NOT is_suggestion
            DO UPDATE SET ingredients = EXCLUDED.ingredients,
                          steps       = EXCLUDED.steps,
                          comments    = EXCLUDED.comments,
                          updated_at  = now()
            RETURNING {EDIT_COLUMNS}
            "#
        ))
        .bind(recipe_id)
        .bind(user_id)
        .bind(Json(&payload.ingredients))
        .bind(&payload.steps)
        .bind(payload.comments.as_deref())
        .fetch_one(&self.db)
        .await?;
        Edit::try_from(row)
    }

    async fn insert_suggestion(
        &self,
        recipe_id: Uuid,
        user_id: Uuid,
        payload: &EditPayload,
    ) -> anyhow::Result<Edit> {
        let row = sqlx::query_as::<_, EditRow>(&format!(
            r#"
            INSERT INTO edits (recipe_id, user_id, is_suggestion, ingredients, steps, comments, status)
            VALUES ($1, $2, TRUE, $3, $4, $5, $6)
            RETURNING {EDIT_COLUMNS}
            "#
        ))
        .bind(recipe_id)
        .bind(user_id)
        .bind(Json(&payload.ingredients))
        .bind(&payload.steps)
        .bind(payload.comments.as_deref())
        .bind(EditStatus::Pending.as_str())
        .fetch_one(&self.db)
        .await?;
        Edit::try_from(row)
    }

    async fn list_for_recipe(&self, recipe_id: Uuid) -> anyhow::Result<Vec<Edit>> {
        let rows = sqlx::query_as::<_, EditRow>(&format!(
            "SELECT {EDIT_COLUMNS} FROM edits WHERE recipe_id = $1 ORDER BY created_at, id"
        ))
        .bind(recipe_id)
        .fetch_all(&self.db)
        .await?;
        rows.into_iter().map(Edit::try_from).collect()
    }
}
