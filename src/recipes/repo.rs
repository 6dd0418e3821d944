use async_trait::async_trait;
use sqlx::{types::Json, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    db::escape_like,
    recipes::{
        repo_types::{NewRecipe, Recipe, RecipePatch, RecipeRow, SavedRecipeRef},
        search::{SearchCriteria, SortKey},
    },
};

#[async_trait]
pub trait RecipeStore: Send + Sync {
    /// Inserts the recipe and records its author as the first saver.
    async fn insert(&self, new_recipe: NewRecipe) -> anyhow::Result<Recipe>;
    /// Any recipe with this id, soft-deleted ones included.
    async fn find(&self, id: Uuid) -> anyhow::Result<Option<Recipe>>;
    /// Applies `patch` if the recipe is live and authored by `author_id`.
    async fn update_owned(
        &self,
        id: Uuid,
        author_id: Uuid,
        patch: RecipePatch,
    ) -> anyhow::Result<Option<Recipe>>;
    /// Flags a live owned recipe deleted and removes its edits in one
    /// transaction. Returns the number of edits removed, `None` if nothing
    /// matched.
    async fn soft_delete_owned(&self, id: Uuid, author_id: Uuid) -> anyhow::Result<Option<u64>>;
    async fn search(&self, criteria: &SearchCriteria) -> anyhow::Result<(Vec<Recipe>, i64)>;
    async fn add_saver(&self, recipe_id: Uuid, user_id: Uuid) -> anyhow::Result<()>;
    async fn remove_saver(&self, recipe_id: Uuid, user_id: Uuid) -> anyhow::Result<()>;
    /// Live recipes saved by `user_id`, oldest save first.
    async fn saved_by_user(&self, user_id: Uuid) -> anyhow::Result<Vec<SavedRecipeRef>>;
}

const RECIPE_SELECT: &str = r#"
    SELECT r.id, r.author_id, r.author_type, r.b_private, r.b_allow_suggestions,
           r.title, r.description, r.category, r.serves, r.prep_time, r.cook_time,
           r.ingredients, r.steps, r.tags,
           ARRAY(
               SELECT s.user_id FROM recipe_saves s
                WHERE s.recipe_id = r.id
                ORDER BY s.created_at, s.user_id
           ) AS saved_by,
           r.b_deleted, r.created_at, r.updated_at
      FROM recipes r
"#;

#[derive(Clone)]
pub struct PgRecipeStore {
    db: PgPool,
}

impl PgRecipeStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

fn push_filters<'a>(qb: &mut QueryBuilder<'a, Postgres>, c: &'a SearchCriteria) {
    qb.push(" WHERE NOT r.b_deleted AND (NOT r.b_private OR (r.author_type = 'User' AND r.author_id = ")
        .push_bind(c.viewer)
        .push("))");
    if let Some(category) = c.category {
        qb.push(" AND r.category = ").push_bind(category.as_str());
    }
    if let Some(author_id) = c.author_id {
        qb.push(" AND r.author_id = ").push_bind(author_id);
    }
    if c.only_saved_by_viewer {
        qb.push(" AND EXISTS (SELECT 1 FROM recipe_saves s WHERE s.recipe_id = r.id AND s.user_id = ")
            .push_bind(c.viewer)
            .push(")");
    }
    if let Some(text) = &c.text {
        let pattern = format!("%{}%", escape_like(text));
        qb.push(" AND (r.title ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR r.description ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

fn order_clause(sort: SortKey) -> &'static str {
    match sort {
        SortKey::Newest => " ORDER BY r.created_at DESC, r.id",
        SortKey::Oldest => " ORDER BY r.created_at ASC, r.id",
        SortKey::Title => r#" ORDER BY r.title COLLATE "C" ASC, r.id"#,
        SortKey::Popularity => {
            " ORDER BY (SELECT count(*) FROM recipe_saves s WHERE s.recipe_id = r.id) DESC, \
             r.created_at DESC, r.id"
        }
    }
}

#[async_trait]
impl RecipeStore for PgRecipeStore {
    async fn insert(&self, n: NewRecipe) -> anyhow::Result<Recipe> {
        let mut tx = self.db.begin().await?;

        let id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO recipes (
                author_id, author_type, b_private, b_allow_suggestions, title,
                description, category, serves, prep_time, cook_time,
                ingredients, steps, tags
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING id
            "#,
        )
        .bind(n.author_id)
        .bind(n.author_kind.as_str())
        .bind(n.b_private)
        .bind(n.b_allow_suggestions)
        .bind(&n.title)
        .bind(n.description.as_deref())
        .bind(n.category.as_str())
        .bind(n.serves)
        .bind(n.prep_time)
        .bind(n.cook_time)
        .bind(Json(&n.ingredients))
        .bind(&n.steps)
        .bind(&n.tags)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO recipe_saves (recipe_id, user_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(id)
        .bind(n.author_id)
        .execute(&mut *tx)
        .await?;

        let row = sqlx::query_as::<_, RecipeRow>(&format!("{RECIPE_SELECT} WHERE r.id = $1"))
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;
        tx.commit().await?;

        Recipe::try_from(row)
    }

    async fn find(&self, id: Uuid) -> anyhow::Result<Option<Recipe>> {
        let row = sqlx::query_as::<_, RecipeRow>(&format!("{RECIPE_SELECT} WHERE r.id = $1"))
            .bind(id)
            .fetch_optional(&self.db)
            .await?;
        row.map(Recipe::try_from).transpose()
    }

    async fn update_owned(
        &self,
        id: Uuid,
        author_id: Uuid,
        patch: RecipePatch,
    ) -> anyhow::Result<Option<Recipe>> {
        let mut qb = QueryBuilder::<Postgres>::new("UPDATE recipes SET updated_at = now()");
        if let Some(v) = patch.b_private {
            qb.push(", b_private = ").push_bind(v);
        }
        if let Some(v) = patch.b_allow_suggestions {
            qb.push(", b_allow_suggestions = ").push_bind(v);
        }
        if let Some(v) = patch.title {
            qb.push(", title = ").push_bind(v);
        }
        if let Some(v) = patch.description {
            qb.push(", description = ").push_bind(v);
        }
        if let Some(v) = patch.category {
            qb.push(", category = ").push_bind(v.as_str());
        }
        if let Some(v) = patch.serves {
            qb.push(", serves = ").push_bind(v);
        }
        if let Some(v) = patch.prep_time {
            qb.push(", prep_time = ").push_bind(v);
        }
        if let Some(v) = patch.cook_time {
            qb.push(", cook_time = ").push_bind(v);
        }
        if let Some(v) = patch.ingredients {
            qb.push(", ingredients = ").push_bind(Json(v));
        }
        if let Some(v) = patch.steps {
            qb.push(", steps = ").push_bind(v);
        }
        if let Some(v) = patch.tags {
            qb.push(", tags = ").push_bind(v);
        }
        qb.push(" WHERE id = ")
            .push_bind(id)
            .push(" AND author_id = ")
            .push_bind(author_id)
            .push(" AND author_type = 'User' AND NOT b_deleted RETURNING id");

        let updated = qb.build_query_scalar::<Uuid>().fetch_optional(&self.db).await?;
        match updated {
            Some(id) => self.find(id).await,
            None => Ok(None),
        }
    }

    async fn soft_delete_owned(&self, id: Uuid, author_id: Uuid) -> anyhow::Result<Option<u64>> {
        let mut tx = self.db.begin().await?;

        let flagged = sqlx::query(
            r#"
            UPDATE recipes
               SET b_deleted = TRUE, updated_at = now()
             WHERE id = $1 AND author_id = $2 AND author_type = 'User' AND NOT b_deleted
            "#,
        )
        .bind(id)
        .bind(author_id)
        .execute(&mut *tx)
        .await?;
        if flagged.rows_affected() != 1 {
            return Ok(None);
        }

        let removed = sqlx::query("DELETE FROM edits WHERE recipe_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        Ok(Some(removed.rows_affected()))
    }

    async fn search(&self, criteria: &SearchCriteria) -> anyhow::Result<(Vec<Recipe>, i64)> {
        let mut count_qb = QueryBuilder::<Postgres>::new("SELECT count(*) FROM recipes r");
        push_filters(&mut count_qb, criteria);
        let total: i64 = count_qb.build_query_scalar::<i64>().fetch_one(&self.db).await?;

        let mut qb = QueryBuilder::<Postgres>::new(RECIPE_SELECT);
        push_filters(&mut qb, criteria);
        qb.push(order_clause(criteria.sort))
            .push(" LIMIT ")
            .push_bind(criteria.page_size)
            .push(" OFFSET ")
            .push_bind(criteria.skip());
        let rows = qb.build_query_as::<RecipeRow>().fetch_all(&self.db).await?;

        let recipes = rows
            .into_iter()
            .map(Recipe::try_from)
            .collect::<anyhow::Result<Vec<_>>>()?;
        Ok((recipes, total))
    }

    async fn add_saver(&self, recipe_id: Uuid, user_id: Uuid) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT INTO recipe_saves (recipe_id, user_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(recipe_id)
        .bind(user_id)
        .execute(&self.db)
        .await?;
        Ok(())
    }

    async fn remove_saver(&self, recipe_id: Uuid, user_id: Uuid) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM recipe_saves WHERE recipe_id = $1 AND user_id = $2")
            .bind(recipe_id)
            .bind(user_id)
            .execute(&self.db)
            .await?;
        Ok(())
    }

    async fn saved_by_user(&self, user_id: Uuid) -> anyhow::Result<Vec<SavedRecipeRef>> {
        let refs = sqlx::query_as::<_, SavedRecipeRef>(
            r#"
            SELECT s.recipe_id
              FROM recipe_saves s
              JOIN recipes r ON r.id = s.recipe_id
             WHERE s.user_id = $1 AND NOT r.b_deleted
             ORDER BY s.created_at, s.recipe_id
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;
        Ok(refs)
    }
}
