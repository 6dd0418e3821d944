//! In-memory stores and a recording mailer backing `AppState::fake()`.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::{
    auth::{
        repo::UserStore,
        repo_types::{NewUser, User, DEFAULT_PHOTO},
    },
    edits::{
        repo::EditStore,
        repo_types::{Edit, EditPayload, EditStatus},
    },
    error::AppError,
    mailer::Mailer,
    recipes::{
        repo::RecipeStore,
        repo_types::{NewRecipe, Recipe, RecipePatch, SavedRecipeRef},
        search::SearchCriteria,
    },
};

/// Strictly increasing timestamps so ordering by creation is deterministic.
#[derive(Default)]
struct Clock {
    last: Option<OffsetDateTime>,
}

impl Clock {
    fn tick(&mut self) -> OffsetDateTime {
        let now = OffsetDateTime::now_utc();
        let next = match self.last {
            Some(last) if now <= last => last + Duration::microseconds(1),
            _ => now,
        };
        self.last = Some(next);
        next
    }
}

#[derive(Default)]
pub struct MemoryUserStore {
    users: Mutex<Vec<User>>,
}

impl MemoryUserStore {
    fn update(&self, id: Uuid, f: impl FnOnce(&mut User)) {
        let mut users = self.users.lock().unwrap();
        if let Some(user) = users.iter_mut().find(|u| u.id == id) {
            f(user);
            user.updated_at = OffsetDateTime::now_utc();
        }
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        let users = self.users.lock().unwrap();
        Ok(users.iter().find(|u| u.id == id && u.active).cloned())
    }

    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let users = self.users.lock().unwrap();
        Ok(users.iter().find(|u| u.email == email && u.active).cloned())
    }

    async fn create(&self, new_user: NewUser) -> anyhow::Result<User> {
        let mut users = self.users.lock().unwrap();
        for existing in users.iter().filter(|u| u.active) {
            let field = if existing.username == new_user.username {
                "username"
            } else if existing.email == new_user.email {
                "email"
            } else {
                continue;
            };
            return Err(AppError::DuplicateField {
                field: field.into(),
            }
            .into());
        }
        let now = OffsetDateTime::now_utc();
        let user = User {
            id: Uuid::new_v4(),
            username: new_user.username,
            email: new_user.email,
            password_hash: new_user.password_hash,
            password_changed_at: None,
            password_reset_digest: None,
            password_reset_expires: None,
            photo: DEFAULT_PHOTO.into(),
            active: true,
            created_at: now,
            updated_at: now,
        };
        users.push(user.clone());
        Ok(user)
    }

    async fn set_password(
        &self,
        id: Uuid,
        password_hash: &str,
        changed_at: OffsetDateTime,
    ) -> anyhow::Result<()> {
        self.update(id, |u| {
            u.password_hash = password_hash.to_string();
            u.password_changed_at = Some(changed_at);
            u.password_reset_digest = None;
            u.password_reset_expires = None;
        });
        Ok(())
    }

    async fn set_reset_token(
        &self,
        id: Uuid,
        digest: Option<&str>,
        expires: Option<OffsetDateTime>,
    ) -> anyhow::Result<()> {
        self.update(id, |u| {
            u.password_reset_digest = digest.map(str::to_string);
            u.password_reset_expires = expires;
        });
        Ok(())
    }

    async fn find_by_reset_digest(
        &self,
        digest: &str,
        now: OffsetDateTime,
    ) -> anyhow::Result<Option<User>> {
        let users = self.users.lock().unwrap();
        Ok(users
            .iter()
            .find(|u| {
                u.active
                    && u.password_reset_digest.as_deref() == Some(digest)
                    && u.password_reset_expires.is_some_and(|e| e > now)
            })
            .cloned())
    }

    async fn deactivate(&self, id: Uuid) -> anyhow::Result<()> {
        self.update(id, |u| u.active = false);
        Ok(())
    }
}

#[derive(Default)]
struct RecipeTables {
    recipes: Vec<Recipe>,
    /// (recipe_id, user_id), in save order.
    saves: Vec<(Uuid, Uuid)>,
    clock: Clock,
}

impl RecipeTables {
    fn hydrate(&self, recipe: &Recipe) -> Recipe {
        let mut recipe = recipe.clone();
        recipe.saved_by = self
            .saves
            .iter()
            .filter(|(r, _)| *r == recipe.id)
            .map(|(_, u)| *u)
            .collect();
        recipe
    }
}

pub struct MemoryRecipeStore {
    tables: Mutex<RecipeTables>,
    edits: Arc<MemoryEditStore>,
}

impl MemoryRecipeStore {
    /// Soft deletes cascade into `edits`.
    pub fn new(edits: Arc<MemoryEditStore>) -> Self {
        Self {
            tables: Mutex::default(),
            edits,
        }
    }
}

#[async_trait]
impl RecipeStore for MemoryRecipeStore {
    async fn insert(&self, n: NewRecipe) -> anyhow::Result<Recipe> {
        let mut t = self.tables.lock().unwrap();
        let now = t.clock.tick();
        let recipe = Recipe {
            id: Uuid::new_v4(),
            author_id: n.author_id,
            author_kind: n.author_kind,
            b_private: n.b_private,
            b_allow_suggestions: n.b_allow_suggestions,
            title: n.title,
            description: n.description,
            category: n.category,
            serves: n.serves,
            prep_time: n.prep_time,
            cook_time: n.cook_time,
            ingredients: n.ingredients,
            steps: n.steps,
            tags: n.tags,
            saved_by: Vec::new(),
            b_deleted: false,
            created_at: now,
            updated_at: now,
        };
        t.saves.push((recipe.id, n.author_id));
        t.recipes.push(recipe.clone());
        Ok(t.hydrate(&recipe))
    }

    async fn find(&self, id: Uuid) -> anyhow::Result<Option<Recipe>> {
        let t = self.tables.lock().unwrap();
        Ok(t.recipes.iter().find(|r| r.id == id).map(|r| t.hydrate(r)))
    }

    async fn update_owned(
        &self,
        id: Uuid,
        author_id: Uuid,
        patch: RecipePatch,
    ) -> anyhow::Result<Option<Recipe>> {
        let mut t = self.tables.lock().unwrap();
        let now = t.clock.tick();
        let Some(recipe) = t
            .recipes
            .iter_mut()
            .find(|r| r.id == id && r.is_author(author_id) && !r.b_deleted)
        else {
            return Ok(None);
        };
        patch.apply_to(recipe);
        recipe.updated_at = now;
        let updated = recipe.clone();
        Ok(Some(t.hydrate(&updated)))
    }

    async fn soft_delete_owned(&self, id: Uuid, author_id: Uuid) -> anyhow::Result<Option<u64>> {
        let mut t = self.tables.lock().unwrap();
        match t
            .recipes
            .iter_mut()
            .find(|r| r.id == id && r.is_author(author_id) && !r.b_deleted)
        {
            Some(recipe) => {
                recipe.b_deleted = true;
                Ok(Some(self.edits.purge_recipe(id)))
            }
            None => Ok(None),
        }
    }

    async fn search(&self, criteria: &SearchCriteria) -> anyhow::Result<(Vec<Recipe>, i64)> {
        let t = self.tables.lock().unwrap();
        let mut matches: Vec<Recipe> = t
            .recipes
            .iter()
            .map(|r| t.hydrate(r))
            .filter(|r| criteria.matches(r))
            .collect();
        matches.sort_by(|a, b| criteria.compare(a, b));
        let total = matches.len() as i64;
        let page = matches
            .into_iter()
            .skip(criteria.skip() as usize)
            .take(criteria.page_size as usize)
            .collect();
        Ok((page, total))
    }

    async fn add_saver(&self, recipe_id: Uuid, user_id: Uuid) -> anyhow::Result<()> {
        let mut t = self.tables.lock().unwrap();
        if !t.saves.contains(&(recipe_id, user_id)) {
            t.saves.push((recipe_id, user_id));
        }
        Ok(())
    }

    async fn remove_saver(&self, recipe_id: Uuid, user_id: Uuid) -> anyhow::Result<()> {
        let mut t = self.tables.lock().unwrap();
        t.saves.retain(|save| *save != (recipe_id, user_id));
        Ok(())
    }

    async fn saved_by_user(&self, user_id: Uuid) -> anyhow::Result<Vec<SavedRecipeRef>> {
        let t = self.tables.lock().unwrap();
        Ok(t.saves
            .iter()
            .filter(|(_, u)| *u == user_id)
            .filter(|(r, _)| t.recipes.iter().any(|rec| rec.id == *r && !rec.b_deleted))
            .map(|(r, _)| SavedRecipeRef { recipe_id: *r })
            .collect())
    }
}

#[derive(Default)]
struct EditTable {
    edits: Vec<Edit>,
    clock: Clock,
}

#[derive(Default)]
pub struct MemoryEditStore {
    table: Mutex<EditTable>,
}

impl MemoryEditStore {
    fn purge_recipe(&self, recipe_id: Uuid) -> u64 {
        let mut t = self.table.lock().unwrap();
        let before = t.edits.len();
        t.edits.retain(|e| e.recipe_id != recipe_id);
        (before - t.edits.len()) as u64
    }

    fn new_edit(
        now: OffsetDateTime,
        recipe_id: Uuid,
        user_id: Uuid,
        payload: &EditPayload,
        suggestion: bool,
    ) -> Edit {
        Edit {
            id: Uuid::new_v4(),
            recipe_id,
            user_id,
            is_suggestion: suggestion,
            ingredients: payload.ingredients.clone(),
            steps: payload.steps.clone(),
            comments: payload.comments.clone(),
            status: suggestion.then_some(EditStatus::Pending),
            created_at: now,
            updated_at: now,
        }
    }
}

#[async_trait]
impl EditStore for MemoryEditStore {
    async fn find_personal(&self, recipe_id: Uuid, user_id: Uuid) -> anyhow::Result<Option<Edit>> {
        let t = self.table.lock().unwrap();
        Ok(t.edits
            .iter()
            .find(|e| e.recipe_id == recipe_id && e.user_id == user_id && !e.is_suggestion)
            .cloned())
    }

    async fn upsert_personal(
        &self,
        recipe_id: Uuid,
        user_id: Uuid,
        payload: &EditPayload,
    ) -> anyhow::Result<Edit> {
        let mut t = self.table.lock().unwrap();
        let now = t.clock.tick();
        if let Some(existing) = t
            .edits
            .iter_mut()
            .find(|e| e.recipe_id == recipe_id && e.user_id == user_id && !e.is_suggestion)
        {
            existing.ingredients = payload.ingredients.clone();
            existing.steps = payload.steps.clone();
            existing.comments = payload.comments.clone();
            existing.updated_at = now;
            return Ok(existing.clone());
        }
        let edit = Self::new_edit(now, recipe_id, user_id, payload, false);
        t.edits.push(edit.clone());
        Ok(edit)
    }

    async fn insert_suggestion(
        &self,
        recipe_id: Uuid,
        user_id: Uuid,
        payload: &EditPayload,
    ) -> anyhow::Result<Edit> {
        let mut t = self.table.lock().unwrap();
        let now = t.clock.tick();
        let edit = Self::new_edit(now, recipe_id, user_id, payload, true);
        t.edits.push(edit.clone());
        Ok(edit)
    }

    async fn list_for_recipe(&self, recipe_id: Uuid) -> anyhow::Result<Vec<Edit>> {
        let t = self.table.lock().unwrap();
        Ok(t.edits
            .iter()
            .filter(|e| e.recipe_id == recipe_id)
            .cloned()
            .collect())
    }
}

#[derive(Debug, Clone)]
pub struct SentEmail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Keeps every message it is asked to send; optionally refuses them all.
#[derive(Default)]
pub struct RecordingMailer {
    fail: bool,
    sent: Mutex<Vec<SentEmail>>,
}

impl RecordingMailer {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn sent(&self) -> Vec<SentEmail> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send_email(&self, to: &str, subject: &str, body: &str) -> anyhow::Result<()> {
        if self.fail {
            anyhow::bail!("smtp relay unavailable");
        }
        self.sent.lock().unwrap().push(SentEmail {
            to: to.into(),
            subject: subject.into(),
            body: body.into(),
        });
        Ok(())
    }
}
