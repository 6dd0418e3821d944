use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use uuid::Uuid;

use crate::{auth::repo::UserStore, recipes::repo_types::AuthorKind};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuthorInfo {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub kind: AuthorKind,
    pub name: String,
    pub photo: Option<String>,
}

/// `None` when the author is gone or the kind has no directory.
#[async_trait]
pub trait AuthorResolver: Send + Sync {
    async fn resolve_author(&self, kind: AuthorKind, id: Uuid) -> anyhow::Result<Option<AuthorInfo>>;
}

pub struct DirectoryResolver {
    users: Arc<dyn UserStore>,
}

impl DirectoryResolver {
    pub fn new(users: Arc<dyn UserStore>) -> Self {
        Self { users }
    }
}

#[async_trait]
impl AuthorResolver for DirectoryResolver {
    async fn resolve_author(&self, kind: AuthorKind, id: Uuid) -> anyhow::Result<Option<AuthorInfo>> {
        match kind {
            AuthorKind::User => Ok(self.users.find_by_id(id).await?.map(|user| AuthorInfo {
                id: user.id,
                kind,
                name: user.username,
                photo: Some(user.photo),
            })),
            AuthorKind::RecipeBook => Ok(None),
        }
    }
}
