use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    edits::{overlay::MergedRecipe, repo_types::Edit},
    recipes::{author::AuthorInfo, repo_types::Recipe},
};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub sort: Option<String>,
    pub category: Option<String>,
    pub search: Option<String>,
    pub author_id: Option<Uuid>,
    #[serde(rename = "bOnlySaved")]
    pub only_saved: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct RecipeData<'a> {
    pub recipe: &'a Recipe,
}

#[derive(Debug, Serialize)]
pub struct MergedRecipeData {
    pub recipe: MergedRecipe,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<AuthorInfo>,
}

#[derive(Debug, Serialize)]
pub struct EditsData {
    pub edits: Vec<Edit>,
}
