use std::cmp::Ordering;

use uuid::Uuid;

use crate::{
    error::{AppError, FieldError},
    recipes::{
        dto::SearchQuery,
        repo_types::{Category, Recipe},
    },
    validation::INVALID_OPTIONS,
};

pub const DEFAULT_PAGE_SIZE: i64 = 10;
pub const MAX_PAGE_SIZE: i64 = 100;
pub const MAX_PAGE: i64 = i64::MAX / MAX_PAGE_SIZE;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    #[default]
    Newest,
    Oldest,
    Title,
    Popularity,
}

impl SortKey {
    /// Unknown keys fall back to newest-first.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some("oldest") => SortKey::Oldest,
            Some("title") => SortKey::Title,
            Some("popularity") | Some("popular") => SortKey::Popularity,
            _ => SortKey::Newest,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchCriteria {
    pub viewer: Uuid,
    pub page: i64,
    pub page_size: i64,
    pub sort: SortKey,
    pub category: Option<Category>,
    pub text: Option<String>,
    pub author_id: Option<Uuid>,
    pub only_saved_by_viewer: bool,
}

impl SearchCriteria {
    pub fn from_query(query: SearchQuery, viewer: Uuid) -> Result<Self, AppError> {
        let category = match query.category.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(Category::parse(raw).ok_or_else(|| {
                AppError::validation(vec![FieldError::new("category", INVALID_OPTIONS)])
            })?),
        };
        Ok(Self {
            viewer,
            page: query.page.unwrap_or(1).clamp(1, MAX_PAGE),
            page_size: query
                .limit
                .unwrap_or(DEFAULT_PAGE_SIZE)
                .clamp(1, MAX_PAGE_SIZE),
            sort: SortKey::parse(query.sort.as_deref()),
            category,
            text: query
                .search
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
            author_id: query.author_id,
            only_saved_by_viewer: query.only_saved.unwrap_or(false),
        })
    }

    pub fn skip(&self) -> i64 {
        self.page
            .saturating_sub(1)
            .max(0)
            .saturating_mul(self.page_size.max(0))
    }

    // Same predicate as `push_filters` in the Pg store.
    pub fn matches(&self, recipe: &Recipe) -> bool {
        if !recipe.is_visible_to(self.viewer) {
            return false;
        }
        if self.category.is_some_and(|c| c != recipe.category) {
            return false;
        }
        if self.author_id.is_some_and(|a| a != recipe.author_id) {
            return false;
        }
        if self.only_saved_by_viewer && !recipe.saved_by.contains(&self.viewer) {
            return false;
        }
        match &self.text {
            None => true,
            Some(text) => {
                let needle = text.to_lowercase();
                recipe.title.to_lowercase().contains(&needle)
                    || recipe
                        .description
                        .as_deref()
                        .is_some_and(|d| d.to_lowercase().contains(&needle))
            }
        }
    }

    pub fn compare(&self, a: &Recipe, b: &Recipe) -> Ordering {
        let primary = match self.sort {
            SortKey::Newest => b.created_at.cmp(&a.created_at),
            SortKey::Oldest => a.created_at.cmp(&b.created_at),
            SortKey::Title => a.title.as_bytes().cmp(b.title.as_bytes()),
            SortKey::Popularity => b
                .saved_by
                .len()
                .cmp(&a.saved_by.len())
                .then_with(|| b.created_at.cmp(&a.created_at)),
        };
        primary.then_with(|| a.id.cmp(&b.id))
    }
}

pub fn total_pages(total: i64, page_size: i64) -> i64 {
    if page_size <= 0 {
        return 0;
    }
    (total + page_size - 1) / page_size
}
