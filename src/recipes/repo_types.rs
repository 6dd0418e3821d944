use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Starter,
    #[serde(rename = "Small Plate")]
    SmallPlate,
    Sharer,
    Main,
    Dessert,
    Breakfast,
    Lunch,
    Cocktail,
    Baking,
}

impl Category {
    pub const ALL: [Category; 9] = [
        Category::Starter,
        Category::SmallPlate,
        Category::Sharer,
        Category::Main,
        Category::Dessert,
        Category::Breakfast,
        Category::Lunch,
        Category::Cocktail,
        Category::Baking,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Starter => "Starter",
            Category::SmallPlate => "Small Plate",
            Category::Sharer => "Sharer",
            Category::Main => "Main",
            Category::Dessert => "Dessert",
            Category::Breakfast => "Breakfast",
            Category::Lunch => "Lunch",
            Category::Cocktail => "Cocktail",
            Category::Baking => "Baking",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == raw)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    G,
    Kg,
    Tsp,
    Tbsp,
    Ml,
    Liter,
    Pieces,
    Cloves,
    Small,
    Medium,
    Large,
}

impl Unit {
    pub const ALL: [Unit; 11] = [
        Unit::G,
        Unit::Kg,
        Unit::Tsp,
        Unit::Tbsp,
        Unit::Ml,
        Unit::Liter,
        Unit::Pieces,
        Unit::Cloves,
        Unit::Small,
        Unit::Medium,
        Unit::Large,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Unit::G => "g",
            Unit::Kg => "kg",
            Unit::Tsp => "tsp",
            Unit::Tbsp => "tbsp",
            Unit::Ml => "ml",
            Unit::Liter => "liter",
            Unit::Pieces => "pieces",
            Unit::Cloves => "cloves",
            Unit::Small => "small",
            Unit::Medium => "medium",
            Unit::Large => "large",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|u| u.as_str() == raw)
    }
}

/// Which kind of entity a recipe's `author_id` points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AuthorKind {
    #[default]
    User,
    RecipeBook,
}

impl AuthorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            AuthorKind::User => "User",
            AuthorKind::RecipeBook => "RecipeBook",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "User" => Some(AuthorKind::User),
            "RecipeBook" => Some(AuthorKind::RecipeBook),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ingredient {
    #[serde(default)]
    pub subheader: Option<String>,
    pub quantity: f64,
    pub name: String,
    pub unit: Unit,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipe {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub author_id: Uuid,
    #[serde(rename = "authorType")]
    pub author_kind: AuthorKind,
    pub b_private: bool,
    pub b_allow_suggestions: bool,
    pub title: String,
    pub description: Option<String>,
    pub category: Category,
    pub serves: f64,
    pub prep_time: f64,
    pub cook_time: f64,
    pub ingredients: Vec<Ingredient>,
    pub steps: Vec<String>,
    pub tags: Vec<String>,
    pub saved_by: Vec<Uuid>,
    #[serde(skip)]
    pub b_deleted: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl Recipe {
    pub fn is_author(&self, viewer: Uuid) -> bool {
        self.author_kind == AuthorKind::User && self.author_id == viewer
    }

    /// Live and either public or authored by `viewer`.
    pub fn is_visible_to(&self, viewer: Uuid) -> bool {
        !self.b_deleted && (!self.b_private || self.is_author(viewer))
    }
}

#[derive(Debug, FromRow)]
pub struct RecipeRow {
    pub id: Uuid,
    pub author_id: Uuid,
    pub author_type: String,
    pub b_private: bool,
    pub b_allow_suggestions: bool,
    pub title: String,
    pub description: Option<String>,
    pub category: String,
    pub serves: f64,
    pub prep_time: f64,
    pub cook_time: f64,
    pub ingredients: Json<Vec<Ingredient>>,
    pub steps: Vec<String>,
    pub tags: Vec<String>,
    pub saved_by: Vec<Uuid>,
    pub b_deleted: bool,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl TryFrom<RecipeRow> for Recipe {
    type Error = anyhow::Error;

    fn try_from(r: RecipeRow) -> Result<Self, Self::Error> {
        let category = Category::parse(&r.category)
            .ok_or_else(|| anyhow::anyhow!("unknown category {:?} on recipe {}", r.category, r.id))?;
        let author_kind = AuthorKind::parse(&r.author_type).ok_or_else(|| {
            anyhow::anyhow!("unknown author type {:?} on recipe {}", r.author_type, r.id)
        })?;
        Ok(Self {
            id: r.id,
            author_id: r.author_id,
            author_kind,
            b_private: r.b_private,
            b_allow_suggestions: r.b_allow_suggestions,
            title: r.title,
            description: r.description,
            category,
            serves: r.serves,
            prep_time: r.prep_time,
            cook_time: r.cook_time,
            ingredients: r.ingredients.0,
            steps: r.steps,
            tags: r.tags,
            saved_by: r.saved_by,
            b_deleted: r.b_deleted,
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewRecipe {
    pub author_id: Uuid,
    pub author_kind: AuthorKind,
    pub b_private: bool,
    pub b_allow_suggestions: bool,
    pub title: String,
    pub description: Option<String>,
    pub category: Category,
    pub serves: f64,
    pub prep_time: f64,
    pub cook_time: f64,
    pub ingredients: Vec<Ingredient>,
    pub steps: Vec<String>,
    pub tags: Vec<String>,
}

/// A validated partial update; `None` leaves the column untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecipePatch {
    pub b_private: Option<bool>,
    pub b_allow_suggestions: Option<bool>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<Category>,
    pub serves: Option<f64>,
    pub prep_time: Option<f64>,
    pub cook_time: Option<f64>,
    pub ingredients: Option<Vec<Ingredient>>,
    pub steps: Option<Vec<String>>,
    pub tags: Option<Vec<String>>,
}

impl RecipePatch {
    pub fn is_empty(&self) -> bool {
        *self == RecipePatch::default()
    }

    pub fn apply_to(self, recipe: &mut Recipe) {
        if let Some(v) = self.b_private {
            recipe.b_private = v;
        }
        if let Some(v) = self.b_allow_suggestions {
            recipe.b_allow_suggestions = v;
        }
        if let Some(v) = self.title {
            recipe.title = v;
        }
        if let Some(v) = self.description {
            recipe.description = Some(v);
        }
        if let Some(v) = self.category {
            recipe.category = v;
        }
        if let Some(v) = self.serves {
            recipe.serves = v;
        }
        if let Some(v) = self.prep_time {
            recipe.prep_time = v;
        }
        if let Some(v) = self.cook_time {
            recipe.cook_time = v;
        }
        if let Some(v) = self.ingredients {
            recipe.ingredients = v;
        }
        if let Some(v) = self.steps {
            recipe.steps = v;
        }
        if let Some(v) = self.tags {
            recipe.tags = v;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct SavedRecipeRef {
    pub recipe_id: Uuid,
}
