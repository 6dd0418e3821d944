//! Payload validation for recipes and edits.
//!
//! Every function here is pure: it reads a JSON object, collects every field
//! problem it finds, and either returns a typed value ready for storage or a
//! single [`AppError::Validation`] carrying the whole batch. Nothing touches
//! the database, so handlers call these before any persistence.
//!
//! Field paths follow the `ingredients.[0].quantity` format clients already
//! parse.

use serde_json::{Map, Value};
use uuid::Uuid;

use crate::{
    edits::repo_types::EditPayload,
    error::{AppError, FieldError},
    recipes::repo_types::{AuthorKind, Category, Ingredient, NewRecipe, RecipePatch, Unit},
};

pub const REQUIRED: &str = "REQUIRED";
pub const TOO_SMALL: &str = "TOO_SMALL";
pub const INVALID_TYPE: &str = "INVALID_TYPE";
pub const INVALID_OPTIONS: &str = "INVALID_OPTIONS";
pub const INVALID_FIELDNAME: &str = "INVALID_FIELDNAME";

/// Top-level keys an owner update may carry. `authorType` is accepted and
/// ignored; authorship never changes after creation.
const UPDATE_KEYS: &[&str] = &[
    "id",
    "authorType",
    "bPrivate",
    "bAllowSuggestions",
    "title",
    "description",
    "category",
    "serves",
    "prepTime",
    "cookTime",
    "ingredients",
    "steps",
    "tags",
];

const EDIT_KEYS: &[&str] = &["id", "isSuggestion", "ingredients", "steps", "comments"];

#[derive(Default)]
struct Checker {
    errors: Vec<FieldError>,
}

impl Checker {
    fn push(&mut self, path: impl Into<String>, code: &'static str) {
        self.errors.push(FieldError::new(path, code));
    }

    fn finish<T>(self, value: T) -> Result<T, AppError> {
        if self.errors.is_empty() {
            Ok(value)
        } else {
            Err(AppError::validation(self.errors))
        }
    }

    fn reject_unknown(&mut self, body: &Map<String, Value>, allowed: &[&str]) {
        for key in body.keys() {
            if !allowed.contains(&key.as_str()) {
                self.push(key.clone(), INVALID_FIELDNAME);
            }
        }
    }

    fn missing(&mut self, path: &str, required: bool) {
        if required {
            self.push(path, REQUIRED);
        }
    }

    fn non_empty_string(&mut self, v: Option<&Value>, path: &str, required: bool) -> Option<String> {
        match v {
            None | Some(Value::Null) => {
                self.missing(path, required);
                None
            }
            Some(Value::String(s)) if s.trim().is_empty() => {
                self.push(path, TOO_SMALL);
                None
            }
            Some(Value::String(s)) => Some(s.trim().to_string()),
            Some(_) => {
                self.push(path, INVALID_TYPE);
                None
            }
        }
    }

    fn optional_string(&mut self, v: Option<&Value>, path: &str) -> Option<String> {
        match v {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(_) => {
                self.push(path, INVALID_TYPE);
                None
            }
        }
    }

    /// Accepts JSON numbers and numeric strings.
    fn positive_number(&mut self, v: Option<&Value>, path: &str, required: bool) -> Option<f64> {
        let n = match v {
            None | Some(Value::Null) => {
                self.missing(path, required);
                return None;
            }
            Some(Value::Number(n)) => n.as_f64(),
            Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
            Some(_) => None,
        };
        match n {
            Some(n) if !n.is_finite() => {
                self.push(path, INVALID_TYPE);
                None
            }
            Some(n) if n <= 0.0 => {
                self.push(path, TOO_SMALL);
                None
            }
            Some(n) => Some(n),
            None => {
                self.push(path, INVALID_TYPE);
                None
            }
        }
    }

    fn boolean(&mut self, v: Option<&Value>, path: &str, required: bool) -> Option<bool> {
        match v {
            None | Some(Value::Null) => {
                self.missing(path, required);
                None
            }
            Some(Value::Bool(b)) => Some(*b),
            Some(_) => {
                self.push(path, INVALID_TYPE);
                None
            }
        }
    }

    fn category(&mut self, v: Option<&Value>, path: &str, required: bool) -> Option<Category> {
        match v {
            None | Some(Value::Null) if required => {
                self.push(path, INVALID_OPTIONS);
                None
            }
            None | Some(Value::Null) => None,
            Some(v) => {
                let parsed = v.as_str().and_then(Category::parse);
                if parsed.is_none() {
                    self.push(path, INVALID_OPTIONS);
                }
                parsed
            }
        }
    }

    fn array<'a>(&mut self, v: Option<&'a Value>, path: &str, required: bool) -> Option<&'a Vec<Value>> {
        match v {
            None | Some(Value::Null) => {
                self.missing(path, required);
                None
            }
            Some(Value::Array(items)) => Some(items),
            Some(_) => {
                self.push(path, INVALID_TYPE);
                None
            }
        }
    }

    fn ingredients(&mut self, v: Option<&Value>, path: &str, required: bool) -> Option<Vec<Ingredient>> {
        let items = self.array(v, path, required)?;
        let before = self.errors.len();
        let mut out = Vec::with_capacity(items.len());
        for (i, item) in items.iter().enumerate() {
            let at = format!("{path}.[{i}]");
            let Some(obj) = item.as_object() else {
                self.push(at, INVALID_TYPE);
                continue;
            };
            let subheader = self.optional_string(obj.get("subheader"), &format!("{at}.subheader"));
            let quantity = self.positive_number(obj.get("quantity"), &format!("{at}.quantity"), true);
            let name = self.non_empty_string(obj.get("name"), &format!("{at}.name"), true);
            let unit_path = format!("{at}.unit");
            let unit = match obj.get("unit").and_then(Value::as_str).and_then(Unit::parse) {
                Some(u) => Some(u),
                None => {
                    self.push(unit_path, INVALID_OPTIONS);
                    None
                }
            };
            if let (Some(quantity), Some(name), Some(unit)) = (quantity, name, unit) {
                out.push(Ingredient {
                    subheader,
                    quantity,
                    name,
                    unit,
                });
            }
        }
        (self.errors.len() == before).then_some(out)
    }

    fn strings(&mut self, v: Option<&Value>, path: &str, required: bool, non_empty: bool) -> Option<Vec<String>> {
        let items = self.array(v, path, required)?;
        let before = self.errors.len();
        let mut out = Vec::with_capacity(items.len());
        for (i, item) in items.iter().enumerate() {
            let at = format!("{path}.[{i}]");
            match item {
                Value::String(s) if non_empty && s.trim().is_empty() => self.push(at, TOO_SMALL),
                Value::String(s) => out.push(s.clone()),
                _ => self.push(at, INVALID_TYPE),
            }
        }
        (self.errors.len() == before).then_some(out)
    }
}

/// Validates a create payload. Unknown keys are ignored.
pub fn new_recipe(body: &Map<String, Value>, author_id: Uuid) -> Result<NewRecipe, AppError> {
    let mut c = Checker::default();

    let b_private = c.boolean(body.get("bPrivate"), "bPrivate", false);
    let b_allow_suggestions = c.boolean(body.get("bAllowSuggestions"), "bAllowSuggestions", false);
    let title = c.non_empty_string(body.get("title"), "title", true);
    let description = c.optional_string(body.get("description"), "description");
    let category = c.category(body.get("category"), "category", true);
    let serves = c.positive_number(body.get("serves"), "serves", true);
    let prep_time = c.positive_number(body.get("prepTime"), "prepTime", true);
    let cook_time = c.positive_number(body.get("cookTime"), "cookTime", true);
    let ingredients = c.ingredients(body.get("ingredients"), "ingredients", true);
    let steps = c.strings(body.get("steps"), "steps", true, true);
    let tags = c.strings(body.get("tags"), "tags", false, false);

    match (title, category, serves, prep_time, cook_time, ingredients, steps) {
        (
            Some(title),
            Some(category),
            Some(serves),
            Some(prep_time),
            Some(cook_time),
            Some(ingredients),
            Some(steps),
        ) if c.errors.is_empty() => c.finish(NewRecipe {
            author_id,
            author_kind: AuthorKind::User,
            b_private: b_private.unwrap_or(false),
            b_allow_suggestions: b_allow_suggestions.unwrap_or(false),
            title,
            description: description.filter(|d| !d.is_empty()),
            category,
            serves,
            prep_time,
            cook_time,
            ingredients,
            steps,
            tags: tags.unwrap_or_default(),
        }),
        _ => Err(AppError::validation(c.errors)),
    }
}

/// Validates an owner update. Only supplied fields are checked; unknown
/// top-level keys are each reported.
pub fn recipe_patch(body: &Map<String, Value>) -> Result<RecipePatch, AppError> {
    let mut c = Checker::default();
    c.reject_unknown(body, UPDATE_KEYS);

    let patch = RecipePatch {
        b_private: c.boolean(body.get("bPrivate"), "bPrivate", false),
        b_allow_suggestions: c.boolean(body.get("bAllowSuggestions"), "bAllowSuggestions", false),
        title: c.non_empty_string(body.get("title"), "title", false),
        description: c.optional_string(body.get("description"), "description"),
        category: c.category(body.get("category"), "category", false),
        serves: c.positive_number(body.get("serves"), "serves", false),
        prep_time: c.positive_number(body.get("prepTime"), "prepTime", false),
        cook_time: c.positive_number(body.get("cookTime"), "cookTime", false),
        ingredients: c.ingredients(body.get("ingredients"), "ingredients", false),
        steps: c.strings(body.get("steps"), "steps", false, true),
        tags: c.strings(body.get("tags"), "tags", false, false),
    };
    c.finish(patch)
}

/// Validates a personal-edit or suggestion payload.
pub fn edit_payload(body: &Map<String, Value>) -> Result<EditPayload, AppError> {
    let mut c = Checker::default();
    c.reject_unknown(body, EDIT_KEYS);

    let is_suggestion = c.boolean(body.get("isSuggestion"), "isSuggestion", true);
    let ingredients = c.ingredients(body.get("ingredients"), "ingredients", false);
    let steps = c.strings(body.get("steps"), "steps", false, true);
    let comments = c.optional_string(body.get("comments"), "comments");

    match is_suggestion {
        Some(is_suggestion) if c.errors.is_empty() => c.finish(EditPayload {
            is_suggestion,
            ingredients: ingredients.unwrap_or_default(),
            steps: steps.unwrap_or_default(),
            comments: comments.filter(|s| !s.is_empty()),
        }),
        _ => Err(AppError::validation(c.errors)),
    }
}

/// The recipe id carried in a request body. A missing or malformed id can
/// never resolve, so it reads as not found.
pub fn body_id(body: &Map<String, Value>) -> Result<Uuid, AppError> {
    body.get("id")
        .and_then(Value::as_str)
        .and_then(|s| Uuid::parse_str(s).ok())
        .ok_or(AppError::NotFound)
}
