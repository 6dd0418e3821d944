use serde_json::{Map, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    auth::extractors::Identity,
    error::AppError,
    recipes::{
        dto::SearchQuery,
        repo_types::{Recipe, SavedRecipeRef},
        search::{total_pages, SearchCriteria},
    },
    state::AppState,
    validation,
};

#[derive(Debug)]
pub struct SearchPage {
    pub recipes: Vec<Recipe>,
    pub total: i64,
    pub page: i64,
    pub page_size: i64,
}

impl SearchPage {
    pub fn total_pages(&self) -> i64 {
        total_pages(self.total, self.page_size)
    }
}

pub async fn create(
    state: &AppState,
    identity: &Identity,
    body: &Map<String, Value>,
) -> Result<Recipe, AppError> {
    let new_recipe = validation::new_recipe(body, identity.id())?;
    let recipe = state.recipes.insert(new_recipe).await?;
    info!(recipe_id = %recipe.id, user_id = %identity.id(), "recipe created");
    Ok(recipe)
}

/// The recipe if `identity` may see it. Deleted, missing and private-to-
/// someone-else all read as [`AppError::NotFound`].
pub async fn find_visible(
    state: &AppState,
    identity: &Identity,
    id: Uuid,
) -> Result<Recipe, AppError> {
    state
        .recipes
        .find(id)
        .await?
        .filter(|r| r.is_visible_to(identity.id()))
        .ok_or(AppError::NotFound)
}

pub async fn update_own(
    state: &AppState,
    identity: &Identity,
    body: &Map<String, Value>,
) -> Result<Recipe, AppError> {
    // 1) validate before touching storage
    let patch = validation::recipe_patch(body)?;
    let id = validation::body_id(body)?;

    // 2) ownership
    let recipe = find_visible(state, identity, id).await?;
    if !recipe.is_author(identity.id()) {
        warn!(recipe_id = %id, user_id = %identity.id(), "update on someone else's recipe");
        return Err(AppError::NotOwner);
    }
    if patch.is_empty() {
        return Ok(recipe);
    }

    // 3) write
    let updated = state
        .recipes
        .update_owned(id, identity.id(), patch)
        .await?
        .ok_or(AppError::NotFound)?;
    info!(recipe_id = %id, "recipe updated");
    Ok(updated)
}

pub async fn soft_delete(state: &AppState, identity: &Identity, id: Uuid) -> Result<(), AppError> {
    let removed = state
        .recipes
        .soft_delete_owned(id, identity.id())
        .await?
        .ok_or(AppError::NotFound)?;
    info!(recipe_id = %id, edits_removed = removed, "recipe soft-deleted");
    Ok(())
}

pub async fn set_saved(
    state: &AppState,
    identity: &Identity,
    recipe_id: Uuid,
    want_saved: bool,
) -> Result<(), AppError> {
    let recipe = state
        .recipes
        .find(recipe_id)
        .await?
        .filter(|r| r.is_visible_to(identity.id()))
        .ok_or(AppError::RecipeNotFound)?;

    if want_saved {
        state.recipes.add_saver(recipe.id, identity.id()).await?;
    } else {
        state.recipes.remove_saver(recipe.id, identity.id()).await?;
    }
    debug!(recipe_id = %recipe.id, user_id = %identity.id(), saved = want_saved, "save toggled");
    Ok(())
}

pub async fn search(
    state: &AppState,
    identity: &Identity,
    query: SearchQuery,
) -> Result<SearchPage, AppError> {
    let criteria = SearchCriteria::from_query(query, identity.id())?;
    let (recipes, total) = state.recipes.search(&criteria).await?;
    Ok(SearchPage {
        recipes,
        total,
        page: criteria.page,
        page_size: criteria.page_size,
    })
}

pub async fn saved_recipes(
    state: &AppState,
    identity: &Identity,
) -> Result<Vec<SavedRecipeRef>, AppError> {
    Ok(state.recipes.saved_by_user(identity.id()).await?)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::auth::repo_types::NewUser;
    use serde_json::json;

    pub(crate) async fn user(state: &AppState, name: &str) -> Identity {
        let user = state
            .users
            .create(NewUser {
                username: name.into(),
                email: format!("{name}@example.com"),
                password_hash: "unused".into(),
            })
            .await
            .unwrap();
        Identity::for_test(user)
    }

    pub(crate) fn recipe_body(title: &str, category: &str, ingredients: usize) -> Map<String, Value> {
        let ingredients: Vec<Value> = (0..ingredients)
            .map(|i| json!({ "quantity": i + 1, "name": format!("item {i}"), "unit": "g" }))
            .collect();
        json!({
            "title": title,
            "description": format!("{title} from scratch"),
            "category": category,
            "serves": 4,
            "prepTime": 15,
            "cookTime": 30,
            "ingredients": ingredients,
            "steps": ["Prep", "Cook"],
        })
        .as_object()
        .cloned()
        .unwrap()
    }

    fn with(mut body: Map<String, Value>, key: &str, value: Value) -> Map<String, Value> {
        body.insert(key.into(), value);
        body
    }

    #[tokio::test]
    async fn create_seeds_author_as_saver() {
        let state = AppState::fake();
        let alice = user(&state, "alice").await;
        let recipe = create(&state, &alice, &recipe_body("Tagine", "Main", 3)).await.unwrap();

        assert_eq!(recipe.author_id, alice.id());
        assert_eq!(recipe.saved_by, [alice.id()]);
        assert!(!recipe.b_private);
        assert!(!recipe.b_allow_suggestions);
        assert_eq!(
            saved_recipes(&state, &alice).await.unwrap(),
            [SavedRecipeRef { recipe_id: recipe.id }]
        );
    }

    #[tokio::test]
    async fn private_recipes_are_hidden_from_others() {
        let state = AppState::fake();
        let alice = user(&state, "alice").await;
        let bob = user(&state, "bobby").await;
        let body = with(recipe_body("Secret sauce", "Main", 2), "bPrivate", json!(true));
        let recipe = create(&state, &alice, &body).await.unwrap();

        assert!(find_visible(&state, &alice, recipe.id).await.is_ok());
        assert!(matches!(
            find_visible(&state, &bob, recipe.id).await,
            Err(AppError::NotFound)
        ));
        assert!(matches!(
            find_visible(&state, &bob, Uuid::new_v4()).await,
            Err(AppError::NotFound)
        ));
    }

    #[tokio::test]
    async fn only_the_author_updates() {
        let state = AppState::fake();
        let alice = user(&state, "alice").await;
        let bob = user(&state, "bobby").await;
        let recipe = create(&state, &alice, &recipe_body("Ragu", "Main", 3)).await.unwrap();
        let id = json!(recipe.id.to_string());

        let body = json!({ "id": id, "title": "Slow ragu", "bAllowSuggestions": true });
        let body = body.as_object().unwrap();
        let err = update_own(&state, &bob, body).await.unwrap_err();
        assert!(matches!(err, AppError::NotOwner));

        let updated = update_own(&state, &alice, body).await.unwrap();
        assert_eq!(updated.title, "Slow ragu");
        assert!(updated.b_allow_suggestions);
        assert_eq!(updated.ingredients.len(), 3);
        assert_eq!(updated.author_id, alice.id());

        let bad = json!({ "id": id, "authorId": bob.id().to_string() });
        let err = update_own(&state, &alice, bad.as_object().unwrap()).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn soft_delete_hides_recipe_and_needs_ownership() {
        let state = AppState::fake();
        let alice = user(&state, "alice").await;
        let bob = user(&state, "bobby").await;
        let recipe = create(&state, &alice, &recipe_body("Pho", "Main", 2)).await.unwrap();

        assert!(matches!(
            soft_delete(&state, &bob, recipe.id).await,
            Err(AppError::NotFound)
        ));
        soft_delete(&state, &alice, recipe.id).await.unwrap();
        for viewer in [&alice, &bob] {
            assert!(matches!(
                find_visible(&state, viewer, recipe.id).await,
                Err(AppError::NotFound)
            ));
        }
        assert!(matches!(
            soft_delete(&state, &alice, recipe.id).await,
            Err(AppError::NotFound)
        ));
        let body = json!({ "id": recipe.id.to_string(), "title": "Back" });
        assert!(matches!(
            update_own(&state, &alice, body.as_object().unwrap()).await,
            Err(AppError::NotFound)
        ));
    }

    #[tokio::test]
    async fn saving_is_idempotent_and_reversible() {
        let state = AppState::fake();
        let alice = user(&state, "alice").await;
        let bob = user(&state, "bobby").await;
        let recipe = create(&state, &alice, &recipe_body("Laksa", "Main", 2)).await.unwrap();

        set_saved(&state, &bob, recipe.id, true).await.unwrap();
        set_saved(&state, &bob, recipe.id, true).await.unwrap();
        let stored = state.recipes.find(recipe.id).await.unwrap().unwrap();
        assert_eq!(stored.saved_by, [alice.id(), bob.id()]);
        assert_eq!(saved_recipes(&state, &bob).await.unwrap().len(), 1);

        set_saved(&state, &bob, recipe.id, false).await.unwrap();
        set_saved(&state, &bob, recipe.id, false).await.unwrap();
        let stored = state.recipes.find(recipe.id).await.unwrap().unwrap();
        assert_eq!(stored.saved_by, [alice.id()]);
        assert!(saved_recipes(&state, &bob).await.unwrap().is_empty());

        assert!(matches!(
            set_saved(&state, &bob, Uuid::new_v4(), true).await,
            Err(AppError::RecipeNotFound)
        ));
    }

    #[tokio::test]
    async fn search_by_category_sorted_by_title() {
        let state = AppState::fake();
        let alice = user(&state, "alice").await;
        for (title, category) in [
            ("Tiramisu", "Dessert"),
            ("Eton mess", "Dessert"),
            ("Lasagne", "Main"),
            ("Apple crumble", "Dessert"),
            ("Brownies", "Dessert"),
        ] {
            create(&state, &alice, &recipe_body(title, category, 1)).await.unwrap();
        }

        let page = search(
            &state,
            &alice,
            SearchQuery {
                category: Some("Dessert".into()),
                sort: Some("title".into()),
                limit: Some(3),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        let titles: Vec<_> = page.recipes.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, ["Apple crumble", "Brownies", "Eton mess"]);
        assert_eq!(page.total, 4);
        assert_eq!(page.total_pages(), 2);

        let page = search(
            &state,
            &alice,
            SearchQuery {
                category: Some("Dessert".into()),
                sort: Some("title".into()),
                limit: Some(3),
                page: Some(2),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        let titles: Vec<_> = page.recipes.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, ["Tiramisu"]);
    }

    #[tokio::test]
    async fn search_filters_text_saved_and_visibility() {
        let state = AppState::fake();
        let alice = user(&state, "alice").await;
        let bob = user(&state, "bobby").await;
        let public = create(&state, &alice, &recipe_body("Lemon tart", "Dessert", 1)).await.unwrap();
        let private = with(recipe_body("Lemon curd", "Dessert", 1), "bPrivate", json!(true));
        create(&state, &alice, &private).await.unwrap();
        let gone = create(&state, &alice, &recipe_body("Lemon drizzle", "Baking", 1)).await.unwrap();
        soft_delete(&state, &alice, gone.id).await.unwrap();

        let query = || SearchQuery {
            search: Some("LEMON".into()),
            ..Default::default()
        };
        assert_eq!(search(&state, &alice, query()).await.unwrap().total, 2);
        let page = search(&state, &bob, query()).await.unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.recipes[0].id, public.id);

        let saved_only = SearchQuery {
            only_saved: Some(true),
            ..Default::default()
        };
        assert_eq!(search(&state, &bob, saved_only).await.unwrap().total, 0);
        set_saved(&state, &bob, public.id, true).await.unwrap();
        let saved_only = SearchQuery {
            only_saved: Some(true),
            sort: Some("popular".into()),
            ..Default::default()
        };
        assert_eq!(search(&state, &bob, saved_only).await.unwrap().total, 1);

        let wildcard = SearchQuery {
            search: Some("%".into()),
            ..Default::default()
        };
        assert_eq!(search(&state, &alice, wildcard).await.unwrap().total, 0);
    }

    #[tokio::test]
    async fn search_past_the_last_page_is_empty() {
        let state = AppState::fake();
        let alice = user(&state, "alice").await;
        create(&state, &alice, &recipe_body("Dal", "Main", 1)).await.unwrap();

        for page in [i64::MAX, i64::MAX / 2] {
            let result = search(
                &state,
                &alice,
                SearchQuery {
                    page: Some(page),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
            assert!(result.recipes.is_empty());
            assert_eq!(result.total, 1);
        }
    }

    #[tokio::test]
    async fn soft_delete_drops_edits_in_the_same_write() {
        let state = AppState::fake();
        let alice = user(&state, "alice").await;
        let bob = user(&state, "bobby").await;
        let body = with(recipe_body("Gumbo", "Main", 2), "bAllowSuggestions", json!(true));
        let recipe = create(&state, &alice, &body).await.unwrap();
        let payload = validation::edit_payload(
            json!({ "isSuggestion": true, "steps": ["More okra"] }).as_object().unwrap(),
        )
        .unwrap();
        state.edits.upsert_personal(recipe.id, bob.id(), &payload).await.unwrap();
        state.edits.insert_suggestion(recipe.id, bob.id(), &payload).await.unwrap();

        let removed = state.recipes.soft_delete_owned(recipe.id, alice.id()).await.unwrap();
        assert_eq!(removed, Some(2));
        assert!(state.edits.list_for_recipe(recipe.id).await.unwrap().is_empty());
        assert_eq!(
            state.recipes.soft_delete_owned(recipe.id, alice.id()).await.unwrap(),
            None
        );
    }
}
