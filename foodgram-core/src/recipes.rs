//! Recipe writes, deletes and listings.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, info};
use utoipa::ToSchema;

use crate::actor::Actor;
use crate::error::CoreError;
use crate::models::{NewRecipe, Recipe, RecipeChanges};
use crate::pagination::{Page, PaginationMetadata};
use crate::permissions::{author_or_admin_or_read_only, Action};
use crate::read_model::{build_full_recipe, build_full_recipes, RecipeFull};
use crate::store::{RecipeQuery, Store};

pub const MAX_RECIPE_NAME_LENGTH: usize = 256;

/// One ingredient reference of a recipe submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct IngredientAmount {
    /// Ingredient id
    pub id: i32,
    pub amount: i32,
}

/// Body of a recipe create or update. The author comes from the actor.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct RecipeInput {
    pub name: String,
    pub text: String,
    /// Cooking time in minutes
    pub cooking_time: i32,
    /// Reference to the stored image
    pub image: String,
    /// Tag ids
    pub tags: Vec<i32>,
    pub ingredients: Vec<IngredientAmount>,
}

/// Listing filters. Present filters are combined with AND.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct RecipeFilter {
    pub author: Option<i32>,
    /// Tag slugs; a recipe matches if it has any of them
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub is_favorited: bool,
    #[serde(default)]
    pub is_in_shopping_cart: bool,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ListRecipesResponse {
    pub recipes: Vec<RecipeFull>,
    pub pagination: PaginationMetadata,
}

fn recipe_not_found() -> CoreError {
    CoreError::NotFound("Recipe not found".to_string())
}

/// Checks the submission on its own and returns the tag ids with
/// duplicates removed, first occurrence kept.
fn validate(input: &RecipeInput) -> Result<Vec<i32>, CoreError> {
    if input.name.trim().is_empty() {
        return Err(CoreError::validation("name", "Name cannot be empty"));
    }
    if input.name.chars().count() > MAX_RECIPE_NAME_LENGTH {
        return Err(CoreError::validation(
            "name",
            format!("Name must be at most {} characters", MAX_RECIPE_NAME_LENGTH),
        ));
    }
    if input.text.trim().is_empty() {
        return Err(CoreError::validation("text", "Text cannot be empty"));
    }
    if input.image.trim().is_empty() {
        return Err(CoreError::validation("image", "Image is required"));
    }
    if input.cooking_time < 1 {
        return Err(CoreError::validation(
            "cooking_time",
            "Cooking time must be at least 1",
        ));
    }

    if input.tags.is_empty() {
        return Err(CoreError::validation("tags", "At least one tag is required"));
    }
    let mut seen_tags = HashSet::new();
    let tag_ids: Vec<i32> = input
        .tags
        .iter()
        .copied()
        .filter(|id| seen_tags.insert(*id))
        .collect();

    if input.ingredients.is_empty() {
        return Err(CoreError::validation(
            "ingredients",
            "At least one ingredient is required",
        ));
    }
    let mut seen_ingredients = HashSet::new();
    for item in &input.ingredients {
        if item.amount < 1 {
            return Err(CoreError::validation(
                "ingredients",
                "Amount must be at least 1",
            ));
        }
        if !seen_ingredients.insert(item.id) {
            return Err(CoreError::validation(
                "ingredients",
                "Ingredients must be unique",
            ));
        }
    }

    Ok(tag_ids)
}

fn check_references<S: Store>(
    store: &mut S,
    tag_ids: &[i32],
    ingredients: &[IngredientAmount],
) -> Result<(), CoreError> {
    let existing = store.existing_tag_ids(tag_ids)?;
    if let Some(missing) = tag_ids.iter().find(|id| !existing.contains(id)) {
        return Err(CoreError::validation(
            "tags",
            format!("Tag {} does not exist", missing),
        ));
    }

    let ids: Vec<i32> = ingredients.iter().map(|i| i.id).collect();
    let existing = store.existing_ingredient_ids(&ids)?;
    if let Some(missing) = ids.iter().find(|id| !existing.contains(id)) {
        return Err(CoreError::validation(
            "ingredients",
            format!("Ingredient {} does not exist", missing),
        ));
    }
    Ok(())
}

/// Writes the tag and ingredient sets of a recipe. Runs inside the
/// caller's transaction.
fn write_relations<S: Store>(
    store: &mut S,
    recipe_id: i32,
    tag_ids: &[i32],
    ingredients: &[IngredientAmount],
) -> Result<(), CoreError> {
    store.replace_recipe_tags(recipe_id, tag_ids)?;
    store.replace_recipe_ingredients(recipe_id, ingredients)?;
    Ok(())
}

pub fn create_recipe<S: Store>(
    store: &mut S,
    actor: &Actor,
    input: &RecipeInput,
) -> Result<RecipeFull, CoreError> {
    let author_id = actor.require_user()?;
    let tag_ids = validate(input)?;

    let recipe = store.transaction(|store| {
        check_references(store, &tag_ids, &input.ingredients)?;

        // 1. Insert the recipe row
        let recipe = store.insert_recipe(&NewRecipe {
            author_id,
            name: &input.name,
            text: &input.text,
            cooking_time: input.cooking_time,
            image: &input.image,
        })?;

        // 2. Attach tags and ingredients
        write_relations(store, recipe.id, &tag_ids, &input.ingredients)?;
        Ok(recipe)
    })?;

    info!(
        recipe_id = recipe.id,
        author_id,
        ingredients = input.ingredients.len(),
        "Recipe created"
    );
    build_full_recipe(store, actor, &recipe)
}

/// Loads the recipe and checks the actor may perform `action` on it.
fn authorize<S: Store>(
    store: &mut S,
    actor: &Actor,
    recipe_id: i32,
    action: Action,
) -> Result<Recipe, CoreError> {
    actor.require_user()?;
    let recipe = store.find_recipe(recipe_id)?.ok_or_else(recipe_not_found)?;
    if !author_or_admin_or_read_only(actor, recipe.author_id, action) {
        return Err(CoreError::Permission(
            "Only the author can change this recipe".to_string(),
        ));
    }
    Ok(recipe)
}

pub fn update_recipe<S: Store>(
    store: &mut S,
    actor: &Actor,
    recipe_id: i32,
    input: &RecipeInput,
) -> Result<RecipeFull, CoreError> {
    authorize(store, actor, recipe_id, Action::Update)?;
    let tag_ids = validate(input)?;

    let recipe = store.transaction(|store| {
        check_references(store, &tag_ids, &input.ingredients)?;

        let recipe = store.update_recipe(
            recipe_id,
            &RecipeChanges {
                name: &input.name,
                text: &input.text,
                cooking_time: input.cooking_time,
                image: &input.image,
                updated_at: Utc::now(),
            },
        )?;
        write_relations(store, recipe.id, &tag_ids, &input.ingredients)?;
        Ok(recipe)
    })?;

    info!(recipe_id, "Recipe updated");
    build_full_recipe(store, actor, &recipe)
}

pub fn delete_recipe<S: Store>(
    store: &mut S,
    actor: &Actor,
    recipe_id: i32,
) -> Result<(), CoreError> {
    authorize(store, actor, recipe_id, Action::Delete)?;

    let deleted = store.transaction(|store| Ok(store.delete_recipe(recipe_id)?))?;
    if !deleted {
        return Err(recipe_not_found());
    }
    info!(recipe_id, "Recipe deleted");
    Ok(())
}

pub fn get_recipe<S: Store>(
    store: &mut S,
    actor: &Actor,
    recipe_id: i32,
) -> Result<RecipeFull, CoreError> {
    let recipe = store.find_recipe(recipe_id)?.ok_or_else(recipe_not_found)?;
    build_full_recipe(store, actor, &recipe)
}

pub fn list_recipes<S: Store>(
    store: &mut S,
    actor: &Actor,
    filter: &RecipeFilter,
    page: Page,
) -> Result<ListRecipesResponse, CoreError> {
    let viewer_id = actor.user_id();
    if viewer_id.is_none() && (filter.is_favorited || filter.is_in_shopping_cart) {
        return Ok(ListRecipesResponse {
            recipes: Vec::new(),
            pagination: PaginationMetadata::new(0, page),
        });
    }

    let query = RecipeQuery {
        author_id: filter.author,
        tag_slugs: filter.tags.clone(),
        favorited_by: viewer_id.filter(|_| filter.is_favorited),
        in_cart_of: viewer_id.filter(|_| filter.is_in_shopping_cart),
    };
    let (rows, total) = store.list_recipes(&query, page)?;
    debug!(total, returned = rows.len(), "Listed recipes");

    Ok(ListRecipesResponse {
        recipes: build_full_recipes(store, actor, &rows)?,
        pagination: PaginationMetadata::new(total, page),
    })
}
