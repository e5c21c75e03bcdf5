//! Viewer-relative representations of recipes and users.

use serde::Serialize;
use std::collections::{HashMap, HashSet};
use utoipa::ToSchema;

use crate::actor::Actor;
use crate::error::{CoreError, StoreError};
use crate::models::{Ingredient, Recipe, Tag, User};
use crate::store::{RecipeRelation, Store};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct TagView {
    pub id: i32,
    pub name: String,
    /// Hex color in `#RRGGBB` form
    pub color: String,
    pub slug: String,
}

impl From<Tag> for TagView {
    fn from(tag: Tag) -> Self {
        Self {
            id: tag.id,
            name: tag.name,
            color: tag.color,
            slug: tag.slug,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct IngredientView {
    pub id: i32,
    pub name: String,
    pub measurement_unit: String,
}

impl From<Ingredient> for IngredientView {
    fn from(ingredient: Ingredient) -> Self {
        Self {
            id: ingredient.id,
            name: ingredient.name,
            measurement_unit: ingredient.measurement_unit,
        }
    }
}

/// An ingredient as it appears in a recipe, with its quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct IngredientLine {
    pub id: i32,
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct UserProfile {
    pub id: i32,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    /// Whether the viewer follows this user
    pub is_subscribed: bool,
}

impl UserProfile {
    pub fn new(user: &User, is_subscribed: bool) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            username: user.username.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            is_subscribed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct RecipeSummary {
    pub id: i32,
    pub name: String,
    pub image: String,
    /// Cooking time in minutes
    pub cooking_time: i32,
}

impl From<&Recipe> for RecipeSummary {
    fn from(recipe: &Recipe) -> Self {
        Self {
            id: recipe.id,
            name: recipe.name.clone(),
            image: recipe.image.clone(),
            cooking_time: recipe.cooking_time,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct RecipeFull {
    pub id: i32,
    pub tags: Vec<TagView>,
    pub author: UserProfile,
    /// Ingredients in submission order
    pub ingredients: Vec<IngredientLine>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
    pub name: String,
    pub image: String,
    pub text: String,
    pub cooking_time: i32,
}

/// Profiles for `users` as seen by `viewer`, in input order.
pub fn user_profiles<S: Store>(
    store: &mut S,
    viewer: &Actor,
    users: &[User],
) -> Result<Vec<UserProfile>, CoreError> {
    let followed: HashSet<i32> = match viewer.user_id() {
        Some(viewer_id) if !users.is_empty() => {
            let ids: Vec<i32> = users.iter().map(|u| u.id).collect();
            store
                .subscribed_author_ids(viewer_id, &ids)?
                .into_iter()
                .collect()
        }
        _ => HashSet::new(),
    };
    let viewer_id = viewer.user_id();

    Ok(users
        .iter()
        .map(|user| {
            let is_subscribed = Some(user.id) != viewer_id && followed.contains(&user.id);
            UserProfile::new(user, is_subscribed)
        })
        .collect())
}

pub fn user_profile<S: Store>(
    store: &mut S,
    viewer: &Actor,
    user: &User,
) -> Result<UserProfile, CoreError> {
    let mut profiles = user_profiles(store, viewer, std::slice::from_ref(user))?;
    profiles
        .pop()
        .ok_or_else(|| CoreError::Storage(StoreError::NotFound))
}

/// Builds full read models for `recipes`, preserving their order.
///
/// Store calls are batched per kind of related data, so the number of
/// calls does not grow with the number of recipes.
pub fn build_full_recipes<S: Store>(
    store: &mut S,
    viewer: &Actor,
    recipes: &[Recipe],
) -> Result<Vec<RecipeFull>, CoreError> {
    if recipes.is_empty() {
        return Ok(Vec::new());
    }
    let recipe_ids: Vec<i32> = recipes.iter().map(|r| r.id).collect();

    let mut tags_by_recipe: HashMap<i32, Vec<TagView>> = HashMap::new();
    for (recipe_id, tag) in store.tags_for_recipes(&recipe_ids)? {
        tags_by_recipe
            .entry(recipe_id)
            .or_default()
            .push(tag.into());
    }
    for tags in tags_by_recipe.values_mut() {
        tags.sort_by_key(|t| t.id);
    }

    let mut ingredients_by_recipe: HashMap<i32, Vec<IngredientLine>> = HashMap::new();
    for row in store.ingredients_for_recipes(&recipe_ids)? {
        ingredients_by_recipe
            .entry(row.recipe_id)
            .or_default()
            .push(IngredientLine {
                id: row.ingredient_id,
                name: row.name,
                measurement_unit: row.measurement_unit,
                amount: row.amount,
            });
    }

    let mut author_ids: Vec<i32> = recipes.iter().map(|r| r.author_id).collect();
    author_ids.sort_unstable();
    author_ids.dedup();
    let authors = store.users_by_ids(&author_ids)?;
    let profiles: HashMap<i32, UserProfile> = user_profiles(store, viewer, &authors)?
        .into_iter()
        .map(|p| (p.id, p))
        .collect();

    let (favorited, in_cart): (HashSet<i32>, HashSet<i32>) = match viewer.user_id() {
        Some(viewer_id) => (
            store
                .related_recipe_ids(RecipeRelation::Favorite, viewer_id, &recipe_ids)?
                .into_iter()
                .collect(),
            store
                .related_recipe_ids(RecipeRelation::ShoppingCart, viewer_id, &recipe_ids)?
                .into_iter()
                .collect(),
        ),
        None => (HashSet::new(), HashSet::new()),
    };

    recipes
        .iter()
        .map(|recipe| {
            let author = profiles
                .get(&recipe.author_id)
                .cloned()
                .ok_or_else(|| CoreError::NotFound("Recipe author not found".to_string()))?;
            Ok(RecipeFull {
                id: recipe.id,
                tags: tags_by_recipe.remove(&recipe.id).unwrap_or_default(),
                author,
                ingredients: ingredients_by_recipe.remove(&recipe.id).unwrap_or_default(),
                is_favorited: favorited.contains(&recipe.id),
                is_in_shopping_cart: in_cart.contains(&recipe.id),
                name: recipe.name.clone(),
                image: recipe.image.clone(),
                text: recipe.text.clone(),
                cooking_time: recipe.cooking_time,
            })
        })
        .collect()
}

pub fn build_full_recipe<S: Store>(
    store: &mut S,
    viewer: &Actor,
    recipe: &Recipe,
) -> Result<RecipeFull, CoreError> {
    let mut built = build_full_recipes(store, viewer, std::slice::from_ref(recipe))?;
    built
        .pop()
        .ok_or_else(|| CoreError::NotFound("Recipe not found".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewUser;
    use crate::store::MemoryStore;

    fn user(store: &mut MemoryStore, name: &str) -> User {
        let email = format!("{}@example.com", name);
        store
            .insert_user(&NewUser {
                email: &email,
                username: name,
                first_name: "First",
                last_name: "Last",
                is_staff: false,
            })
            .unwrap()
    }

    #[test]
    fn own_profile_is_never_subscribed() {
        let mut store = MemoryStore::new();
        let alice = user(&mut store, "alice");
        let profile = user_profile(&mut store, &Actor::user(alice.id), &alice).unwrap();
        assert!(!profile.is_subscribed);
    }

    #[test]
    fn profile_reflects_viewer_subscription() {
        let mut store = MemoryStore::new();
        let alice = user(&mut store, "alice");
        let bob = user(&mut store, "bob");
        store.insert_subscription(alice.id, bob.id).unwrap();

        let seen_by_alice = user_profile(&mut store, &Actor::user(alice.id), &bob).unwrap();
        assert!(seen_by_alice.is_subscribed);
        let seen_anonymously = user_profile(&mut store, &Actor::Anonymous, &bob).unwrap();
        assert!(!seen_anonymously.is_subscribed);
    }

    #[test]
    fn empty_recipe_list_builds_nothing() {
        let mut store = MemoryStore::new();
        let built = build_full_recipes(&mut store, &Actor::Anonymous, &[]).unwrap();
        assert!(built.is_empty());
    }
}
