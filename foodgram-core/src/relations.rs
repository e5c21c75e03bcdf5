//! Favorite and shopping-cart toggles.
//!
//! Both follow the same contract: adding an existing pair is a conflict,
//! removing a missing pair is not-found. The unique constraint on the join
//! table is the final authority, so a pair inserted concurrently after our
//! existence check still comes back as a conflict.

use tracing::{info, warn};

use crate::actor::Actor;
use crate::error::{CoreError, StoreError};
use crate::read_model::RecipeSummary;
use crate::store::{RecipeRelation, Store};

fn conflict(relation: RecipeRelation) -> CoreError {
    StoreError::UniqueViolation {
        constraint: relation.unique_constraint().to_string(),
    }
    .into()
}

fn add<S: Store>(
    store: &mut S,
    actor: &Actor,
    relation: RecipeRelation,
    recipe_id: i32,
) -> Result<RecipeSummary, CoreError> {
    let user_id = actor.require_user()?;

    let summary = store.transaction(|store| {
        let recipe = store
            .find_recipe(recipe_id)?
            .ok_or_else(|| CoreError::NotFound("Recipe not found".to_string()))?;

        if store.relation_exists(relation, user_id, recipe_id)? {
            return Err(conflict(relation));
        }

        match store.insert_relation(relation, user_id, recipe_id) {
            Ok(()) => Ok(RecipeSummary::from(&recipe)),
            Err(StoreError::UniqueViolation { constraint }) => {
                warn!(
                    user_id,
                    recipe_id,
                    constraint = %constraint,
                    "Concurrent insert won the race for {}",
                    relation.label()
                );
                Err(conflict(relation))
            }
            Err(e) => Err(e.into()),
        }
    })?;

    info!(user_id, recipe_id, "Added recipe to {}", relation.label());
    Ok(summary)
}

fn remove<S: Store>(
    store: &mut S,
    actor: &Actor,
    relation: RecipeRelation,
    recipe_id: i32,
) -> Result<(), CoreError> {
    let user_id = actor.require_user()?;

    store.transaction(|store| {
        if store.find_recipe(recipe_id)?.is_none() {
            return Err(CoreError::NotFound("Recipe not found".to_string()));
        }
        if !store.delete_relation(relation, user_id, recipe_id)? {
            return Err(CoreError::NotFound(format!(
                "Recipe is not in {}",
                relation.label()
            )));
        }
        Ok(())
    })?;

    info!(user_id, recipe_id, "Removed recipe from {}", relation.label());
    Ok(())
}

pub fn add_favorite<S: Store>(
    store: &mut S,
    actor: &Actor,
    recipe_id: i32,
) -> Result<RecipeSummary, CoreError> {
    add(store, actor, RecipeRelation::Favorite, recipe_id)
}

pub fn remove_favorite<S: Store>(
    store: &mut S,
    actor: &Actor,
    recipe_id: i32,
) -> Result<(), CoreError> {
    remove(store, actor, RecipeRelation::Favorite, recipe_id)
}

pub fn add_to_shopping_cart<S: Store>(
    store: &mut S,
    actor: &Actor,
    recipe_id: i32,
) -> Result<RecipeSummary, CoreError> {
    add(store, actor, RecipeRelation::ShoppingCart, recipe_id)
}

pub fn remove_from_shopping_cart<S: Store>(
    store: &mut S,
    actor: &Actor,
    recipe_id: i32,
) -> Result<(), CoreError> {
    remove(store, actor, RecipeRelation::ShoppingCart, recipe_id)
}
