//! Following authors and the subscription feed.

use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, info, warn};
use utoipa::ToSchema;

use crate::actor::Actor;
use crate::error::{CoreError, StoreError, ALREADY_SUBSCRIBED};
use crate::models::User;
use crate::pagination::{Page, PaginationMetadata};
use crate::read_model::RecipeSummary;
use crate::store::Store;

pub const DEFAULT_FEED_RECIPES_LIMIT: i64 = 3;

/// A followed author with a preview of their newest recipes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct SubscribedAuthor {
    pub id: i32,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub is_subscribed: bool,
    /// Newest recipes first, at most `recipes_limit` of them
    pub recipes: Vec<RecipeSummary>,
    /// Total number of recipes by this author
    pub recipes_count: i64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SubscriptionsResponse {
    pub authors: Vec<SubscribedAuthor>,
    pub pagination: PaginationMetadata,
}

/// Resolves the per-author recipe preview size. Values below 1 become 1.
pub fn recipes_limit(requested: Option<i64>, default_limit: i64) -> usize {
    usize::try_from(requested.unwrap_or(default_limit).max(1)).unwrap_or(usize::MAX)
}

fn author_not_found() -> CoreError {
    CoreError::NotFound("User not found".to_string())
}

fn build_entries<S: Store>(
    store: &mut S,
    authors: &[User],
    limit: usize,
) -> Result<Vec<SubscribedAuthor>, CoreError> {
    if authors.is_empty() {
        return Ok(Vec::new());
    }
    let ids: Vec<i32> = authors.iter().map(|a| a.id).collect();

    let mut previews: HashMap<i32, Vec<RecipeSummary>> = HashMap::new();
    for recipe in store.recipes_by_authors(&ids, limit)? {
        previews
            .entry(recipe.author_id)
            .or_default()
            .push(RecipeSummary::from(&recipe));
    }
    let counts: HashMap<i32, i64> = store.recipe_counts_by_author(&ids)?.into_iter().collect();

    Ok(authors
        .iter()
        .map(|author| SubscribedAuthor {
            id: author.id,
            email: author.email.clone(),
            username: author.username.clone(),
            first_name: author.first_name.clone(),
            last_name: author.last_name.clone(),
            is_subscribed: true,
            recipes: previews.remove(&author.id).unwrap_or_default(),
            recipes_count: counts.get(&author.id).copied().unwrap_or(0),
        })
        .collect())
}

pub fn subscribe<S: Store>(
    store: &mut S,
    actor: &Actor,
    author_id: i32,
    limit: usize,
) -> Result<SubscribedAuthor, CoreError> {
    let user_id = actor.require_user()?;
    if user_id == author_id {
        return Err(CoreError::validation(
            "author",
            "You cannot subscribe to yourself",
        ));
    }

    let author = store.transaction(|store| {
        let author = store.find_user(author_id)?.ok_or_else(author_not_found)?;

        if store.subscription_exists(user_id, author_id)? {
            return Err(CoreError::validation("author", ALREADY_SUBSCRIBED));
        }

        match store.insert_subscription(user_id, author_id) {
            Ok(()) => Ok(author),
            Err(StoreError::UniqueViolation { constraint }) => {
                warn!(
                    user_id,
                    author_id,
                    constraint = %constraint,
                    "Concurrent subscription won the race"
                );
                Err(StoreError::UniqueViolation { constraint }.into())
            }
            Err(e) => Err(e.into()),
        }
    })?;

    info!(user_id, author_id, "Subscribed to author");
    let mut entries = build_entries(store, std::slice::from_ref(&author), limit)?;
    entries.pop().ok_or_else(author_not_found)
}

pub fn unsubscribe<S: Store>(
    store: &mut S,
    actor: &Actor,
    author_id: i32,
) -> Result<(), CoreError> {
    let user_id = actor.require_user()?;

    store.transaction(|store| {
        if store.find_user(author_id)?.is_none() {
            return Err(author_not_found());
        }
        if !store.delete_subscription(user_id, author_id)? {
            return Err(CoreError::NotFound(
                "You are not subscribed to this author".to_string(),
            ));
        }
        Ok(())
    })?;

    info!(user_id, author_id, "Unsubscribed from author");
    Ok(())
}

/// Authors the actor follows, ordered by username.
pub fn subscriptions<S: Store>(
    store: &mut S,
    actor: &Actor,
    page: Page,
    limit: usize,
) -> Result<SubscriptionsResponse, CoreError> {
    let user_id = actor.require_user()?;
    let (authors, total) = store.list_subscribed_authors(user_id, page)?;
    debug!(user_id, total, "Listed subscriptions");

    Ok(SubscriptionsResponse {
        authors: build_entries(store, &authors, limit)?,
        pagination: PaginationMetadata::new(total, page),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recipes_limit_clamps_to_one() {
        assert_eq!(recipes_limit(None, DEFAULT_FEED_RECIPES_LIMIT), 3);
        assert_eq!(recipes_limit(Some(0), 3), 1);
        assert_eq!(recipes_limit(Some(-4), 3), 1);
        assert_eq!(recipes_limit(Some(10), 3), 10);
        assert_eq!(
            recipes_limit(Some(i64::MAX), 3),
            usize::try_from(i64::MAX).unwrap_or(usize::MAX)
        );
    }
}
