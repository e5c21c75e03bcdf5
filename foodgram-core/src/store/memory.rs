//! In-memory [`Store`] for tests.
//!
//! Enforces the same unique, check and foreign-key constraints as the
//! PostgreSQL schema and reports violations with the same constraint names.

use chrono::Utc;
use std::collections::{BTreeMap, BTreeSet, HashMap};

use super::{RecipeQuery, RecipeRelation, Store};
use crate::error::{CoreError, StoreError};
use crate::models::{
    CartIngredientRow, Ingredient, NewIngredient, NewRecipe, NewTag, NewUser, Recipe,
    RecipeChanges, RecipeIngredientDetail, Tag, User,
};
use crate::pagination::Page;
use crate::recipes::IngredientAmount;

#[derive(Debug, Clone)]
struct RecipeIngredientRow {
    id: i32,
    recipe_id: i32,
    ingredient_id: i32,
    amount: i32,
}

#[derive(Debug, Clone, Default)]
struct Tables {
    last_id: i32,
    users: BTreeMap<i32, User>,
    tags: BTreeMap<i32, Tag>,
    ingredients: BTreeMap<i32, Ingredient>,
    recipes: BTreeMap<i32, Recipe>,
    recipe_tags: BTreeSet<(i32, i32)>,
    recipe_ingredients: Vec<RecipeIngredientRow>,
    favorites: BTreeSet<(i32, i32)>,
    shopping_cart: BTreeSet<(i32, i32)>,
    subscriptions: BTreeSet<(i32, i32)>,
}

impl Tables {
    fn next_id(&mut self) -> i32 {
        self.last_id += 1;
        self.last_id
    }

    fn relation(&self, relation: RecipeRelation) -> &BTreeSet<(i32, i32)> {
        match relation {
            RecipeRelation::Favorite => &self.favorites,
            RecipeRelation::ShoppingCart => &self.shopping_cart,
        }
    }

    fn relation_mut(&mut self, relation: RecipeRelation) -> &mut BTreeSet<(i32, i32)> {
        match relation {
            RecipeRelation::Favorite => &mut self.favorites,
            RecipeRelation::ShoppingCart => &mut self.shopping_cart,
        }
    }

    fn require_user(&self, id: i32, constraint: &str) -> Result<(), StoreError> {
        if self.users.contains_key(&id) {
            Ok(())
        } else {
            Err(foreign_key(constraint))
        }
    }

    fn require_recipe(&self, id: i32, constraint: &str) -> Result<(), StoreError> {
        if self.recipes.contains_key(&id) {
            Ok(())
        } else {
            Err(foreign_key(constraint))
        }
    }
}

fn unique(constraint: &str) -> StoreError {
    StoreError::UniqueViolation {
        constraint: constraint.to_string(),
    }
}

fn check(constraint: &str) -> StoreError {
    StoreError::CheckViolation {
        constraint: constraint.to_string(),
    }
}

fn foreign_key(constraint: &str) -> StoreError {
    StoreError::ForeignKeyViolation {
        constraint: constraint.to_string(),
    }
}

fn paginate<T: Clone>(rows: Vec<T>, page: Page) -> (Vec<T>, i64) {
    let total = rows.len() as i64;
    let window = rows
        .into_iter()
        .skip(page.offset as usize)
        .take(page.limit as usize)
        .collect();
    (window, total)
}

/// A [`Store`] holding every table in process memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Tables,
    stale_existence_checks: bool,
    fail_ingredient_writes: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every existence pre-check report "absent", as a concurrent
    /// request that committed in between would. Inserts still hit the
    /// uniqueness constraints.
    pub fn with_stale_existence_checks(mut self) -> Self {
        self.stale_existence_checks = true;
        self
    }

    /// Makes `replace_recipe_ingredients` fail with a database error.
    pub fn fail_ingredient_writes(&mut self, fail: bool) {
        self.fail_ingredient_writes = fail;
    }
}

impl Store for MemoryStore {
    fn transaction<T, F>(&mut self, f: F) -> Result<T, CoreError>
    where
        F: FnOnce(&mut Self) -> Result<T, CoreError>,
    {
        let snapshot = self.tables.clone();
        let result = f(self);
        if result.is_err() {
            self.tables = snapshot;
        }
        result
    }

    fn insert_user(&mut self, user: &NewUser<'_>) -> Result<User, StoreError> {
        let t = &mut self.tables;
        if t.users.values().any(|u| u.email == user.email) {
            return Err(unique("users_email_key"));
        }
        if t.users.values().any(|u| u.username == user.username) {
            return Err(unique("users_username_key"));
        }
        let row = User {
            id: t.next_id(),
            email: user.email.to_string(),
            username: user.username.to_string(),
            first_name: user.first_name.to_string(),
            last_name: user.last_name.to_string(),
            is_staff: user.is_staff,
            created_at: Utc::now(),
        };
        t.users.insert(row.id, row.clone());
        Ok(row)
    }

    fn find_user(&mut self, id: i32) -> Result<Option<User>, StoreError> {
        Ok(self.tables.users.get(&id).cloned())
    }

    fn users_by_ids(&mut self, ids: &[i32]) -> Result<Vec<User>, StoreError> {
        Ok(ids
            .iter()
            .filter_map(|id| self.tables.users.get(id).cloned())
            .collect())
    }

    fn list_users(&mut self, page: Page) -> Result<(Vec<User>, i64), StoreError> {
        let mut rows: Vec<User> = self.tables.users.values().cloned().collect();
        rows.sort_by(|a, b| a.username.cmp(&b.username).then(a.id.cmp(&b.id)));
        Ok(paginate(rows, page))
    }

    fn insert_tag(&mut self, tag: &NewTag<'_>) -> Result<Tag, StoreError> {
        let t = &mut self.tables;
        if t.tags.values().any(|existing| existing.name == tag.name) {
            return Err(unique("tags_name_key"));
        }
        if t.tags.values().any(|existing| existing.slug == tag.slug) {
            return Err(unique("tags_slug_key"));
        }
        let row = Tag {
            id: t.next_id(),
            name: tag.name.to_string(),
            color: tag.color.to_string(),
            slug: tag.slug.to_string(),
        };
        t.tags.insert(row.id, row.clone());
        Ok(row)
    }

    fn find_tag(&mut self, id: i32) -> Result<Option<Tag>, StoreError> {
        Ok(self.tables.tags.get(&id).cloned())
    }

    fn list_tags(&mut self) -> Result<Vec<Tag>, StoreError> {
        let mut rows: Vec<Tag> = self.tables.tags.values().cloned().collect();
        rows.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(rows)
    }

    fn existing_tag_ids(&mut self, ids: &[i32]) -> Result<Vec<i32>, StoreError> {
        Ok(ids
            .iter()
            .copied()
            .filter(|id| self.tables.tags.contains_key(id))
            .collect())
    }

    fn insert_ingredients(&mut self, rows: &[NewIngredient<'_>]) -> Result<usize, StoreError> {
        let t = &mut self.tables;
        let mut inserted = 0;
        for row in rows {
            let exists = t
                .ingredients
                .values()
                .any(|i| i.name == row.name && i.measurement_unit == row.measurement_unit);
            if exists {
                continue;
            }
            let id = t.next_id();
            t.ingredients.insert(
                id,
                Ingredient {
                    id,
                    name: row.name.to_string(),
                    measurement_unit: row.measurement_unit.to_string(),
                },
            );
            inserted += 1;
        }
        Ok(inserted)
    }

    fn find_ingredient(&mut self, id: i32) -> Result<Option<Ingredient>, StoreError> {
        Ok(self.tables.ingredients.get(&id).cloned())
    }

    fn search_ingredients(&mut self, name: Option<&str>) -> Result<Vec<Ingredient>, StoreError> {
        let needle = name.map(str::to_lowercase);
        let mut rows: Vec<Ingredient> = self
            .tables
            .ingredients
            .values()
            .filter(|i| match &needle {
                Some(needle) => i.name.to_lowercase().contains(needle.as_str()),
                None => true,
            })
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(rows)
    }

    fn existing_ingredient_ids(&mut self, ids: &[i32]) -> Result<Vec<i32>, StoreError> {
        Ok(ids
            .iter()
            .copied()
            .filter(|id| self.tables.ingredients.contains_key(id))
            .collect())
    }

    fn insert_recipe(&mut self, recipe: &NewRecipe<'_>) -> Result<Recipe, StoreError> {
        let t = &mut self.tables;
        t.require_user(recipe.author_id, "recipes_author_id_fkey")?;
        if recipe.cooking_time <= 0 {
            return Err(check("recipes_cooking_time_positive"));
        }
        let now = Utc::now();
        let row = Recipe {
            id: t.next_id(),
            author_id: recipe.author_id,
            name: recipe.name.to_string(),
            text: recipe.text.to_string(),
            cooking_time: recipe.cooking_time,
            image: recipe.image.to_string(),
            created_at: now,
            updated_at: now,
        };
        t.recipes.insert(row.id, row.clone());
        Ok(row)
    }

    fn update_recipe(
        &mut self,
        id: i32,
        changes: &RecipeChanges<'_>,
    ) -> Result<Recipe, StoreError> {
        if changes.cooking_time <= 0 {
            return Err(check("recipes_cooking_time_positive"));
        }
        let recipe = self.tables.recipes.get_mut(&id).ok_or(StoreError::NotFound)?;
        recipe.name = changes.name.to_string();
        recipe.text = changes.text.to_string();
        recipe.cooking_time = changes.cooking_time;
        recipe.image = changes.image.to_string();
        recipe.updated_at = changes.updated_at;
        Ok(recipe.clone())
    }

    fn delete_recipe(&mut self, id: i32) -> Result<bool, StoreError> {
        let t = &mut self.tables;
        if t.recipes.remove(&id).is_none() {
            return Ok(false);
        }
        t.recipe_tags.retain(|(recipe_id, _)| *recipe_id != id);
        t.recipe_ingredients.retain(|row| row.recipe_id != id);
        t.favorites.retain(|(_, recipe_id)| *recipe_id != id);
        t.shopping_cart.retain(|(_, recipe_id)| *recipe_id != id);
        Ok(true)
    }

    fn find_recipe(&mut self, id: i32) -> Result<Option<Recipe>, StoreError> {
        Ok(self.tables.recipes.get(&id).cloned())
    }

    fn list_recipes(
        &mut self,
        query: &RecipeQuery,
        page: Page,
    ) -> Result<(Vec<Recipe>, i64), StoreError> {
        let t = &self.tables;
        let tag_ids: BTreeSet<i32> = t
            .tags
            .values()
            .filter(|tag| query.tag_slugs.contains(&tag.slug))
            .map(|tag| tag.id)
            .collect();

        let mut rows: Vec<Recipe> = t
            .recipes
            .values()
            .filter(|r| query.author_id.is_none_or(|author| r.author_id == author))
            .filter(|r| {
                query.tag_slugs.is_empty()
                    || t
                        .recipe_tags
                        .iter()
                        .any(|(recipe_id, tag_id)| *recipe_id == r.id && tag_ids.contains(tag_id))
            })
            .filter(|r| {
                query
                    .favorited_by
                    .is_none_or(|user| t.favorites.contains(&(user, r.id)))
            })
            .filter(|r| {
                query
                    .in_cart_of
                    .is_none_or(|user| t.shopping_cart.contains(&(user, r.id)))
            })
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(paginate(rows, page))
    }

    fn replace_recipe_tags(&mut self, recipe_id: i32, tag_ids: &[i32]) -> Result<(), StoreError> {
        let t = &mut self.tables;
        t.require_recipe(recipe_id, "recipe_tags_recipe_id_fkey")?;
        if let Some(missing) = tag_ids.iter().find(|id| !t.tags.contains_key(id)) {
            tracing::debug!(tag_id = missing, "tag missing during replace");
            return Err(foreign_key("recipe_tags_tag_id_fkey"));
        }
        t.recipe_tags
            .retain(|(rid, tid)| *rid != recipe_id || tag_ids.contains(tid));
        for tag_id in tag_ids {
            t.recipe_tags.insert((recipe_id, *tag_id));
        }
        Ok(())
    }

    fn replace_recipe_ingredients(
        &mut self,
        recipe_id: i32,
        rows: &[IngredientAmount],
    ) -> Result<(), StoreError> {
        if self.fail_ingredient_writes {
            return Err(StoreError::Database(
                "injected ingredient write failure".to_string(),
            ));
        }
        let t = &mut self.tables;
        t.require_recipe(recipe_id, "recipe_ingredients_recipe_id_fkey")?;
        t.recipe_ingredients.retain(|row| row.recipe_id != recipe_id);

        let mut seen = BTreeSet::new();
        for row in rows {
            if !t.ingredients.contains_key(&row.id) {
                return Err(foreign_key("recipe_ingredients_ingredient_id_fkey"));
            }
            if row.amount <= 0 {
                return Err(check("recipe_ingredients_amount_positive"));
            }
            if !seen.insert(row.id) {
                return Err(unique("recipe_ingredients_recipe_ingredient_key"));
            }
            let id = t.next_id();
            t.recipe_ingredients.push(RecipeIngredientRow {
                id,
                recipe_id,
                ingredient_id: row.id,
                amount: row.amount,
            });
        }
        Ok(())
    }

    fn tags_for_recipes(&mut self, recipe_ids: &[i32]) -> Result<Vec<(i32, Tag)>, StoreError> {
        let t = &self.tables;
        Ok(t
            .recipe_tags
            .iter()
            .filter(|(recipe_id, _)| recipe_ids.contains(recipe_id))
            .filter_map(|(recipe_id, tag_id)| {
                t.tags.get(tag_id).map(|tag| (*recipe_id, tag.clone()))
            })
            .collect())
    }

    fn ingredients_for_recipes(
        &mut self,
        recipe_ids: &[i32],
    ) -> Result<Vec<RecipeIngredientDetail>, StoreError> {
        let t = &self.tables;
        let mut rows: Vec<&RecipeIngredientRow> = t
            .recipe_ingredients
            .iter()
            .filter(|row| recipe_ids.contains(&row.recipe_id))
            .collect();
        rows.sort_by_key(|row| (row.recipe_id, row.id));
        Ok(rows
            .into_iter()
            .filter_map(|row| {
                t.ingredients
                    .get(&row.ingredient_id)
                    .map(|ingredient| RecipeIngredientDetail {
                        recipe_id: row.recipe_id,
                        ingredient_id: ingredient.id,
                        name: ingredient.name.clone(),
                        measurement_unit: ingredient.measurement_unit.clone(),
                        amount: row.amount,
                    })
            })
            .collect())
    }

    fn recipes_by_authors(
        &mut self,
        author_ids: &[i32],
        per_author: usize,
    ) -> Result<Vec<Recipe>, StoreError> {
        let mut rows: Vec<Recipe> = self
            .tables
            .recipes
            .values()
            .filter(|r| author_ids.contains(&r.author_id))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        let mut taken: HashMap<i32, usize> = HashMap::new();
        rows.retain(|r| {
            let seen = taken.entry(r.author_id).or_default();
            *seen += 1;
            *seen <= per_author
        });
        Ok(rows)
    }

    fn recipe_counts_by_author(
        &mut self,
        author_ids: &[i32],
    ) -> Result<Vec<(i32, i64)>, StoreError> {
        let mut counts: HashMap<i32, i64> = HashMap::new();
        for recipe in self.tables.recipes.values() {
            if author_ids.contains(&recipe.author_id) {
                *counts.entry(recipe.author_id).or_default() += 1;
            }
        }
        Ok(counts.into_iter().collect())
    }

    fn relation_exists(
        &mut self,
        relation: RecipeRelation,
        user_id: i32,
        recipe_id: i32,
    ) -> Result<bool, StoreError> {
        if self.stale_existence_checks {
            return Ok(false);
        }
        Ok(self
            .tables
            .relation(relation)
            .contains(&(user_id, recipe_id)))
    }

    fn insert_relation(
        &mut self,
        relation: RecipeRelation,
        user_id: i32,
        recipe_id: i32,
    ) -> Result<(), StoreError> {
        let t = &mut self.tables;
        t.require_user(user_id, "relation_user_id_fkey")?;
        t.require_recipe(recipe_id, "relation_recipe_id_fkey")?;
        if !t.relation_mut(relation).insert((user_id, recipe_id)) {
            return Err(unique(relation.unique_constraint()));
        }
        Ok(())
    }

    fn delete_relation(
        &mut self,
        relation: RecipeRelation,
        user_id: i32,
        recipe_id: i32,
    ) -> Result<bool, StoreError> {
        Ok(self
            .tables
            .relation_mut(relation)
            .remove(&(user_id, recipe_id)))
    }

    fn related_recipe_ids(
        &mut self,
        relation: RecipeRelation,
        user_id: i32,
        recipe_ids: &[i32],
    ) -> Result<Vec<i32>, StoreError> {
        let set = self.tables.relation(relation);
        Ok(recipe_ids
            .iter()
            .copied()
            .filter(|recipe_id| set.contains(&(user_id, *recipe_id)))
            .collect())
    }

    fn cart_ingredients(&mut self, user_id: i32) -> Result<Vec<CartIngredientRow>, StoreError> {
        let t = &self.tables;
        Ok(t.recipe_ingredients
            .iter()
            .filter(|row| t.shopping_cart.contains(&(user_id, row.recipe_id)))
            .filter_map(|row| {
                t.ingredients
                    .get(&row.ingredient_id)
                    .map(|ingredient| CartIngredientRow {
                        name: ingredient.name.clone(),
                        measurement_unit: ingredient.measurement_unit.clone(),
                        amount: i64::from(row.amount),
                    })
            })
            .collect())
    }

    fn subscription_exists(&mut self, user_id: i32, author_id: i32) -> Result<bool, StoreError> {
        if self.stale_existence_checks {
            return Ok(false);
        }
        Ok(self.tables.subscriptions.contains(&(user_id, author_id)))
    }

    fn insert_subscription(&mut self, user_id: i32, author_id: i32) -> Result<(), StoreError> {
        let t = &mut self.tables;
        t.require_user(user_id, "subscriptions_user_id_fkey")?;
        t.require_user(author_id, "subscriptions_author_id_fkey")?;
        if user_id == author_id {
            return Err(check("prevent_self_follow"));
        }
        if !t.subscriptions.insert((user_id, author_id)) {
            return Err(unique("subscriptions_user_author_key"));
        }
        Ok(())
    }

    fn delete_subscription(&mut self, user_id: i32, author_id: i32) -> Result<bool, StoreError> {
        Ok(self.tables.subscriptions.remove(&(user_id, author_id)))
    }

    fn subscribed_author_ids(
        &mut self,
        user_id: i32,
        author_ids: &[i32],
    ) -> Result<Vec<i32>, StoreError> {
        Ok(author_ids
            .iter()
            .copied()
            .filter(|author_id| self.tables.subscriptions.contains(&(user_id, *author_id)))
            .collect())
    }

    fn list_subscribed_authors(
        &mut self,
        user_id: i32,
        page: Page,
    ) -> Result<(Vec<User>, i64), StoreError> {
        let t = &self.tables;
        let mut rows: Vec<User> = t
            .subscriptions
            .iter()
            .filter(|(follower, _)| *follower == user_id)
            .filter_map(|(_, author_id)| t.users.get(author_id).cloned())
            .collect();
        rows.sort_by(|a, b| a.username.cmp(&b.username).then(a.id.cmp(&b.id)));
        Ok(paginate(rows, page))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user<'a>(email: &'a str, username: &'a str) -> NewUser<'a> {
        NewUser {
            email,
            username,
            first_name: "Test",
            last_name: "User",
            is_staff: false,
        }
    }

    #[test]
    fn duplicate_email_reports_named_constraint() {
        let mut store = MemoryStore::new();
        store.insert_user(&new_user("a@example.com", "a")).unwrap();
        let err = store
            .insert_user(&new_user("a@example.com", "b"))
            .unwrap_err();
        assert_eq!(err, unique("users_email_key"));
    }

    #[test]
    fn self_follow_violates_check() {
        let mut store = MemoryStore::new();
        let user = store.insert_user(&new_user("a@example.com", "a")).unwrap();
        let err = store.insert_subscription(user.id, user.id).unwrap_err();
        assert_eq!(err, check("prevent_self_follow"));
    }

    #[test]
    fn failed_transaction_restores_tables() {
        let mut store = MemoryStore::new();
        let result: Result<(), CoreError> = store.transaction(|store| {
            store.insert_user(&new_user("a@example.com", "a"))?;
            Err(CoreError::Conflict("abort".to_string()))
        });
        assert!(result.is_err());
        assert_eq!(store.list_users(Page::default()).unwrap().1, 0);
    }

    #[test]
    fn relation_insert_enforces_uniqueness() {
        let mut store = MemoryStore::new();
        let user = store.insert_user(&new_user("a@example.com", "a")).unwrap();
        let recipe = store
            .insert_recipe(&NewRecipe {
                author_id: user.id,
                name: "Soup",
                text: "Boil",
                cooking_time: 10,
                image: "soup.png",
            })
            .unwrap();
        store
            .insert_relation(RecipeRelation::Favorite, user.id, recipe.id)
            .unwrap();
        let err = store
            .insert_relation(RecipeRelation::Favorite, user.id, recipe.id)
            .unwrap_err();
        assert_eq!(err, unique("favorites_user_recipe_key"));
        // Same pair in another table is independent
        store
            .insert_relation(RecipeRelation::ShoppingCart, user.id, recipe.id)
            .unwrap();
    }

    #[test]
    fn recipes_by_authors_keeps_newest_per_author() {
        let mut store = MemoryStore::new();
        let ann = store.insert_user(&new_user("ann@example.com", "ann")).unwrap();
        let bob = store.insert_user(&new_user("bob@example.com", "bob")).unwrap();
        let mut ids = Vec::new();
        for author_id in [ann.id, ann.id, ann.id, bob.id] {
            let recipe = store
                .insert_recipe(&NewRecipe {
                    author_id,
                    name: "Soup",
                    text: "Boil",
                    cooking_time: 10,
                    image: "soup.png",
                })
                .unwrap();
            ids.push(recipe.id);
        }

        let rows = store.recipes_by_authors(&[ann.id, bob.id], 2).unwrap();
        let mut got: Vec<i32> = rows.iter().map(|r| r.id).collect();
        got.sort_unstable();
        assert_eq!(got, vec![ids[1], ids[2], ids[3]]);
    }

    #[test]
    fn page_past_the_end_still_reports_total() {
        let mut store = MemoryStore::new();
        store.insert_user(&new_user("a@example.com", "a")).unwrap();
        store.insert_user(&new_user("b@example.com", "b")).unwrap();
        let (rows, total) = store
            .list_users(Page {
                limit: 10,
                offset: 50,
            })
            .unwrap();
        assert!(rows.is_empty());
        assert_eq!(total, 2);
    }
}
