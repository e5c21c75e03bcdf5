//! Storage collaborator.
//!
//! Domain operations are written against the [`Store`] trait. PostgreSQL
//! (through diesel) is the production implementation; [`MemoryStore`]
//! enforces the same constraints in memory so the rules can be tested
//! without a database.

mod memory;
mod pg;

pub use memory::MemoryStore;

use crate::error::{CoreError, StoreError};
use crate::models::{
    CartIngredientRow, Ingredient, NewIngredient, NewRecipe, NewTag, NewUser, Recipe,
    RecipeChanges, RecipeIngredientDetail, Tag, User,
};
use crate::pagination::Page;
use crate::recipes::IngredientAmount;

/// Join tables keyed by (user, recipe).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecipeRelation {
    Favorite,
    ShoppingCart,
}

impl RecipeRelation {
    pub fn label(self) -> &'static str {
        match self {
            RecipeRelation::Favorite => "favorites",
            RecipeRelation::ShoppingCart => "shopping cart",
        }
    }

    pub(crate) fn unique_constraint(self) -> &'static str {
        match self {
            RecipeRelation::Favorite => "favorites_user_recipe_key",
            RecipeRelation::ShoppingCart => "shopping_cart_user_recipe_key",
        }
    }
}

/// Filters for recipe listing. All present filters must match.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RecipeQuery {
    pub author_id: Option<i32>,
    /// Any-of match on tag slugs. Empty means no tag filter.
    pub tag_slugs: Vec<String>,
    pub favorited_by: Option<i32>,
    pub in_cart_of: Option<i32>,
}

/// Persistence operations the domain needs. Listing methods that take a
/// [`Page`] return the page together with the total number of matches.
pub trait Store {
    /// Runs `f` atomically: an `Err` discards every write it made.
    fn transaction<T, F>(&mut self, f: F) -> Result<T, CoreError>
    where
        F: FnOnce(&mut Self) -> Result<T, CoreError>;

    fn insert_user(&mut self, user: &NewUser<'_>) -> Result<User, StoreError>;
    fn find_user(&mut self, id: i32) -> Result<Option<User>, StoreError>;
    fn users_by_ids(&mut self, ids: &[i32]) -> Result<Vec<User>, StoreError>;
    fn list_users(&mut self, page: Page) -> Result<(Vec<User>, i64), StoreError>;

    fn insert_tag(&mut self, tag: &NewTag<'_>) -> Result<Tag, StoreError>;
    fn find_tag(&mut self, id: i32) -> Result<Option<Tag>, StoreError>;
    fn list_tags(&mut self) -> Result<Vec<Tag>, StoreError>;
    fn existing_tag_ids(&mut self, ids: &[i32]) -> Result<Vec<i32>, StoreError>;

    /// Inserts ingredients, skipping (name, unit) pairs that already exist.
    /// Returns the number of rows actually inserted.
    fn insert_ingredients(&mut self, rows: &[NewIngredient<'_>]) -> Result<usize, StoreError>;
    fn find_ingredient(&mut self, id: i32) -> Result<Option<Ingredient>, StoreError>;
    fn search_ingredients(&mut self, name: Option<&str>) -> Result<Vec<Ingredient>, StoreError>;
    fn existing_ingredient_ids(&mut self, ids: &[i32]) -> Result<Vec<i32>, StoreError>;

    fn insert_recipe(&mut self, recipe: &NewRecipe<'_>) -> Result<Recipe, StoreError>;
    fn update_recipe(&mut self, id: i32, changes: &RecipeChanges<'_>)
        -> Result<Recipe, StoreError>;
    fn delete_recipe(&mut self, id: i32) -> Result<bool, StoreError>;
    fn find_recipe(&mut self, id: i32) -> Result<Option<Recipe>, StoreError>;
    /// Ordered by creation time, oldest first.
    fn list_recipes(
        &mut self,
        query: &RecipeQuery,
        page: Page,
    ) -> Result<(Vec<Recipe>, i64), StoreError>;
    /// Makes the recipe's tag set exactly `tag_ids`.
    fn replace_recipe_tags(&mut self, recipe_id: i32, tag_ids: &[i32]) -> Result<(), StoreError>;
    /// Deletes every ingredient row of the recipe, then inserts `rows` in order.
    fn replace_recipe_ingredients(
        &mut self,
        recipe_id: i32,
        rows: &[IngredientAmount],
    ) -> Result<(), StoreError>;
    fn tags_for_recipes(&mut self, recipe_ids: &[i32]) -> Result<Vec<(i32, Tag)>, StoreError>;
    /// Rows come back in insertion order per recipe.
    fn ingredients_for_recipes(
        &mut self,
        recipe_ids: &[i32],
    ) -> Result<Vec<RecipeIngredientDetail>, StoreError>;
    /// Newest first, at most `per_author` recipes for each author.
    fn recipes_by_authors(
        &mut self,
        author_ids: &[i32],
        per_author: usize,
    ) -> Result<Vec<Recipe>, StoreError>;
    fn recipe_counts_by_author(&mut self, author_ids: &[i32])
        -> Result<Vec<(i32, i64)>, StoreError>;

    fn relation_exists(
        &mut self,
        relation: RecipeRelation,
        user_id: i32,
        recipe_id: i32,
    ) -> Result<bool, StoreError>;
    fn insert_relation(
        &mut self,
        relation: RecipeRelation,
        user_id: i32,
        recipe_id: i32,
    ) -> Result<(), StoreError>;
    fn delete_relation(
        &mut self,
        relation: RecipeRelation,
        user_id: i32,
        recipe_id: i32,
    ) -> Result<bool, StoreError>;
    /// The subset of `recipe_ids` the user has in `relation`.
    fn related_recipe_ids(
        &mut self,
        relation: RecipeRelation,
        user_id: i32,
        recipe_ids: &[i32],
    ) -> Result<Vec<i32>, StoreError>;
    /// Ingredient quantities of every recipe in the user's cart.
    fn cart_ingredients(&mut self, user_id: i32) -> Result<Vec<CartIngredientRow>, StoreError>;

    fn subscription_exists(&mut self, user_id: i32, author_id: i32) -> Result<bool, StoreError>;
    fn insert_subscription(&mut self, user_id: i32, author_id: i32) -> Result<(), StoreError>;
    fn delete_subscription(&mut self, user_id: i32, author_id: i32) -> Result<bool, StoreError>;
    /// The subset of `author_ids` the user follows.
    fn subscribed_author_ids(
        &mut self,
        user_id: i32,
        author_ids: &[i32],
    ) -> Result<Vec<i32>, StoreError>;
    /// Followed authors ordered by username.
    fn list_subscribed_authors(
        &mut self,
        user_id: i32,
        page: Page,
    ) -> Result<(Vec<User>, i64), StoreError>;
}
