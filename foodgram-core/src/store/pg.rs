//! PostgreSQL implementation of [`Store`] on a diesel connection.

use diesel::dsl::{count_star, exists, sum};
use diesel::pg::{Pg, PgConnection};
use diesel::prelude::*;
use diesel::sql_types::{Array, BigInt, Integer};

use super::{RecipeQuery, RecipeRelation, Store};
use crate::error::{CoreError, StoreError};
use crate::models::{
    CartIngredientRow, Ingredient, NewIngredient, NewRecipe, NewRecipeIngredient, NewRecipeTag,
    NewTag, NewUser, Recipe, RecipeChanges, RecipeIngredientDetail, Tag, User,
};
use crate::pagination::Page;
use crate::raw_sql;
use crate::recipes::IngredientAmount;
use crate::schema::{
    favorites, ingredients, recipe_ingredients, recipe_tags, recipes, shopping_cart,
    subscriptions, tags, users,
};

/// Rows per INSERT when bulk-loading ingredients, well under the bind limit.
const INSERT_CHUNK: usize = 1000;

/// Expands `$body` once per relation table with `$t` bound to its schema module.
macro_rules! with_relation_table {
    ($relation:expr, $t:ident => $body:expr) => {
        match $relation {
            RecipeRelation::Favorite => {
                use crate::schema::favorites as $t;
                $body
            }
            RecipeRelation::ShoppingCart => {
                use crate::schema::shopping_cart as $t;
                $body
            }
        }
    };
}

/// Strips the `COUNT(*) OVER()` column from a page of rows.
///
/// A page past the end carries no window total, so `count` is asked instead.
fn split_total<T>(
    rows: Vec<(T, i64)>,
    page: Page,
    count: impl FnOnce() -> Result<i64, StoreError>,
) -> Result<(Vec<T>, i64), StoreError> {
    if rows.is_empty() && page.offset > 0 {
        return Ok((Vec::new(), count()?));
    }
    let total = rows.first().map(|(_, total)| *total).unwrap_or(0);
    Ok((rows.into_iter().map(|(row, _)| row).collect(), total))
}

/// Recipes matching the listing filters, unordered and unpaged.
fn filtered_recipes(
    conn: &mut PgConnection,
    query: &RecipeQuery,
) -> Result<recipes::BoxedQuery<'static, Pg>, StoreError> {
    let mut boxed = recipes::table.into_boxed();

    if let Some(author_id) = query.author_id {
        boxed = boxed.filter(recipes::author_id.eq(author_id));
    }

    // Any-of tag match: resolve slugs first so the subselect stays on one table
    if !query.tag_slugs.is_empty() {
        let tag_ids: Vec<i32> = tags::table
            .filter(tags::slug.eq_any(&query.tag_slugs))
            .select(tags::id)
            .load(conn)?;
        boxed = boxed.filter(
            recipes::id.eq_any(
                recipe_tags::table
                    .filter(recipe_tags::tag_id.eq_any(tag_ids))
                    .select(recipe_tags::recipe_id),
            ),
        );
    }

    if let Some(user_id) = query.favorited_by {
        boxed = boxed.filter(
            recipes::id.eq_any(
                favorites::table
                    .filter(favorites::user_id.eq(user_id))
                    .select(favorites::recipe_id),
            ),
        );
    }

    if let Some(user_id) = query.in_cart_of {
        boxed = boxed.filter(
            recipes::id.eq_any(
                shopping_cart::table
                    .filter(shopping_cart::user_id.eq(user_id))
                    .select(shopping_cart::recipe_id),
            ),
        );
    }

    Ok(boxed)
}

impl Store for PgConnection {
    fn transaction<T, F>(&mut self, f: F) -> Result<T, CoreError>
    where
        F: FnOnce(&mut Self) -> Result<T, CoreError>,
    {
        Connection::transaction(self, f)
    }

    fn insert_user(&mut self, user: &NewUser<'_>) -> Result<User, StoreError> {
        Ok(diesel::insert_into(users::table)
            .values(user)
            .returning(User::as_returning())
            .get_result(self)?)
    }

    fn find_user(&mut self, id: i32) -> Result<Option<User>, StoreError> {
        Ok(users::table
            .find(id)
            .select(User::as_select())
            .first(self)
            .optional()?)
    }

    fn users_by_ids(&mut self, ids: &[i32]) -> Result<Vec<User>, StoreError> {
        Ok(users::table
            .filter(users::id.eq_any(ids))
            .select(User::as_select())
            .load(self)?)
    }

    fn list_users(&mut self, page: Page) -> Result<(Vec<User>, i64), StoreError> {
        let rows: Vec<(User, i64)> = users::table
            .order((users::username.asc(), users::id.asc()))
            .select((User::as_select(), raw_sql::count_over()))
            .limit(page.limit)
            .offset(page.offset)
            .load(self)?;
        split_total(rows, page, || Ok(users::table.count().get_result(self)?))
    }

    fn insert_tag(&mut self, tag: &NewTag<'_>) -> Result<Tag, StoreError> {
        Ok(diesel::insert_into(tags::table)
            .values(tag)
            .returning(Tag::as_returning())
            .get_result(self)?)
    }

    fn find_tag(&mut self, id: i32) -> Result<Option<Tag>, StoreError> {
        Ok(tags::table
            .find(id)
            .select(Tag::as_select())
            .first(self)
            .optional()?)
    }

    fn list_tags(&mut self) -> Result<Vec<Tag>, StoreError> {
        Ok(tags::table
            .order((tags::name.asc(), tags::id.asc()))
            .select(Tag::as_select())
            .load(self)?)
    }

    fn existing_tag_ids(&mut self, ids: &[i32]) -> Result<Vec<i32>, StoreError> {
        Ok(tags::table
            .filter(tags::id.eq_any(ids))
            .select(tags::id)
            .load(self)?)
    }

    fn insert_ingredients(&mut self, rows: &[NewIngredient<'_>]) -> Result<usize, StoreError> {
        let mut inserted = 0;
        for chunk in rows.chunks(INSERT_CHUNK) {
            inserted += diesel::insert_into(ingredients::table)
                .values(chunk)
                .on_conflict_do_nothing()
                .execute(self)?;
        }
        Ok(inserted)
    }

    fn find_ingredient(&mut self, id: i32) -> Result<Option<Ingredient>, StoreError> {
        Ok(ingredients::table
            .find(id)
            .select(Ingredient::as_select())
            .first(self)
            .optional()?)
    }

    fn search_ingredients(&mut self, name: Option<&str>) -> Result<Vec<Ingredient>, StoreError> {
        let mut query = ingredients::table.into_boxed();
        if let Some(name) = name {
            query = query.filter(ingredients::name.ilike(raw_sql::contains_pattern(name)));
        }
        Ok(query
            .order((ingredients::name.asc(), ingredients::id.asc()))
            .select(Ingredient::as_select())
            .load(self)?)
    }

    fn existing_ingredient_ids(&mut self, ids: &[i32]) -> Result<Vec<i32>, StoreError> {
        Ok(ingredients::table
            .filter(ingredients::id.eq_any(ids))
            .select(ingredients::id)
            .load(self)?)
    }

    fn insert_recipe(&mut self, recipe: &NewRecipe<'_>) -> Result<Recipe, StoreError> {
        Ok(diesel::insert_into(recipes::table)
            .values(recipe)
            .returning(Recipe::as_returning())
            .get_result(self)?)
    }

    fn update_recipe(
        &mut self,
        id: i32,
        changes: &RecipeChanges<'_>,
    ) -> Result<Recipe, StoreError> {
        Ok(diesel::update(recipes::table.find(id))
            .set(changes)
            .returning(Recipe::as_returning())
            .get_result(self)?)
    }

    fn delete_recipe(&mut self, id: i32) -> Result<bool, StoreError> {
        let deleted = diesel::delete(recipes::table.find(id)).execute(self)?;
        Ok(deleted > 0)
    }

    fn find_recipe(&mut self, id: i32) -> Result<Option<Recipe>, StoreError> {
        Ok(recipes::table
            .find(id)
            .select(Recipe::as_select())
            .first(self)
            .optional()?)
    }

    fn list_recipes(
        &mut self,
        query: &RecipeQuery,
        page: Page,
    ) -> Result<(Vec<Recipe>, i64), StoreError> {
        let rows: Vec<(Recipe, i64)> = filtered_recipes(self, query)?
            .order((recipes::created_at.asc(), recipes::id.asc()))
            .select((Recipe::as_select(), raw_sql::count_over()))
            .limit(page.limit)
            .offset(page.offset)
            .load(self)?;
        split_total(rows, page, || {
            Ok(filtered_recipes(self, query)?.count().get_result(self)?)
        })
    }

    fn replace_recipe_tags(&mut self, recipe_id: i32, tag_ids: &[i32]) -> Result<(), StoreError> {
        diesel::delete(
            recipe_tags::table
                .filter(recipe_tags::recipe_id.eq(recipe_id))
                .filter(recipe_tags::tag_id.ne_all(tag_ids)),
        )
        .execute(self)?;

        let rows: Vec<NewRecipeTag> = tag_ids
            .iter()
            .map(|&tag_id| NewRecipeTag { recipe_id, tag_id })
            .collect();
        diesel::insert_into(recipe_tags::table)
            .values(&rows)
            .on_conflict_do_nothing()
            .execute(self)?;
        Ok(())
    }

    fn replace_recipe_ingredients(
        &mut self,
        recipe_id: i32,
        rows: &[IngredientAmount],
    ) -> Result<(), StoreError> {
        diesel::delete(recipe_ingredients::table.filter(recipe_ingredients::recipe_id.eq(recipe_id)))
            .execute(self)?;

        let rows: Vec<NewRecipeIngredient> = rows
            .iter()
            .map(|row| NewRecipeIngredient {
                recipe_id,
                ingredient_id: row.id,
                amount: row.amount,
            })
            .collect();
        diesel::insert_into(recipe_ingredients::table)
            .values(&rows)
            .execute(self)?;
        Ok(())
    }

    fn tags_for_recipes(&mut self, recipe_ids: &[i32]) -> Result<Vec<(i32, Tag)>, StoreError> {
        Ok(recipe_tags::table
            .inner_join(tags::table)
            .filter(recipe_tags::recipe_id.eq_any(recipe_ids))
            .order((recipe_tags::recipe_id.asc(), tags::id.asc()))
            .select((recipe_tags::recipe_id, Tag::as_select()))
            .load(self)?)
    }

    fn ingredients_for_recipes(
        &mut self,
        recipe_ids: &[i32],
    ) -> Result<Vec<RecipeIngredientDetail>, StoreError> {
        Ok(recipe_ingredients::table
            .inner_join(ingredients::table)
            .filter(recipe_ingredients::recipe_id.eq_any(recipe_ids))
            .order((
                recipe_ingredients::recipe_id.asc(),
                recipe_ingredients::id.asc(),
            ))
            .select((
                recipe_ingredients::recipe_id,
                ingredients::id,
                ingredients::name,
                ingredients::measurement_unit,
                recipe_ingredients::amount,
            ))
            .load(self)?)
    }

    fn recipes_by_authors(
        &mut self,
        author_ids: &[i32],
        per_author: usize,
    ) -> Result<Vec<Recipe>, StoreError> {
        let per_author = i64::try_from(per_author).unwrap_or(i64::MAX);
        Ok(diesel::sql_query(raw_sql::NEWEST_RECIPES_PER_AUTHOR)
            .bind::<Array<Integer>, _>(author_ids.to_vec())
            .bind::<BigInt, _>(per_author)
            .load(self)?)
    }

    fn recipe_counts_by_author(
        &mut self,
        author_ids: &[i32],
    ) -> Result<Vec<(i32, i64)>, StoreError> {
        Ok(recipes::table
            .filter(recipes::author_id.eq_any(author_ids))
            .group_by(recipes::author_id)
            .select((recipes::author_id, count_star()))
            .load(self)?)
    }

    fn relation_exists(
        &mut self,
        relation: RecipeRelation,
        user_id: i32,
        recipe_id: i32,
    ) -> Result<bool, StoreError> {
        with_relation_table!(relation, t => {
            Ok(diesel::select(exists(
                t::table
                    .filter(t::user_id.eq(user_id))
                    .filter(t::recipe_id.eq(recipe_id)),
            ))
            .get_result(self)?)
        })
    }

    fn insert_relation(
        &mut self,
        relation: RecipeRelation,
        user_id: i32,
        recipe_id: i32,
    ) -> Result<(), StoreError> {
        with_relation_table!(relation, t => {
            diesel::insert_into(t::table)
                .values((t::user_id.eq(user_id), t::recipe_id.eq(recipe_id)))
                .execute(self)?;
            Ok(())
        })
    }

    fn delete_relation(
        &mut self,
        relation: RecipeRelation,
        user_id: i32,
        recipe_id: i32,
    ) -> Result<bool, StoreError> {
        with_relation_table!(relation, t => {
            let deleted = diesel::delete(
                t::table
                    .filter(t::user_id.eq(user_id))
                    .filter(t::recipe_id.eq(recipe_id)),
            )
            .execute(self)?;
            Ok(deleted > 0)
        })
    }

    fn related_recipe_ids(
        &mut self,
        relation: RecipeRelation,
        user_id: i32,
        recipe_ids: &[i32],
    ) -> Result<Vec<i32>, StoreError> {
        with_relation_table!(relation, t => {
            Ok(t::table
                .filter(t::user_id.eq(user_id))
                .filter(t::recipe_id.eq_any(recipe_ids))
                .select(t::recipe_id)
                .load(self)?)
        })
    }

    fn cart_ingredients(&mut self, user_id: i32) -> Result<Vec<CartIngredientRow>, StoreError> {
        let rows: Vec<(String, String, Option<i64>)> = recipe_ingredients::table
            .inner_join(ingredients::table)
            .filter(
                recipe_ingredients::recipe_id.eq_any(
                    shopping_cart::table
                        .filter(shopping_cart::user_id.eq(user_id))
                        .select(shopping_cart::recipe_id),
                ),
            )
            .group_by((ingredients::name, ingredients::measurement_unit))
            .select((
                ingredients::name,
                ingredients::measurement_unit,
                sum(recipe_ingredients::amount),
            ))
            .order((ingredients::name.asc(), ingredients::measurement_unit.asc()))
            .load(self)?;

        Ok(rows
            .into_iter()
            .map(|(name, measurement_unit, amount)| CartIngredientRow {
                name,
                measurement_unit,
                amount: amount.unwrap_or(0),
            })
            .collect())
    }

    fn subscription_exists(&mut self, user_id: i32, author_id: i32) -> Result<bool, StoreError> {
        Ok(diesel::select(exists(
            subscriptions::table
                .filter(subscriptions::user_id.eq(user_id))
                .filter(subscriptions::author_id.eq(author_id)),
        ))
        .get_result(self)?)
    }

    fn insert_subscription(&mut self, user_id: i32, author_id: i32) -> Result<(), StoreError> {
        diesel::insert_into(subscriptions::table)
            .values((
                subscriptions::user_id.eq(user_id),
                subscriptions::author_id.eq(author_id),
            ))
            .execute(self)?;
        Ok(())
    }

    fn delete_subscription(&mut self, user_id: i32, author_id: i32) -> Result<bool, StoreError> {
        let deleted = diesel::delete(
            subscriptions::table
                .filter(subscriptions::user_id.eq(user_id))
                .filter(subscriptions::author_id.eq(author_id)),
        )
        .execute(self)?;
        Ok(deleted > 0)
    }

    fn subscribed_author_ids(
        &mut self,
        user_id: i32,
        author_ids: &[i32],
    ) -> Result<Vec<i32>, StoreError> {
        Ok(subscriptions::table
            .filter(subscriptions::user_id.eq(user_id))
            .filter(subscriptions::author_id.eq_any(author_ids))
            .select(subscriptions::author_id)
            .load(self)?)
    }

    fn list_subscribed_authors(
        &mut self,
        user_id: i32,
        page: Page,
    ) -> Result<(Vec<User>, i64), StoreError> {
        let rows: Vec<(User, i64)> = users::table
            .filter(
                users::id.eq_any(
                    subscriptions::table
                        .filter(subscriptions::user_id.eq(user_id))
                        .select(subscriptions::author_id),
                ),
            )
            .order((users::username.asc(), users::id.asc()))
            .select((User::as_select(), raw_sql::count_over()))
            .limit(page.limit)
            .offset(page.offset)
            .load(self)?;
        split_total(rows, page, || {
            Ok(subscriptions::table
                .filter(subscriptions::user_id.eq(user_id))
                .count()
                .get_result(self)?)
        })
    }
}
