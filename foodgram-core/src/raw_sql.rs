//! Raw SQL fragments that can't be expressed in Diesel's type-safe DSL.
//!
//! # Safety
//!
//! Nothing in this module interpolates user input. Values derived from
//! user input are returned as plain strings meant for `.bind()`-backed DSL
//! methods such as `ilike`.

use diesel::dsl::sql;
use diesel::expression::SqlLiteral;
use diesel::sql_types::BigInt;

/// Window function for counting total rows across the full result set.
///
/// Returns `COUNT(*) OVER()` which gives the total count before LIMIT/OFFSET.
/// Diesel doesn't support window functions natively.
pub fn count_over() -> SqlLiteral<BigInt> {
    sql::<BigInt>("COUNT(*) OVER()")
}

/// Recipes by a set of authors, newest first, capped per author.
///
/// Binds `$1` as the author ids (`Array<Integer>`) and `$2` as the
/// per-author cap (`BigInt`). Columns match [`crate::models::Recipe`].
pub const NEWEST_RECIPES_PER_AUTHOR: &str = "\
    SELECT id, author_id, name, text, cooking_time, image, created_at, updated_at \
    FROM (\
        SELECT recipes.*, ROW_NUMBER() OVER (\
            PARTITION BY author_id ORDER BY created_at DESC, id DESC\
        ) AS position \
        FROM recipes WHERE author_id = ANY($1)\
    ) ranked \
    WHERE position <= $2 \
    ORDER BY created_at DESC, id DESC";

/// `ILIKE` pattern matching `needle` anywhere, with LIKE wildcards escaped.
pub fn contains_pattern(needle: &str) -> String {
    format!(
        "%{}%",
        needle
            .replace('\\', "\\\\")
            .replace('%', "\\%")
            .replace('_', "\\_")
    )
}
