//! Tags and ingredients.

use serde::Deserialize;
use std::io::Read;
use tracing::{debug, info};
use utoipa::ToSchema;

use crate::actor::Actor;
use crate::error::CoreError;
use crate::models::{NewIngredient, NewTag};
use crate::permissions::{admin_or_read_only, Action};
use crate::read_model::{IngredientView, TagView};
use crate::store::Store;

pub const MAX_TAG_NAME_LENGTH: usize = 200;

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct TagInput {
    pub name: String,
    /// Hex color in `#RRGGBB` form
    pub color: String,
    pub slug: String,
}

/// One entry of an ingredient import file.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct IngredientRecord {
    pub name: String,
    pub measurement_unit: String,
}

fn is_hex_color(color: &str) -> bool {
    match color.strip_prefix('#') {
        Some(hex) => hex.len() == 6 && hex.chars().all(|c| c.is_ascii_hexdigit()),
        None => false,
    }
}

fn is_slug(slug: &str) -> bool {
    !slug.is_empty()
        && slug
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

pub fn list_tags<S: Store>(store: &mut S) -> Result<Vec<TagView>, CoreError> {
    Ok(store.list_tags()?.into_iter().map(TagView::from).collect())
}

pub fn get_tag<S: Store>(store: &mut S, tag_id: i32) -> Result<TagView, CoreError> {
    store
        .find_tag(tag_id)?
        .map(TagView::from)
        .ok_or_else(|| CoreError::NotFound("Tag not found".to_string()))
}

pub fn create_tag<S: Store>(
    store: &mut S,
    actor: &Actor,
    input: &TagInput,
) -> Result<TagView, CoreError> {
    actor.require_user()?;
    if !admin_or_read_only(actor, Action::Create) {
        return Err(CoreError::Permission(
            "Only administrators can create tags".to_string(),
        ));
    }

    let name = input.name.trim();
    if name.is_empty() {
        return Err(CoreError::validation("name", "Name cannot be empty"));
    }
    if name.chars().count() > MAX_TAG_NAME_LENGTH {
        return Err(CoreError::validation(
            "name",
            format!("Name must be at most {} characters", MAX_TAG_NAME_LENGTH),
        ));
    }
    if !is_hex_color(&input.color) {
        return Err(CoreError::validation(
            "color",
            "Color must be in #RRGGBB format",
        ));
    }
    if !is_slug(&input.slug) {
        return Err(CoreError::validation(
            "slug",
            "Slug may only contain letters, digits, hyphens and underscores",
        ));
    }

    let tag = store.transaction(|store| {
        Ok(store.insert_tag(&NewTag {
            name,
            color: &input.color,
            slug: &input.slug,
        })?)
    })?;
    info!(tag_id = tag.id, slug = %tag.slug, "Tag created");
    Ok(tag.into())
}

/// Ingredients whose name contains `name`, ignoring case. `None` lists all.
pub fn list_ingredients<S: Store>(
    store: &mut S,
    name: Option<&str>,
) -> Result<Vec<IngredientView>, CoreError> {
    let needle = name.map(str::trim).filter(|n| !n.is_empty());
    let rows = store.search_ingredients(needle)?;
    debug!(count = rows.len(), "Listed ingredients");
    Ok(rows.into_iter().map(IngredientView::from).collect())
}

pub fn get_ingredient<S: Store>(
    store: &mut S,
    ingredient_id: i32,
) -> Result<IngredientView, CoreError> {
    store
        .find_ingredient(ingredient_id)?
        .map(IngredientView::from)
        .ok_or_else(|| CoreError::NotFound("Ingredient not found".to_string()))
}

/// Imports a JSON array of `{"name", "measurement_unit"}` objects.
/// Pairs that already exist are skipped. Returns the number inserted.
pub fn import_ingredients<S: Store, R: Read>(store: &mut S, reader: R) -> Result<usize, CoreError> {
    let records: Vec<IngredientRecord> = serde_json::from_reader(reader)
        .map_err(|e| CoreError::validation("file", format!("Invalid ingredient file: {}", e)))?;

    if let Some(index) = records
        .iter()
        .position(|r| r.name.trim().is_empty() || r.measurement_unit.trim().is_empty())
    {
        return Err(CoreError::validation(
            "file",
            format!("Entry {} has an empty name or measurement unit", index),
        ));
    }

    let rows: Vec<NewIngredient<'_>> = records
        .iter()
        .map(|r| NewIngredient {
            name: r.name.trim(),
            measurement_unit: r.measurement_unit.trim(),
        })
        .collect();

    let inserted = store.transaction(|store| Ok(store.insert_ingredients(&rows)?))?;
    info!(
        total = records.len(),
        inserted,
        skipped = records.len() - inserted,
        "Imported ingredients"
    );
    Ok(inserted)
}
