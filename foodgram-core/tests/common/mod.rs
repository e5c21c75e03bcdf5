//! Shared fixture for integration tests.

#![allow(dead_code)]

use foodgram_core::models::{NewIngredient, NewTag, NewUser};
use foodgram_core::recipes::{create_recipe, IngredientAmount, RecipeInput};
use foodgram_core::{Actor, MemoryStore, Store};

pub fn user(store: &mut MemoryStore, username: &str) -> Actor {
    staff_flag(store, username, false)
}

pub fn staff(store: &mut MemoryStore, username: &str) -> Actor {
    staff_flag(store, username, true)
}

fn staff_flag(store: &mut MemoryStore, username: &str, is_staff: bool) -> Actor {
    let email = format!("{}@example.com", username);
    let user = store
        .insert_user(&NewUser {
            email: &email,
            username,
            first_name: "Test",
            last_name: "Cook",
            is_staff,
        })
        .unwrap();
    Actor::from(&user)
}

pub fn tag(store: &mut MemoryStore, slug: &str) -> i32 {
    store
        .insert_tag(&NewTag {
            name: slug,
            color: "#E26C2D",
            slug,
        })
        .unwrap()
        .id
}

pub fn ingredient(store: &mut MemoryStore, name: &str, unit: &str) -> i32 {
    store
        .insert_ingredients(&[NewIngredient {
            name,
            measurement_unit: unit,
        }])
        .unwrap();
    store
        .search_ingredients(Some(name))
        .unwrap()
        .into_iter()
        .find(|i| i.name == name && i.measurement_unit == unit)
        .unwrap()
        .id
}

pub fn amount(id: i32, amount: i32) -> IngredientAmount {
    IngredientAmount { id, amount }
}

pub fn recipe_input(name: &str, tags: Vec<i32>, ingredients: Vec<IngredientAmount>) -> RecipeInput {
    RecipeInput {
        name: name.to_string(),
        text: format!("How to make {}", name),
        cooking_time: 15,
        image: format!("recipes/{}.png", name),
        tags,
        ingredients,
    }
}

/// Creates a recipe with one tag and one ingredient and returns its id.
pub fn quick_recipe(store: &mut MemoryStore, author: &Actor, name: &str) -> i32 {
    let tag_id = tag(store, &format!("tag-{}", name));
    let ingredient_id = ingredient(store, &format!("ingredient {}", name), "g");
    create_recipe(
        store,
        author,
        &recipe_input(name, vec![tag_id], vec![amount(ingredient_id, 1)]),
    )
    .unwrap()
    .id
}
