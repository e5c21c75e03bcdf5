//! Favorite and shopping-cart toggles.

mod common;

use common::{quick_recipe, user};
use foodgram_core::relations::{
    add_favorite, add_to_shopping_cart, remove_favorite, remove_from_shopping_cart,
};
use foodgram_core::{Actor, CoreError, MemoryStore};

#[test]
fn favorite_add_twice_then_remove_twice() {
    let mut store = MemoryStore::new();
    let alice = user(&mut store, "alice");
    let bob = user(&mut store, "bob");
    let recipe_id = quick_recipe(&mut store, &alice, "stew");

    let summary = add_favorite(&mut store, &bob, recipe_id).unwrap();
    assert_eq!(summary.id, recipe_id);
    assert_eq!(summary.name, "stew");
    assert_eq!(summary.cooking_time, 15);

    let err = add_favorite(&mut store, &bob, recipe_id).unwrap_err();
    assert_eq!(
        err,
        CoreError::Conflict("Recipe is already in favorites".to_string())
    );

    remove_favorite(&mut store, &bob, recipe_id).unwrap();
    let err = remove_favorite(&mut store, &bob, recipe_id).unwrap_err();
    assert!(matches!(err, CoreError::NotFound(_)));
}

#[test]
fn cart_add_twice_then_remove_twice() {
    let mut store = MemoryStore::new();
    let alice = user(&mut store, "alice");
    let recipe_id = quick_recipe(&mut store, &alice, "stew");

    add_to_shopping_cart(&mut store, &alice, recipe_id).unwrap();
    let err = add_to_shopping_cart(&mut store, &alice, recipe_id).unwrap_err();
    assert_eq!(
        err,
        CoreError::Conflict("Recipe is already in the shopping cart".to_string())
    );

    remove_from_shopping_cart(&mut store, &alice, recipe_id).unwrap();
    let err = remove_from_shopping_cart(&mut store, &alice, recipe_id).unwrap_err();
    assert!(matches!(err, CoreError::NotFound(_)));
}

#[test]
fn favorites_and_cart_are_independent() {
    let mut store = MemoryStore::new();
    let alice = user(&mut store, "alice");
    let recipe_id = quick_recipe(&mut store, &alice, "stew");

    add_favorite(&mut store, &alice, recipe_id).unwrap();
    add_to_shopping_cart(&mut store, &alice, recipe_id).unwrap();
    remove_favorite(&mut store, &alice, recipe_id).unwrap();
    let err = remove_favorite(&mut store, &alice, recipe_id).unwrap_err();
    assert!(matches!(err, CoreError::NotFound(_)));
    remove_from_shopping_cart(&mut store, &alice, recipe_id).unwrap();
}

#[test]
fn lost_race_on_insert_is_still_a_conflict() {
    let mut store = MemoryStore::new().with_stale_existence_checks();
    let alice = user(&mut store, "alice");
    let bob = user(&mut store, "bob");
    let recipe_id = quick_recipe(&mut store, &alice, "stew");

    add_favorite(&mut store, &bob, recipe_id).unwrap();
    let err = add_favorite(&mut store, &bob, recipe_id).unwrap_err();
    assert_eq!(
        err,
        CoreError::Conflict("Recipe is already in favorites".to_string())
    );

    add_to_shopping_cart(&mut store, &bob, recipe_id).unwrap();
    let err = add_to_shopping_cart(&mut store, &bob, recipe_id).unwrap_err();
    assert!(matches!(err, CoreError::Conflict(_)));
}

#[test]
fn missing_recipe_and_anonymous_actor_are_rejected() {
    let mut store = MemoryStore::new();
    let alice = user(&mut store, "alice");
    let recipe_id = quick_recipe(&mut store, &alice, "stew");

    assert!(matches!(
        add_favorite(&mut store, &alice, 424242),
        Err(CoreError::NotFound(_))
    ));
    assert!(matches!(
        remove_from_shopping_cart(&mut store, &alice, 424242),
        Err(CoreError::NotFound(_))
    ));
    assert!(matches!(
        add_favorite(&mut store, &Actor::Anonymous, recipe_id),
        Err(CoreError::Permission(_))
    ));
    assert!(matches!(
        remove_favorite(&mut store, &Actor::Anonymous, recipe_id),
        Err(CoreError::Permission(_))
    ));
}
