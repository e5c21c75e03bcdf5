//! Shopping-list aggregation over real carts.

mod common;

use common::{amount, ingredient, recipe_input, tag, user};
use foodgram_core::recipes::create_recipe;
use foodgram_core::relations::{add_to_shopping_cart, remove_from_shopping_cart};
use foodgram_core::shopping_list::{export_shopping_list, shopping_list, ShoppingListItem};
use foodgram_core::{Actor, CoreError, MemoryStore};

fn item(name: &str, total_amount: i64, unit: &str) -> ShoppingListItem {
    ShoppingListItem {
        name: name.to_string(),
        total_amount,
        measurement_unit: unit.to_string(),
    }
}

#[test]
fn cart_sums_shared_ingredients() {
    let mut store = MemoryStore::new();
    let alice = user(&mut store, "alice");
    let baking = tag(&mut store, "baking");
    let flour = ingredient(&mut store, "flour", "g");
    let egg = ingredient(&mut store, "egg", "pcs");

    let a = create_recipe(
        &mut store,
        &alice,
        &recipe_input("a", vec![baking], vec![amount(flour, 200), amount(egg, 2)]),
    )
    .unwrap();
    let b = create_recipe(
        &mut store,
        &alice,
        &recipe_input("b", vec![baking], vec![amount(flour, 100)]),
    )
    .unwrap();
    add_to_shopping_cart(&mut store, &alice, a.id).unwrap();
    add_to_shopping_cart(&mut store, &alice, b.id).unwrap();

    assert_eq!(
        shopping_list(&mut store, &alice).unwrap(),
        vec![item("egg", 2, "pcs"), item("flour", 300, "g")]
    );

    let file = export_shopping_list(&mut store, &alice).unwrap();
    assert_eq!(file.filename, "shopping-list.txt");
    assert_eq!(file.content, "egg. Amount: 2 pcs.\nflour. Amount: 300 g.");

    remove_from_shopping_cart(&mut store, &alice, a.id).unwrap();
    assert_eq!(
        shopping_list(&mut store, &alice).unwrap(),
        vec![item("flour", 100, "g")]
    );
}

#[test]
fn carts_are_per_user() {
    let mut store = MemoryStore::new();
    let alice = user(&mut store, "alice");
    let bob = user(&mut store, "bob");
    let baking = tag(&mut store, "baking");
    let flour = ingredient(&mut store, "flour", "g");
    let recipe = create_recipe(
        &mut store,
        &alice,
        &recipe_input("bread", vec![baking], vec![amount(flour, 500)]),
    )
    .unwrap();
    add_to_shopping_cart(&mut store, &alice, recipe.id).unwrap();

    assert!(shopping_list(&mut store, &bob).unwrap().is_empty());
    assert_eq!(export_shopping_list(&mut store, &bob).unwrap().content, "");
}

#[test]
fn anonymous_has_no_shopping_list() {
    let mut store = MemoryStore::new();
    assert!(matches!(
        shopping_list(&mut store, &Actor::Anonymous),
        Err(CoreError::Permission(_))
    ));
}
