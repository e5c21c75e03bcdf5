//! Shopping-list aggregation over a user's cart.

use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;
use utoipa::ToSchema;

use crate::actor::Actor;
use crate::error::CoreError;
use crate::models::CartIngredientRow;
use crate::store::Store;

pub const SHOPPING_LIST_FILENAME: &str = "shopping-list.txt";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct ShoppingListItem {
    pub name: String,
    pub total_amount: i64,
    pub measurement_unit: String,
}

/// Sums amounts per (name, unit), sorted by name then unit.
pub fn aggregate<I>(rows: I) -> Vec<ShoppingListItem>
where
    I: IntoIterator<Item = CartIngredientRow>,
{
    let mut totals: BTreeMap<(String, String), i64> = BTreeMap::new();
    for row in rows {
        *totals.entry((row.name, row.measurement_unit)).or_default() += row.amount;
    }
    totals
        .into_iter()
        .map(|((name, measurement_unit), total_amount)| ShoppingListItem {
            name,
            total_amount,
            measurement_unit,
        })
        .collect()
}

pub fn shopping_list<S: Store>(
    store: &mut S,
    actor: &Actor,
) -> Result<Vec<ShoppingListItem>, CoreError> {
    let user_id = actor.require_user()?;
    let items = aggregate(store.cart_ingredients(user_id)?);
    debug!(user_id, items = items.len(), "Aggregated shopping list");
    Ok(items)
}

/// One line per item: `<name>. Amount: <total> <unit>.`
pub fn render_text(items: &[ShoppingListItem]) -> String {
    items
        .iter()
        .map(|item| {
            format!(
                "{}. Amount: {} {}.",
                item.name, item.total_amount, item.measurement_unit
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// The rendered shopping list, returned to clients as a file attachment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShoppingListFile {
    pub filename: &'static str,
    pub content: String,
}

pub fn export_shopping_list<S: Store>(
    store: &mut S,
    actor: &Actor,
) -> Result<ShoppingListFile, CoreError> {
    let items = shopping_list(store, actor)?;
    Ok(ShoppingListFile {
        filename: SHOPPING_LIST_FILENAME,
        content: render_text(&items),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(name: &str, amount: i64, unit: &str) -> CartIngredientRow {
        CartIngredientRow {
            name: name.to_string(),
            measurement_unit: unit.to_string(),
            amount,
        }
    }

    #[test]
    fn sums_per_name_and_unit() {
        let items = aggregate(vec![
            row("flour", 200, "g"),
            row("egg", 2, "pcs"),
            row("flour", 100, "g"),
        ]);
        assert_eq!(
            items,
            vec![
                ShoppingListItem {
                    name: "egg".to_string(),
                    total_amount: 2,
                    measurement_unit: "pcs".to_string(),
                },
                ShoppingListItem {
                    name: "flour".to_string(),
                    total_amount: 300,
                    measurement_unit: "g".to_string(),
                },
            ]
        );
    }

    #[test]
    fn same_name_different_unit_stays_separate() {
        let items = aggregate(vec![row("sugar", 1, "tbsp"), row("sugar", 50, "g")]);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].measurement_unit, "g");
        assert_eq!(items[1].measurement_unit, "tbsp");
    }

    #[test]
    fn empty_cart_renders_empty_text() {
        assert!(aggregate(Vec::new()).is_empty());
        assert_eq!(render_text(&[]), "");
    }

    #[test]
    fn renders_one_line_per_item() {
        let items = aggregate(vec![row("egg", 2, "pcs"), row("flour", 300, "g")]);
        assert_eq!(
            render_text(&items),
            "egg. Amount: 2 pcs.\nflour. Amount: 300 g."
        );
    }
}
