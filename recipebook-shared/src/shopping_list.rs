/// Shopping list aggregation
///
/// Collects the ingredient lines of every recipe in a user's shopping cart,
/// groups them by `(ingredient name, measurement unit)` and sums the amounts.
/// The result renders as one `"{name} - {total}({unit})"` line per group,
/// ordered by name and then unit.
///
/// ```
/// use recipebook_shared::shopping_list::{aggregate, CartLine};
///
/// let lines = vec![
///     CartLine::new("Salt", "g", 5),
///     CartLine::new("Flour", "g", 200),
///     CartLine::new("Salt", "g", 10),
/// ];
///
/// let list = aggregate(lines);
/// assert_eq!(list.render(), "Flour - 200(g)\nSalt - 15(g)");
/// ```

use serde::Serialize;
use sqlx::PgPool;
use std::collections::BTreeMap;
use tracing::debug;

/// One ingredient line of one recipe in the cart
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct CartLine {
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}

impl CartLine {
    pub fn new(name: impl Into<String>, measurement_unit: impl Into<String>, amount: i32) -> Self {
        Self {
            name: name.into(),
            measurement_unit: measurement_unit.into(),
            amount,
        }
    }
}

/// Summed amount of one `(name, unit)` group
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShoppingListItem {
    pub name: String,
    pub measurement_unit: String,
    pub total: i64,
}

/// Aggregated shopping list
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ShoppingList {
    pub items: Vec<ShoppingListItem>,
}

impl ShoppingList {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Plain-text document, one line per item, no trailing newline
    pub fn render(&self) -> String {
        self.items
            .iter()
            .map(|item| format!("{} - {}({})", item.name, item.total, item.measurement_unit))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Groups lines by `(name, unit)` and sums amounts in a single pass
pub fn aggregate<I>(lines: I) -> ShoppingList
where
    I: IntoIterator<Item = CartLine>,
{
    let mut groups: BTreeMap<(String, String), i64> = BTreeMap::new();

    for line in lines {
        *groups
            .entry((line.name, line.measurement_unit))
            .or_insert(0) += i64::from(line.amount);
    }

    ShoppingList {
        items: groups
            .into_iter()
            .map(|((name, measurement_unit), total)| ShoppingListItem {
                name,
                measurement_unit,
                total,
            })
            .collect(),
    }
}

/// Ingredient lines of every recipe in the user's cart
pub async fn cart_lines(pool: &PgPool, user_id: i64) -> Result<Vec<CartLine>, sqlx::Error> {
    sqlx::query_as::<_, CartLine>(
        r#"
        SELECT i.name, i.measurement_unit, ri.amount
        FROM shopping_cart c
        JOIN recipe_ingredients ri ON ri.recipe_id = c.recipe_id
        JOIN ingredients i ON i.id = ri.ingredient_id
        WHERE c.user_id = $1
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
}

/// Builds the aggregated shopping list for a user
///
/// An empty cart yields an empty list.
pub async fn build(pool: &PgPool, user_id: i64) -> Result<ShoppingList, sqlx::Error> {
    let lines = cart_lines(pool, user_id).await?;
    let line_count = lines.len();

    let list = aggregate(lines);
    debug!(user_id, line_count, items = list.items.len(), "Shopping list built");

    Ok(list)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_ingredient_is_summed() {
        let list = aggregate(vec![
            CartLine::new("Salt", "g", 5),
            CartLine::new("Salt", "g", 10),
        ]);

        assert_eq!(
            list.items,
            vec![ShoppingListItem {
                name: "Salt".to_string(),
                measurement_unit: "g".to_string(),
                total: 15,
            }]
        );
        assert_eq!(list.render(), "Salt - 15(g)");
    }

    #[test]
    fn test_empty_cart_is_empty_document() {
        let list = aggregate(Vec::new());
        assert!(list.is_empty());
        assert_eq!(list.render(), "");
    }

    #[test]
    fn test_different_units_stay_separate() {
        let list = aggregate(vec![
            CartLine::new("Milk", "ml", 200),
            CartLine::new("Milk", "cup", 1),
            CartLine::new("Milk", "ml", 300),
        ]);

        assert_eq!(list.render(), "Milk - 1(cup)\nMilk - 500(ml)");
    }

    #[test]
    fn test_items_ordered_by_name_then_unit() {
        let list = aggregate(vec![
            CartLine::new("Sugar", "g", 1),
            CartLine::new("Eggs", "pcs", 2),
            CartLine::new("Butter", "g", 3),
        ]);

        let names: Vec<&str> = list.items.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["Butter", "Eggs", "Sugar"]);
    }

    #[test]
    fn test_totals_do_not_overflow_i32() {
        let list = aggregate(vec![
            CartLine::new("Water", "ml", i32::MAX),
            CartLine::new("Water", "ml", i32::MAX),
        ]);

        assert_eq!(list.items[0].total, 2 * i64::from(i32::MAX));
    }

    #[test]
    fn test_unicode_names_render() {
        let list = aggregate(vec![CartLine::new("Соль", "г", 5)]);
        assert_eq!(list.render(), "Соль - 5(г)");
    }
}
