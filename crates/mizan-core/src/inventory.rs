//! # Ingredient Inventory
//!
//! Translates sold line items into ingredient stock movements.
//!
//! ```text
//! LineItem { product: "shawarma", qty: 3 }
//!      │
//!      ▼   recipe: shawarma → chicken 150.000 g, bread 1.000 pc
//! StockAdjustment { chicken, −450.000 g }
//! StockAdjustment { bread,   −3.000 pc }
//! ```
//!
//! Quantities are integer thousandths ([`Measure`]). A refund does not
//! re-read recipes: it applies [`reversal_of`] to the movements recorded
//! for the invoice, so it restores exactly what the sale consumed even if a
//! recipe changed in between.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::ops::{Add, Neg};
use ts_rs::TS;

use crate::error::ValidationError;
use crate::lifecycle::InventoryEffect;
use crate::types::LineItem;
use crate::validation::ValidationResult;

/// Thousandths of a stock unit (g, ml, piece).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Measure(i64);

impl Measure {
    pub const SCALE: i64 = 1000;

    #[inline]
    pub const fn from_milli(milli: i64) -> Self {
        Measure(milli)
    }

    #[inline]
    pub const fn from_units(units: i64) -> Self {
        Measure(units * Self::SCALE)
    }

    #[inline]
    pub const fn milli(&self) -> i64 {
        self.0
    }

    #[inline]
    pub const fn zero() -> Self {
        Measure(0)
    }

    pub const fn checked_mul(&self, factor: i64) -> Option<Self> {
        match self.0.checked_mul(factor) {
            Some(v) => Some(Measure(v)),
            None => None,
        }
    }
}

/// `12.500`
impl fmt::Display for Measure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{}{}.{:03}", sign, abs / 1000, abs % 1000)
    }
}

impl Add for Measure {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Measure(self.0 + other.0)
    }
}

impl Neg for Measure {
    type Output = Self;

    fn neg(self) -> Self {
        Measure(-self.0)
    }
}

/// A stocked ingredient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct InventoryItem {
    pub id: String,
    pub name: String,
    /// Display unit: "g", "ml", "pc".
    pub unit: String,
    pub quantity: Measure,
    pub low_stock_threshold: Measure,
    #[ts(as = "String")]
    pub last_updated: DateTime<Utc>,
}

impl InventoryItem {
    pub fn is_low_stock(&self) -> bool {
        self.quantity <= self.low_stock_threshold
    }
}

/// One ingredient of a product's recipe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct RecipeComponent {
    pub product_id: String,
    pub ingredient_id: String,
    /// Consumed per unit sold.
    pub amount_per_unit: Measure,
}

/// Signed movement of one ingredient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct StockAdjustment {
    pub ingredient_id: String,
    pub delta: Measure,
}

/// Ingredient movements for `items` under `effect`, one entry per
/// ingredient, ordered by ingredient id.
///
/// Products without a recipe do not move stock. `InventoryEffect::None`
/// yields nothing.
pub fn stock_adjustments(
    items: &[LineItem],
    recipes: &[RecipeComponent],
    effect: InventoryEffect,
) -> ValidationResult<Vec<StockAdjustment>> {
    let sign = match effect {
        InventoryEffect::None => return Ok(Vec::new()),
        InventoryEffect::Consume => -1,
        InventoryEffect::Restock => 1,
    };

    let mut totals: BTreeMap<&str, i64> = BTreeMap::new();
    for item in items {
        for component in recipes.iter().filter(|c| c.product_id == item.product_id) {
            let amount = component
                .amount_per_unit
                .checked_mul(item.quantity)
                .ok_or_else(|| ValidationError::overflow("ingredient_amount"))?;
            let entry = totals.entry(component.ingredient_id.as_str()).or_insert(0);
            *entry = entry
                .checked_add(amount.milli())
                .ok_or_else(|| ValidationError::overflow("ingredient_amount"))?;
        }
    }

    Ok(totals
        .into_iter()
        .filter(|(_, amount)| *amount != 0)
        .map(|(ingredient_id, amount)| StockAdjustment {
            ingredient_id: ingredient_id.to_string(),
            delta: Measure::from_milli(amount * sign),
        })
        .collect())
}

/// Movements that undo `recorded`, the deltas already applied for one
/// invoice.
///
/// Deltas are netted per ingredient first, so an ingredient whose movements
/// already cancel out is left alone. Ordered by ingredient id.
pub fn reversal_of(recorded: &[StockAdjustment]) -> ValidationResult<Vec<StockAdjustment>> {
    let mut net: BTreeMap<&str, i64> = BTreeMap::new();
    for movement in recorded {
        let entry = net.entry(movement.ingredient_id.as_str()).or_insert(0);
        *entry = entry
            .checked_add(movement.delta.milli())
            .ok_or_else(|| ValidationError::overflow("ingredient_amount"))?;
    }

    Ok(net
        .into_iter()
        .filter(|(_, amount)| *amount != 0)
        .map(|(ingredient_id, amount)| StockAdjustment {
            ingredient_id: ingredient_id.to_string(),
            delta: -Measure::from_milli(amount),
        })
        .collect())
}
