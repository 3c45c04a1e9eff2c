//! Order domain types and the canonical order-total computation.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::CoreError;

/// Lifecycle status of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Shipped,
    Delivered,
}

impl OrderStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
        }
    }

    /// Line items may only be added, edited, or removed while the order is pending.
    #[must_use]
    pub fn accepts_item_changes(self) -> bool {
        self == OrderStatus::Pending
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(OrderStatus::Pending),
            "shipped" => Ok(OrderStatus::Shipped),
            "delivered" => Ok(OrderStatus::Delivered),
            other => Err(CoreError::InvalidOrderStatus(other.to_string())),
        }
    }
}

/// The pricing-relevant part of an order item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineItem {
    pub quantity: i32,
    /// Price per unit captured when the item was created.
    pub unit_price: Decimal,
}

/// Sum of `quantity * unit_price` over `items`, rounded to cents and always
/// carrying two decimal places.
///
/// Returns `0.00` for an empty slice.
#[must_use]
pub fn compute_total(items: &[LineItem]) -> Decimal {
    let mut total = items
        .iter()
        .map(|item| Decimal::from(item.quantity) * item.unit_price)
        .sum::<Decimal>()
        .round_dp(2);
    total.rescale(2);
    total
}
