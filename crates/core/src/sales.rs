//! Canonical sales records consumed by every report.
//!
//! Loaders (JSON feed, Postgres, synthetic) all produce these shapes, so
//! report code never sees backend-specific column names.

use serde::{Deserialize, Serialize};

use crate::types::{OrderId, SaleDate};

/// One order row of the canonical order table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub order_id: OrderId,
    pub client: String,
    pub date: SaleDate,
    pub total_sum: f64,
    #[serde(default)]
    pub price_type: String,
}

/// One line of the item-level view: a line item joined with its order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemSale {
    pub client: String,
    pub date: SaleDate,
    pub order_id: OrderId,
    pub item: String,
    pub line_total: f64,
}

/// What a report needs loaded before it can compute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataNeeds {
    Orders,
    Items,
}

/// Data handed to a report's `compute`.
///
/// Only the half named by the report's [`DataNeeds`] is populated.
#[derive(Debug, Clone, Default)]
pub struct SalesData {
    pub orders: Vec<Order>,
    pub items: Vec<ItemSale>,
}

impl SalesData {
    pub fn from_orders(orders: Vec<Order>) -> Self {
        Self {
            orders,
            items: Vec::new(),
        }
    }

    pub fn from_items(items: Vec<ItemSale>) -> Self {
        Self {
            orders: Vec::new(),
            items,
        }
    }
}
