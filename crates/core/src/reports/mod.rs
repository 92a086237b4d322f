//! Built-in report catalog.

use std::sync::Arc;

use crate::params::Preset;
use crate::report::ReportType;
use crate::types::SaleDate;

pub mod abc_clients;
pub mod abc_goods;
pub mod average_check;
pub mod declined_items;
pub mod inactive_clients;
pub mod new_customers;
mod pareto;
pub mod purchase_frequency;

pub use abc_clients::AbcClients;
pub use abc_goods::AbcGoods;
pub use average_check::AverageCheck;
pub use declined_items::DeclinedItems;
pub use inactive_clients::InactiveClients;
pub use new_customers::NewCustomers;
pub use purchase_frequency::PurchaseFrequency;

/// Button presets for `period_days`.
pub(crate) const PERIOD_PRESETS: &[Preset] = &[
    Preset::Int(15),
    Preset::Int(30),
    Preset::Int(60),
    Preset::Int(90),
    Preset::Int(180),
];

/// Every built-in report in menu order.
pub fn builtin() -> Vec<Arc<dyn ReportType>> {
    vec![
        Arc::new(AverageCheck),
        Arc::new(AbcClients),
        Arc::new(AbcGoods),
        Arc::new(InactiveClients),
        Arc::new(NewCustomers),
        Arc::new(PurchaseFrequency),
        Arc::new(DeclinedItems),
    ]
}

pub(crate) fn month_key(date: SaleDate) -> String {
    date.format("%Y-%m").to_string()
}

#[cfg(test)]
pub(crate) mod fixtures {
    use chrono::NaiveDate;

    use crate::sales::{ItemSale, Order};
    use crate::types::{LocalTime, SaleDate};

    pub fn date(s: &str) -> SaleDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    /// Noon on the given day.
    pub fn at(s: &str) -> LocalTime {
        date(s).and_hms_opt(12, 0, 0).unwrap()
    }

    pub fn order(id: &str, client: &str, day: &str, total: f64) -> Order {
        Order {
            order_id: id.into(),
            client: client.into(),
            date: date(day),
            total_sum: total,
            price_type: String::new(),
        }
    }

    pub fn line(id: &str, client: &str, day: &str, item: &str, total: f64) -> ItemSale {
        ItemSale {
            client: client.into(),
            date: date(day),
            order_id: id.into(),
            item: item.into(),
            line_total: total,
        }
    }
}
