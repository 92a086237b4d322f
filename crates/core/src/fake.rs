//! Deterministic synthetic sales for development.

use async_trait::async_trait;
use chrono::{Duration, NaiveDate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::batch::{IncomingLine, IncomingOrder, IngestBatch};
use crate::error::CoreError;
use crate::sales::{ItemSale, Order, SalesData};
use crate::source::SalesSource;
use crate::types::{round2, SaleDate};

const CLIENT_PREFIXES: &[&str] = &["North", "Blue", "Silver", "Green", "Prime", "Urban", "Delta"];
const CLIENT_SUFFIXES: &[&str] = &["Trade", "Market", "Foods", "Retail", "Supply"];
const PRODUCTS: &[&str] = &[
    "Black tea", "Green tea", "Coffee beans", "Ground coffee", "Cocoa", "Honey", "Jam",
    "Biscuits", "Chocolate", "Sugar", "Oat flakes", "Juice", "Mineral water", "Syrup", "Nuts",
];
const PRICE_TYPES: &[&str] = &["retail", "wholesale", "dealer"];

#[derive(Debug, Clone)]
pub struct FakeConfig {
    pub seed: u64,
    pub clients: usize,
    pub orders: usize,
    /// Orders are spread over this many days before `today`.
    pub days: i64,
    /// Share of orders emitted as unconfirmed.
    pub unconfirmed_ratio: f64,
}

impl Default for FakeConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            clients: 25,
            orders: 400,
            days: 365,
            unconfirmed_ratio: 0.05,
        }
    }
}

fn client_name(idx: usize) -> String {
    let prefix = CLIENT_PREFIXES[idx % CLIENT_PREFIXES.len()];
    let suffix = CLIENT_SUFFIXES[(idx / CLIENT_PREFIXES.len()) % CLIENT_SUFFIXES.len()];
    format!("{prefix} {suffix} #{}", idx + 1)
}

/// Generate a batch. The same config and `today` always give the same
/// batch.
pub fn generate_batch(config: &FakeConfig, today: SaleDate) -> IngestBatch {
    let mut rng = StdRng::seed_from_u64(config.seed);
    let clients = config.clients.max(1);
    let days = config.days.max(1);

    let orders = (0..config.orders)
        .map(|n| {
            let client_idx = rng.random_range(0..clients);
            let date = today - Duration::days(rng.random_range(0..days));
            let line_count = rng.random_range(1..=4);

            let items: Vec<IncomingLine> = (0..line_count)
                .map(|pos| {
                    let product = rng.random_range(0..PRODUCTS.len());
                    let qty = rng.random_range(1..=12) as f64;
                    let price = round2(rng.random_range(50.0..900.0));
                    IncomingLine {
                        line_no: pos + 1,
                        sku: Some(format!("SKU-{:03}", product + 1)),
                        product_name: PRODUCTS[product].to_string(),
                        qty: Some(qty),
                        price: Some(price),
                        total: Some(round2(qty * price)),
                        vat: Some(0.0),
                        selfcost: Some(round2(price * 0.7)),
                    }
                })
                .collect();

            IncomingOrder {
                order_id: format!("FAKE-{:06}", n + 1),
                client_id: Some(format!("C{:04}", client_idx + 1)),
                client: client_name(client_idx),
                date,
                total_sum: round2(items.iter().map(IncomingLine::line_total).sum()),
                price_type: PRICE_TYPES[rng.random_range(0..PRICE_TYPES.len())].to_string(),
                confirmed: !rng.random_bool(config.unconfirmed_ratio.clamp(0.0, 1.0)),
                items,
            }
        })
        .collect();

    IngestBatch { orders }
}

/// Synthetic [`SalesSource`] generated once at construction.
#[derive(Debug, Clone)]
pub struct FakeSource {
    data: SalesData,
}

impl FakeSource {
    pub fn new(config: &FakeConfig, today: NaiveDate) -> Self {
        Self {
            data: generate_batch(config, today).to_sales(),
        }
    }
}

#[async_trait]
impl SalesSource for FakeSource {
    async fn load_orders(&self, since: Option<SaleDate>) -> Result<Vec<Order>, CoreError> {
        Ok(self
            .data
            .orders
            .iter()
            .filter(|o| since.map_or(true, |s| o.date >= s))
            .cloned()
            .collect())
    }

    async fn load_item_sales(&self, since: Option<SaleDate>) -> Result<Vec<ItemSale>, CoreError> {
        Ok(self
            .data
            .items
            .iter()
            .filter(|i| since.map_or(true, |s| i.date >= s))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> SaleDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
    }

    #[test]
    fn same_seed_same_batch() {
        let config = FakeConfig::default();
        assert_eq!(generate_batch(&config, today()), generate_batch(&config, today()));
    }

    #[test]
    fn batch_is_plannable_and_consistent() {
        let config = FakeConfig {
            orders: 50,
            ..FakeConfig::default()
        };
        let batch = generate_batch(&config, today());
        assert_eq!(batch.len(), 50);
        for order in &batch.orders {
            assert!(order.date <= today());
            assert!(!order.items.is_empty());
            let lines: f64 = order.items.iter().map(IncomingLine::line_total).sum();
            assert!((lines - order.total_sum).abs() < 0.01);
        }
        let plan = batch.plan();
        assert_eq!(plan.orders.len() + plan.deletions.len(), 50);
    }

    #[tokio::test]
    async fn fake_source_filters_by_since() {
        let source = FakeSource::new(&FakeConfig::default(), today());
        let all = source.load_orders(None).await.unwrap();
        let since = today() - Duration::days(30);
        let recent = source.load_orders(Some(since)).await.unwrap();
        assert!(recent.len() < all.len());
        assert!(recent.iter().all(|o| o.date >= since));
    }
}
