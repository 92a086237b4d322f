//! Integration tests for `PgSalesSource`.

use assert_matches::assert_matches;
use chrono::NaiveDate;
use serde_json::json;
use sqlx::PgPool;

use salesbot_core::batch::IngestBatch;
use salesbot_core::error::CoreError;
use salesbot_core::source::SalesSource;
use salesbot_db::{ingest, PgSalesSource, SalesSchema};

fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

async fn seed(pool: &PgPool) {
    let schema = SalesSchema::default();
    let strict = json!([{
        "id": "A1", "client": "Acme", "date": "2024-01-10", "total_sum": 100, "confirmed": true,
        "items": [{"id": "S1", "name": "Widget", "pcs": 2, "price": 50, "sum": 100}]
    }]);
    ingest(pool, &schema, &IngestBatch::parse(&strict).unwrap()).await.unwrap();

    // Feed line with only a SKU and no explicit total.
    let feed = json!([{
        "order_id": "B1", "client": "Bolt", "client_id": "C-2", "date": "2024-02-05",
        "total_sum": 30, "price_type": "retail",
        "goods": [{"sku": "S2", "qty": 3, "price": 10}]
    }]);
    ingest(pool, &schema, &IngestBatch::from_feed(&feed).unwrap()).await.unwrap();
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_orders_use_client_display_name(pool: PgPool) {
    seed(&pool).await;
    let source = PgSalesSource::new(pool, SalesSchema::default());

    let orders = source.load_orders(None).await.unwrap();
    assert_eq!(orders.len(), 2);
    assert_eq!(orders[0].order_id, "A1");
    assert_eq!(orders[1].client, "Bolt");
    assert_eq!(orders[1].price_type, "retail");
    assert_eq!(orders[1].total_sum, 30.0);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_since_is_inclusive(pool: PgPool) {
    seed(&pool).await;
    let source = PgSalesSource::new(pool, SalesSchema::default());

    let orders = source.load_orders(Some(date("2024-02-05"))).await.unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].order_id, "B1");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_item_sales_fall_back_to_sku(pool: PgPool) {
    seed(&pool).await;
    let source = PgSalesSource::new(pool, SalesSchema::default());

    let items = source.load_item_sales(None).await.unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].item, "Widget");
    assert_eq!(items[0].line_total, 100.0);
    assert_eq!(items[1].item, "S2");
    assert_eq!(items[1].client, "Bolt");
}

#[tokio::test]
async fn test_empty_dsn_is_config_error() {
    let result = PgSalesSource::connect("  ", SalesSchema::default()).await;
    assert_matches!(result.err(), Some(CoreError::Config(_)));
}
