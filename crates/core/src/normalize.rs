//! Normalization of raw sales documents into canonical [`Order`] and
//! [`ItemSale`] records.
//!
//! Input is a JSON array of order records as exported by the accounting
//! system (or as re-serialized canonical orders; normalization is
//! idempotent). Repeated `order_id`s resolve last-write-wins, keeping the
//! position of the first occurrence.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use indexmap::IndexMap;
use serde_json::{Map, Value};

use crate::aliases::{
    self, item_list, number_field, text_field, ITEM_NAME_FIELDS, ORDER_ID_FIELDS, PRICE_FIELDS,
    QTY_FIELDS, TOTAL_FIELDS,
};
use crate::error::CoreError;
use crate::sales::{ItemSale, Order};
use crate::types::SaleDate;

const CLIENT_FIELDS: &[&str] = &["client", "client_name"];
const PRICE_TYPE_FIELDS: &[&str] = &["price_type"];

// ---------------------------------------------------------------------------
// Scalars
// ---------------------------------------------------------------------------

/// Parse a sale date.
///
/// Accepts `YYYY-MM-DD`, a naive ISO datetime (`T` or space separated) or an
/// RFC 3339 timestamp; the time part is discarded.
pub fn parse_date(raw: &str) -> Result<SaleDate, CoreError> {
    let s = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Ok(date);
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(dt.date());
        }
    }
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.date_naive())
        .map_err(|_| CoreError::Parse(format!("invalid date '{raw}'")))
}

/// Coerce an amount field. Absent or null counts as zero; anything present
/// but non-numeric is a parse error.
pub fn coerce_number(value: Option<&Value>, field: &str) -> Result<f64, CoreError> {
    match value {
        None | Some(Value::Null) => Ok(0.0),
        Some(v) => aliases::scalar_to_f64(v)
            .ok_or_else(|| CoreError::Parse(format!("field '{field}' is not a number: {v}"))),
    }
}

/// Resolve the line total: explicit total, else qty x price, else zero.
pub fn line_total(line: &Map<String, Value>) -> f64 {
    if let Some(total) = number_field(line, TOTAL_FIELDS) {
        return total;
    }
    match (number_field(line, QTY_FIELDS), number_field(line, PRICE_FIELDS)) {
        (Some(qty), Some(price)) => qty * price,
        _ => 0.0,
    }
}

// ---------------------------------------------------------------------------
// Documents
// ---------------------------------------------------------------------------

fn records(doc: &Value) -> Result<IndexMap<String, &Map<String, Value>>, CoreError> {
    let list = doc
        .as_array()
        .ok_or_else(|| CoreError::Parse("sales document must be a JSON array".into()))?;

    let mut by_id: IndexMap<String, &Map<String, Value>> = IndexMap::with_capacity(list.len());
    for (idx, entry) in list.iter().enumerate() {
        let obj = entry
            .as_object()
            .ok_or_else(|| CoreError::Parse(format!("record #{} is not an object", idx + 1)))?;
        let id = text_field(obj, ORDER_ID_FIELDS)
            .ok_or_else(|| CoreError::Parse(format!("record #{} has no order id", idx + 1)))?;
        by_id.insert(id, obj);
    }
    Ok(by_id)
}

fn order_from(order_id: String, obj: &Map<String, Value>) -> Result<Order, CoreError> {
    let date_raw = text_field(obj, &["date"])
        .ok_or_else(|| CoreError::Parse(format!("order '{order_id}' has no date")))?;
    Ok(Order {
        client: text_field(obj, CLIENT_FIELDS).unwrap_or_default(),
        date: parse_date(&date_raw)?,
        total_sum: coerce_number(obj.get("total_sum"), "total_sum")?,
        price_type: text_field(obj, PRICE_TYPE_FIELDS).unwrap_or_default(),
        order_id,
    })
}

/// Canonical order table, keeping orders dated on or after `since`.
pub fn normalize_orders(doc: &Value, since: Option<SaleDate>) -> Result<Vec<Order>, CoreError> {
    let mut orders = Vec::new();
    for (order_id, obj) in records(doc)? {
        let order = order_from(order_id, obj)?;
        if since.map_or(true, |s| order.date >= s) {
            orders.push(order);
        }
    }
    Ok(orders)
}

/// Item-level view: one row per line of every kept order.
pub fn normalize_item_sales(
    doc: &Value,
    since: Option<SaleDate>,
) -> Result<Vec<ItemSale>, CoreError> {
    let mut rows = Vec::new();
    for (order_id, obj) in records(doc)? {
        let order = order_from(order_id, obj)?;
        if since.is_some_and(|s| order.date < s) {
            continue;
        }
        for line in item_list(obj).iter().filter_map(Value::as_object) {
            rows.push(ItemSale {
                client: order.client.clone(),
                date: order.date,
                order_id: order.order_id.clone(),
                item: text_field(line, ITEM_NAME_FIELDS).unwrap_or_default(),
                line_total: line_total(line),
            });
        }
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use serde_json::json;

    use super::*;

    fn date(s: &str) -> SaleDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn parse_date_accepts_datetime_forms() {
        assert_eq!(parse_date("2024-01-10").unwrap(), date("2024-01-10"));
        assert_eq!(parse_date("2024-01-10T15:30:00").unwrap(), date("2024-01-10"));
        assert_eq!(parse_date("2024-01-10 08:00:00").unwrap(), date("2024-01-10"));
        assert_eq!(parse_date("2024-01-10T23:00:00+03:00").unwrap(), date("2024-01-10"));
    }

    #[test]
    fn parse_date_rejects_garbage() {
        assert_matches!(parse_date("10/01/2024"), Err(CoreError::Parse(_)));
    }

    #[test]
    fn orders_take_id_when_order_id_absent() {
        let doc = json!([{"id": 17, "client": "  Acme ", "date": "2024-01-10", "total_sum": "100.5"}]);
        let orders = normalize_orders(&doc, None).unwrap();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].order_id, "17");
        assert_eq!(orders[0].client, "Acme");
        assert_eq!(orders[0].total_sum, 100.5);
        assert_eq!(orders[0].price_type, "");
    }

    #[test]
    fn repeated_order_id_is_last_write_wins() {
        let doc = json!([
            {"id": "A1", "client": "Acme", "date": "2024-01-10", "total_sum": 100},
            {"id": "B1", "client": "Bolt", "date": "2024-01-11", "total_sum": 10},
            {"id": "A1", "client": "Acme", "date": "2024-01-10", "total_sum": 150},
        ]);
        let orders = normalize_orders(&doc, None).unwrap();
        assert_eq!(orders.len(), 2);
        assert_eq!(orders[0].order_id, "A1");
        assert_eq!(orders[0].total_sum, 150.0);
    }

    #[test]
    fn since_bound_is_inclusive() {
        let doc = json!([
            {"id": "1", "client": "A", "date": "2024-01-09", "total_sum": 1},
            {"id": "2", "client": "A", "date": "2024-01-10", "total_sum": 1},
        ]);
        let orders = normalize_orders(&doc, Some(date("2024-01-10"))).unwrap();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].order_id, "2");
    }

    #[test]
    fn malformed_date_is_parse_error() {
        let doc = json!([{"id": "1", "client": "A", "date": "yesterday", "total_sum": 1}]);
        assert_matches!(normalize_orders(&doc, None), Err(CoreError::Parse(_)));
    }

    #[test]
    fn normalization_is_idempotent() {
        let doc = json!([
            {"order_id": "A1", "client": "Acme", "date": "2024-01-10T10:00:00", "total_sum": 100, "price_type": "retail"},
            {"id": "B2", "client_name": "Bolt", "date": "2024-02-01", "total_sum": "7"},
        ]);
        let once = normalize_orders(&doc, None).unwrap();
        let twice = normalize_orders(&serde_json::to_value(&once).unwrap(), None).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn item_sales_resolve_names_and_totals() {
        let doc = json!([{
            "id": "A1", "client": "Acme", "date": "2024-01-10", "total_sum": 130,
            "goods": [
                {"title": "Widget", "quantity": 2, "unit_price": 50},
                {"code": "G-7", "sum": 30},
                {"nomenclature": "Bolt"}
            ]
        }]);
        let rows = normalize_item_sales(&doc, None).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].item, "Widget");
        assert_eq!(rows[0].line_total, 100.0);
        assert_eq!(rows[1].item, "G-7");
        assert_eq!(rows[1].line_total, 30.0);
        assert_eq!(rows[2].item, "Bolt");
        assert_eq!(rows[2].line_total, 0.0);
        assert!(rows.iter().all(|r| r.order_id == "A1" && r.client == "Acme"));
    }
}
