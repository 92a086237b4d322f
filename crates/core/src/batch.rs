//! Ingestion batches and upsert planning.
//!
//! A batch arrives either through the strict ingestion contract
//! ([`IngestBatch::parse`], used by the HTTP service) or as a heterogeneous
//! feed export ([`IngestBatch::from_feed`], used by the CLI loader). Both
//! produce the same [`IncomingOrder`] records, and [`IngestBatch::plan`]
//! turns them into the ordered write steps the storage layer executes:
//!
//! 1. delete retracted (unconfirmed) orders; their lines cascade,
//! 2. insert missing clients,
//! 3. upsert confirmed orders,
//! 4. insert missing items,
//! 5. upsert line items, then prune lines beyond the resubmitted count.
//!
//! All structural validation happens while parsing, so a plan can only be
//! built from a batch that is already known to be well formed.

use indexmap::IndexMap;
use serde_json::{Map, Value};

use crate::aliases::{
    first_present, item_list, number_field, scalar_to_f64, scalar_to_string, text_field,
    ITEM_NAME_FIELDS, ITEM_SKU_FIELDS, ORDER_ID_FIELDS, PRICE_FIELDS, QTY_FIELDS,
    SELFCOST_FIELDS, TOTAL_FIELDS, VAT_FIELDS,
};
use crate::error::CoreError;
use crate::normalize::parse_date;
use crate::sales::{ItemSale, Order, SalesData};
use crate::types::{OrderId, SaleDate};

/// Fields every line must carry under the strict contract.
pub const REQUIRED_LINE_FIELDS: &[&str] = &["id", "name", "pcs", "price", "sum"];

// ---------------------------------------------------------------------------
// Incoming records
// ---------------------------------------------------------------------------

/// One line item of an incoming order.
#[derive(Debug, Clone, PartialEq)]
pub struct IncomingLine {
    /// 1-based position within the parent order's item list.
    pub line_no: i32,
    pub sku: Option<String>,
    pub product_name: String,
    pub qty: Option<f64>,
    pub price: Option<f64>,
    pub total: Option<f64>,
    pub vat: Option<f64>,
    pub selfcost: Option<f64>,
}

impl IncomingLine {
    /// Amount used by item-level reports.
    pub fn line_total(&self) -> f64 {
        match (self.total, self.qty, self.price) {
            (Some(total), _, _) => total,
            (None, Some(qty), Some(price)) => qty * price,
            _ => 0.0,
        }
    }
}

/// One order of an incoming batch.
#[derive(Debug, Clone, PartialEq)]
pub struct IncomingOrder {
    pub order_id: OrderId,
    pub client_id: Option<String>,
    pub client: String,
    pub date: SaleDate,
    pub total_sum: f64,
    pub price_type: String,
    pub confirmed: bool,
    pub items: Vec<IncomingLine>,
}

impl IncomingOrder {
    /// Explicit client id, else the display name as surrogate key.
    pub fn resolved_client_id(&self) -> String {
        self.client_id
            .clone()
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| self.client.clone())
    }
}

/// A validated batch of incoming orders in submission order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IngestBatch {
    pub orders: Vec<IncomingOrder>,
}

// ---------------------------------------------------------------------------
// Strict contract
// ---------------------------------------------------------------------------

fn describe(idx: usize, order_id: Option<&str>) -> String {
    match order_id {
        Some(id) => format!("order '{id}' (#{})", idx + 1),
        None => format!("order #{}", idx + 1),
    }
}

fn required_text(obj: &Map<String, Value>, field: &str, at: &str) -> Result<String, CoreError> {
    match obj.get(field) {
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(s.trim().to_string()),
        Some(Value::Null) | None => Err(CoreError::Validation(format!(
            "{at}: missing required field '{field}'"
        ))),
        Some(other) => Err(CoreError::Validation(format!(
            "{at}: field '{field}' must be a non-empty string, got {other}"
        ))),
    }
}

fn required_number(obj: &Map<String, Value>, field: &str, at: &str) -> Result<f64, CoreError> {
    match obj.get(field) {
        Some(Value::Null) | None => Err(CoreError::Validation(format!(
            "{at}: missing required field '{field}'"
        ))),
        Some(v) => scalar_to_f64(v).ok_or_else(|| {
            CoreError::Validation(format!("{at}: field '{field}' must be a number, got {v}"))
        }),
    }
}

fn optional_number(obj: &Map<String, Value>, field: &str, at: &str) -> Result<Option<f64>, CoreError> {
    match obj.get(field) {
        Some(Value::Null) | None => Ok(None),
        Some(v) => scalar_to_f64(v).map(Some).ok_or_else(|| {
            CoreError::Validation(format!("{at}: field '{field}' must be a number, got {v}"))
        }),
    }
}

fn optional_text(obj: &Map<String, Value>, field: &str) -> Option<String> {
    obj.get(field)
        .and_then(scalar_to_string)
        .filter(|s| !s.is_empty())
}

fn parse_strict_line(line_no: i32, entry: &Value, at: &str) -> Result<IncomingLine, CoreError> {
    let at = format!("{at} line {line_no}");
    let obj = entry
        .as_object()
        .ok_or_else(|| CoreError::Validation(format!("{at}: line item must be an object")))?;

    for field in REQUIRED_LINE_FIELDS {
        if matches!(obj.get(*field), None | Some(Value::Null)) {
            return Err(CoreError::Validation(format!(
                "{at}: missing required field '{field}'"
            )));
        }
    }

    let sku = obj
        .get("id")
        .and_then(scalar_to_string)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| CoreError::Validation(format!("{at}: field 'id' must be a non-empty scalar")))?;

    Ok(IncomingLine {
        line_no,
        sku: Some(sku),
        product_name: required_text(obj, "name", &at)?,
        qty: Some(required_number(obj, "pcs", &at)?),
        price: Some(required_number(obj, "price", &at)?),
        total: Some(required_number(obj, "sum", &at)?),
        vat: optional_number(obj, "VAT", &at)?,
        selfcost: optional_number(obj, "selfcost", &at)?,
    })
}

fn parse_strict_order(idx: usize, entry: &Value) -> Result<IncomingOrder, CoreError> {
    let obj = entry
        .as_object()
        .ok_or_else(|| CoreError::Validation(format!("{}: must be an object", describe(idx, None))))?;

    let order_id = first_present(obj, ORDER_ID_FIELDS)
        .and_then(|v| match v {
            Value::String(_) | Value::Number(_) => scalar_to_string(v),
            _ => None,
        })
        .ok_or_else(|| {
            CoreError::Validation(format!(
                "{}: missing required field 'id' or 'order_id'",
                describe(idx, None)
            ))
        })?;
    let at = describe(idx, Some(&order_id));

    let client = required_text(obj, "client", &at)?;
    let date_raw = required_text(obj, "date", &at)?;
    let date = parse_date(&date_raw)
        .map_err(|_| CoreError::Validation(format!("{at}: field 'date' is not a valid date: '{date_raw}'")))?;

    let total_sum = required_number(obj, "total_sum", &at)?;
    if total_sum < 0.0 {
        return Err(CoreError::Validation(format!(
            "{at}: field 'total_sum' must not be negative"
        )));
    }

    let confirmed = match obj.get("confirmed") {
        Some(Value::Bool(b)) => *b,
        Some(Value::Null) | None => {
            return Err(CoreError::Validation(format!(
                "{at}: missing required field 'confirmed'"
            )))
        }
        Some(other) => {
            return Err(CoreError::Validation(format!(
                "{at}: field 'confirmed' must be a boolean, got {other}"
            )))
        }
    };

    // Lines of a retracted order are never written, so they are not checked.
    let items = match (confirmed, obj.get("items")) {
        (false, _) | (true, None | Some(Value::Null)) => Vec::new(),
        (true, Some(Value::Array(list))) => list
            .iter()
            .enumerate()
            .map(|(pos, line)| parse_strict_line(pos as i32 + 1, line, &at))
            .collect::<Result<Vec<_>, _>>()?,
        (true, Some(other)) => {
            return Err(CoreError::Validation(format!(
                "{at}: field 'items' must be a list, got {other}"
            )))
        }
    };

    Ok(IncomingOrder {
        order_id,
        client_id: optional_text(obj, "client_id"),
        client,
        date,
        total_sum,
        price_type: optional_text(obj, "price_type").unwrap_or_default(),
        confirmed,
        items,
    })
}

// ---------------------------------------------------------------------------
// Lenient feed
// ---------------------------------------------------------------------------

fn feed_line(line_no: i32, obj: &Map<String, Value>) -> IncomingLine {
    let sku = text_field(obj, ITEM_SKU_FIELDS);
    let qty = number_field(obj, QTY_FIELDS);
    let mut price = number_field(obj, PRICE_FIELDS);
    let mut total = number_field(obj, TOTAL_FIELDS);

    match (qty, price, total) {
        (Some(q), None, Some(t)) if q != 0.0 => price = Some(t / q),
        (Some(q), Some(p), None) => total = Some(q * p),
        _ => {}
    }

    IncomingLine {
        line_no,
        product_name: text_field(obj, ITEM_NAME_FIELDS)
            .or_else(|| sku.clone())
            .unwrap_or_default(),
        sku,
        qty,
        price,
        total,
        vat: number_field(obj, VAT_FIELDS),
        selfcost: number_field(obj, SELFCOST_FIELDS),
    }
}

fn feed_order(obj: &Map<String, Value>) -> Option<IncomingOrder> {
    let order_id = text_field(obj, ORDER_ID_FIELDS)?;
    let date = text_field(obj, &["date"]).and_then(|d| parse_date(&d).ok());
    let Some(date) = date else {
        tracing::warn!(order_id = %order_id, "Skipping feed record without a valid date");
        return None;
    };

    let client = text_field(obj, &["client", "client_name"])
        .map(|c| c.trim().to_string())
        .unwrap_or_default();
    if client.is_empty() {
        tracing::warn!(order_id = %order_id, "Skipping feed record without a client name");
        return None;
    }
    let total_sum = number_field(obj, &["total_sum"]).unwrap_or(0.0);
    if total_sum < 0.0 {
        tracing::warn!(order_id = %order_id, total_sum, "Skipping feed record with a negative total");
        return None;
    }

    let items = item_list(obj)
        .iter()
        .filter_map(Value::as_object)
        .enumerate()
        .map(|(pos, line)| feed_line(pos as i32 + 1, line))
        .collect();

    Some(IncomingOrder {
        order_id,
        client_id: text_field(obj, &["client_id"]),
        client,
        date,
        total_sum,
        price_type: text_field(obj, &["price_type"]).unwrap_or_default(),
        confirmed: obj.get("confirmed").and_then(Value::as_bool).unwrap_or(true),
        items,
    })
}

// ---------------------------------------------------------------------------
// Batch
// ---------------------------------------------------------------------------

impl IngestBatch {
    /// Validate a batch against the ingestion contract.
    ///
    /// The batch must be a non-empty array. Every order needs `client`,
    /// `date` (`YYYY-MM-DD`), a non-negative `total_sum`, `id` or
    /// `order_id`, and a boolean `confirmed`. `items` is optional; when a
    /// confirmed order carries it, every line needs `id`, `name`, `pcs`,
    /// `price` and `sum` (`VAT` and `selfcost` optional). The first problem
    /// found is returned as [`CoreError::Validation`] naming the order and
    /// line.
    pub fn parse(doc: &Value) -> Result<Self, CoreError> {
        let list = doc.as_array().ok_or_else(|| {
            CoreError::Validation("batch must be a JSON array of orders".into())
        })?;
        if list.is_empty() {
            return Err(CoreError::Validation("batch is empty".into()));
        }

        let orders = list
            .iter()
            .enumerate()
            .map(|(idx, entry)| parse_strict_order(idx, entry))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { orders })
    }

    /// Read a heterogeneous feed export.
    ///
    /// Field names go through the alias tables, `confirmed` defaults to
    /// true, a missing price is derived as total / qty. Records without an
    /// order id, a parseable date or a client name, and records with a
    /// negative total, are skipped with a warning.
    pub fn from_feed(doc: &Value) -> Result<Self, CoreError> {
        let list = doc
            .as_array()
            .ok_or_else(|| CoreError::Parse("feed must be a JSON array".into()))?;

        let orders: Vec<_> = list
            .iter()
            .filter_map(Value::as_object)
            .filter_map(feed_order)
            .collect();

        let skipped = list.len() - orders.len();
        if skipped > 0 {
            tracing::warn!(skipped, total = list.len(), "Feed records skipped");
        }
        Ok(Self { orders })
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    /// Split into consecutive sub-batches of at most `size` orders.
    pub fn chunks(&self, size: usize) -> impl Iterator<Item = IngestBatch> + '_ {
        self.orders.chunks(size.max(1)).map(|c| IngestBatch {
            orders: c.to_vec(),
        })
    }

    /// Canonical sales data for the confirmed orders of this batch.
    pub fn to_sales(&self) -> SalesData {
        let mut data = SalesData::default();
        for order in self.orders.iter().filter(|o| o.confirmed) {
            data.orders.push(Order {
                order_id: order.order_id.clone(),
                client: order.client.clone(),
                date: order.date,
                total_sum: order.total_sum,
                price_type: order.price_type.clone(),
            });
            for line in &order.items {
                data.items.push(ItemSale {
                    client: order.client.clone(),
                    date: order.date,
                    order_id: order.order_id.clone(),
                    item: if line.product_name.is_empty() {
                        line.sku.clone().unwrap_or_default()
                    } else {
                        line.product_name.clone()
                    },
                    line_total: line.line_total(),
                });
            }
        }
        data
    }

    /// Build the ordered write plan.
    ///
    /// Within one batch the last record for an `order_id` wins, including
    /// its `confirmed` flag.
    pub fn plan(&self) -> UpsertPlan {
        let mut latest: IndexMap<&str, &IncomingOrder> = IndexMap::new();
        for order in &self.orders {
            latest.insert(order.order_id.as_str(), order);
        }

        let mut plan = UpsertPlan::default();
        let mut clients: IndexMap<String, String> = IndexMap::new();
        let mut items: IndexMap<String, String> = IndexMap::new();

        for order in latest.values() {
            if !order.confirmed {
                plan.deletions.push(order.order_id.clone());
                continue;
            }

            let client_id = order.resolved_client_id();
            clients
                .entry(client_id.clone())
                .or_insert_with(|| order.client.clone());

            plan.orders.push(OrderRow {
                order_id: order.order_id.clone(),
                client_id,
                date: order.date,
                total_sum: order.total_sum,
                price_type: order.price_type.clone(),
            });

            for line in &order.items {
                if let Some(sku) = &line.sku {
                    items
                        .entry(sku.clone())
                        .or_insert_with(|| line.product_name.clone());
                }
                plan.lines.push(LineRow {
                    order_id: order.order_id.clone(),
                    line_no: line.line_no,
                    sku: line.sku.clone(),
                    product_name: line.product_name.clone(),
                    qty: line.qty,
                    price: line.price,
                    total: line.total,
                    vat: line.vat,
                    selfcost: line.selfcost,
                });
            }

            if !order.items.is_empty() {
                plan.prunes.push(LinePrune {
                    order_id: order.order_id.clone(),
                    keep_through: order.items.len() as i32,
                });
            }
        }

        plan.clients = clients
            .into_iter()
            .map(|(client_id, client_name)| ClientRow {
                client_id,
                client_name,
            })
            .collect();
        plan.items = items
            .into_iter()
            .map(|(sku, product_name)| ItemRow { sku, product_name })
            .collect();
        plan
    }
}

// ---------------------------------------------------------------------------
// Plan
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct ClientRow {
    pub client_id: String,
    pub client_name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ItemRow {
    pub sku: String,
    pub product_name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderRow {
    pub order_id: OrderId,
    pub client_id: String,
    pub date: SaleDate,
    pub total_sum: f64,
    pub price_type: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LineRow {
    pub order_id: OrderId,
    pub line_no: i32,
    pub sku: Option<String>,
    pub product_name: String,
    pub qty: Option<f64>,
    pub price: Option<f64>,
    pub total: Option<f64>,
    pub vat: Option<f64>,
    pub selfcost: Option<f64>,
}

/// Stored lines of `order_id` numbered above `keep_through` are stale.
#[derive(Debug, Clone, PartialEq)]
pub struct LinePrune {
    pub order_id: OrderId,
    pub keep_through: i32,
}

/// Write steps for one batch, in execution order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpsertPlan {
    pub deletions: Vec<OrderId>,
    pub clients: Vec<ClientRow>,
    pub orders: Vec<OrderRow>,
    pub items: Vec<ItemRow>,
    pub lines: Vec<LineRow>,
    pub prunes: Vec<LinePrune>,
}

impl UpsertPlan {
    pub fn is_empty(&self) -> bool {
        self.deletions.is_empty() && self.orders.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use serde_json::json;

    use super::*;

    fn acme(confirmed: bool) -> Value {
        json!([{
            "id": "A1", "client": "Acme", "date": "2024-01-10", "total_sum": 100,
            "confirmed": confirmed,
            "items": [{"id": "S1", "name": "Widget", "pcs": 2, "price": 50, "sum": 100, "VAT": 0, "selfcost": 0}]
        }])
    }

    fn validation_message(doc: Value) -> String {
        match IngestBatch::parse(&doc) {
            Err(CoreError::Validation(msg)) => msg,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn acme_batch_plans_dimensions_before_facts() {
        let plan = IngestBatch::parse(&acme(true)).unwrap().plan();
        assert!(plan.deletions.is_empty());
        assert_eq!(plan.clients, vec![ClientRow { client_id: "Acme".into(), client_name: "Acme".into() }]);
        assert_eq!(plan.items, vec![ItemRow { sku: "S1".into(), product_name: "Widget".into() }]);
        assert_eq!(plan.orders.len(), 1);
        assert_eq!(plan.orders[0].total_sum, 100.0);
        assert_eq!(plan.lines.len(), 1);
        assert_eq!(plan.lines[0].line_no, 1);
        assert_eq!(plan.lines[0].sku.as_deref(), Some("S1"));
        assert_eq!(plan.lines[0].total, Some(100.0));
        assert_eq!(plan.prunes, vec![LinePrune { order_id: "A1".into(), keep_through: 1 }]);
    }

    #[test]
    fn unconfirmed_order_becomes_deletion() {
        let plan = IngestBatch::parse(&acme(false)).unwrap().plan();
        assert_eq!(plan.deletions, vec!["A1".to_string()]);
        assert!(plan.orders.is_empty());
        assert!(plan.lines.is_empty());
        assert!(plan.clients.is_empty());
    }

    #[test]
    fn explicit_client_id_wins_over_name() {
        let doc = json!([
            {"id": "1", "client": "Acme Ltd", "client_id": "C-9", "date": "2024-01-10", "total_sum": 5, "confirmed": true},
            {"id": "2", "client": "Acme", "client_id": "C-9", "date": "2024-01-11", "total_sum": 5, "confirmed": true},
        ]);
        let plan = IngestBatch::parse(&doc).unwrap().plan();
        assert_eq!(plan.clients.len(), 1);
        assert_eq!(plan.clients[0].client_id, "C-9");
        assert_eq!(plan.clients[0].client_name, "Acme Ltd");
        assert!(plan.orders.iter().all(|o| o.client_id == "C-9"));
    }

    #[test]
    fn line_numbers_ignore_payload_indices() {
        let doc = json!([{
            "id": "A1", "client": "Acme", "date": "2024-01-10", "total_sum": 3, "confirmed": true,
            "items": [
                {"id": "S1", "name": "a", "pcs": 1, "price": 1, "sum": 1, "line_no": 7},
                {"id": "S2", "name": "b", "pcs": 1, "price": 2, "sum": 2, "line_no": 3},
            ]
        }]);
        let plan = IngestBatch::parse(&doc).unwrap().plan();
        let numbers: Vec<_> = plan.lines.iter().map(|l| l.line_no).collect();
        assert_eq!(numbers, vec![1, 2]);
    }

    #[test]
    fn last_record_per_order_wins_within_batch() {
        let doc = json!([
            {"id": "A1", "client": "Acme", "date": "2024-01-10", "total_sum": 100, "confirmed": true},
            {"id": "A1", "client": "Acme", "date": "2024-01-10", "total_sum": 100, "confirmed": false},
        ]);
        let plan = IngestBatch::parse(&doc).unwrap().plan();
        assert_eq!(plan.deletions, vec!["A1".to_string()]);
        assert!(plan.orders.is_empty());
    }

    #[test]
    fn empty_batch_is_rejected() {
        assert_matches!(IngestBatch::parse(&json!([])), Err(CoreError::Validation(_)));
        assert_matches!(IngestBatch::parse(&json!({"id": "A1"})), Err(CoreError::Validation(_)));
    }

    #[test]
    fn confirmed_must_be_boolean() {
        let msg = validation_message(json!([
            {"id": "A1", "client": "Acme", "date": "2024-01-10", "total_sum": 1, "confirmed": "yes"}
        ]));
        assert!(msg.contains("'confirmed'"), "{msg}");
        assert!(msg.contains("A1"), "{msg}");
    }

    #[test]
    fn missing_line_field_names_order_and_line() {
        let msg = validation_message(json!([
            {"id": "A1", "client": "Acme", "date": "2024-01-10", "total_sum": 1, "confirmed": true, "items": []},
            {"id": "B7", "client": "Bolt", "date": "2024-01-10", "total_sum": 1, "confirmed": true,
             "items": [
                {"id": "S1", "name": "a", "pcs": 1, "price": 1, "sum": 1},
                {"id": "S2", "name": "b", "pcs": 1, "sum": 1}
             ]}
        ]));
        assert!(msg.contains("order 'B7' (#2) line 2"), "{msg}");
        assert!(msg.contains("'price'"), "{msg}");
    }

    #[test]
    fn negative_total_and_bad_date_are_rejected() {
        let msg = validation_message(json!([
            {"id": "A1", "client": "Acme", "date": "2024-01-10", "total_sum": -1, "confirmed": true}
        ]));
        assert!(msg.contains("total_sum"), "{msg}");

        let msg = validation_message(json!([
            {"id": "A1", "client": "Acme", "date": "10.01.2024", "total_sum": 1, "confirmed": true}
        ]));
        assert!(msg.contains("date"), "{msg}");
    }

    #[test]
    fn retracted_order_items_are_not_validated() {
        let doc = json!([
            {"id": "A1", "client": "Acme", "date": "2024-01-10", "total_sum": 1, "confirmed": false,
             "items": [{"junk": true}]}
        ]);
        let batch = IngestBatch::parse(&doc).unwrap();
        assert!(batch.orders[0].items.is_empty());
    }

    #[test]
    fn feed_resolves_aliases_and_derives_price() {
        let doc = json!([
            {"order_id": "F1", "client": "Acme", "date": "2024-03-01T12:00:00", "total_sum": "60",
             "positions": [
                {"code": "K1", "title": "Kettle", "quantity": 3, "sum": 60},
                {"article": "M2", "count": 2, "unit_price": 5}
             ]},
            {"id": "F2", "client": "Bolt", "date": "not a date"},
            {"client": "Nobody", "date": "2024-03-01"}
        ]);
        let batch = IngestBatch::from_feed(&doc).unwrap();
        assert_eq!(batch.len(), 1);

        let order = &batch.orders[0];
        assert!(order.confirmed);
        assert_eq!(order.total_sum, 60.0);
        assert_eq!(order.items[0].sku.as_deref(), Some("K1"));
        assert_eq!(order.items[0].product_name, "Kettle");
        assert_eq!(order.items[0].price, Some(20.0));
        assert_eq!(order.items[1].product_name, "M2");
        assert_eq!(order.items[1].total, Some(10.0));
    }

    #[test]
    fn feed_skips_nameless_and_negative_records() {
        let doc = json!([
            {"order_id": "F1", "client": "Acme", "date": "2024-03-01", "total_sum": 10},
            {"order_id": "F2", "client": "   ", "date": "2024-03-01", "total_sum": 10},
            {"order_id": "F3", "date": "2024-03-01", "total_sum": 10},
            {"order_id": "F4", "client": "Bolt", "date": "2024-03-01", "total_sum": -5},
            {"order_id": "F5", "client_name": " Core ", "date": "2024-03-02"}
        ]);
        let batch = IngestBatch::from_feed(&doc).unwrap();
        let kept: Vec<_> = batch.orders.iter().map(|o| (o.order_id.as_str(), o.client.as_str())).collect();
        assert_eq!(kept, vec![("F1", "Acme"), ("F5", "Core")]);
        assert_eq!(batch.orders[1].total_sum, 0.0);
    }

    #[test]
    fn chunks_split_in_order() {
        let doc: Vec<Value> = (0..5)
            .map(|i| json!({"id": i, "client": "A", "date": "2024-01-01", "total_sum": 1, "confirmed": true}))
            .collect();
        let batch = IngestBatch::parse(&Value::Array(doc)).unwrap();
        let sizes: Vec<_> = batch.chunks(2).map(|c| c.len()).collect();
        assert_eq!(sizes, vec![2, 2, 1]);
        assert_eq!(batch.chunks(0).count(), 5);
    }

    #[test]
    fn to_sales_keeps_confirmed_only() {
        let mut batch = IngestBatch::parse(&acme(true)).unwrap();
        batch.orders.extend(IngestBatch::parse(&json!([
            {"id": "Z9", "client": "Zed", "date": "2024-01-10", "total_sum": 5, "confirmed": false}
        ])).unwrap().orders);
        let data = batch.to_sales();
        assert_eq!(data.orders.len(), 1);
        assert_eq!(data.items.len(), 1);
        assert_eq!(data.items[0].item, "Widget");
        assert_eq!(data.items[0].line_total, 100.0);
    }
}
