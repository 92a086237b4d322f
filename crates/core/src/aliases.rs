//! Field-alias resolution for heterogeneous sales feeds.
//!
//! Exports from different accounting systems name the same concept
//! differently. Each concept gets exactly one ordered alias list here; the
//! first alias holding a non-null, non-empty value wins.

use serde_json::{Map, Value};

/// Keys under which an order carries its line items.
pub const ITEM_LIST_FIELDS: &[&str] = &["items", "goods", "positions", "lines"];

/// Keys identifying an order.
pub const ORDER_ID_FIELDS: &[&str] = &["order_id", "id"];

/// Display name of a line item, most descriptive first.
pub const ITEM_NAME_FIELDS: &[&str] = &[
    "name",
    "product_name",
    "title",
    "nomenclature",
    "product",
    "sku",
    "code",
    "article",
    "id",
];

/// Stable identifier (SKU) of a line item.
pub const ITEM_SKU_FIELDS: &[&str] = &["sku", "code", "article", "id"];

/// Product name proper (no identifier fallback).
pub const PRODUCT_NAME_FIELDS: &[&str] = &["name", "product_name", "title"];

pub const QTY_FIELDS: &[&str] = &["qty", "quantity", "count", "pcs"];

pub const PRICE_FIELDS: &[&str] = &["price", "unit_price"];

pub const TOTAL_FIELDS: &[&str] = &["total", "sum"];

pub const VAT_FIELDS: &[&str] = &["VAT", "vat"];

pub const SELFCOST_FIELDS: &[&str] = &["selfcost", "self_cost"];

/// First value among `fields` that is present and not null or blank.
pub fn first_present<'a>(obj: &'a Map<String, Value>, fields: &[&str]) -> Option<&'a Value> {
    fields
        .iter()
        .filter_map(|f| obj.get(*f))
        .find(|v| match v {
            Value::Null => false,
            Value::String(s) => !s.trim().is_empty(),
            _ => true,
        })
}

/// Render a scalar JSON value as text. Numbers keep their JSON spelling.
pub fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Interpret a scalar JSON value as a number. Numeric strings (including a
/// decimal comma) are accepted.
pub fn scalar_to_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().replace(',', ".").parse::<f64>().ok(),
        _ => None,
    }
    .filter(|v| v.is_finite())
}

/// Resolve a textual concept through its alias list.
pub fn text_field(obj: &Map<String, Value>, fields: &[&str]) -> Option<String> {
    first_present(obj, fields).and_then(scalar_to_string)
}

/// Resolve a numeric concept through its alias list.
///
/// Values that are present but not numeric resolve to `None`, like absent
/// ones.
pub fn number_field(obj: &Map<String, Value>, fields: &[&str]) -> Option<f64> {
    first_present(obj, fields).and_then(scalar_to_f64)
}

/// The line-item list of an order, if any alias holds an array.
pub fn item_list(obj: &Map<String, Value>) -> &[Value] {
    ITEM_LIST_FIELDS
        .iter()
        .find_map(|f| obj.get(*f).and_then(Value::as_array))
        .map(Vec::as_slice)
        .unwrap_or(&[])
}
