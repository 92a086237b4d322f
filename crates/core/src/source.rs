//! Where sales data comes from.
//!
//! [`SalesSource`] is the seam between reports and storage. The Postgres
//! implementation lives in `salesbot-db`; this module provides the JSON
//! file source and an in-memory source.

use std::path::PathBuf;
use std::str::FromStr;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::CoreError;
use crate::normalize::{normalize_item_sales, normalize_orders};
use crate::report::LoadRequest;
use crate::sales::{DataNeeds, ItemSale, Order, SalesData};
use crate::types::SaleDate;

#[async_trait]
pub trait SalesSource: Send + Sync {
    /// Canonical orders dated on or after `since`.
    async fn load_orders(&self, since: Option<SaleDate>) -> Result<Vec<Order>, CoreError>;

    /// Item-level view dated on or after `since`.
    async fn load_item_sales(&self, since: Option<SaleDate>) -> Result<Vec<ItemSale>, CoreError>;

    /// Load whatever a report asked for.
    async fn load(&self, request: &LoadRequest) -> Result<SalesData, CoreError> {
        Ok(match request.needs {
            DataNeeds::Orders => SalesData::from_orders(self.load_orders(request.since).await?),
            DataNeeds::Items => SalesData::from_items(self.load_item_sales(request.since).await?),
        })
    }
}

// ---------------------------------------------------------------------------
// Backend selector
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Json,
    Postgres,
    Fake,
}

impl FromStr for Backend {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "postgres" | "postgresql" | "pg" => Ok(Self::Postgres),
            "fake" => Ok(Self::Fake),
            other => Err(CoreError::Config(format!(
                "unknown data backend '{other}' (expected json, postgres or fake)"
            ))),
        }
    }
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Json => "json",
            Self::Postgres => "postgres",
            Self::Fake => "fake",
        })
    }
}

// ---------------------------------------------------------------------------
// JSON file
// ---------------------------------------------------------------------------

/// Reads a JSON sales export on every load.
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    async fn read_document(&self) -> Result<Value, CoreError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(CoreError::not_found(
                    "sales file",
                    self.path.display().to_string(),
                ));
            }
            Err(e) => return Err(e.into()),
        };
        serde_json::from_slice(&bytes).map_err(|e| {
            CoreError::Parse(format!("{}: invalid JSON: {e}", self.path.display()))
        })
    }
}

#[async_trait]
impl SalesSource for JsonFileSource {
    async fn load_orders(&self, since: Option<SaleDate>) -> Result<Vec<Order>, CoreError> {
        let doc = self.read_document().await?;
        let orders = normalize_orders(&doc, since)?;
        tracing::debug!(path = %self.path.display(), count = orders.len(), "Loaded orders from JSON");
        Ok(orders)
    }

    async fn load_item_sales(&self, since: Option<SaleDate>) -> Result<Vec<ItemSale>, CoreError> {
        let doc = self.read_document().await?;
        normalize_item_sales(&doc, since)
    }
}

// ---------------------------------------------------------------------------
// In memory
// ---------------------------------------------------------------------------

/// Serves a fixed data set.
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    data: SalesData,
}

impl StaticSource {
    pub fn new(data: SalesData) -> Self {
        Self { data }
    }
}

#[async_trait]
impl SalesSource for StaticSource {
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
    use assert_matches::assert_matches;
    use std::io::Write;

    use super::*;

    #[test]
    fn backend_parsing() {
        assert_eq!("JSON".parse::<Backend>().unwrap(), Backend::Json);
        assert_eq!("postgresql".parse::<Backend>().unwrap(), Backend::Postgres);
        assert_matches!("sqlite".parse::<Backend>(), Err(CoreError::Config(_)));
    }

    #[tokio::test]
    async fn missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let source = JsonFileSource::new(dir.path().join("absent.json"));
        assert_matches!(
            source.load_orders(None).await,
            Err(CoreError::NotFound { entity: "sales file", .. })
        );
    }

    #[tokio::test]
    async fn json_file_serves_both_views() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"id": "A1", "client": "Acme", "date": "2024-01-10", "total_sum": 100,
                 "items": [{{"name": "Widget", "pcs": 2, "price": 50}}]}}]"#
        )
        .unwrap();

        let source = JsonFileSource::new(file.path());
        let data = source.load(&LoadRequest::items()).await.unwrap();
        assert!(data.orders.is_empty());
        assert_eq!(data.items.len(), 1);
        assert_eq!(data.items[0].line_total, 100.0);

        let data = source.load(&LoadRequest::orders()).await.unwrap();
        assert_eq!(data.orders.len(), 1);
    }

    #[tokio::test]
    async fn invalid_json_is_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        let source = JsonFileSource::new(file.path());
        assert_matches!(source.load_orders(None).await, Err(CoreError::Parse(_)));
    }
}
