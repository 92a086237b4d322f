//! The contract every report type implements.

use chrono::NaiveDate;

use crate::error::CoreError;
use crate::params::{normalize_params, ParamSpec, RawParams, ReportParams};
use crate::sales::{DataNeeds, SalesData};
use crate::table::{Sheet, TabularResult};
use crate::types::LocalTime;

/// What must be loaded before a report can compute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadRequest {
    pub needs: DataNeeds,
    /// Inclusive lower bound on sale dates.
    pub since: Option<NaiveDate>,
}

impl LoadRequest {
    pub fn orders() -> Self {
        Self {
            needs: DataNeeds::Orders,
            since: None,
        }
    }

    pub fn items() -> Self {
        Self {
            needs: DataNeeds::Items,
            since: None,
        }
    }

    pub fn since(mut self, since: Option<NaiveDate>) -> Self {
        self.since = since;
        self
    }
}

/// A report type: a pure function from sales data and normalized
/// parameters to one or more tables.
///
/// Implementations hold no state between invocations.
pub trait ReportType: Send + Sync {
    /// Short stable identifier used in menus and callback payloads.
    fn slug(&self) -> &'static str;

    fn title(&self) -> &'static str;

    /// Column name to display label.
    fn labels(&self) -> &'static [(&'static str, &'static str)];

    /// Declared parameters. Keys not listed here are rejected.
    fn params(&self) -> &'static [ParamSpec];

    /// Markdown description of the method and its parameters.
    fn explanation(&self) -> &'static str;

    fn load_request(&self, _params: &ReportParams, _now: LocalTime) -> LoadRequest {
        LoadRequest::orders()
    }

    fn compute(
        &self,
        data: &SalesData,
        params: &ReportParams,
        now: LocalTime,
    ) -> Result<TabularResult, CoreError>;

    /// Tables written to the exported document.
    fn compute_sheets(
        &self,
        data: &SalesData,
        params: &ReportParams,
        now: LocalTime,
    ) -> Result<Vec<Sheet>, CoreError> {
        Ok(vec![Sheet::new("Report", self.compute(data, params, now)?)])
    }

    fn normalize_params(&self, raw: &RawParams, today: NaiveDate) -> Result<ReportParams, CoreError> {
        normalize_params(self.slug(), self.params(), raw, today)
    }

    /// Display label for a column, falling back to the column name.
    fn label_for<'a>(&self, column: &'a str) -> &'a str {
        self.labels()
            .iter()
            .find(|(c, _)| *c == column)
            .map_or(column, |(_, label)| *label)
    }
}
