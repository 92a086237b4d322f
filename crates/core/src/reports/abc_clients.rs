//! ABC (Pareto) classification of clients by revenue.

use std::collections::{HashMap, HashSet};

use crate::error::CoreError;
use crate::params::{ParamKind, ParamSpec, ReportParams};
use crate::report::{LoadRequest, ReportType};
use crate::sales::SalesData;
use crate::table::{Cell, TabularResult};
use crate::types::{round2, LocalTime};
use crate::window::{DateWindow, Fallback};

use super::pareto::rank;
use super::PERIOD_PRESETS;

pub(crate) const ABC_FALLBACK: Fallback = Fallback::LastDays(30);

pub(crate) const ABC_PARAMS: &[ParamSpec] = &[
    ParamSpec::optional("period_days", ParamKind::Integer).with_presets(PERIOD_PRESETS),
    ParamSpec::optional("date_from", ParamKind::IsoDate),
    ParamSpec::optional("date_to", ParamKind::IsoDate),
];

const LABELS: &[(&str, &str)] = &[
    ("client", "Client"),
    ("total_revenue", "Revenue"),
    ("orders_count", "Orders"),
    ("avg_order_value", "Average order"),
    ("revenue_share", "Share, %"),
    ("cumulative_share", "Cumulative share, %"),
    ("abc_category", "Category"),
];

const EXPLANATION: &str = "\
## ABC analysis: clients

Clients are ranked by revenue. Each gets a revenue share and the cumulative share of everyone ranked above it (inclusive):

- **A**: cumulative share up to 80%
- **B**: up to 95%
- **C**: the rest

### Parameters
- `period_days`: last N days (default 30).
- `date_from` / `date_to`: explicit inclusive range.";

pub struct AbcClients;

impl ReportType for AbcClients {
    fn slug(&self) -> &'static str {
        "abc_clients"
    }

    fn title(&self) -> &'static str {
        "ABC analysis: clients"
    }

    fn labels(&self) -> &'static [(&'static str, &'static str)] {
        LABELS
    }

    fn params(&self) -> &'static [ParamSpec] {
        ABC_PARAMS
    }

    fn explanation(&self) -> &'static str {
        EXPLANATION
    }

    fn load_request(&self, params: &ReportParams, now: LocalTime) -> LoadRequest {
        let window = DateWindow::resolve(params, now, ABC_FALLBACK);
        LoadRequest::orders().since(window.first_date())
    }

    fn compute(
        &self,
        data: &SalesData,
        params: &ReportParams,
        now: LocalTime,
    ) -> Result<TabularResult, CoreError> {
        let window = DateWindow::resolve(params, now, ABC_FALLBACK);

        let mut per_client: HashMap<&str, (f64, HashSet<&str>)> = HashMap::new();
        for order in data.orders.iter().filter(|o| window.contains(o.date)) {
            let entry = per_client.entry(order.client.as_str()).or_default();
            entry.0 += order.total_sum;
            entry.1.insert(order.order_id.as_str());
        }

        let ranked = rank(
            per_client
                .into_iter()
                .map(|(client, (revenue, orders))| (client.to_string(), revenue, orders.len()))
                .collect(),
        );

        let mut table = TabularResult::new(&[
            "client",
            "total_revenue",
            "orders_count",
            "avg_order_value",
            "revenue_share",
            "cumulative_share",
            "abc_category",
        ]);
        for r in ranked {
            let avg = if r.orders > 0 {
                r.revenue / r.orders as f64
            } else {
                0.0
            };
            table.push_row(vec![
                r.key.into(),
                Cell::Number(round2(r.revenue)),
                r.orders.into(),
                Cell::Number(round2(avg)),
                Cell::Number(r.share),
                Cell::Number(r.cumulative),
                r.category.into(),
            ]);
        }
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::ParamValue;
    use crate::reports::fixtures::{at, order};

    fn sample() -> SalesData {
        SalesData::from_orders(vec![
            order("1", "Acme", "2024-02-20", 500.0),
            order("2", "Acme", "2024-02-21", 300.0),
            order("3", "Bolt", "2024-02-22", 120.0),
            order("4", "Cobalt", "2024-02-23", 50.0),
            order("5", "Dyn", "2024-02-24", 30.0),
            order("6", "Old", "2023-01-01", 10_000.0),
        ])
    }

    #[test]
    fn default_window_is_last_thirty_days() {
        let t = AbcClients.compute(&sample(), &ReportParams::new(), at("2024-03-01")).unwrap();
        assert_eq!(t.len(), 4);
        assert_eq!(t.get(0, "client"), Some(&Cell::Text("Acme".into())));
        assert_eq!(t.get(0, "orders_count"), Some(&Cell::Int(2)));
        assert_eq!(t.get(0, "avg_order_value"), Some(&Cell::Number(400.0)));
        assert_eq!(t.get(0, "revenue_share"), Some(&Cell::Number(80.0)));
        assert_eq!(t.get(0, "abc_category"), Some(&Cell::Text("A".into())));
        assert_eq!(t.get(1, "abc_category"), Some(&Cell::Text("B".into())));
        assert_eq!(t.get(3, "abc_category"), Some(&Cell::Text("C".into())));
    }

    #[test]
    fn shares_sum_to_hundred_and_categories_are_monotonic() {
        let params = ReportParams::new().with("period_days", ParamValue::Int(1000));
        let t = AbcClients.compute(&sample(), &params, at("2024-03-01")).unwrap();

        let total: f64 = t.column_values("revenue_share").unwrap().filter_map(Cell::as_f64).sum();
        assert!((total - 100.0).abs() <= 0.1, "{total}");

        let cumulative: Vec<f64> =
            t.column_values("cumulative_share").unwrap().filter_map(Cell::as_f64).collect();
        let classes: Vec<&str> =
            t.column_values("abc_category").unwrap().filter_map(Cell::as_text).collect();
        assert!(cumulative.windows(2).all(|w| w[0] <= w[1]));
        assert!(classes.windows(2).all(|w| w[0] <= w[1]));
        for (cum, class) in cumulative.iter().zip(&classes) {
            if *cum <= 80.0 {
                assert_eq!(*class, "A");
            }
        }
    }

    #[test]
    fn no_orders_gives_empty_table() {
        let t = AbcClients
            .compute(&SalesData::default(), &ReportParams::new(), at("2024-03-01"))
            .unwrap();
        assert!(t.is_empty());
        assert_eq!(t.columns.len(), 7);
    }
}
