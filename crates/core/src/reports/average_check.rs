//! Average order value grouped by a configurable dimension.

use std::collections::{BTreeMap, HashSet};

use crate::error::CoreError;
use crate::params::{ParamKind, ParamSpec, Preset, ReportParams};
use crate::report::{LoadRequest, ReportType};
use crate::sales::{Order, SalesData};
use crate::table::{Cell, TabularResult};
use crate::types::{round2, LocalTime};
use crate::window::{DateWindow, Fallback};

use super::{month_key, PERIOD_PRESETS};

pub const DIMENSIONS: &[&str] = &[
    "overall",
    "client",
    "month",
    "client_month",
    "price_type",
    "price_type_month",
];

const DIM_PRESETS: &[Preset] = &[
    Preset::Text("overall"),
    Preset::Text("client"),
    Preset::Text("month"),
    Preset::Text("client_month"),
];

const PARAMS: &[ParamSpec] = &[
    ParamSpec::optional("dim", ParamKind::Choice(DIMENSIONS)).with_presets(DIM_PRESETS),
    ParamSpec::optional("period_days", ParamKind::Integer).with_presets(PERIOD_PRESETS),
    ParamSpec::optional("date_from", ParamKind::IsoDate),
    ParamSpec::optional("date_to", ParamKind::IsoDate),
];

const LABELS: &[(&str, &str)] = &[
    ("dimension", "Dimension"),
    ("client", "Client"),
    ("month", "Month"),
    ("price_type", "Price type"),
    ("avg_check", "Average check"),
    ("orders", "Orders"),
    ("revenue", "Revenue"),
    ("note", "Note"),
];

const EXPLANATION: &str = "\
## Average check

Mean order value: revenue divided by the number of distinct orders.

### Parameters
- `dim`: grouping, one of `overall`, `client`, `month`, `client_month`, `price_type`, `price_type_month`. An unknown value falls back to `overall` with a note.
- `period_days`: only orders of the last N days.
- `date_from` / `date_to`: explicit inclusive range, takes precedence over `period_days`.

Without a period all history is used.";

#[derive(Default)]
struct Group<'a> {
    revenue: f64,
    orders: HashSet<&'a str>,
}

impl<'a> Group<'a> {
    fn add(&mut self, order: &'a Order) {
        self.revenue += order.total_sum;
        self.orders.insert(order.order_id.as_str());
    }

    /// `[avg_check, orders, revenue]`.
    fn metrics(&self) -> [Cell; 3] {
        let count = self.orders.len();
        let avg = if count > 0 {
            self.revenue / count as f64
        } else {
            0.0
        };
        [
            Cell::Number(round2(avg)),
            Cell::from(count),
            Cell::Number(round2(self.revenue)),
        ]
    }

    fn avg(&self) -> f64 {
        if self.orders.is_empty() {
            0.0
        } else {
            self.revenue / self.orders.len() as f64
        }
    }
}

fn group_by<'a, K: Ord>(
    orders: &[&'a Order],
    key: impl Fn(&Order) -> K,
) -> BTreeMap<K, Group<'a>> {
    let mut groups: BTreeMap<K, Group<'a>> = BTreeMap::new();
    for &order in orders {
        groups.entry(key(order)).or_default().add(order);
    }
    groups
}

/// Single-key groups ordered by average check descending.
fn by_avg_desc(groups: BTreeMap<String, Group<'_>>) -> Vec<(String, Group<'_>)> {
    let mut rows: Vec<_> = groups.into_iter().collect();
    rows.sort_by(|a, b| b.1.avg().total_cmp(&a.1.avg()).then_with(|| a.0.cmp(&b.0)));
    rows
}

pub struct AverageCheck;

impl ReportType for AverageCheck {
    fn slug(&self) -> &'static str {
        "average_check"
    }

    fn title(&self) -> &'static str {
        "Average check"
    }

    fn labels(&self) -> &'static [(&'static str, &'static str)] {
        LABELS
    }

    fn params(&self) -> &'static [ParamSpec] {
        PARAMS
    }

    fn explanation(&self) -> &'static str {
        EXPLANATION
    }

    fn load_request(&self, params: &ReportParams, now: LocalTime) -> LoadRequest {
        let window = DateWindow::resolve(params, now, Fallback::Unbounded);
        LoadRequest::orders().since(window.first_date())
    }

    fn compute(
        &self,
        data: &SalesData,
        params: &ReportParams,
        now: LocalTime,
    ) -> Result<TabularResult, CoreError> {
        let window = DateWindow::resolve(params, now, Fallback::Unbounded);
        let orders: Vec<&Order> = data.orders.iter().filter(|o| window.contains(o.date)).collect();
        let dim = params.text("dim").unwrap_or("overall");

        let metric_cols = ["avg_check", "orders", "revenue"];
        let with = |lead: &[&str]| {
            let cols: Vec<&str> = lead.iter().chain(metric_cols.iter()).copied().collect();
            TabularResult::new(&cols)
        };

        let table = match dim {
            "client" | "price_type" => {
                let by_price_type = dim == "price_type";
                let mut table = with(&[dim]);
                let groups = group_by(&orders, |o| {
                    if by_price_type {
                        o.price_type.clone()
                    } else {
                        o.client.clone()
                    }
                });
                for (key, group) in by_avg_desc(groups) {
                    let [avg, count, revenue] = group.metrics();
                    table.push_row(vec![key.into(), avg, count, revenue]);
                }
                table
            }
            "month" => {
                let mut table = with(&["month"]);
                for (month, group) in group_by(&orders, |o| month_key(o.date)) {
                    let [avg, count, revenue] = group.metrics();
                    table.push_row(vec![month.into(), avg, count, revenue]);
                }
                table
            }
            "client_month" | "price_type_month" => {
                let lead = if dim == "client_month" { "client" } else { "price_type" };
                let mut table = with(&[lead, "month"]);
                let groups = group_by(&orders, |o| {
                    let first = if lead == "client" { &o.client } else { &o.price_type };
                    (first.clone(), month_key(o.date))
                });
                for ((first, month), group) in groups {
                    let [avg, count, revenue] = group.metrics();
                    table.push_row(vec![first.into(), month.into(), avg, count, revenue]);
                }
                table
            }
            other => {
                let known = other == "overall";
                let mut table = if known {
                    with(&["dimension"])
                } else {
                    tracing::warn!(dim = other, "Unknown dimension, using overall");
                    TabularResult::new(&["dimension", "avg_check", "orders", "revenue", "note"])
                };
                if !orders.is_empty() {
                    let mut group = Group::default();
                    for &o in &orders {
                        group.add(o);
                    }
                    let [avg, count, revenue] = group.metrics();
                    let mut row = vec!["overall".into(), avg, count, revenue];
                    if !known {
                        row.push(format!("Unknown dim='{other}', used overall").into());
                    }
                    table.push_row(row);
                }
                table
            }
        };
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::ParamValue;
    use crate::reports::fixtures::{at, order};

    fn data() -> SalesData {
        let mut orders = vec![
            order("1", "Acme", "2024-01-10", 100.0),
            order("2", "Acme", "2024-02-03", 50.0),
            order("3", "Bolt", "2024-01-20", 300.0),
            order("4", "Cobalt", "2024-02-11", 10.0),
        ];
        orders[0].price_type = "retail".into();
        orders[2].price_type = "wholesale".into();
        SalesData::from_orders(orders)
    }

    fn run(dim: &str) -> TabularResult {
        let params = ReportParams::new().with("dim", ParamValue::Text(dim.into()));
        AverageCheck.compute(&data(), &params, at("2024-03-01")).unwrap()
    }

    #[test]
    fn overall_is_single_row() {
        let t = run("overall");
        assert_eq!(t.len(), 1);
        assert_eq!(t.get(0, "dimension"), Some(&Cell::Text("overall".into())));
        assert_eq!(t.get(0, "avg_check"), Some(&Cell::Number(115.0)));
        assert_eq!(t.get(0, "orders"), Some(&Cell::Int(4)));
        assert_eq!(t.get(0, "revenue"), Some(&Cell::Number(460.0)));
    }

    #[test]
    fn bogus_dim_falls_back_with_note() {
        let t = run("bogus");
        assert_eq!(t.len(), 1);
        assert_eq!(t.get(0, "dimension"), Some(&Cell::Text("overall".into())));
        let note = t.get(0, "note").and_then(Cell::as_text).unwrap();
        assert!(!note.is_empty());
        assert!(note.contains("bogus"));
    }

    #[test]
    fn missing_dim_means_overall() {
        let t = AverageCheck
            .compute(&data(), &ReportParams::new(), at("2024-03-01"))
            .unwrap();
        assert_eq!(t.columns, vec!["dimension", "avg_check", "orders", "revenue"]);
    }

    #[test]
    fn client_rows_sorted_by_average_desc() {
        let t = run("client");
        let clients: Vec<_> = t
            .column_values("client")
            .unwrap()
            .filter_map(Cell::as_text)
            .collect();
        assert_eq!(clients, vec!["Bolt", "Acme", "Cobalt"]);
        assert_eq!(t.get(1, "avg_check"), Some(&Cell::Number(75.0)));
    }

    #[test]
    fn months_ascending_and_client_month_nested() {
        let t = run("month");
        let months: Vec<_> = t.column_values("month").unwrap().filter_map(Cell::as_text).collect();
        assert_eq!(months, vec!["2024-01", "2024-02"]);

        let t = run("client_month");
        assert_eq!(t.len(), 4);
        assert_eq!(t.get(0, "client"), Some(&Cell::Text("Acme".into())));
        assert_eq!(t.get(0, "month"), Some(&Cell::Text("2024-01".into())));
        assert_eq!(t.get(1, "month"), Some(&Cell::Text("2024-02".into())));
    }

    #[test]
    fn price_type_groups_blank_category() {
        let t = run("price_type");
        assert_eq!(t.len(), 3);
        assert_eq!(t.get(0, "price_type"), Some(&Cell::Text("wholesale".into())));
    }

    #[test]
    fn revenue_equals_average_times_orders() {
        for dim in DIMENSIONS {
            let t = run(dim);
            for row in 0..t.len() {
                let avg = t.get(row, "avg_check").and_then(Cell::as_f64).unwrap();
                let orders = t.get(row, "orders").and_then(Cell::as_f64).unwrap();
                let revenue = t.get(row, "revenue").and_then(Cell::as_f64).unwrap();
                assert!((avg * orders - revenue).abs() < 0.01 * orders.max(1.0), "{dim}");
            }
        }
    }

    #[test]
    fn period_days_limits_orders() {
        let params = ReportParams::new().with("period_days", ParamValue::Int(30));
        let t = AverageCheck.compute(&data(), &params, at("2024-03-01")).unwrap();
        assert_eq!(t.get(0, "orders"), Some(&Cell::Int(2)));
        assert_eq!(t.get(0, "revenue"), Some(&Cell::Number(60.0)));
    }

    #[test]
    fn empty_window_gives_empty_table() {
        let params = ReportParams::new()
            .with("date_from", ParamValue::Date(crate::reports::fixtures::date("2023-01-01")))
            .with("date_to", ParamValue::Date(crate::reports::fixtures::date("2023-01-31")));
        let t = AverageCheck.compute(&data(), &params, at("2024-03-01")).unwrap();
        assert!(t.is_empty());
    }
}
