//! Purchase cadence per client: gaps between orders and orders per month.

use std::collections::{BTreeMap, HashSet};

use crate::error::CoreError;
use crate::params::{ParamKind, ParamSpec, Preset, ReportParams};
use crate::report::{LoadRequest, ReportType};
use crate::sales::SalesData;
use crate::table::{Cell, TabularResult};
use crate::types::{round2, round_to, LocalTime, SaleDate};
use crate::window::{DateWindow, Fallback};

use super::PERIOD_PRESETS;

/// Average Gregorian month length in days.
pub const DAYS_PER_MONTH: f64 = 30.4375;

const MIN_ORDER_PRESETS: &[Preset] = &[Preset::Int(1), Preset::Int(2), Preset::Int(3), Preset::Int(5)];

const PARAMS: &[ParamSpec] = &[
    ParamSpec::optional("min_orders", ParamKind::Integer)
        .with_default(Preset::Int(1))
        .with_presets(MIN_ORDER_PRESETS),
    ParamSpec::optional("period_days", ParamKind::Integer).with_presets(PERIOD_PRESETS),
    ParamSpec::optional("date_from", ParamKind::IsoDate),
    ParamSpec::optional("date_to", ParamKind::IsoDate),
];

const LABELS: &[(&str, &str)] = &[
    ("client", "Client"),
    ("orders_count", "Orders"),
    ("first_purchase", "First purchase"),
    ("last_purchase", "Last purchase"),
    ("avg_days_between", "Avg days between"),
    ("median_days_between", "Median days between"),
    ("lifespan_days", "Active days"),
    ("months_active", "Active months"),
    ("orders_per_month", "Orders per month"),
    ("total_revenue", "Revenue"),
];

const EXPLANATION: &str = "\
## Purchase frequency

For each client: days between consecutive orders (mean and median), active span from first to last order (at least one day) and orders per month over that span.

### Parameters
- `min_orders`: keep clients with at least this many orders (default 1).
- `period_days`: only orders of the last N days.
- `date_from` / `date_to`: explicit inclusive range.

Sorted by orders per month, most frequent first.";

struct Stats {
    client: String,
    orders: usize,
    first: SaleDate,
    last: SaleDate,
    mean_gap: Option<f64>,
    median_gap: Option<f64>,
    lifespan_days: i64,
    months_active: f64,
    per_month: f64,
    revenue: f64,
}

fn median(sorted: &[f64]) -> Option<f64> {
    let n = sorted.len();
    match n {
        0 => None,
        _ if n % 2 == 1 => Some(sorted[n / 2]),
        _ => Some((sorted[n / 2 - 1] + sorted[n / 2]) / 2.0),
    }
}

fn client_stats(client: String, mut orders: Vec<(SaleDate, f64)>) -> Option<Stats> {
    orders.sort_by_key(|(d, _)| *d);
    let first = orders.first()?.0;
    let last = orders.last()?.0;

    let mut gaps: Vec<f64> = orders
        .windows(2)
        .map(|w| (w[1].0 - w[0].0).num_days() as f64)
        .collect();
    let mean_gap = (!gaps.is_empty()).then(|| gaps.iter().sum::<f64>() / gaps.len() as f64);
    gaps.sort_by(f64::total_cmp);

    let lifespan_days = (last - first).num_days().max(0) + 1;
    let months_active = lifespan_days as f64 / DAYS_PER_MONTH;

    Some(Stats {
        orders: orders.len(),
        first,
        last,
        mean_gap,
        median_gap: median(&gaps),
        lifespan_days,
        months_active,
        per_month: orders.len() as f64 / months_active,
        revenue: orders.iter().map(|(_, t)| t).sum(),
        client,
    })
}

pub struct PurchaseFrequency;

impl ReportType for PurchaseFrequency {
    fn slug(&self) -> &'static str {
        "purchase_frequency"
    }

    fn title(&self) -> &'static str {
        "Purchase frequency"
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
        let min_orders = params.int("min_orders").unwrap_or(1).max(0) as usize;

        let mut seen: HashSet<&str> = HashSet::new();
        let mut by_client: BTreeMap<&str, Vec<(SaleDate, f64)>> = BTreeMap::new();
        for order in data.orders.iter().filter(|o| window.contains(o.date)) {
            if seen.insert(order.order_id.as_str()) {
                by_client
                    .entry(order.client.as_str())
                    .or_default()
                    .push((order.date, order.total_sum));
            }
        }

        let mut stats: Vec<Stats> = by_client
            .into_iter()
            .filter_map(|(client, orders)| client_stats(client.to_string(), orders))
            .filter(|s| s.orders >= min_orders)
            .collect();
        stats.sort_by(|a, b| {
            b.per_month
                .total_cmp(&a.per_month)
                .then_with(|| b.orders.cmp(&a.orders))
                .then_with(|| a.client.cmp(&b.client))
        });

        let mut table = TabularResult::new(&[
            "client",
            "orders_count",
            "first_purchase",
            "last_purchase",
            "avg_days_between",
            "median_days_between",
            "lifespan_days",
            "months_active",
            "orders_per_month",
            "total_revenue",
        ]);
        for s in stats {
            table.push_row(vec![
                s.client.into(),
                s.orders.into(),
                s.first.into(),
                s.last.into(),
                s.mean_gap.map(|g| round_to(g, 1)).into(),
                s.median_gap.map(|g| round_to(g, 1)).into(),
                s.lifespan_days.into(),
                Cell::Number(round2(s.months_active)),
                Cell::Number(round_to(s.per_month, 3)),
                Cell::Number(round2(s.revenue)),
            ]);
        }
        Ok(table)
    }
}
