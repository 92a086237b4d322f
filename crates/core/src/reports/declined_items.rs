//! Items that stopped selling: a recent window compared with the baseline
//! window right before it.
//!
//! Two views are produced:
//!
//! - **by client**: an item the client bought during the baseline but not
//!   recently, while the client kept ordering other things;
//! - **overall**: items whose per-day order frequency across all clients
//!   dropped between the windows.

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::error::CoreError;
use crate::params::{ParamKind, ParamSpec, Preset, ReportParams};
use crate::report::{LoadRequest, ReportType};
use crate::sales::SalesData;
use crate::table::{Cell, Sheet, TabularResult};
use crate::types::{days_before, round2, round_to, start_of, LocalTime, SaleDate};

const RECENT_PRESETS: &[Preset] = &[Preset::Int(14), Preset::Int(30), Preset::Int(60)];
const BASELINE_PRESETS: &[Preset] = &[Preset::Int(60), Preset::Int(90), Preset::Int(180)];
const BY_CLIENT_PRESETS: &[Preset] = &[Preset::Flag(true), Preset::Flag(false)];
const DROP_PRESETS: &[Preset] = &[Preset::Int(30), Preset::Int(50), Preset::Int(80)];

const PARAMS: &[ParamSpec] = &[
    ParamSpec::optional("recent_days", ParamKind::Integer)
        .with_default(Preset::Int(30))
        .with_presets(RECENT_PRESETS),
    ParamSpec::optional("baseline_days", ParamKind::Integer)
        .with_default(Preset::Int(90))
        .with_presets(BASELINE_PRESETS),
    ParamSpec::optional("by_client", ParamKind::Flag)
        .with_default(Preset::Flag(true))
        .with_presets(BY_CLIENT_PRESETS),
    ParamSpec::optional("min_item_orders_base", ParamKind::Integer).with_default(Preset::Int(1)),
    ParamSpec::optional("min_client_orders_recent", ParamKind::Integer).with_default(Preset::Int(1)),
    ParamSpec::optional("min_drop_pct", ParamKind::Number)
        .with_default(Preset::Int(30))
        .with_presets(DROP_PRESETS),
];

const LABELS: &[(&str, &str)] = &[
    ("client", "Client"),
    ("item", "Item"),
    ("orders_base", "Orders (baseline)"),
    ("orders_recent", "Orders (recent)"),
    ("revenue_base", "Revenue (baseline)"),
    ("revenue_recent", "Revenue (recent)"),
    ("client_orders_base", "Client orders (baseline)"),
    ("client_orders_recent", "Client orders (recent)"),
    ("last_purchase", "Last purchase"),
    ("days_since_last", "Days since last purchase"),
    ("freq_base", "Orders/day (baseline)"),
    ("freq_recent", "Orders/day (recent)"),
    ("change_pct", "Change, %"),
    ("base_period", "Baseline period"),
    ("recent_period", "Recent period"),
];

const EXPLANATION: &str = "\
## Declined items

Compares the last `recent_days` days with the `baseline_days` days before them. The last purchase date is taken over the whole sales history.

**By client**: the client bought the item at least `min_item_orders_base` times in the baseline, not at all recently, and still placed at least `min_client_orders_recent` orders recently.

**Overall**: orders per day of each item bought at least `min_item_orders_base` times in the baseline. Only declined items are listed: no recent orders, or a frequency that fell by at least `min_drop_pct` percent.

### Parameters
- `recent_days` (default 30), `baseline_days` (default 90)
- `by_client`: which view the result shows first (default yes)
- `min_item_orders_base`, `min_client_orders_recent` (default 1)
- `min_drop_pct` (default 30)";

struct Windows {
    base_start: LocalTime,
    recent_start: LocalTime,
    now: LocalTime,
}

impl Windows {
    fn new(params: &ReportParams, now: LocalTime) -> Self {
        let recent_days = params.int("recent_days").unwrap_or(30).max(1);
        let base_days = params.int("baseline_days").unwrap_or(90).max(1);
        let recent_start = days_before(now, recent_days);
        Self {
            base_start: days_before(recent_start, base_days),
            recent_start,
            now,
        }
    }

    fn in_base(&self, date: SaleDate) -> bool {
        let at = start_of(date);
        at >= self.base_start && at < self.recent_start
    }

    fn in_recent(&self, date: SaleDate) -> bool {
        let at = start_of(date);
        at >= self.recent_start && at <= self.now
    }

    fn base_days(&self) -> i64 {
        (self.recent_start - self.base_start).num_days().max(1)
    }

    fn recent_days(&self) -> i64 {
        (self.now - self.recent_start).num_days().max(1)
    }

    fn days_since(&self, date: SaleDate) -> i64 {
        (self.now - start_of(date)).num_days()
    }

    /// Baseline end is shown inclusive: the day before the recent window.
    fn base_period(&self) -> String {
        format!(
            "{}..{}",
            self.base_start.date(),
            days_before(self.recent_start, 1).date()
        )
    }

    fn recent_period(&self) -> String {
        format!("{}..{}", self.recent_start.date(), self.now.date())
    }
}

#[derive(Default)]
struct Tally<'a> {
    base_orders: HashSet<&'a str>,
    recent_orders: HashSet<&'a str>,
    base_revenue: f64,
    recent_revenue: f64,
    last_purchase: Option<SaleDate>,
}

impl<'a> Tally<'a> {
    fn record(&mut self, w: &Windows, order_id: &'a str, date: SaleDate, total: f64) {
        self.last_purchase = self.last_purchase.max(Some(date));
        if w.in_base(date) {
            self.base_orders.insert(order_id);
            self.base_revenue += total;
        } else if w.in_recent(date) {
            self.recent_orders.insert(order_id);
            self.recent_revenue += total;
        }
    }
}

struct Thresholds {
    min_item_orders_base: usize,
    min_client_orders_recent: usize,
    min_drop_pct: f64,
}

impl Thresholds {
    fn new(params: &ReportParams) -> Self {
        Self {
            min_item_orders_base: params.int("min_item_orders_base").unwrap_or(1).max(0) as usize,
            min_client_orders_recent: params.int("min_client_orders_recent").unwrap_or(1).max(0)
                as usize,
            min_drop_pct: params.number("min_drop_pct").unwrap_or(30.0),
        }
    }

    fn bought_in_base(&self, tally: &Tally<'_>) -> bool {
        !tally.base_orders.is_empty() && tally.base_orders.len() >= self.min_item_orders_base
    }
}

#[derive(Default)]
struct ClientActivity<'a> {
    base: HashSet<&'a str>,
    recent: HashSet<&'a str>,
}

fn by_client_table(data: &SalesData, w: &Windows, th: &Thresholds) -> TabularResult {
    let mut pairs: BTreeMap<(&str, &str), Tally<'_>> = BTreeMap::new();
    let mut clients: HashMap<&str, ClientActivity<'_>> = HashMap::new();

    for line in &data.items {
        let order_id = line.order_id.as_str();
        pairs
            .entry((line.client.as_str(), line.item.as_str()))
            .or_default()
            .record(w, order_id, line.date, line.line_total);
        let activity = clients.entry(line.client.as_str()).or_default();
        if w.in_base(line.date) {
            activity.base.insert(order_id);
        } else if w.in_recent(line.date) {
            activity.recent.insert(order_id);
        }
    }

    let mut rows: Vec<(&str, &str, Tally<'_>, &ClientActivity<'_>)> = pairs
        .into_iter()
        .filter_map(|((client, item), tally)| {
            let activity = clients.get(client)?;
            let declined = th.bought_in_base(&tally)
                && tally.recent_orders.is_empty()
                && activity.recent.len() >= th.min_client_orders_recent;
            declined.then_some((client, item, tally, activity))
        })
        .collect();
    rows.sort_by(|a, b| {
        a.0.cmp(b.0)
            .then_with(|| b.2.base_orders.len().cmp(&a.2.base_orders.len()))
            .then_with(|| b.2.base_revenue.total_cmp(&a.2.base_revenue))
            .then_with(|| a.1.cmp(b.1))
    });

    let mut table = TabularResult::new(&[
        "client",
        "item",
        "orders_base",
        "revenue_base",
        "client_orders_base",
        "client_orders_recent",
        "last_purchase",
        "days_since_last",
        "base_period",
        "recent_period",
    ]);
    let (base_period, recent_period) = (w.base_period(), w.recent_period());
    for (client, item, tally, activity) in rows {
        table.push_row(vec![
            client.into(),
            item.into(),
            tally.base_orders.len().into(),
            Cell::Number(round2(tally.base_revenue)),
            activity.base.len().into(),
            activity.recent.len().into(),
            tally.last_purchase.into(),
            tally.last_purchase.map(|d| w.days_since(d)).into(),
            base_period.as_str().into(),
            recent_period.as_str().into(),
        ]);
    }
    table
}

struct OverallRow<'a> {
    item: &'a str,
    tally: Tally<'a>,
    freq_base: f64,
    freq_recent: f64,
    change_pct: Option<f64>,
}

fn overall_table(data: &SalesData, w: &Windows, th: &Thresholds) -> TabularResult {
    let mut items: BTreeMap<&str, Tally<'_>> = BTreeMap::new();
    for line in &data.items {
        items
            .entry(line.item.as_str())
            .or_default()
            .record(w, line.order_id.as_str(), line.date, line.line_total);
    }

    let (base_days, recent_days) = (w.base_days() as f64, w.recent_days() as f64);
    let mut rows: Vec<OverallRow<'_>> = items
        .into_iter()
        .filter(|(_, tally)| th.bought_in_base(tally))
        .filter_map(|(item, tally)| {
            let freq_base = tally.base_orders.len() as f64 / base_days;
            let freq_recent = tally.recent_orders.len() as f64 / recent_days;
            let change_pct = (freq_base > 0.0).then(|| (freq_recent / freq_base - 1.0) * 100.0);
            let declined = tally.recent_orders.is_empty()
                || change_pct.is_some_and(|c| c <= -th.min_drop_pct);
            declined.then_some(OverallRow {
                item,
                tally,
                freq_base,
                freq_recent,
                change_pct,
            })
        })
        .collect();

    // Blank change sorts last.
    let change_key = |c: Option<f64>| c.unwrap_or(f64::INFINITY);
    rows.sort_by(|a, b| {
        a.tally
            .recent_orders
            .len()
            .cmp(&b.tally.recent_orders.len())
            .then_with(|| change_key(a.change_pct).total_cmp(&change_key(b.change_pct)))
            .then_with(|| b.tally.base_revenue.total_cmp(&a.tally.base_revenue))
            .then_with(|| a.item.cmp(b.item))
    });

    let mut table = TabularResult::new(&[
        "item",
        "orders_base",
        "orders_recent",
        "freq_base",
        "freq_recent",
        "change_pct",
        "revenue_base",
        "revenue_recent",
        "last_purchase",
        "days_since_last",
        "base_period",
        "recent_period",
    ]);
    let (base_period, recent_period) = (w.base_period(), w.recent_period());
    for row in rows {
        table.push_row(vec![
            row.item.into(),
            row.tally.base_orders.len().into(),
            row.tally.recent_orders.len().into(),
            Cell::Number(round_to(row.freq_base, 4)),
            Cell::Number(round_to(row.freq_recent, 4)),
            row.change_pct.map(round2).into(),
            Cell::Number(round2(row.tally.base_revenue)),
            Cell::Number(round2(row.tally.recent_revenue)),
            row.tally.last_purchase.into(),
            row.tally.last_purchase.map(|d| w.days_since(d)).into(),
            base_period.as_str().into(),
            recent_period.as_str().into(),
        ]);
    }
    table
}

pub struct DeclinedItems;

impl ReportType for DeclinedItems {
    fn slug(&self) -> &'static str {
        "declined_items"
    }

    fn title(&self) -> &'static str {
        "Declined items"
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

    fn load_request(&self, _params: &ReportParams, _now: LocalTime) -> LoadRequest {
        LoadRequest::items()
    }

    fn compute(
        &self,
        data: &SalesData,
        params: &ReportParams,
        now: LocalTime,
    ) -> Result<TabularResult, CoreError> {
        let w = Windows::new(params, now);
        let th = Thresholds::new(params);
        Ok(if params.flag("by_client").unwrap_or(true) {
            by_client_table(data, &w, &th)
        } else {
            overall_table(data, &w, &th)
        })
    }

    fn compute_sheets(
        &self,
        data: &SalesData,
        params: &ReportParams,
        now: LocalTime,
    ) -> Result<Vec<Sheet>, CoreError> {
        let w = Windows::new(params, now);
        let th = Thresholds::new(params);
        Ok(vec![
            Sheet::new("ByClient", by_client_table(data, &w, &th)),
            Sheet::new("Overall", overall_table(data, &w, &th)),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::ParamValue;
    use crate::reports::fixtures::{at, date, line};

    fn data() -> SalesData {
        SalesData::from_items(vec![
            line("b1", "Acme", "2024-04-10", "Tea", 50.0),
            line("b2", "Acme", "2024-04-11", "Coffee", 20.0),
            line("b3", "Bolt", "2024-04-12", "Tea", 30.0),
            line("r1", "Acme", "2024-06-10", "Coffee", 25.0),
            line("r2", "Acme", "2024-06-20", "Juice", 5.0),
            line("old", "Acme", "2023-01-01", "Cocoa", 5.0),
        ])
    }

    fn now() -> LocalTime {
        at("2024-06-30")
    }

    #[test]
    fn by_client_requires_client_to_stay_active() {
        let t = DeclinedItems.compute(&data(), &ReportParams::new(), now()).unwrap();
        assert_eq!(t.len(), 1);
        assert_eq!(t.get(0, "client"), Some(&Cell::Text("Acme".into())));
        assert_eq!(t.get(0, "item"), Some(&Cell::Text("Tea".into())));
        assert_eq!(t.get(0, "orders_base"), Some(&Cell::Int(1)));
        assert_eq!(t.get(0, "client_orders_base"), Some(&Cell::Int(2)));
        assert_eq!(t.get(0, "client_orders_recent"), Some(&Cell::Int(2)));
        assert_eq!(
            t.get(0, "base_period"),
            Some(&Cell::Text("2024-03-02..2024-05-30".into()))
        );
        assert_eq!(
            t.get(0, "recent_period"),
            Some(&Cell::Text("2024-05-31..2024-06-30".into()))
        );
    }

    #[test]
    fn last_purchase_spans_full_history() {
        let mut lines = data().items;
        // Booked ahead of today: outside both windows but still the latest purchase.
        lines.push(line("f1", "Acme", "2024-07-02", "Tea", 10.0));
        let t = DeclinedItems
            .compute(&SalesData::from_items(data().items), &ReportParams::new(), now())
            .unwrap();
        assert_eq!(t.get(0, "last_purchase"), Some(&Cell::Date(date("2024-04-10"))));
        assert_eq!(t.get(0, "days_since_last"), Some(&Cell::Int(81)));

        let t = DeclinedItems
            .compute(&SalesData::from_items(lines), &ReportParams::new(), now())
            .unwrap();
        assert_eq!(t.get(0, "last_purchase"), Some(&Cell::Date(date("2024-07-02"))));
        assert_eq!(t.get(0, "days_since_last"), Some(&Cell::Int(-1)));

        let req = DeclinedItems.load_request(&ReportParams::new(), now());
        assert_eq!(req.since, None);
    }

    #[test]
    fn overall_lists_only_declined_items() {
        let params = ReportParams::new().with("by_client", ParamValue::Flag(false));
        let t = DeclinedItems.compute(&data(), &params, now()).unwrap();
        let items: Vec<_> = t.column_values("item").unwrap().filter_map(Cell::as_text).collect();
        // Coffee grew, Juice and Cocoa have no baseline orders.
        assert_eq!(items, vec!["Tea"]);
        assert_eq!(t.get(0, "orders_base"), Some(&Cell::Int(2)));
        assert_eq!(t.get(0, "change_pct"), Some(&Cell::Number(-100.0)));
        assert_eq!(t.get(0, "last_purchase"), Some(&Cell::Date(date("2024-04-12"))));
        assert_eq!(t.get(0, "days_since_last"), Some(&Cell::Int(79)));
    }

    #[test]
    fn drop_threshold_flags_partial_decline() {
        let mut lines = Vec::new();
        for (i, day) in ["2024-04-01", "2024-04-05", "2024-04-09", "2024-04-13", "2024-04-17", "2024-04-21"]
            .iter()
            .enumerate()
        {
            lines.push(line(&format!("b{i}"), "Acme", day, "Tea", 1.0));
        }
        lines.push(line("r0", "Acme", "2024-06-15", "Tea", 1.0));
        let data = SalesData::from_items(lines);

        // 6/90 per day before, 1/30 after: a 50% drop.
        let params = ReportParams::new().with("by_client", ParamValue::Flag(false));
        let t = DeclinedItems.compute(&data, &params, now()).unwrap();
        assert_eq!(t.len(), 1);
        assert_eq!(t.get(0, "change_pct"), Some(&Cell::Number(-50.0)));

        let params = params.with("min_drop_pct", ParamValue::Number(60.0));
        let t = DeclinedItems.compute(&data, &params, now()).unwrap();
        assert!(t.is_empty());
    }

    #[test]
    fn huge_windows_are_clamped() {
        let params = ReportParams::new()
            .with("recent_days", ParamValue::Int(1_000_000_000_000))
            .with("baseline_days", ParamValue::Int(1_000_000_000_000));
        let sheets = DeclinedItems.compute_sheets(&data(), &params, now()).unwrap();
        // Every sale lands in the century-long recent window.
        assert!(sheets.iter().all(|s| s.table.is_empty()));
    }

    #[test]
    fn export_has_both_views() {
        let sheets = DeclinedItems
            .compute_sheets(&data(), &ReportParams::new(), now())
            .unwrap();
        let names: Vec<_> = sheets.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["ByClient", "Overall"]);
    }
}
