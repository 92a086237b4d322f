//! ABC (Pareto) classification of items by line revenue.

use std::collections::{HashMap, HashSet};

use crate::error::CoreError;
use crate::params::{ParamSpec, ReportParams};
use crate::report::{LoadRequest, ReportType};
use crate::sales::SalesData;
use crate::table::{Cell, TabularResult};
use crate::types::{round2, LocalTime};
use crate::window::DateWindow;

use super::abc_clients::{ABC_FALLBACK, ABC_PARAMS};
use super::pareto::rank;

const LABELS: &[(&str, &str)] = &[
    ("item", "Item"),
    ("total_revenue", "Revenue"),
    ("orders_count", "Orders"),
    ("revenue_share", "Share, %"),
    ("cumulative_share", "Cumulative share, %"),
    ("abc_category", "Category"),
];

const EXPLANATION: &str = "\
## ABC analysis: items

Items are ranked by line revenue (explicit line total, else quantity x price). Categories follow the usual Pareto cut: **A** up to 80% cumulative share, **B** up to 95%, **C** the rest. `orders_count` is the number of distinct orders containing the item.

### Parameters
- `period_days`: last N days (default 30).
- `date_from` / `date_to`: explicit inclusive range.";

pub struct AbcGoods;

impl ReportType for AbcGoods {
    fn slug(&self) -> &'static str {
        "abc_goods"
    }

    fn title(&self) -> &'static str {
        "ABC analysis: items"
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
        LoadRequest::items().since(window.first_date())
    }

    fn compute(
        &self,
        data: &SalesData,
        params: &ReportParams,
        now: LocalTime,
    ) -> Result<TabularResult, CoreError> {
        let window = DateWindow::resolve(params, now, ABC_FALLBACK);

        let mut per_item: HashMap<&str, (f64, HashSet<&str>)> = HashMap::new();
        for line in data.items.iter().filter(|l| window.contains(l.date)) {
            let entry = per_item.entry(line.item.as_str()).or_default();
            entry.0 += line.line_total;
            entry.1.insert(line.order_id.as_str());
        }

        let ranked = rank(
            per_item
                .into_iter()
                .map(|(item, (revenue, orders))| (item.to_string(), revenue, orders.len()))
                .collect(),
        );

        let mut table = TabularResult::new(&[
            "item",
            "total_revenue",
            "orders_count",
            "revenue_share",
            "cumulative_share",
            "abc_category",
        ]);
        for r in ranked {
            table.push_row(vec![
                r.key.into(),
                Cell::Number(round2(r.revenue)),
                r.orders.into(),
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
    use crate::reports::fixtures::{at, line};

    #[test]
    fn items_ranked_by_line_revenue() {
        let data = SalesData::from_items(vec![
            line("1", "Acme", "2024-02-20", "Widget", 90.0),
            line("1", "Acme", "2024-02-20", "Bolt", 5.0),
            line("2", "Bolt Co", "2024-02-25", "Widget", 10.0),
            line("3", "Acme", "2024-02-26", "Nut", 5.0),
        ]);
        let t = AbcGoods.compute(&data, &ReportParams::new(), at("2024-03-01")).unwrap();
        assert_eq!(t.len(), 3);
        assert_eq!(t.get(0, "item"), Some(&Cell::Text("Widget".into())));
        assert_eq!(t.get(0, "orders_count"), Some(&Cell::Int(2)));
        assert_eq!(t.get(0, "revenue_share"), Some(&Cell::Number(90.91)));
        assert_eq!(t.get(0, "abc_category"), Some(&Cell::Text("B".into())));
        assert_eq!(t.get(1, "item"), Some(&Cell::Text("Bolt".into())));
        let last = t.get(2, "cumulative_share").and_then(Cell::as_f64).unwrap();
        assert!((last - 100.0).abs() < 0.05, "{last}");
    }

    #[test]
    fn needs_item_level_data() {
        let req = AbcGoods.load_request(&ReportParams::new(), at("2024-03-01"));
        assert_eq!(req.needs, crate::sales::DataNeeds::Items);
        assert!(req.since.is_some());
    }
}
