//! Clients whose first ever purchase falls inside the window.

use std::collections::HashMap;

use crate::error::CoreError;
use crate::params::{ParamKind, ParamSpec, Preset, ReportParams};
use crate::report::ReportType;
use crate::sales::{Order, SalesData};
use crate::table::{Cell, TabularResult};
use crate::types::{round2, LocalTime};
use crate::window::{DateWindow, Fallback};

const PERIOD_PRESETS: &[Preset] = &[Preset::Int(7), Preset::Int(14), Preset::Int(30), Preset::Int(60)];

const PARAMS: &[ParamSpec] = &[
    ParamSpec::optional("period_days", ParamKind::Integer).with_presets(PERIOD_PRESETS),
    ParamSpec::optional("date_from", ParamKind::IsoDate),
    ParamSpec::optional("date_to", ParamKind::IsoDate),
];

const LABELS: &[(&str, &str)] = &[
    ("client", "Client"),
    ("first_purchase", "First purchase"),
    ("first_order_sum", "First order amount"),
    ("period_start", "Period start"),
    ("period_end", "Period end"),
];

const EXPLANATION: &str = "\
## New customers

Clients whose first purchase in the whole history happened inside the period.

### Parameters
- `period_days`: last N days (default 30).
- `date_from` / `date_to`: explicit inclusive range.";

pub struct NewCustomers;

impl ReportType for NewCustomers {
    fn slug(&self) -> &'static str {
        "new_customers"
    }

    fn title(&self) -> &'static str {
        "New customers"
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

    fn compute(
        &self,
        data: &SalesData,
        params: &ReportParams,
        now: LocalTime,
    ) -> Result<TabularResult, CoreError> {
        let window = DateWindow::resolve(params, now, Fallback::LastDays(30));

        let mut first: HashMap<&str, &Order> = HashMap::new();
        for order in &data.orders {
            first
                .entry(order.client.as_str())
                .and_modify(|f| {
                    if order.date < f.date {
                        *f = order;
                    }
                })
                .or_insert(order);
        }

        let mut newcomers: Vec<&Order> = first.into_values().filter(|o| window.contains(o.date)).collect();
        newcomers.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.client.cmp(&b.client)));

        let period_start = Cell::from(window.start.map(|s| s.date()));
        let period_end = Cell::from(window.last_date());

        let mut table = TabularResult::new(&[
            "client",
            "first_purchase",
            "first_order_sum",
            "period_start",
            "period_end",
        ]);
        for order in newcomers {
            table.push_row(vec![
                order.client.as_str().into(),
                order.date.into(),
                Cell::Number(round2(order.total_sum)),
                period_start.clone(),
                period_end.clone(),
            ]);
        }
        Ok(table)
    }
}
