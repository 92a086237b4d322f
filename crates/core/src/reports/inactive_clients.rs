//! Clients whose last purchase is older than a cutoff.

use std::collections::{HashMap, HashSet};

use crate::error::CoreError;
use crate::params::{ParamKind, ParamSpec, Preset, ReportParams};
use crate::report::{LoadRequest, ReportType};
use crate::sales::{Order, SalesData};
use crate::table::{Cell, TabularResult};
use crate::types::{days_before, round2, start_of, LocalTime};

const CUTOFF_PRESETS: &[Preset] = &[Preset::Int(30), Preset::Int(60), Preset::Int(90), Preset::Int(120)];
const START_PRESETS: &[Preset] = &[
    Preset::YearStart,
    Preset::Int(90),
    Preset::Int(180),
    Preset::Int(365),
];

const PARAMS: &[ParamSpec] = &[
    ParamSpec::required("cutoff_days", ParamKind::Integer).with_presets(CUTOFF_PRESETS),
    ParamSpec::optional("start_date", ParamKind::ResolvedDate).with_presets(START_PRESETS),
];

const LABELS: &[(&str, &str)] = &[
    ("client", "Client"),
    ("last_purchase", "Last purchase"),
    ("last_sum", "Last order amount"),
    ("orders_count", "Orders"),
    ("total_spent", "Total spent"),
    ("days_inactive", "Days inactive"),
];

const EXPLANATION: &str = "\
## Inactive clients

Clients with no purchase in the last `cutoff_days` days, oldest first.

### Parameters
- `cutoff_days` (required): inactivity threshold in days.
- `start_date`: ignore purchase history before this date. Accepts a date, a number of days ago, or the start of the current year.

`orders_count` and `total_spent` cover the considered history only.";

struct ClientHistory<'a> {
    last: &'a Order,
    orders: HashSet<&'a str>,
    spent: f64,
}

pub struct InactiveClients;

impl ReportType for InactiveClients {
    fn slug(&self) -> &'static str {
        "inactive_clients"
    }

    fn title(&self) -> &'static str {
        "Inactive clients"
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

    fn load_request(&self, params: &ReportParams, _now: LocalTime) -> LoadRequest {
        LoadRequest::orders().since(params.date("start_date"))
    }

    fn compute(
        &self,
        data: &SalesData,
        params: &ReportParams,
        now: LocalTime,
    ) -> Result<TabularResult, CoreError> {
        let cutoff_days = params
            .int("cutoff_days")
            .ok_or_else(|| CoreError::Validation("cutoff_days is required".into()))?;
        let cutoff = days_before(now, cutoff_days);
        let since = params.date("start_date");

        let mut clients: HashMap<&str, ClientHistory<'_>> = HashMap::new();
        for order in data
            .orders
            .iter()
            .filter(|o| since.map_or(true, |s| o.date >= s))
        {
            let entry = clients
                .entry(order.client.as_str())
                .or_insert_with(|| ClientHistory {
                    last: order,
                    orders: HashSet::new(),
                    spent: 0.0,
                });
            // Later input wins among orders of the same day.
            if order.date >= entry.last.date {
                entry.last = order;
            }
            entry.orders.insert(order.order_id.as_str());
            entry.spent += order.total_sum;
        }

        let mut inactive: Vec<(&str, ClientHistory<'_>)> = clients
            .into_iter()
            .filter(|(_, h)| start_of(h.last.date) < cutoff)
            .collect();
        inactive.sort_by(|a, b| a.1.last.date.cmp(&b.1.last.date).then_with(|| a.0.cmp(b.0)));

        let mut table = TabularResult::new(&[
            "client",
            "last_purchase",
            "last_sum",
            "orders_count",
            "total_spent",
            "days_inactive",
        ]);
        for (client, history) in inactive {
            let days = (now - start_of(history.last.date)).num_days();
            table.push_row(vec![
                client.into(),
                history.last.date.into(),
                Cell::Number(round2(history.last.total_sum)),
                history.orders.len().into(),
                Cell::Number(round2(history.spent)),
                days.into(),
            ]);
        }
        Ok(table)
    }
}
