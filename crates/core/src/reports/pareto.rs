//! Pareto ranking shared by the ABC reports.

use crate::types::round2;

pub(crate) const A_THRESHOLD: f64 = 80.0;
pub(crate) const B_THRESHOLD: f64 = 95.0;

/// One entity after ranking.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Ranked {
    pub key: String,
    pub revenue: f64,
    pub orders: usize,
    pub share: f64,
    pub cumulative: f64,
    pub category: &'static str,
}

pub(crate) fn category(cumulative: f64) -> &'static str {
    if cumulative <= A_THRESHOLD {
        "A"
    } else if cumulative <= B_THRESHOLD {
        "B"
    } else {
        "C"
    }
}

/// Sort by revenue descending (ties by key), then attach rounded shares,
/// the running total of those shares and the A/B/C class. A zero grand
/// total gives every entity a zero share.
pub(crate) fn rank(mut entries: Vec<(String, f64, usize)>) -> Vec<Ranked> {
    entries.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    let total: f64 = entries.iter().map(|e| e.1).sum();

    let mut running = 0.0;
    entries
        .into_iter()
        .map(|(key, revenue, orders)| {
            let share = if total > 0.0 {
                round2(revenue / total * 100.0)
            } else {
                0.0
            };
            running += share;
            let cumulative = round2(running);
            Ranked {
                key,
                revenue,
                orders,
                share,
                cumulative,
                category: category(cumulative),
            }
        })
        .collect()
}
