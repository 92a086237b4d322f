//! Date-window resolution shared by every windowed report.
//!
//! Precedence: explicit `date_from` + `date_to` (inclusive end date), then
//! `period_days` relative to now, then the report's own fallback.

use chrono::Duration;

use crate::params::ReportParams;
use crate::types::{days_before, start_of, LocalTime, SaleDate};

/// What a report uses when the caller gives no window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fallback {
    /// All history.
    Unbounded,
    /// `[now - n days, now)`.
    LastDays(i64),
}

/// A half-open `[start, end)` interval in local time. `None` bounds are
/// open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    pub start: Option<LocalTime>,
    pub end: Option<LocalTime>,
}

impl DateWindow {
    pub fn unbounded() -> Self {
        Self {
            start: None,
            end: None,
        }
    }

    /// `[now - days, now)`. Oversized counts are clamped by [`days_before`].
    pub fn last_days(now: LocalTime, days: i64) -> Self {
        Self {
            start: Some(days_before(now, days)),
            end: Some(now),
        }
    }

    /// `[from, to + 1 day)`.
    pub fn between(from: SaleDate, to: SaleDate) -> Self {
        Self {
            start: Some(start_of(from)),
            end: start_of(to).checked_add_signed(Duration::days(1)),
        }
    }

    /// Resolve the window from normalized parameters.
    ///
    /// A non-positive `period_days` counts as absent.
    pub fn resolve(params: &ReportParams, now: LocalTime, fallback: Fallback) -> Self {
        if let (Some(from), Some(to)) = (params.date("date_from"), params.date("date_to")) {
            return Self::between(from, to);
        }
        if let Some(days) = params.int("period_days").filter(|d| *d > 0) {
            return Self::last_days(now, days);
        }
        match fallback {
            Fallback::Unbounded => Self::unbounded(),
            Fallback::LastDays(days) => Self::last_days(now, days),
        }
    }

    /// Whether a sale dated `date` (taken at midnight) falls inside.
    pub fn contains(&self, date: SaleDate) -> bool {
        let at = start_of(date);
        self.start.map_or(true, |s| at >= s) && self.end.map_or(true, |e| at < e)
    }

    /// First calendar date that can fall inside the window.
    pub fn first_date(&self) -> Option<SaleDate> {
        self.start.map(|s| {
            if s.time() == chrono::NaiveTime::MIN {
                s.date()
            } else {
                s.date().succ_opt().unwrap_or(s.date())
            }
        })
    }

    /// Last calendar day covered by the window, as reported to users.
    pub fn last_date(&self) -> Option<SaleDate> {
        self.end
            .map(|e| e.checked_sub_signed(Duration::days(1)).unwrap_or(e).date())
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::params::ParamValue;

    fn d(y: i32, m: u32, day: u32) -> SaleDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn now() -> LocalTime {
        d(2024, 3, 31).and_hms_opt(14, 0, 0).unwrap()
    }

    #[test]
    fn explicit_range_beats_period() {
        let params = ReportParams::new()
            .with("date_from", ParamValue::Date(d(2024, 1, 1)))
            .with("date_to", ParamValue::Date(d(2024, 1, 31)))
            .with("period_days", ParamValue::Int(7));
        let w = DateWindow::resolve(&params, now(), Fallback::Unbounded);
        assert!(w.contains(d(2024, 1, 31)));
        assert!(!w.contains(d(2024, 2, 1)));
        assert!(w.contains(d(2024, 1, 1)));
        assert_eq!(w.last_date(), Some(d(2024, 1, 31)));
    }

    #[test]
    fn lone_date_from_is_ignored() {
        let params = ReportParams::new().with("date_from", ParamValue::Date(d(2024, 1, 1)));
        let w = DateWindow::resolve(&params, now(), Fallback::Unbounded);
        assert_eq!(w, DateWindow::unbounded());
    }

    #[test]
    fn period_days_is_relative_to_now() {
        let params = ReportParams::new().with("period_days", ParamValue::Int(30));
        let w = DateWindow::resolve(&params, now(), Fallback::Unbounded);
        assert!(w.contains(d(2024, 3, 31)));
        assert!(w.contains(d(2024, 3, 2)));
        // 2024-03-01 00:00 is before 2024-03-01 14:00.
        assert!(!w.contains(d(2024, 3, 1)));
        assert_eq!(w.first_date(), Some(d(2024, 3, 2)));
    }

    #[test]
    fn huge_period_is_clamped_not_panicking() {
        let params = ReportParams::new().with("period_days", ParamValue::Int(1_000_000_000_000_000));
        let w = DateWindow::resolve(&params, now(), Fallback::Unbounded);
        assert_eq!(w, DateWindow::last_days(now(), crate::types::MAX_SPAN_DAYS));
        assert!(w.contains(d(1990, 1, 1)));
        assert_eq!(w.last_date(), Some(d(2024, 3, 30)));
    }

    #[test]
    fn range_ending_on_the_last_representable_day_stays_open() {
        let w = DateWindow::between(d(2024, 1, 1), NaiveDate::MAX);
        assert_eq!(w.end, None);
        assert!(w.contains(d(9999, 12, 31)));
    }

    #[test]
    fn non_positive_period_uses_fallback() {
        let params = ReportParams::new().with("period_days", ParamValue::Int(0));
        let w = DateWindow::resolve(&params, now(), Fallback::LastDays(30));
        assert_eq!(w, DateWindow::last_days(now(), 30));
    }
}
