/// Orders, clients and items are keyed by externally supplied strings.
pub type OrderId = String;

/// Calendar date of a sale. Sales carry no time component.
pub type SaleDate = chrono::NaiveDate;

/// Local wall-clock instant used as "now" for report windows.
pub type LocalTime = chrono::NaiveDateTime;

/// Round a currency or percentage value to two decimal places.
pub fn round2(value: f64) -> f64 {
    round_to(value, 2)
}

/// Round to an arbitrary number of decimal places.
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

/// Midnight at the start of `date`.
pub fn start_of(date: SaleDate) -> LocalTime {
    date.and_time(chrono::NaiveTime::MIN)
}

/// Longest look-back a day count can express: one hundred years.
pub const MAX_SPAN_DAYS: i64 = 36_600;

/// `at` moved back by `days`. Counts beyond [`MAX_SPAN_DAYS`] in either
/// direction are clamped.
pub fn days_before(at: LocalTime, days: i64) -> LocalTime {
    let days = days.clamp(-MAX_SPAN_DAYS, MAX_SPAN_DAYS);
    chrono::Duration::try_days(days)
        .and_then(|d| at.checked_sub_signed(d))
        .unwrap_or(at)
}
