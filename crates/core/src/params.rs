//! Report parameters: declared keys, coercion kinds and button presets.
//!
//! Raw parameters arrive loosely typed (chat button payloads, voice
//! webhook JSON). Each report declares a closed table of [`ParamSpec`]s;
//! [`normalize_params`] coerces the raw mapping against that table and
//! rejects keys the report does not declare.

use chrono::{Datelike, Duration, NaiveDate};
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;

use crate::error::CoreError;
use crate::normalize::parse_date;

/// Loosely typed parameters as received from a front end.
pub type RawParams = IndexMap<String, Value>;

/// Sentinel accepted by [`ParamKind::ResolvedDate`] for January 1st of the
/// current year.
pub const YEAR_START: &str = "year_start";
const YEAR_START_TEMPLATE: &str = "YYYY-01-01";

// ---------------------------------------------------------------------------
// Declarations
// ---------------------------------------------------------------------------

/// How a raw value is coerced.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamKind {
    /// Whole number (day counts, thresholds).
    Integer,
    /// Any finite number.
    Number,
    /// ISO `YYYY-MM-DD` string.
    IsoDate,
    /// Absolute date given as an ISO string, a "days ago" integer, or
    /// [`YEAR_START`].
    ResolvedDate,
    /// Lowercased text from an enumerated set. Membership is left to the
    /// report so that it can fall back instead of failing.
    Choice(&'static [&'static str]),
    /// Boolean flag.
    Flag,
}

/// A button preset or declared default.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Preset {
    Int(i64),
    Text(&'static str),
    Flag(bool),
    YearStart,
}

impl Preset {
    /// Raw value sent back by the button.
    pub fn to_value(self) -> Value {
        match self {
            Self::Int(n) => Value::from(n),
            Self::Text(s) => Value::from(s),
            Self::Flag(b) => Value::from(b),
            Self::YearStart => Value::from(YEAR_START),
        }
    }

    /// Button caption.
    pub fn label(self) -> String {
        match self {
            Self::Int(n) => n.to_string(),
            Self::Text(s) => s.to_string(),
            Self::Flag(true) => "yes".into(),
            Self::Flag(false) => "no".into(),
            Self::YearStart => YEAR_START_TEMPLATE.into(),
        }
    }
}

/// One declared parameter of a report.
#[derive(Debug, Clone, Copy)]
pub struct ParamSpec {
    pub key: &'static str,
    pub kind: ParamKind,
    pub required: bool,
    pub default: Option<Preset>,
    pub presets: &'static [Preset],
}

impl ParamSpec {
    pub const fn optional(key: &'static str, kind: ParamKind) -> Self {
        Self {
            key,
            kind,
            required: false,
            default: None,
            presets: &[],
        }
    }

    pub const fn required(key: &'static str, kind: ParamKind) -> Self {
        Self {
            required: true,
            ..Self::optional(key, kind)
        }
    }

    pub const fn with_default(mut self, default: Preset) -> Self {
        self.default = Some(default);
        self
    }

    pub const fn with_presets(mut self, presets: &'static [Preset]) -> Self {
        self.presets = presets;
        self
    }
}

// ---------------------------------------------------------------------------
// Normalized values
// ---------------------------------------------------------------------------

/// A coerced parameter value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ParamValue {
    Int(i64),
    Number(f64),
    Text(String),
    Date(NaiveDate),
    Flag(bool),
}

impl std::fmt::Display for ParamValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Int(n) => write!(f, "{n}"),
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
            Self::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Self::Flag(b) => write!(f, "{b}"),
        }
    }
}

/// Parameters after coercion. Absent keys have no entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReportParams {
    values: IndexMap<String, ParamValue>,
}

impl ReportParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: ParamValue) {
        self.values.insert(key.into(), value);
    }

    pub fn with(mut self, key: impl Into<String>, value: ParamValue) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.values.get(key)
    }

    pub fn int(&self, key: &str) -> Option<i64> {
        match self.values.get(key)? {
            ParamValue::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn number(&self, key: &str) -> Option<f64> {
        match self.values.get(key)? {
            ParamValue::Number(n) => Some(*n),
            ParamValue::Int(n) => Some(*n as f64),
            _ => None,
        }
    }

    pub fn text(&self, key: &str) -> Option<&str> {
        match self.values.get(key)? {
            ParamValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn date(&self, key: &str) -> Option<NaiveDate> {
        match self.values.get(key)? {
            ParamValue::Date(d) => Some(*d),
            _ => None,
        }
    }

    pub fn flag(&self, key: &str) -> Option<bool> {
        match self.values.get(key)? {
            ParamValue::Flag(b) => Some(*b),
            _ => None,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Coercion
// ---------------------------------------------------------------------------

fn as_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn as_number(value: &Value) -> Option<f64> {
    crate::aliases::scalar_to_f64(value)
}

fn as_flag(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_i64().and_then(|n| match n {
            0 => Some(false),
            1 => Some(true),
            _ => None,
        }),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "1" | "on" => Some(true),
            "false" | "no" | "0" | "off" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn resolve_date(value: &Value, today: NaiveDate) -> Option<NaiveDate> {
    if let Some(days) = as_integer(value) {
        return Duration::try_days(days).and_then(|d| today.checked_sub_signed(d));
    }
    let s = value.as_str()?.trim();
    if s.eq_ignore_ascii_case(YEAR_START) || s.eq_ignore_ascii_case(YEAR_START_TEMPLATE) {
        return NaiveDate::from_ymd_opt(today.year(), 1, 1);
    }
    parse_date(s).ok()
}

/// Coerce one raw value. `Ok(None)` means the value is explicitly empty.
pub fn coerce(kind: ParamKind, value: &Value, today: NaiveDate) -> Result<Option<ParamValue>, String> {
    if value.is_null() || value.as_str().is_some_and(|s| s.trim().is_empty()) {
        return Ok(None);
    }
    let coerced = match kind {
        ParamKind::Integer => as_integer(value).map(ParamValue::Int),
        ParamKind::Number => as_number(value).map(ParamValue::Number),
        ParamKind::IsoDate => value
            .as_str()
            .and_then(|s| NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok())
            .map(ParamValue::Date),
        ParamKind::ResolvedDate => resolve_date(value, today).map(ParamValue::Date),
        ParamKind::Choice(_) => crate::aliases::scalar_to_string(value)
            .map(|s| ParamValue::Text(s.to_lowercase())),
        ParamKind::Flag => as_flag(value).map(ParamValue::Flag),
    };
    coerced
        .map(Some)
        .ok_or_else(|| format!("cannot interpret {value} as {kind:?}"))
}

/// Normalize raw parameters against a report's declaration table.
///
/// - an undeclared key is a [`CoreError::Config`] error,
/// - an uncoercible optional value is dropped (logged at debug),
/// - an uncoercible required value is a [`CoreError::Parse`] error,
/// - a missing key takes its declared default; a missing required key
///   without default is a [`CoreError::Validation`] error.
pub fn normalize_params(
    slug: &str,
    specs: &[ParamSpec],
    raw: &RawParams,
    today: NaiveDate,
) -> Result<ReportParams, CoreError> {
    let mut params = ReportParams::new();

    for (key, value) in raw {
        let spec = specs.iter().find(|s| s.key == key).ok_or_else(|| {
            CoreError::Config(format!("report '{slug}' does not accept parameter '{key}'"))
        })?;

        match coerce(spec.kind, value, today) {
            Ok(Some(v)) => params.insert(spec.key, v),
            Ok(None) => {}
            Err(reason) if spec.required => {
                return Err(CoreError::Parse(format!(
                    "report '{slug}' parameter '{key}': {reason}"
                )));
            }
            Err(reason) => {
                tracing::debug!(slug, key = %key, reason = %reason, "Dropping unparseable optional parameter");
            }
        }
    }

    for spec in specs {
        if params.get(spec.key).is_some() {
            continue;
        }
        if let Some(default) = spec.default {
            if let Ok(Some(v)) = coerce(spec.kind, &default.to_value(), today) {
                params.insert(spec.key, v);
                continue;
            }
        }
        if spec.required {
            return Err(CoreError::Validation(format!(
                "report '{slug}' requires parameter '{}'",
                spec.key
            )));
        }
    }

    Ok(params)
}

/// Initial selection offered by a front end: the first preset of every key
/// that has presets.
pub fn initial_selection(specs: &[ParamSpec]) -> RawParams {
    specs
        .iter()
        .filter_map(|s| s.presets.first().map(|p| (s.key.to_string(), p.to_value())))
        .collect()
}
