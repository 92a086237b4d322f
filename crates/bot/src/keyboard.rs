//! Callback payloads and inline keyboards.
//!
//! Callback data is a colon-separated string (Telegram caps it at 64
//! bytes):
//!
//! ```text
//! list_reports
//! run_report:<slug>
//! set:<slug>:<key>:<json value>
//! reset:<slug>
//! explain:<slug>
//! do_run:<slug>
//! ```

use salesbot_core::params::RawParams;
use salesbot_core::registry::ReportRegistry;
use salesbot_core::report::ReportType;
use serde_json::Value;

use crate::telegram::{InlineKeyboardButton, InlineKeyboardMarkup};

#[derive(Debug, Clone, PartialEq)]
pub enum Callback {
    ListReports,
    RunReport(String),
    Set {
        slug: String,
        key: String,
        value: Value,
    },
    Reset(String),
    Explain(String),
    DoRun(String),
}

impl Callback {
    /// Decode callback data. A `set` value that is not valid JSON is kept
    /// as a plain string.
    pub fn parse(data: &str) -> Option<Self> {
        if data == "list_reports" {
            return Some(Self::ListReports);
        }
        let (action, rest) = data.split_once(':')?;
        if rest.is_empty() {
            return None;
        }
        let slug = rest.to_string();
        match action {
            "run_report" => Some(Self::RunReport(slug)),
            "reset" => Some(Self::Reset(slug)),
            "explain" => Some(Self::Explain(slug)),
            "do_run" => Some(Self::DoRun(slug)),
            "set" => {
                let mut parts = rest.splitn(3, ':');
                let slug = parts.next()?.to_string();
                let key = parts.next()?.to_string();
                let raw = parts.next()?;
                if slug.is_empty() || key.is_empty() {
                    return None;
                }
                let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::from(raw));
                Some(Self::Set { slug, key, value })
            }
            _ => None,
        }
    }

    /// The report a callback targets; `None` for the menu.
    pub fn slug(&self) -> Option<&str> {
        match self {
            Self::ListReports => None,
            Self::RunReport(slug)
            | Self::Reset(slug)
            | Self::Explain(slug)
            | Self::DoRun(slug)
            | Self::Set { slug, .. } => Some(slug),
        }
    }

    pub fn encode(&self) -> String {
        match self {
            Self::ListReports => "list_reports".into(),
            Self::RunReport(slug) => format!("run_report:{slug}"),
            Self::Set { slug, key, value } => format!("set:{slug}:{key}:{value}"),
            Self::Reset(slug) => format!("reset:{slug}"),
            Self::Explain(slug) => format!("explain:{slug}"),
            Self::DoRun(slug) => format!("do_run:{slug}"),
        }
    }
}

fn button(text: impl Into<String>, callback: Callback) -> InlineKeyboardButton {
    InlineKeyboardButton::new(text, callback.encode())
}

/// Single "Reports" button shown on `/start`.
pub fn start_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup {
        inline_keyboard: vec![vec![button("📊 Reports", Callback::ListReports)]],
    }
}

/// One row per registered report, in registration order.
pub fn reports_keyboard(registry: &ReportRegistry) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup {
        inline_keyboard: registry
            .list_all()
            .into_iter()
            .map(|(slug, report)| {
                vec![button(report.title(), Callback::RunReport(slug.to_string()))]
            })
            .collect(),
    }
}

/// Preset buttons (one row per parameter) followed by the control rows.
/// The currently selected value is shown as `[value]`.
pub fn params_keyboard(report: &dyn ReportType, selected: &RawParams) -> InlineKeyboardMarkup {
    let slug = report.slug();
    let mut rows: Vec<Vec<InlineKeyboardButton>> = report
        .params()
        .iter()
        .filter(|spec| !spec.presets.is_empty())
        .map(|spec| {
            spec.presets
                .iter()
                .map(|preset| {
                    let value = preset.to_value();
                    let label = preset.label();
                    let text = if selected.get(spec.key) == Some(&value) {
                        format!("[{label}]")
                    } else {
                        label
                    };
                    button(
                        text,
                        Callback::Set {
                            slug: slug.to_string(),
                            key: spec.key.to_string(),
                            value,
                        },
                    )
                })
                .collect()
        })
        .collect();

    rows.push(vec![
        button("▶️ Run", Callback::DoRun(slug.to_string())),
        button("ℹ️ Explain", Callback::Explain(slug.to_string())),
    ]);
    rows.push(vec![
        button("🔁 Reset", Callback::Reset(slug.to_string())),
        button("⬅️ Back", Callback::ListReports),
    ]);
    InlineKeyboardMarkup {
        inline_keyboard: rows,
    }
}
