//! Telegram HTML rendering helpers.

use std::sync::LazyLock;

use regex::Regex;
use salesbot_core::params::RawParams;
use serde_json::Value;

/// Escape the three characters Telegram's HTML mode cares about.
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

static HEADING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^#{2,3}[ \t]+(.+?)[ \t]*$").expect("valid regex"));
static BOLD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*(.+?)\*\*").expect("valid regex"));
static CODE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"`([^`]+)`").expect("valid regex"));
static BULLET_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^([ \t]*)-[ \t]+").expect("valid regex"));

/// Convert the small Markdown subset used in report explanations to
/// Telegram HTML: `##`/`###` headings and `**bold**` become `<b>`,
/// backticks become `<code>`, `- ` bullets become `•`. Everything else is
/// escaped verbatim.
pub fn md_to_html(text: &str) -> String {
    let escaped = escape_html(text);
    let out = HEADING_RE.replace_all(&escaped, "<b>$1</b>");
    let out = BOLD_RE.replace_all(&out, "<b>$1</b>");
    let out = CODE_RE.replace_all(&out, "<code>$1</code>");
    let out = BULLET_RE.replace_all(&out, "$1• ");
    out.into_owned()
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Bool(true) => "yes".into(),
        Value::Bool(false) => "no".into(),
        other => other.to_string(),
    }
}

/// `<code>key</code>=<b>value</b>, ...` or a note that defaults apply.
pub fn params_summary(params: &RawParams) -> String {
    if params.is_empty() {
        return "(no parameters, defaults apply)".into();
    }
    params
        .iter()
        .map(|(k, v)| {
            format!(
                "<code>{}</code>=<b>{}</b>",
                escape_html(k),
                escape_html(&display_value(v))
            )
        })
        .collect::<Vec<_>>()
        .join(", ")
}
