//! Minimal Telegram Bot API client.
//!
//! Covers only the methods the bot uses. Every call is a POST returning the
//! `{ "ok", "result", "description" }` envelope; a `false` `ok` becomes
//! [`TelegramError::Api`].

use std::path::Path;
use std::time::Duration;

use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Slack on top of the long-poll timeout before the HTTP client gives up.
const POLL_GRACE: Duration = Duration::from_secs(10);

/// Ceiling for ordinary (non-polling) requests, uploads included.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum TelegramError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Telegram API error in {method}: {description}")]
    Api {
        method: &'static str,
        description: String,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
    pub callback_query: Option<CallbackQuery>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FileRef {
    pub file_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub chat: Chat,
    pub from: Option<User>,
    pub text: Option<String>,
    pub voice: Option<FileRef>,
    pub audio: Option<FileRef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CallbackQuery {
    pub id: String,
    pub from: User,
    pub message: Option<Message>,
    pub data: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct File {
    pub file_id: String,
    pub file_path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InlineKeyboardButton {
    pub text: String,
    pub callback_data: String,
}

impl InlineKeyboardButton {
    pub fn new(text: impl Into<String>, callback_data: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            callback_data: callback_data.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InlineKeyboardMarkup {
    pub inline_keyboard: Vec<Vec<InlineKeyboardButton>>,
}

#[derive(Debug, Clone, Copy)]
pub enum ChatAction {
    Typing,
    UploadDocument,
}

impl ChatAction {
    fn as_str(self) -> &'static str {
        match self {
            Self::Typing => "typing",
            Self::UploadDocument => "upload_document",
        }
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct TelegramClient {
    client: reqwest::Client,
    /// `<api_url>/bot<token>`
    method_base: String,
    /// `<api_url>/file/bot<token>`
    file_base: String,
}

impl TelegramClient {
    pub fn new(api_url: &str, token: &str) -> Result<Self, TelegramError> {
        let api_url = api_url.trim_end_matches('/');
        let client = reqwest::Client::builder().build()?;
        Ok(Self {
            client,
            method_base: format!("{api_url}/bot{token}"),
            file_base: format!("{api_url}/file/bot{token}"),
        })
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &'static str,
        payload: &Value,
        timeout: Duration,
    ) -> Result<T, TelegramError> {
        let response: ApiResponse<T> = self
            .client
            .post(format!("{}/{method}", self.method_base))
            .timeout(timeout)
            .json(payload)
            .send()
            .await?
            .json()
            .await?;
        unwrap_envelope(method, response)
    }

    /// Long-poll for updates after `offset`.
    pub async fn get_updates(&self, offset: i64, timeout_secs: u64) -> Result<Vec<Update>, TelegramError> {
        let payload = json!({
            "offset": offset,
            "timeout": timeout_secs,
            "allowed_updates": ["message", "callback_query"],
        });
        self.call(
            "getUpdates",
            &payload,
            Duration::from_secs(timeout_secs) + POLL_GRACE,
        )
        .await
    }

    /// Send an HTML-formatted message.
    pub async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        markup: Option<&InlineKeyboardMarkup>,
    ) -> Result<(), TelegramError> {
        let mut payload = json!({ "chat_id": chat_id, "text": text, "parse_mode": "HTML" });
        if let Some(markup) = markup {
            payload["reply_markup"] = serde_json::to_value(markup).unwrap_or(Value::Null);
        }
        self.call::<Value>("sendMessage", &payload, REQUEST_TIMEOUT).await?;
        Ok(())
    }

    /// Replace the text and keyboard of a message the bot sent earlier.
    pub async fn edit_message_text(
        &self,
        chat_id: i64,
        message_id: i64,
        text: &str,
        markup: Option<&InlineKeyboardMarkup>,
    ) -> Result<(), TelegramError> {
        let mut payload = json!({
            "chat_id": chat_id,
            "message_id": message_id,
            "text": text,
            "parse_mode": "HTML",
        });
        if let Some(markup) = markup {
            payload["reply_markup"] = serde_json::to_value(markup).unwrap_or(Value::Null);
        }
        self.call::<Value>("editMessageText", &payload, REQUEST_TIMEOUT).await?;
        Ok(())
    }

    pub async fn answer_callback_query(
        &self,
        callback_id: &str,
        text: Option<&str>,
        show_alert: bool,
    ) -> Result<(), TelegramError> {
        let payload = json!({
            "callback_query_id": callback_id,
            "text": text,
            "show_alert": show_alert,
        });
        self.call::<Value>("answerCallbackQuery", &payload, REQUEST_TIMEOUT).await?;
        Ok(())
    }

    pub async fn send_chat_action(&self, chat_id: i64, action: ChatAction) -> Result<(), TelegramError> {
        let payload = json!({ "chat_id": chat_id, "action": action.as_str() });
        self.call::<Value>("sendChatAction", &payload, REQUEST_TIMEOUT).await?;
        Ok(())
    }

    /// Upload a local file as a document with an HTML caption.
    pub async fn send_document(&self, chat_id: i64, path: &Path, caption: &str) -> Result<(), TelegramError> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "report.xlsx".into());
        let form = Form::new()
            .text("chat_id", chat_id.to_string())
            .text("caption", caption.to_string())
            .text("parse_mode", "HTML")
            .part("document", Part::bytes(bytes).file_name(file_name));

        let response: ApiResponse<Value> = self
            .client
            .post(format!("{}/sendDocument", self.method_base))
            .timeout(REQUEST_TIMEOUT)
            .multipart(form)
            .send()
            .await?
            .json()
            .await?;
        unwrap_envelope("sendDocument", response)?;
        Ok(())
    }

    pub async fn get_file(&self, file_id: &str) -> Result<File, TelegramError> {
        self.call("getFile", &json!({ "file_id": file_id }), REQUEST_TIMEOUT)
            .await
    }

    /// Download a file by the `file_path` returned from [`Self::get_file`].
    pub async fn download_file(&self, file_path: &str) -> Result<Vec<u8>, TelegramError> {
        let bytes = self
            .client
            .get(format!("{}/{file_path}", self.file_base))
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;
        Ok(bytes.to_vec())
    }
}

fn unwrap_envelope<T>(method: &'static str, response: ApiResponse<T>) -> Result<T, TelegramError> {
    match (response.ok, response.result) {
        (true, Some(result)) => Ok(result),
        (_, _) => Err(TelegramError::Api {
            method,
            description: response
                .description
                .unwrap_or_else(|| "no result in response".into()),
        }),
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn updates_decode_messages_and_callbacks() {
        let raw = json!({
            "ok": true,
            "result": [
                {"update_id": 7, "message": {
                    "message_id": 1, "chat": {"id": 10, "type": "private"},
                    "from": {"id": 42, "is_bot": false, "first_name": "A"},
                    "text": "/start"
                }},
                {"update_id": 8, "callback_query": {
                    "id": "cb1", "from": {"id": 42, "is_bot": false, "first_name": "A"},
                    "chat_instance": "x", "data": "list_reports",
                    "message": {"message_id": 2, "chat": {"id": 10, "type": "private"}}
                }}
            ]
        });
        let response: ApiResponse<Vec<Update>> = serde_json::from_value(raw).unwrap();
        let updates = unwrap_envelope("getUpdates", response).unwrap();
        assert_eq!(updates.len(), 2);
        assert_eq!(updates[0].message.as_ref().unwrap().text.as_deref(), Some("/start"));
        let cb = updates[1].callback_query.as_ref().unwrap();
        assert_eq!(cb.data.as_deref(), Some("list_reports"));
        assert_eq!(cb.message.as_ref().unwrap().chat.id, 10);
    }

    #[test]
    fn failed_envelope_carries_description() {
        let response: ApiResponse<Value> = serde_json::from_value(json!({
            "ok": false, "error_code": 400, "description": "Bad Request: message is not modified"
        }))
        .unwrap();
        assert_matches!(
            unwrap_envelope("editMessageText", response),
            Err(TelegramError::Api { method: "editMessageText", description }) if description.contains("not modified")
        );
    }

    #[test]
    fn keyboard_serializes_as_bot_api_markup() {
        let markup = InlineKeyboardMarkup {
            inline_keyboard: vec![vec![InlineKeyboardButton::new("Run", "do_run:x")]],
        };
        assert_eq!(
            serde_json::to_value(&markup).unwrap(),
            json!({"inline_keyboard": [[{"text": "Run", "callback_data": "do_run:x"}]]})
        );
    }
}
