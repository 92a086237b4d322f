//! Update loop and handlers.
//!
//! Long-polls `getUpdates`, advancing the offset past every update seen,
//! and handles each update on its own task so a slow report never blocks
//! other users.

use std::sync::Arc;
use std::time::Duration;

use salesbot_core::error::CoreError;
use salesbot_core::params::{initial_selection, RawParams};
use salesbot_core::report::ReportType;
use salesbot_core::runner::ReportRunner;
use tokio_util::sync::CancellationToken;

use crate::config::BotConfig;
use crate::keyboard::{params_keyboard, reports_keyboard, start_keyboard, Callback};
use crate::markup::{escape_html, md_to_html, params_summary};
use crate::session::SessionStore;
use crate::telegram::{CallbackQuery, ChatAction, FileRef, Message, TelegramClient, TelegramError, Update};
use crate::voice::{VoiceAction, VoiceError, VoiceWebhook};

/// Back-off after a failed `getUpdates` call.
const POLL_RETRY_DELAY: Duration = Duration::from_secs(5);

const ACCESS_DENIED: &str = "⛔️ Access denied.";
const GREETING: &str = "Hello! I generate sales reports.\nPress the button below:";

#[derive(Debug, thiserror::Error)]
pub enum BotError {
    #[error(transparent)]
    Telegram(#[from] TelegramError),

    #[error(transparent)]
    Voice(#[from] VoiceError),

    #[error(transparent)]
    Core(#[from] CoreError),
}

/// Text of the parameter screen for one report.
pub fn params_screen(title: &str, note: &str, params: &RawParams) -> String {
    format!(
        "<b>{}</b>\n\n{note}\nCurrent: {}",
        escape_html(title),
        params_summary(params)
    )
}

/// Inline error shown after a failed run. The selection is left intact so
/// the user can retry.
pub fn run_failed(error: &str) -> String {
    format!("❌ Report failed:\n<code>{}</code>", escape_html(error))
}

pub fn run_started(slug: &str, params: &RawParams) -> String {
    format!(
        "⏳ Running <b>{}</b> with: {}",
        escape_html(slug),
        params_summary(params)
    )
}

pub fn run_ready(slug: &str, file_name: &str) -> String {
    format!(
        "✅ Ready: <b>{}</b>\nFile: <code>{}</code>",
        escape_html(slug),
        escape_html(file_name)
    )
}

pub struct Dispatcher {
    tg: TelegramClient,
    runner: ReportRunner,
    sessions: SessionStore,
    config: Arc<BotConfig>,
    voice: Option<VoiceWebhook>,
}

impl Dispatcher {
    pub fn new(
        tg: TelegramClient,
        runner: ReportRunner,
        config: Arc<BotConfig>,
        voice: Option<VoiceWebhook>,
    ) -> Self {
        Self {
            tg,
            runner,
            sessions: SessionStore::new(config.session_ttl),
            config,
            voice,
        }
    }

    /// Poll for updates until `cancel` is triggered.
    pub async fn run(self: Arc<Self>, cancel: CancellationToken) {
        let mut offset = 0i64;
        tracing::info!(
            poll_timeout_secs = self.config.poll_timeout_secs,
            reports = self.runner.registry().len(),
            voice = self.voice.is_some(),
            "Bot dispatcher started"
        );

        loop {
            let polled = tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Bot dispatcher shutting down");
                    break;
                }
                polled = self.tg.get_updates(offset, self.config.poll_timeout_secs) => polled,
            };

            let updates = match polled {
                Ok(updates) => updates,
                Err(e) => {
                    tracing::error!(error = %e, "getUpdates failed");
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        _ = tokio::time::sleep(POLL_RETRY_DELAY) => continue,
                    }
                }
            };

            for update in updates {
                offset = offset.max(update.update_id + 1);
                let this = Arc::clone(&self);
                tokio::spawn(async move {
                    let update_id = update.update_id;
                    if let Err(e) = this.handle_update(update).await {
                        tracing::error!(update_id, error = %e, "Update handling failed");
                    }
                });
            }

            let purged = self.sessions.purge_expired().await;
            if purged > 0 {
                tracing::debug!(purged, "Expired sessions dropped");
            }
        }
    }

    async fn handle_update(&self, update: Update) -> Result<(), BotError> {
        if let Some(cb) = update.callback_query {
            return self.handle_callback(cb).await;
        }
        let Some(message) = update.message else {
            return Ok(());
        };
        if let Some(file) = message.voice.as_ref().or(message.audio.as_ref()) {
            return self.handle_audio(&message, file).await;
        }
        match message.text.as_deref() {
            Some(text) if text.starts_with("/start") => self.handle_start(&message).await,
            _ => Ok(()),
        }
    }

    fn message_allowed(&self, message: &Message) -> bool {
        message
            .from
            .as_ref()
            .is_some_and(|u| self.config.is_allowed(u.id))
    }

    async fn handle_start(&self, message: &Message) -> Result<(), BotError> {
        let chat_id = message.chat.id;
        if !self.message_allowed(message) {
            self.tg.send_message(chat_id, ACCESS_DENIED, None).await?;
            return Ok(());
        }
        self.tg
            .send_message(chat_id, GREETING, Some(&start_keyboard()))
            .await?;
        Ok(())
    }

    async fn handle_callback(&self, cb: CallbackQuery) -> Result<(), BotError> {
        if !self.config.is_allowed(cb.from.id) {
            self.tg
                .answer_callback_query(&cb.id, Some(ACCESS_DENIED), true)
                .await?;
            return Ok(());
        }
        let Some(callback) = cb.data.as_deref().and_then(Callback::parse) else {
            self.tg
                .answer_callback_query(&cb.id, Some("Invalid data"), true)
                .await?;
            return Ok(());
        };
        let Some(message) = cb.message.as_ref() else {
            self.tg.answer_callback_query(&cb.id, None, false).await?;
            return Ok(());
        };
        let chat_id = message.chat.id;
        let message_id = message.message_id;
        let user_id = cb.from.id;

        let Some(slug) = callback.slug().map(str::to_string) else {
            self.tg.answer_callback_query(&cb.id, None, false).await?;
            let registry = self.runner.registry();
            if registry.is_empty() {
                self.tg
                    .edit_message_text(chat_id, message_id, "No reports available yet.", None)
                    .await?;
            } else {
                self.tg
                    .edit_message_text(chat_id, message_id, "Pick a report:", Some(&reports_keyboard(registry)))
                    .await?;
            }
            return Ok(());
        };

        let report = match self.runner.registry().get(&slug) {
            Ok(report) => report,
            Err(_) => {
                let text = format!("Unknown report: {slug}");
                self.tg
                    .answer_callback_query(&cb.id, Some(&text), true)
                    .await?;
                return Ok(());
            }
        };
        self.tg.answer_callback_query(&cb.id, None, false).await?;
        let defaults = || initial_selection(report.params());

        match callback {
            Callback::RunReport(_) => {
                let params = self.sessions.start(user_id, &slug, defaults()).await;
                self.show_params(chat_id, message_id, report.as_ref(), "Choose parameters (buttons only).", &params)
                    .await
            }
            Callback::Set { key, value, .. } => {
                let params = self.sessions.set(user_id, &slug, &key, value, defaults).await;
                self.show_params(chat_id, message_id, report.as_ref(), "Choose parameters (buttons only).", &params)
                    .await
            }
            Callback::Reset(_) => {
                let params = self.sessions.start(user_id, &slug, defaults()).await;
                self.show_params(chat_id, message_id, report.as_ref(), "Parameters reset.", &params)
                    .await
            }
            Callback::Explain(_) => {
                self.tg
                    .send_message(chat_id, &md_to_html(report.explanation()), None)
                    .await?;
                Ok(())
            }
            Callback::DoRun(_) => {
                let params = self
                    .sessions
                    .params(user_id, &slug)
                    .await
                    .unwrap_or_default();
                self.deliver_report(chat_id, &slug, &params).await
            }
            Callback::ListReports => Ok(()),
        }
    }

    async fn show_params(
        &self,
        chat_id: i64,
        message_id: i64,
        report: &dyn ReportType,
        note: &str,
        params: &RawParams,
    ) -> Result<(), BotError> {
        let text = params_screen(report.title(), note, params);
        self.tg
            .edit_message_text(chat_id, message_id, &text, Some(&params_keyboard(report, params)))
            .await?;
        Ok(())
    }

    /// Run one report under the configured deadline and send the file.
    /// Failures are reported inline.
    async fn deliver_report(&self, chat_id: i64, slug: &str, params: &RawParams) -> Result<(), BotError> {
        self.tg.send_chat_action(chat_id, ChatAction::Typing).await?;
        self.tg
            .send_message(chat_id, &run_started(slug, params), None)
            .await?;

        let outcome = match tokio::time::timeout(self.config.report_timeout, self.runner.run(slug, params)).await {
            Ok(result) => result,
            Err(_) => Err(CoreError::Internal(format!(
                "report timed out after {}s",
                self.config.report_timeout.as_secs()
            ))),
        };

        match outcome {
            Ok(path) => {
                self.tg
                    .send_chat_action(chat_id, ChatAction::UploadDocument)
                    .await?;
                let file_name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                self.tg
                    .send_document(chat_id, &path, &run_ready(slug, &file_name))
                    .await?;
            }
            Err(e) => {
                tracing::warn!(slug, chat_id, error = %e, "Report run failed");
                self.tg
                    .send_message(chat_id, &run_failed(&e.to_string()), None)
                    .await?;
            }
        }
        Ok(())
    }

    async fn handle_audio(&self, message: &Message, file: &FileRef) -> Result<(), BotError> {
        let chat_id = message.chat.id;
        if !self.message_allowed(message) {
            self.tg.send_message(chat_id, ACCESS_DENIED, None).await?;
            return Ok(());
        }
        let Some(voice) = self.voice.as_ref() else {
            self.tg
                .send_message(chat_id, "Voice requests are not enabled.", None)
                .await?;
            return Ok(());
        };
        let user_id = message.from.as_ref().map_or(0, |u| u.id);

        let info = self.tg.get_file(&file.file_id).await?;
        let Some(file_path) = info.file_path else {
            self.tg
                .send_message(chat_id, "❌ Could not download the audio.", None)
                .await?;
            return Ok(());
        };
        let audio = self.tg.download_file(&file_path).await?;
        self.tg
            .send_message(chat_id, "🎧 Processing audio...", None)
            .await?;

        let reply = match voice.forward(audio, user_id, chat_id).await {
            Ok(reply) => reply,
            Err(e) => {
                tracing::warn!(chat_id, error = %e, "Voice webhook failed");
                self.tg
                    .send_message(chat_id, "❌ Failed to send audio.", None)
                    .await?;
                return Ok(());
            }
        };

        match reply.action() {
            VoiceAction::Run { slug, params } => {
                if self.runner.registry().get(&slug).is_err() {
                    let text = format!("Unknown report: {}", escape_html(&slug));
                    self.tg.send_message(chat_id, &text, None).await?;
                    return Ok(());
                }
                self.deliver_report(chat_id, &slug, &params).await
            }
            VoiceAction::Say(text) => {
                self.tg
                    .send_message(chat_id, &escape_html(&text), None)
                    .await?;
                Ok(())
            }
            VoiceAction::Nothing => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn params_screen_lists_current_selection() {
        let params = RawParams::from([
            ("dim".to_string(), json!("client")),
            ("period_days".to_string(), json!(30)),
        ]);
        assert_eq!(
            params_screen("Average check", "Parameters reset.", &params),
            "<b>Average check</b>\n\nParameters reset.\nCurrent: \
             <code>dim</code>=<b>client</b>, <code>period_days</code>=<b>30</b>"
        );
    }

    #[test]
    fn run_messages_escape_user_visible_text() {
        assert_eq!(
            run_failed("unknown parameter 'x<y>' for average_check"),
            "❌ Report failed:\n<code>unknown parameter 'x&lt;y&gt;' for average_check</code>"
        );
        assert_eq!(
            run_ready("abc_goods", "abc_goods_20240301_0905.xlsx"),
            "✅ Ready: <b>abc_goods</b>\nFile: <code>abc_goods_20240301_0905.xlsx</code>"
        );
        assert!(run_started("abc_goods", &RawParams::new()).ends_with("(no parameters, defaults apply)"));
    }

    #[test]
    fn error_wraps_core_error_transparently() {
        let err = BotError::from(CoreError::Validation("bad".into()));
        assert_eq!(err.to_string(), CoreError::Validation("bad".into()).to_string());
    }
}
