//! Forwarding of voice/audio messages to an external webhook.
//!
//! The webhook receives the audio as a multipart `audio` field plus
//! `user_id` and `chat_id` query parameters. Its JSON reply either names a
//! report to run (`ready: true`, `report_slug`, `parameters`) or carries a
//! `message` to relay to the user.

use std::time::Duration;

use reqwest::multipart::{Form, Part};
use salesbot_core::params::RawParams;
use serde::Deserialize;

/// Transcription and intent detection can be slow.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, thiserror::Error)]
pub enum VoiceError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Voice webhook returned HTTP {0}")]
    HttpStatus(u16),
}

/// Reply from the voice webhook.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VoiceReply {
    #[serde(default)]
    pub ready: bool,
    #[serde(default)]
    pub report_slug: Option<String>,
    #[serde(default)]
    pub parameters: Option<RawParams>,
    #[serde(default)]
    pub message: Option<String>,
}

/// What the bot should do with a [`VoiceReply`].
#[derive(Debug, Clone, PartialEq)]
pub enum VoiceAction {
    Run { slug: String, params: RawParams },
    Say(String),
    Nothing,
}

impl VoiceReply {
    pub fn action(self) -> VoiceAction {
        match (self.ready, self.report_slug) {
            (true, Some(slug)) if !slug.trim().is_empty() => VoiceAction::Run {
                slug: slug.trim().to_string(),
                params: self.parameters.unwrap_or_default(),
            },
            (true, _) => VoiceAction::Nothing,
            (false, _) => match self.message {
                Some(msg) if !msg.trim().is_empty() => VoiceAction::Say(msg),
                _ => VoiceAction::Nothing,
            },
        }
    }
}

pub struct VoiceWebhook {
    client: reqwest::Client,
    url: String,
}

impl VoiceWebhook {
    pub fn new(url: impl Into<String>) -> Result<Self, VoiceError> {
        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    /// Upload one recording and decode the reply.
    pub async fn forward(
        &self,
        audio: Vec<u8>,
        user_id: i64,
        chat_id: i64,
    ) -> Result<VoiceReply, VoiceError> {
        let part = Part::bytes(audio)
            .file_name("audio.ogg")
            .mime_str("audio/ogg")?;
        let form = Form::new().part("audio", part);

        let response = self
            .client
            .post(&self.url)
            .query(&[("user_id", user_id), ("chat_id", chat_id)])
            .multipart(form)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(VoiceError::HttpStatus(response.status().as_u16()));
        }
        let reply: VoiceReply = response.json().await?;
        tracing::debug!(user_id, chat_id, ready = reply.ready, "Voice webhook replied");
        Ok(reply)
    }
}
