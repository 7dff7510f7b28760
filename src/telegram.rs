//! Messaging-platform boundary: trait, wire types, and HTTP client.
//!
//! The delivery orchestrator talks to the platform only through [`BotApi`],
//! which mirrors the handful of Bot API methods this pipeline consumes:
//! send a photo with caption, send a text message (optionally as a reply,
//! link previews suppressed), fetch channel metadata, and fetch a recent
//! update snapshot. Tests substitute a recording implementation.
//!
//! [`TelegramBot`] is the production implementation over the Bot HTTP API.
//! Channel identifiers are passed through as opaque strings; both
//! `@username` and numeric chat-id forms are accepted by the platform.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, instrument};

use crate::error::{PosterError, Result};

/// Outgoing messages use the platform's lightweight-markup parse mode.
const PARSE_MODE: &str = "Markdown";

/// A message accepted by the platform.
#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub message_id: i64,
    /// Unix timestamp assigned by the platform.
    pub date: i64,
}

/// Channel metadata, including any linked discussion group.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatInfo {
    pub id: i64,
    /// Chat id of the linked discussion group, when one is configured.
    pub linked_chat_id: Option<i64>,
}

/// One entry of the recent-update history.
#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
}

/// Envelope wrapping every Bot API response.
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

impl<T> ApiResponse<T> {
    fn into_result(self) -> Result<T> {
        if self.ok {
            self.result
                .ok_or_else(|| PosterError::Telegram("missing result field".to_string()))
        } else {
            Err(PosterError::Telegram(
                self.description.unwrap_or_else(|| "unknown API error".to_string()),
            ))
        }
    }
}

/// The remote operations the delivery orchestrator relies on.
#[async_trait]
pub trait BotApi: Send + Sync {
    /// Send a photo by URL with a markup caption.
    async fn send_photo(&self, chat: &str, photo_url: &str, caption: &str) -> Result<Message>;

    /// Send a markup text message. Link previews are suppressed when
    /// `disable_preview` is set; `reply_to` threads the message under an
    /// existing one.
    async fn send_message(
        &self,
        chat: &str,
        text: &str,
        reply_to: Option<i64>,
        disable_preview: bool,
    ) -> Result<Message>;

    /// Fetch channel metadata (exposes the linked discussion group id).
    async fn get_chat(&self, chat: &str) -> Result<ChatInfo>;

    /// Fetch the recent update history visible to the bot.
    async fn get_updates(&self) -> Result<Vec<Update>>;
}

/// Bot HTTP API client.
pub struct TelegramBot {
    http: reqwest::Client,
    base_url: String,
}

impl TelegramBot {
    /// Create a client for `token`, reusing the process-wide HTTP client
    /// (which carries any configured proxy).
    pub fn new(token: &str, http: reqwest::Client) -> Self {
        Self {
            http,
            base_url: format!("https://api.telegram.org/bot{token}"),
        }
    }

    async fn call<T: for<'de> Deserialize<'de>>(
        &self,
        method: &str,
        body: serde_json::Value,
    ) -> Result<T> {
        let url = format!("{}/{}", self.base_url, method);
        debug!(method, "Calling Bot API");
        let response: ApiResponse<T> = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await?
            .json()
            .await?;
        response.into_result()
    }
}

#[async_trait]
impl BotApi for TelegramBot {
    #[instrument(level = "debug", skip_all, fields(chat = %chat))]
    async fn send_photo(&self, chat: &str, photo_url: &str, caption: &str) -> Result<Message> {
        self.call(
            "sendPhoto",
            json!({
                "chat_id": chat,
                "photo": photo_url,
                "caption": caption,
                "parse_mode": PARSE_MODE,
            }),
        )
        .await
    }

    #[instrument(level = "debug", skip_all, fields(chat = %chat))]
    async fn send_message(
        &self,
        chat: &str,
        text: &str,
        reply_to: Option<i64>,
        disable_preview: bool,
    ) -> Result<Message> {
        let mut body = json!({
            "chat_id": chat,
            "text": text,
            "parse_mode": PARSE_MODE,
            "link_preview_options": { "is_disabled": disable_preview },
        });
        if let Some(message_id) = reply_to {
            body["reply_parameters"] = json!({ "message_id": message_id });
        }
        self.call("sendMessage", body).await
    }

    async fn get_chat(&self, chat: &str) -> Result<ChatInfo> {
        self.call("getChat", json!({ "chat_id": chat })).await
    }

    async fn get_updates(&self) -> Result<Vec<Update>> {
        self.call("getUpdates", json!({})).await
    }
}

/// Build a user-facing deep link to a message in a private discussion group.
///
/// Private chat ids carry a `-100` prefix on the wire that is not part of
/// the link form; it is stripped here.
pub fn discussion_message_link(chat_id: i64, message_id: i64) -> String {
    let id_part = chat_id.to_string();
    let id_part = id_part.strip_prefix("-100").unwrap_or(&id_part);
    format!("https://t.me/c/{id_part}/{message_id}")
}
