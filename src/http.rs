//! HTTP implementation of the collaborator traits.
//!
//! DESIGN
//! ======
//! Speaks the host's portal chat endpoints: `POST {base}/chat/history`,
//! `POST {base}/chat/post` (JSON), and `POST {base}/chat/upload`
//! (multipart). Wire-shape quirks are absorbed here — the polymorphic
//! `author_id` field, missing metadata defaults, and the upload endpoint's
//! 200-with-`{error}` rejection responses — so the session only ever sees
//! clean domain types.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::channel::ChannelId;
use crate::error::{ChatError, ChatResult};
use crate::message::{Attachment, FilePayload, Message, PendingAttachment};
use crate::store::{AttachmentClient, MessageStoreClient};

const REQUEST_TIMEOUT_SECS: u64 = 30;
const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Client for the host's chat endpoints.
pub struct HttpChatClient {
    http: reqwest::Client,
    base_url: String,
}

impl HttpChatClient {
    /// Build a client for the host at `base_url` (any trailing slash is
    /// trimmed; endpoint paths are appended to it).
    ///
    /// # Errors
    ///
    /// `ChatError::HttpClientBuild` if the underlying client cannot be
    /// constructed.
    pub fn new(base_url: &str) -> ChatResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()
            .map_err(|e| ChatError::HttpClientBuild(e.to_string()))?;
        Ok(Self { http, base_url: base_url.trim_end_matches('/').to_string() })
    }

    /// The configured host base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post_json<B: Serialize + Sync>(&self, path: &str, body: &B) -> ChatResult<String> {
        let url = format!("{}{path}", self.base_url);
        let response = self
            .http
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| ChatError::Transport(e.to_string()))?;
        let status = response.status();
        let text = response.text().await.map_err(|e| ChatError::Transport(e.to_string()))?;
        if !status.is_success() {
            return Err(ChatError::Status { status: status.as_u16(), body: text });
        }
        Ok(text)
    }
}

// =============================================================================
// WIRE SHAPES
// =============================================================================

#[derive(Serialize)]
struct HistoryRequest {
    channel_id: i64,
    limit: u32,
}

#[derive(Deserialize)]
struct HistoryResponse {
    #[serde(default)]
    messages: Vec<WireMessage>,
}

/// The host's `author_id` relational field: an `[id, name]` pair, a bare
/// name on older hosts, or `false` when the author record is gone.
#[derive(Deserialize)]
#[serde(untagged)]
enum WireAuthor {
    Named(i64, String),
    Name(String),
    Unset(bool),
}

impl WireAuthor {
    fn display_name(self) -> Option<String> {
        match self {
            Self::Named(_, name) | Self::Name(name) => Some(name),
            Self::Unset(_) => None,
        }
    }
}

#[derive(Deserialize)]
struct WireMessage {
    id: i64,
    #[serde(default)]
    author_id: Option<WireAuthor>,
    #[serde(default)]
    date: Option<String>,
    #[serde(default)]
    body: Option<String>,
    #[serde(default)]
    attachments: Vec<Attachment>,
}

impl From<WireMessage> for Message {
    fn from(wire: WireMessage) -> Self {
        Self {
            id: wire.id,
            author: wire
                .author_id
                .and_then(WireAuthor::display_name)
                .unwrap_or_else(|| "Unknown".to_string()),
            date: wire.date.unwrap_or_default(),
            body: wire.body.unwrap_or_default(),
            attachments: wire.attachments,
        }
    }
}

#[derive(Serialize)]
struct PostRequest<'a> {
    channel_id: i64,
    message_body: &'a str,
    /// Omitted entirely when no attachments are pending; the host treats an
    /// absent field and an empty list differently across versions.
    #[serde(skip_serializing_if = "Option::is_none")]
    attachment_ids: Option<&'a [i64]>,
}

/// Upload responses are either the attachment metadata or an `{error}`
/// object; variant order lets the error shape win when both keys could
/// match.
#[derive(Deserialize)]
#[serde(untagged)]
enum UploadResponse {
    Rejected { error: String },
    Created(WireUpload),
}

#[derive(Deserialize)]
struct WireUpload {
    id: i64,
    #[serde(default)]
    name: String,
    #[serde(default)]
    mimetype: String,
    #[serde(default)]
    file_size: u64,
}

// =============================================================================
// TRAIT IMPLS
// =============================================================================

#[async_trait::async_trait]
impl MessageStoreClient for HttpChatClient {
    async fn fetch_history(&self, channel: ChannelId, limit: u32) -> ChatResult<Vec<Message>> {
        let request = HistoryRequest { channel_id: channel.get(), limit };
        let text = self.post_json("/chat/history", &request).await?;
        let response: HistoryResponse =
            serde_json::from_str(&text).map_err(|e| ChatError::Parse(e.to_string()))?;
        Ok(response.messages.into_iter().map(Message::from).collect())
    }

    async fn post_message(&self, channel: ChannelId, body: &str, attachment_ids: &[i64]) -> ChatResult<()> {
        let request = PostRequest {
            channel_id: channel.get(),
            message_body: body,
            attachment_ids: (!attachment_ids.is_empty()).then_some(attachment_ids),
        };
        self.post_json("/chat/post", &request).await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl AttachmentClient for HttpChatClient {
    async fn upload(&self, channel: ChannelId, file: &FilePayload) -> ChatResult<PendingAttachment> {
        let part = reqwest::multipart::Part::bytes(file.data.clone()).file_name(file.name.clone());
        let form = reqwest::multipart::Form::new()
            .text("channel_id", channel.get().to_string())
            .part("ufile", part);

        let url = format!("{}/chat/upload", self.base_url);
        let response = self
            .http
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| ChatError::Transport(e.to_string()))?;
        let status = response.status();
        let text = response.text().await.map_err(|e| ChatError::Transport(e.to_string()))?;

        // The host rejects files both ways: an error status with an `{error}`
        // body, or a 200 whose body carries only the `error` field.
        if !status.is_success() {
            if let Ok(UploadResponse::Rejected { error }) = serde_json::from_str(&text) {
                return Err(ChatError::Rejected { reason: error });
            }
            return Err(ChatError::Status { status: status.as_u16(), body: text });
        }
        match serde_json::from_str(&text).map_err(|e| ChatError::Parse(e.to_string()))? {
            UploadResponse::Rejected { error } => Err(ChatError::Rejected { reason: error }),
            UploadResponse::Created(wire) => Ok(PendingAttachment {
                id: wire.id,
                name: wire.name,
                mimetype: wire.mimetype,
                file_size: wire.file_size,
            }),
        }
    }
}

#[cfg(test)]
#[path = "http_test.rs"]
mod tests;
