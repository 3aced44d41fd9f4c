//! Collaborator seams to the host platform.
//!
//! DESIGN
//! ======
//! The core never talks to the host directly; it goes through these object-
//! safe traits, injected as `Arc<dyn …>`. Production wires in
//! [`crate::http::HttpChatClient`]; tests wire in scripted mocks. The push
//! bridge is optional — polling alone satisfies the freshness contract, push
//! only makes it cheaper.

use tokio::sync::mpsc;

use crate::channel::ChannelId;
use crate::error::ChatResult;
use crate::message::{FilePayload, Message, PendingAttachment};

/// Read/write access to a channel's message history.
#[async_trait::async_trait]
pub trait MessageStoreClient: Send + Sync {
    /// Fetch up to `limit` messages for `channel`, host-ordered
    /// most-recent-first. Callers re-order; see
    /// [`crate::message::normalize_history`].
    async fn fetch_history(&self, channel: ChannelId, limit: u32) -> ChatResult<Vec<Message>>;

    /// Post a message. `body` may be empty only when `attachment_ids` is
    /// non-empty; implementations omit the attachment field entirely when
    /// the slice is empty.
    async fn post_message(&self, channel: ChannelId, body: &str, attachment_ids: &[i64]) -> ChatResult<()>;
}

/// File upload service for a channel.
#[async_trait::async_trait]
pub trait AttachmentClient: Send + Sync {
    /// Upload one file and return the host's attachment metadata. The
    /// session enforces the size ceiling before calling this.
    async fn upload(&self, channel: ChannelId, file: &FilePayload) -> ChatResult<PendingAttachment>;
}

/// A notification that something changed in a subscribed channel.
///
/// Carries no payload: receivers always reconcile through a full
/// `fetch_history`, so the event only needs to say "look again".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PushEvent;

/// Optional real-time event source for a channel.
#[async_trait::async_trait]
pub trait PushBridge: Send + Sync {
    /// Subscribe to change notifications for `channel`. The stream ends when
    /// the sender side is dropped; the scheduler then falls back to polling
    /// alone.
    async fn subscribe(&self, channel: ChannelId) -> ChatResult<mpsc::UnboundedReceiver<PushEvent>>;
}
