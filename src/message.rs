//! Domain types for messages, attachments, and local file payloads.
//!
//! DESIGN
//! ======
//! These structs mirror the host wire shapes one-to-one; the session treats
//! them as immutable once fetched and replaces whole lists rather than
//! patching. The only derived logic lives in `normalize_history`, which puts
//! every fetched page into the canonical order the rendering contract
//! expects.

use serde::{Deserialize, Serialize};

/// Upload size ceiling, enforced client-side before any network call.
pub const MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

/// History page size requested per refresh.
pub const HISTORY_LIMIT: u32 = 100;

/// A file attached to a posted message, as returned by the host.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attachment {
    pub id: i64,
    pub name: String,
    pub mimetype: String,
    #[serde(default)]
    pub file_size: u64,
    /// Host-signed token for content URLs, when the host issues one.
    #[serde(default)]
    pub access_token: Option<String>,
}

impl Attachment {
    /// Image attachments render inline; everything else is a download link.
    #[must_use]
    pub fn is_image(&self) -> bool {
        self.mimetype.starts_with("image/")
    }
}

/// A message in a channel's history. Immutable once fetched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: i64,
    /// Display name of the author; `"Unknown"` when the host omits it.
    pub author: String,
    /// Host wire timestamp (`YYYY-MM-DD HH:MM:SS`), lexicographically ordered.
    pub date: String,
    /// Raw markup, trusted-safe text per the host's sanitization.
    pub body: String,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

/// An uploaded attachment not yet tied to a posted message.
///
/// Created after `upload` succeeds; cleared exactly when the owning send
/// succeeds, preserved on send failure so the user can retry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingAttachment {
    pub id: i64,
    pub name: String,
    pub mimetype: String,
    pub file_size: u64,
}

impl PendingAttachment {
    /// Image uploads get an inline preview in the pending tray.
    #[must_use]
    pub fn is_image(&self) -> bool {
        self.mimetype.starts_with("image/")
    }
}

/// A local file handed to `ChatSession::attach`.
#[derive(Debug, Clone)]
pub struct FilePayload {
    pub name: String,
    pub mimetype: String,
    pub data: Vec<u8>,
}

impl FilePayload {
    #[must_use]
    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }
}

/// Canonicalize a fetched history page: ascending `(date, id)` order,
/// duplicates (by message id) dropped keeping the first occurrence.
///
/// The host serves the page most-recent-first with a bounded limit; the
/// rendering contract wants oldest-first.
#[must_use]
pub fn normalize_history(mut messages: Vec<Message>) -> Vec<Message> {
    messages.sort_by(|a, b| a.date.cmp(&b.date).then(a.id.cmp(&b.id)));
    let mut seen = std::collections::HashSet::with_capacity(messages.len());
    messages.retain(|m| seen.insert(m.id));
    messages
}

#[cfg(test)]
#[path = "message_test.rs"]
mod tests;
