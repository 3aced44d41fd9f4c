//! Per-channel chat session state and operations.
//!
//! DESIGN
//! ======
//! One `ChatSession` owns the in-memory state for a single bound channel:
//! fetched messages, input draft, pending attachments, and the
//! loading/uploading flags. All host I/O goes through the injected
//! collaborator traits, so the session is testable with fakes and holds no
//! process-wide state.
//!
//! CONCURRENCY
//! ===========
//! Operations interleave cooperatively (timer callbacks and user actions on
//! the same runtime); state lives behind an async `RwLock` and every fetch
//! snapshots its binding under the lock, performs I/O lock-free, then
//! re-checks before applying. Two guards make interleaving safe:
//! - a bind generation, bumped on every `bind`, so a fetch started for a
//!   previous binding can never touch the new one;
//! - a fetch sequence number, so of two overlapping fetches for the same
//!   binding only the newer one may apply.
//!
//! ERROR HANDLING
//! ==============
//! Fetch and post failures preserve last-known-good state and settle the
//! phase back to `Ready`; the returned `Err` is the recoverable UI signal.
//! No expected failure mode leaves the session stuck in `Loading`.

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::channel::ChannelId;
use crate::error::{ChatError, ChatResult, UploadFailure};
use crate::message::{FilePayload, HISTORY_LIMIT, MAX_UPLOAD_BYTES, Message, PendingAttachment, normalize_history};
use crate::store::{AttachmentClient, MessageStoreClient};

// =============================================================================
// PHASE & SNAPSHOT
// =============================================================================

/// Lifecycle phase of the current channel binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// No channel bound; valid empty state, not an error.
    Unbound,
    /// A history fetch is in flight.
    Loading,
    /// Bound with settled state (fresh or last-known-good).
    Ready,
}

/// Outcome of a `send` call that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// The message was posted and a reconciling refresh was triggered.
    Posted,
    /// Nothing to post: empty trimmed draft, no pending attachments, or no
    /// bound channel. No network call was made.
    NothingToSend,
}

/// Everything a consumer needs to render the panel, and nothing more:
/// loading indicator, empty state, message list with attachments, draft,
/// and the pending-attachment tray.
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub channel: Option<ChannelId>,
    pub phase: SessionPhase,
    pub messages: Vec<Message>,
    pub draft: String,
    pub pending: Vec<PendingAttachment>,
    pub uploading: bool,
}

// =============================================================================
// SESSION
// =============================================================================

struct SessionState {
    channel: Option<ChannelId>,
    phase: SessionPhase,
    messages: Vec<Message>,
    draft: String,
    pending: Vec<PendingAttachment>,
    uploading: bool,
    /// Bumped on every `bind`; fetches carry the generation they started
    /// under and are discarded on mismatch.
    generation: u64,
    /// Monotonic id handed to each started fetch.
    next_fetch_seq: u64,
    /// Highest fetch sequence that has applied its result.
    applied_fetch_seq: u64,
}

impl SessionState {
    fn new() -> Self {
        Self {
            channel: None,
            phase: SessionPhase::Unbound,
            messages: Vec::new(),
            draft: String::new(),
            pending: Vec::new(),
            uploading: false,
            generation: 0,
            next_fetch_seq: 0,
            applied_fetch_seq: 0,
        }
    }
}

/// In-memory state holder for one chat channel.
pub struct ChatSession {
    store: Arc<dyn MessageStoreClient>,
    uploads: Arc<dyn AttachmentClient>,
    state: RwLock<SessionState>,
}

impl ChatSession {
    #[must_use]
    pub fn new(store: Arc<dyn MessageStoreClient>, uploads: Arc<dyn AttachmentClient>) -> Self {
        Self { store, uploads, state: RwLock::new(SessionState::new()) }
    }

    /// Bind the session to a channel, or tear it down to the empty state.
    ///
    /// `None` (the host's falsy/zero binding) resets to `Unbound` with no
    /// fetch. A valid id enters `Loading` and performs the initial fetch.
    /// Either way the previous binding's in-flight fetches are invalidated.
    ///
    /// # Errors
    ///
    /// Returns the initial fetch's error; the session still settles into
    /// `Ready` with an empty list.
    pub async fn bind(&self, channel: Option<ChannelId>) -> ChatResult<()> {
        {
            let mut state = self.state.write().await;
            state.generation += 1;
            state.channel = channel;
            state.messages.clear();
            state.draft.clear();
            state.pending.clear();
            state.uploading = false;
            state.phase = if channel.is_some() { SessionPhase::Loading } else { SessionPhase::Unbound };
        }
        if channel.is_some() {
            self.refresh().await?;
        }
        Ok(())
    }

    /// Fetch history for the current binding and replace the message list
    /// atomically. Returns the settled message count (the scheduler's change
    /// detector feeds on it).
    ///
    /// On failure the previous list is preserved and the phase still settles
    /// to `Ready`. A result that arrives after the channel was rebound is
    /// discarded; an older fetch never overwrites a newer one.
    ///
    /// # Errors
    ///
    /// `ChatError::Transport` / `Status` / `Parse` from the store client.
    pub async fn refresh(&self) -> ChatResult<usize> {
        let (channel, generation, seq) = {
            let mut state = self.state.write().await;
            let Some(channel) = state.channel else {
                return Ok(0);
            };
            state.phase = SessionPhase::Loading;
            state.next_fetch_seq += 1;
            (channel, state.generation, state.next_fetch_seq)
        };

        let fetched = self.store.fetch_history(channel, HISTORY_LIMIT).await;

        let mut state = self.state.write().await;
        if state.generation != generation {
            debug!(%channel, "discarding history fetch for a stale binding");
            return Ok(state.messages.len());
        }
        match fetched {
            Ok(page) => {
                if seq > state.applied_fetch_seq {
                    state.applied_fetch_seq = seq;
                    state.messages = normalize_history(page);
                } else {
                    debug!(%channel, "discarding out-of-order history fetch");
                }
                state.phase = SessionPhase::Ready;
                Ok(state.messages.len())
            }
            Err(e) => {
                warn!(%channel, error = %e, "history fetch failed; keeping previous messages");
                state.phase = SessionPhase::Ready;
                Err(e)
            }
        }
    }

    /// Replace the input draft.
    pub async fn set_draft(&self, text: impl Into<String>) {
        self.state.write().await.draft = text.into();
    }

    /// Post the current draft plus pending attachments.
    ///
    /// No-op when there is nothing to post. On success the draft and pending
    /// tray are cleared and a reconciling refresh runs; on failure both are
    /// left untouched for retry.
    ///
    /// # Errors
    ///
    /// The post's transport/status error. A failure of the follow-up refresh
    /// is not surfaced here: the message was posted, last-known-good is kept,
    /// and the next poll reconciles.
    pub async fn send(&self) -> ChatResult<SendOutcome> {
        let (channel, body, ids) = {
            let state = self.state.read().await;
            let Some(channel) = state.channel else {
                return Ok(SendOutcome::NothingToSend);
            };
            let body = state.draft.trim().to_string();
            let ids: Vec<i64> = state.pending.iter().map(|p| p.id).collect();
            if body.is_empty() && ids.is_empty() {
                return Ok(SendOutcome::NothingToSend);
            }
            (channel, body, ids)
        };

        self.store.post_message(channel, &body, &ids).await?;

        {
            let mut state = self.state.write().await;
            if state.channel == Some(channel) {
                state.draft.clear();
                state.pending.clear();
            }
        }
        let _ = self.refresh().await;
        Ok(SendOutcome::Posted)
    }

    /// Upload a batch of files into the pending tray, one at a time.
    ///
    /// Oversize files are rejected before any network call; each remaining
    /// file uploads independently, so one failure never aborts its siblings.
    /// Successful uploads are appended immediately, with the local file's
    /// name/mimetype/size filling in whatever metadata the host omitted.
    /// Returns the number of files accepted.
    ///
    /// # Errors
    ///
    /// `ChatError::PartialBatch` listing every failed file; accepted files
    /// stay in the tray.
    pub async fn attach(&self, files: Vec<FilePayload>) -> ChatResult<usize> {
        let channel = {
            let mut state = self.state.write().await;
            let Some(channel) = state.channel else {
                return Ok(0);
            };
            state.uploading = true;
            channel
        };

        let total = files.len();
        let mut accepted = 0usize;
        let mut failed = Vec::new();

        for file in &files {
            if file.size() > MAX_UPLOAD_BYTES {
                warn!(file = %file.name, size = file.size(), limit = MAX_UPLOAD_BYTES, "attach rejected before upload");
                let err = ChatError::FileTooLarge { name: file.name.clone(), size: file.size(), limit: MAX_UPLOAD_BYTES };
                failed.push(UploadFailure { name: file.name.clone(), reason: err.to_string() });
                continue;
            }
            match self.uploads.upload(channel, file).await {
                Ok(mut pending) => {
                    if pending.name.is_empty() {
                        pending.name = file.name.clone();
                    }
                    if pending.mimetype.is_empty() {
                        pending.mimetype = file.mimetype.clone();
                    }
                    if pending.file_size == 0 {
                        pending.file_size = file.size();
                    }
                    let mut state = self.state.write().await;
                    if state.channel == Some(channel) {
                        state.pending.push(pending);
                        accepted += 1;
                    }
                }
                Err(e) => {
                    warn!(file = %file.name, error = %e, "file upload failed");
                    failed.push(UploadFailure { name: file.name.clone(), reason: e.to_string() });
                }
            }
        }

        self.state.write().await.uploading = false;

        if failed.is_empty() { Ok(accepted) } else { Err(ChatError::PartialBatch { total, failed }) }
    }

    /// Remove the pending attachment at `index`. Out-of-range indexes are a
    /// defined no-op.
    pub async fn remove_attachment(&self, index: usize) {
        let mut state = self.state.write().await;
        if index < state.pending.len() {
            state.pending.remove(index);
        }
    }

    /// The currently bound channel, if any.
    pub async fn channel(&self) -> Option<ChannelId> {
        self.state.read().await.channel
    }

    /// Current lifecycle phase.
    pub async fn phase(&self) -> SessionPhase {
        self.state.read().await.phase
    }

    /// Settled message count without cloning the list.
    pub async fn message_count(&self) -> usize {
        self.state.read().await.messages.len()
    }

    /// Clone out everything the rendering contract needs.
    pub async fn snapshot(&self) -> SessionSnapshot {
        let state = self.state.read().await;
        SessionSnapshot {
            channel: state.channel,
            phase: state.phase,
            messages: state.messages.clone(),
            draft: state.draft.clone(),
            pending: state.pending.clone(),
            uploading: state.uploading,
        }
    }
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
