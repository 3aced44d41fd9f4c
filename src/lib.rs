//! # taskchat
//!
//! Chat-sync core for a threaded chat panel bound to a business record.
//! Owns per-channel session state (message history, draft, pending
//! attachments) and an adaptive two-speed polling engine with debounced
//! push triggers. All host I/O — message store, file uploads, real-time
//! events — goes through injected collaborator traits; an HTTP
//! implementation for the host's portal endpoints is included.
//!
//! Typical wiring:
//!
//! ```no_run
//! use std::sync::Arc;
//! use taskchat::{ChannelId, ChatSession, HttpChatClient, PollConfig, RefreshScheduler};
//!
//! # async fn run() -> taskchat::ChatResult<()> {
//! let client = Arc::new(HttpChatClient::new("https://host.example/project_chat")?);
//! let session = Arc::new(ChatSession::new(client.clone(), client));
//! session.bind(ChannelId::new(42)).await?;
//! let scheduler = RefreshScheduler::spawn(session.clone(), PollConfig::from_env());
//! // ... render from session.snapshot(), stop() on teardown ...
//! # scheduler.stop();
//! # Ok(())
//! # }
//! ```

pub mod channel;
pub mod error;
pub mod http;
pub mod message;
pub mod render;
pub mod scheduler;
pub mod session;
pub mod store;

pub use channel::{ChannelId, ChannelRef};
pub use error::{ChatError, ChatResult, UploadFailure};
pub use http::HttpChatClient;
pub use message::{Attachment, FilePayload, HISTORY_LIMIT, MAX_UPLOAD_BYTES, Message, PendingAttachment};
pub use scheduler::{PollConfig, PollPolicy, RefreshScheduler, RefreshTrigger};
pub use session::{ChatSession, SendOutcome, SessionPhase, SessionSnapshot};
pub use store::{AttachmentClient, MessageStoreClient, PushBridge, PushEvent};
