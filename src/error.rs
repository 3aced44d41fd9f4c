//! Error types for chat-sync operations.
//!
//! ERROR HANDLING
//! ==============
//! Every network-facing operation converts failures into a `ChatError` and
//! settles the session into a consistent, last-known-good state. `Err` is the
//! recoverable signal the UI displays; nothing here is fatal to a session.
//! An unbound channel is a valid empty state, never an error.

/// Result alias for chat-sync operations.
pub type ChatResult<T> = Result<T, ChatError>;

/// Errors produced by chat-sync operations.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    /// The HTTP request to the host platform failed (network level).
    #[error("transport failure: {0}")]
    Transport(String),

    /// The host platform returned a non-success HTTP status.
    #[error("host returned status {status}")]
    Status { status: u16, body: String },

    /// The host response body could not be deserialized.
    #[error("response parse failed: {0}")]
    Parse(String),

    /// A file exceeded the upload size ceiling. Checked client-side; the
    /// network is never contacted for an oversize file.
    #[error("file \"{name}\" is {size} bytes, over the {limit} byte limit")]
    FileTooLarge { name: String, size: u64, limit: u64 },

    /// The host accepted the upload request but rejected the file
    /// (an `error` field in an otherwise well-formed response).
    #[error("upload rejected: {reason}")]
    Rejected { reason: String },

    /// One or more files in a multi-file attach failed. Successful uploads
    /// in the same batch were still applied.
    #[error("{} of {total} file(s) failed to upload", .failed.len())]
    PartialBatch { total: usize, failed: Vec<UploadFailure> },

    /// The underlying HTTP client could not be constructed.
    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),
}

/// A single failed file within a batch attach.
#[derive(Debug)]
pub struct UploadFailure {
    /// Local file name, for per-file UI reporting.
    pub name: String,
    /// Rendered failure reason.
    pub reason: String,
}

impl ChatError {
    /// Whether retrying the same operation may succeed without user action.
    #[must_use]
    pub fn retryable(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Status { status, .. } => matches!(status, 429 | 500..=599),
            _ => false,
        }
    }
}

#[cfg(test)]
#[path = "error_test.rs"]
mod tests;
