//! Helpers for consumers implementing the rendering contract.
//!
//! The session exposes state; turning attachments into URLs and sizes into
//! labels is the one bit of presentation logic shared by every consumer, so
//! it lives here rather than being reimplemented per widget.

use crate::message::Attachment;

/// Human-readable file size: `B` below 1 KB, one decimal of `KB`/`MB`
/// above. Zero renders as an empty string (the host omits sizes it does not
/// know).
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn format_file_size(bytes: u64) -> String {
    match bytes {
        0 => String::new(),
        1..1024 => format!("{bytes} B"),
        1024..1_048_576 => format!("{:.1} KB", bytes as f64 / 1024.0),
        _ => format!("{:.1} MB", bytes as f64 / 1_048_576.0),
    }
}

/// URL for an attachment's content, for opening in place. Includes the
/// host's signed access token when one was issued.
#[must_use]
pub fn content_url(attachment: &Attachment) -> String {
    attachment_url(attachment, false)
}

/// Download URL for an attachment (`download=true`).
#[must_use]
pub fn download_url(attachment: &Attachment) -> String {
    attachment_url(attachment, true)
}

/// Inline preview URL for image attachments.
#[must_use]
pub fn image_url(attachment: &Attachment) -> String {
    match &attachment.access_token {
        Some(token) => format!("/web/image/{}?access_token={token}", attachment.id),
        None => format!("/web/image/{}", attachment.id),
    }
}

fn attachment_url(attachment: &Attachment, download: bool) -> String {
    let mut url = format!("/web/content/{}", attachment.id);
    let mut separator = '?';
    if let Some(token) = &attachment.access_token {
        url.push(separator);
        url.push_str("access_token=");
        url.push_str(token);
        separator = '&';
    }
    if download {
        url.push(separator);
        url.push_str("download=true");
    }
    url
}

#[cfg(test)]
#[path = "render_test.rs"]
mod tests;
