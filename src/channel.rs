//! Channel identity and host-binding normalization.
//!
//! DESIGN
//! ======
//! The host hands the bound channel to the widget in whatever shape its
//! record field happens to carry: a bare integer, an `[id, display_name]`
//! pair, a record object exposing `res_id` or `id`, or a `false` sentinel
//! for "no chat bound". All of that is normalized here, at the boundary;
//! the rest of the crate only ever sees `Option<ChannelId>`.

use serde::{Deserialize, Serialize};

/// Identifier of a conversation thread bound to a task.
///
/// Always positive; zero and negative host values normalize to "unbound"
/// (`None`) rather than constructing an invalid id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelId(i64);

impl ChannelId {
    /// Build a channel id from a raw host integer. Non-positive values are
    /// the host's way of saying no channel exists yet.
    #[must_use]
    pub fn new(raw: i64) -> Option<Self> {
        (raw > 0).then_some(Self(raw))
    }

    /// The raw integer id as the host wire expects it.
    #[must_use]
    pub fn get(self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for ChannelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// The host's polymorphic channel-binding value, as found in record data.
///
/// Variant order matters for untagged deserialization: a bare integer must
/// win over the pair and record forms.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ChannelRef {
    /// Bare integer id.
    Id(i64),
    /// `[id, display_name]` pair from a relational field.
    Named(i64, String),
    /// Record object exposing the id under `res_id` (or `id` on older hosts).
    Record {
        #[serde(alias = "id")]
        res_id: i64,
    },
    /// The host's `false` sentinel for an unset field.
    Unset(bool),
}

impl ChannelRef {
    /// Normalize to a canonical channel id, or `None` when unbound.
    #[must_use]
    pub fn normalize(&self) -> Option<ChannelId> {
        match self {
            Self::Id(raw) | Self::Named(raw, _) | Self::Record { res_id: raw } => ChannelId::new(*raw),
            Self::Unset(_) => None,
        }
    }
}

#[cfg(test)]
#[path = "channel_test.rs"]
mod tests;
