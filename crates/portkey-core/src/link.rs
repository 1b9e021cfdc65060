use serde::{Deserialize, Serialize};

/// A stored short-link record.
///
/// `short` and `original` are both unique across a store; `deleted` is a
/// tombstone that never reverts once set. The serde field names double as
/// the on-disk format of the file backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    /// The opaque short identifier.
    #[serde(rename = "short_url")]
    pub short: String,
    /// The original URL this short id redirects to.
    #[serde(rename = "original_url")]
    pub original: String,
    /// The owner's identifier; empty for legacy anonymous entries.
    #[serde(default)]
    pub user_id: String,
    /// Tombstone flag; a deleted link stays queryable but is not redirectable.
    #[serde(rename = "is_deleted", default)]
    pub deleted: bool,
}

impl Link {
    /// Creates a live (non-deleted) link.
    pub fn new(
        short: impl Into<String>,
        original: impl Into<String>,
        user_id: impl Into<String>,
    ) -> Self {
        Self {
            short: short.into(),
            original: original.into(),
            user_id: user_id.into(),
            deleted: false,
        }
    }

    /// Builds the public short URL under the given base.
    pub fn to_url(&self, base_url: &str) -> String {
        format!("{}/{}", base_url.trim_end_matches('/'), self.short)
    }
}
