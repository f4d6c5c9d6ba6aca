use serde::{Deserialize, Serialize};

/// What to do when the remote reports a record as deleted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OnDelete {
    /// Reject the notification with an unhandled-operation error.
    #[default]
    Unhandled,
    /// Keep serving the last synced content.
    Retain,
    /// Soft-delete: keep the row but stop serving it.
    Hide,
    /// Remove the row.
    Purge,
}

/// What to do with a cached record the remote no longer publishes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OnUnpublish {
    #[default]
    Retain,
    Hide,
    Purge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncPolicy {
    pub on_delete: OnDelete,
    pub on_unpublish: OnUnpublish,
    /// Re-sync a collection's sets and templates (or a set's collection and
    /// templates) after syncing it.
    pub follow_related: bool,
}

impl Default for SyncPolicy {
    fn default() -> Self {
        Self { on_delete: OnDelete::default(), on_unpublish: OnUnpublish::default(), follow_related: true }
    }
}
