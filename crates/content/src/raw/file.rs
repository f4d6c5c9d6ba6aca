use crate::relation::Key;
use serde::Deserialize;

/// A stored media file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct File {
    pub id: Key,
    /// Name of the object in the backing storage.
    #[serde(default)]
    pub filename_disk: Option<String>,
    /// Storage discriminator, e.g. `local` or `gcp`.
    #[serde(default)]
    pub storage: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, rename = "type")]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
}

super::keyed!(File => id);
