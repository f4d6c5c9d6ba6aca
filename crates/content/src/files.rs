//! Media URL resolution.

use crate::raw::File;
use crate::relation::Relation;
use url::Url;

/// Turns a stored-file reference into an absolute URL.
pub trait FileUrls: Send + Sync {
    fn url(&self, file: &Relation<File>) -> Option<String>;

    /// Convenience for the (very common) optional file field.
    fn url_opt(&self, file: Option<&Relation<File>>) -> Option<String> {
        file.and_then(|file| self.url(file))
    }
}

/// Resolves files either to the CDN (for CDN-backed storage) or to the
/// content service's own asset endpoint.
#[derive(Debug, Clone)]
pub struct AssetUrls {
    cms_url: Url,
    cdn_url: Option<String>,
    cdn_storage: String,
}

impl AssetUrls {
    pub fn new(cms_url: Url) -> Self {
        Self { cms_url, cdn_url: None, cdn_storage: "gcp".to_string() }
    }

    /// Serve files from `storage` through the CDN at `cdn_url`.
    pub fn with_cdn(mut self, cdn_url: impl Into<String>, storage: impl Into<String>) -> Self {
        self.cdn_url = Some(cdn_url.into().trim_end_matches('/').to_string());
        self.cdn_storage = storage.into();
        self
    }

    fn asset(&self, id: &str) -> Option<String> {
        match self.cms_url.join(&format!("/assets/{id}")) {
            Ok(url) => Some(url.into()),
            Err(error) => {
                tracing::warn!(id, %error, "could not build asset URL");
                None
            },
        }
    }
}

impl FileUrls for AssetUrls {
    fn url(&self, file: &Relation<File>) -> Option<String> {
        match file {
            Relation::Id(key) => self.asset(&key.to_string()),
            Relation::Expanded(file) => {
                let on_cdn = file.storage.as_deref() == Some(self.cdn_storage.as_str());
                match (on_cdn, &self.cdn_url, &file.filename_disk) {
                    (true, Some(cdn), Some(filename)) => Some(format!("{cdn}/{filename}")),
                    _ => self.asset(&file.id.to_string()),
                }
            },
        }
    }
}
