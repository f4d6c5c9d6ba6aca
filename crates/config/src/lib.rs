//! Configuration loading and validation.
//!
//! Settings are merged from, in increasing order of precedence:
//!
//! 1. built-in defaults,
//! 2. `config.toml`, `config.yaml` or `config.json` in the platform config
//!    directory (e.g. `~/.config/mirror/` on Linux),
//! 3. a file given explicitly (usually `--config` on the command line),
//! 4. `MIRROR_`-prefixed environment variables, with `__` separating nested
//!    keys (`MIRROR_REMOTE__ACCESS_TOKEN`).

pub mod error;

use crate::error::{Error, ErrorKind, Result};
use directories::ProjectDirs;
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use mirror_sync::SyncPolicy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

const APPLICATION: &str = "mirror";
const ENV_PREFIX: &str = "MIRROR_";

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", APPLICATION)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub remote: RemoteConfig,
    pub assets: AssetsConfig,
    /// Locale used for reads that don't ask for one.
    pub locale: String,
    pub sync: SyncPolicy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite file backing the cache. Created on first use.
    pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// Base URL of the remote content service. Required for syncing.
    pub url: Option<Url>,
    /// Bearer token for the remote content service. Required for syncing.
    pub access_token: Option<String>,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetsConfig {
    /// Where media is served from. Falls back to `remote.url`.
    pub cms_url: Option<Url>,
    /// CDN for media whose storage is `cdn_storage`.
    pub cdn_url: Option<Url>,
    pub cdn_storage: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            remote: RemoteConfig::default(),
            assets: AssetsConfig::default(),
            locale: "en-UK".to_string(),
            sync: SyncPolicy::default(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        let dir = project_dirs().map(|dirs| dirs.data_dir().to_path_buf()).unwrap_or_default();
        Self { path: dir.join("mirror.sqlite") }
    }
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self { url: None, access_token: None, timeout_secs: 30 }
    }
}

impl Default for AssetsConfig {
    fn default() -> Self {
        Self { cms_url: None, cdn_url: None, cdn_storage: "gcp".to_string() }
    }
}

impl Config {
    /// Load using the default layers plus an optional explicit file.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let mut loader = Loader::new();
        if let Some(file) = file {
            loader = loader.with_file(file);
        }
        loader.load()
    }

    /// Check the settings that every command relies on.
    pub fn validate(&self) -> Result<()> {
        if self.locale.trim().is_empty() {
            exn::bail!(ErrorKind::Invalid { field: "locale", reason: "must not be empty" });
        }
        if self.remote.timeout_secs == 0 {
            exn::bail!(ErrorKind::Invalid { field: "remote.timeout_secs", reason: "must be greater than zero" });
        }
        if self.assets.cdn_storage.trim().is_empty() {
            exn::bail!(ErrorKind::Invalid { field: "assets.cdn_storage", reason: "must not be empty" });
        }
        if self.database.path.as_os_str().is_empty() {
            exn::bail!(ErrorKind::Invalid { field: "database.path", reason: "must not be empty" });
        }
        Ok(())
    }

    /// The remote URL and access token, which only syncing needs.
    pub fn remote_credentials(&self) -> Result<(&Url, &str)> {
        let url = self
            .remote
            .url
            .as_ref()
            .ok_or_else(|| Error::from(ErrorKind::Invalid { field: "remote.url", reason: "required for syncing" }))?;
        let token = self.remote.access_token.as_deref().filter(|token| !token.is_empty()).ok_or_else(|| {
            Error::from(ErrorKind::Invalid { field: "remote.access_token", reason: "required for syncing" })
        })?;
        Ok((url, token))
    }

    pub fn remote_timeout(&self) -> Duration {
        Duration::from_secs(self.remote.timeout_secs)
    }

    /// Base URL for media files.
    pub fn cms_url(&self) -> Result<&Url> {
        self.assets.cms_url.as_ref().or(self.remote.url.as_ref()).ok_or_else(|| {
            Error::from(ErrorKind::Invalid { field: "assets.cms_url", reason: "required to resolve media URLs" })
        })
    }
}

/// Builds the layered [`Figment`] that [`Config`] is extracted from.
#[derive(Debug, Clone)]
pub struct Loader {
    config_dir: Option<PathBuf>,
    file: Option<PathBuf>,
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}

impl Loader {
    pub fn new() -> Self {
        Self { config_dir: project_dirs().map(|dirs| dirs.config_dir().to_path_buf()), file: None }
    }

    /// Look for `config.*` in `dir` instead of the platform config directory.
    pub fn with_config_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config_dir = Some(dir.into());
        self
    }

    /// Skip the platform config directory.
    pub fn without_config_dir(mut self) -> Self {
        self.config_dir = None;
        self
    }

    pub fn with_file(mut self, file: impl Into<PathBuf>) -> Self {
        self.file = Some(file.into());
        self
    }

    pub fn figment(&self) -> Result<Figment> {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        if let Some(dir) = &self.config_dir {
            figment = figment
                .merge(Toml::file(dir.join("config.toml")))
                .merge(Yaml::file(dir.join("config.yaml")))
                .merge(Json::file(dir.join("config.json")));
        }
        if let Some(file) = &self.file {
            if !file.is_file() {
                exn::bail!(ErrorKind::NotFound(file.clone()));
            }
            tracing::debug!(path = %file.display(), "Loading configuration file");
            figment = match file.extension().and_then(|ext| ext.to_str()) {
                Some("toml") => figment.merge(Toml::file(file)),
                Some("yaml" | "yml") => figment.merge(Yaml::file(file)),
                Some("json") => figment.merge(Json::file(file)),
                _ => exn::bail!(ErrorKind::Invalid {
                    field: "config",
                    reason: "expected a .toml, .yaml or .json file",
                }),
            };
        }
        Ok(figment.merge(Env::prefixed(ENV_PREFIX).split("__")))
    }

    /// Merge every layer, extract and validate.
    pub fn load(&self) -> Result<Config> {
        let config: Config =
            self.figment()?.extract().map_err(|err| Error::from(ErrorKind::Load(err.to_string())))?;
        config.validate()?;
        Ok(config)
    }
}
