use crate::error::{ErrorKind, Result};
use crate::{Command, SyncCommand};
use exn::ResultExt;
use mirror_cache::{Database, Reader, Repository};
use mirror_config::Config;
use mirror_content::{AssetUrls, EntityKind};
use mirror_query::Query;
use mirror_remote::HttpRemote;
use mirror_sync::{Notification, SyncEngine};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncReadExt;

pub(crate) async fn run(config_file: Option<&Path>, command: Command) -> Result<()> {
    let config = Config::load(config_file).or_raise(|| ErrorKind::Config)?;
    let db = open_cache(&config).await?;
    let result = match command {
        Command::Migrate => migrate(&config, &db).await,
        Command::Sync(SyncCommand::All { kind }) => sync_all(&config, &db, kind).await,
        Command::Sync(SyncCommand::Item { kind, key }) => sync_item(&config, &db, kind, &key).await,
        Command::Webhook { file } => webhook(&config, &db, file).await,
        Command::Query { kind, query, locale } => {
            find(&config, &db, kind, query.as_deref(), locale.as_deref().unwrap_or(&config.locale)).await
        },
    };
    db.close().await;
    result
}

/// Opens (creating if needed) the cache database, which also runs migrations.
async fn open_cache(config: &Config) -> Result<Database> {
    let path = &config.database.path;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.or_raise(|| ErrorKind::Cache)?;
    }
    Database::connect(path).await.or_raise(|| ErrorKind::Cache)
}

async fn migrate(config: &Config, db: &Database) -> Result<()> {
    let version = db.schema_version().await.or_raise(|| ErrorKind::Cache)?;
    tracing::info!(path = %config.database.path.display(), ?version, "Cache schema is up to date");
    Ok(())
}

fn engine(config: &Config, db: &Database) -> Result<SyncEngine> {
    let (url, token) = config.remote_credentials().or_raise(|| ErrorKind::Config)?;
    let remote = HttpRemote::new(url.clone(), token, config.remote_timeout()).or_raise(|| ErrorKind::Remote)?;
    Ok(SyncEngine::new(Arc::new(remote), Repository::from(db), config.sync))
}

async fn sync_all(config: &Config, db: &Database, kind: Option<EntityKind>) -> Result<()> {
    let engine = engine(config, db)?;
    let results = match kind {
        Some(kind) => vec![(kind, engine.sync_all(kind).await.or_raise(|| ErrorKind::Sync)?)],
        None => engine.sync_everything().await.or_raise(|| ErrorKind::Sync)?,
    };
    for (kind, resync) in results {
        println!("{kind}: {resync}");
    }
    Ok(())
}

async fn sync_item(config: &Config, db: &Database, kind: EntityKind, key: &str) -> Result<()> {
    let change = engine(config, db)?.sync_item(kind, key).await.or_raise(|| ErrorKind::Sync)?;
    println!("{kind} {key}: {change}");
    Ok(())
}

async fn webhook(config: &Config, db: &Database, file: Option<PathBuf>) -> Result<()> {
    let body = match file {
        Some(file) => tokio::fs::read_to_string(&file)
            .await
            .or_raise(|| ErrorKind::Input(format!("cannot read {}", file.display())))?,
        None => {
            let mut body = String::new();
            tokio::io::stdin()
                .read_to_string(&mut body)
                .await
                .or_raise(|| ErrorKind::Input("cannot read stdin".to_string()))?;
            body
        },
    };
    let notification: Notification =
        serde_json::from_str(&body).or_raise(|| ErrorKind::Input("malformed notification".to_string()))?;
    let report = mirror_sync::handle(&engine(config, db)?, &notification).await.or_raise(|| ErrorKind::Sync)?;
    for (step, outcome) in &report.steps {
        println!("{step}: {outcome}");
    }
    Ok(())
}

async fn find(config: &Config, db: &Database, kind: EntityKind, query: Option<&str>, locale: &str) -> Result<()> {
    let query: Query = match query {
        Some(json) => serde_json::from_str(json).or_raise(|| ErrorKind::Input("malformed query".to_string()))?,
        None => Query::new(),
    };
    let mut files = AssetUrls::new(config.cms_url().or_raise(|| ErrorKind::Config)?.clone());
    if let Some(cdn) = &config.assets.cdn_url {
        files = files.with_cdn(cdn.as_str(), config.assets.cdn_storage.as_str());
    }
    let page = Reader::new(db, Arc::new(files)).find(kind, &query, locale, None).await.or_raise(|| ErrorKind::Cache)?;
    let output = serde_json::to_string_pretty(&page).or_raise(|| ErrorKind::Input("unprintable page".to_string()))?;
    println!("{output}");
    Ok(())
}
