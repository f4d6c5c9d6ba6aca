//! Turning remote change notifications into cache work.
//!
//! Routing is split from execution: [`route`] is a pure function from a
//! [`Notification`] (and the active [`SyncPolicy`]) to a [`Plan`], and
//! [`handle`] runs a plan against a [`SyncEngine`]. A notification that can't
//! be routed never reaches the remote or the cache.
//!
//! Besides the record itself, some changes have to be fanned out to the
//! aggregates that embed it: the homepage embeds packs, collectibles and
//! FAQs, and templates embed their tags' slugs.

use crate::engine::{Change, Resync, SyncEngine};
use crate::error::{ErrorKind, Result};
use crate::policy::{OnDelete, SyncPolicy};
use exn::ResultExt;
use mirror_content::{EntityKind, Key};
use mirror_remote::Collection;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use tracing::instrument;

/// A change notification from the remote content service.
///
/// Create events carry a single `key`; update and delete events carry
/// `keys`. Either may be a string or a number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    #[serde(alias = "operation")]
    pub event: String,
    pub collection: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<Key>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keys: Vec<Key>,
}

impl Notification {
    /// `key` followed by `keys`, in order, without duplicates.
    pub fn all_keys(&self) -> Vec<String> {
        let mut merged: Vec<String> = Vec::with_capacity(self.keys.len() + 1);
        for key in self.key.iter().chain(&self.keys) {
            let key = key.to_string();
            if !merged.contains(&key) {
                merged.push(key);
            }
        }
        merged
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Event {
    Create,
    Update,
    Delete,
}

/// One unit of cache work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Incremental sync of one record.
    Item(EntityKind, String),
    /// Full resync of a kind.
    All(EntityKind),
    Singleton(EntityKind),
    /// Apply the delete policy to one record.
    Delete(EntityKind, String),
}

impl Display for Step {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::Item(kind, key) => write!(f, "sync {kind} {key}"),
            Self::All(kind) => write!(f, "resync {kind}"),
            Self::Singleton(kind) => write!(f, "sync {kind}"),
            Self::Delete(kind, key) => write!(f, "delete {kind} {key}"),
        }
    }
}

/// The ordered steps a notification expands to.
pub type Plan = Vec<Step>;

/// Decide what a notification means for the cache.
///
/// # Errors
/// - [`ErrorKind::UnhandledOperation`] for events other than create, update
///   and delete, and for deletes while the delete policy is `unhandled`.
/// - [`ErrorKind::UnhandledEntityType`] for collections the mirror doesn't track.
/// - [`ErrorKind::InvalidNotification`] for keyed collections without keys.
pub fn route(notification: &Notification, policy: &SyncPolicy) -> Result<Plan> {
    let event = match notification.event.as_str() {
        "items.create" => Event::Create,
        "items.update" => Event::Update,
        "items.delete" => Event::Delete,
        other => exn::bail!(ErrorKind::UnhandledOperation(other.to_string())),
    };
    let collection: Collection = notification
        .collection
        .parse::<Collection>()
        .or_raise(|| ErrorKind::UnhandledEntityType(notification.collection.clone()))?;
    if event == Event::Delete && policy.on_delete == OnDelete::Unhandled {
        exn::bail!(ErrorKind::UnhandledOperation(format!("items.delete on {collection}")));
    }

    let keyed = |kind: EntityKind| -> Result<Plan> {
        let keys = notification.all_keys();
        if keys.is_empty() {
            exn::bail!(ErrorKind::InvalidNotification(format!("{} on {collection} without keys", notification.event)));
        }
        Ok(keys
            .into_iter()
            .map(|key| match event {
                Event::Delete => Step::Delete(kind, key),
                Event::Create | Event::Update => Step::Item(kind, key),
            })
            .collect())
    };

    let plan = match collection {
        Collection::Application | Collection::Countries => vec![Step::Singleton(EntityKind::Application)],
        Collection::Homepage => vec![Step::Singleton(EntityKind::Homepage)],
        Collection::Rarities => {
            vec![Step::Singleton(EntityKind::Homepage), Step::All(EntityKind::CollectibleTemplate)]
        },
        Collection::PackTemplates => with(keyed(EntityKind::PackTemplate)?, [Step::Singleton(EntityKind::Homepage)]),
        Collection::NftTemplates => {
            with(keyed(EntityKind::CollectibleTemplate)?, [Step::Singleton(EntityKind::Homepage)])
        },
        Collection::FrequentlyAskedQuestions => with(keyed(EntityKind::Faq)?, [Step::Singleton(EntityKind::Homepage)]),
        Collection::Collections | Collection::Sets => {
            let kind = if collection == Collection::Sets { EntityKind::Set } else { EntityKind::Collection };
            let plan = keyed(kind)?;
            // Templates carry their collection and set ids.
            match event {
                Event::Delete => with(plan, [Step::All(EntityKind::CollectibleTemplate)]),
                Event::Create | Event::Update => plan,
            }
        },
        Collection::StaticPage => keyed(EntityKind::Page)?,
        Collection::Languages => keyed(EntityKind::Language)?,
        Collection::Tags => with(
            keyed(EntityKind::Tag)?,
            [Step::All(EntityKind::PackTemplate), Step::All(EntityKind::CollectibleTemplate)],
        ),
    };
    Ok(plan)
}

fn with(mut plan: Plan, more: impl IntoIterator<Item = Step>) -> Plan {
    plan.extend(more);
    plan
}

/// What one executed step did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Record(Change),
    Resync(Resync),
}

impl Display for Outcome {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::Record(change) => Display::fmt(change, f),
            Self::Resync(resync) => Display::fmt(resync, f),
        }
    }
}

/// The executed plan, step by step.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Report {
    pub steps: Vec<(Step, Outcome)>,
}

/// Route a notification and execute the resulting plan in order.
///
/// Execution stops at the first failing step; steps already executed stay
/// applied.
#[instrument(skip_all, fields(event = %notification.event, collection = %notification.collection))]
pub async fn handle(engine: &SyncEngine, notification: &Notification) -> Result<Report> {
    let plan = match route(notification, engine.policy()) {
        Ok(plan) => plan,
        Err(err) => {
            tracing::error!(error = %err, keys = ?notification.all_keys(), "Unhandled webhook notification");
            return Err(err);
        },
    };
    tracing::info!(steps = plan.len(), "Handling webhook notification");

    let mut report = Report { steps: Vec::with_capacity(plan.len()) };
    for step in plan {
        let outcome = match &step {
            Step::Item(kind, key) => Outcome::Record(engine.sync_item(*kind, key).await?),
            Step::All(kind) => Outcome::Resync(engine.sync_all(*kind).await?),
            Step::Singleton(kind) => Outcome::Record(engine.sync_singleton(*kind).await?),
            Step::Delete(kind, key) => Outcome::Record(engine.delete(*kind, key).await?),
        };
        tracing::debug!(%step, %outcome, "Executed webhook step");
        report.steps.push((step, outcome));
    }
    Ok(report)
}
