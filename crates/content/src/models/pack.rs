use super::{CollectibleBase, TagBase};
use crate::error::{Error, ErrorKind};
use crate::raw::{Distribution, Order, PackType};
use serde::Serialize;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use time::OffsetDateTime;

/// Where a pack is in its sales window.
///
/// Only auctions are time-boxed; every other pack type is permanently
/// [`Active`](PackStatus::Active). Status is always derived from the two
/// boundaries and the current time, never read from storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum PackStatus {
    Upcoming,
    Active,
    /// Terminal.
    Expired,
}

impl PackStatus {
    pub const ALL: [PackStatus; 3] = [Self::Upcoming, Self::Active, Self::Expired];

    pub fn at(
        pack_type: PackType,
        released_at: Option<OffsetDateTime>,
        auction_until: Option<OffsetDateTime>,
        now: OffsetDateTime,
    ) -> Self {
        if !pack_type.is_time_boxed() {
            return Self::Active;
        }
        // A time-boxed pack missing either boundary is misconfigured, and
        // misconfigured auctions are closed rather than open.
        let (Some(start), Some(end)) = (released_at, auction_until) else {
            return Self::Expired;
        };
        if now < start {
            Self::Upcoming
        } else if now < end {
            Self::Active
        } else {
            Self::Expired
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Upcoming => "Upcoming",
            Self::Active => "Active",
            Self::Expired => "Expired",
        }
    }
}

impl FromStr for PackStatus {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "upcoming" => Self::Upcoming,
            "active" => Self::Active,
            "expired" => Self::Expired,
            _ => exn::bail!(ErrorKind::InvalidContent(format!("pack status {s:?}"))),
        })
    }
}

impl Display for PackStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PackConfig {
    pub collectible_distribution: Option<Distribution>,
    pub collectible_order: Option<Order>,
    pub collectibles_per_pack: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PackBase {
    pub additional_images: Vec<String>,
    pub allow_bid_expiration: bool,
    #[serde(with = "time::serde::rfc3339::option", skip_serializing_if = "Option::is_none")]
    pub auction_until: Option<OffsetDateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub banner: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    /// Only present when the template opts into showing its collectibles.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collectible_template_ids: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collectible_templates: Option<Vec<CollectibleBase>>,
    pub config: PackConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub one_pack_per_customer: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nfts_per_pack: Option<u32>,
    pub price: i64,
    #[serde(with = "time::serde::rfc3339::option", skip_serializing_if = "Option::is_none")]
    pub released_at: Option<OffsetDateTime>,
    pub show_nfts: bool,
    pub slug: String,
    pub status: PackStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    pub template_id: String,
    pub title: String,
    #[serde(rename = "type")]
    pub pack_type: PackType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<TagBase>>,
}
