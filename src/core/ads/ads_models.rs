// Ad domain models, the ad storage port, and aggregate status derivation.
//
// An ad's status is never set directly by feature code. It is always derived
// from the ad's publications and moderation requests through `refresh_status`,
// so the submission path and the moderation path can't drift apart.

use crate::core::catalog::{CategoryId, ChannelId};
use crate::core::marketplace::MarketplaceError;
use crate::core::moderation::{ModerationRequest, ModerationStore, RequestStatus};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub type AdId = i64;
pub type PublicationId = i64;

// ============================================================================
// DOMAIN MODELS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdStatus {
    Draft,
    PendingModeration,
    Published,
    Rejected,
}

impl AdStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdStatus::Draft => "draft",
            AdStatus::PendingModeration => "pending_moderation",
            AdStatus::Published => "published",
            AdStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for AdStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdStatus::Draft => write!(f, "Draft"),
            AdStatus::PendingModeration => write!(f, "Pending moderation"),
            AdStatus::Published => write!(f, "Published"),
            AdStatus::Rejected => write!(f, "Rejected"),
        }
    }
}

impl FromStr for AdStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(AdStatus::Draft),
            "pending_moderation" => Ok(AdStatus::PendingModeration),
            "published" => Ok(AdStatus::Published),
            "rejected" => Ok(AdStatus::Rejected),
            other => Err(format!("unknown ad status '{other}'")),
        }
    }
}

/// A classified ad as submitted by a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ad {
    pub id: AdId,
    pub user_id: u64,
    pub category_id: CategoryId,
    /// Location snapshot taken when the ad was drafted.
    pub country: Option<String>,
    pub city: Option<String>,
    pub title: String,
    pub body: String,
    pub contacts: String,
    pub paid: bool,
    pub media_url: Option<String>,
    pub status: AdStatus,
    pub bump_count: u32,
    pub created_at: DateTime<Utc>,
}

/// Data needed to create a draft ad.
#[derive(Debug, Clone, Default)]
pub struct NewAd {
    pub user_id: u64,
    pub category_id: CategoryId,
    pub country: Option<String>,
    pub city: Option<String>,
    pub title: String,
    pub body: String,
    pub contacts: String,
    pub paid: bool,
    pub media_url: Option<String>,
}

/// Append-only record of one successful publish.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdPublication {
    pub id: PublicationId,
    pub ad_id: AdId,
    pub channel_id: ChannelId,
    pub message_id: u64,
    pub link: Option<String>,
    pub is_bump: bool,
    pub published_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewPublication {
    pub ad_id: AdId,
    pub channel_id: ChannelId,
    pub message_id: u64,
    pub link: Option<String>,
    pub is_bump: bool,
}

// ============================================================================
// STORAGE TRAIT (PORT)
// ============================================================================

#[async_trait]
pub trait AdStore: Send + Sync {
    async fn get_ad(&self, ad_id: AdId) -> Result<Option<Ad>, MarketplaceError>;

    /// Create a new ad in `Draft` status.
    async fn insert_ad(&self, ad: NewAd) -> Result<Ad, MarketplaceError>;

    async fn set_status(&self, ad_id: AdId, status: AdStatus) -> Result<(), MarketplaceError>;

    /// Increment the bump counter, returning the new value.
    async fn increment_bump(&self, ad_id: AdId) -> Result<u32, MarketplaceError>;

    async fn record_publication(
        &self,
        publication: NewPublication,
    ) -> Result<AdPublication, MarketplaceError>;

    async fn publications_for_ad(&self, ad_id: AdId)
        -> Result<Vec<AdPublication>, MarketplaceError>;
}

// ============================================================================
// AGGREGATE STATUS
// ============================================================================

/// Derive an ad's status from its children.
///
/// Anything live wins, so a later per-channel rejection never downgrades an
/// ad that is already published somewhere.
pub fn aggregate_status(
    publications: &[AdPublication],
    requests: &[ModerationRequest],
) -> AdStatus {
    if !publications.is_empty() {
        AdStatus::Published
    } else if requests
        .iter()
        .any(|r| r.status == RequestStatus::Pending)
    {
        AdStatus::PendingModeration
    } else {
        AdStatus::Rejected
    }
}

/// Recompute an ad's status from the stored rows and persist it.
pub async fn refresh_status<S>(store: &S, ad_id: AdId) -> Result<AdStatus, MarketplaceError>
where
    S: AdStore + ModerationStore + ?Sized,
{
    let publications = store.publications_for_ad(ad_id).await?;
    let requests = store.requests_for_ad(ad_id).await?;

    let status = aggregate_status(&publications, &requests);
    store.set_status(ad_id, status).await?;
    Ok(status)
}
