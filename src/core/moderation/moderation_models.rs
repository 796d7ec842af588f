// Moderation domain models - per-channel review requests and their storage port.
//
// A request is created Pending and decided exactly once. Nothing here knows
// about Discord: the discord layer turns decisions into buttons and replies.

use crate::core::ads::AdId;
use crate::core::catalog::ChannelId;
use crate::core::marketplace::MarketplaceError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub type RequestId = i64;

/// Reason recorded when a reviewer rejects without giving one.
pub const DEFAULT_REJECT_REASON: &str = "The ad does not meet this channel's rules";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Approved => "approved",
            RequestStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RequestStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(RequestStatus::Pending),
            "approved" => Ok(RequestStatus::Approved),
            "rejected" => Ok(RequestStatus::Rejected),
            other => Err(format!("unknown request status '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModerationRequest {
    pub id: RequestId,
    pub ad_id: AdId,
    pub channel_id: ChannelId,
    pub status: RequestStatus,
    pub reject_reason: Option<String>,
    /// Reviewer who made the decision, if known.
    pub decided_by: Option<u64>,
    pub created_at: DateTime<Utc>,
    pub decided_at: Option<DateTime<Utc>>,
}

/// What a reviewer gets back after approving or rejecting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecisionOutcome {
    pub ok: bool,
    pub message: String,
    /// Someone else decided the request first.
    pub already_decided: bool,
    pub link: Option<String>,
}

impl DecisionOutcome {
    pub fn success(message: impl Into<String>, link: Option<String>) -> Self {
        Self {
            ok: true,
            message: message.into(),
            already_decided: false,
            link,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            message: message.into(),
            already_decided: false,
            link: None,
        }
    }

    pub fn already_decided(status: RequestStatus) -> Self {
        Self {
            ok: false,
            message: format!("Request was already decided ({status})"),
            already_decided: true,
            link: None,
        }
    }
}

// ============================================================================
// STORAGE TRAIT (PORT)
// ============================================================================

#[async_trait]
pub trait ModerationStore: Send + Sync {
    /// Create a Pending request for the pair.
    ///
    /// Returns None without writing anything when one is already pending.
    async fn create_pending(
        &self,
        ad_id: AdId,
        channel_id: ChannelId,
    ) -> Result<Option<ModerationRequest>, MarketplaceError>;

    async fn get_request(
        &self,
        request_id: RequestId,
    ) -> Result<Option<ModerationRequest>, MarketplaceError>;

    /// Move a Pending request to `status` in a single conditional write.
    ///
    /// Returns false if the request was no longer Pending.
    async fn decide(
        &self,
        request_id: RequestId,
        status: RequestStatus,
        decided_by: Option<u64>,
        reason: Option<&str>,
        at: DateTime<Utc>,
    ) -> Result<bool, MarketplaceError>;

    /// Return an Approved request to Pending after its publish failed.
    ///
    /// Returns false when the request is not Approved or another Pending
    /// request for the same pair appeared in the meantime.
    async fn reopen(&self, request_id: RequestId) -> Result<bool, MarketplaceError>;

    async fn requests_for_ad(
        &self,
        ad_id: AdId,
    ) -> Result<Vec<ModerationRequest>, MarketplaceError>;

    /// Oldest Pending requests first.
    async fn pending_requests(
        &self,
        limit: u32,
    ) -> Result<Vec<ModerationRequest>, MarketplaceError>;
}
