// Delivery ports - how the pipeline reaches the chat platform.
//
// The core never talks to Discord directly. Posting into a channel, checking
// channel membership and messaging users all go through these traits, which
// the discord layer implements and the tests fake.

use crate::core::ads::Ad;
use crate::core::catalog::{Category, Channel};
use crate::core::moderation::RequestId;
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("Publish failed: {0}")]
    Publish(String),

    #[error("Notification failed: {0}")]
    Notify(String),
}

/// Identity of a message the publisher posted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedMessage {
    pub message_id: u64,
    pub link: Option<String>,
}

#[async_trait]
pub trait Publisher: Send + Sync {
    /// Post rendered ad text into a channel.
    ///
    /// Called at most once per successful (ad, channel) publish attempt.
    async fn publish(
        &self,
        ad: &Ad,
        category: &Category,
        channel: &Channel,
        text: &str,
        is_bump: bool,
    ) -> Result<PublishedMessage, DeliveryError>;
}

#[async_trait]
pub trait SubscriptionChecker: Send + Sync {
    /// Whether the user is a member of the channel behind `channel_handle`.
    ///
    /// Implementations return false on any lookup failure.
    async fn is_member(&self, user_id: u64, channel_handle: &str) -> bool;
}

/// A reviewer decision attached to a notification, e.g. as a button.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewAction {
    Approve(RequestId),
    Reject(RequestId),
}

const ACTION_PREFIX: &str = "modreq";

impl ReviewAction {
    pub fn request_id(&self) -> RequestId {
        match self {
            ReviewAction::Approve(id) | ReviewAction::Reject(id) => *id,
        }
    }

    /// Stable identifier for the action, `modreq:<verb>:<request id>`.
    pub fn custom_id(&self) -> String {
        match self {
            ReviewAction::Approve(id) => format!("{ACTION_PREFIX}:approve:{id}"),
            ReviewAction::Reject(id) => format!("{ACTION_PREFIX}:reject:{id}"),
        }
    }

    pub fn parse(custom_id: &str) -> Option<Self> {
        let mut parts = custom_id.splitn(3, ':');
        if parts.next()? != ACTION_PREFIX {
            return None;
        }
        let verb = parts.next()?;
        let id: RequestId = parts.next()?.parse().ok()?;

        match verb {
            "approve" => Some(ReviewAction::Approve(id)),
            "reject" => Some(ReviewAction::Reject(id)),
            _ => None,
        }
    }
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_to_user(&self, user_id: u64, text: &str) -> Result<(), DeliveryError>;

    async fn send_to_reviewer(
        &self,
        reviewer_id: u64,
        text: &str,
        approve: ReviewAction,
        reject: ReviewAction,
    ) -> Result<(), DeliveryError>;
}
