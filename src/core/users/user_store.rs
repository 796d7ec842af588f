// Users as seen by the pipeline: quota overrides and reviewer membership.
//
// User records belong to the front end; the core only reads the quota flags,
// consumes bonus placements, and looks up who reviews moderated channels.

use crate::core::marketplace::MarketplaceError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub user_id: u64,
    pub display_name: String,
    /// Skips the free-submission quota entirely.
    pub unlimited: bool,
    /// Extra free placements usable once the period quota is exhausted.
    pub bonus_balance: i64,
    pub reviewer: bool,
}

impl User {
    pub fn new(user_id: u64, display_name: impl Into<String>) -> Self {
        Self {
            user_id,
            display_name: display_name.into(),
            unlimited: false,
            bonus_balance: 0,
            reviewer: false,
        }
    }
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn get_user(&self, user_id: u64) -> Result<Option<User>, MarketplaceError>;

    /// Fetch a user, creating a plain record on first contact.
    async fn ensure_user(&self, user_id: u64, display_name: &str)
        -> Result<User, MarketplaceError>;

    /// Decrement the bonus balance by one if it is positive.
    ///
    /// Returns false when there was nothing to consume.
    async fn consume_bonus(&self, user_id: u64) -> Result<bool, MarketplaceError>;

    async fn active_reviewers(&self) -> Result<Vec<u64>, MarketplaceError>;
}
