// Shared storage error and the aggregate store bound used by the pipeline.
//
// Every feature module defines its own storage trait (port). The publication
// pipeline and the moderation ledger touch all of them, so instead of carrying
// five generic parameters around we bundle them into one supertrait with a
// blanket impl. Any type implementing every port is a MarketplaceStore.

use super::ads::AdStore;
use super::catalog::CatalogStore;
use super::moderation::ModerationStore;
use super::quota::QuotaStore;
use super::users::UserStore;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MarketplaceError {
    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Invalid catalog: {0}")]
    InvalidCatalog(String),
}

/// Everything the publication pipeline and moderation ledger need from storage.
pub trait MarketplaceStore:
    AdStore + CatalogStore + ModerationStore + QuotaStore + UserStore + 'static
{
}

impl<T> MarketplaceStore for T where
    T: AdStore + CatalogStore + ModerationStore + QuotaStore + UserStore + 'static
{
}
