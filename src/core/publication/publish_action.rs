// The one publish path shared by auto channels, bumps and approvals.

use super::delivery::{DeliveryError, Publisher};
use crate::core::ads::{Ad, AdPublication, AdRenderer, AdStore, NewPublication};
use crate::core::catalog::{Category, Channel};
use crate::core::marketplace::MarketplaceError;
use crate::core::moderation::ModerationError;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PublicationError {
    #[error(transparent)]
    Storage(#[from] MarketplaceError),

    #[error(transparent)]
    Delivery(#[from] DeliveryError),

    #[error(transparent)]
    Moderation(#[from] ModerationError),
}

/// Render, publish, record.
pub struct PublishAction<S: AdStore> {
    store: Arc<S>,
    publisher: Arc<dyn Publisher>,
    renderer: Arc<dyn AdRenderer>,
}

impl<S: AdStore> PublishAction<S> {
    pub fn new(store: Arc<S>, publisher: Arc<dyn Publisher>, renderer: Arc<dyn AdRenderer>) -> Self {
        Self {
            store,
            publisher,
            renderer,
        }
    }

    pub async fn publish(
        &self,
        ad: &Ad,
        category: &Category,
        channel: &Channel,
        is_bump: bool,
    ) -> Result<AdPublication, PublicationError> {
        let text = self.renderer.render(ad, category, channel, is_bump);
        let message = self
            .publisher
            .publish(ad, category, channel, &text, is_bump)
            .await?;

        let publication = self
            .store
            .record_publication(NewPublication {
                ad_id: ad.id,
                channel_id: channel.id,
                message_id: message.message_id,
                link: message.link,
                is_bump,
            })
            .await
            .map_err(|e| {
                // The message is live but untracked at this point.
                tracing::error!(
                    ad_id = ad.id,
                    channel_id = channel.id,
                    message_id = message.message_id,
                    error = %e,
                    "Failed to record publication"
                );
                e
            })?;

        tracing::info!(
            ad_id = ad.id,
            channel_id = channel.id,
            is_bump,
            "Ad published"
        );
        Ok(publication)
    }
}
