// Moderation ledger - decides review requests for moderated channels.
//
// This service handles:
// - Creating requests (at most one Pending per ad and channel)
// - Notifying every active reviewer about a new request
// - Approving (publish, then tell the submitter where it went)
// - Rejecting (with a reason the submitter gets to see)
//
// A decision first claims the request with a conditional write, so of two
// concurrent decisions exactly one proceeds. If the publish behind an
// approval fails, the claim is undone and the request is Pending again. If
// the post went out but could not be recorded, the claim stands.
//
// NO Discord dependencies here - just pure domain logic.

use super::moderation_models::{
    DecisionOutcome, ModerationRequest, RequestId, RequestStatus, DEFAULT_REJECT_REASON,
};
use crate::core::ads::{refresh_status, Ad};
use crate::core::catalog::{Category, Channel};
use crate::core::marketplace::{MarketplaceError, MarketplaceStore};
use crate::core::publication::{Notifier, PublicationError, PublishAction, ReviewAction};
use chrono::Utc;
use std::sync::Arc;
use thiserror::Error;

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum ModerationError {
    #[error(transparent)]
    Storage(#[from] MarketplaceError),
}

// ============================================================================
// CORE SERVICE
// ============================================================================

pub struct ModerationService<S: MarketplaceStore> {
    store: Arc<S>,
    publish: Arc<PublishAction<S>>,
    notifier: Arc<dyn Notifier>,
}

/// Everything a decision needs, loaded up front.
struct DecisionContext {
    ad: Ad,
    category: Category,
    channel: Channel,
}

impl<S: MarketplaceStore> ModerationService<S> {
    pub fn new(store: Arc<S>, publish: Arc<PublishAction<S>>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            store,
            publish,
            notifier,
        }
    }

    /// Queue an ad for review in one channel and tell the reviewers.
    ///
    /// Returns None if a request for this pair is already pending; nobody is
    /// notified twice in that case.
    pub async fn create_request(
        &self,
        ad: &Ad,
        channel: &Channel,
    ) -> Result<Option<ModerationRequest>, ModerationError> {
        let Some(request) = self.store.create_pending(ad.id, channel.id).await? else {
            tracing::debug!(
                ad_id = ad.id,
                channel_id = channel.id,
                "Request already pending, not creating another"
            );
            return Ok(None);
        };

        tracing::info!(
            request_id = request.id,
            ad_id = ad.id,
            channel_id = channel.id,
            "Moderation request created"
        );

        self.notify_reviewers(&request, ad, channel).await;
        Ok(Some(request))
    }

    async fn notify_reviewers(&self, request: &ModerationRequest, ad: &Ad, channel: &Channel) {
        let reviewers = match self.store.active_reviewers().await {
            Ok(reviewers) => reviewers,
            Err(e) => {
                tracing::warn!(request_id = request.id, error = %e, "Could not load reviewers");
                return;
            }
        };

        if reviewers.is_empty() {
            tracing::warn!(request_id = request.id, "No active reviewers to notify");
            return;
        }

        let text = review_text(request, ad, channel);
        for reviewer_id in reviewers {
            if let Err(e) = self
                .notifier
                .send_to_reviewer(
                    reviewer_id,
                    &text,
                    ReviewAction::Approve(request.id),
                    ReviewAction::Reject(request.id),
                )
                .await
            {
                tracing::warn!(
                    request_id = request.id,
                    reviewer_id,
                    error = %e,
                    "Failed to notify reviewer"
                );
            }
        }
    }

    pub async fn approve(
        &self,
        request_id: RequestId,
        decided_by: Option<u64>,
    ) -> Result<DecisionOutcome, ModerationError> {
        let ctx = match self.load(request_id).await? {
            Ok(ctx) => ctx,
            Err(outcome) => return Ok(outcome),
        };

        let claimed = self
            .store
            .decide(request_id, RequestStatus::Approved, decided_by, None, Utc::now())
            .await?;
        if !claimed {
            return self.lost_race(request_id).await;
        }

        let publication = match self
            .publish
            .publish(&ctx.ad, &ctx.category, &ctx.channel, false)
            .await
        {
            Ok(publication) => publication,
            Err(PublicationError::Delivery(e)) => {
                tracing::error!(
                    request_id,
                    channel_id = ctx.channel.id,
                    error = %e,
                    "Publish on approve failed, reopening request"
                );
                if !self.store.reopen(request_id).await? {
                    tracing::warn!(request_id, "Request could not be reopened");
                }
                // A concurrent decision may have recomputed the status while
                // this request was claimed.
                refresh_status(self.store.as_ref(), ctx.ad.id).await?;
                return Ok(DecisionOutcome::failure(format!(
                    "Publishing to {} failed, the request is pending again",
                    ctx.channel.title
                )));
            }
            // The message is live but untracked; reopening would let a retry post it twice.
            Err(PublicationError::Storage(e)) => return Err(e.into()),
            Err(PublicationError::Moderation(e)) => return Err(e),
        };

        let status = refresh_status(self.store.as_ref(), ctx.ad.id).await?;
        tracing::info!(
            request_id,
            ad_id = ctx.ad.id,
            ad_status = %status,
            decided_by = ?decided_by,
            "Moderation request approved"
        );

        let link = publication.link;
        let notice = match &link {
            Some(link) => format!(
                "✅ Your ad \"{}\" was approved and published in {}: {link}",
                ctx.ad.title, ctx.channel.title
            ),
            None => format!(
                "✅ Your ad \"{}\" was approved and published in {}",
                ctx.ad.title, ctx.channel.title
            ),
        };
        self.notify_user(ctx.ad.user_id, &notice).await;

        Ok(DecisionOutcome::success(
            format!("Approved and published in {}", ctx.channel.title),
            link,
        ))
    }

    pub async fn reject(
        &self,
        request_id: RequestId,
        decided_by: Option<u64>,
        reason: Option<&str>,
    ) -> Result<DecisionOutcome, ModerationError> {
        let ctx = match self.load(request_id).await? {
            Ok(ctx) => ctx,
            Err(outcome) => return Ok(outcome),
        };

        let reason = reason
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .unwrap_or(DEFAULT_REJECT_REASON);

        let decided = self
            .store
            .decide(
                request_id,
                RequestStatus::Rejected,
                decided_by,
                Some(reason),
                Utc::now(),
            )
            .await?;
        if !decided {
            return self.lost_race(request_id).await;
        }

        let status = refresh_status(self.store.as_ref(), ctx.ad.id).await?;
        tracing::info!(
            request_id,
            ad_id = ctx.ad.id,
            ad_status = %status,
            decided_by = ?decided_by,
            "Moderation request rejected"
        );

        self.notify_user(
            ctx.ad.user_id,
            &format!(
                "❌ Your ad \"{}\" was rejected for {}. Reason: {reason}",
                ctx.ad.title, ctx.channel.title
            ),
        )
        .await;

        Ok(DecisionOutcome::success(
            format!("Rejected for {}", ctx.channel.title),
            None,
        ))
    }

    pub async fn pending_requests(
        &self,
        limit: u32,
    ) -> Result<Vec<ModerationRequest>, ModerationError> {
        Ok(self.store.pending_requests(limit).await?)
    }

    /// Load the request and everything it points at.
    ///
    /// The inner Err is a ready-made outcome for the reviewer.
    async fn load(
        &self,
        request_id: RequestId,
    ) -> Result<Result<DecisionContext, DecisionOutcome>, ModerationError> {
        let Some(request) = self.store.get_request(request_id).await? else {
            return Ok(Err(DecisionOutcome::failure("Request not found")));
        };
        if request.status != RequestStatus::Pending {
            return Ok(Err(DecisionOutcome::already_decided(request.status)));
        }

        let Some(ad) = self.store.get_ad(request.ad_id).await? else {
            return Ok(Err(DecisionOutcome::failure("Ad not found")));
        };
        let Some(category) = self.store.get_category(ad.category_id).await? else {
            return Ok(Err(DecisionOutcome::failure("Category not found")));
        };
        let Some(channel) = self.store.get_channel(request.channel_id).await? else {
            return Ok(Err(DecisionOutcome::failure("Channel not found")));
        };

        Ok(Ok(DecisionContext {
            ad,
            category,
            channel,
        }))
    }

    async fn lost_race(&self, request_id: RequestId) -> Result<DecisionOutcome, ModerationError> {
        let Some(status) = self.store.get_request(request_id).await?.map(|r| r.status) else {
            return Ok(DecisionOutcome::failure("Request not found"));
        };

        tracing::debug!(request_id, status = %status, "Decision lost to a concurrent one");
        Ok(DecisionOutcome::already_decided(status))
    }

    async fn notify_user(&self, user_id: u64, text: &str) {
        if let Err(e) = self.notifier.send_to_user(user_id, text).await {
            tracing::warn!(user_id, error = %e, "Failed to notify submitter");
        }
    }
}

fn review_text(request: &ModerationRequest, ad: &Ad, channel: &Channel) -> String {
    format!(
        "📝 Review request #{} for {}\n\n**{}**\n{}\n\n📞 {}{}",
        request.id,
        channel.title,
        ad.title.trim(),
        ad.body.trim(),
        ad.contacts.trim(),
        if ad.paid { "\n💳 Paid" } else { "" },
    )
}
