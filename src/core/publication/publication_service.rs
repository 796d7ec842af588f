// Publication pipeline - takes a drafted ad and fans it out to its channels.
//
// Submission runs ordered gates. The first five are hard stops for the whole
// submission:
// 1. user and ad exist, and the ad belongs to the user
// 2. global subscription requirement
// 3. free quota (unpaid ads)
// 4. global content guard (unpaid ads)
// 5. at least one destination channel
//
// After that every channel is handled on its own. A channel whose
// subscription or spam filter check fails is skipped, not fatal. Auto
// channels publish right away, moderated ones get a review request. The ad's
// status is then recomputed from what actually happened, and the free quota
// is charged once if anything was accepted.
//
// NO Discord dependencies here - just pure domain logic.

use super::delivery::SubscriptionChecker;
use super::publish_action::{PublicationError, PublishAction};
use crate::core::ads::{refresh_status, Ad, AdId, AdStatus};
use crate::core::catalog::{Category, Channel, ChannelResolver, ModerationMode};
use crate::core::content_guard::ContentGuard;
use crate::core::marketplace::MarketplaceStore;
use crate::core::moderation::ModerationService;
use crate::core::quota::{Allowance, QuotaService};
use crate::core::settings::{SettingsStore, CONTENT_GUARD_ENABLED, REQUIRED_SUBSCRIPTION};
use std::sync::Arc;

// ============================================================================
// DOMAIN MODELS
// ============================================================================

/// The single consolidated answer to a submit or bump.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitOutcome {
    pub ok: bool,
    pub message: String,
    pub published_links: Vec<String>,
    pub published_count: usize,
    pub pending_count: usize,
}

impl SubmitOutcome {
    fn rejected(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            message: message.into(),
            published_links: Vec::new(),
            published_count: 0,
            pending_count: 0,
        }
    }
}

#[derive(Default)]
struct FanOut {
    links: Vec<String>,
    published: usize,
    /// Requests opened by this submission.
    pending: usize,
    /// Requests already pending from an earlier attempt.
    waiting: usize,
}

// ============================================================================
// CORE SERVICE
// ============================================================================

pub struct PublicationService<S: MarketplaceStore> {
    store: Arc<S>,
    settings: Arc<dyn SettingsStore>,
    resolver: ChannelResolver<S>,
    quota: QuotaService<S>,
    guard: Arc<ContentGuard>,
    subscriptions: Arc<dyn SubscriptionChecker>,
    publish: Arc<PublishAction<S>>,
    moderation: Arc<ModerationService<S>>,
}

impl<S: MarketplaceStore> PublicationService<S> {
    pub fn new(
        store: Arc<S>,
        settings: Arc<dyn SettingsStore>,
        guard: Arc<ContentGuard>,
        subscriptions: Arc<dyn SubscriptionChecker>,
        publish: Arc<PublishAction<S>>,
        moderation: Arc<ModerationService<S>>,
    ) -> Self {
        Self {
            resolver: ChannelResolver::new(Arc::clone(&store)),
            quota: QuotaService::new(Arc::clone(&store), Arc::clone(&settings)),
            store,
            settings,
            guard,
            subscriptions,
            publish,
            moderation,
        }
    }

    pub fn quota(&self) -> &QuotaService<S> {
        &self.quota
    }

    pub async fn submit(&self, user_id: u64, ad_id: AdId) -> Result<SubmitOutcome, PublicationError> {
        let (ad, category) = match self.load_owned(user_id, ad_id).await? {
            Ok(loaded) => loaded,
            Err(outcome) => return Ok(outcome),
        };

        // Published and pending ads already hold placements.
        let refusal = match ad.status {
            AdStatus::Draft | AdStatus::Rejected => None,
            AdStatus::Published => {
                Some("This ad is already published. Use /ad bump to post it again")
            }
            AdStatus::PendingModeration => Some("This ad is already awaiting moderation"),
        };
        if let Some(message) = refusal {
            tracing::info!(ad_id, status = %ad.status, "Submission blocked: already submitted");
            return Ok(SubmitOutcome::rejected(message));
        }

        let global_target = self.global_subscription_target().await;
        if let Some(target) = &global_target {
            if !self.subscriptions.is_member(user_id, target).await {
                tracing::info!(
                    user_id,
                    ad_id,
                    subscription = %target,
                    "Submission blocked: not subscribed"
                );
                return Ok(SubmitOutcome::rejected(format!(
                    "Please subscribe to {target} before submitting ads"
                )));
            }
        }

        let allowance = if ad.paid {
            None
        } else {
            let allowance = self.quota.check_free_allowance(user_id).await?;
            if !allowance.allowed {
                tracing::info!(
                    user_id,
                    ad_id,
                    used = allowance.used,
                    limit = allowance.limit,
                    "Submission blocked: free quota exhausted"
                );
                return Ok(SubmitOutcome::rejected(format!(
                    "Free ad limit reached: {} of {} used this {}",
                    allowance.used, allowance.limit, allowance.period_label
                )));
            }
            Some(allowance)
        };

        if !ad.paid && self.settings.get_bool(CONTENT_GUARD_ENABLED, true).await {
            if let Some(field) = self.guard.check_ad(&ad) {
                tracing::info!(user_id, ad_id, field, "Submission blocked by content guard");
                return Ok(SubmitOutcome::rejected(format!(
                    "The {field} of your ad links to another platform, which is only allowed in paid ads"
                )));
            }
        }

        let channels = self.resolver.resolve_channels(category.id).await?;
        if channels.is_empty() {
            tracing::warn!(ad_id, category_id = category.id, "No destinations configured");
            return Ok(SubmitOutcome::rejected(
                "No destinations are configured for this category",
            ));
        }

        // Tentative; the recompute below has the final word.
        self.store
            .set_status(ad.id, AdStatus::PendingModeration)
            .await?;

        let mut fan_out = FanOut::default();
        for channel in &channels {
            if !self
                .channel_accepts(&ad, channel, global_target.as_deref())
                .await
            {
                continue;
            }

            match channel.mode {
                ModerationMode::Auto => {
                    match self.publish.publish(&ad, &category, channel, false).await {
                        Ok(publication) => {
                            fan_out.published += 1;
                            fan_out.links.extend(publication.link);
                        }
                        Err(e) => {
                            tracing::warn!(
                                ad_id,
                                channel_id = channel.id,
                                error = %e,
                                "Publish failed, skipping channel"
                            );
                        }
                    }
                }
                ModerationMode::Moderated => {
                    match self.moderation.create_request(&ad, channel).await? {
                        Some(_) => fan_out.pending += 1,
                        None => fan_out.waiting += 1,
                    }
                }
            }
        }

        let status = refresh_status(self.store.as_ref(), ad.id).await?;
        let accepted = fan_out.published > 0 || fan_out.pending > 0 || fan_out.waiting > 0;

        tracing::info!(
            user_id,
            ad_id,
            channels = channels.len(),
            published = fan_out.published,
            pending = fan_out.pending,
            waiting = fan_out.waiting,
            status = %status,
            "Submission processed"
        );

        if !accepted {
            return Ok(SubmitOutcome::rejected(
                "No channel accepted the ad. Check the channel rules and subscriptions",
            ));
        }

        let used_bonus = self.charge_quota(user_id, allowance.as_ref()).await?;

        let mut message = summary(fan_out.published, fan_out.pending, fan_out.waiting);
        if used_bonus {
            message.push_str(". A bonus placement was used");
        }

        Ok(SubmitOutcome {
            ok: true,
            message,
            published_links: fan_out.links,
            published_count: fan_out.published,
            pending_count: fan_out.pending + fan_out.waiting,
        })
    }

    /// Re-publish an already published ad into its auto channels.
    ///
    /// Global gates are not re-run; per-channel gates are.
    pub async fn bump(&self, user_id: u64, ad_id: AdId) -> Result<SubmitOutcome, PublicationError> {
        let (ad, category) = match self.load_owned(user_id, ad_id).await? {
            Ok(loaded) => loaded,
            Err(outcome) => return Ok(outcome),
        };

        if ad.status != AdStatus::Published {
            return Ok(SubmitOutcome::rejected("Only published ads can be bumped"));
        }

        let global_target = self.global_subscription_target().await;
        let channels = self.resolver.resolve_channels(category.id).await?;

        let mut fan_out = FanOut::default();
        for channel in channels.iter().filter(|c| c.mode == ModerationMode::Auto) {
            if !self
                .channel_accepts(&ad, channel, global_target.as_deref())
                .await
            {
                continue;
            }

            match self.publish.publish(&ad, &category, channel, true).await {
                Ok(publication) => {
                    fan_out.published += 1;
                    fan_out.links.extend(publication.link);
                }
                Err(e) => {
                    tracing::warn!(
                        ad_id,
                        channel_id = channel.id,
                        error = %e,
                        "Bump publish failed, skipping channel"
                    );
                }
            }
        }

        if fan_out.published == 0 {
            return Ok(SubmitOutcome::rejected("No channel accepted the bump"));
        }

        let bumps = self.store.increment_bump(ad.id).await?;
        tracing::info!(user_id, ad_id, bumps, published = fan_out.published, "Ad bumped");

        Ok(SubmitOutcome {
            ok: true,
            message: format!("Bumped in {} channel(s)", fan_out.published),
            published_links: fan_out.links,
            published_count: fan_out.published,
            pending_count: 0,
        })
    }

    /// Gate 1: the user and the ad exist and the ad is theirs.
    async fn load_owned(
        &self,
        user_id: u64,
        ad_id: AdId,
    ) -> Result<Result<(Ad, Category), SubmitOutcome>, PublicationError> {
        if self.store.get_user(user_id).await?.is_none() {
            return Ok(Err(SubmitOutcome::rejected("Unknown user")));
        }

        let ad = match self.store.get_ad(ad_id).await? {
            Some(ad) if ad.user_id == user_id => ad,
            Some(_) => {
                tracing::warn!(user_id, ad_id, "Ad does not belong to the user");
                return Ok(Err(SubmitOutcome::rejected("Ad not found")));
            }
            None => return Ok(Err(SubmitOutcome::rejected("Ad not found"))),
        };

        let Some(category) = self.store.get_category(ad.category_id).await? else {
            return Ok(Err(SubmitOutcome::rejected("The ad's category no longer exists")));
        };

        Ok(Ok((ad, category)))
    }

    async fn global_subscription_target(&self) -> Option<String> {
        let target = self.settings.get_string(REQUIRED_SUBSCRIPTION, "").await;
        (!target.is_empty()).then_some(target)
    }

    /// Per-channel soft gates. A false here skips only this channel.
    async fn channel_accepts(&self, ad: &Ad, channel: &Channel, global_target: Option<&str>) -> bool {
        if channel.require_subscription {
            let Some(target) = channel.subscription_target(global_target) else {
                tracing::warn!(channel_id = channel.id, "Subscription required but no target known");
                return false;
            };
            if !self.subscriptions.is_member(ad.user_id, target).await {
                tracing::info!(
                    ad_id = ad.id,
                    channel_id = channel.id,
                    subscription = target,
                    "Skipping channel: not subscribed"
                );
                return false;
            }
        }

        if channel.filters_ad(ad.paid) {
            if let Some(field) = self.guard.check_ad(ad) {
                tracing::info!(
                    ad_id = ad.id,
                    channel_id = channel.id,
                    field,
                    "Skipping channel: spam filter"
                );
                return false;
            }
        }

        true
    }

    /// Gate 10: charge exactly once. Returns whether a bonus was spent.
    async fn charge_quota(
        &self,
        user_id: u64,
        allowance: Option<&Allowance>,
    ) -> Result<bool, PublicationError> {
        match allowance {
            Some(allowance) if !allowance.unlimited => {
                self.quota
                    .register_consumption(user_id, allowance.uses_bonus)
                    .await?;
                Ok(allowance.uses_bonus)
            }
            _ => Ok(false),
        }
    }
}

fn summary(published: usize, pending: usize, waiting: usize) -> String {
    let mut parts = Vec::new();
    if published > 0 {
        parts.push(format!("published in {published} channel(s)"));
    }
    if pending > 0 {
        parts.push(format!("sent for moderation in {pending} channel(s)"));
    }
    if waiting > 0 {
        parts.push(format!("still awaiting moderation in {waiting} channel(s)"));
    }

    let text = parts.join(", ");
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ads::{AdStore, DefaultAdRenderer, NewAd};
    use crate::core::moderation::{ModerationStore, RequestStatus};
    use crate::core::quota::{QuotaStore, FREE_AD_COUNTER};
    use crate::core::settings::{QUOTA_FREE_LIMIT, QUOTA_PERIOD};
    use crate::core::users::{User, UserStore};
    use crate::infra::delivery::{RecordingNotifier, RecordingPublisher, StaticSubscriptions};
    use crate::infra::marketplace::InMemoryMarketplaceStore;
    use crate::infra::settings::InMemorySettingsStore;

    const SELLER: u64 = 1;
    const REVIEWER: u64 = 900;

    struct Fixture {
        store: Arc<InMemoryMarketplaceStore>,
        settings: Arc<InMemorySettingsStore>,
        publisher: Arc<RecordingPublisher>,
        subscriptions: Arc<StaticSubscriptions>,
        moderation: Arc<ModerationService<InMemoryMarketplaceStore>>,
        pipeline: PublicationService<InMemoryMarketplaceStore>,
        category: Category,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(InMemoryMarketplaceStore::new());
        let settings = Arc::new(InMemorySettingsStore::new());
        let publisher = Arc::new(RecordingPublisher::new());
        let notifier = Arc::new(RecordingNotifier::new());
        let subscriptions = Arc::new(StaticSubscriptions::new());

        store.add_user(User::new(SELLER, "seller"));
        let mut reviewer = User::new(REVIEWER, "reviewer");
        reviewer.reviewer = true;
        store.add_user(reviewer);

        let category = store.add_category("Electronics", "electronics", None);

        let publish = Arc::new(PublishAction::new(
            Arc::clone(&store),
            publisher.clone(),
            Arc::new(DefaultAdRenderer),
        ));
        let moderation = Arc::new(ModerationService::new(
            Arc::clone(&store),
            Arc::clone(&publish),
            notifier,
        ));
        let pipeline = PublicationService::new(
            Arc::clone(&store),
            settings.clone(),
            Arc::new(ContentGuard::default()),
            subscriptions.clone(),
            publish,
            Arc::clone(&moderation),
        );

        Fixture {
            store,
            settings,
            publisher,
            subscriptions,
            moderation,
            pipeline,
            category,
        }
    }

    impl Fixture {
        fn channel(&self, handle: &str, mode: ModerationMode) -> Channel {
            let channel = self.store.add_channel(handle, handle, mode);
            self.store.link(self.category.id, channel.id, true);
            channel
        }

        async fn draft(&self, contacts: &str, paid: bool) -> Ad {
            self.store
                .insert_ad(NewAd {
                    user_id: SELLER,
                    category_id: self.category.id,
                    city: Some("Riga".to_string()),
                    title: "Used laptop".to_string(),
                    body: "16GB RAM, works fine".to_string(),
                    contacts: contacts.to_string(),
                    paid,
                    ..NewAd::default()
                })
                .await
                .unwrap()
        }

        async fn status(&self, ad_id: AdId) -> AdStatus {
            self.store.get_ad(ad_id).await.unwrap().unwrap().status
        }

        async fn free_used_today(&self) -> i64 {
            let today = self.pipeline.quota().policy().await.today();
            self.store
                .count_between(SELLER, FREE_AD_COUNTER, today, today)
                .await
                .unwrap()
        }
    }

    #[tokio::test]
    async fn auto_and_moderated_channels_end_to_end() {
        let f = fixture();
        f.channel("100", ModerationMode::Auto);
        f.channel("200", ModerationMode::Moderated);
        let ad = f.draft("call 555-0100", false).await;

        let outcome = f.pipeline.submit(SELLER, ad.id).await.unwrap();

        assert!(outcome.ok, "{}", outcome.message);
        assert_eq!(outcome.published_links.len(), 1);
        assert_eq!(outcome.pending_count, 1);

        let requests = f.store.requests_for_ad(ad.id).await.unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].status, RequestStatus::Pending);
        assert_eq!(f.status(ad.id).await, AdStatus::Published);
        assert_eq!(f.free_used_today().await, 1);
    }

    #[tokio::test]
    async fn later_rejections_never_downgrade_a_published_ad() {
        let f = fixture();
        f.channel("100", ModerationMode::Auto);
        f.channel("200", ModerationMode::Moderated);
        f.channel("300", ModerationMode::Moderated);
        let ad = f.draft("call 555-0100", false).await;

        let outcome = f.pipeline.submit(SELLER, ad.id).await.unwrap();
        assert_eq!(outcome.pending_count, 2);
        assert_eq!(f.status(ad.id).await, AdStatus::Published);

        for request in f.store.requests_for_ad(ad.id).await.unwrap() {
            let decision = f
                .moderation
                .reject(request.id, Some(REVIEWER), None)
                .await
                .unwrap();
            assert!(decision.ok);
        }

        assert_eq!(f.status(ad.id).await, AdStatus::Published);
    }

    #[tokio::test]
    async fn moderated_only_is_pending_until_approved() {
        let f = fixture();
        f.channel("200", ModerationMode::Moderated);
        let ad = f.draft("call 555-0100", false).await;

        let outcome = f.pipeline.submit(SELLER, ad.id).await.unwrap();
        assert!(outcome.ok);
        assert!(outcome.published_links.is_empty());
        assert_eq!(f.status(ad.id).await, AdStatus::PendingModeration);

        let request = f.store.pending_requests(10).await.unwrap().remove(0);
        f.moderation.approve(request.id, Some(REVIEWER)).await.unwrap();
        assert_eq!(f.status(ad.id).await, AdStatus::Published);
    }

    #[tokio::test]
    async fn someone_elses_ad_is_refused() {
        let f = fixture();
        f.channel("100", ModerationMode::Auto);
        f.store.add_user(User::new(2, "intruder"));
        let ad = f.draft("call 555-0100", false).await;

        let outcome = f.pipeline.submit(2, ad.id).await.unwrap();

        assert!(!outcome.ok);
        assert!(f.publisher.published().is_empty());
        assert_eq!(f.status(ad.id).await, AdStatus::Draft);
    }

    #[tokio::test]
    async fn global_subscription_gate() {
        let f = fixture();
        f.channel("100", ModerationMode::Auto);
        f.settings.set(REQUIRED_SUBSCRIPTION, "news");
        let ad = f.draft("call 555-0100", false).await;

        let blocked = f.pipeline.submit(SELLER, ad.id).await.unwrap();
        assert!(!blocked.ok);
        assert!(blocked.message.contains("news"));

        f.subscriptions.grant(SELLER, "news");
        let allowed = f.pipeline.submit(SELLER, ad.id).await.unwrap();
        assert!(allowed.ok);
    }

    #[tokio::test]
    async fn quota_applies_to_free_ads_only() {
        let f = fixture();
        f.channel("100", ModerationMode::Auto);
        f.settings.set(QUOTA_PERIOD, "day");
        f.settings.set(QUOTA_FREE_LIMIT, "1");

        let first = f.draft("call 555-0100", false).await;
        let second = f.draft("call 555-0100", false).await;
        let paid = f.draft("call 555-0100", true).await;

        assert!(f.pipeline.submit(SELLER, first.id).await.unwrap().ok);
        let denied = f.pipeline.submit(SELLER, second.id).await.unwrap();
        assert!(!denied.ok);
        assert!(denied.message.contains("1 of 1"));

        assert!(f.pipeline.submit(SELLER, paid.id).await.unwrap().ok);
        assert_eq!(f.free_used_today().await, 1);
    }

    #[tokio::test]
    async fn bonus_covers_an_exhausted_quota() {
        let f = fixture();
        f.channel("100", ModerationMode::Auto);
        let mut seller = User::new(SELLER, "seller");
        seller.bonus_balance = 1;
        f.store.add_user(seller);

        let first = f.draft("call 555-0100", false).await;
        let second = f.draft("call 555-0100", false).await;
        assert!(f.pipeline.submit(SELLER, first.id).await.unwrap().ok);

        let outcome = f.pipeline.submit(SELLER, second.id).await.unwrap();
        assert!(outcome.ok);
        assert!(outcome.message.contains("bonus"));

        let seller = f.store.get_user(SELLER).await.unwrap().unwrap();
        assert_eq!(seller.bonus_balance, 0);
        assert_eq!(f.free_used_today().await, 1);
    }

    #[tokio::test]
    async fn global_guard_blocks_free_ads_with_links() {
        let f = fixture();
        f.channel("100", ModerationMode::Auto);
        let ad = f.draft("t . me/seller", false).await;

        let outcome = f.pipeline.submit(SELLER, ad.id).await.unwrap();

        assert!(!outcome.ok);
        assert!(outcome.message.contains("contacts"));
        assert_eq!(f.free_used_today().await, 0);
    }

    #[tokio::test]
    async fn global_guard_can_be_disabled() {
        let f = fixture();
        f.channel("100", ModerationMode::Auto);
        f.settings.set(CONTENT_GUARD_ENABLED, "false");
        let ad = f.draft("t.me/seller", false).await;

        assert!(f.pipeline.submit(SELLER, ad.id).await.unwrap().ok);
    }

    #[tokio::test]
    async fn channel_spam_filter_skips_only_that_channel() {
        let f = fixture();
        let mut strict = f.channel("100", ModerationMode::Auto);
        strict.spam_filter = true;
        strict.spam_filter_free_only = false;
        f.store.update_channel(strict.clone());
        let mut lenient = f.channel("200", ModerationMode::Auto);
        lenient.spam_filter = true;
        lenient.spam_filter_free_only = true;
        f.store.update_channel(lenient.clone());

        // Paid ads skip the global guard and free-only filters.
        let ad = f.draft("wa.me/123", true).await;
        let outcome = f.pipeline.submit(SELLER, ad.id).await.unwrap();

        assert!(outcome.ok);
        let channels: Vec<_> = f
            .publisher
            .published()
            .into_iter()
            .map(|(_, channel_id, _)| channel_id)
            .collect();
        assert_eq!(channels, vec![lenient.id]);
    }

    #[tokio::test]
    async fn channel_subscription_falls_back_to_own_handle() {
        let f = fixture();
        let mut members_only = f.channel("100", ModerationMode::Auto);
        members_only.require_subscription = true;
        f.store.update_channel(members_only.clone());
        let mut with_target = f.channel("200", ModerationMode::Auto);
        with_target.require_subscription = true;
        with_target.subscription_channel = Some("club".to_string());
        f.store.update_channel(with_target.clone());

        f.subscriptions.grant(SELLER, "100");
        let ad = f.draft("call 555-0100", false).await;
        let outcome = f.pipeline.submit(SELLER, ad.id).await.unwrap();

        assert!(outcome.ok);
        assert_eq!(outcome.published_count, 1);
        let published = f.publisher.published();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].1, members_only.id);
    }

    #[tokio::test]
    async fn nothing_accepted_is_rejected_without_charging() {
        let f = fixture();
        let mut gated = f.channel("100", ModerationMode::Auto);
        gated.require_subscription = true;
        f.store.update_channel(gated);
        let ad = f.draft("call 555-0100", false).await;

        let outcome = f.pipeline.submit(SELLER, ad.id).await.unwrap();

        assert!(!outcome.ok);
        assert_eq!(f.status(ad.id).await, AdStatus::Rejected);
        assert_eq!(f.free_used_today().await, 0);
    }

    #[tokio::test]
    async fn no_destinations_is_a_hard_stop() {
        let f = fixture();
        let ad = f.draft("call 555-0100", false).await;

        let outcome = f.pipeline.submit(SELLER, ad.id).await.unwrap();

        assert!(!outcome.ok);
        assert_eq!(f.status(ad.id).await, AdStatus::Draft);
    }

    #[tokio::test]
    async fn failing_channel_does_not_stop_the_others() {
        let f = fixture();
        let broken = f.channel("100", ModerationMode::Auto);
        f.channel("200", ModerationMode::Auto);
        f.publisher.fail_channel(broken.id);
        let ad = f.draft("call 555-0100", false).await;

        let outcome = f.pipeline.submit(SELLER, ad.id).await.unwrap();

        assert!(outcome.ok);
        assert_eq!(outcome.published_count, 1);
        assert_eq!(f.store.publications_for_ad(ad.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn resubmission_does_not_duplicate_pending_requests() {
        let f = fixture();
        f.channel("200", ModerationMode::Moderated);
        let ad = f.draft("call 555-0100", true).await;

        assert!(f.pipeline.submit(SELLER, ad.id).await.unwrap().ok);
        let again = f.pipeline.submit(SELLER, ad.id).await.unwrap();

        assert!(!again.ok);
        assert!(again.message.contains("awaiting moderation"));
        assert_eq!(f.store.requests_for_ad(ad.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn published_ad_is_not_submitted_twice() {
        let f = fixture();
        f.channel("100", ModerationMode::Auto);
        f.settings.set(QUOTA_FREE_LIMIT, "5");
        let ad = f.draft("call 555-0100", false).await;

        let first = f.pipeline.submit(SELLER, ad.id).await.unwrap();
        let second = f.pipeline.submit(SELLER, ad.id).await.unwrap();

        assert!(first.ok);
        assert!(!second.ok);
        assert!(second.message.contains("/ad bump"));
        assert_eq!(f.publisher.published().len(), 1);
        assert_eq!(f.store.publications_for_ad(ad.id).await.unwrap().len(), 1);
        assert_eq!(f.free_used_today().await, 1);
    }

    #[tokio::test]
    async fn rejected_ad_can_be_submitted_again() {
        let f = fixture();
        let mut gated = f.channel("100", ModerationMode::Auto);
        gated.require_subscription = true;
        f.store.update_channel(gated.clone());
        let ad = f.draft("call 555-0100", false).await;

        assert!(!f.pipeline.submit(SELLER, ad.id).await.unwrap().ok);
        assert_eq!(f.status(ad.id).await, AdStatus::Rejected);

        f.subscriptions.grant(SELLER, "100");
        assert!(f.pipeline.submit(SELLER, ad.id).await.unwrap().ok);
        assert_eq!(f.status(ad.id).await, AdStatus::Published);
    }

    #[tokio::test]
    async fn earlier_pending_request_reads_as_still_waiting() {
        let f = fixture();
        let channel = f.channel("200", ModerationMode::Moderated);
        let ad = f.draft("call 555-0100", true).await;
        f.store.create_pending(ad.id, channel.id).await.unwrap();

        let outcome = f.pipeline.submit(SELLER, ad.id).await.unwrap();

        assert!(outcome.ok);
        assert_eq!(outcome.pending_count, 1);
        assert_eq!(outcome.message, "Still awaiting moderation in 1 channel(s)");
        assert_eq!(f.store.requests_for_ad(ad.id).await.unwrap().len(), 1);
    }

    #[test]
    fn summary_names_each_kind_of_placement() {
        assert_eq!(summary(2, 0, 0), "Published in 2 channel(s)");
        assert_eq!(
            summary(1, 1, 1),
            "Published in 1 channel(s), sent for moderation in 1 channel(s), \
             still awaiting moderation in 1 channel(s)"
        );
        assert_eq!(summary(0, 3, 0), "Sent for moderation in 3 channel(s)");
    }

    #[tokio::test]
    async fn bump_targets_auto_channels_only() {
        let f = fixture();
        let auto = f.channel("100", ModerationMode::Auto);
        f.channel("200", ModerationMode::Moderated);
        let ad = f.draft("call 555-0100", false).await;

        let early = f.pipeline.bump(SELLER, ad.id).await.unwrap();
        assert!(!early.ok);

        f.pipeline.submit(SELLER, ad.id).await.unwrap();
        let outcome = f.pipeline.bump(SELLER, ad.id).await.unwrap();

        assert!(outcome.ok);
        assert_eq!(outcome.published_count, 1);
        assert_eq!(f.store.requests_for_ad(ad.id).await.unwrap().len(), 1);

        let bumps: Vec<_> = f
            .publisher
            .published()
            .into_iter()
            .filter(|(_, _, is_bump)| *is_bump)
            .collect();
        assert_eq!(bumps, vec![(ad.id, auto.id, true)]);

        let stored = f.store.get_ad(ad.id).await.unwrap().unwrap();
        assert_eq!(stored.bump_count, 1);
        assert_eq!(f.free_used_today().await, 1);
    }
}
