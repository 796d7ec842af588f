// In-memory implementation of every marketplace port, for tests.
//
// Same contract as the SQLite store, including the atomic bits: moderation
// requests live behind one mutex so "is it still pending?" and the status flip
// happen under the same lock, and bonus consumption is a check-and-decrement
// on a single DashMap entry.

use crate::core::ads::{Ad, AdId, AdPublication, AdStatus, AdStore, NewAd, NewPublication};
use crate::core::catalog::{
    CatalogStore, Category, CategoryChannel, CategoryId, Channel, ChannelId, ModerationMode,
};
use crate::core::marketplace::MarketplaceError;
use crate::core::moderation::{ModerationRequest, ModerationStore, RequestId, RequestStatus};
use crate::core::quota::QuotaStore;
use crate::core::users::{User, UserStore};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Mutex;

pub struct InMemoryMarketplaceStore {
    next_id: AtomicI64,
    users: DashMap<u64, User>,
    categories: DashMap<CategoryId, Category>,
    channels: DashMap<ChannelId, Channel>,
    links: DashMap<(CategoryId, ChannelId), CategoryChannel>,
    ads: DashMap<AdId, Ad>,
    publications: DashMap<AdId, Vec<AdPublication>>,
    requests: Mutex<Vec<ModerationRequest>>,
    counters: DashMap<(u64, NaiveDate, String), i64>,
    fail_records: AtomicBool,
}

impl Default for InMemoryMarketplaceStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryMarketplaceStore {
    pub fn new() -> Self {
        Self {
            next_id: AtomicI64::new(1),
            users: DashMap::new(),
            categories: DashMap::new(),
            channels: DashMap::new(),
            links: DashMap::new(),
            ads: DashMap::new(),
            publications: DashMap::new(),
            requests: Mutex::new(Vec::new()),
            counters: DashMap::new(),
            fail_records: AtomicBool::new(false),
        }
    }

    fn next_id(&self) -> i64 {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    /// Insert or replace a user.
    pub fn add_user(&self, user: User) {
        self.users.insert(user.user_id, user);
    }

    pub fn add_category(&self, name: &str, slug: &str, parent_id: Option<CategoryId>) -> Category {
        let category = Category {
            id: self.next_id(),
            name: name.to_string(),
            slug: slug.to_string(),
            parent_id,
            active: true,
            sort_order: 0,
        };
        self.categories.insert(category.id, category.clone());
        category
    }

    pub fn add_channel(&self, handle: &str, title: &str, mode: ModerationMode) -> Channel {
        let mut channel = Channel::new(handle, title);
        channel.id = self.next_id();
        channel.mode = mode;
        self.channels.insert(channel.id, channel.clone());
        channel
    }

    pub fn update_channel(&self, channel: Channel) {
        self.channels.insert(channel.id, channel);
    }

    /// Make `record_publication` fail until switched back.
    pub fn fail_publication_records(&self, fail: bool) {
        self.fail_records.store(fail, Ordering::SeqCst);
    }

    pub fn link(&self, category_id: CategoryId, channel_id: ChannelId, enabled: bool) {
        self.links.insert(
            (category_id, channel_id),
            CategoryChannel {
                category_id,
                channel_id,
                enabled,
            },
        );
    }
}

fn missing(what: &str, id: i64) -> MarketplaceError {
    MarketplaceError::StorageError(format!("{what} {id} not found"))
}

#[async_trait]
impl CatalogStore for InMemoryMarketplaceStore {
    async fn get_category(
        &self,
        category_id: CategoryId,
    ) -> Result<Option<Category>, MarketplaceError> {
        Ok(self.categories.get(&category_id).map(|c| c.clone()))
    }

    async fn get_channel(
        &self,
        channel_id: ChannelId,
    ) -> Result<Option<Channel>, MarketplaceError> {
        Ok(self.channels.get(&channel_id).map(|c| c.clone()))
    }

    async fn linked_channels(
        &self,
        category_id: CategoryId,
    ) -> Result<Vec<Channel>, MarketplaceError> {
        Ok(self
            .links
            .iter()
            .filter(|link| link.category_id == category_id && link.enabled)
            .filter_map(|link| self.channels.get(&link.channel_id).map(|c| c.clone()))
            .collect())
    }
}

#[async_trait]
impl AdStore for InMemoryMarketplaceStore {
    async fn get_ad(&self, ad_id: AdId) -> Result<Option<Ad>, MarketplaceError> {
        Ok(self.ads.get(&ad_id).map(|a| a.clone()))
    }

    async fn insert_ad(&self, ad: NewAd) -> Result<Ad, MarketplaceError> {
        let ad = Ad {
            id: self.next_id(),
            user_id: ad.user_id,
            category_id: ad.category_id,
            country: ad.country,
            city: ad.city,
            title: ad.title,
            body: ad.body,
            contacts: ad.contacts,
            paid: ad.paid,
            media_url: ad.media_url,
            status: AdStatus::Draft,
            bump_count: 0,
            created_at: Utc::now(),
        };
        self.ads.insert(ad.id, ad.clone());
        Ok(ad)
    }

    async fn set_status(&self, ad_id: AdId, status: AdStatus) -> Result<(), MarketplaceError> {
        let mut ad = self.ads.get_mut(&ad_id).ok_or_else(|| missing("ad", ad_id))?;
        ad.status = status;
        Ok(())
    }

    async fn increment_bump(&self, ad_id: AdId) -> Result<u32, MarketplaceError> {
        let mut ad = self.ads.get_mut(&ad_id).ok_or_else(|| missing("ad", ad_id))?;
        ad.bump_count += 1;
        Ok(ad.bump_count)
    }

    async fn record_publication(
        &self,
        publication: NewPublication,
    ) -> Result<AdPublication, MarketplaceError> {
        if self.fail_records.load(Ordering::SeqCst) {
            return Err(MarketplaceError::StorageError("database is locked".to_string()));
        }
        let record = AdPublication {
            id: self.next_id(),
            ad_id: publication.ad_id,
            channel_id: publication.channel_id,
            message_id: publication.message_id,
            link: publication.link,
            is_bump: publication.is_bump,
            published_at: Utc::now(),
        };
        self.publications
            .entry(record.ad_id)
            .or_default()
            .push(record.clone());
        Ok(record)
    }

    async fn publications_for_ad(
        &self,
        ad_id: AdId,
    ) -> Result<Vec<AdPublication>, MarketplaceError> {
        Ok(self
            .publications
            .get(&ad_id)
            .map(|p| p.clone())
            .unwrap_or_default())
    }
}

#[async_trait]
impl ModerationStore for InMemoryMarketplaceStore {
    async fn create_pending(
        &self,
        ad_id: AdId,
        channel_id: ChannelId,
    ) -> Result<Option<ModerationRequest>, MarketplaceError> {
        let mut requests = self.requests.lock().unwrap();
        let exists = requests.iter().any(|r| {
            r.ad_id == ad_id && r.channel_id == channel_id && r.status == RequestStatus::Pending
        });
        if exists {
            return Ok(None);
        }

        let request = ModerationRequest {
            id: self.next_id(),
            ad_id,
            channel_id,
            status: RequestStatus::Pending,
            reject_reason: None,
            decided_by: None,
            created_at: Utc::now(),
            decided_at: None,
        };
        requests.push(request.clone());
        Ok(Some(request))
    }

    async fn get_request(
        &self,
        request_id: RequestId,
    ) -> Result<Option<ModerationRequest>, MarketplaceError> {
        let requests = self.requests.lock().unwrap();
        Ok(requests.iter().find(|r| r.id == request_id).cloned())
    }

    async fn decide(
        &self,
        request_id: RequestId,
        status: RequestStatus,
        decided_by: Option<u64>,
        reason: Option<&str>,
        at: DateTime<Utc>,
    ) -> Result<bool, MarketplaceError> {
        let mut requests = self.requests.lock().unwrap();
        match requests
            .iter_mut()
            .find(|r| r.id == request_id && r.status == RequestStatus::Pending)
        {
            Some(request) => {
                request.status = status;
                request.decided_by = decided_by;
                request.reject_reason = reason.map(str::to_string);
                request.decided_at = Some(at);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn reopen(&self, request_id: RequestId) -> Result<bool, MarketplaceError> {
        let mut requests = self.requests.lock().unwrap();
        let Some(pair) = requests
            .iter()
            .find(|r| r.id == request_id && r.status == RequestStatus::Approved)
            .map(|r| (r.ad_id, r.channel_id))
        else {
            return Ok(false);
        };

        let sibling_pending = requests.iter().any(|r| {
            (r.ad_id, r.channel_id) == pair && r.status == RequestStatus::Pending
        });
        if sibling_pending {
            return Ok(false);
        }

        if let Some(request) = requests.iter_mut().find(|r| r.id == request_id) {
            request.status = RequestStatus::Pending;
            request.decided_by = None;
            request.reject_reason = None;
            request.decided_at = None;
        }
        Ok(true)
    }

    async fn requests_for_ad(
        &self,
        ad_id: AdId,
    ) -> Result<Vec<ModerationRequest>, MarketplaceError> {
        let requests = self.requests.lock().unwrap();
        Ok(requests.iter().filter(|r| r.ad_id == ad_id).cloned().collect())
    }

    async fn pending_requests(
        &self,
        limit: u32,
    ) -> Result<Vec<ModerationRequest>, MarketplaceError> {
        let requests = self.requests.lock().unwrap();
        Ok(requests
            .iter()
            .filter(|r| r.status == RequestStatus::Pending)
            .take(limit as usize)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl QuotaStore for InMemoryMarketplaceStore {
    async fn count_between(
        &self,
        user_id: u64,
        key: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<i64, MarketplaceError> {
        Ok(self
            .counters
            .iter()
            .filter(|entry| {
                let (user, day, counter) = entry.key();
                *user == user_id && counter == key && (from..=to).contains(day)
            })
            .map(|entry| *entry.value())
            .sum())
    }

    async fn increment_counter(
        &self,
        user_id: u64,
        key: &str,
        day: NaiveDate,
    ) -> Result<(), MarketplaceError> {
        *self
            .counters
            .entry((user_id, day, key.to_string()))
            .or_insert(0) += 1;
        Ok(())
    }
}

#[async_trait]
impl UserStore for InMemoryMarketplaceStore {
    async fn get_user(&self, user_id: u64) -> Result<Option<User>, MarketplaceError> {
        Ok(self.users.get(&user_id).map(|u| u.clone()))
    }

    async fn ensure_user(
        &self,
        user_id: u64,
        display_name: &str,
    ) -> Result<User, MarketplaceError> {
        let mut user = self
            .users
            .entry(user_id)
            .or_insert_with(|| User::new(user_id, display_name));
        user.display_name = display_name.to_string();
        Ok(user.clone())
    }

    async fn consume_bonus(&self, user_id: u64) -> Result<bool, MarketplaceError> {
        match self.users.get_mut(&user_id) {
            Some(mut user) if user.bonus_balance > 0 => {
                user.bonus_balance -= 1;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn active_reviewers(&self) -> Result<Vec<u64>, MarketplaceError> {
        let mut reviewers: Vec<u64> = self
            .users
            .iter()
            .filter(|u| u.reviewer)
            .map(|u| u.user_id)
            .collect();
        reviewers.sort_unstable();
        Ok(reviewers)
    }
}
