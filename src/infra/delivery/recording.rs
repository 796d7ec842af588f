use crate::core::ads::{Ad, AdId};
use crate::core::catalog::{Category, Channel, ChannelId};
use crate::core::publication::{
    DeliveryError, Notifier, PublishedMessage, Publisher, ReviewAction, SubscriptionChecker,
};
use async_trait::async_trait;
use dashmap::DashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// Publisher that remembers what it posted. Channels can be told to fail.
pub struct RecordingPublisher {
    next_message: AtomicU64,
    published: Mutex<Vec<(AdId, ChannelId, bool)>>,
    failing: DashSet<ChannelId>,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self {
            next_message: AtomicU64::new(1),
            published: Mutex::new(Vec::new()),
            failing: DashSet::new(),
        }
    }

    pub fn fail_channel(&self, channel_id: ChannelId) {
        self.failing.insert(channel_id);
    }

    pub fn restore_channel(&self, channel_id: ChannelId) {
        self.failing.remove(&channel_id);
    }

    /// (ad, channel, is_bump) in publish order.
    pub fn published(&self) -> Vec<(AdId, ChannelId, bool)> {
        self.published.lock().unwrap().clone()
    }
}

#[async_trait]
impl Publisher for RecordingPublisher {
    async fn publish(
        &self,
        ad: &Ad,
        _category: &Category,
        channel: &Channel,
        _text: &str,
        is_bump: bool,
    ) -> Result<PublishedMessage, DeliveryError> {
        if self.failing.contains(&channel.id) {
            return Err(DeliveryError::Publish(format!(
                "channel {} is unavailable",
                channel.handle
            )));
        }

        let message_id = self.next_message.fetch_add(1, Ordering::SeqCst);
        self.published
            .lock()
            .unwrap()
            .push((ad.id, channel.id, is_bump));

        Ok(PublishedMessage {
            message_id,
            link: Some(format!(
                "https://discord.com/channels/1/{}/{message_id}",
                channel.handle
            )),
        })
    }
}

/// Membership from a fixed table.
#[derive(Default)]
pub struct StaticSubscriptions {
    members: DashSet<(u64, String)>,
}

impl StaticSubscriptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn grant(&self, user_id: u64, handle: &str) {
        self.members.insert((user_id, handle.to_string()));
    }
}

#[async_trait]
impl SubscriptionChecker for StaticSubscriptions {
    async fn is_member(&self, user_id: u64, channel_handle: &str) -> bool {
        self.members
            .contains(&(user_id, channel_handle.to_string()))
    }
}

type ReviewerMessage = (u64, String, ReviewAction, ReviewAction);

/// Notifier that records deliveries. Individual recipients can be told to fail.
#[derive(Default)]
pub struct RecordingNotifier {
    to_users: Mutex<Vec<(u64, String)>>,
    to_reviewers: Mutex<Vec<ReviewerMessage>>,
    failing: DashSet<u64>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_user(&self, user_id: u64) {
        self.failing.insert(user_id);
    }

    pub fn fail_reviewer(&self, reviewer_id: u64) {
        self.failing.insert(reviewer_id);
    }

    pub fn user_messages(&self) -> Vec<(u64, String)> {
        self.to_users.lock().unwrap().clone()
    }

    pub fn reviewer_messages(&self) -> Vec<ReviewerMessage> {
        self.to_reviewers.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send_to_user(&self, user_id: u64, text: &str) -> Result<(), DeliveryError> {
        if self.failing.contains(&user_id) {
            return Err(DeliveryError::Notify(format!("user {user_id} has DMs closed")));
        }
        self.to_users.lock().unwrap().push((user_id, text.to_string()));
        Ok(())
    }

    async fn send_to_reviewer(
        &self,
        reviewer_id: u64,
        text: &str,
        approve: ReviewAction,
        reject: ReviewAction,
    ) -> Result<(), DeliveryError> {
        if self.failing.contains(&reviewer_id) {
            return Err(DeliveryError::Notify(format!(
                "reviewer {reviewer_id} is unreachable"
            )));
        }
        self.to_reviewers
            .lock()
            .unwrap()
            .push((reviewer_id, text.to_string(), approve, reject));
        Ok(())
    }
}
