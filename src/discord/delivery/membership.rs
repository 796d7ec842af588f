// Membership lookups for the subscription gates.
//
// On Discord a "subscription" to a channel means being a member of the guild
// the channel lives in. Any lookup failure counts as not subscribed.

use super::parse_snowflake;
use crate::core::publication::SubscriptionChecker;
use async_trait::async_trait;
use poise::serenity_prelude as serenity;
use std::sync::Arc;

pub struct DiscordSubscriptionChecker {
    http: Arc<serenity::Http>,
}

impl DiscordSubscriptionChecker {
    pub fn new(http: Arc<serenity::Http>) -> Self {
        Self { http }
    }

    async fn lookup(&self, user_id: u64, channel_id: u64) -> Result<bool, serenity::Error> {
        let channel = self
            .http
            .get_channel(serenity::ChannelId::new(channel_id))
            .await?;
        let Some(guild_channel) = channel.guild() else {
            return Ok(false);
        };

        // Not being in the guild comes back as a 404.
        self.http
            .get_member(guild_channel.guild_id, serenity::UserId::new(user_id))
            .await?;
        Ok(true)
    }
}

#[async_trait]
impl SubscriptionChecker for DiscordSubscriptionChecker {
    async fn is_member(&self, user_id: u64, channel_handle: &str) -> bool {
        let (Some(channel_id), true) = (parse_snowflake(channel_handle), user_id != 0) else {
            tracing::warn!(channel = channel_handle, "Subscription target is not a Discord channel id");
            return false;
        };

        match self.lookup(user_id, channel_id).await {
            Ok(member) => member,
            Err(e) => {
                tracing::debug!(user_id, channel_id, error = %e, "Membership lookup failed");
                false
            }
        }
    }
}
