use super::parse_snowflake;
use crate::core::ads::Ad;
use crate::core::catalog::{Category, Channel};
use crate::core::publication::{DeliveryError, PublishedMessage, Publisher};
use async_trait::async_trait;
use poise::serenity_prelude as serenity;
use std::sync::Arc;

/// Discord rejects message content longer than this.
const MAX_CONTENT_CHARS: usize = 2000;

/// Posts rendered ads into Discord text channels.
pub struct DiscordPublisher {
    http: Arc<serenity::Http>,
}

impl DiscordPublisher {
    pub fn new(http: Arc<serenity::Http>) -> Self {
        Self { http }
    }
}

#[async_trait]
impl Publisher for DiscordPublisher {
    async fn publish(
        &self,
        ad: &Ad,
        _category: &Category,
        channel: &Channel,
        text: &str,
        _is_bump: bool,
    ) -> Result<PublishedMessage, DeliveryError> {
        let channel_id = parse_snowflake(&channel.handle).ok_or_else(|| {
            DeliveryError::Publish(format!("'{}' is not a Discord channel id", channel.handle))
        })?;

        let mut message = serenity::CreateMessage::new().content(clamp(text, MAX_CONTENT_CHARS));
        if let Some(url) = ad.media_url.as_deref().filter(|u| !u.trim().is_empty()) {
            message = message.embed(serenity::CreateEmbed::new().image(url.trim()));
        }

        let sent = serenity::ChannelId::new(channel_id)
            .send_message(self.http.as_ref(), message)
            .await
            .map_err(|e| DeliveryError::Publish(e.to_string()))?;

        Ok(PublishedMessage {
            message_id: sent.id.get(),
            link: Some(sent.link()),
        })
    }
}

fn clamp(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut clamped: String = text.chars().take(max_chars - 1).collect();
    clamped.push('…');
    clamped
}
