use crate::core::publication::{DeliveryError, Notifier, ReviewAction};
use async_trait::async_trait;
use poise::serenity_prelude as serenity;
use std::sync::Arc;

/// Delivers notifications as direct messages.
pub struct DiscordNotifier {
    http: Arc<serenity::Http>,
}

impl DiscordNotifier {
    pub fn new(http: Arc<serenity::Http>) -> Self {
        Self { http }
    }

    async fn direct_message(
        &self,
        user_id: u64,
        message: serenity::CreateMessage,
    ) -> Result<(), DeliveryError> {
        if user_id == 0 {
            return Err(DeliveryError::Notify("user id 0".to_string()));
        }
        serenity::UserId::new(user_id)
            .direct_message(self.http.as_ref(), message)
            .await
            .map_err(|e| DeliveryError::Notify(e.to_string()))?;
        Ok(())
    }
}

/// Approve/Reject buttons for a moderation request.
pub fn review_buttons(approve: ReviewAction, reject: ReviewAction) -> serenity::CreateActionRow {
    serenity::CreateActionRow::Buttons(vec![
        serenity::CreateButton::new(approve.custom_id())
            .label("Approve")
            .style(serenity::ButtonStyle::Success),
        serenity::CreateButton::new(reject.custom_id())
            .label("Reject")
            .style(serenity::ButtonStyle::Danger),
    ])
}

#[async_trait]
impl Notifier for DiscordNotifier {
    async fn send_to_user(&self, user_id: u64, text: &str) -> Result<(), DeliveryError> {
        self.direct_message(user_id, serenity::CreateMessage::new().content(text))
            .await
    }

    async fn send_to_reviewer(
        &self,
        reviewer_id: u64,
        text: &str,
        approve: ReviewAction,
        reject: ReviewAction,
    ) -> Result<(), DeliveryError> {
        let message = serenity::CreateMessage::new()
            .content(text)
            .components(vec![review_buttons(approve, reject)]);
        self.direct_message(reviewer_id, message).await
    }
}
