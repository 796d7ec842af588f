// Discord layer - commands, button handlers and the Discord side of the
// delivery ports.

use crate::core::moderation::ModerationService;
use crate::core::publication::PublicationService;
use crate::infra::marketplace::SqliteMarketplaceStore;
use std::sync::Arc;

#[path = "commands/command_catalog.rs"]
pub mod commands;

#[path = "delivery/mod.rs"]
pub mod delivery;

#[path = "moderation/mod.rs"]
pub mod moderation;

/// Shared state handed to every command and event.
pub struct Data {
    pub store: Arc<SqliteMarketplaceStore>,
    pub publication: Arc<PublicationService<SqliteMarketplaceStore>>,
    pub moderation: Arc<ModerationService<SqliteMarketplaceStore>>,
}

pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Context<'a> = poise::Context<'a, Data, Error>;

/// Reply shown whenever a core call fails with a storage or delivery error.
pub const APOLOGY: &str = "Sorry, something went wrong on our side. Please try again later.";

/// Framework-wide error hook.
///
/// Command errors are logged with their details and the user only sees the
/// apology. Everything else goes to poise's default handler.
pub async fn on_error(error: poise::FrameworkError<'_, Data, Error>) {
    match error {
        poise::FrameworkError::Command { error, ctx, .. } => {
            tracing::error!(
                command = %ctx.command().qualified_name,
                user_id = ctx.author().id.get(),
                error = %error,
                "Command failed"
            );
            let reply = poise::CreateReply::default().content(APOLOGY).ephemeral(true);
            if let Err(e) = ctx.send(reply).await {
                tracing::warn!("Failed to send apology: {e}");
            }
        }
        other => {
            if let Err(e) = poise::builtins::on_error(other).await {
                tracing::error!("Error while handling error: {e}");
            }
        }
    }
}

/// Ephemeral text reply.
pub async fn reply_private(ctx: Context<'_>, text: impl Into<String>) -> Result<(), Error> {
    ctx.send(
        poise::CreateReply::default()
            .content(text.into())
            .ephemeral(true),
    )
    .await?;
    Ok(())
}
