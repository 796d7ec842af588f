// Moderation slash commands for reviewers.

use super::{describe_decision, is_reviewer};
use crate::core::ads::AdStore;
use crate::core::catalog::CatalogStore;
use crate::core::moderation::RequestId;
use crate::discord::{reply_private, Context, Error};
use poise::serenity_prelude as serenity;

/// Only users flagged as reviewers get past this.
async fn reviewer_only(ctx: Context<'_>) -> Result<bool, Error> {
    if is_reviewer(ctx.data(), ctx.author().id.get()).await? {
        return Ok(true);
    }
    reply_private(ctx, "Only reviewers can use this command.").await?;
    Ok(false)
}

/// Review ads waiting for moderated channels.
#[poise::command(slash_command, subcommands("pending", "approve", "reject"))]
pub async fn moderation(_ctx: Context<'_>) -> Result<(), Error> {
    // Parent command - subcommands do the work
    Ok(())
}

/// List pending moderation requests, oldest first.
#[poise::command(slash_command, check = "reviewer_only")]
pub async fn pending(
    ctx: Context<'_>,
    #[description = "How many to show (default: 10)"]
    #[min = 1]
    #[max = 25]
    limit: Option<u32>,
) -> Result<(), Error> {
    let data = ctx.data();
    let requests = data
        .moderation
        .pending_requests(limit.unwrap_or(10))
        .await
        .map_err(|e| Error::from(e.to_string()))?;

    if requests.is_empty() {
        return reply_private(ctx, "🎉 Nothing waiting for review.").await;
    }

    let mut embed = serenity::CreateEmbed::new()
        .title(format!("🛡️ Pending requests ({})", requests.len()))
        .color(0xF1C40F);

    for request in &requests {
        let ad = data
            .store
            .get_ad(request.ad_id)
            .await
            .map_err(|e| Error::from(e.to_string()))?;
        let channel = data
            .store
            .get_channel(request.channel_id)
            .await
            .map_err(|e| Error::from(e.to_string()))?;

        let title = ad
            .as_ref()
            .map(|a| a.title.clone())
            .unwrap_or_else(|| format!("ad {}", request.ad_id));
        let channel = channel
            .map(|c| c.title)
            .unwrap_or_else(|| format!("channel {}", request.channel_id));
        let author = ad.map(|a| format!("<@{}>", a.user_id)).unwrap_or_default();

        embed = embed.field(
            format!("#{} · {}", request.id, title),
            format!(
                "{channel} {author}\nWaiting since <t:{}:R>",
                request.created_at.timestamp()
            ),
            false,
        );
    }

    ctx.send(poise::CreateReply::default().embed(embed).ephemeral(true))
        .await?;
    Ok(())
}

/// Approve a request and publish the ad in its channel.
#[poise::command(slash_command, check = "reviewer_only")]
pub async fn approve(
    ctx: Context<'_>,
    #[description = "Request number"] request_id: RequestId,
) -> Result<(), Error> {
    ctx.defer_ephemeral().await?;

    let outcome = ctx
        .data()
        .moderation
        .approve(request_id, Some(ctx.author().id.get()))
        .await
        .map_err(|e| Error::from(e.to_string()))?;

    reply_private(ctx, describe_decision(&outcome)).await
}

/// Reject a request.
#[poise::command(slash_command, check = "reviewer_only")]
pub async fn reject(
    ctx: Context<'_>,
    #[description = "Request number"] request_id: RequestId,
    #[description = "Reason shown to the author"]
    #[max_length = 300]
    reason: Option<String>,
) -> Result<(), Error> {
    let outcome = ctx
        .data()
        .moderation
        .reject(request_id, Some(ctx.author().id.get()), reason.as_deref())
        .await
        .map_err(|e| Error::from(e.to_string()))?;

    reply_private(ctx, describe_decision(&outcome)).await
}
