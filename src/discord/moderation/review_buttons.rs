// Approve/Reject buttons attached to reviewer notifications.

use super::{describe_decision, is_reviewer};
use crate::core::publication::ReviewAction;
use crate::discord::{Data, Error, APOLOGY};
use poise::serenity_prelude as serenity;

/// Handle a component interaction if it carries a review action.
///
/// Other interactions are ignored.
pub async fn handle_interaction(
    ctx: &serenity::Context,
    interaction: &serenity::Interaction,
    data: &Data,
) -> Result<(), Error> {
    let Some(component) = interaction.as_message_component() else {
        return Ok(());
    };
    let Some(action) = ReviewAction::parse(&component.data.custom_id) else {
        return Ok(());
    };

    let reviewer_id = component.user.id.get();
    if !is_reviewer(data, reviewer_id).await? {
        component
            .create_response(
                &ctx.http,
                serenity::CreateInteractionResponse::Message(
                    serenity::CreateInteractionResponseMessage::new()
                        .content("Only reviewers can decide moderation requests.")
                        .ephemeral(true),
                ),
            )
            .await?;
        return Ok(());
    }

    // Approving publishes, which can outlast the interaction deadline.
    component.defer(&ctx.http).await?;

    let result = match action {
        ReviewAction::Approve(id) => data.moderation.approve(id, Some(reviewer_id)).await,
        ReviewAction::Reject(id) => data.moderation.reject(id, Some(reviewer_id), None).await,
    };

    let outcome = match result {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::error!(
                request_id = action.request_id(),
                reviewer_id,
                error = %e,
                "Review decision failed"
            );
            component
                .create_followup(
                    &ctx.http,
                    serenity::CreateInteractionResponseFollowup::new()
                        .content(APOLOGY)
                        .ephemeral(true),
                )
                .await?;
            return Ok(());
        }
    };

    let summary = describe_decision(&outcome);
    if outcome.ok || outcome.already_decided {
        // Decision is final: record it on the notification and drop the buttons.
        let content = format!("{}\n\n{summary}", component.message.content);
        component
            .edit_response(
                &ctx.http,
                serenity::EditInteractionResponse::new()
                    .content(content)
                    .components(vec![]),
            )
            .await?;
    } else {
        // Buttons stay so the reviewer can retry.
        component
            .create_followup(
                &ctx.http,
                serenity::CreateInteractionResponseFollowup::new()
                    .content(summary)
                    .ephemeral(true),
            )
            .await?;
    }

    Ok(())
}
