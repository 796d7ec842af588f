// Ad commands - create drafts and drive them through the pipeline.
//
// Payment and the guided posting dialogue live outside this bot, so every
// draft created here is unpaid.

use crate::core::ads::{Ad, AdId, AdStore, NewAd};
use crate::core::catalog::{CatalogStore, Category, CategoryId};
use crate::core::moderation::{ModerationStore, RequestStatus};
use crate::core::publication::SubmitOutcome;
use crate::core::quota::Allowance;
use crate::core::users::UserStore;
use crate::discord::{reply_private, Context, Error};
use poise::serenity_prelude as serenity;
use std::collections::HashMap;

/// Discord rejects message content longer than this.
const MAX_REPLY_CHARS: usize = 2000;

/// Create and publish classified ads.
#[poise::command(
    slash_command,
    subcommands("new", "submit", "bump", "status", "mine", "categories", "quota")
)]
pub async fn ad(_ctx: Context<'_>) -> Result<(), Error> {
    // Parent command - subcommands do the work
    Ok(())
}

/// Create a draft ad.
#[poise::command(slash_command)]
#[allow(clippy::too_many_arguments)]
pub async fn new(
    ctx: Context<'_>,
    #[description = "Category slug (see /ad categories)"] category: String,
    #[description = "Headline"]
    #[max_length = 100]
    title: String,
    #[description = "Ad text"]
    #[max_length = 1500]
    body: String,
    #[description = "How people reach you"]
    #[max_length = 200]
    contacts: String,
    #[description = "Country"] country: Option<String>,
    #[description = "City"] city: Option<String>,
    #[description = "Image URL shown with the ad"] media_url: Option<String>,
) -> Result<(), Error> {
    if [&title, &body, &contacts].iter().any(|s| s.trim().is_empty()) {
        return reply_private(ctx, "Title, text and contacts can't be empty.").await;
    }

    let data = ctx.data();
    let slug = category.trim().to_lowercase();
    let category = match data
        .store
        .category_by_slug(&slug)
        .await
        .map_err(|e| Error::from(e.to_string()))?
    {
        Some(c) if c.active => c,
        _ => {
            return reply_private(
                ctx,
                format!("Unknown category `{slug}`. Use `/ad categories` to see the list."),
            )
            .await
        }
    };

    let user_id = ctx.author().id.get();
    data.store
        .ensure_user(user_id, &ctx.author().name)
        .await
        .map_err(|e| Error::from(e.to_string()))?;

    let ad = data
        .store
        .insert_ad(NewAd {
            user_id,
            category_id: category.id,
            country: non_empty(country),
            city: non_empty(city),
            title: title.trim().to_string(),
            body: body.trim().to_string(),
            contacts: contacts.trim().to_string(),
            paid: false,
            media_url: non_empty(media_url),
        })
        .await
        .map_err(|e| Error::from(e.to_string()))?;

    tracing::info!(ad_id = ad.id, user_id, category = %category.slug, "Draft ad created");

    reply_private(
        ctx,
        format!(
            "📝 Draft #{} created in **{}**. Publish it with `/ad submit {}`.",
            ad.id, category.name, ad.id
        ),
    )
    .await
}

/// Submit a draft for publication.
#[poise::command(slash_command)]
pub async fn submit(
    ctx: Context<'_>,
    #[description = "Ad number"] ad_id: AdId,
) -> Result<(), Error> {
    // Publishing to several channels can take longer than the reply deadline.
    ctx.defer_ephemeral().await?;

    let data = ctx.data();
    let user_id = ctx.author().id.get();
    data.store
        .ensure_user(user_id, &ctx.author().name)
        .await
        .map_err(|e| Error::from(e.to_string()))?;

    let outcome = data
        .publication
        .submit(user_id, ad_id)
        .await
        .map_err(|e| Error::from(e.to_string()))?;

    reply_private(ctx, describe_outcome(&outcome)).await
}

/// Re-post a published ad to its channels.
#[poise::command(slash_command)]
pub async fn bump(
    ctx: Context<'_>,
    #[description = "Ad number"] ad_id: AdId,
) -> Result<(), Error> {
    ctx.defer_ephemeral().await?;

    let outcome = ctx
        .data()
        .publication
        .bump(ctx.author().id.get(), ad_id)
        .await
        .map_err(|e| Error::from(e.to_string()))?;

    reply_private(ctx, describe_outcome(&outcome)).await
}

/// Show where an ad is published and what reviewers decided.
#[poise::command(slash_command)]
pub async fn status(
    ctx: Context<'_>,
    #[description = "Ad number"] ad_id: AdId,
) -> Result<(), Error> {
    let data = ctx.data();
    let ad = match data
        .store
        .get_ad(ad_id)
        .await
        .map_err(|e| Error::from(e.to_string()))?
    {
        Some(ad) if ad.user_id == ctx.author().id.get() => ad,
        _ => return reply_private(ctx, format!("Ad #{ad_id} not found.")).await,
    };

    let publications = data
        .store
        .publications_for_ad(ad.id)
        .await
        .map_err(|e| Error::from(e.to_string()))?;
    let requests = data
        .store
        .requests_for_ad(ad.id)
        .await
        .map_err(|e| Error::from(e.to_string()))?;

    let mut channel_titles = HashMap::new();
    for channel_id in publications
        .iter()
        .map(|p| p.channel_id)
        .chain(requests.iter().map(|r| r.channel_id))
    {
        if channel_titles.contains_key(&channel_id) {
            continue;
        }
        let title = data
            .store
            .get_channel(channel_id)
            .await
            .map_err(|e| Error::from(e.to_string()))?
            .map(|c| c.title)
            .unwrap_or_else(|| format!("channel {channel_id}"));
        channel_titles.insert(channel_id, title);
    }

    let published = if publications.is_empty() {
        "Nowhere yet".to_string()
    } else {
        publications
            .iter()
            .map(|p| {
                let title = &channel_titles[&p.channel_id];
                let kind = if p.is_bump { " (bump)" } else { "" };
                match &p.link {
                    Some(link) => format!("[{title}]({link}){kind}"),
                    None => format!("{title}{kind}"),
                }
            })
            .collect::<Vec<_>>()
            .join("\n")
    };

    let reviews = if requests.is_empty() {
        "No moderated channels".to_string()
    } else {
        requests
            .iter()
            .map(|r| {
                let title = &channel_titles[&r.channel_id];
                match (&r.status, &r.reject_reason) {
                    (RequestStatus::Rejected, Some(reason)) => {
                        format!("{title}: rejected, {reason}")
                    }
                    (status, _) => format!("{title}: {status}"),
                }
            })
            .collect::<Vec<_>>()
            .join("\n")
    };

    let embed = serenity::CreateEmbed::new()
        .title(format!("📣 #{} {}", ad.id, ad.title))
        .color(status_color(&ad))
        .field("Status", ad.status.to_string(), true)
        .field("Bumps", ad.bump_count.to_string(), true)
        .field("Paid", if ad.paid { "Yes" } else { "No" }, true)
        .field("Published", clip_field(published), false)
        .field("Moderation", clip_field(reviews), false);

    ctx.send(poise::CreateReply::default().embed(embed).ephemeral(true))
        .await?;
    Ok(())
}

/// List your most recent ads.
#[poise::command(slash_command)]
pub async fn mine(ctx: Context<'_>) -> Result<(), Error> {
    let ads = ctx
        .data()
        .store
        .ads_for_user(ctx.author().id.get())
        .await
        .map_err(|e| Error::from(e.to_string()))?;

    if ads.is_empty() {
        return reply_private(ctx, "You have no ads yet. Create one with `/ad new`.").await;
    }

    let lines: Vec<String> = ads
        .iter()
        .map(|ad| format!("`#{}` **{}** · {}", ad.id, ad.title, ad.status))
        .collect();
    reply_private(ctx, fit_lines(&lines, MAX_REPLY_CHARS)).await
}

/// Show the category tree.
#[poise::command(slash_command)]
pub async fn categories(ctx: Context<'_>) -> Result<(), Error> {
    let categories = ctx
        .data()
        .store
        .list_categories()
        .await
        .map_err(|e| Error::from(e.to_string()))?;

    let lines = category_tree(&categories);
    if lines.is_empty() {
        return reply_private(ctx, "No categories are configured.").await;
    }
    reply_private(ctx, fit_lines(&lines, MAX_REPLY_CHARS)).await
}

/// Show how many free placements you have left.
#[poise::command(slash_command)]
pub async fn quota(ctx: Context<'_>) -> Result<(), Error> {
    let user_id = ctx.author().id.get();
    let allowance = ctx
        .data()
        .publication
        .quota()
        .check_free_allowance(user_id)
        .await
        .map_err(|e| Error::from(e.to_string()))?;
    let bonus = ctx
        .data()
        .store
        .get_user(user_id)
        .await
        .map_err(|e| Error::from(e.to_string()))?
        .map(|u| u.bonus_balance)
        .unwrap_or(0);

    reply_private(ctx, describe_allowance(&allowance, bonus)).await
}

// ============================================================================
// HELPERS
// ============================================================================

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn describe_outcome(outcome: &SubmitOutcome) -> String {
    let icon = if outcome.ok { "✅" } else { "❌" };
    let mut text = format!("{icon} {}", outcome.message);
    for link in &outcome.published_links {
        text.push_str("\n• ");
        text.push_str(link);
    }
    text
}

fn describe_allowance(allowance: &Allowance, bonus: i64) -> String {
    if allowance.unlimited {
        return "♾️ Your free placements are unlimited.".to_string();
    }
    let left = (allowance.limit - allowance.used).max(0);
    let mut text = format!(
        "🎟️ {left} of {} free placement(s) left this {}.",
        allowance.limit, allowance.period_label
    );
    if bonus > 0 {
        text.push_str(&format!("\nBonus placements: {bonus}"));
    }
    text
}

fn status_color(ad: &Ad) -> u32 {
    use crate::core::ads::AdStatus;
    match ad.status {
        AdStatus::Published => 0x2ECC71,
        AdStatus::PendingModeration => 0xF1C40F,
        AdStatus::Rejected => 0xE74C3C,
        AdStatus::Draft => 0x95A5A6,
    }
}

/// Embed field values are capped at 1024 characters.
fn clip_field(value: String) -> String {
    if value.chars().count() <= 1024 {
        return value;
    }
    let mut clipped: String = value.chars().take(1020).collect();
    clipped.push_str(" …");
    clipped
}

/// Keep whole lines while the text fits, then say how many were left out.
fn fit_lines(lines: &[String], max_chars: usize) -> String {
    // Room for the trailer line.
    let budget = max_chars.saturating_sub(32);
    let mut text = String::new();
    let mut used = 0;
    for (shown, line) in lines.iter().enumerate() {
        let cost = line.chars().count() + usize::from(shown > 0);
        if used + cost > budget {
            let trailer = format!("… and {} more", lines.len() - shown);
            if text.is_empty() {
                return trailer;
            }
            text.push('\n');
            text.push_str(&trailer);
            return text;
        }
        if shown > 0 {
            text.push('\n');
        }
        text.push_str(line);
        used += cost;
    }
    text
}

/// Active categories, children indented under their parent.
fn category_tree(categories: &[Category]) -> Vec<String> {
    let active: Vec<&Category> = categories.iter().filter(|c| c.active).collect();
    let mut children: HashMap<Option<CategoryId>, Vec<&Category>> = HashMap::new();
    for category in &active {
        // Children of an inactive parent are listed at the top level.
        let parent = category
            .parent_id
            .filter(|p| active.iter().any(|c| c.id == *p));
        children.entry(parent).or_default().push(category);
    }
    for siblings in children.values_mut() {
        siblings.sort_by(|a, b| a.sort_order.cmp(&b.sort_order).then(a.name.cmp(&b.name)));
    }

    let mut lines = Vec::new();
    let mut stack: Vec<(&Category, usize)> = children
        .get(&None)
        .map(|roots| roots.iter().rev().map(|c| (*c, 0)).collect())
        .unwrap_or_default();
    while let Some((category, depth)) = stack.pop() {
        lines.push(format!(
            "{}`{}` {}",
            "\u{2003}".repeat(depth),
            category.slug,
            category.name
        ));
        if let Some(kids) = children.get(&Some(category.id)) {
            stack.extend(kids.iter().rev().map(|c| (*c, depth + 1)));
        }
    }
    lines
}
