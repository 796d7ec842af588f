// This is the entry point of the classifieds bot.
//
// **Architecture Overview:**
// - `core/` = Business logic (platform-agnostic)
// - `infra/` = Implementations of core traits (databases, seed files)
// - `discord/` = Discord-specific adapters (commands, buttons, delivery)
//
// This file's job is to:
// 1. Load configuration
// 2. Initialize stores and apply the catalog seed
// 3. Wire the services (dependency injection)
// 4. Set up the Discord framework

// These attrs point each module declaration at a more descriptive root file
// so we don't end up with half a dozen mod.rs files that all look the same.
#[path = "core/core_layer.rs"]
mod core;
#[path = "discord/discord_layer.rs"]
mod discord;
#[path = "infra/infra_layer.rs"]
mod infra;

use crate::core::ads::DefaultAdRenderer;
use crate::core::content_guard::ContentGuard;
use crate::core::moderation::ModerationService;
use crate::core::publication::{PublicationService, PublishAction};
use crate::discord::delivery::{DiscordNotifier, DiscordPublisher, DiscordSubscriptionChecker};
use crate::discord::moderation::review_buttons;
use crate::discord::{Data, Error};
use crate::infra::marketplace::{CatalogSeed, SqliteMarketplaceStore};
use crate::infra::settings::SqliteSettingsStore;
use poise::serenity_prelude as serenity;
use std::path::PathBuf;
use std::sync::Arc;

/// Event handler for non-command Discord events.
/// Button clicks on reviewer notifications arrive here.
async fn event_handler(
    ctx: &serenity::Context,
    event: &serenity::FullEvent,
    _framework: poise::FrameworkContext<'_, Data, Error>,
    data: &Data,
) -> Result<(), Error> {
    if let serenity::FullEvent::InteractionCreate { interaction } = event {
        if let Err(e) = review_buttons::handle_interaction(ctx, interaction, data).await {
            tracing::error!("Error handling review button: {}", e);
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    dotenv::dotenv().ok();

    let token = std::env::var("DISCORD_TOKEN").expect(
        "Missing DISCORD_TOKEN environment variable! Create a .env file with your bot token.",
    );

    let data_dir = std::env::var("CLASSIFIEDS_DATA_DIR").unwrap_or_else(|_| "data".to_string());
    std::fs::create_dir_all(&data_dir).expect("Failed to create data directory for SQLite files");
    let db_path = format!("{}/classifieds.db", data_dir);
    let seed_path = std::env::var("CLASSIFIEDS_CATALOG_SEED")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(&data_dir).join("catalog.json"));

    // ========================================================================
    // STORES
    // ========================================================================

    let store = Arc::new(
        SqliteMarketplaceStore::new(&db_path)
            .await
            .expect("Failed to initialize SQLite store"),
    );
    let settings = Arc::new(
        SqliteSettingsStore::new(store.pool())
            .await
            .expect("Failed to migrate settings table"),
    );

    let seed = CatalogSeed::load(&seed_path)
        .await
        .expect("Failed to read catalog seed");
    if let Some(seed) = &seed {
        seed.apply(&store, &settings)
            .await
            .expect("Failed to apply catalog seed");
    }

    let guard_config = seed.and_then(|s| s.content_guard).unwrap_or_default();
    let guard = Arc::new(
        ContentGuard::new(&guard_config).expect("Invalid content guard configuration"),
    );

    // ========================================================================
    // DISCORD FRAMEWORK SETUP
    // ========================================================================
    // Slash commands and component interactions need no privileged intents.

    let intents = serenity::GatewayIntents::non_privileged();

    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: vec![
                discord::commands::ads::ad(),
                discord::moderation::commands::moderation(),
            ],
            on_error: |error| Box::pin(discord::on_error(error)),
            event_handler: |ctx, event, framework, data| {
                Box::pin(event_handler(ctx, event, framework, data))
            },
            ..Default::default()
        })
        .setup(move |ctx, _ready, framework| {
            Box::pin(async move {
                tracing::info!("Bot is starting up...");

                poise::builtins::register_globally(ctx, &framework.options().commands).await?;
                tracing::info!("Commands registered");

                // The delivery adapters need the gateway's HTTP client, so the
                // services are wired here rather than before the client exists.
                let http = ctx.http.clone();
                let publish = Arc::new(PublishAction::new(
                    Arc::clone(&store),
                    Arc::new(DiscordPublisher::new(Arc::clone(&http))),
                    Arc::new(DefaultAdRenderer),
                ));
                let moderation = Arc::new(ModerationService::new(
                    Arc::clone(&store),
                    Arc::clone(&publish),
                    Arc::new(DiscordNotifier::new(Arc::clone(&http))),
                ));
                let publication = Arc::new(PublicationService::new(
                    Arc::clone(&store),
                    settings,
                    guard,
                    Arc::new(DiscordSubscriptionChecker::new(http)),
                    publish,
                    Arc::clone(&moderation),
                ));

                tracing::info!("Bot is ready");
                Ok(Data {
                    store,
                    publication,
                    moderation,
                })
            })
        })
        .build();

    let mut client = serenity::ClientBuilder::new(token, intents)
        .framework(framework)
        .await
        .expect("Error creating client");

    client.start().await.expect("Error running bot");
}
