// Catalog seed - categories, channels, links and reviewers from a JSON file.
//
// There is no admin UI, so the catalog is declared in a file and upserted at
// startup. This is also where the category tree is kept acyclic: a category
// may only name a parent declared earlier in the same file, so a parent can
// never be one of its own descendants.

use super::sqlite_store::SqliteMarketplaceStore;
use crate::core::catalog::{Channel, ChannelId, CategoryId, ModerationMode};
use crate::core::content_guard::ContentGuardConfig;
use crate::core::marketplace::MarketplaceError;
use crate::infra::settings::SqliteSettingsStore;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategorySeed {
    pub slug: String,
    pub name: String,
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(default)]
    pub sort_order: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelSeed {
    /// Discord channel id, as a string.
    pub handle: String,
    pub title: String,
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(default)]
    pub mode: ModerationMode,
    #[serde(default)]
    pub spam_filter: bool,
    #[serde(default = "default_true")]
    pub spam_filter_free_only: bool,
    #[serde(default)]
    pub require_subscription: bool,
    #[serde(default)]
    pub subscription_channel: Option<String>,
    #[serde(default)]
    pub footer_text: Option<String>,
    #[serde(default)]
    pub footer_link: Option<String>,
    #[serde(default)]
    pub pinned_message_id: Option<u64>,
}

impl ChannelSeed {
    fn to_channel(&self) -> Channel {
        Channel {
            id: 0,
            handle: self.handle.trim().to_string(),
            title: self.title.clone(),
            active: self.active,
            mode: self.mode,
            spam_filter: self.spam_filter,
            spam_filter_free_only: self.spam_filter_free_only,
            require_subscription: self.require_subscription,
            subscription_channel: self.subscription_channel.clone(),
            footer_text: self.footer_text.clone(),
            footer_link: self.footer_link.clone(),
            pinned_message_id: self.pinned_message_id,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkSeed {
    /// Category slug.
    pub category: String,
    /// Channel handle.
    pub channel: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogSeed {
    #[serde(default)]
    pub categories: Vec<CategorySeed>,
    #[serde(default)]
    pub channels: Vec<ChannelSeed>,
    #[serde(default)]
    pub links: Vec<LinkSeed>,
    /// Discord user ids allowed to decide moderation requests.
    #[serde(default)]
    pub reviewers: Vec<u64>,
    /// Runtime settings written to the settings table.
    #[serde(default)]
    pub settings: BTreeMap<String, String>,
    #[serde(default)]
    pub content_guard: Option<ContentGuardConfig>,
}

impl CatalogSeed {
    /// Read a seed file. A missing file is not an error.
    pub async fn load(path: &Path) -> anyhow::Result<Option<Self>> {
        if !tokio::fs::try_exists(path).await? {
            tracing::info!(path = %path.display(), "No catalog seed file, skipping");
            return Ok(None);
        }

        let raw = tokio::fs::read_to_string(path).await?;
        let seed: CatalogSeed = serde_json::from_str(&raw)
            .map_err(|e| anyhow::anyhow!("invalid catalog seed {}: {e}", path.display()))?;
        seed.validate()?;
        Ok(Some(seed))
    }

    /// Structural checks that must hold before anything is written.
    pub fn validate(&self) -> Result<(), MarketplaceError> {
        let mut slugs = HashSet::new();
        for category in &self.categories {
            let slug = category.slug.trim();
            if slug.is_empty() {
                return Err(invalid(format!("category '{}' has an empty slug", category.name)));
            }
            if let Some(parent) = &category.parent {
                if !slugs.contains(parent.trim()) {
                    return Err(invalid(format!(
                        "category '{slug}' names parent '{parent}', which is not declared before it"
                    )));
                }
            }
            if !slugs.insert(slug) {
                return Err(invalid(format!("duplicate category slug '{slug}'")));
            }
        }

        let mut handles = HashSet::new();
        for channel in &self.channels {
            let handle = channel.handle.trim();
            if handle.is_empty() {
                return Err(invalid(format!("channel '{}' has an empty handle", channel.title)));
            }
            if !handles.insert(handle) {
                return Err(invalid(format!("duplicate channel handle '{handle}'")));
            }
        }

        for link in &self.links {
            if !slugs.contains(link.category.trim()) {
                return Err(invalid(format!("link to unknown category '{}'", link.category)));
            }
            if !handles.contains(link.channel.trim()) {
                return Err(invalid(format!("link to unknown channel '{}'", link.channel)));
            }
        }

        Ok(())
    }

    /// Upsert everything into the stores.
    pub async fn apply(
        &self,
        store: &SqliteMarketplaceStore,
        settings: &SqliteSettingsStore,
    ) -> anyhow::Result<()> {
        self.validate()?;

        let mut category_ids: HashMap<&str, CategoryId> = HashMap::new();
        for seed in &self.categories {
            let slug = seed.slug.trim();
            let parent_id = seed
                .parent
                .as_deref()
                .and_then(|parent| category_ids.get(parent.trim()).copied());

            let category = store
                .upsert_category(&seed.name, slug, parent_id, seed.active, seed.sort_order)
                .await?;
            if category.parent_id != parent_id {
                tracing::warn!(
                    slug,
                    stored_parent = ?category.parent_id,
                    seeded_parent = ?parent_id,
                    "Category already exists under another parent, keeping the stored one"
                );
            }
            category_ids.insert(slug, category.id);
        }

        let mut channel_ids: HashMap<&str, ChannelId> = HashMap::new();
        for seed in &self.channels {
            let channel = store.upsert_channel(&seed.to_channel()).await?;
            channel_ids.insert(seed.handle.trim(), channel.id);
        }

        for link in &self.links {
            // Both sides were checked by validate().
            if let (Some(category_id), Some(channel_id)) = (
                category_ids.get(link.category.trim()),
                channel_ids.get(link.channel.trim()),
            ) {
                store.set_link(*category_id, *channel_id, link.enabled).await?;
            }
        }

        for reviewer in &self.reviewers {
            store.set_reviewer(*reviewer, true).await?;
        }

        for (key, value) in &self.settings {
            settings.set(key, value).await?;
        }

        tracing::info!(
            categories = self.categories.len(),
            channels = self.channels.len(),
            links = self.links.len(),
            reviewers = self.reviewers.len(),
            "Catalog seed applied"
        );
        Ok(())
    }
}

fn invalid(message: String) -> MarketplaceError {
    MarketplaceError::InvalidCatalog(message)
}
