// Channel resolution - maps a category to the channels its ads go to.
//
// A category with its own enabled links uses exactly those. A category
// without any inherits from the closest ancestor that has some. Siblings
// and cousins are never consulted.

use super::catalog_models::{Category, CategoryId, Channel, ChannelId};
use crate::core::marketplace::MarketplaceError;
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;

// ============================================================================
// STORAGE TRAIT (PORT)
// ============================================================================

#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn get_category(
        &self,
        category_id: CategoryId,
    ) -> Result<Option<Category>, MarketplaceError>;

    async fn get_channel(&self, channel_id: ChannelId)
        -> Result<Option<Channel>, MarketplaceError>;

    /// Channels directly linked to a category through an enabled link.
    async fn linked_channels(
        &self,
        category_id: CategoryId,
    ) -> Result<Vec<Channel>, MarketplaceError>;
}

// ============================================================================
// RESOLVER
// ============================================================================

pub struct ChannelResolver<S: CatalogStore> {
    store: Arc<S>,
}

impl<S: CatalogStore> ChannelResolver<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Resolve the active destinations for a category, walking up the tree
    /// until some ancestor has direct links. Returns an empty list when the
    /// root is reached without finding any.
    pub async fn resolve_channels(
        &self,
        category_id: CategoryId,
    ) -> Result<Vec<Channel>, MarketplaceError> {
        let mut current = Some(category_id);

        while let Some(id) = current {
            let direct = self.direct_channels(id).await?;
            if !direct.is_empty() {
                tracing::debug!(
                    requested_category = category_id,
                    resolved_category = id,
                    channels = direct.len(),
                    "Resolved publication channels"
                );
                return Ok(direct);
            }

            current = match self.store.get_category(id).await? {
                Some(category) => category.parent_id,
                None => None,
            };
        }

        Ok(Vec::new())
    }

    async fn direct_channels(
        &self,
        category_id: CategoryId,
    ) -> Result<Vec<Channel>, MarketplaceError> {
        let mut seen = HashSet::new();
        let mut channels: Vec<Channel> = self
            .store
            .linked_channels(category_id)
            .await?
            .into_iter()
            .filter(|channel| channel.active && seen.insert(channel.id))
            .collect();

        channels.sort_by(|a, b| a.title.cmp(&b.title).then(a.id.cmp(&b.id)));
        Ok(channels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::catalog::ModerationMode;
    use crate::infra::marketplace::InMemoryMarketplaceStore;

    #[tokio::test]
    async fn direct_links_win_and_are_sorted_by_title() {
        let store = Arc::new(InMemoryMarketplaceStore::new());
        let root = store.add_category("Vehicles", "vehicles", None);
        let cars = store.add_category("Cars", "cars", Some(root.id));

        let zeta = store.add_channel("1", "Zeta", ModerationMode::Auto);
        let alpha = store.add_channel("2", "Alpha", ModerationMode::Auto);
        let parent_only = store.add_channel("3", "Parent", ModerationMode::Auto);
        store.link(cars.id, zeta.id, true);
        store.link(cars.id, alpha.id, true);
        store.link(root.id, parent_only.id, true);

        let resolver = ChannelResolver::new(Arc::clone(&store));
        let titles: Vec<String> = resolver
            .resolve_channels(cars.id)
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.title)
            .collect();

        assert_eq!(titles, vec!["Alpha", "Zeta"]);
    }

    #[tokio::test]
    async fn falls_back_to_nearest_ancestor() {
        let store = Arc::new(InMemoryMarketplaceStore::new());
        let root = store.add_category("Vehicles", "vehicles", None);
        let cars = store.add_category("Cars", "cars", Some(root.id));
        let sedans = store.add_category("Sedans", "sedans", Some(cars.id));
        let trucks = store.add_category("Trucks", "trucks", Some(root.id));

        let root_channel = store.add_channel("1", "Everything", ModerationMode::Auto);
        let truck_channel = store.add_channel("2", "Trucks only", ModerationMode::Auto);
        store.link(root.id, root_channel.id, true);
        store.link(trucks.id, truck_channel.id, true);

        let resolver = ChannelResolver::new(Arc::clone(&store));
        let for_sedans = resolver.resolve_channels(sedans.id).await.unwrap();
        let for_root = resolver.resolve_channels(root.id).await.unwrap();

        assert_eq!(for_sedans, for_root);
        assert_eq!(for_sedans.len(), 1);
        assert_eq!(for_sedans[0].id, root_channel.id);
    }

    #[tokio::test]
    async fn disabled_links_and_inactive_channels_are_ignored() {
        let store = Arc::new(InMemoryMarketplaceStore::new());
        let root = store.add_category("Jobs", "jobs", None);
        let child = store.add_category("IT", "it", Some(root.id));

        let disabled = store.add_channel("1", "Disabled link", ModerationMode::Auto);
        let mut inactive = store.add_channel("2", "Inactive", ModerationMode::Auto);
        inactive.active = false;
        store.update_channel(inactive.clone());
        let fallback = store.add_channel("3", "Fallback", ModerationMode::Auto);

        store.link(child.id, disabled.id, false);
        store.link(child.id, inactive.id, true);
        store.link(root.id, fallback.id, true);

        let resolver = ChannelResolver::new(Arc::clone(&store));
        let channels = resolver.resolve_channels(child.id).await.unwrap();

        assert_eq!(channels.len(), 1);
        assert_eq!(channels[0].id, fallback.id);
    }

    #[tokio::test]
    async fn parentless_category_without_links_resolves_empty() {
        let store = Arc::new(InMemoryMarketplaceStore::new());
        let lonely = store.add_category("Misc", "misc", None);

        let resolver = ChannelResolver::new(Arc::clone(&store));
        assert!(resolver.resolve_channels(lonely.id).await.unwrap().is_empty());
        assert!(resolver.resolve_channels(9_999).await.unwrap().is_empty());
    }
}
