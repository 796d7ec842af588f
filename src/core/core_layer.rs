// The core module contains all business logic.
// Each feature gets its own submodule.

#[path = "ads/mod.rs"]
pub mod ads;

#[path = "catalog/mod.rs"]
pub mod catalog;

#[path = "content_guard/content_guard.rs"]
pub mod content_guard;

#[path = "marketplace.rs"]
pub mod marketplace;

#[path = "moderation/mod.rs"]
pub mod moderation;

#[path = "publication/mod.rs"]
pub mod publication;

#[path = "quota/quota_service.rs"]
pub mod quota;

#[path = "settings/settings_store.rs"]
pub mod settings;

#[path = "users/user_store.rs"]
pub mod users;
