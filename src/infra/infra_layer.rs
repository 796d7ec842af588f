// The infra module contains implementations of core traits.
// Each feature implementation goes in its own submodule.

#[path = "marketplace/mod.rs"]
pub mod marketplace;

#[path = "settings/mod.rs"]
pub mod settings;

#[cfg(test)]
#[path = "delivery/mod.rs"]
pub mod delivery;
