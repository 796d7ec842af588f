// Implementations of the settings store.

#[cfg(test)]
pub mod in_memory;
pub mod sqlite_store;

#[cfg(test)]
pub use in_memory::InMemorySettingsStore;
pub use sqlite_store::SqliteSettingsStore;
