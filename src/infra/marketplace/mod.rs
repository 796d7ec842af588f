// Implementations of the marketplace storage ports.

pub mod catalog_seed;
#[cfg(test)]
pub mod in_memory;
pub mod sqlite_store;

pub use catalog_seed::CatalogSeed;
#[cfg(test)]
pub use in_memory::InMemoryMarketplaceStore;
pub use sqlite_store::SqliteMarketplaceStore;
