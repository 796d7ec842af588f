// Catalog module - category tree, channels, and channel resolution.

pub mod catalog_models;
pub mod channel_resolver;

pub use catalog_models::*;
pub use channel_resolver::*;
