// Ads module - ad records, publications, status derivation and rendering.

pub mod ad_renderer;
pub mod ads_models;

pub use ad_renderer::{AdRenderer, DefaultAdRenderer};
pub use ads_models::*;
