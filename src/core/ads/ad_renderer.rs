// Turns an ad into the text that is actually posted to a channel.
//
// The pipeline treats the output as an opaque string, so deployments can swap
// in their own renderer without touching the publication logic.

use super::ads_models::Ad;
use crate::core::catalog::{Category, Channel};

pub trait AdRenderer: Send + Sync {
    fn render(&self, ad: &Ad, category: &Category, channel: &Channel, is_bump: bool) -> String;
}

/// Plain-text layout used by default.
pub struct DefaultAdRenderer;

impl AdRenderer for DefaultAdRenderer {
    fn render(&self, ad: &Ad, category: &Category, channel: &Channel, is_bump: bool) -> String {
        let mut lines = Vec::new();

        if is_bump {
            lines.push("🔼 Bumped".to_string());
        }
        lines.push(format!("**{}**", ad.title.trim()));
        lines.push(String::new());
        lines.push(ad.body.trim().to_string());
        lines.push(String::new());

        if let Some(location) = location_line(ad) {
            lines.push(format!("📍 {location}"));
        }
        if !ad.contacts.trim().is_empty() {
            lines.push(format!("📞 {}", ad.contacts.trim()));
        }
        lines.push(hashtag(&category.slug));

        match (&channel.footer_text, &channel.footer_link) {
            (Some(text), Some(link)) => lines.push(format!("\n[{text}]({link})")),
            (Some(text), None) => lines.push(format!("\n{text}")),
            (None, Some(link)) => lines.push(format!("\n{link}")),
            (None, None) => {}
        }

        lines.join("\n")
    }
}

fn location_line(ad: &Ad) -> Option<String> {
    let parts: Vec<&str> = [ad.city.as_deref(), ad.country.as_deref()]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect();

    if parts.is_empty() {
        None
    } else {
        Some(parts.join(", "))
    }
}

fn hashtag(slug: &str) -> String {
    let tag: String = slug
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect();
    format!("#{tag}")
}
