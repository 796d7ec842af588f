// Runtime settings port - typed key lookups with caller-supplied defaults.
//
// Lookups never fail: a missing key, a storage hiccup, or a value that does
// not parse all fall back to the default the caller passed in.

use async_trait::async_trait;

/// Handle of a channel every submitter must be subscribed to. Empty disables the gate.
pub const REQUIRED_SUBSCRIPTION: &str = "subscription.required_channel";
/// `day`, `week`, `month` or `none`.
pub const QUOTA_PERIOD: &str = "quota.period";
/// Free submissions per quota period.
pub const QUOTA_FREE_LIMIT: &str = "quota.free_limit";
/// IANA timezone that quota periods are computed in.
pub const QUOTA_TIMEZONE: &str = "quota.timezone";
/// Global anti-spam gate for unpaid ads.
pub const CONTENT_GUARD_ENABLED: &str = "content_guard.enabled";

pub const DEFAULT_QUOTA_PERIOD: &str = "day";
pub const DEFAULT_QUOTA_FREE_LIMIT: i64 = 1;
pub const DEFAULT_QUOTA_TIMEZONE: &str = "UTC";

#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Raw stored value, if any.
    async fn get_raw(&self, key: &str) -> Option<String>;

    async fn get_string(&self, key: &str, default: &str) -> String {
        self.get_raw(key)
            .await
            .map(|v| v.trim().to_string())
            .unwrap_or_else(|| default.to_string())
    }

    async fn get_int(&self, key: &str, default: i64) -> i64 {
        match self.get_raw(key).await {
            Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
                tracing::warn!(key, value = %raw, "Setting is not an integer, using default");
                default
            }),
            None => default,
        }
    }

    async fn get_bool(&self, key: &str, default: bool) -> bool {
        match self.get_raw(key).await {
            Some(raw) => parse_bool(&raw).unwrap_or_else(|| {
                tracing::warn!(key, value = %raw, "Setting is not a boolean, using default");
                default
            }),
            None => default,
        }
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
