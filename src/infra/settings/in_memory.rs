use crate::core::settings::SettingsStore;
use async_trait::async_trait;
use dashmap::DashMap;

/// Settings held in a map, for tests.
#[derive(Default)]
pub struct InMemorySettingsStore {
    values: DashMap<String, String>,
}

impl InMemorySettingsStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, key: &str, value: &str) {
        self.values.insert(key.to_string(), value.to_string());
    }
}

#[async_trait]
impl SettingsStore for InMemorySettingsStore {
    async fn get_raw(&self, key: &str) -> Option<String> {
        self.values.get(key).map(|v| v.clone())
    }
}
