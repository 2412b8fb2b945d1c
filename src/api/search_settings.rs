//! Search settings (embedding model) models and endpoints

use serde::{Deserialize, Serialize};

use super::{AdminClient, ApiError};

pub const CURRENT_SEARCH_SETTINGS_PATH: &str = "/api/search-settings/get-current-search-settings";
pub const SECONDARY_SEARCH_SETTINGS_PATH: &str =
    "/api/search-settings/get-secondary-search-settings";
pub const SET_NEW_SEARCH_SETTINGS_PATH: &str = "/api/search-settings/set-new-search-settings";
pub const CANCEL_NEW_EMBEDDING_PATH: &str = "/api/search-settings/cancel-new-embedding";

/// Embedding providers besides self-hosted models
pub const EMBEDDING_PROVIDERS: &[&str] = &["openai", "cohere", "voyage", "google"];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchSettings {
    pub model_name: String,
    pub model_dim: i64,
    #[serde(default)]
    pub normalize: bool,
    #[serde(default)]
    pub query_prefix: Option<String>,
    #[serde(default)]
    pub passage_prefix: Option<String>,
    /// `None` for self-hosted models
    #[serde(default)]
    pub provider_type: Option<String>,
    #[serde(default)]
    pub index_name: Option<String>,
    #[serde(default)]
    pub multipass_indexing: bool,
}

impl SearchSettings {
    pub fn is_self_hosted(&self) -> bool {
        self.provider_type.is_none()
    }
}

/// Body of `POST /set-new-search-settings`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SavedSearchSettings {
    pub model_name: String,
    pub model_dim: i64,
    #[serde(default)]
    pub normalize: bool,
    #[serde(default)]
    pub query_prefix: Option<String>,
    #[serde(default)]
    pub passage_prefix: Option<String>,
    #[serde(default)]
    pub provider_type: Option<String>,
    #[serde(default)]
    pub multipass_indexing: bool,
}

/// `None` when the backend answers `null` (no settings of that kind)
pub async fn current(client: &AdminClient) -> Result<Option<SearchSettings>, ApiError> {
    client.get(CURRENT_SEARCH_SETTINGS_PATH).await
}

/// Settings currently being re-indexed towards, if a migration is running
pub async fn secondary(client: &AdminClient) -> Result<Option<SearchSettings>, ApiError> {
    client.get(SECONDARY_SEARCH_SETTINGS_PATH).await
}

pub async fn set_new(
    client: &AdminClient,
    settings: &SavedSearchSettings,
) -> Result<serde_json::Value, ApiError> {
    client.post(SET_NEW_SEARCH_SETTINGS_PATH, settings).await
}

pub async fn cancel_new_embedding(client: &AdminClient) -> Result<(), ApiError> {
    client
        .post_empty::<serde_json::Value>(CANCEL_NEW_EMBEDDING_PATH)
        .await
        .map(|_| ())
}
