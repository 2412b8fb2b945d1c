//! LLM provider models and endpoints

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{AdminClient, ApiError};

pub const BUILT_IN_OPTIONS_PATH: &str = "/api/admin/llm/built-in/options";
pub const LLM_PROVIDER_PATH: &str = "/api/admin/llm/provider";
pub const LLM_TEST_PATH: &str = "/api/admin/llm/test";

/// Extra configuration key a built-in provider expects (e.g. AWS region)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CustomConfigKey {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_true")]
    pub is_required: bool,
    #[serde(default)]
    pub is_secret: bool,
}

fn default_true() -> bool {
    true
}

/// Built-in provider option returned by `/built-in/options`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WellKnownLlmProviderDescriptor {
    pub name: String,
    pub display_name: String,
    #[serde(default)]
    pub api_key_required: bool,
    #[serde(default)]
    pub api_base_required: bool,
    #[serde(default)]
    pub api_version_required: bool,
    #[serde(default)]
    pub custom_config_keys: Vec<CustomConfigKey>,
    #[serde(default)]
    pub llm_names: Vec<String>,
    #[serde(default)]
    pub default_model: Option<String>,
    #[serde(default)]
    pub default_fast_model: Option<String>,
}

/// A configured provider as stored by the backend
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FullLlmProvider {
    pub id: i64,
    pub name: String,
    pub provider: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub api_base: Option<String>,
    #[serde(default)]
    pub api_version: Option<String>,
    #[serde(default)]
    pub custom_config: Option<BTreeMap<String, String>>,
    pub default_model_name: String,
    #[serde(default)]
    pub fast_default_model_name: Option<String>,
    #[serde(default)]
    pub is_default_provider: Option<bool>,
    #[serde(default)]
    pub is_public: bool,
    #[serde(default)]
    pub model_names: Option<Vec<String>>,
    #[serde(default)]
    pub display_model_names: Option<Vec<String>>,
}

impl FullLlmProvider {
    pub fn is_default(&self) -> bool {
        self.is_default_provider.unwrap_or(false)
    }
}

/// Body of `PUT /api/admin/llm/provider`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LlmProviderUpsertRequest {
    pub name: String,
    pub provider: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub api_base: Option<String>,
    #[serde(default)]
    pub api_version: Option<String>,
    #[serde(default)]
    pub custom_config: Option<BTreeMap<String, String>>,
    pub default_model_name: String,
    #[serde(default)]
    pub fast_default_model_name: Option<String>,
    #[serde(default = "default_true")]
    pub is_public: bool,
    #[serde(default)]
    pub display_model_names: Option<Vec<String>>,
}

/// Body of `POST /api/admin/llm/test`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TestLlmRequest {
    pub provider: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub api_base: Option<String>,
    #[serde(default)]
    pub api_version: Option<String>,
    #[serde(default)]
    pub custom_config: Option<BTreeMap<String, String>>,
    pub default_model_name: String,
    #[serde(default)]
    pub fast_default_model_name: Option<String>,
}

impl From<&LlmProviderUpsertRequest> for TestLlmRequest {
    fn from(req: &LlmProviderUpsertRequest) -> Self {
        Self {
            provider: req.provider.clone(),
            api_key: req.api_key.clone(),
            api_base: req.api_base.clone(),
            api_version: req.api_version.clone(),
            custom_config: req.custom_config.clone(),
            default_model_name: req.default_model_name.clone(),
            fast_default_model_name: req.fast_default_model_name.clone(),
        }
    }
}

pub async fn built_in_options(
    client: &AdminClient,
) -> Result<Vec<WellKnownLlmProviderDescriptor>, ApiError> {
    client.get(BUILT_IN_OPTIONS_PATH).await
}

pub async fn list(client: &AdminClient) -> Result<Vec<FullLlmProvider>, ApiError> {
    client.get(LLM_PROVIDER_PATH).await
}

pub async fn upsert(
    client: &AdminClient,
    request: &LlmProviderUpsertRequest,
) -> Result<serde_json::Value, ApiError> {
    client.put(LLM_PROVIDER_PATH, request).await
}

/// Pre-flight check: the backend makes a real call with these credentials
pub async fn test(client: &AdminClient, request: &TestLlmRequest) -> Result<(), ApiError> {
    client
        .post::<_, serde_json::Value>(LLM_TEST_PATH, request)
        .await
        .map(|_| ())
}

pub async fn delete(client: &AdminClient, id: i64) -> Result<(), ApiError> {
    client
        .delete::<serde_json::Value>(&format!("{LLM_PROVIDER_PATH}/{id}"))
        .await
        .map(|_| ())
}

pub async fn set_default(client: &AdminClient, id: i64) -> Result<(), ApiError> {
    client
        .post_empty::<serde_json::Value>(&format!("{LLM_PROVIDER_PATH}/{id}/default"))
        .await
        .map(|_| ())
}
