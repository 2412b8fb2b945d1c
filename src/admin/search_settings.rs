//! Embedding model / search settings wizard and status polling

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::from_draft;
use crate::api::search_settings::{
    self, SavedSearchSettings, SearchSettings, CURRENT_SEARCH_SETTINGS_PATH, EMBEDDING_PROVIDERS,
    SECONDARY_SEARCH_SETTINGS_PATH,
};
use crate::api::{AdminClient, ApiError};
use crate::cache::{Resource, ResourceCache};
use crate::config::Config;
use crate::ui::form::{is_blank, CrossFieldRule, FieldDescriptor, FormSchema, SchemaError, Values};
use crate::ui::wizard::{DraftSink, StepDescriptor, Wizard, WizardError};

/// Select value standing for "no provider" (a self-hosted model)
pub const SELF_HOSTED: &str = "self_hosted";

/// Model, indexing, review
pub fn steps() -> Result<Vec<StepDescriptor>, SchemaError> {
    let providers: Vec<&str> = std::iter::once(SELF_HOSTED)
        .chain(EMBEDDING_PROVIDERS.iter().copied())
        .collect();

    Ok(vec![
        StepDescriptor::new(
            "Embedding Model",
            FormSchema::new(
                vec![
                    FieldDescriptor::select("provider_type", "Provider", providers)
                        .required()
                        .default_value(SELF_HOSTED),
                    FieldDescriptor::text("model_name", "Model Name").required(),
                    FieldDescriptor::integer("model_dim", "Model Dimension")
                        .required()
                        .min(1.0),
                ],
                vec![CrossFieldRule::custom(
                    "model_name",
                    &["provider_type"],
                    |values| {
                        let self_hosted = values.get("provider_type") == Some(&json!(SELF_HOSTED));
                        let name = values.get("model_name").and_then(Value::as_str).unwrap_or("");
                        (self_hosted && !name.is_empty() && !name.contains('/')).then(|| {
                            "Self-hosted models are named like 'organization/model'".to_string()
                        })
                    },
                )],
            )?,
        ),
        StepDescriptor::new(
            "Indexing",
            FormSchema::new(
                vec![
                    FieldDescriptor::boolean("normalize", "Normalize embeddings")
                        .default_value(true),
                    FieldDescriptor::text("query_prefix", "Query Prefix"),
                    FieldDescriptor::text("passage_prefix", "Passage Prefix"),
                    FieldDescriptor::boolean("multipass_indexing", "Multipass indexing"),
                ],
                vec![],
            )?,
        ),
        StepDescriptor::summary("Review"),
    ])
}

/// Build the body of `set-new-search-settings` from a Draft
pub fn settings_request(draft: &Values) -> Result<SavedSearchSettings, ApiError> {
    let mut body = draft.clone();
    if body.get("provider_type") == Some(&json!(SELF_HOSTED)) {
        body.insert("provider_type".to_string(), Value::Null);
    }
    for prefix in ["query_prefix", "passage_prefix"] {
        if body.get(prefix).is_some_and(is_blank) {
            body.insert(prefix.to_string(), Value::Null);
        }
    }
    from_draft(&body)
}

pub struct SearchSettingsSink {
    client: AdminClient,
}

impl SearchSettingsSink {
    pub fn new(client: AdminClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl DraftSink for SearchSettingsSink {
    fn entity_name(&self) -> &str {
        "Embedding model"
    }

    fn invalidates(&self) -> Vec<String> {
        vec![
            CURRENT_SEARCH_SETTINGS_PATH.to_string(),
            SECONDARY_SEARCH_SETTINGS_PATH.to_string(),
        ]
    }

    async fn create(&self, draft: &Values) -> Result<Value, ApiError> {
        search_settings::set_new(&self.client, &settings_request(draft)?).await
    }

    // Settings are replaced wholesale; a change starts a re-index
    async fn update(&self, _id: i64, draft: &Values) -> Result<Value, ApiError> {
        self.create(draft).await
    }
}

/// Draft values starting from the active settings
pub fn seed_from(settings: &SearchSettings) -> Values {
    let mut values = Values::new();
    values.insert(
        "provider_type".to_string(),
        json!(settings.provider_type.as_deref().unwrap_or(SELF_HOSTED)),
    );
    values.insert("model_name".to_string(), json!(settings.model_name));
    values.insert("model_dim".to_string(), json!(settings.model_dim));
    values.insert("normalize".to_string(), json!(settings.normalize));
    values.insert(
        "query_prefix".to_string(),
        json!(settings.query_prefix.clone().unwrap_or_default()),
    );
    values.insert(
        "passage_prefix".to_string(),
        json!(settings.passage_prefix.clone().unwrap_or_default()),
    );
    values.insert(
        "multipass_indexing".to_string(),
        json!(settings.multipass_indexing),
    );
    values
}

pub fn create_wizard(client: AdminClient) -> Result<Wizard, WizardError> {
    Wizard::create(steps()?, Arc::new(SearchSettingsSink::new(client)))
}

/// A wizard pre-filled with `current`. There is one settings record, so
/// it is submitted as a new configuration rather than an edit.
pub fn change_wizard(client: AdminClient, current: &SearchSettings) -> Result<Wizard, WizardError> {
    Wizard::edit(
        steps()?,
        Arc::new(SearchSettingsSink::new(client)),
        0,
        &seed_from(current),
    )
}

/// Snapshot of the active and pending embedding settings
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingStatus {
    pub current: Resource<Option<SearchSettings>>,
    pub secondary: Resource<Option<SearchSettings>>,
}

impl EmbeddingStatus {
    pub fn from_cache(cache: &ResourceCache) -> Self {
        Self {
            current: cache.resource(CURRENT_SEARCH_SETTINGS_PATH),
            secondary: cache.resource(SECONDARY_SEARCH_SETTINGS_PATH),
        }
    }

    /// True while a switch to new settings is re-indexing
    pub fn is_migrating(&self) -> bool {
        matches!(self.secondary.data, Some(Some(_)))
    }
}

/// Poll current settings quickly and the pending ones at the listing rate
pub fn spawn_polling(
    cache: &Arc<ResourceCache>,
    config: &Config,
    cancel: &CancellationToken,
) -> Vec<JoinHandle<()>> {
    vec![
        cache.spawn_revalidation(
            CURRENT_SEARCH_SETTINGS_PATH,
            config.cache.search_settings_poll(),
            cancel.clone(),
        ),
        cache.spawn_revalidation(
            SECONDARY_SEARCH_SETTINGS_PATH,
            config.cache.revalidate_interval(),
            cancel.clone(),
        ),
    ]
}
