//! LLM provider wizard, listing and row actions
//!
//! The provider step is generated from the backend's built-in option for the
//! chosen provider: which credentials are required, which custom config keys
//! exist and which models can be picked. Before saving, the wizard asks the
//! backend to make a test call with the entered credentials.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use super::{by_name, from_draft};
use crate::api::llm_providers::{
    self, FullLlmProvider, LlmProviderUpsertRequest, TestLlmRequest,
    WellKnownLlmProviderDescriptor, LLM_PROVIDER_PATH,
};
use crate::api::{AdminClient, ApiError};
use crate::ui::form::{
    is_blank, CrossFieldRule, FieldDescriptor, FormSchema, ListItemKind, SchemaError, Values,
};
use crate::ui::listing::{contains_ignore_case, ListingTable, RowActions};
use crate::ui::wizard::{DraftSink, StepDescriptor, Wizard, WizardError};

/// Draft fields holding custom config values are named `custom_config.<key>`
const CUSTOM_CONFIG_PREFIX: &str = "custom_config.";

/// Optional text fields that the backend expects as `null` when empty
const NULLABLE_TEXT: &[&str] = &[
    "api_key",
    "api_base",
    "api_version",
    "fast_default_model_name",
];

fn model_field(
    name: &str,
    label: &str,
    models: &[String],
    default: Option<&String>,
) -> FieldDescriptor {
    let field = if models.is_empty() {
        FieldDescriptor::text(name, label)
    } else {
        FieldDescriptor::select(name, label, models.iter().cloned())
    };
    match default {
        Some(model) if models.is_empty() || models.contains(model) => {
            field.default_value(model.clone())
        }
        _ => field,
    }
}

/// Credentials, models; the schema follows `descriptor`
pub fn steps(descriptor: &WellKnownLlmProviderDescriptor) -> Result<Vec<StepDescriptor>, SchemaError> {
    let mut provider_fields = vec![
        FieldDescriptor::text("name", "Display Name")
            .required()
            .help("Name shown to users when they pick a model"),
        FieldDescriptor::text("api_key", "API Key").required_when(descriptor.api_key_required),
        FieldDescriptor::text("api_base", "API Base").required_when(descriptor.api_base_required),
        FieldDescriptor::text("api_version", "API Version")
            .required_when(descriptor.api_version_required),
    ];
    for key in &descriptor.custom_config_keys {
        let mut field = FieldDescriptor::text(format!("{CUSTOM_CONFIG_PREFIX}{}", key.name), &key.name)
            .required_when(key.is_required);
        if let Some(description) = &key.description {
            field = field.help(description.clone());
        }
        provider_fields.push(field);
    }

    let models = &descriptor.llm_names;
    let model_fields = vec![
        model_field(
            "default_model_name",
            "Default Model",
            models,
            descriptor.default_model.as_ref(),
        )
        .required(),
        model_field(
            "fast_default_model_name",
            "Fast Model",
            models,
            descriptor.default_fast_model.as_ref(),
        ),
        FieldDescriptor::boolean("is_public", "Available to all users").default_value(true),
        FieldDescriptor::list("display_model_names", "Visible Models", ListItemKind::Text),
    ];
    let visible_known = models.clone();
    let model_rules = vec![CrossFieldRule::custom(
        "display_model_names",
        &[],
        move |values| {
            if visible_known.is_empty() {
                return None;
            }
            let unknown: Vec<&str> = values
                .get("display_model_names")
                .and_then(Value::as_array)
                .into_iter()
                .flatten()
                .filter_map(Value::as_str)
                .filter(|m| !visible_known.iter().any(|k| k == m))
                .collect();
            (!unknown.is_empty()).then(|| format!("Unknown models: {}", unknown.join(", ")))
        },
    )];

    Ok(vec![
        StepDescriptor::new(
            format!("{} Credentials", descriptor.display_name),
            FormSchema::new(provider_fields, vec![])?,
        ),
        StepDescriptor::new("Models", FormSchema::new(model_fields, model_rules)?),
    ])
}

/// Build the upsert body for `provider` from a Draft
pub fn upsert_request(provider: &str, draft: &Values) -> Result<LlmProviderUpsertRequest, ApiError> {
    let mut body = Values::new();
    let mut custom_config = BTreeMap::new();

    for (name, value) in draft {
        if let Some(key) = name.strip_prefix(CUSTOM_CONFIG_PREFIX) {
            if let Some(text) = value.as_str().filter(|s| !s.trim().is_empty()) {
                custom_config.insert(key.to_string(), text.to_string());
            }
        } else if NULLABLE_TEXT.contains(&name.as_str()) && is_blank(value) {
            body.insert(name.clone(), Value::Null);
        } else {
            body.insert(name.clone(), value.clone());
        }
    }

    body.insert("provider".to_string(), json!(provider));
    if !custom_config.is_empty() {
        body.insert("custom_config".to_string(), json!(custom_config));
    }
    if body.get("display_model_names").is_some_and(is_blank) {
        body.insert("display_model_names".to_string(), Value::Null);
    }
    from_draft(&body)
}

pub struct LlmProviderSink {
    client: AdminClient,
    provider: String,
    display_name: String,
}

impl LlmProviderSink {
    pub fn new(client: AdminClient, descriptor: &WellKnownLlmProviderDescriptor) -> Self {
        Self {
            client,
            provider: descriptor.name.clone(),
            display_name: format!("{} provider", descriptor.display_name),
        }
    }
}

#[async_trait]
impl DraftSink for LlmProviderSink {
    fn entity_name(&self) -> &str {
        &self.display_name
    }

    fn invalidates(&self) -> Vec<String> {
        vec![LLM_PROVIDER_PATH.to_string()]
    }

    async fn preflight(&self, draft: &Values) -> Result<(), ApiError> {
        let request = upsert_request(&self.provider, draft)?;
        llm_providers::test(&self.client, &TestLlmRequest::from(&request)).await
    }

    async fn create(&self, draft: &Values) -> Result<Value, ApiError> {
        llm_providers::upsert(&self.client, &upsert_request(&self.provider, draft)?).await
    }

    // The backend upserts by name; the id only selects edit mode
    async fn update(&self, _id: i64, draft: &Values) -> Result<Value, ApiError> {
        llm_providers::upsert(&self.client, &upsert_request(&self.provider, draft)?).await
    }
}

/// Draft values for editing `provider`
pub fn seed_from(provider: &FullLlmProvider) -> Values {
    let mut values = Values::new();
    values.insert("name".to_string(), json!(provider.name));
    values.insert("api_key".to_string(), json!(provider.api_key));
    values.insert("api_base".to_string(), json!(provider.api_base));
    values.insert("api_version".to_string(), json!(provider.api_version));
    for (key, value) in provider.custom_config.iter().flatten() {
        values.insert(format!("{CUSTOM_CONFIG_PREFIX}{key}"), json!(value));
    }
    values.insert(
        "default_model_name".to_string(),
        json!(provider.default_model_name),
    );
    values.insert(
        "fast_default_model_name".to_string(),
        json!(provider.fast_default_model_name),
    );
    values.insert("is_public".to_string(), json!(provider.is_public));
    values.insert(
        "display_model_names".to_string(),
        json!(provider.display_model_names.clone().unwrap_or_default()),
    );
    values
}

pub fn create_wizard(
    client: AdminClient,
    descriptor: &WellKnownLlmProviderDescriptor,
) -> Result<Wizard, WizardError> {
    Wizard::create(
        steps(descriptor)?,
        Arc::new(LlmProviderSink::new(client, descriptor)),
    )
}

pub fn edit_wizard(
    client: AdminClient,
    descriptor: &WellKnownLlmProviderDescriptor,
    provider: &FullLlmProvider,
) -> Result<Wizard, WizardError> {
    Wizard::edit(
        steps(descriptor)?,
        Arc::new(LlmProviderSink::new(client, descriptor)),
        provider.id,
        &seed_from(provider),
    )
}

/// The default provider first, then by name
pub fn listing(page_size: usize) -> ListingTable<FullLlmProvider> {
    ListingTable::new(
        page_size,
        |a: &FullLlmProvider, b: &FullLlmProvider| {
            b.is_default()
                .cmp(&a.is_default())
                .then_with(|| by_name(&a.name, &b.name))
        },
        |provider: &FullLlmProvider, query: &str| {
            contains_ignore_case(&provider.name, query)
                || contains_ignore_case(&provider.provider, query)
        },
    )
}

pub struct LlmProviderActions {
    client: AdminClient,
}

impl LlmProviderActions {
    pub fn new(client: AdminClient) -> Self {
        Self { client }
    }

    /// Make `provider` the default for all users
    pub async fn set_default(&self, provider: &FullLlmProvider) -> Result<(), ApiError> {
        llm_providers::set_default(&self.client, provider.id).await
    }
}

#[async_trait]
impl RowActions<FullLlmProvider> for LlmProviderActions {
    fn cache_key(&self) -> &str {
        LLM_PROVIDER_PATH
    }

    fn describe(&self, item: &FullLlmProvider) -> String {
        format!("LLM provider '{}'", item.name)
    }

    async fn delete(&self, item: &FullLlmProvider) -> Result<(), ApiError> {
        llm_providers::delete(&self.client, item.id).await
    }

    fn seed(&self, item: &FullLlmProvider) -> (i64, Values) {
        (item.id, seed_from(item))
    }
}
