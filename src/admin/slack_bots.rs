//! Slack bot configuration and token wizards

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use super::{from_draft, to_values};
use crate::api::slack_bots::{
    self, SlackBotConfig, SlackBotConfigRequest, SlackBotResponseType, SlackBotTokens,
    ANSWER_FILTERS, SLACK_BOT_CONFIG_PATH,
};
use crate::api::{AdminClient, ApiError};
use crate::ui::form::{
    is_blank, CrossFieldRule, FieldDescriptor, FormSchema, ListItemKind, SchemaError, Values,
};
use crate::ui::listing::{contains_ignore_case, ListingTable, RowActions};
use crate::ui::wizard::{DraftSink, StepDescriptor, Wizard, WizardError};

/// Personas the backend creates for a bot's document sets carry this prefix
pub const SLACK_BOT_PERSONA_PREFIX: &str = "__slack_bot_persona__";

/// Channel, behaviour, review
pub fn config_steps() -> Result<Vec<StepDescriptor>, SchemaError> {
    let response_types: Vec<&str> = SlackBotResponseType::all()
        .iter()
        .map(SlackBotResponseType::as_str)
        .collect();

    Ok(vec![
        StepDescriptor::new(
            "Channel",
            FormSchema::new(
                vec![
                    FieldDescriptor::list("channel_names", "Channel Names", ListItemKind::Text)
                        .required()
                        .help("Slack channels the bot answers in, without the leading '#'"),
                    FieldDescriptor::list("document_sets", "Document Sets", ListItemKind::Integer)
                        .help("Restrict answers to these document sets"),
                    FieldDescriptor::integer("persona_id", "Persona")
                        .help("Answer with an existing persona instead of document sets"),
                ],
                vec![CrossFieldRule::custom(
                    "persona_id",
                    &["document_sets"],
                    |values| {
                        let persona = values.get("persona_id").unwrap_or(&Value::Null);
                        let sets = values.get("document_sets").unwrap_or(&Value::Null);
                        (!is_blank(persona) && !is_blank(sets)).then(|| {
                            "Choose either document sets or a persona, not both".to_string()
                        })
                    },
                )],
            )?,
        ),
        StepDescriptor::new(
            "Behaviour",
            FormSchema::new(
                vec![
                    FieldDescriptor::select("response_type", "Response Format", response_types)
                        .required()
                        .default_value(SlackBotResponseType::default().as_str()),
                    FieldDescriptor::boolean("respond_tag_only", "Respond to @mentions only"),
                    FieldDescriptor::boolean("respond_to_bots", "Respond to bot messages"),
                    FieldDescriptor::boolean("enable_auto_filters", "Enable auto filters"),
                    FieldDescriptor::list("answer_filters", "Answer Filters", ListItemKind::Text),
                    FieldDescriptor::list(
                        "respond_member_group_list",
                        "Respond only to",
                        ListItemKind::Text,
                    ),
                    FieldDescriptor::list("follow_up_tags", "Follow-up Tags", ListItemKind::Text),
                ],
                vec![CrossFieldRule::custom("answer_filters", &[], |values| {
                    let unknown: Vec<&str> = values
                        .get("answer_filters")
                        .and_then(Value::as_array)
                        .into_iter()
                        .flatten()
                        .filter_map(Value::as_str)
                        .filter(|f| !ANSWER_FILTERS.contains(f))
                        .collect();
                    (!unknown.is_empty())
                        .then(|| format!("Unknown answer filters: {}", unknown.join(", ")))
                })],
            )?,
        ),
        StepDescriptor::summary("Review"),
    ])
}

/// Strip a leading '#' the user may have typed
fn normalize_channels(draft: &mut Values) {
    if let Some(Value::Array(channels)) = draft.get_mut("channel_names") {
        for channel in channels.iter_mut() {
            if let Some(name) = channel.as_str() {
                *channel = json!(name.trim().trim_start_matches('#'));
            }
        }
    }
}

fn config_request(draft: &Values) -> Result<SlackBotConfigRequest, ApiError> {
    let mut draft = draft.clone();
    normalize_channels(&mut draft);
    from_draft(&draft)
}

pub struct SlackBotConfigSink {
    client: AdminClient,
}

impl SlackBotConfigSink {
    pub fn new(client: AdminClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl DraftSink for SlackBotConfigSink {
    fn entity_name(&self) -> &str {
        "Slack bot config"
    }

    fn invalidates(&self) -> Vec<String> {
        vec![SLACK_BOT_CONFIG_PATH.to_string()]
    }

    async fn create(&self, draft: &Values) -> Result<Value, ApiError> {
        slack_bots::create(&self.client, &config_request(draft)?).await
    }

    async fn update(&self, id: i64, draft: &Values) -> Result<Value, ApiError> {
        slack_bots::update(&self.client, id, &config_request(draft)?).await
    }
}

/// Draft values for editing `config`. A bot backed by its own generated
/// persona is shown by its document sets; any other persona by id.
pub fn seed_from(config: &SlackBotConfig) -> Values {
    let custom_persona = config
        .persona
        .as_ref()
        .filter(|p| !p.name.starts_with(SLACK_BOT_PERSONA_PREFIX));
    let channel = &config.channel_config;

    to_values(&SlackBotConfigRequest {
        channel_names: channel.channel_names.clone(),
        document_sets: if custom_persona.is_some() {
            Vec::new()
        } else {
            config.document_set_ids()
        },
        persona_id: custom_persona.map(|p| p.id),
        respond_tag_only: channel.respond_tag_only.unwrap_or(false),
        respond_to_bots: channel.respond_to_bots.unwrap_or(false),
        respond_member_group_list: channel.respond_member_group_list.clone().unwrap_or_default(),
        answer_filters: channel.answer_filters.clone().unwrap_or_default(),
        follow_up_tags: Some(channel.follow_up_tags.clone().unwrap_or_default()),
        response_type: config.response_type,
        enable_auto_filters: config.enable_auto_filters,
    })
}

pub fn create_wizard(client: AdminClient) -> Result<Wizard, WizardError> {
    Wizard::create(config_steps()?, Arc::new(SlackBotConfigSink::new(client)))
}

pub fn edit_wizard(client: AdminClient, config: &SlackBotConfig) -> Result<Wizard, WizardError> {
    Wizard::edit(
        config_steps()?,
        Arc::new(SlackBotConfigSink::new(client)),
        config.id,
        &seed_from(config),
    )
}

/// Sorted by id; the query matches channel names
pub fn listing(page_size: usize) -> ListingTable<SlackBotConfig> {
    ListingTable::new(
        page_size,
        |a: &SlackBotConfig, b: &SlackBotConfig| a.id.cmp(&b.id),
        |config: &SlackBotConfig, query: &str| {
            let query = query.trim_start_matches('#');
            config
                .channel_config
                .channel_names
                .iter()
                .any(|c| contains_ignore_case(c, query))
        },
    )
}

pub struct SlackBotConfigActions {
    client: AdminClient,
}

impl SlackBotConfigActions {
    pub fn new(client: AdminClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl RowActions<SlackBotConfig> for SlackBotConfigActions {
    fn cache_key(&self) -> &str {
        SLACK_BOT_CONFIG_PATH
    }

    fn describe(&self, item: &SlackBotConfig) -> String {
        format!("Slack bot config for {}", item.channel_label())
    }

    async fn delete(&self, item: &SlackBotConfig) -> Result<(), ApiError> {
        slack_bots::delete(&self.client, item.id).await
    }

    fn seed(&self, item: &SlackBotConfig) -> (i64, Values) {
        (item.id, seed_from(item))
    }
}

// ─── Tokens ─────────────────────────────────────────────────────────────────

pub fn token_steps() -> Result<Vec<StepDescriptor>, SchemaError> {
    Ok(vec![StepDescriptor::new(
        "Tokens",
        FormSchema::new(
            vec![
                FieldDescriptor::text("bot_token", "Slack Bot Token")
                    .required()
                    .pattern("^xoxb-"),
                FieldDescriptor::text("app_token", "Slack App Token")
                    .required()
                    .pattern("^xapp-"),
            ],
            vec![],
        )?,
    )])
}

/// Tokens are a singleton: create and update both replace them
pub struct SlackTokensSink {
    client: AdminClient,
}

impl SlackTokensSink {
    pub fn new(client: AdminClient) -> Self {
        Self { client }
    }

    async fn put(&self, draft: &Values) -> Result<Value, ApiError> {
        let tokens: SlackBotTokens = from_draft(draft)?;
        slack_bots::set_tokens(&self.client, &tokens).await?;
        Ok(Value::Null)
    }
}

#[async_trait]
impl DraftSink for SlackTokensSink {
    fn entity_name(&self) -> &str {
        "Slack bot tokens"
    }

    fn invalidates(&self) -> Vec<String> {
        Vec::new()
    }

    async fn create(&self, draft: &Values) -> Result<Value, ApiError> {
        self.put(draft).await
    }

    async fn update(&self, _id: i64, draft: &Values) -> Result<Value, ApiError> {
        self.put(draft).await
    }
}

pub fn tokens_wizard(client: AdminClient) -> Result<Wizard, WizardError> {
    Wizard::create(token_steps()?, Arc::new(SlackTokensSink::new(client)))
}
