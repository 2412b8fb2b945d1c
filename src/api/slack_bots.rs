//! Slack bot configuration models and endpoints

use serde::{Deserialize, Serialize};

use super::{AdminClient, ApiError};

pub const SLACK_BOT_CONFIG_PATH: &str = "/api/manage/admin/slack-bot/config";
pub const SLACK_BOT_TOKENS_PATH: &str = "/api/manage/admin/slack-bot/tokens";

/// How the bot formats its answers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlackBotResponseType {
    Quotes,
    #[default]
    Citations,
}

impl SlackBotResponseType {
    pub fn all() -> &'static [SlackBotResponseType] {
        &[SlackBotResponseType::Quotes, SlackBotResponseType::Citations]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SlackBotResponseType::Quotes => "quotes",
            SlackBotResponseType::Citations => "citations",
        }
    }
}

/// Filters applied to incoming messages or generated answers
pub const ANSWER_FILTERS: &[&str] = &["well_answered_postfilter", "questionmark_prefilter"];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DocumentSetRef {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PersonaRef {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub document_sets: Vec<DocumentSetRef>,
}

/// Per-channel behaviour stored on a Slack bot config
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ChannelConfig {
    pub channel_names: Vec<String>,
    #[serde(default)]
    pub respond_tag_only: Option<bool>,
    #[serde(default)]
    pub respond_to_bots: Option<bool>,
    #[serde(default)]
    pub respond_member_group_list: Option<Vec<String>>,
    #[serde(default)]
    pub answer_filters: Option<Vec<String>>,
    #[serde(default)]
    pub follow_up_tags: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SlackBotConfig {
    pub id: i64,
    #[serde(default)]
    pub persona: Option<PersonaRef>,
    pub channel_config: ChannelConfig,
    #[serde(default)]
    pub response_type: SlackBotResponseType,
    #[serde(default)]
    pub enable_auto_filters: bool,
}

impl SlackBotConfig {
    pub fn channel_label(&self) -> String {
        self.channel_config
            .channel_names
            .iter()
            .map(|c| format!("#{c}"))
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn document_set_ids(&self) -> Vec<i64> {
        self.persona
            .as_ref()
            .map(|p| p.document_sets.iter().map(|d| d.id).collect())
            .unwrap_or_default()
    }
}

/// Body of `POST /config` and `PATCH /config/{id}`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SlackBotConfigRequest {
    pub channel_names: Vec<String>,
    #[serde(default)]
    pub document_sets: Vec<i64>,
    #[serde(default)]
    pub persona_id: Option<i64>,
    #[serde(default)]
    pub respond_tag_only: bool,
    #[serde(default)]
    pub respond_to_bots: bool,
    #[serde(default)]
    pub respond_member_group_list: Vec<String>,
    #[serde(default)]
    pub answer_filters: Vec<String>,
    #[serde(default)]
    pub follow_up_tags: Option<Vec<String>>,
    #[serde(default)]
    pub response_type: SlackBotResponseType,
    #[serde(default)]
    pub enable_auto_filters: bool,
}

/// Body of `PUT /tokens`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SlackBotTokens {
    pub bot_token: String,
    pub app_token: String,
}

pub async fn list(client: &AdminClient) -> Result<Vec<SlackBotConfig>, ApiError> {
    client.get(SLACK_BOT_CONFIG_PATH).await
}

pub async fn create(
    client: &AdminClient,
    request: &SlackBotConfigRequest,
) -> Result<serde_json::Value, ApiError> {
    client.post(SLACK_BOT_CONFIG_PATH, request).await
}

pub async fn update(
    client: &AdminClient,
    id: i64,
    request: &SlackBotConfigRequest,
) -> Result<serde_json::Value, ApiError> {
    client
        .patch(&format!("{SLACK_BOT_CONFIG_PATH}/{id}"), request)
        .await
}

pub async fn delete(client: &AdminClient, id: i64) -> Result<(), ApiError> {
    client
        .delete::<serde_json::Value>(&format!("{SLACK_BOT_CONFIG_PATH}/{id}"))
        .await
        .map(|_| ())
}

pub async fn set_tokens(client: &AdminClient, tokens: &SlackBotTokens) -> Result<(), ApiError> {
    client
        .put::<_, serde_json::Value>(SLACK_BOT_TOKENS_PATH, tokens)
        .await
        .map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_label() {
        let config = SlackBotConfig {
            id: 7,
            persona: None,
            channel_config: ChannelConfig {
                channel_names: vec!["support".to_string(), "eng".to_string()],
                ..Default::default()
            },
            response_type: SlackBotResponseType::Citations,
            enable_auto_filters: false,
        };
        assert_eq!(config.channel_label(), "#support, #eng");
        assert!(config.document_set_ids().is_empty());
    }

    #[test]
    fn test_response_type_serde() {
        assert_eq!(
            serde_json::to_value(SlackBotResponseType::Quotes).unwrap(),
            serde_json::json!("quotes")
        );
        let parsed: SlackBotResponseType = serde_json::from_str("\"citations\"").unwrap();
        assert_eq!(parsed, SlackBotResponseType::Citations);
    }

    #[test]
    fn test_persona_document_sets() {
        let json = r#"{
            "id": 1,
            "persona": {"id": 4, "name": "__slack_bot_persona__support", "document_sets": [{"id": 2, "name": "Docs"}]},
            "channel_config": {"channel_names": ["support"], "respond_tag_only": true}
        }"#;
        let config: SlackBotConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.document_set_ids(), vec![2]);
        assert_eq!(config.channel_config.respond_tag_only, Some(true));
        assert_eq!(config.response_type, SlackBotResponseType::Citations);
    }
}
