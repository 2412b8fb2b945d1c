//! Admin screens for each backend resource
//!
//! Every submodule provides the wizard steps for its resource, the
//! `DraftSink` that turns a finished Draft into a typed request, the listing
//! table configuration and the row actions.

pub mod document_sets;
pub mod llm_providers;
pub mod search_settings;
pub mod slack_bots;
pub mod standard_answers;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::api::ApiError;
use crate::ui::form::Values;

/// Decode a Draft into a typed request body
pub(crate) fn from_draft<R: DeserializeOwned>(draft: &Values) -> Result<R, ApiError> {
    serde_json::from_value(Value::Object(draft.clone()))
        .map_err(|e| ApiError::decode(format!("invalid form data: {e}")))
}

/// Flatten a serializable record into Draft values
pub(crate) fn to_values<T: Serialize>(record: &T) -> Values {
    match serde_json::to_value(record) {
        Ok(Value::Object(map)) => map,
        _ => Values::new(),
    }
}

/// Lower-cased comparison used by name-sorted listings
pub(crate) fn by_name(a: &str, b: &str) -> std::cmp::Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}
