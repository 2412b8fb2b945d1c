//! Standard answer models and endpoints

use serde::{Deserialize, Serialize};

use super::{AdminClient, ApiError};

pub const STANDARD_ANSWER_PATH: &str = "/api/manage/admin/standard-answer";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StandardAnswerCategory {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StandardAnswer {
    pub id: i64,
    pub keyword: String,
    pub answer: String,
    #[serde(default)]
    pub categories: Vec<StandardAnswerCategory>,
}

impl StandardAnswer {
    pub fn category_ids(&self) -> Vec<i64> {
        self.categories.iter().map(|c| c.id).collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StandardAnswerRequest {
    pub keyword: String,
    pub answer: String,
    pub categories: Vec<i64>,
}

pub async fn list(client: &AdminClient) -> Result<Vec<StandardAnswer>, ApiError> {
    client.get(STANDARD_ANSWER_PATH).await
}

pub async fn create(
    client: &AdminClient,
    request: &StandardAnswerRequest,
) -> Result<serde_json::Value, ApiError> {
    client.post(STANDARD_ANSWER_PATH, request).await
}

pub async fn update(
    client: &AdminClient,
    id: i64,
    request: &StandardAnswerRequest,
) -> Result<serde_json::Value, ApiError> {
    client
        .patch(&format!("{STANDARD_ANSWER_PATH}/{id}"), request)
        .await
}

pub async fn delete(client: &AdminClient, id: i64) -> Result<(), ApiError> {
    client
        .delete::<serde_json::Value>(&format!("{STANDARD_ANSWER_PATH}/{id}"))
        .await
        .map(|_| ())
}
