//! Document set models and endpoints

use serde::{Deserialize, Serialize};

use super::{AdminClient, ApiError};

pub const DOCUMENT_SET_PATH: &str = "/api/manage/admin/document-set";

/// A connector/credential pair attached to a document set
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CcPairDescriptor {
    pub id: i64,
    #[serde(default)]
    pub name: Option<String>,
}

/// A document set as returned by the backend
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DocumentSet {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub cc_pair_descriptors: Vec<CcPairDescriptor>,
    /// False while the backend is still syncing connector changes
    #[serde(default = "default_true")]
    pub is_up_to_date: bool,
    #[serde(default = "default_true")]
    pub is_public: bool,
}

fn default_true() -> bool {
    true
}

impl DocumentSet {
    pub fn cc_pair_ids(&self) -> Vec<i64> {
        self.cc_pair_descriptors.iter().map(|cc| cc.id).collect()
    }
}

/// Body of `POST /api/manage/admin/document-set`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DocumentSetCreationRequest {
    pub name: String,
    pub description: String,
    pub cc_pair_ids: Vec<i64>,
}

/// Body of `PATCH /api/manage/admin/document-set`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DocumentSetUpdateRequest {
    pub id: i64,
    pub description: String,
    pub cc_pair_ids: Vec<i64>,
}

pub async fn list(client: &AdminClient) -> Result<Vec<DocumentSet>, ApiError> {
    client.get(DOCUMENT_SET_PATH).await
}

pub async fn create(
    client: &AdminClient,
    request: &DocumentSetCreationRequest,
) -> Result<serde_json::Value, ApiError> {
    client.post(DOCUMENT_SET_PATH, request).await
}

pub async fn update(
    client: &AdminClient,
    request: &DocumentSetUpdateRequest,
) -> Result<serde_json::Value, ApiError> {
    client.patch(DOCUMENT_SET_PATH, request).await
}

pub async fn delete(client: &AdminClient, id: i64) -> Result<(), ApiError> {
    client
        .delete::<serde_json::Value>(&format!("{DOCUMENT_SET_PATH}/{id}"))
        .await
        .map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_minimal_document_set() {
        let json = r#"{"id": 3, "name": "Support Docs", "cc_pair_descriptors": [{"id": 1}, {"id": 2, "name": "Zendesk"}]}"#;
        let set: DocumentSet = serde_json::from_str(json).unwrap();

        assert_eq!(set.cc_pair_ids(), vec![1, 2]);
        assert!(set.is_up_to_date);
        assert_eq!(set.description, "");
    }

    #[test]
    fn test_creation_request_shape() {
        let req = DocumentSetCreationRequest {
            name: "Support Docs".to_string(),
            description: "support".to_string(),
            cc_pair_ids: vec![1, 2],
        };
        assert_eq!(
            serde_json::to_value(&req).unwrap(),
            serde_json::json!({"name": "Support Docs", "description": "support", "cc_pair_ids": [1, 2]})
        );
    }
}
