//! Template request shapes.

use serde::Deserialize;
use serde_json::Value;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateTemplateRequest {
    #[validate(length(min = 1, message = "Name cannot be empty"))]
    pub name: String,
    /// One of proposal/invoice/contract/deck.
    #[serde(rename = "type")]
    pub doc_type: String,
    pub description: Option<String>,
    /// Legacy raw text with `{{var}}` placeholders.
    pub content: Option<String>,
    /// Ordered field definitions; names must be unique.
    #[serde(default)]
    pub variables: Vec<Value>,
    #[serde(default)]
    pub is_public: bool,
    #[serde(default)]
    pub tags: Vec<String>,
    pub metadata: Option<Value>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTemplateRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub content: Option<String>,
    pub variables: Option<Vec<Value>>,
    pub is_public: Option<bool>,
    pub tags: Option<Vec<String>>,
    pub metadata: Option<Value>,
}
