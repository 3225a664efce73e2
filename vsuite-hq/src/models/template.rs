//! Document template model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Kind of document a template produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    Proposal,
    Invoice,
    Contract,
    Deck,
}

impl DocumentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentType::Proposal => "proposal",
            DocumentType::Invoice => "invoice",
            DocumentType::Contract => "contract",
            DocumentType::Deck => "deck",
        }
    }

    pub fn from_string(s: &str) -> Self {
        match s {
            "invoice" => DocumentType::Invoice,
            "contract" => DocumentType::Contract,
            "deck" => DocumentType::Deck,
            _ => DocumentType::Proposal,
        }
    }
}

/// Typed field within a template's variable list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Text,
    Textarea,
    Number,
    Date,
    Email,
    Phone,
    LineItems,
}

/// Field definition carried in a template's ordered `variables` list.
///
/// `name` is the substitution key and must be unique within a template.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,
    pub label: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub placeholder: Option<String>,
    #[serde(default)]
    pub default_value: Option<serde_json::Value>,
}

/// Document template.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    pub template_id: Uuid,
    pub name: String,
    pub doc_type: String,
    pub description: Option<String>,
    /// Legacy raw text with `{{var}}` placeholders. When present, rendering
    /// substitutes into this instead of synthesizing from `variables`.
    pub content: Option<String>,
    /// Ordered list of [`FieldDef`] serialized as JSON.
    pub variables: serde_json::Value,
    pub is_system: bool,
    pub is_public: bool,
    pub created_by: Uuid,
    pub tags: serde_json::Value,
    pub metadata: Option<serde_json::Value>,
    pub created_utc: DateTime<Utc>,
}

impl Template {
    /// Parse the `variables` JSON into typed field definitions.
    /// Entries that fail to parse are dropped rather than failing the render.
    pub fn fields(&self) -> Vec<FieldDef> {
        match &self.variables {
            serde_json::Value::Array(entries) => entries
                .iter()
                .filter_map(|v| serde_json::from_value(v.clone()).ok())
                .collect(),
            _ => Vec::new(),
        }
    }
}

/// Input for creating a template.
#[derive(Debug, Clone)]
pub struct CreateTemplate {
    pub name: String,
    pub doc_type: String,
    pub description: Option<String>,
    pub content: Option<String>,
    pub variables: serde_json::Value,
    pub is_system: bool,
    pub is_public: bool,
    pub created_by: Uuid,
    pub tags: serde_json::Value,
    pub metadata: Option<serde_json::Value>,
}

/// Input for updating a template.
#[derive(Debug, Clone, Default)]
pub struct UpdateTemplate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub content: Option<String>,
    pub variables: Option<serde_json::Value>,
    pub is_public: Option<bool>,
    pub tags: Option<serde_json::Value>,
    pub metadata: Option<serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fields_parses_ordered_definitions() {
        let template = Template {
            template_id: Uuid::new_v4(),
            name: "Standard proposal".to_string(),
            doc_type: "proposal".to_string(),
            description: None,
            content: None,
            variables: serde_json::json!([
                {"name": "budget", "label": "Budget", "type": "number"},
                {"name": "start", "label": "Start Date", "type": "date", "required": true},
            ]),
            is_system: false,
            is_public: false,
            created_by: Uuid::new_v4(),
            tags: serde_json::json!([]),
            metadata: None,
            created_utc: Utc::now(),
        };

        let fields = template.fields();
        assert_eq!(fields.len(), 2);
        assert_eq!(fields[0].name, "budget");
        assert_eq!(fields[0].field_type, FieldType::Number);
        assert!(!fields[0].required);
        assert!(fields[1].required);
    }

    #[test]
    fn malformed_field_entries_are_dropped() {
        let template = Template {
            template_id: Uuid::new_v4(),
            name: "t".to_string(),
            doc_type: "proposal".to_string(),
            description: None,
            content: None,
            variables: serde_json::json!([
                {"name": "ok", "label": "Ok", "type": "text"},
                {"label": "missing name"},
            ]),
            is_system: false,
            is_public: false,
            created_by: Uuid::new_v4(),
            tags: serde_json::json!([]),
            metadata: None,
            created_utc: Utc::now(),
        };

        assert_eq!(template.fields().len(), 1);
    }

    #[test]
    fn doc_type_round_trip() {
        for s in ["proposal", "invoice", "contract", "deck"] {
            assert_eq!(DocumentType::from_string(s).as_str(), s);
        }
        assert_eq!(DocumentType::from_string("unknown"), DocumentType::Proposal);
    }
}
