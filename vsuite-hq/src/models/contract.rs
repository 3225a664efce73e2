//! Contract model with signature collection states.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Contract status.
///
/// Lifecycle: draft -> sent -> viewed -> pending_signature ->
/// partially_signed -> fully_signed -> executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContractStatus {
    Draft,
    Sent,
    Viewed,
    PendingSignature,
    PartiallySigned,
    FullySigned,
    Executed,
}

impl ContractStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContractStatus::Draft => "draft",
            ContractStatus::Sent => "sent",
            ContractStatus::Viewed => "viewed",
            ContractStatus::PendingSignature => "pending_signature",
            ContractStatus::PartiallySigned => "partially_signed",
            ContractStatus::FullySigned => "fully_signed",
            ContractStatus::Executed => "executed",
        }
    }

    pub fn from_string(s: &str) -> Self {
        match s {
            "sent" => ContractStatus::Sent,
            "viewed" => ContractStatus::Viewed,
            "pending_signature" => ContractStatus::PendingSignature,
            "partially_signed" => ContractStatus::PartiallySigned,
            "fully_signed" => ContractStatus::FullySigned,
            "executed" => ContractStatus::Executed,
            _ => ContractStatus::Draft,
        }
    }

    /// States in which signatures may still be collected.
    pub fn accepts_signatures(&self) -> bool {
        matches!(
            self,
            ContractStatus::Sent
                | ContractStatus::Viewed
                | ContractStatus::PendingSignature
                | ContractStatus::PartiallySigned
        )
    }

    /// States awaiting at least one signature, used by the attention query.
    pub fn is_pending_signature_family(&self) -> bool {
        matches!(
            self,
            ContractStatus::Sent
                | ContractStatus::Viewed
                | ContractStatus::PendingSignature
                | ContractStatus::PartiallySigned
        )
    }
}

/// Contract document.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Contract {
    pub contract_id: Uuid,
    /// Assigned from the contract number sequence at send time.
    pub contract_number: Option<String>,
    pub title: String,
    pub client_id: Uuid,
    pub content: String,
    pub status: String,
    pub total_value: Decimal,
    pub expiration_date: Option<NaiveDate>,
    pub sent_utc: Option<DateTime<Utc>>,
    pub executed_utc: Option<DateTime<Utc>>,
    pub created_by: Uuid,
    pub created_utc: DateTime<Utc>,
}

/// Line item on a contract.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ContractLineItem {
    pub line_item_id: Uuid,
    pub contract_id: Uuid,
    pub description: String,
    pub quantity: Decimal,
    pub rate: Decimal,
    pub amount: Decimal,
    pub sort_order: i32,
    pub created_utc: DateTime<Utc>,
}

/// A party expected to sign the contract.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ContractSigner {
    pub signer_id: Uuid,
    pub contract_id: Uuid,
    pub name: String,
    pub email: String,
    pub signed_utc: Option<DateTime<Utc>>,
    pub sort_order: i32,
}

/// Signer as supplied at contract creation.
#[derive(Debug, Clone)]
pub struct CreateSigner {
    pub name: String,
    pub email: String,
}

/// Input for creating a contract.
#[derive(Debug, Clone)]
pub struct CreateContract {
    pub title: String,
    pub client_id: Uuid,
    pub content: String,
    pub line_items: Vec<crate::models::LineItemInput>,
    pub signers: Vec<CreateSigner>,
    pub expiration_date: Option<NaiveDate>,
    pub created_by: Uuid,
}

/// Input for updating a draft contract.
#[derive(Debug, Clone, Default)]
pub struct UpdateContract {
    pub title: Option<String>,
    pub content: Option<String>,
    pub line_items: Option<Vec<crate::models::LineItemInput>>,
    pub expiration_date: Option<NaiveDate>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trip() {
        for s in [
            "draft",
            "sent",
            "viewed",
            "pending_signature",
            "partially_signed",
            "fully_signed",
            "executed",
        ] {
            assert_eq!(ContractStatus::from_string(s).as_str(), s);
        }
    }

    #[test]
    fn signature_acceptance_by_state() {
        assert!(ContractStatus::PendingSignature.accepts_signatures());
        assert!(ContractStatus::PartiallySigned.accepts_signatures());
        assert!(!ContractStatus::Draft.accepts_signatures());
        assert!(!ContractStatus::FullySigned.accepts_signatures());
        assert!(!ContractStatus::Executed.accepts_signatures());
    }
}
