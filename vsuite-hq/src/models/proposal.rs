//! Proposal model and status machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Proposal status.
///
/// Lifecycle: draft -> sent -> viewed -> {accepted | rejected | revision_requested}.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProposalStatus {
    Draft,
    Sent,
    Viewed,
    Accepted,
    Rejected,
    RevisionRequested,
}

impl ProposalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProposalStatus::Draft => "draft",
            ProposalStatus::Sent => "sent",
            ProposalStatus::Viewed => "viewed",
            ProposalStatus::Accepted => "accepted",
            ProposalStatus::Rejected => "rejected",
            ProposalStatus::RevisionRequested => "revision_requested",
        }
    }

    pub fn from_string(s: &str) -> Self {
        match s {
            "sent" => ProposalStatus::Sent,
            "viewed" => ProposalStatus::Viewed,
            "accepted" => ProposalStatus::Accepted,
            "rejected" => ProposalStatus::Rejected,
            "revision_requested" => ProposalStatus::RevisionRequested,
            _ => ProposalStatus::Draft,
        }
    }

    /// Parse a client response value. Only the three terminal response
    /// statuses are valid; anything else is rejected by the caller.
    pub fn parse_response(s: &str) -> Option<Self> {
        match s {
            "accepted" => Some(ProposalStatus::Accepted),
            "rejected" => Some(ProposalStatus::Rejected),
            "revision_requested" => Some(ProposalStatus::RevisionRequested),
            _ => None,
        }
    }

    /// Whether the proposal can still accept a client response.
    pub fn is_open_for_response(&self) -> bool {
        matches!(self, ProposalStatus::Sent | ProposalStatus::Viewed)
    }
}

/// Proposal document.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Proposal {
    pub proposal_id: Uuid,
    pub title: String,
    pub template_id: Option<Uuid>,
    pub project_id: Option<Uuid>,
    pub client_id: Option<Uuid>,
    pub client_name: String,
    pub client_email: String,
    /// Rendered document text.
    pub content: String,
    /// Field values the content was rendered from.
    pub variables: serde_json::Value,
    pub status: String,
    /// Opaque public token, assigned exactly once at first send.
    pub shareable_link: Option<String>,
    pub sent_utc: Option<DateTime<Utc>>,
    pub viewed_utc: Option<DateTime<Utc>>,
    pub responded_utc: Option<DateTime<Utc>>,
    pub accepted_utc: Option<DateTime<Utc>>,
    pub expires_utc: DateTime<Utc>,
    pub response_message: Option<String>,
    pub version: i32,
    /// Immutable back-reference to the proposal this revision was derived
    /// from. Set at insert and never updated, so revision chains are
    /// append-only and cannot form cycles.
    pub parent_proposal_id: Option<Uuid>,
    pub revision_notes: Option<String>,
    pub created_by: Uuid,
    pub created_utc: DateTime<Utc>,
}

impl Proposal {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_utc
    }
}

/// Input for creating a proposal row.
#[derive(Debug, Clone)]
pub struct CreateProposal {
    pub title: String,
    pub template_id: Option<Uuid>,
    pub project_id: Option<Uuid>,
    pub client_id: Option<Uuid>,
    pub client_name: String,
    pub client_email: String,
    pub content: String,
    pub variables: serde_json::Value,
    pub expires_utc: DateTime<Utc>,
    pub version: i32,
    pub parent_proposal_id: Option<Uuid>,
    pub revision_notes: Option<String>,
    pub created_by: Uuid,
}

/// Input for updating a draft proposal.
#[derive(Debug, Clone, Default)]
pub struct UpdateProposal {
    pub title: Option<String>,
    pub content: Option<String>,
    pub variables: Option<serde_json::Value>,
    pub client_name: Option<String>,
    pub client_email: Option<String>,
}

/// Filter parameters for listing proposals.
#[derive(Debug, Clone, Default)]
pub struct ListProposalsFilter {
    pub status: Option<ProposalStatus>,
    pub client_id: Option<Uuid>,
    pub project_id: Option<Uuid>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_response_accepts_only_terminal_values() {
        assert_eq!(
            ProposalStatus::parse_response("accepted"),
            Some(ProposalStatus::Accepted)
        );
        assert_eq!(
            ProposalStatus::parse_response("rejected"),
            Some(ProposalStatus::Rejected)
        );
        assert_eq!(
            ProposalStatus::parse_response("revision_requested"),
            Some(ProposalStatus::RevisionRequested)
        );
        assert_eq!(ProposalStatus::parse_response("draft"), None);
        assert_eq!(ProposalStatus::parse_response("sent"), None);
        assert_eq!(ProposalStatus::parse_response("maybe"), None);
    }

    #[test]
    fn status_round_trip() {
        for s in [
            "draft",
            "sent",
            "viewed",
            "accepted",
            "rejected",
            "revision_requested",
        ] {
            assert_eq!(ProposalStatus::from_string(s).as_str(), s);
        }
    }

    #[test]
    fn expiry_is_strictly_after_deadline() {
        let now = Utc::now();
        let proposal = Proposal {
            proposal_id: Uuid::new_v4(),
            title: "t".to_string(),
            template_id: None,
            project_id: None,
            client_id: None,
            client_name: "c".to_string(),
            client_email: "c@example.com".to_string(),
            content: String::new(),
            variables: serde_json::json!({}),
            status: "sent".to_string(),
            shareable_link: None,
            sent_utc: None,
            viewed_utc: None,
            responded_utc: None,
            accepted_utc: None,
            expires_utc: now,
            response_message: None,
            version: 1,
            parent_proposal_id: None,
            revision_notes: None,
            created_by: Uuid::new_v4(),
            created_utc: now,
        };

        assert!(!proposal.is_expired(now));
        assert!(proposal.is_expired(now + chrono::Duration::seconds(1)));
    }
}
