use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Lifecycle of an opportunity. `Open` is initial; the other two are terminal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum OpportunityStatus {
    #[default]
    Open,
    Accepted,
    Declined,
}

/// A learner's answer to an opportunity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseDecision {
    Accept,
    Decline,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidTransition {
    pub from: OpportunityStatus,
    pub decision: ResponseDecision,
}

impl std::fmt::Display for InvalidTransition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Opportunity is already {}; it can no longer be {}",
            self.from.as_str(),
            self.decision.target_status().as_str()
        )
    }
}

impl std::error::Error for InvalidTransition {}

impl OpportunityStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OpportunityStatus::Open => "open",
            OpportunityStatus::Accepted => "accepted",
            OpportunityStatus::Declined => "declined",
        }
    }

    /// Full transition table.
    pub fn transition(self, decision: ResponseDecision) -> Result<Self, InvalidTransition> {
        match (self, decision) {
            (OpportunityStatus::Open, ResponseDecision::Accept) => Ok(OpportunityStatus::Accepted),
            (OpportunityStatus::Open, ResponseDecision::Decline) => Ok(OpportunityStatus::Declined),
            (OpportunityStatus::Accepted | OpportunityStatus::Declined, decision) => {
                Err(InvalidTransition {
                    from: self,
                    decision,
                })
            }
        }
    }
}

impl ResponseDecision {
    /// Parses the wire value of `POST /opportunities/{id}/respond`.
    pub fn from_status(status: &str) -> Option<Self> {
        match status {
            "accepted" => Some(ResponseDecision::Accept),
            "declined" => Some(ResponseDecision::Decline),
            _ => None,
        }
    }

    pub fn target_status(&self) -> OpportunityStatus {
        match self {
            ResponseDecision::Accept => OpportunityStatus::Accepted,
            ResponseDecision::Decline => OpportunityStatus::Declined,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseDecision::Accept => "accept",
            ResponseDecision::Decline => "decline",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Opportunity {
    pub id: String,
    pub mentor_id: String,
    pub title: String,
    pub description: String,
    /// `None` means open to any learner, first responder wins.
    pub learner_id: Option<String>,
    pub status: OpportunityStatus,
    pub created_at: DateTime<Utc>,
}

impl Opportunity {
    pub fn is_targeted(&self) -> bool {
        self.learner_id.is_some()
    }

    pub fn is_visible_to_learner(&self, learner_id: &str) -> bool {
        self.learner_id.as_deref().is_none_or(|id| id == learner_id)
    }
}

/// Append-only record of an accepted opportunity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Match {
    pub id: String,
    pub mentor_id: String,
    pub learner_id: String,
    pub opportunity_id: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateOpportunityRequest {
    #[validate(length(min = 1, max = 200, message = "Title and description are required"))]
    pub title: String,

    #[validate(length(min = 1, message = "Title and description are required"))]
    pub description: String,

    #[serde(default)]
    pub learner_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RespondOpportunityRequest {
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct OpportunityEnvelope {
    pub message: String,
    pub opportunity: Opportunity,
}
