use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum MentorshipStatus {
    #[default]
    Pending,
    Accepted,
    Declined,
    /// Created by an admin on behalf of a learner.
    Recommended,
}

impl MentorshipStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MentorshipStatus::Pending => "pending",
            MentorshipStatus::Accepted => "accepted",
            MentorshipStatus::Declined => "declined",
            MentorshipStatus::Recommended => "recommended",
        }
    }

    /// Values a participant may set through `PUT /mentorship/requests/{id}`.
    pub fn parse_update(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(MentorshipStatus::Pending),
            "accepted" => Some(MentorshipStatus::Accepted),
            "declined" => Some(MentorshipStatus::Declined),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MentorshipRequest {
    pub id: String,
    /// The learner the request is about.
    pub learner_id: String,
    pub mentor_id: String,
    pub topic: String,
    pub status: MentorshipStatus,
    /// Set when an admin recommended the learner.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Listing row with participant names resolved.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MentorshipRequestView {
    #[serde(flatten)]
    pub request: MentorshipRequest,
    pub learner_name: Option<String>,
    pub mentor_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateMentorshipRequest {
    #[validate(length(min = 1, message = "Mentor ID and topic are required"))]
    pub mentor_id: String,

    #[validate(length(min = 1, max = 500, message = "Mentor ID and topic are required"))]
    pub topic: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateMentorshipRequest {
    pub status: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RecommendRequest {
    #[validate(length(min = 1, message = "learnerId and mentorId are required"))]
    pub learner_id: String,

    #[validate(length(min = 1, message = "learnerId and mentorId are required"))]
    pub mentor_id: String,

    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MentorshipEnvelope {
    pub message: String,
    pub request: MentorshipRequest,
}
