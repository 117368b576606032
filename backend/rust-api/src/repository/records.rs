//! MongoDB document shapes. Ids are UUID strings stored in `_id`; timestamps
//! are native BSON dates so catalog order sorts correctly.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{
    Match, MentorshipRequest, MentorshipStatus, Module, Opportunity, OpportunityStatus, User,
    UserRole,
};

pub(super) mod bson_datetime_as_chrono {
    use chrono::{DateTime, Utc};
    use mongodb::bson;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S>(date: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        bson::DateTime::from_millis(date.timestamp_millis()).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let bson_dt = bson::DateTime::deserialize(deserializer)?;
        DateTime::from_timestamp_millis(bson_dt.timestamp_millis())
            .ok_or_else(|| serde::de::Error::custom("timestamp out of range"))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(super) struct ModuleRecord {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub content_url: String,
    #[serde(default)]
    pub duration: String,
    #[serde(default)]
    pub difficulty: String,
    #[serde(with = "bson_datetime_as_chrono")]
    pub created_at: DateTime<Utc>,
}

impl From<&Module> for ModuleRecord {
    fn from(m: &Module) -> Self {
        ModuleRecord {
            id: m.id.clone(),
            title: m.title.clone(),
            description: m.description.clone(),
            content_url: m.content_url.clone(),
            duration: m.duration.clone(),
            difficulty: m.difficulty.clone(),
            created_at: m.created_at,
        }
    }
}

impl From<ModuleRecord> for Module {
    fn from(r: ModuleRecord) -> Self {
        Module {
            id: r.id,
            title: r.title,
            description: r.description,
            content_url: r.content_url,
            duration: r.duration,
            difficulty: r.difficulty,
            created_at: r.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(super) struct UserRecord {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: UserRole,
    #[serde(default)]
    pub completed_modules: Vec<String>,
    #[serde(with = "bson_datetime_as_chrono")]
    pub created_at: DateTime<Utc>,
}

impl From<&User> for UserRecord {
    fn from(u: &User) -> Self {
        UserRecord {
            id: u.id.clone(),
            name: u.name.clone(),
            email: u.email.clone(),
            password_hash: u.password_hash.clone(),
            role: u.role,
            completed_modules: u.completed_modules.clone(),
            created_at: u.created_at,
        }
    }
}

impl From<UserRecord> for User {
    fn from(r: UserRecord) -> Self {
        User {
            id: r.id,
            name: r.name,
            email: r.email,
            password_hash: r.password_hash,
            role: r.role,
            completed_modules: r.completed_modules,
            created_at: r.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(super) struct OpportunityRecord {
    #[serde(rename = "_id")]
    pub id: String,
    pub mentor_id: String,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub learner_id: Option<String>,
    pub status: OpportunityStatus,
    #[serde(with = "bson_datetime_as_chrono")]
    pub created_at: DateTime<Utc>,
}

impl From<&Opportunity> for OpportunityRecord {
    fn from(o: &Opportunity) -> Self {
        OpportunityRecord {
            id: o.id.clone(),
            mentor_id: o.mentor_id.clone(),
            title: o.title.clone(),
            description: o.description.clone(),
            learner_id: o.learner_id.clone(),
            status: o.status,
            created_at: o.created_at,
        }
    }
}

impl From<OpportunityRecord> for Opportunity {
    fn from(r: OpportunityRecord) -> Self {
        Opportunity {
            id: r.id,
            mentor_id: r.mentor_id,
            title: r.title,
            description: r.description,
            learner_id: r.learner_id,
            status: r.status,
            created_at: r.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(super) struct MatchRecord {
    #[serde(rename = "_id")]
    pub id: String,
    pub mentor_id: String,
    pub learner_id: String,
    pub opportunity_id: String,
    #[serde(with = "bson_datetime_as_chrono")]
    pub created_at: DateTime<Utc>,
}

impl From<&Match> for MatchRecord {
    fn from(m: &Match) -> Self {
        MatchRecord {
            id: m.id.clone(),
            mentor_id: m.mentor_id.clone(),
            learner_id: m.learner_id.clone(),
            opportunity_id: m.opportunity_id.clone(),
            created_at: m.created_at,
        }
    }
}

impl From<MatchRecord> for Match {
    fn from(r: MatchRecord) -> Self {
        Match {
            id: r.id,
            mentor_id: r.mentor_id,
            learner_id: r.learner_id,
            opportunity_id: r.opportunity_id,
            created_at: r.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(super) struct MentorshipRequestRecord {
    #[serde(rename = "_id")]
    pub id: String,
    pub learner_id: String,
    pub mentor_id: String,
    pub topic: String,
    pub status: MentorshipStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_id: Option<String>,
    #[serde(with = "bson_datetime_as_chrono")]
    pub created_at: DateTime<Utc>,
}

impl From<&MentorshipRequest> for MentorshipRequestRecord {
    fn from(r: &MentorshipRequest) -> Self {
        MentorshipRequestRecord {
            id: r.id.clone(),
            learner_id: r.learner_id.clone(),
            mentor_id: r.mentor_id.clone(),
            topic: r.topic.clone(),
            status: r.status,
            admin_id: r.admin_id.clone(),
            created_at: r.created_at,
        }
    }
}

impl From<MentorshipRequestRecord> for MentorshipRequest {
    fn from(r: MentorshipRequestRecord) -> Self {
        MentorshipRequest {
            id: r.id,
            learner_id: r.learner_id,
            mentor_id: r.mentor_id,
            topic: r.topic,
            status: r.status,
            admin_id: r.admin_id,
            created_at: r.created_at,
        }
    }
}
