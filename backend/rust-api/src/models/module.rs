use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// A unit of learning content. Catalog order (creation order) matters: it
/// drives distractor selection in generated quizzes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Module {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub content_url: String,
    /// Free text such as "45 minutes"; the first run of digits is the value.
    #[serde(default)]
    pub duration: String,
    /// Stored verbatim, see [`Difficulty::parse`].
    #[serde(default)]
    pub difficulty: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum Difficulty {
    #[default]
    Beginner,
    Intermediate,
    Advanced,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [
        Difficulty::Beginner,
        Difficulty::Intermediate,
        Difficulty::Advanced,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Beginner => "Beginner",
            Difficulty::Intermediate => "Intermediate",
            Difficulty::Advanced => "Advanced",
        }
    }

    /// Exact, case-sensitive match against the three level labels.
    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|level| level.as_str() == value)
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateModuleRequest {
    #[validate(length(min = 1, max = 200, message = "Title required"))]
    pub title: String,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    #[validate(length(max = 2048, message = "Content URL is too long"))]
    pub content_url: Option<String>,

    #[serde(default)]
    pub duration: Option<String>,

    #[serde(default)]
    pub difficulty: Option<String>,
}

/// Partial update; absent fields keep their stored value.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateModuleRequest {
    #[validate(length(min = 1, max = 200, message = "Title must not be empty"))]
    pub title: Option<String>,
    pub description: Option<String>,
    #[validate(length(max = 2048, message = "Content URL is too long"))]
    pub content_url: Option<String>,
    pub duration: Option<String>,
    pub difficulty: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn difficulty_parse_is_exact() {
        assert_eq!(Difficulty::parse("Advanced"), Some(Difficulty::Advanced));
        assert_eq!(Difficulty::parse("advanced"), None);
        assert_eq!(Difficulty::parse(""), None);
    }

    #[test]
    fn module_serializes_camel_case() {
        let module = Module {
            id: "mod-001".into(),
            title: "Intro".into(),
            description: String::new(),
            content_url: "https://example.com".into(),
            duration: "30 minutes".into(),
            difficulty: "Beginner".into(),
            created_at: Utc::now(),
        };
        let json = serde_json::to_value(&module).unwrap();
        assert_eq!(json["contentUrl"], "https://example.com");
        assert!(json.get("createdAt").is_some());
    }
}
