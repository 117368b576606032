use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Generated quiz including answer keys. Never persisted and never sent to
/// learners as is; see [`PublicQuiz`].
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Quiz {
    pub title: String,
    pub questions: Vec<Question>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub question: String,
    /// Always exactly four entries.
    pub options: Vec<String>,
    pub answer_index: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PublicQuiz {
    pub title: String,
    pub questions: Vec<PublicQuestion>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PublicQuestion {
    pub question: String,
    pub options: Vec<String>,
}

impl From<&Quiz> for PublicQuiz {
    fn from(quiz: &Quiz) -> Self {
        PublicQuiz {
            title: quiz.title.clone(),
            questions: quiz
                .questions
                .iter()
                .map(|q| PublicQuestion {
                    question: q.question.clone(),
                    options: q.options.clone(),
                })
                .collect(),
        }
    }
}

/// Answers as posted by the client: either `{"0": 1, "2": "3"}` or a plain
/// array where `null` marks an unanswered question.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum AnswersPayload {
    Indexed(HashMap<String, Value>),
    Sequence(Vec<Value>),
}

impl Default for AnswersPayload {
    fn default() -> Self {
        AnswersPayload::Indexed(HashMap::new())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubmitQuizRequest {
    #[serde(default)]
    pub answers: Option<AnswersPayload>,
}

impl SubmitQuizRequest {
    pub fn into_answers(self) -> SubmittedAnswers {
        self.answers.unwrap_or_default().into()
    }
}

/// Question index → selected option index. Missing entries are unanswered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubmittedAnswers(BTreeMap<usize, i64>);

impl SubmittedAnswers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, question: usize, selected: i64) -> Self {
        self.0.insert(question, selected);
        self
    }

    pub fn get(&self, question: usize) -> Option<i64> {
        self.0.get(&question).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<AnswersPayload> for SubmittedAnswers {
    fn from(payload: AnswersPayload) -> Self {
        let mut answers = BTreeMap::new();
        match payload {
            AnswersPayload::Indexed(map) => {
                for (key, value) in map {
                    let Ok(question) = key.trim().parse::<usize>() else {
                        continue;
                    };
                    if let Some(selected) = coerce_index(&value) {
                        answers.insert(question, selected);
                    }
                }
            }
            AnswersPayload::Sequence(values) => {
                for (question, value) in values.iter().enumerate() {
                    if let Some(selected) = coerce_index(value) {
                        answers.insert(question, selected);
                    }
                }
            }
        }
        SubmittedAnswers(answers)
    }
}

/// Integers and integer strings count as a selection; anything else
/// (null, booleans, fractions, words) counts as unanswered.
fn coerce_index(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GradeResult {
    pub score: usize,
    pub total: usize,
    pub passed: bool,
    pub results: Vec<QuestionResult>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct QuestionResult {
    pub question: String,
    pub selected_index: Option<i64>,
    pub correct_index: usize,
    pub correct: bool,
}
