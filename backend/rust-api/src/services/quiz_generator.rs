//! Builds a multiple-choice quiz from a module's own fields and its place in
//! the catalog. Pure: the same module and catalog always give the same quiz.
//!
//! Every question puts the correct option first (`answer_index == 0`), then
//! distractors, then pads with [`PADDING_OPTION`] up to [`OPTIONS_PER_QUESTION`].

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::{AppError, AppResult};
use crate::models::{Difficulty, Module, Question, Quiz};
use crate::services::catalog::ModuleCatalog;

pub const OPTIONS_PER_QUESTION: usize = 4;
pub const PADDING_OPTION: &str = "None of the above";

const MAX_DISTRACTORS: usize = OPTIONS_PER_QUESTION - 1;

pub const TITLE_QUESTION: &str = "Which of the following is the title of this module?";
pub const DURATION_QUESTION: &str = "What is the reported duration of this module?";
pub const DIFFICULTY_QUESTION: &str = "What difficulty level is this module categorized as?";
pub const TOPIC_QUESTION: &str = "Which of these topics does this module primarily cover?";
pub const SOURCE_QUESTION: &str = "What type of resource is linked for this module?";

pub const TOPICS: [&str; 5] = [
    "Internet & Online Safety",
    "Coding / Programming",
    "Productivity Tools",
    "Career Readiness",
    "General Digital Skills",
];

/// Keyword rules over the lower-cased description; first hit wins.
const TOPIC_RULES: [(&[&str], &str); 4] = [
    (&["internet"], TOPICS[0]),
    (&["coding", "code"], TOPICS[1]),
    (&["product", "docs"], TOPICS[2]),
    (&["career", "cv", "interview"], TOPICS[3]),
];

pub const SOURCE_TYPES: [&str; 3] = ["YouTube Video", "External Resource", "No external resource"];

lazy_static! {
    static ref FIRST_NUMBER: Regex = Regex::new(r"[0-9]+").unwrap();
}

/// Generates the quiz for `module_id`, or `NotFound` if the catalog does not
/// contain it.
pub fn generate(module_id: &str, catalog: &ModuleCatalog) -> AppResult<Quiz> {
    let index = catalog
        .position(module_id)
        .ok_or_else(|| AppError::not_found("Module not found"))?;
    let module = catalog
        .get(module_id)
        .ok_or_else(|| AppError::not_found("Module not found"))?;

    let mut questions = Vec::with_capacity(5);
    questions.push(title_question(module, catalog, index));
    if let Some(question) = duration_question(&module.duration) {
        questions.push(question);
    }
    questions.push(difficulty_question(&module.difficulty));
    questions.push(topic_question(&module.description));
    questions.push(source_question(&module.content_url));

    Ok(Quiz {
        title: module.title.clone(),
        questions,
    })
}

/// Correct answer first, then distractors; truncated or padded to exactly
/// four options.
fn build_question(text: &str, correct: String, distractors: Vec<String>) -> Question {
    let mut options = Vec::with_capacity(OPTIONS_PER_QUESTION);
    options.push(correct);
    options.extend(distractors);
    options.truncate(OPTIONS_PER_QUESTION);
    while options.len() < OPTIONS_PER_QUESTION {
        options.push(PADDING_OPTION.to_string());
    }
    Question {
        question: text.to_string(),
        options,
        answer_index: 0,
    }
}

fn title_question(module: &Module, catalog: &ModuleCatalog, index: usize) -> Question {
    let distractors = catalog
        .successors(index)
        .filter(|other| other.title != module.title)
        .take(MAX_DISTRACTORS)
        .map(|other| other.title.clone())
        .collect();
    build_question(TITLE_QUESTION, module.title.clone(), distractors)
}

/// First run of digits in the free-text duration, if it is a positive integer.
pub fn parse_duration_minutes(duration: &str) -> Option<u64> {
    FIRST_NUMBER
        .find(duration)
        .and_then(|m| m.as_str().parse::<u64>().ok())
        .filter(|minutes| *minutes > 0)
}

fn duration_question(duration: &str) -> Option<Question> {
    let n = parse_duration_minutes(duration)?;
    let minutes = |v: u64| format!("{v} minutes");
    Some(build_question(
        DURATION_QUESTION,
        minutes(n),
        vec![
            minutes(n.saturating_add(10)),
            minutes(n.saturating_sub(5).max(10)),
            minutes(n.saturating_add(20)),
        ],
    ))
}

fn difficulty_question(difficulty: &str) -> Question {
    let correct = Difficulty::parse(difficulty).unwrap_or_default();
    let distractors = Difficulty::ALL
        .into_iter()
        .filter(|level| *level != correct)
        .map(|level| level.as_str().to_string())
        .collect();
    build_question(DIFFICULTY_QUESTION, correct.as_str().to_string(), distractors)
}

pub fn classify_topic(description: &str) -> &'static str {
    let text = description.to_lowercase();
    TOPIC_RULES
        .iter()
        .find(|(keywords, _)| keywords.iter().any(|k| text.contains(k)))
        .map(|(_, topic)| *topic)
        .unwrap_or(TOPICS[4])
}

fn topic_question(description: &str) -> Question {
    let correct = classify_topic(description);
    let distractors = TOPICS
        .iter()
        .filter(|topic| **topic != correct)
        .take(MAX_DISTRACTORS)
        .map(|topic| topic.to_string())
        .collect();
    build_question(TOPIC_QUESTION, correct.to_string(), distractors)
}

pub fn classify_source(content_url: &str) -> &'static str {
    if content_url.to_lowercase().contains("youtube") {
        SOURCE_TYPES[0]
    } else if !content_url.is_empty() {
        SOURCE_TYPES[1]
    } else {
        SOURCE_TYPES[2]
    }
}

fn source_question(content_url: &str) -> Question {
    let correct = classify_source(content_url);
    let distractors = SOURCE_TYPES
        .iter()
        .filter(|source| **source != correct)
        .map(|source| source.to_string())
        .collect();
    build_question(SOURCE_QUESTION, correct.to_string(), distractors)
}
