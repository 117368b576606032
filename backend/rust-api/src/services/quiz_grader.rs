use crate::models::{GradeResult, Quiz, SubmittedAnswers};
use crate::models::quiz::QuestionResult;

/// Minimum score to pass: ceil(60% of total) in integer arithmetic.
pub fn pass_mark(total: usize) -> usize {
    (3 * total + 4) / 5
}

/// Scores a submission against the quiz's answer keys. Pure.
pub fn grade(quiz: &Quiz, answers: &SubmittedAnswers) -> GradeResult {
    let results: Vec<QuestionResult> = quiz
        .questions
        .iter()
        .enumerate()
        .map(|(i, q)| {
            let selected_index = answers.get(i);
            QuestionResult {
                question: q.question.clone(),
                selected_index,
                correct_index: q.answer_index,
                correct: selected_index == Some(q.answer_index as i64),
            }
        })
        .collect();

    let score = results.iter().filter(|r| r.correct).count();
    let total = results.len();

    GradeResult {
        score,
        total,
        passed: score >= pass_mark(total),
        results,
    }
}
