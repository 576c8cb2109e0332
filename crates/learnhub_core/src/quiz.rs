//! crates/learnhub_core/src/quiz.rs
//!
//! Stateless quiz scoring. Attempt bookkeeping lives in [`crate::attempt`].

use crate::domain::{AnswerValue, Question, Quiz};
use std::collections::HashMap;
use uuid::Uuid;

/// Used when a quiz does not carry its own passing threshold.
pub const DEFAULT_PASSING_THRESHOLD: u8 = 80;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionResult {
    pub question_id: Uuid,
    pub correct: bool,
    pub points_awarded: u32,
    pub points_possible: u32,
    pub explanation: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizResult {
    pub per_question: Vec<QuestionResult>,
    pub score: u32,
    pub max_score: u32,
    pub correct_count: usize,
    pub percentage: u8,
    pub threshold: u8,
    pub passed: bool,
}

/// The threshold a quiz is graded against.
pub fn passing_threshold(quiz: &Quiz) -> u8 {
    quiz.passing_threshold.unwrap_or(DEFAULT_PASSING_THRESHOLD)
}

/// Decides whether a single submission is correct.
///
/// A missing submission is always incorrect. Set-valued answers are compared
/// as sets, so order and duplicates do not matter.
pub fn is_correct(question: &Question, submitted: Option<&AnswerValue>) -> bool {
    let Some(submitted) = submitted else {
        return false;
    };
    match (&question.correct, submitted) {
        (AnswerValue::Single(expected), AnswerValue::Single(given)) => expected == given,
        (expected, given) => expected.as_set() == given.as_set(),
    }
}

/// `round(100 * score / max_score)`, defined as 0 when there is nothing to score.
pub fn percentage(score: u64, max_score: u64) -> u8 {
    if max_score == 0 {
        return 0;
    }
    let pct = (100.0 * score as f64 / max_score as f64).round();
    pct.clamp(0.0, 100.0) as u8
}

/// Sum of all question points, widened so large quizzes cannot overflow.
pub fn total_points(quiz: &Quiz) -> u64 {
    quiz.questions.iter().map(|q| u64::from(q.points)).sum()
}

/// Scores a full set of answers against `quiz`.
pub fn score(quiz: &Quiz, answers: &HashMap<Uuid, AnswerValue>) -> QuizResult {
    let per_question: Vec<QuestionResult> = quiz
        .questions
        .iter()
        .map(|question| {
            let correct = is_correct(question, answers.get(&question.id));
            QuestionResult {
                question_id: question.id,
                correct,
                points_awarded: if correct { question.points } else { 0 },
                points_possible: question.points,
                explanation: question.explanation.clone(),
            }
        })
        .collect();

    let score: u64 = per_question.iter().map(|r| u64::from(r.points_awarded)).sum();
    let max_score: u64 = per_question.iter().map(|r| u64::from(r.points_possible)).sum();
    let correct_count = per_question.iter().filter(|r| r.correct).count();
    let percentage = percentage(score, max_score);
    let threshold = passing_threshold(quiz);

    QuizResult {
        per_question,
        score: u32::try_from(score).unwrap_or(u32::MAX),
        max_score: u32::try_from(max_score).unwrap_or(u32::MAX),
        correct_count,
        percentage,
        threshold,
        passed: percentage >= threshold,
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::domain::QuestionKind;

    pub(crate) fn question(n: u128, correct: AnswerValue, points: u32) -> Question {
        Question {
            id: Uuid::from_u128(n),
            prompt: format!("Question {n}"),
            kind: QuestionKind::MultipleChoice,
            options: vec!["a".into(), "b".into(), "c".into()],
            correct,
            points,
            explanation: Some(format!("Because {n}")),
        }
    }

    pub(crate) fn single(s: &str) -> AnswerValue {
        AnswerValue::Single(s.to_string())
    }

    pub(crate) fn multi(items: &[&str]) -> AnswerValue {
        AnswerValue::Multiple(items.iter().map(|s| s.to_string()).collect())
    }

    pub(crate) fn quiz(questions: Vec<Question>) -> Quiz {
        Quiz {
            id: Uuid::from_u128(99),
            title: "Spindle safety".into(),
            questions,
            passing_threshold: None,
            time_limit_seconds: None,
            max_attempts: None,
        }
    }

    #[test]
    fn mixed_answers_score_twenty_percent() {
        let q = quiz(vec![
            question(1, single("a"), 1),
            question(2, single("b"), 2),
            question(3, single("c"), 2),
        ]);
        let answers = HashMap::from([
            (Uuid::from_u128(1), single("a")),
            (Uuid::from_u128(2), single("a")),
        ]);
        let result = score(&q, &answers);
        assert_eq!(result.score, 1);
        assert_eq!(result.max_score, 5);
        assert_eq!(result.correct_count, 1);
        assert_eq!(result.percentage, 20);
        assert_eq!(result.threshold, 80);
        assert!(!result.passed);
        assert!(!result.per_question[2].correct);
    }

    #[test]
    fn scoring_is_idempotent() {
        let q = quiz(vec![question(1, single("a"), 3), question(2, multi(&["a", "b"]), 1)]);
        let answers = HashMap::from([(Uuid::from_u128(2), multi(&["b", "a"]))]);
        assert_eq!(score(&q, &answers), score(&q, &answers));
    }

    #[test]
    fn set_answers_compare_as_sets() {
        let q = question(1, multi(&["a", "b"]), 1);
        assert!(is_correct(&q, Some(&multi(&["b", "a"]))));
        assert!(!is_correct(&q, Some(&multi(&["a"]))));
        assert!(!is_correct(&q, Some(&multi(&["a", "b", "c"]))));
        assert!(!is_correct(&q, None));
    }

    #[test]
    fn single_answer_against_one_element_set() {
        let q = question(1, multi(&["true"]), 1);
        assert!(is_correct(&q, Some(&single("true"))));
        let q = question(2, single("true"), 1);
        assert!(is_correct(&q, Some(&multi(&["true"]))));
        assert!(!is_correct(&q, Some(&single("True"))));
    }

    #[test]
    fn zero_points_is_zero_percent() {
        let q = quiz(vec![]);
        let result = score(&q, &HashMap::new());
        assert_eq!(result.max_score, 0);
        assert_eq!(result.percentage, 0);
        assert!(!result.passed);
    }

    #[test]
    fn quiz_threshold_overrides_default() {
        let mut q = quiz(vec![question(1, single("a"), 3), question(2, single("b"), 2)]);
        q.passing_threshold = Some(60);
        let answers = HashMap::from([(Uuid::from_u128(1), single("a"))]);
        let result = score(&q, &answers);
        assert_eq!(result.percentage, 60);
        assert!(result.passed);
    }

    #[test]
    fn percentage_rounds_half_up() {
        assert_eq!(percentage(1, 3), 33);
        assert_eq!(percentage(2, 3), 67);
        assert_eq!(percentage(1, 8), 13);
        assert_eq!(percentage(5, 5), 100);
    }

    #[test]
    fn huge_point_totals_do_not_overflow() {
        let q = quiz(vec![
            question(1, single("a"), u32::MAX),
            question(2, single("b"), u32::MAX),
        ]);
        let answers = HashMap::from([(Uuid::from_u128(1), single("a"))]);
        let result = score(&q, &answers);
        assert_eq!(result.score, u32::MAX);
        assert_eq!(result.max_score, u32::MAX);
        assert_eq!(result.percentage, 50);
        assert_eq!(total_points(&q), 2 * u64::from(u32::MAX));
    }
}
