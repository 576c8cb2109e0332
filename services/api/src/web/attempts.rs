//! services/api/src/web/attempts.rs
//!
//! Attempt bookkeeping shared by the REST scorer and the WebSocket quiz player:
//! settings resolution, attempt limits, persistence and certificate issuance.

use crate::error::ApiError;
use chrono::Utc;
use learnhub_core::attempt::{next_attempt_number, QuizAttempt};
use learnhub_core::course::CourseProgress;
use learnhub_core::domain::{Certificate, Course, Quiz, StoredAttempt};
use learnhub_core::ports::{DatabaseService, PortError, PortResult};
use learnhub_core::quiz::QuizResult;
use learnhub_core::validation::validate_quiz;
use std::collections::HashSet;
use tracing::{error, info};
use uuid::Uuid;

/// Loads a quiz with any unset threshold or attempt limit taken from the
/// first course that contains it. Misconfigured quizzes are refused.
pub async fn effective_quiz(db: &dyn DatabaseService, quiz_id: Uuid) -> PortResult<Quiz> {
    let mut quiz = db.get_quiz(quiz_id).await?;
    if quiz.passing_threshold.is_none() || quiz.max_attempts.is_none() {
        if let Some(course) = db.courses_with_quiz(quiz_id).await?.first() {
            quiz.passing_threshold = quiz.passing_threshold.or(course.passing_threshold);
            quiz.max_attempts = quiz.max_attempts.or(course.max_attempts);
        }
    }
    if let Err(errors) = validate_quiz(&quiz) {
        error!("Quiz {} is misconfigured: {:?}", quiz_id, errors.fields());
        return Err(PortError::Unexpected(format!("Quiz {} is misconfigured", quiz_id)));
    }
    Ok(quiz)
}

/// Opens the user's next attempt, or fails with `LimitReached`.
pub async fn begin_attempt(
    db: &dyn DatabaseService,
    user_id: Uuid,
    quiz_id: Uuid,
) -> Result<QuizAttempt, ApiError> {
    let quiz = effective_quiz(db, quiz_id).await?;
    let previous = db.list_attempts(user_id, quiz_id).await?.len();
    let attempt_number = next_attempt_number(previous as u32, quiz.max_attempts)?;
    Ok(QuizAttempt::start(quiz, attempt_number))
}

/// The outcome of persisting a scored attempt.
#[derive(Debug)]
pub struct RecordedAttempt {
    pub stored: StoredAttempt,
    pub certificates: Vec<Certificate>,
}

/// Persists a scored attempt and, when it passed, issues certificates for
/// every course it completes.
pub async fn record_result(
    db: &dyn DatabaseService,
    user_id: Uuid,
    quiz_id: Uuid,
    attempt_number: u32,
    result: &QuizResult,
) -> Result<RecordedAttempt, ApiError> {
    let stored = StoredAttempt {
        id: Uuid::new_v4(),
        user_id,
        quiz_id,
        attempt_number,
        score: result.score,
        max_score: result.max_score,
        percentage: result.percentage,
        passed: result.passed,
        submitted_at: Utc::now(),
    };
    db.save_attempt(stored.clone()).await?;
    info!(
        "User {} scored {}% on quiz {} (attempt {})",
        user_id, result.percentage, quiz_id, attempt_number
    );

    let mut certificates = Vec::new();
    if result.passed {
        for course in db.courses_with_quiz(quiz_id).await? {
            if let Some(certificate) = issue_if_complete(db, user_id, &course).await? {
                certificates.push(certificate);
            }
        }
    }
    Ok(RecordedAttempt {
        stored,
        certificates,
    })
}

/// Computes the user's progress through `course`.
pub async fn course_progress(
    db: &dyn DatabaseService,
    user_id: Uuid,
    course: &Course,
) -> PortResult<CourseProgress> {
    let completed_clips: HashSet<Uuid> =
        db.list_completed_clips(user_id).await?.into_iter().collect();
    let passed_quizzes: HashSet<Uuid> =
        db.list_passed_quizzes(user_id).await?.into_iter().collect();
    Ok(CourseProgress::compute(course, &completed_clips, &passed_quizzes))
}

/// Issues the course certificate once every required node is done.
pub async fn issue_if_complete(
    db: &dyn DatabaseService,
    user_id: Uuid,
    course: &Course,
) -> PortResult<Option<Certificate>> {
    let progress = course_progress(db, user_id, course).await?;
    if !progress.certificate_eligible() {
        return Ok(None);
    }
    let certificate = db.issue_certificate(user_id, course.id).await?;
    info!("Certificate {} issued for course {}", certificate.id, course.id);
    Ok(Some(certificate))
}
