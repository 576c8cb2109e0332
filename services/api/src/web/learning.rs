//! services/api/src/web/learning.rs
//!
//! The learning player: courses with progress, clip completion, quizzes,
//! stateless attempt scoring and certificates.

use crate::error::{ApiError, ErrorBody};
use crate::web::attempts::{
    begin_attempt, course_progress, effective_quiz, issue_if_complete, record_result,
};
use crate::web::dto::{
    AttemptDto, CertificateDto, CompletionResponse, CourseDto, ProgressDto, QuizDto,
    QuizResultDto, SubmitAttemptRequest, SubmitAttemptResponse,
};
use crate::web::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    Extension,
};
use learnhub_core::attempt::SubmitOutcome;
use learnhub_core::domain::NodeContent;
use learnhub_core::ports::PortError;
use std::sync::Arc;
use tracing::error;
use uuid::Uuid;

/// GET /courses/{course_id} - A course outline with the user's progress.
#[utoipa::path(
    get,
    path = "/courses/{course_id}",
    params(("course_id" = Uuid, Path, description = "The course")),
    responses(
        (status = 200, description = "Course with progress", body = CourseDto),
        (status = 404, description = "Unknown course", body = ErrorBody)
    ),
    tag = "Learning"
)]
pub async fn get_course_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(course_id): Path<Uuid>,
) -> Result<Json<CourseDto>, ApiError> {
    let course = state.db.get_course(course_id).await?;
    let progress = course_progress(state.db.as_ref(), user_id, &course)
        .await
        .map_err(|e| {
            error!("Failed to load progress for course {}: {:?}", course_id, e);
            e
        })?;
    Ok(Json(CourseDto::new(&course, &progress)))
}

/// POST /courses/{course_id}/clips/{clip_id}/complete - Mark a clip watched.
#[utoipa::path(
    post,
    path = "/courses/{course_id}/clips/{clip_id}/complete",
    params(
        ("course_id" = Uuid, Path, description = "The course"),
        ("clip_id" = Uuid, Path, description = "A clip in that course")
    ),
    responses(
        (status = 200, description = "Updated progress", body = CompletionResponse),
        (status = 404, description = "Unknown course or clip not in course", body = ErrorBody)
    ),
    tag = "Learning"
)]
pub async fn complete_clip_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path((course_id, clip_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<CompletionResponse>, ApiError> {
    let course = state.db.get_course(course_id).await?;
    if !course
        .nodes()
        .any(|n| n.content == NodeContent::Clip { clip_id })
    {
        return Err(PortError::NotFound(format!(
            "Clip {} is not part of course {}",
            clip_id, course_id
        ))
        .into());
    }

    state
        .db
        .record_clip_completion(user_id, clip_id)
        .await
        .map_err(|e| {
            error!("Failed to record completion of clip {}: {:?}", clip_id, e);
            e
        })?;

    let certificate = issue_if_complete(state.db.as_ref(), user_id, &course).await?;
    let progress = course_progress(state.db.as_ref(), user_id, &course).await?;
    Ok(Json(CompletionResponse {
        progress: ProgressDto::from(&progress),
        certificate: certificate.as_ref().map(CertificateDto::from),
    }))
}

/// GET /quizzes/{quiz_id} - A quiz as shown to the learner (no answers).
#[utoipa::path(
    get,
    path = "/quizzes/{quiz_id}",
    params(("quiz_id" = Uuid, Path, description = "The quiz")),
    responses(
        (status = 200, description = "Quiz without correct answers", body = QuizDto),
        (status = 404, description = "Unknown quiz", body = ErrorBody)
    ),
    tag = "Learning"
)]
pub async fn get_quiz_handler(
    State(state): State<Arc<AppState>>,
    Path(quiz_id): Path<Uuid>,
) -> Result<Json<QuizDto>, ApiError> {
    let quiz = effective_quiz(state.db.as_ref(), quiz_id).await?;
    Ok(Json(QuizDto::from(&quiz)))
}

/// POST /quizzes/{quiz_id}/attempts - Score a complete answer set.
#[utoipa::path(
    post,
    path = "/quizzes/{quiz_id}/attempts",
    params(("quiz_id" = Uuid, Path, description = "The quiz")),
    request_body = SubmitAttemptRequest,
    responses(
        (status = 201, description = "Scored attempt", body = SubmitAttemptResponse),
        (status = 400, description = "Answer to a question outside the quiz", body = ErrorBody),
        (status = 404, description = "Unknown quiz", body = ErrorBody),
        (status = 409, description = "Attempt limit reached", body = ErrorBody)
    ),
    tag = "Learning"
)]
pub async fn submit_attempt_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(quiz_id): Path<Uuid>,
    Json(req): Json<SubmitAttemptRequest>,
) -> Result<(StatusCode, Json<SubmitAttemptResponse>), ApiError> {
    let mut attempt = begin_attempt(state.db.as_ref(), user_id, quiz_id).await?;
    for entry in req.answers {
        attempt.answer(entry.question_id, entry.answer.into())?;
    }

    let result = match attempt.submit() {
        SubmitOutcome::Submitted(result) => result,
        SubmitOutcome::AlreadySubmitted => {
            return Err(ApiError::Internal("Fresh attempt was already submitted".to_string()))
        }
    };

    let recorded = record_result(
        state.db.as_ref(),
        user_id,
        quiz_id,
        attempt.attempt_number(),
        &result,
    )
    .await
    .map_err(|e| {
        error!("Failed to record attempt on quiz {}: {:?}", quiz_id, e);
        e
    })?;

    Ok((
        StatusCode::CREATED,
        Json(SubmitAttemptResponse {
            attempt: AttemptDto::from(&recorded.stored),
            result: QuizResultDto::from(&result),
            certificates: recorded.certificates.iter().map(CertificateDto::from).collect(),
        }),
    ))
}

/// GET /quizzes/{quiz_id}/attempts - The user's attempt history.
#[utoipa::path(
    get,
    path = "/quizzes/{quiz_id}/attempts",
    params(("quiz_id" = Uuid, Path, description = "The quiz")),
    responses((status = 200, description = "Previous attempts, oldest first", body = [AttemptDto])),
    tag = "Learning"
)]
pub async fn list_attempts_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(quiz_id): Path<Uuid>,
) -> Result<Json<Vec<AttemptDto>>, ApiError> {
    let attempts = state.db.list_attempts(user_id, quiz_id).await?;
    Ok(Json(attempts.iter().map(AttemptDto::from).collect()))
}

/// GET /certificates - Certificates earned by the user.
#[utoipa::path(
    get,
    path = "/certificates",
    responses((status = 200, description = "Issued certificates", body = [CertificateDto])),
    tag = "Learning"
)]
pub async fn list_certificates_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
) -> Result<Json<Vec<CertificateDto>>, ApiError> {
    let certificates = state.db.list_certificates(user_id).await?;
    Ok(Json(certificates.iter().map(CertificateDto::from).collect()))
}
