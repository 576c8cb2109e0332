//! crates/learnhub_core/src/attempt.rs
//!
//! The lifecycle of one quiz attempt: answer in any order, submit exactly
//! once, and (when the quiz has a time limit) count down to an automatic
//! submission.
//!
//! The countdown itself is driven from outside by calling [`QuizAttempt::tick`]
//! once per second; this type never spawns timers.

use crate::domain::{AnswerValue, Quiz};
use crate::quiz::{score, QuizResult};
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AttemptError {
    #[error("Question {0} is not part of this quiz")]
    UnknownQuestion(Uuid),
    #[error("The attempt has already been submitted")]
    AlreadySubmitted,
    #[error("Attempt limit of {0} reached")]
    LimitReached(u32),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptStatus {
    InProgress,
    Submitted(QuizResult),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// This call performed the submission.
    Submitted(QuizResult),
    /// A previous call (or the countdown) already submitted; nothing changed.
    AlreadySubmitted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// Seconds left after this tick.
    Running(u32),
    /// The countdown hit zero on this tick and the attempt was submitted.
    Expired(QuizResult),
    /// No countdown is running: untimed quiz or already submitted.
    Idle,
}

#[derive(Debug, Clone)]
pub struct QuizAttempt {
    quiz: Quiz,
    attempt_number: u32,
    answers: HashMap<Uuid, AnswerValue>,
    status: AttemptStatus,
    time_remaining: Option<u32>,
}

impl QuizAttempt {
    /// Opens a fresh attempt. Any countdown starts from the quiz's time limit.
    pub fn start(quiz: Quiz, attempt_number: u32) -> Self {
        let time_remaining = quiz.time_limit_seconds;
        Self {
            quiz,
            attempt_number,
            answers: HashMap::new(),
            status: AttemptStatus::InProgress,
            time_remaining,
        }
    }

    pub fn quiz(&self) -> &Quiz {
        &self.quiz
    }

    pub fn attempt_number(&self) -> u32 {
        self.attempt_number
    }

    pub fn answers(&self) -> &HashMap<Uuid, AnswerValue> {
        &self.answers
    }

    pub fn status(&self) -> &AttemptStatus {
        &self.status
    }

    pub fn time_remaining(&self) -> Option<u32> {
        self.time_remaining
    }

    pub fn is_submitted(&self) -> bool {
        matches!(self.status, AttemptStatus::Submitted(_))
    }

    /// Records (or replaces) the answer to one question.
    pub fn answer(&mut self, question_id: Uuid, value: AnswerValue) -> Result<(), AttemptError> {
        self.ensure_open()?;
        if self.quiz.question(question_id).is_none() {
            return Err(AttemptError::UnknownQuestion(question_id));
        }
        self.answers.insert(question_id, value);
        Ok(())
    }

    pub fn clear_answer(&mut self, question_id: Uuid) -> Result<(), AttemptError> {
        self.ensure_open()?;
        self.answers.remove(&question_id);
        Ok(())
    }

    /// Scores and closes the attempt. Only the first call has any effect.
    pub fn submit(&mut self) -> SubmitOutcome {
        if self.is_submitted() {
            return SubmitOutcome::AlreadySubmitted;
        }
        let result = score(&self.quiz, &self.answers);
        self.status = AttemptStatus::Submitted(result.clone());
        SubmitOutcome::Submitted(result)
    }

    /// Advances the countdown by one second, submitting when it reaches zero.
    pub fn tick(&mut self) -> TickOutcome {
        if self.is_submitted() {
            return TickOutcome::Idle;
        }
        let Some(remaining) = self.time_remaining else {
            return TickOutcome::Idle;
        };
        let remaining = remaining.saturating_sub(1);
        self.time_remaining = Some(remaining);
        if remaining > 0 {
            return TickOutcome::Running(remaining);
        }
        match self.submit() {
            SubmitOutcome::Submitted(result) => TickOutcome::Expired(result),
            SubmitOutcome::AlreadySubmitted => TickOutcome::Idle,
        }
    }

    fn ensure_open(&self) -> Result<(), AttemptError> {
        if self.is_submitted() {
            Err(AttemptError::AlreadySubmitted)
        } else {
            Ok(())
        }
    }
}

/// The number the next attempt gets, given how many were already made.
pub fn next_attempt_number(
    previous_attempts: u32,
    max_attempts: Option<u32>,
) -> Result<u32, AttemptError> {
    match max_attempts {
        Some(max) if previous_attempts >= max => Err(AttemptError::LimitReached(max)),
        _ => Ok(previous_attempts + 1),
    }
}
