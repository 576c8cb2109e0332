//! crates/learnhub_core/src/validation.rs
//!
//! Validation failures, collected as a field -> message map so the UI can
//! render them next to the offending inputs, plus the checks that depend on
//! domain rules rather than field shape.

use crate::domain::Quiz;
use crate::quiz::total_points;
use chrono::{Datelike, NaiveDate};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Eq, thiserror::Error)]
#[error("{} field(s) failed validation", .0.len())]
pub struct ValidationErrors(BTreeMap<String, String>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a message for `field`. The first message per field wins.
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_insert_with(|| message.into());
    }

    pub fn merge(&mut self, other: ValidationErrors) {
        for (field, message) in other.0 {
            self.add(field, message);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn fields(&self) -> &BTreeMap<String, String> {
        &self.0
    }

    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

/// True when a card's expiry month lies before the month of `today`.
///
/// A card stays valid through the last day of its expiry month.
pub fn card_expired(exp_year: i32, exp_month: u32, today: NaiveDate) -> bool {
    (exp_year, exp_month) < (today.year(), today.month())
}

/// Checks quiz definitions coming in from the content store.
pub fn validate_quiz(quiz: &Quiz) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    if quiz.title.trim().is_empty() {
        errors.add("title", "Title is required");
    }
    if quiz.passing_threshold.is_some_and(|t| t > 100) {
        errors.add("passing_threshold", "Passing threshold must be between 0 and 100");
    }
    for (i, question) in quiz.questions.iter().enumerate() {
        if question.points == 0 {
            errors.add(format!("questions[{i}].points"), "Points must be greater than zero");
        }
    }
    // Scores are stored as u32.
    if total_points(quiz) > u64::from(u32::MAX) {
        errors.add("questions", "Total points are too large");
    }
    errors.into_result()
}
