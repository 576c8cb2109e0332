//! services/api/src/web/forms.rs
//!
//! Glue between `#[derive(Validate)]` request bodies and the field -> message
//! map that `ErrorBody::errors` renders.

use crate::web::dto::PaymentCardDto;
use chrono::NaiveDate;
use learnhub_core::validation::{card_expired, ValidationErrors};
use std::borrow::Cow;
use validator::{Validate, ValidationError};

/// Runs the derived checks on `form` and keeps the first message per field.
pub fn check<T: Validate>(form: &T) -> ValidationErrors {
    match form.validate() {
        Ok(()) => ValidationErrors::new(),
        Err(errors) => field_messages(&errors),
    }
}

fn field_messages(errors: &validator::ValidationErrors) -> ValidationErrors {
    let mut messages = ValidationErrors::new();
    for (field, field_errors) in errors.field_errors() {
        if let Some(first) = field_errors.first() {
            let message = first.message.as_ref().unwrap_or(&first.code);
            messages.add(field.to_string(), message.to_string());
        }
    }
    messages
}

/// Full card check: the derived field rules, then expiry against `today`.
pub fn check_card(card: &PaymentCardDto, today: NaiveDate) -> Result<(), ValidationErrors> {
    let mut errors = check(card);
    if (1..=12).contains(&card.exp_month) && card_expired(card.exp_year, card.exp_month, today) {
        errors.add("exp_year", "Card has expired");
    }
    errors.into_result()
}

//=========================================================================================
// Custom field rules
//=========================================================================================

pub fn password_strength(password: &str) -> Result<(), ValidationError> {
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    let has_letter = password.chars().any(char::is_alphabetic);
    if has_digit && has_letter {
        Ok(())
    } else {
        let mut error = ValidationError::new("password_strength");
        error.message = Some(Cow::from("Password must contain a letter and a number"));
        Err(error)
    }
}

pub fn digits_only(value: &str) -> Result<(), ValidationError> {
    if value.chars().all(|c| c.is_ascii_digit()) {
        Ok(())
    } else {
        Err(ValidationError::new("digits_only"))
    }
}
