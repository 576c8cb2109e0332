//! services/api/src/web/rest.rs
//!
//! Contains the public REST handlers (plans and the contact form) and the
//! master definition for the OpenAPI specification.

use crate::error::{ApiError, ErrorBody};
use crate::web::{auth, catalog, checkout, dto, forms, learning, state::AppState};
use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
};
use learnhub_core::domain::ContactMessage;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{error, info};
use utoipa::{OpenApi, ToSchema};
use validator::Validate;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        auth::signup_handler,
        auth::login_handler,
        auth::logout_handler,
        catalog::catalog_handler,
        catalog::list_bookmarks_handler,
        catalog::toggle_bookmark_handler,
        learning::get_course_handler,
        learning::complete_clip_handler,
        learning::get_quiz_handler,
        learning::submit_attempt_handler,
        learning::list_attempts_handler,
        learning::list_certificates_handler,
        checkout::get_checkout_handler,
        checkout::reset_checkout_handler,
        checkout::checkout_action_handler,
        checkout::apply_promo_handler,
        checkout::submit_checkout_handler,
        list_plans_handler,
        contact_handler,
    ),
    components(
        schemas(
            ErrorBody,
            auth::SignupRequest,
            auth::LoginRequest,
            auth::AuthResponse,
            dto::ClipDto,
            dto::FacetsDto,
            dto::CatalogPageDto,
            dto::ToggleBookmarkResponse,
            dto::AnswerDto,
            dto::AnswerEntryDto,
            dto::SubmitAttemptRequest,
            dto::SubmitAttemptResponse,
            dto::QuestionDto,
            dto::QuizDto,
            dto::QuestionResultDto,
            dto::QuizResultDto,
            dto::AttemptDto,
            dto::CertificateDto,
            dto::NodeDto,
            dto::ModuleDto,
            dto::ModuleProgressDto,
            dto::ProgressDto,
            dto::CourseDto,
            dto::CompletionResponse,
            dto::PlanDto,
            dto::BillingAddressDto,
            dto::PaymentCardDto,
            dto::SubscriptionDto,
            dto::AppliedPromoDto,
            dto::CheckoutView,
            checkout::CheckoutActionRequest,
            checkout::PromoRequest,
            checkout::SubmitPaymentRequest,
            ContactRequest,
        )
    ),
    tags(
        (name = "Auth", description = "Accounts and cookie sessions."),
        (name = "Catalog", description = "Clip library, search and bookmarks."),
        (name = "Learning", description = "Courses, quizzes, attempts and certificates."),
        (name = "Checkout", description = "Plans and the subscription wizard."),
        (name = "Contact", description = "Support contact form.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Payload Structs
//=========================================================================================

#[derive(Clone, Deserialize, ToSchema, Validate)]
pub struct ContactRequest {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    #[validate(
        length(min = 1, message = "Email is required"),
        email(message = "Enter a valid email address")
    )]
    pub email: String,
    #[validate(length(min = 1, message = "Subject is required"))]
    pub subject: String,
    #[validate(length(min = 10, max = 5000, message = "Message must be 10 to 5000 characters"))]
    pub body: String,
}

impl ContactRequest {
    pub fn normalized(self) -> Self {
        Self {
            name: self.name.trim().to_string(),
            email: self.email.trim().to_string(),
            subject: self.subject.trim().to_string(),
            body: self.body.trim().to_string(),
        }
    }
}

impl From<ContactRequest> for ContactMessage {
    fn from(req: ContactRequest) -> Self {
        Self {
            name: req.name,
            email: req.email,
            subject: req.subject,
            body: req.body,
        }
    }
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// GET /plans - Subscription plans in display order.
#[utoipa::path(
    get,
    path = "/plans",
    responses((status = 200, description = "Available plans", body = [dto::PlanDto])),
    tag = "Checkout"
)]
pub async fn list_plans_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<dto::PlanDto>>, ApiError> {
    let plans = state.db.list_plans().await.map_err(|e| {
        error!("Failed to list plans: {:?}", e);
        e
    })?;
    Ok(Json(plans.iter().map(dto::PlanDto::from).collect()))
}

/// POST /contact - Send a message to support.
#[utoipa::path(
    post,
    path = "/contact",
    request_body = ContactRequest,
    responses(
        (status = 202, description = "Message accepted"),
        (status = 422, description = "Invalid form fields", body = ErrorBody)
    ),
    tag = "Contact"
)]
pub async fn contact_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ContactRequest>,
) -> Result<StatusCode, ApiError> {
    let req = req.normalized();
    forms::check(&req).into_result()?;
    let message = ContactMessage::from(req);

    state.db.save_contact_message(&message).await.map_err(|e| {
        error!("Failed to save contact message: {:?}", e);
        e
    })?;
    info!("Contact message received from {}", message.email);
    Ok(StatusCode::ACCEPTED)
}
