//! crates/learnhub_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific external implementations like databases or
//! payment gateways.

use crate::domain::{
    BillingAddress, Certificate, ContactMessage, ContentItem, Course, PaymentCard, Plan,
    PromoCode, Quiz, StoredAttempt, Subscription, User, UserCredentials,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Payment declined: {0}")]
    Declined(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
    #[error("Unauthorized")]
    Unauthorized,
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait DatabaseService: Send + Sync {
    // --- Accounts ---
    async fn create_user_with_email(
        &self,
        email: &str,
        display_name: &str,
        hashed_password: &str,
    ) -> PortResult<User>;

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials>;

    async fn get_user(&self, user_id: Uuid) -> PortResult<User>;

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()>;

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid>;

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()>;

    // --- Catalog ---
    /// Every published clip, in the store's relevance order.
    async fn list_clips(&self) -> PortResult<Vec<ContentItem>>;

    async fn get_clip(&self, clip_id: Uuid) -> PortResult<ContentItem>;

    // --- Bookmarks ---
    async fn list_bookmarks(&self, user_id: Uuid) -> PortResult<Vec<Uuid>>;

    async fn add_bookmark(&self, user_id: Uuid, clip_id: Uuid) -> PortResult<()>;

    async fn remove_bookmark(&self, user_id: Uuid, clip_id: Uuid) -> PortResult<()>;

    // --- Courses, quizzes and progress ---
    async fn get_course(&self, course_id: Uuid) -> PortResult<Course>;

    /// Courses whose modules contain the given quiz.
    async fn courses_with_quiz(&self, quiz_id: Uuid) -> PortResult<Vec<Course>>;

    async fn get_quiz(&self, quiz_id: Uuid) -> PortResult<Quiz>;

    async fn list_attempts(&self, user_id: Uuid, quiz_id: Uuid) -> PortResult<Vec<StoredAttempt>>;

    async fn save_attempt(&self, attempt: StoredAttempt) -> PortResult<()>;

    async fn record_clip_completion(&self, user_id: Uuid, clip_id: Uuid) -> PortResult<()>;

    async fn list_completed_clips(&self, user_id: Uuid) -> PortResult<Vec<Uuid>>;

    async fn list_passed_quizzes(&self, user_id: Uuid) -> PortResult<Vec<Uuid>>;

    // --- Certificates ---
    /// Issues a certificate, or returns the one already issued for this course.
    async fn issue_certificate(&self, user_id: Uuid, course_id: Uuid) -> PortResult<Certificate>;

    async fn list_certificates(&self, user_id: Uuid) -> PortResult<Vec<Certificate>>;

    // --- Billing ---
    async fn list_plans(&self) -> PortResult<Vec<Plan>>;

    async fn get_plan(&self, plan_id: Uuid) -> PortResult<Plan>;

    async fn find_promo_code(&self, code: &str) -> PortResult<PromoCode>;

    async fn save_subscription(&self, subscription: &Subscription) -> PortResult<()>;

    // --- Contact ---
    async fn save_contact_message(&self, message: &ContactMessage) -> PortResult<()>;
}

/// The external payment processor that turns a checkout into a subscription.
#[async_trait]
pub trait PaymentProcessor: Send + Sync {
    /// Charges the card and creates the subscription.
    /// Returns `PortError::Declined` when the processor refuses the card.
    async fn create_subscription(
        &self,
        user_id: Uuid,
        plan: &Plan,
        billing: &BillingAddress,
        card: &PaymentCard,
        amount_cents: u64,
    ) -> PortResult<Subscription>;
}
