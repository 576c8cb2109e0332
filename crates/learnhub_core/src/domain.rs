//! crates/learnhub_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database or serialization format.

use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

//=========================================================================================
// Catalog
//=========================================================================================

/// The difficulty a clip is aimed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SkillLevel {
    Beginner,
    Intermediate,
    Advanced,
    Expert,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("Unknown skill level: {0}")]
pub struct SkillLevelError(pub String);

impl SkillLevel {
    pub const ALL: [SkillLevel; 4] = [
        SkillLevel::Beginner,
        SkillLevel::Intermediate,
        SkillLevel::Advanced,
        SkillLevel::Expert,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SkillLevel::Beginner => "beginner",
            SkillLevel::Intermediate => "intermediate",
            SkillLevel::Advanced => "advanced",
            SkillLevel::Expert => "expert",
        }
    }
}

impl fmt::Display for SkillLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SkillLevel {
    type Err = SkillLevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "beginner" => Ok(SkillLevel::Beginner),
            "intermediate" => Ok(SkillLevel::Intermediate),
            "advanced" => Ok(SkillLevel::Advanced),
            "expert" => Ok(SkillLevel::Expert),
            _ => Err(SkillLevelError(s.to_string())),
        }
    }
}

/// A short video content item ("clip") in the catalog.
///
/// Immutable from the client's point of view; bookmark state is tracked
/// separately in [`crate::bookmarks::BookmarkSet`].
#[derive(Debug, Clone, PartialEq)]
pub struct ContentItem {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub duration_seconds: u32,
    pub machine_model: String,
    pub process: String,
    pub skill_level: SkillLevel,
    pub tags: BTreeSet<String>,
    pub author_id: Uuid,
    pub view_count: u64,
    pub created_at: DateTime<Utc>,
}

//=========================================================================================
// Courses and Quizzes
//=========================================================================================

/// A node inside a course module: either a clip to watch or a quiz to pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeContent {
    Clip { clip_id: Uuid },
    Quiz { quiz_id: Uuid },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CourseNode {
    pub id: Uuid,
    pub title: String,
    pub content: NodeContent,
    /// Whether this node counts towards module completion.
    pub required: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CourseModule {
    pub id: Uuid,
    pub title: String,
    pub nodes: Vec<CourseNode>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Course {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub modules: Vec<CourseModule>,
    pub passing_threshold: Option<u8>,
    pub max_attempts: Option<u32>,
}

impl Course {
    /// Iterates over every node of every module, in course order.
    pub fn nodes(&self) -> impl Iterator<Item = &CourseNode> {
        self.modules.iter().flat_map(|m| m.nodes.iter())
    }

    pub fn contains_quiz(&self, quiz_id: Uuid) -> bool {
        self.nodes()
            .any(|n| n.content == NodeContent::Quiz { quiz_id })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestionKind {
    MultipleChoice,
    TrueFalse,
    ShortAnswer,
}

impl QuestionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionKind::MultipleChoice => "multiple_choice",
            QuestionKind::TrueFalse => "true_false",
            QuestionKind::ShortAnswer => "short_answer",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "multiple_choice" => Some(QuestionKind::MultipleChoice),
            "true_false" => Some(QuestionKind::TrueFalse),
            "short_answer" => Some(QuestionKind::ShortAnswer),
            _ => None,
        }
    }
}

/// A single answer value: one string, or a set of strings for multi-select.
///
/// The same shape is used for the correct answer and for a submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnswerValue {
    Single(String),
    Multiple(BTreeSet<String>),
}

impl AnswerValue {
    /// Views the value as a set of options. A single value is a one-element set.
    pub fn as_set(&self) -> BTreeSet<&str> {
        match self {
            AnswerValue::Single(s) => std::iter::once(s.as_str()).collect(),
            AnswerValue::Multiple(set) => set.iter().map(String::as_str).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    pub id: Uuid,
    pub prompt: String,
    pub kind: QuestionKind,
    pub options: Vec<String>,
    pub correct: AnswerValue,
    pub points: u32,
    pub explanation: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quiz {
    pub id: Uuid,
    pub title: String,
    pub questions: Vec<Question>,
    pub passing_threshold: Option<u8>,
    pub time_limit_seconds: Option<u32>,
    pub max_attempts: Option<u32>,
}

impl Quiz {
    pub fn question(&self, id: Uuid) -> Option<&Question> {
        self.questions.iter().find(|q| q.id == id)
    }
}

/// A scored attempt as persisted by the backend.
#[derive(Debug, Clone)]
pub struct StoredAttempt {
    pub id: Uuid,
    pub user_id: Uuid,
    pub quiz_id: Uuid,
    pub attempt_number: u32,
    pub score: u32,
    pub max_score: u32,
    pub percentage: u8,
    pub passed: bool,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct Certificate {
    pub id: Uuid,
    pub user_id: Uuid,
    pub course_id: Uuid,
    pub issued_at: DateTime<Utc>,
}

//=========================================================================================
// Billing
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BillingInterval {
    Monthly,
    Yearly,
}

impl BillingInterval {
    pub fn as_str(&self) -> &'static str {
        match self {
            BillingInterval::Monthly => "monthly",
            BillingInterval::Yearly => "yearly",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "monthly" => Some(BillingInterval::Monthly),
            "yearly" => Some(BillingInterval::Yearly),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    pub id: Uuid,
    pub name: String,
    pub price_cents: u64,
    pub interval: BillingInterval,
    pub features: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BillingAddress {
    pub full_name: String,
    pub line1: String,
    pub line2: Option<String>,
    pub city: String,
    pub region: String,
    pub postal_code: String,
    pub country: String,
}

/// Card details entered on the payment step.
///
/// Never persisted; only forwarded to the payment processor.
#[derive(Clone, PartialEq, Eq)]
pub struct PaymentCard {
    pub number: String,
    pub exp_month: u32,
    pub exp_year: i32,
    pub cvc: String,
    pub holder_name: String,
}

impl PaymentCard {
    pub fn last4(&self) -> &str {
        let n = self.number.len();
        &self.number[n.saturating_sub(4)..]
    }
}

// Keep card numbers out of logs.
impl fmt::Debug for PaymentCard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PaymentCard")
            .field("last4", &self.last4())
            .field("exp_month", &self.exp_month)
            .field("exp_year", &self.exp_year)
            .finish_non_exhaustive()
    }
}

/// A promo code as stored by the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromoCode {
    pub code: String,
    pub percent_off: u8,
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionStatus {
    Active,
    Canceled,
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::Canceled => "canceled",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    pub id: Uuid,
    pub user_id: Uuid,
    pub plan_id: Uuid,
    pub status: SubscriptionStatus,
    pub amount_cents: u64,
    pub started_at: DateTime<Utc>,
    pub renews_at: DateTime<Utc>,
}

//=========================================================================================
// Accounts
//=========================================================================================

// Represents a user - used throughout app
#[derive(Debug, Clone)]
pub struct User {
    pub user_id: Uuid,
    pub email: String,
    pub display_name: String,
}

// Only used internally for login/signup - contains sensitive data
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user_id: Uuid,
    pub email: String,
    pub hashed_password: String,
}

#[derive(Debug, Clone, Default)]
pub struct ContactMessage {
    pub name: String,
    pub email: String,
    pub subject: String,
    pub body: String,
}
