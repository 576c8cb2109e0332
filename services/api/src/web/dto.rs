//! services/api/src/web/dto.rs
//!
//! JSON payloads exchanged with the browser client, and their conversions
//! from the pure domain types. Correct answers never leave the server
//! through these types.

use crate::web::forms::digits_only;
use chrono::{DateTime, Utc};
use learnhub_core::catalog::Facets;
use learnhub_core::checkout::{total_due_cents, AppliedPromo, CheckoutState};
use learnhub_core::course::{CourseProgress, ModuleProgress};
use learnhub_core::domain::{
    AnswerValue, BillingAddress, Certificate, ContentItem, Course, NodeContent, PaymentCard, Plan,
    Question, Quiz, StoredAttempt, Subscription,
};
use learnhub_core::quiz::{passing_threshold, QuestionResult, QuizResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

//=========================================================================================
// Catalog
//=========================================================================================

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ClipDto {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub duration_seconds: u32,
    pub machine_model: String,
    pub process: String,
    pub skill_level: String,
    pub tags: Vec<String>,
    pub author_id: Uuid,
    pub view_count: u64,
    pub created_at: DateTime<Utc>,
}

impl From<&ContentItem> for ClipDto {
    fn from(item: &ContentItem) -> Self {
        Self {
            id: item.id,
            title: item.title.clone(),
            description: item.description.clone(),
            duration_seconds: item.duration_seconds,
            machine_model: item.machine_model.clone(),
            process: item.process.clone(),
            skill_level: item.skill_level.to_string(),
            tags: item.tags.iter().cloned().collect(),
            author_id: item.author_id,
            view_count: item.view_count,
            created_at: item.created_at,
        }
    }
}

/// Value counts per filter dimension, used to render the filter panel.
#[derive(Debug, Clone, Default, Serialize, ToSchema)]
pub struct FacetsDto {
    pub machine_models: BTreeMap<String, usize>,
    pub processes: BTreeMap<String, usize>,
    pub skill_levels: BTreeMap<String, usize>,
    pub tags: BTreeMap<String, usize>,
    pub authors: BTreeMap<String, usize>,
}

impl From<Facets> for FacetsDto {
    fn from(facets: Facets) -> Self {
        Self {
            machine_models: facets.machine_models,
            processes: facets.processes,
            skill_levels: facets
                .skill_levels
                .into_iter()
                .map(|(level, n)| (level.to_string(), n))
                .collect(),
            tags: facets.tags,
            authors: facets
                .authors
                .into_iter()
                .map(|(author, n)| (author.to_string(), n))
                .collect(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CatalogPageDto {
    pub items: Vec<ClipDto>,
    pub page: usize,
    pub page_size: usize,
    pub total_count: usize,
    pub total_pages: usize,
    /// `search` when a free-text query was given, otherwise `browse`.
    pub mode: String,
    pub facets: FacetsDto,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ToggleBookmarkResponse {
    pub clip_id: Uuid,
    pub bookmarked: bool,
    /// False when the store rejected the change and it was rolled back.
    pub persisted: bool,
}

//=========================================================================================
// Quizzes
//=========================================================================================

/// A submitted answer: one option, or several for multi-select questions.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum AnswerDto {
    Single(String),
    Multiple(Vec<String>),
}

impl From<AnswerDto> for AnswerValue {
    fn from(answer: AnswerDto) -> Self {
        match answer {
            AnswerDto::Single(value) => AnswerValue::Single(value),
            AnswerDto::Multiple(values) => AnswerValue::Multiple(values.into_iter().collect()),
        }
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct AnswerEntryDto {
    pub question_id: Uuid,
    pub answer: AnswerDto,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SubmitAttemptRequest {
    pub answers: Vec<AnswerEntryDto>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct QuestionDto {
    pub id: Uuid,
    pub prompt: String,
    pub kind: String,
    pub options: Vec<String>,
    pub multi_select: bool,
    pub points: u32,
}

impl From<&Question> for QuestionDto {
    fn from(question: &Question) -> Self {
        Self {
            id: question.id,
            prompt: question.prompt.clone(),
            kind: question.kind.as_str().to_string(),
            options: question.options.clone(),
            multi_select: matches!(question.correct, AnswerValue::Multiple(_)),
            points: question.points,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct QuizDto {
    pub id: Uuid,
    pub title: String,
    pub questions: Vec<QuestionDto>,
    pub passing_threshold: u8,
    pub time_limit_seconds: Option<u32>,
    pub max_attempts: Option<u32>,
}

impl From<&Quiz> for QuizDto {
    fn from(quiz: &Quiz) -> Self {
        Self {
            id: quiz.id,
            title: quiz.title.clone(),
            questions: quiz.questions.iter().map(QuestionDto::from).collect(),
            passing_threshold: passing_threshold(quiz),
            time_limit_seconds: quiz.time_limit_seconds,
            max_attempts: quiz.max_attempts,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct QuestionResultDto {
    pub question_id: Uuid,
    pub correct: bool,
    pub points_awarded: u32,
    pub points_possible: u32,
    pub explanation: Option<String>,
}

impl From<&QuestionResult> for QuestionResultDto {
    fn from(r: &QuestionResult) -> Self {
        Self {
            question_id: r.question_id,
            correct: r.correct,
            points_awarded: r.points_awarded,
            points_possible: r.points_possible,
            explanation: r.explanation.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct QuizResultDto {
    pub per_question: Vec<QuestionResultDto>,
    pub score: u32,
    pub max_score: u32,
    pub correct_count: usize,
    pub percentage: u8,
    pub threshold: u8,
    pub passed: bool,
}

impl From<&QuizResult> for QuizResultDto {
    fn from(result: &QuizResult) -> Self {
        Self {
            per_question: result.per_question.iter().map(QuestionResultDto::from).collect(),
            score: result.score,
            max_score: result.max_score,
            correct_count: result.correct_count,
            percentage: result.percentage,
            threshold: result.threshold,
            passed: result.passed,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AttemptDto {
    pub id: Uuid,
    pub quiz_id: Uuid,
    pub attempt_number: u32,
    pub score: u32,
    pub max_score: u32,
    pub percentage: u8,
    pub passed: bool,
    pub submitted_at: DateTime<Utc>,
}

impl From<&StoredAttempt> for AttemptDto {
    fn from(a: &StoredAttempt) -> Self {
        Self {
            id: a.id,
            quiz_id: a.quiz_id,
            attempt_number: a.attempt_number,
            score: a.score,
            max_score: a.max_score,
            percentage: a.percentage,
            passed: a.passed,
            submitted_at: a.submitted_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SubmitAttemptResponse {
    pub attempt: AttemptDto,
    pub result: QuizResultDto,
    /// Certificates issued because this attempt completed a course.
    pub certificates: Vec<CertificateDto>,
}

//=========================================================================================
// Courses and certificates
//=========================================================================================

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CertificateDto {
    pub id: Uuid,
    pub course_id: Uuid,
    pub issued_at: DateTime<Utc>,
}

impl From<&Certificate> for CertificateDto {
    fn from(c: &Certificate) -> Self {
        Self {
            id: c.id,
            course_id: c.course_id,
            issued_at: c.issued_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct NodeDto {
    pub id: Uuid,
    pub title: String,
    /// `clip` or `quiz`.
    pub kind: String,
    pub content_id: Uuid,
    pub required: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ModuleDto {
    pub id: Uuid,
    pub title: String,
    pub nodes: Vec<NodeDto>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ModuleProgressDto {
    pub module_id: Uuid,
    pub completed_nodes: usize,
    pub required_nodes: usize,
    pub complete: bool,
}

impl From<&ModuleProgress> for ModuleProgressDto {
    fn from(m: &ModuleProgress) -> Self {
        Self {
            module_id: m.module_id,
            completed_nodes: m.completed_nodes,
            required_nodes: m.required_nodes,
            complete: m.complete,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProgressDto {
    pub percentage: u8,
    pub next_node: Option<Uuid>,
    pub complete: bool,
    pub modules: Vec<ModuleProgressDto>,
}

impl From<&CourseProgress> for ProgressDto {
    fn from(p: &CourseProgress) -> Self {
        Self {
            percentage: p.percentage,
            next_node: p.next_node,
            complete: p.complete,
            modules: p.modules.iter().map(ModuleProgressDto::from).collect(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CourseDto {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub modules: Vec<ModuleDto>,
    pub progress: ProgressDto,
}

impl CourseDto {
    pub fn new(course: &Course, progress: &CourseProgress) -> Self {
        let modules = course
            .modules
            .iter()
            .map(|module| ModuleDto {
                id: module.id,
                title: module.title.clone(),
                nodes: module
                    .nodes
                    .iter()
                    .map(|node| {
                        let (kind, content_id) = match node.content {
                            NodeContent::Clip { clip_id } => ("clip", clip_id),
                            NodeContent::Quiz { quiz_id } => ("quiz", quiz_id),
                        };
                        NodeDto {
                            id: node.id,
                            title: node.title.clone(),
                            kind: kind.to_string(),
                            content_id,
                            required: node.required,
                        }
                    })
                    .collect(),
            })
            .collect();
        Self {
            id: course.id,
            title: course.title.clone(),
            description: course.description.clone(),
            modules,
            progress: ProgressDto::from(progress),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CompletionResponse {
    pub progress: ProgressDto,
    pub certificate: Option<CertificateDto>,
}

//=========================================================================================
// Billing and checkout
//=========================================================================================

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PlanDto {
    pub id: Uuid,
    pub name: String,
    pub price_cents: u64,
    pub interval: String,
    pub features: Vec<String>,
}

impl From<&Plan> for PlanDto {
    fn from(plan: &Plan) -> Self {
        Self {
            id: plan.id,
            name: plan.name.clone(),
            price_cents: plan.price_cents,
            interval: plan.interval.as_str().to_string(),
            features: plan.features.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct BillingAddressDto {
    pub full_name: String,
    pub line1: String,
    #[serde(default)]
    pub line2: Option<String>,
    pub city: String,
    pub region: String,
    pub postal_code: String,
    pub country: String,
}

impl From<BillingAddressDto> for BillingAddress {
    fn from(b: BillingAddressDto) -> Self {
        Self {
            full_name: b.full_name,
            line1: b.line1,
            line2: b.line2.filter(|l| !l.trim().is_empty()),
            city: b.city,
            region: b.region,
            postal_code: b.postal_code,
            country: b.country,
        }
    }
}

impl From<&BillingAddress> for BillingAddressDto {
    fn from(b: &BillingAddress) -> Self {
        Self {
            full_name: b.full_name.clone(),
            line1: b.line1.clone(),
            line2: b.line2.clone(),
            city: b.city.clone(),
            region: b.region.clone(),
            postal_code: b.postal_code.clone(),
            country: b.country.clone(),
        }
    }
}

#[derive(Deserialize, ToSchema, Validate)]
pub struct PaymentCardDto {
    #[validate(credit_card(message = "Enter a valid card number"))]
    pub number: String,
    #[validate(range(min = 1, max = 12, message = "Expiry month must be between 1 and 12"))]
    pub exp_month: u32,
    pub exp_year: i32,
    #[validate(
        length(min = 3, max = 4, message = "Security code must be 3 or 4 digits"),
        custom(function = "digits_only", message = "Security code must be 3 or 4 digits")
    )]
    pub cvc: String,
    #[validate(length(min = 1, message = "Cardholder name is required"))]
    pub holder_name: String,
}

impl PaymentCardDto {
    /// Drops the spaces and dashes people type into card numbers.
    pub fn normalized(self) -> Self {
        Self {
            number: self.number.chars().filter(|c| !matches!(c, ' ' | '-')).collect(),
            cvc: self.cvc.trim().to_string(),
            holder_name: self.holder_name.trim().to_string(),
            ..self
        }
    }
}

impl From<PaymentCardDto> for PaymentCard {
    fn from(c: PaymentCardDto) -> Self {
        Self {
            number: c.number,
            exp_month: c.exp_month,
            exp_year: c.exp_year,
            cvc: c.cvc,
            holder_name: c.holder_name,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SubscriptionDto {
    pub id: Uuid,
    pub plan_id: Uuid,
    pub status: String,
    pub amount_cents: u64,
    pub started_at: DateTime<Utc>,
    pub renews_at: DateTime<Utc>,
}

impl From<&Subscription> for SubscriptionDto {
    fn from(s: &Subscription) -> Self {
        Self {
            id: s.id,
            plan_id: s.plan_id,
            status: s.status.as_str().to_string(),
            amount_cents: s.amount_cents,
            started_at: s.started_at,
            renews_at: s.renews_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AppliedPromoDto {
    pub code: String,
    pub percent_off: u8,
}

impl From<&AppliedPromo> for AppliedPromoDto {
    fn from(p: &AppliedPromo) -> Self {
        Self {
            code: p.code.clone(),
            percent_off: p.percent_off,
        }
    }
}

/// Everything the wizard needs to render its current step.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CheckoutView {
    pub step: String,
    pub step_number: u8,
    pub plan: Option<PlanDto>,
    pub billing: BillingAddressDto,
    pub terms_accepted: bool,
    pub promo: Option<AppliedPromoDto>,
    pub submitting: bool,
    pub error: Option<String>,
    pub subscription: Option<SubscriptionDto>,
    pub total_due_cents: u64,
}

impl From<&CheckoutState> for CheckoutView {
    fn from(state: &CheckoutState) -> Self {
        Self {
            step: state.step.as_str().to_string(),
            step_number: state.step.number(),
            plan: state.plan.as_ref().map(PlanDto::from),
            billing: BillingAddressDto::from(&state.billing),
            terms_accepted: state.terms_accepted,
            promo: state.promo.as_ref().map(AppliedPromoDto::from),
            submitting: state.submitting,
            error: state.error.clone(),
            subscription: state.subscription.as_ref().map(SubscriptionDto::from),
            total_due_cents: total_due_cents(state),
        }
    }
}
