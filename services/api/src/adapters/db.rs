//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `DatabaseService` port from the `core` crate. It handles all interactions
//! with the PostgreSQL database using `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use learnhub_core::domain::{
    AnswerValue, BillingInterval, Certificate, ContactMessage, ContentItem, Course, CourseModule,
    CourseNode, NodeContent, Plan, PromoCode, Question, QuestionKind, Quiz, StoredAttempt,
    Subscription, User, UserCredentials,
};
use learnhub_core::ports::{DatabaseService, PortError, PortResult};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `DatabaseService` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

/// Maps `RowNotFound` to `NotFound` with the given description.
fn not_found(what: impl FnOnce() -> String) -> impl FnOnce(sqlx::Error) -> PortError {
    move |e| match e {
        sqlx::Error::RowNotFound => PortError::NotFound(what()),
        _ => PortError::Unexpected(e.to_string()),
    }
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    e.as_database_error()
        .is_some_and(|db| db.is_unique_violation())
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct UserRecord {
    user_id: Uuid,
    email: String,
    display_name: String,
}
impl UserRecord {
    fn to_domain(self) -> User {
        User {
            user_id: self.user_id,
            email: self.email,
            display_name: self.display_name,
        }
    }
}

#[derive(FromRow)]
struct CredentialsRecord {
    user_id: Uuid,
    email: String,
    hashed_password: String,
}

#[derive(FromRow)]
struct ClipRecord {
    id: Uuid,
    title: String,
    description: String,
    duration_seconds: i32,
    machine_model: String,
    process: String,
    skill_level: String,
    tags: Vec<String>,
    author_id: Uuid,
    view_count: i64,
    created_at: DateTime<Utc>,
}
impl ClipRecord {
    fn to_domain(self) -> PortResult<ContentItem> {
        let skill_level = self
            .skill_level
            .parse()
            .map_err(|e| PortError::Unexpected(format!("clip {}: {}", self.id, e)))?;
        Ok(ContentItem {
            id: self.id,
            title: self.title,
            description: self.description,
            duration_seconds: self.duration_seconds.max(0) as u32,
            machine_model: self.machine_model,
            process: self.process,
            skill_level,
            tags: self.tags.into_iter().collect(),
            author_id: self.author_id,
            view_count: self.view_count.max(0) as u64,
            created_at: self.created_at,
        })
    }
}

#[derive(FromRow)]
struct CourseRecord {
    id: Uuid,
    title: String,
    description: String,
    passing_threshold: Option<i16>,
    max_attempts: Option<i32>,
}

#[derive(FromRow)]
struct ModuleRecord {
    id: Uuid,
    title: String,
}

#[derive(FromRow)]
struct NodeRecord {
    id: Uuid,
    module_id: Uuid,
    title: String,
    clip_id: Option<Uuid>,
    quiz_id: Option<Uuid>,
    required: bool,
}
impl NodeRecord {
    fn to_domain(self) -> PortResult<CourseNode> {
        let content = match (self.clip_id, self.quiz_id) {
            (Some(clip_id), None) => NodeContent::Clip { clip_id },
            (None, Some(quiz_id)) => NodeContent::Quiz { quiz_id },
            _ => {
                return Err(PortError::Unexpected(format!(
                    "course node {} must reference exactly one clip or quiz",
                    self.id
                )))
            }
        };
        Ok(CourseNode {
            id: self.id,
            title: self.title,
            content,
            required: self.required,
        })
    }
}

#[derive(FromRow)]
struct QuizRecord {
    id: Uuid,
    title: String,
    passing_threshold: Option<i16>,
    time_limit_seconds: Option<i32>,
    max_attempts: Option<i32>,
}

#[derive(FromRow)]
struct QuestionRecord {
    id: Uuid,
    prompt: String,
    kind: String,
    options: Vec<String>,
    correct_answers: Vec<String>,
    multi_select: bool,
    points: i32,
    explanation: Option<String>,
}
impl QuestionRecord {
    fn to_domain(self) -> PortResult<Question> {
        let kind = QuestionKind::parse(&self.kind).ok_or_else(|| {
            PortError::Unexpected(format!("question {} has unknown kind '{}'", self.id, self.kind))
        })?;
        let correct = if self.multi_select {
            AnswerValue::Multiple(self.correct_answers.into_iter().collect())
        } else {
            let answer = self.correct_answers.into_iter().next().ok_or_else(|| {
                PortError::Unexpected(format!("question {} has no correct answer", self.id))
            })?;
            AnswerValue::Single(answer)
        };
        Ok(Question {
            id: self.id,
            prompt: self.prompt,
            kind,
            options: self.options,
            correct,
            points: self.points.max(0) as u32,
            explanation: self.explanation,
        })
    }
}

#[derive(FromRow)]
struct AttemptRecord {
    id: Uuid,
    user_id: Uuid,
    quiz_id: Uuid,
    attempt_number: i32,
    score: i64,
    max_score: i64,
    percentage: i16,
    passed: bool,
    submitted_at: DateTime<Utc>,
}
impl AttemptRecord {
    fn to_domain(self) -> StoredAttempt {
        StoredAttempt {
            id: self.id,
            user_id: self.user_id,
            quiz_id: self.quiz_id,
            attempt_number: self.attempt_number as u32,
            score: u32::try_from(self.score).unwrap_or(u32::MAX),
            max_score: u32::try_from(self.max_score).unwrap_or(u32::MAX),
            percentage: self.percentage as u8,
            passed: self.passed,
            submitted_at: self.submitted_at,
        }
    }
}

#[derive(FromRow)]
struct CertificateRecord {
    id: Uuid,
    user_id: Uuid,
    course_id: Uuid,
    issued_at: DateTime<Utc>,
}
impl CertificateRecord {
    fn to_domain(self) -> Certificate {
        Certificate {
            id: self.id,
            user_id: self.user_id,
            course_id: self.course_id,
            issued_at: self.issued_at,
        }
    }
}

#[derive(FromRow)]
struct PlanRecord {
    id: Uuid,
    name: String,
    price_cents: i64,
    billing_interval: String,
    features: Vec<String>,
}
impl PlanRecord {
    fn to_domain(self) -> PortResult<Plan> {
        let interval = BillingInterval::parse(&self.billing_interval).ok_or_else(|| {
            PortError::Unexpected(format!(
                "plan {} has unknown interval '{}'",
                self.id, self.billing_interval
            ))
        })?;
        Ok(Plan {
            id: self.id,
            name: self.name,
            price_cents: self.price_cents.max(0) as u64,
            interval,
            features: self.features,
        })
    }
}

#[derive(FromRow)]
struct PromoRecord {
    code: String,
    percent_off: i16,
    expires_at: Option<DateTime<Utc>>,
}

const CLIP_COLUMNS: &str = "id, title, description, duration_seconds, machine_model, process, \
     skill_level, tags, author_id, view_count, created_at";

//=========================================================================================
// `DatabaseService` Trait Implementation
//=========================================================================================

#[async_trait]
impl DatabaseService for DbAdapter {
    // --- Accounts ---

    async fn create_user_with_email(
        &self,
        email: &str,
        display_name: &str,
        hashed_password: &str,
    ) -> PortResult<User> {
        let record = sqlx::query_as::<_, UserRecord>(
            "INSERT INTO users (user_id, email, display_name, hashed_password) VALUES ($1, $2, $3, $4) \
             RETURNING user_id, email, display_name",
        )
        .bind(Uuid::new_v4())
        .bind(email)
        .bind(display_name)
        .bind(hashed_password)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                PortError::Conflict(format!("An account for {} already exists", email))
            } else {
                unexpected(e)
            }
        })?;
        Ok(record.to_domain())
    }

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        let record = sqlx::query_as::<_, CredentialsRecord>(
            "SELECT user_id, email, hashed_password FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_one(&self.pool)
        .await
        .map_err(not_found(|| format!("User {} not found", email)))?;
        Ok(UserCredentials {
            user_id: record.user_id,
            email: record.email,
            hashed_password: record.hashed_password,
        })
    }

    async fn get_user(&self, user_id: Uuid) -> PortResult<User> {
        let record = sqlx::query_as::<_, UserRecord>(
            "SELECT user_id, email, display_name FROM users WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(not_found(|| format!("User {} not found", user_id)))?;
        Ok(record.to_domain())
    }

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        sqlx::query("INSERT INTO auth_sessions (id, user_id, expires_at) VALUES ($1, $2, $3)")
            .bind(session_id)
            .bind(user_id)
            .bind(expires_at)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid> {
        let user_id: Option<Uuid> = sqlx::query_scalar(
            "SELECT user_id FROM auth_sessions WHERE id = $1 AND expires_at > NOW()",
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;
        user_id.ok_or(PortError::Unauthorized)
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        sqlx::query("DELETE FROM auth_sessions WHERE id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    // --- Catalog ---

    async fn list_clips(&self) -> PortResult<Vec<ContentItem>> {
        let records = sqlx::query_as::<_, ClipRecord>(&format!(
            "SELECT {CLIP_COLUMNS} FROM clips ORDER BY relevance_rank ASC, created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        records.into_iter().map(ClipRecord::to_domain).collect()
    }

    async fn get_clip(&self, clip_id: Uuid) -> PortResult<ContentItem> {
        let record = sqlx::query_as::<_, ClipRecord>(&format!(
            "SELECT {CLIP_COLUMNS} FROM clips WHERE id = $1"
        ))
        .bind(clip_id)
        .fetch_one(&self.pool)
        .await
        .map_err(not_found(|| format!("Clip {} not found", clip_id)))?;
        record.to_domain()
    }

    // --- Bookmarks ---

    async fn list_bookmarks(&self, user_id: Uuid) -> PortResult<Vec<Uuid>> {
        sqlx::query_scalar("SELECT clip_id FROM bookmarks WHERE user_id = $1 ORDER BY created_at DESC")
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)
    }

    async fn add_bookmark(&self, user_id: Uuid, clip_id: Uuid) -> PortResult<()> {
        sqlx::query(
            "INSERT INTO bookmarks (user_id, clip_id) VALUES ($1, $2) ON CONFLICT (user_id, clip_id) DO NOTHING",
        )
        .bind(user_id)
        .bind(clip_id)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(())
    }

    async fn remove_bookmark(&self, user_id: Uuid, clip_id: Uuid) -> PortResult<()> {
        sqlx::query("DELETE FROM bookmarks WHERE user_id = $1 AND clip_id = $2")
            .bind(user_id)
            .bind(clip_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    // --- Courses, quizzes and progress ---

    async fn get_course(&self, course_id: Uuid) -> PortResult<Course> {
        let course = sqlx::query_as::<_, CourseRecord>(
            "SELECT id, title, description, passing_threshold, max_attempts FROM courses WHERE id = $1",
        )
        .bind(course_id)
        .fetch_one(&self.pool)
        .await
        .map_err(not_found(|| format!("Course {} not found", course_id)))?;

        let module_records = sqlx::query_as::<_, ModuleRecord>(
            "SELECT id, title FROM course_modules WHERE course_id = $1 ORDER BY position ASC",
        )
        .bind(course_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        let node_records = sqlx::query_as::<_, NodeRecord>(
            "SELECT n.id, n.module_id, n.title, n.clip_id, n.quiz_id, n.required \
             FROM course_nodes n JOIN course_modules m ON m.id = n.module_id \
             WHERE m.course_id = $1 ORDER BY m.position ASC, n.position ASC",
        )
        .bind(course_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        let mut modules: Vec<CourseModule> = module_records
            .into_iter()
            .map(|m| CourseModule {
                id: m.id,
                title: m.title,
                nodes: Vec::new(),
            })
            .collect();
        for record in node_records {
            let module_id = record.module_id;
            let node = record.to_domain()?;
            if let Some(module) = modules.iter_mut().find(|m| m.id == module_id) {
                module.nodes.push(node);
            }
        }

        Ok(Course {
            id: course.id,
            title: course.title,
            description: course.description,
            modules,
            passing_threshold: course.passing_threshold.map(|t| t as u8),
            max_attempts: course.max_attempts.map(|m| m as u32),
        })
    }

    async fn courses_with_quiz(&self, quiz_id: Uuid) -> PortResult<Vec<Course>> {
        let course_ids: Vec<Uuid> = sqlx::query_scalar(
            "SELECT DISTINCT m.course_id FROM course_nodes n \
             JOIN course_modules m ON m.id = n.module_id WHERE n.quiz_id = $1",
        )
        .bind(quiz_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        let mut courses = Vec::with_capacity(course_ids.len());
        for course_id in course_ids {
            courses.push(self.get_course(course_id).await?);
        }
        Ok(courses)
    }

    async fn get_quiz(&self, quiz_id: Uuid) -> PortResult<Quiz> {
        let quiz = sqlx::query_as::<_, QuizRecord>(
            "SELECT id, title, passing_threshold, time_limit_seconds, max_attempts FROM quizzes WHERE id = $1",
        )
        .bind(quiz_id)
        .fetch_one(&self.pool)
        .await
        .map_err(not_found(|| format!("Quiz {} not found", quiz_id)))?;

        let questions = sqlx::query_as::<_, QuestionRecord>(
            "SELECT id, prompt, kind, options, correct_answers, multi_select, points, explanation \
             FROM quiz_questions WHERE quiz_id = $1 ORDER BY position ASC",
        )
        .bind(quiz_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?
        .into_iter()
        .map(QuestionRecord::to_domain)
        .collect::<PortResult<Vec<_>>>()?;

        Ok(Quiz {
            id: quiz.id,
            title: quiz.title,
            questions,
            passing_threshold: quiz.passing_threshold.map(|t| t as u8),
            time_limit_seconds: quiz.time_limit_seconds.map(|t| t as u32),
            max_attempts: quiz.max_attempts.map(|m| m as u32),
        })
    }

    async fn list_attempts(&self, user_id: Uuid, quiz_id: Uuid) -> PortResult<Vec<StoredAttempt>> {
        let records = sqlx::query_as::<_, AttemptRecord>(
            "SELECT id, user_id, quiz_id, attempt_number, score, max_score, percentage, passed, submitted_at \
             FROM quiz_attempts WHERE user_id = $1 AND quiz_id = $2 ORDER BY attempt_number ASC",
        )
        .bind(user_id)
        .bind(quiz_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn save_attempt(&self, attempt: StoredAttempt) -> PortResult<()> {
        sqlx::query(
            "INSERT INTO quiz_attempts (id, user_id, quiz_id, attempt_number, score, max_score, percentage, passed, submitted_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(attempt.id)
        .bind(attempt.user_id)
        .bind(attempt.quiz_id)
        .bind(attempt.attempt_number as i32)
        .bind(i64::from(attempt.score))
        .bind(i64::from(attempt.max_score))
        .bind(i16::from(attempt.percentage))
        .bind(attempt.passed)
        .bind(attempt.submitted_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                PortError::Conflict(format!(
                    "Attempt {} for quiz {} was already recorded",
                    attempt.attempt_number, attempt.quiz_id
                ))
            } else {
                unexpected(e)
            }
        })?;
        Ok(())
    }

    async fn record_clip_completion(&self, user_id: Uuid, clip_id: Uuid) -> PortResult<()> {
        sqlx::query(
            "INSERT INTO clip_completions (user_id, clip_id) VALUES ($1, $2) ON CONFLICT (user_id, clip_id) DO NOTHING",
        )
        .bind(user_id)
        .bind(clip_id)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(())
    }

    async fn list_completed_clips(&self, user_id: Uuid) -> PortResult<Vec<Uuid>> {
        sqlx::query_scalar("SELECT clip_id FROM clip_completions WHERE user_id = $1")
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)
    }

    async fn list_passed_quizzes(&self, user_id: Uuid) -> PortResult<Vec<Uuid>> {
        sqlx::query_scalar("SELECT DISTINCT quiz_id FROM quiz_attempts WHERE user_id = $1 AND passed")
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)
    }

    // --- Certificates ---

    async fn issue_certificate(&self, user_id: Uuid, course_id: Uuid) -> PortResult<Certificate> {
        sqlx::query(
            "INSERT INTO certificates (id, user_id, course_id) VALUES ($1, $2, $3) \
             ON CONFLICT (user_id, course_id) DO NOTHING",
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(course_id)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;

        let record = sqlx::query_as::<_, CertificateRecord>(
            "SELECT id, user_id, course_id, issued_at FROM certificates WHERE user_id = $1 AND course_id = $2",
        )
        .bind(user_id)
        .bind(course_id)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(record.to_domain())
    }

    async fn list_certificates(&self, user_id: Uuid) -> PortResult<Vec<Certificate>> {
        let records = sqlx::query_as::<_, CertificateRecord>(
            "SELECT id, user_id, course_id, issued_at FROM certificates WHERE user_id = $1 ORDER BY issued_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    // --- Billing ---

    async fn list_plans(&self) -> PortResult<Vec<Plan>> {
        let records = sqlx::query_as::<_, PlanRecord>(
            "SELECT id, name, price_cents, billing_interval, features FROM plans ORDER BY position ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        records.into_iter().map(PlanRecord::to_domain).collect()
    }

    async fn get_plan(&self, plan_id: Uuid) -> PortResult<Plan> {
        let record = sqlx::query_as::<_, PlanRecord>(
            "SELECT id, name, price_cents, billing_interval, features FROM plans WHERE id = $1",
        )
        .bind(plan_id)
        .fetch_one(&self.pool)
        .await
        .map_err(not_found(|| format!("Plan {} not found", plan_id)))?;
        record.to_domain()
    }

    async fn find_promo_code(&self, code: &str) -> PortResult<PromoCode> {
        let record = sqlx::query_as::<_, PromoRecord>(
            "SELECT code, percent_off, expires_at FROM promo_codes WHERE UPPER(code) = UPPER($1)",
        )
        .bind(code)
        .fetch_one(&self.pool)
        .await
        .map_err(not_found(|| format!("Promo code {} not found", code)))?;
        Ok(PromoCode {
            code: record.code,
            percent_off: record.percent_off.clamp(0, 100) as u8,
            expires_at: record.expires_at,
        })
    }

    async fn save_subscription(&self, subscription: &Subscription) -> PortResult<()> {
        sqlx::query(
            "INSERT INTO subscriptions (id, user_id, plan_id, status, amount_cents, started_at, renews_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(subscription.id)
        .bind(subscription.user_id)
        .bind(subscription.plan_id)
        .bind(subscription.status.as_str())
        .bind(subscription.amount_cents as i64)
        .bind(subscription.started_at)
        .bind(subscription.renews_at)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(())
    }

    // --- Contact ---

    async fn save_contact_message(&self, message: &ContactMessage) -> PortResult<()> {
        sqlx::query(
            "INSERT INTO contact_messages (id, name, email, subject, body) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(Uuid::new_v4())
        .bind(&message.name)
        .bind(&message.email)
        .bind(&message.subject)
        .bind(&message.body)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(())
    }
}
