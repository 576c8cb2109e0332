//! Shared fixtures for the API integration tests: an in-memory store, a
//! gated payment processor, and request helpers.

#![allow(dead_code)]

use api_lib::adapters::SandboxPaymentAdapter;
use api_lib::config::Config;
use api_lib::web::{self, state::AppState};
use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use chrono::{DateTime, Duration, TimeZone, Utc};
use learnhub_core::domain::{
    AnswerValue, BillingAddress, BillingInterval, Certificate, ContactMessage, ContentItem,
    Course, CourseModule, CourseNode, NodeContent, PaymentCard, Plan, PromoCode, Question,
    QuestionKind, Quiz, SkillLevel, StoredAttempt, Subscription, User, UserCredentials,
};
use learnhub_core::ports::{DatabaseService, PaymentProcessor, PortError, PortResult};
use serde_json::Value;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;
use tower::ServiceExt;
use uuid::Uuid;

//=========================================================================================
// In-memory store
//=========================================================================================

#[derive(Default)]
pub struct Inner {
    pub users: Vec<(User, String)>,
    pub sessions: Vec<(String, Uuid)>,
    pub clips: Vec<ContentItem>,
    pub bookmarks: Vec<(Uuid, Uuid)>,
    pub courses: Vec<Course>,
    pub quizzes: Vec<Quiz>,
    pub attempts: Vec<StoredAttempt>,
    pub completions: HashSet<(Uuid, Uuid)>,
    pub certificates: Vec<Certificate>,
    pub plans: Vec<Plan>,
    pub promos: Vec<PromoCode>,
    pub subscriptions: Vec<Subscription>,
    pub contacts: Vec<ContactMessage>,
}

#[derive(Default)]
pub struct InMemoryDb {
    pub inner: Mutex<Inner>,
    /// When set, bookmark writes fail with `Unexpected`.
    pub fail_bookmark_writes: AtomicBool,
}

impl InMemoryDb {
    pub fn with<R>(&self, f: impl FnOnce(&mut Inner) -> R) -> R {
        f(&mut self.inner.lock().unwrap())
    }

    /// Registers a session for `user_id` and returns the matching cookie header.
    pub fn sign_in(&self, user_id: Uuid) -> String {
        let token = format!("token-{user_id}");
        self.with(|db| db.sessions.push((token.clone(), user_id)));
        format!("session={token}")
    }
}

fn not_found(what: &str, id: impl std::fmt::Display) -> PortError {
    PortError::NotFound(format!("{what} {id} not found"))
}

#[async_trait]
impl DatabaseService for InMemoryDb {
    async fn create_user_with_email(
        &self,
        email: &str,
        display_name: &str,
        hashed_password: &str,
    ) -> PortResult<User> {
        self.with(|db| {
            if db.users.iter().any(|(u, _)| u.email == email) {
                return Err(PortError::Conflict(format!("An account for {email} already exists")));
            }
            let user = User {
                user_id: Uuid::new_v4(),
                email: email.to_string(),
                display_name: display_name.to_string(),
            };
            db.users.push((user.clone(), hashed_password.to_string()));
            Ok(user)
        })
    }

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        self.with(|db| {
            db.users
                .iter()
                .find(|(u, _)| u.email == email)
                .map(|(u, hash)| UserCredentials {
                    user_id: u.user_id,
                    email: u.email.clone(),
                    hashed_password: hash.clone(),
                })
                .ok_or_else(|| not_found("User", email))
        })
    }

    async fn get_user(&self, user_id: Uuid) -> PortResult<User> {
        self.with(|db| {
            db.users
                .iter()
                .find(|(u, _)| u.user_id == user_id)
                .map(|(u, _)| u.clone())
                .ok_or_else(|| not_found("User", user_id))
        })
    }

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        _expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        self.with(|db| db.sessions.push((session_id.to_string(), user_id)));
        Ok(())
    }

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid> {
        self.with(|db| {
            db.sessions
                .iter()
                .find(|(id, _)| id == session_id)
                .map(|(_, user_id)| *user_id)
                .ok_or(PortError::Unauthorized)
        })
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        self.with(|db| db.sessions.retain(|(id, _)| id != session_id));
        Ok(())
    }

    async fn list_clips(&self) -> PortResult<Vec<ContentItem>> {
        Ok(self.with(|db| db.clips.clone()))
    }

    async fn get_clip(&self, clip_id: Uuid) -> PortResult<ContentItem> {
        self.with(|db| {
            db.clips
                .iter()
                .find(|c| c.id == clip_id)
                .cloned()
                .ok_or_else(|| not_found("Clip", clip_id))
        })
    }

    async fn list_bookmarks(&self, user_id: Uuid) -> PortResult<Vec<Uuid>> {
        Ok(self.with(|db| {
            db.bookmarks
                .iter()
                .rev()
                .filter(|(u, _)| *u == user_id)
                .map(|(_, c)| *c)
                .collect()
        }))
    }

    async fn add_bookmark(&self, user_id: Uuid, clip_id: Uuid) -> PortResult<()> {
        if self.fail_bookmark_writes.load(Ordering::SeqCst) {
            return Err(PortError::Unexpected("bookmark store offline".into()));
        }
        self.with(|db| {
            if !db.bookmarks.contains(&(user_id, clip_id)) {
                db.bookmarks.push((user_id, clip_id));
            }
        });
        Ok(())
    }

    async fn remove_bookmark(&self, user_id: Uuid, clip_id: Uuid) -> PortResult<()> {
        if self.fail_bookmark_writes.load(Ordering::SeqCst) {
            return Err(PortError::Unexpected("bookmark store offline".into()));
        }
        self.with(|db| db.bookmarks.retain(|b| *b != (user_id, clip_id)));
        Ok(())
    }

    async fn get_course(&self, course_id: Uuid) -> PortResult<Course> {
        self.with(|db| {
            db.courses
                .iter()
                .find(|c| c.id == course_id)
                .cloned()
                .ok_or_else(|| not_found("Course", course_id))
        })
    }

    async fn courses_with_quiz(&self, quiz_id: Uuid) -> PortResult<Vec<Course>> {
        Ok(self.with(|db| {
            db.courses
                .iter()
                .filter(|c| c.contains_quiz(quiz_id))
                .cloned()
                .collect()
        }))
    }

    async fn get_quiz(&self, quiz_id: Uuid) -> PortResult<Quiz> {
        self.with(|db| {
            db.quizzes
                .iter()
                .find(|q| q.id == quiz_id)
                .cloned()
                .ok_or_else(|| not_found("Quiz", quiz_id))
        })
    }

    async fn list_attempts(&self, user_id: Uuid, quiz_id: Uuid) -> PortResult<Vec<StoredAttempt>> {
        Ok(self.with(|db| {
            db.attempts
                .iter()
                .filter(|a| a.user_id == user_id && a.quiz_id == quiz_id)
                .cloned()
                .collect()
        }))
    }

    async fn save_attempt(&self, attempt: StoredAttempt) -> PortResult<()> {
        self.with(|db| {
            let duplicate = db.attempts.iter().any(|a| {
                a.user_id == attempt.user_id
                    && a.quiz_id == attempt.quiz_id
                    && a.attempt_number == attempt.attempt_number
            });
            if duplicate {
                return Err(PortError::Conflict("attempt already recorded".into()));
            }
            db.attempts.push(attempt);
            Ok(())
        })
    }

    async fn record_clip_completion(&self, user_id: Uuid, clip_id: Uuid) -> PortResult<()> {
        self.with(|db| db.completions.insert((user_id, clip_id)));
        Ok(())
    }

    async fn list_completed_clips(&self, user_id: Uuid) -> PortResult<Vec<Uuid>> {
        Ok(self.with(|db| {
            db.completions
                .iter()
                .filter(|(u, _)| *u == user_id)
                .map(|(_, c)| *c)
                .collect()
        }))
    }

    async fn list_passed_quizzes(&self, user_id: Uuid) -> PortResult<Vec<Uuid>> {
        Ok(self.with(|db| {
            db.attempts
                .iter()
                .filter(|a| a.user_id == user_id && a.passed)
                .map(|a| a.quiz_id)
                .collect()
        }))
    }

    async fn issue_certificate(&self, user_id: Uuid, course_id: Uuid) -> PortResult<Certificate> {
        Ok(self.with(|db| {
            if let Some(existing) = db
                .certificates
                .iter()
                .find(|c| c.user_id == user_id && c.course_id == course_id)
            {
                return existing.clone();
            }
            let certificate = Certificate {
                id: Uuid::new_v4(),
                user_id,
                course_id,
                issued_at: Utc::now(),
            };
            db.certificates.push(certificate.clone());
            certificate
        }))
    }

    async fn list_certificates(&self, user_id: Uuid) -> PortResult<Vec<Certificate>> {
        Ok(self.with(|db| {
            db.certificates
                .iter()
                .filter(|c| c.user_id == user_id)
                .cloned()
                .collect()
        }))
    }

    async fn list_plans(&self) -> PortResult<Vec<Plan>> {
        Ok(self.with(|db| db.plans.clone()))
    }

    async fn get_plan(&self, plan_id: Uuid) -> PortResult<Plan> {
        self.with(|db| {
            db.plans
                .iter()
                .find(|p| p.id == plan_id)
                .cloned()
                .ok_or_else(|| not_found("Plan", plan_id))
        })
    }

    async fn find_promo_code(&self, code: &str) -> PortResult<PromoCode> {
        self.with(|db| {
            db.promos
                .iter()
                .find(|p| p.code.eq_ignore_ascii_case(code))
                .cloned()
                .ok_or_else(|| not_found("Promo code", code))
        })
    }

    async fn save_subscription(&self, subscription: &Subscription) -> PortResult<()> {
        self.with(|db| db.subscriptions.push(subscription.clone()));
        Ok(())
    }

    async fn save_contact_message(&self, message: &ContactMessage) -> PortResult<()> {
        self.with(|db| db.contacts.push(message.clone()));
        Ok(())
    }
}

//=========================================================================================
// Payments
//=========================================================================================

/// Delegates to the sandbox processor, but only once the gate is opened.
#[derive(Default)]
pub struct GatedPayments {
    pub gate: Notify,
    inner: SandboxPaymentAdapter,
}

#[async_trait]
impl PaymentProcessor for GatedPayments {
    async fn create_subscription(
        &self,
        user_id: Uuid,
        plan: &Plan,
        billing: &BillingAddress,
        card: &PaymentCard,
        amount_cents: u64,
    ) -> PortResult<Subscription> {
        self.gate.notified().await;
        self.inner
            .create_subscription(user_id, plan, billing, card, amount_cents)
            .await
    }
}

//=========================================================================================
// App construction
//=========================================================================================

pub fn test_config() -> Config {
    Config {
        bind_address: "127.0.0.1:0".parse().unwrap(),
        database_url: "postgres://unused".to_string(),
        database_max_connections: 1,
        log_level: tracing::Level::INFO,
        cors_origin: "http://localhost:3000".to_string(),
        session_ttl_days: 30,
        quiz_tick: std::time::Duration::from_secs(1),
    }
}

pub fn app_state_with(db: Arc<InMemoryDb>, payments: Arc<dyn PaymentProcessor>) -> Arc<AppState> {
    Arc::new(AppState::new(db, payments, Arc::new(test_config())))
}

pub fn app_with(db: Arc<InMemoryDb>) -> (Router, Arc<AppState>) {
    let state = app_state_with(db, Arc::new(SandboxPaymentAdapter::new()));
    (web::router(state.clone()), state)
}

pub fn request(method: Method, uri: &str, cookie: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

/// Sends one request and decodes the JSON response body (`Null` when empty).
pub async fn send(router: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, body)
}

//=========================================================================================
// Fixtures
//=========================================================================================

pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

pub fn clip(n: u32) -> ContentItem {
    ContentItem {
        id: Uuid::from_u128(n as u128),
        title: format!("Clip {n}"),
        description: if n % 5 == 0 {
            "Probing a spindle".to_string()
        } else {
            "Setting up the chuck".to_string()
        },
        duration_seconds: 30 * n,
        machine_model: if n % 2 == 0 { "VF-2".into() } else { "ST-10".into() },
        process: "milling".into(),
        skill_level: SkillLevel::Beginner,
        tags: ["setup".to_string()].into_iter().collect(),
        author_id: Uuid::from_u128(7_000),
        view_count: u64::from(n),
        created_at: fixed_now() - Duration::days(i64::from(n)),
    }
}

pub fn question(n: u128, correct: AnswerValue, points: u32) -> Question {
    Question {
        id: Uuid::from_u128(n),
        prompt: format!("Question {n}"),
        kind: QuestionKind::MultipleChoice,
        options: vec!["a".into(), "b".into(), "c".into()],
        correct,
        points,
        explanation: None,
    }
}

pub const QUIZ_ID: Uuid = Uuid::from_u128(500);
pub const COURSE_ID: Uuid = Uuid::from_u128(600);
pub const COURSE_CLIP: Uuid = Uuid::from_u128(1);

/// Points [1, 2, 2] with correct answers a / b / {a, c}; no own threshold.
pub fn quiz() -> Quiz {
    Quiz {
        id: QUIZ_ID,
        title: "Spindle safety".into(),
        questions: vec![
            question(1, AnswerValue::Single("a".into()), 1),
            question(2, AnswerValue::Single("b".into()), 2),
            question(
                3,
                AnswerValue::Multiple(["a".to_string(), "c".to_string()].into_iter().collect()),
                2,
            ),
        ],
        passing_threshold: None,
        time_limit_seconds: None,
        max_attempts: None,
    }
}

/// One module: a required clip, then the quiz.
pub fn course(passing_threshold: Option<u8>, max_attempts: Option<u32>) -> Course {
    Course {
        id: COURSE_ID,
        title: "Lathe basics".into(),
        description: String::new(),
        modules: vec![CourseModule {
            id: Uuid::from_u128(601),
            title: "Module 1".into(),
            nodes: vec![
                CourseNode {
                    id: Uuid::from_u128(602),
                    title: "Watch".into(),
                    content: NodeContent::Clip { clip_id: COURSE_CLIP },
                    required: true,
                },
                CourseNode {
                    id: Uuid::from_u128(603),
                    title: "Check".into(),
                    content: NodeContent::Quiz { quiz_id: QUIZ_ID },
                    required: true,
                },
            ],
        }],
        passing_threshold,
        max_attempts,
    }
}

pub const PLAN_ID: Uuid = Uuid::from_u128(800);

pub fn plan() -> Plan {
    Plan {
        id: PLAN_ID,
        name: "Pro".into(),
        price_cents: 4_900,
        interval: BillingInterval::Monthly,
        features: vec!["All clips".into()],
    }
}

pub fn user(db: &InMemoryDb, n: u128) -> (Uuid, String) {
    let user_id = Uuid::from_u128(n);
    db.with(|inner| {
        inner.users.push((
            User {
                user_id,
                email: format!("user{n}@example.com"),
                display_name: format!("User {n}"),
            },
            String::new(),
        ))
    });
    (user_id, db.sign_in(user_id))
}
