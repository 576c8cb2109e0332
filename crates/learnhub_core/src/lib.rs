pub mod attempt;
pub mod bookmarks;
pub mod browse;
pub mod catalog;
pub mod checkout;
pub mod course;
pub mod domain;
pub mod ports;
pub mod quiz;
pub mod validation;

pub use domain::{
    AnswerValue, BillingAddress, BillingInterval, Certificate, ContactMessage, ContentItem, Course,
    CourseModule, CourseNode, NodeContent, PaymentCard, Plan, PromoCode, Question, QuestionKind,
    Quiz, SkillLevel, StoredAttempt, Subscription, SubscriptionStatus, User, UserCredentials,
};
pub use ports::{DatabaseService, PaymentProcessor, PortError, PortResult};
