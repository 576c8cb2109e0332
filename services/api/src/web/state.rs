//! services/api/src/web/state.rs
//!
//! Defines the application's shared state and the per-connection quiz session.

use crate::config::Config;
use learnhub_core::attempt::QuizAttempt;
use learnhub_core::checkout::CheckoutState;
use learnhub_core::ports::{DatabaseService, PaymentProcessor};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

//=========================================================================================
// AppState (Shared Across All Connections)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<dyn DatabaseService>,
    pub payments: Arc<dyn PaymentProcessor>,
    pub config: Arc<Config>,
    /// Checkout wizards, one per user. An entry stays, confirmed ones included,
    /// until `DELETE /checkout` starts the user over.
    pub checkouts: Arc<Mutex<HashMap<Uuid, CheckoutState>>>,
}

impl AppState {
    pub fn new(
        db: Arc<dyn DatabaseService>,
        payments: Arc<dyn PaymentProcessor>,
        config: Arc<Config>,
    ) -> Self {
        Self {
            db,
            payments,
            config,
            checkouts: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

//=========================================================================================
// QuizSession (Specific to One WebSocket Connection)
//=========================================================================================

/// The state for a single quiz-player WebSocket connection.
pub struct QuizSession {
    pub user_id: Uuid,
    /// The current (or most recently finished) attempt.
    pub attempt: Option<QuizAttempt>,
    /// Cancels the countdown task of the current attempt.
    pub cancellation_token: CancellationToken,
}

impl QuizSession {
    pub fn new(user_id: Uuid) -> Self {
        Self {
            user_id,
            attempt: None,
            cancellation_token: CancellationToken::new(),
        }
    }

    pub fn in_progress(&self) -> bool {
        self.attempt.as_ref().is_some_and(|a| !a.is_submitted())
    }
}
