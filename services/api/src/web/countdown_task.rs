//! services/api/src/web/countdown_task.rs
//!
//! This module contains the asynchronous "worker" function that drives the
//! countdown of a timed quiz attempt.

use crate::web::{
    protocol::ServerMessage,
    state::{AppState, QuizSession},
    ws_handler::settle_submission,
};
use learnhub_core::attempt::TickOutcome;
use std::sync::Arc;
use tokio::sync::{mpsc::UnboundedSender, Mutex};
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Ticks the session's attempt once per `config.quiz_tick` until it expires.
///
/// On expiry the attempt is submitted exactly once and recorded. The task is
/// cancelled through `cancellation_token` when the attempt is submitted by
/// hand, the player is closed, or the connection drops.
pub async fn countdown_process(
    app_state: Arc<AppState>,
    session_lock: Arc<Mutex<QuizSession>>,
    outbox: UnboundedSender<ServerMessage>,
    cancellation_token: CancellationToken,
) {
    info!("Quiz countdown started.");
    let mut ticker = interval(app_state.config.quiz_tick);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick of an interval completes immediately.
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = cancellation_token.cancelled() => {
                info!("Quiz countdown cancelled.");
                return;
            }
            _ = ticker.tick() => {}
        }

        let (user_id, quiz_id, attempt_number, outcome) = {
            let mut session = session_lock.lock().await;
            if cancellation_token.is_cancelled() {
                return;
            }
            let user_id = session.user_id;
            let Some(attempt) = session.attempt.as_mut() else {
                return;
            };
            let outcome = attempt.tick();
            (user_id, attempt.quiz().id, attempt.attempt_number(), outcome)
        };

        match outcome {
            TickOutcome::Running(remaining) => {
                if outbox.send(ServerMessage::Tick { remaining }).is_err() {
                    return;
                }
            }
            TickOutcome::Expired(result) => {
                info!("Time is up on quiz {} for user {}; submitting.", quiz_id, user_id);
                let message =
                    settle_submission(&app_state, user_id, quiz_id, attempt_number, &result, true)
                        .await;
                let _ = outbox.send(message);
                return;
            }
            TickOutcome::Idle => return,
        }
    }
}
