//! services/api/src/web/ws_handler.rs
//!
//! This is the main entry point and control loop for a quiz-player WebSocket
//! connection. It owns the connection's `QuizSession` and delegates the
//! countdown to `countdown_task`.

use crate::web::{
    attempts::{begin_attempt, record_result},
    countdown_task::countdown_process,
    dto::{CertificateDto, QuizDto, QuizResultDto},
    protocol::{ClientMessage, ServerMessage},
    state::{AppState, QuizSession},
};
use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
    Extension,
};
use futures::{SinkExt, StreamExt};
use learnhub_core::attempt::SubmitOutcome;
use learnhub_core::quiz::QuizResult;
use std::sync::Arc;
use tokio::sync::{
    mpsc::{self, UnboundedSender},
    Mutex,
};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use uuid::Uuid;

/// The handler for upgrading HTTP requests to WebSocket connections.
pub async fn quiz_ws_handler(
    ws: WebSocketUpgrade,
    State(app_state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, app_state, user_id))
}

async fn handle_socket(socket: WebSocket, app_state: Arc<AppState>, user_id: Uuid) {
    info!("New quiz WebSocket connection established for user: {}", user_id);

    // --- 1. Outbox: a single task owns the sink, everyone else sends to it ---
    let (mut sender, mut receiver) = socket.split();
    let (outbox, mut outbox_rx) = mpsc::unbounded_channel::<ServerMessage>();
    tokio::spawn(async move {
        while let Some(message) = outbox_rx.recv().await {
            let json = match serde_json::to_string(&message) {
                Ok(json) => json,
                Err(e) => {
                    error!("Failed to serialize server message: {:?}", e);
                    continue;
                }
            };
            if sender.send(Message::Text(json.into())).await.is_err() {
                error!("Failed to send message to quiz client.");
                break;
            }
        }
    });

    let session_lock = Arc::new(Mutex::new(QuizSession::new(user_id)));

    // --- 2. Main Message Loop ---
    while let Some(Ok(msg)) = receiver.next().await {
        match msg {
            Message::Text(text) => match serde_json::from_str::<ClientMessage>(text.as_str()) {
                Ok(client_msg) => {
                    if !handle_client_message(client_msg, &app_state, &session_lock, &outbox).await {
                        break;
                    }
                }
                Err(e) => {
                    warn!("Failed to deserialize client message: {}", e);
                    let _ = outbox.send(ServerMessage::Error {
                        message: "Malformed message".to_string(),
                    });
                }
            },
            Message::Close(_) => {
                info!("Client sent close message.");
                break;
            }
            _ => {}
        }
    }

    // --- 3. Cleanup ---
    // The countdown must never fire for an attempt whose player is gone.
    session_lock.lock().await.cancellation_token.cancel();
    info!("Quiz WebSocket connection closed.");
}

/// Handles one client message. Returns `false` when the connection should close.
pub async fn handle_client_message(
    client_msg: ClientMessage,
    app_state: &Arc<AppState>,
    session_lock: &Arc<Mutex<QuizSession>>,
    outbox: &UnboundedSender<ServerMessage>,
) -> bool {
    let reply = match client_msg {
        ClientMessage::Start { quiz_id } => {
            start_attempt(quiz_id, app_state, session_lock, outbox).await
        }
        ClientMessage::Answer {
            question_id,
            answer,
        } => {
            let mut session = session_lock.lock().await;
            match session.attempt.as_mut() {
                None => no_attempt(),
                Some(attempt) => match attempt.answer(question_id, answer.into()) {
                    Ok(()) => ServerMessage::AnswerRecorded { question_id },
                    Err(e) => ServerMessage::Error {
                        message: e.to_string(),
                    },
                },
            }
        }
        ClientMessage::ClearAnswer { question_id } => {
            let mut session = session_lock.lock().await;
            match session.attempt.as_mut() {
                None => no_attempt(),
                Some(attempt) => match attempt.clear_answer(question_id) {
                    Ok(()) => ServerMessage::AnswerCleared { question_id },
                    Err(e) => ServerMessage::Error {
                        message: e.to_string(),
                    },
                },
            }
        }
        ClientMessage::Submit => {
            let submitted = {
                let mut session = session_lock.lock().await;
                let user_id = session.user_id;
                let submitted = session.attempt.as_mut().map(|attempt| {
                    let outcome = attempt.submit();
                    (user_id, attempt.quiz().id, attempt.attempt_number(), outcome)
                });
                if submitted.is_some() {
                    session.cancellation_token.cancel();
                }
                submitted
            };
            match submitted {
                None => no_attempt(),
                Some((user_id, quiz_id, attempt_number, SubmitOutcome::Submitted(result))) => {
                    settle_submission(app_state, user_id, quiz_id, attempt_number, &result, false)
                        .await
                }
                Some((_, _, _, SubmitOutcome::AlreadySubmitted)) => ServerMessage::Error {
                    message: "The attempt has already been submitted".to_string(),
                },
            }
        }
        ClientMessage::Close => {
            info!("Quiz player closed by client.");
            session_lock.lock().await.cancellation_token.cancel();
            return false;
        }
    };
    outbox.send(reply).is_ok()
}

fn no_attempt() -> ServerMessage {
    ServerMessage::Error {
        message: "No quiz attempt has been started".to_string(),
    }
}

async fn start_attempt(
    quiz_id: Uuid,
    app_state: &Arc<AppState>,
    session_lock: &Arc<Mutex<QuizSession>>,
    outbox: &UnboundedSender<ServerMessage>,
) -> ServerMessage {
    let user_id = {
        let session = session_lock.lock().await;
        if session.in_progress() {
            return ServerMessage::Error {
                message: "An attempt is already in progress".to_string(),
            };
        }
        session.user_id
    };

    let attempt = match begin_attempt(app_state.db.as_ref(), user_id, quiz_id).await {
        Ok(attempt) => attempt,
        Err(e) => {
            warn!("Could not start quiz {} for user {}: {:?}", quiz_id, user_id, e);
            return ServerMessage::Error {
                message: e.to_string(),
            };
        }
    };

    let mut session = session_lock.lock().await;
    if session.in_progress() {
        return ServerMessage::Error {
            message: "An attempt is already in progress".to_string(),
        };
    }
    let started = ServerMessage::AttemptStarted {
        quiz: QuizDto::from(attempt.quiz()),
        attempt_number: attempt.attempt_number(),
        time_remaining: attempt.time_remaining(),
    };
    let timed = attempt.time_remaining().is_some();
    session.cancellation_token.cancel();
    session.cancellation_token = CancellationToken::new();
    session.attempt = Some(attempt);
    info!("User {} started quiz {}", user_id, quiz_id);

    if timed {
        let app_state = app_state.clone();
        let session_lock = session_lock.clone();
        let outbox = outbox.clone();
        let token = session.cancellation_token.clone();
        tokio::spawn(countdown_process(app_state, session_lock, outbox, token));
    }
    started
}

/// Records a scored attempt and builds the message announcing it.
pub(crate) async fn settle_submission(
    app_state: &AppState,
    user_id: Uuid,
    quiz_id: Uuid,
    attempt_number: u32,
    result: &QuizResult,
    automatic: bool,
) -> ServerMessage {
    match record_result(app_state.db.as_ref(), user_id, quiz_id, attempt_number, result).await {
        Ok(recorded) => ServerMessage::Submitted {
            attempt_number,
            result: QuizResultDto::from(result),
            automatic,
            certificates: recorded.certificates.iter().map(CertificateDto::from).collect(),
        },
        Err(e) => {
            error!("Failed to record attempt on quiz {}: {:?}", quiz_id, e);
            ServerMessage::Error {
                message: "Your attempt was scored but could not be saved".to_string(),
            }
        }
    }
}
