//! services/api/src/web/protocol.rs
//!
//! Defines the WebSocket message protocol between the browser client and the
//! API server for the timed quiz player.

use crate::web::dto::{AnswerDto, CertificateDto, QuizDto, QuizResultDto};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

//=========================================================================================
// Messages Sent FROM the Client (Browser) TO the Server
//=========================================================================================

/// Represents the structured text messages a client can send to the server.
#[derive(Deserialize, Debug)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Opens the next attempt on a quiz and starts its countdown, if any.
    Start { quiz_id: Uuid },

    /// Records or replaces the answer to one question.
    Answer { question_id: Uuid, answer: AnswerDto },

    ClearAnswer { question_id: Uuid },

    /// Scores the attempt. Only the first submission counts.
    Submit,

    /// The player is being closed; abandons any running countdown.
    Close,
}

//=========================================================================================
// Messages Sent FROM the Server TO the Client (Browser)
//=========================================================================================

/// Represents the structured text messages the server can send to the client.
#[derive(Serialize, Debug, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    AttemptStarted {
        quiz: QuizDto,
        attempt_number: u32,
        time_remaining: Option<u32>,
    },

    AnswerRecorded { question_id: Uuid },

    AnswerCleared { question_id: Uuid },

    /// One second of the countdown has elapsed.
    Tick { remaining: u32 },

    /// The attempt was scored. `automatic` is true when the countdown ran out.
    Submitted {
        attempt_number: u32,
        result: QuizResultDto,
        automatic: bool,
        certificates: Vec<CertificateDto>,
    },

    /// Reports an error to the client, which should display an error message.
    Error { message: String },
}
