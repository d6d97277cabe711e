//! Public protocol structs for WebSocket and HTTP endpoints (serde ready).
//! Keep this small and stable to evolve backend and frontend independently.
//!
//! Assessment questions cross the wire without their `correct_answer`; the
//! server keeps the evaluated form and the client only ever submits yes/no.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::domain::{
    AssessmentQuestion, Difficulty, Patient, PowerUpKind, QuestionKind, ScreeningCategory,
    ScreeningResponse, TrialDefinition,
};
use crate::session::{Session, SessionState, SessionSummary};

/// Messages the client can send over WebSocket.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientWsMessage {
    Ping,
    ListTrials,
    ChooseTrial {
        difficulty: Option<Difficulty>,
    },
    StartSession {
        #[serde(rename = "trialId")]
        trial_id: String,
    },
    SessionState {
        #[serde(rename = "sessionId")]
        session_id: String,
    },
    BeginAssessment {
        #[serde(rename = "sessionId")]
        session_id: String,
        #[serde(rename = "patientId")]
        patient_id: String,
    },
    SubmitAnswer {
        #[serde(rename = "sessionId")]
        session_id: String,
        #[serde(rename = "questionId")]
        question_id: String,
        answer: bool,
    },
    Tick {
        #[serde(rename = "sessionId")]
        session_id: String,
    },
    CollectPowerUp {
        #[serde(rename = "sessionId")]
        session_id: String,
        kind: PowerUpKind,
    },
    LevelUp {
        #[serde(rename = "sessionId")]
        session_id: String,
    },
    Screening {
        responses: Vec<ScreeningResponse>,
    },
}

/// Messages the server sends back over WebSocket.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerWsMessage {
    Pong,
    Trials {
        trials: Vec<TrialDefinition>,
    },
    Trial {
        trial: TrialDefinition,
    },
    Session {
        session: SessionOut,
    },
    Assessment {
        #[serde(rename = "patientId")]
        patient_id: String,
        questions: Vec<QuestionOut>,
    },
    AnswerResult {
        correct: bool,
        #[serde(rename = "costOrPenalty")]
        cost_or_penalty: u32,
        state: SessionState,
        #[serde(skip_serializing_if = "Option::is_none")]
        summary: Option<SessionSummary>,
    },
    SessionUpdate {
        state: SessionState,
        #[serde(skip_serializing_if = "Option::is_none")]
        summary: Option<SessionSummary>,
    },
    Screening {
        scores: HashMap<ScreeningCategory, u32>,
    },
    Error {
        message: String,
    },
}

/// Question DTO without the correct answer.
#[derive(Debug, Serialize)]
pub struct QuestionOut {
    pub id: String,
    pub kind: QuestionKind,
    pub text: String,
    pub reward: u32,
}

pub fn to_question_out(q: &AssessmentQuestion) -> QuestionOut {
    QuestionOut {
        id: q.id.clone(),
        kind: q.kind,
        text: q.text.clone(),
        reward: q.reward,
    }
}

/// Session DTO used right after creation and for state queries.
#[derive(Debug, Serialize)]
pub struct SessionOut {
    #[serde(rename = "sessionId")]
    pub session_id: String,
    pub trial: TrialDefinition,
    pub state: SessionState,
    /// Clock rendered as m:ss for direct display.
    #[serde(rename = "timeDisplay")]
    pub time_display: String,
    pub patients: Vec<Patient>,
}

pub fn to_session_out(s: &Session) -> SessionOut {
    SessionOut {
        session_id: s.id.clone(),
        trial: s.trial.clone(),
        state: s.state.clone(),
        time_display: crate::util::format_clock(s.state.time_left_secs),
        patients: s.patients.clone(),
    }
}

//
// HTTP request/response DTOs
//

#[derive(Debug, Deserialize)]
pub struct ChooseTrialQuery {
    pub difficulty: Option<Difficulty>,
}

#[derive(Deserialize)]
pub struct StartSessionIn {
    #[serde(rename = "trialId")]
    pub trial_id: String,
}

#[derive(Debug, Deserialize)]
pub struct SessionQuery {
    #[serde(rename = "sessionId")]
    pub session_id: String,
}

#[derive(Deserialize)]
pub struct AssessmentIn {
    #[serde(rename = "sessionId")]
    pub session_id: String,
    #[serde(rename = "patientId")]
    pub patient_id: String,
}
#[derive(Serialize)]
pub struct AssessmentOut {
    #[serde(rename = "patientId")]
    pub patient_id: String,
    pub questions: Vec<QuestionOut>,
}

#[derive(Deserialize)]
pub struct AnswerIn {
    #[serde(rename = "sessionId")]
    pub session_id: String,
    #[serde(rename = "questionId")]
    pub question_id: String,
    pub answer: bool,
}
#[derive(Serialize)]
pub struct AnswerOut {
    pub correct: bool,
    #[serde(rename = "costOrPenalty")]
    pub cost_or_penalty: u32,
    pub state: SessionState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<SessionSummary>,
}

#[derive(Deserialize)]
pub struct TickIn {
    #[serde(rename = "sessionId")]
    pub session_id: String,
}

#[derive(Deserialize)]
pub struct PowerUpIn {
    #[serde(rename = "sessionId")]
    pub session_id: String,
    pub kind: PowerUpKind,
}

#[derive(Deserialize)]
pub struct LevelUpIn {
    #[serde(rename = "sessionId")]
    pub session_id: String,
}

/// Session state plus, once terminal, the end-screen summary.
#[derive(Serialize)]
pub struct SessionUpdateOut {
    pub state: SessionState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<SessionSummary>,
}

#[derive(Deserialize)]
pub struct ScreeningIn {
    pub responses: Vec<ScreeningResponse>,
}
#[derive(Serialize)]
pub struct ScreeningOut {
    pub scores: HashMap<ScreeningCategory, u32>,
}

#[derive(Serialize)]
pub struct HealthOut {
    pub ok: bool,
}
