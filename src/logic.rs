//! Core behaviors shared by both HTTP and WebSocket handlers.
//!
//! This includes:
//!   - Starting sessions from catalog trials
//!   - Assessment generation and answer evaluation
//!   - Clock ticks, power-ups and level-ups
//!   - The standalone screening questionnaire
//!
//! Handlers stay thin: they deserialize, call in here, and serialize. All
//! engine errors are recoverable values; the transport decides how to show
//! them.

use std::collections::HashMap;

use tracing::{info, instrument};

use crate::domain::{PowerUpKind, ScreeningCategory, ScreeningResponse};
use crate::protocol::{
  to_question_out, to_session_out, AnswerOut, AssessmentOut, SessionOut, SessionUpdateOut,
};
use crate::screening;
use crate::session::{EngineError, Session, SessionSummary};
use crate::state::AppState;

fn summary_if_terminal(s: &Session) -> Option<SessionSummary> {
  if s.state.phase.is_terminal() { Some(s.summary()) } else { None }
}

#[instrument(level = "info", skip(state), fields(%trial_id))]
pub async fn start_session(state: &AppState, trial_id: &str) -> Result<SessionOut, EngineError> {
  let trial = state
    .get_trial(trial_id)
    .await
    .ok_or_else(|| EngineError::UnknownTrial { id: trial_id.to_string() })?;

  let session = Session::new(trial, &mut rand::thread_rng());
  let out = to_session_out(&session);
  info!(target: "trial", session_id = %session.id, trial = %session.trial.name, "Session started");
  state.insert_session(session).await;
  Ok(out)
}

#[instrument(level = "info", skip(state), fields(%session_id))]
pub async fn session_snapshot(state: &AppState, session_id: &str) -> Result<SessionOut, EngineError> {
  let sessions = state.sessions.read().await;
  let session = sessions
    .get(session_id)
    .ok_or_else(|| EngineError::UnknownSession { id: session_id.to_string() })?;
  Ok(to_session_out(session))
}

#[instrument(level = "info", skip(state), fields(%session_id, %patient_id))]
pub async fn begin_assessment(
  state: &AppState,
  session_id: &str,
  patient_id: &str,
) -> Result<AssessmentOut, EngineError> {
  let questions = state
    .with_session(session_id, |s| s.begin_assessment(patient_id, &mut rand::thread_rng()))
    .await?;
  info!(target: "trial", %session_id, %patient_id, count = questions.len(), "Assessment generated");
  Ok(AssessmentOut {
    patient_id: patient_id.to_string(),
    questions: questions.iter().map(to_question_out).collect(),
  })
}

#[instrument(level = "info", skip(state), fields(%session_id, %question_id, answer))]
pub async fn submit_answer(
  state: &AppState,
  session_id: &str,
  question_id: &str,
  answer: bool,
) -> Result<AnswerOut, EngineError> {
  state
    .with_session(session_id, |s| {
      let outcome = s.answer_question(question_id, answer, &mut rand::thread_rng())?;
      info!(
        target: "trial",
        session_id = %s.id,
        correct = outcome.correct,
        cost_or_penalty = outcome.cost_or_penalty,
        recruited = s.state.recruited_patients,
        wrong = s.state.wrong_answers,
        "Answer evaluated"
      );
      Ok(AnswerOut {
        correct: outcome.correct,
        cost_or_penalty: outcome.cost_or_penalty,
        state: s.state.clone(),
        summary: summary_if_terminal(s),
      })
    })
    .await
}

#[instrument(level = "debug", skip(state), fields(%session_id))]
pub async fn do_tick(state: &AppState, session_id: &str) -> Result<SessionUpdateOut, EngineError> {
  state
    .with_session(session_id, |s| {
      s.tick()?;
      if s.state.phase.is_terminal() {
        info!(target: "trial", session_id = %s.id, "Session ended by clock");
      }
      Ok(SessionUpdateOut { state: s.state.clone(), summary: summary_if_terminal(s) })
    })
    .await
}

#[instrument(level = "info", skip(state), fields(%session_id, kind = ?kind))]
pub async fn do_power_up(
  state: &AppState,
  session_id: &str,
  kind: PowerUpKind,
) -> Result<SessionUpdateOut, EngineError> {
  state
    .with_session(session_id, |s| {
      s.collect_power_up(kind)?;
      Ok(SessionUpdateOut { state: s.state.clone(), summary: None })
    })
    .await
}

#[instrument(level = "info", skip(state), fields(%session_id))]
pub async fn do_level_up(state: &AppState, session_id: &str) -> Result<SessionUpdateOut, EngineError> {
  state
    .with_session(session_id, |s| {
      s.level_up()?;
      info!(target: "trial", session_id = %s.id, level = s.state.level, "Level up");
      Ok(SessionUpdateOut { state: s.state.clone(), summary: None })
    })
    .await
}

#[instrument(level = "info", skip(responses), fields(count = responses.len()))]
pub fn do_screening(responses: &[ScreeningResponse]) -> HashMap<ScreeningCategory, u32> {
  screening::evaluate(responses)
}
