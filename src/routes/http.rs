//! HTTP endpoint handlers. These are thin wrappers that forward to core logic.
//! Each handler is instrumented and logs include parameters and basic result info.

use std::sync::Arc;
use axum::{extract::{State, Query}, http::StatusCode, Json, response::IntoResponse};
use tracing::{info, instrument, warn};

use crate::domain::Difficulty;
use crate::protocol::*;
use crate::session::EngineError;
use crate::state::AppState;
use crate::logic::*;

/// Engine errors are recoverable; translate them to a status + JSON body
/// and let the presentation layer pick the user-visible wording.
fn err_response(e: EngineError) -> (StatusCode, Json<serde_json::Value>) {
  let status = match &e {
    EngineError::SessionTerminal => StatusCode::CONFLICT,
    EngineError::NoCriteria => StatusCode::UNPROCESSABLE_ENTITY,
    _ => StatusCode::NOT_FOUND,
  };
  warn!(target: "trial", error = %e, "Request refused");
  (status, Json(serde_json::json!({ "error": e, "message": e.to_string() })))
}

#[instrument(level = "info")]
pub async fn http_health() -> impl IntoResponse { Json(HealthOut { ok: true }) }

#[instrument(level = "info", skip(state))]
pub async fn http_list_trials(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  let trials = state.list_trials().await;
  info!(target: "trial", count = trials.len(), "HTTP catalog served");
  Json(trials)
}

#[instrument(level = "info", skip(state), fields(difficulty = ?q.difficulty))]
pub async fn http_choose_trial(
  State(state): State<Arc<AppState>>,
  Query(q): Query<ChooseTrialQuery>,
) -> impl IntoResponse {
  let difficulty = q.difficulty.unwrap_or(Difficulty::Medium);
  let (trial, origin) = state.choose_trial(difficulty).await;
  info!(target: "trial", ?difficulty, id = %trial.id, %origin, "HTTP trial served");
  Json(trial)
}

#[instrument(level = "info", skip(state, body), fields(%body.trial_id))]
pub async fn http_start_session(
  State(state): State<Arc<AppState>>,
  Json(body): Json<StartSessionIn>,
) -> Result<Json<SessionOut>, (StatusCode, Json<serde_json::Value>)> {
  let out = start_session(&state, &body.trial_id).await.map_err(err_response)?;
  Ok(Json(out))
}

#[instrument(level = "info", skip(state), fields(%q.session_id))]
pub async fn http_get_session(
  State(state): State<Arc<AppState>>,
  Query(q): Query<SessionQuery>,
) -> Result<Json<SessionOut>, (StatusCode, Json<serde_json::Value>)> {
  let out = session_snapshot(&state, &q.session_id).await.map_err(err_response)?;
  Ok(Json(out))
}

#[instrument(level = "info", skip(state, body), fields(%body.session_id, %body.patient_id))]
pub async fn http_post_assessment(
  State(state): State<Arc<AppState>>,
  Json(body): Json<AssessmentIn>,
) -> Result<Json<AssessmentOut>, (StatusCode, Json<serde_json::Value>)> {
  let out = begin_assessment(&state, &body.session_id, &body.patient_id)
    .await
    .map_err(err_response)?;
  Ok(Json(out))
}

#[instrument(level = "info", skip(state, body), fields(%body.session_id, %body.question_id, body.answer))]
pub async fn http_post_answer(
  State(state): State<Arc<AppState>>,
  Json(body): Json<AnswerIn>,
) -> Result<Json<AnswerOut>, (StatusCode, Json<serde_json::Value>)> {
  let out = submit_answer(&state, &body.session_id, &body.question_id, body.answer)
    .await
    .map_err(err_response)?;
  info!(target: "trial", id = %body.session_id, correct = out.correct, "HTTP submit_answer evaluated");
  Ok(Json(out))
}

#[instrument(level = "debug", skip(state, body), fields(%body.session_id))]
pub async fn http_post_tick(
  State(state): State<Arc<AppState>>,
  Json(body): Json<TickIn>,
) -> Result<Json<SessionUpdateOut>, (StatusCode, Json<serde_json::Value>)> {
  let out = do_tick(&state, &body.session_id).await.map_err(err_response)?;
  Ok(Json(out))
}

#[instrument(level = "info", skip(state, body), fields(%body.session_id, kind = ?body.kind))]
pub async fn http_post_power_up(
  State(state): State<Arc<AppState>>,
  Json(body): Json<PowerUpIn>,
) -> Result<Json<SessionUpdateOut>, (StatusCode, Json<serde_json::Value>)> {
  let out = do_power_up(&state, &body.session_id, body.kind).await.map_err(err_response)?;
  Ok(Json(out))
}

#[instrument(level = "info", skip(state, body), fields(%body.session_id))]
pub async fn http_post_level_up(
  State(state): State<Arc<AppState>>,
  Json(body): Json<LevelUpIn>,
) -> Result<Json<SessionUpdateOut>, (StatusCode, Json<serde_json::Value>)> {
  let out = do_level_up(&state, &body.session_id).await.map_err(err_response)?;
  Ok(Json(out))
}

#[instrument(level = "info")]
pub async fn http_get_screening_questions() -> impl IntoResponse {
  Json(crate::screening::SCREENING_QUESTIONS)
}

#[instrument(level = "info", skip(body), fields(count = body.responses.len()))]
pub async fn http_post_screening(Json(body): Json<ScreeningIn>) -> impl IntoResponse {
  let scores = do_screening(&body.responses);
  Json(ScreeningOut { scores })
}
