//! WebSocket upgrade + message loop. Each client message is parsed as JSON and
//! forwarded to core logic. We reply with a single JSON message per request.

use std::sync::Arc;
use axum::{
  extract::{
    ws::{Message, WebSocket},
    State, WebSocketUpgrade,
  },
  response::IntoResponse,
};
use tracing::{info, error, instrument, debug};

use crate::domain::Difficulty;
use crate::protocol::{ClientWsMessage, ServerWsMessage};
use crate::logic::*;
use crate::session::EngineError;
use crate::state::AppState;

#[instrument(level = "info", skip(state))]
pub async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
  info!(target: "recruitlab_backend", "WebSocket upgrade requested");
  ws.on_upgrade(move |socket| handle_ws(socket, state))
}

#[instrument(level = "info", skip(socket, state))]
async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>) {
  info!(target: "recruitlab_backend", "WebSocket connected");
  while let Some(Ok(msg)) = socket.recv().await {
    match msg {
      Message::Text(txt) => {
        // Parse, dispatch, serialize response.
        let reply_msg = match serde_json::from_str::<ClientWsMessage>(&txt) {
          Ok(incoming) => {
            debug!(target = "recruitlab_backend", "WS received: {:?}", &incoming);
            handle_client_ws(incoming, &state).await
          }
          Err(e) => ServerWsMessage::Error { message: format!("Invalid JSON: {}", e) },
        };

        let out = serde_json::to_string(&reply_msg).unwrap_or_else(|e| {
          serde_json::json!({ "type": "error", "message": format!("Serialization error: {}", e) }).to_string()
        });

        if let Err(e) = socket.send(Message::Text(out)).await {
          error!(target: "recruitlab_backend", error = %e, "WS send error");
          break;
        }
      }
      Message::Ping(payload) => { let _ = socket.send(Message::Pong(payload)).await; }
      Message::Close(_) => break,
      _ => {}
    }
  }
  info!(target: "recruitlab_backend", "WebSocket disconnected");
}

fn err_msg(e: EngineError) -> ServerWsMessage {
  ServerWsMessage::Error { message: e.to_string() }
}

#[instrument(level = "info", skip(state))]
async fn handle_client_ws(msg: ClientWsMessage, state: &AppState) -> ServerWsMessage {
  match msg {
    ClientWsMessage::Ping => ServerWsMessage::Pong,

    ClientWsMessage::ListTrials => {
      let trials = state.list_trials().await;
      tracing::info!(target: "trial", count = trials.len(), "WS catalog served");
      ServerWsMessage::Trials { trials }
    }

    ClientWsMessage::ChooseTrial { difficulty } => {
      let difficulty = difficulty.unwrap_or(Difficulty::Medium);
      let (trial, origin) = state.choose_trial(difficulty).await;
      tracing::info!(target: "trial", ?difficulty, id = %trial.id, %origin, "WS trial served");
      ServerWsMessage::Trial { trial }
    }

    ClientWsMessage::StartSession { trial_id } => {
      match start_session(state, &trial_id).await {
        Ok(session) => {
          tracing::info!(target: "trial", id = %session.session_id, trial = %trial_id, "WS session started");
          ServerWsMessage::Session { session }
        }
        Err(e) => err_msg(e),
      }
    }

    ClientWsMessage::SessionState { session_id } => {
      match session_snapshot(state, &session_id).await {
        Ok(session) => ServerWsMessage::Session { session },
        Err(e) => err_msg(e),
      }
    }

    ClientWsMessage::BeginAssessment { session_id, patient_id } => {
      match begin_assessment(state, &session_id, &patient_id).await {
        Ok(out) => {
          tracing::info!(target: "trial", id = %session_id, patient = %out.patient_id, "WS assessment served");
          ServerWsMessage::Assessment { patient_id: out.patient_id, questions: out.questions }
        }
        Err(e) => err_msg(e),
      }
    }

    ClientWsMessage::SubmitAnswer { session_id, question_id, answer } => {
      match submit_answer(state, &session_id, &question_id, answer).await {
        Ok(out) => {
          tracing::info!(target: "trial", id = %session_id, correct = out.correct, "WS submit_answer evaluated");
          ServerWsMessage::AnswerResult {
            correct: out.correct,
            cost_or_penalty: out.cost_or_penalty,
            state: out.state,
            summary: out.summary,
          }
        }
        Err(e) => err_msg(e),
      }
    }

    ClientWsMessage::Tick { session_id } => {
      match do_tick(state, &session_id).await {
        Ok(out) => ServerWsMessage::SessionUpdate { state: out.state, summary: out.summary },
        Err(e) => err_msg(e),
      }
    }

    ClientWsMessage::CollectPowerUp { session_id, kind } => {
      match do_power_up(state, &session_id, kind).await {
        Ok(out) => {
          tracing::info!(target: "trial", id = %session_id, ?kind, "WS power-up applied");
          ServerWsMessage::SessionUpdate { state: out.state, summary: out.summary }
        }
        Err(e) => err_msg(e),
      }
    }

    ClientWsMessage::LevelUp { session_id } => {
      match do_level_up(state, &session_id).await {
        Ok(out) => ServerWsMessage::SessionUpdate { state: out.state, summary: out.summary },
        Err(e) => err_msg(e),
      }
    }

    ClientWsMessage::Screening { responses } => {
      let scores = do_screening(&responses);
      tracing::info!(target: "trial", count = responses.len(), "WS screening scored");
      ServerWsMessage::Screening { scores }
    }
  }
}
