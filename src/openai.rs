//! Minimal OpenAI client for trial generation.
//!
//! We only call chat.completions requesting a strict JSON object, and we
//! never accept model output as-is: every generated trial is validated
//! deterministically (ranges, participant target, at least one recognized
//! criterion) before it reaches the catalog. Any failure here is the
//! caller's cue to fall back to the built-in catalog; generation errors are
//! never surfaced to the presentation layer as hard failures.
//!
//! NOTE: We never log the API key and we keep payload truncations short.

use std::time::Duration;

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use serde::{Deserialize, Serialize};
use tracing::{instrument, info, error};
use uuid::Uuid;

use crate::catalog::icon_for_condition;
use crate::config::Prompts;
use crate::domain::{Criteria, Difficulty, TrialDefinition, TrialSource};
use crate::util::{fill_template, trunc_for_log};

#[derive(Clone)]
pub struct OpenAI {
  pub client: reqwest::Client,
  pub api_key: String,
  pub base_url: String,
  pub fast_model: String,
  pub strong_model: String,
}

/// Shape the model is asked to return. Kept permissive; `validate_generated_trial`
/// is the actual gate.
#[derive(Deserialize)]
struct GenTrial {
  name: String,
  #[serde(default)] description: String,
  condition: String,
  min_age: u32,
  max_age: u32,
  #[serde(default)] min_severity: Option<u8>,
  #[serde(default)] min_systolic: Option<u32>,
  required_participants: u32,
  budget: u32,
  duration_weeks: u32,
  #[serde(default)] measurements: Vec<String>,
}

impl OpenAI {
  /// Construct the client if we find OPENAI_API_KEY; otherwise return None.
  pub fn from_env() -> Option<Self> {
    let api_key = std::env::var("OPENAI_API_KEY").ok()?;
    let base_url =
      std::env::var("OPENAI_BASE_URL").unwrap_or_else(|_| "https://api.openai.com/v1".into());
    let fast_model =
      std::env::var("OPENAI_FAST_MODEL").unwrap_or_else(|_| "gpt-4o-mini".into());
    let strong_model =
      std::env::var("OPENAI_STRONG_MODEL").unwrap_or_else(|_| "gpt-4o".into());

    let client = reqwest::Client::builder()
      .timeout(Duration::from_secs(20))
      .build()
      .ok()?;

    Some(Self { client, api_key, base_url, fast_model, strong_model })
  }

  /// JSON-object chat completion. Generic over the target type T.
  #[instrument(level = "info", skip(self, system, user), fields(model = %model))]
  async fn chat_json<T: for<'a> Deserialize<'a>>(
    &self,
    model: &str,
    system: &str,
    user: &str,
    temperature: f32,
  ) -> Result<T, String> {
    let url = format!("{}/chat/completions", self.base_url);
    let req = ChatCompletionRequest {
      model: model.to_string(),
      messages: vec![
        ChatMessageReq { role: "system".into(), content: system.into() },
        ChatMessageReq { role: "user".into(), content: user.into() },
      ],
      temperature,
      response_format: Some(ResponseFormat { r#type: "json_object".into() }),
      max_tokens: None,
    };

    let res = self.client.post(&url)
      .header(USER_AGENT, "recruitlab-backend/0.1")
      .header(CONTENT_TYPE, "application/json")
      .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
      .json(&req).send().await.map_err(|e| e.to_string())?;

    if !res.status().is_success() {
      let status = res.status();
      let body = res.text().await.unwrap_or_default();
      let msg = extract_openai_error(&body).unwrap_or_else(|| body);
      return Err(format!("OpenAI HTTP {}: {}", status, msg));
    }

    let body: ChatCompletionResponse = res.json().await.map_err(|e| e.to_string())?;
    if let Some(usage) = &body.usage {
      info!(prompt_tokens = ?usage.prompt_tokens, completion_tokens = ?usage.completion_tokens, total_tokens = ?usage.total_tokens, "OpenAI usage");
    }
    let text = body.choices.get(0)
      .and_then(|c| c.message.content.clone())
      .unwrap_or_default();

    serde_json::from_str::<T>(&text)
      .map_err(|e| format!("JSON parse error: {} in {}", e, trunc_for_log(&text, 300)))
  }

  /// Generate one novel trial definition for the requested difficulty.
  #[instrument(
    level = "info",
    skip(self, prompts),
    fields(difficulty = ?difficulty, model = %self.strong_model)
  )]
  pub async fn generate_trial(
    &self,
    prompts: &Prompts,
    difficulty: Difficulty,
  ) -> Result<TrialDefinition, String> {
    let diff_label = format!("{:?}", difficulty);
    let system = &prompts.trial_system;
    let user = fill_template(&prompts.trial_user_template, &[("difficulty", &diff_label)]);

    let start = std::time::Instant::now();
    let result = self.chat_json::<GenTrial>(&self.strong_model, system, &user, 0.9).await;
    let elapsed = start.elapsed();

    let gen = match result {
      Ok(g) => {
        info!(?elapsed, "Model response received successfully");
        g
      }
      Err(e) => {
        error!(?elapsed, error = %e, "Model call failed during trial generation");
        return Err(format!("Model generation failed: {e}"));
      }
    };

    let trial = validate_generated_trial(gen, difficulty)?;
    info!(
      target: "trial",
      trial_id = %trial.id,
      name_preview = %trial.name.chars().take(40).collect::<String>(),
      "Generated trial accepted"
    );
    Ok(trial)
  }
}

/// Deterministic acceptance gate: we only trust structure we can check.
fn validate_generated_trial(gen: GenTrial, difficulty: Difficulty) -> Result<TrialDefinition, String> {
  let name = gen.name.trim().to_string();
  if name.is_empty() {
    return Err("generated trial has an empty name".into());
  }
  if gen.required_participants == 0 {
    return Err("required_participants must be >= 1".into());
  }
  if !(18..90).contains(&gen.min_age) || gen.max_age > 90 || gen.min_age >= gen.max_age {
    return Err(format!("age bounds out of range: {}..{}", gen.min_age, gen.max_age));
  }
  if let Some(sev) = gen.min_severity {
    if !(1..=5).contains(&sev) {
      return Err(format!("min_severity out of range: {sev}"));
    }
  }
  let condition = gen.condition.trim().to_string();
  if condition.is_empty() {
    return Err("generated trial has an empty condition".into());
  }

  let criteria = Criteria {
    condition: Some(condition.clone()),
    min_age: Some(gen.min_age),
    max_age: Some(gen.max_age),
    min_severity: gen.min_severity,
    min_systolic: gen.min_systolic,
    ..Criteria::default()
  };
  // Condition + age bounds are always present above, so this holds by
  // construction; keep the check so the invariant survives refactors.
  if !criteria.has_recognized() {
    return Err("generated trial has no recognized criteria".into());
  }

  Ok(TrialDefinition {
    id: Uuid::new_v4().to_string(),
    icon: icon_for_condition(&condition).to_string(),
    name,
    description: gen.description.trim().to_string(),
    criteria,
    required_participants: gen.required_participants,
    budget: gen.budget,
    difficulty,
    duration_weeks: gen.duration_weeks,
    measurements: gen.measurements,
    source: TrialSource::Generated,
  })
}

// --- Chat DTOs ---

#[derive(Serialize)]
struct ChatCompletionRequest {
  model: String,
  messages: Vec<ChatMessageReq>,
  temperature: f32,
  #[serde(skip_serializing_if = "Option::is_none")]
  response_format: Option<ResponseFormat>,
  #[serde(skip_serializing_if = "Option::is_none")]
  max_tokens: Option<u32>,
}
#[derive(Serialize)]
struct ChatMessageReq { role: String, content: String }
#[derive(Serialize)]
struct ResponseFormat { #[serde(rename = "type")] r#type: String }

#[derive(Deserialize)]
struct ChatCompletionResponse {
  choices: Vec<ChatChoice>,
  #[serde(default)] usage: Option<Usage>,
}
#[derive(Deserialize)]
struct ChatChoice { message: ChatMessageResp }
#[derive(Deserialize)]
struct ChatMessageResp { content: Option<String> }
#[derive(Deserialize)]
struct Usage {
  #[serde(default)] prompt_tokens: Option<u32>,
  #[serde(default)] completion_tokens: Option<u32>,
  #[serde(default)] total_tokens: Option<u32>,
}

/// Try to extract a clean error message from OpenAI error body.
fn extract_openai_error(body: &str) -> Option<String> {
  #[derive(Deserialize)]
  struct EWrap { error: EObj }
  #[derive(Deserialize)]
  struct EObj { message: String }
  match serde_json::from_str::<EWrap>(body) {
    Ok(w) => Some(w.error.message),
    Err(_) => None,
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn gen(min_age: u32, max_age: u32, participants: u32) -> GenTrial {
    GenTrial {
      name: "Sleep Quality Study".into(),
      description: "Observational".into(),
      condition: "Insomnia".into(),
      min_age,
      max_age,
      min_severity: Some(2),
      min_systolic: None,
      required_participants: participants,
      budget: 2000,
      duration_weeks: 10,
      measurements: vec![],
    }
  }

  #[test]
  fn accepts_well_formed_generation() {
    let t = validate_generated_trial(gen(20, 70, 5), Difficulty::Medium).expect("trial");
    assert_eq!(t.source, TrialSource::Generated);
    assert!(t.criteria.has_recognized());
    assert_eq!(t.criteria.min_age, Some(20));
  }

  #[test]
  fn rejects_bad_age_bounds_and_zero_participants() {
    assert!(validate_generated_trial(gen(70, 20, 5), Difficulty::Easy).is_err());
    assert!(validate_generated_trial(gen(10, 70, 5), Difficulty::Easy).is_err());
    assert!(validate_generated_trial(gen(20, 95, 5), Difficulty::Easy).is_err());
    assert!(validate_generated_trial(gen(20, 70, 0), Difficulty::Easy).is_err());
  }
}
