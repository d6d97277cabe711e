//! Loading recruit configuration (prompts + optional trial bank) from TOML.
//!
//! See `RecruitConfig` and `Prompts` for expected schema.

use serde::Deserialize;
use tracing::{info, error};

use crate::domain::{Criteria, Difficulty};

#[derive(Clone, Debug, Deserialize, Default)]
pub struct RecruitConfig {
  #[serde(default)]
  pub prompts: Prompts,
  #[serde(default)]
  pub trials: Vec<TrialCfg>,
}

/// Trial entry accepted in TOML configuration. Criteria are optional field
/// by field; entries with no recognized criterion are skipped at load time.
#[derive(Clone, Debug, Deserialize)]
pub struct TrialCfg {
  #[serde(default)] pub id: Option<String>,
  pub name: String,
  #[serde(default)] pub icon: Option<String>,
  #[serde(default)] pub description: String,
  #[serde(default)] pub criteria: Criteria,
  pub required_participants: u32,
  #[serde(default)] pub budget: u32,
  #[serde(default)] pub difficulty: Difficulty,
  #[serde(default)] pub duration_weeks: u32,
  #[serde(default)] pub measurements: Vec<String>,
}

/// Prompts used by the OpenAI trial generator. Defaults are sensible for
/// clinical-trial content. You can override them in TOML to tune tone.
#[derive(Clone, Debug, Deserialize)]
pub struct Prompts {
  pub trial_system: String,
  pub trial_user_template: String,
}

impl Default for Prompts {
  fn default() -> Self {
    Self {
      trial_system: "You are a clinical-trial catalog generator for an educational recruitment game. Respond ONLY with strict JSON.".into(),
      trial_user_template: "Generate one fictional clinical trial at difficulty '{difficulty}'. Return JSON with fields: name, description, condition, min_age, max_age, min_severity (1-5 or null), min_systolic (or null), required_participants, budget, duration_weeks, measurements (array of strings). Ages must satisfy 18 <= min_age < max_age <= 90. Keep names plausible and non-alarming; this is a teaching simulation.".into(),
    }
  }
}

/// Attempt to load `RecruitConfig` from RECRUIT_CONFIG_PATH. On any
/// parsing/IO error, returns None.
pub fn load_recruit_config_from_env() -> Option<RecruitConfig> {
  let path = std::env::var("RECRUIT_CONFIG_PATH").ok()?;
  match std::fs::read_to_string(&path) {
    Ok(s) => match toml::from_str::<RecruitConfig>(&s) {
      Ok(cfg) => {
        info!(target: "recruitlab_backend", %path, "Loaded recruit config (TOML)");
        Some(cfg)
      }
      Err(e) => {
        error!(target: "recruitlab_backend", %path, error = %e, "Failed to parse TOML config");
        None
      }
    },
    Err(e) => {
      error!(target: "recruitlab_backend", %path, error = %e, "Failed to read TOML config file");
      None
    }
  }
}
