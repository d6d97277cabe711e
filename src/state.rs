//! Application state: in-memory stores, prompts, OpenAI client, and trial selection.
//!
//! This module owns:
//!   - the trial store (by id, plus a stable listing order)
//!   - active recruitment sessions (by id)
//!   - the prompts struct (from TOML or defaults)
//!   - optional OpenAI client
//!
//! The selection policy prefers freshly generated trials when OpenAI is
//! available. If generation is unavailable or fails, we fall back to the
//! existing pool (bank + built-ins) or, as a last resort, a hard fallback
//! trial. Generation failures are logged and swallowed, never surfaced.

use std::{collections::HashMap, sync::Arc};
use tokio::sync::RwLock;
use tracing::{error, info, instrument, warn};

use crate::catalog::{builtin_trials, hard_fallback_trial, icon_for_condition};
use crate::config::{load_recruit_config_from_env, Prompts};
use crate::domain::{Difficulty, TrialDefinition, TrialSource};
use crate::openai::OpenAI;
use crate::session::{EngineError, Session};
use uuid::Uuid;

#[derive(Clone)]
pub struct AppState {
    pub trials: Arc<RwLock<HashMap<String, TrialDefinition>>>,
    pub trial_order: Arc<RwLock<Vec<String>>>,
    pub last_by_diff: Arc<RwLock<HashMap<Difficulty, String>>>,
    pub sessions: Arc<RwLock<HashMap<String, Session>>>,
    pub openai: Option<OpenAI>,
    pub prompts: Prompts,
}

impl AppState {
    /// Build state from env: load config, seed the trial store, init OpenAI.
    #[instrument(level = "info", skip_all)]
    pub fn new() -> Self {
        // Load TOML config if provided (prompts + optional local trial bank).
        let cfg_opt = load_recruit_config_from_env();
        let prompts = cfg_opt
            .as_ref()
            .map(|c| c.prompts.clone())
            .unwrap_or_default();

        let mut id_map = HashMap::<String, TrialDefinition>::new();
        let mut order = Vec::<String>::new();

        // Insert config-based trials (if any).
        if let Some(cfg) = &cfg_opt {
            for tc in &cfg.trials {
                let id = tc.id.clone().unwrap_or_else(|| Uuid::new_v4().to_string());
                if !tc.criteria.has_recognized() {
                    // A trial the question generator cannot assess is unplayable.
                    error!(target: "trial", %id, name = %tc.name, "Skipping bank trial: no recognized criteria.");
                    continue;
                }
                if tc.required_participants == 0 {
                    error!(target: "trial", %id, name = %tc.name, "Skipping bank trial: required_participants must be >= 1.");
                    continue;
                }
                let icon = tc.icon.clone().unwrap_or_else(|| {
                    let condition = tc.criteria.condition.as_deref().unwrap_or_default();
                    icon_for_condition(condition).to_string()
                });
                let trial = TrialDefinition {
                    id: id.clone(),
                    name: tc.name.clone(),
                    icon,
                    description: tc.description.clone(),
                    criteria: tc.criteria.clone(),
                    required_participants: tc.required_participants,
                    budget: tc.budget,
                    difficulty: tc.difficulty,
                    duration_weeks: tc.duration_weeks,
                    measurements: tc.measurements.clone(),
                    source: TrialSource::LocalBank,
                };
                order.push(id.clone());
                id_map.insert(id, trial);
            }
        }

        // Always insert the built-in catalog, but don't overwrite existing ids.
        for t in builtin_trials() {
            let id = t.id.clone();
            if !id_map.contains_key(&id) {
                order.push(id.clone());
                id_map.insert(id, t);
            }
        }

        // Inventory summary by source.
        let mut counts = (0usize, 0usize, 0usize);
        for t in id_map.values() {
            match t.source {
                TrialSource::LocalBank => counts.0 += 1,
                TrialSource::Generated => counts.1 += 1,
                TrialSource::Builtin => counts.2 += 1,
            }
        }
        info!(target: "trial", local_bank = counts.0, generated = counts.1, builtin = counts.2, "Startup trial inventory");

        // Build optional OpenAI client (if API key present).
        let openai = OpenAI::from_env();
        if let Some(oa) = &openai {
            info!(target: "recruitlab_backend", base_url = %oa.base_url, fast_model = %oa.fast_model, strong_model = %oa.strong_model, "OpenAI enabled.");
        } else {
            info!(target: "recruitlab_backend", "OpenAI disabled (no OPENAI_API_KEY). Using built-in catalog.");
        }

        Self {
            trials: Arc::new(RwLock::new(id_map)),
            trial_order: Arc::new(RwLock::new(order)),
            last_by_diff: Arc::new(RwLock::new(HashMap::new())),
            sessions: Arc::new(RwLock::new(HashMap::new())),
            openai,
            prompts,
        }
    }

    /// Insert a trial into the stores (id map + listing order).
    #[instrument(level = "debug", skip(self, t), fields(id = %t.id))]
    pub async fn insert_trial(&self, t: TrialDefinition) {
        let mut trials = self.trials.write().await;
        let mut order = self.trial_order.write().await;
        let id = t.id.clone();
        if !trials.contains_key(&id) {
            order.push(id.clone());
        }
        trials.insert(id, t);
    }

    /// Snapshot of the full catalog in stable listing order.
    pub async fn list_trials(&self) -> Vec<TrialDefinition> {
        let trials = self.trials.read().await;
        let order = self.trial_order.read().await;
        order.iter().filter_map(|id| trials.get(id).cloned()).collect()
    }

    /// Read-only access to a trial by id.
    #[instrument(level = "debug", skip(self), fields(%id))]
    pub async fn get_trial(&self, id: &str) -> Option<TrialDefinition> {
        let trials = self.trials.read().await;
        trials.get(id).cloned()
    }

    /// Selection policy:
    /// Generate a fresh trial via OpenAI when available.
    /// Otherwise, serve the existing pool, then a hard fallback.
    #[instrument(level = "info", skip(self), fields(difficulty = ?difficulty))]
    pub async fn choose_trial(&self, difficulty: Difficulty) -> (TrialDefinition, &'static str) {
        if let Some(oa) = &self.openai {
            match oa.generate_trial(&self.prompts, difficulty).await {
                Ok(t) => {
                    let id = t.id.clone();
                    self.insert_trial(t.clone()).await;
                    self.last_by_diff.write().await.insert(difficulty, id.clone());
                    info!(target: "trial", ?difficulty, chosen = %id, source = "openai_generated_new", "Generated fresh trial");
                    return (t, "openai_generated_new");
                }
                Err(e) => {
                    error!(target: "trial", ?difficulty, error = %e, "OpenAI generation failed; using existing pool");
                }
            }
        }

        // Serve an existing trial of this difficulty (bank or built-in),
        // avoiding the one served last time when there is a choice.
        let candidates: Vec<TrialDefinition> = self
            .list_trials()
            .await
            .into_iter()
            .filter(|t| t.difficulty == difficulty)
            .collect();
        if !candidates.is_empty() {
            let last = { self.last_by_diff.read().await.get(&difficulty).cloned() };
            let chosen = if candidates.len() == 1 {
                candidates[0].clone()
            } else if let Some(last_id) = last {
                candidates
                    .iter()
                    .find(|t| t.id != last_id)
                    .cloned()
                    .unwrap_or_else(|| candidates[0].clone())
            } else {
                candidates[0].clone()
            };
            self.last_by_diff.write().await.insert(difficulty, chosen.id.clone());
            warn!(target: "trial", ?difficulty, chosen = %chosen.id, source = "existing_pool", "Serving existing trial");
            return (chosen, "existing_pool");
        }

        // Absolute last resort: hard fallback.
        let t = hard_fallback_trial();
        let id = t.id.clone();
        self.insert_trial(t.clone()).await;
        self.last_by_diff.write().await.insert(difficulty, id.clone());
        warn!(target: "trial", ?difficulty, chosen = %id, source = "hard_fallback", "Inserted hard fallback trial");
        (t, "hard_fallback")
    }

    /// Register a freshly built session.
    #[instrument(level = "debug", skip(self, s), fields(id = %s.id))]
    pub async fn insert_session(&self, s: Session) {
        self.sessions.write().await.insert(s.id.clone(), s);
    }

    /// Run a mutation against one session under the write lock. The closure
    /// is synchronous so no lock is held across an await point.
    pub async fn with_session<T, F>(&self, id: &str, f: F) -> Result<T, EngineError>
    where
        F: FnOnce(&mut Session) -> Result<T, EngineError>,
    {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .get_mut(id)
            .ok_or_else(|| EngineError::UnknownSession { id: id.to_string() })?;
        f(session)
    }
}
