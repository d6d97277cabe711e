//! Domain models used by the backend: patients, trials and their criteria,
//! assessment questions, power-ups, and the screening questionnaire types.

use serde::{Deserialize, Serialize};

/// How hard a trial is to fill. Presentation uses this for badges only;
/// the engine treats it as opaque.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
  Easy,
  Medium,
  Hard,
}
impl Default for Difficulty {
  fn default() -> Self { Difficulty::Medium }
}

/// Where did we get the trial from?
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TrialSource {
  LocalBank,   // from user-provided TOML bank
  Generated,   // generated via OpenAI and cached in memory
  Builtin,     // built-in catalog (last resort)
}

/// Sparse eligibility criteria. An absent field means "no constraint of
/// that kind". Only some of these drive assessment questions today; the
/// rest are carried for catalog display and future question kinds.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Criteria {
  #[serde(default)] pub condition: Option<String>,
  #[serde(default)] pub min_age: Option<u32>,
  #[serde(default)] pub max_age: Option<u32>,
  #[serde(default)] pub min_severity: Option<u8>,
  #[serde(default)] pub min_systolic: Option<u32>,
  #[serde(default)] pub min_blood_sugar: Option<u32>,
  #[serde(default)] pub max_previous_treatments: Option<u32>,
  #[serde(default)] pub no_current_medication: Option<bool>,
  #[serde(default)] pub no_recent_surgery: Option<bool>,
  #[serde(default)] pub required_tests: Vec<String>,
}

impl Criteria {
  /// True if at least one criterion the question generator understands is
  /// present. Trials failing this check cannot produce an assessment.
  pub fn has_recognized(&self) -> bool {
    self.max_age.is_some()
      || self.condition.is_some()
      || self.min_severity.is_some()
      || self.min_systolic.is_some()
  }
}

/// Catalog entry describing one simulated clinical study.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TrialDefinition {
  pub id: String,
  pub name: String,
  pub icon: String,
  pub description: String,
  pub criteria: Criteria,
  pub required_participants: u32,
  pub budget: u32,
  pub difficulty: Difficulty,
  pub duration_weeks: u32,
  #[serde(default)] pub measurements: Vec<String>,
  pub source: TrialSource,
}

/// Systolic/diastolic pair. Only systolic drives eligibility; diastolic is
/// displayed alongside it.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct BloodPressure {
  pub systolic: u32,
  pub diastolic: u32,
}

/// One candidate for recruitment. Immutable once created; owned by the
/// session that created it and discarded on recruitment or session end.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Patient {
  pub id: String,
  pub age: u32,
  pub condition: String,
  pub severity: u8,
  pub previous_treatments: u32,
  pub allergies: bool,
  pub blood_pressure: BloodPressure,
}

/// Which criterion an assessment question exercises.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionKind {
  Age,
  Condition,
  Severity,
  BloodPressure,
}

/// Ephemeral yes/no question derived from one criterion and one patient.
/// Never persisted beyond the session that generated it.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AssessmentQuestion {
  pub id: String,
  pub kind: QuestionKind,
  pub text: String,
  pub correct_answer: bool,
  pub reward: u32,
}

/// Transient bonus collected outside the normal scoring flow.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PowerUpKind {
  Time,
  Points,
  Satisfaction,
}

/// Categories of the standalone screening questionnaire.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScreeningCategory {
  Lifestyle,
  Medical,
  Experience,
  Availability,
}

impl ScreeningCategory {
  pub const ALL: [ScreeningCategory; 4] = [
    ScreeningCategory::Lifestyle,
    ScreeningCategory::Medical,
    ScreeningCategory::Experience,
    ScreeningCategory::Availability,
  ];
}

/// One answered screening question.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScreeningResponse {
  pub question: String,
  pub answer: bool,
  pub category: ScreeningCategory,
}
