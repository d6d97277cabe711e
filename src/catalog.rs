//! Built-in trial catalog and small utilities related to default content.
//!
//! The built-in list is the absolute fallback: whatever happens to the TOML
//! bank or the OpenAI generator, these trials keep the game playable. Every
//! entry carries at least one criterion the question generator recognizes.

use uuid::Uuid;

use crate::domain::{Criteria, Difficulty, TrialDefinition, TrialSource};

/// Minimal set of built-in trials that guarantee the app is useful even
/// without external config or OpenAI.
pub fn builtin_trials() -> Vec<TrialDefinition> {
  vec![
    TrialDefinition {
      id: "t201".into(),
      name: "Advanced Diabetes Management Study".into(),
      icon: "💉".into(),
      description: "Testing novel insulin delivery system with AI-driven dosage optimization".into(),
      criteria: Criteria {
        condition: Some("Diabetes".into()),
        min_age: Some(25),
        max_age: Some(70),
        min_blood_sugar: Some(140),
        max_previous_treatments: Some(1),
        required_tests: vec!["HbA1c".into(), "Fasting Glucose".into()],
        ..Criteria::default()
      },
      required_participants: 5,
      budget: 2500,
      difficulty: Difficulty::Medium,
      duration_weeks: 12,
      measurements: vec!["Blood Glucose".into(), "Insulin Levels".into(), "HbA1c".into()],
      source: TrialSource::Builtin,
    },
    TrialDefinition {
      id: "t202".into(),
      name: "Cognitive Behavioral Therapy for Anxiety".into(),
      icon: "😰".into(),
      description: "Virtual reality-assisted CBT for treatment-resistant anxiety".into(),
      criteria: Criteria {
        condition: Some("Anxiety".into()),
        min_age: Some(18),
        max_age: Some(65),
        min_severity: Some(3),
        no_current_medication: Some(true),
        required_tests: vec!["GAD-7".into(), "PHQ-9".into()],
        ..Criteria::default()
      },
      required_participants: 8,
      budget: 3000,
      difficulty: Difficulty::Hard,
      duration_weeks: 16,
      measurements: vec!["Anxiety Scores".into(), "Cortisol Levels".into()],
      source: TrialSource::Builtin,
    },
    TrialDefinition {
      id: "t203".into(),
      name: "Innovative Arthritis Treatment".into(),
      icon: "🦴".into(),
      description: "Testing new biologics for rheumatoid arthritis with personalized dosing".into(),
      criteria: Criteria {
        condition: Some("Arthritis".into()),
        min_age: Some(30),
        max_age: Some(75),
        min_severity: Some(2),
        no_recent_surgery: Some(true),
        required_tests: vec!["RF Factor".into(), "Anti-CCP".into()],
        ..Criteria::default()
      },
      required_participants: 6,
      budget: 3500,
      difficulty: Difficulty::Medium,
      duration_weeks: 24,
      measurements: vec!["Joint Mobility".into(), "Pain Scores".into(), "Inflammation Markers".into()],
      source: TrialSource::Builtin,
    },
  ]
}

/// Absolute last-resort fallback: if all stores are somehow empty, we inject
/// this single easy trial so a session can always start.
pub fn hard_fallback_trial() -> TrialDefinition {
  TrialDefinition {
    id: Uuid::new_v4().to_string(),
    name: "General Hypertension Screening".into(),
    icon: "❤️".into(),
    description: "Baseline observational study of blood-pressure management".into(),
    criteria: Criteria {
      condition: Some("Hypertension".into()),
      min_age: Some(18),
      max_age: Some(80),
      min_systolic: Some(130),
      ..Criteria::default()
    },
    required_participants: 3,
    budget: 1500,
    difficulty: Difficulty::Easy,
    duration_weeks: 8,
    measurements: vec!["Blood Pressure".into()],
    source: TrialSource::Builtin,
  }
}

/// Presentation hint: emoji for a condition name, with a hospital default.
pub fn icon_for_condition(condition: &str) -> &'static str {
  match condition.to_lowercase().as_str() {
    "diabetes" => "💉",
    "hypertension" => "❤️",
    "arthritis" => "🦴",
    "asthma" => "🫁",
    "depression" => "🧠",
    "anxiety" => "😰",
    "cancer" => "🔬",
    "obesity" => "⚖️",
    "alzheimers" => "🤔",
    "parkinsons" => "🤝",
    _ => "🏥",
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn builtin_trials_all_have_recognized_criteria() {
    for t in builtin_trials() {
      assert!(t.criteria.has_recognized(), "trial {} has no usable criteria", t.name);
      assert!(t.required_participants >= 1);
    }
  }

  #[test]
  fn hard_fallback_is_playable() {
    let t = hard_fallback_trial();
    assert!(t.criteria.has_recognized());
    assert!(t.required_participants >= 1);
  }

  #[test]
  fn icons_fall_back_to_hospital() {
    assert_eq!(icon_for_condition("Diabetes"), "💉");
    assert_eq!(icon_for_condition("unknown thing"), "🏥");
  }
}
