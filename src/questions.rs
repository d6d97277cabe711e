//! Eligibility question generation.
//!
//! For each criterion present on the trial we build exactly one candidate
//! yes/no question. The correct answer is the criterion evaluated against
//! the patient's matching attribute; the reward is a fixed base value per
//! criterion kind. From the candidate set we keep a pseudo-random subset
//! (each candidate independently with probability 1/2, capped at two); if
//! the filter empties the set we fall back to the first candidate, so the
//! result is never empty for a trial with at least one recognized criterion.
//!
//! The randomness source is injected so tests can pin outcomes.

use rand::Rng;
use uuid::Uuid;

use crate::domain::{AssessmentQuestion, Patient, QuestionKind, TrialDefinition};
use crate::session::EngineError;

// Base point rewards per criterion kind.
const REWARD_AGE: u32 = 100;
const REWARD_CONDITION: u32 = 150;
const REWARD_SEVERITY: u32 = 120;
const REWARD_BLOOD_PRESSURE: u32 = 130;

/// Questions returned per patient/trial pairing are capped at this.
const MAX_QUESTIONS: usize = 2;

pub fn generate_questions<R: Rng>(
  patient: &Patient,
  trial: &TrialDefinition,
  rng: &mut R,
) -> Result<Vec<AssessmentQuestion>, EngineError> {
  let candidates = candidate_questions(patient, trial);
  if candidates.is_empty() {
    return Err(EngineError::NoCriteria);
  }

  let picked: Vec<AssessmentQuestion> = candidates
    .iter()
    .filter(|_| rng.gen_bool(0.5))
    .take(MAX_QUESTIONS)
    .cloned()
    .collect();

  if picked.is_empty() {
    // Random filter dropped everything; serve the first candidate.
    Ok(vec![candidates[0].clone()])
  } else {
    Ok(picked)
  }
}

/// One candidate per recognized criterion, in a fixed order so the
/// first-candidate fallback is deterministic.
fn candidate_questions(patient: &Patient, trial: &TrialDefinition) -> Vec<AssessmentQuestion> {
  let mut questions = Vec::new();
  let criteria = &trial.criteria;

  if let Some(max_age) = criteria.max_age {
    // Correctness needs BOTH bounds: within max, and above min when present.
    let within = patient.age <= max_age
      && criteria.min_age.map_or(true, |min_age| patient.age >= min_age);
    questions.push(AssessmentQuestion {
      id: Uuid::new_v4().to_string(),
      kind: QuestionKind::Age,
      text: format!(
        "Is this {} year old patient within the age range for {}?",
        patient.age, trial.name
      ),
      correct_answer: within,
      reward: REWARD_AGE,
    });
  }

  if let Some(condition) = &criteria.condition {
    questions.push(AssessmentQuestion {
      id: Uuid::new_v4().to_string(),
      kind: QuestionKind::Condition,
      text: format!(
        "Does this patient's condition ({}) match the trial requirements?",
        patient.condition
      ),
      correct_answer: patient.condition.eq_ignore_ascii_case(condition),
      reward: REWARD_CONDITION,
    });
  }

  if let Some(min_severity) = criteria.min_severity {
    // Strictly greater than the threshold, not >=.
    questions.push(AssessmentQuestion {
      id: Uuid::new_v4().to_string(),
      kind: QuestionKind::Severity,
      text: format!(
        "Is the patient's severity level ({}) sufficient for the trial?",
        patient.severity
      ),
      correct_answer: patient.severity > min_severity,
      reward: REWARD_SEVERITY,
    });
  }

  if let Some(min_systolic) = criteria.min_systolic {
    // Systolic alone decides; diastolic appears only in the wording.
    questions.push(AssessmentQuestion {
      id: Uuid::new_v4().to_string(),
      kind: QuestionKind::BloodPressure,
      text: format!(
        "Is the patient's blood pressure ({}/{}) suitable?",
        patient.blood_pressure.systolic, patient.blood_pressure.diastolic
      ),
      correct_answer: patient.blood_pressure.systolic > min_systolic,
      reward: REWARD_BLOOD_PRESSURE,
    });
  }

  questions
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::{BloodPressure, Criteria, Difficulty, TrialSource};
  use rand::rngs::StdRng;
  use rand::SeedableRng;

  fn patient(age: u32, condition: &str, severity: u8, systolic: u32) -> Patient {
    Patient {
      id: "p1".into(),
      age,
      condition: condition.into(),
      severity,
      previous_treatments: 0,
      allergies: false,
      blood_pressure: BloodPressure { systolic, diastolic: 80 },
    }
  }

  fn trial(criteria: Criteria) -> TrialDefinition {
    TrialDefinition {
      id: "t1".into(),
      name: "Test Study".into(),
      icon: "🏥".into(),
      description: String::new(),
      criteria,
      required_participants: 5,
      budget: 1000,
      difficulty: Difficulty::Easy,
      duration_weeks: 8,
      measurements: vec![],
      source: TrialSource::Builtin,
    }
  }

  #[test]
  fn age_question_honors_both_bounds() {
    let t = trial(Criteria { min_age: Some(25), max_age: Some(70), ..Criteria::default() });
    for (age, expected) in [(70, true), (71, false), (24, false), (25, true)] {
      let qs = candidate_questions(&patient(age, "Diabetes", 3, 120), &t);
      assert_eq!(qs.len(), 1);
      assert_eq!(qs[0].kind, QuestionKind::Age);
      assert_eq!(qs[0].correct_answer, expected, "age={age}");
      assert_eq!(qs[0].reward, 100);
    }
  }

  #[test]
  fn severity_threshold_is_strict() {
    let t = trial(Criteria { min_severity: Some(3), ..Criteria::default() });
    let at = candidate_questions(&patient(40, "Anxiety", 3, 120), &t);
    assert!(!at[0].correct_answer, "severity == threshold must not qualify");
    let above = candidate_questions(&patient(40, "Anxiety", 4, 120), &t);
    assert!(above[0].correct_answer);
    assert_eq!(above[0].reward, 120);
  }

  #[test]
  fn blood_pressure_uses_systolic_only() {
    let t = trial(Criteria { min_systolic: Some(130), ..Criteria::default() });
    let low = candidate_questions(&patient(40, "Hypertension", 3, 130), &t);
    assert!(!low[0].correct_answer);
    let high = candidate_questions(&patient(40, "Hypertension", 3, 131), &t);
    assert!(high[0].correct_answer);
  }

  #[test]
  fn condition_match_ignores_case() {
    let t = trial(Criteria { condition: Some("Diabetes".into()), ..Criteria::default() });
    let qs = candidate_questions(&patient(40, "diabetes", 3, 120), &t);
    assert!(qs[0].correct_answer);
    assert_eq!(qs[0].reward, 150);
  }

  #[test]
  fn output_is_never_empty_and_capped_at_two() {
    let t = trial(Criteria {
      condition: Some("Diabetes".into()),
      min_age: Some(25),
      max_age: Some(70),
      min_severity: Some(2),
      min_systolic: Some(120),
      ..Criteria::default()
    });
    let p = patient(50, "Diabetes", 4, 140);
    for seed in 0..200 {
      let mut rng = StdRng::seed_from_u64(seed);
      let qs = generate_questions(&p, &t, &mut rng).expect("questions");
      assert!(!qs.is_empty() && qs.len() <= 2, "seed {seed} produced {} questions", qs.len());
    }
  }

  #[test]
  fn trial_without_recognized_criteria_fails_fast() {
    let t = trial(Criteria { max_previous_treatments: Some(2), ..Criteria::default() });
    let mut rng = StdRng::seed_from_u64(7);
    let err = generate_questions(&patient(50, "Diabetes", 4, 140), &t, &mut rng).unwrap_err();
    assert_eq!(err, EngineError::NoCriteria);
  }
}
