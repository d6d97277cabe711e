//! Recruitment session state machine.
//!
//! A session is created when a trial is selected and owns its patient pool
//! and pending assessment questions exclusively. All transitions are pure
//! state mutations triggered by discrete events (answers, clock ticks,
//! power-up pickups, level-ups); nothing here talks to the transport or the
//! presentation layer.
//!
//! Terminal handling: the first transition into `TrialComplete` or
//! `GameOver` freezes the session. Every mutating operation checks the
//! phase first and refuses with `EngineError::SessionTerminal`, leaving the
//! state unchanged, so a late clock tick after a completed trial (or vice
//! versa) is a harmless no-op for the caller to ignore.

use std::collections::HashMap;

use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{AssessmentQuestion, BloodPressure, Patient, PowerUpKind, TrialDefinition};
use crate::questions::generate_questions;

pub const INITIAL_TIME_SECS: u32 = 300;
pub const INITIAL_SATISFACTION: u32 = 100;
pub const MAX_WRONG_ANSWERS: u32 = 4;
pub const PATIENT_POOL_SIZE: usize = 5;

const SATISFACTION_GAIN: u32 = 5;
const SATISFACTION_PENALTY: u32 = 10;
const POWERUP_TIME_BONUS_SECS: u32 = 30;
const POWERUP_POINTS_BONUS: u32 = 50;
const POWERUP_SATISFACTION_BONUS: u32 = 10;
const LEVEL_UP_TIME_BONUS_SECS: u32 = 60;

pub const GAME_OVER_WRONG_ANSWERS: &str = "Too Many Wrong Answers!";
pub const GAME_OVER_TIME_UP: &str = "Time's Up!";

/// Recoverable engine errors: the state machine refuses
/// the mutation and reports why; it never panics on bad input.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EngineError {
  NoCriteria,
  SessionTerminal,
  UnknownTrial { id: String },
  UnknownSession { id: String },
  UnknownPatient { id: String },
  UnknownQuestion { id: String },
}

impl std::fmt::Display for EngineError {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      EngineError::NoCriteria => write!(f, "trial has no recognized eligibility criteria"),
      EngineError::SessionTerminal => write!(f, "session has already ended"),
      EngineError::UnknownTrial { id } => write!(f, "unknown trialId: {id}"),
      EngineError::UnknownSession { id } => write!(f, "unknown sessionId: {id}"),
      EngineError::UnknownPatient { id } => write!(f, "unknown patientId: {id}"),
      EngineError::UnknownQuestion { id } => write!(f, "unknown questionId: {id}"),
    }
  }
}

/// Where the session is in its lifecycle. Both non-recruiting phases are
/// terminal; a session reaches at most one of them, exactly once.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum Phase {
  Recruiting,
  TrialComplete,
  GameOver { reason: String },
}

impl Phase {
  pub fn is_terminal(&self) -> bool {
    !matches!(self, Phase::Recruiting)
  }
}

/// Mutable per-playthrough aggregate, serialized as-is for snapshots.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
  pub score: u32,
  pub level: u32,
  pub time_left_secs: u32,
  pub satisfaction: u32,
  pub recruited_patients: u32,
  pub required_participants: u32,
  pub trial_budget: u32,
  pub spent_budget: u32,
  pub wrong_answers: u32,
  pub max_wrong_answers: u32,
  #[serde(flatten)]
  pub phase: Phase,
}

/// End-screen stats, reported once a terminal phase is reached.
#[derive(Clone, Debug, Serialize)]
pub struct SessionSummary {
  pub score: u32,
  pub recruited_patients: u32,
  pub required_participants: u32,
  pub spent_budget: u32,
  pub trial_budget: u32,
  pub satisfaction: u32,
  pub wrong_answers: u32,
}

/// A generated question waiting for its answer, tied to one patient.
#[derive(Clone, Debug)]
pub struct PendingAssessment {
  pub patient_id: String,
  pub question: AssessmentQuestion,
}

/// Result of answering one assessment question.
#[derive(Clone, Debug)]
pub struct AnswerOutcome {
  pub correct: bool,
  /// Points awarded on a correct answer, satisfaction lost on a wrong one.
  pub cost_or_penalty: u32,
}

pub struct Session {
  pub id: String,
  pub trial: TrialDefinition,
  pub state: SessionState,
  pub patients: Vec<Patient>,
  pub pending: HashMap<String, PendingAssessment>,
}

impl Session {
  /// Fresh session for a selected trial: full clock, full satisfaction,
  /// nothing spent, and a pool of five random patients.
  pub fn new<R: Rng>(trial: TrialDefinition, rng: &mut R) -> Self {
    let patients = (0..PATIENT_POOL_SIZE).map(|_| random_patient(rng)).collect();
    let state = SessionState {
      score: 0,
      level: 1,
      time_left_secs: INITIAL_TIME_SECS,
      satisfaction: INITIAL_SATISFACTION,
      recruited_patients: 0,
      required_participants: trial.required_participants,
      trial_budget: trial.budget,
      spent_budget: 0,
      wrong_answers: 0,
      max_wrong_answers: MAX_WRONG_ANSWERS,
      phase: Phase::Recruiting,
    };
    Session {
      id: Uuid::new_v4().to_string(),
      trial,
      state,
      patients,
      pending: HashMap::new(),
    }
  }

  pub fn summary(&self) -> SessionSummary {
    SessionSummary {
      score: self.state.score,
      recruited_patients: self.state.recruited_patients,
      required_participants: self.state.required_participants,
      spent_budget: self.state.spent_budget,
      trial_budget: self.state.trial_budget,
      satisfaction: self.state.satisfaction,
      wrong_answers: self.state.wrong_answers,
    }
  }

  fn ensure_recruiting(&self) -> Result<(), EngineError> {
    if self.state.phase.is_terminal() {
      Err(EngineError::SessionTerminal)
    } else {
      Ok(())
    }
  }

  /// Generate assessment questions for one patient in the pool and remember
  /// them so the answer path can evaluate without trusting the client.
  pub fn begin_assessment<R: Rng>(
    &mut self,
    patient_id: &str,
    rng: &mut R,
  ) -> Result<Vec<AssessmentQuestion>, EngineError> {
    self.ensure_recruiting()?;
    let patient = self
      .patients
      .iter()
      .find(|p| p.id == patient_id)
      .cloned()
      .ok_or_else(|| EngineError::UnknownPatient { id: patient_id.to_string() })?;

    let questions = generate_questions(&patient, &self.trial, rng)?;
    for q in &questions {
      self.pending.insert(
        q.id.clone(),
        PendingAssessment { patient_id: patient.id.clone(), question: q.clone() },
      );
    }
    Ok(questions)
  }

  /// Evaluate a submitted yes/no answer against a pending question.
  ///
  /// Correct: the patient is recruited, `reward × level` is both spent and
  /// scored, satisfaction rises (clamped), the pool is replenished, and
  /// reaching the participant target completes the trial. Wrong: the wrong
  /// counter rises, satisfaction drops (floored), and hitting the threshold
  /// ends the game.
  pub fn answer_question<R: Rng>(
    &mut self,
    question_id: &str,
    answer: bool,
    rng: &mut R,
  ) -> Result<AnswerOutcome, EngineError> {
    self.ensure_recruiting()?;
    let pending = self
      .pending
      .remove(question_id)
      .ok_or_else(|| EngineError::UnknownQuestion { id: question_id.to_string() })?;

    let correct = answer == pending.question.correct_answer;
    if !correct {
      self.state.wrong_answers += 1;
      self.state.satisfaction = self.state.satisfaction.saturating_sub(SATISFACTION_PENALTY);
      if self.state.wrong_answers >= self.state.max_wrong_answers {
        self.state.phase = Phase::GameOver { reason: GAME_OVER_WRONG_ANSWERS.into() };
      }
      return Ok(AnswerOutcome { correct: false, cost_or_penalty: SATISFACTION_PENALTY });
    }

    let cost = pending.question.reward * self.state.level;
    self.state.recruited_patients += 1;
    self.state.spent_budget += cost;
    self.state.score += cost;
    self.state.satisfaction = (self.state.satisfaction + SATISFACTION_GAIN).min(100);

    // The recruited patient leaves the pool along with any other questions
    // generated for them.
    self.patients.retain(|p| p.id != pending.patient_id);
    self.pending.retain(|_, a| a.patient_id != pending.patient_id);

    if self.state.recruited_patients >= self.state.required_participants {
      self.state.phase = Phase::TrialComplete;
    } else if self.patients.len() < PATIENT_POOL_SIZE {
      self.patients.push(random_patient(rng));
    }

    Ok(AnswerOutcome { correct: true, cost_or_penalty: cost })
  }

  /// Per-second clock transition. Independent of answers; a session that is
  /// already terminal refuses the tick.
  pub fn tick(&mut self) -> Result<(), EngineError> {
    self.ensure_recruiting()?;
    self.state.time_left_secs = self.state.time_left_secs.saturating_sub(1);
    if self.state.time_left_secs == 0 {
      self.state.phase = Phase::GameOver { reason: GAME_OVER_TIME_UP.into() };
    }
    Ok(())
  }

  /// Asynchronous side event: applied atomically, no phase transition.
  pub fn collect_power_up(&mut self, kind: PowerUpKind) -> Result<(), EngineError> {
    self.ensure_recruiting()?;
    match kind {
      PowerUpKind::Time => self.state.time_left_secs += POWERUP_TIME_BONUS_SECS,
      PowerUpKind::Points => self.state.score += POWERUP_POINTS_BONUS,
      PowerUpKind::Satisfaction => {
        self.state.satisfaction = (self.state.satisfaction + POWERUP_SATISFACTION_BONUS).min(100);
      }
    }
    Ok(())
  }

  /// Raises the cost multiplier for future recruitments and grants bonus time.
  pub fn level_up(&mut self) -> Result<(), EngineError> {
    self.ensure_recruiting()?;
    self.state.level += 1;
    self.state.time_left_secs += LEVEL_UP_TIME_BONUS_SECS;
    Ok(())
  }
}

/// Random candidate within the attribute ranges the game uses. Severity is
/// clamped to 1–5 so downstream scoring never sees an out-of-range value.
pub fn random_patient<R: Rng>(rng: &mut R) -> Patient {
  const CONDITIONS: &[&str] = &["diabetes", "hypertension", "arthritis"];
  Patient {
    id: Uuid::new_v4().to_string(),
    age: rng.gen_range(18..=80),
    condition: CONDITIONS[rng.gen_range(0..CONDITIONS.len())].to_string(),
    severity: rng.gen_range(1..=5u8).clamp(1, 5),
    previous_treatments: rng.gen_range(0..=3),
    allergies: rng.gen_bool(0.3),
    blood_pressure: BloodPressure {
      systolic: rng.gen_range(100..=180),
      diastolic: rng.gen_range(60..=100),
    },
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::{Criteria, Difficulty, QuestionKind, TrialSource};
  use rand::rngs::StdRng;
  use rand::SeedableRng;

  fn trial(required: u32, budget: u32) -> TrialDefinition {
    TrialDefinition {
      id: "t1".into(),
      name: "Test Study".into(),
      icon: "🏥".into(),
      description: String::new(),
      criteria: Criteria {
        condition: Some("Diabetes".into()),
        min_age: Some(18),
        max_age: Some(80),
        ..Criteria::default()
      },
      required_participants: required,
      budget,
      difficulty: Difficulty::Easy,
      duration_weeks: 8,
      measurements: vec![],
      source: TrialSource::Builtin,
    }
  }

  fn session(required: u32, budget: u32) -> Session {
    let mut rng = StdRng::seed_from_u64(42);
    Session::new(trial(required, budget), &mut rng)
  }

  /// Plant a question with a known answer/reward, bypassing generation.
  fn plant_question(s: &mut Session, id: &str, correct_answer: bool, reward: u32) {
    let patient_id = s.patients[0].id.clone();
    s.pending.insert(
      id.to_string(),
      PendingAssessment {
        patient_id,
        question: AssessmentQuestion {
          id: id.to_string(),
          kind: QuestionKind::Age,
          text: "test".into(),
          correct_answer,
          reward,
        },
      },
    );
  }

  fn assert_invariants(s: &Session) {
    assert!(s.state.satisfaction <= 100);
    assert!(s.state.recruited_patients <= s.state.required_participants);
  }

  #[test]
  fn fresh_session_state() {
    let s = session(5, 2500);
    assert_eq!(s.state.score, 0);
    assert_eq!(s.state.level, 1);
    assert_eq!(s.state.time_left_secs, 300);
    assert_eq!(s.state.satisfaction, 100);
    assert_eq!(s.state.spent_budget, 0);
    assert_eq!(s.state.phase, Phase::Recruiting);
    assert_eq!(s.patients.len(), 5);
  }

  #[test]
  fn single_recruitment_completes_trial() {
    let mut s = session(1, 1000);
    plant_question(&mut s, "q1", true, 100);
    let mut rng = StdRng::seed_from_u64(1);
    let out = s.answer_question("q1", true, &mut rng).expect("answer");
    assert!(out.correct);
    assert_eq!(out.cost_or_penalty, 100);
    assert_eq!(s.state.recruited_patients, 1);
    assert_eq!(s.state.spent_budget, 100);
    assert_eq!(s.state.score, 100);
    assert_eq!(s.state.satisfaction, 100, "satisfaction stays clamped at 100");
    assert_eq!(s.state.phase, Phase::TrialComplete);
  }

  #[test]
  fn four_wrong_answers_end_the_game() {
    let mut s = session(5, 2500);
    let mut rng = StdRng::seed_from_u64(1);
    for i in 0..4 {
      let id = format!("q{i}");
      plant_question(&mut s, &id, true, 100);
      let out = s.answer_question(&id, false, &mut rng).expect("answer");
      assert!(!out.correct);
      assert_eq!(out.cost_or_penalty, 10);
      assert_invariants(&s);
    }
    assert_eq!(s.state.wrong_answers, 4);
    assert_eq!(s.state.satisfaction, 60);
    assert_eq!(s.state.phase, Phase::GameOver { reason: GAME_OVER_WRONG_ANSWERS.into() });
  }

  #[test]
  fn satisfaction_floors_at_zero() {
    let mut s = session(5, 2500);
    s.state.max_wrong_answers = 20;
    let mut rng = StdRng::seed_from_u64(1);
    for i in 0..15 {
      let id = format!("q{i}");
      plant_question(&mut s, &id, true, 100);
      s.answer_question(&id, false, &mut rng).expect("answer");
      assert_invariants(&s);
    }
    assert_eq!(s.state.satisfaction, 0);
  }

  #[test]
  fn terminal_session_refuses_every_mutation() {
    let mut s = session(1, 1000);
    plant_question(&mut s, "q1", true, 100);
    let mut rng = StdRng::seed_from_u64(1);
    s.answer_question("q1", true, &mut rng).expect("answer");
    assert!(s.state.phase.is_terminal());

    let frozen = s.state.clone();
    plant_question(&mut s, "q2", true, 100);
    assert_eq!(s.answer_question("q2", true, &mut rng).unwrap_err(), EngineError::SessionTerminal);
    assert_eq!(s.tick().unwrap_err(), EngineError::SessionTerminal);
    assert_eq!(s.collect_power_up(PowerUpKind::Time).unwrap_err(), EngineError::SessionTerminal);
    assert_eq!(s.level_up().unwrap_err(), EngineError::SessionTerminal);
    assert_eq!(s.state, frozen, "terminal state must not change");
  }

  #[test]
  fn clock_runs_out_into_game_over() {
    let mut s = session(5, 2500);
    s.state.time_left_secs = 2;
    s.tick().expect("tick");
    assert_eq!(s.state.phase, Phase::Recruiting);
    s.tick().expect("tick");
    assert_eq!(s.state.phase, Phase::GameOver { reason: GAME_OVER_TIME_UP.into() });
    assert_eq!(s.tick().unwrap_err(), EngineError::SessionTerminal);
  }

  #[test]
  fn power_ups_apply_without_phase_change() {
    let mut s = session(5, 2500);
    s.state.satisfaction = 95;
    s.collect_power_up(PowerUpKind::Time).expect("time");
    assert_eq!(s.state.time_left_secs, 330);
    s.collect_power_up(PowerUpKind::Points).expect("points");
    assert_eq!(s.state.score, 50);
    s.collect_power_up(PowerUpKind::Satisfaction).expect("satisfaction");
    assert_eq!(s.state.satisfaction, 100, "clamped at 100");
    assert_eq!(s.state.phase, Phase::Recruiting);
  }

  #[test]
  fn level_scales_recruitment_cost() {
    let mut s = session(5, 2500);
    s.level_up().expect("level up");
    assert_eq!(s.state.level, 2);
    assert_eq!(s.state.time_left_secs, 360);

    plant_question(&mut s, "q1", true, 100);
    let mut rng = StdRng::seed_from_u64(1);
    let out = s.answer_question("q1", true, &mut rng).expect("answer");
    assert_eq!(out.cost_or_penalty, 200);
    assert_eq!(s.state.spent_budget, 200);
  }

  #[test]
  fn pool_replenishes_after_recruitment() {
    let mut s = session(5, 2500);
    plant_question(&mut s, "q1", true, 100);
    let mut rng = StdRng::seed_from_u64(1);
    s.answer_question("q1", true, &mut rng).expect("answer");
    assert_eq!(s.patients.len(), PATIENT_POOL_SIZE);
  }

  #[test]
  fn recruiting_consumes_all_pending_questions_for_the_patient() {
    let mut s = session(5, 2500);
    plant_question(&mut s, "q1", true, 100);
    plant_question(&mut s, "q2", true, 130);
    let mut rng = StdRng::seed_from_u64(1);
    s.answer_question("q1", true, &mut rng).expect("answer");
    assert_eq!(
      s.answer_question("q2", true, &mut rng).unwrap_err(),
      EngineError::UnknownQuestion { id: "q2".into() }
    );
  }

  #[test]
  fn begin_assessment_requires_known_patient() {
    let mut s = session(5, 2500);
    let mut rng = StdRng::seed_from_u64(1);
    let err = s.begin_assessment("nope", &mut rng).unwrap_err();
    assert_eq!(err, EngineError::UnknownPatient { id: "nope".into() });

    let pid = s.patients[0].id.clone();
    let qs = s.begin_assessment(&pid, &mut rng).expect("assessment");
    assert!(!qs.is_empty() && qs.len() <= 2);
    for q in &qs {
      assert!(s.pending.contains_key(&q.id));
    }
  }

  #[test]
  fn random_patients_stay_in_range() {
    let mut rng = StdRng::seed_from_u64(9);
    for _ in 0..100 {
      let p = random_patient(&mut rng);
      assert!((18..=80).contains(&p.age));
      assert!((1..=5).contains(&p.severity));
      assert!(p.previous_treatments <= 3);
      assert!((100..=180).contains(&p.blood_pressure.systolic));
      assert!((60..=100).contains(&p.blood_pressure.diastolic));
    }
  }
}
