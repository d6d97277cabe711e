//! Standalone eligibility questionnaire scoring.
//!
//! The questionnaire is a fixed five-question set spanning four categories.
//! Scoring is a pure function of the responses: for each category, the
//! percentage of "yes" answers over the number of questions that category
//! owns in the fixed set, rounded for display. No hidden state.

use std::collections::HashMap;

use serde::Serialize;

use crate::domain::{ScreeningCategory, ScreeningResponse};

/// One entry of the fixed questionnaire.
#[derive(Clone, Debug, Serialize)]
pub struct ScreeningQuestion {
  pub text: &'static str,
  pub category: ScreeningCategory,
}

/// The fixed question set presented to every patient.
pub const SCREENING_QUESTIONS: &[ScreeningQuestion] = &[
  ScreeningQuestion {
    text: "Do you exercise regularly?\n(at least 3 times a week)",
    category: ScreeningCategory::Lifestyle,
  },
  ScreeningQuestion {
    text: "Do you take any medications daily?",
    category: ScreeningCategory::Medical,
  },
  ScreeningQuestion {
    text: "Have you participated in clinical trials before?",
    category: ScreeningCategory::Experience,
  },
  ScreeningQuestion {
    text: "Can you commit to weekly hospital visits?",
    category: ScreeningCategory::Availability,
  },
  ScreeningQuestion {
    text: "Do you have any allergies to medications?",
    category: ScreeningCategory::Medical,
  },
];

/// Per-category percentage of "yes" answers among that category's questions
/// in the fixed set. Categories with no questions would divide by zero; the
/// fixed set covers all four, and we guard anyway.
pub fn evaluate(responses: &[ScreeningResponse]) -> HashMap<ScreeningCategory, u32> {
  let mut yes_counts: HashMap<ScreeningCategory, u32> = HashMap::new();
  for r in responses {
    if r.answer {
      *yes_counts.entry(r.category).or_insert(0) += 1;
    }
  }

  let mut scores = HashMap::new();
  for cat in ScreeningCategory::ALL {
    let total = SCREENING_QUESTIONS.iter().filter(|q| q.category == cat).count() as f64;
    if total == 0.0 {
      scores.insert(cat, 0);
      continue;
    }
    let yes = *yes_counts.get(&cat).unwrap_or(&0) as f64;
    scores.insert(cat, (yes / total * 100.0).round() as u32);
  }
  scores
}

#[cfg(test)]
mod tests {
  use super::*;

  fn answer_all(answer: bool) -> Vec<ScreeningResponse> {
    SCREENING_QUESTIONS
      .iter()
      .map(|q| ScreeningResponse { question: q.text.to_string(), answer, category: q.category })
      .collect()
  }

  #[test]
  fn fixed_set_shape() {
    assert_eq!(SCREENING_QUESTIONS.len(), 5);
    let medical = SCREENING_QUESTIONS
      .iter()
      .filter(|q| q.category == ScreeningCategory::Medical)
      .count();
    assert_eq!(medical, 2);
  }

  #[test]
  fn all_yes_scores_100_everywhere() {
    let scores = evaluate(&answer_all(true));
    for cat in ScreeningCategory::ALL {
      assert_eq!(scores[&cat], 100, "{cat:?}");
    }
  }

  #[test]
  fn all_no_scores_0_everywhere() {
    let scores = evaluate(&answer_all(false));
    for cat in ScreeningCategory::ALL {
      assert_eq!(scores[&cat], 0, "{cat:?}");
    }
  }

  #[test]
  fn partial_medical_rounds_for_display() {
    // One yes of the two medical questions: 50%.
    let responses = vec![ScreeningResponse {
      question: "Do you take any medications daily?".into(),
      answer: true,
      category: ScreeningCategory::Medical,
    }];
    let scores = evaluate(&responses);
    assert_eq!(scores[&ScreeningCategory::Medical], 50);
    assert_eq!(scores[&ScreeningCategory::Lifestyle], 0);
  }

  #[test]
  fn evaluation_is_deterministic() {
    let responses = answer_all(true);
    assert_eq!(evaluate(&responses), evaluate(&responses));
  }
}
