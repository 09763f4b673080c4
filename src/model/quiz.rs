//! Quiz definitions stored on `quiz` content items, and attempt scoring.

use std::collections::{BTreeSet, HashMap, HashSet};

use serde::{Deserialize, Serialize};

pub const MAX_POINTS: i32 = 1000;
pub const MAX_QUESTIONS: usize = 500;

fn saturate(value: i64) -> i32 {
    i32::try_from(value).unwrap_or(if value < 0 { i32::MIN } else { i32::MAX })
}

fn default_points() -> i32 {
    1
}

fn default_passing_score() -> i32 {
    60
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct QuizQuestion {
    pub id: String,
    pub prompt: String,
    pub options: Vec<String>,
    /// Indexes into `options`. More than one makes it a multi-select question.
    pub correct: Vec<usize>,
    #[serde(default = "default_points")]
    pub points: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct QuizDefinition {
    pub questions: Vec<QuizQuestion>,
    /// Minimum percentage needed to pass.
    #[serde(default = "default_passing_score")]
    pub passing_score: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_attempts: Option<i32>,
}

/// What a student sees: the quiz without its answer key.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct PublicQuiz {
    pub questions: Vec<PublicQuestion>,
    pub passing_score: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_attempts: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct PublicQuestion {
    pub id: String,
    pub prompt: String,
    pub options: Vec<String>,
    pub points: i32,
    pub multiple: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, utoipa::ToSchema)]
pub struct QuizScore {
    pub score: i32,
    pub max_score: i32,
    pub percentage: i32,
    pub passed: bool,
}

/// Selected option indexes per question id.
pub type QuizAnswers = HashMap<String, Vec<usize>>;

impl QuizDefinition {
    pub fn validate(&self) -> Result<(), String> {
        if self.questions.is_empty() {
            return Err("quiz needs at least one question".into());
        }
        if !(0..=100).contains(&self.passing_score) {
            return Err("passing_score must be between 0 and 100".into());
        }
        if self.questions.len() > MAX_QUESTIONS {
            return Err(format!("quiz may hold at most {MAX_QUESTIONS} questions"));
        }
        if matches!(self.max_attempts, Some(n) if n < 1) {
            return Err("max_attempts must be at least 1".into());
        }

        let mut seen = HashSet::new();
        for q in &self.questions {
            if q.id.trim().is_empty() {
                return Err("question id must not be empty".into());
            }
            if !seen.insert(q.id.as_str()) {
                return Err(format!("duplicate question id `{}`", q.id));
            }
            if q.options.is_empty() {
                return Err(format!("question `{}` has no options", q.id));
            }
            if q.correct.is_empty() {
                return Err(format!("question `{}` has no correct option", q.id));
            }
            if let Some(bad) = q.correct.iter().find(|i| **i >= q.options.len()) {
                return Err(format!("question `{}` marks option {} which does not exist", q.id, bad));
            }
            if !(0..=MAX_POINTS).contains(&q.points) {
                return Err(format!("question `{}` must score 0 to {} points", q.id, MAX_POINTS));
            }
        }
        Ok(())
    }

    pub fn max_score(&self) -> i32 {
        saturate(self.questions.iter().map(|q| i64::from(q.points)).sum())
    }

    /// A question scores only when the selected set equals the correct set;
    /// order and repeats in the selection do not matter.
    pub fn score(&self, answers: &QuizAnswers) -> QuizScore {
        let score: i64 = self
            .questions
            .iter()
            .filter(|q| {
                let Some(selected) = answers.get(&q.id) else {
                    return false;
                };
                let selected: BTreeSet<usize> = selected.iter().copied().collect();
                let correct: BTreeSet<usize> = q.correct.iter().copied().collect();
                selected == correct
            })
            .map(|q| i64::from(q.points))
            .sum();

        let max_score: i64 = self.questions.iter().map(|q| i64::from(q.points)).sum();
        let percentage = if max_score > 0 { score * 100 / max_score } else { 0 };
        let percentage = saturate(percentage);

        QuizScore {
            score: saturate(score),
            max_score: saturate(max_score),
            percentage,
            passed: percentage >= self.passing_score,
        }
    }

    pub fn public_view(&self) -> PublicQuiz {
        PublicQuiz {
            questions: self
                .questions
                .iter()
                .map(|q| PublicQuestion {
                    id: q.id.clone(),
                    prompt: q.prompt.clone(),
                    options: q.options.clone(),
                    points: q.points,
                    multiple: q.correct.len() > 1,
                })
                .collect(),
            passing_score: self.passing_score,
            max_attempts: self.max_attempts,
        }
    }

    pub fn attempts_exhausted(&self, previous_attempts: i64) -> bool {
        matches!(self.max_attempts, Some(max) if previous_attempts >= max as i64)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn quiz() -> QuizDefinition {
        serde_json::from_value(serde_json::json!({
            "questions": [
                { "id": "q1", "prompt": "2 + 2?", "options": ["3", "4"], "correct": [1] },
                { "id": "q2", "prompt": "Primes?", "options": ["2", "4", "5"], "correct": [0, 2], "points": 2 },
                { "id": "q3", "prompt": "Rust?", "options": ["yes", "no"], "correct": [0] }
            ],
            "passing_score": 75,
            "max_attempts": 2
        }))
        .unwrap()
    }

    fn answers(pairs: &[(&str, &[usize])]) -> QuizAnswers {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_vec()))
            .collect()
    }

    #[test]
    fn defaults_apply() {
        let q: QuizDefinition = serde_json::from_value(serde_json::json!({
            "questions": [{ "id": "a", "prompt": "?", "options": ["x"], "correct": [0] }]
        }))
        .unwrap();
        assert_eq!(q.passing_score, 60);
        assert_eq!(q.questions[0].points, 1);
        assert_eq!(q.max_attempts, None);
        assert!(q.validate().is_ok());
    }

    #[test]
    fn full_marks() {
        let s = quiz().score(&answers(&[("q1", &[1]), ("q2", &[2, 0]), ("q3", &[0])]));
        assert_eq!(s, QuizScore { score: 4, max_score: 4, percentage: 100, passed: true });
    }

    #[test]
    fn partial_multi_select_scores_nothing() {
        let s = quiz().score(&answers(&[("q1", &[1]), ("q2", &[0]), ("q3", &[0])]));
        assert_eq!(s.score, 2);
        assert_eq!(s.percentage, 50);
        assert!(!s.passed);
    }

    #[test]
    fn repeated_selection_is_a_set() {
        let s = quiz().score(&answers(&[("q2", &[0, 2, 2, 0])]));
        assert_eq!(s.score, 2);
    }

    #[test]
    fn unknown_and_missing_questions_ignored() {
        let s = quiz().score(&answers(&[("nope", &[0]), ("q3", &[0])]));
        assert_eq!(s.score, 1);
        assert_eq!(s.percentage, 25);
    }

    #[test]
    fn percentage_floors() {
        let mut q = quiz();
        q.passing_score = 66;
        // 2 of 3 equal-weight questions
        q.questions[1].points = 1;
        let s = q.score(&answers(&[("q1", &[1]), ("q3", &[0])]));
        assert_eq!(s.percentage, 66);
        assert!(s.passed);
    }

    #[test]
    fn validate_rejects_bad_definitions() {
        let mut q = quiz();
        q.questions[0].correct = vec![5];
        assert!(q.validate().is_err());

        let mut q = quiz();
        q.questions[1].id = "q1".into();
        assert!(q.validate().unwrap_err().contains("duplicate"));

        let mut q = quiz();
        q.questions.clear();
        assert!(q.validate().is_err());

        let mut q = quiz();
        q.passing_score = 101;
        assert!(q.validate().is_err());

        let mut q = quiz();
        q.questions[2].correct.clear();
        assert!(q.validate().is_err());
    }

    #[test]
    fn points_are_bounded() {
        let mut q = quiz();
        q.questions[0].points = 30_000_000;
        assert!(q.validate().unwrap_err().contains("points"));

        let mut q = quiz();
        q.questions[0].points = -1;
        assert!(q.validate().is_err());

        let mut q = quiz();
        let template = q.questions[0].clone();
        q.questions = (0..=MAX_QUESTIONS)
            .map(|i| QuizQuestion { id: format!("q{i}"), ..template.clone() })
            .collect();
        assert!(q.validate().is_err());
    }

    #[test]
    fn huge_points_score_without_overflow() {
        let mut q = quiz();
        q.questions[0].points = 30_000_000;
        q.questions[1].points = i32::MAX;
        let s = q.score(&answers(&[("q1", &[1])]));
        assert_eq!(s.score, 30_000_000);
        assert_eq!(s.max_score, i32::MAX);
        assert_eq!(s.percentage, 1);
        assert!(!s.passed);

        let full = q.score(&answers(&[("q1", &[1]), ("q2", &[0, 2]), ("q3", &[0])]));
        assert_eq!(full.percentage, 100);
        assert!(full.passed);
    }

    #[test]
    fn public_view_hides_answer_key() {
        let view = quiz().public_view();
        let json = serde_json::to_string(&view).unwrap();
        assert!(!json.contains("correct"));
        assert!(view.questions[1].multiple);
        assert!(!view.questions[0].multiple);
    }

    #[test]
    fn attempt_limit() {
        let q = quiz();
        assert!(!q.attempts_exhausted(1));
        assert!(q.attempts_exhausted(2));

        let mut unlimited = quiz();
        unlimited.max_attempts = None;
        assert!(!unlimited.attempts_exhausted(100));
    }
}
