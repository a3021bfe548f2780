pub mod scales;

use crate::storage::{EvalLog, EvalLogError};
use log::info;

pub const COMMENTS_ATTRIBUTE: &str = "eval_comments";

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum EvaluationError {
    #[error("{criterion} score must be between 1 and 5, got {score}")]
    ScoreOutOfRange { criterion: &'static str, score: u8 },
}

/// One human evaluation of a generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    /// Scores in `scales::ALL` order.
    scores: [u8; 4],
    comments: String,
}

impl Evaluation {
    pub fn new(scores: [u8; 4], comments: impl Into<String>) -> Result<Self, EvaluationError> {
        for (scale, score) in scales::ALL.iter().zip(scores) {
            if !(1..=5).contains(&score) {
                return Err(EvaluationError::ScoreOutOfRange {
                    criterion: scale.title,
                    score,
                });
            }
        }
        Ok(Self {
            scores,
            comments: comments.into().trim().to_string(),
        })
    }

    pub fn scores(&self) -> [u8; 4] {
        self.scores
    }

    pub fn attributes(&self) -> Vec<(&'static str, String)> {
        let mut attrs: Vec<(&'static str, String)> = scales::ALL
            .iter()
            .zip(self.scores)
            .map(|(scale, score)| (scale.attribute, score.to_string()))
            .collect();
        attrs.push((COMMENTS_ATTRIBUTE, self.comments.clone()));
        attrs
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved,
    NoTarget,
}

impl SaveOutcome {
    pub fn message(&self) -> &'static str {
        match self {
            SaveOutcome::Saved => "✓ Evaluation saved",
            SaveOutcome::NoTarget => "No generation to evaluate.",
        }
    }
}

/// Appends an evaluation for `job_id`. Without a selected job nothing is
/// written.
pub fn save_evaluation(
    log: &EvalLog,
    job_id: Option<&str>,
    evaluation: &Evaluation,
) -> Result<SaveOutcome, EvalLogError> {
    let Some(id) = job_id.filter(|id| !id.is_empty()) else {
        return Ok(SaveOutcome::NoTarget);
    };
    log.append(id, &evaluation.attributes())?;
    info!("evaluation saved for {}: {:?}", id, evaluation.scores());
    Ok(SaveOutcome::Saved)
}
