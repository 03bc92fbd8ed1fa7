use std::sync::Arc;

use serde::Serialize;

use crate::degraded::{DegradedReview, review_for_scaffold};
use crate::error::GradingResult;
use crate::execution::ExecutionClient;
use crate::extract;
use crate::template::{TemplateStore, compose};
use crate::validator::{self, ScoreReport};

/// What the learner gets back for a submission
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GradingOutcome {
    Scored(ScoreReport),
    Degraded(DegradedReview),
}

/// Entry point of the grading core for the assessment layer
pub struct Grader {
    store: Arc<dyn TemplateStore>,
    client: ExecutionClient,
}

impl Grader {
    pub fn new(store: Arc<dyn TemplateStore>, client: ExecutionClient) -> Self {
        Self { store, client }
    }

    /// Learner-authored part of `raw_submission` for the given question
    pub fn extract_fragment(&self, question_id: u32, raw_submission: &str) -> GradingResult<String> {
        let scaffold = self.store.get_scaffold(question_id)?;
        Ok(extract::extract_fragment(raw_submission, &scaffold))
    }

    /// Grades a submission end to end.
    ///
    /// Only an unknown question or a malformed scaffold is returned as an
    /// error. An unusable execution service yields a heuristic review, and
    /// every other execution failure a zero-score report explaining it.
    pub async fn execute_and_score(
        &self,
        question_id: u32,
        submission: &str,
    ) -> GradingResult<GradingOutcome> {
        let scaffold = self.store.get_scaffold(question_id)?;
        let test_cases = self.store.get_test_cases(question_id)?;

        let fragment = extract::extract_fragment(submission, &scaffold);
        log::debug!(
            "Question {question_id}: extracted {} of {} submitted bytes",
            fragment.len(),
            submission.len()
        );
        let program = compose(&scaffold, &fragment)?;

        if let Err(e) = self.client.ensure_configured() {
            log::warn!("Question {question_id}: reviewing heuristically, {e}");
            return Ok(GradingOutcome::Degraded(review_for_scaffold(&fragment, &scaffold)));
        }

        match validator::validate(&self.client, &program, &test_cases).await {
            Ok(report) => {
                log::info!(
                    "Question {question_id}: {}/{} test cases passed ({}%)",
                    report.passed_count,
                    report.total_count,
                    report.percentage
                );
                Ok(GradingOutcome::Scored(report))
            }
            Err(e) if e.is_degradable() => {
                log::warn!("Question {question_id}: execution service unreachable, {e}");
                Ok(GradingOutcome::Degraded(review_for_scaffold(&fragment, &scaffold)))
            }
            Err(e) => {
                log::error!("Question {question_id}: grading failed: {e}");
                Ok(GradingOutcome::Scored(ScoreReport::from_error(&e)))
            }
        }
    }
}
