use groundcheck_index::RetrievedSet;
use groundcheck_model::{LanguageModelService, ModelError};
use tracing::{debug, info};

use crate::prompts::JudgePrompts;
use crate::verdict::{JudgeVerdict, VerdictParseError};

#[derive(Debug, thiserror::Error)]
pub enum JudgeError {
    #[error("Judge model call failed: {0}")]
    Service(#[from] ModelError),

    #[error("Unparseable judge verdict: {0}")]
    Unparseable(#[from] VerdictParseError),
}

/// Adapter that runs the judge model over one answer.
///
/// Holds the service by reference; one adapter serves every cycle of a
/// turn.
pub struct JudgeAdapter<'a> {
    service: &'a dyn LanguageModelService,
}

impl<'a> JudgeAdapter<'a> {
    pub fn new(service: &'a dyn LanguageModelService) -> Self {
        Self { service }
    }

    /// Classify `answer` against the retrieved evidence.
    ///
    /// Returns the raw judge verdict without a cycle number; the loop
    /// controller assigns that. Both transport failures and verdicts
    /// that do not parse abort the turn as a [`JudgeError`].
    pub async fn evaluate(
        &self,
        question: &str,
        retrieved: &RetrievedSet,
        answer: &str,
    ) -> Result<JudgeVerdict, JudgeError> {
        let prompt = JudgePrompts::build_evaluation_prompt(question, retrieved, answer);
        debug!(
            judge = self.service.name(),
            prompt_chars = prompt.len(),
            "Running judge evaluation"
        );

        let completion = self.service.complete(&prompt).await?;
        let verdict = JudgeVerdict::parse(&completion.text)?;

        info!(
            judge = self.service.name(),
            label = %verdict.label,
            duration_secs = completion.duration.as_secs_f64(),
            "Judge verdict"
        );
        Ok(verdict)
    }
}
