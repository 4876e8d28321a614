use groundcheck_model::{Completion, LanguageModelService, ModelError};
use tracing::debug;

/// Adapter that runs the generator model over one prompt.
///
/// Deliberately thin: no sampling parameters beyond what the service
/// was configured with, and no retries. A failed call belongs to the
/// controller, which ends the turn.
pub struct Generator<'a> {
    service: &'a dyn LanguageModelService,
}

impl<'a> Generator<'a> {
    pub fn new(service: &'a dyn LanguageModelService) -> Self {
        Self { service }
    }

    pub fn name(&self) -> &str {
        self.service.name()
    }

    pub async fn generate(&self, prompt: &str) -> Result<Completion, ModelError> {
        debug!(
            generator = self.service.name(),
            prompt_chars = prompt.len(),
            "Running generation"
        );
        self.service.complete(prompt).await
    }
}
