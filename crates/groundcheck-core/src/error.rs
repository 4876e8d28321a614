use groundcheck_index::IndexError;
use groundcheck_judge::JudgeError;
use groundcheck_model::ModelError;
use thiserror::Error;

/// Failures that abort a turn.
///
/// Every variant propagates to the caller as-is; there is no fallback
/// answer and no internal retry. `MAX_CYCLES` is not here: an exhausted
/// cycle budget is a normal outcome carried on the
/// [`TurnReport`](crate::TurnReport).
#[derive(Error, Debug)]
pub enum TurnError {
    #[error("Retrieval failed: {0}")]
    Retrieval(#[from] IndexError),

    #[error("Query embedding failed: {0}")]
    Embedding(#[source] ModelError),

    #[error("Generation failed on cycle {cycle}: {source}")]
    Generation {
        cycle: usize,
        #[source]
        source: ModelError,
    },

    #[error("Judge failed on cycle {cycle}: {source}")]
    Judge {
        cycle: usize,
        #[source]
        source: JudgeError,
    },

    #[error("Turn was interrupted")]
    Interrupted,
}
