use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use groundcheck_index::RetrievedSet;
use groundcheck_judge::Verdict;
use serde::{Deserialize, Serialize};

use crate::prompt::RefinementFeedback;

/// Record of one generate-then-judge cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CycleRecord {
    pub cycle: usize,
    pub answer: String,
    pub verdict: Verdict,
    pub generation_secs: f64,
    pub judge_secs: f64,
    pub timestamp: DateTime<Utc>,
}

/// Mutable state of one turn while the critique loop runs.
///
/// Retrieval happens exactly once, before the first cycle; only the
/// cycle history and feedback change afterwards. Dropped at end of
/// request, never persisted by the core.
#[derive(Debug)]
pub struct TurnContext {
    pub question: String,
    pub retrieved: RetrievedSet,
    /// Current cycle number, 1-based
    pub cycle: usize,
    pub history: Vec<CycleRecord>,
    started_at: Instant,
    max_cycles: usize,
    last_feedback: Option<RefinementFeedback>,
}

impl TurnContext {
    pub fn new(question: String, retrieved: RetrievedSet, max_cycles: usize) -> Self {
        Self {
            question,
            retrieved,
            cycle: 1,
            history: Vec::new(),
            started_at: Instant::now(),
            max_cycles,
            last_feedback: None,
        }
    }

    pub fn max_cycles(&self) -> usize {
        self.max_cycles
    }

    /// Whether the current cycle is the last one the budget allows.
    pub fn on_final_cycle(&self) -> bool {
        self.cycle >= self.max_cycles
    }

    pub fn next_cycle(&mut self) {
        self.cycle += 1;
    }

    pub fn push_record(&mut self, record: CycleRecord) {
        self.history.push(record);
    }

    /// Feedback from the immediately preceding cycle, if any.
    pub fn feedback(&self) -> Option<&RefinementFeedback> {
        self.last_feedback.as_ref()
    }

    pub fn set_feedback(&mut self, prior_answer: String, verdict: Verdict) {
        self.last_feedback = Some(RefinementFeedback {
            prior_answer,
            verdict,
        });
    }

    pub fn total_duration(&self) -> Duration {
        self.started_at.elapsed()
    }
}
