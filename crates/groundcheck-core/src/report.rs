use groundcheck_index::{RetrievedPassage, RetrievedSet};
use groundcheck_judge::{Verdict, VerdictLabel};
use serde::Serialize;

use crate::turn::{CycleRecord, TurnContext};

/// Leading characters of a passage kept on the report.
const SNIPPET_CHARS: usize = 300;

/// Provenance-bearing excerpt of one retrieved passage.
#[derive(Debug, Clone, Serialize)]
pub struct SourceSnippet {
    pub text: String,
    pub source_document: String,
    pub page: usize,
    pub score: f32,
}

impl From<&RetrievedPassage> for SourceSnippet {
    fn from(retrieved: &RetrievedPassage) -> Self {
        let text: String = retrieved.passage.text.chars().take(SNIPPET_CHARS).collect();
        Self {
            text,
            source_document: retrieved.passage.source_document.clone(),
            page: retrieved.passage.page,
            score: retrieved.score,
        }
    }
}

/// Final result of one turn.
///
/// Exists for both terminal states: `CORRECT` (resolved) and
/// `MAX_CYCLES` (budget exhausted without a correct verdict). Failures
/// never produce a report, they propagate as
/// [`TurnError`](crate::TurnError).
#[derive(Debug, Serialize)]
pub struct TurnReport {
    pub question: String,
    /// The final generated answer
    pub answer: String,
    /// The final recorded verdict
    pub verdict: Verdict,
    pub cycle_count: usize,
    pub cycles: Vec<CycleRecord>,
    pub sources: Vec<SourceSnippet>,
    pub duration_secs: f64,
}

impl TurnReport {
    /// Build the report from a finished turn. The last history entry
    /// carries the terminal verdict.
    pub(crate) fn from_turn(turn: &TurnContext) -> Self {
        let last = turn
            .history
            .last()
            .expect("finished turn has at least one cycle");
        Self {
            question: turn.question.clone(),
            answer: last.answer.clone(),
            verdict: last.verdict.clone(),
            cycle_count: turn.history.len(),
            cycles: turn.history.clone(),
            sources: sources_of(&turn.retrieved),
            duration_secs: turn.total_duration().as_secs_f64(),
        }
    }

    /// Whether the judge accepted an answer within the budget.
    pub fn is_resolved(&self) -> bool {
        self.verdict.label == VerdictLabel::Correct
    }

    pub fn exit_code(&self) -> i32 {
        if self.is_resolved() {
            0
        } else {
            1
        }
    }
}

fn sources_of(retrieved: &RetrievedSet) -> Vec<SourceSnippet> {
    retrieved.iter().map(SourceSnippet::from).collect()
}
