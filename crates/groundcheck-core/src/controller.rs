use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tracing::{info, warn};

use groundcheck_index::{PassageCorpus, SimilarityIndex};
use groundcheck_judge::{JudgeAdapter, JudgeLabel, Verdict, VerdictLabel};
use groundcheck_logging::{LogEvent, Logger};
use groundcheck_model::{EmbeddingService, LanguageModelService};

use crate::error::TurnError;
use crate::generate::Generator;
use crate::prompt::PromptBuilder;
use crate::report::TurnReport;
use crate::turn::{CycleRecord, TurnContext};

const RATIONALE_PREVIEW_CHARS: usize = 120;

/// Explicit loop configuration, passed in at construction.
#[derive(Debug, Clone)]
pub struct LoopSettings {
    /// Passages retrieved per turn
    pub top_k: usize,
    /// Generate/judge round-trips allowed per turn
    pub max_cycles: usize,
}

impl Default for LoopSettings {
    fn default() -> Self {
        Self {
            top_k: 5,
            max_cycles: 3,
        }
    }
}

/// Orchestrates the retrieval-generation-critique loop for one query
/// at a time.
///
/// Holds only shared read-only collaborators, so one instance can be
/// used for concurrent turns, or cheaply constructed per turn; each
/// `ask` call carries its own [`TurnContext`].
pub struct CritiqueLoop<'a> {
    generator: Generator<'a>,
    judge: JudgeAdapter<'a>,
    embedder: &'a dyn EmbeddingService,
    index: &'a SimilarityIndex,
    corpus: &'a PassageCorpus,
    settings: LoopSettings,
    logger: Arc<Logger>,
    interrupted: Arc<AtomicBool>,
}

impl<'a> CritiqueLoop<'a> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        generator: &'a dyn LanguageModelService,
        judge: &'a dyn LanguageModelService,
        embedder: &'a dyn EmbeddingService,
        index: &'a SimilarityIndex,
        corpus: &'a PassageCorpus,
        settings: LoopSettings,
        logger: Arc<Logger>,
    ) -> Self {
        Self {
            generator: Generator::new(generator),
            judge: JudgeAdapter::new(judge),
            embedder,
            index,
            corpus,
            settings,
            logger,
            interrupted: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Get a handle to signal interruption
    pub fn interrupt_handle(&self) -> Arc<AtomicBool> {
        self.interrupted.clone()
    }

    /// Answer one question.
    ///
    /// Retrieval happens exactly once; generation and judging repeat up
    /// to `max_cycles` times. Terminates with either a [`TurnReport`]
    /// (verdict CORRECT or MAX_CYCLES) or a typed [`TurnError`].
    pub async fn ask(&self, question: &str) -> Result<TurnReport, TurnError> {
        self.logger.log(&LogEvent::TurnStarted {
            question: question.to_string(),
            max_cycles: self.settings.max_cycles,
        });

        let embedding = self
            .embedder
            .embed(question)
            .await
            .map_err(TurnError::Embedding)?;
        let hits = self.index.retrieve(&embedding, self.settings.top_k)?;
        let retrieved = self.corpus.resolve(&hits)?;

        self.logger.log(&LogEvent::RetrievalCompleted {
            passages: retrieved.len(),
            top_score: retrieved.top_score(),
        });

        let mut turn = TurnContext::new(question.to_string(), retrieved, self.settings.max_cycles);

        loop {
            if self.interrupted.load(Ordering::SeqCst) {
                info!("Turn interrupted");
                return Err(TurnError::Interrupted);
            }

            match self.run_cycle(&mut turn).await? {
                Some(report) => return Ok(report),
                None => turn.next_cycle(),
            }
        }
    }

    /// Run one generate-then-judge cycle.
    /// Returns Some(report) if the turn terminated, None to continue.
    async fn run_cycle(&self, turn: &mut TurnContext) -> Result<Option<TurnReport>, TurnError> {
        let cycle = turn.cycle;

        // Generating
        self.logger.log(&LogEvent::GenerationStarted {
            cycle,
            refinement: turn.feedback().is_some(),
        });

        let prompt = PromptBuilder::build(&turn.question, &turn.retrieved, turn.feedback());
        let completion = match self.generator.generate(&prompt).await {
            Ok(completion) => completion,
            Err(source) => {
                warn!(cycle, error = %source, "Generation failed");
                self.logger.log(&LogEvent::ErrorEncountered {
                    cycle,
                    error: source.to_string(),
                });
                return Err(TurnError::Generation { cycle, source });
            }
        };
        let answer = completion.text;

        self.logger.log(&LogEvent::GenerationCompleted {
            cycle,
            answer_chars: answer.chars().count(),
            duration_secs: completion.duration.as_secs_f64(),
        });

        // Judging
        self.logger.log(&LogEvent::JudgeStarted { cycle });
        let judge_started = Instant::now();
        let judged = match self
            .judge
            .evaluate(&turn.question, &turn.retrieved, &answer)
            .await
        {
            Ok(judged) => judged,
            Err(source) => {
                warn!(cycle, error = %source, "Judge failed");
                self.logger.log(&LogEvent::ErrorEncountered {
                    cycle,
                    error: source.to_string(),
                });
                return Err(TurnError::Judge { cycle, source });
            }
        };
        let judge_secs = judge_started.elapsed().as_secs_f64();

        // A non-CORRECT verdict on the final cycle is recorded as
        // MAX_CYCLES, keeping the judge's rationale.
        let label = match judged.label {
            JudgeLabel::Correct => VerdictLabel::Correct,
            _ if turn.on_final_cycle() => VerdictLabel::MaxCycles,
            other => VerdictLabel::from(other),
        };
        let verdict = Verdict {
            label,
            rationale: judged.rationale,
            cycle,
        };

        self.logger.log(&LogEvent::JudgeCompleted {
            cycle,
            label: verdict.label.to_string(),
            rationale_preview: verdict
                .rationale
                .chars()
                .take(RATIONALE_PREVIEW_CHARS)
                .collect(),
        });

        let record = CycleRecord {
            cycle,
            answer: answer.clone(),
            verdict: verdict.clone(),
            generation_secs: completion.duration.as_secs_f64(),
            judge_secs,
            timestamp: Utc::now(),
        };

        match verdict.label {
            VerdictLabel::Correct => {
                turn.push_record(record);
                self.logger.log(&LogEvent::TurnResolved {
                    cycles: turn.history.len(),
                    duration_secs: turn.total_duration().as_secs_f64(),
                });
                Ok(Some(TurnReport::from_turn(turn)))
            }
            VerdictLabel::MaxCycles => {
                turn.push_record(record);
                self.logger.log(&LogEvent::MaxCyclesReached {
                    cycles: turn.history.len(),
                    duration_secs: turn.total_duration().as_secs_f64(),
                });
                Ok(Some(TurnReport::from_turn(turn)))
            }
            VerdictLabel::Hallucination | VerdictLabel::Incomplete => {
                turn.set_feedback(answer, verdict);
                turn.push_record(record);
                Ok(None)
            }
        }
    }
}
