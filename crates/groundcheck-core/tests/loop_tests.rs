use std::collections::VecDeque;
use std::io::Write;
use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tempfile::NamedTempFile;

use groundcheck_core::{CritiqueLoop, LoopSettings, TurnError};
use groundcheck_index::{load_passages, IndexError, PassageCorpus, SimilarityIndex};
use groundcheck_judge::{JudgeError, VerdictLabel};
use groundcheck_logging::{LogFormat, Logger};
use groundcheck_model::{
    Completion, EmbeddingService, LanguageModelService, ModelError, ModelConfig,
};

/// Model service that replays a fixed script of responses and records
/// every prompt it was given.
struct ScriptedModel {
    name: String,
    script: Mutex<VecDeque<Result<String, ModelError>>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedModel {
    fn new(name: &str, responses: Vec<Result<&str, ModelError>>) -> Self {
        Self {
            name: name.to_string(),
            script: Mutex::new(
                responses
                    .into_iter()
                    .map(|r| r.map(str::to_string))
                    .collect(),
            ),
            prompts: Mutex::new(Vec::new()),
        }
    }

    fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait]
impl LanguageModelService for ScriptedModel {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, prompt: &str) -> Result<Completion, ModelError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        let next = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(ModelError::EmptyResponse));
        next.map(|text| Completion {
            text,
            duration: Duration::from_millis(5),
        })
    }
}

/// Embedder returning a constant vector, counting calls.
struct FixedEmbedder {
    vector: Vec<f32>,
    calls: Mutex<usize>,
}

impl FixedEmbedder {
    fn new(vector: Vec<f32>) -> Self {
        Self {
            vector,
            calls: Mutex::new(0),
        }
    }

    fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl EmbeddingService for FixedEmbedder {
    fn name(&self) -> &str {
        "fixed"
    }

    async fn embed(&self, _text: &str) -> Result<Vec<f32>, ModelError> {
        *self.calls.lock().unwrap() += 1;
        Ok(self.vector.clone())
    }
}

fn support_index() -> (PassageCorpus, SimilarityIndex) {
    let mut file = NamedTempFile::new().unwrap();
    let lines = [
        r#"{"id":"returns-1","text":"Returns are accepted within 30 days of delivery with the original receipt.","source_document":"returns.pdf","page":2,"embedding":[1.0,0.0]}"#,
        r#"{"id":"shipping-1","text":"Standard shipping takes 3 to 5 business days.","source_document":"shipping.pdf","page":1,"embedding":[0.9,0.1]}"#,
        r#"{"id":"warranty-1","text":"All tents carry a two year warranty against manufacturing defects.","source_document":"warranty.pdf","page":4,"embedding":[0.0,1.0]}"#,
    ];
    for line in lines {
        writeln!(file, "{}", line).unwrap();
    }
    let (corpus, index) = load_passages(file.path()).unwrap();
    (corpus, index)
}

fn empty_index() -> (PassageCorpus, SimilarityIndex) {
    let file = NamedTempFile::new().unwrap();
    load_passages(file.path()).unwrap()
}

fn logger() -> Arc<Logger> {
    Arc::new(Logger::new(LogFormat::Compact))
}

const CORRECT: &str = "LABEL: CORRECT\nRATIONALE: Fully supported by the passages.";
const HALLUCINATION: &str =
    "LABEL: HALLUCINATION\nRATIONALE: The answer invents a free repair service.";
const INCOMPLETE: &str = "LABEL: INCOMPLETE\nRATIONALE: The warranty length was not mentioned.";

#[tokio::test]
async fn single_cycle_correct_resolves() {
    let (corpus, index) = support_index();
    let generator = ScriptedModel::new("gen", vec![Ok("Returns are accepted within 30 days.")]);
    let judge = ScriptedModel::new("judge", vec![Ok(CORRECT)]);
    let embedder = FixedEmbedder::new(vec![1.0, 0.0]);

    let critique = CritiqueLoop::new(
        &generator,
        &judge,
        &embedder,
        &index,
        &corpus,
        LoopSettings::default(),
        logger(),
    );
    let report = critique.ask("What is the return window?").await.unwrap();

    assert_eq!(report.cycle_count, 1);
    assert_eq!(report.verdict.label, VerdictLabel::Correct);
    assert_eq!(report.answer, "Returns are accepted within 30 days.");
    assert!(report.is_resolved());
    assert_eq!(report.exit_code(), 0);
}

#[tokio::test]
async fn recovers_on_third_cycle() {
    let (corpus, index) = support_index();
    let generator = ScriptedModel::new(
        "gen",
        vec![Ok("wrong once"), Ok("wrong twice"), Ok("right at last")],
    );
    let judge = ScriptedModel::new(
        "judge",
        vec![Ok(HALLUCINATION), Ok(HALLUCINATION), Ok(CORRECT)],
    );
    let embedder = FixedEmbedder::new(vec![1.0, 0.0]);

    let critique = CritiqueLoop::new(
        &generator,
        &judge,
        &embedder,
        &index,
        &corpus,
        LoopSettings::default(),
        logger(),
    );
    let report = critique.ask("What is the return window?").await.unwrap();

    assert_eq!(report.cycle_count, 3);
    assert_eq!(report.verdict.label, VerdictLabel::Correct);
    assert_eq!(report.answer, "right at last");
    assert_eq!(report.cycles.len(), 3);
    assert_eq!(report.cycles[0].verdict.label, VerdictLabel::Hallucination);
    assert_eq!(report.cycles[1].verdict.label, VerdictLabel::Hallucination);
    assert_eq!(report.cycles[2].verdict.label, VerdictLabel::Correct);
}

#[tokio::test]
async fn exhausts_cycle_budget() {
    let (corpus, index) = support_index();
    let generator = ScriptedModel::new("gen", vec![Ok("try 1"), Ok("try 2"), Ok("try 3")]);
    let judge = ScriptedModel::new(
        "judge",
        vec![Ok(INCOMPLETE), Ok(INCOMPLETE), Ok(INCOMPLETE)],
    );
    let embedder = FixedEmbedder::new(vec![1.0, 0.0]);

    let critique = CritiqueLoop::new(
        &generator,
        &judge,
        &embedder,
        &index,
        &corpus,
        LoopSettings::default(),
        logger(),
    );
    let report = critique.ask("What warranty do tents have?").await.unwrap();

    assert_eq!(report.cycle_count, 3);
    assert_eq!(report.verdict.label, VerdictLabel::MaxCycles);
    // The judge's rationale survives the label overwrite.
    assert_eq!(report.verdict.rationale, "The warranty length was not mentioned.");
    assert_eq!(report.verdict.cycle, 3);
    assert!(!report.is_resolved());
    assert_eq!(report.exit_code(), 1);
    // Earlier cycles keep their original labels.
    assert_eq!(report.cycles[0].verdict.label, VerdictLabel::Incomplete);
    assert_eq!(report.cycles[1].verdict.label, VerdictLabel::Incomplete);
}

#[tokio::test]
async fn empty_index_fails_before_generation() {
    let (corpus, index) = empty_index();
    let generator = ScriptedModel::new("gen", vec![Ok("never used")]);
    let judge = ScriptedModel::new("judge", vec![Ok(CORRECT)]);
    let embedder = FixedEmbedder::new(vec![1.0, 0.0]);

    let critique = CritiqueLoop::new(
        &generator,
        &judge,
        &embedder,
        &index,
        &corpus,
        LoopSettings::default(),
        logger(),
    );
    let result = critique.ask("Anything?").await;

    assert!(matches!(
        result,
        Err(TurnError::Retrieval(IndexError::Unavailable))
    ));
    assert_eq!(generator.calls(), 0);
    assert_eq!(judge.calls(), 0);
}

#[tokio::test]
async fn generation_timeout_aborts_the_turn() {
    let (corpus, index) = support_index();
    let generator = ScriptedModel::new(
        "gen",
        vec![
            Ok("first attempt"),
            Err(ModelError::Timeout(Duration::from_secs(120))),
        ],
    );
    let judge = ScriptedModel::new("judge", vec![Ok(INCOMPLETE), Ok(CORRECT)]);
    let embedder = FixedEmbedder::new(vec![1.0, 0.0]);

    let critique = CritiqueLoop::new(
        &generator,
        &judge,
        &embedder,
        &index,
        &corpus,
        LoopSettings::default(),
        logger(),
    );
    let result = critique.ask("What is the return window?").await;

    match result {
        Err(TurnError::Generation {
            cycle,
            source: ModelError::Timeout(_),
        }) => assert_eq!(cycle, 2),
        other => panic!("expected generation failure on cycle 2, got {:?}", other.map(|r| r.cycle_count)),
    }
    // No second verdict was recorded: the judge ran only for cycle 1.
    assert_eq!(judge.calls(), 1);
}

#[tokio::test]
async fn judge_failure_aborts_the_turn() {
    let (corpus, index) = support_index();
    let generator = ScriptedModel::new("gen", vec![Ok("an answer")]);
    let judge = ScriptedModel::new("judge", vec![Ok("I have no opinion on this.")]);
    let embedder = FixedEmbedder::new(vec![1.0, 0.0]);

    let critique = CritiqueLoop::new(
        &generator,
        &judge,
        &embedder,
        &index,
        &corpus,
        LoopSettings::default(),
        logger(),
    );
    let result = critique.ask("What is the return window?").await;

    assert!(matches!(
        result,
        Err(TurnError::Judge {
            cycle: 1,
            source: JudgeError::Unparseable(_),
        })
    ));
}

#[tokio::test]
async fn feedback_reaches_the_next_generation_prompt() {
    let (corpus, index) = support_index();
    let generator = ScriptedModel::new("gen", vec![Ok("thin answer"), Ok("full answer")]);
    let judge = ScriptedModel::new("judge", vec![Ok(INCOMPLETE), Ok(CORRECT)]);
    let embedder = FixedEmbedder::new(vec![1.0, 0.0]);

    let critique = CritiqueLoop::new(
        &generator,
        &judge,
        &embedder,
        &index,
        &corpus,
        LoopSettings::default(),
        logger(),
    );
    let report = critique.ask("What warranty do tents have?").await.unwrap();
    assert_eq!(report.cycle_count, 2);

    let prompts = generator.prompts();
    assert_eq!(prompts.len(), 2);
    assert!(!prompts[0].contains("Judge Feedback"));
    assert!(prompts[1].contains("The warranty length was not mentioned."));
    assert!(prompts[1].contains("## Previous Answer\nthin answer"));
    assert!(prompts[1].contains("Extend the answer"));
}

#[tokio::test]
async fn retrieval_happens_exactly_once_per_turn() {
    let (corpus, index) = support_index();
    let generator = ScriptedModel::new("gen", vec![Ok("a"), Ok("b"), Ok("c")]);
    let judge = ScriptedModel::new(
        "judge",
        vec![Ok(HALLUCINATION), Ok(INCOMPLETE), Ok(CORRECT)],
    );
    let embedder = FixedEmbedder::new(vec![1.0, 0.0]);

    let critique = CritiqueLoop::new(
        &generator,
        &judge,
        &embedder,
        &index,
        &corpus,
        LoopSettings::default(),
        logger(),
    );
    let report = critique.ask("q").await.unwrap();

    assert_eq!(report.cycle_count, 3);
    assert_eq!(embedder.calls(), 1);
}

async fn run_scripted_turn(
    corpus: &PassageCorpus,
    index: &SimilarityIndex,
    embedder: &FixedEmbedder,
    gen_script: Vec<Result<&'static str, ModelError>>,
    judge_script: Vec<Result<&'static str, ModelError>>,
) -> groundcheck_core::TurnReport {
    let generator = ScriptedModel::new("gen", gen_script);
    let judge = ScriptedModel::new("judge", judge_script);
    let critique = CritiqueLoop::new(
        &generator,
        &judge,
        embedder,
        index,
        corpus,
        LoopSettings::default(),
        logger(),
    );
    critique.ask("What is the return window?").await.unwrap()
}

#[tokio::test]
async fn identical_inputs_reproduce_the_same_turn() {
    let (corpus, index) = support_index();
    let embedder = FixedEmbedder::new(vec![1.0, 0.0]);

    let first = run_scripted_turn(
        &corpus,
        &index,
        &embedder,
        vec![Ok("a"), Ok("b")],
        vec![Ok(INCOMPLETE), Ok(CORRECT)],
    )
    .await;
    let second = run_scripted_turn(
        &corpus,
        &index,
        &embedder,
        vec![Ok("a"), Ok("b")],
        vec![Ok(INCOMPLETE), Ok(CORRECT)],
    )
    .await;

    assert_eq!(first.answer, second.answer);
    assert_eq!(first.cycle_count, second.cycle_count);
    assert_eq!(
        first.cycles.iter().map(|c| &c.verdict).collect::<Vec<_>>(),
        second.cycles.iter().map(|c| &c.verdict).collect::<Vec<_>>()
    );
    let sources = |r: &groundcheck_core::TurnReport| {
        r.sources
            .iter()
            .map(|s| (s.source_document.clone(), s.page))
            .collect::<Vec<_>>()
    };
    assert_eq!(sources(&first), sources(&second));
}

#[tokio::test]
async fn sources_carry_provenance_and_order() {
    let (corpus, index) = support_index();
    let generator = ScriptedModel::new("gen", vec![Ok("answer")]);
    let judge = ScriptedModel::new("judge", vec![Ok(CORRECT)]);
    let embedder = FixedEmbedder::new(vec![1.0, 0.0]);

    let critique = CritiqueLoop::new(
        &generator,
        &judge,
        &embedder,
        &index,
        &corpus,
        LoopSettings {
            top_k: 2,
            max_cycles: 3,
        },
        logger(),
    );
    let report = critique.ask("What is the return window?").await.unwrap();

    assert_eq!(report.sources.len(), 2);
    // [1,0] query: returns-1 is closest, shipping-1 second.
    assert_eq!(report.sources[0].source_document, "returns.pdf");
    assert_eq!(report.sources[0].page, 2);
    assert_eq!(report.sources[1].source_document, "shipping.pdf");
    assert!(report.sources[0].score >= report.sources[1].score);
}

#[tokio::test]
async fn interrupt_aborts_before_the_next_cycle() {
    let (corpus, index) = support_index();
    let generator = ScriptedModel::new("gen", vec![Ok("unused")]);
    let judge = ScriptedModel::new("judge", vec![Ok(CORRECT)]);
    let embedder = FixedEmbedder::new(vec![1.0, 0.0]);

    let critique = CritiqueLoop::new(
        &generator,
        &judge,
        &embedder,
        &index,
        &corpus,
        LoopSettings::default(),
        logger(),
    );
    critique.interrupt_handle().store(true, Ordering::SeqCst);

    let result = critique.ask("q").await;
    assert!(matches!(result, Err(TurnError::Interrupted)));
    assert_eq!(generator.calls(), 0);
}

#[test]
fn model_config_defaults_are_sane() {
    let config = ModelConfig::new("http://localhost:11434", "gemma3:1b");
    assert_eq!(config.temperature, 0.1);
    assert_eq!(config.timeout, Duration::from_secs(120));
}
