use groundcheck_index::RetrievedSet;

/// Prompt templates for the judge model.
pub struct JudgePrompts;

impl JudgePrompts {
    /// Build the evaluation prompt for one answer.
    ///
    /// The judge sees exactly what the generator saw: the retrieved
    /// passages, never outside knowledge. The label rules restate the
    /// verdict contract so the model's choice maps onto
    /// [`JudgeLabel`](crate::JudgeLabel) semantics.
    pub fn build_evaluation_prompt(
        question: &str,
        retrieved: &RetrievedSet,
        answer: &str,
    ) -> String {
        format!(
            r#"You are an impartial judge. Evaluate whether the assistant's answer to the user's question is supported by the context passages.

Label rules:
- CORRECT: every factual claim in the answer is supported by the context, and the answer addresses all parts of the question.
- HALLUCINATION: the answer contains at least one claim that is not supported by, or is contradicted by, the context.
- INCOMPLETE: every claim is supported, but the question is only partially addressed.

Reply in exactly this format and nothing else:

LABEL: <CORRECT | HALLUCINATION | INCOMPLETE>
RATIONALE: <one or two sentences naming the unsupported claim or the missing part, or why the answer is correct>

=== CONTEXT ===
{context}

=== QUESTION ===
{question}

=== ASSISTANT ANSWER ===
{answer}
"#,
            context = retrieved.context_block(),
            question = question,
            answer = answer,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use groundcheck_index::{load_passages, RetrievedSet};
    use std::io::Write;

    fn sample_retrieved() -> RetrievedSet {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"{{"id":"r1","text":"Returns are accepted within 30 days.","source_document":"returns.pdf","page":2,"embedding":[1.0]}}"#
        )
        .unwrap();
        let (corpus, index) = load_passages(file.path()).unwrap();
        let hits = index.retrieve(&[1.0], 1).unwrap();
        corpus.resolve(&hits).unwrap()
    }

    #[test]
    fn test_prompt_carries_context_question_and_answer() {
        let retrieved = sample_retrieved();
        let prompt = JudgePrompts::build_evaluation_prompt(
            "What is the return window?",
            &retrieved,
            "30 days.",
        );

        assert!(prompt.contains("[returns.pdf p.2]"));
        assert!(prompt.contains("Returns are accepted within 30 days."));
        assert!(prompt.contains("What is the return window?"));
        assert!(prompt.contains("=== ASSISTANT ANSWER ===\n30 days."));
    }
}
