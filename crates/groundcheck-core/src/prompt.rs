use groundcheck_index::RetrievedSet;
use groundcheck_judge::{Verdict, VerdictLabel};

const SYSTEM_TEMPLATE: &str = "You are a customer support assistant for Everstorm Outfitters.
Use only the information in <context> to answer.

Rules:
1) Use ONLY the provided <context> to answer.
2) If the answer is not in the context, say:
   \"I don't know based on the retrieved documents.\"
3) Be concise and accurate. Prefer quoting key phrases from the context.";

/// Feedback carried from one cycle into the next generation prompt.
#[derive(Debug, Clone)]
pub struct RefinementFeedback {
    pub prior_answer: String,
    pub verdict: Verdict,
}

impl RefinementFeedback {
    /// Corrective instruction matching the judge's complaint.
    fn instruction(&self) -> &'static str {
        match self.verdict.label {
            VerdictLabel::Hallucination => {
                "Rewrite the answer, removing or correcting every claim that is not supported by the context."
            }
            VerdictLabel::Incomplete => {
                "Extend the answer to address the parts of the question the previous answer missed, still using only the context."
            }
            // Other labels never reach the prompt builder as feedback.
            _ => "Rewrite the answer so it is fully supported by the context and addresses the whole question.",
        }
    }
}

/// Assembles generation prompts.
///
/// Pure and deterministic: identical inputs produce identical prompt
/// text, which is what makes turn replay reproducible.
pub struct PromptBuilder;

impl PromptBuilder {
    /// Build the generation prompt for one cycle.
    ///
    /// First cycle: instruction + context + question. Refinement
    /// cycles additionally carry the prior answer, the judge's
    /// rationale, and a label-specific corrective instruction.
    pub fn build(
        question: &str,
        retrieved: &RetrievedSet,
        feedback: Option<&RefinementFeedback>,
    ) -> String {
        let mut prompt = format!(
            "{system}\n\n<context>\n{context}\n</context>\n\nUser question: {question}\n",
            system = SYSTEM_TEMPLATE,
            context = retrieved.context_block(),
            question = question,
        );

        if let Some(feedback) = feedback {
            prompt.push_str(&format!(
                "\n## Previous Answer\n{answer}\n\n## Judge Feedback ({label})\n{rationale}\n\n{instruction}\n",
                answer = feedback.prior_answer,
                label = feedback.verdict.label,
                rationale = feedback.verdict.rationale,
                instruction = feedback.instruction(),
            ));
        }

        prompt
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use groundcheck_index::load_passages;
    use std::io::Write;

    fn sample_retrieved() -> RetrievedSet {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"{{"id":"s1","text":"Orders ship within 2 business days.","source_document":"shipping.pdf","page":1,"embedding":[1.0]}}"#
        )
        .unwrap();
        let (corpus, index) = load_passages(file.path()).unwrap();
        let hits = index.retrieve(&[1.0], 1).unwrap();
        corpus.resolve(&hits).unwrap()
    }

    #[test]
    fn test_first_cycle_prompt() {
        let retrieved = sample_retrieved();
        let prompt = PromptBuilder::build("When does my order ship?", &retrieved, None);

        assert!(prompt.contains("Use ONLY the provided <context>"));
        assert!(prompt.contains("[shipping.pdf p.1]\nOrders ship within 2 business days."));
        assert!(prompt.contains("User question: When does my order ship?"));
        assert!(!prompt.contains("Previous Answer"));
    }

    #[test]
    fn test_refinement_prompt_carries_rationale_and_instruction() {
        let retrieved = sample_retrieved();
        let feedback = RefinementFeedback {
            prior_answer: "Ships same day.".to_string(),
            verdict: Verdict {
                label: VerdictLabel::Hallucination,
                rationale: "The context says 2 business days, not same day.".to_string(),
                cycle: 1,
            },
        };
        let prompt = PromptBuilder::build("When does my order ship?", &retrieved, Some(&feedback));

        assert!(prompt.contains("## Previous Answer\nShips same day."));
        assert!(prompt.contains("## Judge Feedback (HALLUCINATION)"));
        assert!(prompt.contains("The context says 2 business days, not same day."));
        assert!(prompt.contains("removing or correcting every claim"));
    }

    #[test]
    fn test_incomplete_feedback_asks_for_coverage() {
        let retrieved = sample_retrieved();
        let feedback = RefinementFeedback {
            prior_answer: "Within 2 business days.".to_string(),
            verdict: Verdict {
                label: VerdictLabel::Incomplete,
                rationale: "Did not address international orders.".to_string(),
                cycle: 1,
            },
        };
        let prompt = PromptBuilder::build(
            "When do domestic and international orders ship?",
            &retrieved,
            Some(&feedback),
        );
        assert!(prompt.contains("Extend the answer"));
    }

    #[test]
    fn test_deterministic() {
        let retrieved = sample_retrieved();
        let a = PromptBuilder::build("q", &retrieved, None);
        let b = PromptBuilder::build("q", &retrieved, None);
        assert_eq!(a, b);
    }
}
