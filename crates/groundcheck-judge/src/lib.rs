//! # groundcheck-judge
//!
//! Independent judging of generated answers against retrieved
//! evidence.
//!
//! The judge is a second language model asked to classify an answer as
//! CORRECT, HALLUCINATION, or INCOMPLETE with a rationale. Parsing is
//! strict: any response that does not map to exactly one label is a
//! judge failure, never silently coerced.

mod adapter;
mod prompts;
mod verdict;

pub use adapter::{JudgeAdapter, JudgeError};
pub use prompts::JudgePrompts;
pub use verdict::{JudgeLabel, JudgeVerdict, Verdict, VerdictLabel, VerdictParseError};
