//! # groundcheck-core
//!
//! The retrieval-generation-critique loop: retrieve passages once,
//! then generate and judge in bounded cycles until the judge says
//! CORRECT or the cycle budget runs out.

mod controller;
mod error;
mod generate;
mod prompt;
mod report;
mod turn;

pub use controller::{CritiqueLoop, LoopSettings};
pub use error::TurnError;
pub use generate::Generator;
pub use prompt::{PromptBuilder, RefinementFeedback};
pub use report::{SourceSnippet, TurnReport};
pub use turn::{CycleRecord, TurnContext};
