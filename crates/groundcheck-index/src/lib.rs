//! # groundcheck-index
//!
//! Read-only passage retrieval for the groundcheck critique loop.
//!
//! The index is built offline by an ingestion pipeline and loaded here
//! from a JSONL file, one passage per line. After loading, nothing in
//! this crate mutates it; concurrent turns share it behind a plain
//! reference.
//!
//! ## Key Types
//!
//! - [`Passage`] - A chunk of source text with provenance
//! - [`PassageCorpus`] - Lookup from passage id to full passage
//! - [`SimilarityIndex`] - Nearest-neighbor search over embeddings
//! - [`RetrievedSet`] - Ordered retrieval result for one query

mod corpus;
mod error;
mod index;
mod passage;
mod store;

pub use corpus::PassageCorpus;
pub use error::IndexError;
pub use index::{Hit, SimilarityIndex};
pub use passage::{Passage, RetrievedPassage, RetrievedSet};
pub use store::load_passages;
