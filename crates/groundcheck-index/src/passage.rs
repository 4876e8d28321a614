use serde::{Deserialize, Serialize};

/// A segment of source text eligible for retrieval.
///
/// Immutable once indexed. `page` is 1-based, matching how the
/// ingestion pipeline numbers document pages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Passage {
    pub id: String,
    pub text: String,
    pub source_document: String,
    pub page: usize,
    pub embedding: Vec<f32>,
}

/// One retrieval result: a passage plus its similarity to the query.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievedPassage {
    pub passage: Passage,
    pub score: f32,
}

impl RetrievedPassage {
    /// Provenance tag used in prompt context blocks, e.g. `[returns.pdf p.3]`.
    pub fn provenance_tag(&self) -> String {
        format!("[{} p.{}]", self.passage.source_document, self.passage.page)
    }
}

/// Ordered retrieval result for one query.
///
/// Scores are non-increasing; equal scores keep the corpus insertion
/// order. Non-empty for any successful retrieval (an empty index is an
/// error before a `RetrievedSet` ever exists).
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievedSet {
    passages: Vec<RetrievedPassage>,
}

impl RetrievedSet {
    pub(crate) fn new(passages: Vec<RetrievedPassage>) -> Self {
        debug_assert!(
            passages.windows(2).all(|w| w[0].score >= w[1].score),
            "retrieved passages out of order"
        );
        Self { passages }
    }

    pub fn len(&self) -> usize {
        self.passages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.passages.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RetrievedPassage> {
        self.passages.iter()
    }

    /// Highest similarity score in the set.
    pub fn top_score(&self) -> Option<f32> {
        self.passages.first().map(|p| p.score)
    }

    /// Concatenated passage texts with provenance tags, for prompt
    /// context blocks.
    pub fn context_block(&self) -> String {
        self.passages
            .iter()
            .map(|p| format!("{}\n{}", p.provenance_tag(), p.passage.text))
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

impl<'a> IntoIterator for &'a RetrievedSet {
    type Item = &'a RetrievedPassage;
    type IntoIter = std::slice::Iter<'a, RetrievedPassage>;

    fn into_iter(self) -> Self::IntoIter {
        self.passages.iter()
    }
}
