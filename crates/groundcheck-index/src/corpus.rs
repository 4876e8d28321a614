use std::collections::HashMap;

use crate::error::IndexError;
use crate::index::Hit;
use crate::passage::{Passage, RetrievedPassage, RetrievedSet};

/// Backing store mapping passage ids to full passages.
///
/// Owns the passages; the [`SimilarityIndex`](crate::SimilarityIndex)
/// holds only ids and embeddings and resolves back through here.
/// Read-only after load, safe to share across concurrent turns.
#[derive(Debug, Default)]
pub struct PassageCorpus {
    by_id: HashMap<String, Passage>,
}

impl PassageCorpus {
    pub(crate) fn insert(&mut self, passage: Passage) -> Option<Passage> {
        self.by_id.insert(passage.id.clone(), passage)
    }

    pub fn get(&self, id: &str) -> Option<&Passage> {
        self.by_id.get(id)
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Resolve index hits into a [`RetrievedSet`], preserving order.
    ///
    /// A hit whose id is missing from the corpus means the index and
    /// corpus were built from different snapshots; that is a hard error.
    pub fn resolve(&self, hits: &[Hit]) -> Result<RetrievedSet, IndexError> {
        let mut passages = Vec::with_capacity(hits.len());
        for hit in hits {
            let passage = self
                .get(&hit.id)
                .ok_or_else(|| IndexError::UnknownPassage(hit.id.clone()))?;
            passages.push(RetrievedPassage {
                passage: passage.clone(),
                score: hit.score,
            });
        }
        Ok(RetrievedSet::new(passages))
    }
}
