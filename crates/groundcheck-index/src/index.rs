use std::cmp::Ordering;

use tracing::debug;

use crate::error::IndexError;

/// A nearest-neighbor match from the index.
#[derive(Debug, Clone, PartialEq)]
pub struct Hit {
    pub id: String,
    pub score: f32,
}

/// Nearest-neighbor lookup over passage embeddings.
///
/// Holds passage ids and embeddings only; full passages live in the
/// [`PassageCorpus`](crate::PassageCorpus). Entries keep corpus
/// insertion order, which is also the tie-break order for equal
/// similarity scores.
#[derive(Debug)]
pub struct SimilarityIndex {
    entries: Vec<(String, Vec<f32>)>,
    dimension: usize,
}

impl SimilarityIndex {
    pub(crate) fn new(dimension: usize) -> Self {
        Self {
            entries: Vec::new(),
            dimension,
        }
    }

    pub(crate) fn push(&mut self, id: String, embedding: Vec<f32>) {
        debug_assert_eq!(embedding.len(), self.dimension);
        self.entries.push((id, embedding));
    }

    /// Embedding dimensionality fixed at load time.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Top-k passages by cosine similarity to `query_embedding`.
    ///
    /// Returns `min(k, len)` hits ordered by non-increasing score, ties
    /// broken by insertion order. Read-only; no side effects.
    pub fn retrieve(&self, query_embedding: &[f32], k: usize) -> Result<Vec<Hit>, IndexError> {
        if k == 0 {
            return Err(IndexError::InvalidTopK);
        }
        if self.entries.is_empty() {
            return Err(IndexError::Unavailable);
        }
        if query_embedding.len() != self.dimension {
            return Err(IndexError::DimensionMismatch {
                expected: self.dimension,
                actual: query_embedding.len(),
            });
        }

        let mut hits: Vec<Hit> = self
            .entries
            .iter()
            .map(|(id, embedding)| Hit {
                id: id.clone(),
                score: cosine_similarity(query_embedding, embedding),
            })
            .collect();

        // Stable sort: equal scores keep insertion order.
        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        hits.truncate(k);

        debug!(
            requested = k,
            returned = hits.len(),
            top_score = hits.first().map(|h| h.score),
            "Retrieved nearest passages"
        );
        Ok(hits)
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index_with(embeddings: &[&[f32]]) -> SimilarityIndex {
        let mut index = SimilarityIndex::new(embeddings[0].len());
        for (i, e) in embeddings.iter().enumerate() {
            index.push(format!("p{}", i), e.to_vec());
        }
        index
    }

    #[test]
    fn test_retrieve_orders_by_descending_similarity() {
        let index = index_with(&[&[0.0, 1.0], &[1.0, 0.0], &[0.7, 0.7]]);
        let hits = index.retrieve(&[1.0, 0.0], 3).unwrap();

        assert_eq!(hits.len(), 3);
        assert_eq!(hits[0].id, "p1");
        assert_eq!(hits[1].id, "p2");
        assert_eq!(hits[2].id, "p0");
        assert!(hits.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[test]
    fn test_retrieve_returns_min_of_k_and_index_size() {
        let index = index_with(&[&[1.0, 0.0], &[0.0, 1.0]]);
        assert_eq!(index.retrieve(&[1.0, 0.0], 10).unwrap().len(), 2);
        assert_eq!(index.retrieve(&[1.0, 0.0], 1).unwrap().len(), 1);
    }

    #[test]
    fn test_equal_scores_keep_insertion_order() {
        // Same vector three times: identical scores for every entry.
        let index = index_with(&[&[1.0, 0.0], &[1.0, 0.0], &[1.0, 0.0]]);
        let hits = index.retrieve(&[1.0, 0.0], 3).unwrap();
        let ids: Vec<&str> = hits.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids, vec!["p0", "p1", "p2"]);
    }

    #[test]
    fn test_empty_index_is_unavailable() {
        let index = SimilarityIndex::new(2);
        assert!(matches!(
            index.retrieve(&[1.0, 0.0], 5),
            Err(IndexError::Unavailable)
        ));
    }

    #[test]
    fn test_dimension_mismatch() {
        let index = index_with(&[&[1.0, 0.0]]);
        let result = index.retrieve(&[1.0, 0.0, 0.0], 1);
        assert!(matches!(
            result,
            Err(IndexError::DimensionMismatch {
                expected: 2,
                actual: 3
            })
        ));
    }

    #[test]
    fn test_zero_k_rejected() {
        let index = index_with(&[&[1.0, 0.0]]);
        assert!(matches!(
            index.retrieve(&[1.0, 0.0], 0),
            Err(IndexError::InvalidTopK)
        ));
    }

    #[test]
    fn test_zero_vector_scores_zero() {
        let index = index_with(&[&[0.0, 0.0], &[1.0, 0.0]]);
        let hits = index.retrieve(&[1.0, 0.0], 2).unwrap();
        assert_eq!(hits[0].id, "p1");
        assert_eq!(hits[1].score, 0.0);
    }
}
