//! JSONL index file loading.
//!
//! The ingestion pipeline writes one JSON passage per line:
//!
//! ```text
//! {"id":"returns-001","text":"...","source_document":"returns.pdf","page":3,"embedding":[...]}
//! ```
//!
//! Loading happens once at startup; the resulting corpus and index are
//! immutable for the life of the process.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use tracing::info;

use crate::corpus::PassageCorpus;
use crate::error::IndexError;
use crate::index::SimilarityIndex;
use crate::passage::Passage;

/// Load a JSONL passage file into a corpus and similarity index.
///
/// The embedding dimensionality is fixed by the first record; any later
/// record disagreeing with it, a duplicate id, or an empty embedding is
/// a hard error rather than a skipped row.
pub fn load_passages(path: &Path) -> Result<(PassageCorpus, SimilarityIndex), IndexError> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);

    let mut corpus = PassageCorpus::default();
    let mut index: Option<SimilarityIndex> = None;

    for (line_no, line) in reader.lines().enumerate() {
        let line_no = line_no + 1;
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let passage: Passage =
            serde_json::from_str(&line).map_err(|e| IndexError::Malformed {
                line: line_no,
                reason: e.to_string(),
            })?;

        if passage.embedding.is_empty() {
            return Err(IndexError::Malformed {
                line: line_no,
                reason: format!("passage {} has an empty embedding", passage.id),
            });
        }

        let index = index.get_or_insert_with(|| SimilarityIndex::new(passage.embedding.len()));
        if passage.embedding.len() != index.dimension() {
            return Err(IndexError::Malformed {
                line: line_no,
                reason: format!(
                    "passage {} has dimension {}, index has {}",
                    passage.id,
                    passage.embedding.len(),
                    index.dimension()
                ),
            });
        }

        index.push(passage.id.clone(), passage.embedding.clone());
        if corpus.insert(passage).is_some() {
            return Err(IndexError::Malformed {
                line: line_no,
                reason: "duplicate passage id".to_string(),
            });
        }
    }

    let index = index.unwrap_or_else(|| SimilarityIndex::new(0));
    info!(
        passages = corpus.len(),
        dimension = index.dimension(),
        path = %path.display(),
        "Loaded passage index"
    );
    Ok((corpus, index))
}
