//! Query execution: join the postings store with the collection
//! frequency snapshot, score matching documents, and rank.

use crate::error::Error;
use crate::index::CollFreqSnapshot;
use crate::store::PostingsStore;
use crate::{rank, score, ScoredBook};
use std::collections::BTreeSet;

/// Score every document matching at least one query term, then rank and
/// truncate to the top `k`.
///
/// `terms` must already be lower-cased and stemmed; this function never
/// stems. Repeats in the query are deduplicated before matching, so a
/// repeated word does not multiply its contribution. An empty query (or
/// one that is all empty strings) returns an empty result, not an error.
pub fn execute(
    store: &PostingsStore,
    snapshot: &CollFreqSnapshot,
    terms: &[String],
    k: usize,
) -> Result<Vec<ScoredBook>, Error> {
    let distinct: BTreeSet<&str> = terms
        .iter()
        .map(String::as_str)
        .filter(|t| !t.is_empty())
        .collect();
    if distinct.is_empty() {
        return Ok(Vec::new());
    }

    // A snapshot only pairs with the corpus it was built over; scoring
    // live postings against frequencies from another corpus could put
    // df above N. Reject rather than clamp.
    let live_docs = store.document_count();
    if live_docs != snapshot.doc_count {
        return Err(Error::StaleSnapshot {
            version: snapshot.version,
            snapshot_docs: snapshot.doc_count,
            live_docs,
        });
    }

    let mut scored = Vec::new();
    for entry in store.postings() {
        let (book_id, counts) = entry?;
        let mut ranking = 0.0;
        let mut matched = 0usize;
        for term in &distinct {
            if let Some(&tf) = counts.get(*term) {
                ranking += score::tf_idf(tf, snapshot.df(term), snapshot.doc_count);
                matched += 1;
            }
        }
        // documents with no term in common with the query never enter
        // the result set
        if matched == 0 {
            continue;
        }
        let meta = store
            .get_book(&book_id)?
            .ok_or_else(|| Error::corrupt("books", format!("no metadata for book {book_id}")))?;
        scored.push(ScoredBook {
            book_id,
            title: meta.title,
            filepath: meta.filepath,
            ranking,
        });
    }

    tracing::debug!(
        query_terms = distinct.len(),
        snapshot_version = snapshot.version,
        candidates = scored.len(),
        "scored query"
    );
    Ok(rank::rank(scored, k))
}
