//! TF-IDF ranking engine for a batch-ingested book corpus.
//!
//! Books are ingested once into the [`store::PostingsStore`], the
//! [`index::CollFreqIndex`] is rebuilt whenever the corpus changes, and
//! searches score documents against the currently published snapshot.

pub mod error;
pub mod index;
pub mod query;
pub mod rank;
pub mod score;
pub mod store;
pub mod tokenizer;

pub use error::Error;
pub use index::{CollFreqIndex, CollFreqSnapshot, SnapshotVersion};
pub use store::PostingsStore;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

pub type BookId = String;

/// Stemmed term → occurrence count within one book.
pub type TermCounts = BTreeMap<String, u64>;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BookMeta {
    pub book_id: BookId,
    pub title: String,
    pub filepath: String,
    pub author: Option<String>,
    pub release_date: Option<String>,
    pub language: Option<String>,
    pub char_set: Option<String>,
    pub publisher: Option<String>,
}

/// One search hit. Recomputed per query, never persisted.
#[derive(Debug, Clone)]
pub struct ScoredBook {
    pub book_id: BookId,
    pub title: String,
    pub filepath: String,
    /// Sum of per-term TF-IDF weights over the query/document term
    /// intersection.
    pub ranking: f64,
}

/// The two entry points consumed by the serving layer: `rebuild_index`
/// for the offline batch build and `search` per request.
pub struct SearchEngine {
    store: PostingsStore,
    index: CollFreqIndex,
}

impl SearchEngine {
    /// Open the store at `path` and publish the last built snapshot (or
    /// an empty version-0 snapshot on a fresh store).
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let store = PostingsStore::open(path)?;
        let index = CollFreqIndex::load(&store)?;
        Ok(Self { store, index })
    }

    pub fn store(&self) -> &PostingsStore {
        &self.store
    }

    /// The snapshot queries are currently served from.
    pub fn snapshot(&self) -> Arc<CollFreqSnapshot> {
        self.index.snapshot()
    }

    /// Recompute and publish the collection frequency index. On failure
    /// the previous snapshot stays live and this returns the error for
    /// the operator; queries are unaffected.
    pub fn rebuild_index(&self) -> Result<SnapshotVersion, Error> {
        self.index.rebuild(&self.store)
    }

    /// Rank the corpus against already-stemmed query terms, returning at
    /// most the default 100 results.
    pub fn search(&self, terms: &[String]) -> Result<Vec<ScoredBook>, Error> {
        self.search_top_k(terms, rank::DEFAULT_K)
    }

    /// Rank the corpus against already-stemmed query terms, returning at
    /// most `k` results.
    ///
    /// The whole query runs against one snapshot: the published reference
    /// is taken once here and used for every document scored.
    pub fn search_top_k(&self, terms: &[String], k: usize) -> Result<Vec<ScoredBook>, Error> {
        let snapshot = self.index.snapshot();
        query::execute(&self.store, &snapshot, terms, k)
    }
}
