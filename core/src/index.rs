//! Collection frequency index: batch builder and published snapshot.
//!
//! "Collection frequency" here means document frequency: the number of
//! documents containing a term, not the term's total occurrence count.

use crate::error::Error;
use crate::store::PostingsStore;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

pub type SnapshotVersion = u64;

/// Pointer record for the published snapshot, persisted alongside the
/// versioned term table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotMeta {
    pub version: SnapshotVersion,
    pub doc_count: u64,
}

/// One immutable build of the collection frequency index.
///
/// Carries the document count observed at build time so a score is always
/// computed against the same corpus its document frequencies came from.
#[derive(Debug)]
pub struct CollFreqSnapshot {
    pub version: SnapshotVersion,
    pub doc_count: u64,
    freqs: BTreeMap<String, u64>,
}

impl CollFreqSnapshot {
    /// The snapshot published before any build has run: version 0 over an
    /// empty corpus.
    pub fn empty() -> Self {
        Self::empty_at(0, 0)
    }

    pub(crate) fn empty_at(version: SnapshotVersion, doc_count: u64) -> Self {
        Self {
            version,
            doc_count,
            freqs: BTreeMap::new(),
        }
    }

    pub(crate) fn insert(&mut self, term: String, df: u64) {
        self.freqs.insert(term, df);
    }

    /// Document frequency of a term; 0 if the term is unknown to this
    /// snapshot.
    pub fn df(&self, term: &str) -> u64 {
        self.freqs.get(term).copied().unwrap_or(0)
    }

    /// Distinct indexed terms, ascending.
    pub fn entries(&self) -> impl Iterator<Item = (&str, u64)> + '_ {
        self.freqs.iter().map(|(term, df)| (term.as_str(), *df))
    }

    pub fn term_count(&self) -> usize {
        self.freqs.len()
    }
}

/// Single-writer, multi-reader handle on the published snapshot.
///
/// Readers clone an `Arc` out and keep scoring against it for the life of
/// their query; `rebuild` constructs a complete replacement and swaps the
/// one reference. No reader ever observes a partially built table.
///
/// The builder lock serializes rebuilds end to end, so overlapping
/// rebuild requests publish distinct, strictly increasing versions and
/// never write into the same persisted table.
pub struct CollFreqIndex {
    published: RwLock<Arc<CollFreqSnapshot>>,
    builder: Mutex<()>,
}

impl CollFreqIndex {
    /// Publish the snapshot persisted by the last successful build, or an
    /// empty version-0 snapshot on a fresh store.
    pub fn load(store: &PostingsStore) -> Result<Self, Error> {
        let snapshot = match store.load_snapshot()? {
            Some(snapshot) => snapshot,
            None => CollFreqSnapshot::empty(),
        };
        tracing::debug!(
            version = snapshot.version,
            doc_count = snapshot.doc_count,
            terms = snapshot.term_count(),
            "loaded collection frequency snapshot"
        );
        Ok(Self {
            published: RwLock::new(Arc::new(snapshot)),
            builder: Mutex::new(()),
        })
    }

    /// The currently published snapshot.
    pub fn snapshot(&self) -> Arc<CollFreqSnapshot> {
        self.published.read().clone()
    }

    /// Recompute document frequencies from the postings store and publish
    /// the result atomically.
    ///
    /// Each document contributes one count per distinct term in its
    /// posting, duplicate occurrences within a document count once. On any
    /// storage failure the build aborts and the previously published
    /// snapshot remains active, in memory and on disk.
    ///
    /// Rebuilds are serialized: a rebuild arriving while another runs
    /// waits its turn and then builds over the newly published version.
    pub fn rebuild(&self, store: &PostingsStore) -> Result<SnapshotVersion, Error> {
        let _build = self.builder.lock();
        let prev_version = self.snapshot().version;
        let mut next = CollFreqSnapshot::empty_at(prev_version + 1, 0);
        for entry in store.postings() {
            let (_, counts) = entry?;
            next.doc_count += 1;
            for term in counts.keys() {
                let df = next.df(term) + 1;
                next.insert(term.clone(), df);
            }
        }
        store.save_snapshot(&next)?;

        let version = next.version;
        let doc_count = next.doc_count;
        let terms = next.term_count();
        *self.published.write() = Arc::new(next);
        tracing::info!(version, doc_count, terms, "published collection frequency snapshot");
        Ok(version)
    }
}
