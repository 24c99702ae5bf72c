//! Persistent postings and index storage over sled.
//!
//! Layout: a `books` tree (book id → metadata), a `postings` tree
//! (book id → term → occurrence count), one `coll_freqs_v{N}` tree per
//! published collection frequency snapshot, and an `index_meta` tree
//! holding the pointer to the current snapshot. sled iterates trees in
//! key order, which gives every scan a stable book-id-ascending order.

use crate::error::Error;
use crate::index::{CollFreqSnapshot, SnapshotMeta};
use crate::{BookId, BookMeta, TermCounts};
use serde::de::DeserializeOwned;
use std::path::Path;

const SNAPSHOT_KEY: &[u8] = b"current";
const COLL_FREQ_PREFIX: &str = "coll_freqs_v";

pub struct PostingsStore {
    db: sled::Db,
    books: sled::Tree,
    postings: sled::Tree,
    index_meta: sled::Tree,
}

impl PostingsStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let db = sled::open(path)?;
        let books = db.open_tree("books")?;
        let postings = db.open_tree("postings")?;
        let index_meta = db.open_tree("index_meta")?;
        Ok(Self {
            db,
            books,
            postings,
            index_meta,
        })
    }

    /// Ingest one book: metadata plus its term-frequency map.
    ///
    /// Empty terms and zero counts are dropped on the way in so the
    /// stored posting never violates the non-positive-count invariant.
    pub fn insert_book(&self, meta: &BookMeta, counts: &TermCounts) -> Result<(), Error> {
        let clean: TermCounts = counts
            .iter()
            .filter(|(term, count)| !term.is_empty() && **count > 0)
            .map(|(term, count)| (term.clone(), *count))
            .collect();
        self.books
            .insert(meta.book_id.as_bytes(), bincode::serialize(meta)?)?;
        self.postings
            .insert(meta.book_id.as_bytes(), bincode::serialize(&clean)?)?;
        Ok(())
    }

    pub fn get_book(&self, book_id: &str) -> Result<Option<BookMeta>, Error> {
        match self.books.get(book_id.as_bytes())? {
            Some(bytes) => Ok(Some(decode("books", &bytes)?)),
            None => Ok(None),
        }
    }

    pub fn get_posting(&self, book_id: &str) -> Result<Option<TermCounts>, Error> {
        match self.postings.get(book_id.as_bytes())? {
            Some(bytes) => Ok(Some(decode("postings", &bytes)?)),
            None => Ok(None),
        }
    }

    /// All book metadata, book id ascending.
    pub fn books(&self) -> impl Iterator<Item = Result<BookMeta, Error>> + '_ {
        self.books.iter().map(|entry| {
            let (_, bytes) = entry?;
            decode("books", &bytes)
        })
    }

    /// All postings, book id ascending.
    pub fn postings(&self) -> impl Iterator<Item = Result<(BookId, TermCounts), Error>> + '_ {
        self.postings.iter().map(|entry| {
            let (key, bytes) = entry?;
            let book_id = String::from_utf8(key.to_vec())
                .map_err(|e| Error::corrupt("postings", e))?;
            Ok((book_id, decode("postings", &bytes)?))
        })
    }

    /// Live corpus size, derived from the stored postings rather than
    /// any value recorded at index build time.
    pub fn document_count(&self) -> u64 {
        self.postings.len() as u64
    }

    /// Persist a snapshot: write its term table into a fresh versioned
    /// tree, then move the `index_meta` pointer in a single insert, then
    /// retire older tables. A crash before the pointer moves leaves the
    /// previous snapshot fully intact on disk.
    pub fn save_snapshot(&self, snapshot: &CollFreqSnapshot) -> Result<(), Error> {
        let tree = self.db.open_tree(coll_freq_tree_name(snapshot.version))?;
        tree.clear()?;
        for (term, df) in snapshot.entries() {
            tree.insert(term.as_bytes(), df.to_be_bytes().to_vec())?;
        }
        tree.flush()?;

        let meta = SnapshotMeta {
            version: snapshot.version,
            doc_count: snapshot.doc_count,
        };
        self.index_meta
            .insert(SNAPSHOT_KEY, bincode::serialize(&meta)?)?;
        self.index_meta.flush()?;

        for name in self.db.tree_names() {
            if is_stale_coll_freq_tree(&name, snapshot.version) {
                self.db.drop_tree(&name)?;
            }
        }
        Ok(())
    }

    /// Load the currently published snapshot, if any build has completed.
    pub fn load_snapshot(&self) -> Result<Option<CollFreqSnapshot>, Error> {
        let Some(bytes) = self.index_meta.get(SNAPSHOT_KEY)? else {
            return Ok(None);
        };
        let meta: SnapshotMeta = decode("index_meta", &bytes)?;
        let tree = self.db.open_tree(coll_freq_tree_name(meta.version))?;
        let mut snapshot = CollFreqSnapshot::empty_at(meta.version, meta.doc_count);
        for entry in tree.iter() {
            let (key, value) = entry?;
            let term = String::from_utf8(key.to_vec())
                .map_err(|e| Error::corrupt("coll_freqs", e))?;
            let df = u64::from_be_bytes(
                value
                    .as_ref()
                    .try_into()
                    .map_err(|_| Error::corrupt("coll_freqs", "df is not 8 bytes"))?,
            );
            snapshot.insert(term, df);
        }
        Ok(Some(snapshot))
    }

    pub fn flush(&self) -> Result<(), Error> {
        self.db.flush()?;
        Ok(())
    }
}

fn coll_freq_tree_name(version: u64) -> String {
    format!("{COLL_FREQ_PREFIX}{version:020}")
}

fn is_stale_coll_freq_tree(name: &[u8], current_version: u64) -> bool {
    let Ok(name) = std::str::from_utf8(name) else {
        return false;
    };
    name.starts_with(COLL_FREQ_PREFIX) && name != coll_freq_tree_name(current_version)
}

fn decode<T: DeserializeOwned>(tree: &'static str, bytes: &[u8]) -> Result<T, Error> {
    bincode::deserialize(bytes).map_err(|e| Error::corrupt(tree, e))
}
