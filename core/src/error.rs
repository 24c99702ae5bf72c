use crate::index::SnapshotVersion;

/// Failures surfaced by the store, the index builder, and query execution.
///
/// Missing terms and missing documents are not errors anywhere in this
/// crate; they are absorbed as empty contributions.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The underlying store could not be read or written. Queries abort
    /// with no partial results; a rebuild aborts leaving the previously
    /// published snapshot active.
    #[error("storage unavailable: {0}")]
    Storage(#[from] sled::Error),

    /// A record failed to encode for storage.
    #[error("failed to encode record: {0}")]
    Encode(#[from] bincode::Error),

    /// A stored record could not be decoded.
    #[error("corrupt record in {tree} tree: {detail}")]
    Corrupt { tree: &'static str, detail: String },

    /// The published snapshot was built over a different corpus than the
    /// live document set, so its document frequencies cannot be paired
    /// with the live document count.
    #[error(
        "snapshot v{version} covers {snapshot_docs} documents but the store holds {live_docs}; \
         rebuild the index"
    )]
    StaleSnapshot {
        version: SnapshotVersion,
        snapshot_docs: u64,
        live_docs: u64,
    },
}

impl Error {
    pub(crate) fn corrupt(tree: &'static str, detail: impl ToString) -> Self {
        Error::Corrupt {
            tree,
            detail: detail.to_string(),
        }
    }
}
