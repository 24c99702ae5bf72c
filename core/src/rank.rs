//! Final ordering and truncation of scored documents.

use crate::ScoredBook;

/// Default result cutoff for a search.
pub const DEFAULT_K: usize = 100;

/// Sort by ranking descending and truncate to the top `k`.
///
/// Ties are broken by book id ascending so the output is deterministic.
/// Fewer than `k` matches returns them all.
pub fn rank(mut scored: Vec<ScoredBook>, k: usize) -> Vec<ScoredBook> {
    scored.sort_by(|a, b| {
        b.ranking
            .total_cmp(&a.ranking)
            .then_with(|| a.book_id.cmp(&b.book_id))
    });
    scored.truncate(k);
    scored
}
