//! TF-IDF weight for a single (term, document) pair.

/// Compute `log10(1 + tf) * log10(n / (1 + df))`.
///
/// - `tf`: raw occurrence count of the term in the document. Absent terms
///   are filtered out upstream and never reach this function.
/// - `df`: number of documents containing the term. A term unknown to the
///   collection frequency snapshot scores with `df = 0`; it is treated
///   as maximally rare, not as an error.
/// - `n`: total document count observed when the snapshot was built.
///
/// Callers must pair `n` and `df` from the same snapshot; the query
/// processor rejects mismatched pairings before scoring, which keeps
/// `n >= df` and the result non-negative.
pub fn tf_idf(tf: u64, df: u64, n: u64) -> f64 {
    debug_assert!(n >= df, "df {df} exceeds document count {n}");
    let tf_weight = (1.0 + tf as f64).log10();
    let rarity = (n as f64 / (1.0 + df as f64)).log10();
    tf_weight * rarity
}
