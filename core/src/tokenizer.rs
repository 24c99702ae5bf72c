use crate::TermCounts;
use lazy_static::lazy_static;
use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};
use unicode_normalization::UnicodeNormalization;

lazy_static! {
    static ref WORD: Regex = Regex::new(r"[a-z0-9][a-z0-9']*").expect("valid regex");
    static ref STEMMER: Stemmer = Stemmer::create(Algorithm::English);
}

/// Lowercase, NFKC-normalize, and Porter2-stem free text into index terms.
///
/// No stopword filtering: every word in the corpus is indexed, and
/// queries are stemmed with the same pipeline so terms line up.
pub fn stem_text(text: &str) -> Vec<String> {
    let normalized = text.nfkc().collect::<String>().to_lowercase();
    WORD.find_iter(&normalized)
        .map(|m| STEMMER.stem(m.as_str()).to_string())
        .collect()
}

/// Term-frequency map for one document body.
pub fn term_counts(text: &str) -> TermCounts {
    let mut counts = TermCounts::new();
    for term in stem_text(text) {
        *counts.entry(term).or_insert(0) += 1;
    }
    counts
}
