use pgdb_core::{BookMeta, Error, SearchEngine, TermCounts};
use std::collections::BTreeMap;
use std::sync::Arc;
use tempfile::tempdir;

fn ingest(engine: &SearchEngine, id: &str, terms: &[(&str, u64)]) {
    let meta = BookMeta {
        book_id: id.to_string(),
        title: format!("Book {id}"),
        filepath: format!("data/{id}.txt"),
        ..BookMeta::default()
    };
    let counts: TermCounts = terms.iter().map(|(t, c)| (t.to_string(), *c)).collect();
    engine.store().insert_book(&meta, &counts).unwrap();
}

fn terms(words: &[&str]) -> Vec<String> {
    words.iter().map(|w| w.to_string()).collect()
}

/// Corpus: D1 {whale:5, sea:2}, D2 {whale:1}, D3 {boat:3}. With N = 3
/// and df("whale") = 2 the idf term is log10(3/3) = 0, so both matching
/// books score exactly 0 and are ordered by the book-id tie-break. D3
/// never matches and never appears.
#[test]
fn whale_corpus_worked_example() {
    let dir = tempdir().unwrap();
    let engine = SearchEngine::open(dir.path()).unwrap();
    ingest(&engine, "d1", &[("whale", 5), ("sea", 2)]);
    ingest(&engine, "d2", &[("whale", 1)]);
    ingest(&engine, "d3", &[("boat", 3)]);
    engine.rebuild_index().unwrap();

    let snap = engine.snapshot();
    assert_eq!(snap.df("whale"), 2);
    assert_eq!(snap.doc_count, 3);

    let hits = engine.search(&terms(&["whale"])).unwrap();
    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].book_id, "d1");
    assert_eq!(hits[1].book_id, "d2");
    assert_eq!(hits[0].ranking, 0.0);
    assert_eq!(hits[1].ranking, 0.0);
}

#[test]
fn rarer_terms_rank_higher() {
    let dir = tempdir().unwrap();
    let engine = SearchEngine::open(dir.path()).unwrap();
    ingest(&engine, "common", &[("sea", 1)]);
    ingest(&engine, "both", &[("sea", 1), ("kraken", 1)]);
    ingest(&engine, "filler1", &[("sea", 1)]);
    ingest(&engine, "filler2", &[("sea", 1)]);
    engine.rebuild_index().unwrap();

    let hits = engine.search(&terms(&["sea", "kraken"])).unwrap();
    assert_eq!(hits.len(), 4);
    // "both" gains the rare kraken contribution on top of sea
    assert_eq!(hits[0].book_id, "both");
    assert!(hits[0].ranking > hits[1].ranking);
}

#[test]
fn empty_query_returns_no_results() {
    let dir = tempdir().unwrap();
    let engine = SearchEngine::open(dir.path()).unwrap();
    ingest(&engine, "d1", &[("whale", 1)]);
    engine.rebuild_index().unwrap();

    assert!(engine.search(&[]).unwrap().is_empty());
    assert!(engine.search(&terms(&["", ""])).unwrap().is_empty());
}

#[test]
fn term_absent_from_every_book_matches_nothing() {
    let dir = tempdir().unwrap();
    let engine = SearchEngine::open(dir.path()).unwrap();
    ingest(&engine, "d1", &[("whale", 1)]);
    ingest(&engine, "d2", &[("sea", 1)]);
    engine.rebuild_index().unwrap();

    assert!(engine.search(&terms(&["kraken"])).unwrap().is_empty());
}

#[test]
fn repeated_query_terms_count_once() {
    let dir = tempdir().unwrap();
    let engine = SearchEngine::open(dir.path()).unwrap();
    ingest(&engine, "d1", &[("whale", 2)]);
    ingest(&engine, "d2", &[("sea", 1)]);
    engine.rebuild_index().unwrap();

    let once = engine.search(&terms(&["whale"])).unwrap();
    let thrice = engine.search(&terms(&["whale", "whale", "whale"])).unwrap();
    assert_eq!(once.len(), thrice.len());
    assert_eq!(once[0].ranking, thrice[0].ranking);
}

#[test]
fn results_are_truncated_to_k() {
    let dir = tempdir().unwrap();
    let engine = SearchEngine::open(dir.path()).unwrap();
    for i in 0..10 {
        ingest(&engine, &format!("{i:02}"), &[("whale", i + 1)]);
    }
    // keep df("whale") well below N so the idf factor stays positive
    for i in 0..5 {
        ingest(&engine, &format!("x{i}"), &[("boat", 1)]);
    }
    engine.rebuild_index().unwrap();

    let hits = engine.search_top_k(&terms(&["whale"]), 3).unwrap();
    assert_eq!(hits.len(), 3);
    // highest tf first
    assert_eq!(hits[0].book_id, "09");
    assert_eq!(hits[2].book_id, "07");
}

#[test]
fn search_on_fresh_empty_store_is_empty() {
    let dir = tempdir().unwrap();
    let engine = SearchEngine::open(dir.path()).unwrap();
    assert!(engine.search(&terms(&["whale"])).unwrap().is_empty());
}

#[test]
fn ingest_after_build_makes_queries_stale_until_rebuilt() {
    let dir = tempdir().unwrap();
    let engine = SearchEngine::open(dir.path()).unwrap();
    ingest(&engine, "d1", &[("whale", 1)]);
    engine.rebuild_index().unwrap();
    ingest(&engine, "d2", &[("whale", 3)]);

    match engine.search(&terms(&["whale"])) {
        Err(Error::StaleSnapshot {
            snapshot_docs,
            live_docs,
            ..
        }) => {
            assert_eq!(snapshot_docs, 1);
            assert_eq!(live_docs, 2);
        }
        other => panic!("expected StaleSnapshot, got {other:?}"),
    }

    engine.rebuild_index().unwrap();
    assert_eq!(engine.search(&terms(&["whale"])).unwrap().len(), 2);
}

#[test]
fn snapshot_survives_reopen() {
    let dir = tempdir().unwrap();
    {
        let engine = SearchEngine::open(dir.path()).unwrap();
        ingest(&engine, "d1", &[("whale", 1)]);
        engine.rebuild_index().unwrap();
        engine.store().flush().unwrap();
    }
    let engine = SearchEngine::open(dir.path()).unwrap();
    assert_eq!(engine.snapshot().version, 1);
    assert_eq!(engine.search(&terms(&["whale"])).unwrap().len(), 1);
}

/// Rebuilds racing each other are serialized: every call publishes its
/// own strictly increasing version, never a duplicate from a shared
/// starting point.
#[test]
fn concurrent_rebuilds_publish_unique_versions() {
    let dir = tempdir().unwrap();
    let engine = Arc::new(SearchEngine::open(dir.path()).unwrap());
    ingest(&engine, "d1", &[("whale", 1)]);

    let mut builders = Vec::new();
    for _ in 0..2 {
        let engine = engine.clone();
        builders.push(std::thread::spawn(move || {
            let mut versions = Vec::new();
            for _ in 0..100 {
                versions.push(engine.rebuild_index().unwrap());
            }
            versions
        }));
    }
    let mut all: Vec<u64> = builders
        .into_iter()
        .flat_map(|b| b.join().unwrap())
        .collect();
    let total = all.len();
    all.sort_unstable();
    all.dedup();
    assert_eq!(all.len(), total, "duplicate snapshot versions published");
    assert_eq!(engine.snapshot().version, total as u64);
}

/// Queries running concurrently with rebuilds each resolve against one
/// consistent snapshot and never fail or observe a mixed table.
#[test]
fn queries_complete_consistently_during_rebuilds() {
    let dir = tempdir().unwrap();
    let engine = Arc::new(SearchEngine::open(dir.path()).unwrap());
    for i in 0..20 {
        ingest(&engine, &format!("{i:02}"), &[("whale", i + 1), ("sea", 1)]);
    }
    engine.rebuild_index().unwrap();

    let mut readers = Vec::new();
    for _ in 0..4 {
        let engine = engine.clone();
        readers.push(std::thread::spawn(move || {
            for _ in 0..50 {
                let hits = engine.search(&terms(&["whale", "sea"])).unwrap();
                assert_eq!(hits.len(), 20);
                for pair in hits.windows(2) {
                    assert!(pair[0].ranking >= pair[1].ranking);
                }
            }
        }));
    }
    for _ in 0..10 {
        engine.rebuild_index().unwrap();
    }
    for reader in readers {
        reader.join().unwrap();
    }
    assert_eq!(engine.snapshot().version, 11);
}
