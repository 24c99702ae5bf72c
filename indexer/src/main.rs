use anyhow::Result;
use clap::{Parser, Subcommand};
use pgdb_core::{tokenizer, BookMeta, SearchEngine, TermCounts};
use tracing_subscriber::{fmt, EnvFilter};
use walkdir::WalkDir;

use std::fs;
use std::path::Path;

#[derive(Parser)]
#[command(name = "pgdb-indexer")]
#[command(about = "Ingest Project Gutenberg books and build the TF-IDF index", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest .txt ebooks from a directory tree, then rebuild the index
    Ingest {
        /// Root directory of Gutenberg .txt files
        #[arg(long)]
        data: String,
        /// Store directory
        #[arg(long, default_value = "./store")]
        store: String,
    },
    /// Rebuild the collection frequency index over the current corpus
    Rebuild {
        /// Store directory
        #[arg(long, default_value = "./store")]
        store: String,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Ingest { data, store } => ingest(&data, &store),
        Commands::Rebuild { store } => rebuild(&store),
    }
}

fn ingest(data: &str, store: &str) -> Result<()> {
    let engine = SearchEngine::open(store)?;
    let mut ingested = 0u64;
    for entry in WalkDir::new(data).into_iter().filter_map(|e| e.ok()) {
        let path = entry.path();
        if !path.is_file() || path.extension().and_then(|s| s.to_str()) != Some("txt") {
            continue;
        }
        // Gutenberg mirrors mix ascii and latin-1; take whatever decodes
        let raw = fs::read(path)?;
        let text = String::from_utf8_lossy(&raw);
        let book_id = match book_id_from_path(path) {
            Some(id) => id,
            None => {
                tracing::warn!(path = %path.display(), "skipping file with no usable name");
                continue;
            }
        };
        let (meta, counts) = parse_ebook(&book_id, &path.display().to_string(), &text);
        if counts.is_empty() {
            tracing::warn!(%book_id, "no indexable content, skipping");
            continue;
        }
        engine.store().insert_book(&meta, &counts)?;
        ingested += 1;
        if ingested % 100 == 0 {
            tracing::info!(ingested, "ingesting");
        }
    }
    tracing::info!(ingested, "ingest complete");

    // the corpus changed, so the published snapshot is stale until rebuilt
    let version = engine.rebuild_index()?;
    engine.store().flush()?;
    tracing::info!(version, "index rebuilt");
    Ok(())
}

fn rebuild(store: &str) -> Result<()> {
    let engine = SearchEngine::open(store)?;
    match engine.rebuild_index() {
        Ok(version) => {
            engine.store().flush()?;
            tracing::info!(version, "index rebuilt");
            Ok(())
        }
        Err(e) => {
            // previous snapshot stays authoritative; report and bail
            tracing::error!(error = %e, "rebuild aborted, previous snapshot remains active");
            Err(e.into())
        }
    }
}

fn book_id_from_path(path: &Path) -> Option<String> {
    path.file_stem()
        .and_then(|s| s.to_str())
        .map(|s| s.to_string())
}

/// Split a Gutenberg ebook into header metadata and indexable body terms.
///
/// Header fields are read until the `*** START` marker, the body runs
/// until `*** END`, and the footer is never indexed.
fn parse_ebook(book_id: &str, filepath: &str, text: &str) -> (BookMeta, TermCounts) {
    let mut title = None;
    let mut author = None;
    let mut release_date = None;
    let mut language = None;
    let mut char_set = None;
    let mut publisher = None;
    let mut body = String::new();

    let mut in_body = false;
    for line in text.lines() {
        if line.starts_with("*** START") {
            in_body = true;
            continue;
        }
        if line.starts_with("*** END") {
            break;
        }
        if in_body {
            body.push_str(line);
            body.push('\n');
        } else if let Some(value) = line.strip_prefix("Title: ") {
            title = Some(value.trim().to_string());
        } else if let Some(value) = line.strip_prefix("Author: ") {
            author = Some(value.trim().to_string());
        } else if let Some(value) = line.strip_prefix("Release Date: ") {
            // drop the trailing "[EBook #...]" annotation
            let value = value.split('[').next().unwrap_or(value);
            release_date = Some(value.trim().trim_end_matches(',').to_string());
        } else if let Some(value) = line.strip_prefix("Language: ") {
            language = Some(value.trim().to_string());
        } else if let Some(value) = line.strip_prefix("Character set encoding: ") {
            char_set = Some(value.trim().to_string());
        } else if let Some(value) = line.strip_prefix("Produced by ") {
            publisher = Some(value.trim().to_string());
        }
    }

    let meta = BookMeta {
        book_id: book_id.to_string(),
        title: title.unwrap_or_else(|| book_id.to_string()),
        filepath: filepath.to_string(),
        author,
        release_date,
        language,
        char_set,
        publisher,
    };
    (meta, tokenizer::term_counts(&body))
}
