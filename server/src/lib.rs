use anyhow::Result;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use pgdb_core::{rank, tokenizer, SearchEngine};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<SearchEngine>,
    pub admin_token: Option<String>,
}

#[derive(Deserialize)]
pub struct SearchParams {
    pub q: String,
    #[serde(default = "default_k")]
    pub k: usize,
}
fn default_k() -> usize {
    rank::DEFAULT_K
}

#[derive(Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub took_s: f64,
    pub total_hits: usize,
    pub results: Vec<SearchHit>,
}

#[derive(Serialize)]
pub struct SearchHit {
    pub book_id: String,
    pub title: String,
    pub filepath: String,
    pub ranking: f64,
}

/// Open the store at `store_dir` and build the router around it.
pub fn build_app(store_dir: &str) -> Result<Router> {
    let engine = Arc::new(SearchEngine::open(store_dir)?);
    Ok(router(engine))
}

pub fn router(engine: Arc<SearchEngine>) -> Router {
    let admin_token = std::env::var("ADMIN_TOKEN").ok();
    let state = AppState { engine, admin_token };
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/search", get(search_handler))
        .route("/book/:book_id", get(book_handler))
        .route("/rebuild", post(rebuild_handler))
        .with_state(state)
        .layer(cors)
}

/// Stem the raw query at the edge and rank against the corpus. A failed
/// search yields a generic retriable error, never a partial ranking.
pub async fn search_handler(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>, (StatusCode, String)> {
    let start = std::time::Instant::now();
    let terms = tokenizer::stem_text(&params.q);
    let k = params.k.clamp(1, rank::DEFAULT_K);

    match state.engine.search_top_k(&terms, k) {
        Ok(hits) => {
            let results: Vec<SearchHit> = hits
                .into_iter()
                .map(|h| SearchHit {
                    book_id: h.book_id,
                    title: h.title,
                    filepath: h.filepath,
                    ranking: h.ranking,
                })
                .collect();
            Ok(Json(SearchResponse {
                query: params.q,
                took_s: start.elapsed().as_secs_f64(),
                total_hits: results.len(),
                results,
            }))
        }
        Err(e) => {
            tracing::error!(error = %e, query = %params.q, "search failed");
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                "search is temporarily unavailable, please retry".into(),
            ))
        }
    }
}

pub async fn book_handler(
    State(state): State<AppState>,
    Path(book_id): Path<String>,
) -> Result<Json<serde_json::Value>, (StatusCode, String)> {
    match state.engine.store().get_book(&book_id) {
        Ok(Some(meta)) => Ok(Json(serde_json::json!({
            "book_id": meta.book_id,
            "title": meta.title,
            "filepath": meta.filepath,
            "author": meta.author,
            "release_date": meta.release_date,
            "language": meta.language,
            "char_set": meta.char_set,
            "publisher": meta.publisher,
        }))),
        Ok(None) => Err((StatusCode::NOT_FOUND, "no such book".into())),
        Err(e) => {
            tracing::error!(error = %e, %book_id, "book lookup failed");
            Err((StatusCode::INTERNAL_SERVER_ERROR, "store unavailable".into()))
        }
    }
}

/// Admin action: rebuild and publish the collection frequency index.
async fn rebuild_handler(
    State(state): State<AppState>,
    headers: axum::http::HeaderMap,
) -> Result<Json<serde_json::Value>, (StatusCode, String)> {
    authorize(&state, &headers)?;
    let engine = state.engine.clone();
    match tokio::task::spawn_blocking(move || engine.rebuild_index()).await {
        Ok(Ok(version)) => Ok(Json(serde_json::json!({ "version": version }))),
        Ok(Err(e)) => {
            tracing::error!(error = %e, "rebuild aborted, previous snapshot remains active");
            Err((StatusCode::INTERNAL_SERVER_ERROR, "rebuild failed".into()))
        }
        Err(e) => {
            tracing::error!(error = %e, "rebuild task failed");
            Err((StatusCode::INTERNAL_SERVER_ERROR, "rebuild failed".into()))
        }
    }
}

fn authorize(state: &AppState, headers: &axum::http::HeaderMap) -> Result<(), (StatusCode, String)> {
    let required = match &state.admin_token {
        Some(t) => t,
        None => return Err((StatusCode::UNAUTHORIZED, "ADMIN_TOKEN not set".into())),
    };
    let provided = headers
        .get("X-ADMIN-TOKEN")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    if provided == required {
        Ok(())
    } else {
        Err((StatusCode::UNAUTHORIZED, "invalid admin token".into()))
    }
}
