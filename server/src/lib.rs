use anyhow::Result;
use axum::{extract::{Query, State}, http::StatusCode, routing::get, Json, Router};
use picsearch_core::{IndexReader, SearchConfig, SearchError, SearchPipeline, SurrogateFile};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer, AllowOrigin};
use tower_http::trace::TraceLayer;

#[derive(Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: String,
}

#[derive(Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub took_s: f64,
    pub total_results: usize,
    pub results: Vec<SearchHit>,
}

#[derive(Serialize)]
pub struct SearchHit {
    pub image_id: String,
    pub url: String,
    pub score: u32,
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(Clone)]
pub struct AppState {
    pub index: Arc<IndexReader>,
    pub surrogates: Arc<SurrogateFile>,
    pub pipeline: Arc<SearchPipeline>,
}

pub fn build_app<P: AsRef<Path>, Q: AsRef<Path>>(index_dir: P, surrogates: Q, config: SearchConfig) -> Result<Router> {
    // Open the index header at startup; searches acquire their own sessions.
    let index = IndexReader::open(index_dir)?;
    let app_state = AppState {
        index: Arc::new(index),
        surrogates: Arc::new(SurrogateFile::new(surrogates)),
        pipeline: Arc::new(SearchPipeline::new(&config)),
    };

    // CORS: read CORS_ALLOW_ORIGIN (comma-separated) or allow Any by default
    let cors = match std::env::var("CORS_ALLOW_ORIGIN") {
        Ok(val) => {
            let origins: Vec<_> = val
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();
            if origins.is_empty() {
                CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
            } else {
                CorsLayer::new().allow_origin(AllowOrigin::list(origins)).allow_methods(Any).allow_headers(Any)
            }
        }
        Err(_) => CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any),
    };

    let app = Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/search", get(search_handler))
        .with_state(app_state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());
    Ok(app)
}

type ApiError = (StatusCode, Json<ErrorBody>);

fn status_for(err: &SearchError) -> StatusCode {
    match err {
        SearchError::IndexUnavailable(_) | SearchError::SurrogateSourceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        SearchError::SchemaMismatch { .. } | SearchError::MissingSurrogate { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn api_error(status: StatusCode, error: String) -> ApiError {
    (status, Json(ErrorBody { error }))
}

pub async fn search_handler(State(state): State<AppState>, Query(params): Query<SearchParams>) -> Result<Json<SearchResponse>, ApiError> {
    let start = std::time::Instant::now();
    let query = params.q.clone();

    // The pipeline does blocking file I/O (postings, surrogate JSON).
    let outcome = tokio::task::spawn_blocking(move || {
        state.pipeline.search(&params.q, state.index.as_ref(), state.surrogates.as_ref())
    })
    .await
    .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, format!("search task failed: {e}")))?
    .map_err(|e| {
        tracing::error!(error = %e, query = %query, "search failed");
        api_error(status_for(&e), e.to_string())
    })?;

    let results = outcome
        .ranked
        .into_vec()
        .into_iter()
        .map(|s| SearchHit { image_id: s.result.image_id, url: s.result.url, score: s.score })
        .collect();
    let elapsed = start.elapsed();
    Ok(Json(SearchResponse { query, took_s: elapsed.as_secs_f64(), total_results: outcome.total, results }))
}
