use axum::routing::post;
use axum::Router;

use crate::handlers::ingest;
use crate::state::AppState;

/// Ingestion routes.
///
/// ```text
/// POST /update       batch in the request body
/// POST /load-json    {"json_path": "..."} batch file on the server
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/update", post(ingest::update))
        .route("/load-json", post(ingest::load_json))
}
