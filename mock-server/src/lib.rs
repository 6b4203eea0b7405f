//! In-memory stand-in for the search engine's REST API.
//!
//! Serves the endpoints `es-core` talks to from a single `Engine` behind a
//! `RwLock`. Used by the client's integration tests and runnable on its own
//! via the `mock-server` binary.

pub mod engine;
pub mod error;
pub mod query;

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::Value;
use tokio::{net::TcpListener, sync::RwLock};

pub use engine::Engine;
pub use error::EngineError;

pub type Db = Arc<RwLock<Engine>>;

type Reply = Result<(StatusCode, Json<Value>), EngineError>;

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(Engine::new()));
    Router::new()
        .route("/", get(info))
        .route("/_bulk", post(bulk))
        .route("/_msearch", post(msearch).get(msearch))
        .route("/_aliases", post(update_aliases))
        .route("/_search/template/{name}", post(put_template))
        .route(
            "/{index}",
            put(create_index).delete(delete_index).head(index_exists),
        )
        .route("/{index}/_settings", get(get_settings).put(put_settings))
        .route("/{index}/_status", get(status))
        .route(
            "/{index}/_mapping/{doc_type}",
            get(get_mapping).put(put_mapping),
        )
        .route("/{index}/_bulk", post(bulk_into))
        .route("/{index}/_search", post(search).get(search))
        .route("/{index}/_search/template", post(search_template))
        .route("/{index}/_suggest", post(suggest))
        .route("/{index}/_alias/{alias}", get(get_alias))
        .route("/{index}/{doc_type}", post(index_generated_id))
        .route("/{index}/{doc_type}/_search", post(search_typed).get(search_typed))
        .route(
            "/{index}/{doc_type}/{id}",
            get(get_document)
                .post(index_document)
                .put(index_document)
                .delete(delete_document),
        )
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

/// Query-string flags accepted by the search endpoints.
#[derive(Debug, Default, Deserialize)]
struct SearchParams {
    explain: Option<String>,
}

impl SearchParams {
    /// A bare `?explain` counts as true.
    fn explain(&self) -> bool {
        matches!(self.explain.as_deref(), Some("" | "true"))
    }
}

fn json((status, body): engine::Reply) -> (StatusCode, Json<Value>) {
    (status, Json(body))
}

fn parse_source(body: &str) -> Result<Value, EngineError> {
    serde_json::from_str(body)
        .map_err(|e| EngineError::parse(format!("failed to parse document: {e}")))
}

async fn info(State(db): State<Db>) -> Json<Value> {
    Json(db.read().await.info())
}

// --- indices ---

async fn create_index(State(db): State<Db>, Path(index): Path<String>, body: String) -> Reply {
    db.write().await.create_index(&index, &body).map(json)
}

async fn delete_index(State(db): State<Db>, Path(index): Path<String>) -> Reply {
    db.write().await.delete_index(&index).map(json)
}

async fn index_exists(State(db): State<Db>, Path(index): Path<String>) -> StatusCode {
    if db.read().await.index_exists(&index) {
        StatusCode::OK
    } else {
        StatusCode::NOT_FOUND
    }
}

async fn get_settings(State(db): State<Db>, Path(index): Path<String>) -> Reply {
    db.read().await.settings(&index).map(json)
}

async fn put_settings(State(db): State<Db>, Path(index): Path<String>, body: String) -> Reply {
    db.write().await.update_settings(&index, &body).map(json)
}

async fn status(State(db): State<Db>, Path(indices): Path<String>) -> Reply {
    db.read().await.status(&indices).map(json)
}

async fn get_mapping(
    State(db): State<Db>,
    Path((index, doc_type)): Path<(String, String)>,
) -> Reply {
    db.read().await.mapping(&index, &doc_type).map(json)
}

async fn put_mapping(
    State(db): State<Db>,
    Path((index, doc_type)): Path<(String, String)>,
    body: String,
) -> Reply {
    db.write()
        .await
        .put_mapping(&index, &doc_type, &body)
        .map(json)
}

// --- documents ---

async fn index_document(
    State(db): State<Db>,
    Path((index, doc_type, id)): Path<(String, String, String)>,
    body: String,
) -> Reply {
    let source = parse_source(&body)?;
    db.write()
        .await
        .write_document(&index, &doc_type, Some(&id), source, false)
        .map(json)
}

async fn index_generated_id(
    State(db): State<Db>,
    Path((index, doc_type)): Path<(String, String)>,
    body: String,
) -> Reply {
    let source = parse_source(&body)?;
    db.write()
        .await
        .write_document(&index, &doc_type, None, source, false)
        .map(json)
}

async fn get_document(
    State(db): State<Db>,
    Path((index, doc_type, id)): Path<(String, String, String)>,
) -> Reply {
    db.read().await.get_document(&index, &doc_type, &id).map(json)
}

async fn delete_document(
    State(db): State<Db>,
    Path((index, doc_type, id)): Path<(String, String, String)>,
) -> Reply {
    db.write()
        .await
        .delete_document(&index, &doc_type, &id)
        .map(json)
}

async fn bulk(State(db): State<Db>, body: String) -> Reply {
    db.write().await.bulk(None, &body).map(json)
}

async fn bulk_into(State(db): State<Db>, Path(index): Path<String>, body: String) -> Reply {
    db.write().await.bulk(Some(&index), &body).map(json)
}

// --- search ---

async fn search(
    State(db): State<Db>,
    Path(index): Path<String>,
    Query(params): Query<SearchParams>,
    body: String,
) -> Reply {
    let explain = params.explain();
    db.read().await.search(&index, None, &body, explain).map(json)
}

async fn search_typed(
    State(db): State<Db>,
    Path((index, doc_type)): Path<(String, String)>,
    Query(params): Query<SearchParams>,
    body: String,
) -> Reply {
    let explain = params.explain();
    db.read()
        .await
        .search(&index, Some(&doc_type), &body, explain)
        .map(json)
}

async fn msearch(State(db): State<Db>, body: String) -> Reply {
    db.read().await.msearch(&body).map(json)
}

async fn put_template(State(db): State<Db>, Path(name): Path<String>, body: String) -> Reply {
    db.write().await.put_template(&name, &body).map(json)
}

async fn search_template(
    State(db): State<Db>,
    Path(index): Path<String>,
    Query(params): Query<SearchParams>,
    body: String,
) -> Reply {
    let explain = params.explain();
    db.read()
        .await
        .search_template(&index, &body, explain)
        .map(json)
}

async fn suggest(State(db): State<Db>, Path(index): Path<String>, body: String) -> Reply {
    db.read().await.suggest(&index, &body).map(json)
}

// --- aliases ---

async fn get_alias(
    State(db): State<Db>,
    Path((index, alias)): Path<(String, String)>,
) -> Reply {
    db.read().await.aliases(&index, &alias).map(json)
}

async fn update_aliases(State(db): State<Db>, body: String) -> Reply {
    db.write().await.update_aliases(&body).map(json)
}
