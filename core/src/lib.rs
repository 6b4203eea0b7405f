//! Synchronous client for a search engine's REST API.
//!
//! # Overview
//! Maps index lifecycle, document CRUD, bulk, search, multi-search,
//! search templates, suggestions and alias management onto typed method
//! calls. Query, mapping and document bodies are forwarded as the raw
//! strings or bytes the caller supplies; responses are decoded into the
//! shapes in `types`.
//!
//! # Design
//! - `EsClient` is stateless and does no I/O: each endpoint has a `build_*`
//!   method producing an `HttpRequest` and a `parse_*` method consuming an
//!   `HttpResponse`.
//! - `SearchClient` pairs an `EsClient` with a `Transport` (blocking `ureq`
//!   by default) and exposes one method per endpoint.
//! - Statuses outside 2xx and 404 become `ApiError::Engine` with the raw
//!   body; a 404 is decoded like any other answer.

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod search;
pub mod transport;
pub mod types;

pub use client::EsClient;
pub use config::Endpoint;
pub use error::ApiError;
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use search::SearchClient;
pub use transport::{Transport, UreqTransport};
pub use types::{
    Acknowledged, Bulk, BulkItem, BulkItemResult, Document, EngineInfo, EngineVersion, Hit, Hits,
    IndexSettings, IndexStatus, InsertDocument, MSearchQuery, MSearchResult, SearchResult, Shards,
};
