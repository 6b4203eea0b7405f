//! Stateless HTTP request builder and response parser for the engine's REST API.
//!
//! # Design
//! `EsClient` holds only the validated base URL and carries no mutable state
//! between calls. Index names, types and ids are appended as percent-encoded
//! path segments, so `?`, `#`, `/` or spaces inside an id stay part of it. Each endpoint is split into a `build_*` method that produces an
//! `HttpRequest` and a `parse_*` method that consumes an `HttpResponse`.
//! `SearchClient` glues the two together over a `Transport`; callers with
//! their own HTTP stack can use `EsClient` directly.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::warn;

use url::Url;

use crate::config::Endpoint;
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse, JSON, NDJSON};
use crate::types::{
    Acknowledged, Bulk, Document, EngineInfo, IndexSettings, IndexStatus, InsertDocument,
    MSearchQuery, MSearchResult, SearchResult,
};

/// Request builder and response parser for one engine endpoint.
#[derive(Debug, Clone)]
pub struct EsClient {
    base: Url,
}

impl EsClient {
    /// Fails with `InvalidUrl` unless `base_url` is an http(s) URL with a host.
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        Ok(Self::from_endpoint(&Endpoint::parse(base_url)?))
    }

    pub fn from_endpoint(endpoint: &Endpoint) -> Self {
        Self {
            base: endpoint.url().clone(),
        }
    }

    fn url(&self, segments: &[&str]) -> String {
        self.url_with_query(segments, false)
    }

    /// Base URL plus one encoded path segment per entry, and `?explain` when
    /// asked for.
    fn url_with_query(&self, segments: &[&str], explain: bool) -> String {
        let mut url = self.base.clone();
        // Endpoint only admits http(s) URLs with a host, which always have
        // path segments.
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        if explain {
            url.set_query(Some("explain"));
        }
        url.into()
    }

    // -----------------------------------------------------------------------
    // Index lifecycle
    // -----------------------------------------------------------------------

    /// `PUT /{index}`. An empty `settings` string sends no body.
    pub fn build_create_index(&self, index: &str, settings: &str) -> HttpRequest {
        json_request(HttpMethod::Put, self.url(&[index]), settings)
    }

    pub fn build_delete_index(&self, index: &str) -> HttpRequest {
        HttpRequest::new(HttpMethod::Delete, self.url(&[index]))
    }

    pub fn build_update_index_settings(&self, index: &str, settings: &str) -> HttpRequest {
        json_request(
            HttpMethod::Put,
            self.url(&[index, "_settings"]),
            settings,
        )
    }

    pub fn build_index_settings(&self, index: &str) -> HttpRequest {
        HttpRequest::new(HttpMethod::Get, self.url(&[index, "_settings"]))
    }

    pub fn build_index_exists(&self, index: &str) -> HttpRequest {
        HttpRequest::new(HttpMethod::Head, self.url(&[index]))
    }

    pub fn build_get_mapping(&self, index: &str, doc_type: &str) -> HttpRequest {
        HttpRequest::new(
            HttpMethod::Get,
            self.url(&[index, "_mapping", doc_type]),
        )
    }

    pub fn build_put_mapping(&self, index: &str, doc_type: &str, mapping: &str) -> HttpRequest {
        json_request(
            HttpMethod::Put,
            self.url(&[index, "_mapping", doc_type]),
            mapping,
        )
    }

    /// `GET /{indices}/_status`; `indices` may be a comma-separated list.
    pub fn build_status(&self, indices: &str) -> HttpRequest {
        HttpRequest::new(HttpMethod::Get, self.url(&[indices, "_status"]))
    }

    pub fn build_info(&self) -> HttpRequest {
        HttpRequest::new(HttpMethod::Get, self.url(&[]))
    }

    pub fn parse_acknowledged(&self, response: HttpResponse) -> Result<Acknowledged, ApiError> {
        decode(&response)
    }

    /// Picks the settings of `index` out of the `{index: {settings: ..}}` map.
    /// Returns the default value when the engine did not report that index.
    pub fn parse_index_settings(
        &self,
        index: &str,
        response: HttpResponse,
    ) -> Result<IndexSettings, ApiError> {
        let mut all: BTreeMap<String, Value> = decode(&response)?;
        match all.remove(index) {
            Some(entry) => serde_json::from_value(entry)
                .map_err(|e| ApiError::Deserialization(e.to_string())),
            None => Ok(IndexSettings::default()),
        }
    }

    /// `true` only for 200; 404 means the index is absent.
    pub fn parse_index_exists(&self, response: HttpResponse) -> Result<bool, ApiError> {
        match response.status {
            200 => Ok(true),
            404 => Ok(false),
            status => Err(engine_error(status, response.body)),
        }
    }

    pub fn parse_status(&self, response: HttpResponse) -> Result<IndexStatus, ApiError> {
        decode(&response)
    }

    pub fn parse_info(&self, response: HttpResponse) -> Result<EngineInfo, ApiError> {
        decode(&response)
    }

    /// Returns the body untouched once the status passes classification.
    pub fn parse_raw(&self, response: HttpResponse) -> Result<String, ApiError> {
        check_status(&response)?;
        Ok(response.body)
    }

    // -----------------------------------------------------------------------
    // Documents
    // -----------------------------------------------------------------------

    pub fn build_insert_document(
        &self,
        index: &str,
        doc_type: &str,
        id: &str,
        data: &[u8],
    ) -> Result<HttpRequest, ApiError> {
        let body = utf8(data)?;
        Ok(json_request(
            HttpMethod::Post,
            self.url(&[index, doc_type, id]),
            &body,
        ))
    }

    pub fn build_document(&self, index: &str, doc_type: &str, id: &str) -> HttpRequest {
        HttpRequest::new(
            HttpMethod::Get,
            self.url(&[index, doc_type, id]),
        )
    }

    pub fn build_delete_document(&self, index: &str, doc_type: &str, id: &str) -> HttpRequest {
        HttpRequest::new(
            HttpMethod::Delete,
            self.url(&[index, doc_type, id]),
        )
    }

    /// `POST /_bulk`. The engine requires a final newline, so one is added
    /// when `data` lacks it.
    pub fn build_bulk(&self, data: &[u8]) -> Result<HttpRequest, ApiError> {
        let mut body = utf8(data)?;
        if !body.ends_with('\n') {
            body.push('\n');
        }
        Ok(HttpRequest::new(HttpMethod::Post, self.url(&["_bulk"])).with_body(NDJSON, body))
    }

    pub fn parse_insert_document(
        &self,
        response: HttpResponse,
    ) -> Result<InsertDocument, ApiError> {
        decode(&response)
    }

    /// A 404 decodes to a `Document` with `found == false`.
    pub fn parse_document(&self, response: HttpResponse) -> Result<Document, ApiError> {
        decode(&response)
    }

    pub fn parse_bulk(&self, response: HttpResponse) -> Result<Bulk, ApiError> {
        decode(&response)
    }

    // -----------------------------------------------------------------------
    // Search
    // -----------------------------------------------------------------------

    /// `POST /{index}/{doc_type}/_search`; an empty `doc_type` searches the
    /// whole index.
    pub fn build_search(
        &self,
        index: &str,
        doc_type: &str,
        query: &str,
        explain: bool,
    ) -> HttpRequest {
        let url = if doc_type.is_empty() {
            self.url_with_query(&[index, "_search"], explain)
        } else {
            self.url_with_query(&[index, doc_type, "_search"], explain)
        };
        json_request(HttpMethod::Post, url, query)
    }

    /// `POST /_msearch` with one header line and one single-line body per
    /// query, newline-terminated.
    pub fn build_msearch(&self, queries: &[MSearchQuery]) -> HttpRequest {
        let body = msearch_body(queries);
        HttpRequest::new(HttpMethod::Post, self.url(&["_msearch"])).with_body(NDJSON, body)
    }

    pub fn build_create_search_template(&self, name: &str, template: &str) -> HttpRequest {
        json_request(
            HttpMethod::Post,
            self.url(&["_search", "template", name]),
            template,
        )
    }

    pub fn build_search_template(&self, index: &str, data: &str, explain: bool) -> HttpRequest {
        let url = self.url_with_query(&[index, "_search", "template"], explain);
        json_request(HttpMethod::Post, url, data)
    }

    pub fn build_suggest(&self, index: &str, data: &str) -> HttpRequest {
        json_request(HttpMethod::Post, self.url(&[index, "_suggest"]), data)
    }

    pub fn parse_search(&self, response: HttpResponse) -> Result<SearchResult, ApiError> {
        decode(&response)
    }

    pub fn parse_msearch(&self, response: HttpResponse) -> Result<MSearchResult, ApiError> {
        decode(&response)
    }

    // -----------------------------------------------------------------------
    // Aliases
    // -----------------------------------------------------------------------

    pub fn build_indices_for_alias(&self, alias: &str) -> HttpRequest {
        HttpRequest::new(HttpMethod::Get, self.url(&["*", "_alias", alias]))
    }

    /// `POST /_aliases` with every removal followed by every addition, applied
    /// by the engine as one atomic change.
    pub fn build_update_alias(
        &self,
        remove: &[&str],
        add: &[&str],
        alias: &str,
    ) -> Result<HttpRequest, ApiError> {
        let body = serde_json::to_string(&alias_actions(remove, add, alias))
            .map_err(|e| ApiError::Serialization(e.to_string()))?;
        Ok(HttpRequest::new(HttpMethod::Post, self.url(&["_aliases"])).with_body(JSON, body))
    }

    /// Index names the alias points to, sorted. An unknown alias yields an
    /// empty list rather than the engine's 404 error body.
    pub fn parse_indices_for_alias(&self, response: HttpResponse) -> Result<Vec<String>, ApiError> {
        if response.status == 404 {
            return Ok(Vec::new());
        }
        let indices: BTreeMap<String, Value> = decode(&response)?;
        Ok(indices.into_keys().collect())
    }
}

fn json_request(method: HttpMethod, url: String, body: &str) -> HttpRequest {
    let request = HttpRequest::new(method, url);
    if body.is_empty() {
        request
    } else {
        request.with_body(JSON, body.to_string())
    }
}

fn utf8(data: &[u8]) -> Result<String, ApiError> {
    String::from_utf8(data.to_vec())
        .map_err(|e| ApiError::Serialization(format!("request body is not UTF-8: {e}")))
}

fn msearch_body(queries: &[MSearchQuery]) -> String {
    let mut body = String::new();
    for query in queries {
        body.push_str(&query.header);
        body.push('\n');
        body.push_str(&query.body.replace('\n', " "));
        body.push('\n');
    }
    body
}

fn alias_actions(remove: &[&str], add: &[&str], alias: &str) -> Value {
    let removals = remove
        .iter()
        .map(|index| json!({ "remove": { "index": index, "alias": alias } }));
    let additions = add
        .iter()
        .map(|index| json!({ "add": { "index": index, "alias": alias } }));
    json!({ "actions": removals.chain(additions).collect::<Vec<_>>() })
}

/// Anything outside 2xx, except 404, is an engine failure.
fn check_status(response: &HttpResponse) -> Result<(), ApiError> {
    if (200..300).contains(&response.status) || response.status == 404 {
        return Ok(());
    }
    Err(engine_error(response.status, response.body.clone()))
}

fn engine_error(status: u16, body: String) -> ApiError {
    warn!(status, body = %body, "engine returned an error");
    ApiError::Engine { status, body }
}

fn decode<T: DeserializeOwned>(response: &HttpResponse) -> Result<T, ApiError> {
    check_status(response)?;
    serde_json::from_str(&response.body).map_err(|e| ApiError::Deserialization(e.to_string()))
}
