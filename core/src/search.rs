//! One-call API surface: build, execute, parse.
//!
//! Every method maps to exactly one HTTP round-trip through the configured
//! `Transport`. The client holds only the endpoint and the transport, so it
//! can be shared across threads when the transport can.

use crate::client::EsClient;
use crate::config::Endpoint;
use crate::error::ApiError;
use crate::http::{HttpRequest, HttpResponse};
use crate::transport::{Transport, UreqTransport};
use crate::types::{
    Acknowledged, Bulk, Document, EngineInfo, IndexSettings, IndexStatus, InsertDocument,
    MSearchQuery, MSearchResult, SearchResult,
};

/// Blocking client for the engine's REST API.
///
/// ```no_run
/// use es_core::SearchClient;
///
/// let client = SearchClient::new("http", "localhost", "9200")?;
/// if !client.index_exists("products")? {
///     client.create_index("products", r#"{"settings":{"number_of_shards":1}}"#)?;
/// }
/// # Ok::<(), es_core::ApiError>(())
/// ```
#[derive(Clone)]
pub struct SearchClient<T = UreqTransport> {
    api: EsClient,
    transport: T,
}

impl SearchClient<UreqTransport> {
    pub fn new(scheme: &str, host: &str, port: &str) -> Result<Self, ApiError> {
        Ok(Self::with_transport(
            Endpoint::new(scheme, host, port)?,
            UreqTransport::new(),
        ))
    }

    pub fn from_url(raw: &str) -> Result<Self, ApiError> {
        Ok(Self::with_transport(
            Endpoint::parse(raw)?,
            UreqTransport::new(),
        ))
    }
}

impl<T: Transport> SearchClient<T> {
    pub fn with_transport(endpoint: Endpoint, transport: T) -> Self {
        Self {
            api: EsClient::from_endpoint(&endpoint),
            transport,
        }
    }

    /// The request builder behind this client.
    pub fn api(&self) -> &EsClient {
        &self.api
    }

    fn send(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        self.transport.execute(request)
    }

    pub fn create_index(&self, index: &str, settings: &str) -> Result<Acknowledged, ApiError> {
        let response = self.send(self.api.build_create_index(index, settings))?;
        self.api.parse_acknowledged(response)
    }

    pub fn delete_index(&self, index: &str) -> Result<Acknowledged, ApiError> {
        let response = self.send(self.api.build_delete_index(index))?;
        self.api.parse_acknowledged(response)
    }

    pub fn update_index_settings(
        &self,
        index: &str,
        settings: &str,
    ) -> Result<Acknowledged, ApiError> {
        let response = self.send(self.api.build_update_index_settings(index, settings))?;
        self.api.parse_acknowledged(response)
    }

    pub fn index_settings(&self, index: &str) -> Result<IndexSettings, ApiError> {
        let response = self.send(self.api.build_index_settings(index))?;
        self.api.parse_index_settings(index, response)
    }

    pub fn index_exists(&self, index: &str) -> Result<bool, ApiError> {
        let response = self.send(self.api.build_index_exists(index))?;
        self.api.parse_index_exists(response)
    }

    /// Raw mapping JSON for `doc_type` in `index`.
    pub fn get_mapping(&self, index: &str, doc_type: &str) -> Result<String, ApiError> {
        let response = self.send(self.api.build_get_mapping(index, doc_type))?;
        self.api.parse_raw(response)
    }

    pub fn put_mapping(
        &self,
        index: &str,
        doc_type: &str,
        mapping: &str,
    ) -> Result<Acknowledged, ApiError> {
        let response = self.send(self.api.build_put_mapping(index, doc_type, mapping))?;
        self.api.parse_acknowledged(response)
    }

    pub fn status(&self, indices: &str) -> Result<IndexStatus, ApiError> {
        let response = self.send(self.api.build_status(indices))?;
        self.api.parse_status(response)
    }

    pub fn info(&self) -> Result<EngineInfo, ApiError> {
        let response = self.send(self.api.build_info())?;
        self.api.parse_info(response)
    }

    /// Index `data` under `index/doc_type/id`, replacing any previous version.
    pub fn insert_document(
        &self,
        index: &str,
        doc_type: &str,
        id: &str,
        data: &[u8],
    ) -> Result<InsertDocument, ApiError> {
        let response = self.send(self.api.build_insert_document(index, doc_type, id, data)?)?;
        self.api.parse_insert_document(response)
    }

    pub fn document(&self, index: &str, doc_type: &str, id: &str) -> Result<Document, ApiError> {
        let response = self.send(self.api.build_document(index, doc_type, id))?;
        self.api.parse_document(response)
    }

    pub fn delete_document(
        &self,
        index: &str,
        doc_type: &str,
        id: &str,
    ) -> Result<Document, ApiError> {
        let response = self.send(self.api.build_delete_document(index, doc_type, id))?;
        self.api.parse_document(response)
    }

    /// Send a caller-built NDJSON bulk payload.
    pub fn bulk(&self, data: &[u8]) -> Result<Bulk, ApiError> {
        let response = self.send(self.api.build_bulk(data)?)?;
        self.api.parse_bulk(response)
    }

    pub fn search(
        &self,
        index: &str,
        doc_type: &str,
        query: &str,
        explain: bool,
    ) -> Result<SearchResult, ApiError> {
        let response = self.send(self.api.build_search(index, doc_type, query, explain))?;
        self.api.parse_search(response)
    }

    pub fn msearch(&self, queries: &[MSearchQuery]) -> Result<MSearchResult, ApiError> {
        let response = self.send(self.api.build_msearch(queries))?;
        self.api.parse_msearch(response)
    }

    pub fn create_search_template(
        &self,
        name: &str,
        template: &str,
    ) -> Result<Acknowledged, ApiError> {
        let response = self.send(self.api.build_create_search_template(name, template))?;
        self.api.parse_acknowledged(response)
    }

    pub fn search_template(
        &self,
        index: &str,
        data: &str,
        explain: bool,
    ) -> Result<SearchResult, ApiError> {
        let response = self.send(self.api.build_search_template(index, data, explain))?;
        self.api.parse_search(response)
    }

    /// Raw suggester response.
    pub fn suggest(&self, index: &str, data: &str) -> Result<String, ApiError> {
        let response = self.send(self.api.build_suggest(index, data))?;
        self.api.parse_raw(response)
    }

    pub fn indices_for_alias(&self, alias: &str) -> Result<Vec<String>, ApiError> {
        let response = self.send(self.api.build_indices_for_alias(alias))?;
        self.api.parse_indices_for_alias(response)
    }

    /// Atomically detach `alias` from `remove` and attach it to `add`.
    pub fn update_alias(
        &self,
        remove: &[&str],
        add: &[&str],
        alias: &str,
    ) -> Result<Acknowledged, ApiError> {
        let response = self.send(self.api.build_update_alias(remove, add, alias)?)?;
        self.api.parse_acknowledged(response)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::VecDeque;

    use super::*;
    use crate::http::HttpMethod;

    /// Records requests and replays canned responses in order.
    #[derive(Default)]
    struct Scripted {
        sent: RefCell<Vec<HttpRequest>>,
        replies: RefCell<VecDeque<Result<HttpResponse, ApiError>>>,
    }

    impl Scripted {
        fn reply(self, status: u16, body: &str) -> Self {
            self.replies
                .borrow_mut()
                .push_back(Ok(HttpResponse::new(status, body)));
            self
        }

        fn fail(self, msg: &str) -> Self {
            self.replies
                .borrow_mut()
                .push_back(Err(ApiError::Transport(msg.to_string())));
            self
        }
    }

    impl Transport for &Scripted {
        fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
            self.sent.borrow_mut().push(request);
            self.replies
                .borrow_mut()
                .pop_front()
                .expect("no scripted reply left")
        }
    }

    fn client(transport: &Scripted) -> SearchClient<&Scripted> {
        let endpoint = Endpoint::new("http", "localhost", "9200").unwrap();
        SearchClient::with_transport(endpoint, transport)
    }

    #[test]
    fn create_index_sends_put_and_decodes_ack() {
        let transport = Scripted::default().reply(200, r#"{"acknowledged":true}"#);
        let ack = client(&transport).create_index("test", "{}").unwrap();
        assert!(ack.acknowledged);

        let sent = transport.sent.borrow();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].method, HttpMethod::Put);
        assert_eq!(sent[0].path, "http://localhost:9200/test");
    }

    #[test]
    fn transport_failure_propagates() {
        let transport = Scripted::default().fail("connection refused");
        let err = client(&transport).index_exists("test").unwrap_err();
        assert!(matches!(err, ApiError::Transport(msg) if msg == "connection refused"));
    }

    #[test]
    fn engine_failure_carries_body() {
        let transport = Scripted::default().reply(400, r#"{"error":"bad query"}"#);
        let err = client(&transport)
            .search("test", "", "{", false)
            .unwrap_err();
        match err {
            ApiError::Engine { status, body } => {
                assert_eq!(status, 400);
                assert!(body.contains("bad query"));
            }
            other => panic!("expected Engine error, got {other:?}"),
        }
    }

    #[test]
    fn invalid_body_fails_before_sending() {
        let transport = Scripted::default();
        let err = client(&transport).bulk(&[0xc3, 0x28]).unwrap_err();
        assert!(matches!(err, ApiError::Serialization(_)));
        assert!(transport.sent.borrow().is_empty());
    }

    #[test]
    fn suggest_returns_raw_body() {
        let body = r#"{"name-suggest":[{"text":"lam","offset":0,"length":3,"options":[]}]}"#;
        let transport = Scripted::default().reply(200, body);
        let raw = client(&transport).suggest("test", "{}").unwrap();
        assert_eq!(raw, body);
    }

    #[test]
    fn from_url_rejects_bad_endpoint() {
        assert!(matches!(
            SearchClient::from_url("localhost:9200").err(),
            Some(ApiError::InvalidUrl(_))
        ));
    }
}
