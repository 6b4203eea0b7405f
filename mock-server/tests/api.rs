use axum::http::{self, Request, StatusCode};
use http_body_util::BodyExt;
use mock_server::app;
use serde_json::{json, Value};
use tower::ServiceExt;

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

fn json_request(method: &str, uri: &str, body: &str) -> Request<String> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(http::header::CONTENT_TYPE, "application/json")
        .body(body.to_string())
        .unwrap()
}

fn empty_request(method: &str, uri: &str) -> Request<String> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(String::new())
        .unwrap()
}

/// Send requests in order against one router and return the last response.
async fn call_all(requests: Vec<Request<String>>) -> axum::response::Response {
    use tower::Service;

    let mut app = app().into_service();
    let mut last = None;
    for request in requests {
        let response = ServiceExt::ready(&mut app)
            .await
            .unwrap()
            .call(request)
            .await
            .unwrap();
        last = Some(response);
    }
    last.expect("at least one request")
}

// --- root ---

#[tokio::test]
async fn info_reports_version() {
    let resp = app().oneshot(empty_request("GET", "/")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let info = body_json(resp).await;
    assert_eq!(info["tagline"], "You Know, for Search");
    assert!(info["version"]["number"].is_string());
}

// --- indices ---

#[tokio::test]
async fn create_index_acknowledges() {
    let resp = app()
        .oneshot(json_request(
            "PUT",
            "/test",
            r#"{"settings":{"number_of_shards":1}}"#,
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["acknowledged"], true);
    assert_eq!(body["index"], "test");
}

#[tokio::test]
async fn create_existing_index_returns_400() {
    let resp = call_all(vec![
        empty_request("PUT", "/test"),
        empty_request("PUT", "/test"),
    ])
    .await;

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body = body_json(resp).await;
    assert_eq!(body["error"]["type"], "resource_already_exists_exception");
    assert_eq!(body["status"], 400);
}

#[tokio::test]
async fn create_index_malformed_json_returns_400() {
    let resp = app()
        .oneshot(json_request("PUT", "/test", "{not json"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(resp).await["error"]["type"], "parse_exception");
}

#[tokio::test]
async fn head_missing_index_returns_404_without_body() {
    let resp = app().oneshot(empty_request("HEAD", "/nope")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert!(body_bytes(resp).await.is_empty());
}

#[tokio::test]
async fn head_existing_index_returns_200() {
    let resp = call_all(vec![
        empty_request("PUT", "/test"),
        empty_request("HEAD", "/test"),
    ])
    .await;

    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn delete_missing_index_returns_404() {
    let resp = app()
        .oneshot(empty_request("DELETE", "/nope"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body = body_json(resp).await;
    assert_eq!(body["error"]["type"], "index_not_found_exception");
    assert_eq!(body["error"]["index"], "nope");
}

#[tokio::test]
async fn settings_update_is_visible() {
    let resp = call_all(vec![
        empty_request("PUT", "/test"),
        json_request("PUT", "/test/_settings", r#"{"index":{"number_of_replicas":0}}"#),
        empty_request("GET", "/test/_settings"),
    ])
    .await;

    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["test"]["settings"]["index"]["number_of_replicas"], "0");
    assert_eq!(body["test"]["settings"]["index"]["number_of_shards"], "5");
}

#[tokio::test]
async fn mapping_round_trip() {
    let resp = call_all(vec![
        empty_request("PUT", "/test"),
        json_request(
            "PUT",
            "/test/_mapping/product",
            r#"{"properties":{"name":{"type":"text"}}}"#,
        ),
        json_request(
            "PUT",
            "/test/_mapping/product",
            r#"{"product":{"properties":{"price":{"type":"float"}}}}"#,
        ),
        empty_request("GET", "/test/_mapping/product"),
    ])
    .await;

    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    let properties = &body["test"]["mappings"]["product"]["properties"];
    assert_eq!(properties["name"]["type"], "text");
    assert_eq!(properties["price"]["type"], "float");
}

#[tokio::test]
async fn status_counts_documents() {
    let resp = call_all(vec![
        json_request("PUT", "/test", r#"{"settings":{"number_of_shards":2}}"#),
        json_request("POST", "/test/doc/1", r#"{"a":1}"#),
        empty_request("GET", "/test/_status"),
    ])
    .await;

    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["_shards"]["successful"], 2);
    assert_eq!(body["_shards"]["total"], 4);
    assert_eq!(body["indices"]["test"]["docs"]["num_docs"], 1);
}

// --- documents ---

#[tokio::test]
async fn index_document_returns_201_then_200() {
    let first = app()
        .oneshot(json_request("POST", "/test/doc/1", r#"{"name":"lamp"}"#))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::CREATED);
    let body = body_json(first).await;
    assert_eq!(body["_version"], 1);
    assert_eq!(body["created"], true);

    let resp = call_all(vec![
        json_request("POST", "/test/doc/1", r#"{"name":"lamp"}"#),
        json_request("PUT", "/test/doc/1", r#"{"name":"desk lamp"}"#),
    ])
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["_version"], 2);
    assert_eq!(body["result"], "updated");
}

#[tokio::test]
async fn index_document_with_generated_id() {
    let resp = app()
        .oneshot(json_request("POST", "/test/doc", r#"{"name":"lamp"}"#))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::CREATED);
    let body = body_json(resp).await;
    assert_eq!(body["_id"].as_str().unwrap().len(), 32);
}

#[tokio::test]
async fn get_missing_document_returns_found_false() {
    let resp = call_all(vec![
        empty_request("PUT", "/test"),
        empty_request("GET", "/test/doc/404"),
    ])
    .await;

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body = body_json(resp).await;
    assert_eq!(body["found"], false);
    assert_eq!(body["_id"], "404");
}

#[tokio::test]
async fn delete_document_bumps_version() {
    let resp = call_all(vec![
        json_request("POST", "/test/doc/1", r#"{"a":1}"#),
        empty_request("DELETE", "/test/doc/1"),
    ])
    .await;

    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["found"], true);
    assert_eq!(body["_version"], 2);
    assert_eq!(body["result"], "deleted");
}

#[tokio::test]
async fn bulk_into_index_uses_path_index() {
    let body = "{\"index\":{\"_id\":\"1\"}}\n{\"a\":1}\n{\"index\":{\"_id\":\"2\"}}\n{\"a\":2}\n";
    let resp = call_all(vec![
        json_request("POST", "/test/_bulk", body),
        json_request("POST", "/test/_search", ""),
    ])
    .await;

    let result = body_json(resp).await;
    assert_eq!(result["hits"]["total"], 2);
    assert_eq!(result["hits"]["hits"][0]["_type"], "doc");
}

#[tokio::test]
async fn bulk_missing_source_line_returns_400() {
    let resp = app()
        .oneshot(json_request(
            "POST",
            "/_bulk",
            "{\"index\":{\"_index\":\"t\",\"_id\":\"1\"}}\n",
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

// --- search ---

#[tokio::test]
async fn search_missing_index_returns_404() {
    let resp = app()
        .oneshot(json_request("POST", "/nope/_search", "{}"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn search_unknown_query_returns_400() {
    let resp = call_all(vec![
        empty_request("PUT", "/test"),
        json_request("POST", "/test/_search", r#"{"query":{"nope":{}}}"#),
    ])
    .await;

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(resp).await["error"]["type"], "parsing_exception");
}

#[tokio::test]
async fn typed_search_filters_by_type_and_explains() {
    let resp = call_all(vec![
        json_request("POST", "/test/product/1", r#"{"name":"lamp"}"#),
        json_request("POST", "/test/review/1", r#"{"name":"lamp review"}"#),
        json_request(
            "POST",
            "/test/product/_search?explain",
            r#"{"query":{"match":{"name":"lamp"}}}"#,
        ),
    ])
    .await;

    let result = body_json(resp).await;
    assert_eq!(result["hits"]["total"], 1);
    let hit = &result["hits"]["hits"][0];
    assert_eq!(hit["_type"], "product");
    assert!(hit["_explanation"].is_object());
}

#[tokio::test]
async fn msearch_reports_errors_per_query() {
    let body = concat!(
        "{\"index\":\"test\"}\n",
        "{\"query\":{\"match_all\":{}}}\n",
        "{\"index\":\"missing\"}\n",
        "{\"query\":{\"match_all\":{}}}\n",
    );
    let resp = call_all(vec![
        json_request("POST", "/test/doc/1", r#"{"a":1}"#),
        json_request("POST", "/_msearch", body),
    ])
    .await;

    assert_eq!(resp.status(), StatusCode::OK);
    let result = body_json(resp).await;
    let responses = result["responses"].as_array().unwrap();
    assert_eq!(responses.len(), 2);
    assert_eq!(responses[0]["hits"]["total"], 1);
    assert_eq!(responses[1]["status"], 404);
}

#[tokio::test]
async fn stored_template_renders_params() {
    let resp = call_all(vec![
        json_request("POST", "/test/doc/1", r#"{"name":"red lamp"}"#),
        json_request("POST", "/test/doc/2", r#"{"name":"blue chair"}"#),
        json_request(
            "POST",
            "/_search/template/by_name",
            r#"{"template":{"query":{"match":{"name":"{{q}}"}}}}"#,
        ),
        json_request(
            "POST",
            "/test/_search/template",
            r#"{"id":"by_name","params":{"q":"chair"}}"#,
        ),
    ])
    .await;

    assert_eq!(resp.status(), StatusCode::OK);
    let result = body_json(resp).await;
    assert_eq!(result["hits"]["total"], 1);
    assert_eq!(result["hits"]["hits"][0]["_id"], "2");
}

#[tokio::test]
async fn unknown_template_returns_404() {
    let resp = call_all(vec![
        empty_request("PUT", "/test"),
        json_request("POST", "/test/_search/template", r#"{"id":"nope"}"#),
    ])
    .await;

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn suggest_completes_prefix() {
    let resp = call_all(vec![
        json_request("POST", "/test/doc/1", r#"{"name_suggest":{"input":["Nevermind"]}}"#),
        json_request("POST", "/test/doc/2", r#"{"name_suggest":{"input":["Nirvana"]}}"#),
        json_request(
            "POST",
            "/test/_suggest",
            r#"{"song":{"prefix":"nev","completion":{"field":"name_suggest"}}}"#,
        ),
    ])
    .await;

    let result = body_json(resp).await;
    let entry = &result["song"][0];
    assert_eq!(entry["text"], "nev");
    assert_eq!(entry["options"].as_array().unwrap().len(), 1);
    assert_eq!(entry["options"][0]["text"], "Nevermind");
}

// --- aliases ---

#[tokio::test]
async fn alias_lookup_lists_indices() {
    let resp = call_all(vec![
        empty_request("PUT", "/v1"),
        empty_request("PUT", "/v2"),
        json_request(
            "POST",
            "/_aliases",
            r#"{"actions":[{"add":{"index":"v1","alias":"live"}},{"add":{"index":"v2","alias":"live"}}]}"#,
        ),
        empty_request("GET", "/*/_alias/live"),
    ])
    .await;

    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body, json!({
        "v1": { "aliases": { "live": {} } },
        "v2": { "aliases": { "live": {} } },
    }));
}

#[tokio::test]
async fn unknown_alias_returns_404() {
    let resp = call_all(vec![
        empty_request("PUT", "/v1"),
        empty_request("GET", "/*/_alias/live"),
    ])
    .await;

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(resp).await["error"], "alias [live] missing");
}

#[tokio::test]
async fn removing_absent_alias_returns_404() {
    let resp = call_all(vec![
        empty_request("PUT", "/v1"),
        json_request(
            "POST",
            "/_aliases",
            r#"{"actions":[{"remove":{"index":"v1","alias":"live"}}]}"#,
        ),
    ])
    .await;

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        body_json(resp).await["error"]["type"],
        "aliases_not_found_exception"
    );
}
