//! Response shapes returned by the search engine.
//!
//! # Design
//! Plain data-transfer types mirroring the engine's JSON payloads. Fields the
//! engine omits in some responses (`error`, `_source`, per-item bulk blocks)
//! are `Option` or `#[serde(default)]`, so a 404 body decodes into the same
//! type as a 200 body. Document sources stay as raw `serde_json::Value`;
//! the caller decides what shape they have.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Acknowledgement returned by index, mapping, template and alias writes.
///
/// On failure the engine still answers with this shape: `acknowledged` is
/// false and `error`/`status` describe the problem.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Acknowledged {
    #[serde(default)]
    pub acknowledged: bool,
    /// Either a plain message or a structured `{type, reason, ...}` object.
    #[serde(default)]
    pub error: Option<Value>,
    #[serde(default)]
    pub status: Option<u16>,
}

/// Settings of a single index, as found under `{index}.settings`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct IndexSettings {
    #[serde(default)]
    pub settings: Value,
}

/// Shard and per-index status information from `/{indices}/_status`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct IndexStatus {
    #[serde(rename = "_shards", default)]
    pub shards: BTreeMap<String, Value>,
    #[serde(default)]
    pub indices: BTreeMap<String, Value>,
}

/// Node banner returned by the root endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct EngineInfo {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub cluster_name: Option<String>,
    #[serde(default)]
    pub tagline: String,
    #[serde(default)]
    pub version: EngineVersion,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct EngineVersion {
    #[serde(default)]
    pub number: String,
    #[serde(default)]
    pub build_hash: String,
    #[serde(default)]
    pub build_timestamp: Option<String>,
    #[serde(default)]
    pub build_snapshot: bool,
    #[serde(default)]
    pub lucene_version: String,
}

/// Result of indexing a single document.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct InsertDocument {
    #[serde(default)]
    pub created: bool,
    #[serde(rename = "_index")]
    pub index: String,
    #[serde(rename = "_type", default)]
    pub doc_type: String,
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_version", default)]
    pub version: u64,
    /// `created` or `updated` on engines that report it.
    #[serde(default)]
    pub result: Option<String>,
}

/// A stored document, or the envelope describing a missing one.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Document {
    #[serde(rename = "_index", default)]
    pub index: String,
    #[serde(rename = "_type", default)]
    pub doc_type: String,
    #[serde(rename = "_id", default)]
    pub id: String,
    #[serde(rename = "_version", default)]
    pub version: u64,
    #[serde(default)]
    pub found: bool,
    #[serde(rename = "_source", default)]
    pub source: Option<Value>,
}

/// Result of a `_bulk` request.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Bulk {
    #[serde(default)]
    pub took: u64,
    #[serde(default)]
    pub errors: bool,
    #[serde(default)]
    pub items: Vec<BulkItem>,
}

/// One entry of `Bulk::items`; exactly one field is set per entry.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct BulkItem {
    #[serde(default)]
    pub index: Option<BulkItemResult>,
    #[serde(default)]
    pub create: Option<BulkItemResult>,
    #[serde(default)]
    pub delete: Option<BulkItemResult>,
    #[serde(default)]
    pub update: Option<BulkItemResult>,
}

impl BulkItem {
    /// The per-item result regardless of which action produced it.
    pub fn result(&self) -> Option<&BulkItemResult> {
        self.index
            .as_ref()
            .or(self.create.as_ref())
            .or(self.delete.as_ref())
            .or(self.update.as_ref())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct BulkItemResult {
    #[serde(rename = "_index", default)]
    pub index: String,
    #[serde(rename = "_type", default)]
    pub doc_type: String,
    #[serde(rename = "_id", default)]
    pub id: String,
    #[serde(rename = "_version", default)]
    pub version: u64,
    #[serde(default)]
    pub status: u16,
    #[serde(default)]
    pub error: Option<Value>,
}

/// Result of `_search` and `_search/template`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SearchResult {
    #[serde(default)]
    pub took: u64,
    #[serde(default)]
    pub timed_out: bool,
    #[serde(rename = "_shards", default)]
    pub shards: Shards,
    #[serde(default)]
    pub hits: Hits,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Shards {
    #[serde(default)]
    pub total: u32,
    #[serde(default)]
    pub successful: u32,
    #[serde(default)]
    pub failed: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Hits {
    /// Number of matching documents, independent of `size`.
    #[serde(default, deserialize_with = "hits_total")]
    pub total: u64,
    #[serde(default)]
    pub max_score: Option<f64>,
    #[serde(default)]
    pub hits: Vec<Hit>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Hit {
    #[serde(rename = "_index", default)]
    pub index: String,
    #[serde(rename = "_type", default)]
    pub doc_type: String,
    #[serde(rename = "_id", default)]
    pub id: String,
    #[serde(rename = "_score", default)]
    pub score: Option<f64>,
    #[serde(rename = "_source", default)]
    pub source: Value,
}

/// Older engines send `total` as a number, newer ones as
/// `{"value": n, "relation": "eq"}`.
fn hits_total<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Total {
        Count(u64),
        Object { value: u64 },
    }

    Ok(match Total::deserialize(deserializer)? {
        Total::Count(n) => n,
        Total::Object { value } => value,
    })
}

/// One sub-request of a multi-search: a header line naming the target
/// (e.g. `{"index": "products"}`) and the query body.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct MSearchQuery {
    pub header: String,
    pub body: String,
}

impl MSearchQuery {
    pub fn new(header: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            header: header.into(),
            body: body.into(),
        }
    }
}

/// Result of `_msearch`, one entry per `MSearchQuery` in request order.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MSearchResult {
    #[serde(default)]
    pub responses: Vec<SearchResult>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hits_total_accepts_number_and_object() {
        let old: Hits = serde_json::from_str(r#"{"total":3,"hits":[]}"#).unwrap();
        assert_eq!(old.total, 3);

        let new: Hits =
            serde_json::from_str(r#"{"total":{"value":7,"relation":"eq"},"hits":[]}"#).unwrap();
        assert_eq!(new.total, 7);
    }

    #[test]
    fn acknowledged_accepts_string_and_object_errors() {
        let plain: Acknowledged =
            serde_json::from_str(r#"{"error":"IndexMissingException[[x] missing]","status":404}"#)
                .unwrap();
        assert!(!plain.acknowledged);
        assert_eq!(plain.status, Some(404));
        assert!(plain.error.unwrap().is_string());

        let structured: Acknowledged = serde_json::from_str(
            r#"{"error":{"type":"index_not_found_exception","reason":"no such index"},"status":404}"#,
        )
        .unwrap();
        assert_eq!(structured.error.unwrap()["type"], "index_not_found_exception");
    }

    #[test]
    fn missing_document_decodes_without_source() {
        let doc: Document =
            serde_json::from_str(r#"{"_index":"test","_type":"doc","_id":"1","found":false}"#)
                .unwrap();
        assert!(!doc.found);
        assert!(doc.source.is_none());
        assert_eq!(doc.version, 0);
    }

    #[test]
    fn bulk_item_result_picks_the_populated_action() {
        let bulk: Bulk = serde_json::from_str(
            r#"{"took":3,"errors":true,"items":[
                {"index":{"_index":"t","_type":"doc","_id":"1","_version":1,"status":201}},
                {"delete":{"_index":"t","_type":"doc","_id":"2","status":404}}
            ]}"#,
        )
        .unwrap();
        assert!(bulk.errors);
        assert_eq!(bulk.items[0].result().unwrap().status, 201);
        assert_eq!(bulk.items[1].result().unwrap().id, "2");
        assert!(bulk.items[1].index.is_none());
    }

    #[test]
    fn search_hit_with_null_score() {
        let result: SearchResult = serde_json::from_str(
            r#"{"took":1,"timed_out":false,"_shards":{"total":5,"successful":5,"failed":0},
                "hits":{"total":1,"max_score":null,"hits":[
                    {"_index":"t","_type":"doc","_id":"1","_score":null,"_source":{"name":"a"}}
                ]}}"#,
        )
        .unwrap();
        assert_eq!(result.shards.total, 5);
        assert!(result.hits.max_score.is_none());
        assert_eq!(result.hits.hits[0].source["name"], "a");
    }
}
