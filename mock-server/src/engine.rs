//! In-memory engine state and the operations behind each endpoint.
//!
//! Every operation returns the status and JSON body the real engine would
//! send, or an `EngineError` that renders as the engine's error envelope.

use std::collections::{BTreeMap, BTreeSet};
use std::time::Instant;

use axum::http::StatusCode;
use serde_json::{json, Map, Value};
use tracing::debug;
use uuid::Uuid;

use crate::error::EngineError;
use crate::query::{self, Candidate, SearchBody};

/// Type used when a bulk action does not name one.
pub const DEFAULT_TYPE: &str = "doc";
const DEFAULT_SHARDS: u64 = 5;
const DEFAULT_REPLICAS: u64 = 1;
const DEFAULT_SUGGEST_SIZE: usize = 5;

pub type Reply = (StatusCode, Value);

#[derive(Debug, Clone, Default)]
pub struct Engine {
    indices: BTreeMap<String, Index>,
    templates: BTreeMap<String, Value>,
}

#[derive(Debug, Clone)]
struct Index {
    /// Flat `index.*` settings with scalar values stored as strings.
    settings: Map<String, Value>,
    mappings: BTreeMap<String, Value>,
    aliases: BTreeSet<String>,
    docs: BTreeMap<(String, String), StoredDoc>,
}

#[derive(Debug, Clone)]
struct StoredDoc {
    version: u64,
    source: Value,
}

impl Index {
    fn new() -> Self {
        let mut settings = Map::new();
        settings.insert("number_of_shards".into(), json!(DEFAULT_SHARDS.to_string()));
        settings.insert(
            "number_of_replicas".into(),
            json!(DEFAULT_REPLICAS.to_string()),
        );
        settings.insert("uuid".into(), json!(Uuid::new_v4().simple().to_string()));
        Self {
            settings,
            mappings: BTreeMap::new(),
            aliases: BTreeSet::new(),
            docs: BTreeMap::new(),
        }
    }

    fn numeric_setting(&self, key: &str, default: u64) -> u64 {
        self.settings
            .get(key)
            .and_then(Value::as_str)
            .and_then(|s| s.parse().ok())
            .unwrap_or(default)
    }

    fn shards(&self) -> u64 {
        self.numeric_setting("number_of_shards", DEFAULT_SHARDS)
    }
}

fn acknowledged() -> Reply {
    (StatusCode::OK, json!({ "acknowledged": true }))
}

/// Parse a request body that must be a JSON object; empty means `{}`.
fn parse_object(body: &str) -> Result<Map<String, Value>, EngineError> {
    if body.trim().is_empty() {
        return Ok(Map::new());
    }
    match serde_json::from_str(body) {
        Ok(Value::Object(object)) => Ok(object),
        Ok(_) => Err(EngineError::parse("request body must be a JSON object")),
        Err(e) => Err(EngineError::parse(format!("failed to parse request body: {e}"))),
    }
}

fn validate_index_name(name: &str) -> Result<(), EngineError> {
    if name.is_empty() {
        return Err(EngineError::invalid_index_name(name, "must not be empty"));
    }
    if name.starts_with(['_', '-', '+']) {
        return Err(EngineError::invalid_index_name(
            name,
            "must not start with '_', '-', or '+'",
        ));
    }
    if name.chars().any(|c| c.is_uppercase()) {
        return Err(EngineError::invalid_index_name(name, "must be lowercase"));
    }
    if name.contains(['\\', '/', '*', '?', '"', '<', '>', '|', ' ', ',', '#']) {
        return Err(EngineError::invalid_index_name(
            name,
            "must not contain reserved characters",
        ));
    }
    Ok(())
}

/// `*` matches any run of characters.
fn glob(pattern: &str, name: &str) -> bool {
    let mut parts = pattern.split('*');
    let first = parts.next().unwrap_or_default();
    let Some(mut rest) = name.strip_prefix(first) else {
        return false;
    };
    let parts: Vec<&str> = parts.collect();
    let Some((last, middle)) = parts.split_last() else {
        return rest.is_empty();
    };
    for part in middle {
        match rest.find(part) {
            Some(at) => rest = &rest[at + part.len()..],
            None => return false,
        }
    }
    rest.ends_with(last)
}

fn stringify_scalar(value: &Value) -> Value {
    match value {
        Value::Bool(_) | Value::Number(_) => Value::String(value.to_string()),
        other => other.clone(),
    }
}

/// Merge `{"index": {...}}`, `{"index.key": ...}` or flat settings into `target`.
fn merge_settings(
    target: &mut Map<String, Value>,
    settings: &Value,
    updating: bool,
) -> Result<(), EngineError> {
    let Some(object) = settings.as_object() else {
        return Err(EngineError::parse("settings must be an object"));
    };
    let object = match object.get("index") {
        Some(Value::Object(inner)) => inner,
        _ => object,
    };
    for (key, value) in object {
        let key = key.strip_prefix("index.").unwrap_or(key);
        if updating && key == "number_of_shards" {
            return Err(EngineError::illegal_argument(
                "final index setting [index.number_of_shards], not updateable",
            ));
        }
        target.insert(key.to_string(), stringify_scalar(value));
    }
    Ok(())
}

/// Recursive object merge used by partial document updates.
fn merge_objects(target: &mut Value, patch: &Value) {
    match (target, patch) {
        (Value::Object(target), Value::Object(patch)) => {
            for (key, value) in patch {
                let nested = value.is_object() && target.get(key).is_some_and(Value::is_object);
                if !nested {
                    target.insert(key.clone(), value.clone());
                } else if let Some(existing) = target.get_mut(key) {
                    merge_objects(existing, value);
                }
            }
        }
        (target, patch) => *target = patch.clone(),
    }
}

fn write_shards() -> Value {
    json!({ "total": 2, "successful": 1, "failed": 0 })
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}

impl Engine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn info(&self) -> Value {
        json!({
            "name": "mock-node",
            "cluster_name": "mock-cluster",
            "version": {
                "number": "5.6.16",
                "build_hash": "3a740d1",
                "build_timestamp": "2019-03-13T15:33:36.565Z",
                "build_snapshot": false,
                "lucene_version": "6.6.1"
            },
            "tagline": "You Know, for Search"
        })
    }

    fn is_alias(&self, name: &str) -> bool {
        self.indices.values().any(|i| i.aliases.contains(name))
    }

    /// Expand an index expression (names, aliases, wildcards, `_all`, comma
    /// lists) into concrete index names.
    fn resolve(&self, expression: &str) -> Result<Vec<String>, EngineError> {
        let mut names = BTreeSet::new();
        for part in expression.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            if part == "_all" || part == "*" {
                names.extend(self.indices.keys().cloned());
            } else if part.contains('*') {
                names.extend(self.indices.keys().filter(|n| glob(part, n)).cloned());
            } else if self.indices.contains_key(part) {
                names.insert(part.to_string());
            } else if self.is_alias(part) {
                names.extend(
                    self.indices
                        .iter()
                        .filter(|(_, i)| i.aliases.contains(part))
                        .map(|(n, _)| n.clone()),
                );
            } else {
                return Err(EngineError::index_not_found(part));
            }
        }
        Ok(names.into_iter().collect())
    }

    /// The single index a document operation targets. Aliases are followed
    /// when they point at exactly one index.
    fn concrete_index(&self, name: &str) -> Result<Option<String>, EngineError> {
        if self.indices.contains_key(name) {
            return Ok(Some(name.to_string()));
        }
        if !self.is_alias(name) {
            return Ok(None);
        }
        let targets = self.resolve(name)?;
        match targets.as_slice() {
            [single] => Ok(Some(single.clone())),
            _ => Err(EngineError::illegal_argument(format!(
                "Alias [{name}] has more than one index associated with it, can't execute a single index op"
            ))),
        }
    }

    fn existing_index(&self, name: &str) -> Result<String, EngineError> {
        self.concrete_index(name)?
            .ok_or_else(|| EngineError::index_not_found(name))
    }

    fn index_mut(&mut self, name: &str) -> Result<&mut Index, EngineError> {
        self.indices
            .get_mut(name)
            .ok_or_else(|| EngineError::index_not_found(name))
    }

    // -----------------------------------------------------------------------
    // Index lifecycle
    // -----------------------------------------------------------------------

    pub fn create_index(&mut self, name: &str, body: &str) -> Result<Reply, EngineError> {
        validate_index_name(name)?;
        if self.indices.contains_key(name) || self.is_alias(name) {
            return Err(EngineError::index_exists(name));
        }
        let body = parse_object(body)?;

        let mut index = Index::new();
        if let Some(settings) = body.get("settings") {
            merge_settings(&mut index.settings, settings, false)?;
        }
        if let Some(Value::Object(mappings)) = body.get("mappings") {
            for (doc_type, mapping) in mappings {
                index.mappings.insert(doc_type.clone(), mapping.clone());
            }
        }
        if let Some(Value::Object(aliases)) = body.get("aliases") {
            index.aliases.extend(aliases.keys().cloned());
        }

        self.indices.insert(name.to_string(), index);
        debug!(index = name, "created index");
        Ok((
            StatusCode::OK,
            json!({ "acknowledged": true, "shards_acknowledged": true, "index": name }),
        ))
    }

    pub fn delete_index(&mut self, expression: &str) -> Result<Reply, EngineError> {
        for name in self.resolve(expression)? {
            self.indices.remove(&name);
            debug!(index = %name, "deleted index");
        }
        Ok(acknowledged())
    }

    pub fn index_exists(&self, name: &str) -> bool {
        self.indices.contains_key(name)
    }

    pub fn settings(&self, expression: &str) -> Result<Reply, EngineError> {
        let mut out = Map::new();
        for name in self.resolve(expression)? {
            let index = &self.indices[&name];
            out.insert(name, json!({ "settings": { "index": index.settings } }));
        }
        Ok((StatusCode::OK, Value::Object(out)))
    }

    pub fn update_settings(&mut self, expression: &str, body: &str) -> Result<Reply, EngineError> {
        let body = parse_object(body)?;
        let settings = body
            .get("settings")
            .cloned()
            .unwrap_or_else(|| Value::Object(body.clone()));
        for name in self.resolve(expression)? {
            merge_settings(&mut self.index_mut(&name)?.settings, &settings, true)?;
            debug!(index = %name, "updated settings");
        }
        Ok(acknowledged())
    }

    pub fn status(&self, expression: &str) -> Result<Reply, EngineError> {
        let names = self.resolve(expression)?;
        let mut total = 0;
        let mut successful = 0;
        let mut indices = Map::new();
        for name in names {
            let index = &self.indices[&name];
            let shards = index.shards();
            let replicas = index.numeric_setting("number_of_replicas", DEFAULT_REPLICAS);
            total += shards * (1 + replicas);
            successful += shards;
            indices.insert(
                name,
                json!({
                    "shards": shards,
                    "docs": { "num_docs": index.docs.len(), "deleted_docs": 0 },
                    "aliases": index.aliases,
                }),
            );
        }
        Ok((
            StatusCode::OK,
            json!({
                "_shards": { "total": total, "successful": successful, "failed": 0 },
                "indices": indices,
            }),
        ))
    }

    pub fn mapping(&self, expression: &str, doc_type: &str) -> Result<Reply, EngineError> {
        let mut out = Map::new();
        for name in self.resolve(expression)? {
            let index = &self.indices[&name];
            let mappings: Map<String, Value> = index
                .mappings
                .iter()
                .filter(|(t, _)| doc_type == "_all" || glob(doc_type, t))
                .map(|(t, m)| (t.clone(), m.clone()))
                .collect();
            if !mappings.is_empty() {
                out.insert(name, json!({ "mappings": mappings }));
            }
        }
        Ok((StatusCode::OK, Value::Object(out)))
    }

    pub fn put_mapping(
        &mut self,
        expression: &str,
        doc_type: &str,
        body: &str,
    ) -> Result<Reply, EngineError> {
        let body = parse_object(body)?;
        let mapping = match body.get(doc_type) {
            Some(Value::Object(inner)) => Value::Object(inner.clone()),
            _ => Value::Object(body.clone()),
        };
        for name in self.resolve(expression)? {
            let index = self.index_mut(&name)?;
            let entry = index
                .mappings
                .entry(doc_type.to_string())
                .or_insert_with(|| json!({ "properties": {} }));
            merge_objects(entry, &mapping);
            debug!(index = %name, doc_type, "updated mapping");
        }
        Ok(acknowledged())
    }

    // -----------------------------------------------------------------------
    // Documents
    // -----------------------------------------------------------------------

    /// Index (or with `create_only`, create) one document. Missing indices are
    /// created with default settings.
    pub fn write_document(
        &mut self,
        index: &str,
        doc_type: &str,
        id: Option<&str>,
        source: Value,
        create_only: bool,
    ) -> Result<Reply, EngineError> {
        if !source.is_object() {
            return Err(EngineError::parse("document source must be an object"));
        }
        let name = match self.concrete_index(index)? {
            Some(name) => name,
            None => {
                self.create_index(index, "")?;
                index.to_string()
            }
        };
        let id = id.map_or_else(|| Uuid::new_v4().simple().to_string(), str::to_string);
        let key = (doc_type.to_string(), id.clone());

        let docs = &mut self.index_mut(&name)?.docs;
        let previous = docs.get(&key).map(|doc| doc.version);
        if previous.is_some() && create_only {
            return Err(EngineError::conflict(format!(
                "[{doc_type}][{id}]: version conflict, document already exists"
            )));
        }
        let version = previous.map_or(1, |v| v + 1);
        docs.insert(key, StoredDoc { version, source });
        let created = previous.is_none();
        debug!(index = %name, doc_type, id = %id, version, "indexed document");

        let status = if created {
            StatusCode::CREATED
        } else {
            StatusCode::OK
        };
        Ok((
            status,
            json!({
                "_index": name,
                "_type": doc_type,
                "_id": id,
                "_version": version,
                "result": if created { "created" } else { "updated" },
                "created": created,
                "_shards": write_shards(),
            }),
        ))
    }

    /// Apply a partial `doc` to an existing document, or insert `upsert`.
    fn update_document(
        &mut self,
        index: &str,
        doc_type: &str,
        id: &str,
        body: &Value,
    ) -> Result<Reply, EngineError> {
        let patch = body.get("doc");
        let upsert = match (body.get("upsert"), body.get("doc_as_upsert")) {
            (Some(upsert), _) => Some(upsert),
            (None, Some(Value::Bool(true))) => patch,
            _ => None,
        };
        let name = self.existing_index(index)?;
        let key = (doc_type.to_string(), id.to_string());
        let existing = self.index_mut(&name)?.docs.get(&key).cloned();

        match (existing, patch, upsert) {
            (Some(mut doc), Some(patch), _) => {
                merge_objects(&mut doc.source, patch);
                let reply = self.write_document(&name, doc_type, Some(id), doc.source, false)?;
                Ok((StatusCode::OK, reply.1))
            }
            (Some(_), None, _) => Err(EngineError::validation("script or doc is missing")),
            (None, _, Some(upsert)) => {
                self.write_document(&name, doc_type, Some(id), upsert.clone(), true)
            }
            (None, _, None) => Err(EngineError::not_found(
                "document_missing_exception",
                format!("[{doc_type}][{id}]: document missing"),
            )),
        }
    }

    pub fn get_document(&self, index: &str, doc_type: &str, id: &str) -> Result<Reply, EngineError> {
        let name = self.existing_index(index)?;
        let key = (doc_type.to_string(), id.to_string());
        Ok(match self.indices[&name].docs.get(&key) {
            Some(doc) => (
                StatusCode::OK,
                json!({
                    "_index": name,
                    "_type": doc_type,
                    "_id": id,
                    "_version": doc.version,
                    "found": true,
                    "_source": doc.source,
                }),
            ),
            None => (
                StatusCode::NOT_FOUND,
                json!({ "_index": name, "_type": doc_type, "_id": id, "found": false }),
            ),
        })
    }

    pub fn delete_document(
        &mut self,
        index: &str,
        doc_type: &str,
        id: &str,
    ) -> Result<Reply, EngineError> {
        let name = self.existing_index(index)?;
        let key = (doc_type.to_string(), id.to_string());
        let removed = self.index_mut(&name)?.docs.remove(&key);
        let (status, found, version) = match removed {
            Some(doc) => (StatusCode::OK, true, doc.version + 1),
            None => (StatusCode::NOT_FOUND, false, 1),
        };
        debug!(index = %name, doc_type, id, found, "deleted document");
        Ok((
            status,
            json!({
                "found": found,
                "_index": name,
                "_type": doc_type,
                "_id": id,
                "_version": version,
                "result": if found { "deleted" } else { "not_found" },
                "_shards": write_shards(),
            }),
        ))
    }

    /// Execute an NDJSON bulk body. Malformed action lines fail the whole
    /// request; per-document failures are reported per item.
    pub fn bulk(&mut self, default_index: Option<&str>, body: &str) -> Result<Reply, EngineError> {
        let started = Instant::now();
        let mut lines = body.lines().filter(|l| !l.trim().is_empty());
        let mut items = Vec::new();
        let mut errors = false;

        while let Some(action_line) = lines.next() {
            let action = parse_object(action_line)?;
            let mut entries = action.into_iter();
            let (op, meta) = match (entries.next(), entries.next()) {
                (Some(entry), None) => entry,
                _ => return Err(EngineError::validation("Malformed action/metadata line")),
            };
            let index = meta
                .get("_index")
                .and_then(Value::as_str)
                .or(default_index)
                .ok_or_else(|| EngineError::validation("index is missing"))?
                .to_string();
            let doc_type = meta
                .get("_type")
                .and_then(Value::as_str)
                .unwrap_or(DEFAULT_TYPE)
                .to_string();
            let id = match meta.get("_id") {
                Some(Value::String(s)) => Some(s.clone()),
                Some(Value::Number(n)) => Some(n.to_string()),
                _ => None,
            };

            let outcome = match op.as_str() {
                "index" | "create" | "update" => {
                    let source_line = lines.next().ok_or_else(|| {
                        EngineError::validation(format!("[{op}] action is missing its source line"))
                    })?;
                    match serde_json::from_str::<Value>(source_line) {
                        Err(e) => Err(EngineError::parse(format!("failed to parse source: {e}"))),
                        Ok(source) if op == "update" => match id.as_deref() {
                            Some(id) => self.update_document(&index, &doc_type, id, &source),
                            None => Err(EngineError::validation("id is missing")),
                        },
                        Ok(source) => self.write_document(
                            &index,
                            &doc_type,
                            id.as_deref(),
                            source,
                            op == "create",
                        ),
                    }
                }
                "delete" => match id.as_deref() {
                    Some(id) => self.delete_document(&index, &doc_type, id),
                    None => Err(EngineError::validation("id is missing")),
                },
                other => {
                    return Err(EngineError::validation(format!(
                        "Malformed action/metadata line, expected one of [create, delete, index, update] but found [{other}]"
                    )))
                }
            };

            let item = match outcome {
                Ok((status, mut item)) => {
                    item["status"] = json!(status.as_u16());
                    item
                }
                Err(err) => {
                    errors = true;
                    json!({
                        "_index": index,
                        "_type": doc_type,
                        "_id": id,
                        "status": err.status.as_u16(),
                        "error": err.body(),
                    })
                }
            };
            let mut entry = Map::new();
            entry.insert(op, item);
            items.push(Value::Object(entry));
        }

        debug!(items = items.len(), errors, "processed bulk request");
        Ok((
            StatusCode::OK,
            json!({ "took": elapsed_ms(started), "errors": errors, "items": items }),
        ))
    }

    // -----------------------------------------------------------------------
    // Search
    // -----------------------------------------------------------------------

    pub fn search(
        &self,
        expression: &str,
        doc_type: Option<&str>,
        body: &str,
        explain: bool,
    ) -> Result<Reply, EngineError> {
        let started = Instant::now();
        let names = self.resolve(expression)?;
        let request = SearchBody::parse(body)?;
        Ok((
            StatusCode::OK,
            self.run_search(&names, doc_type, &request, explain, started),
        ))
    }

    fn run_search(
        &self,
        names: &[String],
        doc_type: Option<&str>,
        request: &SearchBody,
        explain: bool,
        started: Instant,
    ) -> Value {
        let types: Option<Vec<&str>> = doc_type
            .filter(|t| !t.is_empty() && *t != "_all")
            .map(|t| t.split(',').collect());

        let mut matched = Vec::new();
        for name in names {
            for ((t, id), doc) in &self.indices[name].docs {
                let type_ok = types.as_ref().map_or(true, |ts| ts.contains(&t.as_str()));
                let candidate = Candidate {
                    id,
                    source: &doc.source,
                };
                if type_ok && query::matches(&request.query, &candidate) {
                    matched.push((name, t, id, doc));
                }
            }
        }

        let hits: Vec<Value> = matched
            .iter()
            .skip(request.from)
            .take(request.size)
            .map(|(name, t, id, doc)| {
                let mut hit = json!({
                    "_index": name,
                    "_type": t,
                    "_id": id,
                    "_score": 1.0,
                    "_source": doc.source,
                });
                if explain {
                    hit["_explanation"] =
                        json!({ "value": 1.0, "description": "ConstantScore(*:*)", "details": [] });
                }
                hit
            })
            .collect();
        let max_score = if hits.is_empty() { Value::Null } else { json!(1.0) };
        let shards: u64 = names.iter().map(|n| self.indices[n].shards()).sum();

        json!({
            "took": elapsed_ms(started),
            "timed_out": false,
            "_shards": { "total": shards, "successful": shards, "skipped": 0, "failed": 0 },
            "hits": { "total": matched.len(), "max_score": max_score, "hits": hits },
        })
    }

    /// Header/body line pairs; each failing sub-search becomes an error entry
    /// in `responses` instead of failing the request.
    pub fn msearch(&self, body: &str) -> Result<Reply, EngineError> {
        let mut lines = body.lines().filter(|l| !l.trim().is_empty());
        let mut responses = Vec::new();

        while let Some(header_line) = lines.next() {
            let header = parse_object(header_line)?;
            let body_line = lines
                .next()
                .ok_or_else(|| EngineError::validation("msearch header without a body line"))?;

            let expression = match header.get("index") {
                Some(Value::String(s)) => s.clone(),
                Some(Value::Array(items)) => items
                    .iter()
                    .filter_map(Value::as_str)
                    .collect::<Vec<_>>()
                    .join(","),
                _ => "_all".to_string(),
            };
            let doc_type = header.get("type").and_then(Value::as_str);

            let started = Instant::now();
            let outcome = self.resolve(&expression).and_then(|names| {
                let request = SearchBody::parse(body_line)?;
                Ok(self.run_search(&names, doc_type, &request, false, started))
            });
            responses.push(match outcome {
                Ok(result) => result,
                Err(err) => err.to_json(),
            });
        }

        Ok((StatusCode::OK, json!({ "responses": responses })))
    }

    pub fn put_template(&mut self, name: &str, body: &str) -> Result<Reply, EngineError> {
        let body = parse_object(body)?;
        let template = body
            .get("template")
            .or_else(|| body.get("script").and_then(|s| s.get("source").or_else(|| s.get("inline"))))
            .cloned()
            .ok_or_else(|| EngineError::parse("stored template is missing [template]"))?;
        self.templates.insert(name.to_string(), template);
        debug!(template = name, "stored search template");
        Ok(acknowledged())
    }

    pub fn search_template(
        &self,
        expression: &str,
        body: &str,
        explain: bool,
    ) -> Result<Reply, EngineError> {
        let body = parse_object(body)?;
        let template = match body.get("id").and_then(Value::as_str) {
            Some(id) => self.templates.get(id).cloned().ok_or_else(|| {
                EngineError::not_found(
                    "resource_not_found_exception",
                    format!("unable to find script [{id}]"),
                )
            })?,
            None => body
                .get("inline")
                .or_else(|| body.get("source"))
                .cloned()
                .ok_or_else(|| EngineError::parse("template call needs [id], [inline] or [source]"))?,
        };
        let template = match template {
            Value::String(s) => s,
            other => other.to_string(),
        };
        let params = match body.get("params") {
            Some(Value::Object(params)) => params.clone(),
            _ => Map::new(),
        };
        let rendered = query::render_template(&template, &params);
        self.search(expression, None, &rendered, explain)
    }

    /// Completion suggestions: prefix match over the named field's inputs.
    pub fn suggest(&self, expression: &str, body: &str) -> Result<Reply, EngineError> {
        let names = self.resolve(expression)?;
        let body = parse_object(body)?;
        let global_text = body.get("text").and_then(Value::as_str);
        let shards: u64 = names.iter().map(|n| self.indices[n].shards()).sum();

        let mut out = Map::new();
        out.insert(
            "_shards".into(),
            json!({ "total": shards, "successful": shards, "failed": 0 }),
        );
        for (suggestion, request) in body.iter().filter(|(k, _)| k.as_str() != "text") {
            let prefix = request
                .get("prefix")
                .or_else(|| request.get("text"))
                .and_then(Value::as_str)
                .or(global_text)
                .unwrap_or_default();
            let options = match request.get("completion") {
                Some(completion) => self.complete(&names, prefix, completion),
                None => Vec::new(),
            };
            out.insert(
                suggestion.clone(),
                json!([{
                    "text": prefix,
                    "offset": 0,
                    "length": prefix.chars().count(),
                    "options": options,
                }]),
            );
        }
        Ok((StatusCode::OK, Value::Object(out)))
    }

    fn complete(&self, names: &[String], prefix: &str, completion: &Value) -> Vec<Value> {
        let Some(field) = completion.get("field").and_then(Value::as_str) else {
            return Vec::new();
        };
        let size = completion
            .get("size")
            .and_then(Value::as_u64)
            .map_or(DEFAULT_SUGGEST_SIZE, |n| n as usize);
        let prefix = prefix.to_lowercase();

        let mut options = Vec::new();
        for name in names {
            for ((t, id), doc) in &self.indices[name].docs {
                let inputs = completion_inputs(doc.source.get(field));
                if let Some(input) = inputs.iter().find(|i| i.to_lowercase().starts_with(&prefix)) {
                    options.push(json!({
                        "text": input,
                        "_index": name,
                        "_type": t,
                        "_id": id,
                        "_score": 1.0,
                        "_source": doc.source,
                    }));
                }
            }
        }
        options.truncate(size);
        options
    }

    // -----------------------------------------------------------------------
    // Aliases
    // -----------------------------------------------------------------------

    pub fn aliases(&self, expression: &str, alias: &str) -> Result<Reply, EngineError> {
        let names = self.resolve(expression)?;
        let patterns: Vec<&str> = alias.split(',').collect();
        let mut out = Map::new();
        for name in names {
            let matching: Map<String, Value> = self.indices[&name]
                .aliases
                .iter()
                .filter(|a| patterns.iter().any(|p| *p == "_all" || glob(p, a)))
                .map(|a| (a.clone(), json!({})))
                .collect();
            if !matching.is_empty() {
                out.insert(name, json!({ "aliases": matching }));
            }
        }
        if out.is_empty() {
            return Ok((
                StatusCode::NOT_FOUND,
                json!({ "error": format!("alias [{alias}] missing"), "status": 404 }),
            ));
        }
        Ok((StatusCode::OK, Value::Object(out)))
    }

    /// Apply every action or none of them.
    pub fn update_aliases(&mut self, body: &str) -> Result<Reply, EngineError> {
        let body = parse_object(body)?;
        let Some(Value::Array(actions)) = body.get("actions") else {
            return Err(EngineError::validation("[actions] is missing"));
        };

        let mut staged: BTreeMap<String, BTreeSet<String>> = self
            .indices
            .iter()
            .map(|(name, index)| (name.clone(), index.aliases.clone()))
            .collect();

        for action in actions {
            let (kind, target) = match action.as_object().map(|a| a.iter().collect::<Vec<_>>()) {
                Some(entries) if entries.len() == 1 => entries[0],
                _ => return Err(EngineError::validation("alias action must have one type")),
            };
            let indices = string_list(target, "index", "indices");
            let aliases = string_list(target, "alias", "aliases");
            if indices.is_empty() || aliases.is_empty() {
                return Err(EngineError::validation(
                    "alias action requires [index] and [alias]",
                ));
            }
            for expression in &indices {
                let targets = self.resolve(expression)?;
                for target in &targets {
                    let current = staged
                        .get_mut(target)
                        .ok_or_else(|| EngineError::index_not_found(target))?;
                    for alias in &aliases {
                        match kind.as_str() {
                            "add" => {
                                if self.indices.contains_key(alias.as_str()) {
                                    return Err(EngineError::illegal_argument(format!(
                                        "an index exists with the same name as the alias [{alias}]"
                                    )));
                                }
                                current.insert(alias.clone());
                            }
                            "remove" => {
                                if !current.remove(alias.as_str()) {
                                    return Err(EngineError::not_found(
                                        "aliases_not_found_exception",
                                        format!("aliases [{alias}] missing"),
                                    ));
                                }
                            }
                            other => {
                                return Err(EngineError::validation(format!(
                                    "unsupported alias action [{other}]"
                                )))
                            }
                        }
                    }
                }
            }
        }

        for (name, aliases) in staged {
            if let Some(index) = self.indices.get_mut(&name) {
                index.aliases = aliases;
            }
        }
        debug!(actions = actions.len(), "updated aliases");
        Ok(acknowledged())
    }
}

/// `target[single]` or `target[plural]` as a list of strings.
fn string_list(target: &Value, single: &str, plural: &str) -> Vec<String> {
    let value = target.get(single).or_else(|| target.get(plural));
    match value {
        Some(Value::String(s)) => vec![s.clone()],
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

/// Inputs of a completion field: a string, a list, or `{"input": ...}`.
fn completion_inputs(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::String(s)) => vec![s.clone()],
        Some(Value::Array(items)) => items
            .iter()
            .flat_map(|i| completion_inputs(Some(i)))
            .collect(),
        Some(Value::Object(object)) => completion_inputs(object.get("input")),
        _ => Vec::new(),
    }
}
