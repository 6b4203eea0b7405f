//! A small subset of the query DSL, evaluated against stored sources.
//!
//! Supported: `match_all`, `match_none`, `term`, `terms`, `match`, `range`,
//! `exists`, `ids` and `bool` (`must`, `filter`, `should`, `must_not`).
//! Scoring is constant.

use serde_json::{Map, Value};

use crate::error::EngineError;

const DEFAULT_SIZE: usize = 10;

/// What a document looks like to a query.
pub struct Candidate<'a> {
    pub id: &'a str,
    pub source: &'a Value,
}

/// The parts of a search body the mock understands.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchBody {
    pub query: Value,
    pub from: usize,
    pub size: usize,
}

impl SearchBody {
    /// Parse a raw search body; an empty body means `match_all`.
    pub fn parse(raw: &str) -> Result<Self, EngineError> {
        if raw.trim().is_empty() {
            return Self::from_value(Value::Object(Map::new()));
        }
        let value: Value = serde_json::from_str(raw)
            .map_err(|e| EngineError::parse(format!("failed to parse search body: {e}")))?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self, EngineError> {
        let Value::Object(mut body) = value else {
            return Err(EngineError::parsing("search body must be an object"));
        };
        let query = body
            .remove("query")
            .unwrap_or_else(|| serde_json::json!({ "match_all": {} }));
        // Validate the whole tree up front so errors surface even on empty indices.
        validate(&query)?;
        Ok(Self {
            query,
            from: usize_param(&body, "from", 0)?,
            size: usize_param(&body, "size", DEFAULT_SIZE)?,
        })
    }
}

fn usize_param(body: &Map<String, Value>, key: &str, default: usize) -> Result<usize, EngineError> {
    match body.get(key) {
        None | Some(Value::Null) => Ok(default),
        // Rendered templates often leave numbers quoted.
        Some(Value::String(s)) => s
            .trim()
            .parse()
            .map_err(|_| EngineError::parsing(format!("[{key}] must be a non-negative integer"))),
        Some(v) => v
            .as_u64()
            .map(|n| n as usize)
            .ok_or_else(|| EngineError::parsing(format!("[{key}] must be a non-negative integer"))),
    }
}

fn single_clause(query: &Value) -> Result<(&str, &Value), EngineError> {
    let object = query
        .as_object()
        .ok_or_else(|| EngineError::parsing("query must be an object"))?;
    let mut entries = object.iter();
    match (entries.next(), entries.next()) {
        (Some((kind, clause)), None) => Ok((kind.as_str(), clause)),
        _ => Err(EngineError::parsing(
            "query must contain exactly one query type",
        )),
    }
}

/// Field name and argument of a `{field: arg}` clause.
fn field_clause<'a>(kind: &str, clause: &'a Value) -> Result<(&'a str, &'a Value), EngineError> {
    let (field, arg) = single_clause(clause)
        .map_err(|_| EngineError::parsing(format!("[{kind}] query requires one field")))?;
    Ok((field, arg))
}

fn bool_clauses(value: Option<&Value>) -> Vec<&Value> {
    match value {
        None => Vec::new(),
        Some(Value::Array(items)) => items.iter().collect(),
        Some(other) => vec![other],
    }
}

fn validate(query: &Value) -> Result<(), EngineError> {
    let (kind, clause) = single_clause(query)?;
    match kind {
        "match_all" | "match_none" | "exists" | "ids" => Ok(()),
        "term" | "terms" | "match" | "range" => field_clause(kind, clause).map(|_| ()),
        "bool" => {
            for key in ["must", "filter", "should", "must_not"] {
                for sub in bool_clauses(clause.get(key)) {
                    validate(sub)?;
                }
            }
            Ok(())
        }
        other => Err(EngineError::parsing(format!(
            "no [query] registered for [{other}]"
        ))),
    }
}

/// Whether `doc` satisfies `query`. The query must have passed `SearchBody`
/// validation.
pub fn matches(query: &Value, doc: &Candidate<'_>) -> bool {
    let Ok((kind, clause)) = single_clause(query) else {
        return false;
    };
    match kind {
        "match_all" => true,
        "match_none" => false,
        "term" => field_clause(kind, clause)
            .map(|(field, arg)| {
                let expected = arg.get("value").unwrap_or(arg);
                field_values(doc.source, field).any(|v| term_eq(v, expected))
            })
            .unwrap_or(false),
        "terms" => field_clause(kind, clause)
            .map(|(field, arg)| {
                let options = arg.as_array().map(Vec::as_slice).unwrap_or_default();
                field_values(doc.source, field)
                    .any(|v| options.iter().any(|expected| term_eq(v, expected)))
            })
            .unwrap_or(false),
        "match" => field_clause(kind, clause)
            .map(|(field, arg)| {
                let text = arg.get("query").unwrap_or(arg);
                field_values(doc.source, field).any(|v| text_match(v, text))
            })
            .unwrap_or(false),
        "range" => field_clause(kind, clause)
            .map(|(field, bounds)| field_values(doc.source, field).any(|v| in_range(v, bounds)))
            .unwrap_or(false),
        "exists" => clause
            .get("field")
            .and_then(Value::as_str)
            .map(|field| field_values(doc.source, field).any(|v| !v.is_null()))
            .unwrap_or(false),
        "ids" => clause
            .get("values")
            .and_then(Value::as_array)
            .map(|ids| ids.iter().any(|id| id.as_str() == Some(doc.id)))
            .unwrap_or(false),
        "bool" => bool_matches(clause, doc),
        _ => false,
    }
}

fn bool_matches(clause: &Value, doc: &Candidate<'_>) -> bool {
    let must = bool_clauses(clause.get("must"));
    let filter = bool_clauses(clause.get("filter"));
    let should = bool_clauses(clause.get("should"));
    let must_not = bool_clauses(clause.get("must_not"));

    let required = must.iter().chain(filter.iter()).all(|q| matches(q, doc));
    let excluded = must_not.iter().any(|q| matches(q, doc));
    // Without must/filter, at least one should clause has to match.
    let optional = should.is_empty()
        || !(must.is_empty() && filter.is_empty())
        || should.iter().any(|q| matches(q, doc));

    required && !excluded && optional
}

/// Values at a dotted path, flattening arrays.
fn field_values<'a>(source: &'a Value, path: &str) -> impl Iterator<Item = &'a Value> {
    let mut current = vec![source];
    for key in path.split('.') {
        current = current
            .into_iter()
            .flat_map(|v| match v {
                Value::Array(items) => items.iter().filter_map(|i| i.get(key)).collect(),
                other => other.get(key).into_iter().collect::<Vec<_>>(),
            })
            .collect();
    }
    current.into_iter().flat_map(|v| match v {
        Value::Array(items) => items.iter().collect::<Vec<_>>(),
        other => vec![other],
    })
}

fn term_eq(actual: &Value, expected: &Value) -> bool {
    match (actual, expected) {
        (Value::String(a), Value::String(b)) => a.eq_ignore_ascii_case(b),
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        (Value::Number(a), Value::String(b)) | (Value::String(b), Value::Number(a)) => {
            b.parse::<f64>().ok() == a.as_f64()
        }
        _ => actual == expected,
    }
}

fn tokens(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
}

/// OR semantics: any query token present in the field's tokens.
fn text_match(actual: &Value, query: &Value) -> bool {
    match (actual, query) {
        (Value::String(field), Value::String(text)) => {
            let field_tokens: Vec<String> = tokens(field).collect();
            tokens(text).any(|t| field_tokens.contains(&t))
        }
        _ => term_eq(actual, query),
    }
}

fn in_range(actual: &Value, bounds: &Value) -> bool {
    let checks = [
        ("gt", std::cmp::Ordering::Greater, false),
        ("gte", std::cmp::Ordering::Greater, true),
        ("lt", std::cmp::Ordering::Less, false),
        ("lte", std::cmp::Ordering::Less, true),
    ];
    checks.iter().all(|(key, wanted, inclusive)| match bounds.get(*key) {
        None => true,
        Some(bound) => match compare(actual, bound) {
            Some(std::cmp::Ordering::Equal) => *inclusive,
            Some(ordering) => ordering == *wanted,
            None => false,
        },
    })
}

fn compare(actual: &Value, bound: &Value) -> Option<std::cmp::Ordering> {
    let as_number = |v: &Value| match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse::<f64>().ok(),
        _ => None,
    };
    match (as_number(actual), as_number(bound)) {
        (Some(a), Some(b)) => a.partial_cmp(&b),
        _ => match (actual, bound) {
            (Value::String(a), Value::String(b)) => Some(a.as_str().cmp(b.as_str())),
            _ => None,
        },
    }
}

/// Substitute `{{name}}` placeholders with `params`. String values are
/// inserted without quotes, so templates keep their own quoting.
pub fn render_template(template: &str, params: &Map<String, Value>) -> String {
    let mut rendered = template.to_string();
    for (name, value) in params {
        let text = match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        for placeholder in [format!("{{{{{name}}}}}"), format!("{{{{ {name} }}}}")] {
            rendered = rendered.replace(&placeholder, &text);
        }
    }
    rendered
}
