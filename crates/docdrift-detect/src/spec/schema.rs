//! Shared helpers for JSON-schema-based formats (OpenAPI, Swagger).

use anyhow::{bail, Result};
use serde_json::Value;
use std::collections::BTreeSet;

const HTTP_METHODS: &[&str] = &["get", "put", "post", "delete", "options", "head", "patch", "trace"];

/// Max `$ref` hops followed from one schema.
const MAX_REF_DEPTH: usize = 16;

/// Parse JSON, falling back to YAML. YAML mapping keys are stringified so
/// unquoted status codes (`200:`) survive the conversion.
pub fn parse_structured(text: &str) -> Result<Value> {
    if let Ok(v) = serde_json::from_str::<Value>(text) {
        return Ok(v);
    }
    let yaml: serde_yaml::Value = serde_yaml::from_str(text)
        .map_err(|e| anyhow::anyhow!("neither valid JSON nor YAML: {e}"))?;
    let value = yaml_to_json(yaml);
    if !value.is_object() {
        bail!("expected a mapping at the document root");
    }
    Ok(value)
}

fn yaml_to_json(value: serde_yaml::Value) -> Value {
    match value {
        serde_yaml::Value::Null => Value::Null,
        serde_yaml::Value::Bool(b) => Value::Bool(b),
        serde_yaml::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::from(i)
            } else if let Some(u) = n.as_u64() {
                Value::from(u)
            } else {
                n.as_f64()
                    .and_then(serde_json::Number::from_f64)
                    .map(Value::Number)
                    .unwrap_or(Value::Null)
            }
        }
        serde_yaml::Value::String(s) => Value::String(s),
        serde_yaml::Value::Sequence(seq) => Value::Array(seq.into_iter().map(yaml_to_json).collect()),
        serde_yaml::Value::Mapping(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (yaml_key(k), yaml_to_json(v)))
                .collect(),
        ),
        serde_yaml::Value::Tagged(tagged) => yaml_to_json(tagged.value),
    }
}

fn yaml_key(key: serde_yaml::Value) -> String {
    match key {
        serde_yaml::Value::String(s) => s,
        serde_yaml::Value::Number(n) => n.to_string(),
        serde_yaml::Value::Bool(b) => b.to_string(),
        serde_yaml::Value::Null => "null".to_string(),
        other => serde_yaml::to_string(&other)
            .map(|s| s.trim().to_string())
            .unwrap_or_default(),
    }
}

/// Resolve a local `#/a/b` pointer against the document root.
pub fn resolve_ref<'a>(root: &'a Value, reference: &str) -> Option<&'a Value> {
    let pointer = reference.strip_prefix('#')?;
    root.pointer(pointer)
}

/// Follow `$ref` chains until a concrete node, bounded and cycle-safe.
pub fn deref<'a>(root: &'a Value, mut node: &'a Value) -> &'a Value {
    let mut seen = BTreeSet::new();
    for _ in 0..MAX_REF_DEPTH {
        let Some(reference) = node.get("$ref").and_then(Value::as_str) else {
            return node;
        };
        if !seen.insert(reference.to_string()) {
            return node;
        }
        match resolve_ref(root, reference) {
            Some(target) => node = target,
            None => return node,
        }
    }
    node
}

/// Top-level property names of a response schema, with `$ref`, arrays and
/// `allOf`/`oneOf`/`anyOf` composition flattened.
pub fn schema_fields(root: &Value, schema: &Value) -> BTreeSet<String> {
    let mut out = BTreeSet::new();
    collect_fields(root, schema, 0, &mut out);
    out
}

fn collect_fields(root: &Value, schema: &Value, depth: usize, out: &mut BTreeSet<String>) {
    if depth > MAX_REF_DEPTH {
        return;
    }
    let schema = deref(root, schema);

    if let Some(props) = schema.get("properties").and_then(Value::as_object) {
        out.extend(props.keys().cloned());
    }
    if schema.get("type").and_then(Value::as_str) == Some("array") {
        if let Some(items) = schema.get("items") {
            collect_fields(root, items, depth + 1, out);
        }
    }
    for combinator in ["allOf", "oneOf", "anyOf"] {
        if let Some(parts) = schema.get(combinator).and_then(Value::as_array) {
            for part in parts {
                collect_fields(root, part, depth + 1, out);
            }
        }
    }
}

/// Preferred success response: `200`, `201`, `2XX`, `default`, then the lowest
/// other 2xx code.
pub fn success_response<'a>(root: &'a Value, responses: &'a Value) -> Option<&'a Value> {
    let map = responses.as_object()?;
    let key = ["200", "201", "2XX", "2xx", "default"]
        .iter()
        .find(|k| map.contains_key(**k))
        .map(|k| k.to_string())
        .or_else(|| {
            let mut twos: Vec<&String> = map.keys().filter(|k| k.starts_with('2')).collect();
            twos.sort();
            twos.first().map(|k| k.to_string())
        })?;
    map.get(&key).map(|r| deref(root, r))
}

/// `METHOD path: field` for each operation's success-response fields, or
/// `METHOD path` for operations without any.
pub fn endpoint_fields<'a, F>(root: &'a Value, response_schema: F) -> BTreeSet<String>
where
    F: Fn(&'a Value) -> Option<&'a Value>,
{
    let mut out = BTreeSet::new();
    let Some(paths) = root.get("paths").and_then(Value::as_object) else {
        return out;
    };
    for (path, item) in paths {
        let item = deref(root, item);
        for method in HTTP_METHODS {
            let Some(op) = item.get(*method) else {
                continue;
            };
            let endpoint = format!("{} {path}", method.to_uppercase());
            let fields = op
                .get("responses")
                .and_then(|r| success_response(root, r))
                .and_then(&response_schema)
                .map(|schema| schema_fields(root, schema))
                .unwrap_or_default();
            if fields.is_empty() {
                out.insert(endpoint);
            } else {
                out.extend(fields.into_iter().map(|f| format!("{endpoint}: {f}")));
            }
        }
    }
    out
}
