use super::schema::{endpoint_fields, parse_structured};
use super::{Normalize, Normalized, SpecDocument, SpecFormat};
use anyhow::{bail, Result};
use docdrift_core::canon::canonical_json_string;
use docdrift_core::SignalKind;
use serde_json::Value;

/// OpenAPI 3.x, JSON or YAML.
pub struct OpenApi;

impl SpecFormat for OpenApi {
    fn key(&self) -> &'static str {
        "openapi"
    }

    fn signal_kind(&self) -> SignalKind {
        SignalKind::OpenapiDiff
    }

    fn normalize(&self, doc: &SpecDocument) -> Result<Normalize> {
        let root = parse_structured(doc.text()?)?;
        if !root.is_object() {
            bail!("OpenAPI document must be a mapping");
        }
        let fields = endpoint_fields(&root, response_schema);
        Ok(Normalize::Ready(Normalized {
            canonical: canonical_json_string(&root),
            fields,
        }))
    }
}

/// `content.application/json.schema`, else the first media type's schema.
fn response_schema(response: &Value) -> Option<&Value> {
    let content = response.get("content")?.as_object()?;
    content
        .get("application/json")
        .and_then(|m| m.get("schema"))
        .or_else(|| content.values().find_map(|m| m.get("schema")))
}
