use super::schema::{endpoint_fields, parse_structured};
use super::{Normalize, Normalized, SpecDocument, SpecFormat};
use anyhow::{bail, Result};
use docdrift_core::canon::canonical_json_string;
use docdrift_core::SignalKind;
use serde_json::Value;

/// Swagger 2.0. Documents with any other `swagger` marker are not applicable.
pub struct Swagger;

impl SpecFormat for Swagger {
    fn key(&self) -> &'static str {
        "swagger"
    }

    fn signal_kind(&self) -> SignalKind {
        SignalKind::SwaggerDiff
    }

    fn normalize(&self, doc: &SpecDocument) -> Result<Normalize> {
        let root = parse_structured(doc.text()?)?;
        if !root.is_object() {
            bail!("Swagger document must be a mapping");
        }
        if !is_swagger_2(root.get("swagger")) {
            let found = root
                .get("swagger")
                .map(|v| v.to_string())
                .unwrap_or_else(|| "none".to_string());
            return Ok(Normalize::NotApplicable(format!(
                "swagger version marker is {found}, expected \"2.0\""
            )));
        }
        // `#/definitions/...` refs are resolved inside field extraction.
        let fields = endpoint_fields(&root, |response: &Value| response.get("schema"));
        Ok(Normalize::Ready(Normalized {
            canonical: canonical_json_string(&root),
            fields,
        }))
    }
}

fn is_swagger_2(marker: Option<&Value>) -> bool {
    match marker {
        Some(Value::String(s)) => s == "2.0",
        // unquoted `swagger: 2.0` in YAML
        Some(Value::Number(n)) => n.as_f64() == Some(2.0),
        _ => false,
    }
}
