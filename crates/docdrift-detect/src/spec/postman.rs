use super::{Normalize, Normalized, SpecDocument, SpecFormat};
use anyhow::{bail, Context, Result};
use docdrift_core::canon::{canonical_json_string, strip_keys};
use docdrift_core::SignalKind;
use serde_json::Value;
use std::collections::BTreeSet;

/// Keys regenerated on every export.
const VOLATILE_KEYS: &[&str] = &["_postman_id", "id", "_exporter_id"];

/// Postman collection v2.x.
pub struct PostmanCollection;

impl SpecFormat for PostmanCollection {
    fn key(&self) -> &'static str {
        "postman"
    }

    fn signal_kind(&self) -> SignalKind {
        SignalKind::PostmanDiff
    }

    fn normalize(&self, doc: &SpecDocument) -> Result<Normalize> {
        let root: Value =
            serde_json::from_str(doc.text()?).context("collection is not valid JSON")?;
        let Some(items) = root.get("item").and_then(Value::as_array) else {
            bail!("collection has no item array");
        };
        let mut fields = BTreeSet::new();
        collect_requests(items, &mut fields);
        Ok(Normalize::Ready(Normalized {
            canonical: canonical_json_string(&strip_keys(&root, VOLATILE_KEYS)),
            fields,
        }))
    }
}

/// `METHOD url` for every request, descending into folders.
fn collect_requests(items: &[Value], out: &mut BTreeSet<String>) {
    for item in items {
        if let Some(children) = item.get("item").and_then(Value::as_array) {
            collect_requests(children, out);
        }
        let Some(request) = item.get("request") else {
            continue;
        };
        // A bare string request is a GET of that URL.
        if let Some(url) = request.as_str() {
            out.insert(format!("GET {url}"));
            continue;
        }
        let method = request
            .get("method")
            .and_then(Value::as_str)
            .unwrap_or("GET")
            .to_uppercase();
        let url = match request.get("url") {
            Some(Value::String(s)) => s.as_str(),
            Some(obj) => obj.get("raw").and_then(Value::as_str).unwrap_or(""),
            None => "",
        };
        out.insert(format!("{method} {url}"));
    }
}
