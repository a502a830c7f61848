use super::{Normalize, Normalized, SpecDocument, SpecFormat};
use anyhow::Result;
use docdrift_core::SignalKind;
use serde_yaml::Value;
use std::collections::BTreeSet;

const FILE_MARKER: &str = "=== ";

/// A Fern definition folder. Compared by its file signature; a single-file
/// published copy is taken to hold that signature verbatim.
pub struct FernDefinition;

impl SpecFormat for FernDefinition {
    fn key(&self) -> &'static str {
        "fern"
    }

    fn signal_kind(&self) -> SignalKind {
        SignalKind::FernDiff
    }

    fn reads_tree(&self) -> bool {
        true
    }

    fn normalize(&self, doc: &SpecDocument) -> Result<Normalize> {
        let (canonical, files) = match doc {
            SpecDocument::Tree(files) => (signature(files), files.clone()),
            SpecDocument::Text(text) => (text.clone(), split_signature(text)),
        };
        let mut fields = BTreeSet::new();
        for (path, content) in &files {
            if path.is_empty() || path.ends_with(".yml") || path.ends_with(".yaml") {
                endpoint_ids(content, &mut fields);
            }
        }
        Ok(Normalize::Ready(Normalized { canonical, fields }))
    }
}

/// `=== <relpath>\n<content>\n` per file, in path order.
pub fn signature(files: &[(String, String)]) -> String {
    let mut out = String::new();
    for (path, content) in files {
        out.push_str(FILE_MARKER);
        out.push_str(path);
        out.push('\n');
        out.push_str(content);
        out.push('\n');
    }
    out
}

/// Inverse of [`signature`], for field extraction only. Text without file
/// markers is one unnamed file.
fn split_signature(text: &str) -> Vec<(String, String)> {
    if !text.starts_with(FILE_MARKER) {
        return vec![(String::new(), text.to_string())];
    }
    let mut files: Vec<(String, String)> = Vec::new();
    for line in text.lines() {
        if let Some(path) = line.strip_prefix(FILE_MARKER) {
            files.push((path.to_string(), String::new()));
        } else if let Some((_, content)) = files.last_mut() {
            content.push_str(line);
            content.push('\n');
        }
    }
    files
}

/// `METHOD base-path+path` for each endpoint under `service.endpoints`.
/// Content that is not YAML contributes nothing.
fn endpoint_ids(content: &str, out: &mut BTreeSet<String>) {
    let Ok(doc) = serde_yaml::from_str::<Value>(content) else {
        return;
    };
    let Some(service) = doc.get("service") else {
        return;
    };
    let base = service.get("base-path").and_then(Value::as_str).unwrap_or("");
    let Some(endpoints) = service.get("endpoints").and_then(Value::as_mapping) else {
        return;
    };
    for endpoint in endpoints.values() {
        let Some(method) = endpoint.get("method").and_then(Value::as_str) else {
            continue;
        };
        let path = endpoint.get("path").and_then(Value::as_str).unwrap_or("");
        out.insert(format!("{} {base}{path}", method.to_uppercase()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const USERS: &str = "service:\n  base-path: /users\n  auth: true\n  endpoints:\n    get:\n      method: GET\n      path: /{id}\n    create:\n      method: post\n      path: \"\"\n";

    fn tree(files: &[(&str, &str)]) -> SpecDocument {
        SpecDocument::Tree(
            files
                .iter()
                .map(|(p, c)| (p.to_string(), c.to_string()))
                .collect(),
        )
    }

    fn ready(doc: &SpecDocument) -> Normalized {
        match FernDefinition.normalize(doc).unwrap() {
            Normalize::Ready(n) => n,
            Normalize::NotApplicable(r) => panic!("not applicable: {r}"),
        }
    }

    #[test]
    fn endpoints_joined_with_base_path() {
        let n = ready(&tree(&[("definition/users.yml", USERS), ("fern.config.json", "{}")]));
        assert_eq!(
            n.fields.into_iter().collect::<Vec<_>>(),
            vec!["GET /users/{id}", "POST /users"]
        );
    }

    #[test]
    fn single_file_published_matches_signature() {
        let files = [("api.yml", "name: api\n"), ("definition/users.yml", USERS)];
        let dir = ready(&tree(&files));
        let published = signature(
            &files
                .iter()
                .map(|(p, c)| (p.to_string(), c.to_string()))
                .collect::<Vec<_>>(),
        );
        let file = ready(&SpecDocument::Text(published));
        assert_eq!(dir, file);
    }

    #[test]
    fn content_change_is_drift_even_without_endpoint_change() {
        let a = ready(&tree(&[("api.yml", "name: api\n")]));
        let b = ready(&tree(&[("api.yml", "name: api-v2\n")]));
        assert_ne!(a.canonical, b.canonical);
        assert_eq!(a.fields, b.fields);
    }

    #[test]
    fn unparseable_files_contribute_no_fields() {
        let n = ready(&tree(&[("broken.yml", "service: [unclosed\n")]));
        assert!(n.fields.is_empty());
    }
}
