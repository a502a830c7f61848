//! Spec-format drift detection.
//!
//! Every format follows the same skeleton: acquire the current definition,
//! read the published copy, normalize both to a canonical string plus a set of
//! comparable field identifiers, compare, and on difference write a diff
//! artifact and emit a tier-1 signal. Formats only supply normalization.

pub mod fern;
pub mod graphql;
pub mod openapi;
pub mod postman;
pub mod schema;
pub mod swagger;

use crate::evidence::EvidenceSink;
use crate::exec::{mask_secrets, render_log, CommandExecutor};
use crate::fetch::Fetcher;
use anyhow::{bail, Context, Result};
use docdrift_core::config::{CurrentSource, SpecConfig};
use docdrift_core::error::ConfigError;
use docdrift_core::{Signal, SignalKind};
use std::collections::BTreeSet;
use std::path::Path;
use std::time::Duration;

/// Raw definition as read from its source.
#[derive(Debug, Clone, PartialEq)]
pub enum SpecDocument {
    Text(String),
    /// Directory contents: `(relative path, content)` sorted by path.
    Tree(Vec<(String, String)>),
}

impl SpecDocument {
    /// The document as text; directory trees are an error for text formats.
    pub fn text(&self) -> Result<&str> {
        match self {
            SpecDocument::Text(t) => Ok(t.as_str()),
            SpecDocument::Tree(_) => bail!("expected a file, found a directory"),
        }
    }
}

/// Canonical form of one side of the comparison.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Normalized {
    /// Deterministic serialization; equality means no drift.
    pub canonical: String,
    /// Comparable identifiers (`METHOD path: field`, `METHOD url`, `Type.field`).
    pub fields: BTreeSet<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Normalize {
    Ready(Normalized),
    /// The document is not this format (e.g. wrong version marker).
    NotApplicable(String),
}

/// Format-specific half of a detector.
pub trait SpecFormat: Send + Sync {
    fn key(&self) -> &'static str;

    fn signal_kind(&self) -> SignalKind;

    /// Whether directory sources are read as a tree rather than rejected.
    fn reads_tree(&self) -> bool {
        false
    }

    /// Normalize a document. `Err` means malformed content.
    fn normalize(&self, doc: &SpecDocument) -> Result<Normalize>;

    /// Body to POST when the current side is fetched by introspection.
    fn introspection_request(&self) -> Option<serde_json::Value> {
        None
    }

    /// Turn an introspection response into a document of this format.
    fn from_introspection(&self, _body: &str) -> Result<SpecDocument> {
        bail!("{} does not support introspection", self.key())
    }
}

/// Closed format table.
pub fn format_for(key: &str) -> Option<&'static dyn SpecFormat> {
    match key {
        "openapi" => Some(&openapi::OpenApi),
        "swagger" => Some(&swagger::Swagger),
        "graphql" => Some(&graphql::GraphQl),
        "fern" => Some(&fern::FernDefinition),
        "postman" => Some(&postman::PostmanCollection),
        _ => None,
    }
}

/// What a spec detector reports for one doc area.
#[derive(Debug, Clone, Default)]
pub struct SpecDetection {
    pub has_drift: bool,
    pub summary: String,
    pub evidence_files: Vec<String>,
    pub impacted_docs: BTreeSet<String>,
    pub signal: Option<Signal>,
    pub added: Vec<String>,
    pub removed: Vec<String>,
}

/// Collaborators a spec detector needs.
pub struct SpecContext<'a> {
    pub repo_root: &'a Path,
    pub executor: &'a dyn CommandExecutor,
    pub fetcher: &'a dyn Fetcher,
    pub evidence: &'a dyn EvidenceSink,
}

/// Compare the current definition against the published copy.
///
/// Acquisition and parse failures never surface as `Err`: they become a weak
/// evidence result. `Err` is reserved for configuration problems and for
/// failing to write evidence.
pub async fn detect_spec(
    doc_area: &str,
    spec: &SpecConfig,
    ctx: &SpecContext<'_>,
) -> Result<SpecDetection> {
    let format = format_for(&spec.format).ok_or_else(|| ConfigError::UnknownFormat {
        area: doc_area.to_string(),
        format: spec.format.clone(),
    })?;
    let source = spec.current.as_ref().ok_or_else(|| ConfigError::Missing {
        area: doc_area.to_string(),
        what: "detect.spec.current".into(),
    })?;
    if spec.introspection && format.introspection_request().is_none() {
        return Err(ConfigError::InvalidArea {
            area: doc_area.to_string(),
            reason: format!("introspection is not supported for {}", format.key()),
        }
        .into());
    }

    let key = format.key();
    let timeout = Duration::from_secs(spec.timeout_sec);
    let impacted: BTreeSet<String> = [spec.published.clone()].into_iter().collect();

    let current = match acquire_current(format, spec, source, ctx, timeout).await {
        Ok(doc) => doc,
        Err(e) => return weak_evidence(doc_area, format, "acquire current", &e, impacted, ctx),
    };

    let published_path = ctx.repo_root.join(&spec.published);
    if !published_path.exists() {
        let e = anyhow::anyhow!("published copy missing: {}", spec.published);
        return weak_evidence(doc_area, format, "read published", &e, impacted, ctx);
    }
    let published = match read_document(format, &published_path) {
        Ok(doc) => doc,
        Err(e) => return weak_evidence(doc_area, format, "read published", &e, impacted, ctx),
    };

    let current = match format.normalize(&current) {
        Ok(Normalize::Ready(n)) => n,
        Ok(Normalize::NotApplicable(reason)) => return Ok(not_applicable(key, &reason)),
        Err(e) => return weak_evidence(doc_area, format, "parse current", &e, impacted, ctx),
    };
    let published = match format.normalize(&published) {
        Ok(Normalize::Ready(n)) => n,
        Ok(Normalize::NotApplicable(reason)) => return Ok(not_applicable(key, &reason)),
        Err(e) => return weak_evidence(doc_area, format, "parse published", &e, impacted, ctx),
    };

    if current.canonical == published.canonical {
        tracing::debug!(doc_area, format = key, "no drift");
        return Ok(SpecDetection::default());
    }

    let added: Vec<String> = current.fields.difference(&published.fields).cloned().collect();
    let removed: Vec<String> = published.fields.difference(&current.fields).cloned().collect();
    let summary = render_summary(key, &added, &removed);
    let artifact = format!(
        "{summary}\n\n--- current (canonical)\n{}\n\n--- published (canonical)\n{}\n",
        current.canonical, published.canonical
    );
    let location = ctx
        .evidence
        .write(&artifact_name(doc_area, &format!("{key}.diff.txt")), &artifact)?;

    tracing::info!(
        doc_area,
        format = key,
        added = added.len(),
        removed = removed.len(),
        "spec drift detected"
    );

    Ok(SpecDetection {
        has_drift: true,
        summary,
        evidence_files: vec![location.clone()],
        impacted_docs: impacted,
        signal: Some(Signal::spec_diff(format.signal_kind(), vec![location])),
        added,
        removed,
    })
}

/// `<format> drift: +A / -R` then one line per delta, added first.
pub fn render_summary(key: &str, added: &[String], removed: &[String]) -> String {
    if added.is_empty() && removed.is_empty() {
        return format!("{key} changed but no field differences detected");
    }
    let mut out = format!("{key} drift: +{} / -{}", added.len(), removed.len());
    for a in added {
        out.push_str(&format!("\n+ {a}"));
    }
    for r in removed {
        out.push_str(&format!("\n- {r}"));
    }
    out
}

async fn acquire_current(
    format: &dyn SpecFormat,
    spec: &SpecConfig,
    source: &CurrentSource,
    ctx: &SpecContext<'_>,
    timeout: Duration,
) -> Result<SpecDocument> {
    match source {
        CurrentSource::Url(url) => {
            if spec.introspection {
                let request = format
                    .introspection_request()
                    .context("introspection request unavailable")?;
                let body = ctx.fetcher.post_json(url, &request, timeout).await?;
                format.from_introspection(&body)
            } else {
                Ok(SpecDocument::Text(ctx.fetcher.get(url, timeout).await?))
            }
        }
        CurrentSource::Path(path) => read_document(format, &ctx.repo_root.join(path)),
        CurrentSource::Command(export) => {
            let output = ctx.executor.run(&export.run, ctx.repo_root, timeout).await;
            if !output.success() {
                bail!(
                    "export command failed\n{}",
                    render_log(&export.run, &output)
                );
            }
            read_document(format, &ctx.repo_root.join(&export.output))
                .with_context(|| format!("reading export output {}", export.output))
        }
    }
}

/// Read a file as text, or a directory as a sorted tree for formats that take one.
pub fn read_document(format: &dyn SpecFormat, path: &Path) -> Result<SpecDocument> {
    if path.is_dir() {
        if !format.reads_tree() {
            bail!("{} expects a file, found directory {}", format.key(), path.display());
        }
        let mut files = Vec::new();
        collect_tree(path, path, &mut files)?;
        files.sort_by(|a, b| a.0.cmp(&b.0));
        return Ok(SpecDocument::Tree(files));
    }
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    Ok(SpecDocument::Text(text))
}

fn collect_tree(root: &Path, dir: &Path, out: &mut Vec<(String, String)>) -> Result<()> {
    for entry in std::fs::read_dir(dir).with_context(|| format!("listing {}", dir.display()))? {
        let path = entry?.path();
        if path.is_dir() {
            collect_tree(root, &path, out)?;
            continue;
        }
        let rel = path
            .strip_prefix(root)
            .unwrap_or(&path)
            .to_string_lossy()
            .replace('\\', "/");
        let bytes = std::fs::read(&path).with_context(|| format!("reading {}", path.display()))?;
        out.push((rel, String::from_utf8_lossy(&bytes).into_owned()));
    }
    Ok(())
}

/// `<doc_area>/<file>`: spec artifacts are kept per area, not per format.
pub fn artifact_name(doc_area: &str, file: &str) -> String {
    format!("{doc_area}/{file}")
}

fn weak_evidence(
    doc_area: &str,
    format: &dyn SpecFormat,
    stage: &str,
    error: &anyhow::Error,
    impacted_docs: BTreeSet<String>,
    ctx: &SpecContext<'_>,
) -> Result<SpecDetection> {
    let key = format.key();
    tracing::warn!(doc_area, format = key, stage, error = %format!("{error:#}"), "could not establish ground truth");
    let log = format!(
        "{key} detector could not establish ground truth\nstage: {stage}\n\nerror: {}\n",
        mask_secrets(&format!("{error:#}"))
    );
    let location = ctx
        .evidence
        .write(&artifact_name(doc_area, &format!("{key}.acquire.log")), &log)?;
    let reason = first_line(&format!("{error}"));
    Ok(SpecDetection {
        has_drift: true,
        summary: format!("{key}: unable to establish ground truth ({stage}: {reason})"),
        evidence_files: vec![location.clone()],
        impacted_docs,
        signal: Some(Signal::weak_evidence(vec![location])),
        added: Vec::new(),
        removed: Vec::new(),
    })
}

fn not_applicable(key: &str, reason: &str) -> SpecDetection {
    tracing::debug!(format = key, reason, "detector not applicable");
    SpecDetection {
        summary: format!("{key}: not applicable ({reason})"),
        ..Default::default()
    }
}

fn first_line(text: &str) -> String {
    mask_secrets(text.lines().next().unwrap_or_default().trim())
}
