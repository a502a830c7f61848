use crate::error::ConfigError;
use crate::glob::GlobList;
use crate::types::Mode;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Format keys with a registered detector.
pub const SPEC_FORMATS: &[&str] = &["openapi", "swagger", "graphql", "fern", "postman"];

/// Default config file name, resolved against the repo root.
pub const DEFAULT_CONFIG_FILE: &str = ".docdrift.yml";

/// Top-level configuration (`.docdrift.yml`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriftConfig {
    /// Repository slug used in reports and idempotency keys.
    #[serde(default)]
    pub repo: String,
    #[serde(default)]
    pub verify: VerifyConfig,
    #[serde(default)]
    pub policy: PolicyConfig,
    #[serde(default)]
    pub doc_areas: Vec<DocAreaConfig>,
}

impl DriftConfig {
    pub fn area(&self, name: &str) -> Option<&DocAreaConfig> {
        self.doc_areas.iter().find(|a| a.name == name)
    }
}

/// Verification commands shared by every doc area.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyConfig {
    #[serde(default)]
    pub commands: Vec<String>,
    #[serde(default = "default_verify_timeout")]
    pub timeout_sec: u64,
}

impl Default for VerifyConfig {
    fn default() -> Self {
        Self {
            commands: Vec::new(),
            timeout_sec: default_verify_timeout(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PolicyConfig {
    #[serde(default)]
    pub pr_caps: PrCaps,
    #[serde(default)]
    pub confidence: ConfidenceConfig,
    /// Paths a policy may ever act on. Empty means nothing is allowlisted.
    #[serde(default)]
    pub allowlist: Vec<String>,
    #[serde(default)]
    pub exclude: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrCaps {
    #[serde(default = "default_max_prs_per_day")]
    pub max_prs_per_day: u32,
    #[serde(default = "default_max_files_touched")]
    pub max_files_touched: usize,
}

impl Default for PrCaps {
    fn default() -> Self {
        Self {
            max_prs_per_day: default_max_prs_per_day(),
            max_files_touched: default_max_files_touched(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfidenceConfig {
    #[serde(default = "default_autopatch_threshold")]
    pub autopatch_threshold: f64,
}

impl Default for ConfidenceConfig {
    fn default() -> Self {
        Self {
            autopatch_threshold: default_autopatch_threshold(),
        }
    }
}

/// A named scope of documentation with its own detection rules and patch policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocAreaConfig {
    pub name: String,
    #[serde(default)]
    pub mode: Mode,
    #[serde(default)]
    pub detect: DetectConfig,
    #[serde(default)]
    pub patch: PatchConfig,
}

impl DocAreaConfig {
    /// Conceptual areas require a human unless explicitly opted out.
    pub fn requires_human_confirmation(&self) -> bool {
        self.patch
            .require_human_confirmation
            .unwrap_or(self.mode == Mode::Conceptual)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DetectConfig {
    #[serde(default)]
    pub spec: Option<SpecConfig>,
    #[serde(default)]
    pub paths: Vec<PathRule>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PathRule {
    #[serde(rename = "match")]
    pub match_glob: String,
    #[serde(default)]
    pub impacts: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpecConfig {
    pub format: String,
    #[serde(default)]
    pub current: Option<CurrentSource>,
    /// Published copy, relative to the repo root.
    #[serde(default)]
    pub published: String,
    /// GraphQL only: fetch the current schema with an introspection query.
    #[serde(default)]
    pub introspection: bool,
    #[serde(default = "default_fetch_timeout")]
    pub timeout_sec: u64,
}

/// Where the "current" definition comes from.
///
/// ```yaml
/// current: { url: https://api.example.com/openapi.json }
/// current: { path: build/openapi.json }
/// current: { command: { run: "npm run export:openapi", output: build/openapi.json } }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(try_from = "RawCurrentSource", into = "RawCurrentSource")]
pub enum CurrentSource {
    Url(String),
    Path(String),
    Command(ExportCommand),
}

/// Wire shape of [`CurrentSource`]: exactly one key must be present.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct RawCurrentSource {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    command: Option<ExportCommand>,
}

impl TryFrom<RawCurrentSource> for CurrentSource {
    type Error = String;

    fn try_from(raw: RawCurrentSource) -> Result<Self, Self::Error> {
        match (raw.url, raw.path, raw.command) {
            (Some(url), None, None) => Ok(CurrentSource::Url(url)),
            (None, Some(path), None) => Ok(CurrentSource::Path(path)),
            (None, None, Some(cmd)) => Ok(CurrentSource::Command(cmd)),
            (None, None, None) => Err("current needs one of url, path or command".into()),
            _ => Err("current must set exactly one of url, path or command".into()),
        }
    }
}

impl From<CurrentSource> for RawCurrentSource {
    fn from(src: CurrentSource) -> Self {
        match src {
            CurrentSource::Url(url) => RawCurrentSource {
                url: Some(url),
                ..Default::default()
            },
            CurrentSource::Path(path) => RawCurrentSource {
                path: Some(path),
                ..Default::default()
            },
            CurrentSource::Command(cmd) => RawCurrentSource {
                command: Some(cmd),
                ..Default::default()
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExportCommand {
    pub run: String,
    pub output: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PatchConfig {
    #[serde(default)]
    pub targets: Vec<String>,
    #[serde(default)]
    pub require_human_confirmation: Option<bool>,
}

fn default_verify_timeout() -> u64 {
    300
}

fn default_fetch_timeout() -> u64 {
    30
}

fn default_max_prs_per_day() -> u32 {
    1
}

fn default_max_files_touched() -> usize {
    10
}

fn default_autopatch_threshold() -> f64 {
    0.8
}

/// Load and validate configuration from a YAML file.
pub fn load_config(path: &Path) -> Result<DriftConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.display().to_string(),
        source,
    })?;
    parse_config(&content)
}

/// Parse and validate configuration from a YAML string.
pub fn parse_config(yaml: &str) -> Result<DriftConfig, ConfigError> {
    let config: DriftConfig = serde_yaml::from_str(yaml)?;
    validate_config(&config)?;
    Ok(config)
}

pub fn validate_config(config: &DriftConfig) -> Result<(), ConfigError> {
    if config.doc_areas.is_empty() {
        return Err(ConfigError::NoDocAreas);
    }

    let threshold = config.policy.confidence.autopatch_threshold;
    if !(0.0..=1.0).contains(&threshold) {
        return Err(ConfigError::InvalidPolicy(format!(
            "autopatch_threshold must be within [0, 1], got {threshold}"
        )));
    }
    if config.policy.pr_caps.max_files_touched == 0 {
        return Err(ConfigError::InvalidPolicy(
            "max_files_touched must be at least 1".into(),
        ));
    }
    GlobList::new(&config.policy.allowlist)?;
    GlobList::new(&config.policy.exclude)?;

    let mut seen = HashSet::new();
    for area in &config.doc_areas {
        if !is_valid_area_name(&area.name) {
            return Err(ConfigError::InvalidAreaName(area.name.clone()));
        }
        if !seen.insert(area.name.as_str()) {
            return Err(ConfigError::DuplicateArea(area.name.clone()));
        }
        if area.detect.spec.is_none() && area.detect.paths.is_empty() {
            return Err(ConfigError::NothingToDetect(area.name.clone()));
        }
        if let Some(spec) = &area.detect.spec {
            validate_spec(&area.name, spec)?;
        }
        for rule in &area.detect.paths {
            GlobList::new(&[rule.match_glob.as_str()])?;
        }
    }
    Ok(())
}

/// Area names double as evidence file and directory names.
fn is_valid_area_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
}

fn validate_spec(area: &str, spec: &SpecConfig) -> Result<(), ConfigError> {
    if !SPEC_FORMATS.contains(&spec.format.as_str()) {
        return Err(ConfigError::UnknownFormat {
            area: area.to_string(),
            format: spec.format.clone(),
        });
    }
    if spec.current.is_none() {
        return Err(ConfigError::Missing {
            area: area.to_string(),
            what: "detect.spec.current".into(),
        });
    }
    if spec.introspection && spec.format != "graphql" {
        return Err(ConfigError::InvalidArea {
            area: area.to_string(),
            reason: format!("introspection is only supported for graphql, not {}", spec.format),
        });
    }
    if spec.introspection && !matches!(spec.current, Some(CurrentSource::Url(_))) {
        return Err(ConfigError::InvalidArea {
            area: area.to_string(),
            reason: "introspection requires a url current source".into(),
        });
    }
    if spec.published.trim().is_empty() {
        return Err(ConfigError::Missing {
            area: area.to_string(),
            what: "detect.spec.published".into(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: &str = r#"
repo: acme/widgets
verify:
  commands: ["npm run docs:check"]
policy:
  pr_caps: { max_prs_per_day: 2, max_files_touched: 5 }
  confidence: { autopatch_threshold: 0.75 }
  allowlist: ["docs/**", "pages/**"]
  exclude: ["docs/internal/**"]
doc_areas:
  - name: api-reference
    mode: autogen
    detect:
      spec:
        format: openapi
        current: { url: "https://api.acme.dev/openapi.json" }
        published: docs/openapi.json
  - name: guides
    mode: conceptual
    detect:
      paths:
        - match: "definition/**"
          impacts: ["pages/guides/**"]
  - name: cli
    detect:
      spec:
        format: fern
        current:
          command: { run: "fern export", output: build/definition }
        published: docs/definition.txt
"#;

    #[test]
    fn parses_full_config() {
        let cfg = parse_config(FULL).unwrap();
        assert_eq!(cfg.repo, "acme/widgets");
        assert_eq!(cfg.verify.commands.len(), 1);
        assert_eq!(cfg.verify.timeout_sec, 300);
        assert_eq!(cfg.policy.pr_caps.max_prs_per_day, 2);
        assert_eq!(cfg.doc_areas.len(), 3);

        let api = cfg.area("api-reference").unwrap();
        let spec = api.detect.spec.as_ref().unwrap();
        assert_eq!(
            spec.current,
            Some(CurrentSource::Url("https://api.acme.dev/openapi.json".into()))
        );
        assert_eq!(spec.timeout_sec, 30);
        assert!(!api.requires_human_confirmation());

        let guides = cfg.area("guides").unwrap();
        assert_eq!(guides.mode, Mode::Conceptual);
        assert_eq!(guides.detect.paths[0].match_glob, "definition/**");
        assert!(guides.requires_human_confirmation());

        let cli = cfg.area("cli").unwrap();
        assert_eq!(cli.mode, Mode::Autogen);
        match cli.detect.spec.as_ref().unwrap().current.as_ref().unwrap() {
            CurrentSource::Command(cmd) => {
                assert_eq!(cmd.run, "fern export");
                assert_eq!(cmd.output, "build/definition");
            }
            other => panic!("unexpected source: {other:?}"),
        }
    }

    #[test]
    fn defaults_applied() {
        let cfg = parse_config(
            "doc_areas:\n  - name: a\n    detect:\n      paths:\n        - match: 'src/**'\n",
        )
        .unwrap();
        assert_eq!(cfg.policy.pr_caps.max_prs_per_day, 1);
        assert_eq!(cfg.policy.pr_caps.max_files_touched, 10);
        assert!((cfg.policy.confidence.autopatch_threshold - 0.8).abs() < 1e-9);
        assert!(cfg.policy.allowlist.is_empty());
    }

    #[test]
    fn unknown_format_rejected() {
        let yaml = "doc_areas:\n  - name: a\n    detect:\n      spec:\n        format: raml\n        current: { path: x }\n        published: y\n";
        let err = parse_config(yaml).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownFormat { .. }), "{err}");
    }

    #[test]
    fn missing_current_rejected() {
        let yaml = "doc_areas:\n  - name: a\n    detect:\n      spec:\n        format: openapi\n        published: y\n";
        let err = parse_config(yaml).unwrap_err();
        assert!(err.to_string().contains("detect.spec.current"), "{err}");
    }

    #[test]
    fn ambiguous_current_rejected() {
        let yaml = "doc_areas:\n  - name: a\n    detect:\n      spec:\n        format: openapi\n        current: { url: u, path: p }\n        published: y\n";
        assert!(matches!(parse_config(yaml).unwrap_err(), ConfigError::Parse(_)));
    }

    #[test]
    fn area_without_detectors_rejected() {
        let err = parse_config("doc_areas:\n  - name: a\n").unwrap_err();
        assert!(matches!(err, ConfigError::NothingToDetect(_)));
    }

    #[test]
    fn duplicate_area_rejected() {
        let yaml = "doc_areas:\n  - name: a\n    detect: { paths: [{ match: x }] }\n  - name: a\n    detect: { paths: [{ match: y }] }\n";
        assert!(matches!(
            parse_config(yaml).unwrap_err(),
            ConfigError::DuplicateArea(_)
        ));
    }

    #[test]
    fn area_names_must_be_file_safe() {
        for name in ["../escape", "nested/area", "..", "has space", "''"] {
            let yaml = format!(
                "doc_areas:\n  - name: {name}\n    detect: {{ paths: [{{ match: x }}] }}\n"
            );
            let err = parse_config(&yaml).unwrap_err();
            assert!(matches!(err, ConfigError::InvalidAreaName(_)), "{name}: {err}");
        }
        let ok = "doc_areas:\n  - name: api-v2_public.1\n    detect: { paths: [{ match: x }] }\n";
        assert!(parse_config(ok).is_ok());
    }

    #[test]
    fn introspection_needs_url_source() {
        let yaml = "doc_areas:\n  - name: graph\n    detect:\n      spec:\n        format: graphql\n        current: { path: schema.graphql }\n        published: docs/schema.graphql\n        introspection: true\n";
        let err = parse_config(yaml).unwrap_err();
        assert!(err.to_string().contains("introspection requires a url"), "{err}");

        let yaml = yaml.replace("{ path: schema.graphql }", "{ url: \"https://api.test/graphql\" }");
        assert!(parse_config(&yaml).is_ok());
    }

    #[test]
    fn threshold_out_of_range_rejected() {
        let yaml = "policy: { confidence: { autopatch_threshold: 1.5 } }\ndoc_areas:\n  - name: a\n    detect: { paths: [{ match: x }] }\n";
        assert!(matches!(
            parse_config(yaml).unwrap_err(),
            ConfigError::InvalidPolicy(_)
        ));
    }

    #[test]
    fn empty_config_rejected() {
        assert!(matches!(
            parse_config("repo: x\n").unwrap_err(),
            ConfigError::NoDocAreas
        ));
    }

    #[test]
    fn load_missing_file_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_config(&dir.path().join("nope.yml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
