use thiserror::Error;

/// Configuration and precondition problems. These abort a run: without a valid
/// configuration the tool cannot know what to compare.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("reading config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("config schema validation failed: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("config declares no doc_areas")]
    NoDocAreas,
    #[error("invalid doc area name '{0}' (letters, digits, '.', '_' and '-' only)")]
    InvalidAreaName(String),
    #[error("duplicate doc area name: {0}")]
    DuplicateArea(String),
    #[error("doc area '{0}' has nothing to detect (needs detect.spec or detect.paths)")]
    NothingToDetect(String),
    #[error("doc area '{area}': unknown spec format '{format}'")]
    UnknownFormat { area: String, format: String },
    #[error("doc area '{area}': missing {what}")]
    Missing { area: String, what: String },
    #[error("doc area '{area}': {reason}")]
    InvalidArea { area: String, reason: String },
    #[error("invalid glob '{pattern}': {reason}")]
    InvalidGlob { pattern: String, reason: String },
    #[error("invalid policy: {0}")]
    InvalidPolicy(String),
}
