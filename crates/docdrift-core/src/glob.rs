use crate::error::ConfigError;
use regex::Regex;

/// Path glob: `*` matches within one path segment, `**` matches across segments,
/// every other character is literal. Matching is anchored at both ends.
#[derive(Debug, Clone)]
pub struct PathGlob {
    pattern: String,
    re: Regex,
}

impl PathGlob {
    pub fn new(pattern: &str) -> Result<Self, ConfigError> {
        let re = Regex::new(&translate(pattern)).map_err(|e| ConfigError::InvalidGlob {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            pattern: pattern.to_string(),
            re,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.pattern
    }

    pub fn is_match(&self, path: &str) -> bool {
        // Normalize path separators for cross-platform matching
        let normalized = path.replace('\\', "/");
        self.re.is_match(&normalized)
    }
}

/// An ordered set of globs; a path matches if any member matches.
#[derive(Debug, Clone, Default)]
pub struct GlobList {
    globs: Vec<PathGlob>,
}

impl GlobList {
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self, ConfigError> {
        let globs = patterns
            .iter()
            .map(|p| PathGlob::new(p.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { globs })
    }

    pub fn is_empty(&self) -> bool {
        self.globs.is_empty()
    }

    pub fn is_match(&self, path: &str) -> bool {
        self.globs.iter().any(|g| g.is_match(path))
    }

    /// First glob that matches, if any.
    pub fn first_match(&self, path: &str) -> Option<&PathGlob> {
        self.globs.iter().find(|g| g.is_match(path))
    }
}

fn translate(pattern: &str) -> String {
    let chars: Vec<char> = pattern.chars().collect();
    let mut out = String::from("^");
    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            '*' if chars.get(i + 1) == Some(&'*') => {
                // `**/` may also match zero directories
                if chars.get(i + 2) == Some(&'/') {
                    out.push_str("(?:.*/)?");
                    i += 3;
                } else {
                    out.push_str(".*");
                    i += 2;
                }
            }
            '*' => {
                out.push_str("[^/]*");
                i += 1;
            }
            c => {
                out.push_str(&regex::escape(&c.to_string()));
                i += 1;
            }
        }
    }
    out.push('$');
    out
}
