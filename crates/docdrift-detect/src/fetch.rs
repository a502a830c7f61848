use anyhow::{Context, Result};
use std::collections::HashMap;
use std::time::Duration;

/// Raw-content fetcher for URL-sourced definitions.
#[async_trait::async_trait]
pub trait Fetcher: Send + Sync {
    async fn get(&self, url: &str, timeout: Duration) -> Result<String>;
    async fn post_json(
        &self,
        url: &str,
        body: &serde_json::Value,
        timeout: Duration,
    ) -> Result<String>;
}

/// Blocking `ureq` agent run on the blocking pool. Follows redirects, honors
/// `HTTPS_PROXY`/`HTTP_PROXY`/`ALL_PROXY`, treats non-2xx as an error.
pub struct HttpFetcher;

fn agent(timeout: Duration) -> ureq::Agent {
    ureq::Agent::config_builder()
        .timeout_global(Some(timeout))
        .proxy(ureq::Proxy::try_from_env())
        .build()
        .new_agent()
}

#[async_trait::async_trait]
impl Fetcher for HttpFetcher {
    async fn get(&self, url: &str, timeout: Duration) -> Result<String> {
        let url = url.to_string();
        tokio::task::spawn_blocking(move || -> Result<String> {
            let mut resp = agent(timeout)
                .get(&url)
                .call()
                .with_context(|| format!("GET {url}"))?;
            let text = resp
                .body_mut()
                .read_to_string()
                .with_context(|| format!("reading body of {url}"))?;
            Ok(text)
        })
        .await?
    }

    async fn post_json(
        &self,
        url: &str,
        body: &serde_json::Value,
        timeout: Duration,
    ) -> Result<String> {
        let url = url.to_string();
        let payload = body.to_string();
        tokio::task::spawn_blocking(move || -> Result<String> {
            let mut resp = agent(timeout)
                .post(&url)
                .header("Content-Type", "application/json")
                .send(payload)
                .with_context(|| format!("POST {url}"))?;
            let text = resp
                .body_mut()
                .read_to_string()
                .with_context(|| format!("reading body of {url}"))?;
            Ok(text)
        })
        .await?
    }
}

/// Canned responses keyed by URL (for testing). Unknown URLs fail like a 404.
pub struct MapFetcher {
    responses: HashMap<String, String>,
}

impl MapFetcher {
    pub fn new() -> Self {
        Self {
            responses: HashMap::new(),
        }
    }

    pub fn with(mut self, url: &str, body: &str) -> Self {
        self.responses.insert(url.to_string(), body.to_string());
        self
    }

    fn lookup(&self, url: &str) -> Result<String> {
        self.responses
            .get(url)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("GET {url}: http status: 404"))
    }
}

impl Default for MapFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Fetcher for MapFetcher {
    async fn get(&self, url: &str, _timeout: Duration) -> Result<String> {
        self.lookup(url)
    }

    async fn post_json(
        &self,
        url: &str,
        _body: &serde_json::Value,
        _timeout: Duration,
    ) -> Result<String> {
        self.lookup(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn map_fetcher_serves_known_urls() {
        let f = MapFetcher::new().with("https://x.test/spec", "{}");
        assert_eq!(
            f.get("https://x.test/spec", Duration::from_secs(1)).await.unwrap(),
            "{}"
        );
        let err = f
            .get("https://x.test/missing", Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("404"));
    }

    #[tokio::test]
    async fn http_fetcher_fails_closed_on_unreachable_host() {
        let err = HttpFetcher
            .get("http://127.0.0.1:9/openapi.json", Duration::from_secs(2))
            .await;
        assert!(err.is_err());
    }
}
