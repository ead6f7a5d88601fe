//! One HTTP fetch helper for every adapter.
//!
//! Each adapter declares what it needs (headers, timeout, page bound,
//! inter-request delay) instead of building its own client and copying
//! header boilerplate around.

use anyhow::{bail, Context, Result};
use reqwest::Client;
use std::time::Duration;
use tracing::warn;

/// Matches what the sites serve to a desktop browser; several of them
/// return stripped or empty markup to non-browser identities.
pub const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120 Safari/537.36";

#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub user_agent: String,
    pub accept: Option<String>,
    pub accept_language: Option<String>,
    pub referer: Option<String>,
    pub timeout: Duration,
    /// Upper bound for paginated sweeps (inclusive page index).
    pub max_pages: u32,
    /// Pause between consecutive requests in a sweep.
    pub request_delay: Duration,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: BROWSER_USER_AGENT.to_string(),
            accept: None,
            accept_language: None,
            referer: None,
            timeout: Duration::from_secs(30),
            max_pages: 0,
            request_delay: Duration::from_millis(700),
        }
    }
}

pub struct HttpFetcher {
    client: Client,
    cfg: FetchConfig,
}

impl HttpFetcher {
    pub fn new(cfg: FetchConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(cfg.user_agent.clone())
            .timeout(cfg.timeout)
            .build()
            .context("failed to build http client")?;
        Ok(Self { client, cfg })
    }

    pub fn config(&self) -> &FetchConfig {
        &self.cfg
    }

    fn request(&self, url: &str) -> reqwest::RequestBuilder {
        let mut req = self.client.get(url);
        if let Some(accept) = &self.cfg.accept {
            req = req.header("accept", accept);
        }
        if let Some(lang) = &self.cfg.accept_language {
            req = req.header("accept-language", lang);
        }
        if let Some(referer) = &self.cfg.referer {
            req = req.header("referer", referer);
        }
        req
    }

    /// GET a page and return its body. Non-2xx is a transport error here:
    /// use this for single-document sources where the whole run depends on
    /// the response.
    pub async fn get_text(&self, url: &str) -> Result<String> {
        let resp = self
            .request(url)
            .send()
            .await
            .with_context(|| format!("GET {url} failed"))?;
        let status = resp.status();
        if !status.is_success() {
            bail!("GET {url} returned HTTP {status}");
        }
        resp.text().await.context("reading response body")
    }

    /// GET one page of a paginated sweep. A non-2xx status skips the page
    /// (logged, Ok(None)); only a connection-level failure is an error.
    pub async fn get_page(&self, url: &str) -> Result<Option<String>> {
        let resp = self
            .request(url)
            .send()
            .await
            .with_context(|| format!("GET {url} failed"))?;
        let status = resp.status();
        if !status.is_success() {
            warn!(%url, %status, "skipping page on non-2xx response");
            return Ok(None);
        }
        Ok(Some(resp.text().await.context("reading response body")?))
    }

    /// GET a JSON document.
    pub async fn get_json(&self, url: &str) -> Result<serde_json::Value> {
        let resp = self
            .request(url)
            .send()
            .await
            .with_context(|| format!("GET {url} failed"))?;
        let status = resp.status();
        if !status.is_success() {
            bail!("GET {url} returned HTTP {status}");
        }
        resp.json().await.context("decoding json response")
    }

    /// Inter-request pause for sweeps.
    pub async fn pause(&self) {
        tokio::time::sleep(self.cfg.request_delay).await;
    }
}
