use anyhow::{Context, Result};
use reqwest::blocking::Client;
use std::time::Duration;

/// Endpoint used to decide whether the package index is reachable.
pub const DEFAULT_PROBE_URL: &str = "https://pypi.org/";
const DEFAULT_USER_AGENT: &str = concat!("uvstrap/", env!("CARGO_PKG_VERSION"));

/// HTTP access needed by the bootstrap: a reachability probe and a plain
/// download.
pub trait Network {
    fn probe(&self, url: &str) -> Result<()>;
    fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}

pub struct HttpNetwork {
    http: Client,
}

impl HttpNetwork {
    pub fn new(timeout: Option<Duration>) -> Result<Self> {
        let http = Client::builder()
            .user_agent(DEFAULT_USER_AGENT)
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { http })
    }
}

impl Network for HttpNetwork {
    fn probe(&self, url: &str) -> Result<()> {
        self.http
            .head(url)
            .send()
            .with_context(|| format!("Failed to reach {url}"))?
            .error_for_status()
            .with_context(|| format!("{url} responded with an error status"))?;
        Ok(())
    }

    fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let response = self
            .http
            .get(url)
            .send()
            .with_context(|| format!("Failed to download {url}"))?
            .error_for_status()
            .with_context(|| format!("{url} responded with an error status"))?;
        let body = response
            .bytes()
            .with_context(|| format!("Failed to read response body from {url}"))?;
        Ok(body.to_vec())
    }
}
