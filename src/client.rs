//! REST client for the benchmark runner.
//!
//! Results and chart fetches are idempotent reads; empty or missing
//! payloads are "nothing yet", not errors. Failures bubble up as
//! `anyhow` errors and are handled per the page's error taxonomy by
//! the caller.

use anyhow::{Context, Result};
use url::Url;

use crate::protocol::{
    ActionResponse, CacheStatus, ChartPayload, Example, ExamplesPayload, ResultsPayload,
    RunnerConfig,
};
use crate::results::ResultsTable;

const REQUEST_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(15);

#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base: Url,
}

impl ApiClient {
    pub fn new(base: Url) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("failed to build http client")?;
        Ok(ApiClient { http, base })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base
            .join(path)
            .with_context(|| format!("invalid endpoint path {path}"))
    }

    /// Websocket URL for the live status channel, derived from the
    /// base URL (http -> ws, https -> wss).
    pub fn ws_url(&self) -> Result<Url> {
        let mut url = self.endpoint("/ws")?;
        let scheme = match url.scheme() {
            "https" => "wss",
            _ => "ws",
        };
        url.set_scheme(scheme)
            .map_err(|_| anyhow::anyhow!("cannot derive websocket scheme from {}", self.base))?;
        Ok(url)
    }

    pub async fn config(&self) -> Result<RunnerConfig> {
        let url = self.endpoint("/api/config")?;
        Ok(self.http.get(url).send().await?.json().await?)
    }

    pub async fn cache_status(&self) -> Result<CacheStatus> {
        let url = self.endpoint("/api/cache/status")?;
        Ok(self.http.get(url).send().await?.json().await?)
    }

    pub async fn clear_cache(&self) -> Result<ActionResponse> {
        let url = self.endpoint("/api/cache/clear")?;
        Ok(self.http.post(url).send().await?.json().await?)
    }

    pub async fn start_run(&self) -> Result<ActionResponse> {
        let url = self.endpoint("/api/benchmark/start")?;
        Ok(self.http.post(url).send().await?.json().await?)
    }

    /// Fetches the full results table. `null` or `{}` mean the run has
    /// produced nothing yet and come back as an empty table.
    pub async fn results(&self) -> Result<ResultsTable> {
        let url = self.endpoint("/api/benchmark/results")?;
        let payload: Option<ResultsPayload> = self.http.get(url).send().await?.json().await?;
        Ok(ResultsTable::new(payload.unwrap_or_default()))
    }

    pub async fn chart_data(&self) -> Result<Option<ChartPayload>> {
        let url = self.endpoint("/api/charts")?;
        let payload: Option<ChartPayload> = self.http.get(url).send().await?.json().await?;
        Ok(payload.filter(|p| !p.models.is_empty()))
    }

    pub async fn examples(&self, model: &str, limit: usize) -> Result<Vec<Example>> {
        let mut url = self.endpoint(&format!("/api/examples/{model}"))?;
        url.query_pairs_mut().append_pair("limit", &limit.to_string());
        let payload: ExamplesPayload = self.http.get(url).send().await?.json().await?;
        Ok(payload.examples)
    }

    /// Raw encoded audio for one example.
    pub async fn audio(&self, id: &str) -> Result<Vec<u8>> {
        let url = self.endpoint(&format!("/api/audio/{id}"))?;
        let response = self.http.get(url).send().await?.error_for_status()?;
        Ok(response.bytes().await?.to_vec())
    }
}
